//! Canonical type keys.
//!
//! A [`CanonicalKey`] is the identity the provider registry indexes on. Two
//! types produce equal keys iff they are the same declaration applied to the
//! same argument list with the same nullability. With `preserve_alias` the
//! alias spelling is part of that identity; without it aliases are keyed by
//! their expansion.
//!
//! ```
//! use km_core::{TypeRef, canonical_key};
//!
//! let id = TypeRef::new("com.acme.UserId").aliasing(TypeRef::new("kotlin.Long"));
//! let list = TypeRef::generic("kotlin.collections.List", [id]).nullable();
//!
//! assert_eq!(
//!     canonical_key(&list, false).unwrap().as_str(),
//!     "kotlin.collections.List<kotlin.Long>?"
//! );
//! assert_eq!(
//!     canonical_key(&list, true).unwrap().as_str(),
//!     "kotlin.collections.List<com.acme.UserId>?"
//! );
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{TypeArg, TypeRef};

/// A deterministic, comparable type identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalKey(String);

impl CanonicalKey {
    /// The key text.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CanonicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CanonicalKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Computes the canonical key of `ty`.
///
/// Returns `None` when the type (or any of its arguments) has no nameable
/// declaration.
///
/// Generic arguments are rendered in declared order; star projections render
/// as `*`. Nullability of arguments is part of the key.
#[must_use]
pub fn canonical_key(ty: &TypeRef, preserve_alias: bool) -> Option<CanonicalKey> {
    let mut out = String::with_capacity(ty.name.len() + 8);
    render(ty, preserve_alias, &mut out)?;
    Some(CanonicalKey(out))
}

fn render(ty: &TypeRef, preserve_alias: bool, out: &mut String) -> Option<()> {
    let expanded;
    let ty = if !preserve_alias && ty.is_alias() {
        expanded = ty.expanded();
        &expanded
    } else {
        ty
    };

    if ty.name.is_empty() {
        return None;
    }
    out.push_str(&ty.name);

    if !ty.args.is_empty() {
        out.push('<');
        for (i, arg) in ty.args.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            match arg {
                TypeArg::Star => out.push('*'),
                TypeArg::Type(inner) => render(inner, preserve_alias, out)?,
            }
        }
        out.push('>');
    }

    if ty.nullable {
        out.push('?');
    }
    Some(())
}

/// Keys `ty` both ways, returning the alias key only when it differs.
///
/// Registration indexes a provider under both spellings of its return type.
#[must_use]
pub fn key_pair(ty: &TypeRef) -> Option<(CanonicalKey, Option<CanonicalKey>)> {
    let expanded = canonical_key(ty, false)?;
    let alias = canonical_key(ty, true)?;
    let alias = (alias != expanded).then_some(alias);
    Some((expanded, alias))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(ty: &TypeRef, preserve: bool) -> String {
        canonical_key(ty, preserve).unwrap().as_str().to_owned()
    }

    #[test]
    fn test_plain_and_nullable_differ() {
        let ty = TypeRef::new("kotlin.String");
        assert_eq!(key(&ty, false), "kotlin.String");
        assert_eq!(key(&ty.as_nullable(), false), "kotlin.String?");
        assert_ne!(
            canonical_key(&ty, false),
            canonical_key(&ty.as_nullable(), false)
        );
    }

    #[test]
    fn test_argument_order_is_preserved() {
        let ab = TypeRef::generic(
            "kotlin.collections.Map",
            [TypeRef::new("a.A"), TypeRef::new("a.B")],
        );
        let ba = TypeRef::generic(
            "kotlin.collections.Map",
            [TypeRef::new("a.B"), TypeRef::new("a.A")],
        );
        assert_eq!(key(&ab, false), "kotlin.collections.Map<a.A, a.B>");
        assert_ne!(key(&ab, false), key(&ba, false));
    }

    #[test]
    fn test_nested_generics_are_unambiguous() {
        let nested: TypeRef = "a.Pair<a.List<a.X>, a.Y>".parse().unwrap();
        let flat: TypeRef = "a.Pair<a.List<a.X, a.Y>>".parse().unwrap();
        assert_eq!(key(&nested, false), "a.Pair<a.List<a.X>, a.Y>");
        assert_ne!(key(&nested, false), key(&flat, false));
    }

    #[test]
    fn test_star_projection() {
        let ty: TypeRef = "a.Box<*>?".parse().unwrap();
        assert_eq!(key(&ty, true), "a.Box<*>?");
    }

    #[test]
    fn test_alias_expansion_keeps_nullability() {
        let alias = TypeRef::new("a.UserId")
            .aliasing(TypeRef::new("kotlin.Long"))
            .nullable();
        assert_eq!(key(&alias, false), "kotlin.Long?");
        assert_eq!(key(&alias, true), "a.UserId?");
    }

    #[test]
    fn test_unrelated_aliases_stay_distinct() {
        let user = TypeRef::new("a.UserId").aliasing(TypeRef::new("kotlin.Long"));
        let order = TypeRef::new("a.OrderId").aliasing(TypeRef::new("kotlin.Long"));
        assert_eq!(key(&user, false), key(&order, false));
        assert_ne!(key(&user, true), key(&order, true));
    }

    #[test]
    fn test_alias_chain() {
        let inner = TypeRef::new("a.Raw").aliasing(TypeRef::new("kotlin.String"));
        let outer = TypeRef::new("a.Name").aliasing(inner);
        assert_eq!(key(&outer, false), "kotlin.String");
    }

    #[test]
    fn test_unnamed_type_has_no_key() {
        let ty = TypeRef::generic("a.Box", [TypeRef::new("")]);
        assert!(canonical_key(&ty, false).is_none());
    }

    #[test]
    fn test_key_pair() {
        let plain = TypeRef::new("a.Email");
        assert_eq!(key_pair(&plain).unwrap().1, None);

        let alias = TypeRef::new("a.UserId").aliasing(TypeRef::new("kotlin.Long"));
        let (expanded, alias_key) = key_pair(&alias).unwrap();
        assert_eq!(expanded.as_str(), "kotlin.Long");
        assert_eq!(alias_key.unwrap().as_str(), "a.UserId");
    }

    #[test]
    fn test_deterministic() {
        let ty: TypeRef = "a.M<a.K?, a.L<*>>?".parse().unwrap();
        assert_eq!(canonical_key(&ty, false), canonical_key(&ty.clone(), false));
    }
}
