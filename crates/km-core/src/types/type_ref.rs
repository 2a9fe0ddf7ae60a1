//! Type references and the type-expression syntax.
//!
//! A [`TypeRef`] names a declared type, its generic arguments and its
//! use-site nullability. Aliases keep their own name and carry a link to the
//! expansion in [`TypeRef::alias_of`], so both spellings stay available for
//! registry matching.
//!
//! Type references are written and serialized as type expressions:
//!
//! ```
//! use km_core::TypeRef;
//!
//! let ty: TypeRef = "kotlin.collections.Map<kotlin.String, com.acme.Email?>?".parse().unwrap();
//! assert_eq!(ty.simple_name(), "Map");
//! assert!(ty.nullable);
//! assert_eq!(ty.to_string(), "kotlin.collections.Map<kotlin.String, com.acme.Email?>?");
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::TypeSyntaxError;

/// A single generic argument: either a concrete type or a star projection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeArg {
    /// Star projection (`*`), used when a generic type is referenced as a whole.
    Star,
    /// A concrete type argument.
    Type(Box<TypeRef>),
}

impl TypeArg {
    /// Returns the concrete type, or `None` for a star projection.
    #[inline]
    #[must_use]
    pub fn as_type(&self) -> Option<&TypeRef> {
        match self {
            Self::Star => None,
            Self::Type(ty) => Some(ty.as_ref()),
        }
    }
}

impl fmt::Display for TypeArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Star => f.write_str("*"),
            Self::Type(ty) => ty.fmt(f),
        }
    }
}

/// A reference to a declared type.
///
/// Equality is structural and includes the alias link; use
/// [`canonical_key`](crate::canonical_key) when comparing types for registry
/// purposes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TypeRef {
    /// Fully qualified name of the declaration (e.g. `kotlin.String`).
    pub name: String,

    /// Generic arguments in declaration order.
    pub args: SmallVec<[TypeArg; 2]>,

    /// Whether the use site is nullable.
    pub nullable: bool,

    /// The expansion when `name` refers to a type alias.
    pub alias_of: Option<Box<TypeRef>>,
}

impl TypeRef {
    /// Creates a non-null reference without generic arguments.
    ///
    /// # Examples
    ///
    /// ```
    /// use km_core::TypeRef;
    ///
    /// let ty = TypeRef::new("kotlin.Long");
    /// assert_eq!(ty.to_string(), "kotlin.Long");
    /// ```
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: SmallVec::new(),
            nullable: false,
            alias_of: None,
        }
    }

    /// Creates a non-null reference with concrete generic arguments.
    #[must_use]
    pub fn generic(name: impl Into<String>, args: impl IntoIterator<Item = Self>) -> Self {
        Self {
            args: args.into_iter().map(|ty| TypeArg::Type(Box::new(ty))).collect(),
            ..Self::new(name)
        }
    }

    /// Returns this reference marked nullable.
    #[inline]
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Returns this reference linked to an alias expansion.
    #[inline]
    #[must_use]
    pub fn aliasing(mut self, expansion: Self) -> Self {
        self.alias_of = Some(Box::new(expansion));
        self
    }

    /// Returns `true` if this reference names a type alias.
    #[inline]
    #[must_use]
    pub const fn is_alias(&self) -> bool {
        self.alias_of.is_some()
    }

    /// The unqualified declaration name.
    ///
    /// # Examples
    ///
    /// ```
    /// use km_core::TypeRef;
    ///
    /// assert_eq!(TypeRef::new("com.acme.Email").simple_name(), "Email");
    /// assert_eq!(TypeRef::new("Email").simple_name(), "Email");
    /// ```
    #[must_use]
    pub fn simple_name(&self) -> &str {
        simple_name_of(&self.name)
    }

    /// The package part of the qualified name, empty for the root package.
    #[must_use]
    pub fn package(&self) -> &str {
        package_of(&self.name)
    }

    /// Returns a copy with the given use-site nullability.
    #[must_use]
    pub fn with_nullability(&self, nullable: bool) -> Self {
        Self {
            nullable,
            ..self.clone()
        }
    }

    /// Returns a non-null copy of this reference.
    #[inline]
    #[must_use]
    pub fn as_non_null(&self) -> Self {
        self.with_nullability(false)
    }

    /// Returns a nullable copy of this reference.
    #[inline]
    #[must_use]
    pub fn as_nullable(&self) -> Self {
        self.with_nullability(true)
    }

    /// Follows alias links at the top level.
    ///
    /// The use-site nullability of the alias is kept: `UserId?` with
    /// `UserId = Long` expands to `Long?`.
    #[must_use]
    pub fn expanded(&self) -> Self {
        let mut current = self;
        let mut nullable = self.nullable;
        while let Some(next) = current.alias_of.as_deref() {
            nullable |= next.nullable;
            current = next;
        }
        current.with_nullability(nullable)
    }

    /// Follows alias links at every level, including generic arguments.
    #[must_use]
    pub fn deep_expanded(&self) -> Self {
        let mut ty = self.expanded();
        for arg in &mut ty.args {
            if let TypeArg::Type(inner) = arg {
                **inner = inner.deep_expanded();
            }
        }
        ty
    }

    /// Returns the concrete generic argument at `index`.
    #[must_use]
    pub fn arg(&self, index: usize) -> Option<&Self> {
        self.args.get(index).and_then(TypeArg::as_type)
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if !self.args.is_empty() {
            f.write_str("<")?;
            for (i, arg) in self.args.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                arg.fmt(f)?;
            }
            f.write_str(">")?;
        }
        if self.nullable {
            f.write_str("?")?;
        }
        Ok(())
    }
}

impl FromStr for TypeRef {
    type Err = TypeSyntaxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TypeParser::new(s).parse()
    }
}

impl TryFrom<String> for TypeRef {
    type Error = TypeSyntaxError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TypeRef> for String {
    fn from(value: TypeRef) -> Self {
        value.to_string()
    }
}

/// The unqualified part of a dotted name.
#[must_use]
pub fn simple_name_of(qualified: &str) -> &str {
    qualified.rsplit_once('.').map_or(qualified, |(_, simple)| simple)
}

/// The package part of a dotted name, empty when there is none.
#[must_use]
pub fn package_of(qualified: &str) -> &str {
    qualified.rsplit_once('.').map_or("", |(package, _)| package)
}

/// Recursive-descent parser for type expressions.
///
/// ```text
/// type := name ('<' arg (',' arg)* '>')? '?'?
/// arg  := '*' | type
/// name := ident ('.' ident)*
/// ```
struct TypeParser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> TypeParser<'a> {
    const fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn parse(mut self) -> Result<TypeRef, TypeSyntaxError> {
        let ty = self.parse_type()?;
        self.skip_ws();
        if self.pos != self.src.len() {
            return Err(self.error("unexpected trailing input"));
        }
        Ok(ty)
    }

    fn parse_type(&mut self) -> Result<TypeRef, TypeSyntaxError> {
        self.skip_ws();
        let name = self.parse_name()?;
        let mut ty = TypeRef::new(name);

        self.skip_ws();
        if self.eat('<') {
            loop {
                self.skip_ws();
                if self.eat('*') {
                    ty.args.push(TypeArg::Star);
                } else {
                    ty.args.push(TypeArg::Type(Box::new(self.parse_type()?)));
                }
                self.skip_ws();
                if self.eat(',') {
                    continue;
                }
                if self.eat('>') {
                    break;
                }
                return Err(self.error("expected ',' or '>'"));
            }
            self.skip_ws();
        }

        ty.nullable = self.eat('?');
        Ok(ty)
    }

    fn parse_name(&mut self) -> Result<&'a str, TypeSyntaxError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' || c == '$' || c == '.' {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
        let name = &self.src[start..self.pos];
        if name.is_empty() {
            return Err(self.error("expected a type name"));
        }
        if name.split('.').any(str::is_empty) {
            self.pos = start;
            return Err(self.error("empty segment in qualified name"));
        }
        Ok(name)
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.peek() {
            if !c.is_whitespace() {
                break;
            }
            self.pos += c.len_utf8();
        }
    }

    fn error(&self, reason: &'static str) -> TypeSyntaxError {
        TypeSyntaxError {
            input: self.src.to_owned(),
            offset: self.pos,
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        let ty: TypeRef = "kotlin.String".parse().unwrap();
        assert_eq!(ty, TypeRef::new("kotlin.String"));
    }

    #[test]
    fn test_parse_nested_generics_and_nullability() {
        let ty: TypeRef = "kotlin.collections.List< kotlin.collections.List<kotlin.String> ? >?"
            .parse()
            .unwrap();
        assert!(ty.nullable);
        let inner = ty.arg(0).unwrap();
        assert!(inner.nullable);
        assert_eq!(inner.arg(0).unwrap().name, "kotlin.String");
        assert_eq!(
            ty.to_string(),
            "kotlin.collections.List<kotlin.collections.List<kotlin.String>?>?"
        );
    }

    #[test]
    fn test_arguments_nest_to_any_depth() {
        let innermost = TypeRef::new("kotlin.Long").nullable();
        let map = TypeRef::generic("kotlin.collections.Map", [TypeRef::new("kotlin.String"), innermost.clone()]);
        let list = TypeRef::generic("kotlin.collections.List", [map]);
        let outer = TypeRef::generic("kotlin.collections.Map", [TypeRef::new("kotlin.String"), list]);

        let reached = outer
            .arg(1)
            .and_then(|list| list.arg(0))
            .and_then(|map| map.args[1].as_type())
            .unwrap();
        assert_eq!(reached, &innermost);
        assert_eq!(
            outer.to_string(),
            "kotlin.collections.Map<kotlin.String, kotlin.collections.List<kotlin.collections.Map<kotlin.String, kotlin.Long?>>>"
        );
        assert_eq!(outer.to_string().parse::<TypeRef>().unwrap(), outer);
    }

    #[test]
    fn test_parse_star_projection() {
        let ty: TypeRef = "com.acme.Box<*, kotlin.Int>".parse().unwrap();
        assert_eq!(ty.args[0], TypeArg::Star);
        assert_eq!(ty.arg(1).unwrap().name, "kotlin.Int");
        assert!(ty.arg(0).is_none());
    }

    #[test]
    fn test_parse_errors() {
        let err = "List<".parse::<TypeRef>().unwrap_err();
        assert_eq!(err.reason, "expected a type name");

        let err = "List<A B>".parse::<TypeRef>().unwrap_err();
        assert_eq!(err.reason, "expected ',' or '>'");

        let err = "a..B".parse::<TypeRef>().unwrap_err();
        assert_eq!(err.reason, "empty segment in qualified name");

        let err = "A?x".parse::<TypeRef>().unwrap_err();
        assert_eq!(err.reason, "unexpected trailing input");
    }

    #[test]
    fn test_names() {
        let ty = TypeRef::new("com.acme.model.User");
        assert_eq!(ty.simple_name(), "User");
        assert_eq!(ty.package(), "com.acme.model");
        assert_eq!(TypeRef::new("User").package(), "");
    }

    #[test]
    fn test_expanded_keeps_use_site_nullability() {
        let alias = TypeRef::new("com.acme.UserId")
            .nullable()
            .aliasing(TypeRef::new("kotlin.Long"));
        let expanded = alias.expanded();
        assert_eq!(expanded.name, "kotlin.Long");
        assert!(expanded.nullable);
        assert!(!expanded.is_alias());
    }

    #[test]
    fn test_deep_expanded_reaches_arguments() {
        let id = TypeRef::new("com.acme.UserId").aliasing(TypeRef::new("kotlin.Long"));
        let list = TypeRef::generic("kotlin.collections.List", [id]);
        assert_eq!(
            list.deep_expanded().to_string(),
            "kotlin.collections.List<kotlin.Long>"
        );
    }

    #[test]
    fn test_serde_as_expression() {
        let ty = TypeRef::generic("kotlin.collections.Set", [TypeRef::new("kotlin.Int")]).nullable();
        let json = serde_json::to_string(&ty).unwrap();
        assert_eq!(json, r#""kotlin.collections.Set<kotlin.Int>?""#);
        let parsed: TypeRef = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, ty);
    }
}
