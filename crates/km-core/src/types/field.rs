//! Field descriptors and rename directives.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::TypeRef;

/// An alternate source name for a field, optionally scoped to counterpart types.
///
/// An empty `for_types` list applies to every counterpart.
///
/// # Examples
///
/// ```
/// use km_core::RenameDirective;
///
/// let rename = RenameDirective::new("userId").for_type("com.acme.ApiUser");
/// assert!(rename.applies_to("com.acme.ApiUser"));
/// assert!(!rename.applies_to("com.acme.DbUser"));
///
/// let everywhere = RenameDirective::new("userId");
/// assert!(everywhere.applies_to("com.acme.DbUser"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RenameDirective {
    /// The counterpart-side name.
    pub name: String,

    /// Qualified names of the counterpart types this directive is limited to.
    #[serde(default)]
    pub for_types: SmallVec<[String; 2]>,
}

impl RenameDirective {
    /// Creates a directive that applies to all counterparts.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            for_types: SmallVec::new(),
        }
    }

    /// Restricts this directive to an additional counterpart type.
    #[must_use]
    pub fn for_type(mut self, qualified_name: impl Into<String>) -> Self {
        self.for_types.push(qualified_name.into());
        self
    }

    /// Returns `true` if this directive is in effect for `counterpart`.
    #[must_use]
    pub fn applies_to(&self, counterpart: &str) -> bool {
        self.for_types.is_empty() || self.for_types.iter().any(|t| t == counterpart)
    }
}

/// A field of a type, or a parameter of a constructor-like callable.
///
/// # Examples
///
/// ```
/// use km_core::{FieldDescriptor, RenameDirective, TypeRef};
///
/// let field = FieldDescriptor::new("id", TypeRef::new("kotlin.Long"))
///     .with_rename(RenameDirective::new("userId"));
/// assert_eq!(field.rename_for("com.acme.ApiUser"), Some("userId"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Field or parameter name.
    pub name: String,

    /// Declared type.
    #[serde(rename = "type")]
    pub ty: TypeRef,

    /// Whether a default value exists for this parameter.
    #[serde(default)]
    pub has_default: bool,

    /// Whether the field is explicitly excluded from mapping.
    #[serde(default)]
    pub ignored: bool,

    /// Rename directives, in declaration order.
    #[serde(default)]
    pub renames: SmallVec<[RenameDirective; 1]>,

    /// Provider qualifier requested for this parameter.
    #[serde(default)]
    pub qualifier: Option<String>,
}

impl FieldDescriptor {
    /// Creates a plain field with no annotations.
    #[must_use]
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            has_default: false,
            ignored: false,
            renames: SmallVec::new(),
            qualifier: None,
        }
    }

    /// Marks the field as having a default value.
    #[must_use]
    pub const fn with_default(mut self) -> Self {
        self.has_default = true;
        self
    }

    /// Marks the field as excluded from mapping.
    #[must_use]
    pub const fn ignore(mut self) -> Self {
        self.ignored = true;
        self
    }

    /// Adds a rename directive.
    #[must_use]
    pub fn with_rename(mut self, rename: RenameDirective) -> Self {
        self.renames.push(rename);
        self
    }

    /// Sets the provider qualifier.
    #[must_use]
    pub fn with_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifier = Some(qualifier.into());
        self
    }

    /// The provider qualifier, ignoring blank values.
    #[must_use]
    pub fn qualifier(&self) -> Option<&str> {
        non_blank(self.qualifier.as_deref())
    }

    /// The first non-empty rename in effect for `counterpart`.
    #[must_use]
    pub fn rename_for(&self, counterpart: &str) -> Option<&str> {
        self.renames
            .iter()
            .find(|r| !r.name.is_empty() && r.applies_to(counterpart))
            .map(|r| r.name.as_str())
    }
}

/// Filters out blank labels; qualifiers are optional strings where `""` means unset.
#[inline]
#[must_use]
pub fn non_blank(label: Option<&str>) -> Option<&str> {
    label.filter(|l| !l.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rename_scoping() {
        let field = FieldDescriptor::new("id", TypeRef::new("kotlin.Long"))
            .with_rename(RenameDirective::new("legacyId").for_type("com.acme.Legacy"))
            .with_rename(RenameDirective::new("userId"));

        assert_eq!(field.rename_for("com.acme.Legacy"), Some("legacyId"));
        assert_eq!(field.rename_for("com.acme.ApiUser"), Some("userId"));
    }

    #[test]
    fn test_empty_rename_is_skipped() {
        let field = FieldDescriptor::new("id", TypeRef::new("kotlin.Long"))
            .with_rename(RenameDirective::new(""));
        assert_eq!(field.rename_for("com.acme.Any"), None);
    }

    #[test]
    fn test_blank_qualifier_is_unset() {
        let field = FieldDescriptor::new("at", TypeRef::new("kotlin.String")).with_qualifier("  ");
        assert_eq!(field.qualifier(), None);
        let field = field.with_qualifier("iso");
        assert_eq!(field.qualifier(), Some("iso"));
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let json = r#"{"name": "email", "type": "com.acme.Email?"}"#;
        let field: FieldDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(field.name, "email");
        assert!(field.ty.nullable);
        assert!(!field.has_default);
        assert!(!field.ignored);
        assert!(field.renames.is_empty());
    }
}
