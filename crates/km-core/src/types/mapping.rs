//! Mapping declarations and the per-mapper specs they expand into.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{CalleeDescriptor, FieldDescriptor, TypeRef};

/// Where a mapping declaration is attached.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MappingOrigin {
    /// On the declaring class itself.
    #[default]
    Class,
    /// On a constructor of the declaring class.
    Constructor {
        /// The constructor's parameters.
        #[serde(default)]
        params: Vec<FieldDescriptor>,
    },
    /// On a function of the declaring class's companion object.
    CompanionFunction {
        /// Function name.
        name: String,
        /// The function's parameters.
        #[serde(default)]
        params: Vec<FieldDescriptor>,
    },
}

impl MappingOrigin {
    /// Returns `true` for origins scoped to a single callable.
    #[inline]
    #[must_use]
    pub const fn is_callable_scoped(&self) -> bool {
        !matches!(self, Self::Class)
    }

    /// Short label for diagnostics.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Class => "class",
            Self::Constructor { .. } => "constructor",
            Self::CompanionFunction { .. } => "companion function",
        }
    }
}

/// A declarative request for mappers, as attached to a type.
///
/// # Examples
///
/// ```
/// use km_core::MappingDecl;
///
/// let decl: MappingDecl = serde_json::from_str(r#"{
///     "declaring": "com.acme.User",
///     "from": ["com.acme.ApiUser"],
///     "to": ["com.acme.ApiUser"]
/// }"#).unwrap();
/// assert!(!decl.skip_defaults);
/// assert_eq!(decl.from.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingDecl {
    /// Qualified name of the declaring type (owner for constructor/companion origins).
    pub declaring: String,

    /// Where the declaration is attached.
    #[serde(default)]
    pub origin: MappingOrigin,

    /// Generate mappers from each of these types to the declaring type.
    #[serde(default)]
    pub from: Vec<String>,

    /// Generate mappers from the declaring type to each of these types.
    #[serde(default)]
    pub to: Vec<String>,

    /// Omit unmatched parameters that have defaults.
    #[serde(default)]
    pub skip_defaults: bool,

    /// Factory qualifiers preferred when constructing targets.
    #[serde(default)]
    pub factory_qualifiers: Vec<String>,
}

impl MappingDecl {
    /// Creates a class-level declaration with no directions.
    #[must_use]
    pub fn on_class(declaring: impl Into<String>) -> Self {
        Self {
            declaring: declaring.into(),
            origin: MappingOrigin::Class,
            from: Vec::new(),
            to: Vec::new(),
            skip_defaults: false,
            factory_qualifiers: Vec::new(),
        }
    }

    /// Adds a `from` counterpart.
    #[must_use]
    pub fn from_type(mut self, name: impl Into<String>) -> Self {
        self.from.push(name.into());
        self
    }

    /// Adds a `to` counterpart.
    #[must_use]
    pub fn to_type(mut self, name: impl Into<String>) -> Self {
        self.to.push(name.into());
        self
    }

    /// Sets the origin.
    #[must_use]
    pub fn with_origin(mut self, origin: MappingOrigin) -> Self {
        self.origin = origin;
        self
    }

    /// Enables default skipping.
    #[must_use]
    pub const fn skipping_defaults(mut self) -> Self {
        self.skip_defaults = true;
        self
    }

    /// Adds a preferred factory qualifier.
    #[must_use]
    pub fn with_factory_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.factory_qualifiers.push(qualifier.into());
        self
    }
}

/// Which side of a spec the declaring type is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Counterpart to declaring type.
    From,
    /// Declaring type to counterpart.
    To,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::From => "from",
            Self::To => "to",
        })
    }
}

/// One generated mapper: source, target and the knobs that drive resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingSpec {
    /// Direction relative to the declaring type.
    pub direction: Direction,

    /// Qualified name of the declaring type.
    pub declaring: String,

    /// Source type (star-projected when generic).
    pub source: TypeRef,

    /// Target type.
    pub target: TypeRef,

    /// Fixed construction callable for constructor/companion origins.
    ///
    /// `None` means factory resolution, then the primary constructor.
    pub callee: Option<CalleeDescriptor>,

    /// Parameters carrying the rename directives consulted first.
    pub rename_scope: Vec<FieldDescriptor>,

    /// Omit unmatched parameters that have defaults.
    pub skip_defaults: bool,

    /// Factory qualifiers preferred when constructing the target.
    pub factory_qualifiers: Vec<String>,

    /// Disambiguating file-name suffix for callable-scoped origins.
    pub name_suffix: Option<String>,
}

impl MappingSpec {
    /// Qualified name of the type on the other side from the declaring type.
    ///
    /// Rename directives on the declaring type's fields are scoped against it.
    /// A target parameter's own directives are always scoped against the
    /// source type instead.
    #[must_use]
    pub fn rename_counterpart(&self) -> &str {
        match self.direction {
            Direction::From => &self.source.name,
            Direction::To => &self.target.name,
        }
    }

    /// Short description for logs.
    #[must_use]
    pub fn describe(&self) -> String {
        format!("{} -> {}", self.source.name, self.target.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_deserialization() {
        let json = r#"{
            "declaring": "a.Item",
            "origin": {"kind": "companion_function", "name": "create", "params": []},
            "from": ["a.Entity"]
        }"#;
        let decl: MappingDecl = serde_json::from_str(json).unwrap();
        assert!(decl.origin.is_callable_scoped());
        assert_eq!(decl.origin.label(), "companion function");
    }

    #[test]
    fn test_origin_defaults_to_class() {
        let decl: MappingDecl = serde_json::from_str(r#"{"declaring": "a.Item"}"#).unwrap();
        assert_eq!(decl.origin, MappingOrigin::Class);
        assert!(decl.from.is_empty() && decl.to.is_empty());
    }

    #[test]
    fn test_rename_counterpart_is_opposite_the_declaring_type() {
        let spec = MappingSpec {
            direction: Direction::To,
            declaring: "a.User".to_owned(),
            source: TypeRef::new("a.User"),
            target: TypeRef::new("a.ApiUser"),
            callee: None,
            rename_scope: Vec::new(),
            skip_defaults: false,
            factory_qualifiers: Vec::new(),
            name_suffix: None,
        };
        assert_eq!(spec.rename_counterpart(), "a.ApiUser");
        let reversed = MappingSpec {
            direction: Direction::From,
            source: spec.target.clone(),
            target: spec.source.clone(),
            ..spec
        };
        assert_eq!(reversed.rename_counterpart(), "a.ApiUser");
        assert_eq!(reversed.describe(), "a.ApiUser -> a.User");
    }
}
