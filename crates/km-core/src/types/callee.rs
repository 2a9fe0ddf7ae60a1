//! Constructor-like callables and function references.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::field::non_blank;
use super::{FieldDescriptor, TypeRef, simple_name_of};

/// A top-level function, addressable by package and name.
///
/// Ordered so import sets render deterministically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FunctionRef {
    /// Package the function is declared in (empty for the root package).
    pub package: String,
    /// Simple function name.
    pub name: String,
}

impl FunctionRef {
    /// Creates a function reference.
    #[must_use]
    pub fn new(package: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for FunctionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.package.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{}.{}", self.package, self.name)
        }
    }
}

/// How a target instance is constructed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CalleeRef {
    /// A constructor of `owner` (primary or secondary).
    Constructor {
        /// Qualified name of the constructed type.
        owner: String,
    },
    /// A member of an object or companion object.
    Member {
        /// Qualified name of the object holding the member (e.g. `a.Foo.Companion`).
        owner: String,
        /// Member function name.
        name: String,
    },
    /// A top-level function.
    Function(FunctionRef),
}

impl CalleeRef {
    /// Name used in diagnostics.
    #[must_use]
    pub fn display_name(&self) -> String {
        match self {
            Self::Constructor { owner } => format!("{owner}.<init>"),
            Self::Member { owner, name } => format!("{owner}.{name}"),
            Self::Function(function) => function.to_string(),
        }
    }

    /// The function that must be imported to call this callee, if any.
    #[must_use]
    pub const fn import(&self) -> Option<&FunctionRef> {
        match self {
            Self::Function(function) => Some(function),
            Self::Constructor { .. } | Self::Member { .. } => None,
        }
    }
}

/// A constructor or factory usable to build a target type.
///
/// # Examples
///
/// ```
/// use km_core::{CalleeDescriptor, CalleeRef, FunctionRef, TypeRef};
///
/// let factory = CalleeDescriptor::new(
///     CalleeRef::Function(FunctionRef::new("com.acme", "newGroup")),
///     TypeRef::new("com.acme.Entity"),
/// )
/// .with_qualifier("group");
///
/// assert_eq!(factory.target_name(), "com.acme.Entity");
/// assert_eq!(factory.qualifier(), Some("group"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CalleeDescriptor {
    /// Reference used by the emitter.
    pub callee: CalleeRef,

    /// The type returned by the callable.
    pub returns: TypeRef,

    /// Ordered parameters.
    #[serde(default)]
    pub params: Vec<FieldDescriptor>,

    /// Factory qualifier label.
    #[serde(default)]
    pub qualifier: Option<String>,
}

impl CalleeDescriptor {
    /// Creates a callee without parameters or qualifier.
    #[must_use]
    pub const fn new(callee: CalleeRef, returns: TypeRef) -> Self {
        Self {
            callee,
            returns,
            params: Vec::new(),
            qualifier: None,
        }
    }

    /// Sets the parameter list.
    #[must_use]
    pub fn with_params(mut self, params: Vec<FieldDescriptor>) -> Self {
        self.params = params;
        self
    }

    /// Sets the factory qualifier.
    #[must_use]
    pub fn with_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifier = Some(qualifier.into());
        self
    }

    /// The factory qualifier, ignoring blank values.
    #[must_use]
    pub fn qualifier(&self) -> Option<&str> {
        non_blank(self.qualifier.as_deref())
    }

    /// Qualified name of the type this callable builds.
    ///
    /// Constructors build their owner; functions build their (alias-expanded)
    /// return type.
    #[must_use]
    pub fn target_name(&self) -> String {
        match &self.callee {
            CalleeRef::Constructor { owner } => owner.clone(),
            CalleeRef::Member { .. } | CalleeRef::Function(_) => self.returns.expanded().name,
        }
    }

    /// Underscore-joined simple names of the parameter types.
    #[must_use]
    pub fn signature(&self) -> String {
        signature_of(&self.params)
    }
}

/// Underscore-joined simple names of the given parameter types.
#[must_use]
pub fn signature_of(params: &[FieldDescriptor]) -> String {
    params
        .iter()
        .map(|p| simple_name_of(&p.ty.name))
        .collect::<Vec<_>>()
        .join("_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructor_target_is_owner() {
        let ctor = CalleeDescriptor::new(
            CalleeRef::Constructor {
                owner: "com.acme.Item".to_owned(),
            },
            TypeRef::new("com.acme.Item"),
        );
        assert_eq!(ctor.target_name(), "com.acme.Item");
        assert_eq!(ctor.callee.display_name(), "com.acme.Item.<init>");
        assert!(ctor.callee.import().is_none());
    }

    #[test]
    fn test_function_target_expands_alias() {
        let returns = TypeRef::new("com.acme.Row").aliasing(TypeRef::new("com.acme.Entity"));
        let factory = CalleeDescriptor::new(
            CalleeRef::Function(FunctionRef::new("com.acme", "newRow")),
            returns,
        );
        assert_eq!(factory.target_name(), "com.acme.Entity");
        assert_eq!(
            factory.callee.import(),
            Some(&FunctionRef::new("com.acme", "newRow"))
        );
    }

    #[test]
    fn test_signature() {
        let params = vec![
            FieldDescriptor::new("name", TypeRef::new("kotlin.String")),
            FieldDescriptor::new("group", TypeRef::new("com.acme.AttributeId").nullable()),
        ];
        assert_eq!(signature_of(&params), "String_AttributeId");
    }

    #[test]
    fn test_callee_serde() {
        let json = r#"{"kind": "member", "owner": "a.Foo.Companion", "name": "create"}"#;
        let callee: CalleeRef = serde_json::from_str(json).unwrap();
        assert_eq!(callee.display_name(), "a.Foo.Companion.create");

        let json = r#"{"kind": "function", "package": "a", "name": "make"}"#;
        let callee: CalleeRef = serde_json::from_str(json).unwrap();
        assert_eq!(callee, CalleeRef::Function(FunctionRef::new("a", "make")));
    }
}
