//! Custom converter declarations.
//!
//! A [`ProviderDecl`] is what declaration discovery reports; it is validated
//! into an immutable [`ProviderEntry`] before registration.

use serde::{Deserialize, Serialize};

use super::field::non_blank;
use super::{Expr, FieldDescriptor, FunctionRef, TypeRef};

/// Declared visibility of a provider function.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum Visibility {
    /// Visible everywhere.
    #[default]
    Public,
    /// Visible within the module.
    Internal,
    /// Visible only in its file.
    Private,
}

/// A provider function as declared, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderDecl {
    /// Function name.
    pub name: String,

    /// Declaring package.
    #[serde(default)]
    pub package: String,

    /// Extension receiver, `None` for a plain function.
    #[serde(default)]
    pub receiver: Option<TypeRef>,

    /// Return type, `None` when it could not be resolved.
    #[serde(default)]
    pub returns: Option<TypeRef>,

    /// Declared visibility.
    #[serde(default)]
    pub visibility: Visibility,

    /// Qualified name of the enclosing declaration, `None` when top-level.
    #[serde(default)]
    pub enclosing: Option<String>,

    /// Value parameters besides the receiver.
    #[serde(default)]
    pub params: Vec<FieldDescriptor>,

    /// Qualifier label.
    #[serde(default)]
    pub qualifier: Option<String>,
}

impl ProviderDecl {
    /// Creates a public, top-level extension declaration.
    #[must_use]
    pub fn extension(
        package: impl Into<String>,
        name: impl Into<String>,
        receiver: TypeRef,
        returns: TypeRef,
    ) -> Self {
        Self {
            name: name.into(),
            package: package.into(),
            receiver: Some(receiver),
            returns: Some(returns),
            visibility: Visibility::Public,
            enclosing: None,
            params: Vec::new(),
            qualifier: None,
        }
    }

    /// Sets the qualifier label.
    #[must_use]
    pub fn with_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifier = Some(qualifier.into());
        self
    }

    /// Fully qualified function name, for diagnostics.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        FunctionRef::new(self.package.clone(), self.name.clone()).to_string()
    }
}

/// A registered custom converter: `receiver -> returns`.
///
/// Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProviderEntry {
    /// Source type (the extension receiver).
    pub receiver: TypeRef,

    /// Target type.
    pub returns: TypeRef,

    /// Qualifier label, never blank.
    pub qualifier: Option<String>,

    /// The function to call.
    pub function: FunctionRef,
}

impl ProviderEntry {
    /// Creates an entry, normalizing a blank qualifier to `None`.
    #[must_use]
    pub fn new(
        function: FunctionRef,
        receiver: TypeRef,
        returns: TypeRef,
        qualifier: Option<&str>,
    ) -> Self {
        Self {
            receiver,
            returns,
            qualifier: non_blank(qualifier).map(str::to_owned),
            function,
        }
    }

    /// The qualifier label.
    #[inline]
    #[must_use]
    pub fn qualifier(&self) -> Option<&str> {
        self.qualifier.as_deref()
    }

    /// Builds the invocation of this provider on `receiver`.
    ///
    /// The null-safe form keeps the result optional when the receiver is null.
    #[must_use]
    pub fn invoke(&self, receiver: Expr, null_safe: bool) -> Expr {
        Expr::Call {
            receiver: Box::new(receiver),
            function: self.function.clone(),
            null_safe,
        }
    }
}
