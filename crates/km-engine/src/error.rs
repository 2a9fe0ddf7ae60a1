//! Error types for the km-engine crate.
//!
//! This module provides [`EngineError`] for every diagnostic a build pass can
//! raise, together with the [`SpecViolation`] and [`ProviderViolation`]
//! reasons for malformed declarations.

use std::fmt;

use serde::Serialize;

/// Why a mapping declaration was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum SpecViolation {
    /// Neither `from` nor `to` lists a counterpart.
    NoDirection,
    /// A counterpart is the declaring type itself.
    SelfReference,
    /// `to` was used on a constructor or companion-function declaration.
    ToNotAllowed,
}

impl fmt::Display for SpecViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NoDirection => "must specify at least one of 'from' or 'to'",
            Self::SelfReference => "a counterpart cannot be the declaring type itself",
            Self::ToNotAllowed => "'to' is only allowed on class declarations",
        })
    }
}

/// Why a provider declaration was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ProviderViolation {
    /// Not an extension function, or its return type is unresolved.
    NotExtension,
    /// Declared `private`.
    Private,
    /// Declared inside a class or object rather than at the top level.
    Nested,
    /// Takes value parameters besides the receiver.
    ExtraParameters,
}

impl fmt::Display for ProviderViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NotExtension => "must be an extension function with a receiver and a return type",
            Self::Private => "must be public or internal",
            Self::Nested => "must be a top-level function",
            Self::ExtraParameters => "must not take parameters besides the receiver",
        })
    }
}

/// Errors that can occur during a build pass.
///
/// # Error Scope
///
/// - **Pass-wide** ([`is_fatal`](Self::is_fatal)): malformed or conflicting
///   providers. Registration must complete cleanly before any resolution, so
///   these abort the whole pass.
/// - **Spec-scoped**: everything else. The failing mapping spec produces no
///   output; other specs are still resolved and reported.
///
/// # Examples
///
/// ```
/// use km_engine::{EngineError, SpecViolation};
///
/// let err = EngineError::InvalidSpec {
///     declaring: "com.acme.User".to_owned(),
///     violation: SpecViolation::NoDirection,
/// };
/// assert!(!err.is_fatal());
/// assert_eq!(err.site(), Some("com.acme.User"));
/// ```
#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum EngineError {
    /// A mapping declaration is structurally invalid.
    #[error("invalid mapping declaration on {declaring}: {violation}")]
    InvalidSpec {
        /// Qualified name of the declaring type.
        declaring: String,
        /// What is wrong with it.
        violation: SpecViolation,
    },

    /// Two unqualified providers convert the same pair of types.
    #[error("duplicate provider for {receiver} -> {returns}: {duplicate} conflicts with {existing}; add a qualifier")]
    DuplicateProvider {
        /// Receiver key.
        receiver: String,
        /// Return key.
        returns: String,
        /// The provider registered first.
        existing: String,
        /// The provider rejected.
        duplicate: String,
    },

    /// Several factories for one target share a qualifier.
    #[error("duplicate factories for {target} with {}: {}", qualifier_label(.qualifier.as_deref()), .candidates.join(", "))]
    DuplicateFactory {
        /// Qualified name of the target type.
        target: String,
        /// The shared qualifier, `None` for unqualified factories.
        qualifier: Option<String>,
        /// Every conflicting callable.
        candidates: Vec<String>,
    },

    /// A qualifier was requested but no provider carries it.
    #[error("no provider for {receiver} -> {returns} with qualifier '{qualifier}' (required by {site})")]
    MissingQualifiedProvider {
        /// Where the qualifier was requested (`Type.param`).
        site: String,
        /// Receiver type.
        receiver: String,
        /// Requested return type.
        returns: String,
        /// The requested qualifier.
        qualifier: String,
    },

    /// A provider declaration does not have the required shape.
    #[error("invalid provider {function}: {violation}")]
    MalformedProvider {
        /// Qualified name of the function.
        function: String,
        /// What is wrong with it.
        violation: ProviderViolation,
    },

    /// A referenced type is not in the type model.
    #[error("unknown type {name} (referenced by {site})")]
    UnknownType {
        /// Where it was referenced.
        site: String,
        /// The missing type.
        name: String,
    },

    /// A type has no nameable declaration and cannot be keyed.
    #[error("type {0} cannot be keyed")]
    UnkeyableType(String),

    /// No conversion path exists and strict fallback is enabled.
    #[error("cannot map {source_type} to {target_type} for {site}")]
    Unresolvable {
        /// The target parameter (`Type.param`).
        site: String,
        /// Source field type.
        source_type: String,
        /// Target parameter type.
        target_type: String,
    },

    /// The pass was aborted; carries every fatal diagnostic.
    #[error("build pass aborted with {} error(s)", .0.len())]
    Aborted(Vec<EngineError>),
}

fn qualifier_label(qualifier: Option<&str>) -> String {
    qualifier.map_or_else(|| "no qualifier".to_owned(), |q| format!("qualifier '{q}'"))
}

impl EngineError {
    /// Creates a new [`EngineError::InvalidSpec`] error.
    #[inline]
    pub fn invalid_spec(declaring: impl Into<String>, violation: SpecViolation) -> Self {
        Self::InvalidSpec {
            declaring: declaring.into(),
            violation,
        }
    }

    /// Creates a new [`EngineError::MalformedProvider`] error.
    #[inline]
    pub fn malformed_provider(function: impl Into<String>, violation: ProviderViolation) -> Self {
        Self::MalformedProvider {
            function: function.into(),
            violation,
        }
    }

    /// Creates a new [`EngineError::UnknownType`] error.
    #[inline]
    pub fn unknown_type(site: impl Into<String>, name: impl Into<String>) -> Self {
        Self::UnknownType {
            site: site.into(),
            name: name.into(),
        }
    }

    /// Returns `true` for provider and factory conflicts.
    #[inline]
    #[must_use]
    pub const fn is_registry_conflict(&self) -> bool {
        matches!(
            self,
            Self::DuplicateProvider { .. } | Self::DuplicateFactory { .. }
        )
    }

    /// Returns `true` if this error aborts the whole pass rather than one spec.
    #[inline]
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::DuplicateProvider { .. } | Self::MalformedProvider { .. } | Self::Aborted(_)
        )
    }

    /// The declaration this error is reported on, if any.
    #[must_use]
    pub fn site(&self) -> Option<&str> {
        match self {
            Self::InvalidSpec { declaring, .. } => Some(declaring),
            Self::DuplicateProvider { duplicate, .. } => Some(duplicate),
            Self::DuplicateFactory { target, .. } => Some(target),
            Self::MissingQualifiedProvider { site, .. }
            | Self::UnknownType { site, .. }
            | Self::Unresolvable { site, .. } => Some(site),
            Self::MalformedProvider { function, .. } => Some(function),
            Self::UnkeyableType(_) | Self::Aborted(_) => None,
        }
    }

    /// Flattens [`EngineError::Aborted`] into its diagnostics.
    #[must_use]
    pub fn into_diagnostics(self) -> Vec<Self> {
        match self {
            Self::Aborted(errors) => errors.into_iter().flat_map(Self::into_diagnostics).collect(),
            other => vec![other],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_provider() {
        let err = EngineError::DuplicateProvider {
            receiver: "kotlin.String".to_owned(),
            returns: "a.Email".to_owned(),
            existing: "a.toEmail".to_owned(),
            duplicate: "b.toEmail".to_owned(),
        };
        assert!(err.is_registry_conflict());
        assert!(err.is_fatal());
        assert_eq!(err.site(), Some("b.toEmail"));
        assert!(err.to_string().contains("kotlin.String -> a.Email"));
    }

    #[test]
    fn test_duplicate_factory_display() {
        let err = EngineError::DuplicateFactory {
            target: "a.Entity".to_owned(),
            qualifier: None,
            candidates: vec!["a.make".to_owned(), "a.build".to_owned()],
        };
        assert!(err.is_registry_conflict());
        assert!(!err.is_fatal());
        assert_eq!(
            err.to_string(),
            "duplicate factories for a.Entity with no qualifier: a.make, a.build"
        );

        let err = EngineError::DuplicateFactory {
            target: "a.Entity".to_owned(),
            qualifier: Some("group".to_owned()),
            candidates: vec!["a.make".to_owned()],
        };
        assert!(err.to_string().contains("qualifier 'group'"));
    }

    #[test]
    fn test_malformed_provider() {
        let err = EngineError::malformed_provider("a.toRaw", ProviderViolation::Private);
        assert!(err.is_fatal());
        assert!(!err.is_registry_conflict());
        assert_eq!(
            err.to_string(),
            "invalid provider a.toRaw: must be public or internal"
        );
    }

    #[test]
    fn test_aborted_flattens() {
        let inner = EngineError::Aborted(vec![
            EngineError::malformed_provider("a.f", ProviderViolation::Nested),
            EngineError::UnkeyableType("?".to_owned()),
        ]);
        let err = EngineError::Aborted(vec![inner, EngineError::unknown_type("a.User", "a.Gone")]);
        assert_eq!(err.to_string(), "build pass aborted with 2 error(s)");
        assert_eq!(err.into_diagnostics().len(), 3);
    }

    #[test]
    fn test_spec_violation_display() {
        let err = EngineError::invalid_spec("a.Item", SpecViolation::ToNotAllowed);
        assert_eq!(
            err.to_string(),
            "invalid mapping declaration on a.Item: 'to' is only allowed on class declarations"
        );
        assert!(err.site().is_some());
    }
}
