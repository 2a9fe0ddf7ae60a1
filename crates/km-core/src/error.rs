//! Error types for the km-core crate.
//!
//! This module provides [`ConfigError`] for configuration loading,
//! [`ModelError`] for type-model manifests, and [`TypeSyntaxError`] for
//! malformed type expressions.

use camino::Utf8PathBuf;

/// Errors that can occur during configuration loading and validation.
///
/// # Examples
///
/// ```
/// use km_core::ConfigError;
///
/// let error = ConfigError::InvalidOption {
///     option: "emit.indent".to_owned(),
///     reason: "must be positive".to_owned(),
/// };
/// assert!(error.to_string().contains("emit.indent"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A configuration file does not exist.
    #[error("configuration file not found: {0}")]
    MissingFile(Utf8PathBuf),

    /// A configuration option has an invalid value.
    #[error("invalid configuration option '{option}': {reason}")]
    InvalidOption {
        /// The name of the invalid option.
        option: String,
        /// Explanation of why the option is invalid.
        reason: String,
    },

    /// An I/O error occurred while reading configuration.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A type expression that could not be parsed.
///
/// Carries the offending input and the byte offset where parsing stopped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid type expression '{input}' at offset {offset}: {reason}")]
pub struct TypeSyntaxError {
    /// The full input that failed to parse.
    pub input: String,
    /// Byte offset of the failure.
    pub offset: usize,
    /// What the parser expected.
    pub reason: &'static str,
}

/// Errors raised while loading or linking a type-model manifest.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// The manifest file could not be read.
    #[error("failed to read manifest {path}: {source}")]
    Read {
        /// Path of the manifest.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The manifest is not valid JSON or does not match the schema.
    #[error("failed to parse manifest: {0}")]
    Parse(#[from] serde_json::Error),

    /// A type expression inside the manifest is malformed.
    #[error(transparent)]
    TypeSyntax(#[from] TypeSyntaxError),

    /// Two type declarations share a qualified name.
    #[error("type '{0}' is declared more than once")]
    DuplicateType(String),

    /// An alias expands (directly or transitively) to itself.
    #[error("type alias '{0}' is cyclic")]
    AliasCycle(String),
}

impl ModelError {
    /// Creates a new [`ModelError::Read`] error.
    #[inline]
    pub fn read(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_option_display() {
        let error = ConfigError::InvalidOption {
            option: "engine.max_parallel_jobs".to_owned(),
            reason: "must be positive".to_owned(),
        };
        let msg = error.to_string();
        assert!(msg.contains("engine.max_parallel_jobs"));
        assert!(msg.contains("must be positive"));
    }

    #[test]
    fn test_type_syntax_display() {
        let error = TypeSyntaxError {
            input: "List<".to_owned(),
            offset: 5,
            reason: "expected a type name",
        };
        assert_eq!(
            error.to_string(),
            "invalid type expression 'List<' at offset 5: expected a type name"
        );
    }

    #[test]
    fn test_model_error_read_carries_path() {
        let err = ModelError::read(
            "model.json",
            std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        );
        assert!(err.to_string().contains("model.json"));
    }
}
