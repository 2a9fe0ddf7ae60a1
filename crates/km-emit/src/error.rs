//! Error types for the km-emit crate.

use camino::Utf8PathBuf;

/// Errors raised while emitting generated files.
///
/// # Examples
///
/// ```
/// use camino::Utf8PathBuf;
/// use km_emit::EmitError;
///
/// let error = EmitError::DuplicateFile {
///     path: Utf8PathBuf::from("com/acme/UserMapperFromApiUser.kt"),
///     first: "com.acme.api.ApiUser -> com.acme.User".to_owned(),
///     second: "com.acme.legacy.ApiUser -> com.acme.User".to_owned(),
/// };
/// assert!(error.to_string().contains("UserMapperFromApiUser.kt"));
/// assert!(!error.is_io());
/// ```
#[derive(Debug, thiserror::Error)]
pub enum EmitError {
    /// Two mapper units would be written to the same file.
    #[error("generated file {path} is produced by both '{first}' and '{second}'")]
    DuplicateFile {
        /// Relative path of the colliding file.
        path: Utf8PathBuf,
        /// The mapping that claimed the path first.
        first: String,
        /// The mapping that collided with it.
        second: String,
    },

    /// A file or directory could not be written.
    #[error("failed to write {path}: {source}")]
    Io {
        /// Path being written.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl EmitError {
    /// Creates an [`EmitError::Io`] for `path`.
    #[must_use]
    pub fn io(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns `true` if this error came from the file system.
    #[inline]
    #[must_use]
    pub const fn is_io(&self) -> bool {
        matches!(self, Self::Io { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_display() {
        let error = EmitError::io(
            "out/com/acme/A.kt",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let msg = error.to_string();
        assert!(msg.contains("out/com/acme/A.kt"));
        assert!(msg.contains("denied"));
        assert!(error.is_io());
    }
}
