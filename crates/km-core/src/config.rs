//! Configuration structures for the komap generator.
//!
//! - [`EngineConfig`] - Resolution settings (fallback policy, parallelism)
//! - [`EmitConfig`] - Output settings (directory, extension, indentation)
//! - [`Config`] - Root configuration combining all settings
//!
//! All configuration types implement [`Default`], and every field may be
//! omitted from a configuration file.

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Configuration for the resolution engine.
///
/// # Examples
///
/// ```
/// use km_core::EngineConfig;
///
/// let config = EngineConfig::default();
/// assert!(!config.strict_fallback);
/// assert!(config.parallel);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Report a parameter with no conversion path as an error instead of
    /// emitting a raw field read.
    pub strict_fallback: bool,

    /// Resolve independent mapping specs in parallel.
    pub parallel: bool,

    /// Maximum number of parallel resolution jobs.
    /// `None` means use all available CPU cores.
    pub max_parallel_jobs: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            strict_fallback: false,
            parallel: true,
            max_parallel_jobs: None,
        }
    }
}

/// Configuration for the code emitter.
///
/// # Examples
///
/// ```
/// use km_core::EmitConfig;
///
/// let config = EmitConfig::default();
/// assert_eq!(config.file_extension, "kt");
/// assert_eq!(config.indent, 4);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmitConfig {
    /// Directory generated files are written to.
    pub output_dir: Utf8PathBuf,

    /// Extension of generated files, without the dot.
    pub file_extension: String,

    /// Spaces per indentation level.
    pub indent: usize,

    /// Comment placed at the top of every generated file.
    pub header_comment: Option<String>,
}

impl Default for EmitConfig {
    fn default() -> Self {
        Self {
            output_dir: Utf8PathBuf::from("generated"),
            file_extension: "kt".to_owned(),
            indent: 4,
            header_comment: None,
        }
    }
}

/// Root configuration for komap.
///
/// # Examples
///
/// ```
/// use km_core::Config;
///
/// let config: Config = serde_json::from_str(r#"{"engine": {"strict_fallback": true}}"#).unwrap();
/// assert!(config.engine.strict_fallback);
/// assert_eq!(config.emit.indent, 4);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Engine configuration.
    pub engine: EngineConfig,

    /// Emitter configuration.
    pub emit: EmitConfig,
}

impl Config {
    /// Loads and validates a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingFile`] if the path does not exist,
    /// [`ConfigError::Io`] or [`ConfigError::Parse`] if it cannot be read, and
    /// the errors of [`Config::validate`].
    pub fn from_file(path: &Utf8Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::MissingFile(path.to_owned()));
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks option values that deserialization cannot.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOption`] naming the first bad option.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.max_parallel_jobs == Some(0) {
            return Err(invalid("engine.max_parallel_jobs", "must be positive"));
        }
        if self.emit.indent == 0 {
            return Err(invalid("emit.indent", "must be positive"));
        }
        let ext = self.emit.file_extension.trim();
        if ext.is_empty() {
            return Err(invalid("emit.file_extension", "must not be empty"));
        }
        if ext.starts_with('.') {
            return Err(invalid("emit.file_extension", "must not start with '.'"));
        }
        Ok(())
    }
}

fn invalid(option: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidOption {
        option: option.to_owned(),
        reason: reason.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_config_defaults() {
        let config = EngineConfig::default();
        assert!(!config.strict_fallback);
        assert!(config.parallel);
        assert_eq!(config.max_parallel_jobs, None);
    }

    #[test]
    fn test_emit_config_defaults() {
        let config = EmitConfig::default();
        assert_eq!(config.output_dir, "generated");
        assert_eq!(config.file_extension, "kt");
        assert_eq!(config.indent, 4);
        assert!(config.header_comment.is_none());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_config_deserialize_with_missing_fields() {
        let json = r#"{"emit": {"indent": 2}}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.emit.indent, 2);
        // Other fields should have defaults
        assert_eq!(config.emit.file_extension, "kt");
        assert!(config.engine.parallel);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.emit.indent = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidOption { option, .. }) if option == "emit.indent"
        ));

        let mut config = Config::default();
        config.engine.max_parallel_jobs = Some(0);
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.emit.file_extension = ".kt".to_owned();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("komap.json")).unwrap();
        assert!(matches!(
            Config::from_file(&path),
            Err(ConfigError::MissingFile(_))
        ));

        std::fs::write(&path, r#"{"engine": {"parallel": false}}"#).unwrap();
        let config = Config::from_file(&path).unwrap();
        assert!(!config.engine.parallel);
    }
}
