//! Kotlin code emitter for the komap mapper generator.
//!
//! Turns the [`MapperUnit`]s produced by `km-engine` into Kotlin source
//! files: one file per unit, placed in the declaring type's package
//! directory under the configured output directory.
//!
//! # File Names
//!
//! | Direction | File stem |
//! |-----------|-----------|
//! | from      | `{Declaring}MapperFrom{Source}` |
//! | to        | `{Declaring}MapperTo{Target}` |
//!
//! Units from constructor- or companion-scoped declarations append
//! `_{suffix}` so several callables of one type don't collide.
//!
//! # Example
//!
//! ```
//! use km_core::{EmitConfig, EngineConfig, FieldDescriptor, Manifest, MappingDecl, TypeDecl, TypeRef};
//! use km_emit::Emitter;
//! use km_engine::BuildPass;
//!
//! let manifest = Manifest::default()
//!     .with_type(TypeDecl::new("com.acme.ApiUser")
//!         .with_field(FieldDescriptor::new("id", TypeRef::new("kotlin.Long"))))
//!     .with_type(TypeDecl::new("com.acme.User")
//!         .with_field(FieldDescriptor::new("id", TypeRef::new("kotlin.Long"))))
//!     .with_mapping(MappingDecl::on_class("com.acme.User").from_type("com.acme.ApiUser"));
//!
//! let pass = BuildPass::new(&manifest, &manifest.declarations, EngineConfig::default()).unwrap();
//! let output = pass.run();
//!
//! let emitter = Emitter::new(EmitConfig::default());
//! let files = emitter.render_all(&output.units).unwrap();
//! assert_eq!(files[0].path, "com/acme/UserMapperFromApiUser.kt");
//! assert!(files[0].contents.contains("fun ApiUser.toUser(): User {"));
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

mod error;
mod imports;
mod kotlin;

pub use error::EmitError;
pub use kotlin::{KotlinRenderer, render_expr};

use camino::{Utf8Path, Utf8PathBuf};
use km_core::{Direction, EmitConfig, FxHashMap, simple_name_of};
use km_engine::MapperUnit;
use tracing::{debug, info};

/// A rendered source file, not yet written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    /// Path relative to the output directory.
    pub path: Utf8PathBuf,
    /// Package of the file.
    pub package: String,
    /// Kotlin source text.
    pub contents: String,
}

/// Outcome of [`Emitter::write`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteSummary {
    /// Files created or replaced.
    pub written: Vec<Utf8PathBuf>,
    /// Files whose contents were already current.
    pub unchanged: Vec<Utf8PathBuf>,
}

/// File stem for a unit, without extension.
///
/// # Examples
///
/// ```
/// use km_core::{Direction, MappingSpec, TypeDecl, TypeRef};
/// use km_engine::assemble;
///
/// let user = TypeDecl::new("com.acme.User");
/// let spec = MappingSpec {
///     direction: Direction::To,
///     declaring: "com.acme.User".to_owned(),
///     source: user.star_projected(),
///     target: TypeRef::new("com.acme.api.UserDto"),
///     callee: None,
///     rename_scope: Vec::new(),
///     skip_defaults: false,
///     factory_qualifiers: Vec::new(),
///     name_suffix: Some("Ctor_12".to_owned()),
/// };
/// let unit = assemble(&spec, &user.primary_constructor(), Vec::new());
/// assert_eq!(km_emit::file_stem(&unit), "UserMapperToUserDto_Ctor_12");
/// ```
#[must_use]
pub fn file_stem(unit: &MapperUnit) -> String {
    let declaring = simple_name_of(&unit.declaring);
    let mut stem = match unit.direction {
        Direction::From => format!("{declaring}MapperFrom{}", unit.source.simple_name()),
        Direction::To => format!("{declaring}MapperTo{}", unit.target.simple_name()),
    };
    if let Some(suffix) = &unit.name_suffix {
        stem.push('_');
        stem.push_str(suffix);
    }
    stem
}

/// Renders units and writes them below the output directory.
#[derive(Debug, Clone, Default)]
pub struct Emitter {
    config: EmitConfig,
}

impl Emitter {
    /// Creates an emitter.
    #[inline]
    #[must_use]
    pub const fn new(config: EmitConfig) -> Self {
        Self { config }
    }

    /// The emitter configuration.
    #[inline]
    #[must_use]
    pub const fn config(&self) -> &EmitConfig {
        &self.config
    }

    /// Path of a unit's file relative to the output directory.
    #[must_use]
    pub fn relative_path(&self, unit: &MapperUnit) -> Utf8PathBuf {
        let mut path = Utf8PathBuf::new();
        for segment in unit.package.split('.').filter(|s| !s.is_empty()) {
            path.push(segment);
        }
        path.push(format!("{}.{}", file_stem(unit), self.config.file_extension));
        path
    }

    /// Renders one unit.
    #[must_use]
    pub fn render(&self, unit: &MapperUnit) -> GeneratedFile {
        GeneratedFile {
            path: self.relative_path(unit),
            package: unit.package.clone(),
            contents: KotlinRenderer::new(&self.config).render(unit),
        }
    }

    /// Renders every unit, rejecting units that map to the same file.
    ///
    /// # Errors
    ///
    /// Returns [`EmitError::DuplicateFile`] for the first collision.
    pub fn render_all(&self, units: &[MapperUnit]) -> Result<Vec<GeneratedFile>, EmitError> {
        let mut owners: FxHashMap<Utf8PathBuf, &MapperUnit> = FxHashMap::default();
        let mut files = Vec::with_capacity(units.len());
        for unit in units {
            let file = self.render(unit);
            if let Some(first) = owners.insert(file.path.clone(), unit) {
                return Err(EmitError::DuplicateFile {
                    path: file.path,
                    first: describe(first),
                    second: describe(unit),
                });
            }
            debug!(path = %file.path, bytes = file.contents.len(), "Rendered mapper");
            files.push(file);
        }
        Ok(files)
    }

    /// Writes files below the output directory, skipping files whose
    /// contents are already current.
    ///
    /// # Errors
    ///
    /// Returns [`EmitError::Io`] naming the path that could not be created,
    /// read or written.
    pub fn write(&self, files: &[GeneratedFile]) -> Result<WriteSummary, EmitError> {
        let mut summary = WriteSummary::default();
        for file in files {
            let path = self.config.output_dir.join(&file.path);
            if is_current(&path, &file.contents)? {
                summary.unchanged.push(path);
                continue;
            }
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| EmitError::io(parent, e))?;
            }
            std::fs::write(&path, &file.contents).map_err(|e| EmitError::io(&path, e))?;
            summary.written.push(path);
        }
        info!(
            output_dir = %self.config.output_dir,
            written = summary.written.len(),
            unchanged = summary.unchanged.len(),
            "Generated files written"
        );
        Ok(summary)
    }
}

fn is_current(path: &Utf8Path, contents: &str) -> Result<bool, EmitError> {
    match std::fs::read_to_string(path) {
        Ok(existing) => Ok(existing == contents),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(EmitError::io(path, e)),
    }
}

fn describe(unit: &MapperUnit) -> String {
    format!("{} -> {}", unit.source.name, unit.target.name)
}
