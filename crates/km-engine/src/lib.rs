//! Mapping resolution engine for the komap mapper generator.
//!
//! This crate decides, for every parameter of every requested mapper, which
//! expression produces its value. It consumes a read-only [`TypeModel`] and the
//! discovered [`Declarations`] and produces [`MapperUnit`]s for the emitter.
//!
//! # Overview
//!
//! The main entry point is [`BuildPass`], which combines:
//!
//! - [`ProviderRegistry`]: custom converters keyed by canonical type keys
//! - [`FactoryIndex`]: qualifier-aware selection of construction callables
//! - [`FieldResolver`]: the per-parameter precedence algorithm
//! - [`assemble`]: single, sequence and default-dropping mapper functions
//! - [`PassStats`]: atomic statistics for the pass
//!
//! # Example
//!
//! ```
//! use km_core::{EngineConfig, FieldDescriptor, Manifest, MappingDecl, RenameDirective, TypeDecl, TypeRef};
//! use km_engine::BuildPass;
//!
//! let manifest = Manifest::default()
//!     .with_type(TypeDecl::new("com.acme.ApiUser")
//!         .with_field(FieldDescriptor::new("userId", TypeRef::new("kotlin.Long"))))
//!     .with_type(TypeDecl::new("com.acme.User")
//!         .with_field(FieldDescriptor::new("id", TypeRef::new("kotlin.Long"))
//!             .with_rename(RenameDirective::new("userId"))))
//!     .with_mapping(MappingDecl::on_class("com.acme.User").from_type("com.acme.ApiUser"));
//!
//! let pass = BuildPass::new(&manifest, &manifest.declarations, EngineConfig::default()).unwrap();
//! let output = pass.run();
//! assert!(output.is_success());
//! assert_eq!(output.units[0].function_name(), "toUser");
//! ```
//!
//! # Architecture
//!
//! ```text
//! BuildPass::new (registration phase)
//!     │
//!     ├── validate_provider ──► ProviderRegistryBuilder ──► ProviderRegistry
//!     ├── FactoryIndex
//!     └── expand_mapping ──► MappingSpec per counterpart
//!
//! BuildPass::run (resolution phase, rayon across specs)
//!     │
//!     ├── callee: spec callee, factory, or primary constructor
//!     ├── FieldResolver ──► ResolvedParam per callee parameter
//!     └── assemble ──► MapperUnit
//! ```
//!
//! Registration completes, with every duplicate check evaluated, before any
//! lookup. After that the registry is only read.

#![deny(clippy::all)]
#![warn(missing_docs)]

mod assembly;
mod declarations;
mod error;
mod factory;
mod registry;
mod resolver;
mod stats;

#[cfg(test)]
mod eval;

pub use assembly::{FunctionShape, MapperFunction, MapperUnit, MissingParam, assemble};
pub use declarations::{expand_mapping, validate_provider};
pub use error::{EngineError, ProviderViolation, SpecViolation};
pub use factory::FactoryIndex;
pub use registry::{ProviderMatch, ProviderRegistry, ProviderRegistryBuilder, Relaxation};
pub use resolver::FieldResolver;
pub use stats::{PassStats, StatsSnapshot};

use km_core::{
    CalleeDescriptor, Declarations, EngineConfig, MappingSpec, ResolvedParam, TypeDecl, TypeModel,
};
use rayon::prelude::*;
use tracing::{debug, info, warn};

/// The result of resolving every spec of a pass.
#[derive(Debug)]
pub struct PassOutput {
    /// Assembled units, in spec order.
    pub units: Vec<MapperUnit>,
    /// Declaration and per-spec errors. A failed spec produces no unit.
    pub errors: Vec<EngineError>,
    /// Statistics at the end of the pass.
    pub stats: StatsSnapshot,
}

impl PassOutput {
    /// Returns `true` if no spec failed.
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// One build pass over a type model.
///
/// Construction is the registration phase; [`BuildPass::run`] is the
/// resolution phase.
#[derive(Debug)]
pub struct BuildPass<'m, M: ?Sized> {
    model: &'m M,
    config: EngineConfig,
    registry: ProviderRegistry,
    factories: FactoryIndex,
    specs: Vec<MappingSpec>,
    spec_errors: Vec<EngineError>,
    stats: PassStats,
}

impl<'m, M> BuildPass<'m, M>
where
    M: TypeModel + Sync + ?Sized,
{
    /// Registers providers and factories and expands mapping declarations.
    ///
    /// Invalid mapping declarations don't stop the pass; they are reported in
    /// [`PassOutput::errors`].
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Aborted`] with every diagnostic if any provider
    /// is malformed or conflicts with another.
    pub fn new(
        model: &'m M,
        declarations: &Declarations,
        config: EngineConfig,
    ) -> Result<Self, EngineError> {
        let mut builder = ProviderRegistryBuilder::new();
        let mut fatal = Vec::new();
        for decl in &declarations.providers {
            if let Err(e) = validate_provider(decl).and_then(|entry| builder.add(entry)) {
                warn!(provider = %decl.qualified_name(), error = %e, "Rejected provider");
                fatal.push(e);
            }
        }
        if !fatal.is_empty() {
            return Err(EngineError::Aborted(fatal));
        }
        let registry = builder.build();
        let factories = FactoryIndex::new(&declarations.factories);

        let mut specs = Vec::new();
        let mut spec_errors = Vec::new();
        for decl in &declarations.mappings {
            match expand_mapping(model, decl) {
                Ok(expanded) => specs.extend(expanded),
                Err(e) => {
                    warn!(declaring = %decl.declaring, error = %e, "Invalid mapping declaration");
                    spec_errors.push(e);
                }
            }
        }

        info!(
            providers = registry.len(),
            factories = factories.len(),
            specs = specs.len(),
            invalid = spec_errors.len(),
            "Build pass prepared"
        );

        Ok(Self {
            model,
            config,
            registry,
            factories,
            specs,
            spec_errors,
            stats: PassStats::new(),
        })
    }

    /// Expanded mapping specs, in declaration order.
    #[inline]
    #[must_use]
    pub fn specs(&self) -> &[MappingSpec] {
        &self.specs
    }

    /// Errors from invalid mapping declarations.
    #[inline]
    #[must_use]
    pub fn spec_errors(&self) -> &[EngineError] {
        &self.spec_errors
    }

    /// The provider registry.
    #[inline]
    #[must_use]
    pub const fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Current statistics.
    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// The callable that constructs a spec's target.
    ///
    /// A callable fixed by the declaration wins, then a resolved factory,
    /// then the target's primary constructor.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::DuplicateFactory`] for conflicting factories and
    /// [`EngineError::UnknownType`] if the target is not in the model.
    pub fn callee(&self, spec: &MappingSpec) -> Result<CalleeDescriptor, EngineError> {
        if let Some(callee) = &spec.callee {
            return Ok(callee.clone());
        }
        if let Some(factory) = self
            .factories
            .resolve(&spec.target.name, &spec.factory_qualifiers)?
        {
            return Ok(factory.clone());
        }
        self.model
            .type_decl(&spec.target.name)
            .map(TypeDecl::primary_constructor)
            .ok_or_else(|| EngineError::unknown_type(&spec.declaring, &spec.target.name))
    }

    /// Resolves a spec's callee and every callee parameter.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`BuildPass::callee`] and
    /// [`FieldResolver::resolve_all`].
    pub fn resolve(
        &self,
        spec: &MappingSpec,
    ) -> Result<(CalleeDescriptor, Vec<ResolvedParam>), EngineError> {
        let callee = self.callee(spec)?;
        let resolver = FieldResolver::new(self.model, &self.registry, &self.config, &self.stats);
        let params = resolver.resolve_all(spec, &callee.params)?;
        Ok((callee, params))
    }

    /// Resolves and assembles one spec.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`BuildPass::resolve`].
    pub fn assemble(&self, spec: &MappingSpec) -> Result<MapperUnit, EngineError> {
        self.stats.increment_specs();
        let result = self
            .resolve(spec)
            .map(|(callee, params)| assemble(spec, &callee, params));
        match &result {
            Ok(unit) => {
                self.stats.increment_mappers();
                debug!(
                    spec = %spec.describe(),
                    direction = %spec.direction,
                    missing = unit.missing().count(),
                    imports = unit.imports.len(),
                    "Assembled mapper"
                );
            }
            Err(e) => {
                self.stats.increment_errors();
                warn!(spec = %spec.describe(), error = %e, "Mapping spec failed");
            }
        }
        result
    }

    /// Resolves and assembles every spec.
    ///
    /// Specs are independent; when `engine.parallel` is set they are resolved
    /// with rayon. Unit order always follows spec order.
    #[must_use]
    pub fn run(&self) -> PassOutput {
        info!(
            specs = self.specs.len(),
            parallel = self.config.parallel,
            "Resolving mapping specs"
        );
        self.stats.reset();

        let mut units = Vec::with_capacity(self.specs.len());
        let mut errors = self.spec_errors.clone();
        for _ in &self.spec_errors {
            self.stats.increment_errors();
        }
        for result in self.assemble_all() {
            match result {
                Ok(unit) => units.push(unit),
                Err(e) => errors.push(e),
            }
        }

        let stats = self.stats.snapshot();
        info!(
            mappers = stats.mappers,
            errors = stats.errors,
            direct = stats.direct,
            converted = stats.converted,
            missing = stats.missing,
            omitted = stats.omitted,
            fallbacks = stats.fallbacks,
            "Build pass complete"
        );
        PassOutput {
            units,
            errors,
            stats,
        }
    }

    fn assemble_all(&self) -> Vec<Result<MapperUnit, EngineError>> {
        let sequential = || -> Vec<_> { self.specs.iter().map(|s| self.assemble(s)).collect() };
        if !self.config.parallel || self.specs.len() < 2 {
            return sequential();
        }
        let parallel = || -> Vec<_> { self.specs.par_iter().map(|s| self.assemble(s)).collect() };
        match self.config.max_parallel_jobs {
            None => parallel(),
            Some(jobs) => match rayon::ThreadPoolBuilder::new().num_threads(jobs).build() {
                Ok(pool) => pool.install(parallel),
                Err(e) => {
                    warn!(jobs, error = %e, "Failed to build thread pool, resolving sequentially");
                    sequential()
                }
            },
        }
    }
}
