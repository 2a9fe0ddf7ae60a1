//! Core types, errors, and utilities for the komap mapper generator.
//!
//! This crate provides the foundational types used across the workspace:
//!
//! - The data model: [`TypeRef`], [`FieldDescriptor`], [`CalleeDescriptor`],
//!   [`ProviderEntry`], [`Resolution`] and [`MappingSpec`]
//! - The Type Key Canonicalizer ([`canonical_key`])
//! - The type-model provider interface ([`TypeModel`]) and its JSON
//!   [`Manifest`] implementation
//! - Configuration structures and error types
//! - Type aliases for `FxHashMap`/`FxHashSet` (faster than std)

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod hash;
pub mod key;
pub mod model;
pub mod types;

pub use config::{Config, EmitConfig, EngineConfig};
pub use error::{ConfigError, ModelError, TypeSyntaxError};
pub use hash::{FxHashMap, FxHashSet, fx_hash_map, fx_hash_set, string_hash32};
pub use key::{CanonicalKey, canonical_key, key_pair};
pub use model::{ANY_TYPE, Declarations, Manifest, TypeDecl, TypeModel};
pub use types::*;
