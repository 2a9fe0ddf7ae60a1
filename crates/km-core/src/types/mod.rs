//! Domain types for the komap mapper generator.
//!
//! # Module Organization
//!
//! - [`type_ref`] - Type references and the type-expression parser
//! - [`field`] - Fields, parameters and rename directives
//! - [`callee`] - Constructors, factories and function references
//! - [`provider`] - Custom converter declarations and registry entries
//! - [`mapping`] - Mapping declarations and per-mapper specs
//! - [`resolution`] - Mapping expressions and per-parameter resolutions
//!
//! All public types are re-exported here and at the crate root:
//!
//! ```
//! use km_core::{FieldDescriptor, Resolution, TypeRef};
//! ```

pub mod callee;
pub mod field;
pub mod mapping;
pub mod provider;
pub mod resolution;
pub mod type_ref;

pub use callee::{CalleeDescriptor, CalleeRef, FunctionRef, signature_of};
pub use field::{FieldDescriptor, RenameDirective, non_blank};
pub use mapping::{Direction, MappingDecl, MappingOrigin, MappingSpec};
pub use provider::{ProviderDecl, ProviderEntry, Visibility};
pub use resolution::{Expr, Resolution, ResolvedParam};
pub use type_ref::{TypeArg, TypeRef, package_of, simple_name_of};
