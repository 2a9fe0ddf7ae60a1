//! Field resolution: deciding how every target parameter gets its value.
//!
//! [`FieldResolver`] walks the target parameters of a [`MappingSpec`] in
//! declaration order and produces one [`Resolution`] per parameter.
//!
//! # Precedence
//!
//! For each parameter:
//!
//! 1. Ignored parameters are missing.
//! 2. The effective source name comes from rename directives: source-side
//!    directives naming this parameter first, then the parameter's own
//!    directive scoped to the counterpart, then the parameter name.
//! 3. No source field with that name: an entity-level provider (receiver is
//!    the whole source) or missing.
//! 4. A directly assignable field is read as is.
//! 5. Otherwise a property-level provider, an entity-level provider,
//!    element-wise container mapping, and finally a permissive direct read.
//! 6. Missing parameters with a default are omitted when the mapping skips
//!    defaults; all others are supplied by the caller.
//!
//! A parameter carrying a qualifier tries the provider steps before direct
//! assignability and never falls back permissively.

use km_core::{
    Direction, EngineConfig, Expr, FieldDescriptor, MappingSpec, Resolution, ResolvedParam,
    TypeArg, TypeDecl, TypeModel, TypeRef,
};
use tracing::{debug, trace, warn};

use crate::error::EngineError;
use crate::registry::ProviderRegistry;
use crate::stats::PassStats;

/// `kotlin.collections.List`.
const LIST_TYPE: &str = "kotlin.collections.List";
/// `kotlin.collections.Set`.
const SET_TYPE: &str = "kotlin.collections.Set";
/// `kotlin.collections.Iterable`.
const ITERABLE_TYPE: &str = "kotlin.collections.Iterable";
/// `kotlin.collections.Map`.
const MAP_TYPE: &str = "kotlin.collections.Map";

/// Resolves target parameters against a source type.
///
/// Holds only shared references; one resolver can serve many specs, from
/// many threads.
#[derive(Debug)]
pub struct FieldResolver<'a, M: ?Sized> {
    model: &'a M,
    registry: &'a ProviderRegistry,
    config: &'a EngineConfig,
    stats: &'a PassStats,
}

impl<'a, M> FieldResolver<'a, M>
where
    M: TypeModel + ?Sized,
{
    /// Creates a resolver over a model and a built registry.
    #[must_use]
    pub const fn new(
        model: &'a M,
        registry: &'a ProviderRegistry,
        config: &'a EngineConfig,
        stats: &'a PassStats,
    ) -> Self {
        Self {
            model,
            registry,
            config,
            stats,
        }
    }

    /// Resolves every parameter of `params` in order.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownType`] if the source type is not in the
    /// model, and the first error of [`FieldResolver::resolve`].
    pub fn resolve_all(
        &self,
        spec: &MappingSpec,
        params: &[FieldDescriptor],
    ) -> Result<Vec<ResolvedParam>, EngineError> {
        let source = self
            .model
            .type_decl(&spec.source.name)
            .ok_or_else(|| EngineError::unknown_type(&spec.declaring, &spec.source.name))?;

        params
            .iter()
            .map(|param| {
                let resolution = self.resolve(spec, source, param)?;
                self.stats.record_resolution(&resolution);
                Ok(ResolvedParam {
                    param: param.clone(),
                    resolution,
                })
            })
            .collect()
    }

    /// Resolves a single target parameter.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::MissingQualifiedProvider`] when the parameter
    /// names a qualifier no provider step satisfies, and
    /// [`EngineError::Unresolvable`] when strict fallback is enabled and no
    /// conversion path exists.
    pub fn resolve(
        &self,
        spec: &MappingSpec,
        source: &TypeDecl,
        param: &FieldDescriptor,
    ) -> Result<Resolution, EngineError> {
        if param.ignored {
            trace!(param = %param.name, "Ignored parameter");
            return Ok(missing(spec, param));
        }

        let name = effective_name(spec, param);
        let qualifier = param.qualifier();
        let target = &param.ty;

        let Some(field) = source.field(name) else {
            let hit = self.registry.resolve(&spec.source, target, qualifier);
            let hit = hit.map_err(|_| missing_qualified(spec, param, &spec.source))?;
            return Ok(match hit {
                Some(hit) => Resolution::converted(hit.entry.invoke(Expr::Source, hit.null_safe)),
                None => missing(spec, param),
            });
        };

        if let Some(qualifier) = qualifier {
            return self
                .converted(spec, field, target, Some(qualifier))
                .ok_or_else(|| missing_qualified(spec, param, &field.ty));
        }

        if self.is_assignable(&field.ty, target) {
            return Ok(Resolution::Direct {
                expr: Expr::field(&field.name),
            });
        }

        if let Some(resolution) = self.converted(spec, field, target, None) {
            return Ok(resolution);
        }

        if self.config.strict_fallback {
            return Err(EngineError::Unresolvable {
                site: site(spec, param),
                source_type: field.ty.to_string(),
                target_type: target.to_string(),
            });
        }
        warn!(
            site = %site(spec, param),
            source_type = %field.ty,
            target_type = %target,
            "No conversion path, emitting a direct read"
        );
        self.stats.increment_fallbacks();
        Ok(Resolution::Direct {
            expr: Expr::field(&field.name),
        })
    }

    /// Property provider, entity provider, then container mapping.
    fn converted(
        &self,
        spec: &MappingSpec,
        field: &FieldDescriptor,
        target: &TypeRef,
        qualifier: Option<&str>,
    ) -> Option<Resolution> {
        if let Some(hit) = self.registry.lookup(&field.ty, target, qualifier) {
            return Some(Resolution::converted(
                hit.entry.invoke(Expr::field(&field.name), hit.null_safe),
            ));
        }
        if let Some(hit) = self.registry.lookup(&spec.source, target, qualifier) {
            return Some(Resolution::converted(
                hit.entry.invoke(Expr::Source, hit.null_safe),
            ));
        }
        self.container(Expr::field(&field.name), &field.ty, target, qualifier)
            .inspect(|_| debug!(field = %field.name, target = %target, "Mapped container element-wise"))
            .map(Resolution::converted)
    }

    /// Element-wise mapping between containers of the same shape.
    ///
    /// Every element type must resolve or the whole attempt fails.
    fn container(
        &self,
        receiver: Expr,
        src: &TypeRef,
        dst: &TypeRef,
        qualifier: Option<&str>,
    ) -> Option<Expr> {
        let src = src.deep_expanded();
        let dst = dst.deep_expanded();
        if src.name != dst.name || (src.nullable && !dst.nullable) {
            return None;
        }
        let null_safe = src.nullable;

        match src.name.as_str() {
            LIST_TYPE | SET_TYPE | ITERABLE_TYPE => {
                let element = self.element(Expr::Element, src.arg(0)?, dst.arg(0)?, qualifier)?;
                Some(Expr::MapElements {
                    receiver: Box::new(receiver),
                    element: Box::new(element),
                    null_safe,
                    dedup: dst.name == SET_TYPE,
                })
            }
            MAP_TYPE => {
                let key = self.element(Expr::EntryKey, src.arg(0)?, dst.arg(0)?, qualifier)?;
                let value = self.element(Expr::EntryValue, src.arg(1)?, dst.arg(1)?, qualifier)?;
                Some(Expr::MapEntries {
                    receiver: Box::new(receiver),
                    key: Box::new(key),
                    value: Box::new(value),
                    null_safe,
                })
            }
            _ => None,
        }
    }

    /// A provider on the element, else the element itself when assignable.
    ///
    /// Under a qualifier every element must go through a provider carrying
    /// it; there is no identity fallback.
    fn element(
        &self,
        receiver: Expr,
        src: &TypeRef,
        dst: &TypeRef,
        qualifier: Option<&str>,
    ) -> Option<Expr> {
        if let Some(hit) = self.registry.lookup(src, dst, qualifier) {
            return Some(hit.entry.invoke(receiver, hit.null_safe));
        }
        if qualifier.is_some() {
            trace!(source_type = %src, target_type = %dst, "No qualified provider for element");
            return None;
        }
        self.is_assignable(src, dst).then_some(receiver)
    }

    /// Whether a value of `src` can be passed where `dst` is expected.
    ///
    /// Aliases are expanded at every level. Nullable never flows into
    /// non-null. Same declarations compare their type arguments covariantly,
    /// with `*` on the target accepting anything; different declarations
    /// defer to the model's subtype relation when the target is not
    /// parameterized.
    #[must_use]
    pub fn is_assignable(&self, src: &TypeRef, dst: &TypeRef) -> bool {
        self.assignable_expanded(&src.deep_expanded(), &dst.deep_expanded())
    }

    fn assignable_expanded(&self, src: &TypeRef, dst: &TypeRef) -> bool {
        if src.nullable && !dst.nullable {
            return false;
        }
        if src.name == dst.name {
            if dst.args.is_empty() {
                return true;
            }
            return src.args.len() == dst.args.len()
                && src.args.iter().zip(&dst.args).all(|pair| match pair {
                    (_, TypeArg::Star) => true,
                    (TypeArg::Star, TypeArg::Type(_)) => false,
                    (TypeArg::Type(s), TypeArg::Type(d)) => self.assignable_expanded(s, d),
                });
        }
        dst.args.iter().all(|arg| matches!(arg, TypeArg::Star))
            && self.model.is_subtype(&src.name, &dst.name)
    }
}

/// The source field name a parameter reads from.
///
/// A parameter's own renames are scoped against the source type in both
/// directions. In the to direction the declaring side's renames are searched
/// first, scoped against the target.
fn effective_name<'p>(spec: &'p MappingSpec, param: &'p FieldDescriptor) -> &'p str {
    if spec.direction == Direction::To {
        let counterpart = spec.rename_counterpart();
        let inverse = spec
            .rename_scope
            .iter()
            .find(|f| f.rename_for(counterpart) == Some(param.name.as_str()));
        if let Some(field) = inverse {
            return &field.name;
        }
    }
    param.rename_for(&spec.source.name).unwrap_or(param.name.as_str())
}

fn missing(spec: &MappingSpec, param: &FieldDescriptor) -> Resolution {
    if param.has_default && spec.skip_defaults {
        Resolution::Omitted
    } else {
        Resolution::Missing {
            required: true,
            has_default: param.has_default,
        }
    }
}

fn site(spec: &MappingSpec, param: &FieldDescriptor) -> String {
    format!("{}.{}", spec.target.name, param.name)
}

fn missing_qualified(spec: &MappingSpec, param: &FieldDescriptor, receiver: &TypeRef) -> EngineError {
    EngineError::MissingQualifiedProvider {
        site: site(spec, param),
        receiver: receiver.to_string(),
        returns: param.ty.to_string(),
        qualifier: param.qualifier().unwrap_or_default().to_owned(),
    }
}
