//! Mapper assembly: turning resolved parameters into generated functions.
//!
//! A [`MapperUnit`] is everything the emitter needs for one generated file:
//! the construction callee, the per-parameter resolutions in target order,
//! the functions to emit and the provider imports.
//!
//! # Functions
//!
//! - A single-instance mapper taking the source plus every missing parameter.
//! - A sequence mapper over `Iterable<Source>` taking one supplier per
//!   missing parameter.
//! - When some missing parameters have defaults, a second single/sequence
//!   pair that drops those parameters and lets the target defaults apply.

use std::collections::BTreeSet;

use km_core::{
    CalleeDescriptor, CalleeRef, Direction, FunctionRef, MappingSpec, Resolution, ResolvedParam,
    TypeRef,
};
use serde::Serialize;

/// Whether a generated function maps one instance or a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FunctionShape {
    /// `Source.toTarget(...)`.
    Single,
    /// `Iterable<Source>.toTarget(...)` returning a list.
    Sequence,
}

/// A parameter the generated function takes from its caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingParam {
    /// Parameter name.
    pub name: String,
    /// Parameter type.
    #[serde(rename = "type")]
    pub ty: TypeRef,
    /// Whether the target declares a default for it.
    pub has_default: bool,
}

/// One generated function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MapperFunction {
    /// Single or sequence.
    pub shape: FunctionShape,
    /// Caller-supplied parameters, in target order.
    pub params: Vec<MissingParam>,
    /// Missing parameters left out of construction so their defaults apply.
    pub omitted: Vec<String>,
}

impl MapperFunction {
    /// Returns `true` for the overloads that drop defaultable parameters.
    #[inline]
    #[must_use]
    pub fn is_default_overload(&self) -> bool {
        !self.omitted.is_empty()
    }
}

/// Everything needed to emit one mapper file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MapperUnit {
    /// Direction relative to the declaring type.
    pub direction: Direction,
    /// Qualified name of the declaring type.
    pub declaring: String,
    /// Package of the generated file.
    pub package: String,
    /// Disambiguating file-name suffix.
    pub name_suffix: Option<String>,
    /// Source type.
    pub source: TypeRef,
    /// Target type.
    pub target: TypeRef,
    /// How the target is constructed.
    pub callee: CalleeRef,
    /// Target parameters with their resolutions, in target order.
    pub params: Vec<ResolvedParam>,
    /// Functions to generate.
    pub functions: Vec<MapperFunction>,
    /// Functions to import: providers and a top-level factory.
    pub imports: BTreeSet<FunctionRef>,
}

impl MapperUnit {
    /// Name of every generated function (`to{Target}`).
    #[must_use]
    pub fn function_name(&self) -> String {
        format!("to{}", self.target.simple_name())
    }

    /// Parameters the caller supplies, in target order.
    pub fn missing(&self) -> impl Iterator<Item = &ResolvedParam> {
        self.params.iter().filter(|p| p.resolution.is_missing())
    }

    /// Returns `true` if the default-dropping overloads are generated.
    #[must_use]
    pub fn has_default_overloads(&self) -> bool {
        self.functions.iter().any(MapperFunction::is_default_overload)
    }
}

/// Assembles a unit from a spec, its construction callee and the resolved
/// callee parameters.
///
/// # Examples
///
/// ```
/// use km_core::{FieldDescriptor, TypeDecl, TypeRef, MappingSpec, Direction, Resolution, ResolvedParam};
/// use km_engine::{assemble, FunctionShape};
///
/// let target = TypeDecl::new("com.acme.User");
/// let spec = MappingSpec {
///     direction: Direction::From,
///     declaring: "com.acme.User".to_owned(),
///     source: TypeRef::new("com.acme.ApiUser"),
///     target: target.star_projected(),
///     callee: None,
///     rename_scope: Vec::new(),
///     skip_defaults: false,
///     factory_qualifiers: Vec::new(),
///     name_suffix: None,
/// };
/// let role = ResolvedParam {
///     param: FieldDescriptor::new("role", TypeRef::new("kotlin.String")),
///     resolution: Resolution::Missing { required: true, has_default: false },
/// };
///
/// let unit = assemble(&spec, &target.primary_constructor(), vec![role]);
/// assert_eq!(unit.function_name(), "toUser");
/// assert_eq!(unit.functions.len(), 2);
/// assert_eq!(unit.functions[1].shape, FunctionShape::Sequence);
/// assert_eq!(unit.functions[1].params[0].name, "role");
/// ```
#[must_use]
pub fn assemble(
    spec: &MappingSpec,
    callee: &CalleeDescriptor,
    params: Vec<ResolvedParam>,
) -> MapperUnit {
    let missing: Vec<MissingParam> = params
        .iter()
        .filter_map(|p| match p.resolution {
            Resolution::Missing { has_default, .. } => Some(MissingParam {
                name: p.param.name.clone(),
                ty: p.param.ty.clone(),
                has_default,
            }),
            _ => None,
        })
        .collect();

    let mut functions = vec![
        MapperFunction {
            shape: FunctionShape::Single,
            params: missing.clone(),
            omitted: Vec::new(),
        },
        MapperFunction {
            shape: FunctionShape::Sequence,
            params: missing.clone(),
            omitted: Vec::new(),
        },
    ];

    let (defaultable, required): (Vec<_>, Vec<_>) =
        missing.into_iter().partition(|p| p.has_default);
    if !defaultable.is_empty() {
        let omitted: Vec<String> = defaultable.into_iter().map(|p| p.name).collect();
        for shape in [FunctionShape::Single, FunctionShape::Sequence] {
            functions.push(MapperFunction {
                shape,
                params: required.clone(),
                omitted: omitted.clone(),
            });
        }
    }

    let mut imports: BTreeSet<FunctionRef> = params
        .iter()
        .filter_map(|p| match &p.resolution {
            Resolution::Converted { imports, .. } => Some(imports.iter().cloned()),
            _ => None,
        })
        .flatten()
        .collect();
    if let Some(function) = callee.callee.import() {
        imports.insert(function.clone());
    }

    MapperUnit {
        direction: spec.direction,
        declaring: spec.declaring.clone(),
        package: km_core::package_of(&spec.declaring).to_owned(),
        name_suffix: spec.name_suffix.clone(),
        source: spec.source.clone(),
        target: spec.target.clone(),
        callee: callee.callee.clone(),
        params,
        functions,
        imports,
    }
}

#[cfg(test)]
mod tests {
    use km_core::{Expr, FieldDescriptor};

    use super::*;

    fn spec() -> MappingSpec {
        MappingSpec {
            direction: Direction::To,
            declaring: "a.b.User".to_owned(),
            source: TypeRef::new("a.b.User"),
            target: TypeRef::new("c.ApiUser"),
            callee: None,
            rename_scope: Vec::new(),
            skip_defaults: false,
            factory_qualifiers: Vec::new(),
            name_suffix: None,
        }
    }

    fn constructor() -> CalleeDescriptor {
        CalleeDescriptor::new(
            CalleeRef::Constructor {
                owner: "c.ApiUser".to_owned(),
            },
            TypeRef::new("c.ApiUser"),
        )
    }

    fn resolved(name: &str, resolution: Resolution) -> ResolvedParam {
        ResolvedParam {
            param: FieldDescriptor::new(name, TypeRef::new("kotlin.String")),
            resolution,
        }
    }

    fn missing(has_default: bool) -> Resolution {
        Resolution::Missing {
            required: true,
            has_default,
        }
    }

    #[test]
    fn test_no_missing_params() {
        let params = vec![resolved("id", Resolution::Direct { expr: Expr::field("id") })];
        let unit = assemble(&spec(), &constructor(), params);
        assert_eq!(unit.functions.len(), 2);
        assert!(unit.functions.iter().all(|f| f.params.is_empty()));
        assert!(!unit.has_default_overloads());
        assert!(unit.imports.is_empty());
        assert_eq!(unit.package, "a.b");
        assert_eq!(unit.function_name(), "toApiUser");
    }

    #[test]
    fn test_default_overloads() {
        let params = vec![
            resolved("role", missing(false)),
            resolved("id", Resolution::Direct { expr: Expr::field("id") }),
            resolved("note", missing(true)),
            resolved("tier", Resolution::Omitted),
        ];
        let unit = assemble(&spec(), &constructor(), params);
        assert_eq!(unit.functions.len(), 4);
        assert!(unit.has_default_overloads());

        let full = &unit.functions[0];
        let names: Vec<_> = full.params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["role", "note"]);

        let overload = &unit.functions[2];
        assert_eq!(overload.shape, FunctionShape::Single);
        assert_eq!(overload.params.len(), 1);
        assert_eq!(overload.params[0].name, "role");
        assert_eq!(overload.omitted, ["note"]);
        assert_eq!(unit.functions[3].shape, FunctionShape::Sequence);

        let missing: Vec<_> = unit.missing().map(ResolvedParam::name).collect();
        assert_eq!(missing, ["role", "note"]);
    }

    #[test]
    fn test_imports_include_providers_and_factory() {
        let to_email = FunctionRef::new("p", "toEmail");
        let factory = FunctionRef::new("c", "newApiUser");
        let params = vec![resolved(
            "email",
            Resolution::converted(Expr::Call {
                receiver: Box::new(Expr::field("email")),
                function: to_email.clone(),
                null_safe: false,
            }),
        )];
        let callee = CalleeDescriptor::new(CalleeRef::Function(factory.clone()), TypeRef::new("c.ApiUser"));
        let unit = assemble(&spec(), &callee, params);
        assert_eq!(unit.imports.into_iter().collect::<Vec<_>>(), vec![factory, to_email]);
    }

    #[test]
    fn test_companion_callee_needs_no_import() {
        let callee = CalleeDescriptor::new(
            CalleeRef::Member {
                owner: "c.ApiUser.Companion".to_owned(),
                name: "create".to_owned(),
            },
            TypeRef::new("c.ApiUser"),
        );
        let unit = assemble(&spec(), &callee, Vec::new());
        assert!(unit.imports.is_empty());
    }
}
