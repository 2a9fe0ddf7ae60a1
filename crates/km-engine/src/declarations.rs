//! Declaration validation and expansion.
//!
//! Providers are validated into [`ProviderEntry`]s before registration, and
//! every [`MappingDecl`] is expanded into one [`MappingSpec`] per counterpart.

use km_core::{
    CalleeDescriptor, CalleeRef, Direction, FieldDescriptor, FunctionRef, MappingDecl,
    MappingOrigin, MappingSpec, ProviderDecl, ProviderEntry, TypeDecl, TypeModel, Visibility,
    non_blank, signature_of, string_hash32,
};
use tracing::debug;

use crate::error::{EngineError, ProviderViolation, SpecViolation};

/// Validates a provider declaration.
///
/// Checks run in order: extension shape, visibility, top-level placement,
/// extra parameters. The first violation is reported.
///
/// # Errors
///
/// Returns [`EngineError::MalformedProvider`] naming the violated rule.
///
/// # Examples
///
/// ```
/// use km_core::{ProviderDecl, TypeRef};
/// use km_engine::validate_provider;
///
/// let decl = ProviderDecl::extension(
///     "com.acme",
///     "toEmail",
///     TypeRef::new("kotlin.String"),
///     TypeRef::new("com.acme.Email"),
/// );
/// let entry = validate_provider(&decl).unwrap();
/// assert_eq!(entry.function.to_string(), "com.acme.toEmail");
/// ```
pub fn validate_provider(decl: &ProviderDecl) -> Result<ProviderEntry, EngineError> {
    let violation = |v| EngineError::malformed_provider(decl.qualified_name(), v);

    let (Some(receiver), Some(returns)) = (&decl.receiver, &decl.returns) else {
        return Err(violation(ProviderViolation::NotExtension));
    };
    if decl.visibility == Visibility::Private {
        return Err(violation(ProviderViolation::Private));
    }
    if decl.enclosing.is_some() {
        return Err(violation(ProviderViolation::Nested));
    }
    if !decl.params.is_empty() {
        return Err(violation(ProviderViolation::ExtraParameters));
    }

    Ok(ProviderEntry::new(
        FunctionRef::new(decl.package.clone(), decl.name.clone()),
        receiver.clone(),
        returns.clone(),
        decl.qualifier.as_deref(),
    ))
}

/// Expands a mapping declaration into one spec per counterpart.
///
/// `from` counterparts map into the declaring type; `to` counterparts are
/// mapped from it. Constructor and companion-function declarations fix the
/// construction callable and accept only `from`.
///
/// # Errors
///
/// Returns [`EngineError::InvalidSpec`] for structural violations and
/// [`EngineError::UnknownType`] when a referenced type is not in the model.
pub fn expand_mapping<M>(model: &M, decl: &MappingDecl) -> Result<Vec<MappingSpec>, EngineError>
where
    M: TypeModel + ?Sized,
{
    if decl.from.is_empty() && decl.to.is_empty() {
        return Err(EngineError::invalid_spec(
            &decl.declaring,
            SpecViolation::NoDirection,
        ));
    }
    if decl.origin.is_callable_scoped() && !decl.to.is_empty() {
        return Err(EngineError::invalid_spec(
            &decl.declaring,
            SpecViolation::ToNotAllowed,
        ));
    }
    if decl
        .from
        .iter()
        .chain(&decl.to)
        .any(|name| *name == decl.declaring)
    {
        return Err(EngineError::invalid_spec(
            &decl.declaring,
            SpecViolation::SelfReference,
        ));
    }

    let declaring = lookup(model, &decl.declaring, &decl.declaring)?;
    let factory_qualifiers: Vec<String> = decl
        .factory_qualifiers
        .iter()
        .filter_map(|q| non_blank(Some(q.as_str())))
        .map(str::to_owned)
        .collect();

    let (callee, rename_scope, name_suffix) = origin_parts(declaring, &decl.origin);

    let mut specs = Vec::with_capacity(decl.from.len() + decl.to.len());
    for name in &decl.from {
        let counterpart = lookup(model, &decl.declaring, name)?;
        specs.push(MappingSpec {
            direction: Direction::From,
            declaring: decl.declaring.clone(),
            source: counterpart.star_projected(),
            target: declaring.star_projected(),
            callee: callee.clone(),
            rename_scope: rename_scope.clone(),
            skip_defaults: decl.skip_defaults,
            factory_qualifiers: factory_qualifiers.clone(),
            name_suffix: name_suffix.clone(),
        });
    }
    for name in &decl.to {
        let counterpart = lookup(model, &decl.declaring, name)?;
        specs.push(MappingSpec {
            direction: Direction::To,
            declaring: decl.declaring.clone(),
            source: declaring.star_projected(),
            target: counterpart.star_projected(),
            callee: None,
            rename_scope: declaring.fields.clone(),
            skip_defaults: decl.skip_defaults,
            factory_qualifiers: factory_qualifiers.clone(),
            name_suffix: None,
        });
    }

    debug!(
        declaring = %decl.declaring,
        origin = decl.origin.label(),
        specs = specs.len(),
        "Expanded mapping declaration"
    );
    Ok(specs)
}

fn lookup<'m, M>(model: &'m M, site: &str, name: &str) -> Result<&'m TypeDecl, EngineError>
where
    M: TypeModel + ?Sized,
{
    model
        .type_decl(name)
        .ok_or_else(|| EngineError::unknown_type(site, name))
}

/// Construction callable, rename scope and file-name suffix for an origin.
fn origin_parts(
    declaring: &TypeDecl,
    origin: &MappingOrigin,
) -> (Option<CalleeDescriptor>, Vec<FieldDescriptor>, Option<String>) {
    match origin {
        MappingOrigin::Class => (None, declaring.fields.clone(), None),
        MappingOrigin::Constructor { params } => {
            let callee = CalleeDescriptor::new(
                CalleeRef::Constructor {
                    owner: declaring.name.clone(),
                },
                declaring.star_projected(),
            )
            .with_params(params.clone());
            let suffix = format!("Ctor_{}", signature_hash(params));
            (Some(callee), params.clone(), Some(suffix))
        }
        MappingOrigin::CompanionFunction { name, params } => {
            let callee = CalleeDescriptor::new(
                CalleeRef::Member {
                    owner: format!("{}.Companion", declaring.name),
                    name: name.clone(),
                },
                declaring.star_projected(),
            )
            .with_params(params.clone());
            let suffix = format!("Func_{name}_{}", signature_hash(params));
            (Some(callee), params.clone(), Some(suffix))
        }
    }
}

/// File-name safe hash of a parameter signature (`-` becomes `M`).
fn signature_hash(params: &[FieldDescriptor]) -> String {
    string_hash32(&signature_of(params)).to_string().replace('-', "M")
}
