//! The type-model provider interface and its JSON manifest implementation.
//!
//! The engine never inspects source code. It reads declarations through
//! [`TypeModel`], which answers "what does this type look like" with immutable
//! [`TypeDecl`]s. [`Manifest`] is the file-backed implementation: a JSON
//! document listing types, aliases and the declarations that drive mapper
//! generation.
//!
//! # Examples
//!
//! ```
//! use km_core::{Manifest, TypeModel};
//!
//! let manifest = Manifest::from_json(r#"{
//!     "types": [
//!         {"name": "com.acme.Email", "fields": [{"name": "raw", "type": "kotlin.String"}]}
//!     ],
//!     "aliases": {"com.acme.UserId": "kotlin.Long"}
//! }"#).unwrap();
//!
//! let email = manifest.type_decl("com.acme.Email").unwrap();
//! assert_eq!(email.fields.len(), 1);
//! ```

use std::collections::BTreeMap;

use camino::Utf8Path;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::ModelError;
use crate::types::{
    CalleeDescriptor, CalleeRef, FieldDescriptor, MappingDecl, MappingOrigin, ProviderDecl,
    TypeArg, TypeRef, package_of, simple_name_of,
};

/// The universal supertype.
pub const ANY_TYPE: &str = "kotlin.Any";

/// A declared type: its name, generic arity, fields and supertypes.
///
/// Fields are listed in primary-constructor order and double as the primary
/// constructor's parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDecl {
    /// Fully qualified name.
    pub name: String,

    /// Names of the declared type parameters.
    #[serde(default)]
    pub type_params: Vec<String>,

    /// Fields in primary-constructor order.
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,

    /// Qualified names of direct supertypes.
    #[serde(default)]
    pub supertypes: Vec<String>,
}

impl TypeDecl {
    /// Creates a non-generic declaration with no fields.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_params: Vec::new(),
            fields: Vec::new(),
            supertypes: Vec::new(),
        }
    }

    /// Appends a field.
    #[must_use]
    pub fn with_field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// Appends a type parameter.
    #[must_use]
    pub fn with_type_param(mut self, name: impl Into<String>) -> Self {
        self.type_params.push(name.into());
        self
    }

    /// Appends a direct supertype.
    #[must_use]
    pub fn with_supertype(mut self, name: impl Into<String>) -> Self {
        self.supertypes.push(name.into());
        self
    }

    /// Looks up a field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// A reference to this type with every type parameter star-projected.
    ///
    /// # Examples
    ///
    /// ```
    /// use km_core::TypeDecl;
    ///
    /// let decl = TypeDecl::new("com.acme.Page").with_type_param("T");
    /// assert_eq!(decl.star_projected().to_string(), "com.acme.Page<*>");
    /// ```
    #[must_use]
    pub fn star_projected(&self) -> TypeRef {
        let mut ty = TypeRef::new(self.name.clone());
        ty.args = self.type_params.iter().map(|_| TypeArg::Star).collect::<SmallVec<_>>();
        ty
    }

    /// The primary constructor of this type.
    #[must_use]
    pub fn primary_constructor(&self) -> CalleeDescriptor {
        CalleeDescriptor::new(
            CalleeRef::Constructor {
                owner: self.name.clone(),
            },
            self.star_projected(),
        )
        .with_params(self.fields.clone())
    }

    /// The unqualified name.
    #[must_use]
    pub fn simple_name(&self) -> &str {
        simple_name_of(&self.name)
    }

    /// The package part of the name.
    #[must_use]
    pub fn package(&self) -> &str {
        package_of(&self.name)
    }
}

/// Read-only access to declared types.
///
/// Implementations must be immutable for the duration of a build pass.
pub trait TypeModel {
    /// Looks up a type declaration by qualified name.
    fn type_decl(&self, name: &str) -> Option<&TypeDecl>;

    /// Returns `true` if `sub` is `sup` or (transitively) declares it as a supertype.
    ///
    /// Every type is a subtype of `kotlin.Any`.
    fn is_subtype(&self, sub: &str, sup: &str) -> bool {
        if sub == sup || sup == ANY_TYPE {
            return true;
        }
        let mut seen = FxHashSet::default();
        let mut stack = vec![sub];
        while let Some(name) = stack.pop() {
            if !seen.insert(name) {
                continue;
            }
            let Some(decl) = self.type_decl(name) else {
                continue;
            };
            for parent in &decl.supertypes {
                if parent == sup {
                    return true;
                }
                stack.push(parent.as_str());
            }
        }
        false
    }
}

/// Provider, factory and mapping declarations discovered in the code base.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Declarations {
    /// Custom converter functions.
    pub providers: Vec<ProviderDecl>,

    /// Callables marked as factories.
    pub factories: Vec<CalleeDescriptor>,

    /// Mapping declarations.
    pub mappings: Vec<MappingDecl>,
}

/// A JSON type-model manifest.
///
/// Call [`Manifest::linked`] (done by [`Manifest::from_json`]) before use so
/// that alias names are linked to their expansions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    /// Declared types.
    #[serde(default)]
    pub types: Vec<TypeDecl>,

    /// Type aliases: alias name to expansion.
    #[serde(default)]
    pub aliases: BTreeMap<String, TypeRef>,

    /// Declarations driving the build pass.
    #[serde(flatten)]
    pub declarations: Declarations,

    #[serde(skip)]
    index: FxHashMap<String, usize>,
}

impl Manifest {
    /// Parses and links a manifest from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Parse`] for malformed JSON or type expressions,
    /// and the errors of [`Manifest::linked`].
    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        let manifest: Self = serde_json::from_str(json)?;
        manifest.linked()
    }

    /// Reads, parses and links a manifest file.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Read`] if the file cannot be read, plus the errors
    /// of [`Manifest::from_json`].
    pub fn from_file(path: &Utf8Path) -> Result<Self, ModelError> {
        let content = std::fs::read_to_string(path).map_err(|e| ModelError::read(path, e))?;
        Self::from_json(&content)
    }

    /// Adds a type declaration.
    #[must_use]
    pub fn with_type(mut self, decl: TypeDecl) -> Self {
        self.index.entry(decl.name.clone()).or_insert(self.types.len());
        self.types.push(decl);
        self
    }

    /// Adds a type alias.
    #[must_use]
    pub fn with_alias(mut self, name: impl Into<String>, expansion: TypeRef) -> Self {
        self.aliases.insert(name.into(), expansion);
        self
    }

    /// Adds a provider declaration.
    #[must_use]
    pub fn with_provider(mut self, decl: ProviderDecl) -> Self {
        self.declarations.providers.push(decl);
        self
    }

    /// Adds a factory.
    #[must_use]
    pub fn with_factory(mut self, factory: CalleeDescriptor) -> Self {
        self.declarations.factories.push(factory);
        self
    }

    /// Adds a mapping declaration.
    #[must_use]
    pub fn with_mapping(mut self, decl: MappingDecl) -> Self {
        self.declarations.mappings.push(decl);
        self
    }

    /// Indexes types and links every alias reference to its expansion.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::DuplicateType`] if a name is declared twice and
    /// [`ModelError::AliasCycle`] if an alias expands to itself.
    pub fn linked(mut self) -> Result<Self, ModelError> {
        self.index.clear();
        for (i, decl) in self.types.iter().enumerate() {
            if self.index.insert(decl.name.clone(), i).is_some() {
                return Err(ModelError::DuplicateType(decl.name.clone()));
            }
        }

        let linker = AliasLinker::new(&self.aliases)?;
        for decl in &mut self.types {
            linker.link_fields(&mut decl.fields);
        }
        for provider in &mut self.declarations.providers {
            if let Some(receiver) = &mut provider.receiver {
                linker.link(receiver);
            }
            if let Some(returns) = &mut provider.returns {
                linker.link(returns);
            }
            linker.link_fields(&mut provider.params);
        }
        for factory in &mut self.declarations.factories {
            linker.link(&mut factory.returns);
            linker.link_fields(&mut factory.params);
        }
        for mapping in &mut self.declarations.mappings {
            match &mut mapping.origin {
                MappingOrigin::Class => {}
                MappingOrigin::Constructor { params }
                | MappingOrigin::CompanionFunction { params, .. } => {
                    linker.link_fields(params);
                }
            }
        }
        Ok(self)
    }

    /// Number of declared types.
    #[inline]
    #[must_use]
    pub fn type_count(&self) -> usize {
        self.types.len()
    }
}

impl TypeModel for Manifest {
    fn type_decl(&self, name: &str) -> Option<&TypeDecl> {
        self.index.get(name).and_then(|&i| self.types.get(i))
    }
}

/// Links alias names to fully linked expansions.
struct AliasLinker {
    expansions: FxHashMap<String, TypeRef>,
}

impl AliasLinker {
    fn new(aliases: &BTreeMap<String, TypeRef>) -> Result<Self, ModelError> {
        let mut expansions = FxHashMap::default();
        for name in aliases.keys() {
            let mut chain = Vec::new();
            let expansion = Self::expand(name, aliases, &mut chain)?;
            expansions.insert(name.clone(), expansion);
        }
        Ok(Self { expansions })
    }

    fn expand(
        name: &str,
        aliases: &BTreeMap<String, TypeRef>,
        chain: &mut Vec<String>,
    ) -> Result<TypeRef, ModelError> {
        if chain.iter().any(|n| n == name) {
            return Err(ModelError::AliasCycle(name.to_owned()));
        }
        let Some(target) = aliases.get(name) else {
            return Ok(TypeRef::new(name));
        };
        chain.push(name.to_owned());
        let mut linked = target.clone();
        Self::link_with(&mut linked, aliases, chain)?;
        chain.pop();
        Ok(linked)
    }

    fn link_with(
        ty: &mut TypeRef,
        aliases: &BTreeMap<String, TypeRef>,
        chain: &mut Vec<String>,
    ) -> Result<(), ModelError> {
        for arg in &mut ty.args {
            if let TypeArg::Type(inner) = arg {
                Self::link_with(inner, aliases, chain)?;
            }
        }
        if aliases.contains_key(&ty.name) {
            let expansion = Self::expand(&ty.name, aliases, chain)?;
            ty.alias_of = Some(Box::new(expansion));
        }
        Ok(())
    }

    fn link(&self, ty: &mut TypeRef) {
        for arg in &mut ty.args {
            if let TypeArg::Type(inner) = arg {
                self.link(inner);
            }
        }
        if let Some(expansion) = self.expansions.get(&ty.name) {
            ty.alias_of = Some(Box::new(expansion.clone()));
        }
    }

    fn link_fields(&self, fields: &mut [FieldDescriptor]) {
        for field in fields {
            self.link(&mut field.ty);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Manifest {
        Manifest::default()
            .with_type(TypeDecl::new("a.Base"))
            .with_type(TypeDecl::new("a.Mid").with_supertype("a.Base"))
            .with_type(TypeDecl::new("a.Leaf").with_supertype("a.Mid"))
    }

    #[test]
    fn test_is_subtype_transitive() {
        let model = sample().linked().unwrap();
        assert!(model.is_subtype("a.Leaf", "a.Base"));
        assert!(model.is_subtype("a.Leaf", "a.Leaf"));
        assert!(model.is_subtype("a.Leaf", ANY_TYPE));
        assert!(!model.is_subtype("a.Base", "a.Leaf"));
    }

    #[test]
    fn test_is_subtype_tolerates_cycles() {
        let model = Manifest::default()
            .with_type(TypeDecl::new("a.X").with_supertype("a.Y"))
            .with_type(TypeDecl::new("a.Y").with_supertype("a.X"))
            .linked()
            .unwrap();
        assert!(!model.is_subtype("a.X", "a.Z"));
    }

    #[test]
    fn test_duplicate_type_rejected() {
        let err = sample()
            .with_type(TypeDecl::new("a.Base"))
            .linked()
            .unwrap_err();
        assert!(matches!(err, ModelError::DuplicateType(name) if name == "a.Base"));
    }

    #[test]
    fn test_alias_linking() {
        let json = r#"{
            "types": [{"name": "a.User", "fields": [
                {"name": "id", "type": "a.UserId"},
                {"name": "friends", "type": "kotlin.collections.List<a.UserId>"}
            ]}],
            "aliases": {"a.UserId": "a.RawId", "a.RawId": "kotlin.Long"}
        }"#;
        let model = Manifest::from_json(json).unwrap();
        let user = model.type_decl("a.User").unwrap();

        let id = &user.field("id").unwrap().ty;
        assert!(id.is_alias());
        assert_eq!(id.expanded().name, "kotlin.Long");

        let friends = &user.field("friends").unwrap().ty;
        assert_eq!(
            friends.deep_expanded().to_string(),
            "kotlin.collections.List<kotlin.Long>"
        );
    }

    #[test]
    fn test_alias_cycle_rejected() {
        let json = r#"{"aliases": {"a.A": "a.B", "a.B": "kotlin.collections.List<a.A>"}}"#;
        let err = Manifest::from_json(json).unwrap_err();
        assert!(matches!(err, ModelError::AliasCycle(_)));
    }

    #[test]
    fn test_declarations_are_flattened() {
        let json = r#"{
            "providers": [{"name": "toEmail", "package": "a", "receiver": "kotlin.String", "returns": "a.Email"}],
            "mappings": [{"declaring": "a.User", "to": ["a.ApiUser"]}]
        }"#;
        let model = Manifest::from_json(json).unwrap();
        assert_eq!(model.declarations.providers.len(), 1);
        assert_eq!(model.declarations.mappings.len(), 1);
        assert!(model.declarations.factories.is_empty());
    }

    #[test]
    fn test_from_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = camino::Utf8PathBuf::from_path_buf(dir.path().join("none.json")).unwrap();
        assert!(matches!(
            Manifest::from_file(&path),
            Err(ModelError::Read { .. })
        ));
    }

    #[test]
    fn test_primary_constructor() {
        let decl = TypeDecl::new("a.Page")
            .with_type_param("T")
            .with_field(FieldDescriptor::new("items", "kotlin.collections.List<T>".parse().unwrap()));
        let ctor = decl.primary_constructor();
        assert_eq!(ctor.target_name(), "a.Page");
        assert_eq!(ctor.returns.to_string(), "a.Page<*>");
        assert_eq!(ctor.params.len(), 1);
    }
}
