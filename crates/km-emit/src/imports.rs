//! Import planning for one generated file.
//!
//! Kotlin resolves simple names through explicit imports first, then the
//! file's own package, then the default-imported packages. A type is
//! written by its simple name only when that name is unambiguous in the
//! file: local types claim their names first, then the default imports,
//! then imported types, and anything that loses a name clash is written fully qualified.

use std::collections::BTreeSet;

use km_core::{CalleeRef, FxHashSet, TypeArg, TypeRef, package_of, simple_name_of};
use km_engine::MapperUnit;

/// Packages every Kotlin file imports implicitly.
const DEFAULT_PACKAGES: &[&str] = &[
    "kotlin",
    "kotlin.annotation",
    "kotlin.collections",
    "kotlin.comparisons",
    "kotlin.io",
    "kotlin.ranges",
    "kotlin.sequences",
    "kotlin.text",
];

/// Receiver type of sequence mappers.
pub(crate) const ITERABLE_TYPE: &str = "kotlin.collections.Iterable";

/// Return type of sequence mappers.
pub(crate) const LIST_TYPE: &str = "kotlin.collections.List";

const COMPANION_SUFFIX: &str = ".Companion";

/// Which names a file imports and how each type is spelled.
#[derive(Debug, Default)]
pub(crate) struct ImportPlan {
    lines: BTreeSet<String>,
    short: FxHashSet<String>,
}

impl ImportPlan {
    /// Plans the imports of the file generated for `unit`.
    pub(crate) fn for_unit(unit: &MapperUnit) -> Self {
        let mut types = BTreeSet::new();
        types.insert(ITERABLE_TYPE.to_owned());
        types.insert(LIST_TYPE.to_owned());
        collect(&unit.source, &mut types);
        collect(&unit.target, &mut types);
        for function in &unit.functions {
            for param in &function.params {
                collect(&param.ty, &mut types);
            }
        }
        if let Some(owner) = callee_owner(&unit.callee) {
            types.insert(owner.to_owned());
        }

        let package = unit.package.as_str();
        let mut tiers: [Vec<&String>; 3] = Default::default();
        for name in &types {
            tiers[visibility(package_of(name), package) as usize].push(name);
        }

        let mut plan = Self::default();
        let mut claimed: FxHashSet<&str> = FxHashSet::default();
        for name in tiers.iter().flatten() {
            if claimed.insert(simple_name_of(name)) {
                plan.short.insert((*name).clone());
            }
        }
        let [_, _, explicit] = tiers;
        for name in explicit {
            if plan.short.contains(name) {
                plan.lines.insert(name.clone());
            }
        }
        for function in &unit.imports {
            if !function.package.is_empty() && function.package != package {
                plan.lines.insert(function.to_string());
            }
        }
        plan
    }

    /// Import targets, sorted.
    pub(crate) fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    /// How a declaration name is written in this file.
    pub(crate) fn name<'a>(&self, qualified: &'a str) -> &'a str {
        if self.short.contains(qualified) {
            simple_name_of(qualified)
        } else {
            qualified
        }
    }

    /// Renders a type reference with this file's spelling.
    pub(crate) fn render(&self, ty: &TypeRef) -> String {
        let mut out = self.name(&ty.name).to_owned();
        if !ty.args.is_empty() {
            let args: Vec<String> = ty
                .args
                .iter()
                .map(|arg| match arg {
                    TypeArg::Star => "*".to_owned(),
                    TypeArg::Type(inner) => self.render(inner),
                })
                .collect();
            out.push('<');
            out.push_str(&args.join(", "));
            out.push('>');
        }
        if ty.nullable {
            out.push('?');
        }
        out
    }
}

/// The type a constructor or member callee is reached through.
pub(crate) fn callee_owner(callee: &CalleeRef) -> Option<&str> {
    match callee {
        CalleeRef::Constructor { owner } => Some(owner.as_str()),
        CalleeRef::Member { owner, .. } => {
            Some(owner.strip_suffix(COMPANION_SUFFIX).unwrap_or(owner))
        }
        CalleeRef::Function(_) => None,
    }
}

/// How a type becomes visible in a file, in Kotlin's resolution priority.
#[derive(Clone, Copy)]
enum Visibility {
    Local,
    Default,
    Imported,
}

fn visibility(package: &str, file_package: &str) -> Visibility {
    if package.is_empty() || package == file_package {
        Visibility::Local
    } else if DEFAULT_PACKAGES.contains(&package) {
        Visibility::Default
    } else {
        Visibility::Imported
    }
}

fn collect(ty: &TypeRef, out: &mut BTreeSet<String>) {
    out.insert(ty.name.clone());
    for arg in &ty.args {
        if let TypeArg::Type(inner) = arg {
            collect(inner, out);
        }
    }
}
