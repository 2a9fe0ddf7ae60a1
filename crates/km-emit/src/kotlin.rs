//! Kotlin source rendering for mapper units.

use std::fmt::Write;

use km_core::{CalleeRef, EmitConfig, Expr, Resolution};
use km_engine::{FunctionShape, MapperFunction, MapperUnit};

use crate::imports::{ITERABLE_TYPE, ImportPlan, LIST_TYPE, callee_owner};

/// Hard keywords that need backticks when used as identifiers.
const KEYWORDS: &[&str] = &[
    "as", "break", "class", "continue", "do", "else", "false", "for", "fun", "if", "in",
    "interface", "is", "null", "object", "package", "return", "super", "this", "throw", "true",
    "try", "typealias", "typeof", "val", "var", "when", "while",
];

/// Renders mapper units as Kotlin files.
#[derive(Debug, Clone, Copy)]
pub struct KotlinRenderer<'c> {
    config: &'c EmitConfig,
}

impl<'c> KotlinRenderer<'c> {
    /// Creates a renderer using the indentation and header of `config`.
    #[inline]
    #[must_use]
    pub const fn new(config: &'c EmitConfig) -> Self {
        Self { config }
    }

    /// Renders the complete file for `unit`.
    #[must_use]
    pub fn render(&self, unit: &MapperUnit) -> String {
        let plan = ImportPlan::for_unit(unit);
        let mut out = String::new();

        if let Some(header) = &self.config.header_comment {
            for line in header.lines() {
                out.push_str(format!("// {line}").trim_end());
                out.push('\n');
            }
            out.push('\n');
        }
        if !unit.package.is_empty() {
            let _ = writeln!(out, "package {}", unit.package);
            out.push('\n');
        }

        let mut imports = plan.lines().peekable();
        if imports.peek().is_some() {
            for import in imports {
                let _ = writeln!(out, "import {import}");
            }
            out.push('\n');
        }

        for (i, function) in unit.functions.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            match function.shape {
                FunctionShape::Single => self.single(&mut out, unit, function, &plan),
                FunctionShape::Sequence => self.sequence(&mut out, unit, function, &plan),
            }
        }
        out
    }

    fn single(
        &self,
        out: &mut String,
        unit: &MapperUnit,
        function: &MapperFunction,
        plan: &ImportPlan,
    ) {
        let params: Vec<String> = function
            .params
            .iter()
            .map(|p| format!("{}: {}", ident(&p.name), plan.render(&p.ty)))
            .collect();
        let _ = writeln!(
            out,
            "fun {}.{}({}): {} {{",
            plan.render(&unit.source),
            unit.function_name(),
            params.join(", "),
            plan.render(&unit.target),
        );

        let one = self.indent(1);
        let two = self.indent(2);
        let _ = writeln!(out, "{one}val entity = {}(", construction(unit, plan));
        for param in &unit.params {
            let name = ident(param.name());
            let value = match &param.resolution {
                Resolution::Direct { expr } | Resolution::Converted { expr, .. } => render_expr(expr),
                Resolution::Missing { .. } if function.omitted.iter().any(|o| o == param.name()) => {
                    continue;
                }
                Resolution::Missing { .. } => name.clone(),
                Resolution::Omitted => continue,
            };
            let _ = writeln!(out, "{two}{name} = {value},");
        }
        let _ = writeln!(out, "{one})");
        let _ = writeln!(out, "{one}return entity");
        out.push_str("}\n");
    }

    fn sequence(
        &self,
        out: &mut String,
        unit: &MapperUnit,
        function: &MapperFunction,
        plan: &ImportPlan,
    ) {
        let source = plan.render(&unit.source);
        let target = plan.render(&unit.target);
        let params: Vec<String> = function
            .params
            .iter()
            .map(|p| format!("{}: ({source}) -> {}", ident(&p.name), plan.render(&p.ty)))
            .collect();
        let args: Vec<String> = function
            .params
            .iter()
            .map(|p| {
                let name = ident(&p.name);
                format!("{name} = {name}(it)")
            })
            .collect();

        let _ = writeln!(
            out,
            "fun {}<{source}>.{}({}): {}<{target}> {{",
            plan.name(ITERABLE_TYPE),
            unit.function_name(),
            params.join(", "),
            plan.name(LIST_TYPE),
        );
        let one = self.indent(1);
        let _ = writeln!(
            out,
            "{one}val list = map {{ it.{}({}) }}",
            unit.function_name(),
            args.join(", "),
        );
        let _ = writeln!(out, "{one}return list");
        out.push_str("}\n");
    }

    fn indent(&self, level: usize) -> String {
        " ".repeat(self.config.indent * level)
    }
}

/// The call that constructs the target, without its argument list.
fn construction(unit: &MapperUnit, plan: &ImportPlan) -> String {
    match &unit.callee {
        CalleeRef::Constructor { owner } => plan.name(owner).to_owned(),
        CalleeRef::Member { name, .. } => {
            let owner = callee_owner(&unit.callee).unwrap_or_default();
            format!("{}.{}", plan.name(owner), ident(name))
        }
        // Imported with the unit's providers.
        CalleeRef::Function(function) => ident(&function.name),
    }
}

/// Renders an expression.
///
/// Element and entry placeholders bind to the innermost enclosing lambda,
/// which matches Kotlin's shadowing of `it` and destructured entries.
pub fn render_expr(expr: &Expr) -> String {
    match expr {
        Expr::Source => "this".to_owned(),
        Expr::Element => "it".to_owned(),
        Expr::EntryKey => "k".to_owned(),
        Expr::EntryValue => "v".to_owned(),
        Expr::Field { receiver, name } => format!("{}.{}", render_expr(receiver), ident(name)),
        Expr::Call {
            receiver,
            function,
            null_safe,
        } => format!(
            "{}{}{}()",
            render_expr(receiver),
            access(*null_safe),
            ident(&function.name)
        ),
        Expr::MapElements {
            receiver,
            element,
            null_safe,
            dedup,
        } => {
            let mut out = format!(
                "{}{}map {{ {} }}",
                render_expr(receiver),
                access(*null_safe),
                render_expr(element)
            );
            if *dedup {
                out.push_str(access(*null_safe));
                out.push_str("toSet()");
            }
            out
        }
        Expr::MapEntries {
            receiver,
            key,
            value,
            null_safe,
        } => format!(
            "{recv}{dot}map {{ (k, v) -> {key} to {value} }}{dot}toMap()",
            recv = render_expr(receiver),
            dot = access(*null_safe),
            key = render_expr(key),
            value = render_expr(value),
        ),
    }
}

const fn access(null_safe: bool) -> &'static str {
    if null_safe { "?." } else { "." }
}

fn ident(name: &str) -> String {
    if KEYWORDS.contains(&name) {
        format!("`{name}`")
    } else {
        name.to_owned()
    }
}
