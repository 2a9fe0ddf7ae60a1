//! Mapping expressions and per-parameter resolutions.
//!
//! Expressions are a small tree rather than text so the emitter decides the
//! concrete syntax and tests can evaluate them.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::{FieldDescriptor, FunctionRef};

/// An expression producing a value for one target parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    /// The source instance being mapped.
    Source,
    /// The current element inside [`Expr::MapElements`].
    Element,
    /// The current key inside [`Expr::MapEntries`].
    EntryKey,
    /// The current value inside [`Expr::MapEntries`].
    EntryValue,
    /// Property read.
    Field {
        /// Object the property is read from.
        receiver: Box<Expr>,
        /// Property name.
        name: String,
    },
    /// Provider invocation on a receiver.
    Call {
        /// Receiver of the extension call.
        receiver: Box<Expr>,
        /// Provider function.
        function: FunctionRef,
        /// Whether the call short-circuits on a null receiver.
        null_safe: bool,
    },
    /// Element-wise transform of an iterable.
    MapElements {
        /// The iterable.
        receiver: Box<Expr>,
        /// Transform applied to [`Expr::Element`].
        element: Box<Expr>,
        /// Whether a null iterable passes through as null.
        null_safe: bool,
        /// Whether the result is deduplicated into a set.
        dedup: bool,
    },
    /// Entry-wise transform of a map.
    MapEntries {
        /// The map.
        receiver: Box<Expr>,
        /// Transform applied to [`Expr::EntryKey`].
        key: Box<Expr>,
        /// Transform applied to [`Expr::EntryValue`].
        value: Box<Expr>,
        /// Whether a null map passes through as null.
        null_safe: bool,
    },
}

impl Expr {
    /// A property read on the source instance.
    ///
    /// # Examples
    ///
    /// ```
    /// use km_core::Expr;
    ///
    /// let expr = Expr::field("email");
    /// assert!(matches!(expr, Expr::Field { ref name, .. } if name == "email"));
    /// ```
    #[must_use]
    pub fn field(name: impl Into<String>) -> Self {
        Self::Field {
            receiver: Box::new(Self::Source),
            name: name.into(),
        }
    }

    /// Provider functions invoked anywhere in this expression.
    #[must_use]
    pub fn imports(&self) -> BTreeSet<FunctionRef> {
        let mut out = BTreeSet::new();
        self.collect_imports(&mut out);
        out
    }

    fn collect_imports(&self, out: &mut BTreeSet<FunctionRef>) {
        match self {
            Self::Source | Self::Element | Self::EntryKey | Self::EntryValue => {}
            Self::Field { receiver, .. } => receiver.collect_imports(out),
            Self::Call {
                receiver, function, ..
            } => {
                out.insert(function.clone());
                receiver.collect_imports(out);
            }
            Self::MapElements {
                receiver, element, ..
            } => {
                receiver.collect_imports(out);
                element.collect_imports(out);
            }
            Self::MapEntries {
                receiver,
                key,
                value,
                ..
            } => {
                receiver.collect_imports(out);
                key.collect_imports(out);
                value.collect_imports(out);
            }
        }
    }
}

/// The outcome of resolving one target parameter.
///
/// Exactly one variant holds per parameter per pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Resolution {
    /// The value is read from the source without conversion.
    Direct {
        /// The source read.
        expr: Expr,
    },
    /// The value is produced by one or more providers.
    Converted {
        /// The conversion expression.
        expr: Expr,
        /// Provider functions the expression needs imported.
        imports: BTreeSet<FunctionRef>,
    },
    /// No source value: the generated mapper takes it from its caller.
    Missing {
        /// Whether the caller must supply the value.
        required: bool,
        /// Whether the target parameter declares a default.
        has_default: bool,
    },
    /// Left out of construction so the target's default applies.
    Omitted,
}

impl Resolution {
    /// Wraps a provider expression, collecting its imports.
    #[must_use]
    pub fn converted(expr: Expr) -> Self {
        let imports = expr.imports();
        Self::Converted { expr, imports }
    }

    /// The value expression, if this resolution has one.
    #[must_use]
    pub const fn expr(&self) -> Option<&Expr> {
        match self {
            Self::Direct { expr } | Self::Converted { expr, .. } => Some(expr),
            Self::Missing { .. } | Self::Omitted => None,
        }
    }

    /// Returns `true` for [`Resolution::Missing`].
    #[inline]
    #[must_use]
    pub const fn is_missing(&self) -> bool {
        matches!(self, Self::Missing { .. })
    }

    /// Returns `true` for [`Resolution::Omitted`].
    #[inline]
    #[must_use]
    pub const fn is_omitted(&self) -> bool {
        matches!(self, Self::Omitted)
    }

    /// Short label for reports.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Direct { .. } => "direct",
            Self::Converted { .. } => "converted",
            Self::Missing { .. } => "missing",
            Self::Omitted => "omitted",
        }
    }
}

/// A target parameter together with its resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedParam {
    /// The target parameter.
    pub param: FieldDescriptor,
    /// How its value is produced.
    pub resolution: Resolution,
}

impl ResolvedParam {
    /// Parameter name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.param.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_imports_collects_nested_calls() {
        let to_email = FunctionRef::new("p", "toEmail");
        let to_id = FunctionRef::new("p", "toId");
        let expr = Expr::MapEntries {
            receiver: Box::new(Expr::field("contacts")),
            key: Box::new(Expr::Call {
                receiver: Box::new(Expr::EntryKey),
                function: to_id.clone(),
                null_safe: false,
            }),
            value: Box::new(Expr::Call {
                receiver: Box::new(Expr::EntryValue),
                function: to_email.clone(),
                null_safe: false,
            }),
            null_safe: false,
        };
        let imports: Vec<_> = expr.imports().into_iter().collect();
        assert_eq!(imports, vec![to_email, to_id]);
    }

    #[test]
    fn test_converted_derives_imports() {
        let resolution = Resolution::converted(Expr::Call {
            receiver: Box::new(Expr::Source),
            function: FunctionRef::new("p", "fullName"),
            null_safe: false,
        });
        match &resolution {
            Resolution::Converted { imports, .. } => assert_eq!(imports.len(), 1),
            other => panic!("unexpected resolution: {other:?}"),
        }
        assert_eq!(resolution.label(), "converted");
        assert!(resolution.expr().is_some());
    }

    #[test]
    fn test_missing_has_no_expr() {
        let resolution = Resolution::Missing {
            required: true,
            has_default: true,
        };
        assert!(resolution.is_missing());
        assert!(resolution.expr().is_none());
        assert!(Resolution::Omitted.is_omitted());
    }

    #[test]
    fn test_resolution_serialization_is_tagged() {
        let json = serde_json::to_string(&Resolution::Omitted).unwrap();
        assert_eq!(json, r#"{"kind":"omitted"}"#);
    }
}
