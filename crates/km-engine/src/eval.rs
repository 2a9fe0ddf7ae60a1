//! Test-only interpreter for assembled mappers.
//!
//! Executes resolved expressions over dynamic values so mapper behavior can
//! be checked without compiling generated Kotlin.

#![allow(clippy::unwrap_used, clippy::panic)]

use std::collections::BTreeMap;

use km_core::{Expr, FunctionRef, Resolution};

use crate::assembly::{FunctionShape, MapperFunction, MapperUnit};

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Long(i64),
    Str(String),
    List(Vec<Value>),
    Set(Vec<Value>),
    Map(Vec<(Value, Value)>),
    Object {
        ty: String,
        fields: BTreeMap<String, Value>,
    },
}

impl Value {
    pub fn str(s: &str) -> Self {
        Self::Str(s.to_owned())
    }

    pub fn object<'a>(ty: &str, fields: impl IntoIterator<Item = (&'a str, Value)>) -> Self {
        Self::Object {
            ty: ty.to_owned(),
            fields: fields
                .into_iter()
                .map(|(k, v)| (k.to_owned(), v))
                .collect(),
        }
    }

    fn field(&self, name: &str) -> Value {
        match self {
            Self::Object { fields, .. } => fields.get(name).cloned().unwrap_or(Self::Null),
            other => panic!("field {name} read on {other:?}"),
        }
    }
}

type Provider = Box<dyn Fn(&Value) -> Value>;

#[derive(Default)]
pub struct Evaluator {
    providers: BTreeMap<FunctionRef, Provider>,
}

struct Scope<'v> {
    source: &'v Value,
    element: Option<&'v Value>,
    entry: Option<(&'v Value, &'v Value)>,
}

impl Evaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn provider(mut self, package: &str, name: &str, f: impl Fn(&Value) -> Value + 'static) -> Self {
        self.providers.insert(FunctionRef::new(package, name), Box::new(f));
        self
    }

    /// Runs a single-instance function.
    pub fn single(
        &self,
        unit: &MapperUnit,
        function: &MapperFunction,
        source: &Value,
        args: &BTreeMap<&str, Value>,
    ) -> Value {
        assert_eq!(function.shape, FunctionShape::Single);
        let mut fields = BTreeMap::new();
        for param in &unit.params {
            let name = param.name();
            let value = match &param.resolution {
                Resolution::Direct { expr } | Resolution::Converted { expr, .. } => {
                    self.eval(expr, &Scope { source, element: None, entry: None })
                }
                Resolution::Missing { .. } if function.omitted.iter().any(|o| o == name) => continue,
                Resolution::Missing { .. } => args
                    .get(name)
                    .cloned()
                    .unwrap_or_else(|| panic!("missing argument {name}")),
                Resolution::Omitted => continue,
            };
            fields.insert(name.to_owned(), value);
        }
        Value::Object {
            ty: unit.target.name.clone(),
            fields,
        }
    }

    /// Runs a sequence function with per-element suppliers.
    pub fn sequence(
        &self,
        unit: &MapperUnit,
        function: &MapperFunction,
        items: &[Value],
        supply: &dyn Fn(&str, &Value) -> Value,
    ) -> Vec<Value> {
        assert_eq!(function.shape, FunctionShape::Sequence);
        let single = unit
            .functions
            .iter()
            .find(|f| f.shape == FunctionShape::Single && f.omitted == function.omitted)
            .unwrap();
        items
            .iter()
            .map(|item| {
                let args: BTreeMap<&str, Value> = function
                    .params
                    .iter()
                    .map(|p| (p.name.as_str(), supply(&p.name, item)))
                    .collect();
                self.single(unit, single, item, &args)
            })
            .collect()
    }

    fn eval(&self, expr: &Expr, scope: &Scope<'_>) -> Value {
        match expr {
            Expr::Source => scope.source.clone(),
            Expr::Element => scope.element.unwrap().clone(),
            Expr::EntryKey => scope.entry.unwrap().0.clone(),
            Expr::EntryValue => scope.entry.unwrap().1.clone(),
            Expr::Field { receiver, name } => self.eval(receiver, scope).field(name),
            Expr::Call {
                receiver,
                function,
                null_safe,
            } => {
                let receiver = self.eval(receiver, scope);
                if *null_safe && receiver == Value::Null {
                    return Value::Null;
                }
                let provider = self
                    .providers
                    .get(function)
                    .unwrap_or_else(|| panic!("no provider {function}"));
                provider(&receiver)
            }
            Expr::MapElements {
                receiver,
                element,
                null_safe,
                dedup,
            } => {
                let items = match self.eval(receiver, scope) {
                    Value::Null if *null_safe => return Value::Null,
                    Value::List(items) | Value::Set(items) => items,
                    other => panic!("not iterable: {other:?}"),
                };
                let mapped = items.iter().map(|item| {
                    let inner = Scope {
                        source: scope.source,
                        element: Some(item),
                        entry: scope.entry,
                    };
                    self.eval(element, &inner)
                });
                if *dedup {
                    let mut out: Vec<Value> = Vec::new();
                    for value in mapped {
                        if !out.contains(&value) {
                            out.push(value);
                        }
                    }
                    Value::Set(out)
                } else {
                    Value::List(mapped.collect())
                }
            }
            Expr::MapEntries {
                receiver,
                key,
                value,
                null_safe,
            } => {
                let entries = match self.eval(receiver, scope) {
                    Value::Null if *null_safe => return Value::Null,
                    Value::Map(entries) => entries,
                    other => panic!("not a map: {other:?}"),
                };
                Value::Map(
                    entries
                        .iter()
                        .map(|(k, v)| {
                            let inner = Scope {
                                source: scope.source,
                                element: scope.element,
                                entry: Some((k, v)),
                            };
                            (self.eval(key, &inner), self.eval(value, &inner))
                        })
                        .collect(),
                )
            }
        }
    }
}
