/*
 * builtins.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Helper functions available to every template.
//!
//! Builtins sit below the caller's environment in the lookup order: a caller
//! binding named `upper` hides the builtin, and the builtin is available
//! whenever the caller did not bind the name.

use crate::context::Value;
use crate::decorate::decorate;
use crate::error::{RuntimeError, RuntimeResult};
use crate::eval_context::EvalContext;

/// A builtin helper function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    /// `str(x)`: string coercion.
    Str,
    /// `len(x)`: length of a string, list or map.
    Len,
    /// `enumerate(list)`: `[index, item]` pairs, counting from 1.
    Enumerate,
    /// `items(map)`: `[key, value]` pairs in key order.
    Items,
    /// `range(b)` / `range(a, b)`: the integers `1..=b` / `a..=b`.
    Range,
    /// `insert(list, prefix?)`: append each element as an output line.
    Insert,
    /// `decorate(list, prefix?, suffix?)`: wrap non-empty elements.
    Decorate,
    Upper,
    Lower,
    Trim,
    /// `join(list, sep?)`
    Join,
}

impl Builtin {
    pub const ALL: [Builtin; 11] = [
        Builtin::Str,
        Builtin::Len,
        Builtin::Enumerate,
        Builtin::Items,
        Builtin::Range,
        Builtin::Insert,
        Builtin::Decorate,
        Builtin::Upper,
        Builtin::Lower,
        Builtin::Trim,
        Builtin::Join,
    ];

    /// The name templates call this builtin by.
    pub fn name(self) -> &'static str {
        match self {
            Builtin::Str => "str",
            Builtin::Len => "len",
            Builtin::Enumerate => "enumerate",
            Builtin::Items => "items",
            Builtin::Range => "range",
            Builtin::Insert => "insert",
            Builtin::Decorate => "decorate",
            Builtin::Upper => "upper",
            Builtin::Lower => "lower",
            Builtin::Trim => "trim",
            Builtin::Join => "join",
        }
    }

    /// Find a builtin by name.
    pub fn lookup(name: &str) -> Option<Builtin> {
        Builtin::ALL.into_iter().find(|b| b.name() == name)
    }
}

/// Call `builtin` with already-evaluated arguments.
pub(crate) fn call(builtin: Builtin, args: Vec<Value>, ctx: &mut EvalContext) -> RuntimeResult<Value> {
    let name = builtin.name();
    match builtin {
        Builtin::Str => {
            let [value] = exact_args::<1>(name, args)?;
            match value {
                Value::Null => Err(RuntimeError::new("str: value is undefined")),
                Value::List(_) | Value::Map(_) => Ok(Value::String(value.to_json().to_string())),
                other => Ok(Value::String(
                    other.stringify().unwrap_or_else(|| other.type_name().to_string()),
                )),
            }
        }

        Builtin::Len => {
            let [value] = exact_args::<1>(name, args)?;
            let len = match &value {
                Value::String(s) => s.chars().count(),
                Value::List(items) => items.len(),
                Value::Map(m) => m.len(),
                other => return Err(type_error(name, "a string, list or map", other)),
            };
            Ok(Value::from(len))
        }

        Builtin::Enumerate => {
            let [value] = exact_args::<1>(name, args)?;
            let items = expect_list(name, value)?;
            Ok(Value::List(
                items
                    .into_iter()
                    .enumerate()
                    .map(|(i, item)| Value::List(vec![Value::from(i + 1), item]))
                    .collect(),
            ))
        }

        Builtin::Items => {
            let [value] = exact_args::<1>(name, args)?;
            match value {
                Value::Map(m) => Ok(Value::List(
                    m.into_iter()
                        .map(|(k, v)| Value::List(vec![Value::String(k), v]))
                        .collect(),
                )),
                other => Err(type_error(name, "a map", &other)),
            }
        }

        Builtin::Range => {
            let (start, end) = match args.as_slice() {
                [end] => (1, range_bound(name, end)?),
                [start, end] => (range_bound(name, start)?, range_bound(name, end)?),
                _ => return Err(arity_error(name, "1 or 2", args.len())),
            };
            if end < start {
                return Ok(Value::List(Vec::new()));
            }
            let count = end - start + 1;
            if count > MAX_RANGE_LEN {
                return Err(RuntimeError::new(format!(
                    "{}() would produce {} numbers, more than the limit of {}",
                    name, count, MAX_RANGE_LEN
                )));
            }
            Ok(Value::List(
                (0..count)
                    .map(|offset| Value::Number((start + offset) as f64))
                    .collect(),
            ))
        }

        Builtin::Insert => {
            let (lines, prefix) = match args.len() {
                1 | 2 => {
                    let mut args = args.into_iter();
                    let lines = args.next().unwrap_or_default();
                    let prefix = optional_string(name, args.next())?;
                    (lines, prefix)
                }
                n => return Err(arity_error(name, "1 or 2", n)),
            };
            ctx.insert_lines(&lines, &prefix, "the lines passed to insert()")?;
            Ok(Value::Null)
        }

        Builtin::Decorate => {
            if args.is_empty() || args.len() > 3 {
                return Err(arity_error(name, "1 to 3", args.len()));
            }
            let mut args = args.into_iter();
            let items = expect_list(name, args.next().unwrap_or_default())?;
            let prefix = optional_string(name, args.next())?;
            let suffix = optional_string(name, args.next())?;
            let lines = items
                .iter()
                .map(|item| {
                    item.stringify()
                        .ok_or_else(|| type_error(name, "a list of strings", item))
                })
                .collect::<RuntimeResult<Vec<String>>>()?;
            Ok(Value::List(
                decorate(lines, &prefix, &suffix).map(Value::String).collect(),
            ))
        }

        Builtin::Upper | Builtin::Lower | Builtin::Trim => {
            let [value] = exact_args::<1>(name, args)?;
            let text = match value {
                Value::String(s) => s,
                other => return Err(type_error(name, "a string", &other)),
            };
            Ok(Value::String(match builtin {
                Builtin::Upper => text.to_uppercase(),
                Builtin::Lower => text.to_lowercase(),
                _ => text.trim().to_string(),
            }))
        }

        Builtin::Join => {
            if args.is_empty() || args.len() > 2 {
                return Err(arity_error(name, "1 or 2", args.len()));
            }
            let mut args = args.into_iter();
            let items = expect_list(name, args.next().unwrap_or_default())?;
            let separator = optional_string(name, args.next())?;
            let parts = items
                .iter()
                .map(|item| {
                    item.stringify()
                        .ok_or_else(|| type_error(name, "a list of strings", item))
                })
                .collect::<RuntimeResult<Vec<String>>>()?;
            Ok(Value::String(parts.join(&separator)))
        }
    }
}

fn exact_args<const N: usize>(name: &str, args: Vec<Value>) -> RuntimeResult<[Value; N]> {
    let count = args.len();
    args.try_into()
        .map_err(|_| arity_error(name, &N.to_string(), count))
}

fn arity_error(name: &str, expected: &str, found: usize) -> RuntimeError {
    RuntimeError::new(format!(
        "{}() takes {} argument(s), {} given",
        name, expected, found
    ))
}

fn type_error(name: &str, expected: &str, found: &Value) -> RuntimeError {
    RuntimeError::new(format!(
        "{}() expects {}, found {}",
        name,
        expected,
        found.type_name()
    ))
}

fn expect_list(name: &str, value: Value) -> RuntimeResult<Vec<Value>> {
    match value {
        Value::List(items) => Ok(items),
        other => Err(type_error(name, "a list", &other)),
    }
}

fn expect_number(name: &str, value: &Value) -> RuntimeResult<f64> {
    match value {
        Value::Number(n) => Ok(*n),
        other => Err(type_error(name, "a number", other)),
    }
}

/// Largest integer magnitude a `range` bound may have: every integer up to
/// it is exactly representable as an `f64`.
const MAX_RANGE_BOUND: f64 = 9_007_199_254_740_992.0;

/// Most numbers a single `range` call may produce.
const MAX_RANGE_LEN: i64 = 1 << 24;

fn range_bound(name: &str, value: &Value) -> RuntimeResult<i64> {
    let n = expect_number(name, value)?;
    if !n.is_finite() {
        return Err(RuntimeError::new(format!(
            "{}() bound must be finite, found {}",
            name, n
        )));
    }
    if n.fract() != 0.0 {
        return Err(RuntimeError::new(format!(
            "{}() bound must be a whole number, found {}",
            name, n
        )));
    }
    if n.abs() > MAX_RANGE_BOUND {
        return Err(RuntimeError::new(format!(
            "{}() bound {} is outside -2^53..=2^53",
            name, n
        )));
    }
    Ok(n as i64)
}

/// A missing or `nil` optional string argument reads as the empty string.
fn optional_string(name: &str, value: Option<Value>) -> RuntimeResult<String> {
    match value {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(s)) => Ok(s),
        Some(other) => Err(type_error(name, "a string", &other)),
    }
}
