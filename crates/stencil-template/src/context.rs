/*
 * context.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template value and environment types.
//!
//! [`Value`] is what placeholders and escape lines compute with, and
//! [`Environment`] is the set of named values a template is evaluated
//! against. Values can be built from Rust primitives or from JSON, which is
//! how the command line and template providers supply them.

use crate::builtins::Builtin;
use std::collections::{BTreeMap, HashMap};

/// A value that can be used in template evaluation.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// An absent value (`nil`). Missing variables read as this.
    #[default]
    Null,

    /// A boolean value.
    Bool(bool),

    /// A number. Integral numbers render without a fractional part.
    Number(f64),

    /// A string value.
    String(String),

    /// A list of values.
    List(Vec<Value>),

    /// A map of string keys to values, iterated in key order.
    Map(BTreeMap<String, Value>),

    /// A builtin helper function.
    Function(Builtin),
}

impl Value {
    /// Check if this value is "truthy" for conditional evaluation.
    ///
    /// Only `nil` and `false` are falsy. Empty strings, empty lists and zero
    /// are all truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Null | Value::Bool(false))
    }

    /// Check if this value is absent.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short name of this value's type, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "nil",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Function(_) => "function",
        }
    }

    /// Render this value as output text.
    ///
    /// Returns `None` for values that have no text form: absent values,
    /// lists, maps and functions.
    pub fn stringify(&self) -> Option<String> {
        match self {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(format_number(*n)),
            Value::Bool(b) => Some(b.to_string()),
            Value::Null | Value::List(_) | Value::Map(_) | Value::Function(_) => None,
        }
    }

    /// Get a field of a map value. Anything else has no fields.
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Map(m) => m.get(name),
            _ => None,
        }
    }

    /// Get a nested field by path.
    ///
    /// For example, `get_path(&["employee", "salary"])` on a Map containing
    /// `{"employee": {"salary": 50000}}` returns the salary value.
    pub fn get_path(&self, path: &[&str]) -> Option<&Value> {
        match path.split_first() {
            None => Some(self),
            Some((first, rest)) => self.field(first).and_then(|v| v.get_path(rest)),
        }
    }

    /// Convert this value to JSON. Functions become their names.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => {
                if is_integral(*n) {
                    serde_json::Value::from(*n as i64)
                } else {
                    serde_json::Number::from_f64(*n)
                        .map_or(serde_json::Value::Null, serde_json::Value::Number)
                }
            }
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::List(items) => serde_json::Value::Array(items.iter().map(Value::to_json).collect()),
            Value::Map(m) => serde_json::Value::Object(
                m.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
            Value::Function(builtin) => serde_json::Value::String(builtin.name().to_string()),
        }
    }
}

fn is_integral(n: f64) -> bool {
    n.fract() == 0.0 && n.abs() < 1e15
}

fn format_number(n: f64) -> String {
    if is_integral(n) {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => n.as_f64().map_or(Value::Null, Value::Number),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(m) => {
                Value::Map(m.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n as f64)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// Named values a template is evaluated against.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Environment {
    variables: HashMap<String, Value>,
}

impl Environment {
    /// Create a new empty environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an environment from a JSON object.
    ///
    /// Returns `None` if `json` is not an object.
    pub fn from_json(json: serde_json::Value) -> Option<Self> {
        match json {
            serde_json::Value::Object(m) => Some(m.into_iter().collect()),
            _ => None,
        }
    }

    /// Insert a variable, replacing any previous binding.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.variables.insert(key.into(), value.into());
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Get a variable.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.variables.get(key)
    }

    /// Check whether a variable is bound.
    pub fn contains_key(&self, key: &str) -> bool {
        self.variables.contains_key(key)
    }

    /// Remove a variable, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.variables.remove(key)
    }

    /// Copy every binding of `other` into this environment. Bindings from
    /// `other` win on collision.
    pub fn merge(&mut self, other: &Environment) {
        for (key, value) in &other.variables {
            self.variables.insert(key.clone(), value.clone());
        }
    }

    /// Iterate over the bindings in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.variables.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Environment {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut env = Environment::new();
        for (key, value) in iter {
            env.insert(key, value);
        }
        env
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_truthiness() {
        assert!(Value::Bool(true).is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(!Value::Null.is_truthy());

        // Only nil and false are falsy
        assert!(Value::from("").is_truthy());
        assert!(Value::from("false").is_truthy());
        assert!(Value::Number(0.0).is_truthy());
        assert!(Value::List(vec![]).is_truthy());
        assert!(Value::Map(BTreeMap::new()).is_truthy());
    }

    #[test]
    fn test_stringify() {
        assert_eq!(Value::from("abc").stringify().as_deref(), Some("abc"));
        assert_eq!(Value::from(42).stringify().as_deref(), Some("42"));
        assert_eq!(Value::from(-3.0).stringify().as_deref(), Some("-3"));
        assert_eq!(Value::from(2.5).stringify().as_deref(), Some("2.5"));
        assert_eq!(Value::from(true).stringify().as_deref(), Some("true"));
        assert_eq!(Value::Null.stringify(), None);
        assert_eq!(Value::from(vec!["a"]).stringify(), None);
    }

    #[test]
    fn test_get_path() {
        let value = Value::from(json!({"employee": {"salary": 50000}}));

        assert_eq!(
            value.get_path(&["employee", "salary"]),
            Some(&Value::Number(50000.0))
        );
        assert_eq!(value.get_path(&["employee", "name"]), None);
        assert_eq!(value.get_path(&["nonexistent"]), None);
        assert_eq!(value.get_path(&[]), Some(&value));
    }

    #[test]
    fn test_json_conversion() {
        let json = json!({"name": "Marco", "tags": ["a", "b"], "count": 3, "ratio": 0.5, "none": null});
        let value = Value::from(json.clone());
        assert_eq!(value.field("name"), Some(&Value::from("Marco")));
        assert_eq!(value.field("tags"), Some(&Value::from(vec!["a", "b"])));
        assert_eq!(value.to_json(), json);
    }

    #[test]
    fn test_environment_from_json() {
        let env = Environment::from_json(json!({"name": "Marco", "n": 1})).unwrap();
        assert_eq!(env.len(), 2);
        assert_eq!(env.get("name"), Some(&Value::from("Marco")));
        assert!(Environment::from_json(json!(["not", "an", "object"])).is_none());
    }

    #[test]
    fn test_environment_merge_later_wins() {
        let mut base = Environment::new().with("a", "base").with("b", "base");
        let overrides = Environment::new().with("b", "override").with("c", "override");
        base.merge(&overrides);

        assert_eq!(base.get("a"), Some(&Value::from("base")));
        assert_eq!(base.get("b"), Some(&Value::from("override")));
        assert_eq!(base.get("c"), Some(&Value::from("override")));
        assert_eq!(base.len(), 3);
    }
}
