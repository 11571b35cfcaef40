/*
 * eval_context.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Evaluation context for template rendering.
//!
//! This module provides [`EvalContext`], which is threaded through the
//! evaluator and the builtins to support:
//!
//! 1. **Variable lookup** across statement locals, the per-call override
//!    layer, the bound environment and the builtins, in that order
//! 2. **Output**: the buffer of rendered lines
//! 3. **Configuration**: the uniform indent applied to every produced line

use crate::builtins::Builtin;
use crate::context::{Environment, Value};
use crate::error::{RuntimeError, RuntimeResult};
use std::collections::HashMap;

/// Context for one evaluation of a compiled template.
///
/// Nothing in here outlives the evaluation: statement locals and the
/// override layer are dropped with the context, so the bound environment is
/// never modified.
pub(crate) struct EvalContext<'a> {
    /// Bindings the template was compiled against.
    environment: &'a Environment,

    /// Per-call bindings, consulted before `environment`.
    overrides: Option<&'a Environment>,

    /// Statement locals, innermost last. The first scope always exists and
    /// holds variables created by `set` at the top level.
    scopes: Vec<HashMap<String, Value>>,

    /// Rendered lines produced so far.
    pub output: Vec<String>,

    /// Uniform indent prepended to every produced line.
    pub indent: &'a str,
}

impl<'a> EvalContext<'a> {
    pub fn new(
        environment: &'a Environment,
        overrides: Option<&'a Environment>,
        indent: &'a str,
    ) -> Self {
        Self {
            environment,
            overrides,
            scopes: vec![HashMap::new()],
            output: Vec::new(),
            indent,
        }
    }

    /// Resolve a name. Unbound names read as [`Value::Null`].
    pub fn lookup(&self, name: &str) -> Value {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name))
            .or_else(|| self.overrides.and_then(|o| o.get(name)))
            .or_else(|| self.environment.get(name))
            .cloned()
            .or_else(|| Builtin::lookup(name).map(Value::Function))
            .unwrap_or_default()
    }

    /// Assign to the innermost scope that already binds `name`, or to the
    /// top-level scope otherwise.
    pub fn assign(&mut self, name: &str, value: Value) {
        let index = self
            .scopes
            .iter()
            .rposition(|scope| scope.contains_key(name))
            .unwrap_or(0);
        self.scopes[index].insert(name.to_string(), value);
    }

    /// Bind `name` in the innermost scope.
    pub fn define(&mut self, name: &str, value: Value) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), value);
        }
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    pub fn pop_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// Append one rendered line, with the uniform indent in front.
    pub fn emit(&mut self, text: &str) {
        self.output.push(format!("{}{}", self.indent, text));
    }

    /// Append every element of `lines` as its own output line, each prefixed
    /// by the uniform indent and `prefix`.
    ///
    /// `what` names the sequence in error messages.
    pub fn insert_lines(&mut self, lines: &Value, prefix: &str, what: &str) -> RuntimeResult<()> {
        let items = match lines {
            Value::List(items) => items,
            other => {
                return Err(RuntimeError::new(format!(
                    "cannot insert {}: expected a list of lines, found {}",
                    what,
                    other.type_name()
                )));
            }
        };

        for (index, item) in items.iter().enumerate() {
            let text = item.stringify().ok_or_else(|| {
                RuntimeError::new(format!(
                    "cannot insert {}: element {} is {}, not a line of text",
                    what,
                    index + 1,
                    item.type_name()
                ))
            })?;
            self.output.push(format!("{}{}{}", self.indent, prefix, text));
        }
        Ok(())
    }
}
