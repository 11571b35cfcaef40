/*
 * evaluator.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template evaluation engine.
//!
//! This module runs a compiled program against its bound environment and an
//! optional per-call override layer. Every instruction carries the template
//! line it was compiled from, so a failure is reported against that line,
//! together with one trace frame per `for`/`if` block that was open at the
//! time.

use crate::ast::{BinaryOp, Expr, UnaryOp};
use crate::builtins;
use crate::compiler::{CompileOptions, CompiledTemplate, compile};
use crate::context::{Environment, Value};
use crate::error::{Diagnostic, RuntimeError, RuntimeResult, TemplateError, TemplateResult};
use crate::eval_context::EvalContext;
use crate::program::{Op, Piece};
use std::cmp::Ordering;

/// Options controlling a single evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvalOptions {
    /// Return the produced lines instead of one newline-joined string.
    pub return_as_lines: bool,
}

impl EvalOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lines(mut self, return_as_lines: bool) -> Self {
        self.return_as_lines = return_as_lines;
        self
    }
}

/// Output of a successful evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered {
    /// Lines joined with `\n`.
    Text(String),
    /// Lines as produced.
    Lines(Vec<String>),
}

impl Rendered {
    /// The output as one string.
    pub fn into_text(self) -> String {
        match self {
            Rendered::Text(text) => text,
            Rendered::Lines(lines) => lines.join("\n"),
        }
    }

    /// The output as lines. Empty text has no lines, matching the line
    /// output of an empty template.
    pub fn into_lines(self) -> Vec<String> {
        match self {
            Rendered::Text(text) if text.is_empty() => Vec::new(),
            Rendered::Text(text) => text.split('\n').map(str::to_string).collect(),
            Rendered::Lines(lines) => lines,
        }
    }
}

impl CompiledTemplate {
    /// Evaluate this template.
    ///
    /// # Arguments
    /// * `options` - Output mode
    /// * `overrides` - Bindings consulted before the bound environment, for
    ///   this call only
    ///
    /// # Returns
    /// The rendered output, or [`TemplateError::Evaluation`] describing the
    /// failing line and the blocks around it.
    pub fn evaluate(
        &self,
        options: &EvalOptions,
        overrides: Option<&Environment>,
    ) -> TemplateResult<Rendered> {
        tracing::trace!(
            instructions = self.program.len(),
            overrides = overrides.map_or(0, Environment::len),
            "Evaluating template"
        );

        let mut machine = Machine {
            template: self,
            ctx: EvalContext::new(&self.environment, overrides, &self.indent),
            blocks: Vec::new(),
            pc: 0,
        };

        match machine.run() {
            Ok(()) => {
                let lines = machine.ctx.output;
                Ok(if options.return_as_lines {
                    Rendered::Lines(lines)
                } else {
                    Rendered::Text(lines.join("\n"))
                })
            }
            Err(error) => Err(machine.failure(error)),
        }
    }

    /// Render to a single string using the bound environment.
    pub fn render_text(&self) -> TemplateResult<String> {
        self.evaluate(&EvalOptions::default(), None)
            .map(Rendered::into_text)
    }

    /// Render to a list of lines using the bound environment.
    pub fn render_lines(&self) -> TemplateResult<Vec<String>> {
        self.evaluate(&EvalOptions::new().with_lines(true), None)
            .map(Rendered::into_lines)
    }
}

/// Compile `text` and evaluate it once against `environment`.
pub fn render(
    text: &str,
    environment: Environment,
    options: &CompileOptions,
) -> TemplateResult<String> {
    compile(text, options, environment)?.render_text()
}

/// A `for` or `if` block that is currently executing.
enum Block {
    If {
        start: usize,
    },
    For {
        start: usize,
        names: Vec<String>,
        items: Vec<Value>,
        /// Index of the item currently bound.
        index: usize,
    },
}

impl Block {
    fn start(&self) -> usize {
        match self {
            Block::If { start } | Block::For { start, .. } => *start,
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            Block::If { .. } => "if block",
            Block::For { .. } => "for loop",
        }
    }
}

struct Machine<'a> {
    template: &'a CompiledTemplate,
    ctx: EvalContext<'a>,
    /// Open blocks, innermost last.
    blocks: Vec<Block>,
    pc: usize,
}

impl Machine<'_> {
    fn run(&mut self) -> RuntimeResult<()> {
        let template = self.template;
        let program = &template.program;

        while self.pc < program.len() {
            let pc = self.pc;
            let mut next = pc + 1;

            match &program[pc].op {
                Op::Begin | Op::Nop => {}

                Op::Finish => break,

                Op::Append(pieces) => {
                    let text = self.render_pieces(pieces)?;
                    self.ctx.emit(&text);
                }

                Op::Insert { name, indent } => {
                    let value = self.ctx.lookup(name);
                    self.ctx
                        .insert_lines(&value, indent, &format!("'{}'", name))?;
                }

                Op::Exec(expr) => {
                    self.eval(expr)?;
                }

                Op::Set { name, value } => {
                    let value = self.eval(value)?;
                    self.ctx.assign(name, value);
                }

                Op::If { .. } => {
                    self.blocks.push(Block::If { start: pc });
                    next = self.select_branch(pc)?;
                }

                // Reached by falling out of the previous branch's body.
                Op::Elif { end, .. } | Op::Else { end } => next = *end,

                Op::EndIf => {
                    self.blocks.pop();
                }

                Op::For {
                    names,
                    iterable,
                    end,
                } => {
                    let items = self.iteration_items(iterable)?;
                    if items.is_empty() {
                        next = end + 1;
                    } else {
                        self.ctx.push_scope();
                        self.blocks.push(Block::For {
                            start: pc,
                            names: names.clone(),
                            items,
                            index: 0,
                        });
                        self.bind_loop_variables()?;
                    }
                }

                Op::EndFor { start } => {
                    let more = match self.blocks.last_mut() {
                        Some(Block::For { items, index, .. }) => {
                            *index += 1;
                            *index < items.len()
                        }
                        _ => false,
                    };
                    if more {
                        self.bind_loop_variables()?;
                        next = start + 1;
                    } else {
                        self.blocks.pop();
                        self.ctx.pop_scope();
                    }
                }
            }

            self.pc = next;
        }

        Ok(())
    }

    /// Starting at the `if` at `pc`, test conditions until a branch is taken.
    /// Returns the index of the first instruction to run.
    fn select_branch(&mut self, mut pc: usize) -> RuntimeResult<usize> {
        let template = self.template;
        let program = &template.program;
        loop {
            match &program[pc].op {
                Op::If { condition, next } | Op::Elif { condition, next, .. } => {
                    // Errors in an `elif` condition belong to the `elif` line.
                    self.pc = pc;
                    if self.eval(condition)?.is_truthy() {
                        return Ok(pc + 1);
                    }
                    pc = *next;
                }
                Op::Else { .. } => return Ok(pc + 1),
                // No branch taken: run the `end`, which closes the block.
                _ => return Ok(pc),
            }
        }
    }

    /// Bind the loop variables of the innermost `for` to its current item.
    fn bind_loop_variables(&mut self) -> RuntimeResult<()> {
        let Some(Block::For {
            start,
            names,
            items,
            index,
        }) = self.blocks.last()
        else {
            return Ok(());
        };
        let item = items[*index].clone();

        if let [name] = names.as_slice() {
            self.ctx.define(name, item);
            return Ok(());
        }

        let parts = match item {
            Value::List(parts) => parts,
            other => {
                let message = format!(
                    "cannot unpack item {} into {} loop variables: item is a {}",
                    index + 1,
                    names.len(),
                    other.type_name()
                );
                // Reported against the `for` line, outside its own block.
                self.pc = *start;
                self.blocks.pop();
                return Err(RuntimeError::new(message));
            }
        };
        let bindings: Vec<(String, Value)> = names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), parts.get(i).cloned().unwrap_or_default()))
            .collect();
        for (name, value) in bindings {
            self.ctx.define(&name, value);
        }
        Ok(())
    }

    fn iteration_items(&mut self, iterable: &Expr) -> RuntimeResult<Vec<Value>> {
        match self.eval(iterable)? {
            Value::List(items) => Ok(items),
            Value::Map(m) => Ok(m.into_keys().map(Value::String).collect()),
            Value::Null => Ok(Vec::new()),
            other => Err(RuntimeError::new(format!(
                "cannot iterate over '{}': expected a list or map, found {}",
                iterable.describe(),
                other.type_name()
            ))),
        }
    }

    fn render_pieces(&mut self, pieces: &[Piece]) -> RuntimeResult<String> {
        let mut text = String::new();
        for piece in pieces {
            match piece {
                Piece::Literal(literal) => text.push_str(literal),
                Piece::Computed { expr, source } => {
                    let value = self.eval(expr)?;
                    match value.stringify() {
                        Some(s) => text.push_str(&s),
                        None if value.is_null() => {
                            return Err(RuntimeError::new(format!(
                                "undefined value for expression '{}'",
                                source
                            )));
                        }
                        None => {
                            return Err(RuntimeError::new(format!(
                                "cannot render expression '{}': value is a {}",
                                source,
                                value.type_name()
                            )));
                        }
                    }
                }
            }
        }
        Ok(text)
    }

    fn eval(&mut self, expr: &Expr) -> RuntimeResult<Value> {
        match expr {
            Expr::Nil => Ok(Value::Null),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::Str(s) => Ok(Value::String(s.clone())),
            Expr::List(items) => items
                .iter()
                .map(|item| self.eval(item))
                .collect::<RuntimeResult<Vec<_>>>()
                .map(Value::List),
            Expr::Var(name) => Ok(self.ctx.lookup(name)),

            Expr::Field(base, name) => match self.eval(base)? {
                Value::Map(m) => Ok(m.get(name).cloned().unwrap_or_default()),
                Value::Null => Err(RuntimeError::new(format!(
                    "cannot read field '{}' of '{}': value is undefined",
                    name,
                    base.describe()
                ))),
                other => Err(RuntimeError::new(format!(
                    "cannot read field '{}' of '{}': value is a {}",
                    name,
                    base.describe(),
                    other.type_name()
                ))),
            },

            Expr::Index(base, index) => {
                let container = self.eval(base)?;
                let key = self.eval(index)?;
                index_value(&container, &key).map_err(|reason| {
                    RuntimeError::new(format!("cannot index '{}': {}", base.describe(), reason))
                })
            }

            Expr::Call(callee, args) => {
                let builtin = match self.eval(callee)? {
                    Value::Function(builtin) => builtin,
                    Value::Null => {
                        return Err(RuntimeError::new(format!(
                            "cannot call '{}': value is undefined",
                            callee.describe()
                        )));
                    }
                    other => {
                        return Err(RuntimeError::new(format!(
                            "cannot call '{}': value is a {}",
                            callee.describe(),
                            other.type_name()
                        )));
                    }
                };
                let args = args
                    .iter()
                    .map(|arg| self.eval(arg))
                    .collect::<RuntimeResult<Vec<_>>>()?;
                builtins::call(builtin, args, &mut self.ctx)
            }

            Expr::Unary(UnaryOp::Not, operand) => Ok(Value::Bool(!self.eval(operand)?.is_truthy())),

            Expr::Unary(UnaryOp::Neg, operand) => match self.eval(operand)? {
                Value::Number(n) => Ok(Value::Number(-n)),
                other => Err(RuntimeError::new(format!(
                    "cannot negate a {}",
                    other.type_name()
                ))),
            },

            Expr::Binary(BinaryOp::And, left, right) => {
                let left = self.eval(left)?;
                if left.is_truthy() { self.eval(right) } else { Ok(left) }
            }

            Expr::Binary(BinaryOp::Or, left, right) => {
                let left = self.eval(left)?;
                if left.is_truthy() { Ok(left) } else { self.eval(right) }
            }

            Expr::Binary(op, left, right) => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                binary(*op, left, right)
            }
        }
    }

    /// Turn a runtime error raised at `self.pc` into a template error.
    fn failure(&self, error: RuntimeError) -> TemplateError {
        let program = &self.template.program;
        let source_lines = &self.template.source_lines;

        let line = program.get(self.pc).map_or(0, |i| i.line);
        let cause = if line == 0 {
            Diagnostic::new(error.message)
        } else {
            Diagnostic::new(error.message).at_line(line, source_lines)
        };

        let trace = self
            .blocks
            .iter()
            .rev()
            .map(|block| {
                Diagnostic::new(block.describe()).at_line(program[block.start()].line, source_lines)
            })
            .collect();

        tracing::debug!(line, error = %cause.message, "Template evaluation failed");
        TemplateError::Evaluation { cause, trace }
    }
}

fn index_value(container: &Value, key: &Value) -> Result<Value, String> {
    match (container, key) {
        (Value::List(items), Value::Number(n)) => {
            if n.fract() != 0.0 {
                return Err(format!("list index {} is not a whole number", n));
            }
            // Lists are indexed from 1.
            let item = if *n >= 1.0 {
                items.get(*n as usize - 1).cloned()
            } else {
                None
            };
            Ok(item.unwrap_or_default())
        }
        (Value::Map(m), Value::String(k)) => Ok(m.get(k).cloned().unwrap_or_default()),
        (Value::Null, _) => Err("value is undefined".to_string()),
        (Value::List(_), other) | (Value::Map(_), other) => Err(format!(
            "a {} cannot be indexed with a {}",
            container.type_name(),
            other.type_name()
        )),
        (other, _) => Err(format!("value is a {}", other.type_name())),
    }
}

fn binary(op: BinaryOp, left: Value, right: Value) -> RuntimeResult<Value> {
    let mismatch = |left: &Value, right: &Value| {
        RuntimeError::new(format!(
            "cannot apply '{}' to {} and {}",
            op.symbol(),
            left.type_name(),
            right.type_name()
        ))
    };

    match op {
        BinaryOp::Eq => Ok(Value::Bool(left == right)),
        BinaryOp::Ne => Ok(Value::Bool(left != right)),

        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = match (&left, &right) {
                (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
                (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
                _ => None,
            }
            .ok_or_else(|| mismatch(&left, &right))?;
            Ok(Value::Bool(match op {
                BinaryOp::Lt => ordering == Ordering::Less,
                BinaryOp::Le => ordering != Ordering::Greater,
                BinaryOp::Gt => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            }))
        }

        BinaryOp::Concat => {
            let (Some(a), Some(b)) = (left.stringify(), right.stringify()) else {
                return Err(mismatch(&left, &right));
            };
            Ok(Value::String(a + &b))
        }

        BinaryOp::Add => match (&left, &right) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
            (Value::String(a), Value::String(b)) => Ok(Value::String(format!("{}{}", a, b))),
            _ => Err(mismatch(&left, &right)),
        },

        BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
            let (Value::Number(a), Value::Number(b)) = (&left, &right) else {
                return Err(mismatch(&left, &right));
            };
            if matches!(op, BinaryOp::Div | BinaryOp::Rem) && *b == 0.0 {
                return Err(RuntimeError::new("division by zero"));
            }
            Ok(Value::Number(match op {
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Div => a / b,
                _ => a % b,
            }))
        }

        // Short-circuit operators are handled before both sides are evaluated.
        BinaryOp::And | BinaryOp::Or => Ok(if left.is_truthy() { right } else { left }),
    }
}
