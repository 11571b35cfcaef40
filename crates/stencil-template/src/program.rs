/*
 * program.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Compiled program representation.
//!
//! A compiled template is a flat list of [`Instruction`]s: a [`Op::Begin`]
//! prologue, exactly one instruction per template line, and a
//! [`Op::Finish`] epilogue. Control flow between escape lines is expressed
//! with jump targets, which are indices into the same list.

use crate::ast::Expr;

/// One step of a compiled program.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    /// 1-based template line this instruction was compiled from; `0` for the
    /// prologue and epilogue.
    pub line: usize,
    pub op: Op,
}

/// The operation an [`Instruction`] performs.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    /// Prologue: start with an empty output buffer.
    Begin,

    /// Append one output line built from literal and computed pieces.
    Append(Vec<Piece>),

    /// Table-insertion directive: append every element of the sequence
    /// variable `name`, each prefixed by `indent`.
    Insert { name: String, indent: String },

    /// Escape line with no effect (empty, or a comment).
    Nop,

    /// Escape line evaluating an expression for its effect.
    Exec(Expr),

    /// `set name = value`
    Set { name: String, value: Expr },

    /// `if condition`. `next` is the index of the following `elif`, `else`
    /// or `end` of the same block.
    If { condition: Expr, next: usize },

    /// `elif condition`. `next` as for [`Op::If`]; `end` is the index of the
    /// block's closing [`Op::EndIf`].
    Elif {
        condition: Expr,
        next: usize,
        end: usize,
    },

    /// `else`. `end` is the index of the block's closing [`Op::EndIf`].
    Else { end: usize },

    /// `end` of an `if` block.
    EndIf,

    /// `for names in iterable`. `end` is the index of the matching
    /// [`Op::EndFor`].
    For {
        names: Vec<String>,
        iterable: Expr,
        end: usize,
    },

    /// `end` of a `for` block. `start` is the index of the matching
    /// [`Op::For`].
    EndFor { start: usize },

    /// Epilogue: return the output buffer.
    Finish,
}

/// A piece of an [`Op::Append`] line.
#[derive(Debug, Clone, PartialEq)]
pub enum Piece {
    /// Text copied to the output as is.
    Literal(String),

    /// A placeholder: `expr` is evaluated and stringified. `source` is the
    /// placeholder's text, used to name it in error messages.
    Computed { expr: Expr, source: String },
}
