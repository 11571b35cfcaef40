/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Line-oriented file templates.
//!
//! A template is plain text in which:
//!
//! - Placeholders: `$(expr)`, or `«expr»` with [`VariableSyntax::Bracket`]
//! - Escape lines: a line whose first non-blank character is `#` holds a
//!   statement (`if`/`elif`/`else`/`end`, `for ... in`, `set`, or an
//!   expression such as `insert(lines)`)
//! - Table insertion: `${name}` alone on a line expands to one output line
//!   per element of the list `name`
//!
//! Everything else is copied to the output as is.
//!
//! # Architecture
//!
//! [`compile`] translates each template line into exactly one
//! [`Instruction`] and links block statements into jumps, so every runtime
//! failure can be reported against the template line it came from. A
//! [`CompiledTemplate`] keeps the environment it was compiled against and
//! can be evaluated any number of times, each time with an optional layer of
//! per-call overrides.
//!
//! # Example
//!
//! ```ignore
//! use stencil_template::{CompileOptions, Environment, EvalOptions, compile};
//!
//! let template = compile(
//!     "# if debug\nlog::debug!(\"$(name)\");\n# end",
//!     &CompileOptions::default(),
//!     Environment::new().with("name", "start"),
//! )?;
//!
//! let overrides = Environment::new().with("debug", true);
//! let output = template.evaluate(&EvalOptions::default(), Some(&overrides))?;
//! assert_eq!(output.into_text(), "log::debug!(\"start\");");
//! ```

pub mod ast;
pub mod builtins;
pub mod compiler;
pub mod context;
pub mod decorate;
pub mod error;
mod eval_context;
pub mod evaluator;
mod lexer;
mod parser;
pub mod program;
pub mod provider;

// Re-export main types at crate root
pub use builtins::Builtin;
pub use compiler::{CompileOptions, CompiledTemplate, VariableSyntax, compile};
pub use context::{Environment, Value};
pub use decorate::{Decorate, decorate};
pub use error::{Diagnostic, TemplateError, TemplateResult};
pub use evaluator::{EvalOptions, Rendered, render};
pub use program::{Instruction, Op, Piece};
pub use provider::{
    DirectoryProvider, FileTemplate, GeneratedFile, MemoryProvider, TemplateProvider, generate,
};
