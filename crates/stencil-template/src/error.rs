/*
 * error.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Error types for template compilation and evaluation.
//!
//! Every error that originates in a template carries the 1-based line it came
//! from, together with the verbatim text of that line, so callers can show the
//! author exactly where things went wrong.

use std::fmt;
use thiserror::Error;

/// A line-annotated error record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// 1-based template line, or `None` when it cannot be determined.
    pub line: Option<usize>,
    /// Human-readable description of the problem.
    pub message: String,
    /// Verbatim text of the template line at `line`.
    pub source_line: Option<String>,
}

impl Diagnostic {
    /// Create a diagnostic without a location.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            line: None,
            message: message.into(),
            source_line: None,
        }
    }

    /// Attach a template line, looking up its text in `source_lines`.
    pub fn at_line(mut self, line: usize, source_lines: &[String]) -> Self {
        self.line = Some(line);
        self.source_line = line
            .checked_sub(1)
            .and_then(|index| source_lines.get(index))
            .cloned();
        self
    }

    /// The `at line <n>:  >>> <text> <<<` clause, if a line is known.
    pub fn location(&self) -> Option<String> {
        self.line.map(|line| {
            format!(
                "at line {}:  >>> {} <<<",
                line,
                self.source_line.as_deref().unwrap_or("")
            )
        })
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(location) = self.location() {
            write!(f, "\n\t{}", location)?;
        }
        Ok(())
    }
}

/// Errors that can occur during template operations.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// The template could not be compiled.
    #[error("Syntax error in the template: {0}")]
    Syntax(Diagnostic),

    /// The compiled program failed while running.
    ///
    /// `trace` holds one frame per block (`for`/`if`) that was open when the
    /// failure happened, innermost first.
    #[error("{}", evaluation_messages(.cause, .trace).join("\n"))]
    Evaluation {
        cause: Diagnostic,
        trace: Vec<Diagnostic>,
    },

    /// A template provider could not supply templates.
    #[error("Template provider error: {message}")]
    Provider { message: String },

    /// I/O error (e.g., reading a template directory).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TemplateError {
    /// The error as an ordered list of human-readable lines.
    ///
    /// For evaluation failures the primary cause comes first, followed by one
    /// entry per trace frame.
    pub fn messages(&self) -> Vec<String> {
        match self {
            TemplateError::Evaluation { cause, trace } => evaluation_messages(cause, trace),
            other => vec![other.to_string()],
        }
    }

    /// Template line of the primary cause, if known.
    pub fn line(&self) -> Option<usize> {
        match self {
            TemplateError::Syntax(diagnostic) => diagnostic.line,
            TemplateError::Evaluation { cause, .. } => cause.line,
            _ => None,
        }
    }
}

fn evaluation_messages(cause: &Diagnostic, trace: &[Diagnostic]) -> Vec<String> {
    let mut messages = vec![format!("Error in the template: {}", cause)];
    messages.extend(trace.iter().map(|frame| match frame.location() {
        Some(location) => format!("\tin {} {}", frame.message, location),
        None => format!("\tin {}", frame.message),
    }));
    messages
}

/// Result type for template operations.
pub type TemplateResult<T> = Result<T, TemplateError>;

/// A failure raised while running a single instruction.
///
/// The evaluator turns it into a [`TemplateError::Evaluation`] once it knows
/// which instruction was running.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RuntimeError {
    pub message: String,
}

impl RuntimeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub(crate) type RuntimeResult<T> = Result<T, RuntimeError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn lines() -> Vec<String> {
        vec!["first".to_string(), "# for x in xs".to_string()]
    }

    #[test]
    fn test_syntax_error_with_line() {
        let err = TemplateError::Syntax(Diagnostic::new("unexpected token").at_line(2, &lines()));
        assert_eq!(
            err.to_string(),
            "Syntax error in the template: unexpected token\n\tat line 2:  >>> # for x in xs <<<"
        );
        assert_eq!(err.line(), Some(2));
    }

    #[test]
    fn test_syntax_error_without_line() {
        let err = TemplateError::Syntax(Diagnostic::new("unexpected token"));
        assert_eq!(err.to_string(), "Syntax error in the template: unexpected token");
        assert_eq!(err.line(), None);
    }

    #[test]
    fn test_line_out_of_range_has_no_source() {
        let diagnostic = Diagnostic::new("boom").at_line(7, &lines());
        assert_eq!(diagnostic.line, Some(7));
        assert_eq!(diagnostic.source_line, None);
        assert_eq!(diagnostic.to_string(), "boom\n\tat line 7:  >>>  <<<");
    }

    #[test]
    fn test_evaluation_messages() {
        let err = TemplateError::Evaluation {
            cause: Diagnostic::new("undefined value for expression 'x'").at_line(1, &lines()),
            trace: vec![Diagnostic::new("for loop").at_line(2, &lines())],
        };
        let messages = err.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(
            messages[0],
            "Error in the template: undefined value for expression 'x'\n\tat line 1:  >>> first <<<"
        );
        assert_eq!(messages[1], "\tin for loop at line 2:  >>> # for x in xs <<<");
        assert_eq!(err.to_string(), messages.join("\n"));
    }
}
