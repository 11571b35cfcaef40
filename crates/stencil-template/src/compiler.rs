/*
 * compiler.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template compiler.
//!
//! Each template line becomes exactly one [`Instruction`]:
//!
//! 1. An *escape line* (first non-blank character `#`) becomes the statement
//!    written after the `#`. This takes priority over everything else.
//! 2. A *table-insertion directive* (`${name}` alone on a line) becomes an
//!    [`Op::Insert`] that keeps the whitespace in front of `${`.
//! 3. Any other line becomes an [`Op::Append`] of literal text and
//!    placeholders (`$(expr)`, or `«expr»` with [`VariableSyntax::Bracket`]).
//!
//! Once every line is translated, the `if`/`elif`/`else`/`for`/`end`
//! statements are linked into jumps. Any syntax problem is reported against
//! the template line it came from.

use crate::ast::Statement;
use crate::context::Environment;
use crate::error::{Diagnostic, TemplateError, TemplateResult};
use crate::lexer::find_closing_paren;
use crate::parser::{parse_expression, parse_statement};
use crate::program::{Instruction, Op, Piece};
use once_cell::sync::Lazy;
use regex::Regex;

/// An escape line: optional blanks, `#`, then the statement.
static ESCAPE_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*#(.*)$").unwrap());

/// A table-insertion directive: `${name}` with nothing but whitespace around.
static INSERT_DIRECTIVE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\s*)\$\{([A-Za-z_][A-Za-z0-9_]*)\}\s*$").unwrap());

/// Marker for jump targets that the linking pass has not filled in yet.
const UNLINKED: usize = usize::MAX;

/// Which placeholder syntax a template uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VariableSyntax {
    /// `$(expr)`
    #[default]
    Default,
    /// `«expr»`
    Bracket,
}

impl VariableSyntax {
    /// If a placeholder starts at `i`, return the bounds of its body and the
    /// index just past its closing delimiter.
    fn placeholder_at(self, chars: &[char], i: usize) -> Option<(usize, usize, usize)> {
        match self {
            VariableSyntax::Default => {
                if chars.get(i) != Some(&'$') || chars.get(i + 1) != Some(&'(') {
                    return None;
                }
                let close = find_closing_paren(chars, i + 2)?;
                Some((i + 2, close, close + 1))
            }
            VariableSyntax::Bracket => {
                if chars.get(i) != Some(&'«') {
                    return None;
                }
                let close = i + 1 + chars[i + 1..].iter().position(|&c| c == '»')?;
                Some((i + 1, close, close + 1))
            }
        }
    }
}

/// Options controlling compilation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileOptions {
    /// Number of spaces prepended to every produced line.
    pub indent: usize,
    /// Placeholder syntax.
    pub syntax: VariableSyntax,
}

impl CompileOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    pub fn with_syntax(mut self, syntax: VariableSyntax) -> Self {
        self.syntax = syntax;
        self
    }
}

/// A compiled template ready for evaluation.
#[derive(Debug, Clone)]
pub struct CompiledTemplate {
    /// Original source lines (for error reporting).
    pub(crate) source_lines: Vec<String>,

    /// The compiled program.
    pub(crate) program: Vec<Instruction>,

    /// Bindings the template is evaluated against.
    pub(crate) environment: Environment,

    /// Uniform indent prepended to every produced line.
    pub(crate) indent: String,
}

/// Compile `text` into a program bound to `environment`.
pub fn compile(
    text: &str,
    options: &CompileOptions,
    environment: Environment,
) -> TemplateResult<CompiledTemplate> {
    CompiledTemplate::compile(text, options, environment)
}

impl CompiledTemplate {
    /// Compile a template from source text.
    ///
    /// # Arguments
    /// * `text` - The template source text
    /// * `options` - Indent and placeholder syntax
    /// * `environment` - Bindings used by every later evaluation
    ///
    /// # Returns
    /// A compiled template, or [`TemplateError::Syntax`] naming the first
    /// offending line.
    pub fn compile(
        text: &str,
        options: &CompileOptions,
        environment: Environment,
    ) -> TemplateResult<Self> {
        let source_lines = split_lines(text);
        let syntax_error = |message: String, line: usize| {
            TemplateError::Syntax(Diagnostic::new(message).at_line(line, &source_lines))
        };

        let mut program = Vec::with_capacity(source_lines.len() + 2);
        program.push(Instruction {
            line: 0,
            op: Op::Begin,
        });
        for (index, source) in source_lines.iter().enumerate() {
            let line = index + 1;
            let op = translate_line(source, options.syntax).map_err(|e| syntax_error(e, line))?;
            program.push(Instruction { line, op });
        }
        program.push(Instruction {
            line: 0,
            op: Op::Finish,
        });

        link_blocks(&mut program).map_err(|(message, line)| syntax_error(message, line))?;

        tracing::debug!(
            lines = source_lines.len(),
            instructions = program.len(),
            syntax = ?options.syntax,
            "Compiled template"
        );

        Ok(Self {
            source_lines,
            program,
            environment,
            indent: " ".repeat(options.indent),
        })
    }

    /// The template's source lines.
    pub fn source_lines(&self) -> &[String] {
        &self.source_lines
    }

    /// The compiled program, prologue and epilogue included.
    pub fn program(&self) -> &[Instruction] {
        &self.program
    }

    /// The bound environment.
    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    /// Mutable access to the bound environment. Changes made here are seen by
    /// every later evaluation.
    pub fn environment_mut(&mut self) -> &mut Environment {
        &mut self.environment
    }
}

/// Split template text into lines. A trailing `\r` is dropped from each line.
fn split_lines(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    text.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
        .collect()
}

/// Translate one template line. Jump targets are left [`UNLINKED`].
fn translate_line(source: &str, syntax: VariableSyntax) -> Result<Op, String> {
    if let Some(caps) = ESCAPE_LINE.captures(source) {
        let code = &caps[1];
        let statement = parse_statement(code)
            .map_err(|e| format!("{} in statement '{}'", e, code.trim()))?;
        return Ok(match statement {
            Statement::Nop => Op::Nop,
            Statement::Expr(expr) => Op::Exec(expr),
            Statement::Set { name, value } => Op::Set { name, value },
            Statement::If(condition) => Op::If {
                condition,
                next: UNLINKED,
            },
            Statement::Elif(condition) => Op::Elif {
                condition,
                next: UNLINKED,
                end: UNLINKED,
            },
            Statement::Else => Op::Else { end: UNLINKED },
            // Whether this closes an `if` or a `for` is settled while linking.
            Statement::End => Op::EndIf,
            Statement::For { names, iterable } => Op::For {
                names,
                iterable,
                end: UNLINKED,
            },
        });
    }

    if let Some(caps) = INSERT_DIRECTIVE.captures(source) {
        return Ok(Op::Insert {
            name: caps[2].to_string(),
            indent: caps[1].to_string(),
        });
    }

    translate_text(source, syntax).map(Op::Append)
}

/// Split a text line into literal pieces and placeholders.
fn translate_text(source: &str, syntax: VariableSyntax) -> Result<Vec<Piece>, String> {
    let chars: Vec<char> = source.chars().collect();
    let mut pieces = Vec::new();
    let mut literal = String::new();
    let mut i = 0;

    while i < chars.len() {
        let Some((body_start, body_end, next)) = syntax.placeholder_at(&chars, i) else {
            literal.push(chars[i]);
            i += 1;
            continue;
        };

        let body: String = chars[body_start..body_end].iter().collect();
        let body = body.trim();
        if body.is_empty() {
            // `$()` / `«»` is plain text.
            literal.extend(&chars[i..next]);
        } else {
            let expr = parse_expression(body).map_err(|e| {
                let placeholder: String = chars[i..next].iter().collect();
                format!("{} in placeholder '{}'", e, placeholder)
            })?;
            if !literal.is_empty() {
                pieces.push(Piece::Literal(std::mem::take(&mut literal)));
            }
            pieces.push(Piece::Computed {
                expr,
                source: body.to_string(),
            });
        }
        i = next;
    }

    if !literal.is_empty() {
        pieces.push(Piece::Literal(literal));
    }
    Ok(pieces)
}

/// A block that has been opened but not yet closed while linking.
enum OpenBlock {
    If {
        start: usize,
        /// `if`/`elif`/`else` instructions of this block, in order.
        branches: Vec<usize>,
        has_else: bool,
    },
    For {
        start: usize,
    },
}

/// Fill in the jump targets of every control-flow instruction.
///
/// On failure returns the message and the template line to report.
fn link_blocks(program: &mut [Instruction]) -> Result<(), (String, usize)> {
    let mut open: Vec<OpenBlock> = Vec::new();

    for pc in 0..program.len() {
        let line = program[pc].line;
        match &program[pc].op {
            Op::If { .. } => open.push(OpenBlock::If {
                start: pc,
                branches: vec![pc],
                has_else: false,
            }),

            Op::For { .. } => open.push(OpenBlock::For { start: pc }),

            Op::Elif { .. } | Op::Else { .. } => {
                let is_else = matches!(program[pc].op, Op::Else { .. });
                let keyword = if is_else { "else" } else { "elif" };
                let Some(OpenBlock::If {
                    branches, has_else, ..
                }) = open.last_mut()
                else {
                    return Err((format!("'{}' without a matching 'if'", keyword), line));
                };
                if *has_else {
                    return Err((format!("'{}' after 'else'", keyword), line));
                }
                let previous = branches.last().copied().unwrap_or(pc);
                set_next(&mut program[previous].op, pc);
                branches.push(pc);
                *has_else = is_else;
            }

            Op::EndIf => match open.pop() {
                Some(OpenBlock::If { branches, .. }) => {
                    if let Some(&last) = branches.last() {
                        set_next(&mut program[last].op, pc);
                    }
                    for &branch in &branches {
                        set_end(&mut program[branch].op, pc);
                    }
                }
                Some(OpenBlock::For { start }) => {
                    if let Op::For { end, .. } = &mut program[start].op {
                        *end = pc;
                    }
                    program[pc].op = Op::EndFor { start };
                }
                None => {
                    return Err(("'end' without a matching 'if' or 'for'".to_string(), line));
                }
            },

            _ => {}
        }
    }

    match open.pop() {
        None => Ok(()),
        Some(OpenBlock::If { start, .. }) => Err((
            "'if' block is never closed with 'end'".to_string(),
            program[start].line,
        )),
        Some(OpenBlock::For { start }) => Err((
            "'for' loop is never closed with 'end'".to_string(),
            program[start].line,
        )),
    }
}

fn set_next(op: &mut Op, target: usize) {
    if let Op::If { next, .. } | Op::Elif { next, .. } = op {
        *next = target;
    }
}

fn set_end(op: &mut Op, target: usize) {
    if let Op::Elif { end, .. } | Op::Else { end } = op {
        *end = target;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Expr;

    fn compile_default(text: &str) -> TemplateResult<CompiledTemplate> {
        compile(text, &CompileOptions::default(), Environment::new())
    }

    fn ops(text: &str) -> Vec<Op> {
        compile_default(text)
            .expect("template should compile")
            .program
            .into_iter()
            .map(|i| i.op)
            .collect()
    }

    fn syntax_error(text: &str) -> Diagnostic {
        match compile_default(text) {
            Err(TemplateError::Syntax(diagnostic)) => diagnostic,
            other => panic!("expected a syntax error, got {:?}", other),
        }
    }

    fn var(name: &str) -> Expr {
        Expr::Var(name.to_string())
    }

    #[test]
    fn test_one_instruction_per_line() {
        let template = compile_default("a\n# if x\nb $(y)\n# end\n${items}").unwrap();
        assert_eq!(template.source_lines().len(), 5);
        assert_eq!(template.program().len(), 5 + 2);
        assert_eq!(template.program()[0].op, Op::Begin);
        assert_eq!(template.program()[6].op, Op::Finish);

        let lines: Vec<usize> = template.program().iter().map(|i| i.line).collect();
        assert_eq!(lines, vec![0, 1, 2, 3, 4, 5, 0]);
    }

    #[test]
    fn test_empty_template() {
        let template = compile_default("").unwrap();
        assert!(template.source_lines().is_empty());
        assert_eq!(template.program().len(), 2);
    }

    #[test]
    fn test_crlf_lines() {
        let template = compile_default("a\r\nb").unwrap();
        assert_eq!(template.source_lines(), &["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_text_pieces() {
        assert_eq!(
            ops("Hello $(name)!")[1],
            Op::Append(vec![
                Piece::Literal("Hello ".to_string()),
                Piece::Computed {
                    expr: var("name"),
                    source: "name".to_string()
                },
                Piece::Literal("!".to_string()),
            ])
        );
    }

    #[test]
    fn test_nested_parentheses_in_placeholder() {
        let op = &ops("$(upper((name)))x")[1];
        let Op::Append(pieces) = op else {
            panic!("expected an append, got {:?}", op);
        };
        assert_eq!(pieces.len(), 2);
        assert_eq!(pieces[1], Piece::Literal("x".to_string()));
    }

    #[test]
    fn test_empty_and_unclosed_placeholders_are_literal() {
        assert_eq!(
            ops("cost: $() and $( ) and $(oops")[1],
            Op::Append(vec![Piece::Literal(
                "cost: $() and $( ) and $(oops".to_string()
            )])
        );
    }

    #[test]
    fn test_bracket_syntax() {
        let template = compile(
            "Hello «name» $(raw)",
            &CompileOptions::new().with_syntax(VariableSyntax::Bracket),
            Environment::new(),
        )
        .unwrap();
        assert_eq!(
            template.program()[1].op,
            Op::Append(vec![
                Piece::Literal("Hello ".to_string()),
                Piece::Computed {
                    expr: var("name"),
                    source: "name".to_string()
                },
                Piece::Literal(" $(raw)".to_string()),
            ])
        );
    }

    #[test]
    fn test_insert_directive() {
        assert_eq!(
            ops("  ${items}  ")[1],
            Op::Insert {
                name: "items".to_string(),
                indent: "  ".to_string()
            }
        );
        // Anything else on the line makes it ordinary text.
        assert!(matches!(ops("x ${items}")[1], Op::Append(_)));
        assert!(matches!(ops("${not valid}")[1], Op::Append(_)));
    }

    #[test]
    fn test_escape_line_wins_over_directive() {
        assert_eq!(ops("  # insert(x)")[1], Op::Exec(Expr::Call(Box::new(var("insert")), vec![var("x")])));
        assert_eq!(ops("#")[1], Op::Nop);
        assert_eq!(ops("# -- note $(x)")[1], Op::Nop);
    }

    #[test]
    fn test_if_chain_is_linked() {
        let ops = ops("# if a\nA\n# elif b\nB\n# else\nC\n# end");
        assert_eq!(ops[1], Op::If { condition: var("a"), next: 3 });
        assert_eq!(
            ops[3],
            Op::Elif {
                condition: var("b"),
                next: 5,
                end: 7
            }
        );
        assert_eq!(ops[5], Op::Else { end: 7 });
        assert_eq!(ops[7], Op::EndIf);
    }

    #[test]
    fn test_if_without_else_jumps_to_end() {
        let ops = ops("# if a\nA\n# end");
        assert_eq!(ops[1], Op::If { condition: var("a"), next: 3 });
    }

    #[test]
    fn test_nested_for_is_linked() {
        let ops = ops("# for x in xs\n# if x\n$(x)\n# end\n# end");
        assert_eq!(
            ops[1],
            Op::For {
                names: vec!["x".to_string()],
                iterable: var("xs"),
                end: 5
            }
        );
        assert_eq!(ops[2], Op::If { condition: var("x"), next: 4 });
        assert_eq!(ops[4], Op::EndIf);
        assert_eq!(ops[5], Op::EndFor { start: 1 });
    }

    #[test]
    fn test_unbalanced_blocks() {
        let d = syntax_error("a\n# end");
        assert_eq!(d.line, Some(2));
        assert_eq!(d.message, "'end' without a matching 'if' or 'for'");

        let d = syntax_error("# for x in xs\n$(x)");
        assert_eq!(d.line, Some(1));
        assert_eq!(d.message, "'for' loop is never closed with 'end'");
        assert_eq!(d.source_line.as_deref(), Some("# for x in xs"));

        let d = syntax_error("# if a\n# else\n# elif b\n# end");
        assert_eq!(d.line, Some(3));
        assert_eq!(d.message, "'elif' after 'else'");

        let d = syntax_error("# for x in xs\n# else\n# end");
        assert_eq!(d.line, Some(2));
        assert_eq!(d.message, "'else' without a matching 'if'");
    }

    #[test]
    fn test_malformed_statement() {
        let d = syntax_error("# for x items\n# end");
        assert_eq!(d.line, Some(1));
        assert_eq!(
            d.message,
            "expected 'in' after the loop variables, found 'items' in statement 'for x items'"
        );
    }

    #[test]
    fn test_hash_lines_that_are_not_statements() {
        let d = syntax_error("#[test]\nfn it_works() {}");
        assert_eq!(d.line, Some(1));
        assert_eq!(
            d.message,
            "expected a statement, found an expression; write $(\"#\") for a literal '#' in statement '[test]'"
        );

        let d = syntax_error("fn it_works() {}\n# Heading");
        assert_eq!(d.line, Some(2));
        assert_eq!(d.source_line.as_deref(), Some("# Heading"));

        assert!(compile_default("$(\"#\")[test]\n$(\"#\") Heading").is_ok());
    }

    #[test]
    fn test_malformed_placeholder() {
        let err = compile_default("ok\nValue: $(a +)").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Syntax error in the template: expected an expression, found end of line in placeholder '$(a +)'\n\tat line 2:  >>> Value: $(a +) <<<"
        );
    }

    #[test]
    fn test_indent_option() {
        let template = compile("x", &CompileOptions::new().with_indent(4), Environment::new()).unwrap();
        assert_eq!(template.indent, "    ");
    }
}
