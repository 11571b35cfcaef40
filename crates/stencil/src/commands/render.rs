/*
 * render.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Render command implementation
 */

//! Render command implementation.
//!
//! This module implements the `stencil render` command, which renders one
//! template file against values from the command line and writes the result
//! to stdout.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::debug;

use stencil_template::{CompileOptions, VariableSyntax, compile};

use super::values;

/// Arguments for the render command
#[derive(Debug)]
pub struct RenderArgs {
    /// Template file
    pub file: PathBuf,
    /// `KEY=VALUE` assignments
    pub values: Vec<String>,
    /// JSON values file
    pub values_file: Option<PathBuf>,
    /// Uniform indent of the output
    pub indent: usize,
    /// Use bracket placeholders
    pub bracket: bool,
    /// Terminate every line with a newline
    pub lines: bool,
}

/// Execute the render command
pub fn execute(args: RenderArgs) -> Result<()> {
    let output = render_output(&args)?;
    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(output.as_bytes())
        .context("Failed to write output")?;
    Ok(())
}

/// Render the template named by `args` to the text the command prints.
pub fn render_output(args: &RenderArgs) -> Result<String> {
    let source = std::fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read template: {}", args.file.display()))?;
    let env = values::load(args.values_file.as_deref(), &args.values)?;

    let options = CompileOptions::new()
        .with_indent(args.indent)
        .with_syntax(syntax(args.bracket));
    let template = compile(&source, &options, env)?;
    debug!(
        file = %args.file.display(),
        instructions = template.program().len(),
        "Compiled template"
    );

    if args.lines {
        let mut output = String::new();
        for line in template.render_lines()? {
            output.push_str(&line);
            output.push('\n');
        }
        Ok(output)
    } else {
        Ok(template.render_text()?)
    }
}

pub(crate) fn syntax(bracket: bool) -> VariableSyntax {
    if bracket {
        VariableSyntax::Bracket
    } else {
        VariableSyntax::Default
    }
}
