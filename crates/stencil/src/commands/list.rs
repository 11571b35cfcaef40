/*
 * list.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * List command implementation
 */

//! List command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};

use stencil_template::{DirectoryProvider, TemplateProvider};

/// Arguments for the list command
#[derive(Debug)]
pub struct ListArgs {
    /// Template directory
    pub templates: PathBuf,
    /// Directory the templates would be instantiated in
    pub target: Option<PathBuf>,
}

/// Execute the list command
pub fn execute(args: ListArgs) -> Result<()> {
    for name in template_names(&args)? {
        println!("{}", name);
    }
    Ok(())
}

/// Display names of the available templates, in order.
pub fn template_names(args: &ListArgs) -> Result<Vec<String>> {
    let target = args.target.clone().unwrap_or_else(|| PathBuf::from("."));
    let provider = DirectoryProvider::new(&args.templates);
    let templates = provider
        .templates(&target)
        .with_context(|| format!("Failed to list templates in {}", args.templates.display()))?;
    Ok(templates.into_iter().map(|t| t.display_name).collect())
}
