/*
 * new.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * New command implementation
 */

//! New command implementation.
//!
//! `stencil new` picks a template from a template directory, renders its
//! file name and content with the directory's shared values, the template's
//! defaults and the command-line values, and writes the file into the target
//! directory.

use std::path::PathBuf;

use anyhow::{Context, Result, anyhow, bail};
use tracing::info;

use stencil_template::{CompileOptions, DirectoryProvider, TemplateProvider, generate};

use super::render::syntax;
use super::values;

/// Arguments for the new command
#[derive(Debug)]
pub struct NewArgs {
    /// Display name of the template
    pub template: String,
    /// Value of the `name` variable
    pub name: String,
    /// Template directory
    pub templates: PathBuf,
    /// Directory to create the file in
    pub dir: Option<PathBuf>,
    /// `KEY=VALUE` assignments
    pub values: Vec<String>,
    /// JSON values file
    pub values_file: Option<PathBuf>,
    /// Uniform indent of the content
    pub indent: usize,
    /// Use bracket placeholders
    pub bracket: bool,
    /// Overwrite an existing file
    pub force: bool,
}

/// Execute the new command
pub fn execute(args: NewArgs) -> Result<()> {
    let path = create(&args)?;
    println!("{}", path.display());
    Ok(())
}

/// Create the file and return its path.
pub fn create(args: &NewArgs) -> Result<PathBuf> {
    let target = args.dir.clone().unwrap_or_else(|| PathBuf::from("."));
    let provider = DirectoryProvider::new(&args.templates);

    let templates = provider
        .templates(&target)
        .with_context(|| format!("Failed to list templates in {}", args.templates.display()))?;
    let template = templates
        .iter()
        .find(|t| t.display_name == args.template)
        .ok_or_else(|| {
            let available: Vec<&str> = templates.iter().map(|t| t.display_name.as_str()).collect();
            anyhow!(
                "No template named '{}' in {} (available: {})",
                args.template,
                args.templates.display(),
                available.join(", ")
            )
        })?;

    let mut user_values = values::load(args.values_file.as_deref(), &args.values)?;
    user_values.insert("name", args.name.as_str());

    let options = CompileOptions::new()
        .with_indent(args.indent)
        .with_syntax(syntax(args.bracket));
    let file = generate(
        template,
        &provider.shared_values(&target),
        &user_values,
        &options,
    )
    .with_context(|| format!("Failed to generate '{}'", template.display_name))?;

    let path = target.join(&file.file_name);
    if path.exists() && !args.force {
        bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    std::fs::write(&path, &file.content)
        .with_context(|| format!("Failed to write file: {}", path.display()))?;

    info!(
        path = %path.display(),
        cursor_line = file.cursor_line,
        "Created file"
    );
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, NewArgs) {
        let dir = TempDir::new().unwrap();
        let templates = dir.path().join("templates");
        std::fs::create_dir(&templates).unwrap();
        std::fs::write(
            templates.join("$(name).rs.tmpl"),
            "#! cursor=2\n// $(name) by $(author)\n",
        )
        .unwrap();
        std::fs::write(templates.join("values.json"), r#"{"author": "team"}"#).unwrap();

        let args = NewArgs {
            template: "$(name).rs".to_string(),
            name: "lexer".to_string(),
            templates,
            dir: Some(dir.path().join("src")),
            values: Vec::new(),
            values_file: None,
            indent: 0,
            bracket: false,
            force: false,
        };
        (dir, args)
    }

    #[test]
    fn test_create_file() {
        let (dir, args) = setup();
        let path = create(&args).unwrap();

        assert_eq!(path, dir.path().join("src").join("lexer.rs"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "// lexer by team\n");
    }

    #[test]
    fn test_name_flag_wins_over_values() {
        let (_dir, mut args) = setup();
        args.values = vec!["name=other".to_string(), "author=ada".to_string()];
        let path = create(&args).unwrap();

        assert!(path.ends_with("lexer.rs"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "// lexer by ada\n");
    }

    #[test]
    fn test_refuses_to_overwrite() {
        let (_dir, mut args) = setup();
        let path = create(&args).unwrap();
        std::fs::write(&path, "edited").unwrap();

        let err = create(&args).unwrap_err();
        assert!(err.to_string().contains("already exists"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "edited");

        args.force = true;
        create(&args).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "// lexer by team\n");
    }

    #[test]
    fn test_unknown_template() {
        let (_dir, mut args) = setup();
        args.template = "missing".to_string();
        let err = create(&args).unwrap_err();
        assert_eq!(
            err.to_string(),
            format!(
                "No template named 'missing' in {} (available: $(name).rs)",
                args.templates.display()
            )
        );
    }
}
