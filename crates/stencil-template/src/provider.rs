/*
 * provider.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! File template providers.
//!
//! A provider supplies, for a target directory, the file templates that can
//! be instantiated there plus values shared by all of them. [`generate`]
//! turns one template into a file name and file content.

use crate::compiler::{CompileOptions, compile};
use crate::context::Environment;
use crate::error::{TemplateError, TemplateResult};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};

/// Extension of template files read by [`DirectoryProvider`].
pub const TEMPLATE_EXTENSION: &str = "tmpl";

/// Name of the optional JSON file holding a template directory's shared values.
pub const SHARED_VALUES_FILE: &str = "values.json";

/// Optional first line of a template file: `#! cursor=<n>`.
static CURSOR_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#!\s*cursor\s*=\s*(\d+)\s*$").unwrap());

/// A template for a whole file.
#[derive(Debug, Clone, PartialEq)]
pub struct FileTemplate {
    /// Name shown when choosing a template.
    pub display_name: String,
    /// Template for the generated file's name.
    pub file_name_template: String,
    /// Template for the generated file's content.
    pub content_template: String,
    /// Line to place the cursor on after the file is created.
    pub initial_cursor_line: Option<usize>,
    /// Values specific to this template.
    pub default_values: Environment,
}

impl FileTemplate {
    pub fn new(
        display_name: impl Into<String>,
        file_name_template: impl Into<String>,
        content_template: impl Into<String>,
    ) -> Self {
        Self {
            display_name: display_name.into(),
            file_name_template: file_name_template.into(),
            content_template: content_template.into(),
            initial_cursor_line: None,
            default_values: Environment::new(),
        }
    }

    pub fn with_cursor_line(mut self, line: usize) -> Self {
        self.initial_cursor_line = Some(line);
        self
    }

    pub fn with_default_values(mut self, values: Environment) -> Self {
        self.default_values = values;
        self
    }

    /// Parse the source of a template file.
    ///
    /// `stem` is the file name without the template extension; it serves as
    /// both the display name and the file name template. A leading
    /// `#! cursor=<n>` header sets the cursor line and is dropped from the
    /// content.
    pub fn from_source(stem: &str, source: &str) -> Self {
        let (first, rest) = match source.split_once('\n') {
            Some((first, rest)) => (first, rest),
            None => (source, ""),
        };

        let template = FileTemplate::new(stem, stem, source);
        let Some(caps) = CURSOR_HEADER.captures(first.trim_end_matches('\r')) else {
            return template;
        };
        match caps[1].parse::<usize>() {
            Ok(line) => FileTemplate {
                content_template: rest.to_string(),
                ..template.with_cursor_line(line)
            },
            Err(_) => template,
        }
    }
}

/// Source of file templates for a target directory.
pub trait TemplateProvider {
    /// Templates that can be instantiated in `target_dir`.
    fn templates(&self, target_dir: &Path) -> TemplateResult<Vec<FileTemplate>>;

    /// Values available to every template in `target_dir`.
    fn shared_values(&self, target_dir: &Path) -> Environment;
}

/// Provider holding its templates in memory.
///
/// Useful for tests and for templates bundled into an application.
#[derive(Debug, Clone, Default)]
pub struct MemoryProvider {
    templates: Vec<FileTemplate>,
    shared: Environment,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a template to the provider.
    pub fn add(&mut self, template: FileTemplate) -> &mut Self {
        self.templates.push(template);
        self
    }

    pub fn with_templates(templates: impl IntoIterator<Item = FileTemplate>) -> Self {
        Self {
            templates: templates.into_iter().collect(),
            shared: Environment::new(),
        }
    }

    pub fn with_shared_values(mut self, shared: Environment) -> Self {
        self.shared = shared;
        self
    }
}

impl TemplateProvider for MemoryProvider {
    fn templates(&self, _target_dir: &Path) -> TemplateResult<Vec<FileTemplate>> {
        Ok(self.templates.clone())
    }

    fn shared_values(&self, _target_dir: &Path) -> Environment {
        self.shared.clone()
    }
}

/// Provider reading `*.tmpl` files from a template directory.
///
/// `$(name).rs.tmpl` yields a template whose display name and file name
/// template are both `$(name).rs`. A `values.json` object next to the
/// templates supplies shared values, under any values set with
/// [`DirectoryProvider::with_shared_values`].
#[derive(Debug, Clone)]
pub struct DirectoryProvider {
    dir: PathBuf,
    shared: Environment,
}

impl DirectoryProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            shared: Environment::new(),
        }
    }

    pub fn with_shared_values(mut self, shared: Environment) -> Self {
        self.shared = shared;
        self
    }

    /// The directory templates are read from.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn read_values_file(&self) -> Option<Environment> {
        let path = self.dir.join(SHARED_VALUES_FILE);
        let text = std::fs::read_to_string(&path).ok()?;
        let parsed = serde_json::from_str::<serde_json::Value>(&text)
            .ok()
            .and_then(Environment::from_json);
        if parsed.is_none() {
            tracing::warn!(path = %path.display(), "Ignoring shared values file: not a JSON object");
        }
        parsed
    }
}

impl TemplateProvider for DirectoryProvider {
    fn templates(&self, target_dir: &Path) -> TemplateResult<Vec<FileTemplate>> {
        let entries = std::fs::read_dir(&self.dir).map_err(|e| TemplateError::Provider {
            message: format!("cannot read template directory {}: {}", self.dir.display(), e),
        })?;

        let mut templates = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if !path.is_file()
                || path.extension().and_then(|e| e.to_str()) != Some(TEMPLATE_EXTENSION)
            {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let source = std::fs::read_to_string(&path)?;
            templates.push(FileTemplate::from_source(stem, &source));
        }
        templates.sort_by(|a, b| a.display_name.cmp(&b.display_name));

        tracing::debug!(
            dir = %self.dir.display(),
            target = %target_dir.display(),
            count = templates.len(),
            "Discovered templates"
        );
        Ok(templates)
    }

    fn shared_values(&self, _target_dir: &Path) -> Environment {
        let mut values = self.read_values_file().unwrap_or_default();
        values.merge(&self.shared);
        values
    }
}

/// A file produced by [`generate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub file_name: String,
    pub content: String,
    pub cursor_line: Option<usize>,
}

/// Instantiate `template`.
///
/// Both the file name and the content are rendered against the merge of
/// `shared`, the template's default values and `user_values`, later layers
/// winning. The indent in `options` applies to the content only.
pub fn generate(
    template: &FileTemplate,
    shared: &Environment,
    user_values: &Environment,
    options: &CompileOptions,
) -> TemplateResult<GeneratedFile> {
    let mut values = shared.clone();
    values.merge(&template.default_values);
    values.merge(user_values);

    let name_options = CompileOptions::new().with_syntax(options.syntax);
    let file_name = compile(&template.file_name_template, &name_options, values.clone())?
        .render_text()?;
    if file_name.trim().is_empty() || file_name.contains('\n') {
        return Err(TemplateError::Provider {
            message: format!(
                "template '{}' produced an invalid file name {:?}",
                template.display_name, file_name
            ),
        });
    }

    let content = compile(&template.content_template, options, values)?.render_text()?;

    tracing::debug!(template = %template.display_name, file = %file_name, "Generated file");
    Ok(GeneratedFile {
        file_name,
        content,
        cursor_line: template.initial_cursor_line,
    })
}
