/*
 * values.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Template values from the command line
 */

//! Template values given on the command line.
//!
//! Values come from an optional JSON file (`--values FILE`) and from
//! `-V KEY=VALUE` assignments, which win over the file.

use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use stencil_template::{Environment, Value};

/// Parse one `KEY=VALUE` assignment.
///
/// VALUE is read as JSON when it parses (`-V count=3`, `-V tags='["a"]'`)
/// and kept as a string otherwise (`-V name=parser`).
pub fn parse_assignment(assignment: &str) -> Result<(String, Value)> {
    let (key, raw) = assignment
        .split_once('=')
        .ok_or_else(|| anyhow!("Invalid value '{}': expected KEY=VALUE", assignment))?;
    let key = key.trim();
    if key.is_empty() {
        bail!("Invalid value '{}': empty key", assignment);
    }

    let value = serde_json::from_str::<serde_json::Value>(raw)
        .map(Value::from)
        .unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}

/// Build the environment from a values file and assignments.
pub fn load(values_file: Option<&Path>, assignments: &[String]) -> Result<Environment> {
    let mut env = match values_file {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read values file: {}", path.display()))?;
            let json: serde_json::Value = serde_json::from_str(&text)
                .with_context(|| format!("Failed to parse values file: {}", path.display()))?;
            Environment::from_json(json).ok_or_else(|| {
                anyhow!("Values file must contain a JSON object: {}", path.display())
            })?
        }
        None => Environment::new(),
    };

    for assignment in assignments {
        let (key, value) = parse_assignment(assignment)?;
        env.insert(key, value);
    }
    Ok(env)
}
