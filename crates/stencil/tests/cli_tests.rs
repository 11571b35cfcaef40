/*
 * cli_tests.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Integration tests for the stencil binary.
 */

//! End-to-end tests running the `stencil` binary.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn stencil(args: &[&str], cwd: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_stencil"))
        .args(args)
        .current_dir(cwd)
        .env("RUST_LOG", "off")
        .output()
        .expect("Failed to run stencil")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn template_dir(root: &Path) {
    let templates = root.join("templates");
    fs::create_dir(&templates).unwrap();
    fs::write(
        templates.join("$(name).rs.tmpl"),
        "#! cursor=3\n//! $(name)\n\npub fn $(name)() {}\n",
    )
    .unwrap();
    fs::write(templates.join("README.md.tmpl"), "Title: $(upper(name))\n").unwrap();
}

#[test]
fn test_render_command() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("list.tmpl"),
        "# for i, item in enumerate(items)\n$(i). $(item)\n# end",
    )
    .unwrap();

    let output = stencil(
        &["render", "list.tmpl", "-V", r#"items=["a","b"]"#, "--lines"],
        temp.path(),
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output), "1. a\n2. b\n");
}

#[test]
fn test_render_with_values_file() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("t.tmpl"), "$(greeting), $(name)").unwrap();
    fs::write(
        temp.path().join("values.json"),
        r#"{"greeting": "Hello", "name": "file"}"#,
    )
    .unwrap();

    let output = stencil(
        &["render", "t.tmpl", "--values", "values.json", "-V", "name=cli"],
        temp.path(),
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output), "Hello, cli");
}

#[test]
fn test_render_error_reports_line() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("bad.tmpl"), "ok\n$(missing)").unwrap();

    let output = stencil(&["render", "bad.tmpl"], temp.path());
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).is_empty());
    let err = stderr(&output);
    assert!(err.contains("Error in the template: undefined value for expression 'missing'"));
    assert!(err.contains("at line 2:  >>> $(missing) <<<"));
}

#[test]
fn test_render_syntax_error() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("bad.tmpl"), "# if x\nnever closed").unwrap();

    let output = stencil(&["render", "bad.tmpl"], temp.path());
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Syntax error in the template: 'if' block is never closed with 'end'"));
}

#[test]
fn test_list_command() {
    let temp = TempDir::new().unwrap();
    template_dir(temp.path());

    let output = stencil(&["list"], temp.path());
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output), "$(name).rs\nREADME.md\n");
}

#[test]
fn test_new_command() {
    let temp = TempDir::new().unwrap();
    template_dir(temp.path());

    let output = stencil(
        &["new", "$(name).rs", "--name", "lexer", "--dir", "src"],
        temp.path(),
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let created = temp.path().join("src").join("lexer.rs");
    assert_eq!(
        fs::read_to_string(&created).unwrap(),
        "//! lexer\n\npub fn lexer() {}\n"
    );

    // A second run refuses to overwrite.
    let again = stencil(
        &["new", "$(name).rs", "--name", "lexer", "--dir", "src"],
        temp.path(),
    );
    assert_eq!(again.status.code(), Some(1));
    assert!(stderr(&again).contains("already exists"));

    let forced = stencil(
        &["new", "README.md", "--name", "demo", "--force"],
        temp.path(),
    );
    assert!(forced.status.success(), "stderr: {}", stderr(&forced));
    assert_eq!(
        fs::read_to_string(temp.path().join("README.md")).unwrap(),
        "Title: DEMO\n"
    );
}
