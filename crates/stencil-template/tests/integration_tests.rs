/*
 * integration_tests.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Integration tests for stencil-template using test fixtures.
 */

use pretty_assertions::assert_eq;
use serde_json::json;
use std::path::{Path, PathBuf};
use stencil_template::{
    CompileOptions, CompiledTemplate, DirectoryProvider, Environment, EvalOptions,
    TemplateError, TemplateProvider, VariableSyntax, compile, generate,
};

/// Helper to get the path to test fixtures
fn fixture_path(name: &str) -> PathBuf {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    Path::new(manifest_dir).join("test-fixtures").join(name)
}

fn read_fixture(name: &str) -> String {
    std::fs::read_to_string(fixture_path(name))
        .unwrap_or_else(|_| panic!("Failed to read fixture: {}", name))
}

/// Helper to compile a template from fixtures
fn load_template(name: &str, env: serde_json::Value) -> CompiledTemplate {
    let env = Environment::from_json(env).expect("fixture values should be an object");
    compile(&read_fixture(name), &CompileOptions::default(), env)
        .unwrap_or_else(|e| panic!("Failed to compile template {}: {}", name, e))
}

fn struct_values() -> serde_json::Value {
    json!({
        "namespace": "demo",
        "header": ["first", "second"],
        "name": "Point",
        "fields": {"x": "f64", "y": "f64"},
        "derive_default": true,
        "defaults": ["x: 0.0,", "y: 0.0,"]
    })
}

#[test]
fn test_struct_template() {
    let template = load_template("struct.tmpl", struct_values());

    let expected = "\
// Generated for demo
// first
// second
pub struct Point {
    pub x: f64,
    pub y: f64,
}
impl Default for Point {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
        }
    }
}
";
    assert_eq!(template.render_text().unwrap(), expected);
}

#[test]
fn test_struct_template_with_overrides() {
    let template = load_template("struct.tmpl", struct_values());
    let overrides = Environment::new()
        .with("derive_default", false)
        .with("header", Vec::<String>::new());

    let output = template
        .evaluate(&EvalOptions::new().with_lines(true), Some(&overrides))
        .unwrap()
        .into_lines();
    assert_eq!(
        output,
        vec![
            "// Generated for demo",
            "pub struct Point {",
            "    pub x: f64,",
            "    pub y: f64,",
            "}",
            "",
        ]
    );

    // The bound environment is untouched.
    assert!(template.render_text().unwrap().contains("impl Default for Point"));
}

#[test]
fn test_program_has_one_instruction_per_line() {
    let source = read_fixture("struct.tmpl");
    let template = load_template("struct.tmpl", struct_values());
    assert_eq!(template.source_lines().len(), source.split('\n').count());
    assert_eq!(template.program().len(), template.source_lines().len() + 2);
}

#[test]
fn test_bracket_template() {
    let env = Environment::from_json(json!({"name": "demo", "authors": ["Ada", "Grace"]}))
        .unwrap();
    let options = CompileOptions::new().with_syntax(VariableSyntax::Bracket);
    let template = compile(&read_fixture("bracket.tmpl"), &options, env).unwrap();

    assert_eq!(
        template.render_text().unwrap(),
        "[package]\nname = \"demo\"\nauthors = [\"Ada\", \"Grace\"]\n"
    );
}

#[test]
fn test_error_trace_from_fixture() {
    let template = load_template(
        "broken.tmpl",
        json!({"items": [{"enabled": true, "label": "ok"}, {"enabled": true}]}),
    );
    let err = template.render_text().unwrap_err();

    assert!(matches!(err, TemplateError::Evaluation { .. }));
    assert_eq!(
        err.messages(),
        vec![
            "Error in the template: undefined value for expression 'item.label'\n\tat line 3:  >>> - $(item.label) <<<",
            "\tin if block at line 2:  >>> # if item.enabled <<<",
            "\tin for loop at line 1:  >>> # for item in items <<<",
        ]
    );
}

#[test]
fn test_unclosed_block_from_fixture() {
    let err = compile(
        &read_fixture("unclosed.tmpl"),
        &CompileOptions::default(),
        Environment::new(),
    )
    .unwrap_err();

    assert_eq!(
        err.to_string(),
        "Syntax error in the template: 'for' loop is never closed with 'end'\n\tat line 1:  >>> # for x in xs <<<"
    );
}

#[test]
fn test_directory_provider_with_fixtures() {
    let dir = fixture_path("templates");
    let provider = DirectoryProvider::new(&dir);

    let templates = provider.templates(&dir).unwrap();
    let names: Vec<&str> = templates.iter().map(|t| t.display_name.as_str()).collect();
    assert_eq!(names, vec!["$(name).rs", "$(name)_test.rs"]);

    let shared = provider.shared_values(&dir);
    let user = Environment::new().with("name", "parser");

    let module = generate(&templates[0], &shared, &user, &CompileOptions::default()).unwrap();
    assert_eq!(module.file_name, "parser.rs");
    assert_eq!(module.cursor_line, Some(4));
    assert_eq!(
        module.content,
        "//! parser module of demo.\n\npub fn parser() {\n}\n"
    );

    let test = generate(&templates[1], &shared, &user, &CompileOptions::default()).unwrap();
    assert_eq!(test.file_name, "parser_test.rs");
    assert_eq!(
        test.content,
        "use demo::parser;\n\n#[test]\nfn test_parser() {\n    parser();\n}\n"
    );
}

#[test]
fn test_compiled_template_is_shareable_across_threads() {
    let template = load_template("struct.tmpl", struct_values());
    let expected = template.render_text().unwrap();

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(|| template.render_text().unwrap()))
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    });
}
