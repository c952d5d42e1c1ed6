//! Custom template files loaded through the executor configuration

use std::fs;

use dom_scripts::config::{load_template_file, parse_template_specs};
use dom_scripts::template::Embedding;
use dom_scripts::{
    bindings, ConfigError, ExecuteError, ExecutorConfig, JavascriptExecutor, MemoryPage,
    ResultShape, TemplateError,
};

const EXTRA: &str = r#"
[[template]]
name = "scroll-to"
body = """
window.scrollTo(0, %offset);
return true;
"""
result = "done"

[template.placeholders]
offset = "raw"

[[template]]
name = "title-of"
body = "return document.querySelector('%selector').title;"
result = "text"
element_argument = false

[template.placeholders]
selector = "literal"
"#;

fn write_config(dir: &std::path::Path) -> std::path::PathBuf {
    fs::write(dir.join("extra.toml"), EXTRA).unwrap();
    fs::write(
        dir.join("focus.js"),
        "document.querySelector('%selector').focus();\n",
    )
    .unwrap();
    let path = dir.join("executor.toml");
    fs::write(
        &path,
        "strict_bindings = true\ntemplate_files = [\"extra.toml\", \"focus.js\"]\n",
    )
    .unwrap();
    path
}

#[test]
fn test_config_registers_custom_templates() {
    let dir = tempfile::tempdir().unwrap();
    let config = ExecutorConfig::from_file(&write_config(dir.path())).unwrap();
    let store = config.build_store().unwrap();

    assert_eq!(store.len(), 13);
    let scroll = store.lookup("scroll-to").unwrap();
    assert_eq!(scroll.result(), ResultShape::Done);
    assert_eq!(scroll.embedding("offset"), Some(Embedding::Raw));
    assert_eq!(store.lookup("title-of").unwrap().result(), ResultShape::Text);
    assert_eq!(store.lookup("focus.js").unwrap().result(), ResultShape::Any);
}

#[test]
fn test_raw_and_literal_embeddings() {
    let dir = tempfile::tempdir().unwrap();
    let config = ExecutorConfig::from_file(&write_config(dir.path())).unwrap();
    let executor = JavascriptExecutor::with_config(MemoryPage::new(), config).unwrap();

    let scroll = executor
        .render("scroll-to", &bindings([("offset", "window.innerHeight / 2")]))
        .unwrap();
    assert!(scroll
        .source()
        .contains("window.scrollTo(0, window.innerHeight / 2);"));
    assert!(scroll.source().contains("status: 'ok'"));

    let title = executor
        .render("title-of", &bindings([("selector", "a[title='x']")]))
        .unwrap();
    assert!(title.source().contains(r"document.querySelector('a[title=\'x\']')"));
}

#[test]
fn test_strict_config_rejects_extra_bindings() {
    let dir = tempfile::tempdir().unwrap();
    let config = ExecutorConfig::from_file(&write_config(dir.path())).unwrap();
    let mut executor = JavascriptExecutor::with_config(MemoryPage::new(), config).unwrap();

    let result = executor.execute(
        "focus",
        &bindings([("selector", "#q"), ("typo", "1")]),
        None,
    );
    assert!(matches!(
        result,
        Err(ExecuteError::Render(TemplateError::UnexpectedBinding { .. }))
    ));
    assert!(executor.transport().executed().is_empty());
}

#[test]
fn test_transport_failure_is_reported_as_javascript_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = ExecutorConfig::from_file(&write_config(dir.path())).unwrap();
    let mut executor = JavascriptExecutor::with_config(MemoryPage::new(), config).unwrap();

    // The in-memory page only knows the built-in operations
    let err = executor
        .execute("focus", &bindings([("selector", "#q")]), None)
        .unwrap_err();
    assert!(matches!(err, ExecuteError::Javascript { .. }));
    assert!(err.to_string().starts_with("Error executing Javascript: "));
}

#[test]
fn test_scripts_returning_exceptions_fail() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("submit.js");
    fs::write(
        &path,
        "try {\n    document.querySelector('%form').submit();\n} catch (ex) {\n    return ex;\n}\n",
    )
    .unwrap();
    let templates = load_template_file(&path).unwrap();
    let body = templates[0].body();

    let returned = body.find("return ex;").expect("user body");
    let rethrow = body.find("throw result;").expect("rethrow");
    let envelope = body.find("status: 'ok'").expect("envelope");
    assert!(returned < rethrow && rethrow < envelope);
    assert!(body.contains("if (result instanceof Error) {"));
}

#[test]
fn test_undeclared_placeholder_points_into_body() {
    let specs = parse_template_specs(
        r#"
[[template]]
name = "broken"
body = "return '%known' + '%unknown';"

[template.placeholders]
known = "literal"
"#,
    )
    .unwrap();
    let spec = specs.into_iter().next().unwrap();
    let body = spec.body.clone();

    let err = spec.into_template().unwrap_err();
    match &err {
        TemplateError::UndeclaredPlaceholder { placeholder, span, .. } => {
            assert_eq!(placeholder, "unknown");
            assert_eq!(&body[span.clone()], "%unknown");
        }
        other => panic!("expected UndeclaredPlaceholder, got {:?}", other),
    }
    assert!(err.format(&body, "broken.toml").contains("%unknown is not declared"));
}

#[test]
fn test_missing_template_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = ExecutorConfig::new().with_template_file(dir.path().join("absent.toml"));
    assert!(matches!(
        config.build_store(),
        Err(ConfigError::Template(TemplateError::FileRead { .. }))
    ));
}

#[test]
fn test_malformed_template_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, "[[template]]\nname = \"x\"\n").unwrap();
    assert!(matches!(
        load_template_file(&path),
        Err(TemplateError::InvalidFile { .. })
    ));
}
