//! Template store for looking up script templates by operation name

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::escape::Embedding;
use super::lexer;
use crate::error::TemplateError;

/// What a successful execution of a template hands back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultShape {
    /// The success sentinel `true`, no data
    Done,
    /// A boolean state
    Bool,
    /// A string
    Text,
    /// A collection of element handles, possibly empty
    Elements,
    /// Whatever the script returns
    #[default]
    Any,
}

impl std::fmt::Display for ResultShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ResultShape::Done => "done",
            ResultShape::Bool => "bool",
            ResultShape::Text => "text",
            ResultShape::Elements => "elements",
            ResultShape::Any => "any",
        };
        f.pad(name)
    }
}

/// A named script body with its declared placeholders
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    name: String,
    body: String,
    placeholders: BTreeMap<String, Embedding>,
    result: ResultShape,
    takes_element: bool,
}

impl Template {
    /// Create a template, checking that every `%token` in the body is declared
    pub fn new<K>(
        name: impl Into<String>,
        body: impl Into<String>,
        placeholders: impl IntoIterator<Item = (K, Embedding)>,
        result: ResultShape,
    ) -> Result<Self, TemplateError>
    where
        K: Into<String>,
    {
        let name: String = name.into();
        let template = Self {
            name: canonical_name(&name).to_string(),
            body: body.into(),
            placeholders: placeholders
                .into_iter()
                .map(|(k, e)| (k.into(), e))
                .collect(),
            result,
            takes_element: false,
        };
        template.validate()?;
        Ok(template)
    }

    /// Create a template whose placeholders are whatever the body references,
    /// all embedded as string literals
    pub fn infer(name: impl Into<String>, body: impl Into<String>, result: ResultShape) -> Self {
        let name: String = name.into();
        let body = body.into();
        let placeholders = lexer::references(&body)
            .into_iter()
            .map(|(name, _)| (name.to_string(), Embedding::Literal))
            .collect();
        Self {
            name: canonical_name(&name).to_string(),
            body,
            placeholders,
            result,
            takes_element: false,
        }
    }

    /// Mark the template as expecting an element handle as `arguments[0]`
    pub fn with_element_argument(mut self) -> Self {
        self.takes_element = true;
        self
    }

    fn validate(&self) -> Result<(), TemplateError> {
        let references = lexer::references(&self.body);
        for (placeholder, span) in &references {
            if !self.placeholders.contains_key(*placeholder) {
                return Err(TemplateError::UndeclaredPlaceholder {
                    template: self.name.clone(),
                    placeholder: placeholder.to_string(),
                    span: span.clone(),
                });
            }
        }
        for declared in self.placeholders.keys() {
            if !references.iter().any(|(r, _)| *r == declared.as_str()) {
                warn!(template = %self.name, placeholder = %declared, "declared placeholder is never used");
            }
        }
        Ok(())
    }

    /// Template name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Unrendered body
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Declared placeholders in name order
    pub fn placeholders(&self) -> impl Iterator<Item = (&str, Embedding)> {
        self.placeholders.iter().map(|(k, e)| (k.as_str(), *e))
    }

    /// Embedding of a declared placeholder
    pub fn embedding(&self, placeholder: &str) -> Option<Embedding> {
        self.placeholders.get(placeholder).copied()
    }

    /// Check if this template declares a placeholder
    pub fn declares(&self, placeholder: &str) -> bool {
        self.placeholders.contains_key(placeholder)
    }

    pub fn result(&self) -> ResultShape {
        self.result
    }

    pub fn takes_element(&self) -> bool {
        self.takes_element
    }
}

/// Registry of templates, keyed by name
#[derive(Debug, Clone, Default)]
pub struct TemplateStore {
    templates: BTreeMap<String, Template>,
}

impl TemplateStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding every built-in operation
    pub fn builtin() -> Self {
        let mut store = Self::new();
        for template in crate::operations::builtin_templates() {
            store
                .templates
                .insert(template.name().to_string(), template);
        }
        store
    }

    /// Register a template
    pub fn register(&mut self, template: Template) -> Result<(), TemplateError> {
        if self.templates.contains_key(template.name()) {
            return Err(TemplateError::Duplicate {
                name: template.name().to_string(),
            });
        }
        self.templates
            .insert(template.name().to_string(), template);
        Ok(())
    }

    /// Get a template by name; a trailing `.js` is ignored
    pub fn get(&self, name: &str) -> Option<&Template> {
        self.templates.get(canonical_name(name))
    }

    /// Get a template by name or fail with `UnknownTemplate`
    pub fn lookup(&self, name: &str) -> Result<&Template, TemplateError> {
        self.get(name).ok_or_else(|| TemplateError::UnknownTemplate {
            name: name.to_string(),
        })
    }

    /// Check if a template exists
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// All template names, sorted
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(|s| s.as_str())
    }

    /// All templates, sorted by name
    pub fn iter(&self) -> impl Iterator<Item = &Template> {
        self.templates.values()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

fn canonical_name(name: &str) -> &str {
    name.strip_suffix(".js").unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn literal(names: &[&str]) -> Vec<(String, Embedding)> {
        names
            .iter()
            .map(|n| (n.to_string(), Embedding::Literal))
            .collect()
    }

    #[test]
    fn test_register_and_get() {
        let mut store = TemplateStore::new();
        let template = Template::new(
            "scroll",
            "window.scrollTo(0, '%y');",
            literal(&["y"]),
            ResultShape::Done,
        )
        .expect("valid template");

        store.register(template).expect("Should register");
        assert!(store.contains("scroll"));
        assert!(store.contains("scroll.js"));
        assert_eq!(store.names().collect::<Vec<_>>(), vec!["scroll"]);
    }

    #[test]
    fn test_duplicate_error() {
        let mut store = TemplateStore::new();
        let template = Template::new("noop", "1;", literal(&[]), ResultShape::Any).unwrap();

        store.register(template.clone()).expect("first register");
        let result = store.register(template);
        assert!(matches!(result, Err(TemplateError::Duplicate { .. })));
    }

    #[test]
    fn test_undeclared_placeholder_rejected() {
        let result = Template::new(
            "bad",
            "document.querySelector('%selector');",
            literal(&[]),
            ResultShape::Any,
        );
        match result {
            Err(TemplateError::UndeclaredPlaceholder {
                placeholder, span, ..
            }) => {
                assert_eq!(placeholder, "selector");
                assert_eq!(span, 24..33);
            }
            other => panic!("expected UndeclaredPlaceholder, got {:?}", other),
        }
    }

    #[test]
    fn test_unused_declaration_is_allowed() {
        let template = Template::new("t", "1;", literal(&["extra"]), ResultShape::Any);
        assert!(template.is_ok());
    }

    #[test]
    fn test_infer_declares_references() {
        let template = Template::infer("custom.js", "a('%one', '%{two}x');", ResultShape::Any);
        assert_eq!(template.name(), "custom");
        let names: Vec<_> = template.placeholders().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["one", "two"]);
    }

    #[test]
    fn test_lookup_unknown() {
        let store = TemplateStore::new();
        assert!(matches!(
            store.lookup("missing"),
            Err(TemplateError::UnknownTemplate { .. })
        ));
    }

    #[test]
    fn test_builtin_store_has_every_operation() {
        let store = TemplateStore::builtin();
        assert_eq!(store.len(), crate::operations::Operation::ALL.len());
    }
}
