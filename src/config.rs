//! Executor configuration and custom template files
//!
//! Configuration is TOML:
//!
//! ```toml
//! strict_bindings = true
//! log_script_source = false
//! template_files = ["templates/extra.toml", "templates/scroll.js"]
//! ```
//!
//! Template files are either TOML with `[[template]]` entries or plain `.js`
//! scripts. A plain script is named after its file stem, declares every
//! `%token` it references as a string-literal placeholder, and may use
//! `return` and `arguments` as a function body would. A script that signals
//! failure by returning the caught exception is reported as a failure.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::error::TemplateError;
use crate::protocol::guard_function;
use crate::template::{Embedding, RenderOptions, ResultShape, Template, TemplateStore};

/// Errors that can occur when loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Failed to load templates: {0}")]
    Template(#[from] TemplateError),
}

/// Configuration for a script executor
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExecutorConfig {
    /// Reject bindings that the template does not declare
    pub strict_bindings: bool,
    /// Log the full source of every executed script at trace level
    pub log_script_source: bool,
    /// Custom template files to register next to the built-ins
    pub template_files: Vec<PathBuf>,
}

impl ExecutorConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file; relative template paths are
    /// resolved against the file's directory
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_str(&content)?;
        if let Some(base) = path.parent() {
            config.template_files = config
                .template_files
                .into_iter()
                .map(|p| if p.is_relative() { base.join(p) } else { p })
                .collect();
        }
        Ok(config)
    }

    /// Load configuration from a TOML string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Set whether unexpected bindings are rejected
    pub fn with_strict_bindings(mut self, strict: bool) -> Self {
        self.strict_bindings = strict;
        self
    }

    /// Set whether script sources are logged
    pub fn with_script_logging(mut self, enabled: bool) -> Self {
        self.log_script_source = enabled;
        self
    }

    /// Add a custom template file
    pub fn with_template_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.template_files.push(path.into());
        self
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            strict: self.strict_bindings,
        }
    }

    /// The built-in store plus every configured template file
    pub fn build_store(&self) -> Result<TemplateStore, ConfigError> {
        let mut store = TemplateStore::builtin();
        for path in &self.template_files {
            for template in load_template_file(path)? {
                store.register(template)?;
            }
        }
        Ok(store)
    }
}

/// One `[[template]]` entry of a TOML template file
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemplateSpec {
    pub name: String,
    /// Function body; `return` hands back the result
    pub body: String,
    #[serde(default)]
    pub placeholders: BTreeMap<String, Embedding>,
    #[serde(default)]
    pub result: ResultShape,
    #[serde(default)]
    pub element_argument: bool,
}

impl TemplateSpec {
    /// Check the body and wrap it in the failure boundary.
    ///
    /// Spans in the returned errors point into `body`.
    pub fn into_template(self) -> Result<Template, TemplateError> {
        // Validate against the unwrapped body so spans match what the user wrote
        Template::new(
            self.name.as_str(),
            self.body.as_str(),
            self.placeholders.clone(),
            self.result,
        )?;
        let template = Template::new(
            self.name,
            guard_function(&self.body),
            self.placeholders,
            self.result,
        )?;
        Ok(if self.element_argument {
            template.with_element_argument()
        } else {
            template
        })
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlTemplateFile {
    #[serde(default, rename = "template")]
    templates: Vec<TemplateSpec>,
}

/// Parse the entries of a TOML template file without validating bodies
pub fn parse_template_specs(content: &str) -> Result<Vec<TemplateSpec>, toml::de::Error> {
    let file: TomlTemplateFile = toml::from_str(content)?;
    Ok(file.templates)
}

/// Load every template defined in a file
pub fn load_template_file(path: &Path) -> Result<Vec<Template>, TemplateError> {
    let content = std::fs::read_to_string(path).map_err(|e| TemplateError::FileRead {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    if path.extension().and_then(|e| e.to_str()) == Some("js") {
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| TemplateError::InvalidFile {
                path: path.to_path_buf(),
                message: "file name is not valid UTF-8".to_string(),
            })?;
        return Ok(vec![script_template(name, &content)?]);
    }

    let specs = parse_template_specs(&content).map_err(|e| TemplateError::InvalidFile {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    specs.into_iter().map(TemplateSpec::into_template).collect()
}

/// A template from a plain script whose placeholders are inferred
pub fn script_template(name: &str, body: &str) -> Result<Template, TemplateError> {
    let inferred = Template::infer(name, body, ResultShape::Any);
    let placeholders: Vec<_> = inferred
        .placeholders()
        .map(|(n, e)| (n.to_string(), e))
        .collect();
    Template::new(inferred.name(), guard_function(body), placeholders, ResultShape::Any)
}
