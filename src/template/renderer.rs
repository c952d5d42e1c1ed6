//! Template rendering - substitutes bindings into a template body

use std::collections::BTreeMap;
use std::fmt;

use tracing::debug;

use super::lexer::{self, Piece};
use super::registry::{ResultShape, Template, TemplateStore};
use crate::error::TemplateError;

/// Placeholder values supplied for one render call
pub type Bindings = BTreeMap<String, String>;

/// Build a binding set from pairs
pub fn bindings<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Bindings
where
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// Options controlling how bindings are checked
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions {
    /// Reject bindings that no placeholder declares
    pub strict: bool,
}

/// A fully substituted, directly executable script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedScript {
    template: String,
    bindings: Bindings,
    result: ResultShape,
    source: String,
}

impl RenderedScript {
    /// Wrap an ad-hoc script that did not come from a template
    pub fn inline(source: impl Into<String>) -> Self {
        Self {
            template: String::from("<inline>"),
            bindings: Bindings::new(),
            result: ResultShape::Any,
            source: source.into(),
        }
    }

    /// Name of the template this script was rendered from
    pub fn template(&self) -> &str {
        &self.template
    }

    /// The unescaped value a placeholder was bound to
    pub fn binding(&self, placeholder: &str) -> Option<&str> {
        self.bindings.get(placeholder).map(|s| s.as_str())
    }

    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    pub fn result_shape(&self) -> ResultShape {
        self.result
    }

    /// The script text to send to the page
    pub fn source(&self) -> &str {
        &self.source
    }
}

impl fmt::Display for RenderedScript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Render a template with a binding set.
///
/// Every declared placeholder must be bound; nothing is rendered otherwise.
/// All occurrences of a placeholder receive the same value.
pub fn render(
    template: &Template,
    bindings: &Bindings,
    options: RenderOptions,
) -> Result<RenderedScript, TemplateError> {
    for (placeholder, _) in template.placeholders() {
        if !bindings.contains_key(placeholder) {
            return Err(TemplateError::MissingBinding {
                template: template.name().to_string(),
                placeholder: placeholder.to_string(),
            });
        }
    }

    if options.strict {
        if let Some(extra) = bindings.keys().find(|k| !template.declares(k)) {
            return Err(TemplateError::UnexpectedBinding {
                template: template.name().to_string(),
                binding: extra.clone(),
            });
        }
    }

    let mut source = String::with_capacity(template.body().len());
    for piece in lexer::scan(template.body()) {
        match piece {
            Piece::Text(text) => source.push_str(text),
            Piece::Placeholder { name, span } => {
                let (embedding, value) = template
                    .embedding(name)
                    .zip(bindings.get(name))
                    .ok_or_else(|| TemplateError::UndeclaredPlaceholder {
                        template: template.name().to_string(),
                        placeholder: name.to_string(),
                        span,
                    })?;
                source.push_str(&embedding.apply(value));
            }
        }
    }

    debug!(
        template = %template.name(),
        bindings = bindings.len(),
        bytes = source.len(),
        "rendered script"
    );

    Ok(RenderedScript {
        template: template.name().to_string(),
        bindings: bindings.clone(),
        result: template.result(),
        source,
    })
}

impl TemplateStore {
    /// Look up a template by name and render it
    pub fn render(&self, name: &str, bindings: &Bindings) -> Result<RenderedScript, TemplateError> {
        self.render_with(name, bindings, RenderOptions::default())
    }

    /// Look up a template by name and render it with explicit options
    pub fn render_with(
        &self,
        name: &str,
        bindings: &Bindings,
        options: RenderOptions,
    ) -> Result<RenderedScript, TemplateError> {
        render(self.lookup(name)?, bindings, options)
    }
}
