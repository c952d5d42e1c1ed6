//! Error types for template registration and rendering

use std::path::PathBuf;

use ariadne::{Color, Label, Report, ReportKind, Source};
use thiserror::Error;

/// Byte range in a template body
pub type Span = std::ops::Range<usize>;

/// Errors raised while registering or rendering a template.
///
/// These are always reported synchronously, before any script reaches the page.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// No template registered under this name
    #[error("template not found: {name}")]
    UnknownTemplate { name: String },

    /// A declared placeholder has no value in the binding set
    #[error("missing binding for placeholder %{placeholder} in template {template}")]
    MissingBinding { template: String, placeholder: String },

    /// A binding names no declared placeholder (strict mode only)
    #[error("unexpected binding {binding} for template {template}")]
    UnexpectedBinding { template: String, binding: String },

    /// The body references a placeholder the template does not declare
    #[error("template {template} references undeclared placeholder %{placeholder}")]
    UndeclaredPlaceholder {
        template: String,
        placeholder: String,
        span: Span,
    },

    /// Duplicate template definition
    #[error("duplicate template definition: {name}")]
    Duplicate { name: String },

    /// Error reading a template file
    #[error("error reading template file {path}: {message}")]
    FileRead { path: PathBuf, message: String },

    /// Template file could not be parsed
    #[error("invalid template file {path}: {message}")]
    InvalidFile { path: PathBuf, message: String },
}

impl TemplateError {
    /// Format the error against the template body it came from.
    ///
    /// Errors that carry a span get an ariadne report pointing into `source`;
    /// everything else falls back to the plain message.
    pub fn format(&self, source: &str, filename: &str) -> String {
        let TemplateError::UndeclaredPlaceholder {
            placeholder, span, ..
        } = self
        else {
            return format!("{}: {}", filename, self);
        };

        let mut buf = Vec::new();
        let written = Report::build(ReportKind::Error, filename, span.start)
            .with_message(self.to_string())
            .with_label(
                Label::new((filename, span.clone()))
                    .with_message(format!("%{} is not declared", placeholder))
                    .with_color(Color::Red),
            )
            .with_help(format!(
                "declare `{}` in the template's placeholders or write a literal `%` differently",
                placeholder
            ))
            .finish()
            .write((filename, Source::from(source)), &mut buf);

        match written {
            Ok(()) => String::from_utf8_lossy(&buf).into_owned(),
            Err(_) => format!("{}: {}", filename, self),
        }
    }
}
