//! Escaping of binding values for their place in a script

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// How a binding value is embedded in the rendered body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Embedding {
    /// Inside a quoted script string literal; escaped so it cannot end the literal
    #[default]
    Literal,
    /// Inserted verbatim; only for templates that opt in explicitly
    Raw,
}

impl Embedding {
    /// Prepare a value for this embedding
    pub fn apply<'a>(&self, value: &'a str) -> Cow<'a, str> {
        match self {
            Embedding::Literal => escape_literal(value),
            Embedding::Raw => Cow::Borrowed(value),
        }
    }
}

/// Escape a value for a single- or double-quoted JavaScript string literal.
///
/// Line terminators are escaped too, so a value can never close the literal
/// or start a new statement.
pub fn escape_literal(value: &str) -> Cow<'_, str> {
    if !value.chars().any(needs_escape) {
        return Cow::Borrowed(value);
    }

    let mut out = String::with_capacity(value.len() + 8);
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            _ => out.push(ch),
        }
    }
    Cow::Owned(out)
}

fn needs_escape(ch: char) -> bool {
    matches!(
        ch,
        '\\' | '\'' | '"' | '\n' | '\r' | '\t' | '\u{2028}' | '\u{2029}'
    )
}
