//! Execution result protocol
//!
//! Every built-in script runs its operation inside one failure boundary and
//! returns a tagged envelope instead of letting an exception escape:
//!
//! ```text
//! { "status": "ok", "value": <result> }
//! { "status": "error", "name": "TypeError", "message": "...", "stack": "..." }
//! ```
//!
//! Exceptions do not cross the driver boundary in a typed form, so the page
//! serializes them itself. [`ExecutionOutcome::decode`] turns the envelope back
//! into exactly one outcome on the Rust side.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::template::ResultShape;

/// Key of a W3C WebDriver element reference
pub const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Wrap a block of statements and a result expression in the top-level
/// failure boundary.
///
/// The generated body always returns exactly once: the envelope built from
/// `result`, or the serialized exception.
pub fn guard(statements: &str, result: &str) -> String {
    format!(
        "try {{\n{}\n    return {{ status: 'ok', value: {} }};\n}} catch (ex) {{\n{}\n}}",
        indent(statements, 4),
        result,
        indent(ERROR_ENVELOPE, 4)
    )
}

/// Wrap a function body that returns its own value (`return ...`) in the
/// failure boundary. Used for custom templates written as plain scripts.
///
/// A body that reports failure by returning the caught exception
/// (`catch (ex) { return ex; }`) has the `Error` rethrown, so it decodes as a
/// failure rather than as a value.
pub fn guard_function(body: &str) -> String {
    let statements = format!(
        "var result = (function () {{\n{}\n}}).apply(this, arguments);\n\
         if (result instanceof Error) {{\n    throw result;\n}}",
        indent(body, 4)
    );
    guard(&statements, "result === undefined ? null : result")
}

/// Wrap a non-essential step in its own boundary with a static fallback
pub fn fallback(step: &str, fallback: &str) -> String {
    format!(
        "try {{\n{}\n}} catch (e) {{\n{}\n}}",
        indent(step, 4),
        indent(fallback, 4)
    )
}

const ERROR_ENVELOPE: &str = "return {
    status: 'error',
    name: (ex && ex.name) ? String(ex.name) : 'Error',
    message: (ex && ex.message !== undefined) ? String(ex.message) : String(ex),
    stack: (ex && ex.stack) ? String(ex.stack) : null
};";

pub(crate) fn indent(block: &str, width: usize) -> String {
    let pad = " ".repeat(width);
    block
        .lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{}{}", pad, line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// A reference to an element living in the page
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementHandle(String);

impl ElementHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The driver-assigned element id
    pub fn id(&self) -> &str {
        &self.0
    }

    /// Serialize as a W3C element reference, for passing as a script argument
    pub fn to_json(&self) -> Value {
        json!({ ELEMENT_KEY: self.0 })
    }

    /// Parse a W3C element reference
    pub fn from_json(value: &Value) -> Option<Self> {
        value
            .as_object()
            .and_then(|obj| obj.get(ELEMENT_KEY))
            .and_then(Value::as_str)
            .map(Self::new)
    }
}

/// Data carried by a successful operation
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptValue {
    Bool(bool),
    Text(String),
    Elements(Vec<ElementHandle>),
    Json(Value),
}

impl ScriptValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ScriptValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ScriptValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_elements(&self) -> Option<&[ElementHandle]> {
        match self {
            ScriptValue::Elements(e) => Some(e),
            _ => None,
        }
    }

    fn classify(value: Value) -> Self {
        match value {
            Value::Bool(b) => ScriptValue::Bool(b),
            Value::String(s) => ScriptValue::Text(s),
            Value::Array(items) if !items.is_empty() => {
                let handles: Option<Vec<_>> = items.iter().map(ElementHandle::from_json).collect();
                match handles {
                    Some(handles) => ScriptValue::Elements(handles),
                    None => ScriptValue::Json(Value::Array(items)),
                }
            }
            other => ScriptValue::Json(other),
        }
    }
}

/// An exception thrown by the operation itself, serialized by the page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationFailure {
    pub name: String,
    pub message: String,
    pub stack: Option<String>,
}

impl OperationFailure {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            stack: None,
        }
    }

    /// Human-readable description, including the stack when the page had one
    pub fn description(&self) -> String {
        match &self.stack {
            Some(stack) => format!("{}\n{}", self, stack),
            None => self.to_string(),
        }
    }

    /// The envelope a page returns for this failure
    pub fn to_envelope(&self) -> Value {
        json!({
            "status": "error",
            "name": self.name,
            "message": self.message,
            "stack": self.stack,
        })
    }
}

impl fmt::Display for OperationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.message)
    }
}

/// The result of executing one rendered script; always exactly one of these
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    /// Succeeded with the `true` sentinel
    Done,
    /// Succeeded with a value
    Value(ScriptValue),
    /// The operation threw
    Failed(OperationFailure),
}

/// The envelope did not follow the protocol
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed result envelope: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("expected a {expected} result, got {found}")]
    UnexpectedShape { expected: ResultShape, found: Value },
}

#[derive(Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
enum Envelope {
    Ok {
        #[serde(default)]
        value: Value,
    },
    Error {
        #[serde(default = "default_error_name")]
        name: String,
        #[serde(default)]
        message: String,
        #[serde(default)]
        stack: Option<String>,
    },
}

fn default_error_name() -> String {
    String::from("Error")
}

/// Build the success envelope for a value
pub fn ok_envelope(value: Value) -> Value {
    json!({ "status": "ok", "value": value })
}

impl ExecutionOutcome {
    /// Decode an envelope returned by the page against the expected shape
    pub fn decode(shape: ResultShape, raw: Value) -> Result<Self, ProtocolError> {
        let value = match serde_json::from_value::<Envelope>(raw)? {
            Envelope::Error {
                name,
                message,
                stack,
            } => {
                return Ok(ExecutionOutcome::Failed(OperationFailure {
                    name,
                    message,
                    stack,
                }))
            }
            Envelope::Ok { value } => value,
        };

        let unexpected = |found: Value| ProtocolError::UnexpectedShape {
            expected: shape,
            found,
        };

        match shape {
            ResultShape::Done => match value {
                Value::Bool(true) => Ok(ExecutionOutcome::Done),
                other => Err(unexpected(other)),
            },
            ResultShape::Bool => match value {
                Value::Bool(b) => Ok(ExecutionOutcome::Value(ScriptValue::Bool(b))),
                other => Err(unexpected(other)),
            },
            ResultShape::Text => match value {
                Value::String(s) => Ok(ExecutionOutcome::Value(ScriptValue::Text(s))),
                other => Err(unexpected(other)),
            },
            ResultShape::Elements => {
                let handles = value
                    .as_array()
                    .and_then(|items| {
                        items
                            .iter()
                            .map(ElementHandle::from_json)
                            .collect::<Option<Vec<_>>>()
                    });
                match handles {
                    Some(handles) => Ok(ExecutionOutcome::Value(ScriptValue::Elements(handles))),
                    None => Err(unexpected(value)),
                }
            }
            ResultShape::Any => match value {
                Value::Bool(true) => Ok(ExecutionOutcome::Done),
                other => Ok(ExecutionOutcome::Value(ScriptValue::classify(other))),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        !matches!(self, ExecutionOutcome::Failed(_))
    }

    pub fn failure(&self) -> Option<&OperationFailure> {
        match self {
            ExecutionOutcome::Failed(f) => Some(f),
            _ => None,
        }
    }

    /// Split into the usual `Result`: `Ok(None)` for the sentinel,
    /// `Ok(Some(value))` for data, `Err` for a failure
    pub fn into_result(self) -> Result<Option<ScriptValue>, OperationFailure> {
        match self {
            ExecutionOutcome::Done => Ok(None),
            ExecutionOutcome::Value(v) => Ok(Some(v)),
            ExecutionOutcome::Failed(f) => Err(f),
        }
    }
}
