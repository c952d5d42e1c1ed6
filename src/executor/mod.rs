//! Script execution against a page
//!
//! [`JavascriptExecutor`] renders a template, sends it through a
//! [`ScriptTransport`] and decodes the envelope that comes back. A transport is
//! whatever can run a script in a browsing context: a WebDriver session, or the
//! in-memory [`MemoryPage`](crate::page::MemoryPage) used by the tests.

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::config::{ConfigError, ExecutorConfig};
use crate::error::TemplateError;
use crate::operations::{Operation, Region};
use crate::protocol::{ElementHandle, ExecutionOutcome, OperationFailure, ProtocolError, ScriptValue};
use crate::template::{bindings, render, Bindings, RenderedScript, ResultShape, TemplateStore};

/// The driver could not run a script at all
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransportError {
    message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Runs scripts in one browsing context.
///
/// `args` are passed to the script as `arguments`; element handles travel as
/// W3C element references. The returned value is whatever the script returned.
pub trait ScriptTransport {
    fn execute_script(
        &mut self,
        script: &RenderedScript,
        args: &[Value],
    ) -> Result<Value, TransportError>;
}

impl<T: ScriptTransport + ?Sized> ScriptTransport for &mut T {
    fn execute_script(
        &mut self,
        script: &RenderedScript,
        args: &[Value],
    ) -> Result<Value, TransportError> {
        (**self).execute_script(script, args)
    }
}

/// Errors raised while executing a script
#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error(transparent)]
    Render(#[from] TemplateError),

    #[error("Error executing Javascript: {source} (template {template})")]
    Javascript {
        template: String,
        source: TransportError,
    },

    #[error("{template} returned an invalid result: {source}")]
    Protocol {
        template: String,
        source: ProtocolError,
    },

    #[error("{template} acts on an element but none was given")]
    MissingElement { template: String },

    #[error("{template} failed: {failure}")]
    Operation {
        template: String,
        failure: OperationFailure,
    },

    #[error("{template} did not return a {expected} result")]
    UnexpectedValue {
        template: String,
        expected: ResultShape,
    },
}

/// Renders templates and runs them through a transport
pub struct JavascriptExecutor<T> {
    transport: T,
    store: TemplateStore,
    config: ExecutorConfig,
}

impl<T: ScriptTransport> JavascriptExecutor<T> {
    /// An executor with the built-in templates and default configuration
    pub fn new(transport: T) -> Self {
        Self::with_store(transport, TemplateStore::builtin(), ExecutorConfig::default())
    }

    /// An executor with the built-ins plus the configured template files
    pub fn with_config(transport: T, config: ExecutorConfig) -> Result<Self, ConfigError> {
        let store = config.build_store()?;
        Ok(Self::with_store(transport, store, config))
    }

    pub fn with_store(transport: T, store: TemplateStore, config: ExecutorConfig) -> Self {
        Self {
            transport,
            store,
            config,
        }
    }

    pub fn store(&self) -> &TemplateStore {
        &self.store
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Render a template without running it
    pub fn render(&self, name: &str, bindings: &Bindings) -> Result<RenderedScript, TemplateError> {
        self.store
            .render_with(name, bindings, self.config.render_options())
    }

    /// Render and run a template.
    ///
    /// `element` is passed as `arguments[0]`; templates that act on an element
    /// require it. An exception thrown by the operation is an
    /// [`ExecutionOutcome::Failed`], not an error.
    pub fn execute(
        &mut self,
        name: &str,
        bindings: &Bindings,
        element: Option<&ElementHandle>,
    ) -> Result<ExecutionOutcome, ExecuteError> {
        let template = self.store.lookup(name)?;
        if template.takes_element() && element.is_none() {
            return Err(ExecuteError::MissingElement {
                template: template.name().to_string(),
            });
        }
        let script = render(template, bindings, self.config.render_options())?;
        let args: Vec<Value> = element.map(ElementHandle::to_json).into_iter().collect();
        self.dispatch(&script, &args)
    }

    /// Run an ad-hoc script and hand back whatever it returned
    pub fn execute_script(&mut self, source: &str, args: &[Value]) -> Result<Value, ExecuteError> {
        let script = RenderedScript::inline(source);
        self.send(&script, args)
    }

    /// Run a template and report only whether the operation succeeded
    pub fn run(
        &mut self,
        name: &str,
        bindings: &Bindings,
        element: Option<&ElementHandle>,
    ) -> Result<bool, ExecuteError> {
        Ok(self.execute(name, bindings, element)?.is_success())
    }

    fn send(&mut self, script: &RenderedScript, args: &[Value]) -> Result<Value, ExecuteError> {
        debug!(template = %script.template(), args = args.len(), "executing script");
        if self.config.log_script_source {
            trace!(template = %script.template(), source = %script.source(), "script source");
        }
        self.transport
            .execute_script(script, args)
            .map_err(|source| ExecuteError::Javascript {
                template: script.template().to_string(),
                source,
            })
    }

    fn dispatch(
        &mut self,
        script: &RenderedScript,
        args: &[Value],
    ) -> Result<ExecutionOutcome, ExecuteError> {
        let raw = self.send(script, args)?;
        let outcome = ExecutionOutcome::decode(script.result_shape(), raw).map_err(|source| {
            ExecuteError::Protocol {
                template: script.template().to_string(),
                source,
            }
        })?;
        if let ExecutionOutcome::Failed(failure) = &outcome {
            warn!(template = %script.template(), error = %failure, "page operation failed");
        }
        Ok(outcome)
    }

    fn operation(
        &mut self,
        op: Operation,
        bindings: &Bindings,
        element: Option<&ElementHandle>,
    ) -> Result<Option<ScriptValue>, ExecuteError> {
        self.execute(op.name(), bindings, element)?
            .into_result()
            .map_err(|failure| ExecuteError::Operation {
                template: op.name().to_string(),
                failure,
            })
    }

    fn action(
        &mut self,
        op: Operation,
        bindings: &Bindings,
        element: Option<&ElementHandle>,
    ) -> Result<(), ExecuteError> {
        match self.operation(op, bindings, element)? {
            None => Ok(()),
            Some(_) => Err(unexpected(op)),
        }
    }

    pub fn click(&mut self, element: &ElementHandle) -> Result<(), ExecuteError> {
        self.action(Operation::Click, &Bindings::new(), Some(element))
    }

    pub fn set_attribute(
        &mut self,
        element: &ElementHandle,
        name: &str,
        value: &str,
    ) -> Result<(), ExecuteError> {
        let b = bindings([("attribute_name", name), ("attribute_value", value)]);
        self.action(Operation::SetAttribute, &b, Some(element))
    }

    /// Append markup to the first element matching `selector`
    pub fn inject_html(&mut self, selector: &str, html: &str) -> Result<(), ExecuteError> {
        let b = bindings([("selector", selector), ("html", html)]);
        self.action(Operation::InjectHtml, &b, None)
    }

    /// Replace the injected stylesheet
    pub fn inject_css(&mut self, css: &str) -> Result<(), ExecuteError> {
        self.action(Operation::InjectCss, &bindings([("css", css)]), None)
    }

    pub fn delete_elements(&mut self, selector: &str) -> Result<(), ExecuteError> {
        self.action(Operation::DeleteElements, &bindings([("selector", selector)]), None)
    }

    /// Replace the highlight box
    pub fn highlight_element(&mut self, region: Region) -> Result<(), ExecuteError> {
        self.action(Operation::HighlightElement, &region.bindings(), None)
    }

    /// Replace the diagnostic banner
    pub fn inject_message(&mut self, message: &str) -> Result<(), ExecuteError> {
        self.action(Operation::InjectMessage, &bindings([("message", message)]), None)
    }

    pub fn get_elements(&mut self, selector: &str) -> Result<Vec<ElementHandle>, ExecuteError> {
        let op = Operation::GetElements;
        match self.operation(op, &bindings([("selector", selector)]), None)? {
            Some(ScriptValue::Elements(handles)) => Ok(handles),
            _ => Err(unexpected(op)),
        }
    }

    /// Text of every match with all whitespace removed
    pub fn get_text_no_whitespace(&mut self, selector: &str) -> Result<String, ExecuteError> {
        let op = Operation::GetTextNoWhitespace;
        match self.operation(op, &bindings([("selector", selector)]), None)? {
            Some(ScriptValue::Text(text)) => Ok(text),
            _ => Err(unexpected(op)),
        }
    }

    /// False once the harness resume radio exists and is checked
    pub fn is_waiting_for_user(&mut self) -> Result<bool, ExecuteError> {
        let op = Operation::IsWaitingForUser;
        match self.operation(op, &Bindings::new(), None)? {
            Some(ScriptValue::Bool(waiting)) => Ok(waiting),
            _ => Err(unexpected(op)),
        }
    }
}

fn unexpected(op: Operation) -> ExecuteError {
    ExecuteError::UnexpectedValue {
        template: op.name().to_string(),
        expected: op.result_shape(),
    }
}
