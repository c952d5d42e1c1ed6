//! In-memory page
//!
//! [`MemoryPage`] is a deterministic stand-in for a browsing context. It runs
//! the built-in operations against its own [`Document`] with the same
//! observable behavior as the generated scripts, including the result
//! envelope, the degraded paths and the singleton sweeps. It is what the
//! tests drive the executor with.
//!
//! ```rust
//! use dom_scripts::executor::JavascriptExecutor;
//! use dom_scripts::page::MemoryPage;
//!
//! let mut page = MemoryPage::from_html("<p>Hello <b>world</b></p>");
//! {
//!     let mut executor = JavascriptExecutor::new(&mut page);
//!     executor.inject_message("Step 3 failed").unwrap();
//!     assert_eq!(executor.get_text_no_whitespace("p").unwrap(), "Helloworld");
//! }
//! assert_eq!(page.count(".webdriver-test-error-message"), 1);
//! ```

mod dom;
mod selector;

use std::collections::HashMap;

use serde_json::{json, Value};
use tracing::debug;

pub use dom::{Document, NodeId};
pub use selector::{SelectorError, SelectorList};

use crate::executor::{ScriptTransport, TransportError};
use crate::operations::{Operation, HIGHLIGHT_FALLBACK, MESSAGE_FALLBACK};
use crate::overlay::{OverlayMarker, BANNER_STYLE, HIGHLIGHT_STYLE, RESUME_RADIO_ID, TOP_Z_INDEX};
use crate::protocol::{ok_envelope, ElementHandle, OperationFailure};
use crate::template::RenderedScript;

const HANDLE_PREFIX: &str = "node-";

/// A document plus the bookkeeping a driver would keep about it
#[derive(Debug, Clone, Default)]
pub struct MemoryPage {
    document: Document,
    clicks: HashMap<NodeId, usize>,
    executed: Vec<String>,
}

impl MemoryPage {
    pub fn new() -> Self {
        Self::default()
    }

    /// A page whose body holds the given markup
    pub fn from_html(html: &str) -> Self {
        Self {
            document: Document::from_html(html),
            ..Self::default()
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    /// Names of the templates executed so far, in order
    pub fn executed(&self) -> &[String] {
        &self.executed
    }

    pub fn handle_for(&self, node: NodeId) -> ElementHandle {
        ElementHandle::new(format!("{}{}", HANDLE_PREFIX, node))
    }

    /// The node an element handle refers to
    pub fn node(&self, handle: &ElementHandle) -> Option<NodeId> {
        handle
            .id()
            .strip_prefix(HANDLE_PREFIX)
            .and_then(|n| n.parse().ok())
            .filter(|&n| {
                self.document.contains(n)
                    && self.document.tag(n).is_some()
                    && self.document.is_connected(n)
            })
    }

    /// Connected elements matching `selector`, in document order
    pub fn select(&self, selector: &str) -> Result<Vec<NodeId>, SelectorError> {
        let list = SelectorList::parse(selector)?;
        Ok(self.document.query_selector_all(&list))
    }

    /// Handle of the first element matching `selector`
    pub fn handle(&self, selector: &str) -> Option<ElementHandle> {
        self.first(selector).map(|node| self.handle_for(node))
    }

    /// Number of connected elements matching `selector`; an invalid selector
    /// matches nothing
    pub fn count(&self, selector: &str) -> usize {
        self.select(selector).map(|nodes| nodes.len()).unwrap_or(0)
    }

    fn first(&self, selector: &str) -> Option<NodeId> {
        self.select(selector).ok()?.into_iter().next()
    }

    pub fn attribute(&self, handle: &ElementHandle, name: &str) -> Option<String> {
        let node = self.node(handle)?;
        self.document.attribute(node, name).map(str::to_string)
    }

    /// Inline style property of the first match, by script property name
    pub fn style(&self, selector: &str, property: &str) -> Option<String> {
        let node = self.first(selector)?;
        self.document.style(node, property).map(str::to_string)
    }

    /// Text content of the first match
    pub fn text(&self, selector: &str) -> Option<String> {
        self.first(selector).map(|node| self.document.text_content(node))
    }

    pub fn is_checked(&self, selector: &str) -> bool {
        self.first(selector)
            .is_some_and(|node| self.document.is_checked(node))
    }

    /// Set the checked state of every match, as a user would
    pub fn set_checked(&mut self, selector: &str, checked: bool) {
        for node in self.select(selector).unwrap_or_default() {
            self.document.set_checked(node, checked);
        }
    }

    pub fn click_count(&self, handle: &ElementHandle) -> usize {
        self.node(handle)
            .and_then(|node| self.clicks.get(&node).copied())
            .unwrap_or(0)
    }

    fn perform(
        &mut self,
        op: Operation,
        script: &RenderedScript,
        args: &[Value],
    ) -> Result<Value, OperationFailure> {
        match op {
            Operation::Click => {
                let node = self.argument(args, "click")?;
                *self.clicks.entry(node).or_default() += 1;
                self.toggle(node);
                Ok(json!(true))
            }
            Operation::SetAttribute => {
                let node = self.argument(args, "setAttribute")?;
                let name = binding(script, "attribute_name")?;
                if !is_attribute_name(name) {
                    return Err(OperationFailure::new(
                        "InvalidCharacterError",
                        format!("'{}' is not a valid attribute name.", name),
                    ));
                }
                self.document
                    .set_attribute(node, name, binding(script, "attribute_value")?);
                Ok(json!(true))
            }
            Operation::InjectHtml => {
                let target = self
                    .query(binding(script, "selector")?)?
                    .into_iter()
                    .next()
                    .ok_or_else(|| null_property("insertAdjacentHTML"))?;
                self.document.insert_html(target, binding(script, "html")?);
                Ok(json!(true))
            }
            Operation::InjectCss => {
                let css = binding(script, "css")?;
                self.document
                    .replace_singleton(OverlayMarker::InjectedStyle, |doc, node| {
                        doc.set_attribute(node, "type", "text/css");
                        doc.set_text_content(node, css);
                    });
                Ok(json!(true))
            }
            Operation::DeleteElements => {
                for node in self.query(binding(script, "selector")?)? {
                    self.document.remove(node);
                }
                Ok(json!(true))
            }
            Operation::HighlightElement => {
                let geometry = ["x", "y", "width", "height"]
                    .into_iter()
                    .map(|name| binding(script, name).map(|v| v.trim_matches(is_js_whitespace)))
                    .collect::<Result<Vec<_>, _>>()?;
                self.document
                    .replace_singleton(OverlayMarker::ElementHighlight, |doc, node| {
                        for (property, value) in HIGHLIGHT_STYLE {
                            doc.set_style(node, property, value);
                        }
                        if geometry.iter().all(|v| is_css_number(v)) {
                            for (property, value) in ["left", "top", "width", "height"]
                                .into_iter()
                                .zip(&geometry)
                            {
                                doc.set_style(node, property, &format!("{}px", value));
                            }
                            doc.set_style(node, "zIndex", TOP_Z_INDEX);
                        } else {
                            doc.set_inner_html(node, HIGHLIGHT_FALLBACK);
                        }
                    });
                Ok(json!(true))
            }
            Operation::InjectMessage => {
                let message = script.binding("message").unwrap_or(MESSAGE_FALLBACK);
                self.document
                    .replace_singleton(OverlayMarker::ErrorMessage, |doc, node| {
                        doc.set_text_content(node, message);
                        for (property, value) in BANNER_STYLE {
                            doc.set_style(node, property, value);
                        }
                    });
                Ok(json!(true))
            }
            Operation::GetElements => {
                let handles: Vec<Value> = self
                    .query(binding(script, "selector")?)?
                    .into_iter()
                    .map(|node| self.handle_for(node).to_json())
                    .collect();
                Ok(Value::Array(handles))
            }
            Operation::GetTextNoWhitespace => {
                let text: String = self
                    .query(binding(script, "selector")?)?
                    .into_iter()
                    .map(|node| self.document.text_content(node))
                    .collect::<String>()
                    .chars()
                    .filter(|&c| !is_js_whitespace(c))
                    .collect();
                Ok(json!(text))
            }
            Operation::IsWaitingForUser => {
                let resumed = self
                    .document
                    .get_element_by_id(RESUME_RADIO_ID)
                    .is_some_and(|radio| self.document.is_checked(radio));
                Ok(json!(!resumed))
            }
        }
    }

    fn query(&self, selector: &str) -> Result<Vec<NodeId>, OperationFailure> {
        self.select(selector).map_err(|e| {
            OperationFailure::new(
                "SyntaxError",
                format!(
                    "Failed to execute 'querySelectorAll' on 'Document': {}.",
                    e
                ),
            )
        })
    }

    fn argument(&self, args: &[Value], method: &str) -> Result<NodeId, OperationFailure> {
        args.first()
            .and_then(ElementHandle::from_json)
            .and_then(|handle| self.node(&handle))
            .ok_or_else(|| null_property(method))
    }

    fn toggle(&mut self, node: NodeId) {
        let doc = &mut self.document;
        if doc.tag(node) != Some("input") {
            return;
        }
        let kind = doc.attribute(node, "type").map(str::to_ascii_lowercase);
        match kind.as_deref() {
            Some("checkbox") => doc.set_checked(node, !doc.is_checked(node)),
            Some("radio") => doc.set_checked(node, true),
            _ => {}
        }
    }
}

impl ScriptTransport for MemoryPage {
    fn execute_script(
        &mut self,
        script: &RenderedScript,
        args: &[Value],
    ) -> Result<Value, TransportError> {
        let op = Operation::from_name(script.template()).ok_or_else(|| {
            TransportError::new(format!(
                "javascript error: the in-memory page cannot run {}",
                script.template()
            ))
        })?;
        self.executed.push(op.name().to_string());
        debug!(operation = %op, args = args.len(), "memory page executing");
        Ok(match self.perform(op, script, args) {
            Ok(value) => ok_envelope(value),
            Err(failure) => failure.to_envelope(),
        })
    }
}

fn binding<'s>(script: &'s RenderedScript, name: &str) -> Result<&'s str, OperationFailure> {
    script
        .binding(name)
        .ok_or_else(|| OperationFailure::new("ReferenceError", format!("{} is not defined", name)))
}

fn null_property(method: &str) -> OperationFailure {
    OperationFailure::new(
        "TypeError",
        format!("Cannot read properties of null (reading '{}')", method),
    )
}

fn is_attribute_name(name: &str) -> bool {
    !name.is_empty()
        && !name
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '"' | '\'' | '>' | '/' | '=' | '<'))
}

/// Same grammar as `GEOMETRY_PATTERN`, on an already trimmed value
fn is_css_number(value: &str) -> bool {
    let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    let unsigned = value.strip_prefix('-').unwrap_or(value);
    match unsigned.split_once('.') {
        Some((int, frac)) => (int.is_empty() || digits(int)) && digits(frac),
        None => digits(unsigned),
    }
}

/// The characters a script regex `\s` matches, which is also what
/// `String.prototype.trim` strips
fn is_js_whitespace(c: char) -> bool {
    matches!(
        c,
        '\t' | '\n'
            | '\u{b}'
            | '\u{c}'
            | '\r'
            | ' '
            | '\u{a0}'
            | '\u{1680}'
            | '\u{2000}'..='\u{200a}'
            | '\u{2028}'
            | '\u{2029}'
            | '\u{202f}'
            | '\u{205f}'
            | '\u{3000}'
            | '\u{feff}'
    )
}
