//! dom-scripts - page-side script templates for WebDriver tests
//!
//! This library renders parameterized JavaScript for a fixed set of page
//! operations (clicking, attribute edits, markup and stylesheet injection,
//! diagnostic banners, element highlights and queries) and decodes the
//! tagged result envelope every script returns.
//!
//! # Example
//!
//! ```rust
//! use dom_scripts::{bindings, ExecutionOutcome, JavascriptExecutor, MemoryPage};
//!
//! let mut executor = JavascriptExecutor::new(MemoryPage::from_html("<p id='a'>x</p>"));
//! let outcome = executor
//!     .execute("delete-elements", &bindings([("selector", "#a")]), None)
//!     .unwrap();
//! assert_eq!(outcome, ExecutionOutcome::Done);
//! assert_eq!(executor.transport().count("p"), 0);
//! ```

pub mod config;
pub mod error;
pub mod executor;
pub mod operations;
pub mod overlay;
pub mod page;
pub mod protocol;
pub mod template;

pub use config::{ConfigError, ExecutorConfig};
pub use error::TemplateError;
pub use executor::{ExecuteError, JavascriptExecutor, ScriptTransport, TransportError};
pub use operations::{Operation, Region};
pub use page::MemoryPage;
pub use protocol::{ElementHandle, ExecutionOutcome, OperationFailure, ProtocolError, ScriptValue};
pub use template::{bindings, Bindings, RenderedScript, ResultShape, TemplateStore};
