//! Script templates
//!
//! A template is a script body with `%name` substitution points and a declared
//! set of placeholders. The store holds one template per operation name; the
//! renderer turns a template plus a binding set into a [`RenderedScript`].
//!
//! # Example
//!
//! ```rust
//! use dom_scripts::template::{bindings, TemplateStore};
//!
//! let store = TemplateStore::builtin();
//! let script = store
//!     .render("delete-elements", &bindings([("selector", ".banner")]))
//!     .unwrap();
//! assert!(script.source().contains("'.banner'"));
//! ```

mod escape;
pub mod lexer;
mod registry;
mod renderer;

pub use escape::{escape_literal, Embedding};
pub use registry::{ResultShape, Template, TemplateStore};
pub use renderer::{bindings, render, Bindings, RenderOptions, RenderedScript};
