//! Built-in page operations
//!
//! Each operation is data: a template name, the placeholders it declares, the
//! shape of its result and a body composed from the overlay and protocol
//! primitives. Operations that act on a specific element take it as
//! `arguments[0]` rather than through a substituted selector.

use crate::overlay::{
    OverlayBuilder, OverlayMarker, BANNER_STYLE, HIGHLIGHT_STYLE, RESUME_RADIO_ID, TOP_Z_INDEX,
};
use crate::protocol::guard;
use crate::template::{Embedding, ResultShape, Template};

/// Text shown when the banner message cannot be produced
pub const MESSAGE_FALLBACK: &str = "The error message was malformed";
/// Content of a highlight box whose geometry could not be applied
pub const HIGHLIGHT_FALLBACK: &str = "Problem populating highlight element style variables.";
/// Accepted form of a highlight coordinate: a plain decimal, optionally
/// negative, without exponent. Checked after trimming.
pub const GEOMETRY_PATTERN: &str = r"/^-?(\d+(\.\d+)?|\.\d+)$/";

/// The operations every page script store provides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Click,
    SetAttribute,
    InjectHtml,
    InjectCss,
    DeleteElements,
    HighlightElement,
    InjectMessage,
    GetElements,
    GetTextNoWhitespace,
    IsWaitingForUser,
}

impl Operation {
    pub const ALL: [Operation; 10] = [
        Operation::Click,
        Operation::SetAttribute,
        Operation::InjectHtml,
        Operation::InjectCss,
        Operation::DeleteElements,
        Operation::HighlightElement,
        Operation::InjectMessage,
        Operation::GetElements,
        Operation::GetTextNoWhitespace,
        Operation::IsWaitingForUser,
    ];

    /// Template name
    pub fn name(self) -> &'static str {
        match self {
            Operation::Click => "click",
            Operation::SetAttribute => "set-attribute",
            Operation::InjectHtml => "inject-html",
            Operation::InjectCss => "inject-css",
            Operation::DeleteElements => "delete-elements",
            Operation::HighlightElement => "highlight-element",
            Operation::InjectMessage => "inject-message",
            Operation::GetElements => "get-elements",
            Operation::GetTextNoWhitespace => "get-text-no-whitespace",
            Operation::IsWaitingForUser => "is-waiting-for-user",
        }
    }

    /// Find an operation by template name; a trailing `.js` is ignored
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.strip_suffix(".js").unwrap_or(name);
        Self::ALL.into_iter().find(|op| op.name() == name)
    }

    pub fn placeholders(self) -> &'static [&'static str] {
        match self {
            Operation::Click | Operation::IsWaitingForUser => &[],
            Operation::SetAttribute => &["attribute_name", "attribute_value"],
            Operation::InjectHtml => &["selector", "html"],
            Operation::InjectCss => &["css"],
            Operation::DeleteElements | Operation::GetElements | Operation::GetTextNoWhitespace => {
                &["selector"]
            }
            Operation::HighlightElement => &["x", "y", "width", "height"],
            Operation::InjectMessage => &["message"],
        }
    }

    pub fn result_shape(self) -> ResultShape {
        match self {
            Operation::GetElements => ResultShape::Elements,
            Operation::GetTextNoWhitespace => ResultShape::Text,
            Operation::IsWaitingForUser => ResultShape::Bool,
            _ => ResultShape::Done,
        }
    }

    /// Whether the element to act on is passed as `arguments[0]`
    pub fn takes_element(self) -> bool {
        matches!(self, Operation::Click | Operation::SetAttribute)
    }

    /// The singleton overlay this operation replaces, if any
    pub fn overlay(self) -> Option<OverlayMarker> {
        match self {
            Operation::InjectMessage => Some(OverlayMarker::ErrorMessage),
            Operation::HighlightElement => Some(OverlayMarker::ElementHighlight),
            Operation::InjectCss => Some(OverlayMarker::InjectedStyle),
            _ => None,
        }
    }

    /// Statements and result expression, before the failure boundary
    fn script(self) -> (String, &'static str) {
        match self {
            Operation::Click => (
                "var element = arguments[0];\nelement.click();".to_string(),
                "true",
            ),
            Operation::SetAttribute => (
                "var element = arguments[0];\n\
                 element.setAttribute('%attribute_name', '%attribute_value');"
                    .to_string(),
                "true",
            ),
            Operation::InjectHtml => (
                "var element = document.querySelector('%selector');\n\
                 element.insertAdjacentHTML('beforeend', '%html');"
                    .to_string(),
                "true",
            ),
            Operation::InjectCss => (
                OverlayBuilder::new(OverlayMarker::InjectedStyle)
                    .statement("overlay.type = 'text/css';")
                    .statement("overlay.textContent = '%css';")
                    .build(),
                "true",
            ),
            Operation::DeleteElements => (
                "var matches = document.querySelectorAll('%selector');\n\
                 for (var i = 0; i < matches.length; i++) {\n\
                 \x20   if (matches[i].parentNode) {\n\
                 \x20       matches[i].parentNode.removeChild(matches[i]);\n\
                 \x20   }\n\
                 }"
                .to_string(),
                "true",
            ),
            Operation::HighlightElement => {
                // CSSOM drops invalid lengths silently, so the step checks its
                // input and throws to reach the fallback
                let geometry = format!(
                    r"var geometry = ['%{{x}}', '%{{y}}', '%{{width}}', '%{{height}}'];
for (var g = 0; g < geometry.length; g++) {{
    geometry[g] = geometry[g].trim();
    if (!{}.test(geometry[g])) {{
        throw new TypeError('Invalid highlight geometry: ' + geometry[g]);
    }}
}}
overlay.style.left = geometry[0] + 'px';
overlay.style.top = geometry[1] + 'px';
overlay.style.width = geometry[2] + 'px';
overlay.style.height = geometry[3] + 'px';
overlay.style.zIndex = '{}';",
                    GEOMETRY_PATTERN, TOP_Z_INDEX
                );
                let script = OverlayBuilder::new(OverlayMarker::ElementHighlight)
                    .styles(HIGHLIGHT_STYLE)
                    .degradable(
                        &geometry,
                        &format!("overlay.innerHTML = '{}';", HIGHLIGHT_FALLBACK),
                    )
                    .build();
                (script, "true")
            }
            Operation::InjectMessage => (
                OverlayBuilder::new(OverlayMarker::ErrorMessage)
                    .statement("var message = 'No error message';")
                    .degradable(
                        "message = '%message';",
                        &format!("message = '{}';", MESSAGE_FALLBACK),
                    )
                    .statement("overlay.textContent = '' + message;")
                    .styles(BANNER_STYLE)
                    .build(),
                "true",
            ),
            Operation::GetElements => (
                "var elements = Array.prototype.slice.call(document.querySelectorAll('%selector'));"
                    .to_string(),
                "elements",
            ),
            Operation::GetTextNoWhitespace => (
                "var matches = document.querySelectorAll('%selector');\n\
                 var text = '';\n\
                 for (var i = 0; i < matches.length; i++) {\n\
                 \x20   text += matches[i].textContent;\n\
                 }"
                .to_string(),
                "text.replace(/\\s+/g, '')",
            ),
            Operation::IsWaitingForUser => (
                format!("var radio = document.getElementById('{}');", RESUME_RADIO_ID),
                "!(radio && radio.checked)",
            ),
        }
    }

    /// The template for this operation
    pub fn template(self) -> Template {
        let (statements, result) = self.script();
        let template = Template::new(
            self.name(),
            guard(&statements, result),
            self.placeholders()
                .iter()
                .map(|name| (*name, Embedding::Literal)),
            self.result_shape(),
        )
        .expect("built-in template declares every placeholder it uses");

        if self.takes_element() {
            template.with_element_argument()
        } else {
            template
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Templates for every built-in operation
pub fn builtin_templates() -> impl Iterator<Item = Template> {
    Operation::ALL.into_iter().map(Operation::template)
}

/// Viewport rectangle for the highlight box, in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Region {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Bindings for the highlight-element template
    pub fn bindings(&self) -> crate::template::Bindings {
        crate::template::bindings([
            ("x", self.x.to_string()),
            ("y", self.y.to_string()),
            ("width", self.width.to_string()),
            ("height", self.height.to_string()),
        ])
    }
}
