//! Singleton overlay elements
//!
//! Diagnostic banners, element highlights and injected stylesheets are
//! singletons identified by a marker class. Creating one always sweeps every
//! element that already carries the marker before inserting the new one, so
//! any number of create calls leaves exactly one behind. The sweep and the
//! insert happen in the same script, so nothing can run between them.

use crate::protocol;

/// Marker class of the diagnostic message banner
pub const ERROR_MESSAGE_CLASS: &str = "webdriver-test-error-message";
/// Marker class of the element highlight box
pub const ELEMENT_HIGHLIGHT_CLASS: &str = "webdriver-element-highlight";
/// Marker class of injected stylesheets
pub const INJECTED_CLASS: &str = "webdriver-injected";
/// Id of the radio control the harness uses to pause a test
pub const RESUME_RADIO_ID: &str = "webdriver-resume-radio";

/// Highest z-index a page can use
pub const TOP_Z_INDEX: &str = "2147483647";

/// Fixed presentation of the message banner (script style property, value)
pub const BANNER_STYLE: &[(&str, &str)] = &[
    ("top", "5px"),
    ("left", "5px"),
    ("margin", "20px"),
    ("padding", "20px"),
    ("color", "red"),
    ("fontSize", "20px"),
    ("lineHeight", "30px"),
    ("fontFamily", "Arial"),
    ("fontWeight", "bold"),
    ("position", "fixed"),
    ("zIndex", TOP_Z_INDEX),
];

/// Fixed presentation of the highlight box; geometry comes from the caller
pub const HIGHLIGHT_STYLE: &[(&str, &str)] = &[("position", "fixed"), ("border", "3px dotted red")];

/// The kinds of singleton overlay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverlayMarker {
    ErrorMessage,
    ElementHighlight,
    InjectedStyle,
}

/// Where an overlay is attached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayParent {
    Head,
    Body,
}

impl OverlayParent {
    pub fn tag(self) -> &'static str {
        match self {
            OverlayParent::Head => "head",
            OverlayParent::Body => "body",
        }
    }
}

impl OverlayMarker {
    pub const ALL: [OverlayMarker; 3] = [
        OverlayMarker::ErrorMessage,
        OverlayMarker::ElementHighlight,
        OverlayMarker::InjectedStyle,
    ];

    pub fn class_name(self) -> &'static str {
        match self {
            OverlayMarker::ErrorMessage => ERROR_MESSAGE_CLASS,
            OverlayMarker::ElementHighlight => ELEMENT_HIGHLIGHT_CLASS,
            OverlayMarker::InjectedStyle => INJECTED_CLASS,
        }
    }

    /// Selector matching every instance of this overlay
    pub fn selector(self) -> String {
        format!(".{}", self.class_name())
    }

    /// Tag of the element created for this overlay
    pub fn tag(self) -> &'static str {
        match self {
            OverlayMarker::ErrorMessage => "span",
            OverlayMarker::ElementHighlight => "div",
            OverlayMarker::InjectedStyle => "style",
        }
    }

    pub fn parent(self) -> OverlayParent {
        match self {
            OverlayMarker::InjectedStyle => OverlayParent::Head,
            _ => OverlayParent::Body,
        }
    }
}

/// Builds the script statements that replace a singleton overlay.
///
/// Setup steps operate on a variable named `overlay` holding the freshly
/// created element.
#[derive(Debug, Clone)]
pub struct OverlayBuilder {
    marker: OverlayMarker,
    steps: Vec<String>,
}

impl OverlayBuilder {
    pub fn new(marker: OverlayMarker) -> Self {
        Self {
            marker,
            steps: Vec::new(),
        }
    }

    /// Run a statement against the new element
    pub fn statement(mut self, statement: impl Into<String>) -> Self {
        self.steps.push(statement.into());
        self
    }

    /// Set one style property to a fixed value
    pub fn style(self, property: &str, value: &str) -> Self {
        let statement = format!(
            "overlay.style.{} = '{}';",
            property,
            crate::template::escape_literal(value)
        );
        self.statement(statement)
    }

    /// Set several style properties to fixed values
    pub fn styles(self, styles: &[(&str, &str)]) -> Self {
        styles
            .iter()
            .fold(self, |builder, (property, value)| builder.style(property, value))
    }

    /// Run a non-essential step; if it throws, run `fallback` instead and carry on
    pub fn degradable(self, step: &str, fallback: &str) -> Self {
        self.statement(protocol::fallback(step, fallback))
    }

    /// Sweep, build, mark and insert
    pub fn build(&self) -> String {
        let class = self.marker.class_name();
        let mut lines = vec![
            format!("var marker = '{}';", class),
            "var existing = document.querySelectorAll('.' + marker);".to_string(),
            "for (var i = 0; i < existing.length; i++) {".to_string(),
            "    existing[i].parentNode.removeChild(existing[i]);".to_string(),
            "}".to_string(),
            format!("var overlay = document.createElement('{}');", self.marker.tag()),
        ];
        lines.extend(self.steps.iter().cloned());
        lines.push("overlay.className = marker;".to_string());
        lines.push(format!(
            "document.querySelector('{}').appendChild(overlay);",
            self.marker.parent().tag()
        ));
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sweep_precedes_insert() {
        let script = OverlayBuilder::new(OverlayMarker::ElementHighlight)
            .styles(HIGHLIGHT_STYLE)
            .build();
        let sweep = script.find("removeChild").expect("sweep");
        let create = script.find("createElement('div')").expect("create");
        let insert = script.find("appendChild(overlay)").expect("insert");
        assert!(sweep < create && create < insert);
        assert!(script.contains("var marker = 'webdriver-element-highlight';"));
        assert!(script.contains("document.querySelectorAll('.' + marker)"));
        assert!(script.contains("overlay.style.border = '3px dotted red';"));
    }

    #[test]
    fn test_stylesheet_goes_to_head() {
        let script = OverlayBuilder::new(OverlayMarker::InjectedStyle).build();
        assert!(script.contains("document.querySelector('head').appendChild(overlay);"));
        assert!(script.contains("createElement('style')"));
    }

    #[test]
    fn test_degradable_step_keeps_going() {
        let script = OverlayBuilder::new(OverlayMarker::ErrorMessage)
            .degradable("overlay.textContent = compute();", "overlay.textContent = 'fallback';")
            .build();
        assert!(script.contains("} catch (e) {"));
        assert!(script.ends_with("document.querySelector('body').appendChild(overlay);"));
    }

    #[test]
    fn test_marker_selectors() {
        let selectors: Vec<_> = OverlayMarker::ALL.iter().map(|m| m.selector()).collect();
        assert_eq!(
            selectors,
            vec![
                ".webdriver-test-error-message",
                ".webdriver-element-highlight",
                ".webdriver-injected"
            ]
        );
    }
}
