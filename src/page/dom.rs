//! Arena-backed document tree
//!
//! Nodes are never freed; removing a node detaches it from its parent so it is
//! no longer reachable from the root. `NodeId`s therefore stay valid for the
//! lifetime of the document, like element references held by a driver.

use std::collections::BTreeMap;

use logos::Logos;

use super::selector::SelectorList;
use crate::overlay::{OverlayMarker, OverlayParent};

pub type NodeId = usize;

#[derive(Debug, Clone, PartialEq)]
enum NodeData {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Default)]
struct Element {
    tag: String,
    attributes: Vec<(String, String)>,
    /// Inline style properties, keyed by script property name (`zIndex`)
    style: BTreeMap<String, String>,
    checked: bool,
}

#[derive(Debug, Clone, PartialEq)]
struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// An HTML document: `html` with a `head` and a `body`
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    nodes: Vec<Node>,
    head: NodeId,
    body: NodeId,
}

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// An empty document
    pub fn new() -> Self {
        let mut doc = Self {
            nodes: Vec::new(),
            head: 0,
            body: 0,
        };
        let root = doc.create_element("html");
        doc.head = doc.create_element("head");
        doc.body = doc.create_element("body");
        doc.append_child(root, doc.head);
        doc.append_child(root, doc.body);
        doc
    }

    /// A document whose body holds the given markup
    pub fn from_html(html: &str) -> Self {
        let mut doc = Self::new();
        doc.insert_html(doc.body, html);
        doc
    }

    pub fn root(&self) -> NodeId {
        0
    }

    pub fn head(&self) -> NodeId {
        self.head
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    pub fn contains(&self, node: NodeId) -> bool {
        node < self.nodes.len()
    }

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeData::Element(Element {
            tag: tag.to_ascii_lowercase(),
            ..Element::default()
        }))
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeData::Text(text.to_string()))
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        self.nodes.push(Node {
            data,
            parent: None,
            children: Vec::new(),
        });
        self.nodes.len() - 1
    }

    fn element(&self, node: NodeId) -> Option<&Element> {
        match self.nodes.get(node).map(|n| &n.data) {
            Some(NodeData::Element(element)) => Some(element),
            _ => None,
        }
    }

    fn element_mut(&mut self, node: NodeId) -> Option<&mut Element> {
        match self.nodes.get_mut(node).map(|n| &mut n.data) {
            Some(NodeData::Element(element)) => Some(element),
            _ => None,
        }
    }

    /// Append `child` as the last child of `parent`, moving it if attached
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.remove(child);
        self.nodes[child].parent = Some(parent);
        self.nodes[parent].children.push(child);
    }

    /// Detach a node from its parent
    pub fn remove(&mut self, node: NodeId) {
        if let Some(parent) = self.nodes[node].parent.take() {
            self.nodes[parent].children.retain(|&c| c != node);
        }
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node).and_then(|n| n.parent)
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node].children
    }

    /// Whether the node is reachable from the root
    pub fn is_connected(&self, node: NodeId) -> bool {
        let mut current = node;
        loop {
            if current == self.root() {
                return true;
            }
            match self.parent(current) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// Lowercase tag name; `None` for text nodes
    pub fn tag(&self, node: NodeId) -> Option<&str> {
        self.element(node).map(|e| e.tag.as_str())
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.element(node).and_then(|e| {
            e.attributes
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.as_str())
        })
    }

    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        let name = name.to_ascii_lowercase();
        if let Some(element) = self.element_mut(node) {
            if name == "checked" {
                element.checked = true;
            }
            match element.attributes.iter_mut().find(|(n, _)| *n == name) {
                Some((_, v)) => *v = value.to_string(),
                None => element.attributes.push((name, value.to_string())),
            }
        }
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.attribute(node, "class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }

    pub fn style(&self, node: NodeId, property: &str) -> Option<&str> {
        self.element(node)
            .and_then(|e| e.style.get(property))
            .map(|v| v.as_str())
    }

    pub fn set_style(&mut self, node: NodeId, property: &str, value: &str) {
        if let Some(element) = self.element_mut(node) {
            element.style.insert(property.to_string(), value.to_string());
        }
    }

    pub fn is_checked(&self, node: NodeId) -> bool {
        self.element(node).is_some_and(|e| e.checked)
    }

    pub fn set_checked(&mut self, node: NodeId, checked: bool) {
        if let Some(element) = self.element_mut(node) {
            element.checked = checked;
        }
    }

    /// Every node below `node`, in document order
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.nodes[node].children.iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.nodes[next].children.iter().rev().copied());
        }
        out
    }

    /// Connected elements matching the selector, in document order
    pub fn query_selector_all(&self, selector: &SelectorList) -> Vec<NodeId> {
        std::iter::once(self.root())
            .chain(self.descendants(self.root()))
            .filter(|&node| selector.matches(self, node))
            .collect()
    }

    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        self.descendants(self.root())
            .into_iter()
            .find(|&node| self.attribute(node, "id") == Some(id))
    }

    /// Concatenated text of the node and everything below it
    pub fn text_content(&self, node: NodeId) -> String {
        match &self.nodes[node].data {
            NodeData::Text(text) => text.clone(),
            NodeData::Element(_) => self
                .descendants(node)
                .into_iter()
                .filter_map(|n| match &self.nodes[n].data {
                    NodeData::Text(text) => Some(text.as_str()),
                    NodeData::Element(_) => None,
                })
                .collect(),
        }
    }

    /// Replace all children with a single text node
    pub fn set_text_content(&mut self, node: NodeId, text: &str) {
        self.clear_children(node);
        if !text.is_empty() {
            let child = self.create_text(text);
            self.append_child(node, child);
        }
    }

    /// Replace all children with parsed markup
    pub fn set_inner_html(&mut self, node: NodeId, html: &str) {
        self.clear_children(node);
        self.insert_html(node, html);
    }

    fn clear_children(&mut self, node: NodeId) {
        for child in std::mem::take(&mut self.nodes[node].children) {
            self.nodes[child].parent = None;
        }
    }

    /// Replace a singleton overlay: remove every element carrying the
    /// marker class, build a fresh one and attach it to its parent
    pub fn replace_singleton<F>(&mut self, marker: OverlayMarker, build: F) -> NodeId
    where
        F: FnOnce(&mut Document, NodeId),
    {
        let stale: Vec<NodeId> = self
            .descendants(self.root())
            .into_iter()
            .filter(|&n| self.has_class(n, marker.class_name()))
            .collect();
        for node in stale {
            self.remove(node);
        }

        let overlay = self.create_element(marker.tag());
        build(self, overlay);
        self.set_attribute(overlay, "class", marker.class_name());
        let parent = match marker.parent() {
            OverlayParent::Head => self.head,
            OverlayParent::Body => self.body,
        };
        self.append_child(parent, overlay);
        overlay
    }

    /// Parse markup and append it to `parent`
    pub fn insert_html(&mut self, parent: NodeId, html: &str) {
        let mut open = vec![parent];
        let mut lexer = Markup::lexer(html);
        while let Some(token) = lexer.next() {
            let slice = lexer.slice();
            let current = open.last().copied().unwrap_or(parent);
            match token {
                Ok(Markup::StartTag) => {
                    let (tag, attributes, self_closing) = parse_tag(slice);
                    let node = self.create_element(&tag);
                    for (name, value) in &attributes {
                        self.set_attribute(node, name, value);
                    }
                    self.append_child(current, node);
                    if !self_closing && !VOID_ELEMENTS.contains(&tag.as_str()) {
                        open.push(node);
                    }
                }
                Ok(Markup::EndTag) => {
                    let tag = slice[2..slice.len() - 1].trim().to_ascii_lowercase();
                    // Close up to the nearest matching element; stray end tags are ignored
                    if let Some(pos) = open
                        .iter()
                        .skip(1)
                        .rposition(|&n| self.tag(n) == Some(tag.as_str()))
                    {
                        open.truncate(pos + 1);
                    }
                }
                Ok(Markup::Comment) | Ok(Markup::Declaration) => {}
                Ok(Markup::Text) | Ok(Markup::LessThan) | Err(_) => {
                    let text = decode_entities(slice);
                    let node = self.create_text(&text);
                    self.append_child(current, node);
                }
            }
        }
    }

    /// Serialize a node and its subtree
    pub fn outer_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_html(node, &mut out);
        out
    }

    fn write_html(&self, node: NodeId, out: &mut String) {
        match &self.nodes[node].data {
            NodeData::Text(text) => out.push_str(&escape_text(text)),
            NodeData::Element(element) => {
                out.push('<');
                out.push_str(&element.tag);
                for (name, value) in &element.attributes {
                    out.push_str(&format!(" {}=\"{}\"", name, escape_attribute(value)));
                }
                if !element.style.is_empty() {
                    let style: Vec<String> = element
                        .style
                        .iter()
                        .map(|(property, value)| format!("{}: {};", kebab_case(property), value))
                        .collect();
                    out.push_str(&format!(" style=\"{}\"", escape_attribute(&style.join(" "))));
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&element.tag.as_str()) {
                    return;
                }
                for &child in &self.nodes[node].children {
                    self.write_html(child, out);
                }
                out.push_str(&format!("</{}>", element.tag));
            }
        }
    }
}

#[derive(Logos, Debug, Clone, Copy, PartialEq)]
enum Markup {
    #[regex(r#"<[A-Za-z][A-Za-z0-9-]*([^>"']|"[^"]*"|'[^']*')*>"#)]
    StartTag,

    #[regex(r"</[A-Za-z][A-Za-z0-9-]*[ \t\r\n\f]*>")]
    EndTag,

    #[token("<!--", skip_comment)]
    Comment,

    #[regex(r"<![A-Za-z][^>]*>")]
    Declaration,

    #[regex(r"[^<]+")]
    Text,

    #[token("<")]
    LessThan,
}

// Unterminated comments run to the end of the input
fn skip_comment(lex: &mut logos::Lexer<Markup>) -> bool {
    let rest = lex.remainder();
    let end = rest.find("-->").map(|i| i + 3).unwrap_or(rest.len());
    lex.bump(end);
    true
}

/// Split `<tag a="1" b>` into its name, attributes and self-closing flag
fn parse_tag(slice: &str) -> (String, Vec<(String, String)>, bool) {
    let inner = &slice[1..slice.len() - 1];
    let (inner, self_closing) = match inner.trim_end().strip_suffix('/') {
        Some(rest) => (rest, true),
        None => (inner, false),
    };
    let name_end = inner
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-'))
        .unwrap_or(inner.len());
    let tag = inner[..name_end].to_ascii_lowercase();

    let mut attributes = Vec::new();
    let mut rest = inner[name_end..].trim_start();
    while !rest.is_empty() {
        let name_end = rest
            .find(|c: char| c.is_whitespace() || c == '=')
            .unwrap_or(rest.len());
        let name = rest[..name_end].to_ascii_lowercase();
        rest = rest[name_end..].trim_start();

        let mut value = String::new();
        if let Some(after_eq) = rest.strip_prefix('=') {
            let after_eq = after_eq.trim_start();
            let (raw, remaining) = match after_eq.chars().next() {
                Some(quote @ ('"' | '\'')) => {
                    let body = &after_eq[1..];
                    let close = body.find(quote).unwrap_or(body.len());
                    (&body[..close], body.get(close + 1..).unwrap_or(""))
                }
                _ => {
                    let end = after_eq.find(char::is_whitespace).unwrap_or(after_eq.len());
                    (&after_eq[..end], &after_eq[end..])
                }
            };
            value = decode_entities(raw);
            rest = remaining.trim_start();
        }
        if !name.is_empty() {
            attributes.push((name, value));
        }
    }
    (tag, attributes, self_closing)
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest.find(';').and_then(|semi| {
            let entity = &rest[1..semi];
            let ch = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ => entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                    .and_then(char::from_u32),
            };
            ch.map(|c| (c, semi + 1))
        });
        match decoded {
            Some((ch, len)) => {
                out.push(ch);
                rest = &rest[len..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attribute(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}

fn kebab_case(property: &str) -> String {
    let mut out = String::with_capacity(property.len() + 2);
    for c in property.chars() {
        if c.is_ascii_uppercase() {
            out.push('-');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_document_shape() {
        let doc = Document::new();
        assert_eq!(doc.outer_html(doc.root()), "<html><head></head><body></body></html>");
    }

    #[test]
    fn test_parse_nested_markup() {
        let doc = Document::from_html(r#"<div id="a"><p class='x y'>Hi <b>there</b></p><br></div>"#);
        assert_eq!(
            doc.outer_html(doc.body()),
            r#"<body><div id="a"><p class="x y">Hi <b>there</b></p><br></div></body>"#
        );
        let div = doc.get_element_by_id("a").unwrap();
        assert_eq!(doc.text_content(div), "Hi there");
    }

    #[test]
    fn test_entities_and_comments() {
        let doc = Document::from_html("<p title=\"a &amp; b\">1 &lt; 2<!-- <p>ignored</p> --></p>");
        let p = doc.children(doc.body())[0];
        assert_eq!(doc.attribute(p, "title"), Some("a & b"));
        assert_eq!(doc.text_content(p), "1 < 2");
    }

    #[test]
    fn test_checked_attribute_sets_state() {
        let doc = Document::from_html(r#"<input type="radio" id="r" checked><input id="s">"#);
        assert!(doc.is_checked(doc.get_element_by_id("r").unwrap()));
        assert!(!doc.is_checked(doc.get_element_by_id("s").unwrap()));
    }

    #[test]
    fn test_stray_end_tag_ignored() {
        let doc = Document::from_html("<div>a</span>b</div>c");
        assert_eq!(doc.outer_html(doc.body()), "<body><div>ab</div>c</body>");
    }

    #[test]
    fn test_removed_nodes_are_unreachable() {
        let mut doc = Document::from_html(r#"<p id="gone">x</p>"#);
        let p = doc.get_element_by_id("gone").unwrap();
        doc.remove(p);
        assert!(!doc.is_connected(p));
        assert_eq!(doc.get_element_by_id("gone"), None);
        assert_eq!(doc.text_content(doc.body()), "");
    }

    #[test]
    fn test_replace_singleton_sweeps() {
        let mut doc = Document::from_html(
            r#"<span class="webdriver-test-error-message">old</span>
               <div><span class="webdriver-test-error-message">older</span></div>"#,
        );
        let banner = doc.replace_singleton(OverlayMarker::ErrorMessage, |doc, node| {
            doc.set_text_content(node, "new");
        });
        let all: Vec<_> = doc
            .descendants(doc.root())
            .into_iter()
            .filter(|&n| doc.has_class(n, "webdriver-test-error-message"))
            .collect();
        assert_eq!(all, vec![banner]);
        assert_eq!(doc.parent(banner), Some(doc.body()));
        assert_eq!(doc.text_content(banner), "new");
    }

    #[test]
    fn test_stylesheet_singleton_lives_in_head() {
        let mut doc = Document::new();
        let style = doc.replace_singleton(OverlayMarker::InjectedStyle, |doc, node| {
            doc.set_text_content(node, "p > a { color: red; }");
        });
        assert_eq!(doc.parent(style), Some(doc.head()));
        assert_eq!(
            doc.outer_html(style),
            r#"<style class="webdriver-injected">p &gt; a { color: red; }</style>"#
        );
    }

    #[test]
    fn test_style_serialization() {
        let mut doc = Document::new();
        let div = doc.create_element("div");
        doc.set_style(div, "zIndex", "5");
        assert_eq!(doc.outer_html(div), r#"<div style="z-index: 5;"></div>"#);
    }
}
