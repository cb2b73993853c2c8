//! A small owned DOM, independent of any particular XML crate, used as the
//! "structured document" boundary every `configure`/`serialize` pair in the
//! engine talks to. Parsing is backed by `roxmltree`; export is a hand
//! rolled writer since `roxmltree` only reads.

use rules_core::RuleError;
use std::fmt::Write as _;

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub name: String,
    attrs: Vec<(String, String)>,
    pub children: Vec<Element>,
    text: String,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
            children: Vec::new(),
            text: String::new(),
        }
    }

    pub fn parse(xml: &str) -> Result<Element, RuleError> {
        let doc = roxmltree::Document::parse(xml)
            .map_err(|e| RuleError::InvalidAttributeValue {
                attr: "xml".to_string(),
                value: e.to_string(),
            })?;
        Ok(from_node(doc.root_element()))
    }

    // -- reading -------------------------------------------------------

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn attr_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.attr(name).unwrap_or(default)
    }

    pub fn require_attr(&self, name: &str) -> Result<&str, RuleError> {
        self.attr(name)
            .ok_or_else(|| RuleError::MissingAttribute(name.to_string(), self.name.clone()))
    }

    pub fn text(&self) -> &str {
        self.text.trim()
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn require_child(&self, name: &str) -> Result<&Element, RuleError> {
        self.child(name)
            .ok_or_else(|| RuleError::MissingChild(name.to_string(), self.name.clone()))
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |c| c.name == name)
    }

    // -- writing ---------------------------------------------------------

    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.attrs.push((name.into(), value.into()));
        self
    }

    pub fn set_text(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = text.into();
        self
    }

    pub fn push_child(&mut self, child: Element) -> &mut Self {
        self.children.push(child);
        self
    }

    pub fn to_xml_string(&self) -> String {
        let mut out = String::new();
        write_element(&mut out, self, 0);
        out
    }
}

fn from_node(node: roxmltree::Node) -> Element {
    let mut elem = Element::new(node.tag_name().name());
    for attr in node.attributes() {
        elem.set_attr(attr.name().to_string(), attr.value().to_string());
    }
    let mut text = String::new();
    for child in node.children() {
        if child.is_element() {
            elem.push_child(from_node(child));
        } else if let Some(t) = child.text() {
            text.push_str(t);
        }
    }
    elem.set_text(text);
    elem
}

fn write_element(out: &mut String, elem: &Element, depth: usize) {
    let indent = "  ".repeat(depth);
    let _ = write!(out, "{}<{}", indent, elem.name);
    for (k, v) in &elem.attrs {
        let _ = write!(out, " {}=\"{}\"", k, escape(v));
    }
    let has_text = !elem.text.trim().is_empty();
    if elem.children.is_empty() && !has_text {
        out.push_str("/>\n");
        return;
    }
    out.push_str(">");
    if has_text && elem.children.is_empty() {
        out.push_str(&escape(elem.text.trim()));
        let _ = writeln!(out, "</{}>", elem.name);
        return;
    }
    out.push('\n');
    for child in &elem.children {
        write_element(out, child, depth + 1);
    }
    let _ = writeln!(out, "{}</{}>", indent, elem.name);
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
