//! Document tree model.
//!
//! A record-oriented document is modelled as a tree of named elements, each
//! carrying:
//! - **attributes**: unique names mapped to string values, in document order
//! - **text**: optional character content before the first child
//! - **tail**: optional character content after the element's end tag, up
//!   to the next sibling; this is how mixed content keeps its order
//! - **children**: ordered child elements, some of which carry an identity
//!   attribute that lets the merger and differ match them across revisions

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single named attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// An element of a parsed document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<Attribute>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tail: Option<String>,
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_tail(mut self, tail: impl Into<String>) -> Self {
        self.tail = Some(tail.into());
        self
    }

    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attributes.iter().any(|a| a.name == name)
    }

    /// Set an attribute, replacing the value in place if the name exists.
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|a| a.name == name) {
            Some(existing) => existing.value = value,
            None => self.attributes.push(Attribute { name, value }),
        }
    }

    /// Remove an attribute, returning its previous value.
    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        let idx = self.attributes.iter().position(|a| a.name == name)?;
        Some(self.attributes.remove(idx).value)
    }

    /// Text content with surrounding whitespace removed; empty when absent.
    pub fn trimmed_text(&self) -> &str {
        trimmed(&self.text)
    }

    pub fn trimmed_tail(&self) -> &str {
        trimmed(&self.tail)
    }

    /// Whether text is interleaved with child elements.
    pub fn has_mixed_content(&self) -> bool {
        !self.children.is_empty()
            && (!self.trimmed_text().is_empty()
                || self.children.iter().any(|c| !c.trimmed_tail().is_empty()))
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Structural equality: attribute order and surrounding whitespace in
    /// text are insignificant, child order is significant. A node's own tail
    /// belongs to its parent and is compared there.
    pub fn structurally_equal(&self, other: &Node) -> bool {
        if self.name != other.name
            || self.attributes.len() != other.attributes.len()
            || self.trimmed_text() != other.trimmed_text()
            || self.children.len() != other.children.len()
        {
            return false;
        }
        self.attributes
            .iter()
            .all(|a| other.attr(&a.name) == Some(a.value.as_str()))
            && self
                .children
                .iter()
                .zip(other.children.iter())
                .all(|(a, b)| a.trimmed_tail() == b.trimmed_tail() && a.structurally_equal(b))
    }
}

fn trimmed(slot: &Option<String>) -> &str {
    slot.as_deref().map(str::trim).unwrap_or("")
}

/// Compact single-line markup, used when a whole element has to be carried
/// as a conflict value.
impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}", self.name)?;
        for attr in &self.attributes {
            write!(f, " {}=\"{}\"", attr.name, escape(&attr.value))?;
        }
        let text = self.trimmed_text();
        if text.is_empty() && self.children.is_empty() {
            return write!(f, "/>");
        }
        write!(f, ">{}", escape(text))?;
        for child in &self.children {
            write!(f, "{}{}", child, escape(child.trimmed_tail()))?;
        }
        write!(f, "</{}>", self.name)
    }
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}
