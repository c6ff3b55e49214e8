//! XML text to [`Node`] trees.
//!
//! Only elements, attributes and character data are kept. The declaration,
//! comments, processing instructions and doctype are dropped. Character
//! data is kept verbatim: text before an element's first child goes to its
//! `text`, text after a child goes to that child's `tail`. Whitespace-only
//! runs are dropped from elements that hold children and no other text, so
//! indentation does not survive as content.

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use recmerge_engine::Node;

use crate::error::{XmlError, XmlResult};

/// Parse a document and return its root element.
pub fn parse_document(xml: &str) -> XmlResult<Node> {
    let mut reader = Reader::from_str(xml);

    // Open elements, innermost last.
    let mut stack: Vec<Node> = Vec::new();
    let mut root: Option<Node> = None;

    loop {
        match reader.read_event()? {
            Event::Start(start) => stack.push(element(&start)?),
            Event::Empty(start) => {
                let node = element(&start)?;
                close(node, &mut stack, &mut root)?;
            }
            Event::End(_) => {
                // End names are checked against start names by the reader.
                if let Some(node) = stack.pop() {
                    close(node, &mut stack, &mut root)?;
                }
            }
            Event::Text(text) => {
                let text = text.unescape()?;
                append_text(&mut stack, &text);
            }
            Event::CData(data) => {
                let text = std::str::from_utf8(&data)?;
                append_text(&mut stack, text);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.pop() {
        return Err(XmlError::UnexpectedEof(open.name));
    }
    root.ok_or(XmlError::NoRootElement)
}

fn element(start: &BytesStart<'_>) -> XmlResult<Node> {
    let mut node = Node::new(std::str::from_utf8(start.name().as_ref())?);
    for attr in start.attributes() {
        let attr = attr?;
        let name = std::str::from_utf8(attr.key.as_ref())?;
        let value = attr.unescape_value()?;
        node.set_attr(name, value.as_ref());
    }
    Ok(node)
}

/// Attach a finished element to its parent, or make it the root.
fn close(mut node: Node, stack: &mut [Node], root: &mut Option<Node>) -> XmlResult<()> {
    drop_indentation(&mut node);
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None if root.is_some() => return Err(XmlError::MultipleRoots(node.name)),
        None => *root = Some(node),
    }
    Ok(())
}

fn drop_indentation(node: &mut Node) {
    if node.children.is_empty() || node.has_mixed_content() {
        return;
    }
    node.text = None;
    for child in &mut node.children {
        child.tail = None;
    }
}

/// Text outside the root element is ignored.
fn append_text(stack: &mut [Node], text: &str) {
    let Some(current) = stack.last_mut() else {
        return;
    };
    let slot = match current.children.last_mut() {
        Some(previous) => &mut previous.tail,
        None => &mut current.text,
    };
    if let Some(existing) = slot.as_mut() {
        existing.push_str(text);
    } else {
        *slot = Some(text.to_string());
    }
}
