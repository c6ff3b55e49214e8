//! [`Node`] trees back to XML text.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Write;

use recmerge_engine::Node;

use crate::error::XmlResult;

/// Serialize a whole document with an XML declaration and two-space
/// indentation.
pub fn write_document(root: &Node) -> XmlResult<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    write_node(&mut writer, root)?;
    let mut out = into_string(writer)?;
    out.push('\n');
    Ok(out)
}

/// Serialize a single element without a declaration.
pub fn write_fragment(node: &Node) -> XmlResult<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    write_node(&mut writer, node)?;
    into_string(writer)
}

fn write_node<W: Write>(writer: &mut Writer<W>, node: &Node) -> XmlResult<()> {
    let mut start = BytesStart::new(node.name.as_str());
    for attr in &node.attributes {
        start.push_attribute((attr.name.as_str(), attr.value.as_str()));
    }

    let text = node.text.as_deref().filter(|t| !t.is_empty());
    if text.is_none() && node.children.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;
    if node.has_mixed_content() {
        // Indenting would add whitespace between text runs, so the content
        // is rendered flat and emitted as one pre-escaped run.
        let mut inner = Writer::new(Vec::new());
        write_content(&mut inner, node)?;
        let inner = into_string(inner)?;
        writer.write_event(Event::Text(BytesText::from_escaped(inner)))?;
    } else {
        write_content(writer, node)?;
    }
    writer.write_event(Event::End(BytesEnd::new(node.name.as_str())))?;
    Ok(())
}

/// Text, then each child followed by its tail.
fn write_content<W: Write>(writer: &mut Writer<W>, node: &Node) -> XmlResult<()> {
    if let Some(text) = node.text.as_deref().filter(|t| !t.is_empty()) {
        writer.write_event(Event::Text(BytesText::new(text)))?;
    }
    for child in &node.children {
        write_node(writer, child)?;
        if let Some(tail) = child.tail.as_deref().filter(|t| !t.is_empty()) {
            writer.write_event(Event::Text(BytesText::new(tail)))?;
        }
    }
    Ok(())
}

fn into_string(writer: Writer<Vec<u8>>) -> XmlResult<String> {
    String::from_utf8(writer.into_inner()).map_err(|e| e.utf8_error().into())
}
