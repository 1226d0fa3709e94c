//! Serialization back to markup.
//!
//! Unmodified nodes are written from their original source text, so loading
//! and writing a document without changes reproduces its bytes exactly.

use crate::encoding::encode;
use crate::{Error, Result, XmlDocument, XmlElement, XmlNode};
use quick_xml::escape::escape;
use std::fs;
use std::path::Path;

impl XmlDocument {
    /// Serialize the whole document, prolog and epilog included.
    pub fn to_xml_string(&self) -> String {
        let mut out = String::new();
        for node in &self.prolog {
            write_node(node, &mut out);
        }
        write_element(&self.root, &mut out);
        for node in &self.epilog {
            write_node(node, &mut out);
        }
        out
    }

    /// Serialize and encode with the document's source encoding.
    pub fn to_bytes(&self) -> Vec<u8> {
        encode(&self.to_xml_string(), self.encoding)
    }

    /// Write the encoded document to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be written.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_bytes()).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl XmlElement {
    /// Serialize this element and its subtree.
    pub fn to_xml_string(&self) -> String {
        let mut out = String::new();
        write_element(self, &mut out);
        out
    }
}

fn write_node(node: &XmlNode, out: &mut String) {
    match node {
        XmlNode::Element(element) => write_element(element, out),
        XmlNode::Text(text) => out.push_str(text.raw()),
        XmlNode::CData(raw)
        | XmlNode::Comment(raw)
        | XmlNode::ProcessingInstruction(raw)
        | XmlNode::Declaration(raw)
        | XmlNode::DocType(raw) => out.push_str(raw),
    }
}

fn write_element(element: &XmlElement, out: &mut String) {
    let has_children = !element.children.is_empty();
    // Childless elements collapse to `<name/>` unless the source spelled out an end tag
    let collapse = !has_children && (element.is_self_closing() || element.raw_end().is_none());

    match element.raw_start() {
        Some(raw) if collapse || !element.is_self_closing() => out.push_str(raw),
        _ => write_start_tag(element, collapse, out),
    }
    if collapse {
        return;
    }

    for child in &element.children {
        write_node(child, out);
    }

    match element.raw_end() {
        Some(raw) => out.push_str(raw),
        None => {
            out.push_str("</");
            out.push_str(&element.name);
            out.push('>');
        }
    }
}

fn write_start_tag(element: &XmlElement, self_closing: bool, out: &mut String) {
    out.push('<');
    out.push_str(&element.name);
    for attribute in element.attributes() {
        out.push(' ');
        out.push_str(&attribute.name);
        out.push_str("=\"");
        out.push_str(&escape(&attribute.value));
        out.push('"');
    }
    out.push_str(if self_closing { "/>" } else { ">" });
}

/// Check whether `name` can be used as an element or attribute name.
///
/// Accepts the ASCII subset of XML names plus any non-ASCII letter, which is
/// enough to reject keys containing spaces, quotes or markup characters.
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    let name_start = |c: char| c.is_alphabetic() || c == '_' || c == ':';
    name_start(first)
        && chars.all(|c| name_start(c) || c.is_ascii_digit() || matches!(c, '-' | '.'))
}
