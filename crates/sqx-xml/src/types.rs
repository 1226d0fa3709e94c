//! Core types for lossless, mutable XML trees.

use quick_xml::escape::partial_escape;

/// The encoding a document's bytes were decoded with.
///
/// Serialization re-encodes with the same encoding so an unmodified document
/// round-trips to identical bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceEncoding {
    /// Plain UTF-8 (the primary encoding).
    #[default]
    Utf8,

    /// UTF-8 preceded by a byte order mark.
    Utf8WithBom,

    /// Windows-1252, used when the bytes are not valid UTF-8.
    Windows1252,
}

impl SourceEncoding {
    /// Human readable encoding label.
    pub fn label(self) -> &'static str {
        match self {
            SourceEncoding::Utf8 => "utf-8",
            SourceEncoding::Utf8WithBom => "utf-8 (bom)",
            SourceEncoding::Windows1252 => "windows-1252",
        }
    }
}

/// A parsed XML document.
///
/// Everything outside the root element (XML declaration, comments, DOCTYPE,
/// whitespace) is kept in `prolog` and `epilog` so it survives serialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDocument {
    /// Nodes before the root element.
    pub prolog: Vec<XmlNode>,

    /// The root element.
    pub root: XmlElement,

    /// Nodes after the root element.
    pub epilog: Vec<XmlNode>,

    /// Encoding the source bytes were decoded with.
    pub encoding: SourceEncoding,
}

/// A node in the tree.
///
/// Only [`XmlNode::Element`] takes part in path matching. Every other kind is
/// carried along verbatim; the markup variants hold their raw source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(XmlText),
    /// Raw `<![CDATA[...]]>` markup.
    CData(String),
    /// Raw `<!--...-->` markup.
    Comment(String),
    /// Raw `<?target ...?>` markup.
    ProcessingInstruction(String),
    /// Raw `<?xml ...?>` markup.
    Declaration(String),
    /// Raw `<!DOCTYPE ...>` markup.
    DocType(String),
}

/// Character data between tags.
///
/// Keeps the escaped form exactly as it appeared in the source alongside the
/// unescaped value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlText {
    raw: String,
    value: String,
}

/// An attribute with its unescaped value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlAttribute {
    /// Qualified attribute name, including any namespace prefix.
    pub name: String,

    /// The attribute value (after unescaping XML entities).
    pub value: String,
}

/// An XML element.
///
/// Elements read from a document remember their original start and end tag
/// markup. As long as the attributes are untouched the original bytes are
/// written back, which keeps attribute quoting and spacing intact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    /// Qualified tag name, including any namespace prefix.
    pub name: String,

    attributes: Vec<XmlAttribute>,

    /// Child nodes in document order.
    pub children: Vec<XmlNode>,

    raw_start: Option<String>,
    raw_end: Option<String>,
    self_closing: bool,
}

impl XmlNode {
    /// The element, if this node is one.
    pub fn as_element(&self) -> Option<&XmlElement> {
        match self {
            XmlNode::Element(element) => Some(element),
            _ => None,
        }
    }

    /// Mutable access to the element, if this node is one.
    pub fn as_element_mut(&mut self) -> Option<&mut XmlElement> {
        match self {
            XmlNode::Element(element) => Some(element),
            _ => None,
        }
    }

    /// The text, if this node is non-empty whitespace-only character data.
    pub fn as_whitespace(&self) -> Option<&str> {
        match self {
            XmlNode::Text(text) if text.is_whitespace() => Some(text.value()),
            _ => None,
        }
    }

    /// Character data this node contributes to its parent's text content.
    fn text_value(&self) -> Option<&str> {
        match self {
            XmlNode::Text(text) => Some(text.value()),
            XmlNode::CData(raw) => Some(
                raw.strip_prefix("<![CDATA[")
                    .and_then(|inner| inner.strip_suffix("]]>"))
                    .unwrap_or(raw),
            ),
            _ => None,
        }
    }
}

impl XmlText {
    /// Create text from an unescaped value.
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            raw: partial_escape(&value).into_owned(),
            value,
        }
    }

    pub(crate) fn from_source(raw: String, value: String) -> Self {
        Self { raw, value }
    }

    /// The escaped text as it is written to the document.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The unescaped text.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// True for non-empty, whitespace-only text (indentation).
    pub fn is_whitespace(&self) -> bool {
        !self.value.is_empty() && self.value.chars().all(char::is_whitespace)
    }
}

impl XmlAttribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl XmlElement {
    /// Create a new element with no attributes and no children.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
            raw_start: None,
            raw_end: None,
            self_closing: false,
        }
    }

    /// Builder-style attribute setter.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    /// Builder-style text setter.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.set_text(text);
        self
    }

    pub(crate) fn from_source(
        name: String,
        attributes: Vec<XmlAttribute>,
        raw_start: String,
        self_closing: bool,
    ) -> Self {
        Self {
            name,
            attributes,
            children: Vec::new(),
            raw_start: Some(raw_start),
            raw_end: None,
            self_closing,
        }
    }

    pub(crate) fn set_raw_end(&mut self, raw_end: String) {
        self.raw_end = Some(raw_end);
    }

    pub(crate) fn raw_start(&self) -> Option<&str> {
        self.raw_start.as_deref()
    }

    pub(crate) fn raw_end(&self) -> Option<&str> {
        self.raw_end.as_deref()
    }

    pub(crate) fn is_self_closing(&self) -> bool {
        self.self_closing
    }

    /// All attributes in document order.
    pub fn attributes(&self) -> &[XmlAttribute] {
        &self.attributes
    }

    /// Get an attribute value by name.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Set an attribute, keeping its position if it already exists.
    ///
    /// Setting an attribute to the value it already has leaves the original
    /// start tag markup untouched.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();

        match self.attributes.iter_mut().find(|a| a.name == name) {
            Some(existing) if existing.value == value => {}
            Some(existing) => {
                existing.value = value;
                self.raw_start = None;
            }
            None => {
                self.attributes.push(XmlAttribute { name, value });
                self.raw_start = None;
            }
        }
    }

    /// Iterate over child elements, skipping text, comments and other markup.
    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(XmlNode::as_element)
    }

    /// Mutable iteration over child elements.
    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut XmlElement> {
        self.children.iter_mut().filter_map(XmlNode::as_element_mut)
    }

    /// First child element with the given tag name.
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.elements().find(|e| e.name == name)
    }

    /// Mutable access to the first child element with the given tag name.
    pub fn child_mut(&mut self, name: &str) -> Option<&mut XmlElement> {
        self.elements_mut().find(|e| e.name == name)
    }

    /// First child element whose attribute `attribute` equals `value`.
    pub fn child_by_attribute(&self, attribute: &str, value: &str) -> Option<&XmlElement> {
        self.elements().find(|e| e.attribute(attribute) == Some(value))
    }

    /// Text content: the concatenated text and CDATA children that come
    /// before the first child element.
    ///
    /// Text after a child element is layout or tail content of that child
    /// and is not part of this element's text. Returns `None` when there is
    /// no such character data.
    pub fn text(&self) -> Option<String> {
        let mut parts = self.leading_nodes().filter_map(XmlNode::text_value).peekable();
        parts.peek()?;
        Some(parts.collect())
    }

    /// Replace the text content.
    ///
    /// Text and CDATA children before the first child element are removed
    /// and the new text becomes the first child. Comments, child elements
    /// and the whitespace between child elements stay where they are.
    pub fn set_text(&mut self, text: impl Into<String>) {
        let text = text.into();
        let leading = self.leading_len();
        let mut index = 0;
        self.children.retain(|node| {
            let keep = index >= leading || !matches!(node, XmlNode::Text(_) | XmlNode::CData(_));
            index += 1;
            keep
        });
        if !text.is_empty() {
            self.children.insert(0, XmlNode::Text(XmlText::new(text)));
        }
    }

    /// Number of children before the first child element.
    fn leading_len(&self) -> usize {
        self.children
            .iter()
            .position(|node| matches!(node, XmlNode::Element(_)))
            .unwrap_or(self.children.len())
    }

    fn leading_nodes(&self) -> impl Iterator<Item = &XmlNode> {
        self.children[..self.leading_len()].iter()
    }

    /// Append a child element after the last existing child element.
    ///
    /// The whitespace that precedes the current last element is copied in
    /// front of the new one. A parent with no child elements but an indented
    /// closing tag gets the closing indentation plus one level.
    ///
    /// Returns the index of the new element in `children`.
    pub fn append_element(&mut self, element: XmlElement) -> usize {
        let last_element = self
            .children
            .iter()
            .rposition(|node| matches!(node, XmlNode::Element(_)));

        match last_element {
            Some(last) => {
                let indent = last
                    .checked_sub(1)
                    .and_then(|prev| self.children[prev].as_whitespace())
                    .map(str::to_owned);
                let mut at = last + 1;
                if let Some(indent) = indent {
                    self.children.insert(at, XmlNode::Text(XmlText::new(indent)));
                    at += 1;
                }
                self.children.insert(at, XmlNode::Element(element));
                at
            }
            None => {
                let closing = self
                    .children
                    .last()
                    .and_then(XmlNode::as_whitespace)
                    .filter(|ws| ws.contains('\n'))
                    .map(str::to_owned);
                match closing {
                    Some(closing) => {
                        let unit = if closing.contains('\t') { "\t" } else { "  " };
                        let at = self.children.len() - 1;
                        self.children
                            .insert(at, XmlNode::Text(XmlText::new(format!("{closing}{unit}"))));
                        self.children.insert(at + 1, XmlNode::Element(element));
                        at + 1
                    }
                    None => {
                        self.children.push(XmlNode::Element(element));
                        self.children.len() - 1
                    }
                }
            }
        }
    }

    /// Follow a path of child-node indices from this element.
    pub fn descendant_at(&self, path: &[usize]) -> Option<&XmlElement> {
        path.iter().try_fold(self, |element, &index| {
            element.children.get(index).and_then(XmlNode::as_element)
        })
    }

    /// Mutable variant of [`XmlElement::descendant_at`].
    pub fn descendant_at_mut(&mut self, path: &[usize]) -> Option<&mut XmlElement> {
        path.iter().try_fold(self, |element, &index| {
            element
                .children
                .get_mut(index)
                .and_then(XmlNode::as_element_mut)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_get_attribute() {
        let element = XmlElement::new("Param")
            .with_attribute("key", "MaxTradesPerDay")
            .with_attribute("class", "Generic");

        assert_eq!(element.attribute("key"), Some("MaxTradesPerDay"));
        assert_eq!(element.attribute("missing"), None);
        assert_eq!(element.attributes()[1].name, "class");
    }

    #[test]
    fn test_set_attribute_keeps_position() {
        let mut element = XmlElement::new("Condition")
            .with_attribute("use", "false")
            .with_attribute("id", "3");
        element.set_attribute("use", "true");

        assert_eq!(element.attributes()[0], XmlAttribute::new("use", "true"));
        assert_eq!(element.attributes().len(), 2);
    }

    #[test]
    fn test_text_concatenates_text_and_cdata() {
        let mut element = XmlElement::new("Symbol");
        element.children.push(XmlNode::Text(XmlText::new("EUR")));
        element.children.push(XmlNode::Comment("<!-- c -->".to_string()));
        element
            .children
            .push(XmlNode::CData("<![CDATA[USD]]>".to_string()));

        assert_eq!(element.text().as_deref(), Some("EURUSD"));
        assert_eq!(XmlElement::new("Empty").text(), None);
    }

    #[test]
    fn test_set_text_keeps_comments() {
        let mut element = XmlElement::new("Islands");
        element.children.push(XmlNode::Comment("<!-- keep -->".to_string()));
        element.children.push(XmlNode::Text(XmlText::new("2")));

        element.set_text("4");

        assert_eq!(element.text().as_deref(), Some("4"));
        assert_eq!(element.children.len(), 2);
        assert!(matches!(element.children[1], XmlNode::Comment(_)));
    }

    #[test]
    fn test_set_text_keeps_layout_between_child_elements() {
        let mut element = XmlElement::new("StopLoss");
        element.children.push(XmlNode::Text(XmlText::new("\n  ")));
        element.children.push(XmlNode::Element(XmlElement::new("Min")));
        element.children.push(XmlNode::Text(XmlText::new("\n  ")));
        element.children.push(XmlNode::Element(XmlElement::new("Max")));
        element.children.push(XmlNode::Text(XmlText::new("\n")));

        element.set_text("10");

        assert_eq!(element.text().as_deref(), Some("10"));
        assert_eq!(element.children.len(), 5);
        assert!(matches!(&element.children[0], XmlNode::Text(t) if t.value() == "10"));
        assert!(matches!(&element.children[2], XmlNode::Text(t) if t.value() == "\n  "));
        assert!(matches!(&element.children[4], XmlNode::Text(t) if t.value() == "\n"));
    }

    #[test]
    fn test_text_ignores_text_after_child_elements() {
        let mut element = XmlElement::new("StopLoss");
        element.children.push(XmlNode::Element(XmlElement::new("Min")));
        element.children.push(XmlNode::Text(XmlText::new("tail")));

        assert_eq!(element.text(), None);
    }

    #[test]
    fn test_text_escaping() {
        let text = XmlText::new("a < b & c");
        assert_eq!(text.raw(), "a &lt; b &amp; c");
        assert_eq!(text.value(), "a < b & c");
    }

    #[test]
    fn test_append_element_into_empty_parent() {
        let mut params = XmlElement::new("Params");
        params.append_element(XmlElement::new("Param"));

        assert_eq!(params.children.len(), 1);
        assert_eq!(params.elements().count(), 1);
    }

    #[test]
    fn test_append_element_copies_sibling_indent() {
        let mut parent = XmlElement::new("BuildMode");
        parent.children.push(XmlNode::Text(XmlText::new("\n    ")));
        parent
            .children
            .push(XmlNode::Element(XmlElement::new("PopulationSize")));
        parent.children.push(XmlNode::Text(XmlText::new("\n  ")));

        let index = parent.append_element(XmlElement::new("Islands"));

        assert_eq!(index, 3);
        let names: Vec<_> = parent.elements().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["PopulationSize", "Islands"]);
        assert_eq!(parent.children[2].as_whitespace(), Some("\n    "));
        assert_eq!(parent.children[4].as_whitespace(), Some("\n  "));
    }

    #[test]
    fn test_descendant_at() {
        let mut root = XmlElement::new("root");
        root.children.push(XmlNode::Text(XmlText::new("\n")));
        root.children
            .push(XmlNode::Element(XmlElement::new("a").with_text("x")));

        assert_eq!(root.descendant_at(&[1]).map(|e| e.name.as_str()), Some("a"));
        assert!(root.descendant_at(&[0]).is_none());
        assert!(root.descendant_at(&[7]).is_none());
        assert_eq!(root.descendant_at(&[]).map(|e| e.name.as_str()), Some("root"));
    }
}
