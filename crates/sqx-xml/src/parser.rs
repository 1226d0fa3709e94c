//! XML parser that builds lossless [`XmlDocument`] trees.

use crate::error::Location;
use crate::{Error, Result, XmlAttribute, XmlDocument, XmlElement, XmlNode, XmlText};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, BytesText, Event};

/// Parse XML from already-decoded text.
///
/// # Example
///
/// ```rust
/// use sqx_xml::parse;
///
/// let doc = parse("<Strategy><!-- note --><Symbol>EURUSD_M15</Symbol></Strategy>").unwrap();
/// assert_eq!(doc.root.name, "Strategy");
/// assert_eq!(doc.root.child("Symbol").and_then(|s| s.text()).as_deref(), Some("EURUSD_M15"));
/// ```
///
/// # Errors
///
/// Returns an error if the XML is not well-formed.
pub fn parse(content: &str) -> Result<XmlDocument> {
    XmlParser::new(content).parse()
}

/// Internal parser state.
struct XmlParser<'a> {
    /// The source content being parsed.
    source: &'a str,

    /// The quick-xml reader.
    reader: Reader<&'a [u8]>,

    /// Stack of open elements.
    stack: Vec<XmlElement>,

    prolog: Vec<XmlNode>,
    epilog: Vec<XmlNode>,
    root: Option<XmlElement>,
}

impl<'a> XmlParser<'a> {
    fn new(source: &'a str) -> Self {
        let mut reader = Reader::from_str(source);
        reader.config_mut().trim_text_start = false;
        reader.config_mut().trim_text_end = false;

        Self {
            source,
            reader,
            stack: Vec::new(),
            prolog: Vec::new(),
            epilog: Vec::new(),
            root: None,
        }
    }

    fn parse(mut self) -> Result<XmlDocument> {
        loop {
            // Capture position before reading the event
            let event_start = self.reader.buffer_position() as usize;

            let event = match self.reader.read_event() {
                Ok(event) => event,
                Err(err) => {
                    return Err(Error::Syntax {
                        message: err.to_string(),
                        location: self.location(self.reader.error_position() as usize),
                    });
                }
            };
            let event_end = self.reader.buffer_position() as usize;
            let source = self.source;
            let raw = &source[event_start..event_end];

            match event {
                Event::Start(e) => {
                    let element = self.start_element(&e, raw, event_start, false)?;
                    self.stack.push(element);
                }
                Event::End(e) => {
                    let found = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    let mut element = self.stack.pop().ok_or_else(|| Error::Syntax {
                        message: format!("unexpected closing tag </{found}>"),
                        location: self.location(event_start),
                    })?;
                    if element.name != found {
                        return Err(Error::MismatchedEndTag {
                            expected: element.name,
                            found,
                            location: self.location(event_start),
                        });
                    }
                    element.set_raw_end(raw.to_string());
                    self.finish_element(element, event_start)?;
                }
                Event::Empty(e) => {
                    let element = self.start_element(&e, raw, event_start, true)?;
                    self.finish_element(element, event_start)?;
                }
                Event::Text(e) => {
                    let node = self.text_node(&e, raw, event_start)?;
                    self.push_node(node, event_start)?;
                }
                Event::CData(_) => {
                    self.push_node(XmlNode::CData(raw.to_string()), event_start)?;
                }
                Event::Comment(_) => {
                    self.push_node(XmlNode::Comment(raw.to_string()), event_start)?;
                }
                Event::PI(_) => {
                    self.push_node(XmlNode::ProcessingInstruction(raw.to_string()), event_start)?;
                }
                Event::Decl(_) => {
                    self.push_node(XmlNode::Declaration(raw.to_string()), event_start)?;
                }
                Event::DocType(_) => {
                    self.push_node(XmlNode::DocType(raw.to_string()), event_start)?;
                }
                Event::Eof => break,
            }
        }

        // Check for unclosed elements
        if let Some(open) = self.stack.last() {
            return Err(Error::UnclosedElement {
                name: open.name.clone(),
                location: self.location(self.source.len()),
            });
        }

        let root = self.root.ok_or(Error::EmptyDocument)?;

        Ok(XmlDocument {
            prolog: self.prolog,
            root,
            epilog: self.epilog,
            encoding: Default::default(),
        })
    }

    fn start_element(
        &self,
        e: &BytesStart<'_>,
        raw: &str,
        event_start: usize,
        self_closing: bool,
    ) -> Result<XmlElement> {
        let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
        let attributes = self.parse_attributes(e, event_start)?;
        Ok(XmlElement::from_source(
            name,
            attributes,
            raw.to_string(),
            self_closing,
        ))
    }

    fn parse_attributes(&self, e: &BytesStart<'_>, tag_start: usize) -> Result<Vec<XmlAttribute>> {
        let mut attributes = Vec::new();

        for attr_result in e.attributes() {
            let attr = attr_result.map_err(|err| Error::Syntax {
                message: format!("invalid attribute: {err}"),
                location: self.location(tag_start),
            })?;

            let name = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value().map_err(|err| Error::Syntax {
                message: format!("invalid value for attribute '{name}': {err}"),
                location: self.location(tag_start),
            })?;

            attributes.push(XmlAttribute {
                name,
                value: value.into_owned(),
            });
        }

        Ok(attributes)
    }

    fn text_node(&self, e: &BytesText<'_>, raw: &str, event_start: usize) -> Result<XmlNode> {
        let value = e.unescape().map_err(|err| Error::Syntax {
            message: format!("invalid text content: {err}"),
            location: self.location(event_start),
        })?;
        Ok(XmlNode::Text(XmlText::from_source(
            raw.to_string(),
            value.into_owned(),
        )))
    }

    /// Attach a completed element to its parent, or make it the root.
    fn finish_element(&mut self, element: XmlElement, event_start: usize) -> Result<()> {
        if let Some(parent) = self.stack.last_mut() {
            parent.children.push(XmlNode::Element(element));
            return Ok(());
        }

        if self.root.is_some() {
            return Err(Error::MultipleRoots {
                name: element.name,
                location: self.location(event_start),
            });
        }
        self.root = Some(element);
        Ok(())
    }

    /// Attach a non-element node to the open element, or to the prolog/epilog.
    fn push_node(&mut self, node: XmlNode, event_start: usize) -> Result<()> {
        if let Some(parent) = self.stack.last_mut() {
            parent.children.push(node);
            return Ok(());
        }

        let outside_root_allowed = match &node {
            XmlNode::Text(text) => text.value().chars().all(char::is_whitespace),
            XmlNode::CData(_) | XmlNode::Element(_) => false,
            _ => true,
        };
        if !outside_root_allowed {
            return Err(Error::ContentOutsideRoot {
                location: self.location(event_start),
            });
        }

        if self.root.is_some() {
            self.epilog.push(node);
        } else {
            self.prolog.push(node);
        }
        Ok(())
    }

    fn location(&self, offset: usize) -> Location {
        Location::from_offset(self.source, offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_element() {
        let doc = parse("<root/>").unwrap();
        assert_eq!(doc.root.name, "root");
        assert!(doc.root.children.is_empty());
    }

    #[test]
    fn test_parse_nested_elements() {
        let doc = parse("<root><child/></root>").unwrap();
        assert_eq!(doc.root.name, "root");

        let children: Vec<_> = doc.root.elements().collect();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].name, "child");
    }

    #[test]
    fn test_parse_text_content() {
        let doc = parse("<root>Hello &amp; welcome</root>").unwrap();
        assert_eq!(doc.root.text().as_deref(), Some("Hello & welcome"));
    }

    #[test]
    fn test_parse_attributes_in_order() {
        let doc = parse(r#"<Param key="MaxTradesPerDay" class='Generic'>6</Param>"#).unwrap();
        let names: Vec<_> = doc.root.attributes().iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["key", "class"]);
        assert_eq!(doc.root.attribute("class"), Some("Generic"));
    }

    #[test]
    fn test_parse_keeps_comments_as_nodes() {
        let doc = parse("<root><!-- first --><a/><!-- second --></root>").unwrap();
        assert_eq!(doc.root.children.len(), 3);
        assert_eq!(
            doc.root.children[0],
            XmlNode::Comment("<!-- first -->".to_string())
        );
        assert_eq!(doc.root.elements().count(), 1);
    }

    #[test]
    fn test_parse_prolog_and_epilog() {
        let doc =
            parse("<?xml version=\"1.0\"?>\n<!-- head -->\n<root/>\n<!-- tail -->\n").unwrap();
        assert!(matches!(doc.prolog[0], XmlNode::Declaration(_)));
        assert!(matches!(doc.prolog[2], XmlNode::Comment(_)));
        assert!(matches!(doc.epilog[1], XmlNode::Comment(_)));
    }

    #[test]
    fn test_parse_keeps_whitespace_text() {
        let doc = parse("<root>\n  <a/>\n</root>").unwrap();
        assert_eq!(doc.root.children.len(), 3);
        assert_eq!(doc.root.children[0].as_whitespace(), Some("\n  "));
    }

    #[test]
    fn test_empty_document_error() {
        let result = parse("");
        assert!(matches!(result, Err(Error::EmptyDocument)));
    }

    #[test]
    fn test_only_prolog_is_empty_document() {
        let result = parse("<?xml version=\"1.0\"?>\n<!-- nothing -->\n");
        assert!(matches!(result, Err(Error::EmptyDocument)));
    }

    #[test]
    fn test_mismatched_tags_error() {
        let result = parse("<root></wrong>");
        // quick-xml checks end names itself and reports them as syntax errors
        assert!(
            matches!(
                result,
                Err(Error::MismatchedEndTag { .. } | Error::Syntax { .. })
            ),
            "Expected MismatchedEndTag or Syntax error, got: {:?}",
            result
        );
    }

    #[test]
    fn test_unclosed_element_error() {
        let result = parse("<root>\n  <child>");
        match result {
            Err(Error::UnclosedElement { name, .. }) => assert_eq!(name, "child"),
            other => panic!("expected UnclosedElement, got {:?}", other),
        }
    }

    #[test]
    fn test_multiple_roots_error() {
        let result = parse("<root/>\n<another/>");
        match result {
            Err(Error::MultipleRoots { name, location }) => {
                assert_eq!(name, "another");
                assert_eq!(location.line, 2);
            }
            other => panic!("expected MultipleRoots, got {:?}", other),
        }
    }

    #[test]
    fn test_text_outside_root_error() {
        let result = parse("stray<root/>");
        assert!(matches!(result, Err(Error::ContentOutsideRoot { .. })));
    }

    #[test]
    fn test_invalid_entity_error() {
        let result = parse("<root>&nope;</root>");
        assert!(matches!(result, Err(Error::Syntax { .. })));
    }
}
