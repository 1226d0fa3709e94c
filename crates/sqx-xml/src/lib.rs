//! Lossless XML trees for patching strategy templates.
//!
//! This crate wraps [`quick-xml`] to build a mutable tree of [`XmlNode`]s in
//! which everything that is not an element (comments, whitespace, the XML
//! declaration, processing instructions, DOCTYPE) is kept as a first-class
//! node. Writing a document that was not modified reproduces its input bytes.
//!
//! # Overview
//!
//! - [`load_file`] / [`load_bytes`]: decode (UTF-8, falling back to
//!   Windows-1252) and parse
//! - [`XmlDocument`]: prolog, root element, epilog and source encoding
//! - [`XmlElement`]: name, ordered attributes, child nodes
//! - [`XmlPath`]: path expressions to locate elements
//!
//! # Example
//!
//! ```rust
//! use sqx_xml::{XmlPath, parse};
//!
//! let mut doc = parse(r#"<Strategy>
//!   <!-- generated -->
//!   <BuildMode><PopulationSize>100</PopulationSize></BuildMode>
//! </Strategy>"#).unwrap();
//!
//! let size = XmlPath::parse(".//BuildMode/PopulationSize")
//!     .unwrap()
//!     .find_mut(&mut doc.root)
//!     .unwrap();
//! size.set_text("200");
//!
//! assert!(doc.to_xml_string().contains("<!-- generated -->"));
//! assert!(doc.to_xml_string().contains("<PopulationSize>200</PopulationSize>"));
//! ```

pub mod encoding;
pub mod error;
pub mod parser;
pub mod path;
pub mod types;
pub mod writer;

// Re-export main types
pub use encoding::{load_bytes, load_file};
pub use error::{Error, Location, Result};
pub use parser::parse;
pub use path::{NodePath, PathError, XmlPath};
pub use types::{SourceEncoding, XmlAttribute, XmlDocument, XmlElement, XmlNode, XmlText};
pub use writer::is_valid_name;
