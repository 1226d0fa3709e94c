//! Error types for XML loading.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for sqx-xml operations.
pub type Result<T> = std::result::Result<T, Error>;

/// A position in the decoded source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    /// Byte offset into the decoded text.
    pub offset: usize,
    /// 1-based line number.
    pub line: usize,
    /// 1-based column, counted in bytes.
    pub column: usize,
}

impl Location {
    /// Resolve a byte offset into a line/column location.
    pub fn from_offset(source: &str, offset: usize) -> Self {
        let bytes = &source.as_bytes()[..offset.min(source.len())];
        let line = bytes.iter().filter(|&&b| b == b'\n').count() + 1;
        let line_start = bytes
            .iter()
            .rposition(|&b| b == b'\n')
            .map_or(0, |pos| pos + 1);
        Self {
            offset,
            line,
            column: bytes.len() - line_start + 1,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// Errors that can occur while loading or writing a document.
#[derive(Debug, Error)]
pub enum Error {
    /// Syntax error reported by quick-xml or found while unescaping.
    #[error("XML syntax error at {location}: {message}")]
    Syntax { message: String, location: Location },

    /// The input ended while an element was still open.
    #[error("unexpected end of input at {location}: expected closing tag </{name}>")]
    UnclosedElement { name: String, location: Location },

    /// An end tag does not match the open element.
    #[error("mismatched end tag at {location}: expected </{expected}>, found </{found}>")]
    MismatchedEndTag {
        expected: String,
        found: String,
        location: Location,
    },

    /// Character data or CDATA outside the root element.
    #[error("content outside the root element at {location}")]
    ContentOutsideRoot { location: Location },

    /// No root element found.
    #[error("empty XML document: no root element found")]
    EmptyDocument,

    /// More than one root element.
    #[error("multiple root elements: second root <{name}> at {location}")]
    MultipleRoots { name: String, location: Location },

    /// Reading or writing the document failed.
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
