//! Byte-level loading and saving with the UTF-8 / Windows-1252 fallback.

use crate::{Error, Result, SourceEncoding, XmlDocument, parse};
use encoding_rs::WINDOWS_1252;
use std::borrow::Cow;
use std::fs;
use std::path::Path;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Decode document bytes.
///
/// UTF-8 is tried first (a leading BOM is stripped and remembered). Bytes that
/// are not valid UTF-8 are decoded as Windows-1252, which accepts any input.
pub fn decode(bytes: &[u8]) -> (Cow<'_, str>, SourceEncoding) {
    let (body, utf8_encoding) = match bytes.strip_prefix(UTF8_BOM) {
        Some(rest) => (rest, SourceEncoding::Utf8WithBom),
        None => (bytes, SourceEncoding::Utf8),
    };

    match std::str::from_utf8(body) {
        Ok(text) => (Cow::Borrowed(text), utf8_encoding),
        Err(err) => {
            tracing::debug!(
                valid_up_to = err.valid_up_to(),
                "input is not valid UTF-8, decoding as windows-1252"
            );
            let (text, _had_errors) = WINDOWS_1252.decode_without_bom_handling(bytes);
            (text, SourceEncoding::Windows1252)
        }
    }
}

/// Encode text for writing with the given encoding.
///
/// Characters that Windows-1252 cannot represent are written as numeric
/// character references.
pub fn encode(text: &str, encoding: SourceEncoding) -> Vec<u8> {
    match encoding {
        SourceEncoding::Utf8 => text.as_bytes().to_vec(),
        SourceEncoding::Utf8WithBom => {
            let mut bytes = Vec::with_capacity(UTF8_BOM.len() + text.len());
            bytes.extend_from_slice(UTF8_BOM);
            bytes.extend_from_slice(text.as_bytes());
            bytes
        }
        SourceEncoding::Windows1252 => {
            let (bytes, _, _) = WINDOWS_1252.encode(text);
            bytes.into_owned()
        }
    }
}

/// Parse a document from raw file bytes.
///
/// # Errors
///
/// Returns an error if the decoded text is not well-formed XML.
pub fn load_bytes(bytes: &[u8]) -> Result<XmlDocument> {
    let (text, encoding) = decode(bytes);
    let mut document = parse(&text)?;
    document.encoding = encoding;
    Ok(document)
}

/// Read and parse a document from disk.
///
/// # Errors
///
/// Returns [`Error::Io`] if the file cannot be read, or a parse error if its
/// content is not well-formed XML.
pub fn load_file(path: &Path) -> Result<XmlDocument> {
    let bytes = fs::read(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let document = load_bytes(&bytes)?;
    tracing::debug!(
        path = %path.display(),
        encoding = document.encoding.label(),
        "loaded document"
    );
    Ok(document)
}
