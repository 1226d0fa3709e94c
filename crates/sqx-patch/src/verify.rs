//! Checking that a document holds the configured values.

use crate::anchors::{KEY_ATTR, PARAM_TAG, section_anchor};
use crate::data_setup::{DataField, DataTarget, combine_symbol};
use sqx_config::{PatchConfig, PatchSection, ScalarValue, Section};
use sqx_xml::{XmlDocument, XmlElement};
use thiserror::Error;

/// Placeholder for the actual value when the target node does not exist.
pub const NOT_FOUND: &str = "NOT FOUND";

/// The first configured value the document does not hold.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "Validation failed for {section}.{key}: expected '{expected}', got '{}'",
    .actual.as_deref().unwrap_or(NOT_FOUND)
)]
pub struct VerificationMismatch {
    pub section: Section,
    pub key: String,
    pub expected: String,
    /// Text of the target node, `None` if there is no such node.
    pub actual: Option<String>,
}

/// Compare `document` with `config`, stopping at the first mismatch.
///
/// Targets are located the same way [`apply_patch`](crate::apply_patch)
/// locates them. Sections whose anchor is missing are skipped, as they are
/// when patching. Filter conditions are not checked: a condition key can
/// match any number of conditions, so there is no single node to compare.
///
/// # Errors
///
/// Returns a [`VerificationMismatch`] naming the section, key, expected and
/// actual value.
pub fn verify(document: &XmlDocument, config: &PatchConfig) -> Result<(), VerificationMismatch> {
    let root = &document.root;
    for (section, entries) in config.sections() {
        match section {
            Section::TradingOptions => verify_anchored(section, root, entries, |params, key| {
                params
                    .elements()
                    .find(|e| e.name == PARAM_TAG && e.attribute(KEY_ATTR) == Some(key))
            })?,
            Section::BuildMode | Section::Slpt => {
                verify_anchored(section, root, entries, |anchor, key| anchor.child(key))?
            }
            Section::DataSetup => verify_data_setup(root, entries)?,
            Section::Conditions => {
                tracing::debug!(keys = entries.len(), "conditions are not verified");
            }
        }
    }
    Ok(())
}

fn verify_anchored<'a>(
    section: Section,
    root: &'a XmlElement,
    entries: &PatchSection,
    lookup: impl Fn(&'a XmlElement, &str) -> Option<&'a XmlElement>,
) -> Result<(), VerificationMismatch> {
    let Some(path) = section_anchor(section) else {
        return Ok(());
    };
    let Some(anchor) = path.find(root) else {
        tracing::debug!(
            section = %section,
            anchor = %path,
            "anchor not found; not verifying section"
        );
        return Ok(());
    };
    for (key, value) in entries.iter() {
        let expected = value.to_patch_string();
        check(section, key, expected, lookup(anchor, key))?;
    }
    Ok(())
}

fn verify_data_setup(
    root: &XmlElement,
    entries: &PatchSection,
) -> Result<(), VerificationMismatch> {
    let symbol = entries.get("symbol").map(ScalarValue::to_patch_string);
    let timeframe = entries.get("timeframe").map(ScalarValue::to_patch_string);

    for (key, value) in entries.iter() {
        let Some(field) = DataField::from_key(key) else {
            continue;
        };
        let target = field.target();
        let Some(anchor) = target.anchor_path().find(root) else {
            continue;
        };
        match target {
            DataTarget::SymbolPart => {
                let actual = anchor.text();
                let expected =
                    combine_symbol(actual.as_deref(), symbol.as_deref(), timeframe.as_deref());
                let Some(expected) = expected else {
                    continue;
                };
                if actual.as_deref().unwrap_or_default() != expected {
                    return Err(VerificationMismatch {
                        section: Section::DataSetup,
                        key: key.to_string(),
                        expected,
                        actual: Some(actual.unwrap_or_default()),
                    });
                }
            }
            DataTarget::Child { tag, .. } => {
                check(Section::DataSetup, key, value.to_patch_string(), anchor.child(tag))?;
            }
        }
    }
    Ok(())
}

fn check(
    section: Section,
    key: &str,
    expected: String,
    node: Option<&XmlElement>,
) -> Result<(), VerificationMismatch> {
    let actual = node.map(|element| element.text().unwrap_or_default());
    if actual.as_deref() == Some(expected.as_str()) {
        return Ok(());
    }
    Err(VerificationMismatch {
        section,
        key: key.to_string(),
        expected,
        actual,
    })
}
