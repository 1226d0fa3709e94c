//! Update-or-insert of scalar values under an anchor element.
//!
//! Two lookup strategies are supported:
//!
//! - by tag: the first direct child with the given name ([`upsert_child`])
//! - by key: the first direct `Param` child whose `key` attribute matches
//!   ([`upsert_param`], backed by a [`ParamIndex`])
//!
//! When no child matches, a new one is appended after the existing child
//! elements using the same indentation, so the document stays readable.

use crate::anchors::{CLASS_ATTR, KEY_ATTR, PARAM_TAG};
use sqx_xml::{XmlElement, XmlNode, is_valid_name};
use std::collections::HashMap;

/// What an upsert did to the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// An existing node had different text, which was replaced.
    Updated { previous: Option<String> },

    /// An existing node already held the value; nothing was touched.
    Unchanged,

    /// A new node was appended to the anchor.
    Inserted,

    /// The tag is not a valid XML name, so no node could be created.
    InvalidName,
}

/// Set the text of the first child element named `tag`, appending one if
/// there is none.
pub fn upsert_child(parent: &mut XmlElement, tag: &str, value: &str) -> UpsertOutcome {
    if let Some(existing) = parent.child_mut(tag) {
        return update_text(existing, value);
    }
    if !is_valid_name(tag) {
        return UpsertOutcome::InvalidName;
    }
    parent.append_element(XmlElement::new(tag).with_text(value));
    UpsertOutcome::Inserted
}

/// Positions of keyed `Param` children within one anchor.
///
/// Built once per section application. The first `Param` carrying a key
/// wins, the same element a `./Param[@key='...']` lookup would return.
#[derive(Debug, Clone, Default)]
pub struct ParamIndex {
    positions: HashMap<String, usize>,
}

impl ParamIndex {
    /// Index the direct `Param` children of `params`.
    pub fn build(params: &XmlElement) -> Self {
        let mut positions = HashMap::new();
        for (index, node) in params.children.iter().enumerate() {
            let Some(key) = node
                .as_element()
                .filter(|element| element.name == PARAM_TAG)
                .and_then(|element| element.attribute(KEY_ATTR))
            else {
                continue;
            };
            positions.entry(key.to_string()).or_insert(index);
        }
        Self { positions }
    }

    /// Child-node index of the `Param` with this key.
    pub fn get(&self, key: &str) -> Option<usize> {
        self.positions.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Set the text of the `Param` keyed `key`, appending
/// `<Param key=".." class="..">value</Param>` if there is none.
///
/// `index` must have been built from `params` and is kept current for keys
/// inserted here. Appending never moves existing child elements, so the
/// recorded positions stay valid.
pub fn upsert_param(
    params: &mut XmlElement,
    index: &mut ParamIndex,
    key: &str,
    value: &str,
    class: &str,
) -> UpsertOutcome {
    if let Some(existing) = index
        .get(key)
        .and_then(|position| params.children.get_mut(position))
        .and_then(XmlNode::as_element_mut)
    {
        return update_text(existing, value);
    }

    let param = XmlElement::new(PARAM_TAG)
        .with_attribute(KEY_ATTR, key)
        .with_attribute(CLASS_ATTR, class)
        .with_text(value);
    let position = params.append_element(param);
    index.positions.insert(key.to_string(), position);
    UpsertOutcome::Inserted
}

/// Replace the text of `element`, leaving it untouched when it already holds
/// `value`.
pub fn update_text(element: &mut XmlElement, value: &str) -> UpsertOutcome {
    let previous = element.text();
    if previous.as_deref() == Some(value) || (previous.is_none() && value.is_empty()) {
        return UpsertOutcome::Unchanged;
    }
    element.set_text(value);
    UpsertOutcome::Updated { previous }
}
