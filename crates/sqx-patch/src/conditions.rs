//! Filter condition thresholds addressed by compound keys.
//!
//! A key such as `NetProfit_IS` names a databank column and a sample type.
//! It selects every `Condition` whose `Left-Side/Column-Value` carries that
//! column and sample type code; the value is written to the condition's
//! `Right-Side/Numeric-Value/@value` and the condition is switched on.
//!
//! Conditions are never created. A key that matches nothing is a no-op.

use crate::anchors::CONDITION_TAG;
use sqx_xml::{XmlElement, XmlPath};
use std::fmt;

/// Databank sample a condition is evaluated on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleType {
    /// `IS`, stored as `sampleType="10"`.
    InSample,
    /// `OOS`, stored as `sampleType="20"`.
    OutOfSample,
}

impl SampleType {
    pub const ALL: [SampleType; 2] = [SampleType::InSample, SampleType::OutOfSample];

    /// Parse the token used in configuration keys.
    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|sample| sample.token() == token)
    }

    /// Token used in configuration keys.
    pub fn token(self) -> &'static str {
        match self {
            SampleType::InSample => "IS",
            SampleType::OutOfSample => "OOS",
        }
    }

    /// Code stored in the `sampleType` attribute.
    pub fn code(self) -> &'static str {
        match self {
            SampleType::InSample => "10",
            SampleType::OutOfSample => "20",
        }
    }
}

impl fmt::Display for SampleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// A condition key split on its last underscore.
///
/// Column names may contain underscores themselves, so `Max_DD_OOS` is
/// column `Max_DD` with token `OOS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompoundKey<'a> {
    pub column: &'a str,
    pub token: &'a str,
}

impl<'a> CompoundKey<'a> {
    pub fn split(key: &'a str) -> Option<Self> {
        let (column, token) = key.rsplit_once('_')?;
        Some(Self { column, token })
    }
}

/// What resolving one condition key did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionOutcome {
    /// This many conditions were updated and enabled.
    Updated { count: usize },

    /// No condition has this column and sample type.
    NoMatch,

    /// The key has no underscore.
    MalformedKey,

    /// The part after the last underscore is not a known sample type.
    UnknownSampleType { token: String },
}

/// Write `value` to every condition under `conditions` matching
/// `compound_key`.
///
/// Matching conditions are updated in document order. A condition whose
/// left side matches but that has no `Right-Side/Numeric-Value` is left
/// alone and not counted.
pub fn resolve(conditions: &mut XmlElement, compound_key: &str, value: &str) -> ConditionOutcome {
    let Some(key) = CompoundKey::split(compound_key) else {
        return ConditionOutcome::MalformedKey;
    };
    let Some(sample) = SampleType::from_token(key.token) else {
        return ConditionOutcome::UnknownSampleType {
            token: key.token.to_string(),
        };
    };

    let column_value = XmlPath::child_of_context("Left-Side").child("Column-Value");
    let numeric_value = XmlPath::child_of_context("Right-Side").child("Numeric-Value");

    let mut count = 0;
    for condition in conditions
        .elements_mut()
        .filter(|element| element.name == CONDITION_TAG)
    {
        let matches = column_value.find(condition).is_some_and(|left| {
            left.attribute("column") == Some(key.column)
                && left.attribute("sampleType") == Some(sample.code())
        });
        if !matches {
            continue;
        }
        let Some(right) = numeric_value.find_mut(condition) else {
            tracing::debug!(key = compound_key, "matching condition has no numeric value");
            continue;
        };
        right.set_attribute("value", value);
        condition.set_attribute("use", "true");
        count += 1;
    }

    if count == 0 {
        ConditionOutcome::NoMatch
    } else {
        ConditionOutcome::Updated { count }
    }
}
