//! Applying a configuration to a template.

use crate::anchors::{DEFAULT_PARAM_CLASS, section_anchor};
use crate::conditions::{self, ConditionOutcome};
use crate::data_setup::{DataField, DataTarget, combine_symbol};
use crate::upsert::{ParamIndex, UpsertOutcome, update_text, upsert_child, upsert_param};
use sqx_config::{PatchConfig, PatchSection, ScalarValue, Section};
use sqx_xml::{XmlDocument, XmlElement};
use std::fmt;

/// Knobs for [`apply_patch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchOptions {
    /// `class` attribute given to `Param` elements that have to be created.
    pub default_param_class: String,
}

impl Default for PatchOptions {
    fn default() -> Self {
        Self {
            default_param_class: DEFAULT_PARAM_CLASS.to_string(),
        }
    }
}

/// What happened to one configured key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchAction {
    /// An existing node now holds the value.
    Updated { previous: Option<String> },

    /// An existing node already held the value.
    Unchanged,

    /// A node was created to hold the value.
    Inserted,

    /// This many filter conditions were updated and enabled.
    ConditionsUpdated { count: usize },

    /// No filter condition matched the key.
    NoMatchingCondition,

    /// Condition key without an underscore.
    MalformedKey,

    /// Condition key with an unrecognized sample type suffix.
    UnknownSampleType { token: String },

    /// The key cannot be used as a tag name.
    InvalidName,

    /// Only the timeframe was given and the symbol element has no text to
    /// take the symbol from.
    IncompleteSymbol,

    /// The anchor element the key lives under is not in the document.
    AnchorMissing { anchor: String },

    /// Not a recognized key of its section.
    UnknownKey,
}

impl PatchAction {
    /// True if the document now holds the configured value for the key.
    pub fn is_applied(&self) -> bool {
        matches!(
            self,
            PatchAction::Updated { .. }
                | PatchAction::Unchanged
                | PatchAction::Inserted
                | PatchAction::ConditionsUpdated { .. }
        )
    }
}

impl From<UpsertOutcome> for PatchAction {
    fn from(outcome: UpsertOutcome) -> Self {
        match outcome {
            UpsertOutcome::Updated { previous } => PatchAction::Updated { previous },
            UpsertOutcome::Unchanged => PatchAction::Unchanged,
            UpsertOutcome::Inserted => PatchAction::Inserted,
            UpsertOutcome::InvalidName => PatchAction::InvalidName,
        }
    }
}

impl From<ConditionOutcome> for PatchAction {
    fn from(outcome: ConditionOutcome) -> Self {
        match outcome {
            ConditionOutcome::Updated { count } => PatchAction::ConditionsUpdated { count },
            ConditionOutcome::NoMatch => PatchAction::NoMatchingCondition,
            ConditionOutcome::MalformedKey => PatchAction::MalformedKey,
            ConditionOutcome::UnknownSampleType { token } => {
                PatchAction::UnknownSampleType { token }
            }
        }
    }
}

impl fmt::Display for PatchAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatchAction::Updated {
                previous: Some(previous),
            } => write!(f, "updated (was '{previous}')"),
            PatchAction::Updated { previous: None } => write!(f, "updated (was empty)"),
            PatchAction::Unchanged => write!(f, "unchanged"),
            PatchAction::Inserted => write!(f, "inserted"),
            PatchAction::ConditionsUpdated { count: 1 } => write!(f, "updated 1 condition"),
            PatchAction::ConditionsUpdated { count } => write!(f, "updated {count} conditions"),
            PatchAction::NoMatchingCondition => write!(f, "no matching condition"),
            PatchAction::MalformedKey => write!(f, "key is not of the form <column>_<IS|OOS>"),
            PatchAction::UnknownSampleType { token } => write!(f, "unknown sample type '{token}'"),
            PatchAction::InvalidName => write!(f, "key is not a valid tag name"),
            PatchAction::IncompleteSymbol => write!(f, "no symbol to combine the timeframe with"),
            PatchAction::AnchorMissing { anchor } => write!(f, "anchor {anchor} not found"),
            PatchAction::UnknownKey => write!(f, "unknown key"),
        }
    }
}

/// One configured key and what applying it did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchEntry {
    pub section: Section,
    pub key: String,
    /// The value as written to the document.
    pub value: String,
    pub action: PatchAction,
}

/// Everything [`apply_patch`] did, one entry per configured key in
/// application order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchReport {
    entries: Vec<PatchEntry>,
}

impl PatchReport {
    pub fn entries(&self) -> &[PatchEntry] {
        &self.entries
    }

    /// Entries whose value is now in the document.
    pub fn applied(&self) -> impl Iterator<Item = &PatchEntry> {
        self.entries.iter().filter(|entry| entry.action.is_applied())
    }

    /// Entries that were skipped.
    pub fn skipped(&self) -> impl Iterator<Item = &PatchEntry> {
        self.entries.iter().filter(|entry| !entry.action.is_applied())
    }

    pub fn applied_count(&self) -> usize {
        self.applied().count()
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped().count()
    }

    /// The entry for a key, if it was configured.
    pub fn entry(&self, section: Section, key: &str) -> Option<&PatchEntry> {
        self.entries
            .iter()
            .find(|entry| entry.section == section && entry.key == key)
    }

    fn record(&mut self, section: Section, key: &str, value: String, action: PatchAction) {
        tracing::debug!(section = %section, key, value = %value, action = %action, "patch key");
        self.entries.push(PatchEntry {
            section,
            key: key.to_string(),
            value,
            action,
        });
    }
}

/// Apply every configured section to `document`.
///
/// Sections are applied in a fixed order (trading options, build mode,
/// SL/PT options, data setup, conditions) and keys in configuration order.
/// Nothing here fails: keys that cannot be applied are logged, recorded in
/// the report, and leave the document untouched.
pub fn apply_patch(
    document: &mut XmlDocument,
    config: &PatchConfig,
    options: &PatchOptions,
) -> PatchReport {
    let mut report = PatchReport::default();
    let root = &mut document.root;

    for (section, entries) in config.sections() {
        if entries.is_empty() {
            continue;
        }
        tracing::info!(section = %section, keys = entries.len(), "applying section");
        match section {
            Section::TradingOptions => apply_trading_options(root, entries, options, &mut report),
            Section::BuildMode | Section::Slpt => apply_tagged(section, root, entries, &mut report),
            Section::DataSetup => apply_data_setup(root, entries, &mut report),
            Section::Conditions => apply_conditions(root, entries, &mut report),
        }
    }

    report
}

fn apply_trading_options(
    root: &mut XmlElement,
    entries: &PatchSection,
    options: &PatchOptions,
    report: &mut PatchReport,
) {
    let Some(params) = find_anchor(Section::TradingOptions, root, entries, report) else {
        return;
    };
    let mut index = ParamIndex::build(params);
    for (key, value) in entries.iter() {
        let value = value.to_patch_string();
        let outcome = upsert_param(params, &mut index, key, &value, &options.default_param_class);
        report.record(Section::TradingOptions, key, value, outcome.into());
    }
}

fn apply_tagged(
    section: Section,
    root: &mut XmlElement,
    entries: &PatchSection,
    report: &mut PatchReport,
) {
    let Some(anchor) = find_anchor(section, root, entries, report) else {
        return;
    };
    for (key, value) in entries.iter() {
        let value = value.to_patch_string();
        let outcome = upsert_child(anchor, key, &value);
        if outcome == UpsertOutcome::InvalidName {
            tracing::warn!(section = %section, key, "key is not a valid tag name; skipping");
        }
        report.record(section, key, value, outcome.into());
    }
}

fn apply_data_setup(root: &mut XmlElement, entries: &PatchSection, report: &mut PatchReport) {
    let symbol = entries.get("symbol").map(ScalarValue::to_patch_string);
    let timeframe = entries.get("timeframe").map(ScalarValue::to_patch_string);

    for (key, value) in entries.iter() {
        let value = value.to_patch_string();
        let Some(field) = DataField::from_key(key) else {
            tracing::warn!(key, "unknown data_setup key; ignoring");
            report.record(Section::DataSetup, key, value, PatchAction::UnknownKey);
            continue;
        };

        let target = field.target();
        let anchor_path = target.anchor_path();
        let Some(anchor) = anchor_path.find_mut(root) else {
            tracing::warn!(key, anchor = %anchor_path, "anchor not found; skipping key");
            let action = PatchAction::AnchorMissing {
                anchor: anchor_path.to_string(),
            };
            report.record(Section::DataSetup, key, value, action);
            continue;
        };

        let action = match target {
            DataTarget::SymbolPart => {
                let current = anchor.text();
                match combine_symbol(current.as_deref(), symbol.as_deref(), timeframe.as_deref()) {
                    Some(combined) => update_text(anchor, &combined).into(),
                    None => {
                        tracing::warn!(key, "symbol element is empty; cannot set timeframe alone");
                        PatchAction::IncompleteSymbol
                    }
                }
            }
            DataTarget::Child { tag, .. } => upsert_child(anchor, tag, &value).into(),
        };
        report.record(Section::DataSetup, key, value, action);
    }
}

fn apply_conditions(root: &mut XmlElement, entries: &PatchSection, report: &mut PatchReport) {
    let Some(anchor) = find_anchor(Section::Conditions, root, entries, report) else {
        return;
    };
    for (key, value) in entries.iter() {
        let value = value.to_patch_string();
        let outcome = conditions::resolve(anchor, key, &value);
        if let ConditionOutcome::UnknownSampleType { token } = &outcome {
            tracing::warn!(key, token = token.as_str(), "unknown sample type; skipping condition");
        }
        report.record(Section::Conditions, key, value, outcome.into());
    }
}

/// Locate a section's anchor, recording every key as skipped when it is
/// missing.
fn find_anchor<'a>(
    section: Section,
    root: &'a mut XmlElement,
    entries: &PatchSection,
    report: &mut PatchReport,
) -> Option<&'a mut XmlElement> {
    let path = section_anchor(section)?;
    if let Some(anchor) = path.find_mut(root) {
        return Some(anchor);
    }

    tracing::warn!(section = %section, anchor = %path, "anchor not found; skipping section");
    for (key, value) in entries.iter() {
        let action = PatchAction::AnchorMissing {
            anchor: path.to_string(),
        };
        report.record(section, key, value.to_patch_string(), action);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqx_xml::parse;

    const TEMPLATE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Strategy>
  <BuildTradingOptions>
    <Params>
      <Param key="MaxTradesPerDay" class="Integer">3</Param>
    </Params>
  </BuildTradingOptions>
  <BuildMode>
    <PopulationSize>100</PopulationSize>
  </BuildMode>
  <Data>
    <Symbol>EURUSD_H1</Symbol>
    <From>2019-01-01</From>
  </Data>
</Strategy>
"#;

    #[test]
    fn test_report_records_each_key_in_order() {
        let mut doc = parse(TEMPLATE).unwrap();
        let config = PatchConfig::new()
            .with_entry(Section::BuildMode, "PopulationSize", 200)
            .with_entry(Section::BuildMode, "Islands", 4)
            .with_entry(Section::TradingOptions, "MaxTradesPerDay", 3)
            .with_entry(Section::Slpt, "MinSLInPips", 5);

        let report = apply_patch(&mut doc, &config, &PatchOptions::default());

        let actions: Vec<_> = report
            .entries()
            .iter()
            .map(|e| (e.section, e.key.as_str(), e.action.clone()))
            .collect();
        assert_eq!(
            actions,
            [
                (Section::TradingOptions, "MaxTradesPerDay", PatchAction::Unchanged),
                (
                    Section::BuildMode,
                    "PopulationSize",
                    PatchAction::Updated {
                        previous: Some("100".to_string())
                    }
                ),
                (Section::BuildMode, "Islands", PatchAction::Inserted),
                (
                    Section::Slpt,
                    "MinSLInPips",
                    PatchAction::AnchorMissing {
                        anchor: ".//SLPTOptions".to_string()
                    }
                ),
            ]
        );
        assert_eq!(report.applied_count(), 3);
        assert_eq!(report.skipped_count(), 1);
    }

    #[test]
    fn test_missing_anchor_leaves_document_untouched() {
        let mut doc = parse(TEMPLATE).unwrap();
        let config = PatchConfig::new()
            .with_entry(Section::Slpt, "MinSLInPips", 5)
            .with_entry(Section::Conditions, "NetProfit_IS", 1000);

        apply_patch(&mut doc, &config, &PatchOptions::default());

        assert_eq!(doc.to_xml_string(), TEMPLATE);
    }

    #[test]
    fn test_param_class_option() {
        let mut doc = parse(TEMPLATE).unwrap();
        let config = PatchConfig::new().with_entry(Section::TradingOptions, "ExitOnFriday", true);
        let options = PatchOptions {
            default_param_class: "Boolean".to_string(),
        };

        apply_patch(&mut doc, &config, &options);

        assert!(
            doc.to_xml_string()
                .contains(r#"      <Param key="ExitOnFriday" class="Boolean">True</Param>"#)
        );
    }

    #[test]
    fn test_data_setup_keys() {
        let mut doc = parse(TEMPLATE).unwrap();
        let config = PatchConfig::new()
            .with_entry(Section::DataSetup, "timeframe", "M15")
            .with_entry(Section::DataSetup, "date_from", "2020-04-17")
            .with_entry(Section::DataSetup, "date_to", "2025-04-18")
            .with_entry(Section::DataSetup, "spread", 2)
            .with_entry(Section::DataSetup, "session", "London");

        let report = apply_patch(&mut doc, &config, &PatchOptions::default());

        let out = doc.to_xml_string();
        assert!(out.contains("<Symbol>EURUSD_M15</Symbol>"));
        assert!(out.contains(
            "    <From>2020-04-17</From>\n    <To>2025-04-18</To>\n  </Data>"
        ));
        assert_eq!(
            report.entry(Section::DataSetup, "spread").map(|e| &e.action),
            Some(&PatchAction::AnchorMissing {
                anchor: ".//BacktestSettings".to_string()
            })
        );
        assert_eq!(
            report.entry(Section::DataSetup, "session").map(|e| &e.action),
            Some(&PatchAction::UnknownKey)
        );
    }

    #[test]
    fn test_symbol_and_timeframe_written_together() {
        let mut doc = parse(TEMPLATE).unwrap();
        let config = PatchConfig::new()
            .with_entry(Section::DataSetup, "symbol", "GBPUSD")
            .with_entry(Section::DataSetup, "timeframe", "M5");

        let report = apply_patch(&mut doc, &config, &PatchOptions::default());

        assert!(doc.to_xml_string().contains("<Symbol>GBPUSD_M5</Symbol>"));
        assert_eq!(
            report.entry(Section::DataSetup, "timeframe").map(|e| &e.action),
            Some(&PatchAction::Unchanged)
        );
    }

    #[test]
    fn test_timeframe_alone_needs_existing_symbol() {
        let mut doc = parse("<Strategy><Symbol/></Strategy>").unwrap();
        let config = PatchConfig::new().with_entry(Section::DataSetup, "timeframe", "M5");

        let report = apply_patch(&mut doc, &config, &PatchOptions::default());

        assert_eq!(report.entries()[0].action, PatchAction::IncompleteSymbol);
        assert_eq!(doc.to_xml_string(), "<Strategy><Symbol/></Strategy>");
    }

    #[test]
    fn test_action_display() {
        assert_eq!(
            PatchAction::Updated {
                previous: Some("3".to_string())
            }
            .to_string(),
            "updated (was '3')"
        );
        assert_eq!(
            PatchAction::ConditionsUpdated { count: 2 }.to_string(),
            "updated 2 conditions"
        );
        assert_eq!(
            PatchAction::AnchorMissing {
                anchor: ".//BuildMode".to_string()
            }
            .to_string(),
            "anchor .//BuildMode not found"
        );
    }
}
