//! Core type definitions for patch configuration.

use indexmap::IndexMap;
use std::fmt;

/// A recognized top-level section of the patch configuration.
///
/// The declaration order is the order sections are applied in, regardless of
/// their order in the configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Section {
    /// `trading_options`: keyed `<Param key=".."/>` children.
    TradingOptions,

    /// `build_mode`: tag-named children of `BuildMode`.
    BuildMode,

    /// `slpt`: tag-named children of `SLPTOptions`.
    Slpt,

    /// `data_setup`: symbol, date range and backtest costs.
    DataSetup,

    /// `conditions`: filter conditions addressed by `<column>_<IS|OOS>`.
    Conditions,
}

impl Section {
    /// All sections, in application order.
    pub const ALL: [Section; 5] = [
        Section::TradingOptions,
        Section::BuildMode,
        Section::Slpt,
        Section::DataSetup,
        Section::Conditions,
    ];

    /// The key used for this section in the configuration file.
    pub fn key(self) -> &'static str {
        match self {
            Section::TradingOptions => "trading_options",
            Section::BuildMode => "build_mode",
            Section::Slpt => "slpt",
            Section::DataSetup => "data_setup",
            Section::Conditions => "conditions",
        }
    }

    /// Title used in change summaries.
    pub fn title(self) -> &'static str {
        match self {
            Section::TradingOptions => "Trading Options",
            Section::BuildMode => "Build Mode",
            Section::Slpt => "SL/PT Options",
            Section::DataSetup => "Data Setup",
            Section::Conditions => "Filter Conditions",
        }
    }

    /// Look up a section by its configuration key.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|section| section.key() == key)
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A scalar configuration value.
///
/// Every value is written to the document through
/// [`ScalarValue::to_patch_string`], and verification compares against the
/// same string.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    String(String),
    Integer(i64),
    Real(f64),
    Boolean(bool),
    Null,
}

impl ScalarValue {
    /// The canonical text form written into documents.
    ///
    /// - booleans render as `True` / `False`
    /// - integral reals keep one fractional digit (`2.0`)
    /// - NaN and infinities render as `nan`, `inf`, `-inf`
    /// - null renders as the empty string
    pub fn to_patch_string(&self) -> String {
        match self {
            ScalarValue::String(s) => s.clone(),
            ScalarValue::Integer(i) => i.to_string(),
            ScalarValue::Real(f) => format_real(*f),
            ScalarValue::Boolean(true) => "True".to_string(),
            ScalarValue::Boolean(false) => "False".to_string(),
            ScalarValue::Null => String::new(),
        }
    }
}

fn format_real(value: f64) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else if value.is_infinite() {
        if value > 0.0 { "inf" } else { "-inf" }.to_string()
    } else if value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_patch_string())
    }
}

impl From<&str> for ScalarValue {
    fn from(value: &str) -> Self {
        ScalarValue::String(value.to_string())
    }
}

impl From<String> for ScalarValue {
    fn from(value: String) -> Self {
        ScalarValue::String(value)
    }
}

impl From<i64> for ScalarValue {
    fn from(value: i64) -> Self {
        ScalarValue::Integer(value)
    }
}

impl From<i32> for ScalarValue {
    fn from(value: i32) -> Self {
        ScalarValue::Integer(i64::from(value))
    }
}

impl From<f64> for ScalarValue {
    fn from(value: f64) -> Self {
        ScalarValue::Real(value)
    }
}

impl From<bool> for ScalarValue {
    fn from(value: bool) -> Self {
        ScalarValue::Boolean(value)
    }
}

/// The key/value pairs of one section, in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatchSection {
    entries: IndexMap<String, ScalarValue>,
}

impl PatchSection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a value. A replaced key keeps its original position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ScalarValue>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&ScalarValue> {
        self.entries.get(key)
    }

    /// Entries in file order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ScalarValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A parsed patch configuration.
///
/// Only recognized sections are kept; the names of other top-level keys are
/// remembered in [`PatchConfig::ignored_keys`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatchConfig {
    sections: IndexMap<Section, PatchSection>,
    ignored: Vec<String>,
}

impl PatchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style entry insertion, creating the section if needed.
    pub fn with_entry(
        mut self,
        section: Section,
        key: impl Into<String>,
        value: impl Into<ScalarValue>,
    ) -> Self {
        self.section_mut(section).insert(key, value);
        self
    }

    /// Mutable access to a section, creating it if absent.
    pub fn section_mut(&mut self, section: Section) -> &mut PatchSection {
        self.sections.entry(section).or_default()
    }

    pub fn section(&self, section: Section) -> Option<&PatchSection> {
        self.sections.get(&section)
    }

    /// Present sections in application order (see [`Section::ALL`]).
    pub fn sections(&self) -> impl Iterator<Item = (Section, &PatchSection)> {
        Section::ALL
            .into_iter()
            .filter_map(|section| self.sections.get(&section).map(|s| (section, s)))
    }

    pub(crate) fn ignore(&mut self, key: String) {
        self.ignored.push(key);
    }

    /// Top-level keys that are not recognized sections.
    pub fn ignored_keys(&self) -> &[String] {
        &self.ignored
    }

    /// True when no recognized section is present.
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}
