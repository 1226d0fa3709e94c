//! Where each configuration section lives in a strategy template.

use sqx_config::Section;
use sqx_xml::XmlPath;

/// Tag of keyed trading option children.
pub const PARAM_TAG: &str = "Param";

/// Attribute holding a `Param`'s key.
pub const KEY_ATTR: &str = "key";

/// Attribute holding a `Param`'s value class.
pub const CLASS_ATTR: &str = "class";

/// Class given to synthesized `Param` elements unless configured otherwise.
pub const DEFAULT_PARAM_CLASS: &str = "Generic";

pub const CONDITION_TAG: &str = "Condition";

/// The anchor element a section's keys are written under.
///
/// `data_setup` spreads over several anchors and has no single one; see
/// [`crate::data_setup`].
pub fn section_anchor(section: Section) -> Option<XmlPath> {
    match section {
        Section::TradingOptions => Some(XmlPath::descendant("BuildTradingOptions").child("Params")),
        Section::BuildMode => Some(XmlPath::descendant("BuildMode")),
        Section::Slpt => Some(XmlPath::descendant("SLPTOptions")),
        Section::Conditions => Some(XmlPath::descendant("FilterParams").child("Conditions")),
        Section::DataSetup => None,
    }
}
