//! Patch engine for SQX strategy templates.
//!
//! Applies a [`PatchConfig`](sqx_config::PatchConfig) to an
//! [`XmlDocument`](sqx_xml::XmlDocument), checks the result, and renders the
//! change set for a human.
//!
//! Each configuration section lives under a fixed anchor element:
//!
//! | section           | anchor                          | lookup                      |
//! |-------------------|---------------------------------|-----------------------------|
//! | `trading_options` | `.//BuildTradingOptions/Params` | `Param[@key]`               |
//! | `build_mode`      | `.//BuildMode`                  | child tag                   |
//! | `slpt`            | `.//SLPTOptions`                | child tag                   |
//! | `data_setup`      | `.//Symbol`, `.//Data`, `.//BacktestSettings` | per key       |
//! | `conditions`      | `.//FilterParams/Conditions`    | `<column>_<IS/OOS>` predicate |
//!
//! # Example
//!
//! ```rust
//! use sqx_config::{PatchConfig, Section};
//! use sqx_patch::{PatchOptions, apply_patch, verify};
//!
//! let mut doc = sqx_xml::parse(
//!     "<Strategy>\n  <BuildMode>\n    <PopulationSize>100</PopulationSize>\n  </BuildMode>\n</Strategy>",
//! )
//! .unwrap();
//! let config = PatchConfig::new()
//!     .with_entry(Section::BuildMode, "PopulationSize", 200)
//!     .with_entry(Section::BuildMode, "Islands", 4);
//!
//! let report = apply_patch(&mut doc, &config, &PatchOptions::default());
//! assert_eq!(report.applied_count(), 2);
//! assert!(verify(&doc, &config).is_ok());
//! assert!(doc.to_xml_string().contains("    <Islands>4</Islands>\n"));
//! ```

pub mod anchors;
pub mod apply;
pub mod conditions;
pub mod data_setup;
pub mod diff;
pub mod summary;
pub mod upsert;
pub mod verify;

pub use apply::{PatchAction, PatchEntry, PatchOptions, PatchReport, apply_patch};
pub use conditions::{CompoundKey, ConditionOutcome, SampleType};
pub use diff::{CONTEXT_RADIUS, DiffLineKind, colorize, diff_bytes, unified_diff};
pub use summary::summarize;
pub use upsert::{ParamIndex, UpsertOutcome, update_text, upsert_child, upsert_param};
pub use verify::{NOT_FOUND, VerificationMismatch, verify};
