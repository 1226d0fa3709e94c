//! Patch configuration for SQX strategy templates.
//!
//! A configuration is a two-level YAML mapping: recognized section names map
//! to key/value pairs of scalars.
//!
//! ```yaml
//! trading_options:
//!   MaxTradesPerDay: 6
//! build_mode:
//!   PopulationSize: 200
//! conditions:
//!   NetProfit_IS: 1000
//! ```
//!
//! Values keep their YAML type until they are written; [`ScalarValue::to_patch_string`]
//! is the single rule that turns them into document text.

mod error;
mod parser;
mod types;

pub use error::{Error, Result};
pub use parser::{load_file, parse};
pub use types::{PatchConfig, PatchSection, ScalarValue, Section};
