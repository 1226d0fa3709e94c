//! Command-line driver for patching SQX strategy templates.
//!
//! [`run`] ties the pieces together: load the configuration and template,
//! apply the patch, then either preview it (dry run) or write the patched
//! template and its diff, optionally verifying the result.

mod error;
mod run;

pub use error::PatchError;
pub use run::{
    DEFAULT_OUTPUT_DIR, DIFF_EXTENSION, RunOptions, RunOutcome, default_output_path, diff_path, run,
};
