//! Error types for configuration loading.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for sqx-config operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading a patch configuration.
#[derive(Debug, Error)]
pub enum Error {
    /// YAML syntax error.
    #[error("invalid YAML: {0}")]
    Yaml(#[from] yaml_rust2::ScanError),

    /// More than one YAML document in the file.
    #[error("expected a single YAML document, found {count}")]
    MultipleDocuments { count: usize },

    /// The top level is not a mapping.
    #[error("configuration must be a mapping of sections, found {found}")]
    NotAMapping { found: &'static str },

    /// A recognized section is not a mapping.
    #[error("section '{section}' must be a mapping of keys to values, found {found}")]
    SectionNotAMapping {
        section: String,
        found: &'static str,
    },

    /// A key inside a section is not a string or integer.
    #[error("section '{section}' has an unsupported key of type {found}")]
    InvalidKey {
        section: String,
        found: &'static str,
    },

    /// A value is nested (sequence or mapping) instead of scalar.
    #[error("{section}.{key}: expected a scalar value, found {found}")]
    NotAScalar {
        section: String,
        key: String,
        found: &'static str,
    },

    /// Reading the configuration file failed.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
