use std::path::PathBuf;
use thiserror::Error;

/// Failures that stop a patch run before anything is written.
#[derive(Debug, Error)]
pub enum PatchError {
    #[error("template file {} not found", path.display())]
    TemplateNotFound { path: PathBuf },

    #[error("config file {} not found", path.display())]
    ConfigNotFound { path: PathBuf },

    #[error("error parsing config file {}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: sqx_config::Error,
    },

    #[error("error parsing XML template {}", path.display())]
    Document {
        path: PathBuf,
        #[source]
        source: sqx_xml::Error,
    },

    #[error("I/O error on {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PatchError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| PatchError::Io { path, source }
    }
}
