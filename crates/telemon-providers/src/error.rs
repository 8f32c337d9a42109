//! Error type shared by the providers.
//!
//! None of these errors reach an HTTP caller. Each provider converts a failure
//! into its "unavailable" marker at the smallest scope it can.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {what}: {detail}")]
    Parse { what: &'static str, detail: String },

    #[error("{0} unavailable")]
    Unavailable(String),

    #[error("command {command} failed: {detail}")]
    Command { command: String, detail: String },

    #[error(transparent)]
    Sys(#[from] nix::Error),
}

impl ProviderError {
    pub fn parse(what: &'static str, detail: impl Into<String>) -> Self {
        Self::Parse {
            what,
            detail: detail.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ProviderError>;

/// Reads a whole file, attaching the path to any I/O error.
pub fn read_file(path: impl Into<PathBuf>) -> Result<String> {
    let path = path.into();
    std::fs::read_to_string(&path).map_err(|source| ProviderError::Io { path, source })
}

/// Async variant of [`read_file`] for providers running on the runtime.
pub async fn read_file_async(path: impl Into<PathBuf>) -> Result<String> {
    let path = path.into();
    tokio::fs::read_to_string(&path)
        .await
        .map_err(|source| ProviderError::Io { path, source })
}
