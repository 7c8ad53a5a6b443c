//! Error types shared across the daemon

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GuardianError {
    #[error("failed to read config {path:?}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("unknown signal: {0}")]
    UnknownSignal(String),

    #[error("signal source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("failed to enumerate {root:?}: {message}")]
    Walk { root: PathBuf, message: String },

    #[error("a cleanup batch is already running")]
    CleanupInProgress,

    #[error("operation cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, GuardianError>;
