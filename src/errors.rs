// src/errors.rs

//! Crate-wide error aliases and helpers.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WatchqueryError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// Malformed term arguments or clock cursor. Raised at query build time.
    #[error("Query parse error: {0}")]
    QueryParse(String),

    #[error("Unknown expression term: '{0}'")]
    UnknownTerm(String),

    #[error("Expression term registered twice: '{0}'")]
    DuplicateTerm(String),

    /// The backend could not begin observing a root. Fatal for that root.
    #[error("Watcher '{watcher}' failed to start on {root:?}: {reason}")]
    WatcherStart {
        watcher: String,
        root: PathBuf,
        reason: String,
    },

    /// A single file could not be registered with the backend.
    #[error("Failed to watch {path:?}: {reason}")]
    WatchFile { path: PathBuf, reason: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl WatchqueryError {
    pub fn parse(msg: impl Into<String>) -> Self {
        WatchqueryError::QueryParse(msg.into())
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, WatchqueryError>;
