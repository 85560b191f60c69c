use std::path::PathBuf;

use thiserror::Error;

/// Failure to produce a playable level. Fatal for that load.
#[derive(Debug, Error)]
pub enum LevelError {
    #[error("failed to read level file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("level {number} is empty")]
    Empty { number: u32 },
    #[error("level {number} not found ({available} available)")]
    NotFound { number: u32, available: u32 },
}

/// Failure to persist progress. Non-fatal: the game keeps running.
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("failed to write progress file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
