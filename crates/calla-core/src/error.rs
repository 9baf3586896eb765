//! Error types for calla-core.

use thiserror::Error;

/// Error type shared by every Calla crate.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Invalid stream: {0}")]
    InvalidStream(String),

    #[error("Audio backend: {0}")]
    Backend(String),

    #[error("Not supported by this backend: {0}")]
    Unsupported(&'static str),

    #[error("Audio context has not been started")]
    NotStarted,

    #[error("Audio manager was shut down")]
    Closed,

    #[error("Unknown entity: {0}")]
    UnknownEntity(String),
}

/// Result type alias.
pub type Result<T> = core::result::Result<T, Error>;
