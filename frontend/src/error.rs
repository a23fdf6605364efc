use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{message}: {}", errors.join("; "))]
    Validation { message: String, errors: Vec<String> },

    #[error("{message}")]
    NotFound { message: String },

    #[error("Server error {status}: {message}")]
    Server {
        status: u16,
        message: String,
        detail: Option<String>,
    },
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to write {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to encode storage: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid {key} value {value:?}: {reason}")]
    Invalid {
        key: String,
        value: String,
        reason: String,
    },
}
