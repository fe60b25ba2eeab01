//! Error types for granary-fetch.

use std::io;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("unsupported URL scheme: {0}")]
    UnsupportedScheme(String),

    #[error("HTTP {status} for {url}")]
    Status { status: u16, url: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("redirect loop detected (more than {max} redirects) for {url}")]
    TooManyRedirects { url: String, max: usize },

    #[error("transfer timed out after {0:?}")]
    Timeout(Duration),

    #[error("object store error: {0}")]
    Store(#[from] object_store::Error),

    #[error("file I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("ledger error: {0}")]
    Ledger(#[from] granary_ledger::LedgerError),

    #[error("response from {url} is larger than {limit} bytes")]
    BodyTooLarge { url: String, limit: usize },

    #[error("credential vending failed: {0}")]
    Credentials(String),

    #[error("malformed JSON response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("upload task failed: {0}")]
    Task(String),
}

pub type Result<T> = std::result::Result<T, TransferError>;
