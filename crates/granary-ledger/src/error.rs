use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sled::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] postcard::Error),
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("cannot derive an artifact id from `{url}`")]
    InvalidId { url: String },

    #[error("failed to open ledger at {}: {source}", path.display())]
    Open {
        path:   PathBuf,
        #[source]
        source: sled::Error,
    },

    #[error("ledger read failed: {0}")]
    Read(#[source] StoreError),

    #[error("ledger write failed for `{id}`: {source}")]
    Write {
        id:     String,
        #[source]
        source: StoreError,
    },
}

impl LedgerError {
    pub(crate) fn write(id: impl Into<String>, source: impl Into<StoreError>) -> Self {
        Self::Write {
            id:     id.into(),
            source: source.into(),
        }
    }

    /// Returns `true` for failures that must not be swallowed by callers.
    pub fn is_write(&self) -> bool { matches!(self, Self::Write { .. }) }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
