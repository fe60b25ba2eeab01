use granary_auth::AuthError;
use granary_batch::PartitionError;
use granary_catalog::{CatalogError, ValidationError};
use granary_fetch::TransferError;
use granary_ledger::LedgerError;
use thiserror::Error;

/// Everything that can end a run.
///
/// Per-artifact transfer failures and per-batch submission failures are
/// counted in their reports instead; only what reaches this type is fatal.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Partition(#[from] PartitionError),

    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error("configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),

    #[error("no destination configured; set `destination` or pass --destination")]
    MissingDestination,

    #[error("refusing to reset the ledger without --yes")]
    ResetNotConfirmed,
}

impl From<figment::Error> for Error {
    fn from(e: figment::Error) -> Self { Self::Config(Box::new(e)) }
}

pub type Result<T> = std::result::Result<T, Error>;
