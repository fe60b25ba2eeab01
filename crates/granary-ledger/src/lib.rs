//! Durable download ledger for discovered artifacts.
//!
//! # Architecture
//!
//! - [`record`] - Artifact identity and the persisted ledger entry
//! - [`store`] - The [`Ledger`] contract and its sled-backed implementation
//! - [`reconcile`] - Folding a freshly discovered URL list into the ledger
//!
//! # Failure Semantics
//!
//! Reads favour availability: a failed lookup degrades to "absent" and a
//! failed scan degrades to "nothing pending". Writes never degrade; they
//! surface as [`LedgerError::Write`] so a lost `mark_downloaded` can not be
//! mistaken for a successful one.

mod error;
mod record;
mod reconcile;
mod store;

pub use error::{LedgerError, Result, StoreError};
pub use record::{ArtifactId, ArtifactRecord};
pub use reconcile::{ReconcileReport, reconcile};
pub use store::{Ledger, SledLedger, Upsert};
