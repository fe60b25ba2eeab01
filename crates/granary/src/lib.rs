//! Discover, index, batch and transfer remote sensing granules.
//!
//! The binary has two passes over one ledger:
//!
//! - **query**: search the catalog, group the files by tile, record them in
//!   the ledger and submit one download job per batch of tiles.
//! - **download**: take what the ledger still lists as pending and move it
//!   into the destination store.
//!
//! [`run`] holds both passes behind trait seams; [`app`] wires them to the
//! real catalog, job queue, token endpoint and object stores.

pub mod admin;
pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod run;

pub use error::{Error, Result};
