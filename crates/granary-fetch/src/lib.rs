//! Ledger-aware transfer of granules into object storage.
//!
//! # Architecture
//!
//! This crate follows the three-layer pattern:
//! - [`data`] - Options, per-artifact outcomes and run summaries
//! - [`core`] - Pure transformations: scheme dispatch, redirect auth policy, keys
//! - [`effects`] - I/O behind traits: HTTP session, source stores, staging, uploads
//!
//! [`TransferEngine`] ties them together. Artifacts are processed one after
//! another; the parts of a single upload run concurrently on the engine's
//! bounded [`ChunkPool`].
//!
//! # Key Features
//!
//! - **Idempotent**: artifacts already marked downloaded are skipped without I/O
//! - **Streaming**: HTTPS bodies go straight to multipart upload parts
//! - **Guaranteed Cleanup**: staged S3 objects never outlive their artifact

mod core;
mod data;
mod effects;
mod engine;
mod error;

pub use core::{RedirectChain, Transport, destination_key, is_redirect, keep_auth, split_s3_url};
pub use data::{RunSummary, SkipReason, TransferOptions, TransferOutcome, TransferStats};
pub use effects::{
    BoxStream, ChunkPool, Destination, HttpBody, HttpClient, Session, SessionConfig, SourceStores, StagedFile,
    StagingArea, VendedCredentials, VendedS3Stores, upload_stream,
};
pub use engine::TransferEngine;
pub use error::{Result, TransferError};
