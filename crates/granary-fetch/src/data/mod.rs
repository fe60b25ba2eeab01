//! Immutable data types for transfer runs.

mod options;
mod outcome;

pub use options::TransferOptions;
pub use outcome::{RunSummary, SkipReason, TransferOutcome, TransferStats};
