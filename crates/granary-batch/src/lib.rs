//! Groups discovered artifacts by tile and turns them into submitted jobs.
//!
//! - [`tile`] - Tile id extraction from artifact file names
//! - [`partition`] - Tile grouping and fixed-size work batches
//! - [`job`] - Job requests and the job-queue client
//! - [`submit`] - Bounded concurrent submission of every batch

mod error;
mod job;
mod partition;
mod submit;
mod tile;

pub use error::{PartitionError, SubmitError};
pub use job::{BatchParams, HttpJobSubmitter, JobRequest, JobSpec, JobSubmitter};
pub use partition::{DEFAULT_CHUNK_SIZE, TileGroups, WorkBatch, group_by_tile, partition};
pub use submit::{SubmissionReport, submit_all};
pub use tile::{DEFAULT_TILE_PATTERN, TileExtractor};
