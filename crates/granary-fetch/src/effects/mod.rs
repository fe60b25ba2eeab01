//! I/O operations with trait abstraction.

mod http;
mod sources;
mod staging;
mod upload;

pub use http::{BoxStream, HttpBody, HttpClient, Session, SessionConfig};
pub use sources::{Destination, SourceStores, VendedCredentials, VendedS3Stores};
pub use staging::{StagedFile, StagingArea};
pub use upload::{ChunkPool, upload_stream};
