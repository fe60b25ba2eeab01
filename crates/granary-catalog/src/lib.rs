//! Granule discovery against a CMR-style metadata catalog.
//!
//! # Architecture
//!
//! - [`query`] - Validated request types and their wire parameters
//! - [`filter`] - Protocol and extension filtering of discovered URLs
//! - [`cmr`] - The [`Catalog`] trait, the CMR implementation, pagination
//!
//! Everything in [`query`] is validated before any request is sent, so a
//! malformed bounding box or date aborts a run without network activity.

mod cmr;
mod error;
mod filter;
mod query;

pub use cmr::{Catalog, CatalogPage, CmrCatalog, query_all};
pub use error::{CatalogError, ValidationError};
pub use filter::{ExtensionList, Protocol, UrlFilter};
pub use query::{
    BoundingBox, QueryRequest, TIMESTAMP_FORMAT, TimeWindow, format_timestamp, parse_end_date,
    parse_minutes, parse_start_date, temporal_range,
};
