use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{LedgerError, Result};

/// Stable identity of an artifact, derived from its URL.
///
/// The id is the file name of the URL path, so the same granule file reached
/// through `https://` and `s3://` maps to a single ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactId(String);

impl ArtifactId {
    /// Derive the id from an artifact URL.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidId`] when the URL does not parse or has
    /// no file name (for example `https://host/` or `s3://bucket`).
    pub fn from_url(url: &str) -> Result<Self> {
        let invalid = || LedgerError::InvalidId {
            url: url.to_string(),
        };
        let parsed = Url::parse(url).map_err(|_| invalid())?;
        parsed
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
            .map(|name| Self(name.to_string()))
            .ok_or_else(invalid)
    }

    pub fn as_str(&self) -> &str { &self.0 }

    pub(crate) fn as_key(&self) -> &[u8] { self.0.as_bytes() }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl From<&str> for ArtifactId {
    fn from(value: &str) -> Self { Self(value.to_string()) }
}

/// A ledger entry: one per artifact id.
///
/// `downloaded` only ever moves from `false` to `true`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRecord {
    pub id:                ArtifactId,
    pub url:               String,
    pub index_datetime:    DateTime<Utc>,
    pub downloaded:        bool,
    pub download_datetime: Option<DateTime<Utc>>,
}

impl ArtifactRecord {
    /// A freshly discovered, not yet downloaded artifact.
    pub fn discovered(id: ArtifactId, url: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            id,
            url: url.into(),
            index_datetime: at,
            downloaded: false,
            download_datetime: None,
        }
    }

    /// Flip the record to the downloaded state, stamping `at`.
    #[must_use]
    pub fn downloaded_at(mut self, at: DateTime<Utc>) -> Self {
        self.downloaded = true;
        self.download_datetime = Some(at);
        self
    }
}
