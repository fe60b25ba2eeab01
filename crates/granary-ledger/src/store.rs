use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use crate::error::{LedgerError, Result, StoreError};
use crate::record::{ArtifactId, ArtifactRecord};

/// Outcome of [`Ledger::upsert_new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    /// The id was unseen and a pending record was created.
    Created,
    /// A record already existed and was left untouched.
    Existing,
}

/// Keyed record of every discovered artifact and its download status.
///
/// Implementations must make `upsert_new` and `mark_downloaded` atomic per
/// record; concurrent writers from other processes are expected.
pub trait Ledger: Send + Sync {
    /// Create a pending record for `id` unless one exists.
    fn upsert_new(&self, id: &ArtifactId, url: &str) -> Result<Upsert>;

    /// Point lookup. Read failures are logged and reported as absent.
    fn exists(&self, id: &ArtifactId) -> Option<ArtifactRecord>;

    /// Mark `id` downloaded now, creating the record if it is missing.
    fn mark_downloaded(&self, id: &ArtifactId, url: &str) -> Result<()>;

    /// All records not yet downloaded, oldest discovery first.
    ///
    /// An unreadable store yields an empty list.
    fn list_pending(&self) -> Vec<ArtifactRecord>;

    fn is_downloaded(&self, id: &ArtifactId) -> bool {
        self.exists(id).is_some_and(|record| record.downloaded)
    }

    fn flush(&self) -> Result<()>;

    /// Drop every record. Administrative only; returns the number removed.
    fn reset(&self) -> Result<usize>;
}

impl<T: Ledger + ?Sized> Ledger for &T {
    fn upsert_new(&self, id: &ArtifactId, url: &str) -> Result<Upsert> { (**self).upsert_new(id, url) }

    fn exists(&self, id: &ArtifactId) -> Option<ArtifactRecord> { (**self).exists(id) }

    fn mark_downloaded(&self, id: &ArtifactId, url: &str) -> Result<()> {
        (**self).mark_downloaded(id, url)
    }

    fn list_pending(&self) -> Vec<ArtifactRecord> { (**self).list_pending() }

    fn flush(&self) -> Result<()> { (**self).flush() }

    fn reset(&self) -> Result<usize> { (**self).reset() }
}

impl<T: Ledger + ?Sized> Ledger for Arc<T> {
    fn upsert_new(&self, id: &ArtifactId, url: &str) -> Result<Upsert> { (**self).upsert_new(id, url) }

    fn exists(&self, id: &ArtifactId) -> Option<ArtifactRecord> { (**self).exists(id) }

    fn mark_downloaded(&self, id: &ArtifactId, url: &str) -> Result<()> {
        (**self).mark_downloaded(id, url)
    }

    fn list_pending(&self) -> Vec<ArtifactRecord> { (**self).list_pending() }

    fn flush(&self) -> Result<()> { (**self).flush() }

    fn reset(&self) -> Result<usize> { (**self).reset() }
}

/// [`Ledger`] backed by an embedded sled database.
///
/// Records live in their own tree keyed by artifact id and are encoded with
/// postcard. Per-record atomicity comes from compare-and-swap.
pub struct SledLedger {
    db:   sled::Db,
    tree: sled::Tree,
}

impl SledLedger {
    const TREE: &str = "artifacts";

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let db = sled::open(path).map_err(|source| LedgerError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_db(db, path)
    }

    /// A throwaway ledger removed when dropped.
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .map_err(|source| LedgerError::Open {
                path: "<temporary>".into(),
                source,
            })?;
        Self::from_db(db, Path::new("<temporary>"))
    }

    fn from_db(db: sled::Db, path: &Path) -> Result<Self> {
        let tree = db.open_tree(Self::TREE).map_err(|source| LedgerError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self { db, tree })
    }

    pub fn len(&self) -> usize { self.tree.len() }

    pub fn is_empty(&self) -> bool { self.tree.is_empty() }

    fn encode(record: &ArtifactRecord) -> std::result::Result<Vec<u8>, StoreError> {
        Ok(postcard::to_stdvec(record)?)
    }

    fn decode(bytes: &[u8]) -> std::result::Result<ArtifactRecord, StoreError> {
        Ok(postcard::from_bytes(bytes)?)
    }

    fn try_get(&self, id: &ArtifactId) -> std::result::Result<Option<ArtifactRecord>, StoreError> {
        self.tree
            .get(id.as_key())?
            .map(|bytes| Self::decode(&bytes))
            .transpose()
    }

    fn try_pending(&self) -> std::result::Result<Vec<ArtifactRecord>, StoreError> {
        let mut pending = Vec::new();
        for entry in self.tree.iter() {
            let (key, value) = entry?;
            match Self::decode(&value) {
                Ok(record) if !record.downloaded => pending.push(record),
                Ok(_) => {}
                Err(e) => warn!(
                    key = %String::from_utf8_lossy(&key),
                    error = %e,
                    "skipping undecodable ledger record"
                ),
            }
        }
        pending.sort_by(|a, b| {
            a.index_datetime
                .cmp(&b.index_datetime)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(pending)
    }
}

impl Ledger for SledLedger {
    fn upsert_new(&self, id: &ArtifactId, url: &str) -> Result<Upsert> {
        let record = ArtifactRecord::discovered(id.clone(), url, Utc::now());
        let bytes = Self::encode(&record).map_err(|e| LedgerError::write(id.as_str(), e))?;
        let swapped = self
            .tree
            .compare_and_swap(id.as_key(), None::<&[u8]>, Some(bytes))
            .map_err(|e| LedgerError::write(id.as_str(), e))?;

        match swapped {
            Ok(()) => {
                debug!(%id, url, "indexed new artifact");
                Ok(Upsert::Created)
            }
            Err(_) => Ok(Upsert::Existing),
        }
    }

    fn exists(&self, id: &ArtifactId) -> Option<ArtifactRecord> {
        match self.try_get(id) {
            Ok(record) => record,
            Err(e) => {
                warn!(%id, error = %e, "ledger lookup failed, treating as absent");
                None
            }
        }
    }

    fn mark_downloaded(&self, id: &ArtifactId, url: &str) -> Result<()> {
        let write_err = |e: StoreError| LedgerError::write(id.as_str(), e);

        loop {
            let current = self.tree.get(id.as_key()).map_err(|e| write_err(e.into()))?;
            let now = Utc::now();
            let record = match &current {
                Some(bytes) => Self::decode(bytes).map_err(write_err)?,
                None => ArtifactRecord::discovered(id.clone(), url, now),
            }
            .downloaded_at(now);
            let bytes = Self::encode(&record).map_err(write_err)?;

            let swapped = self
                .tree
                .compare_and_swap(id.as_key(), current, Some(bytes))
                .map_err(|e| write_err(e.into()))?;
            if swapped.is_ok() {
                break;
            }
            debug!(%id, "concurrent ledger update, retrying mark");
        }

        self.tree.flush().map_err(|e| write_err(e.into()))?;
        debug!(%id, "marked downloaded");
        Ok(())
    }

    fn list_pending(&self) -> Vec<ArtifactRecord> {
        self.try_pending().unwrap_or_else(|e| {
            warn!(error = %e, "ledger scan failed, reporting nothing pending");
            Vec::new()
        })
    }

    fn flush(&self) -> Result<()> {
        self.db
            .flush()
            .map(|_| ())
            .map_err(|e| LedgerError::write("<flush>", e))
    }

    fn reset(&self) -> Result<usize> {
        let removed = self.tree.len();
        self.tree
            .clear()
            .map_err(|e| LedgerError::write("<reset>", e))?;
        self.flush()?;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(name: &str) -> ArtifactId { ArtifactId::from(name) }

    #[test]
    fn test_upsert_new_creates_pending_record() {
        let ledger = SledLedger::temporary().unwrap();
        let outcome = ledger.upsert_new(&id("a.tif"), "https://h/a.tif").unwrap();
        assert_eq!(outcome, Upsert::Created);

        let record = ledger.exists(&id("a.tif")).unwrap();
        assert_eq!(record.url, "https://h/a.tif");
        assert!(!record.downloaded);
        assert!(record.download_datetime.is_none());
    }

    #[test]
    fn test_upsert_new_leaves_existing_record_untouched() {
        let ledger = SledLedger::temporary().unwrap();
        ledger.upsert_new(&id("a.tif"), "https://h/a.tif").unwrap();
        ledger.mark_downloaded(&id("a.tif"), "https://h/a.tif").unwrap();

        let outcome = ledger.upsert_new(&id("a.tif"), "s3://b/a.tif").unwrap();
        assert_eq!(outcome, Upsert::Existing);

        let record = ledger.exists(&id("a.tif")).unwrap();
        assert!(record.downloaded);
        assert_eq!(record.url, "https://h/a.tif");
    }

    #[test]
    fn test_exists_absent_is_none() {
        let ledger = SledLedger::temporary().unwrap();
        assert!(ledger.exists(&id("missing.tif")).is_none());
        assert!(!ledger.is_downloaded(&id("missing.tif")));
    }

    #[test]
    fn test_mark_downloaded_creates_missing_record() {
        let ledger = SledLedger::temporary().unwrap();
        ledger.mark_downloaded(&id("b.tif"), "s3://bucket/b.tif").unwrap();

        let record = ledger.exists(&id("b.tif")).unwrap();
        assert!(record.downloaded);
        assert_eq!(record.url, "s3://bucket/b.tif");
        assert!(record.download_datetime.is_some());
    }

    #[test]
    fn test_mark_downloaded_twice_keeps_later_timestamp() {
        let ledger = SledLedger::temporary().unwrap();
        ledger.upsert_new(&id("c.tif"), "https://h/c.tif").unwrap();
        ledger.mark_downloaded(&id("c.tif"), "https://h/c.tif").unwrap();
        let first = ledger.exists(&id("c.tif")).unwrap();

        ledger.mark_downloaded(&id("c.tif"), "https://h/c.tif").unwrap();
        let second = ledger.exists(&id("c.tif")).unwrap();

        assert!(second.downloaded);
        assert_eq!(first.index_datetime, second.index_datetime);
        assert!(second.download_datetime >= first.download_datetime);
    }

    #[test]
    fn test_undecodable_record_reads_as_absent() {
        let ledger = SledLedger::temporary().unwrap();
        ledger.tree.insert(b"broken.tif", &[0xff, 0xff, 0xff][..]).unwrap();
        ledger.upsert_new(&id("ok.tif"), "https://h/ok.tif").unwrap();

        assert!(ledger.exists(&id("broken.tif")).is_none());
        let pending = ledger.list_pending();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, id("ok.tif"));
    }

    #[test]
    fn test_mark_downloaded_over_undecodable_record_is_write_error() {
        let ledger = SledLedger::temporary().unwrap();
        ledger.tree.insert(b"broken.tif", &[0xff][..]).unwrap();

        let err = ledger
            .mark_downloaded(&id("broken.tif"), "https://h/broken.tif")
            .unwrap_err();
        assert!(err.is_write());
    }

    #[test]
    fn test_reset_removes_everything() {
        let ledger = SledLedger::temporary().unwrap();
        ledger.upsert_new(&id("a.tif"), "https://h/a.tif").unwrap();
        ledger.upsert_new(&id("b.tif"), "https://h/b.tif").unwrap();

        assert_eq!(ledger.reset().unwrap(), 2);
        assert!(ledger.is_empty());
        assert!(ledger.list_pending().is_empty());
    }
}
