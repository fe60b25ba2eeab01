use std::path::{Path, PathBuf};

use bytes::Bytes;
use futures_util::StreamExt;
use object_store::ObjectStore;
use object_store::path::Path as ObjectPath;
use tempfile::TempDir;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;

use super::http::BoxStream;
use crate::error::{Result, TransferError};

/// Per-run scratch directory for bulk copies.
///
/// The directory is created under a caller-chosen parent and removed,
/// with anything left inside, when the area is dropped or finished.
#[derive(Debug)]
pub struct StagingArea {
    dir: TempDir,
}

impl StagingArea {
    pub fn new(parent: impl AsRef<Path>) -> Result<Self> {
        let parent = parent.as_ref();
        std::fs::create_dir_all(parent)?;
        let dir = tempfile::Builder::new().prefix("granary-staging-").tempdir_in(parent)?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path { self.dir.path() }

    /// Copy `key` from `source` into the area as `file_name`.
    ///
    /// A partially written file is removed if the copy fails.
    pub async fn stage(&self, source: &dyn ObjectStore, key: &ObjectPath, file_name: &str) -> Result<StagedFile> {
        let mut staged = StagedFile {
            path:  self.dir.path().join(file_name),
            bytes: 0,
        };
        let mut file = tokio::fs::File::create(&staged.path).await?;
        let mut stream = source.get(key).await?.into_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            staged.bytes += chunk.len() as u64;
        }
        file.flush().await?;
        Ok(staged)
    }

    /// Remove the directory now, reporting any failure.
    pub fn finish(self) -> Result<()> {
        self.dir.close()?;
        Ok(())
    }
}

/// A file inside a [`StagingArea`], deleted when dropped.
#[derive(Debug)]
pub struct StagedFile {
    path:  PathBuf,
    bytes: u64,
}

impl StagedFile {
    pub fn path(&self) -> &Path { &self.path }

    pub fn len(&self) -> u64 { self.bytes }

    pub fn is_empty(&self) -> bool { self.bytes == 0 }

    /// Read the staged bytes back as a stream.
    pub async fn stream(&self) -> Result<BoxStream<'static, Result<Bytes>>> {
        let file = tokio::fs::File::open(&self.path).await?;
        Ok(Box::pin(ReaderStream::new(file).map(|chunk| chunk.map_err(TransferError::from))))
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if self.path.exists() {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}
