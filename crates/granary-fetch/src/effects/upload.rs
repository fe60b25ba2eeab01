use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use futures_util::{Stream, StreamExt};
use object_store::path::Path as ObjectPath;
use object_store::{MultipartUpload, ObjectStore, PutPayload};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, warn};

use crate::error::{Result, TransferError};

/// Bounded pool for in-flight upload parts.
///
/// One pool lives as long as the engine and is shared by every artifact, so
/// the number of buffered parts in memory never exceeds its size.
#[derive(Debug, Clone)]
pub struct ChunkPool {
    permits: Arc<Semaphore>,
    size:    usize,
}

impl Default for ChunkPool {
    fn default() -> Self { Self::new(Self::DEFAULT_SIZE) }
}

impl ChunkPool {
    pub const DEFAULT_SIZE: usize = 4;

    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            permits: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    pub fn size(&self) -> usize { self.size }

    pub fn available(&self) -> usize { self.permits.available_permits() }

    async fn acquire(&self) -> Result<OwnedSemaphorePermit> {
        Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|e| TransferError::Task(e.to_string()))
    }
}

/// Write `stream` to `key` as a multipart upload of `chunk_size` parts.
///
/// Parts are uploaded concurrently on `pool`; the upload is completed only
/// after every part has finished, and aborted if any part, the source
/// stream, or the completion fails. Returns the number of bytes written.
pub async fn upload_stream<S>(
    store: &dyn ObjectStore,
    key: &ObjectPath,
    stream: S,
    chunk_size: usize,
    pool: &ChunkPool,
) -> Result<u64>
where
    S: Stream<Item = Result<Bytes>> + Send,
{
    let mut upload = store.put_multipart(key).await?;
    let mut parts = JoinSet::new();

    let result = async {
        let bytes = write_parts(upload.as_mut(), &mut parts, stream, chunk_size.max(1), pool).await?;
        upload.complete().await?;
        Ok::<u64, TransferError>(bytes)
    }
    .await;

    if result.is_err() {
        parts.abort_all();
        if let Err(e) = upload.abort().await {
            warn!(key = %key, error = %e, "failed to abort multipart upload");
        }
    }
    result
}

async fn write_parts<S>(
    upload: &mut dyn MultipartUpload,
    parts: &mut JoinSet<Result<()>>,
    stream: S,
    chunk_size: usize,
    pool: &ChunkPool,
) -> Result<u64>
where
    S: Stream<Item = Result<Bytes>> + Send,
{
    let mut stream = std::pin::pin!(stream);
    let mut buffer = BytesMut::with_capacity(chunk_size);
    let mut total = 0u64;
    let mut queued = 0usize;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        total += chunk.len() as u64;
        buffer.extend_from_slice(&chunk);

        while buffer.len() >= chunk_size {
            queue_part(upload, parts, buffer.split_to(chunk_size).freeze(), pool).await?;
            queued += 1;
        }
        while let Some(done) = parts.try_join_next() {
            flatten(done)?;
        }
    }

    // An empty body still becomes one (empty) part.
    if !buffer.is_empty() || queued == 0 {
        queue_part(upload, parts, buffer.freeze(), pool).await?;
        queued += 1;
    }
    while let Some(done) = parts.join_next().await {
        flatten(done)?;
    }

    debug!(parts = queued, bytes = total, "all parts uploaded");
    Ok(total)
}

async fn queue_part(
    upload: &mut dyn MultipartUpload,
    parts: &mut JoinSet<Result<()>>,
    part: Bytes,
    pool: &ChunkPool,
) -> Result<()> {
    let permit = pool.acquire().await?;
    let pending = upload.put_part(PutPayload::from(part));
    parts.spawn(async move {
        let _permit = permit;
        pending.await.map_err(TransferError::from)
    });
    Ok(())
}

fn flatten(joined: std::result::Result<Result<()>, JoinError>) -> Result<()> {
    joined.map_err(|e| TransferError::Task(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use futures_util::stream;
    use object_store::memory::InMemory;

    use super::*;

    fn chunks(data: &[u8], size: usize) -> Vec<Result<Bytes>> {
        data.chunks(size).map(|c| Ok(Bytes::copy_from_slice(c))).collect()
    }

    async fn read(store: &InMemory, key: &ObjectPath) -> Bytes { store.get(key).await.unwrap().bytes().await.unwrap() }

    #[tokio::test]
    async fn test_upload_reassembles_parts_in_order() {
        let store = InMemory::new();
        let key = ObjectPath::from("out/a.tif");
        let data: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
        let pool = ChunkPool::new(2);

        let written = upload_stream(&store, &key, stream::iter(chunks(&data, 37)), 64, &pool)
            .await
            .unwrap();

        assert_eq!(written, 1000);
        assert_eq!(read(&store, &key).await.as_ref(), data.as_slice());
        assert_eq!(pool.available(), 2);
    }

    #[tokio::test]
    async fn test_empty_body_creates_empty_object() {
        let store = InMemory::new();
        let key = ObjectPath::from("empty.tif");

        let written = upload_stream(&store, &key, stream::iter(Vec::new()), 8, &ChunkPool::default())
            .await
            .unwrap();

        assert_eq!(written, 0);
        assert!(read(&store, &key).await.is_empty());
    }

    #[tokio::test]
    async fn test_stream_error_aborts_upload() {
        let store = InMemory::new();
        let key = ObjectPath::from("broken.tif");
        let body = vec![
            Ok(Bytes::from_static(b"0123456789")),
            Err(TransferError::Status {
                status: 500,
                url:    "https://h/broken.tif".into(),
            }),
        ];
        let pool = ChunkPool::new(1);

        let err = upload_stream(&store, &key, stream::iter(body), 4, &pool).await.unwrap_err();

        assert!(matches!(err, TransferError::Status { status: 500, .. }));
        assert!(store.head(&key).await.is_err());
    }

    #[test]
    fn test_pool_size_floor() {
        assert_eq!(ChunkPool::new(0).size(), 1);
        assert_eq!(ChunkPool::default().size(), ChunkPool::DEFAULT_SIZE);
    }
}
