use std::time::Instant;

use chrono::Utc;
use granary_ledger::{ArtifactId, Ledger};
use object_store::path::Path as ObjectPath;
use tracing::{debug, error, info};

use crate::core::{Transport, split_s3_url};
use crate::data::{RunSummary, SkipReason, TransferOptions, TransferOutcome, TransferStats};
use crate::effects::{ChunkPool, Destination, HttpClient, SourceStores, StagingArea, upload_stream};
use crate::error::{Result, TransferError};

/// Moves pending artifacts into the destination and records the result.
///
/// Each artifact ends in exactly one of downloaded, skipped or failed. A
/// failure is logged and counted; it never stops the rest of the run.
pub struct TransferEngine<L, C, S> {
    ledger:      L,
    http:        C,
    sources:     S,
    destination: Destination,
    staging:     StagingArea,
    pool:        ChunkPool,
    options:     TransferOptions,
}

impl<L, C, S> TransferEngine<L, C, S>
where
    L: Ledger,
    C: HttpClient,
    S: SourceStores,
{
    pub fn new(ledger: L, http: C, sources: S, destination: Destination, staging: StagingArea) -> Self {
        Self {
            ledger,
            http,
            sources,
            destination,
            staging,
            pool: ChunkPool::default(),
            options: TransferOptions::default(),
        }
    }

    #[must_use]
    pub fn with_pool(mut self, pool: ChunkPool) -> Self {
        self.pool = pool;
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: TransferOptions) -> Self {
        self.options = options;
        self
    }

    pub fn ledger(&self) -> &L { &self.ledger }

    pub fn http(&self) -> &C { &self.http }

    pub fn staging(&self) -> &StagingArea { &self.staging }

    pub fn pool(&self) -> &ChunkPool { &self.pool }

    /// Transfer every URL in order and summarise.
    ///
    /// URLs on a scheme other than `https` or `s3` are left out entirely
    /// and do not appear in the summary.
    pub async fn run<I, U>(&self, urls: I) -> RunSummary
    where
        I: IntoIterator<Item = U>,
        U: AsRef<str>,
    {
        let mut summary = RunSummary::default();
        for url in urls {
            let url = url.as_ref();
            let Some(transport) = Transport::classify(url) else {
                debug!(url, "unsupported scheme, not a transfer candidate");
                continue;
            };
            let outcome = self.transfer(url, transport).await;
            summary.record(&outcome);
        }

        info!(
            downloaded = summary.downloaded,
            skipped = summary.skipped,
            failed = summary.failed,
            dry_run = self.options.dry_run,
            "transfer run finished"
        );
        summary
    }

    /// Drive one artifact to its terminal state.
    pub async fn transfer(&self, url: &str, transport: Transport) -> TransferOutcome {
        let id = match ArtifactId::from_url(url) {
            Ok(id) => id,
            Err(e) => {
                error!(url, error = %e, "cannot derive artifact id");
                return TransferOutcome::Failed(e.into());
            }
        };

        if self.ledger.is_downloaded(&id) {
            info!(id = %id, "already downloaded, skipping");
            return TransferOutcome::Skipped(SkipReason::AlreadyDownloaded);
        }
        if self.options.dry_run {
            info!(id = %id, url, "dry run, skipping");
            return TransferOutcome::Skipped(SkipReason::DryRun);
        }

        let fetched = match tokio::time::timeout(self.options.timeout, self.fetch(&id, url, transport)).await {
            Ok(result) => result,
            Err(_) => Err(TransferError::Timeout(self.options.timeout)),
        };
        let recorded = fetched.and_then(|stats| {
            self.ledger.mark_downloaded(&id, url)?;
            Ok(stats)
        });

        match recorded {
            Ok(stats) => {
                info!(
                    id = %id,
                    key = %stats.key,
                    bytes = stats.bytes,
                    started_at = %stats.started_at,
                    ended_at = %stats.ended_at,
                    duration_ms = stats.duration.as_millis() as u64,
                    rate_bps = stats.rate_bps(),
                    "transfer complete"
                );
                TransferOutcome::Downloaded(stats)
            }
            Err(e) => {
                error!(id = %id, url, transport = %transport, error = %e, "transfer failed");
                TransferOutcome::Failed(e)
            }
        }
    }

    async fn fetch(&self, id: &ArtifactId, url: &str, transport: Transport) -> Result<TransferStats> {
        let started_at = Utc::now();
        let clock = Instant::now();
        let key = self.destination.key(id.as_str());

        let bytes = match transport {
            Transport::Https => self.stream_https(url, &key).await?,
            Transport::S3 => self.copy_s3(id, url, &key).await?,
        };

        Ok(TransferStats {
            file_name: id.to_string(),
            key: key.to_string(),
            bytes,
            started_at,
            ended_at: Utc::now(),
            duration: clock.elapsed(),
        })
    }

    async fn stream_https(&self, url: &str, key: &ObjectPath) -> Result<u64> {
        let body = self.http.get(url, &self.options.headers).await?;
        debug!(url, content_length = ?body.content_length, "streaming body");
        upload_stream(self.destination.store(), key, body.stream, self.options.chunk_size, &self.pool).await
    }

    async fn copy_s3(&self, id: &ArtifactId, url: &str, key: &ObjectPath) -> Result<u64> {
        let (bucket, source_key) = split_s3_url(url).ok_or_else(|| TransferError::InvalidUrl(url.to_string()))?;
        let source = self.sources.store(bucket).await?;

        let staged = self
            .staging
            .stage(source.as_ref(), &ObjectPath::from(source_key), id.as_str())
            .await?;
        debug!(id = %id, bytes = staged.len(), path = %staged.path().display(), "staged source object");

        let stream = staged.stream().await?;
        upload_stream(self.destination.store(), key, stream, self.options.chunk_size, &self.pool).await
    }

    /// Remove the staging area, reporting any failure to do so.
    pub fn finish(self) -> Result<()> { self.staging.finish() }
}
