use std::sync::Arc;

use granary_batch::{
    BatchParams, JobSpec, JobSubmitter, SubmissionReport, TileExtractor, group_by_tile, partition, submit_all,
};
use granary_catalog::{Catalog, Protocol, QueryRequest, UrlFilter, query_all};
use granary_fetch::{HttpClient, RunSummary, SourceStores, TransferEngine};
use granary_ledger::{ArtifactRecord, Ledger, ReconcileReport, reconcile};
use tracing::{debug, info, warn};

use crate::error::Result;

/// Everything the query pass needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct QueryPlan {
    pub request:     QueryRequest,
    pub filter:      UrlFilter,
    pub extractor:   TileExtractor,
    pub chunk_size:  usize,
    pub concurrency: usize,
    pub smoke:       bool,
    /// Index only; submit nothing.
    pub dry_run:     bool,
    pub job:         JobSpec,
    pub params:      BatchParams,
}

#[derive(Debug, Default)]
pub struct QueryReport {
    pub discovered: usize,
    pub tiles:      usize,
    pub reconciled: ReconcileReport,
    pub batches:    usize,
    pub submission: SubmissionReport,
}

/// Search, index and submit.
///
/// Every discovered file is grouped by tile before the ledger is touched,
/// so a file without a recognisable tile id fails the pass with nothing
/// written. Smoke runs index everything but submit only the first tile.
pub async fn query_pass<C, L, S>(catalog: &C, ledger: &L, submitter: Arc<S>, plan: &QueryPlan) -> Result<QueryReport>
where
    C: Catalog,
    L: Ledger,
    S: JobSubmitter + 'static,
{
    let urls = query_all(catalog, &plan.request, &plan.filter).await?;
    let mut report = QueryReport {
        discovered: urls.len(),
        ..QueryReport::default()
    };
    if urls.is_empty() {
        info!("no new granules found");
        return Ok(report);
    }

    let mut groups = group_by_tile(&plan.extractor, &urls)?;
    report.tiles = groups.len();
    report.reconciled = reconcile(ledger, &urls)?;

    if plan.smoke {
        info!("smoke run, restricting to a single tile");
        groups = groups.smoke();
    }
    let batches = partition(groups, plan.chunk_size)?;
    report.batches = batches.len();
    for batch in &batches {
        debug!(batch_id = %batch.id, tiles = ?batch.tile_ids, urls = batch.urls.len(), "built batch");
    }

    if plan.dry_run {
        info!(batches = batches.len(), "dry run, not submitting");
        return Ok(report);
    }
    report.submission = submit_all(submitter, &plan.job, &batches, &plan.params, plan.concurrency).await;
    info!(
        submitted = report.submission.succeeded.len(),
        failed = report.submission.failed.len(),
        "job submission finished"
    );
    Ok(report)
}

/// Which pending artifacts a download pass takes.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    /// Keep only these tiles; everything when empty.
    pub tile_ids: Vec<String>,
    /// Keep only URLs of this scheme.
    pub protocol: Option<Protocol>,
    /// Restrict to a single tile.
    pub smoke:    bool,
}

impl Selection {
    /// Narrow `pending` to the URLs to transfer, keeping ledger order.
    ///
    /// A smoke run keeps the first requested tile, or the tile of the first
    /// pending artifact when none was requested; when no pending artifact
    /// has a readable tile, it selects nothing. With a tile filter in force,
    /// artifacts whose tile can not be read are left out.
    pub fn apply(&self, extractor: &TileExtractor, pending: Vec<ArtifactRecord>) -> Vec<String> {
        let pending: Vec<ArtifactRecord> = pending
            .into_iter()
            .filter(|record| self.protocol.is_none_or(|p| p.matches(&record.url)))
            .collect();

        let mut tiles = self.tile_ids.clone();
        if self.smoke {
            if tiles.is_empty() {
                tiles.extend(pending.iter().find_map(|record| extractor.extract(&record.url).ok()));
            }
            tiles.truncate(1);
            if tiles.is_empty() {
                warn!("smoke run found no pending artifact with a tile id, nothing selected");
                return Vec::new();
            }
            info!(tiles = ?tiles, "smoke run, restricting to a single tile");
        }
        if tiles.is_empty() {
            return pending.into_iter().map(|record| record.url).collect();
        }

        pending
            .into_iter()
            .filter(|record| match extractor.extract(&record.url) {
                Ok(tile) => tiles.contains(&tile),
                Err(e) => {
                    warn!(url = %record.url, error = %e, "no tile id, leaving out of the run");
                    false
                }
            })
            .map(|record| record.url)
            .collect()
    }
}

/// Transfer the selected pending artifacts.
pub async fn download_pass<L, C, S>(
    engine: &TransferEngine<L, C, S>,
    extractor: &TileExtractor,
    selection: &Selection,
) -> RunSummary
where
    L: Ledger,
    C: HttpClient,
    S: SourceStores,
{
    let pending = engine.ledger().list_pending();
    info!(pending = pending.len(), "loaded pending artifacts");
    if pending.is_empty() {
        return RunSummary::default();
    }

    let urls = selection.apply(extractor, pending);
    info!(selected = urls.len(), "selected artifacts for transfer");
    engine.run(&urls).await
}
