use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use futures_util::stream;
use granary::Error;
use granary::run::{QueryPlan, Selection, download_pass, query_pass};
use granary_batch::{BatchParams, JobRequest, JobSpec, JobSubmitter, PartitionError, SubmitError, TileExtractor};
use granary_catalog::{
    Catalog, CatalogError, CatalogPage, ExtensionList, Protocol, QueryRequest, TimeWindow, UrlFilter,
};
use granary_fetch::{
    ChunkPool, Destination, HttpBody, HttpClient, SourceStores, StagingArea, TransferEngine, TransferError,
    TransferOptions,
};
use granary_ledger::{ArtifactId, Ledger, SledLedger};
use object_store::ObjectStore;
use object_store::memory::InMemory;
use tempfile::tempdir;

fn granule(tile: &str, band: &str) -> String {
    format!("s3://lp-prod-protected/HLSS30.020/HLS.S30.{tile}.2021248T143156.v2.0.{band}.tif")
}

/// Serves pre-built pages, following the cursor by page index.
struct PagedCatalog {
    pages: Vec<Vec<String>>,
}

impl PagedCatalog {
    fn single(urls: Vec<String>) -> Self { Self { pages: vec![urls] } }
}

impl Catalog for PagedCatalog {
    async fn page(&self, _request: &QueryRequest, cursor: Option<&str>) -> Result<CatalogPage, CatalogError> {
        let index: usize = cursor.map_or(0, |c| c.parse().unwrap());
        let urls = self.pages.get(index).cloned().unwrap_or_default();
        let next = (index + 1 < self.pages.len()).then(|| (index + 1).to_string());
        Ok(CatalogPage { urls, next })
    }
}

#[derive(Default)]
struct RecordingQueue {
    requests: Mutex<Vec<JobRequest>>,
}

impl JobSubmitter for RecordingQueue {
    async fn submit(&self, request: &JobRequest) -> Result<String, SubmitError> {
        let mut requests = self.requests.lock().unwrap();
        requests.push(request.clone());
        Ok(format!("job-{}", requests.len()))
    }
}

impl RecordingQueue {
    fn tile_ids(&self) -> Vec<String> {
        let mut tiles: Vec<String> = self
            .requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| {
                let params: serde_json::Value = serde_json::from_str(&r.params).unwrap();
                params["tile_ids"].as_str().unwrap().to_string()
            })
            .collect();
        tiles.sort();
        tiles
    }
}

fn plan() -> QueryPlan {
    QueryPlan {
        request:     QueryRequest::new("HLSS30", TimeWindow::LookBack { minutes: 60 }),
        filter:      UrlFilter::new(Protocol::S3, ExtensionList::Tif),
        extractor:   TileExtractor::default(),
        chunk_size:  2,
        concurrency: 2,
        smoke:       false,
        dry_run:     false,
        job:         JobSpec::default(),
        params:      BatchParams {
            bucket_name: "isl-bucket".into(),
            ..BatchParams::default()
        },
    }
}

#[tokio::test]
async fn test_query_pass_indexes_and_submits_batches() {
    let catalog = PagedCatalog {
        pages: vec![
            vec![granule("T01AAA", "B02"), granule("T02BBB", "B02")],
            vec![granule("T01AAA", "B03"), granule("T03CCC", "B02"), "https://x/HLS.S30.T03CCC.B04.tif".into()],
        ],
    };
    let ledger = SledLedger::temporary().unwrap();
    let queue = Arc::new(RecordingQueue::default());

    let report = query_pass(&catalog, &ledger, Arc::clone(&queue), &plan()).await.unwrap();

    assert_eq!(report.discovered, 4);
    assert_eq!(report.tiles, 3);
    assert_eq!(report.reconciled.created, 4);
    assert_eq!(report.batches, 2);
    assert_eq!(report.submission.succeeded.len(), 2);
    assert_eq!(ledger.list_pending().len(), 4);
    assert_eq!(queue.tile_ids(), ["T01AAA T02BBB", "T03CCC"]);
}

#[tokio::test]
async fn test_missing_tile_id_aborts_before_ledger_writes() {
    let catalog = PagedCatalog::single(vec![
        granule("T01AAA", "B02"),
        "s3://lp-prod-protected/HLSS30.020/browse.tif".into(),
    ]);
    let ledger = SledLedger::temporary().unwrap();
    let queue = Arc::new(RecordingQueue::default());

    let err = query_pass(&catalog, &ledger, Arc::clone(&queue), &plan()).await.unwrap_err();

    assert!(matches!(err, Error::Partition(PartitionError::TileId { .. })));
    assert!(ledger.is_empty());
    assert!(queue.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_smoke_query_indexes_everything_submits_one_tile() {
    let catalog = PagedCatalog::single(vec![
        granule("T01AAA", "B02"),
        granule("T02BBB", "B02"),
        granule("T01AAA", "B03"),
    ]);
    let ledger = SledLedger::temporary().unwrap();
    let queue = Arc::new(RecordingQueue::default());
    let plan = QueryPlan {
        smoke: true,
        ..plan()
    };

    let report = query_pass(&catalog, &ledger, Arc::clone(&queue), &plan).await.unwrap();

    assert_eq!(report.reconciled.created, 3);
    assert_eq!(report.batches, 1);
    assert_eq!(queue.tile_ids(), ["T01AAA"]);
}

#[tokio::test]
async fn test_dry_run_query_indexes_without_submitting() {
    let catalog = PagedCatalog::single(vec![granule("T01AAA", "B02")]);
    let ledger = SledLedger::temporary().unwrap();
    let queue = Arc::new(RecordingQueue::default());
    let plan = QueryPlan {
        dry_run: true,
        ..plan()
    };

    let report = query_pass(&catalog, &ledger, Arc::clone(&queue), &plan).await.unwrap();

    assert_eq!(report.reconciled.created, 1);
    assert_eq!(report.batches, 1);
    assert_eq!(report.submission.total(), 0);
    assert!(queue.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_requery_finds_existing_records() {
    let urls = vec![granule("T01AAA", "B02"), granule("T01AAA", "B03")];
    let ledger = SledLedger::temporary().unwrap();
    let queue = Arc::new(RecordingQueue::default());

    query_pass(&PagedCatalog::single(urls.clone()), &ledger, Arc::clone(&queue), &plan()).await.unwrap();
    let report = query_pass(&PagedCatalog::single(urls), &ledger, Arc::clone(&queue), &plan()).await.unwrap();

    assert_eq!(report.reconciled.created, 0);
    assert_eq!(report.reconciled.existing, 2);
    assert_eq!(ledger.len(), 2);
}

#[tokio::test]
async fn test_empty_catalog_is_a_quiet_success() {
    let ledger = SledLedger::temporary().unwrap();
    let queue = Arc::new(RecordingQueue::default());

    let report = query_pass(&PagedCatalog::single(Vec::new()), &ledger, queue, &plan()).await.unwrap();

    assert_eq!(report.discovered, 0);
    assert!(ledger.is_empty());
}

#[derive(Default)]
struct StaticHttp {
    bodies: HashMap<String, &'static [u8]>,
    calls:  AtomicUsize,
}

impl HttpClient for StaticHttp {
    async fn get(&self, url: &str, _headers: &[(String, String)]) -> granary_fetch::Result<HttpBody> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let body = *self.bodies.get(url).ok_or_else(|| TransferError::Status {
            status: 404,
            url:    url.to_string(),
        })?;
        Ok(HttpBody {
            content_length: Some(body.len() as u64),
            stream:         Box::pin(stream::iter(vec![Ok(Bytes::from_static(body))])),
        })
    }
}

struct NoSources;

impl SourceStores for NoSources {
    async fn store(&self, bucket: &str) -> granary_fetch::Result<Arc<dyn ObjectStore>> {
        Err(TransferError::Credentials(format!("no access to {bucket}")))
    }
}

fn https(tile: &str, band: &str) -> String {
    format!("https://data.example/lp-prod-protected/HLS.S30.{tile}.2021248T143156.v2.0.{band}.tif")
}

#[tokio::test]
async fn test_download_pass_filters_by_tile() {
    let root = tempdir().unwrap();
    let ledger = SledLedger::temporary().unwrap();
    let wanted = [https("T22VEQ", "B02"), https("T22VEQ", "B03")];
    let other = https("T15SXR", "B02");
    for url in wanted.iter().chain([&other]) {
        ledger.upsert_new(&ArtifactId::from_url(url).unwrap(), url).unwrap();
    }
    let http = StaticHttp {
        bodies: wanted.iter().map(|u| (u.clone(), &b"payload"[..])).collect(),
        ..StaticHttp::default()
    };
    let destination = Arc::new(InMemory::new());
    let engine = TransferEngine::new(
        &ledger,
        http,
        NoSources,
        Destination::new(destination.clone(), None),
        StagingArea::new(root.path()).unwrap(),
    )
    .with_pool(ChunkPool::new(2));
    let selection = Selection {
        tile_ids: vec!["T22VEQ".into()],
        ..Selection::default()
    };

    let summary = download_pass(&engine, &TileExtractor::default(), &selection).await;

    assert_eq!(summary.downloaded, 2);
    assert_eq!(summary.total(), 2);
    let pending: Vec<String> = ledger.list_pending().into_iter().map(|r| r.url).collect();
    assert_eq!(pending, [other]);
    engine.finish().unwrap();
}

#[tokio::test]
async fn test_dry_run_download_with_three_pending() {
    let root = tempdir().unwrap();
    let ledger = SledLedger::temporary().unwrap();
    for band in ["B02", "B03", "B04"] {
        let url = https("T22VEQ", band);
        ledger.upsert_new(&ArtifactId::from_url(&url).unwrap(), &url).unwrap();
    }
    let engine = TransferEngine::new(
        &ledger,
        StaticHttp::default(),
        NoSources,
        Destination::new(Arc::new(InMemory::new()), None),
        StagingArea::new(root.path()).unwrap(),
    )
    .with_options(TransferOptions::default().dry_run(true));

    let summary = download_pass(&engine, &TileExtractor::default(), &Selection::default()).await;

    assert_eq!(summary.skipped, 3);
    assert_eq!(summary.total(), 3);
    assert_eq!(engine.http().calls.load(Ordering::SeqCst), 0);
    assert_eq!(ledger.list_pending().len(), 3);
}
