use std::sync::Arc;

use granary_auth::{CmrTokenProvider, Credentials, Netrc, with_token};
use granary_batch::{BatchParams, HttpJobSubmitter, TileExtractor};
use granary_catalog::{
    BoundingBox, CmrCatalog, ExtensionList, Protocol, QueryRequest, TimeWindow, UrlFilter, format_timestamp,
    parse_end_date, parse_minutes, parse_start_date,
};
use granary_fetch::{
    ChunkPool, Destination, Session, SessionConfig, StagingArea, TransferEngine, TransferOptions, VendedS3Stores,
};
use granary_ledger::SledLedger;
use tracing::{debug, info, warn};

use crate::admin;
use crate::cli::{Cli, Command, DownloadArgs, LedgerCommand, QueryArgs};
use crate::config::{Overrides, Settings};
use crate::error::{Error, Result};
use crate::run::{QueryPlan, Selection, download_pass, query_pass};

const USER_AGENT: &str = concat!("granary/", env!("CARGO_PKG_VERSION"));

/// Global flags every command sees.
#[derive(Debug, Clone, Copy, Default)]
pub struct Flags {
    pub dry_run: bool,
    pub smoke:   bool,
}

pub async fn execute(cli: Cli) -> Result<()> {
    let overrides = Overrides {
        ledger_path: cli.ledger.clone(),
        destination: match &cli.command {
            Command::Download(args) => args.destination.clone(),
            _ => None,
        },
    };
    let settings = Settings::load(cli.config.as_deref(), &overrides)?;
    debug!(?settings, "settings loaded");

    let flags = Flags {
        dry_run: cli.dry_run,
        smoke:   cli.smoke_run,
    };
    match cli.command {
        Command::Query(args) => query(&args, flags, &settings).await,
        Command::Download(args) => download(&args, flags, &settings).await,
        Command::Ledger(command) => ledger(&command, flags, &settings),
    }
}

/// Turn query arguments into a plan, rejecting anything malformed.
pub fn plan_query(args: &QueryArgs, flags: Flags, settings: &Settings) -> Result<QueryPlan> {
    let bounding_box: BoundingBox = args.bounds.parse()?;
    let minutes = parse_minutes(&args.minutes)?;
    let start = args.start_date.as_deref().map(parse_start_date).transpose()?;
    let end = args.end_date.as_deref().map(parse_end_date).transpose()?;
    let window = if start.is_some() || end.is_some() {
        TimeWindow::range(start, end)?
    } else {
        TimeWindow::LookBack { minutes }
    };
    let filter = UrlFilter::new(args.transfer_protocol.parse()?, args.extension_list.parse::<ExtensionList>()?);

    Ok(QueryPlan {
        request: QueryRequest::new(&args.collection, window)
            .provider(&args.provider)
            .bounding_box(bounding_box)
            .page_size(settings.catalog.page_size),
        filter,
        extractor: TileExtractor::new(&settings.batch.tile_pattern)?,
        chunk_size: settings.batch.chunk_size,
        concurrency: settings.batch.concurrency,
        smoke: flags.smoke,
        dry_run: flags.dry_run,
        job: settings.batch.job.clone(),
        params: BatchParams {
            bucket_name: args.s3_bucket.clone(),
            start_time:  start.map(format_timestamp),
            end_time:    end.map(format_timestamp),
        },
    })
}

fn login(settings: &Settings) -> Result<Credentials> {
    let netrc = Netrc::load()?;
    Ok(netrc.credentials(&settings.endpoints.login_host)?.clone())
}

fn token_provider(http: reqwest::Client, settings: &Settings, credentials: Credentials) -> CmrTokenProvider {
    CmrTokenProvider::new(http, &settings.endpoints.token_url, credentials)
        .client_id(&settings.endpoints.client_id)
        .user_ip(&settings.endpoints.user_ip)
}

async fn query(args: &QueryArgs, flags: Flags, settings: &Settings) -> Result<()> {
    let plan = plan_query(args, flags, settings)?;
    let ledger = SledLedger::open(&settings.ledger_path)?;
    let credentials = login(settings)?;

    let http = reqwest::Client::builder()
        .connect_timeout(settings.transfer.connect_timeout())
        .read_timeout(settings.transfer.read_timeout())
        .user_agent(USER_AGENT)
        .build()?;
    let provider = token_provider(http.clone(), settings, credentials);

    let report = with_token(&provider, |token| {
        let catalog = CmrCatalog::new(http.clone(), &settings.endpoints.cmr_host).with_token(token.as_str());
        let submitter = Arc::new(HttpJobSubmitter::new(http.clone(), &settings.endpoints.job_queue_url));
        let (ledger, plan) = (&ledger, &plan);
        async move { query_pass(&catalog, ledger, submitter, plan).await }
    })
    .await?;

    info!(
        discovered = report.discovered,
        tiles = report.tiles,
        created = report.reconciled.created,
        existing = report.reconciled.existing,
        index_failed = report.reconciled.failed,
        batches = report.batches,
        submitted = report.submission.succeeded.len(),
        submit_failed = report.submission.failed.len(),
        "query pass finished"
    );
    if !report.submission.is_success() {
        warn!(failed = report.submission.failed.len(), "some batches were not submitted");
    }
    Ok(())
}

async fn download(args: &DownloadArgs, flags: Flags, settings: &Settings) -> Result<()> {
    let destination = settings.destination.as_deref().ok_or(Error::MissingDestination)?;
    let destination = Destination::parse(destination, &settings.region)?;
    let selection = Selection {
        tile_ids: args.tile_ids.clone(),
        protocol: args.transfer_protocol.as_deref().map(str::parse::<Protocol>).transpose()?,
        smoke:    flags.smoke,
    };
    let extractor = TileExtractor::new(&settings.batch.tile_pattern)?;
    let ledger = SledLedger::open(&settings.ledger_path)?;
    let credentials = login(settings)?;

    let session = Arc::new(Session::new(
        SessionConfig::new(&settings.endpoints.login_host)
            .credentials(credentials.clone())
            .connect_timeout(settings.transfer.connect_timeout())
            .read_timeout(settings.transfer.read_timeout())
            .max_redirects(settings.transfer.max_redirects),
    )?);
    let provider = token_provider(session.client().clone(), settings, credentials);

    let summary = with_token(&provider, |token| {
        let options = TransferOptions::default()
            .dry_run(flags.dry_run)
            .chunk_size(settings.transfer.chunk_size)
            .timeout(settings.transfer.timeout())
            .echo_token(token.as_str());
        let sources =
            VendedS3Stores::new(Arc::clone(&session), &settings.endpoints.credentials_url).region(&settings.region);
        let http = Arc::clone(&session);
        let (ledger, extractor, selection) = (&ledger, &extractor, &selection);
        async move {
            let staging = StagingArea::new(&settings.staging_dir)?;
            let engine = TransferEngine::new(ledger, http, sources, destination, staging)
                .with_pool(ChunkPool::new(settings.transfer.part_pool))
                .with_options(options);
            let summary = download_pass(&engine, extractor, selection).await;
            engine.finish()?;
            Ok::<_, Error>(summary)
        }
    })
    .await?;

    if summary.failed > 0 {
        warn!(failed = summary.failed, "some artifacts failed to transfer");
    }
    Ok(())
}

fn ledger(command: &LedgerCommand, flags: Flags, settings: &Settings) -> Result<()> {
    let ledger = SledLedger::open(&settings.ledger_path)?;
    match command {
        LedgerCommand::Pending => {
            println!("{}", admin::pending_table(&ledger));
            Ok(())
        }
        LedgerCommand::Reset { yes: false } => Err(Error::ResetNotConfirmed),
        LedgerCommand::Reset { yes: true } if flags.dry_run => {
            info!(records = ledger.len(), "dry run, ledger left as is");
            Ok(())
        }
        LedgerCommand::Reset { yes: true } => {
            let removed = admin::reset(&ledger)?;
            println!("removed {removed} records");
            Ok(())
        }
    }
}
