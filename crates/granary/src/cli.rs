use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Clone, Debug, Parser)]
#[command(name = "granary", version = env!("CARGO_PKG_VERSION"), about, long_about = None, propagate_version = true)]
pub struct Cli {
    /// Configuration file; defaults to `granary.toml` in the working directory.
    #[arg(long, global = true, env = "GRANARY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Walk the run without transferring or submitting anything.
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Restrict the run to a single tile.
    #[arg(long, global = true)]
    pub smoke_run: bool,

    /// Ledger database directory.
    #[arg(long, global = true)]
    pub ledger: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Clone, Debug, Subcommand)]
pub enum Command {
    /// Search the catalog, index new granules and submit download jobs.
    #[command(alias = "q", name = "query")]
    Query(QueryArgs),
    /// Transfer pending granules into the destination.
    #[command(alias = "d", name = "download")]
    Download(DownloadArgs),
    /// Inspect or reset the ledger.
    #[command(subcommand, name = "ledger")]
    Ledger(LedgerCommand),
}

#[derive(Clone, Debug, Args)]
pub struct QueryArgs {
    /// Collection short name, e.g. HLSS30.
    #[arg(short = 'c', long = "collection-shortname")]
    pub collection: String,

    /// Bucket the submitted download jobs write to.
    #[arg(short = 's', long = "s3bucket")]
    pub s3_bucket: String,

    /// Start of the temporal range, e.g. 2021-01-14T00:00:00Z.
    #[arg(long = "start-date")]
    pub start_date: Option<String>,

    /// End of the temporal range, e.g. 2021-01-14T00:00:00Z.
    #[arg(long = "end-date")]
    pub end_date: Option<String>,

    /// Bounding box as W,S,E,N without spaces.
    #[arg(short = 'b', long = "bounds", default_value = "-180,-90,180,90", allow_hyphen_values = true)]
    pub bounds: String,

    /// Look-back window in minutes when no date is given.
    #[arg(short = 'm', long, default_value = "60")]
    pub minutes: String,

    /// Extension filter: TIF, L30 or S30.
    #[arg(short = 'e', long = "extension-list", default_value = "TIF")]
    pub extension_list: String,

    #[arg(short = 'p', long, default_value = "LPCLOUD")]
    pub provider: String,

    /// Keep only URLs of this scheme: s3 or https.
    #[arg(short = 'x', long = "transfer-protocol", default_value = "s3")]
    pub transfer_protocol: String,
}

#[derive(Clone, Debug, Args)]
pub struct DownloadArgs {
    /// Only transfer granules of these tiles; all pending when empty.
    #[arg(long = "tile-ids", num_args = 0..)]
    pub tile_ids: Vec<String>,

    /// Only transfer URLs of this scheme: s3 or https.
    #[arg(short = 'x', long = "transfer-protocol")]
    pub transfer_protocol: Option<String>,

    /// Destination as s3://bucket/prefix or file:///directory.
    #[arg(long)]
    pub destination: Option<String>,
}

#[derive(Clone, Debug, Subcommand)]
pub enum LedgerCommand {
    /// List every artifact not yet downloaded.
    #[command(alias = "ls", name = "pending")]
    Pending,
    /// Drop every record.
    #[command(name = "reset")]
    Reset {
        /// Required; the reset cannot be undone.
        #[arg(long)]
        yes: bool,
    },
}
