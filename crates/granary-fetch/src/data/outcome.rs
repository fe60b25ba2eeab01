use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::TransferError;

/// Measurements for one successful transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferStats {
    pub file_name:  String,
    pub key:        String,
    pub bytes:      u64,
    pub started_at: DateTime<Utc>,
    pub ended_at:   DateTime<Utc>,
    pub duration:   Duration,
}

impl TransferStats {
    /// Throughput in bytes per second, `None` for an instantaneous transfer.
    pub fn rate_bps(&self) -> Option<f64> {
        let secs = self.duration.as_secs_f64();
        (secs > 0.0).then(|| self.bytes as f64 / secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    AlreadyDownloaded,
    DryRun,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::AlreadyDownloaded => write!(f, "already downloaded"),
            SkipReason::DryRun => write!(f, "dry run"),
        }
    }
}

/// Terminal state of one artifact.
#[derive(Debug)]
pub enum TransferOutcome {
    Downloaded(TransferStats),
    Skipped(SkipReason),
    Failed(TransferError),
}

/// Outcome counts for a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub downloaded: usize,
    pub skipped:    usize,
    pub failed:     usize,
}

impl RunSummary {
    pub fn record(&mut self, outcome: &TransferOutcome) {
        match outcome {
            TransferOutcome::Downloaded(_) => self.downloaded += 1,
            TransferOutcome::Skipped(_) => self.skipped += 1,
            TransferOutcome::Failed(_) => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize { self.downloaded + self.skipped + self.failed }
}
