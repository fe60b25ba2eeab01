//! Ledger administration outside the normal pipeline.

use granary_catalog::format_timestamp;
use granary_ledger::{ArtifactRecord, Ledger};
use tabled::settings::{Panel, Style};
use tabled::{Table, Tabled};
use tracing::warn;

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Tabled)]
pub struct PendingRow {
    #[tabled(rename = "ID")]
    pub id:         String,
    #[tabled(rename = "INDEXED")]
    pub indexed_at: String,
    #[tabled(rename = "URL")]
    pub url:        String,
}

impl From<ArtifactRecord> for PendingRow {
    fn from(record: ArtifactRecord) -> Self {
        Self {
            id:         record.id.to_string(),
            indexed_at: format_timestamp(record.index_datetime),
            url:        record.url,
        }
    }
}

/// Table of every pending artifact, oldest first.
pub fn pending_table<L: Ledger + ?Sized>(ledger: &L) -> Table {
    let rows: Vec<PendingRow> = ledger.list_pending().into_iter().map(PendingRow::from).collect();
    let footer = format!("{} pending", rows.len());
    let mut table = Table::new(rows);
    table.with(Style::blank()).with(Panel::footer(footer));
    table
}

/// Drop every record; returns how many were removed.
pub fn reset<L: Ledger + ?Sized>(ledger: &L) -> Result<usize> {
    let removed = ledger.reset()?;
    warn!(removed, "ledger reset");
    Ok(removed)
}
