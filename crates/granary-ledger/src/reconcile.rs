use tracing::{info, warn};

use crate::error::Result;
use crate::record::ArtifactId;
use crate::store::{Ledger, Upsert};

/// Counts produced by one [`reconcile`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub created:  usize,
    pub existing: usize,
    pub failed:   usize,
}

impl ReconcileReport {
    pub fn total(&self) -> usize { self.created + self.existing + self.failed }
}

/// Fold discovered URLs into the ledger.
///
/// Every URL is processed even when earlier ones fail; duplicates collapse
/// onto the first record for their id. The ledger is flushed once at the
/// end and only that flush can fail the pass.
pub fn reconcile<L, I, S>(ledger: &L, urls: I) -> Result<ReconcileReport>
where
    L: Ledger + ?Sized,
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut report = ReconcileReport::default();

    for url in urls {
        let url = url.as_ref();
        let outcome = ArtifactId::from_url(url).and_then(|id| ledger.upsert_new(&id, url));
        match outcome {
            Ok(Upsert::Created) => report.created += 1,
            Ok(Upsert::Existing) => report.existing += 1,
            Err(e) => {
                warn!(url, error = %e, "failed to index artifact");
                report.failed += 1;
            }
        }
    }

    ledger.flush()?;
    info!(
        created = report.created,
        existing = report.existing,
        failed = report.failed,
        "reconciled discovered artifacts"
    );
    Ok(report)
}
