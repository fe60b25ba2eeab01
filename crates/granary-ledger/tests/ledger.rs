use std::collections::HashSet;

use granary_ledger::{ArtifactId, Ledger, SledLedger, reconcile};
use proptest::prelude::*;
use tempfile::tempdir;

fn url_for(name: &str, scheme: &str) -> String {
    match scheme {
        "s3" => format!("s3://lp-prod-protected/HLSL30.020/{name}"),
        _ => format!("https://data.example.org/lp-prod-protected/HLSL30.020/{name}"),
    }
}

#[test]
fn test_ledger_survives_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ledger");
    let id = ArtifactId::from("HLS.L30.T22VEQ.2021248T143156.v2.0.B02.tif");

    {
        let ledger = SledLedger::open(&path).unwrap();
        ledger.upsert_new(&id, &url_for(id.as_str(), "https")).unwrap();
        ledger.mark_downloaded(&id, &url_for(id.as_str(), "https")).unwrap();
    }

    let ledger = SledLedger::open(&path).unwrap();
    assert!(ledger.is_downloaded(&id));
    assert!(ledger.list_pending().is_empty());
}

#[test]
fn test_pending_ordered_by_discovery() {
    let ledger = SledLedger::temporary().unwrap();
    let names = ["z.tif", "a.tif", "m.tif"];
    for name in names {
        ledger
            .upsert_new(&ArtifactId::from(name), &url_for(name, "https"))
            .unwrap();
        std::thread::sleep(std::time::Duration::from_millis(2));
    }

    let pending: Vec<_> = ledger
        .list_pending()
        .into_iter()
        .map(|r| r.id.as_str().to_string())
        .collect();
    assert_eq!(pending, names);
}

#[test]
fn test_https_and_s3_urls_share_one_record() {
    let ledger = SledLedger::temporary().unwrap();
    let name = "HLS.S30.T10SEG.2022001T184731.v2.0.Fmask.tif";
    let report = reconcile(&ledger, [url_for(name, "https"), url_for(name, "s3")]).unwrap();

    assert_eq!(report.created, 1);
    assert_eq!(report.existing, 1);
    assert_eq!(ledger.len(), 1);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_mark_downloaded_is_idempotent(name in "[A-Za-z0-9._-]{1,24}", times in 1usize..4) {
        let ledger = SledLedger::temporary().unwrap();
        let id = ArtifactId::from(name.as_str());
        let url = url_for(&name, "https");

        let mut last = None;
        for _ in 0..times {
            ledger.mark_downloaded(&id, &url).unwrap();
            let record = ledger.exists(&id).unwrap();
            prop_assert!(record.downloaded);
            prop_assert!(record.download_datetime >= last);
            last = record.download_datetime;
        }
        prop_assert_eq!(ledger.len(), 1);
        prop_assert!(ledger.list_pending().is_empty());
    }

    #[test]
    fn prop_reconcile_one_record_per_distinct_id(
        names in proptest::collection::vec("[a-e]{1,2}\\.tif", 0..20),
    ) {
        let ledger = SledLedger::temporary().unwrap();
        let urls: Vec<String> = names
            .iter()
            .flat_map(|n| [url_for(n, "https"), url_for(n, "https")])
            .collect();

        let report = reconcile(&ledger, &urls).unwrap();
        let distinct: HashSet<_> = names.iter().collect();

        prop_assert_eq!(ledger.len(), distinct.len());
        prop_assert_eq!(report.created, distinct.len());
        prop_assert_eq!(report.existing, urls.len() - distinct.len());
    }

    #[test]
    fn prop_pending_until_marked(names in proptest::collection::hash_set("[a-z]{1,8}\\.tif", 1..12)) {
        let ledger = SledLedger::temporary().unwrap();
        let names: Vec<_> = names.into_iter().collect();
        reconcile(&ledger, names.iter().map(|n| url_for(n, "https"))).unwrap();

        let (marked, unmarked) = names.split_at(names.len() / 2);
        for name in marked {
            ledger.mark_downloaded(&ArtifactId::from(name.as_str()), &url_for(name, "https")).unwrap();
        }

        let pending: HashSet<String> = ledger
            .list_pending()
            .into_iter()
            .map(|r| r.id.as_str().to_string())
            .collect();
        for name in unmarked {
            prop_assert!(pending.contains(name));
        }
        for name in marked {
            prop_assert!(!pending.contains(name));
        }
    }
}
