// src/pipeline/corrections.rs
use std::collections::HashSet;

use crate::edinet::models::{CorpusRecord, Filing};

/// Textual marker identifying a correction filing in its description.
pub const CORRECTION_MARKER: &str = "訂正";

/// Result of one correction-resolution pass.
///
/// `skipped` is the fail-open case: no correction filing carried the linkage
/// field, so the input was returned unchanged. Callers can log, count, or
/// ignore it.
#[derive(Debug)]
pub struct Resolution {
    pub records: Vec<CorpusRecord>,
    pub removed: usize,
    pub skipped: bool,
}

/// Drops filings superseded via `referenceDocID`.
///
/// Correction filings themselves are kept; only the originals they point at
/// are removed. A filing referenced by several corrections is dropped once
/// (set semantics). The pass does not check that the correction postdates
/// the original; it trusts the linkage as the registry reports it.
pub fn resolve_by_reference(records: Vec<CorpusRecord>) -> Resolution {
    resolve_with(records, |f| f.reference_doc_id.as_deref(), "referenceDocID")
}

/// Drops filings superseded via `parentDocID`. The registry is inconsistent
/// about which linkage field it populates, so this pass runs in addition to
/// [`resolve_by_reference`], downstream of it.
pub fn resolve_by_parent(records: Vec<CorpusRecord>) -> Resolution {
    resolve_with(records, |f| f.parent_doc_id.as_deref(), "parentDocID")
}

fn resolve_with<F>(records: Vec<CorpusRecord>, link: F, field: &str) -> Resolution
where
    F: Fn(&Filing) -> Option<&str>,
{
    let superseded: HashSet<String> = records
        .iter()
        .filter(|r| r.filing.description().contains(CORRECTION_MARKER))
        .filter_map(|r| link(&r.filing))
        .map(str::to_string)
        .collect();

    if superseded.is_empty() {
        tracing::info!("No correction filing carries {}; pass skipped", field);
        return Resolution { records, removed: 0, skipped: true };
    }

    let original_count = records.len();
    let kept: Vec<CorpusRecord> = records
        .into_iter()
        .filter(|r| !superseded.contains(&r.filing.doc_id))
        .collect();
    let removed = original_count - kept.len();

    tracing::info!(
        "Correction pass on {}: {} of {} filings removed as superseded",
        field,
        removed,
        original_count
    );
    Resolution { records: kept, removed, skipped: false }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edinet::models::test_support::{filing, record};
    use chrono::NaiveDate;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn original(doc_id: &str) -> CorpusRecord {
        record(d("2023-06-23"), filing(doc_id, "72030", "トヨタ自動車株式会社", "有価証券報告書－第119期"))
    }

    fn correction(doc_id: &str, reference: Option<&str>, parent: Option<&str>) -> CorpusRecord {
        let mut f = filing(doc_id, "72030", "トヨタ自動車株式会社", "訂正有価証券報告書－第119期");
        f.reference_doc_id = reference.map(str::to_string);
        f.parent_doc_id = parent.map(str::to_string);
        record(d("2023-09-01"), f)
    }

    #[test]
    fn correction_supersedes_referenced_original() {
        // A is original (id=1), B corrects it via referenceDocID.
        let input = vec![original("1"), correction("2", Some("1"), None)];
        let resolution = resolve_by_reference(input);

        assert!(!resolution.skipped);
        assert_eq!(resolution.removed, 1);
        assert_eq!(resolution.records.len(), 1);
        assert_eq!(resolution.records[0].filing.doc_id, "2");
    }

    #[test]
    fn parent_pass_uses_the_alternate_linkage() {
        let input = vec![original("1"), correction("2", None, Some("1"))];

        // The reference pass sees no linkage and fails open.
        let first = resolve_by_reference(input);
        assert!(first.skipped);
        assert_eq!(first.records.len(), 2);

        // The parent pass then removes the original.
        let second = resolve_by_parent(first.records);
        assert!(!second.skipped);
        assert_eq!(second.records.len(), 1);
        assert_eq!(second.records[0].filing.doc_id, "2");
    }

    #[test]
    fn multiple_corrections_of_one_filing_remove_it_once() {
        let input = vec![
            original("1"),
            correction("2", Some("1"), None),
            correction("3", Some("1"), None),
        ];
        let resolution = resolve_by_reference(input);
        assert_eq!(resolution.removed, 1);
        assert_eq!(resolution.records.len(), 2);
    }

    #[test]
    fn resolution_is_a_subset_and_idempotent() {
        let input = vec![original("1"), original("9"), correction("2", Some("1"), None)];
        let ids = |records: &[CorpusRecord]| -> Vec<String> {
            records.iter().map(|r| r.filing.doc_id.clone()).collect()
        };

        let once = resolve_by_reference(input.clone());
        for id in ids(&once.records) {
            assert!(ids(&input).contains(&id), "resolver must not invent filings");
        }

        let twice = resolve_by_reference(once.records.clone());
        assert_eq!(ids(&once.records), ids(&twice.records));
        assert_eq!(twice.removed, 0);
    }

    #[test]
    fn no_linkage_anywhere_fails_open() {
        let mut corr = correction("2", None, None);
        corr.filing.reference_doc_id = None;
        let input = vec![original("1"), corr];

        let resolution = resolve_by_reference(input.clone());
        assert!(resolution.skipped);
        assert_eq!(resolution.records, input);
    }

    #[test]
    fn non_correction_filings_never_trigger_removal() {
        // A plain filing with a stray referenceDocID is not a correction.
        let mut stray = original("5");
        stray.filing.reference_doc_id = Some("1".to_string());
        let input = vec![original("1"), stray];

        let resolution = resolve_by_reference(input);
        assert!(resolution.skipped);
        assert_eq!(resolution.records.len(), 2);
    }
}
