// src/pipeline/mod.rs
pub mod aggregate;
pub mod corrections;
pub mod matcher;
pub mod reports;

#[cfg(test)]
mod tests {
    //! Stage-composition scenarios: corpus in, canonical set out.

    use crate::edinet::models::test_support::{filing, record};
    use crate::edinet::models::CorpusRecord;
    use crate::entities::TrackedEntity;
    use chrono::NaiveDate;

    use super::{corrections, matcher, reports};

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn toyota() -> TrackedEntity {
        TrackedEntity {
            name: "トヨタ自動車株式会社".to_string(),
            edinet_code: Some("E02144".to_string()),
            sec_code: "7203".to_string(),
            fiscal_year_end: Some("3月31日".to_string()),
        }
    }

    fn canonical_set(entity: &TrackedEntity, corpus: &[CorpusRecord]) -> Vec<String> {
        let matched = matcher::match_filings(entity, corpus);
        let report_set = reports::filter_securities_reports(matched);
        let reference_pass = corrections::resolve_by_reference(report_set);
        let parent_pass = corrections::resolve_by_parent(reference_pass.records);
        parent_pass
            .records
            .iter()
            .map(|r| r.filing.doc_id.clone())
            .collect()
    }

    #[test]
    fn corpus_to_canonical_set() {
        let mut correction = filing("B", "72030", "トヨタ自動車株式会社", "訂正有価証券報告書－第119期");
        correction.reference_doc_id = Some("A".to_string());

        let corpus = vec![
            // Original report, later corrected by B.
            record(d("2023-06-23"), filing("A", "72030", "トヨタ自動車株式会社", "有価証券報告書－第119期")),
            record(d("2023-09-01"), correction),
            // Non-report filing for the same entity, dropped by the report filter.
            record(d("2023-06-23"), filing("C", "72030", "トヨタ自動車株式会社", "臨時報告書")),
            // Another entity entirely.
            record(d("2023-06-23"), filing("D", "72670", "本田技研工業株式会社", "有価証券報告書－第99期")),
        ];

        assert_eq!(canonical_set(&toyota(), &corpus), vec!["B".to_string()]);
    }

    #[test]
    fn canonical_set_is_stable_under_reprocessing() {
        let corpus = vec![
            record(d("2022-06-24"), filing("A", "72030", "トヨタ自動車株式会社", "有価証券報告書－第118期")),
            record(d("2023-06-23"), filing("B", "72030", "トヨタ自動車株式会社", "有価証券報告書－第119期")),
        ];
        let entity = toyota();
        assert_eq!(canonical_set(&entity, &corpus), canonical_set(&entity, &corpus));
    }
}
