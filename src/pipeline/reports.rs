// src/pipeline/reports.rs
use crate::edinet::models::CorpusRecord;

/// Description marker for annual securities reports (有価証券報告書). The
/// marker also appears inside correction descriptions, so corrections
/// survive this filter and feed the resolver afterwards.
pub const SECURITIES_REPORT_MARKER: &str = "有価証券報告書";

/// Keeps only annual securities reports. When nothing matches, the input is
/// returned unchanged so downstream stages still have data to work with
/// (pass-through fallback, logged).
pub fn filter_securities_reports(records: Vec<CorpusRecord>) -> Vec<CorpusRecord> {
    let filtered: Vec<CorpusRecord> = records
        .iter()
        .filter(|r| r.filing.description().contains(SECURITIES_REPORT_MARKER))
        .cloned()
        .collect();

    if filtered.is_empty() && !records.is_empty() {
        tracing::warn!("No securities reports found; keeping the unfiltered set");
        return records;
    }

    tracing::info!(
        "{} of {} filings are securities reports",
        filtered.len(),
        records.len()
    );
    filtered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edinet::models::test_support::{filing, record};
    use chrono::NaiveDate;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn keeps_reports_and_their_corrections() {
        let input = vec![
            record(d("2023-06-23"), filing("S1", "72030", "トヨタ自動車株式会社", "有価証券報告書－第119期")),
            record(d("2023-09-01"), filing("S2", "72030", "トヨタ自動車株式会社", "訂正有価証券報告書－第119期")),
            record(d("2023-06-23"), filing("S3", "72030", "トヨタ自動車株式会社", "臨時報告書")),
        ];
        let filtered = filter_securities_reports(input);
        let ids: Vec<&str> = filtered.iter().map(|r| r.filing.doc_id.as_str()).collect();
        assert_eq!(ids, vec!["S1", "S2"]);
    }

    #[test]
    fn falls_back_to_input_when_no_reports_exist() {
        let input = vec![record(
            d("2023-06-23"),
            filing("S3", "72030", "トヨタ自動車株式会社", "臨時報告書"),
        )];
        assert_eq!(filter_securities_reports(input.clone()), input);
    }
}
