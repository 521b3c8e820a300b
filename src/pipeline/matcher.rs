// src/pipeline/matcher.rs
use crate::edinet::models::CorpusRecord;
use crate::entities::TrackedEntity;

/// Compares securities codes after stripping leading zeros from both sides.
/// The registry sometimes right-pads a 4-digit code by one digit, so the
/// filing code also matches with a single trailing zero appended to the
/// entity's code.
pub fn codes_match(entity_code: &str, filing_code: &str) -> bool {
    let entity = entity_code.trim_start_matches('0');
    let filing = filing_code.trim_start_matches('0');
    if entity.is_empty() || filing.is_empty() {
        return false;
    }
    filing == entity || filing == format!("{entity}0")
}

/// Whether one filing belongs to `entity`: securities-code match (see
/// [`codes_match`]) or the filer name containing the entity's canonical
/// name as a case-sensitive substring.
pub fn matches(entity: &TrackedEntity, record: &CorpusRecord) -> bool {
    let filing = &record.filing;
    let code_hit = filing
        .sec_code
        .as_deref()
        .is_some_and(|code| codes_match(&entity.sec_code, code));
    let name_hit = filing
        .filer_name
        .as_deref()
        .is_some_and(|name| name.contains(&entity.name));
    code_hit || name_hit
}

/// Returns the subset of the corpus belonging to `entity`. Zero matches is
/// a normal terminal state, surfaced as a warning.
pub fn match_filings(entity: &TrackedEntity, corpus: &[CorpusRecord]) -> Vec<CorpusRecord> {
    let matched: Vec<CorpusRecord> = corpus
        .iter()
        .filter(|record| matches(entity, record))
        .cloned()
        .collect();

    if matched.is_empty() {
        tracing::warn!("No filings matched entity {} ({})", entity.name, entity.sec_code);
    } else {
        tracing::info!(
            "{} ({}): {} filings matched",
            entity.name,
            entity.sec_code,
            matched.len()
        );
    }
    matched
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edinet::models::test_support::{filing, record};
    use chrono::NaiveDate;

    fn entity(name: &str, code: &str) -> TrackedEntity {
        TrackedEntity {
            name: name.to_string(),
            edinet_code: None,
            sec_code: code.to_string(),
            fiscal_year_end: Some("3月31日".to_string()),
        }
    }

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn code_matches_exact_and_right_padded_forms() {
        assert!(codes_match("7203", "7203"));
        assert!(codes_match("7203", "72030"));
        assert!(!codes_match("7203", "1720"));
        assert!(!codes_match("7203", "720300"));
    }

    #[test]
    fn leading_zeros_are_ignored_on_both_sides() {
        assert!(codes_match("07203", "7203"));
        assert!(codes_match("7203", "07203"));
        assert!(codes_match("07203", "072030"));
    }

    #[test]
    fn empty_codes_never_match() {
        assert!(!codes_match("", "7203"));
        assert!(!codes_match("7203", ""));
        assert!(!codes_match("000", "000"));
    }

    #[test]
    fn matches_padded_registry_code() {
        // Entity "Toyota" with code 7203; registry lists secCode "72030".
        let corpus = vec![
            record(d("2023-06-23"), filing("S1", "72030", "Toyota Motor Corp", "有価証券報告書")),
            record(d("2023-06-23"), filing("S2", "17200", "Unrelated Co", "有価証券報告書")),
        ];
        let matched = match_filings(&entity("Toyota", "7203"), &corpus);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].filing.doc_id, "S1");
    }

    #[test]
    fn matches_on_filer_name_substring_when_code_differs() {
        let corpus = vec![record(
            d("2023-06-23"),
            filing("S1", "", "トヨタ自動車株式会社", "有価証券報告書"),
        )];
        let matched = match_filings(&entity("トヨタ自動車株式会社", "7203"), &corpus);
        assert_eq!(matched.len(), 1);
    }

    #[test]
    fn name_match_is_case_sensitive() {
        let corpus = vec![record(d("2023-06-23"), filing("S1", "", "toyota motor corp", ""))];
        assert!(match_filings(&entity("Toyota", "9999"), &corpus).is_empty());
    }

    #[test]
    fn zero_matches_is_empty_not_an_error() {
        let corpus = vec![record(d("2023-06-23"), filing("S1", "6758", "Sony Group", ""))];
        assert!(match_filings(&entity("Toyota", "7203"), &corpus).is_empty());
    }

    #[test]
    fn matching_is_idempotent() {
        let corpus = vec![
            record(d("2023-06-23"), filing("S1", "72030", "トヨタ自動車株式会社", "有価証券報告書")),
            record(d("2023-06-26"), filing("S2", "72670", "本田技研工業株式会社", "有価証券報告書")),
        ];
        let e = entity("トヨタ自動車株式会社", "7203");
        let first = match_filings(&e, &corpus);
        let second = match_filings(&e, &corpus);
        assert_eq!(first, second);
    }
}
