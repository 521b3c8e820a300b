// src/edinet/models.rs
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One filing's metadata as returned by the EDINET document listing endpoint
/// (`documents.json`). Only the fields the pipeline consumes are kept; the
/// response carries many more.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filing {
    /// Document ID, the filing's identity (e.g. "S100ABC1").
    #[serde(rename = "docID")]
    pub doc_id: String,

    /// Securities code of the filer. May be zero-padded or right-padded by
    /// one digit (5-digit form of a 4-digit code). Absent for non-listed
    /// filers.
    #[serde(rename = "secCode")]
    pub sec_code: Option<String>,

    /// Name of the submitting entity.
    #[serde(rename = "filerName")]
    pub filer_name: Option<String>,

    /// Free-text description of the document type, e.g.
    /// "有価証券報告書－第120期" or "訂正有価証券報告書…".
    #[serde(rename = "docDescription")]
    pub doc_description: Option<String>,

    /// For correction filings: the doc ID of the filing being corrected.
    #[serde(rename = "referenceDocID")]
    pub reference_doc_id: Option<String>,

    /// Alternate correction linkage populated on some filings instead of
    /// (or in addition to) `referenceDocID`.
    #[serde(rename = "parentDocID")]
    pub parent_doc_id: Option<String>,
}

impl Filing {
    pub fn description(&self) -> &str {
        self.doc_description.as_deref().unwrap_or("")
    }
}

/// Envelope of the listing response. Failures upstream of deserialization
/// are mapped to `EdinetError`; a present but empty `results` is a normal
/// no-filings day.
#[derive(Debug, Deserialize)]
pub struct ListingResponse {
    #[serde(default)]
    pub results: Vec<Filing>,
}

/// The unit of storage in the raw corpus: a filing paired with the listing
/// date it was observed under. Ordering across dates is not meaningful;
/// consumers key by `date` explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusRecord {
    pub date: NaiveDate,
    pub filing: Filing,
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Shorthand for building filings in pipeline tests.
    pub fn filing(doc_id: &str, sec_code: &str, filer: &str, desc: &str) -> Filing {
        Filing {
            doc_id: doc_id.to_string(),
            sec_code: if sec_code.is_empty() { None } else { Some(sec_code.to_string()) },
            filer_name: if filer.is_empty() { None } else { Some(filer.to_string()) },
            doc_description: if desc.is_empty() { None } else { Some(desc.to_string()) },
            reference_doc_id: None,
            parent_doc_id: None,
        }
    }

    pub fn record(date: NaiveDate, filing: Filing) -> CorpusRecord {
        CorpusRecord { date, filing }
    }
}
