// src/extractors/indicators.rs
//
// Scans an XBRL instance document (tagged text) for a fixed set of
// financial indicators. The scan is regex-based rather than a full XML
// parse: EDINET instance documents are large, the tags of interest are
// flat, and the registry's own renderer tolerates the same looseness.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::utils::error::ExtractError;

/// The fixed set of financial indicators sought in each filing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Indicator {
    NetSales,
    GrossProfit,
    OperatingIncome,
    OrdinaryIncome,
    NetIncome,
    TotalAssets,
    NetAssets,
}

impl Indicator {
    pub const ALL: [Indicator; 7] = [
        Indicator::NetSales,
        Indicator::GrossProfit,
        Indicator::OperatingIncome,
        Indicator::OrdinaryIncome,
        Indicator::NetIncome,
        Indicator::TotalAssets,
        Indicator::NetAssets,
    ];

    /// XBRL element name carrying this indicator.
    pub fn tag(self) -> &'static str {
        match self {
            Indicator::NetSales => "NetSales",
            Indicator::GrossProfit => "GrossProfit",
            Indicator::OperatingIncome => "OperatingIncome",
            Indicator::OrdinaryIncome => "OrdinaryIncome",
            Indicator::NetIncome => "ProfitLoss",
            Indicator::TotalAssets => "TotalAssets",
            Indicator::NetAssets => "NetAssets",
        }
    }

    /// Japanese label used in the output tables.
    pub fn label(self) -> &'static str {
        match self {
            Indicator::NetSales => "売上高",
            Indicator::GrossProfit => "売上総利益",
            Indicator::OperatingIncome => "営業利益",
            Indicator::OrdinaryIncome => "経常利益",
            Indicator::NetIncome => "当期純利益",
            Indicator::TotalAssets => "総資産",
            Indicator::NetAssets => "純資産",
        }
    }
}

/// One extracted figure: the raw integer plus its human-scale rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorValue {
    pub raw: i64,
    pub display: String,
}

/// Unit bucket a value is displayed in. Classification is display-only;
/// the raw integer is always retained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scale {
    Billions,
    Millions,
    Yen,
}

pub fn classify_scale(value: i64) -> Scale {
    if value >= 1_000_000_000 {
        Scale::Billions
    } else if value >= 1_000_000 {
        Scale::Millions
    } else {
        Scale::Yen
    }
}

/// Renders a raw yen amount in its scale bucket, e.g. `37.15十億円`.
pub fn format_value(value: i64) -> String {
    match classify_scale(value) {
        Scale::Billions => format!("{:.2}十億円", value as f64 / 1_000_000_000.0),
        Scale::Millions => format!("{:.2}百万円", value as f64 / 1_000_000.0),
        Scale::Yen => format!("{}円", group_digits(value)),
    }
}

fn group_digits(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if value < 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

/// Identity fields and figures pulled from one instance document.
#[derive(Debug, Clone, Default)]
pub struct IndicatorDocument {
    pub company_name: Option<String>,
    pub fiscal_period_end: Option<String>,
    pub values: BTreeMap<Indicator, IndicatorValue>,
}

/// One filing's extraction result, attributed to a tracked entity. The
/// entity name comes from the registry, not the document, so grouping stays
/// stable across name variants.
#[derive(Debug, Clone)]
pub struct IndicatorRecord {
    pub entity_name: String,
    pub doc_id: String,
    pub date: NaiveDate,
    pub fiscal_period_end: Option<String>,
    pub values: BTreeMap<Indicator, IndicatorValue>,
}

static COMPANY_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<jpdei_cor:CompanyName[^>]*>([^<]+)</jpdei_cor:CompanyName>")
        .expect("Failed to compile COMPANY_NAME_RE")
});

static PERIOD_END_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"<jpdei_cor:CurrentFiscalYearEndDate[^>]*>([^<]+)</jpdei_cor:CurrentFiscalYearEndDate>",
    )
    .expect("Failed to compile PERIOD_END_RE")
});

/// Per-indicator patterns: one preferring the current-year duration
/// context, one matching the tag regardless of context.
static INDICATOR_RES: Lazy<Vec<(Indicator, Regex, Regex)>> = Lazy::new(|| {
    Indicator::ALL
        .iter()
        .map(|&indicator| {
            let tag = indicator.tag();
            let preferred = Regex::new(&format!(
                r#"<[^>]*:{tag} [^>]*contextRef="CurrentYearDuration"[^>]*>([^<]+)</[^>]*:{tag}>"#
            ))
            .expect("Failed to compile preferred indicator pattern");
            let any_context = Regex::new(&format!(r"<[^>]*:{tag}[^>]*>([^<]+)</[^>]*:{tag}>"))
                .expect("Failed to compile fallback indicator pattern");
            (indicator, preferred, any_context)
        })
        .collect()
});

/// Reads an instance document and extracts the indicator set. Missing or
/// unreadable files surface as `ExtractError::Io`; everything else degrades
/// per occurrence.
pub fn extract_indicators(path: &Path) -> Result<IndicatorDocument, ExtractError> {
    let bytes = fs::read(path)?;
    let content = String::from_utf8_lossy(&bytes);

    let document = scan_indicators(&content);
    if document.values.is_empty() {
        tracing::warn!("No financial indicators found in {}", path.display());
    }
    Ok(document)
}

/// Pure scan over tagged text. For each indicator, occurrences with the
/// current-year-duration context are preferred; without any, every context
/// is considered. Among the parsed occurrences the maximum wins, on the
/// assumption that the larger figure is the consolidated one.
pub fn scan_indicators(content: &str) -> IndicatorDocument {
    let company_name = COMPANY_NAME_RE
        .captures(content)
        .map(|c| c[1].trim().to_string());
    let fiscal_period_end = PERIOD_END_RE
        .captures(content)
        .map(|c| japanese_date(c[1].trim()));

    let mut values = BTreeMap::new();
    for (indicator, preferred, any_context) in INDICATOR_RES.iter() {
        let mut occurrences: Vec<i64> = parse_occurrences(preferred, content);
        if occurrences.is_empty() {
            occurrences = parse_occurrences(any_context, content);
        }

        if let Some(&raw) = occurrences.iter().max() {
            values.insert(
                *indicator,
                IndicatorValue { raw, display: format_value(raw) },
            );
        }
    }

    IndicatorDocument { company_name, fiscal_period_end, values }
}

/// Renders an ISO fiscal-year-end date in Japanese form, `2023-03-31`
/// becoming `2023年03月31日`. Anything that is not an ISO date passes
/// through unchanged.
fn japanese_date(raw: &str) -> String {
    match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(date) => date.format("%Y年%m月%d日").to_string(),
        Err(_) => raw.to_string(),
    }
}

/// Collects every parseable integer occurrence of a pattern. Non-numeric
/// content is skipped, not fatal.
fn parse_occurrences(pattern: &Regex, content: &str) -> Vec<i64> {
    pattern
        .captures_iter(content)
        .filter_map(|c| c[1].trim().parse::<i64>().ok())
        .collect()
}
