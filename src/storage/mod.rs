// src/storage/mod.rs
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::edinet::models::CorpusRecord;
use crate::extractors::indicators::{format_value, Indicator, IndicatorRecord, IndicatorValue};
use crate::pipeline::aggregate::TrendRecord;
use crate::utils::error::StorageError;

pub const ALL_DOCUMENTS_CSV: &str = "all_documents.csv";
pub const FILTERED_DOCUMENTS_CSV: &str = "filtered_documents.csv";
pub const SECURITIES_REPORTS_CSV: &str = "securities_reports.csv";
pub const FINAL_SECURITIES_REPORTS_CSV: &str = "final_securities_reports.csv";
pub const FINANCIAL_INDICATORS_CSV: &str = "financial_indicators.csv";
pub const FINANCIAL_TRENDS_CSV: &str = "financial_trends.csv";

/// Flat row for the corpus stage tables. The csv crate does not flatten
/// nested structs, so `CorpusRecord` is spread out by hand.
#[derive(Debug, Serialize, Deserialize)]
struct CorpusRow {
    document_date: NaiveDate,
    doc_id: String,
    sec_code: Option<String>,
    filer_name: Option<String>,
    doc_description: Option<String>,
    reference_doc_id: Option<String>,
    parent_doc_id: Option<String>,
}

impl From<&CorpusRecord> for CorpusRow {
    fn from(record: &CorpusRecord) -> Self {
        let f = &record.filing;
        Self {
            document_date: record.date,
            doc_id: f.doc_id.clone(),
            sec_code: f.sec_code.clone(),
            filer_name: f.filer_name.clone(),
            doc_description: f.doc_description.clone(),
            reference_doc_id: f.reference_doc_id.clone(),
            parent_doc_id: f.parent_doc_id.clone(),
        }
    }
}

/// Flat row for the indicator table: one pair of columns (raw integer,
/// display string) per indicator, absent indicators left empty.
#[derive(Debug, Serialize, Deserialize)]
pub struct IndicatorRow {
    pub entity_name: String,
    pub doc_id: String,
    pub document_date: NaiveDate,
    pub fiscal_period_end: Option<String>,
    pub net_sales_raw: Option<i64>,
    pub net_sales: Option<String>,
    pub gross_profit_raw: Option<i64>,
    pub gross_profit: Option<String>,
    pub operating_income_raw: Option<i64>,
    pub operating_income: Option<String>,
    pub ordinary_income_raw: Option<i64>,
    pub ordinary_income: Option<String>,
    pub net_income_raw: Option<i64>,
    pub net_income: Option<String>,
    pub total_assets_raw: Option<i64>,
    pub total_assets: Option<String>,
    pub net_assets_raw: Option<i64>,
    pub net_assets: Option<String>,
}

impl From<&IndicatorRecord> for IndicatorRow {
    fn from(record: &IndicatorRecord) -> Self {
        let raw = |i: Indicator| record.values.get(&i).map(|v| v.raw);
        let display = |i: Indicator| record.values.get(&i).map(|v| v.display.clone());
        Self {
            entity_name: record.entity_name.clone(),
            doc_id: record.doc_id.clone(),
            document_date: record.date,
            fiscal_period_end: record.fiscal_period_end.clone(),
            net_sales_raw: raw(Indicator::NetSales),
            net_sales: display(Indicator::NetSales),
            gross_profit_raw: raw(Indicator::GrossProfit),
            gross_profit: display(Indicator::GrossProfit),
            operating_income_raw: raw(Indicator::OperatingIncome),
            operating_income: display(Indicator::OperatingIncome),
            ordinary_income_raw: raw(Indicator::OrdinaryIncome),
            ordinary_income: display(Indicator::OrdinaryIncome),
            net_income_raw: raw(Indicator::NetIncome),
            net_income: display(Indicator::NetIncome),
            total_assets_raw: raw(Indicator::TotalAssets),
            total_assets: display(Indicator::TotalAssets),
            net_assets_raw: raw(Indicator::NetAssets),
            net_assets: display(Indicator::NetAssets),
        }
    }
}

impl From<IndicatorRow> for IndicatorRecord {
    fn from(row: IndicatorRow) -> Self {
        let mut values = BTreeMap::new();
        let mut put = |indicator: Indicator, raw: Option<i64>, display: Option<String>| {
            if let Some(raw) = raw {
                let display = display.unwrap_or_else(|| format_value(raw));
                values.insert(indicator, IndicatorValue { raw, display });
            }
        };
        put(Indicator::NetSales, row.net_sales_raw, row.net_sales);
        put(Indicator::GrossProfit, row.gross_profit_raw, row.gross_profit);
        put(Indicator::OperatingIncome, row.operating_income_raw, row.operating_income);
        put(Indicator::OrdinaryIncome, row.ordinary_income_raw, row.ordinary_income);
        put(Indicator::NetIncome, row.net_income_raw, row.net_income);
        put(Indicator::TotalAssets, row.total_assets_raw, row.total_assets);
        put(Indicator::NetAssets, row.net_assets_raw, row.net_assets);

        Self {
            entity_name: row.entity_name,
            doc_id: row.doc_id,
            date: row.document_date,
            fiscal_period_end: row.fiscal_period_end,
            values,
        }
    }
}

/// Writes the pipeline's stage tables under one output directory.
pub struct StorageManager {
    output_dir: PathBuf,
}

impl StorageManager {
    /// Creates a new StorageManager, creating the output directory if needed.
    pub fn new<P: AsRef<Path>>(output_dir: P) -> Result<Self, StorageError> {
        let output_dir = output_dir.as_ref().to_path_buf();
        if !output_dir.exists() {
            fs::create_dir_all(&output_dir)?;
        }
        Ok(Self { output_dir })
    }

    pub fn path_of(&self, file_name: &str) -> PathBuf {
        self.output_dir.join(file_name)
    }

    /// Saves a corpus-stage table (raw, filtered, securities, or final).
    pub fn save_corpus(
        &self,
        file_name: &str,
        records: &[CorpusRecord],
    ) -> Result<PathBuf, StorageError> {
        let path = self.path_of(file_name);
        let mut writer = csv::Writer::from_path(&path)?;
        for record in records {
            writer.serialize(CorpusRow::from(record))?;
        }
        writer.flush().map_err(StorageError::Io)?;
        tracing::info!("Saved {} rows to {}", records.len(), path.display());
        Ok(path)
    }

    pub fn save_indicators(&self, records: &[IndicatorRecord]) -> Result<PathBuf, StorageError> {
        let path = self.path_of(FINANCIAL_INDICATORS_CSV);
        let mut writer = csv::Writer::from_path(&path)?;
        for record in records {
            writer.serialize(IndicatorRow::from(record))?;
        }
        writer.flush().map_err(StorageError::Io)?;
        tracing::info!("Saved {} indicator rows to {}", records.len(), path.display());
        Ok(path)
    }

    /// Reloads a previously saved indicator table, e.g. to re-aggregate
    /// without re-crawling.
    pub fn load_indicators<P: AsRef<Path>>(path: P) -> Result<Vec<IndicatorRecord>, StorageError> {
        let mut reader = csv::Reader::from_path(path.as_ref())?;
        let mut records = Vec::new();
        for row in reader.deserialize::<IndicatorRow>() {
            records.push(row?.into());
        }
        Ok(records)
    }

    pub fn save_trends(&self, trends: &[TrendRecord]) -> Result<PathBuf, StorageError> {
        let path = self.path_of(FINANCIAL_TRENDS_CSV);
        let mut writer = csv::Writer::from_path(&path)?;
        for trend in trends {
            writer.serialize(trend)?;
        }
        writer.flush().map_err(StorageError::Io)?;
        tracing::info!("Saved {} trend rows to {}", trends.len(), path.display());
        Ok(path)
    }
}
