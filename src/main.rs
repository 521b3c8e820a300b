// src/main.rs
mod config;
mod edinet;
mod entities;
mod extractors;
mod pipeline;
mod storage;
mod utils;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::Semaphore;

use config::{PipelineConfig, DEFAULT_API_BASE};
use edinet::client::RegistryClient;
use edinet::crawler::{self, CrawlReport};
use edinet::models::CorpusRecord;
use entities::TrackedEntity;
use extractors::indicators::{self, IndicatorRecord};
use pipeline::{aggregate, corrections, matcher, reports};
use storage::StorageManager;
use utils::AppError;

/// Command line interface for the EDINET filing corpus pipeline
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the tracked-entity registry (JSON list of companies)
    #[arg(short, long, default_value = "./data/company_info.json")]
    companies: PathBuf,

    /// First year of the survey range
    #[arg(long, default_value_t = 2018)]
    start_year: i32,

    /// Last year of the survey range
    #[arg(long, default_value_t = 2024)]
    end_year: i32,

    /// Month whose filings are crawled for each year
    #[arg(long, default_value_t = 6)]
    month: u32,

    /// Output directory for the stage tables
    #[arg(short, long, default_value = "./output")]
    output_dir: PathBuf,

    /// Root directory for downloaded document archives
    #[arg(long, default_value = "./output/xbrl")]
    download_dir: PathBuf,

    /// Max simultaneous listing requests
    #[arg(long, default_value_t = 5)]
    listing_concurrency: usize,

    /// Max simultaneous archive downloads
    #[arg(long, default_value_t = 3)]
    download_concurrency: usize,

    /// Process at most this many canonical filings (debugging)
    #[arg(long)]
    limit: Option<usize>,

    /// EDINET API subscription key (falls back to EDINET_API_KEY)
    #[arg(long)]
    api_key: Option<String>,

    /// Recompute the trend table from an existing indicator table and exit
    #[arg(long)]
    trends_only: bool,
}

impl Args {
    fn into_config(self) -> Result<PipelineConfig, AppError> {
        let api_key = match self.api_key {
            Some(key) => key,
            None => std::env::var("EDINET_API_KEY").map_err(|_| {
                AppError::Config(
                    "no API key: pass --api-key or set the EDINET_API_KEY environment variable"
                        .to_string(),
                )
            })?,
        };

        if !(1..=12).contains(&self.month) {
            return Err(AppError::Config(format!("invalid month: {}", self.month)));
        }
        if self.start_year > self.end_year {
            return Err(AppError::Config(format!(
                "start year {} is after end year {}",
                self.start_year, self.end_year
            )));
        }

        Ok(PipelineConfig {
            api_key,
            api_base: DEFAULT_API_BASE.to_string(),
            request_timeout: Duration::from_secs(30),
            start_year: self.start_year,
            end_year: self.end_year,
            target_month: self.month,
            listing_concurrency: self.listing_concurrency,
            download_concurrency: self.download_concurrency,
            output_dir: self.output_dir,
            download_dir: self.download_dir,
            limit: self.limit,
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // 1. Setup Logging (reads RUST_LOG env var)
    utils::logging::setup_logging();

    // 2. Parse CLI arguments and build the explicit pipeline configuration
    let args = Args::parse();
    tracing::info!("Starting pipeline for args: {:?}", args);

    // Re-aggregation mode: consume a previously produced indicator table.
    // A missing table here is a precondition failure, not a degraded unit.
    if args.trends_only {
        let storage = StorageManager::new(&args.output_dir)?;
        let path = storage.path_of(storage::FINANCIAL_INDICATORS_CSV);
        if !path.exists() {
            return Err(AppError::Config(format!(
                "indicator table not found at {} (run the full pipeline first)",
                path.display()
            )));
        }
        let records = StorageManager::load_indicators(&path)?;
        let trends = aggregate::aggregate_trends(&records);
        storage.save_trends(&trends)?;
        tracing::info!("Recomputed {} trend rows from {}", trends.len(), path.display());
        return Ok(());
    }

    let companies_path = args.companies.clone();
    let cfg = args.into_config()?;

    // 3. Load the entity registry; an unusable registry aborts the run
    let entities = entities::load_entities(&companies_path)?;

    // 4. Initialize storage and the API client
    let storage = StorageManager::new(&cfg.output_dir)?;
    let client = RegistryClient::new(&cfg)?;

    // 5. Crawl the target month of every year in the range
    let corpus = crawl_years(&client, &cfg, &entities).await?;
    if corpus.records.is_empty() {
        tracing::warn!("Crawl collected no filings at all");
    }
    storage.save_corpus(storage::ALL_DOCUMENTS_CSV, &corpus.records)?;

    // 6. Per entity: match, keep securities reports, resolve corrections
    let mut matched_all = Vec::new();
    let mut resolved_all = Vec::new();
    let mut canonical: Vec<(TrackedEntity, Vec<CorpusRecord>)> = Vec::new();

    for entity in &entities {
        let matched = matcher::match_filings(entity, &corpus.records);
        matched_all.extend(matched.clone());

        let report_set = reports::filter_securities_reports(matched);
        let reference_pass = corrections::resolve_by_reference(report_set);
        let removed_by_reference = reference_pass.removed;
        resolved_all.extend(reference_pass.records.clone());

        let parent_pass = corrections::resolve_by_parent(reference_pass.records);
        if parent_pass.skipped && removed_by_reference == 0 {
            tracing::debug!("{}: no correction linkage found in either pass", entity.name);
        } else {
            tracing::info!(
                "{}: {} superseded filings removed ({} by reference, {} by parent)",
                entity.name,
                removed_by_reference + parent_pass.removed,
                removed_by_reference,
                parent_pass.removed
            );
        }
        canonical.push((entity.clone(), parent_pass.records));
    }

    storage.save_corpus(storage::FILTERED_DOCUMENTS_CSV, &matched_all)?;
    storage.save_corpus(storage::SECURITIES_REPORTS_CSV, &resolved_all)?;

    let canonical_all: Vec<CorpusRecord> = canonical
        .iter()
        .flat_map(|(_, records)| records.iter().cloned())
        .collect();
    storage.save_corpus(storage::FINAL_SECURITIES_REPORTS_CSV, &canonical_all)?;
    tracing::info!("Canonical filing set: {} filings", canonical_all.len());

    // 7. Download each canonical filing's archive and extract indicators
    let indicator_records = extract_all(&client, &cfg, &canonical).await;
    if indicator_records.is_empty() {
        tracing::warn!("No financial data extracted from any filing");
    }
    storage.save_indicators(&indicator_records)?;

    // 8. Roll up to per-year trend records
    let trends = aggregate::aggregate_trends(&indicator_records);
    storage.save_trends(&trends)?;

    tracing::info!(
        "Pipeline finished: {} filings crawled, {} canonical, {} indicator rows, {} trend rows",
        corpus.records.len(),
        canonical_all.len(),
        indicator_records.len(),
        trends.len()
    );
    Ok(())
}

/// Crawls the configured month of each year in the range, pausing briefly
/// between years. Degraded days are reported and absorbed.
async fn crawl_years(
    client: &RegistryClient,
    cfg: &PipelineConfig,
    entities: &[TrackedEntity],
) -> Result<CrawlReport, AppError> {
    let mut corpus = CrawlReport::default();

    let years: Vec<i32> = (cfg.start_year..=cfg.end_year).collect();
    for (i, &year) in years.iter().enumerate() {
        let (start, end) = crawler::month_range(year, cfg.target_month).ok_or_else(|| {
            AppError::Config(format!("no such month: {}-{}", year, cfg.target_month))
        })?;

        tracing::info!("== Crawling {} ==", year);
        let report = crawl_range_with_summary(client, cfg, entities, start, end).await;
        corpus.extend(report);

        if i + 1 < years.len() {
            tracing::info!("Pausing before the next year's batch...");
            tokio::time::sleep(cfg.year_batch_pause()).await;
        }
    }

    for day in &corpus.degraded {
        tracing::warn!("Degraded day {}: {}", day.date, day.reason);
    }
    Ok(corpus)
}

async fn crawl_range_with_summary(
    client: &RegistryClient,
    cfg: &PipelineConfig,
    entities: &[TrackedEntity],
    start: chrono::NaiveDate,
    end: chrono::NaiveDate,
) -> CrawlReport {
    let report = crawler::crawl_range(client, start, end, cfg.listing_concurrency).await;

    // Visibility only: how many filings each tracked entity produced.
    for entity in entities {
        let count = report
            .records
            .iter()
            .filter(|r| matcher::matches(entity, r))
            .count();
        if count > 0 {
            tracing::info!("- {} ({}): {} filings", entity.name, entity.sec_code, count);
        }
    }
    report
}

/// Downloads archives for every canonical filing under the download
/// concurrency cap and scans the contained report documents for indicators.
/// Per-filing failures are logged and skipped.
async fn extract_all(
    client: &RegistryClient,
    cfg: &PipelineConfig,
    canonical: &[(TrackedEntity, Vec<CorpusRecord>)],
) -> Vec<IndicatorRecord> {
    let semaphore = Arc::new(Semaphore::new(cfg.download_concurrency.max(1)));

    let mut units: Vec<(&TrackedEntity, &CorpusRecord)> = canonical
        .iter()
        .flat_map(|(entity, records)| records.iter().map(move |r| (entity, r)))
        .collect();
    if let Some(limit) = cfg.limit {
        tracing::info!("Limiting extraction to {} filings", limit);
        units.truncate(limit);
    }

    let total = units.len();
    let tasks = units.into_iter().enumerate().map(|(i, (entity, record))| {
        let semaphore = Arc::clone(&semaphore);
        async move {
            let _permit = semaphore.acquire().await.expect("semaphore closed");
            tracing::info!(
                "[{}/{}] {} - {} ({})",
                i + 1,
                total,
                entity.name,
                record.filing.description(),
                record.filing.doc_id
            );
            match process_filing(client, cfg, entity, record).await {
                Ok(records) => records,
                Err(e) => {
                    tracing::error!("Failed to process filing {}: {}", record.filing.doc_id, e);
                    Vec::new()
                }
            }
        }
    });

    let results = futures::future::join_all(tasks).await;

    let mut all = Vec::new();
    let mut failures = 0usize;
    for records in results {
        if records.is_empty() {
            failures += 1;
        }
        all.extend(records);
    }
    tracing::info!(
        "Extraction finished: {} indicator rows, {} filings yielded nothing",
        all.len(),
        failures
    );
    all
}

/// One filing: download the archive, unpack it off the async scheduler,
/// and scan each report instance document.
async fn process_filing(
    client: &RegistryClient,
    cfg: &PipelineConfig,
    entity: &TrackedEntity,
    record: &CorpusRecord,
) -> Result<Vec<IndicatorRecord>, AppError> {
    let doc_id = record.filing.doc_id.clone();
    let bytes = client.download_archive(&doc_id).await?;

    let extract_dest = filing_dir(&cfg.download_dir, &entity.name, &doc_id);
    let report_files = tokio::task::spawn_blocking(move || {
        edinet::archive::extract_archive(&bytes, &extract_dest)?;
        let xbrl = edinet::archive::find_xbrl_files(&extract_dest);
        Ok::<_, utils::error::ExtractError>(edinet::archive::filter_report_files(xbrl))
    })
    .await
    .map_err(|e| AppError::Processing(format!("archive task panicked: {e}")))??;

    if report_files.is_empty() {
        tracing::warn!("No XBRL files found for document {}", doc_id);
        return Ok(Vec::new());
    }

    let mut records = Vec::new();
    for path in report_files {
        let scan_path = path.clone();
        let document =
            tokio::task::spawn_blocking(move || indicators::extract_indicators(&scan_path))
                .await
                .map_err(|e| AppError::Processing(format!("scan task panicked: {e}")))?;

        match document {
            Ok(document) => {
                if let Some(doc_name) = &document.company_name {
                    if !doc_name.contains(&entity.name) && !entity.name.contains(doc_name.as_str()) {
                        tracing::debug!(
                            "Document names itself {:?}, registry says {:?}",
                            doc_name,
                            entity.name
                        );
                    }
                }
                let summary: Vec<String> = document
                    .values
                    .iter()
                    .map(|(indicator, value)| format!("{}: {}", indicator.label(), value.display))
                    .collect();
                if !summary.is_empty() {
                    tracing::info!("  {}", summary.join(", "));
                }
                records.push(IndicatorRecord {
                    // The registry's canonical name, not the document's own,
                    // so grouping stays stable across name variants.
                    entity_name: entity.name.clone(),
                    doc_id: doc_id.clone(),
                    date: record.date,
                    fiscal_period_end: document.fiscal_period_end,
                    values: document.values,
                });
            }
            Err(e) => {
                tracing::error!("Indicator scan failed for {}: {}", path.display(), e);
            }
        }
    }
    Ok(records)
}

/// Archives land under `download_root/<entity>/<doc_id>/`; doc IDs are
/// unique, so concurrent downloads never write the same path.
fn filing_dir(download_root: &Path, entity_name: &str, doc_id: &str) -> PathBuf {
    let safe_name: String = entity_name
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | ':') { '_' } else { c })
        .collect();
    download_root.join(safe_name).join(doc_id)
}
