// src/config.rs
use std::path::PathBuf;
use std::time::Duration;

/// Default EDINET v2 API base. The v2 endpoints require a subscription key.
pub const DEFAULT_API_BASE: &str = "https://api.edinet-fsa.go.jp/api/v2";

/// Explicit pipeline configuration. Every component receives what it needs
/// from here at construction; there is no ambient/global settings state.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// EDINET API subscription key.
    pub api_key: String,
    /// Base URL of the EDINET API (overridable for tests).
    pub api_base: String,
    /// Per-request timeout.
    pub request_timeout: Duration,

    /// First year of the survey range (inclusive).
    pub start_year: i32,
    /// Last year of the survey range (inclusive).
    pub end_year: i32,
    /// Month whose filings are crawled for each year. Annual securities
    /// reports for March fiscal-year-ends cluster in June.
    pub target_month: u32,

    /// Max simultaneous listing requests.
    pub listing_concurrency: usize,
    /// Max simultaneous document archive downloads.
    pub download_concurrency: usize,

    /// Where stage tables (CSV) are written.
    pub output_dir: PathBuf,
    /// Root under which per-filing archives are extracted.
    pub download_dir: PathBuf,

    /// Optional cap on the number of canonical filings processed per run,
    /// for debugging.
    pub limit: Option<usize>,
}

impl PipelineConfig {
    /// Delay inserted between per-year crawl batches as a naive politeness
    /// gesture toward the registry.
    pub fn year_batch_pause(&self) -> Duration {
        Duration::from_secs(1)
    }
}
