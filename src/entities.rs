// src/entities.rs
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::utils::error::AppError;

/// One tracked company from the entity registry file. Read-only for the
/// duration of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedEntity {
    /// Canonical company name, matched as a substring of `filerName`.
    pub name: String,

    /// EDINET code of the filer (informational; matching uses the
    /// securities code).
    #[serde(rename = "edinetcode", default)]
    pub edinet_code: Option<String>,

    /// Securities code, possibly zero-padded.
    #[serde(rename = "seccode")]
    pub sec_code: String,

    /// Fiscal year end, e.g. "3月31日".
    #[serde(rename = "fiscal_year_end", default)]
    pub fiscal_year_end: Option<String>,
}

/// Loads the tracked-entity registry from a JSON file.
///
/// An absent, malformed, or empty registry is a hard precondition failure
/// for the whole run: without entities there is nothing to match filings
/// against.
pub fn load_entities<P: AsRef<Path>>(path: P) -> Result<Vec<TrackedEntity>, AppError> {
    let path = path.as_ref();

    let raw = fs::read_to_string(path).map_err(|e| {
        AppError::Config(format!(
            "entity registry not readable at {}: {} (generate it before running the pipeline)",
            path.display(),
            e
        ))
    })?;

    let entities: Vec<TrackedEntity> = serde_json::from_str(&raw).map_err(|e| {
        AppError::Config(format!(
            "entity registry at {} is not a JSON list of companies: {}",
            path.display(),
            e
        ))
    })?;

    if entities.is_empty() {
        return Err(AppError::Config(format!(
            "entity registry at {} contains no companies",
            path.display()
        )));
    }

    tracing::info!("Loaded {} tracked entities from {}", entities.len(), path.display());
    Ok(entities)
}
