// src/edinet/client.rs
use chrono::NaiveDate;
use reqwest::header;

use crate::config::PipelineConfig;
use crate::edinet::models::{Filing, ListingResponse};
use crate::utils::error::EdinetError;

const USER_AGENT: &str = concat!("edinet_corpus/", env!("CARGO_PKG_VERSION"));

/// Document type discriminator for the listing endpoint: 2 = include the
/// filing metadata, not just the day's summary counts.
const LISTING_DOC_TYPE: &str = "2";

/// Rendition type for the archive endpoint: 1 = the full submission archive
/// including the XBRL instance documents.
const ARCHIVE_RENDITION_TYPE: &str = "1";

/// Thin client over the EDINET v2 API. One instance is shared across the
/// whole run; concurrency is capped by the crawler/downloader, not here.
pub struct RegistryClient {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
}

impl RegistryClient {
    pub fn new(cfg: &PipelineConfig) -> Result<Self, EdinetError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(cfg.request_timeout)
            .build()?;

        Ok(Self {
            http,
            api_base: cfg.api_base.clone(),
            api_key: cfg.api_key.clone(),
        })
    }

    /// Fetches the full document listing for a single calendar day.
    ///
    /// An empty `results` array is a normal no-filings day, not an error.
    /// Transport failures and non-2xx statuses surface as `EdinetError`;
    /// the crawler decides how to degrade.
    pub async fn list_documents(&self, date: NaiveDate) -> Result<Vec<Filing>, EdinetError> {
        let url = format!("{}/documents.json", self.api_base);
        let date_str = date.format("%Y-%m-%d").to_string();

        let response = self
            .http
            .get(&url)
            .query(&[
                ("date", date_str.as_str()),
                ("type", LISTING_DOC_TYPE),
                ("Subscription-Key", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!("HTTP error status {} listing documents for {}", status, date_str);
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                return Err(EdinetError::RateLimited);
            }
            return Err(EdinetError::Http(status));
        }

        let listing: ListingResponse = response
            .json()
            .await
            .map_err(|e| EdinetError::Parse(format!("listing for {}: {}", date_str, e)))?;

        tracing::debug!("{}: {} filings listed", date_str, listing.results.len());
        Ok(listing.results)
    }

    /// Downloads a filing's submission archive (zip bytes).
    pub async fn download_archive(&self, doc_id: &str) -> Result<Vec<u8>, EdinetError> {
        let url = format!("{}/documents/{}", self.api_base, doc_id);

        let response = self
            .http
            .get(&url)
            .query(&[
                ("type", ARCHIVE_RENDITION_TYPE),
                ("Subscription-Key", self.api_key.as_str()),
            ])
            .header(header::ACCEPT, "application/octet-stream,*/*")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!("HTTP error status {} downloading archive {}", status, doc_id);
            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(EdinetError::DocumentNotFound(doc_id.to_string()));
            }
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                return Err(EdinetError::RateLimited);
            }
            return Err(EdinetError::Http(status));
        }

        let body = response.bytes().await?;
        tracing::debug!("Downloaded {} bytes for document {}", body.len(), doc_id);
        Ok(body.to_vec())
    }
}
