// src/edinet/crawler.rs
use std::future::Future;
use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use tokio::sync::Semaphore;

use crate::edinet::client::RegistryClient;
use crate::edinet::models::CorpusRecord;

/// Outcome of a single day's listing fetch. Transport failures, non-2xx
/// statuses, and malformed payloads all degrade to `Degraded` so the caller
/// can count them without the crawl ever failing as a whole.
#[derive(Debug)]
pub enum DayListing {
    Ok {
        date: NaiveDate,
        records: Vec<CorpusRecord>,
    },
    Degraded {
        date: NaiveDate,
        reason: String,
    },
}

/// A day whose listing could not be fetched; it contributed zero records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DegradedDay {
    pub date: NaiveDate,
    pub reason: String,
}

/// Union of all per-day listings for a crawl, plus the days that degraded.
/// Record order across days is arbitrary; consumers key by `date`.
#[derive(Debug, Default)]
pub struct CrawlReport {
    pub records: Vec<CorpusRecord>,
    pub degraded: Vec<DegradedDay>,
}

impl CrawlReport {
    pub fn extend(&mut self, other: CrawlReport) {
        self.records.extend(other.records);
        self.degraded.extend(other.degraded);
    }
}

/// Every calendar day in `[start, end]`, inclusive.
pub fn date_range(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut dates = Vec::new();
    let mut current = start;
    while current <= end {
        dates.push(current);
        current += Duration::days(1);
    }
    dates
}

/// First and last day of the given month.
pub fn month_range(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let start = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next_month = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((start, next_month - Duration::days(1)))
}

/// Folds per-day outcomes into a single report. Pure so the union property
/// is testable without a network.
pub fn merge_day_listings(days: Vec<DayListing>) -> CrawlReport {
    let mut report = CrawlReport::default();
    for day in days {
        match day {
            DayListing::Ok { date, records } => {
                tracing::trace!("{}: merging {} records", date, records.len());
                report.records.extend(records);
            }
            DayListing::Degraded { date, reason } => {
                report.degraded.push(DegradedDay { date, reason })
            }
        }
    }
    report
}

/// Crawls every day in `[start, end]` against the listing endpoint, with at
/// most `concurrency_limit` requests in flight (semaphore admission is
/// FIFO). A failed day is logged and degrades to zero records; the call
/// itself always returns.
pub async fn crawl_range(
    client: &RegistryClient,
    start: NaiveDate,
    end: NaiveDate,
    concurrency_limit: usize,
) -> CrawlReport {
    crawl_range_with(start, end, concurrency_limit, |date| fetch_day(client, date)).await
}

/// The crawl loop itself, over any per-day fetch. `crawl_range` plugs in the
/// registry client; tests plug in instrumented fetches.
pub async fn crawl_range_with<F, Fut>(
    start: NaiveDate,
    end: NaiveDate,
    concurrency_limit: usize,
    fetch: F,
) -> CrawlReport
where
    F: Fn(NaiveDate) -> Fut,
    Fut: Future<Output = DayListing>,
{
    let dates = date_range(start, end);
    tracing::info!(
        "Crawling {} days from {} to {} (concurrency {})",
        dates.len(),
        start,
        end,
        concurrency_limit
    );

    let semaphore = Arc::new(Semaphore::new(concurrency_limit.max(1)));
    let fetch = &fetch;

    let mut tasks = Vec::with_capacity(dates.len());
    for date in dates {
        let permit_source = Arc::clone(&semaphore);
        tasks.push(async move {
            // Semaphore is never closed, so acquire cannot fail.
            let _permit = permit_source.acquire().await.expect("semaphore closed");
            fetch(date).await
        });
    }

    let days = futures::future::join_all(tasks).await;
    let report = merge_day_listings(days);

    if !report.degraded.is_empty() {
        tracing::warn!(
            "{} of the crawled days degraded to empty results",
            report.degraded.len()
        );
    }
    tracing::info!("Crawl collected {} filings", report.records.len());
    report
}

async fn fetch_day(client: &RegistryClient, date: NaiveDate) -> DayListing {
    match client.list_documents(date).await {
        Ok(filings) => {
            if filings.is_empty() {
                tracing::info!("  {}: no filings", date);
            } else {
                tracing::info!("  {}: {} filings", date, filings.len());
            }
            let records = filings
                .into_iter()
                .map(|filing| CorpusRecord { date, filing })
                .collect();
            DayListing::Ok { date, records }
        }
        Err(e) => {
            tracing::error!("  {}: listing failed: {}", date, e);
            DayListing::Degraded {
                date,
                reason: e.to_string(),
            }
        }
    }
}
