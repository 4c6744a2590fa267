use std::collections::HashMap;
use std::path::{Path, PathBuf};

use time::{Duration as TimeDuration, OffsetDateTime};
use tokio_util::sync::CancellationToken;
use trendwatch_core::persist::{save_snapshot, DatasetPaths};
use trendwatch_core::{DatasetSnapshot, Error, Result, VideoRecord};

use crate::lock::RunGuard;
use crate::normalize::{normalize, Rejection};
use crate::retry::RetryPolicy;
use crate::source::{MetadataSource, PageRequest, MAX_PAGE_SIZE};

#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Hard ceiling on pages requested in one run.
    pub max_pages: u32,
    pub page_size: u32,
    /// Stop once this many distinct videos are held.
    pub max_results: Option<usize>,
    /// Drop videos with fewer views.
    pub min_views: u64,
    pub retry: RetryPolicy,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            max_pages: 20,
            page_size: MAX_PAGE_SIZE,
            max_results: None,
            min_views: 0,
            retry: RetryPolicy::default(),
        }
    }
}

/// Per-run counters, logged when a run finishes.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CollectStats {
    pub pages: u32,
    pub received: u64,
    pub accepted: u64,
    pub rejected_missing_id: u64,
    pub rejected_bad_time: u64,
    pub below_min_views: u64,
    pub duplicates: u64,
    pub hit_page_ceiling: bool,
}

#[derive(Debug, Clone)]
pub struct IngestReport {
    pub path: PathBuf,
    pub records: usize,
    pub source_count: u64,
    pub fingerprint: String,
    pub stats: CollectStats,
}

pub struct Collector<S> {
    source: S,
    config: CollectorConfig,
}

impl<S: MetadataSource> Collector<S> {
    pub fn new(source: S, config: CollectorConfig) -> Self {
        Self { source, config }
    }

    /// Gather every short matching `query` published in the last `days`
    /// days into a deduplicated snapshot.
    ///
    /// `cancel` is checked before each page request; a page already in
    /// flight is finished first.
    pub async fn collect(&self, query: &str, days: u32, cancel: &CancellationToken) -> Result<DatasetSnapshot> {
        self.collect_with_stats(query, days, cancel).await.map(|(snap, _)| snap)
    }

    pub async fn collect_with_stats(
        &self,
        query: &str,
        days: u32,
        cancel: &CancellationToken,
    ) -> Result<(DatasetSnapshot, CollectStats)> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::invalid("query must not be empty"));
        }
        if days == 0 {
            return Err(Error::invalid("days must be positive"));
        }

        let started = OffsetDateTime::now_utc();
        let published_after = started - TimeDuration::days(i64::from(days));
        let mut request = PageRequest {
            query: query.to_string(),
            published_after,
            page_token: None,
            page_size: self.config.page_size.clamp(1, MAX_PAGE_SIZE),
        };
        tracing::info!(query, days, %published_after, max_pages = self.config.max_pages, "collection started");

        let mut stats = CollectStats::default();
        let mut by_id: HashMap<String, VideoRecord> = HashMap::new();
        loop {
            if cancel.is_cancelled() {
                tracing::warn!(pages = stats.pages, "collection cancelled");
                return Err(Error::Cancelled);
            }
            if stats.pages >= self.config.max_pages {
                stats.hit_page_ceiling = true;
                tracing::warn!(max_pages = self.config.max_pages, "page ceiling reached, stopping");
                break;
            }

            let page = self
                .config
                .retry
                .run("fetch_page", || self.source.fetch_page(&request))
                .await
                .map_err(|e| Error::SourceUnavailable(e.to_string()))?;
            stats.pages += 1;
            stats.received += page.items.len() as u64;

            for raw in page.items {
                let rec = match normalize(raw) {
                    Ok(rec) => rec,
                    Err(Rejection::MissingId) => {
                        stats.rejected_missing_id += 1;
                        continue;
                    }
                    Err(Rejection::BadPublishTime(value)) => {
                        tracing::debug!(%value, "dropping item with unparseable publish time");
                        stats.rejected_bad_time += 1;
                        continue;
                    }
                };
                if rec.view_count < self.config.min_views {
                    stats.below_min_views += 1;
                    continue;
                }
                stats.accepted += 1;
                let full = self.config.max_results.is_some_and(|max| by_id.len() >= max);
                if by_id.contains_key(&rec.id) {
                    // later sighting wins
                    stats.duplicates += 1;
                    by_id.insert(rec.id.clone(), rec);
                } else if !full {
                    by_id.insert(rec.id.clone(), rec);
                }
            }
            tracing::debug!(page = stats.pages, held = by_id.len(), "page processed");

            if self.config.max_results.is_some_and(|max| by_id.len() >= max) {
                break;
            }
            match page.next_page_token {
                Some(token) if !token.is_empty() => request.page_token = Some(token),
                _ => break,
            }
        }

        if by_id.is_empty() {
            return Err(Error::EmptyResult { query: query.to_string(), days });
        }
        let snapshot = DatasetSnapshot::assemble(query, days, started, stats.accepted, by_id.into_values())?;
        tracing::info!(
            records = snapshot.len(),
            pages = stats.pages,
            received = stats.received,
            duplicates = stats.duplicates,
            rejected = stats.rejected_missing_id + stats.rejected_bad_time,
            "collection finished"
        );
        Ok((snapshot, stats))
    }

    /// One ingestion run: take the run lock for `out`, collect, and replace
    /// the dataset file. Nothing is written unless collection succeeds.
    pub async fn ingest(
        &self,
        query: &str,
        days: u32,
        out: &Path,
        cancel: &CancellationToken,
    ) -> Result<IngestReport> {
        let _guard = RunGuard::acquire(DatasetPaths::new(out).lock())?;
        let (snapshot, stats) = self.collect_with_stats(query, days, cancel).await?;
        let report = IngestReport {
            path: out.to_path_buf(),
            records: snapshot.len(),
            source_count: snapshot.meta().source_count,
            fingerprint: snapshot.fingerprint().to_string(),
            stats,
        };
        // write + fsync + rename block, keep them off the runtime workers
        let target = report.path.clone();
        tokio::task::spawn_blocking(move || save_snapshot(&target, &snapshot))
            .await
            .map_err(|e| Error::Io(std::io::Error::other(format!("dataset write task failed: {e}"))))??;
        Ok(report)
    }
}
