//! Multi-source orchestration.
//!
//! The [`Aggregator`] runs fetch → parse → filter → classify for every
//! configured source, isolates failures per query and per source, then merges
//! all per-source lists into one [`PaperDigest`]:
//!
//! 1. concatenate in configured source order
//! 2. deduplicate by `id` (first seen wins)
//! 3. stable sort by `published` descending
//! 4. split by category
//!
//! Sources run concurrently; results are re-ordered by source position before
//! the merge so the output never depends on completion order.

use super::classify::Classifier;
use super::dedupe::dedupe;
use super::filter::TopicFilter;
use crate::config::KeywordConfig;
use crate::models::{Candidate, DateWindow, PaperDigest, Record};
use crate::scrapers::PaperSource;
use futures::FutureExt;
use futures::stream::{self, StreamExt};
use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};

/// Default number of sources processed at the same time.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// What one source contributed to a run.
#[derive(Debug, Clone)]
pub struct SourceYield {
    pub name: String,
    pub records: Vec<Record>,
    /// True when the source produced no payload at all (every query failed,
    /// the parser panicked, or the run was cancelled before it finished).
    pub failed: bool,
}

impl SourceYield {
    fn failed(name: &str) -> Self {
        Self {
            name: name.to_string(),
            records: Vec::new(),
            failed: true,
        }
    }
}

/// Source-agnostic pipeline driver.
pub struct Aggregator {
    sources: Vec<Box<dyn PaperSource>>,
    filter: TopicFilter,
    classifier: Classifier,
    concurrency: usize,
}

impl Aggregator {
    pub fn new(sources: Vec<Box<dyn PaperSource>>, keywords: Arc<KeywordConfig>) -> Self {
        Self {
            sources,
            filter: TopicFilter::new(Arc::clone(&keywords)),
            classifier: Classifier::new(keywords),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Process at most `concurrency` sources at once (`1` runs them sequentially).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// Collect papers for `window`, giving up early when `shutdown` resolves.
    ///
    /// On shutdown, in-flight requests are dropped; sources that already
    /// finished keep their records and the rest are reported with a zero count.
    #[instrument(level = "info", skip_all, fields(from = %window.from, to = %window.to, sources = self.sources.len()))]
    pub async fn fetch_window<F>(&self, window: DateWindow, shutdown: F) -> PaperDigest
    where
        F: Future<Output = ()>,
    {
        let t0 = Instant::now();
        let mut slots: Vec<Option<SourceYield>> = vec![None; self.sources.len()];

        let mut runs = stream::iter(self.sources.iter().enumerate())
            .map(|(i, source)| {
                let window = &window;
                async move {
                    let outcome = AssertUnwindSafe(self.run_source(source.as_ref(), window))
                        .catch_unwind()
                        .await;
                    let source_yield = match outcome {
                        Ok(source_yield) => source_yield,
                        Err(_) => {
                            error!(source = %source.name(), "Source panicked; counting it as failed");
                            SourceYield::failed(source.name())
                        }
                    };
                    (i, source_yield)
                }
            })
            .buffer_unordered(self.concurrency);

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    let finished = slots.iter().filter(|s| s.is_some()).count();
                    warn!(finished, total = slots.len(), "Shutdown requested; keeping finished sources only");
                    break;
                }
                next = runs.next() => match next {
                    Some((i, source_yield)) => slots[i] = Some(source_yield),
                    None => break,
                },
            }
        }
        drop(runs);

        let yields: Vec<SourceYield> = slots
            .into_iter()
            .zip(self.sources.iter())
            .map(|(slot, source)| slot.unwrap_or_else(|| SourceYield::failed(source.name())))
            .collect();

        let digest = merge(yields);
        info!(
            total = digest.all.len(),
            recognition = digest.face_recognition.len(),
            generation = digest.face_generation.len(),
            failed = digest.failed_sources.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Aggregation complete"
        );
        digest
    }

    /// Run every query of one source. Query failures are logged and skipped.
    #[instrument(level = "info", skip_all, fields(source = %source.name()))]
    async fn run_source(&self, source: &dyn PaperSource, window: &DateWindow) -> SourceYield {
        let queries = source.queries(window);
        let mut records = Vec::new();
        let mut succeeded = 0usize;

        for query in &queries {
            let payload = match source.fetch(query).await {
                Ok(payload) => payload,
                Err(e) => {
                    warn!(query = %query.keyword, timeout = e.is_timeout(), error = %e, "Fetch failed; skipping query");
                    continue;
                }
            };
            succeeded += 1;
            let candidates = source.parse(query, payload, &self.filter).await;
            let kept = self.process(candidates);
            debug!(query = %query.keyword, kept = kept.len(), "Query processed");
            records.extend(kept);
        }

        let records = dedupe(records);
        let failed = !queries.is_empty() && succeeded == 0;
        if failed {
            error!(queries = queries.len(), "Every query failed; source yields nothing");
        } else {
            info!(count = records.len(), queries = queries.len(), succeeded, "Source finished");
        }
        SourceYield {
            name: source.name().to_string(),
            records,
            failed,
        }
    }

    /// Drop off-topic candidates and classify the rest.
    pub fn process(&self, candidates: Vec<Candidate>) -> Vec<Record> {
        candidates
            .into_iter()
            .filter_map(|candidate| {
                let matched = self.filter.matched_terms(&candidate.title, &candidate.summary);
                if matched.is_empty() {
                    debug!(title = %candidate.title, query = %candidate.query, "Off-topic candidate dropped");
                    return None;
                }
                let (category, evidence) = self
                    .classifier
                    .classify_with_evidence(&candidate.title, &candidate.summary);
                debug!(title = %candidate.title, %category, evidence = ?evidence, "Classified");
                Some(Record::from_candidate(candidate, category, matched))
            })
            .collect()
    }
}

/// Merge per-source yields (in source order) into the final digest.
///
/// `sources` counts are taken before global deduplication.
pub fn merge(yields: Vec<SourceYield>) -> PaperDigest {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut failed: BTreeSet<String> = BTreeSet::new();
    let mut all = Vec::new();

    for source_yield in yields {
        *counts.entry(source_yield.name.clone()).or_insert(0) += source_yield.records.len();
        if source_yield.failed {
            failed.insert(source_yield.name.clone());
        }
        all.extend(source_yield.records);
    }

    let mut all = dedupe(all);
    // Stable: equal dates keep source-traversal order.
    all.sort_by(|a, b| b.published_date.cmp(&a.published_date));

    PaperDigest::new(all, counts, failed)
}
