//! Paper sources.
//!
//! Each source implements [`PaperSource`], a capability interface with a
//! fetch step and a parse step. The aggregator is source-agnostic: it drives
//! every source the same way and never matches on the concrete type.
//!
//! # Supported Sources
//!
//! | Source | Module | Method | Notes |
//! |--------|--------|--------|-------|
//! | arXiv | [`arxiv`] | Atom search API | One query per search phrase, date-windowed |
//! | CVPR / ICCV / WACV | [`conference`] | HTML scraping | CVF open access listing + per-paper detail pages |
//! | ECCV | [`conference`] | HTML scraping | ECVA listing, same markup as CVF |
//!
//! # Common Patterns
//!
//! - `fetch` performs exactly one request and reports failures as [`FetchError`]
//! - `parse` never fails: malformed entries are skipped (XML) or
//!   field-defaulted (HTML), and the rest of the payload is still returned

pub mod arxiv;
pub mod conference;

use crate::config::KeywordConfig;
use crate::error::{ConfigError, FetchError};
use crate::http::HttpClient;
use crate::models::{Candidate, DateWindow, QuerySpec, RawPayload};
use crate::pipeline::filter::TopicFilter;
use async_trait::async_trait;
use std::sync::Arc;

pub use arxiv::ArxivSource;
pub use conference::{Conference, ConferenceSource};

/// An origin system papers are discovered from.
#[async_trait]
pub trait PaperSource: Send + Sync {
    /// Label stored in `Record::source` and used as the per-source count key.
    fn name(&self) -> &str;

    /// Logical queries for one run over `window`.
    fn queries(&self, window: &DateWindow) -> Vec<QuerySpec>;

    /// Issue the single request behind `query`.
    async fn fetch(&self, query: &QuerySpec) -> Result<RawPayload, FetchError>;

    /// Extract candidates from a payload. Never fails.
    ///
    /// HTML sources use `filter` to skip detail fetches for listing entries
    /// whose title is off-topic; the aggregator still re-checks every candidate.
    async fn parse(&self, query: &QuerySpec, payload: RawPayload, filter: &TopicFilter) -> Vec<Candidate>;
}

/// Per-run knobs every source needs at construction.
#[derive(Debug, Clone)]
pub struct SourceOptions {
    pub max_results: usize,
    pub conference_year: i32,
    /// Alternative arXiv API endpoint, e.g. `http://export.arxiv.org/api/query`.
    pub arxiv_api_url: Option<String>,
}

/// Build the configured sources, in the order given.
///
/// Names are matched case-insensitively: `arxiv`, `cvpr`, `iccv`, `wacv`, `eccv`.
pub fn build_sources(
    names: &[String],
    http: &HttpClient,
    keywords: &Arc<KeywordConfig>,
    options: &SourceOptions,
) -> Result<Vec<Box<dyn PaperSource>>, ConfigError> {
    let mut sources: Vec<Box<dyn PaperSource>> = Vec::with_capacity(names.len());
    for name in names {
        let source: Box<dyn PaperSource> = match name.trim().to_lowercase().as_str() {
            "arxiv" => {
                let arxiv = ArxivSource::new(
                    http.clone(),
                    keywords.arxiv_search_terms.clone(),
                    options.max_results,
                );
                match &options.arxiv_api_url {
                    Some(url) => Box::new(arxiv.with_base_url(url.clone())),
                    None => Box::new(arxiv),
                }
            }
            other => match Conference::from_name(other) {
                Some(conference) => Box::new(ConferenceSource::new(
                    http.clone(),
                    conference,
                    options.conference_year,
                    options.max_results,
                )),
                None => return Err(ConfigError::UnknownSource(name.clone())),
            },
        };
        sources.push(source);
    }
    Ok(sources)
}
