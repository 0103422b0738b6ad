//! Data models for discovered papers and pipeline results.
//!
//! This module defines the core data structures used throughout the application:
//! - [`QuerySpec`] / [`DateWindow`]: what a source is asked for
//! - [`RawPayload`]: the unparsed response body of one request
//! - [`Candidate`]: a partially formed paper extracted by a parser
//! - [`Record`]: the canonical, classified paper
//! - [`PaperDigest`]: the merged output of one run, also the snapshot schema

use crate::utils::{normalize_whitespace, slugify_title, truncate_summary};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Maximum number of authors kept on a record, in citation order.
pub const MAX_AUTHORS: usize = 5;

/// One of the two mutually exclusive paper categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
pub enum Category {
    #[serde(alias = "人脸识别")]
    Recognition,
    #[serde(alias = "人脸生成")]
    Generation,
}

impl Category {
    /// Short tag used in Markdown listings.
    pub fn tag(&self) -> &'static str {
        match self {
            Category::Recognition => "🔍 Recognition",
            Category::Generation => "🎨 Generation",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Recognition => write!(f, "Face Recognition"),
            Category::Generation => write!(f, "Face Generation"),
        }
    }
}

/// Inclusive time window `[now - days, now]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl DateWindow {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self { from, to }
    }

    /// Window ending at `now` and reaching `days` back.
    ///
    /// `None` when the start would fall outside the representable date range.
    pub fn lookback(days: u32, now: DateTime<Utc>) -> Option<Self> {
        let span = TimeDelta::try_days(i64::from(days))?;
        let from = now.checked_sub_signed(span)?;
        Some(Self::new(from, now))
    }

    /// Bounds in the `YYYYMMDDHHMM` form used by the arXiv query grammar.
    pub fn compact_bounds(&self) -> (String, String) {
        (
            self.from.format("%Y%m%d%H%M").to_string(),
            self.to.format("%Y%m%d%H%M").to_string(),
        )
    }
}

/// One logical query against a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySpec {
    /// Search keyword (API sources) or listing label (HTML sources).
    pub keyword: String,
    pub window: DateWindow,
    /// Result-count cap for this query.
    pub max_results: usize,
}

/// Unparsed body returned by one request.
#[derive(Debug, Clone)]
pub struct RawPayload {
    /// The URL that produced the body; used to resolve relative links.
    pub url: String,
    pub body: String,
}

/// A paper as extracted by a parser, before relevance filtering and classification.
///
/// Text fields hold whatever the source provided; normalization happens when
/// the candidate is turned into a [`Record`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Candidate {
    /// Source-specific identifier, if the source exposes one.
    pub id: Option<String>,
    pub title: String,
    pub authors: Vec<String>,
    pub summary: String,
    pub pdf_link: String,
    pub landing_link: String,
    /// `YYYY-MM-DD`.
    pub published: String,
    pub source: String,
    /// The query keyword that surfaced this candidate.
    pub query: String,
}

/// Canonical normalized representation of one discovered paper.
///
/// Records are built once by [`Record::from_candidate`] and never mutated
/// afterwards. Invariants: `id` is non-empty, at most [`MAX_AUTHORS`] authors,
/// `summary` is at most 503 characters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Record {
    pub id: String,
    pub title: String,
    pub authors: Vec<String>,
    pub summary: String,
    #[serde(default)]
    pub pdf_link: String,
    #[serde(default, alias = "arxiv_link")]
    pub landing_link: String,
    #[serde(rename = "published")]
    pub published_date: String,
    pub category: Category,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub matched_keywords: BTreeSet<String>,
}

impl Record {
    /// Normalize a candidate into a record carrying its classification.
    ///
    /// When the candidate has no usable identifier, a synthetic one is derived
    /// from the source label and the slugified title.
    pub fn from_candidate(
        candidate: Candidate,
        category: Category,
        matched_keywords: BTreeSet<String>,
    ) -> Self {
        let title = normalize_whitespace(&candidate.title);
        let id = candidate
            .id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| synthetic_id(&candidate.source, &title));

        let authors = candidate
            .authors
            .iter()
            .map(|a| normalize_whitespace(a))
            .filter(|a| !a.is_empty())
            .take(MAX_AUTHORS)
            .collect();

        Record {
            id,
            title,
            authors,
            summary: truncate_summary(&candidate.summary),
            pdf_link: candidate.pdf_link.trim().to_string(),
            landing_link: candidate.landing_link.trim().to_string(),
            published_date: candidate.published.trim().to_string(),
            category,
            source: candidate.source,
            matched_keywords,
        }
    }
}

/// Synthetic identifier for sources that expose none.
pub fn synthetic_id(source: &str, title: &str) -> String {
    let source = slugify_title(source.trim());
    let title = slugify_title(title.trim());
    match (source.is_empty(), title.is_empty()) {
        (false, false) => format!("{source}:{title}"),
        (false, true) => format!("{source}:untitled"),
        (true, false) => title,
        (true, true) => "unknown:untitled".to_string(),
    }
}

/// The merged result of one run.
///
/// The field names double as the persisted snapshot schema (`papers.json`).
/// `sources` holds each source's yield before global deduplication.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct PaperDigest {
    pub all: Vec<Record>,
    #[serde(default)]
    pub face_recognition: Vec<Record>,
    #[serde(default)]
    pub face_generation: Vec<Record>,
    #[serde(default)]
    pub sources: BTreeMap<String, usize>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub failed_sources: BTreeSet<String>,
}

impl PaperDigest {
    /// Build a digest from an already sorted, deduplicated sequence.
    ///
    /// The category subsets preserve the order of `all`.
    pub fn new(
        all: Vec<Record>,
        sources: BTreeMap<String, usize>,
        failed_sources: BTreeSet<String>,
    ) -> Self {
        let (face_recognition, face_generation): (Vec<Record>, Vec<Record>) = all
            .iter()
            .cloned()
            .partition(|r| r.category == Category::Recognition);
        Self {
            all,
            face_recognition,
            face_generation,
            sources,
            failed_sources,
        }
    }

    pub fn by_category(&self, category: Category) -> &[Record] {
        match category {
            Category::Recognition => &self.face_recognition,
            Category::Generation => &self.face_generation,
        }
    }

    /// True when the run produced no records at all.
    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }

    /// True when every attempted source failed, as opposed to sources
    /// answering with nothing relevant.
    pub fn all_sources_failed(&self) -> bool {
        !self.sources.is_empty() && self.failed_sources.len() == self.sources.len()
    }
}
