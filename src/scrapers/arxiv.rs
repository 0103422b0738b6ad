//! arXiv Atom API source.
//!
//! Papers are discovered through the [arXiv search API](https://info.arxiv.org/help/api/),
//! one request per search phrase, restricted to the run's submission window
//! and sorted newest first.
//!
//! # URL Pattern
//!
//! ```text
//! http://export.arxiv.org/api/query?search_query=all:"face detection" AND submittedDate:[202401010000 TO 202401080000]
//!     &start=0&max_results=10&sortBy=submittedDate&sortOrder=descending
//! ```
//!
//! The response is an Atom feed; entries are read with a streaming
//! `quick-xml` reader so one malformed entry never costs the others.

use super::PaperSource;
use crate::error::{FetchError, ParseError};
use crate::http::HttpClient;
use crate::models::{Candidate, DateWindow, QuerySpec, RawPayload};
use crate::pipeline::filter::TopicFilter;
use crate::utils::truncate_for_log;
use async_trait::async_trait;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tracing::{debug, info, instrument, warn};
use url::Url;

pub const ARXIV_API_URL: &str = "http://export.arxiv.org/api/query";
pub const ARXIV_ABS_URL: &str = "https://arxiv.org/abs";
const SOURCE_NAME: &str = "arXiv";

/// The arXiv search API.
#[derive(Debug, Clone)]
pub struct ArxivSource {
    http: HttpClient,
    base_url: String,
    search_terms: Vec<String>,
    max_results: usize,
}

impl ArxivSource {
    pub fn new(http: HttpClient, search_terms: Vec<String>, max_results: usize) -> Self {
        Self {
            http,
            base_url: ARXIV_API_URL.to_string(),
            search_terms,
            max_results,
        }
    }

    /// Point the source at another API endpoint (mirrors, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Search URL for one query.
    pub fn query_url(&self, query: &QuerySpec) -> Result<Url, url::ParseError> {
        let (from, to) = query.window.compact_bounds();
        let search = format!(
            "all:\"{}\" AND submittedDate:[{} TO {}]",
            query.keyword, from, to
        );
        let max_results = query.max_results.to_string();
        Url::parse_with_params(
            &self.base_url,
            &[
                ("search_query", search.as_str()),
                ("start", "0"),
                ("max_results", max_results.as_str()),
                ("sortBy", "submittedDate"),
                ("sortOrder", "descending"),
            ],
        )
    }
}

#[async_trait]
impl PaperSource for ArxivSource {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    fn queries(&self, window: &DateWindow) -> Vec<QuerySpec> {
        self.search_terms
            .iter()
            .map(|term| QuerySpec {
                keyword: term.clone(),
                window: *window,
                max_results: self.max_results,
            })
            .collect()
    }

    #[instrument(level = "info", skip_all, fields(query = %query.keyword))]
    async fn fetch(&self, query: &QuerySpec) -> Result<RawPayload, FetchError> {
        let url = self
            .query_url(query)
            .map_err(|e| FetchError::new(SOURCE_NAME, &query.keyword, e))?;
        debug!(%url, "Querying arXiv");
        let body = self
            .http
            .get_text(SOURCE_NAME, &query.keyword, url.as_str())
            .await?;
        Ok(RawPayload {
            url: url.to_string(),
            body,
        })
    }

    async fn parse(&self, query: &QuerySpec, payload: RawPayload, _filter: &TopicFilter) -> Vec<Candidate> {
        let mut candidates = parse_feed(&payload.body, &query.keyword);
        if candidates.is_empty() && !payload.body.trim().is_empty() {
            debug!(
                url = %payload.url,
                body_preview = %truncate_for_log(&payload.body, 300),
                "Feed had no usable entries"
            );
        }
        candidates.truncate(query.max_results);
        info!(
            query = %query.keyword,
            count = candidates.len(),
            "Parsed arXiv entries"
        );
        candidates
    }
}

/// Fields collected while walking one `<entry>`.
#[derive(Debug, Default)]
struct EntryFields {
    title: String,
    summary: String,
    id: String,
    published: String,
    authors: Vec<String>,
    author_name: String,
    pdf_link: String,
}

impl EntryFields {
    fn into_candidate(self, query: &str) -> Result<Candidate, ParseError> {
        let title = unescape_text(&self.title);
        if title.trim().is_empty() {
            return Err(ParseError::MissingField("title"));
        }
        let id = paper_id(&unescape_text(&self.id)).ok_or(ParseError::MissingField("id"))?;
        let published = unescape_text(&self.published);
        let published = published.trim();
        Ok(Candidate {
            landing_link: format!("{}/{}", ARXIV_ABS_URL, id),
            id: Some(id),
            title,
            authors: self.authors,
            summary: unescape_text(&self.summary),
            pdf_link: self.pdf_link,
            published: published.get(..10).unwrap_or(published).to_string(),
            source: SOURCE_NAME.to_string(),
            query: query.to_string(),
        })
    }
}

/// Paper id from an entry's `<id>` URL, e.g. `http://arxiv.org/abs/2401.00001v1`
/// gives `2401.00001v1` and `http://arxiv.org/abs/cs/0112017v1` gives `cs/0112017v1`.
fn paper_id(raw: &str) -> Option<String> {
    let raw = raw.trim().trim_end_matches('/');
    let id = match raw.split_once("/abs/") {
        Some((_, rest)) => rest,
        None => raw.rsplit('/').next().unwrap_or(raw),
    };
    (!id.is_empty()).then(|| id.to_string())
}

fn unescape_text(raw: &str) -> String {
    match quick_xml::escape::unescape(raw) {
        Ok(text) => text.into_owned(),
        Err(_) => raw.to_string(),
    }
}

fn attr_value(e: &BytesStart<'_>, name: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == name)
        .map(|a| unescape_text(&String::from_utf8_lossy(&a.value)))
}

/// Extract candidates from an arXiv Atom feed.
///
/// Entries missing a title or id are skipped. A markup error stops the walk,
/// but every entry completed before it is kept.
pub fn parse_feed(xml: &str, query: &str) -> Vec<Candidate> {
    let mut reader = Reader::from_str(xml);
    let mut candidates = Vec::new();
    let mut entry: Option<EntryFields> = None;
    // Local element names below the current <entry>.
    let mut path: Vec<Vec<u8>> = Vec::new();
    let mut skipped = 0usize;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.local_name().as_ref().to_vec();
                if let Some(fields) = entry.as_mut() {
                    if path.is_empty() && name == b"link" {
                        take_pdf_link(fields, &e);
                    }
                    if path.len() == 1 && path[0] == b"author" && name == b"name" {
                        fields.author_name.clear();
                    }
                    path.push(name);
                } else if name == b"entry" {
                    entry = Some(EntryFields::default());
                    path.clear();
                }
            }
            Ok(Event::Empty(e)) => {
                if let Some(fields) = entry.as_mut() {
                    if path.is_empty() && e.local_name().as_ref() == b"link" {
                        take_pdf_link(fields, &e);
                    }
                }
            }
            Ok(Event::Text(t)) => {
                if let Some(fields) = entry.as_mut() {
                    push_text(fields, &path, &String::from_utf8_lossy(&t));
                }
            }
            Ok(Event::GeneralRef(r)) => {
                if let Some(fields) = entry.as_mut() {
                    let reference = format!("&{};", String::from_utf8_lossy(&r));
                    push_text(fields, &path, &reference);
                }
            }
            Ok(Event::CData(c)) => {
                if let Some(fields) = entry.as_mut() {
                    let text = quick_xml::escape::escape(String::from_utf8_lossy(&c).as_ref()).into_owned();
                    push_text(fields, &path, &text);
                }
            }
            Ok(Event::End(e)) => {
                if entry.is_none() {
                    continue;
                }
                if path.is_empty() {
                    if e.local_name().as_ref() == b"entry" {
                        if let Some(fields) = entry.take() {
                            match fields.into_candidate(query) {
                                Ok(candidate) => candidates.push(candidate),
                                Err(err) => {
                                    skipped += 1;
                                    debug!(error = %err, "Skipping malformed arXiv entry");
                                }
                            }
                        }
                    }
                    continue;
                }
                let closed = path.pop();
                if let (Some(fields), Some(closed)) = (entry.as_mut(), closed) {
                    if closed == b"name" && path.len() == 1 && path[0] == b"author" {
                        let name = unescape_text(&fields.author_name);
                        let name = name.trim();
                        if !name.is_empty() {
                            fields.authors.push(name.to_string());
                        }
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                let err = ParseError::Markup(e.to_string());
                warn!(
                    position = reader.buffer_position(),
                    error = %err,
                    kept = candidates.len(),
                    "arXiv feed is malformed; keeping entries parsed so far"
                );
                break;
            }
            _ => {}
        }
    }

    if skipped > 0 {
        info!(skipped, "Dropped arXiv entries missing required fields");
    }
    candidates
}

fn take_pdf_link(fields: &mut EntryFields, e: &BytesStart<'_>) {
    if !fields.pdf_link.is_empty() {
        return;
    }
    if attr_value(e, b"title").as_deref() == Some("pdf") {
        if let Some(href) = attr_value(e, b"href") {
            fields.pdf_link = href;
        }
    }
}

/// Append raw (still escaped) text to the field addressed by `path`.
fn push_text(fields: &mut EntryFields, path: &[Vec<u8>], text: &str) {
    let target = match path {
        [one] if one == b"title" => &mut fields.title,
        [one] if one == b"summary" => &mut fields.summary,
        [one] if one == b"id" => &mut fields.id,
        [one] if one == b"published" => &mut fields.published,
        [author, name] if author == b"author" && name == b"name" => &mut fields.author_name,
        _ => return,
    };
    target.push_str(text);
}
