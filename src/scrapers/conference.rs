//! Conference proceedings scraper for CVF open access and ECVA listings.
//!
//! [CVF open access](https://openaccess.thecvf.com) (CVPR, ICCV, WACV) and
//! [ECVA](https://www.ecva.net/papers.php) (ECCV) share the same markup: a
//! listing page with one `dt.ptitle` per paper linking to a detail page that
//! carries the abstract, the author line, a PDF link and a bibtex block.
//!
//! Scraping is two-phase:
//!
//! 1. **Listing**: one request for the whole proceedings page, yielding
//!    title + detail URL pairs
//! 2. **Detail**: one request per on-topic listing entry, best effort. A
//!    detail page that cannot be fetched or read leaves the candidate with
//!    listing-level fields only.

use super::PaperSource;
use crate::error::FetchError;
use crate::http::HttpClient;
use crate::models::{Candidate, DateWindow, QuerySpec, RawPayload};
use crate::pipeline::filter::TopicFilter;
use crate::utils::normalize_whitespace;
use async_trait::async_trait;
use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::{debug, info, instrument, warn};
use url::Url;

static LISTING_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("dt.ptitle a[href]").expect("valid listing selector"));
static TITLE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("#papertitle").expect("valid title selector"));
static ABSTRACT_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("#abstract").expect("valid abstract selector"));
static AUTHORS_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("#authors").expect("valid authors selector"));
static AUTHORS_ITALIC_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("#authors i").expect("valid authors selector"));
static LINK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("valid link selector"));

static BIB_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\byear\s*=\s*\{\s*(\d{4})\s*\}").expect("valid year regex"));
static BIB_MONTH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bmonth\s*=\s*\{\s*([A-Za-z]+)\.?\s*\}").expect("valid month regex"));

/// Conferences with a CVF-style proceedings listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conference {
    Cvpr,
    Iccv,
    Wacv,
    Eccv,
}

impl Conference {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "cvpr" => Some(Conference::Cvpr),
            "iccv" => Some(Conference::Iccv),
            "wacv" => Some(Conference::Wacv),
            "eccv" => Some(Conference::Eccv),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Conference::Cvpr => "CVPR",
            Conference::Iccv => "ICCV",
            Conference::Wacv => "WACV",
            Conference::Eccv => "ECCV",
        }
    }

    /// Most recent edition held in or before `year`.
    ///
    /// ICCV runs in odd years and ECCV in even years; CVPR and WACV are annual.
    pub fn edition_year(&self, year: i32) -> i32 {
        match self {
            Conference::Iccv if year % 2 == 0 => year - 1,
            Conference::Eccv if year % 2 != 0 => year - 1,
            _ => year,
        }
    }

    pub fn listing_url(&self, year: i32) -> String {
        match self {
            Conference::Cvpr | Conference::Iccv => {
                format!("https://openaccess.thecvf.com/{}{}?day=all", self.label(), year)
            }
            Conference::Wacv => format!("https://openaccess.thecvf.com/{}{}", self.label(), year),
            Conference::Eccv => "https://www.ecva.net/papers.php".to_string(),
        }
    }

    /// Path fragment a listing link must contain to belong to `year`.
    ///
    /// The ECVA page lists every edition at once; CVF pages are per edition.
    fn edition_marker(&self, year: i32) -> Option<String> {
        match self {
            Conference::Eccv => Some(format!("eccv_{}", year)),
            _ => None,
        }
    }
}

/// One `dt.ptitle` entry of a proceedings listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub title: String,
    pub url: String,
}

/// Fields scraped from a paper's detail page. Missing fields are empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetailFields {
    pub title: String,
    pub authors: Vec<String>,
    pub summary: String,
    pub pdf_link: String,
    /// `YYYY-MM-DD` from the bibtex block, if present.
    pub published: Option<String>,
}

/// A CVF-style proceedings listing for one conference edition.
#[derive(Debug, Clone)]
pub struct ConferenceSource {
    http: HttpClient,
    conference: Conference,
    year: i32,
    max_results: usize,
    listing_url: String,
}

impl ConferenceSource {
    /// `year` is rounded down to the conference's latest edition.
    pub fn new(http: HttpClient, conference: Conference, year: i32, max_results: usize) -> Self {
        let year = conference.edition_year(year);
        Self {
            http,
            conference,
            year,
            max_results,
            listing_url: conference.listing_url(year),
        }
    }

    fn id_prefix(&self) -> String {
        format!("{}{}", self.conference.label().to_lowercase(), self.year)
    }

    /// Merge listing and (optional) detail fields into a candidate.
    fn assemble(&self, query: &str, entry: ListingEntry, detail: Option<DetailFields>) -> Candidate {
        let detail = detail.unwrap_or_default();
        let title = if entry.title.trim().is_empty() {
            detail.title
        } else {
            entry.title
        };
        Candidate {
            id: paper_stem(&entry.url).map(|stem| format!("{}:{}", self.id_prefix(), stem)),
            title,
            authors: detail.authors,
            summary: detail.summary,
            pdf_link: detail.pdf_link,
            landing_link: entry.url,
            published: detail
                .published
                .unwrap_or_else(|| format!("{}-01-01", self.year)),
            source: self.conference.label().to_string(),
            query: query.to_string(),
        }
    }
}

#[async_trait]
impl PaperSource for ConferenceSource {
    fn name(&self) -> &str {
        self.conference.label()
    }

    fn queries(&self, window: &DateWindow) -> Vec<QuerySpec> {
        vec![QuerySpec {
            keyword: format!("{}{}", self.conference.label(), self.year),
            window: *window,
            max_results: self.max_results,
        }]
    }

    #[instrument(level = "info", skip_all, fields(source = %self.conference.label(), url = %self.listing_url))]
    async fn fetch(&self, query: &QuerySpec) -> Result<RawPayload, FetchError> {
        let body = self
            .http
            .get_text(self.conference.label(), &query.keyword, &self.listing_url)
            .await?;
        Ok(RawPayload {
            url: self.listing_url.clone(),
            body,
        })
    }

    #[instrument(level = "info", skip_all, fields(source = %self.conference.label(), query = %query.keyword))]
    async fn parse(&self, query: &QuerySpec, payload: RawPayload, filter: &TopicFilter) -> Vec<Candidate> {
        let marker = self.conference.edition_marker(self.year);
        let listing = parse_listing(&payload.body, &payload.url, marker.as_deref());
        let total = listing.len();

        let on_topic: Vec<ListingEntry> = listing
            .into_iter()
            .filter(|entry| filter.is_relevant(&entry.title, ""))
            .take(query.max_results)
            .collect();
        info!(
            total,
            on_topic = on_topic.len(),
            "Indexed proceedings listing"
        );

        let label = self.conference.label();
        let keyword = query.keyword.as_str();
        let candidates: Vec<Candidate> = stream::iter(on_topic)
            .then(|entry| async move {
                let detail = match self.http.get_text(label, keyword, &entry.url).await {
                    Ok(body) => Some(parse_detail(&body, &entry.url)),
                    Err(e) => {
                        warn!(url = %entry.url, error = %e, "Detail page unavailable; keeping listing fields");
                        None
                    }
                };
                self.assemble(keyword, entry, detail)
            })
            .collect()
            .await;

        info!(count = candidates.len(), "Fetched proceedings details");
        candidates
    }
}

/// Extract title + absolute detail URL pairs from a proceedings listing.
///
/// When `edition_marker` is set, only links whose URL contains it are kept.
pub fn parse_listing(html: &str, page_url: &str, edition_marker: Option<&str>) -> Vec<ListingEntry> {
    let base = Url::parse(page_url).ok();
    let document = Html::parse_document(html);

    let mut entries = Vec::new();
    for element in document.select(&LISTING_SELECTOR) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let url = match base.as_ref().map(|b| b.join(href)) {
            Some(Ok(resolved)) => resolved.to_string(),
            _ => match Url::parse(href) {
                Ok(absolute) => absolute.to_string(),
                Err(e) => {
                    debug!(%href, error = %e, "Skipping unresolvable listing link");
                    continue;
                }
            },
        };
        if let Some(marker) = edition_marker {
            if !url.contains(marker) {
                continue;
            }
        }
        let title = normalize_whitespace(&element.text().collect::<Vec<_>>().join(" "));
        entries.push(ListingEntry { title, url });
    }
    entries
}

/// Scrape a paper detail page. Absent fields come back empty.
pub fn parse_detail(html: &str, page_url: &str) -> DetailFields {
    let document = Html::parse_document(html);
    let text_of = |selector: &Selector| {
        document
            .select(selector)
            .next()
            .map(|el| normalize_whitespace(&el.text().collect::<Vec<_>>().join(" ")))
            .unwrap_or_default()
    };

    let title = text_of(&*TITLE_SELECTOR);
    let summary = text_of(&*ABSTRACT_SELECTOR);

    let author_line = match text_of(&*AUTHORS_ITALIC_SELECTOR) {
        line if !line.is_empty() => line,
        _ => text_of(&*AUTHORS_SELECTOR),
    };
    let authors = split_authors(&author_line);

    let base = Url::parse(page_url).ok();
    let pdf_link = document
        .select(&LINK_SELECTOR)
        .filter_map(|a| a.value().attr("href"))
        .find(|href| href.to_lowercase().ends_with(".pdf"))
        .map(|href| match base.as_ref().and_then(|b| b.join(href).ok()) {
            Some(resolved) => resolved.to_string(),
            None => href.to_string(),
        })
        .unwrap_or_default();

    DetailFields {
        title,
        authors,
        summary,
        pdf_link,
        published: bibtex_date(html),
    }
}

/// Authors from a CVF author line such as
/// `Alice A, Bob B; Proceedings of the IEEE/CVF ..., 2024, pp. 1-10`.
fn split_authors(line: &str) -> Vec<String> {
    let names = line.split(';').next().unwrap_or_default();
    names
        .split(',')
        .flat_map(|part| part.split(" and "))
        .map(normalize_whitespace)
        .filter(|name| !name.is_empty())
        .collect()
}

/// First day of the bibtex `month`/`year`, e.g. `2024-06-01`.
fn bibtex_date(html: &str) -> Option<String> {
    let year: i32 = BIB_YEAR.captures(html)?.get(1)?.as_str().parse().ok()?;
    let month = BIB_MONTH
        .captures(html)
        .and_then(|c| c.get(1))
        .and_then(|m| month_number(m.as_str()))
        .unwrap_or(1);
    NaiveDate::from_ymd_opt(year, month, 1).map(|d| d.format("%Y-%m-%d").to_string())
}

fn month_number(name: &str) -> Option<u32> {
    let prefix: String = name.to_lowercase().chars().take(3).collect();
    let month = match prefix.as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

/// File stem of a detail URL: `.../Smith_Face_CVPR_2024_paper.html` gives
/// `Smith_Face_CVPR_2024_paper`.
fn paper_stem(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let last = parsed.path_segments()?.filter(|s| !s.is_empty()).last()?;
    let stem = last.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(last);
    (!stem.is_empty()).then(|| stem.to_string())
}
