//! Run settings and keyword lists.
//!
//! [`Settings`] is assembled once at startup from built-in defaults, an
//! optional YAML file and CLI overrides (in that order of precedence, lowest
//! first). The keyword lists end up in an immutable [`KeywordConfig`] that is
//! shared by `Arc` between the filter, the classifier and the sources.

use crate::cli::Cli;
use crate::error::ConfigError;
use crate::http::{DEFAULT_USER_AGENT, HttpConfig};
use crate::models::DateWindow;
use crate::pipeline::aggregate::DEFAULT_CONCURRENCY;
use crate::scrapers::SourceOptions;
use chrono::{DateTime, Datelike, Utc};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration as StdDuration;
use tracing::{info, instrument};

pub const DEFAULT_DAYS: u32 = 30;
pub const DEFAULT_SOURCES: [&str; 4] = ["arxiv", "cvpr", "iccv", "eccv"];
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_RESULTS: usize = 10;

/// Keyword lists driving relevance filtering, classification and arXiv search.
///
/// All terms are matched case-insensitively as substrings. The order of
/// `recognition` and `generation` does not matter within a list, but the
/// recognition list is always consulted first.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct KeywordConfig {
    /// Topic terms; a paper is relevant when its title or abstract contains any.
    pub topic: Vec<String>,
    /// Recognition-indicative terms.
    pub recognition: Vec<String>,
    /// Generation-indicative terms.
    pub generation: Vec<String>,
    /// Phrases sent to the arXiv search API, one query each.
    pub arxiv_search_terms: Vec<String>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for KeywordConfig {
    fn default() -> Self {
        Self {
            topic: strings(&[
                "face",
                "facial",
                "portrait",
                "talking head",
                "head avatar",
                "deepfake",
                "deep fake",
                "identity-preserving",
                "identity preserving",
                "expression recognition",
                "lip sync",
            ]),
            recognition: strings(&[
                "recognition",
                "detection",
                "verification",
                "identification",
                "alignment",
                "anti-spoofing",
                "anti spoofing",
                "liveness",
                "tracking",
            ]),
            generation: strings(&[
                "generation",
                "synthesis",
                "editing",
                "reconstruction",
                "restoration",
                "gan",
                "diffusion",
                "swap",
            ]),
            arxiv_search_terms: strings(&[
                "face recognition",
                "face detection",
                "face verification",
                "face identification",
                "face generation",
                "face synthesis",
                "face editing",
                "face restoration",
                "face reconstruction",
                "portrait generation",
                "face GAN",
                "face diffusion",
            ]),
        }
    }
}

impl KeywordConfig {
    /// Lower-case every term once so matching never re-allocates them.
    pub fn normalized(mut self) -> Self {
        for list in [
            &mut self.topic,
            &mut self.recognition,
            &mut self.generation,
        ] {
            for term in list.iter_mut() {
                *term = term.trim().to_lowercase();
            }
            list.retain(|t| !t.is_empty());
        }
        self.arxiv_search_terms.retain(|t| !t.trim().is_empty());
        self
    }
}

/// Settings file contents. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub days: Option<u32>,
    pub sources: Option<Vec<String>>,
    pub timeout_secs: Option<u64>,
    pub retries: Option<usize>,
    pub max_results: Option<usize>,
    pub conference_year: Option<i32>,
    pub concurrency: Option<usize>,
    pub user_agent: Option<String>,
    pub arxiv_api_url: Option<String>,
    pub keywords: Option<KeywordConfig>,
}

impl Settings {
    /// Load settings from a YAML file.
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: display.clone(),
            source,
        })?;
        let settings = Self::from_yaml(&text).map_err(|source| ConfigError::Yaml {
            path: display,
            source,
        })?;
        info!("Loaded settings file");
        Ok(settings)
    }

    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
    }

    /// Keyword lists from the file, or the built-in lists.
    pub fn keyword_config(&self) -> KeywordConfig {
        self.keywords.clone().unwrap_or_default().normalized()
    }
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub days: u32,
    /// `[now - days, now]`, fixed when the run starts.
    pub window: DateWindow,
    pub sources: Vec<String>,
    pub http: HttpConfig,
    pub source_options: SourceOptions,
    pub concurrency: usize,
    pub keywords: KeywordConfig,
}

impl RunConfig {
    /// Layer `cli` over `settings` over the built-in defaults, as of `now`.
    pub fn resolve(cli: &Cli, settings: &Settings, now: DateTime<Utc>) -> Result<Self, ConfigError> {
        let days = cli.days.or(settings.days).unwrap_or(DEFAULT_DAYS);
        let max_results = cli
            .max_results
            .or(settings.max_results)
            .unwrap_or(DEFAULT_MAX_RESULTS);
        let concurrency = cli
            .concurrency
            .or(settings.concurrency)
            .unwrap_or(DEFAULT_CONCURRENCY);
        let timeout_secs = cli
            .timeout_secs
            .or(settings.timeout_secs)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        for (field, value) in [
            ("days", days as usize),
            ("max_results", max_results),
            ("concurrency", concurrency),
            ("timeout_secs", timeout_secs as usize),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "must be greater than zero",
                });
            }
        }

        let window = DateWindow::lookback(days, now).ok_or(ConfigError::Invalid {
            field: "days",
            reason: "reaches before the earliest supported date",
        })?;

        let sources: Vec<String> = cli
            .sources
            .clone()
            .or_else(|| settings.sources.clone())
            .unwrap_or_else(|| DEFAULT_SOURCES.iter().map(|s| s.to_string()).collect())
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if sources.is_empty() {
            return Err(ConfigError::Invalid {
                field: "sources",
                reason: "at least one source is required",
            });
        }

        Ok(Self {
            days,
            window,
            sources,
            http: HttpConfig {
                timeout: StdDuration::from_secs(timeout_secs),
                user_agent: settings
                    .user_agent
                    .clone()
                    .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
                max_retries: cli.retries.or(settings.retries).unwrap_or(0),
                ..HttpConfig::default()
            },
            source_options: SourceOptions {
                max_results,
                conference_year: cli
                    .conference_year
                    .or(settings.conference_year)
                    .unwrap_or(now.year()),
                arxiv_api_url: settings.arxiv_api_url.clone(),
            },
            concurrency,
            keywords: settings.keyword_config(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_keywords_are_lowercase_after_normalize() {
        let kw = KeywordConfig::default().normalized();
        assert!(kw.generation.contains(&"gan".to_string()));
        assert!(kw.recognition.contains(&"anti-spoofing".to_string()));
        assert!(kw.topic.iter().all(|t| *t == t.to_lowercase()));
        // Search phrases keep their casing; arXiv search is case-insensitive anyway.
        assert!(kw.arxiv_search_terms.contains(&"face GAN".to_string()));
    }

    #[test]
    fn test_settings_from_empty_yaml() {
        let s = Settings::from_yaml("").unwrap();
        assert!(s.days.is_none());
        assert_eq!(s.keyword_config(), KeywordConfig::default().normalized());
    }

    #[test]
    fn test_settings_partial_keywords() {
        let yaml = r#"
days: 7
sources: [arxiv, cvpr]
keywords:
  topic: ["Face", "  ", "Portrait"]
"#;
        let s = Settings::from_yaml(yaml).unwrap();
        assert_eq!(s.days, Some(7));
        assert_eq!(s.sources.as_deref(), Some(&["arxiv".to_string(), "cvpr".to_string()][..]));
        let kw = s.keyword_config();
        assert_eq!(kw.topic, vec!["face".to_string(), "portrait".to_string()]);
        // Unspecified lists fall back to the built-in defaults.
        assert!(!kw.recognition.is_empty());
        assert!(!kw.arxiv_search_terms.is_empty());
    }

    fn now() -> DateTime<Utc> {
        use chrono::TimeZone;
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn cli(args: &[&str]) -> Cli {
        use clap::Parser;
        let mut argv = vec!["face_paper_digest"];
        argv.extend_from_slice(args);
        Cli::parse_from(argv)
    }

    #[test]
    fn test_run_config_defaults() {
        let rc = RunConfig::resolve(&cli(&[]), &Settings::default(), now()).unwrap();
        assert_eq!(rc.days, 30);
        assert_eq!(rc.window.to, now());
        assert_eq!(rc.window.to - rc.window.from, chrono::TimeDelta::days(30));
        assert_eq!(rc.sources, vec!["arxiv", "cvpr", "iccv", "eccv"]);
        assert_eq!(rc.http.timeout, StdDuration::from_secs(30));
        assert_eq!(rc.http.max_retries, 0);
        assert_eq!(rc.source_options.max_results, 10);
        assert_eq!(rc.source_options.conference_year, 2025);
        assert_eq!(rc.concurrency, DEFAULT_CONCURRENCY);
    }

    #[test]
    fn test_run_config_cli_wins_over_file() {
        let settings = Settings::from_yaml(
            "days: 7\nretries: 2\nsources: [cvpr]\nuser_agent: test-agent\n",
        )
        .unwrap();
        let rc = RunConfig::resolve(&cli(&["--days", "3", "--sources", "arxiv"]), &settings, now())
            .unwrap();
        assert_eq!(rc.days, 3);
        assert_eq!(rc.sources, vec!["arxiv"]);
        assert_eq!(rc.http.max_retries, 2);
        assert_eq!(rc.http.user_agent, "test-agent");
    }

    #[test]
    fn test_run_config_rejects_zero() {
        let err = RunConfig::resolve(&cli(&["--max-results", "0"]), &Settings::default(), now())
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "max_results", .. }));

        let settings = Settings::from_yaml("sources: []").unwrap();
        let err = RunConfig::resolve(&cli(&[]), &settings, now()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "sources", .. }));
    }

    #[test]
    fn test_run_config_rejects_out_of_range_days() {
        let huge = u32::MAX.to_string();
        let err = RunConfig::resolve(&cli(&["--days", &huge]), &Settings::default(), now())
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "days", .. }));
    }

    #[test]
    fn test_settings_load_missing_file() {
        let err = Settings::load("/definitely/not/here.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_settings_load_bad_yaml() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), "days: [not, a, number]").unwrap();
        let err = Settings::load(tmp.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Yaml { .. }));
    }
}
