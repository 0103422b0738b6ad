//! Error types for the paper pipeline.
//!
//! Errors are contained at the smallest scope that produced them:
//!
//! - [`FetchError`]: one network round trip failed. The aggregator logs it and
//!   the query contributes zero records.
//! - [`ParseError`]: one candidate entry was malformed. The parser logs it and
//!   moves on to the next entry.
//! - [`ConfigError`]: the optional settings file could not be loaded. This is
//!   the only pipeline-adjacent error that stops the binary at startup.
//! - [`OutputError`]: a writer (snapshot, README, archive) failed.

use thiserror::Error;

/// Why a single HTTP request did not produce a payload.
#[derive(Debug, Error)]
pub enum FetchCause {
    #[error("request timed out")]
    Timeout,
    #[error("unexpected HTTP status {0}")]
    Status(u16),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("failed to read response body: {0}")]
    Body(String),
    #[error("invalid request URL: {0}")]
    Url(#[from] url::ParseError),
}

impl From<reqwest::Error> for FetchCause {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchCause::Timeout
        } else if let Some(status) = e.status() {
            FetchCause::Status(status.as_u16())
        } else if e.is_body() || e.is_decode() {
            FetchCause::Body(e.to_string())
        } else {
            FetchCause::Transport(e.to_string())
        }
    }
}

/// A failed fetch, tagged with the source and query that issued it.
#[derive(Debug, Error)]
#[error("[{source_name}] fetch for {query:?} failed: {cause}")]
pub struct FetchError {
    pub source_name: String,
    pub query: String,
    #[source]
    pub cause: FetchCause,
}

impl FetchError {
    pub fn new(source_name: impl Into<String>, query: impl Into<String>, cause: impl Into<FetchCause>) -> Self {
        Self {
            source_name: source_name.into(),
            query: query.into(),
            cause: cause.into(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self.cause, FetchCause::Timeout)
    }
}

/// A single malformed candidate entry.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("entry is missing required field `{0}`")]
    MissingField(&'static str),
    #[error("malformed markup: {0}")]
    Markup(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read settings file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse settings file {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("unknown source `{0}` (expected one of: arxiv, cvpr, iccv, wacv, eccv)")]
    UnknownSource(String),
    #[error("invalid value for {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON error on {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_display_names_source_and_query() {
        let err = FetchError::new("arXiv", "face detection", FetchCause::Status(503));
        let msg = err.to_string();
        assert!(msg.contains("arXiv"));
        assert!(msg.contains("face detection"));
        assert!(msg.contains("503"));
        assert!(!err.is_timeout());
    }

    #[test]
    fn test_parse_error_display() {
        assert_eq!(
            ParseError::MissingField("id").to_string(),
            "entry is missing required field `id`"
        );
        assert!(ParseError::Markup("unexpected EOF".to_string())
            .to_string()
            .contains("unexpected EOF"));
    }

    #[test]
    fn test_timeout_cause() {
        let err = FetchError::new("CVPR", "listing", FetchCause::Timeout);
        assert!(err.is_timeout());
    }
}
