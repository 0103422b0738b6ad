//! Topic relevance filter.

use crate::config::KeywordConfig;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Decides whether a candidate is about the configured topic.
///
/// Recall over precision: any single topic term anywhere in the title or the
/// abstract keeps the paper.
#[derive(Debug, Clone)]
pub struct TopicFilter {
    keywords: Arc<KeywordConfig>,
}

impl TopicFilter {
    pub fn new(keywords: Arc<KeywordConfig>) -> Self {
        Self { keywords }
    }

    /// Topic terms found in `title` + `summary`.
    pub fn matched_terms(&self, title: &str, summary: &str) -> BTreeSet<String> {
        let haystack = haystack(title, summary);
        self.terms_in(&haystack).cloned().collect()
    }

    pub fn is_relevant(&self, title: &str, summary: &str) -> bool {
        let haystack = haystack(title, summary);
        self.terms_in(&haystack).next().is_some()
    }

    fn terms_in<'a>(&'a self, haystack: &'a str) -> impl Iterator<Item = &'a String> + 'a {
        self.keywords
            .topic
            .iter()
            .filter(move |term| haystack.contains(term.as_str()))
    }
}

fn haystack(title: &str, summary: &str) -> String {
    format!("{} {}", title, summary).to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> TopicFilter {
        TopicFilter::new(Arc::new(KeywordConfig::default().normalized()))
    }

    #[test]
    fn test_relevant_by_title() {
        assert!(filter().is_relevant("Robust FACE Verification", ""));
    }

    #[test]
    fn test_relevant_by_summary_only() {
        assert!(filter().is_relevant(
            "A New Benchmark",
            "We study facial expression transfer across domains."
        ));
    }

    #[test]
    fn test_irrelevant() {
        assert!(!filter().is_relevant(
            "Graph Neural Networks for Traffic",
            "We forecast road congestion."
        ));
    }

    #[test]
    fn test_matched_terms_documents_evidence() {
        let terms = filter().matched_terms("Talking Head Synthesis", "portrait video");
        assert!(terms.contains("talking head"));
        assert!(terms.contains("portrait"));
        assert!(!terms.contains("deepfake"));
    }

    #[test]
    fn test_is_relevant_agrees_with_matched_terms() {
        let f = filter();
        for (title, summary) in [
            ("Deepfake Detection", ""),
            ("Point Clouds", "lidar only"),
            ("", "A PORTRAIT relighting method"),
            ("", ""),
        ] {
            assert_eq!(
                f.is_relevant(title, summary),
                !f.matched_terms(title, summary).is_empty()
            );
        }
    }

    #[test]
    fn test_custom_keywords() {
        let kw = KeywordConfig {
            topic: vec!["iris".to_string()],
            ..KeywordConfig::default()
        }
        .normalized();
        let f = TopicFilter::new(Arc::new(kw));
        assert!(f.is_relevant("Iris Recognition", ""));
        assert!(!f.is_relevant("Face Recognition", ""));
    }
}
