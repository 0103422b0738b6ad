//! Two-way category assignment from keyword evidence.

use crate::config::KeywordConfig;
use crate::models::Category;
use std::sync::Arc;

/// Assigns [`Category::Recognition`] or [`Category::Generation`].
///
/// The recognition list is tested first and the first list with a hit wins,
/// so a text mentioning both kinds of terms is `Recognition`. Text matching
/// neither list also defaults to `Recognition`.
#[derive(Debug, Clone)]
pub struct Classifier {
    keywords: Arc<KeywordConfig>,
}

impl Classifier {
    pub fn new(keywords: Arc<KeywordConfig>) -> Self {
        Self { keywords }
    }

    pub fn classify(&self, title: &str, summary: &str) -> Category {
        self.classify_with_evidence(title, summary).0
    }

    /// Category plus the term that decided it (`None` when the default applied).
    pub fn classify_with_evidence(&self, title: &str, summary: &str) -> (Category, Option<String>) {
        let text = format!("{} {}", title, summary).to_lowercase();
        let first_hit = |terms: &[String]| terms.iter().find(|t| text.contains(t.as_str())).cloned();

        if let Some(term) = first_hit(&self.keywords.recognition) {
            return (Category::Recognition, Some(term));
        }
        if let Some(term) = first_hit(&self.keywords.generation) {
            return (Category::Generation, Some(term));
        }
        (Category::Recognition, None)
    }
}
