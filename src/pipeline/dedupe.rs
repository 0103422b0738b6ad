//! Identity-based deduplication.
//!
//! Records are keyed on their `id` alone. The first record seen for an id is
//! kept as is; later ones are dropped without merging authors or links. Ids
//! are source-scoped, so an arXiv preprint and its conference version remain
//! two records.

use crate::models::Record;
use itertools::Itertools;

/// Drop every record whose `id` was already seen, preserving first-seen order.
pub fn dedupe(records: Vec<Record>) -> Vec<Record> {
    records
        .into_iter()
        .unique_by(|r| r.id.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Candidate, Category};
    use std::collections::BTreeSet;

    fn record(id: &str, summary: &str) -> Record {
        Record::from_candidate(
            Candidate {
                id: Some(id.to_string()),
                title: format!("Face paper {id}"),
                summary: summary.to_string(),
                published: "2024-01-05".to_string(),
                source: "arXiv".to_string(),
                ..Default::default()
            },
            Category::Recognition,
            BTreeSet::new(),
        )
    }

    #[test]
    fn test_first_seen_wins() {
        let out = dedupe(vec![
            record("2401.00001", "first"),
            record("2401.00002", "other"),
            record("2401.00001", "second"),
        ]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].id, "2401.00001");
        assert_eq!(out[0].summary, "first");
        assert_eq!(out[1].id, "2401.00002");
    }

    #[test]
    fn test_idempotent() {
        let input = vec![
            record("a", "1"),
            record("b", "2"),
            record("a", "3"),
            record("c", "4"),
            record("b", "5"),
        ];
        let once = dedupe(input);
        let twice = dedupe(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_empty() {
        assert!(dedupe(Vec::new()).is_empty());
    }
}
