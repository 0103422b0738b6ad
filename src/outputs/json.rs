//! JSON snapshot persistence.
//!
//! The snapshot (`papers.json`) mirrors [`PaperDigest`]:
//!
//! ```text
//! {
//!   "all": [...],
//!   "face_recognition": [...],
//!   "face_generation": [...],
//!   "sources": { "arXiv": 12, "CVPR": 3 }
//! }
//! ```
//!
//! A previous run's snapshot seeds the output when a run yields nothing.
//! Older snapshots that are a bare array of records are accepted too; the
//! category subsets are rebuilt from the array.

use crate::error::OutputError;
use crate::models::{PaperDigest, Record};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument, warn};

/// Default snapshot file name inside the output directory.
pub const SNAPSHOT_FILE: &str = "papers.json";

#[derive(Deserialize)]
#[serde(untagged)]
enum SnapshotFile {
    Digest(PaperDigest),
    Records(Vec<Record>),
}

/// Serialize a digest as pretty-printed JSON.
pub fn to_json(digest: &PaperDigest) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(digest)
}

/// Parse a snapshot in either the digest or the flat-array form.
pub fn from_json(text: &str) -> Result<PaperDigest, serde_json::Error> {
    let digest = match serde_json::from_str::<SnapshotFile>(text)? {
        SnapshotFile::Digest(digest) => digest,
        SnapshotFile::Records(records) => {
            let mut sources: BTreeMap<String, usize> = BTreeMap::new();
            for record in records.iter().filter(|r| !r.source.is_empty()) {
                *sources.entry(record.source.clone()).or_insert(0) += 1;
            }
            PaperDigest::new(records, sources, BTreeSet::new())
        }
    };
    Ok(digest)
}

/// Write `digest` to `path`, creating parent directories as needed.
#[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
pub async fn write_snapshot(digest: &PaperDigest, path: impl AsRef<Path>) -> Result<(), OutputError> {
    let path = path.as_ref();
    let display = path.display().to_string();
    let json = to_json(digest).map_err(|source| OutputError::Json {
        path: display.clone(),
        source,
    })?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await.map_err(|source| OutputError::Io {
            path: parent.display().to_string(),
            source,
        })?;
    }
    fs::write(path, json).await.map_err(|source| OutputError::Io {
        path: display.clone(),
        source,
    })?;
    info!(papers = digest.all.len(), "Wrote JSON snapshot");
    Ok(())
}

/// Load a previous snapshot. Returns `None` when it is missing or unreadable.
#[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
pub async fn load_snapshot(path: impl AsRef<Path>) -> Option<PaperDigest> {
    let path = path.as_ref();
    let text = match fs::read_to_string(path).await {
        Ok(text) => text,
        Err(e) => {
            info!(error = %e, "No previous snapshot available");
            return None;
        }
    };
    match from_json(&text) {
        Ok(digest) => Some(digest),
        Err(e) => {
            warn!(error = %e, "Previous snapshot is not valid JSON; ignoring it");
            None
        }
    }
}

/// Pick what the writers should publish for this run.
///
/// A non-empty `fresh` digest always wins. An empty one falls back to the
/// previous snapshot when that snapshot has records.
pub fn with_fallback(fresh: PaperDigest, previous: Option<PaperDigest>) -> (PaperDigest, bool) {
    if !fresh.is_empty() {
        return (fresh, false);
    }
    match previous {
        Some(previous) if !previous.is_empty() => (previous, true),
        _ => (fresh, false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Candidate, Category};

    fn record(id: &str, category: Category, date: &str) -> Record {
        Record::from_candidate(
            Candidate {
                id: Some(id.to_string()),
                title: format!("Face paper {id}"),
                authors: vec!["Alice".to_string()],
                summary: "Abstract".to_string(),
                published: date.to_string(),
                source: "arXiv".to_string(),
                landing_link: format!("https://arxiv.org/abs/{id}"),
                ..Default::default()
            },
            category,
            BTreeSet::from(["face".to_string()]),
        )
    }

    fn digest() -> PaperDigest {
        let mut sources = BTreeMap::new();
        sources.insert("arXiv".to_string(), 2);
        sources.insert("CVPR".to_string(), 0);
        PaperDigest::new(
            vec![
                record("2401.00002", Category::Generation, "2024-01-06"),
                record("2401.00001", Category::Recognition, "2024-01-05"),
            ],
            sources,
            BTreeSet::from(["CVPR".to_string()]),
        )
    }

    #[test]
    fn test_snapshot_shape() {
        let json = to_json(&digest()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value["all"].is_array());
        assert_eq!(value["face_recognition"].as_array().unwrap().len(), 1);
        assert_eq!(value["face_generation"].as_array().unwrap().len(), 1);
        assert_eq!(value["sources"]["arXiv"], 2);
        assert_eq!(value["all"][0]["published"], "2024-01-06");
        assert_eq!(value["all"][0]["category"], "Generation");
    }

    #[test]
    fn test_snapshot_round_trip() {
        let original = digest();
        let restored = from_json(&to_json(&original).unwrap()).unwrap();
        assert_eq!(restored, original);
    }

    #[test]
    fn test_failed_sources_omitted_when_empty() {
        let d = PaperDigest::new(vec![], BTreeMap::new(), BTreeSet::new());
        let json = to_json(&d).unwrap();
        assert!(!json.contains("failed_sources"));
    }

    #[test]
    fn test_flat_array_snapshot() {
        let records = vec![
            record("a", Category::Recognition, "2024-01-02"),
            record("b", Category::Generation, "2024-01-01"),
        ];
        let json = serde_json::to_string(&records).unwrap();
        let d = from_json(&json).unwrap();
        assert_eq!(d.all.len(), 2);
        assert_eq!(d.face_recognition.len(), 1);
        assert_eq!(d.face_generation.len(), 1);
        assert_eq!(d.sources["arXiv"], 2);
    }

    #[test]
    fn test_flat_array_with_localized_categories() {
        let json = r#"[
  {
    "id": "2401.12345v1",
    "title": "Robust Face Recognition",
    "authors": ["Alice", "Bob"],
    "summary": "Abstract",
    "pdf_link": "http://arxiv.org/pdf/2401.12345v1",
    "arxiv_link": "https://arxiv.org/abs/2401.12345v1",
    "published": "2024-01-20",
    "category": "人脸识别",
    "keywords": "face recognition"
  },
  {
    "id": "2401.67890v1",
    "title": "Face Diffusion Editing",
    "authors": [],
    "summary": "Abstract",
    "pdf_link": "http://arxiv.org/pdf/2401.67890v1",
    "arxiv_link": "https://arxiv.org/abs/2401.67890v1",
    "published": "2024-01-19",
    "category": "人脸生成",
    "keywords": "face diffusion"
  }
]"#;
        let d = from_json(json).unwrap();
        assert_eq!(d.all.len(), 2);
        assert_eq!(d.face_recognition[0].id, "2401.12345v1");
        assert_eq!(d.face_generation[0].category, Category::Generation);
        assert_eq!(d.all[0].landing_link, "https://arxiv.org/abs/2401.12345v1");
        assert!(d.all[0].source.is_empty());
        assert!(d.sources.is_empty());
        assert!(!d.is_empty());
    }

    #[test]
    fn test_fallback_policy() {
        let empty = PaperDigest::default();
        let (chosen, used) = with_fallback(empty.clone(), Some(digest()));
        assert!(used);
        assert_eq!(chosen.all.len(), 2);

        let (chosen, used) = with_fallback(digest(), Some(PaperDigest::default()));
        assert!(!used);
        assert_eq!(chosen.all.len(), 2);

        let (chosen, used) = with_fallback(empty.clone(), Some(PaperDigest::default()));
        assert!(!used);
        assert!(chosen.is_empty());

        let (_, used) = with_fallback(empty, None);
        assert!(!used);
    }

    #[tokio::test]
    async fn test_write_then_load() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested/papers.json");
        write_snapshot(&digest(), &path).await.unwrap();
        let loaded = load_snapshot(&path).await.unwrap();
        assert_eq!(loaded, digest());
    }

    #[tokio::test]
    async fn test_load_missing_or_corrupt() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(load_snapshot(tmp.path().join("missing.json")).await.is_none());
        let bad = tmp.path().join("bad.json");
        std::fs::write(&bad, "{ not json").unwrap();
        assert!(load_snapshot(&bad).await.is_none());
    }
}
