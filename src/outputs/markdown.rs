//! README rendering for a run's digest.
//!
//! The README lists every paper of the digest in sort order, preceded by
//! category and per-source counts, and links to the daily archive.

use crate::models::{Category, PaperDigest, Record};
use chrono::NaiveDate;
use std::fmt::Write;

/// Render the repository README for `digest` as of `date`.
///
/// `from_snapshot` marks a digest reused from the previous run.
pub fn digest_to_markdown(digest: &PaperDigest, date: NaiveDate, from_snapshot: bool) -> String {
    let mut md = String::new();
    write_header(&mut md, date, from_snapshot);
    write_stats(&mut md, digest);
    write_paper_list(&mut md, &digest.all);
    write_archive_section(&mut md, date);
    md
}

fn write_header(md: &mut String, date: NaiveDate, from_snapshot: bool) {
    writeln!(md, "# Daily Face Recognition / Generation Papers\n").unwrap();
    writeln!(
        md,
        "![Last Updated](https://img.shields.io/badge/last_updated-{}-blue)\n",
        date.format("%Y--%m--%d")
    )
    .unwrap();
    writeln!(
        md,
        "Recent face recognition and face generation papers collected daily from arXiv and conference proceedings.\n"
    )
    .unwrap();
    writeln!(md, "## 📌 Papers ({})\n", date).unwrap();
    if from_snapshot {
        writeln!(md, "> No new papers were found today; showing the previous collection.\n").unwrap();
    }
    writeln!(md, "---\n").unwrap();
}

fn write_stats(md: &mut String, digest: &PaperDigest) {
    let rec = digest.by_category(Category::Recognition).len();
    let generation = digest.by_category(Category::Generation).len();

    writeln!(md, "### 📊 Statistics\n").unwrap();
    writeln!(md, "**By category:**").unwrap();
    writeln!(md, "- **{}**: {} papers", Category::Recognition, rec).unwrap();
    writeln!(md, "- **{}**: {} papers", Category::Generation, generation).unwrap();
    writeln!(md, "- **Total**: {} papers\n", digest.all.len()).unwrap();

    writeln!(md, "**By source:**").unwrap();
    let mut any = false;
    for (source, count) in digest.sources.iter().filter(|(_, c)| **c > 0) {
        writeln!(md, "- **{}**: {} papers", source, count).unwrap();
        any = true;
    }
    if !any {
        writeln!(md, "- arXiv: 0 papers").unwrap();
    }
    if !digest.failed_sources.is_empty() {
        let failed: Vec<&str> = digest.failed_sources.iter().map(String::as_str).collect();
        writeln!(md, "\n> ⚠️ Unreachable this run: {}", failed.join(", ")).unwrap();
    }
    writeln!(md, "\n---\n").unwrap();
}

fn write_paper_list(md: &mut String, papers: &[Record]) {
    if papers.is_empty() {
        writeln!(md, "No new papers today.\n").unwrap();
        return;
    }
    writeln!(md, "### 📄 Papers\n").unwrap();
    for (i, paper) in papers.iter().enumerate() {
        write_paper(md, i + 1, paper);
    }
}

fn write_paper(md: &mut String, index: usize, paper: &Record) {
    let authors = if paper.authors.is_empty() {
        "Unknown".to_string()
    } else {
        paper.authors.join(", ")
    };
    writeln!(md, "{}. **{}**\n", index, paper.title).unwrap();
    writeln!(md, "   - 🏷️ Category: {}", paper.category.tag()).unwrap();
    writeln!(md, "   - 👤 Authors: {}", authors).unwrap();
    writeln!(md, "   - 📅 Published: {}", paper.published_date).unwrap();
    if !paper.source.is_empty() {
        writeln!(md, "   - 📡 Source: {}", paper.source).unwrap();
    }
    if !paper.summary.is_empty() {
        writeln!(md, "   - 📖 Abstract: {}", paper.summary).unwrap();
    }

    let mut links = Vec::new();
    if !paper.landing_link.is_empty() {
        links.push(format!("[{}]({})", landing_label(paper), paper.landing_link));
    }
    if !paper.pdf_link.is_empty() {
        links.push(format!("[PDF]({})", paper.pdf_link));
    }
    if !links.is_empty() {
        writeln!(md, "\n   **Links**: {}", links.join(" | ")).unwrap();
    }
    writeln!(md, "\n---\n").unwrap();
}

fn landing_label(paper: &Record) -> &str {
    if paper.source.is_empty() {
        "Paper"
    } else {
        &paper.source
    }
}

fn write_archive_section(md: &mut String, date: NaiveDate) {
    writeln!(md, "## 📁 Archive\n").unwrap();
    writeln!(md, "- [All collected days](./papers/README.md)").unwrap();
    writeln!(md, "- [{}](./papers/{}.md)\n", date, date).unwrap();
    writeln!(md, "---\n").unwrap();
    writeln!(md, "*Updated automatically.*").unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Candidate;
    use std::collections::{BTreeMap, BTreeSet};

    fn record(id: &str, title: &str, category: Category, authors: Vec<&str>) -> Record {
        Record::from_candidate(
            Candidate {
                id: Some(id.to_string()),
                title: title.to_string(),
                authors: authors.into_iter().map(str::to_string).collect(),
                summary: "Short abstract.".to_string(),
                published: "2024-01-05".to_string(),
                source: "arXiv".to_string(),
                landing_link: format!("https://arxiv.org/abs/{id}"),
                pdf_link: format!("https://arxiv.org/pdf/{id}"),
                ..Default::default()
            },
            category,
            BTreeSet::new(),
        )
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 8).unwrap()
    }

    #[test]
    fn test_markdown_lists_papers_and_counts() {
        let mut sources = BTreeMap::new();
        sources.insert("arXiv".to_string(), 2);
        sources.insert("CVPR".to_string(), 0);
        let digest = PaperDigest::new(
            vec![
                record("2401.00001", "Face Verification", Category::Recognition, vec!["Alice", "Bob"]),
                record("2401.00002", "Face Synthesis", Category::Generation, vec![]),
            ],
            sources,
            BTreeSet::new(),
        );
        let md = digest_to_markdown(&digest, date(), false);

        assert!(md.contains("## 📌 Papers (2024-01-08)"));
        assert!(md.contains("- **Face Recognition**: 1 papers"));
        assert!(md.contains("- **Face Generation**: 1 papers"));
        assert!(md.contains("- **arXiv**: 2 papers"));
        assert!(!md.contains("**CVPR**"));
        assert!(md.contains("1. **Face Verification**"));
        assert!(md.contains("👤 Authors: Alice, Bob"));
        assert!(md.contains("👤 Authors: Unknown"));
        assert!(md.contains("[arXiv](https://arxiv.org/abs/2401.00001) | [PDF](https://arxiv.org/pdf/2401.00001)"));
        assert!(md.contains("./papers/2024-01-08.md"));
        assert!(!md.contains("previous collection"));
    }

    #[test]
    fn test_markdown_empty_and_snapshot_notice() {
        let mut failed = BTreeSet::new();
        failed.insert("arXiv".to_string());
        let digest = PaperDigest::new(vec![], BTreeMap::new(), failed);
        let md = digest_to_markdown(&digest, date(), true);
        assert!(md.contains("No new papers today."));
        assert!(md.contains("- arXiv: 0 papers"));
        assert!(md.contains("Unreachable this run: arXiv"));
        assert!(md.contains("previous collection"));
    }
}
