//! Daily archive files for navigation between runs.
//!
//! # Files
//!
//! - **Day file** (`papers/2024-01-08.md`): the run's papers grouped by
//!   publication month, newest month first. Rewritten on every run of that day.
//! - **Index** (`papers/README.md`): one link per collected day, newest first.
//!   A day is listed once no matter how often it is re-run.

use crate::error::OutputError;
use crate::models::PaperDigest;
use chrono::NaiveDate;
use itertools::Itertools;
use std::fmt::Write;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

const INDEX_FILE: &str = "README.md";
const INDEX_HEADER: &str = "# Face Paper Archive";

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> OutputError + '_ {
    move |source| OutputError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// Render the day file for `digest`.
pub fn day_file_markdown(digest: &PaperDigest, date: NaiveDate) -> String {
    let mut md = String::new();
    writeln!(md, "# Face papers collected on {}\n", date).unwrap();

    if digest.all.is_empty() {
        writeln!(md, "No papers were collected.").unwrap();
        return md;
    }

    let by_month = digest
        .all
        .iter()
        .into_group_map_by(|p| p.published_date.get(..7).unwrap_or("unknown").to_string());

    let months: Vec<&String> = by_month.keys().sorted().rev().collect();
    writeln!(md, "## Contents\n").unwrap();
    for month in &months {
        writeln!(md, "- [{}](#{})", month, month).unwrap();
    }

    for month in months {
        writeln!(md, "\n## {}\n", month).unwrap();
        for (i, paper) in by_month[month].iter().enumerate() {
            let link = if paper.landing_link.is_empty() {
                paper.title.clone()
            } else {
                format!("[{}]({})", paper.title, paper.landing_link)
            };
            writeln!(
                md,
                "{}. {} - {} <small>`{}`</small>",
                i + 1,
                link,
                paper.published_date,
                paper.category
            )
            .unwrap();
        }
    }
    md
}

/// Write the day file for `date` into `papers_dir`.
#[instrument(level = "info", skip_all, fields(papers_dir = %papers_dir.as_ref().display(), %date))]
pub async fn write_day_file(
    papers_dir: impl AsRef<Path>,
    digest: &PaperDigest,
    date: NaiveDate,
) -> Result<PathBuf, OutputError> {
    let papers_dir = papers_dir.as_ref();
    fs::create_dir_all(papers_dir).await.map_err(io_err(papers_dir))?;
    let path = papers_dir.join(format!("{}.md", date));
    fs::write(&path, day_file_markdown(digest, date))
        .await
        .map_err(io_err(&path))?;
    info!(path = %path.display(), "Wrote daily archive");
    Ok(path)
}

/// Insert `date` into the archive index, keeping newest days on top.
pub fn insert_index_entry(existing: Option<&str>, date: NaiveDate) -> String {
    let entry = format!("- [{}](./{}.md)", date, date);
    let mut lines: Vec<String> = match existing {
        Some(content) => content.lines().map(|l| l.to_string()).collect(),
        None => vec![INDEX_HEADER.to_string(), String::new()],
    };

    if lines.iter().any(|l| l.trim() == entry) {
        return lines.join("\n") + "\n";
    }

    match lines.iter().position(|l| l.starts_with(INDEX_HEADER)) {
        Some(pos) => {
            let mut insert_at = pos + 1;
            while insert_at < lines.len() && lines[insert_at].trim().is_empty() {
                insert_at += 1;
            }
            if insert_at == pos + 1 {
                lines.insert(insert_at, String::new());
                insert_at += 1;
            }
            lines.insert(insert_at, entry);
        }
        None => {
            lines.insert(0, INDEX_HEADER.to_string());
            lines.insert(1, String::new());
            lines.insert(2, entry);
        }
    }
    lines.join("\n") + "\n"
}

/// Update `papers_dir/README.md` with a link to `date`'s day file.
#[instrument(level = "info", skip_all, fields(papers_dir = %papers_dir.as_ref().display(), %date))]
pub async fn update_index(papers_dir: impl AsRef<Path>, date: NaiveDate) -> Result<(), OutputError> {
    let papers_dir = papers_dir.as_ref();
    let index_path = papers_dir.join(INDEX_FILE);
    let existing = if index_path.exists() {
        Some(fs::read_to_string(&index_path).await.map_err(io_err(&index_path))?)
    } else {
        None
    };

    let content = insert_index_entry(existing.as_deref(), date);
    fs::create_dir_all(papers_dir).await.map_err(io_err(papers_dir))?;
    fs::write(&index_path, content).await.map_err(io_err(&index_path))?;
    info!(path = %index_path.display(), "Updated archive index");
    Ok(())
}
