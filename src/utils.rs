//! Utility functions for text normalization, string manipulation, and file system operations.
//!
//! This module provides helper functions used throughout the application:
//! - Whitespace normalization and summary truncation for records
//! - String truncation and slugification for logging, ids and anchors
//! - File system validation for output directories

use std::error::Error;
use std::fs as stdfs;
use tokio::fs;
use tracing::{info, instrument};

/// Maximum number of characters kept from an abstract.
pub const SUMMARY_MAX_CHARS: usize = 500;

/// Marker appended to a truncated summary.
pub const ELLIPSIS: &str = "...";

/// Collapse every run of whitespace (including newlines) into a single space
/// and trim both ends.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(normalize_whitespace("  a\n\t b  "), "a b");
/// ```
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalize an abstract and cut it to [`SUMMARY_MAX_CHARS`] characters.
///
/// Truncated summaries get [`ELLIPSIS`] appended, so the result never exceeds
/// 503 characters. Counting is by `char`, never splitting a code point.
pub fn truncate_summary(summary: &str) -> String {
    let summary = normalize_whitespace(summary);
    match summary.char_indices().nth(SUMMARY_MAX_CHARS) {
        Some((cut, _)) => format!("{}{}", &summary[..cut], ELLIPSIS),
        None => summary,
    }
}

/// Truncate a string for logging purposes.
///
/// Long strings are truncated to roughly `max` bytes (backing off to a char
/// boundary) with an ellipsis and byte count indicator appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log("a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Convert a title to a URL-friendly slug.
///
/// Used for synthetic record ids and Markdown anchors. It lowercases the text,
/// removes special characters, and replaces spaces with hyphens.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(slugify_title("Hello World"), "hello-world");
/// assert_eq!(slugify_title("Face-Swap GAN!"), "face-swap-gan");
/// ```
pub fn slugify_title(title: &str) -> String {
    title
        .to_lowercase()
        .replace(|c: char| !c.is_alphanumeric() && c != ' ' && c != '-', "")
        .replace(' ', "-")
}

/// Ensure a directory exists and is writable.
///
/// This function creates the directory if it doesn't exist, then performs
/// a write test by creating and immediately deleting a probe file.
///
/// # Errors
///
/// Returns an error if:
/// - The directory cannot be created
/// - The directory is not writable (permission denied, read-only filesystem, etc.)
#[instrument(level = "info", skip_all, fields(path = %path))]
pub async fn ensure_writable_dir(path: &str) -> Result<(), Box<dyn Error>> {
    if let Err(e) = fs::create_dir_all(path).await {
        return Err(Box::new(e));
    }
    let probe_path = format!("{}/..__probe_write__", path.trim_end_matches('/'));
    match stdfs::File::create(&probe_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&probe_path);
            info!("Output directory is writable");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  Face\n  Detection\t "), "Face Detection");
        assert_eq!(normalize_whitespace(""), "");
        assert_eq!(normalize_whitespace(" \n\t "), "");
    }

    #[test]
    fn test_truncate_summary_600_chars() {
        let abstract_text = "a".repeat(600);
        let out = truncate_summary(&abstract_text);
        assert_eq!(out.chars().count(), 503);
        assert!(out.ends_with("..."));
        assert!(out.starts_with(&"a".repeat(500)));
    }

    #[test]
    fn test_truncate_summary_exactly_500_untouched() {
        let abstract_text = "b".repeat(500);
        assert_eq!(truncate_summary(&abstract_text), abstract_text);
    }

    #[test]
    fn test_truncate_summary_counts_chars_not_bytes() {
        let abstract_text = "é".repeat(510);
        let out = truncate_summary(&abstract_text);
        assert_eq!(out.chars().count(), 503);
    }

    #[test]
    fn test_truncate_summary_normalizes_first() {
        let abstract_text = format!("  {}\n\n", "word ".repeat(20));
        let out = truncate_summary(&abstract_text);
        assert!(!out.contains('\n'));
        assert!(!out.ends_with(' '));
    }

    #[test]
    fn test_truncate_for_log_short_string() {
        let s = "Hello, world!";
        assert_eq!(truncate_for_log(s, 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_truncate_for_log_multibyte_boundary() {
        let s = "ü".repeat(10);
        let result = truncate_for_log(&s, 3);
        assert!(result.starts_with('ü'));
    }

    #[test]
    fn test_slugify_title() {
        assert_eq!(slugify_title("Hello World"), "hello-world");
        assert_eq!(slugify_title("Face-Swap GAN!"), "face-swap-gan");
        assert_eq!(slugify_title("Multiple   Spaces"), "multiple---spaces");
        assert_eq!(slugify_title("Face Anti-Spoofing: A Survey"), "face-anti-spoofing-a-survey");
    }

    #[tokio::test]
    async fn test_ensure_writable_dir_creates_nested() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("out/papers");
        let nested = nested.to_str().unwrap();
        ensure_writable_dir(nested).await.unwrap();
        assert!(std::path::Path::new(nested).is_dir());
    }
}
