//! Command-line interface definitions for the face paper digest.
//!
//! Every option can also be set through an environment variable or the YAML
//! settings file given with `--config`. Flags win over the file, the file
//! wins over built-in defaults.

use clap::Parser;

/// Command-line arguments.
///
/// # Examples
///
/// ```sh
/// # Last 30 days from arXiv and the default conferences, written to the cwd
/// face_paper_digest
///
/// # One week of arXiv only, into ./site
/// face_paper_digest --days 7 --sources arxiv --output-dir ./site
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// How many days back to search
    #[arg(short, long, env = "FPD_DAYS")]
    pub days: Option<u32>,

    /// Comma-separated sources: arxiv, cvpr, iccv, wacv, eccv
    #[arg(short, long, env = "FPD_SOURCES", value_delimiter = ',')]
    pub sources: Option<Vec<String>>,

    /// Directory receiving papers.json, README.md and papers/
    #[arg(short, long, env = "FPD_OUTPUT_DIR", default_value = ".")]
    pub output_dir: String,

    /// Optional path to a settings YAML file
    #[arg(short, long, env = "FPD_CONFIG")]
    pub config: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, env = "FPD_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,

    /// Retries per request after the first failure
    #[arg(long, env = "FPD_RETRIES")]
    pub retries: Option<usize>,

    /// Maximum papers kept per query
    #[arg(short = 'n', long, env = "FPD_MAX_RESULTS")]
    pub max_results: Option<usize>,

    /// Conference year to scrape (defaults to the current year)
    #[arg(long, env = "FPD_CONFERENCE_YEAR")]
    pub conference_year: Option<i32>,

    /// Sources processed at the same time
    #[arg(long, env = "FPD_CONCURRENCY")]
    pub concurrency: Option<usize>,

    /// Do not reuse the previous papers.json when this run finds nothing
    #[arg(long)]
    pub no_fallback: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["face_paper_digest"]);
        assert_eq!(cli.output_dir, ".");
        assert!(cli.days.is_none());
        assert!(cli.sources.is_none());
        assert!(!cli.no_fallback);
    }

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from([
            "face_paper_digest",
            "--days",
            "7",
            "--sources",
            "arxiv,cvpr",
            "--output-dir",
            "./site",
            "--retries",
            "2",
            "--no-fallback",
        ]);

        assert_eq!(cli.days, Some(7));
        assert_eq!(
            cli.sources,
            Some(vec!["arxiv".to_string(), "cvpr".to_string()])
        );
        assert_eq!(cli.output_dir, "./site");
        assert_eq!(cli.retries, Some(2));
        assert!(cli.no_fallback);
    }

    #[test]
    fn test_cli_short_flags() {
        let cli = Cli::parse_from([
            "face_paper_digest",
            "-d",
            "3",
            "-o",
            "/tmp/out",
            "-n",
            "5",
            "-c",
            "settings.yaml",
        ]);

        assert_eq!(cli.days, Some(3));
        assert_eq!(cli.output_dir, "/tmp/out");
        assert_eq!(cli.max_results, Some(5));
        assert_eq!(cli.config.as_deref(), Some("settings.yaml"));
    }

    #[test]
    fn test_cli_rejects_non_numeric_days() {
        assert!(Cli::try_parse_from(["face_paper_digest", "--days", "week"]).is_err());
    }
}
