use chrono::Local;
use serde::Serialize;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::info;

use redpost_core::{CoreError, PostResult};

/// Aggregated outcome of one batch, for console display and export.
#[derive(Debug, Serialize)]
pub struct BatchReport {
    pub results: Vec<PostResult>,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Flat row for CSV export; optional columns serialize as empty cells.
#[derive(Debug, Serialize)]
struct CsvResultRow<'a> {
    subreddit: &'a str,
    title: &'a str,
    timestamp: String,
    success: bool,
    error: &'a str,
    post_url: &'a str,
    post_id: &'a str,
    dry_run: bool,
}

impl BatchReport {
    pub fn from_results(results: Vec<PostResult>) -> Self {
        let total = results.len();
        let succeeded = results.iter().filter(|r| r.success).count();
        Self {
            results,
            total,
            succeeded,
            failed: total - succeeded,
        }
    }

    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.succeeded as f64 / self.total as f64 * 100.0
        }
    }

    /// Console summary, one block per result.
    pub fn render(&self) -> String {
        if self.results.is_empty() {
            return "No results to display.".to_string();
        }

        let mut out = String::new();
        let _ = writeln!(out, "{}", "=".repeat(72));
        let _ = writeln!(out, "POSTING RESULTS SUMMARY");
        let _ = writeln!(out, "{}", "=".repeat(72));
        let _ = writeln!(out, "Total posts: {}", self.total);
        let _ = writeln!(out, "Successful:  {}", self.succeeded);
        let _ = writeln!(out, "Failed:      {}", self.failed);
        let _ = writeln!(out, "Success rate: {:.1}%", self.success_rate());
        let _ = writeln!(out);

        for (index, result) in self.results.iter().enumerate() {
            let status = if result.success { "SUCCESS" } else { "FAILED" };
            let _ = writeln!(
                out,
                "{}. {status} - r/{}",
                index + 1,
                result.subreddit
            );
            let _ = writeln!(out, "   Title: {}", truncate(&result.title, 60));
            if let Some(url) = &result.post_url {
                let _ = writeln!(out, "   URL: {url}");
            }
            if let Some(error) = &result.error {
                let _ = writeln!(out, "   Error: {error}");
            }
        }

        out
    }

    /// Write results to `path`, or to a timestamped JSON file in the
    /// working directory when no path is given. The extension picks the
    /// format.
    pub fn export(&self, path: Option<&Path>) -> Result<PathBuf, CoreError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => PathBuf::from(format!(
                "posting_results_{}.json",
                Local::now().format("%Y%m%d_%H%M%S")
            )),
        };

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match extension.as_deref() {
            Some("json") => {
                let json = serde_json::to_string_pretty(&self.results)?;
                std::fs::write(&path, json)?;
            }
            Some("csv") => {
                let mut writer = csv::Writer::from_path(&path)?;
                for result in &self.results {
                    writer.serialize(CsvResultRow {
                        subreddit: &result.subreddit,
                        title: &result.title,
                        timestamp: result.timestamp.to_rfc3339(),
                        success: result.success,
                        error: result.error.as_deref().unwrap_or(""),
                        post_url: result.post_url.as_deref().unwrap_or(""),
                        post_id: result.post_id.as_deref().unwrap_or(""),
                        dry_run: result.dry_run,
                    })?;
                }
                writer.flush()?;
            }
            _ => {
                return Err(CoreError::UnsupportedInput {
                    path: path.display().to_string(),
                })
            }
        }

        info!(path = %path.display(), count = self.results.len(), "results exported");
        Ok(path)
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let head: String = text.chars().take(max_chars).collect();
        format!("{head}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use redpost_core::PostRecord;

    fn result(success: bool) -> PostResult {
        let record = PostRecord {
            subreddit: "test".to_string(),
            title: "Title".to_string(),
            content: Some("body".to_string()),
            url: None,
            flair: None,
            delay: None,
            image_path: None,
        };
        if success {
            PostResult {
                subreddit: record.subreddit,
                title: record.title,
                timestamp: Utc::now(),
                success: true,
                error: None,
                post_url: Some("https://reddit.com/r/test/comments/x".to_string()),
                post_id: Some("x".to_string()),
                dry_run: false,
            }
        } else {
            PostResult::failure(&record, "boom".to_string(), false)
        }
    }

    #[test]
    fn summary_counts_are_consistent() {
        let report = BatchReport::from_results(vec![result(true), result(false), result(true)]);
        assert_eq!(report.total, 3);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed, 1);
        assert!((report.success_rate() - 66.666).abs() < 0.1);
    }

    #[test]
    fn empty_report_renders_placeholder() {
        let report = BatchReport::from_results(vec![]);
        assert_eq!(report.success_rate(), 0.0);
        assert_eq!(report.render(), "No results to display.");
    }

    #[test]
    fn render_includes_errors_and_urls() {
        let report = BatchReport::from_results(vec![result(true), result(false)]);
        let rendered = report.render();
        assert!(rendered.contains("Success rate: 50.0%"));
        assert!(rendered.contains("1. SUCCESS - r/test"));
        assert!(rendered.contains("2. FAILED - r/test"));
        assert!(rendered.contains("Error: boom"));
        assert!(rendered.contains("URL: https://reddit.com/r/test/comments/x"));
    }

    #[test]
    fn long_titles_are_truncated() {
        assert_eq!(truncate("short", 60), "short");
        let long = "z".repeat(80);
        let truncated = truncate(&long, 60);
        assert_eq!(truncated.chars().count(), 63);
        assert!(truncated.ends_with("..."));
    }

    #[test]
    fn json_export_round_trips() {
        let report = BatchReport::from_results(vec![result(true), result(false)]);
        let path = std::env::temp_dir().join(format!("redpost-report-{}.json", std::process::id()));

        let written = report.export(Some(&path)).unwrap();
        let raw = std::fs::read_to_string(&written).unwrap();
        std::fs::remove_file(&written).unwrap();

        let parsed: Vec<PostResult> = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed.len(), 2);
        assert!(parsed[0].success);
        assert_eq!(parsed[1].error.as_deref(), Some("boom"));
    }

    #[test]
    fn csv_export_writes_header_and_rows() {
        let report = BatchReport::from_results(vec![result(true)]);
        let path = std::env::temp_dir().join(format!("redpost-report-{}.csv", std::process::id()));

        let written = report.export(Some(&path)).unwrap();
        let raw = std::fs::read_to_string(&written).unwrap();
        std::fs::remove_file(&written).unwrap();

        let mut lines = raw.lines();
        assert_eq!(
            lines.next(),
            Some("subreddit,title,timestamp,success,error,post_url,post_id,dry_run")
        );
        assert!(lines.next().unwrap().starts_with("test,Title,"));
    }

    #[test]
    fn unknown_export_extension_is_rejected() {
        let report = BatchReport::from_results(vec![result(true)]);
        let err = report.export(Some(Path::new("results.xml"))).unwrap_err();
        assert!(matches!(err, CoreError::UnsupportedInput { .. }));
    }
}
