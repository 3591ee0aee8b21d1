use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use redpost_core::{CoreError, PostRecord};

/// Read a batch from a `.json` or `.csv` file, dispatching on extension.
pub fn load_records(path: &Path) -> Result<Vec<PostRecord>, CoreError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    let records = match extension.as_deref() {
        Some("json") => read_json(path)?,
        Some("csv") => read_csv(path)?,
        _ => {
            return Err(CoreError::UnsupportedInput {
                path: path.display().to_string(),
            })
        }
    };

    info!(path = %path.display(), count = records.len(), "loaded records");
    Ok(records)
}

/// A JSON file holds either an array of records or a single object,
/// which is treated as a one-element batch.
fn read_json(path: &Path) -> Result<Vec<PostRecord>, CoreError> {
    let raw = fs::read_to_string(path)?;
    let value: serde_json::Value = serde_json::from_str(&raw)?;

    if value.is_array() {
        Ok(serde_json::from_value(value)?)
    } else {
        let record: PostRecord = serde_json::from_value(value)?;
        Ok(vec![record])
    }
}

/// CSV rows as they appear on disk: everything is an optional string,
/// normalized into a `PostRecord` afterwards.
#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(default)]
    subreddit: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    flair: Option<String>,
    #[serde(default)]
    delay: Option<String>,
    #[serde(default)]
    image_path: Option<String>,
}

fn read_csv(path: &Path) -> Result<Vec<PostRecord>, CoreError> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut records = Vec::new();

    for row in reader.deserialize::<CsvRow>() {
        let row = row?;
        records.push(normalize_row(row));
    }

    Ok(records)
}

fn normalize_row(row: CsvRow) -> PostRecord {
    let mut content = blank_to_none(row.content);
    let mut url = None;

    // A URL in the content column means a link post.
    let content_is_url = content
        .as_deref()
        .is_some_and(|t| t.starts_with("http://") || t.starts_with("https://"));
    if content_is_url {
        url = content.take();
        if let Some(moved) = &url {
            debug!(url = %moved, "moving content URL to url field");
        }
    }

    PostRecord {
        subreddit: row.subreddit.unwrap_or_default().trim().to_string(),
        title: row.title.unwrap_or_default().trim().to_string(),
        content,
        url,
        flair: blank_to_none(row.flair),
        delay: parse_delay(row.delay.as_deref()),
        image_path: blank_to_none(row.image_path),
    }
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Spreadsheets export delays as "90", "90.0", or garbage; anything
/// unparseable falls back to the configured default downstream.
fn parse_delay(value: Option<&str>) -> Option<u64> {
    let value = value?.trim();
    if value.is_empty() {
        return None;
    }
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(|v| v as u64)
}
