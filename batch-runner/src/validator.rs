use std::path::Path;

use redpost_core::{PostRecord, ValidationError};

/// Reddit's documented limits.
const MAX_TITLE_CHARS: usize = 300;
const MAX_CONTENT_CHARS: usize = 40_000;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// Field-presence, length, and image checks. Run once when a batch is
/// loaded and again immediately before each submission.
pub fn validate_record(record: &PostRecord) -> Result<(), ValidationError> {
    let subreddit = record.subreddit.trim();
    if subreddit.is_empty() {
        return Err(ValidationError::MissingField {
            field: "subreddit".to_string(),
        });
    }

    if record.title.trim().is_empty() {
        return Err(ValidationError::MissingField {
            field: "title".to_string(),
        });
    }

    let has_content = record.content.as_deref().is_some_and(|c| !c.trim().is_empty());
    let has_url = record.url.as_deref().is_some_and(|u| !u.trim().is_empty());
    let has_image = record
        .image_path
        .as_deref()
        .is_some_and(|p| !p.trim().is_empty());

    if !has_content && !has_url && !has_image {
        return Err(ValidationError::NoBody);
    }

    if has_image {
        if let Some(image_path) = record.image_path.as_deref() {
            let image_path = image_path.trim();
            let path = Path::new(image_path);
            if !path.exists() {
                return Err(ValidationError::ImageNotFound {
                    path: image_path.to_string(),
                });
            }
            let extension = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.to_ascii_lowercase());
            if !extension
                .as_deref()
                .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e))
            {
                return Err(ValidationError::UnsupportedImageFormat {
                    path: image_path.to_string(),
                    supported: IMAGE_EXTENSIONS.join(", "),
                });
            }
        }
    }

    let title_len = record.title.chars().count();
    if title_len > MAX_TITLE_CHARS {
        return Err(ValidationError::TitleTooLong {
            length: title_len,
            max: MAX_TITLE_CHARS,
        });
    }

    if let Some(content) = record.content.as_deref() {
        let content_len = content.chars().count();
        if content_len > MAX_CONTENT_CHARS {
            return Err(ValidationError::ContentTooLong {
                length: content_len,
                max: MAX_CONTENT_CHARS,
            });
        }
    }

    if !subreddit
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(ValidationError::InvalidSubredditName {
            name: subreddit.to_string(),
        });
    }

    Ok(())
}

/// Split a batch into valid records and "record N: reason" messages for
/// the rest, preserving input order among the valid ones.
pub fn partition_valid(records: &[PostRecord]) -> (Vec<PostRecord>, Vec<String>) {
    let mut valid = Vec::with_capacity(records.len());
    let mut errors = Vec::new();

    for (index, record) in records.iter().enumerate() {
        match validate_record(record) {
            Ok(()) => valid.push(record.clone()),
            Err(e) => errors.push(format!("record {}: {e}", index + 1)),
        }
    }

    (valid, errors)
}
