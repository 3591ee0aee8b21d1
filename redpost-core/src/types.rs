use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One post to submit, as parsed from a JSON object or CSV row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PostRecord {
    pub subreddit: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flair: Option<String>,
    /// Per-post delay override in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostKind {
    SelfPost,
    Link,
    Image,
}

impl PostRecord {
    /// Image beats link beats self text, matching how the fields are
    /// prioritized at submission time.
    pub fn kind(&self) -> PostKind {
        if self.image_path.as_deref().is_some_and(|p| !p.trim().is_empty()) {
            PostKind::Image
        } else if self.url.as_deref().is_some_and(|u| !u.trim().is_empty()) {
            PostKind::Link
        } else {
            PostKind::SelfPost
        }
    }
}

/// Identity of a successfully created submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubmittedPost {
    pub id: String,
    pub url: String,
}

/// Outcome of one record, success or failure. Exactly one of these is
/// produced per input record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostResult {
    pub subreddit: String,
    pub title: String,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_id: Option<String>,
    pub dry_run: bool,
}

impl PostResult {
    pub fn success(record: &PostRecord, submitted: SubmittedPost, dry_run: bool) -> Self {
        Self {
            subreddit: record.subreddit.clone(),
            title: record.title.clone(),
            timestamp: Utc::now(),
            success: true,
            error: None,
            post_url: Some(submitted.url),
            post_id: Some(submitted.id),
            dry_run,
        }
    }

    pub fn failure(record: &PostRecord, error: String, dry_run: bool) -> Self {
        Self {
            subreddit: record.subreddit.clone(),
            title: record.title.clone(),
            timestamp: Utc::now(),
            success: false,
            error: Some(error),
            post_url: None,
            post_id: None,
            dry_run,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> PostRecord {
        PostRecord {
            subreddit: "test".to_string(),
            title: "A title".to_string(),
            content: Some("body".to_string()),
            url: None,
            flair: None,
            delay: None,
            image_path: None,
        }
    }

    #[test]
    fn kind_prefers_image_then_url_then_content() {
        let mut rec = record();
        assert_eq!(rec.kind(), PostKind::SelfPost);

        rec.url = Some("https://example.com".to_string());
        assert_eq!(rec.kind(), PostKind::Link);

        rec.image_path = Some("photo.png".to_string());
        assert_eq!(rec.kind(), PostKind::Image);
    }

    #[test]
    fn blank_fields_do_not_change_kind() {
        let mut rec = record();
        rec.url = Some("   ".to_string());
        rec.image_path = Some(String::new());
        assert_eq!(rec.kind(), PostKind::SelfPost);
    }

    #[test]
    fn record_deserializes_with_missing_optionals() {
        let rec: PostRecord =
            serde_json::from_str(r#"{"subreddit":"test","title":"t","content":"c"}"#).unwrap();
        assert_eq!(rec.subreddit, "test");
        assert_eq!(rec.flair, None);
        assert_eq!(rec.delay, None);
    }

    #[test]
    fn failure_result_echoes_record_identity() {
        let rec = record();
        let result = PostResult::failure(&rec, "boom".to_string(), true);
        assert_eq!(result.subreddit, "test");
        assert_eq!(result.title, "A title");
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("boom"));
        assert!(result.dry_run);
    }
}
