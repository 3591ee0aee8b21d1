use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use redpost_core::{CoreError, RedditApiError, SafetySettings, SubmittedPost};

use crate::flair::FlairChoice;
use crate::rate_limiter::{RateLimitStatus, RateLimiter};

const REDDIT_API_BASE: &str = "https://oauth.reddit.com";

/// Wrapper Reddit puts around most single objects ("t5" for subreddits).
#[derive(Debug, Clone, Deserialize)]
pub struct Thing<T> {
    pub kind: String,
    pub data: T,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubredditAbout {
    pub display_name: String,
    pub title: String,
    #[serde(default)]
    pub public_description: String,
    #[serde(default)]
    pub subscribers: Option<u64>,
    #[serde(default)]
    pub over18: Option<bool>,
    /// "any", "link", or "self".
    #[serde(default)]
    pub submission_type: Option<String>,
    #[serde(default)]
    pub allow_images: Option<bool>,
    #[serde(default)]
    pub allow_videos: Option<bool>,
    #[serde(default)]
    pub link_flair_enabled: Option<bool>,
    #[serde(default)]
    pub quarantine: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubredditRule {
    pub short_name: String,
    #[serde(default)]
    pub description: String,
    /// "comment", "link", or "all".
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub violation_reason: Option<String>,
    #[serde(default)]
    pub priority: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct RulesEnvelope {
    #[serde(default)]
    rules: Vec<SubredditRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlairTemplate {
    pub id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub mod_only: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub link_karma: Option<i64>,
    #[serde(default)]
    pub comment_karma: Option<i64>,
}

/// `/api/submit` response with `api_type=json`: errors come back as an
/// array of [code, message, field] triples.
#[derive(Debug, Deserialize)]
struct SubmitEnvelope {
    json: SubmitBody,
}

#[derive(Debug, Deserialize)]
struct SubmitBody {
    #[serde(default)]
    errors: Vec<Vec<serde_json::Value>>,
    #[serde(default)]
    data: Option<SubmitData>,
}

#[derive(Debug, Deserialize)]
struct SubmitData {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MediaLease {
    args: MediaLeaseArgs,
    asset: MediaAsset,
}

#[derive(Debug, Deserialize)]
struct MediaLeaseArgs {
    /// Upload host, protocol-relative ("//reddit-uploaded-media...").
    action: String,
    fields: Vec<MediaLeaseField>,
}

#[derive(Debug, Deserialize)]
struct MediaLeaseField {
    name: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct MediaAsset {
    asset_id: String,
}

#[derive(Debug)]
pub struct RedditApiClient {
    http_client: Client,
    rate_limiter: Arc<RateLimiter>,
    user_agent: String,
}

impl RedditApiClient {
    pub fn new(user_agent: String, settings: &SafetySettings) -> Result<Self, CoreError> {
        let http_client = Client::builder()
            .user_agent(&user_agent)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http_client,
            rate_limiter: Arc::new(RateLimiter::from_settings(settings)),
            user_agent,
        })
    }

    pub(crate) fn http(&self) -> &Client {
        &self.http_client
    }

    pub(crate) async fn throttle(&self) {
        self.rate_limiter.acquire().await;
    }

    pub async fn rate_limit_status(&self) -> RateLimitStatus {
        self.rate_limiter.status().await
    }

    async fn get(
        &self,
        endpoint: &str,
        access_token: &str,
        query: &[(&str, &str)],
    ) -> Result<Response, CoreError> {
        let url = format!("{REDDIT_API_BASE}{endpoint}");
        let request = self
            .http_client
            .get(&url)
            .bearer_auth(access_token)
            .header("User-Agent", &self.user_agent)
            .query(query);
        self.execute(request, endpoint).await
    }

    async fn post_form(
        &self,
        endpoint: &str,
        access_token: &str,
        form: &[(&str, &str)],
    ) -> Result<Response, CoreError> {
        let url = format!("{REDDIT_API_BASE}{endpoint}");
        let request = self
            .http_client
            .post(&url)
            .bearer_auth(access_token)
            .header("User-Agent", &self.user_agent)
            .form(form);
        self.execute(request, endpoint).await
    }

    async fn execute(
        &self,
        request: reqwest::RequestBuilder,
        endpoint: &str,
    ) -> Result<Response, CoreError> {
        self.rate_limiter.acquire().await;
        debug!(endpoint, "sending Reddit API request");

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                error!(endpoint, error = %e, "network error");
                if e.is_timeout() {
                    return Err(CoreError::RedditApi(RedditApiError::RequestTimeout));
                }
                return Err(CoreError::Network(e));
            }
        };

        let status = response.status();
        if status.is_success() {
            debug!(endpoint, %status, "request successful");
            return Ok(response);
        }

        error!(endpoint, %status, "request failed");
        match status.as_u16() {
            429 => {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(60);
                warn!(endpoint, retry_after, "rate limited by server");
                Err(CoreError::RedditApi(RedditApiError::RateLimitExceeded {
                    retry_after,
                }))
            }
            401 => Err(CoreError::RedditApi(RedditApiError::InvalidToken)),
            403 => Err(CoreError::RedditApi(RedditApiError::Forbidden {
                resource: endpoint.to_string(),
            })),
            404 => Err(CoreError::RedditApi(RedditApiError::NotFound {
                resource: endpoint.to_string(),
            })),
            code if status.is_server_error() => {
                Err(CoreError::RedditApi(RedditApiError::ServerError {
                    status_code: code,
                }))
            }
            code => Err(CoreError::RedditApi(RedditApiError::InvalidResponse {
                details: format!("unexpected status {code} for {endpoint}"),
            })),
        }
    }

    pub async fn get_account_info(&self, access_token: &str) -> Result<AccountInfo, CoreError> {
        let response = self.get("/api/v1/me", access_token, &[]).await?;
        let account: AccountInfo = response.json().await.map_err(|e| {
            CoreError::RedditApi(RedditApiError::InvalidResponse {
                details: format!("failed to parse account info: {e}"),
            })
        })?;
        debug!(username = %account.name, "retrieved account info");
        Ok(account)
    }

    pub async fn get_subreddit_about(
        &self,
        access_token: &str,
        subreddit: &str,
    ) -> Result<SubredditAbout, CoreError> {
        let endpoint = format!("/r/{subreddit}/about");
        let response = self
            .get(&endpoint, access_token, &[("raw_json", "1")])
            .await
            .map_err(|e| subreddit_not_found(e, subreddit))?;

        let thing: Thing<SubredditAbout> = response.json().await.map_err(|e| {
            CoreError::RedditApi(RedditApiError::InvalidResponse {
                details: format!("failed to parse r/{subreddit} info: {e}"),
            })
        })?;
        debug!(subreddit, "retrieved subreddit info");
        Ok(thing.data)
    }

    pub async fn get_subreddit_rules(
        &self,
        access_token: &str,
        subreddit: &str,
    ) -> Result<Vec<SubredditRule>, CoreError> {
        let endpoint = format!("/r/{subreddit}/about/rules");
        let response = self
            .get(&endpoint, access_token, &[("raw_json", "1")])
            .await
            .map_err(|e| subreddit_not_found(e, subreddit))?;

        let envelope: RulesEnvelope = response.json().await.map_err(|e| {
            CoreError::RedditApi(RedditApiError::InvalidResponse {
                details: format!("failed to parse r/{subreddit} rules: {e}"),
            })
        })?;
        info!(subreddit, count = envelope.rules.len(), "retrieved rules");
        Ok(envelope.rules)
    }

    pub async fn get_link_flair_templates(
        &self,
        access_token: &str,
        subreddit: &str,
    ) -> Result<Vec<FlairTemplate>, CoreError> {
        let endpoint = format!("/r/{subreddit}/api/link_flair_v2");
        let response = self
            .get(&endpoint, access_token, &[("raw_json", "1")])
            .await?;

        let templates: Vec<FlairTemplate> = response.json().await.map_err(|e| {
            CoreError::RedditApi(RedditApiError::InvalidResponse {
                details: format!("failed to parse r/{subreddit} flair templates: {e}"),
            })
        })?;
        debug!(subreddit, count = templates.len(), "retrieved flair templates");
        Ok(templates)
    }

    pub async fn submit_self_post(
        &self,
        access_token: &str,
        subreddit: &str,
        title: &str,
        selftext: &str,
        flair: Option<&FlairChoice>,
    ) -> Result<SubmittedPost, CoreError> {
        let mut form = vec![
            ("api_type", "json"),
            ("kind", "self"),
            ("sr", subreddit),
            ("title", title),
            ("text", selftext),
        ];
        push_flair(&mut form, flair);
        self.submit_with_token(access_token, subreddit, &form).await
    }

    pub async fn submit_link_post(
        &self,
        access_token: &str,
        subreddit: &str,
        title: &str,
        url: &str,
        flair: Option<&FlairChoice>,
    ) -> Result<SubmittedPost, CoreError> {
        let mut form = vec![
            ("api_type", "json"),
            ("kind", "link"),
            ("sr", subreddit),
            ("title", title),
            ("url", url),
        ];
        push_flair(&mut form, flair);
        self.submit_with_token(access_token, subreddit, &form).await
    }

    /// Image submission is a three-step dance: obtain an S3 upload lease,
    /// multipart-upload the file to the lease host, then submit a link
    /// post of kind "image" pointing at the uploaded asset.
    pub async fn submit_image_post(
        &self,
        access_token: &str,
        subreddit: &str,
        title: &str,
        image_path: &Path,
        flair: Option<&FlairChoice>,
    ) -> Result<SubmittedPost, CoreError> {
        let file_name = image_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        let mime_type = image_mime_type(image_path);

        let lease = self
            .request_media_lease(access_token, &file_name, mime_type)
            .await?;
        let image_url = self.upload_media(&lease, image_path, &file_name, mime_type).await?;

        info!(subreddit, %image_url, "image uploaded, submitting post");
        let mut form = vec![
            ("api_type", "json"),
            ("kind", "image"),
            ("sr", subreddit),
            ("title", title),
            ("url", image_url.as_str()),
        ];
        push_flair(&mut form, flair);

        match self.submit_with_token(access_token, subreddit, &form).await {
            Ok(submitted) => Ok(submitted),
            // Image submissions report their final location over a
            // websocket we do not listen on, so the submit response can
            // be empty. The asset link is the best identity we have.
            Err(CoreError::RedditApi(RedditApiError::InvalidResponse { .. })) => {
                Ok(SubmittedPost {
                    id: lease.asset.asset_id.clone(),
                    url: image_url,
                })
            }
            Err(e) => Err(e),
        }
    }

    async fn request_media_lease(
        &self,
        access_token: &str,
        file_name: &str,
        mime_type: &str,
    ) -> Result<MediaLease, CoreError> {
        let form = [("filepath", file_name), ("mimetype", mime_type)];
        let response = self
            .post_form("/api/media/asset.json", access_token, &form)
            .await?;

        let lease: MediaLease = response.json().await.map_err(|e| {
            CoreError::RedditApi(RedditApiError::InvalidResponse {
                details: format!("failed to parse media lease: {e}"),
            })
        })?;
        debug!(asset_id = %lease.asset.asset_id, "media lease granted");
        Ok(lease)
    }

    async fn upload_media(
        &self,
        lease: &MediaLease,
        image_path: &Path,
        file_name: &str,
        mime_type: &str,
    ) -> Result<String, CoreError> {
        let upload_url = if lease.args.action.starts_with("//") {
            format!("https:{}", lease.args.action)
        } else {
            lease.args.action.clone()
        };

        let key = lease
            .args
            .fields
            .iter()
            .find(|f| f.name == "key")
            .map(|f| f.value.clone())
            .ok_or(CoreError::RedditApi(RedditApiError::InvalidResponse {
                details: "media lease missing object key".to_string(),
            }))?;

        let bytes = tokio::fs::read(image_path).await?;
        let mut multipart = reqwest::multipart::Form::new();
        for field in &lease.args.fields {
            multipart = multipart.text(field.name.clone(), field.value.clone());
        }
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(mime_type)
            .map_err(|e| {
                CoreError::RedditApi(RedditApiError::InvalidResponse {
                    details: format!("invalid mime type {mime_type}: {e}"),
                })
            })?;
        multipart = multipart.part("file", part);

        self.rate_limiter.acquire().await;
        let response = self
            .http_client
            .post(&upload_url)
            .multipart(multipart)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            error!(%status, "media upload rejected");
            return Err(CoreError::RedditApi(RedditApiError::InvalidResponse {
                details: format!("media upload returned {status}"),
            }));
        }

        Ok(format!("{upload_url}/{key}"))
    }

    async fn submit_with_token(
        &self,
        access_token: &str,
        subreddit: &str,
        form: &[(&str, &str)],
    ) -> Result<SubmittedPost, CoreError> {
        let response = self.post_form("/api/submit", access_token, form).await?;

        let envelope: SubmitEnvelope = response.json().await.map_err(|e| {
            CoreError::RedditApi(RedditApiError::InvalidResponse {
                details: format!("failed to parse submit response: {e}"),
            })
        })?;

        parse_submit_body(envelope, subreddit)
    }
}

fn parse_submit_body(envelope: SubmitEnvelope, subreddit: &str) -> Result<SubmittedPost, CoreError> {
    if !envelope.json.errors.is_empty() {
        let reason = envelope
            .json
            .errors
            .iter()
            .map(|entry| {
                entry
                    .iter()
                    .filter_map(|v| v.as_str())
                    .collect::<Vec<_>>()
                    .join(": ")
            })
            .collect::<Vec<_>>()
            .join("; ");
        warn!(subreddit, %reason, "submission rejected");
        return Err(CoreError::RedditApi(RedditApiError::SubmissionRejected {
            reason,
        }));
    }

    let data = envelope
        .json
        .data
        .ok_or(CoreError::RedditApi(RedditApiError::InvalidResponse {
            details: "submit response missing data".to_string(),
        }))?;

    match (data.id, data.url) {
        (Some(id), Some(url)) => {
            info!(subreddit, %id, "post submitted");
            Ok(SubmittedPost { id, url })
        }
        _ => Err(CoreError::RedditApi(RedditApiError::InvalidResponse {
            details: "submit response missing id or url".to_string(),
        })),
    }
}

fn push_flair<'a>(form: &mut Vec<(&'a str, &'a str)>, flair: Option<&'a FlairChoice>) {
    match flair {
        Some(FlairChoice::Template { id }) => form.push(("flair_id", id.as_str())),
        Some(FlairChoice::Text(text)) => form.push(("flair_text", text.as_str())),
        None => {}
    }
}

fn subreddit_not_found(error: CoreError, subreddit: &str) -> CoreError {
    match error {
        CoreError::RedditApi(RedditApiError::NotFound { .. }) => {
            CoreError::RedditApi(RedditApiError::SubredditNotFound {
                subreddit: subreddit.to_string(),
            })
        }
        other => other,
    }
}

fn image_mime_type(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submit_errors_become_rejections() {
        let envelope: SubmitEnvelope = serde_json::from_str(
            r#"{"json":{"errors":[["RATELIMIT","you are doing that too much","ratelimit"]]}}"#,
        )
        .unwrap();
        let err = parse_submit_body(envelope, "test").unwrap_err();
        match err {
            CoreError::RedditApi(RedditApiError::SubmissionRejected { reason }) => {
                assert!(reason.contains("RATELIMIT"));
                assert!(reason.contains("too much"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn submit_success_yields_id_and_url() {
        let envelope: SubmitEnvelope = serde_json::from_str(
            r#"{"json":{"errors":[],"data":{"id":"abc123","name":"t3_abc123","url":"https://www.reddit.com/r/test/comments/abc123/hello/"}}}"#,
        )
        .unwrap();
        let submitted = parse_submit_body(envelope, "test").unwrap();
        assert_eq!(submitted.id, "abc123");
        assert!(submitted.url.contains("/r/test/"));
    }

    #[test]
    fn submit_without_data_is_invalid_response() {
        let envelope: SubmitEnvelope = serde_json::from_str(r#"{"json":{"errors":[]}}"#).unwrap();
        let err = parse_submit_body(envelope, "test").unwrap_err();
        assert!(matches!(
            err,
            CoreError::RedditApi(RedditApiError::InvalidResponse { .. })
        ));
    }

    #[test]
    fn subreddit_about_parses_thing_wrapper() {
        let thing: Thing<SubredditAbout> = serde_json::from_str(
            r#"{"kind":"t5","data":{"display_name":"rust","title":"Rust","subscribers":300000,"over18":false,"submission_type":"any"}}"#,
        )
        .unwrap();
        assert_eq!(thing.kind, "t5");
        assert_eq!(thing.data.display_name, "rust");
        assert_eq!(thing.data.subscribers, Some(300000));
    }

    #[test]
    fn flair_templates_parse_v2_shape() {
        let templates: Vec<FlairTemplate> = serde_json::from_str(
            r#"[{"id":"t1","text":"Discussion","mod_only":false},{"id":"t2","text":"Meta","mod_only":true}]"#,
        )
        .unwrap();
        assert_eq!(templates.len(), 2);
        assert!(templates[1].mod_only);
    }

    #[test]
    fn media_lease_parses_protocol_relative_action() {
        let lease: MediaLease = serde_json::from_str(
            r#"{"args":{"action":"//reddit-uploaded-media.s3-accelerate.amazonaws.com","fields":[{"name":"key","value":"rte_images/xyz"}]},"asset":{"asset_id":"asset1"}}"#,
        )
        .unwrap();
        assert!(lease.args.action.starts_with("//"));
        assert_eq!(lease.asset.asset_id, "asset1");
    }

    #[test]
    fn mime_type_follows_extension() {
        assert_eq!(image_mime_type(Path::new("a.PNG")), "image/png");
        assert_eq!(image_mime_type(Path::new("a.jpeg")), "image/jpeg");
        assert_eq!(image_mime_type(Path::new("a.bin")), "application/octet-stream");
    }

    #[test]
    fn not_found_maps_to_subreddit_not_found() {
        let err = CoreError::RedditApi(RedditApiError::NotFound {
            resource: "/r/nope/about".to_string(),
        });
        let mapped = subreddit_not_found(err, "nope");
        assert!(matches!(
            mapped,
            CoreError::RedditApi(RedditApiError::SubredditNotFound { ref subreddit }) if subreddit == "nope"
        ));
    }
}
