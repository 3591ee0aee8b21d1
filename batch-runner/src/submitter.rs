use async_trait::async_trait;
use std::path::Path;
use tracing::debug;

use reddit_client::{FlairChoice, RedditClient};
use redpost_core::{CoreError, PostKind, PostRecord, RedditApiError, SubmittedPost};

/// Seam between the batch loop and the Reddit API, so the runner can be
/// driven by the live client or a test double.
#[async_trait]
pub trait Submitter: Send + Sync {
    /// Confirm the subreddit exists and is accessible before posting.
    async fn check_subreddit(&self, subreddit: &str) -> Result<(), CoreError>;

    /// Match requested flair text against the subreddit's templates.
    async fn resolve_flair(&self, subreddit: &str, wanted: &str) -> Option<FlairChoice>;

    async fn submit(
        &self,
        record: &PostRecord,
        flair: Option<FlairChoice>,
    ) -> Result<SubmittedPost, CoreError>;
}

/// Stand-in for dry-run batches. The runner never reaches the submitter
/// in dry-run mode; any unexpected call fails loudly instead of posting.
pub struct OfflineSubmitter;

#[async_trait]
impl Submitter for OfflineSubmitter {
    async fn check_subreddit(&self, _subreddit: &str) -> Result<(), CoreError> {
        Err(CoreError::RedditApi(RedditApiError::InvalidToken))
    }

    async fn resolve_flair(&self, _subreddit: &str, _wanted: &str) -> Option<FlairChoice> {
        None
    }

    async fn submit(
        &self,
        _record: &PostRecord,
        _flair: Option<FlairChoice>,
    ) -> Result<SubmittedPost, CoreError> {
        Err(CoreError::RedditApi(RedditApiError::InvalidToken))
    }
}

#[async_trait]
impl Submitter for RedditClient {
    async fn check_subreddit(&self, subreddit: &str) -> Result<(), CoreError> {
        let about = self.subreddit_about(subreddit).await?;
        debug!(
            subreddit,
            subscribers = about.subscribers.unwrap_or(0),
            "subreddit accessible"
        );
        Ok(())
    }

    async fn resolve_flair(&self, subreddit: &str, wanted: &str) -> Option<FlairChoice> {
        RedditClient::resolve_flair(self, subreddit, wanted).await
    }

    async fn submit(
        &self,
        record: &PostRecord,
        flair: Option<FlairChoice>,
    ) -> Result<SubmittedPost, CoreError> {
        let flair = flair.as_ref();
        match record.kind() {
            PostKind::Image => {
                // kind() only reports Image when the path is non-blank.
                let image_path = record.image_path.as_deref().unwrap_or_default().trim();
                self.submit_image_post(
                    &record.subreddit,
                    &record.title,
                    Path::new(image_path),
                    flair,
                )
                .await
            }
            PostKind::Link => {
                let url = record.url.as_deref().unwrap_or_default().trim();
                self.submit_link_post(&record.subreddit, &record.title, url, flair)
                    .await
            }
            PostKind::SelfPost => {
                let selftext = record.content.as_deref().unwrap_or_default();
                self.submit_self_post(&record.subreddit, &record.title, selftext, flair)
                    .await
            }
        }
    }
}
