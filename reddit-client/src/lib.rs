pub mod api;
pub mod auth;
pub mod flair;
pub mod rate_limiter;

use std::path::Path;
use tracing::{info, warn};

use redpost_core::{CoreError, Credentials, RedditApiError, SafetySettings, SubmittedPost};

pub use api::{AccountInfo, FlairTemplate, RedditApiClient, SubredditAbout, SubredditRule};
pub use auth::AuthSession;
pub use flair::{resolve_flair, FlairChoice};
pub use rate_limiter::{RateLimitStatus, RateLimiter};

/// Authenticated Reddit client for the submission surface. All calls go
/// through the shared rolling-window rate limiter.
#[derive(Debug)]
pub struct RedditClient {
    api: RedditApiClient,
    credentials: Credentials,
    session: Option<AuthSession>,
}

impl RedditClient {
    pub fn new(credentials: Credentials, settings: &SafetySettings) -> Result<Self, CoreError> {
        let api = RedditApiClient::new(credentials.user_agent.clone(), settings)?;
        Ok(Self {
            api,
            credentials,
            session: None,
        })
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.as_ref().is_some_and(|s| !s.is_expired())
    }

    pub fn username(&self) -> &str {
        &self.credentials.username
    }

    /// Password-grant login followed by an identity check, so a bad token
    /// surfaces here rather than on the first submission.
    pub async fn authenticate(&mut self, password: &str) -> Result<AccountInfo, CoreError> {
        let session = auth::password_grant(&self.api, &self.credentials, password).await?;
        self.session = Some(session);

        let account = self.api.get_account_info(self.token()?).await?;
        info!(username = %account.name, "authenticated");
        Ok(account)
    }

    fn token(&self) -> Result<&str, CoreError> {
        match &self.session {
            Some(session) if !session.is_expired() => Ok(session.access_token.as_str()),
            _ => Err(CoreError::RedditApi(RedditApiError::InvalidToken)),
        }
    }

    pub async fn subreddit_about(&self, subreddit: &str) -> Result<SubredditAbout, CoreError> {
        self.api.get_subreddit_about(self.token()?, subreddit).await
    }

    pub async fn subreddit_rules(&self, subreddit: &str) -> Result<Vec<SubredditRule>, CoreError> {
        self.api.get_subreddit_rules(self.token()?, subreddit).await
    }

    pub async fn link_flair_templates(
        &self,
        subreddit: &str,
    ) -> Result<Vec<FlairTemplate>, CoreError> {
        self.api
            .get_link_flair_templates(self.token()?, subreddit)
            .await
    }

    /// Fetch templates and match the requested text against them. A
    /// fetch failure (restricted flair access is common) degrades to the
    /// raw-text fallback rather than failing the record.
    pub async fn resolve_flair(&self, subreddit: &str, wanted: &str) -> Option<FlairChoice> {
        match self.link_flair_templates(subreddit).await {
            Ok(templates) => flair::resolve_flair(&templates, wanted),
            Err(e) => {
                warn!(subreddit, error = %e, "could not fetch flair templates");
                flair::resolve_flair(&[], wanted)
            }
        }
    }

    pub async fn submit_self_post(
        &self,
        subreddit: &str,
        title: &str,
        selftext: &str,
        flair: Option<&FlairChoice>,
    ) -> Result<SubmittedPost, CoreError> {
        self.api
            .submit_self_post(self.token()?, subreddit, title, selftext, flair)
            .await
    }

    pub async fn submit_link_post(
        &self,
        subreddit: &str,
        title: &str,
        url: &str,
        flair: Option<&FlairChoice>,
    ) -> Result<SubmittedPost, CoreError> {
        self.api
            .submit_link_post(self.token()?, subreddit, title, url, flair)
            .await
    }

    pub async fn submit_image_post(
        &self,
        subreddit: &str,
        title: &str,
        image_path: &Path,
        flair: Option<&FlairChoice>,
    ) -> Result<SubmittedPost, CoreError> {
        self.api
            .submit_image_post(self.token()?, subreddit, title, image_path, flair)
            .await
    }

    pub async fn rate_limit_status(&self) -> RateLimitStatus {
        self.api.rate_limit_status().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};

    fn client() -> RedditClient {
        let credentials = Credentials::new(
            "test_client_id".to_string(),
            "test_client_secret".to_string(),
            "test_user".to_string(),
        );
        RedditClient::new(credentials, &SafetySettings::default()).unwrap()
    }

    #[test]
    fn new_client_is_unauthenticated() {
        let client = client();
        assert!(!client.is_authenticated());
        assert_eq!(client.username(), "test_user");
        assert!(matches!(
            client.token(),
            Err(CoreError::RedditApi(RedditApiError::InvalidToken))
        ));
    }

    #[test]
    fn expired_session_counts_as_unauthenticated() {
        let mut client = client();
        client.session = Some(AuthSession {
            access_token: "tok".to_string(),
            expires_at: SystemTime::now() - Duration::from_secs(1),
            scope: "*".to_string(),
        });
        assert!(!client.is_authenticated());
        assert!(client.token().is_err());
    }

    #[test]
    fn valid_session_exposes_token() {
        let mut client = client();
        client.session = Some(AuthSession {
            access_token: "tok".to_string(),
            expires_at: SystemTime::now() + Duration::from_secs(3600),
            scope: "*".to_string(),
        });
        assert!(client.is_authenticated());
        assert_eq!(client.token().unwrap(), "tok");
    }
}
