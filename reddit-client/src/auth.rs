use serde::Deserialize;
use std::time::{Duration, SystemTime};
use tracing::{debug, info};

use redpost_core::{CoreError, Credentials, RedditApiError};

use crate::api::RedditApiClient;

const TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";

/// Bearer token obtained through the script-app password grant.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub access_token: String,
    pub expires_at: SystemTime,
    pub scope: String,
}

impl AuthSession {
    pub fn is_expired(&self) -> bool {
        SystemTime::now() >= self.expires_at
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
    #[serde(default)]
    scope: Option<String>,
    /// Reddit reports grant failures as 200 with an error field.
    #[serde(default)]
    error: Option<String>,
}

/// Resource-owner password grant: form POST with HTTP basic auth using
/// the app's client id/secret.
pub(crate) async fn password_grant(
    api: &RedditApiClient,
    credentials: &Credentials,
    password: &str,
) -> Result<AuthSession, CoreError> {
    api.throttle().await;
    debug!(username = %credentials.username, "requesting access token");

    let params = [
        ("grant_type", "password"),
        ("username", credentials.username.as_str()),
        ("password", password),
    ];

    let response = api
        .http()
        .post(TOKEN_URL)
        .basic_auth(&credentials.client_id, Some(&credentials.client_secret))
        .header("User-Agent", credentials.user_agent.as_str())
        .form(&params)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(CoreError::RedditApi(RedditApiError::AuthenticationFailed {
            reason: format!("token endpoint returned {status}"),
        }));
    }

    let token: TokenResponse = response.json().await.map_err(|e| {
        CoreError::RedditApi(RedditApiError::InvalidResponse {
            details: format!("failed to parse token response: {e}"),
        })
    })?;

    if let Some(error) = token.error {
        return Err(CoreError::RedditApi(RedditApiError::AuthenticationFailed {
            reason: error,
        }));
    }

    let access_token =
        token
            .access_token
            .ok_or(CoreError::RedditApi(RedditApiError::InvalidResponse {
                details: "token response missing access_token".to_string(),
            }))?;

    let expires_in = token.expires_in.unwrap_or(3600);
    let scope = token.scope.unwrap_or_default();
    info!(expires_in, %scope, "access token obtained");

    Ok(AuthSession {
        access_token,
        expires_at: SystemTime::now() + Duration::from_secs(expires_in),
        scope,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_session_is_not_expired() {
        let session = AuthSession {
            access_token: "tok".to_string(),
            expires_at: SystemTime::now() + Duration::from_secs(3600),
            scope: "*".to_string(),
        };
        assert!(!session.is_expired());
    }

    #[test]
    fn past_expiry_is_expired() {
        let session = AuthSession {
            access_token: "tok".to_string(),
            expires_at: SystemTime::now() - Duration::from_secs(1),
            scope: "*".to_string(),
        };
        assert!(session.is_expired());
    }

    #[test]
    fn token_response_carries_grant_errors() {
        let token: TokenResponse = serde_json::from_str(r#"{"error":"invalid_grant"}"#).unwrap();
        assert_eq!(token.error.as_deref(), Some("invalid_grant"));
        assert!(token.access_token.is_none());
    }

    #[test]
    fn token_response_parses_success_shape() {
        let token: TokenResponse = serde_json::from_str(
            r#"{"access_token":"abc","token_type":"bearer","expires_in":86400,"scope":"*"}"#,
        )
        .unwrap();
        assert_eq!(token.access_token.as_deref(), Some("abc"));
        assert_eq!(token.expires_in, Some(86400));
        assert_eq!(token.scope.as_deref(), Some("*"));
    }
}
