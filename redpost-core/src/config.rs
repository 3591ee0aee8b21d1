use std::time::Duration;

use crate::error::ConfigError;

pub const ENV_CLIENT_ID: &str = "REDPOST_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "REDPOST_CLIENT_SECRET";
pub const ENV_USERNAME: &str = "REDPOST_USERNAME";
pub const ENV_PASSWORD: &str = "REDPOST_PASSWORD";

/// Reddit script-app credentials, loaded from the environment. The
/// password is deliberately not part of this struct; it is supplied per
/// run for live mode only.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub user_agent: String,
}

impl Credentials {
    pub fn from_env() -> Result<Self, ConfigError> {
        let client_id = require_env(ENV_CLIENT_ID)?;
        let client_secret = require_env(ENV_CLIENT_SECRET)?;
        let username = require_env(ENV_USERNAME)?;
        Ok(Self::new(client_id, client_secret, username))
    }

    pub fn new(client_id: String, client_secret: String, username: String) -> Self {
        // User agent format per Reddit's API guidelines.
        let user_agent = format!(
            "redpost/{} (by u/{})",
            env!("CARGO_PKG_VERSION"),
            username
        );
        Self {
            client_id,
            client_secret,
            username,
            user_agent,
        }
    }
}

fn require_env(var_name: &str) -> Result<String, ConfigError> {
    match std::env::var(var_name) {
        Ok(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(ConfigError::MissingEnvironmentVariable {
            var_name: var_name.to_string(),
        }),
    }
}

/// Delay, rate-limit, and session-cap settings. Defaults stay well under
/// Reddit's documented limits.
#[derive(Debug, Clone)]
pub struct SafetySettings {
    /// Lower clamp for the default inter-post delay.
    pub min_delay: Duration,
    /// Upper clamp for the default inter-post delay.
    pub max_delay: Duration,
    /// Used when a record carries no delay override.
    pub default_delay: Duration,
    /// Rolling-window request ceiling (Reddit allows 60/min).
    pub max_requests_per_minute: u32,
    pub request_window: Duration,
    /// Hard cap on live submissions per run.
    pub max_posts_per_session: u32,
    pub max_session_duration: Duration,
}

impl Default for SafetySettings {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_secs(30),
            max_delay: Duration::from_secs(300),
            default_delay: Duration::from_secs(90),
            max_requests_per_minute: 50,
            request_window: Duration::from_secs(60),
            max_posts_per_session: 50,
            max_session_duration: Duration::from_secs(2 * 60 * 60),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_agent_includes_username() {
        let creds = Credentials::new("id".to_string(), "secret".to_string(), "poster".to_string());
        assert!(creds.user_agent.starts_with("redpost/"));
        assert!(creds.user_agent.ends_with("(by u/poster)"));
    }

    #[test]
    fn defaults_match_documented_limits() {
        let settings = SafetySettings::default();
        assert_eq!(settings.default_delay, Duration::from_secs(90));
        assert_eq!(settings.max_requests_per_minute, 50);
        assert_eq!(settings.max_posts_per_session, 50);
        assert!(settings.min_delay <= settings.default_delay);
        assert!(settings.default_delay <= settings.max_delay);
    }
}
