use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Reddit API error: {0}")]
    RedditApi(#[from] RedditApiError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Unsupported input format: {path}")]
    UnsupportedInput { path: String },

    #[error("Session limit reached: {reason}")]
    SessionLimit { reason: String },
}

#[derive(Error, Debug, Clone)]
pub enum RedditApiError {
    #[error("Authentication failed: {reason}")]
    AuthenticationFailed { reason: String },

    #[error("Rate limit exceeded. Retry after {retry_after} seconds")]
    RateLimitExceeded { retry_after: u64 },

    #[error("Forbidden access to resource: {resource}")]
    Forbidden { resource: String },

    #[error("Subreddit not found: {subreddit}")]
    SubredditNotFound { subreddit: String },

    #[error("Resource not found: {resource}")]
    NotFound { resource: String },

    #[error("Invalid OAuth token")]
    InvalidToken,

    #[error("Request timeout")]
    RequestTimeout,

    #[error("Invalid API response: {details}")]
    InvalidResponse { details: String },

    #[error("Server error: {status_code}")]
    ServerError { status_code: u16 },

    #[error("Submission rejected: {reason}")]
    SubmissionRejected { reason: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Either 'content', 'url', or 'image_path' must be provided")]
    NoBody,

    #[error("Title too long ({length} characters, max {max})")]
    TitleTooLong { length: usize, max: usize },

    #[error("Content too long ({length} characters, max {max})")]
    ContentTooLong { length: usize, max: usize },

    #[error("Invalid subreddit name: {name}")]
    InvalidSubredditName { name: String },

    #[error("Image file not found: {path}")]
    ImageNotFound { path: String },

    #[error("Unsupported image format: {path} (supported: {supported})")]
    UnsupportedImageFormat { path: String, supported: String },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable not set: {var_name}")]
    MissingEnvironmentVariable { var_name: String },

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },
}

impl CoreError {
    /// Stable category code for log aggregation.
    pub fn error_code(&self) -> &'static str {
        match self {
            CoreError::RedditApi(_) => "REDDIT_API",
            CoreError::Validation(_) => "VALIDATION",
            CoreError::Config(_) => "CONFIG",
            CoreError::Io(_) => "IO",
            CoreError::Serialization(_) => "SERIALIZATION",
            CoreError::Csv(_) => "CSV",
            CoreError::Network(_) => "NETWORK",
            CoreError::UnsupportedInput { .. } => "UNSUPPORTED_INPUT",
            CoreError::SessionLimit { .. } => "SESSION_LIMIT",
        }
    }

    /// Server-suggested wait before the operation could succeed again.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            CoreError::RedditApi(RedditApiError::RateLimitExceeded { retry_after }) => {
                Some(Duration::from_secs(*retry_after))
            }
            _ => None,
        }
    }
}
