use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarvestError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl HarvestError {
    /// Errors after which the browser instance can no longer be trusted
    /// and should be recreated before retrying.
    pub fn is_browser_failure(&self) -> bool {
        matches!(
            self,
            HarvestError::Browser(_) | HarvestError::Navigation(_) | HarvestError::Timeout(_)
        )
    }

    /// Errors that end the whole run instead of a single lesson.
    pub fn is_fatal(&self) -> bool {
        matches!(self, HarvestError::Authentication(_))
    }
}

impl From<crate::config::ConfigError> for HarvestError {
    fn from(e: crate::config::ConfigError) -> Self {
        HarvestError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, HarvestError>;
