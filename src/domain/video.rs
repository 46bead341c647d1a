use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::Platform;

/// Where on the page a candidate was found, when the strategy knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locality {
    /// Inside a lesson, content or player scoped region.
    Content,
    /// Inside navigation, header or other site chrome.
    Chrome,
    #[default]
    Unknown,
}

/// A tentative extraction result, as found in the page.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoCandidate {
    pub raw_url: String,
    pub platform: Platform,
    pub source_strategy: String,
    pub thumbnail_url: Option<String>,
    pub duration_ms: Option<u64>,
    pub locality: Locality,
}

impl VideoCandidate {
    pub fn new(raw_url: impl Into<String>, strategy: &str) -> Self {
        let raw_url = raw_url.into();
        let platform = crate::video::classify(&raw_url);
        Self {
            raw_url,
            platform,
            source_strategy: strategy.to_string(),
            thumbnail_url: None,
            duration_ms: None,
            locality: Locality::Unknown,
        }
    }

    pub fn with_thumbnail(mut self, thumbnail: Option<String>) -> Self {
        self.thumbnail_url = thumbnail.filter(|t| !t.is_empty());
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: Option<u64>) -> Self {
        self.duration_ms = duration_ms.filter(|d| *d > 0);
        self
    }

    pub fn with_locality(mut self, locality: Locality) -> Self {
        self.locality = locality;
        self
    }
}

/// Normalized, identity-bearing form of a video reference.
///
/// Two refs with the same `identity_key` are the same video regardless of
/// how their URLs were formatted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CanonicalVideoRef {
    pub canonical_url: String,
    pub identity_key: String,
    pub platform: Platform,
}

impl CanonicalVideoRef {
    /// Platform specific ID without the `yt:` style prefix.
    pub fn platform_id(&self) -> &str {
        match self.platform.key_prefix() {
            Some(prefix) => self
                .identity_key
                .strip_prefix(prefix)
                .and_then(|rest| rest.strip_prefix(':'))
                .unwrap_or(&self.identity_key),
            None => &self.identity_key,
        }
    }
}

/// A video that passed the final validation checkpoint for a lesson.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedVideo {
    pub reference: CanonicalVideoRef,
    pub strategy: String,
    pub thumbnail_url: Option<String>,
    pub duration_ms: Option<u64>,
    pub resolved_at: DateTime<Utc>,
}

impl ResolvedVideo {
    pub fn url(&self) -> &str {
        &self.reference.canonical_url
    }

    pub fn platform(&self) -> Platform {
        self.reference.platform
    }

    /// Duration formatted as `m:ss`.
    pub fn duration_label(&self) -> Option<String> {
        self.duration_ms.map(|ms| {
            let secs = ms / 1000;
            format!("{}:{:02}", secs / 60, secs % 60)
        })
    }
}
