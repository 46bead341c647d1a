use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timeouts and waits used by the extraction strategies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionSettings {
    /// Upper bound for a single strategy in seconds (default: 20)
    pub strategy_timeout_secs: u64,

    /// Polling waits after clicking a video thumbnail, in milliseconds
    pub reveal_waits_ms: Vec<u64>,

    /// How long the legacy strategy waits for the player iframe (default: 10000)
    pub legacy_wait_ms: u64,

    /// Interval between DOM polls in milliseconds (default: 500)
    pub poll_interval_ms: u64,

    /// Elements above this offset are treated as site header (default: 200)
    pub header_cutoff_px: f64,

    /// Shortest URL accepted as a video reference (default: 15)
    pub min_url_length: usize,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            strategy_timeout_secs: 20,
            reveal_waits_ms: vec![2000, 3000, 5000],
            legacy_wait_ms: 10_000,
            poll_interval_ms: 500,
            header_cutoff_px: 200.0,
            min_url_length: crate::video::gate::DEFAULT_MIN_URL_LENGTH,
        }
    }
}

impl ExtractionSettings {
    pub fn strategy_timeout(&self) -> Duration {
        Duration::from_secs(self.strategy_timeout_secs)
    }

    pub fn reveal_waits(&self) -> impl Iterator<Item = Duration> + '_ {
        self.reveal_waits_ms.iter().map(|ms| Duration::from_millis(*ms))
    }

    pub fn legacy_wait(&self) -> Duration {
        Duration::from_millis(self.legacy_wait_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    /// No waiting at all. Used against pages that are already settled.
    #[cfg(test)]
    pub fn immediate() -> Self {
        Self {
            reveal_waits_ms: vec![0],
            legacy_wait_ms: 0,
            poll_interval_ms: 1,
            ..Default::default()
        }
    }
}

/// When to throw away the browser instead of reusing it between lessons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IsolationSettings {
    pub enabled: bool,

    /// The first N lessons always get a fresh browser (default: 3)
    pub early_lessons: usize,

    /// Every Nth lesson gets a fresh browser (default: 5)
    pub frequency: usize,

    /// Lessons allowed on one shared browser before recreating it (default: 10)
    pub max_shared_lessons: usize,

    /// Title words that mark lessons prone to cached-video leaks
    pub problematic_keywords: Vec<String>,
}

impl Default for IsolationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            early_lessons: 3,
            frequency: 5,
            max_shared_lessons: 10,
            problematic_keywords: [
                "introduction",
                "welcome",
                "overview",
                "getting started",
                "basics",
                "fundamentals",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}
