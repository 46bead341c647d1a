use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settings for the Chrome instance driving the classroom.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    /// Whether to run the browser in headless mode (default: true)
    pub headless: bool,

    /// Page load timeout in seconds (default: 30)
    pub timeout_secs: u64,

    /// Wait time after page load for client-side rendering in milliseconds (default: 3000)
    pub wait_after_load_ms: u64,

    /// Browser window width in pixels (default: 1920)
    pub window_width: u32,

    /// Browser window height in pixels (default: 1080)
    pub window_height: u32,

    /// User agent string to use
    pub user_agent: Option<String>,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            timeout_secs: 30,
            wait_after_load_ms: 3000,
            window_width: 1920,
            window_height: 1080,
            user_agent: Some(
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                    .to_string(),
            ),
        }
    }
}

impl BrowserSettings {
    /// Get the page load timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Get the wait time after load as a Duration
    pub fn wait_after_load(&self) -> Duration {
        Duration::from_millis(self.wait_after_load_ms)
    }

    /// Shorter waits, for fast connections and small classrooms
    pub fn fast() -> Self {
        Self {
            timeout_secs: 15,
            wait_after_load_ms: 1500,
            ..Default::default()
        }
    }

    /// Longer waits, for slow pages that render late
    pub fn thorough() -> Self {
        Self {
            timeout_secs: 60,
            wait_after_load_ms: 6000,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_browser_settings() {
        let settings = BrowserSettings::default();
        assert!(settings.headless);
        assert_eq!(settings.timeout_secs, 30);
        assert_eq!(settings.wait_after_load_ms, 3000);
        assert_eq!((settings.window_width, settings.window_height), (1920, 1080));
        assert!(settings.user_agent.is_some());
    }

    #[test]
    fn test_presets() {
        let fast = BrowserSettings::fast();
        assert_eq!(fast.timeout(), Duration::from_secs(15));
        assert!(fast.headless);

        let thorough = BrowserSettings::thorough();
        assert_eq!(thorough.wait_after_load(), Duration::from_millis(6000));
    }
}
