//! Configuration management.
//!
//! Configuration is read from `~/.config/classroom-harvest/config.toml` at
//! startup. If the file doesn't exist, a default configuration with
//! comments is created. Credentials are never read from this file.

pub mod browser;
pub mod extraction;

pub use browser::BrowserSettings;
pub use extraction::{ExtractionSettings, IsolationSettings};

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration struct.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub browser: BrowserSettings,
    pub extraction: ExtractionSettings,
    pub isolation: IsolationSettings,
    pub run: RunSettings,
    pub blacklist: BlacklistSettings,
    pub output: OutputSettings,
}

/// Per-lesson retry and pacing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    /// Extra attempts after a failed lesson (default: 2)
    pub max_retries: u32,

    /// Upper bound for one lesson attempt in seconds (default: 180)
    pub lesson_timeout_secs: u64,

    /// Pause between lessons in milliseconds (default: 1000)
    pub delay_between_lessons_ms: u64,

    /// Download lesson images next to the Markdown (default: true)
    pub download_images: bool,

    /// Skip lessons that already have a Markdown file (default: true)
    pub skip_existing: bool,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            max_retries: 2,
            lesson_timeout_secs: 180,
            delay_between_lessons_ms: 1000,
            download_images: true,
            skip_existing: true,
        }
    }
}

impl RunSettings {
    pub fn lesson_timeout(&self) -> Duration {
        Duration::from_secs(self.lesson_timeout_secs)
    }

    pub fn delay_between_lessons(&self) -> Duration {
        Duration::from_millis(self.delay_between_lessons_ms)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlacklistSettings {
    /// Extra video IDs or identity keys to reject
    pub ids: Vec<String>,

    /// Persisted blacklist location (default: next to config.toml)
    pub file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// Root directory holding one folder per community
    pub root: PathBuf,

    /// Directory for session and attempt reports
    pub report_dir: PathBuf,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            root: PathBuf::from("Communities"),
            report_dir: PathBuf::from("."),
        }
    }
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, creates a default one with comments.
    /// Missing fields in the config file will use default values.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit path, creating it when missing.
    pub fn load_from(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            Self::create_default_config(config_path)?;
            return Ok(Self::default());
        }

        let content = fs::read_to_string(config_path).map_err(|e| ConfigError::Io {
            path: config_path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: config_path.to_path_buf(),
            source: e,
        })
    }

    /// Get the default config file path: `~/.config/classroom-harvest/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("classroom-harvest"))
    }

    /// Where discovered duplicates are persisted between runs.
    pub fn blacklist_path(&self) -> Result<PathBuf, ConfigError> {
        match self.blacklist.file {
            Some(ref path) => Ok(path.clone()),
            None => Ok(Self::config_dir()?.join("blacklist.json")),
        }
    }

    /// Create a default config file with comments.
    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(())
    }

    /// Generate the default config file content with comments.
    fn default_config_content() -> String {
        r##"# classroom-harvest configuration
#
# Credentials are read from HARVEST_EMAIL / HARVEST_PASSWORD
# (or --email / --password), never from this file.

[browser]
# Run browser in headless mode (no visible window)
headless = true

# Page load timeout in seconds
timeout_secs = 30

# Wait after page load for client-side rendering (milliseconds)
wait_after_load_ms = 3000

window_width = 1920
window_height = 1080

[extraction]
# Upper bound for one extraction strategy (seconds)
strategy_timeout_secs = 20

# Polling waits after clicking a video thumbnail (milliseconds)
reveal_waits_ms = [2000, 3000, 5000]

# How long the legacy strategy waits for the player iframe (milliseconds)
legacy_wait_ms = 10000

poll_interval_ms = 500

# Players above this offset (pixels) are treated as site header
header_cutoff_px = 200.0

min_url_length = 15

[isolation]
# Recreate the browser for lessons prone to stale video leaks
enabled = true
early_lessons = 3
frequency = 5
max_shared_lessons = 10
problematic_keywords = [
    "introduction",
    "welcome",
    "overview",
    "getting started",
    "basics",
    "fundamentals",
]

[run]
# Extra attempts for a lesson that failed
max_retries = 2

# Upper bound for one lesson attempt (seconds)
lesson_timeout_secs = 180

delay_between_lessons_ms = 1000
download_images = true
skip_existing = true

[blacklist]
# Extra video IDs (e.g. "dQw4w9WgXcQ") or identity keys (e.g. "vimeo:123")
ids = []

[output]
root = "Communities"
report_dir = "."
"##
        .to_string()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_deserializes() {
        let content = Config::default_config_content();
        let config: Config = toml::from_str(&content).expect("Default config should be valid TOML");
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_config() {
        let content = r##"
[run]
max_retries = 5

[blacklist]
ids = ["abcdefghijk"]
"##;
        let config: Config = toml::from_str(content).expect("Partial config should work");

        assert_eq!(config.run.max_retries, 5);
        assert_eq!(config.blacklist.ids, vec!["abcdefghijk"]);
        // Defaults elsewhere
        assert_eq!(config.run.lesson_timeout_secs, 180);
        assert!(config.browser.headless);
    }

    #[test]
    fn test_empty_config() {
        let config: Config = toml::from_str("").expect("Empty config should work");
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_from_creates_default_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sub").join("config.toml");

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config, Config::default());
        assert!(path.exists());

        // Second load parses the file just written.
        assert_eq!(Config::load_from(&path).unwrap(), Config::default());
    }

    #[test]
    fn test_parse_error_names_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[run]\nmax_retries = \"many\"").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("config.toml"));
    }

    #[test]
    fn test_explicit_blacklist_path() {
        let mut config = Config::default();
        config.blacklist.file = Some(PathBuf::from("/tmp/bl.json"));
        assert_eq!(config.blacklist_path().unwrap(), PathBuf::from("/tmp/bl.json"));
    }
}
