use std::fmt;

use serde::{Deserialize, Serialize};

/// Video hosting platform a URL belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Youtube,
    Vimeo,
    Loom,
    Wistia,
    Direct,
    Unknown,
}

impl Platform {
    /// Prefix used in identity keys, e.g. `yt:dQw4w9WgXcQ`.
    pub fn key_prefix(&self) -> Option<&'static str> {
        match self {
            Platform::Youtube => Some("yt"),
            Platform::Vimeo => Some("vimeo"),
            Platform::Loom => Some("loom"),
            Platform::Wistia => Some("wistia"),
            Platform::Direct => Some("file"),
            Platform::Unknown => None,
        }
    }

    /// Human readable name, as written in the lesson Markdown video line.
    pub fn display_name(&self) -> &'static str {
        match self {
            Platform::Youtube => "YouTube",
            Platform::Vimeo => "Vimeo",
            Platform::Loom => "Loom",
            Platform::Wistia => "Wistia",
            Platform::Direct => "Direct",
            Platform::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}
