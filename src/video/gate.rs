use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::app::Result;
use crate::domain::{CanonicalVideoRef, Platform};
use crate::video::canonical::canonicalize_url;
use crate::video::classify::is_image_asset;
use crate::video::Rejection;

/// IDs of videos that appear on every classroom page (site header and
/// intro clips) or were confirmed as cross-lesson duplicates.
pub const DEFAULT_BLACKLIST: &[&str] = &["YTrIwmIdaJI", "UDcrRdfB0x8", "7snrj0uEaDw", "65GvYDdzJWU"];

/// Shortest URL that can still name a video on any supported host.
pub const DEFAULT_MIN_URL_LENGTH: usize = 15;

/// Set of video identifiers that are never accepted.
///
/// Entries may be bare platform IDs (`YTrIwmIdaJI`) or full identity keys
/// (`yt:YTrIwmIdaJI`); both forms match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blacklist {
    ids: BTreeSet<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct BlacklistFile {
    ids: Vec<String>,
    #[serde(default)]
    updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Blacklist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blacklist seeded with the known site chrome videos.
    pub fn with_defaults() -> Self {
        let mut list = Self::new();
        list.extend(DEFAULT_BLACKLIST.iter().copied());
        list
    }

    pub fn insert(&mut self, id: impl Into<String>) -> bool {
        let id = id.into();
        let id = id.trim();
        if id.is_empty() {
            return false;
        }
        self.ids.insert(id.to_string())
    }

    pub fn extend<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for id in ids {
            self.insert(id);
        }
    }

    pub fn contains(&self, reference: &CanonicalVideoRef) -> bool {
        self.ids.contains(&reference.identity_key) || self.ids.contains(reference.platform_id())
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    /// Merge IDs persisted by earlier runs. A missing file is not an error.
    pub fn load_file(&mut self, path: &Path) -> Result<usize> {
        if !path.exists() {
            return Ok(0);
        }
        let content = fs::read_to_string(path)?;
        let file: BlacklistFile = serde_json::from_str(&content)?;
        let before = self.ids.len();
        self.extend(file.ids);
        let added = self.ids.len() - before;
        debug!(path = %path.display(), added, "Loaded persisted blacklist");
        Ok(added)
    }

    /// Write every ID not in [`DEFAULT_BLACKLIST`] to `path`.
    pub fn save_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = BlacklistFile {
            ids: self
                .ids
                .iter()
                .filter(|id| !DEFAULT_BLACKLIST.contains(&id.as_str()))
                .cloned()
                .collect(),
            updated_at: Some(chrono::Utc::now()),
        };
        fs::write(path, serde_json::to_string_pretty(&file)?)?;
        Ok(())
    }
}

/// Cheap, stateless structural check run before relevance scoring.
#[derive(Debug, Clone)]
pub struct ValidityGate {
    blacklist: Blacklist,
    min_url_length: usize,
}

impl Default for ValidityGate {
    fn default() -> Self {
        Self::new(Blacklist::with_defaults())
    }
}

impl ValidityGate {
    pub fn new(blacklist: Blacklist) -> Self {
        Self {
            blacklist,
            min_url_length: DEFAULT_MIN_URL_LENGTH,
        }
    }

    pub fn with_min_url_length(mut self, min_url_length: usize) -> Self {
        self.min_url_length = min_url_length;
        self
    }

    pub fn blacklist(&self) -> &Blacklist {
        &self.blacklist
    }

    /// Accept or reject a canonical reference, naming the first failed check.
    pub fn check(&self, reference: &CanonicalVideoRef) -> std::result::Result<(), Rejection> {
        let url = reference.canonical_url.trim();
        if url.is_empty() {
            return Err(Rejection::Empty);
        }
        if url.len() < self.min_url_length {
            return Err(Rejection::TooShort);
        }
        if is_image_asset(url) {
            return Err(Rejection::Image);
        }
        if reference.platform == Platform::Unknown {
            return Err(Rejection::Unrecognized);
        }
        if self.blacklist.contains(reference) {
            return Err(Rejection::Blacklisted);
        }
        Ok(())
    }

    pub fn is_valid(&self, canonical_url: &str) -> bool {
        self.check(&canonicalize_url(canonical_url)).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_accepts_known_platforms() {
        let gate = ValidityGate::default();
        assert!(gate.is_valid("https://www.youtube.com/watch?v=dQw4w9WgXcQ"));
        assert!(gate.is_valid("https://vimeo.com/76979871"));
        assert!(gate.is_valid("https://cdn.example.com/stream/video.m3u8"));
    }

    #[test]
    fn test_rejects_blacklisted_regardless_of_form() {
        let gate = ValidityGate::default();
        assert!(!gate.is_valid("https://www.youtube.com/watch?v=YTrIwmIdaJI"));
        assert!(!gate.is_valid("https://youtu.be/YTrIwmIdaJI?t=3"));

        let reference = canonicalize_url("https://www.youtube.com/embed/UDcrRdfB0x8");
        assert_eq!(gate.check(&reference), Err(Rejection::Blacklisted));
    }

    #[test]
    fn test_identity_key_entries_match() {
        let mut list = Blacklist::new();
        list.insert("vimeo:76979871");
        let gate = ValidityGate::new(list);
        assert!(!gate.is_valid("https://player.vimeo.com/video/76979871"));
    }

    #[test]
    fn test_rejection_reasons() {
        let gate = ValidityGate::default();
        assert_eq!(gate.check(&canonicalize_url("")), Err(Rejection::Empty));
        assert_eq!(gate.check(&canonicalize_url("http://a.b")), Err(Rejection::TooShort));
        assert_eq!(
            gate.check(&canonicalize_url("https://i.ytimg.com/vi/dQw4w9WgXcQ/maxresdefault.jpg")),
            Err(Rejection::Image)
        );
        assert_eq!(
            gate.check(&canonicalize_url("https://example.com/some/page")),
            Err(Rejection::Unrecognized)
        );
    }

    #[test]
    fn test_blacklist_persistence() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("blacklist.json");

        let mut list = Blacklist::with_defaults();
        list.insert("yt:abcdefghijk");
        list.save_file(&path).unwrap();

        let saved = std::fs::read_to_string(&path).unwrap();
        assert!(saved.contains("yt:abcdefghijk"));
        assert!(!saved.contains("YTrIwmIdaJI"));

        let mut reloaded = Blacklist::with_defaults();
        assert_eq!(reloaded.load_file(&path).unwrap(), 1);
        assert_eq!(reloaded.len(), DEFAULT_BLACKLIST.len() + 1);
    }

    #[test]
    fn test_missing_blacklist_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let mut list = Blacklist::new();
        assert_eq!(list.load_file(&dir.path().join("none.json")).unwrap(), 0);
        assert!(list.is_empty());
    }
}
