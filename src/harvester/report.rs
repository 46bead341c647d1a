use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::app::Result;
use crate::extract::AttemptRecord;
use crate::video::{canonicalize_url, Blacklist, SessionRegistry};

pub const SESSION_REPORT_FILE: &str = "session_tracking_report.json";
pub const ATTEMPT_LOG_FILE: &str = "extraction_attempts.json";

static VIDEO_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\*\*Video \(([^)]+)\):\*\* (\S+)").unwrap());

pub fn write_session_report(registry: &SessionRegistry, dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(SESSION_REPORT_FILE);
    fs::write(&path, serde_json::to_string_pretty(&registry.report())?)?;
    info!(path = %path.display(), "Session report written");
    Ok(path)
}

pub fn write_attempt_log(attempts: &[AttemptRecord], dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(ATTEMPT_LOG_FILE);
    fs::write(&path, serde_json::to_string_pretty(attempts)?)?;
    info!(path = %path.display(), attempts = attempts.len(), "Attempt log written");
    Ok(path)
}

/// A video that saved Markdown attributes to more than one lesson.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateVideo {
    pub identity_key: String,
    pub url: String,
    pub lessons: Vec<String>,
}

fn markdown_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            markdown_files(&path, out)?;
        } else if path.extension().is_some_and(|ext| ext == "md") {
            out.push(path);
        }
    }
    Ok(())
}

/// Scan saved lessons under `dir` for videos shared between lessons.
pub fn scan_duplicates(dir: &Path) -> Result<Vec<DuplicateVideo>> {
    let mut files = Vec::new();
    markdown_files(dir, &mut files)?;
    files.sort();

    let mut by_key: BTreeMap<String, DuplicateVideo> = BTreeMap::new();
    for file in &files {
        let text = fs::read_to_string(file)?;
        let lesson = file
            .strip_prefix(dir)
            .unwrap_or(file)
            .with_extension("")
            .to_string_lossy()
            .into_owned();
        for caps in VIDEO_LINE.captures_iter(&text) {
            let reference = canonicalize_url(&caps[2]);
            let entry = by_key
                .entry(reference.identity_key.clone())
                .or_insert_with(|| DuplicateVideo {
                    identity_key: reference.identity_key.clone(),
                    url: reference.canonical_url.clone(),
                    lessons: Vec::new(),
                });
            if !entry.lessons.contains(&lesson) {
                entry.lessons.push(lesson.clone());
            }
        }
    }
    debug!(files = files.len(), videos = by_key.len(), "Scanned saved lessons");

    Ok(by_key
        .into_values()
        .filter(|d| d.lessons.len() > 1)
        .collect())
}

/// Add duplicated videos to the persisted blacklist. Returns how many were new.
pub fn promote_duplicates(duplicates: &[DuplicateVideo], blacklist_path: &Path) -> Result<usize> {
    let mut blacklist = Blacklist::new();
    blacklist.load_file(blacklist_path)?;
    let added = duplicates
        .iter()
        .filter(|d| blacklist.insert(d.identity_key.clone()))
        .count();
    if added > 0 {
        blacklist.save_file(blacklist_path)?;
        info!(added, path = %blacklist_path.display(), "Duplicates added to blacklist");
    }
    Ok(added)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::AttemptStatus;
    use chrono::Utc;
    use tempfile::tempdir;

    fn lesson(dir: &Path, name: &str, video_line: &str) {
        fs::write(
            dir.join(format!("{name}.md")),
            format!("# {name}\n\n**Extracted on:** now\n{video_line}\n\n## Content\n"),
        )
        .unwrap();
    }

    #[test]
    fn test_scan_finds_shared_video() {
        let tmp = tempdir().unwrap();
        let lessons = tmp.path().join("Group (g)").join("lessons");
        fs::create_dir_all(&lessons).unwrap();
        lesson(&lessons, "One", "**Video (YouTube):** https://www.youtube.com/watch?v=dQw4w9WgXcQ");
        lesson(&lessons, "Two", "**Video (YouTube):** https://youtu.be/dQw4w9WgXcQ (3:12)");
        lesson(&lessons, "Three", "**Video (Vimeo):** https://vimeo.com/1234");
        lesson(&lessons, "Four", "**Video:** No video found");

        let dups = scan_duplicates(tmp.path()).unwrap();
        assert_eq!(dups.len(), 1);
        assert_eq!(dups[0].identity_key, "yt:dQw4w9WgXcQ");
        assert_eq!(dups[0].lessons, vec!["Group (g)/lessons/One", "Group (g)/lessons/Two"]);
    }

    #[test]
    fn test_scan_tells_sections_apart() {
        let tmp = tempdir().unwrap();
        let basics = tmp.path().join("Basics");
        let advanced = tmp.path().join("Advanced");
        fs::create_dir_all(&basics).unwrap();
        fs::create_dir_all(&advanced).unwrap();
        lesson(&basics, "Welcome", "**Video (Vimeo):** https://vimeo.com/1234");
        lesson(&advanced, "Welcome", "**Video (Vimeo):** https://player.vimeo.com/video/1234");

        let dups = scan_duplicates(tmp.path()).unwrap();
        assert_eq!(dups.len(), 1);
        assert_eq!(dups[0].lessons, vec!["Advanced/Welcome", "Basics/Welcome"]);
    }

    #[test]
    fn test_promote_persists_new_ids() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("blacklist.json");
        let dups = vec![DuplicateVideo {
            identity_key: "yt:dQw4w9WgXcQ".into(),
            url: "https://www.youtube.com/watch?v=dQw4w9WgXcQ".into(),
            lessons: vec!["One".into(), "Two".into()],
        }];

        assert_eq!(promote_duplicates(&dups, &path).unwrap(), 1);
        assert_eq!(promote_duplicates(&dups, &path).unwrap(), 0);

        let mut loaded = Blacklist::new();
        loaded.load_file(&path).unwrap();
        assert!(loaded.contains(&canonicalize_url("https://youtu.be/dQw4w9WgXcQ")));
    }

    #[test]
    fn test_reports_written() {
        let tmp = tempdir().unwrap();
        let registry = SessionRegistry::new();
        registry.register_if_new(&canonicalize_url("https://vimeo.com/1234"), "One", "network");

        let attempts = vec![AttemptRecord {
            lesson_title: "One".into(),
            strategy: "network".into(),
            video_url: Some("https://vimeo.com/1234".into()),
            status: AttemptStatus::Found,
            timestamp: Utc::now(),
        }];

        let session = write_session_report(&registry, tmp.path()).unwrap();
        let log = write_attempt_log(&attempts, tmp.path()).unwrap();

        let session: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(session).unwrap()).unwrap();
        assert_eq!(session["session_stats"]["unique_videos_found"], 1);
        assert!(session["video_tracking"].get("vimeo:1234").is_some());

        let log: serde_json::Value = serde_json::from_str(&fs::read_to_string(log).unwrap()).unwrap();
        assert_eq!(log[0]["status"], "found");
        assert_eq!(log[0]["strategy"], "network");
    }
}
