use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use tracing::{debug, info, warn};

use crate::app::Result;
use crate::domain::{Community, Lesson, LessonContent, ResolvedVideo};

const MAX_FILENAME_LEN: usize = 100;

const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".gif", ".webp"];

static UNSAFE_FILENAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s-]").unwrap());

static UNSAFE_FOLDER_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[<>:"/\\|?*]"#).unwrap());

static LESSON_ID_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\*Lesson ID: ([^*\s]+)\*$").unwrap());

/// File-system safe name for a lesson title.
///
/// Keeps word characters, whitespace and hyphens, joins words with `_`,
/// and caps the result at 100 characters.
pub fn sanitize_filename(title: &str) -> String {
    let cleaned = UNSAFE_FILENAME_CHARS.replace_all(title, "");
    let joined = cleaned.split_whitespace().collect::<Vec<_>>().join("_");
    let capped: String = joined.chars().take(MAX_FILENAME_LEN).collect();
    capped.trim_matches('_').to_string()
}

fn sanitize_folder(name: &str) -> String {
    let cleaned = UNSAFE_FOLDER_CHARS.replace_all(name, "_");
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// `<root>/<Community Name (slug)>/{lessons,images,videos}`
///
/// Lessons inside course sections go to `<community>/<Section>/<Sub>/`
/// instead of `lessons/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputDirs {
    pub community: PathBuf,
    pub lessons: PathBuf,
    pub images: PathBuf,
    pub videos: PathBuf,
}

impl OutputDirs {
    pub fn new(root: &Path, community: &Community) -> Self {
        let base = root.join(sanitize_folder(&community.folder_name()));
        Self {
            lessons: base.join("lessons"),
            images: base.join("images"),
            videos: base.join("videos"),
            community: base,
        }
    }

    pub fn create(&self) -> Result<()> {
        for dir in [&self.lessons, &self.images, &self.videos] {
            fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    /// Directory holding a lesson's Markdown, one level per section.
    pub fn lesson_dir(&self, lesson: &Lesson) -> PathBuf {
        let sections: Vec<String> = lesson
            .path
            .iter()
            .map(|section| sanitize_filename(section))
            .filter(|section| !section.is_empty())
            .collect();
        if sections.is_empty() {
            return self.lessons.clone();
        }
        sections
            .iter()
            .fold(self.community.clone(), |dir, section| dir.join(section))
    }
}

/// File stem for a lesson: the sanitized title, else the lesson id.
pub fn lesson_file_stem(lesson: &Lesson) -> String {
    [lesson.title.as_str(), lesson.id.as_str()]
        .iter()
        .map(|s| sanitize_filename(s))
        .find(|s| !s.is_empty())
        .unwrap_or_else(|| "lesson".to_string())
}

/// Lesson id recorded in a saved Markdown file, if any.
fn recorded_lesson_id(path: &Path) -> Option<String> {
    let content = fs::read_to_string(path).ok()?;
    LESSON_ID_LINE
        .captures(&content)
        .map(|caps| caps[1].to_string())
}

/// Everything that goes into one lesson's Markdown file.
#[derive(Debug, Clone)]
pub struct LessonDocument<'a> {
    pub title: &'a str,
    pub lesson_id: &'a str,
    pub community_name: &'a str,
    pub video: Option<&'a ResolvedVideo>,
    pub content: &'a LessonContent,
    /// Image paths relative to the lesson's directory.
    pub images: &'a [String],
    pub extracted_at: DateTime<Utc>,
}

impl LessonDocument<'_> {
    pub fn render(&self) -> String {
        let mut md = String::new();
        let safe_title = sanitize_filename(self.title);

        let _ = writeln!(md, "# {}\n", self.title);
        let _ = writeln!(
            md,
            "**Extracted on:** {}",
            self.extracted_at.format("%Y-%m-%d %H:%M:%S")
        );
        match self.video {
            Some(video) => {
                let _ = write!(md, "**Video ({}):** {}", video.platform(), video.url());
                if let Some(duration) = video.duration_label() {
                    let _ = write!(md, " ({duration})");
                }
                md.push('\n');
                if let Some(ref thumbnail) = video.thumbnail_url {
                    let _ = writeln!(md, "**Thumbnail:** {thumbnail}");
                }
            }
            None => md.push_str("**Video:** No video found\n"),
        }
        if !self.community_name.is_empty() {
            let _ = writeln!(md, "**Community:** {}", self.community_name);
        }
        let _ = writeln!(md, "**Lesson Folder:** {safe_title}\n");

        let _ = writeln!(md, "## Content\n\n{}\n", self.content.body);

        if !self.content.links.is_empty() {
            md.push_str("## Links and Resources\n\n");
            for link in &self.content.links {
                let _ = writeln!(md, "- [{}]({})", link.text, link.url);
            }
            md.push('\n');
        }
        if let Some(ref resources) = self.content.resources {
            let _ = writeln!(md, "## Resources\n\n{resources}\n");
        }
        if let Some(ref examples) = self.content.examples {
            let _ = writeln!(md, "## Examples\n\n{examples}\n");
        }
        if !self.images.is_empty() {
            md.push_str("## Images\n\n");
            for image in self.images {
                let name = Path::new(image)
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| image.clone());
                let _ = writeln!(md, "![{name}]({image})\n");
            }
        }

        let community = if self.community_name.is_empty() {
            "Unknown Community"
        } else {
            self.community_name
        };
        let _ = writeln!(md, "---\n*Extracted from {community}*");
        let _ = writeln!(
            md,
            "*Video: {}*",
            if self.video.is_some() { "URL only" } else { "No video" }
        );
        if let Some(video) = self.video {
            let _ = writeln!(md, "*Video source: {}*", video.strategy);
        }
        let _ = writeln!(md, "*Images downloaded: {}*", self.images.len());
        let _ = writeln!(md, "*Links captured: {}*", self.content.links.len());
        if !self.lesson_id.is_empty() {
            let _ = writeln!(md, "*Lesson ID: {}*", self.lesson_id);
        }
        md
    }
}

/// Writes lessons and their images below one community folder.
pub struct LessonWriter {
    dirs: OutputDirs,
    community_name: String,
    client: reqwest::Client,
}

impl LessonWriter {
    pub fn new(dirs: OutputDirs, community_name: impl Into<String>) -> Self {
        Self {
            dirs,
            community_name: community_name.into(),
            client: reqwest::Client::new(),
        }
    }

    pub fn dirs(&self) -> &OutputDirs {
        &self.dirs
    }

    /// Markdown path for `lesson`.
    ///
    /// When another lesson already owns the file for this title, the id is
    /// appended so neither overwrites nor shadows the other.
    pub fn lesson_path(&self, lesson: &Lesson) -> PathBuf {
        let dir = self.dirs.lesson_dir(lesson);
        let stem = lesson_file_stem(lesson);
        let path = dir.join(format!("{stem}.md"));
        match recorded_lesson_id(&path) {
            Some(owner) if !lesson.id.is_empty() && owner != lesson.id => {
                dir.join(format!("{stem}_{}.md", sanitize_filename(&lesson.id)))
            }
            _ => path,
        }
    }

    /// True when this lesson's Markdown file is already on disk.
    pub fn already_extracted(&self, lesson: &Lesson) -> bool {
        self.lesson_path(lesson).exists()
    }

    /// Download lesson images. Failures are logged and skipped.
    ///
    /// Returns paths relative to the lesson's Markdown directory.
    pub async fn download_images(&self, lesson: &Lesson, sources: &[String]) -> Vec<String> {
        if sources.is_empty() {
            return Vec::new();
        }
        let folder = self
            .lesson_path(lesson)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| lesson_file_stem(lesson));
        let dir = self.dirs.images.join(&folder);
        if let Err(e) = fs::create_dir_all(&dir) {
            warn!(error = %e, dir = %dir.display(), "Cannot create image directory");
            return Vec::new();
        }

        let depth = self
            .dirs
            .lesson_dir(lesson)
            .strip_prefix(&self.dirs.community)
            .map(|rel| rel.components().count())
            .unwrap_or(1);
        let up = "../".repeat(depth);

        let mut saved = Vec::new();
        for src in sources {
            let name = image_file_name(src, saved.len() + 1);
            match self.fetch(src, &dir.join(&name)).await {
                Ok(()) => {
                    debug!(image = %name, "Image saved");
                    saved.push(format!("{up}images/{folder}/{name}"));
                }
                Err(e) => warn!(url = %src, error = %e, "Image download failed"),
            }
        }
        saved
    }

    async fn fetch(&self, url: &str, path: &Path) -> Result<()> {
        let bytes = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        fs::write(path, &bytes)?;
        Ok(())
    }

    pub fn write_lesson(
        &self,
        lesson: &Lesson,
        video: Option<&ResolvedVideo>,
        content: &LessonContent,
        images: &[String],
    ) -> Result<PathBuf> {
        let doc = LessonDocument {
            title: &lesson.title,
            lesson_id: &lesson.id,
            community_name: &self.community_name,
            video,
            content,
            images,
            extracted_at: Utc::now(),
        };
        let path = self.lesson_path(lesson);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(&path, doc.render())?;
        info!(path = %path.display(), "Lesson saved");
        Ok(path)
    }
}

fn image_file_name(src: &str, index: usize) -> String {
    let name = url::Url::parse(src)
        .ok()
        .and_then(|u| u.path_segments().and_then(|s| s.last().map(str::to_string)))
        .unwrap_or_default();
    let lower = name.to_lowercase();
    if IMAGE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
        name
    } else {
        format!("image_{index}.jpg")
    }
}
