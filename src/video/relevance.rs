use std::collections::HashMap;

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, trace};

use crate::browser::PageDriver;
use crate::domain::{CanonicalVideoRef, Locality};

const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by", "is",
    "are", "was", "were", "be", "been", "have", "has", "had", "do", "does", "did", "will", "would",
    "could", "should", "may", "might", "can", "this", "that", "these", "those",
];

const VIDEO_CONTEXT_KEYWORDS: &[&str] = &["video", "watch", "play", "lesson", "tutorial", "demo"];

/// Regions that scope a video to the lesson rather than the site chrome.
pub const CONTENT_CONTAINER_SELECTOR: &str =
    r#"[class*="lesson"], [class*="content"], [class*="video"], [class*="player"]"#;

/// Visible text captured into the content signature.
const SIGNATURE_TEXT_LIMIT: usize = 2000;

/// Which check decided a relevance verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RelevanceSignal {
    IdentifierMatch,
    ExactPage,
    ContentCooccurrence,
    ContainerLocality,
    NoSignal,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ValidationResult {
    pub accepted: bool,
    pub signal: RelevanceSignal,
    pub confidence: f32,
}

impl ValidationResult {
    fn accept(signal: RelevanceSignal, confidence: f32) -> Self {
        Self {
            accepted: true,
            signal,
            confidence,
        }
    }

    fn reject() -> Self {
        Self {
            accepted: false,
            signal: RelevanceSignal::NoSignal,
            confidence: 0.0,
        }
    }
}

/// State for the lesson currently loaded in the browser.
///
/// Rebuilt with [`LessonContext::begin`] for every lesson; the validation
/// cache never outlives it.
#[derive(Debug, Clone)]
pub struct LessonContext {
    pub title: String,
    pub url: String,
    pub id: String,
    content_signature: Option<String>,
    stale: bool,
    validation_cache: HashMap<(String, String), ValidationResult>,
}

impl LessonContext {
    pub fn begin(title: impl Into<String>, url: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            id: id.into(),
            content_signature: None,
            stale: false,
            validation_cache: HashMap::new(),
        }
    }

    /// Hex SHA-256 over the page title and the leading visible text.
    pub fn compute_signature(page_title: &str, visible_text: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(page_title.as_bytes());
        let prefix: String = visible_text.chars().take(SIGNATURE_TEXT_LIMIT).collect();
        hasher.update(prefix.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Record the signature of the page as loaded for this lesson.
    ///
    /// If it equals the previous lesson's signature the browser is still
    /// showing the old page, and on-page signals are no longer trusted.
    pub fn record_signature(
        &mut self,
        page_title: &str,
        visible_text: &str,
        previous: Option<&str>,
    ) -> &str {
        let signature = Self::compute_signature(page_title, visible_text);
        self.stale = previous == Some(signature.as_str());
        if self.stale {
            debug!(lesson = %self.title, "Page content unchanged since previous lesson");
        }
        self.content_signature.insert(signature)
    }

    pub fn content_signature(&self) -> Option<&str> {
        self.content_signature.as_deref()
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn mark_stale(&mut self) {
        self.stale = true;
    }

    pub fn cached_validations(&self) -> usize {
        self.validation_cache.len()
    }
}

/// Candidate identifiers a lesson title may leave in a video URL.
///
/// Lower-cased: the full title and its slug, significant words, adjacent
/// word bigrams joined by `-`, and the first number in the title.
pub fn lesson_identifiers(title: &str) -> Vec<String> {
    let lower = title.trim().to_lowercase();
    if lower.is_empty() {
        return Vec::new();
    }

    let mut identifiers = vec![lower.clone()];
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    let slug = words.join("-");
    if !slug.is_empty() && slug != lower {
        identifiers.push(slug);
    }

    let keywords: Vec<&str> = words
        .iter()
        .copied()
        .filter(|w| w.chars().count() > 2 && !STOP_WORDS.contains(w))
        .collect();
    identifiers.extend(keywords.iter().map(|w| w.to_string()));
    identifiers.extend(keywords.windows(2).map(|pair| format!("{}-{}", pair[0], pair[1])));

    if let Some(number) = words.iter().find(|w| w.chars().all(|c| c.is_ascii_digit())) {
        identifiers.push(number.to_string());
    }

    identifiers.dedup();
    identifiers
}

/// Scores whether a video belongs to the lesson currently loaded.
#[derive(Debug, Clone, Default)]
pub struct RelevanceValidator;

impl RelevanceValidator {
    pub fn new() -> Self {
        Self
    }

    /// Memoized per `(url, lesson title)` in the lesson context.
    ///
    /// `raw_url` is the URL as found on the page, before canonicalization.
    pub async fn belongs_to_lesson(
        &self,
        reference: &CanonicalVideoRef,
        raw_url: &str,
        locality: Locality,
        lesson: &mut LessonContext,
        page: &dyn PageDriver,
    ) -> ValidationResult {
        let key = (reference.canonical_url.clone(), lesson.title.clone());
        if let Some(cached) = lesson.validation_cache.get(&key) {
            trace!(url = %reference.canonical_url, "Relevance cache hit");
            return *cached;
        }

        let result = self.evaluate(reference, raw_url, locality, lesson, page).await;
        debug!(
            url = %reference.canonical_url,
            lesson = %lesson.title,
            accepted = result.accepted,
            signal = ?result.signal,
            "Relevance verdict"
        );
        lesson.validation_cache.insert(key, result);
        result
    }

    async fn evaluate(
        &self,
        reference: &CanonicalVideoRef,
        raw_url: &str,
        locality: Locality,
        lesson: &LessonContext,
        page: &dyn PageDriver,
    ) -> ValidationResult {
        let url_lower = reference.canonical_url.to_lowercase();
        if lesson_identifiers(&lesson.title)
            .iter()
            .any(|id| url_lower.contains(id.as_str()))
        {
            return ValidationResult::accept(RelevanceSignal::IdentifierMatch, 0.8);
        }

        if !lesson.is_stale() {
            if let Ok(current) = page.current_url().await {
                if same_page(&current, &lesson.url) {
                    return ValidationResult::accept(RelevanceSignal::ExactPage, 0.9);
                }
            }
        }

        let page_text = page.visible_text().await.unwrap_or_default();
        let points = cooccurrence_points(&page_text, &lesson.title, reference, raw_url);
        if points >= 7 {
            return ValidationResult::accept(
                RelevanceSignal::ContentCooccurrence,
                f32::from(points) / 10.0,
            );
        }

        let scoped = match locality {
            Locality::Content => true,
            Locality::Chrome => false,
            Locality::Unknown => {
                !lesson.is_stale() && page.exists(CONTENT_CONTAINER_SELECTOR).await.unwrap_or(false)
            }
        };
        if scoped {
            return ValidationResult::accept(RelevanceSignal::ContainerLocality, 0.7);
        }

        ValidationResult::reject()
    }
}

/// Co-occurrence score in tenths: title on page 4, video keywords 3,
/// the raw or canonical URL in the text 3.
fn cooccurrence_points(
    page_text: &str,
    title: &str,
    reference: &CanonicalVideoRef,
    raw_url: &str,
) -> u8 {
    let text = page_text.to_lowercase();
    let title = title.trim().to_lowercase();
    let mut points = 0;
    if !title.is_empty() && text.contains(&title) {
        points += 4;
    }
    if VIDEO_CONTEXT_KEYWORDS.iter().any(|k| text.contains(k)) {
        points += 3;
    }
    let raw_url = raw_url.trim().to_lowercase();
    if (!raw_url.is_empty() && text.contains(&raw_url))
        || text.contains(&reference.canonical_url.to_lowercase())
    {
        points += 3;
    }
    points
}

fn same_page(a: &str, b: &str) -> bool {
    !a.is_empty() && a.trim_end_matches('/') == b.trim_end_matches('/')
}
