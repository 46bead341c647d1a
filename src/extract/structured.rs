use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use tracing::trace;

use crate::app::Result;
use crate::browser::PageDriver;
use crate::domain::{Locality, VideoCandidate};
use crate::extract::{ExtractionStrategy, StrategyContext};

const VIDEO_MARKERS: &[&str] = &[
    "youtube.com",
    "youtu.be",
    "vimeo.com",
    "loom.com",
    "wistia",
    ".mp4",
    ".webm",
    ".m3u8",
];

static EMBEDDED_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s"'<>\\]+"#).unwrap());

static WVIDEO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"wvideo=([A-Za-z0-9]+)").unwrap());

/// A video reference read from page state, before validation.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredVideo {
    pub url: String,
    pub thumbnail: Option<String>,
    pub duration_ms: Option<u64>,
}

impl StructuredVideo {
    fn bare(url: String) -> Self {
        Self {
            url,
            thumbnail: None,
            duration_ms: None,
        }
    }
}

/// Reads the video from the embedded `__NEXT_DATA__` page state.
pub struct StructuredData;

#[async_trait]
impl ExtractionStrategy for StructuredData {
    fn name(&self) -> &'static str {
        "structured_data"
    }

    async fn extract(
        &self,
        page: &dyn PageDriver,
        cx: &StrategyContext<'_>,
    ) -> Result<Option<VideoCandidate>> {
        let Some(data) = page.next_data().await? else {
            trace!("No __NEXT_DATA__ on page");
            return Ok(None);
        };

        Ok(find_lesson_video(&data, |url| cx.admissible(url)).map(|found| {
            VideoCandidate::new(found.url, self.name())
                .with_thumbnail(found.thumbnail)
                .with_duration_ms(found.duration_ms)
                .with_locality(Locality::Content)
        }))
    }
}

/// Walk page state for the current lesson's video.
///
/// Only the lesson object (or, without one, the selected module in the
/// course tree) is searched; other lessons' entries are never read.
/// `accept` filters out references that are known to be wrong, so the
/// search can continue past them.
pub fn find_lesson_video(data: &Value, accept: impl Fn(&str) -> bool) -> Option<StructuredVideo> {
    let page_props = data.pointer("/props/pageProps")?;

    if let Some(lesson) = page_props.get("lesson").filter(|l| l.is_object()) {
        return from_lesson(lesson, &accept);
    }

    let selected = ["selectedModule", "selectedLesson"]
        .iter()
        .find_map(|key| page_props.get(*key).and_then(Value::as_str))?;
    let module = find_course(page_props.get("course")?, selected)?;
    from_module(module, &accept)
}

fn from_lesson(lesson: &Value, accept: &impl Fn(&str) -> bool) -> Option<StructuredVideo> {
    // videoLinksData is a JSON document stored as a string.
    if let Some(raw) = lesson.get("videoLinksData").and_then(Value::as_str) {
        if let Ok(Value::Array(links)) = serde_json::from_str::<Value>(raw) {
            let found = links.iter().find_map(|link| {
                let url = str_at(link, "url")?;
                accept(url.as_str()).then(|| StructuredVideo {
                    url,
                    thumbnail: str_at(link, "thumbnail"),
                    duration_ms: millis_at(link, "len_ms"),
                })
            });
            if found.is_some() {
                return found;
            }
        }
    }

    if let Some(video) = lesson.get("video") {
        if let Some(url) = str_at(video, "video_url").filter(|u| accept(u.as_str())) {
            return Some(StructuredVideo {
                url,
                thumbnail: str_at(video, "original_thumbnail_url"),
                duration_ms: millis_at(video, "video_length_ms"),
            });
        }
    }

    if let Some(metadata) = lesson.get("metadata") {
        if let Some(url) = str_at(metadata, "videoLink").filter(|u| accept(u.as_str())) {
            return Some(StructuredVideo {
                url,
                thumbnail: str_at(metadata, "videoThumbnail"),
                duration_ms: millis_at(metadata, "videoLenMs"),
            });
        }
    }

    scan_strings(lesson, accept)
        .or_else(|| scan_wvideo(lesson, accept))
        .map(StructuredVideo::bare)
}

fn from_module(module: &Value, accept: &impl Fn(&str) -> bool) -> Option<StructuredVideo> {
    let metadata = module.get("metadata")?;
    let direct = ["videoLink", "video_url", "videoUrl"]
        .iter()
        .filter_map(|key| str_at(metadata, key))
        .find(|url| accept(url.as_str()));

    if let Some(url) = direct {
        return Some(StructuredVideo {
            url,
            thumbnail: str_at(metadata, "videoThumbnail"),
            duration_ms: millis_at(metadata, "videoLenMs")
                .or_else(|| millis_at(metadata, "video_length_ms")),
        });
    }

    scan_strings(metadata, accept)
        .or_else(|| scan_wvideo(metadata, accept))
        .map(StructuredVideo::bare)
}

/// Depth-first search of a course tree for the node whose `course.id`
/// matches, returning that `course` object.
fn find_course<'a>(node: &'a Value, id: &str) -> Option<&'a Value> {
    let course = node.get("course").unwrap_or(node);
    if course.get("id").and_then(Value::as_str) == Some(id) {
        return Some(course);
    }
    node.get("children")
        .and_then(Value::as_array)
        .and_then(|children| children.iter().find_map(|child| find_course(child, id)))
}

fn scan_strings(value: &Value, accept: &impl Fn(&str) -> bool) -> Option<String> {
    match value {
        Value::String(s) => {
            let lower = s.to_lowercase();
            if !VIDEO_MARKERS.iter().any(|m| lower.contains(m)) {
                return None;
            }
            EMBEDDED_URL
                .find_iter(s)
                .map(|m| m.as_str().trim_end_matches(['.', ',', ')']).to_string())
                .find(|url| accept(url.as_str()))
        }
        Value::Array(items) => items.iter().find_map(|v| scan_strings(v, accept)),
        Value::Object(map) => map.values().find_map(|v| scan_strings(v, accept)),
        _ => None,
    }
}

fn scan_wvideo(value: &Value, accept: &impl Fn(&str) -> bool) -> Option<String> {
    match value {
        Value::String(s) => WVIDEO
            .captures_iter(s)
            .filter_map(|caps| caps.get(1))
            .map(|id| format!("https://fast.wistia.net/embed/iframe/{}", id.as_str()))
            .find(|url| accept(url.as_str())),
        Value::Array(items) => items.iter().find_map(|v| scan_wvideo(v, accept)),
        Value::Object(map) => map.values().find_map(|v| scan_wvideo(v, accept)),
        _ => None,
    }
}

fn str_at(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn millis_at(value: &Value, key: &str) -> Option<u64> {
    let v = value.get(key)?;
    v.as_u64().or_else(|| v.as_f64().map(|f| f as u64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn any(_: &str) -> bool {
        true
    }

    #[test]
    fn test_lesson_video_url() {
        let data = json!({"props": {"pageProps": {"lesson": {
            "video": {
                "video_url": "https://www.youtube.com/embed/abc12345678?x=1",
                "original_thumbnail_url": "https://img.example.com/t.jpg",
                "video_length_ms": 61000
            }
        }}}});
        let found = find_lesson_video(&data, any).unwrap();
        assert_eq!(found.url, "https://www.youtube.com/embed/abc12345678?x=1");
        assert_eq!(found.thumbnail.as_deref(), Some("https://img.example.com/t.jpg"));
        assert_eq!(found.duration_ms, Some(61000));
    }

    #[test]
    fn test_video_links_data_string() {
        let links = r#"[{"url":"https://vimeo.com/76979871","thumbnail":"t.png","len_ms":5000}]"#;
        let data = json!({"props": {"pageProps": {"lesson": {"videoLinksData": links}}}});
        let found = find_lesson_video(&data, any).unwrap();
        assert_eq!(found.url, "https://vimeo.com/76979871");
        assert_eq!(found.duration_ms, Some(5000));
    }

    #[test]
    fn test_metadata_video_link() {
        let data = json!({"props": {"pageProps": {"lesson": {
            "metadata": {"videoLink": "https://www.loom.com/share/abc123", "videoLenMs": 1000.0}
        }}}});
        let found = find_lesson_video(&data, any).unwrap();
        assert_eq!(found.url, "https://www.loom.com/share/abc123");
        assert_eq!(found.duration_ms, Some(1000));
    }

    #[test]
    fn test_rejected_field_falls_through_to_scan() {
        let data = json!({"props": {"pageProps": {"lesson": {
            "video": {"video_url": "https://youtu.be/YTrIwmIdaJI"},
            "metadata": {"description": "<p>Watch <a href=\"https://vimeo.com/555\">here</a></p>"}
        }}}});
        let found = find_lesson_video(&data, |u| !u.contains("YTrIwmIdaJI")).unwrap();
        assert_eq!(found.url, "https://vimeo.com/555");
    }

    #[test]
    fn test_wvideo_reference() {
        let data = json!({"props": {"pageProps": {"lesson": {
            "metadata": {"content": "see /classroom/x?md=1&wvideo=q1w2e3r4t5"}
        }}}});
        let found = find_lesson_video(&data, any).unwrap();
        assert_eq!(found.url, "https://fast.wistia.net/embed/iframe/q1w2e3r4t5");
    }

    #[test]
    fn test_selected_module_in_course_tree() {
        let data = json!({"props": {"pageProps": {
            "selectedModule": "m2",
            "course": {"course": {"id": "root"}, "children": [
                {"course": {"id": "s1", "unitType": "set"}, "children": [
                    {"course": {"id": "m1", "metadata": {"videoLink": "https://vimeo.com/111"}}},
                    {"course": {"id": "m2", "metadata": {"videoUrl": "https://vimeo.com/222"}}}
                ]}
            ]}
        }}});
        let found = find_lesson_video(&data, any).unwrap();
        assert_eq!(found.url, "https://vimeo.com/222");
    }

    #[test]
    fn test_other_lessons_are_not_searched() {
        let data = json!({"props": {"pageProps": {
            "selectedModule": "m9",
            "course": {"children": [
                {"course": {"id": "m1", "metadata": {"videoLink": "https://vimeo.com/111"}}}
            ]}
        }}});
        assert!(find_lesson_video(&data, any).is_none());
    }

    #[test]
    fn test_missing_page_props() {
        assert!(find_lesson_video(&json!({"props": {}}), any).is_none());
    }
}
