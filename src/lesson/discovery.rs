use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::{debug, info};
use url::Url;

use crate::app::Result;
use crate::browser::PageDriver;
use crate::domain::{Community, Lesson};

static CLASSROOM_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"skool\.com/([^/?#]+)/classroom/([^/?#]+)").unwrap());

static LESSON_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"md=([a-f0-9]{32})").unwrap());

/// Lesson ids shorter than this are navigation noise, not lessons.
const MIN_LESSON_ID_LEN: usize = 10;

const GENERIC_TITLES: &[&str] = &["skool", "classroom", "lessons", "home"];

/// Community slug and course id from a classroom URL.
///
/// The display name starts out as the slug; see [`community_name_from_title`].
pub fn community_from_url(url: &str) -> Option<Community> {
    let caps = CLASSROOM_URL.captures(url)?;
    let slug = caps[1].to_string();
    Some(Community {
        name: slug.clone(),
        slug,
        course: caps[2].to_string(),
    })
}

/// Community display name from a page title.
///
/// Handles `Lesson · Community` and `Community - Skool` forms.
pub fn community_name_from_title(title: &str) -> Option<String> {
    let name = if let Some((_, last)) = title.rsplit_once('·') {
        last
    } else if let Some((first, _)) = title.split_once(" - ") {
        first
    } else {
        title
    };
    let name = html_escape::decode_html_entities(name.trim()).trim().to_string();

    if name.is_empty() || GENERIC_TITLES.contains(&name.to_lowercase().as_str()) {
        return None;
    }
    Some(name)
}

/// The `md=` lesson id when the URL points at one lesson.
pub fn single_lesson_id(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    parsed
        .query_pairs()
        .find(|(key, _)| key == "md")
        .map(|(_, value)| value.into_owned())
        .filter(|id| id.len() > MIN_LESSON_ID_LEN)
}

/// Classroom URL with query and fragment removed.
fn classroom_base(url: &str) -> String {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    url[..end].to_string()
}

pub fn lesson_url(classroom_url: &str, id: &str) -> String {
    format!("{}?md={}", classroom_base(classroom_url), id)
}

/// Walk the course tree embedded in the page state.
///
/// `set` units are sections and extend the path; `module` units are lessons.
pub fn lessons_from_tree(data: &Value, classroom_url: &str) -> Vec<Lesson> {
    let Some(course) = data.pointer("/props/pageProps/course") else {
        return Vec::new();
    };

    let mut lessons = Vec::new();
    let mut path = Vec::new();
    if let Some(children) = course.get("children").and_then(Value::as_array) {
        for child in children {
            walk(child, classroom_url, &mut path, &mut lessons);
        }
    }
    lessons
}

fn walk(item: &Value, classroom_url: &str, path: &mut Vec<String>, out: &mut Vec<Lesson>) {
    let Some(course) = item.get("course") else {
        return;
    };
    let title = course
        .pointer("/metadata/title")
        .and_then(Value::as_str)
        .map(|t| html_escape::decode_html_entities(t).trim().to_string())
        .unwrap_or_else(|| "Untitled".to_string());

    match course.get("unitType").and_then(Value::as_str) {
        Some("set") => {
            path.push(title);
            if let Some(children) = item.get("children").and_then(Value::as_array) {
                for child in children {
                    walk(child, classroom_url, path, out);
                }
            }
            path.pop();
        }
        Some("module") => {
            if let Some(id) = course.get("id").and_then(Value::as_str) {
                out.push(
                    Lesson::new(id, title, lesson_url(classroom_url, id)).with_path(path.clone()),
                );
            }
        }
        _ => {}
    }
}

/// Lesson ids linked anywhere in the page source, in order of appearance.
///
/// Titles are unknown at this point and left empty.
pub fn lessons_from_source(source: &str, classroom_url: &str) -> Vec<Lesson> {
    let mut seen = HashSet::new();
    LESSON_LINK
        .captures_iter(source)
        .map(|caps| caps[1].to_string())
        .filter(|id| seen.insert(id.clone()))
        .map(|id| {
            let url = lesson_url(classroom_url, &id);
            Lesson::new(id, String::new(), url)
        })
        .collect()
}

/// Find every lesson on the classroom page currently loaded.
pub async fn discover_lessons(page: &dyn PageDriver, classroom_url: &str) -> Result<Vec<Lesson>> {
    if let Some(data) = page.next_data().await? {
        let lessons = lessons_from_tree(&data, classroom_url);
        if !lessons.is_empty() {
            info!(count = lessons.len(), "Lessons discovered from course tree");
            return Ok(lessons);
        }
    }

    debug!("No course tree, scanning page source for lesson links");
    let lessons = lessons_from_source(&page.page_source().await?, classroom_url);
    info!(count = lessons.len(), "Lessons discovered from page links");
    Ok(lessons)
}
