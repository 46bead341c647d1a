use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use crate::app::Result;
use crate::browser::PageDriver;
use crate::domain::{LessonContent, Link};

/// Lesson body containers, most specific first.
pub const CONTENT_SELECTORS: &[&str] = &[
    "[class*='RichTextEditor']",
    "[class*='EditorContent']",
    ".tiptap.ProseMirror",
    "[class*='ModuleBody']",
    "[class*='content']",
    "[class*='description']",
    "div[class*='MainContent']",
    "main",
    "[role='main']",
    "article",
];

/// Image sources containing any of these are decoration, not lesson material.
const IGNORED_IMAGE_MARKERS: &[&str] = &["youtube", "ytimg", "avatar"];

static PLAIN_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s/$.?#][^\s<>"')\]]*"#).unwrap());

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawContent {
    title: String,
    text: String,
    links: Vec<Link>,
    images: Vec<String>,
}

/// Builds the in-page script that reads a lesson's text, links and images.
pub struct ContentExtractor {
    selectors: Vec<String>,
}

impl Default for ContentExtractor {
    fn default() -> Self {
        Self::new(CONTENT_SELECTORS.iter().map(|s| s.to_string()).collect())
    }
}

impl ContentExtractor {
    pub fn new(selectors: Vec<String>) -> Self {
        Self { selectors }
    }

    pub fn extraction_script(&self) -> String {
        let content_selectors = self
            .selectors
            .iter()
            .map(|s| format!("\"{}\"", s.replace('"', "\\\"")))
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            r#"
            (() => {{
                const contentSelectors = [{content_selectors}];
                let root = null;
                for (const selector of contentSelectors) {{
                    const el = document.querySelector(selector);
                    if (el && el.innerText && el.innerText.trim().length > 0) {{
                        root = el;
                        break;
                    }}
                }}
                if (!root) root = document.body;
                if (!root) return {{ title: document.title, text: '', links: [], images: [] }};

                const heading = document.querySelector('h1');
                const links = Array.from(root.querySelectorAll('a[href]'))
                    .map(a => ({{ text: (a.innerText || '').trim(), url: a.href }}))
                    .filter(l => l.text && l.url);
                const images = Array.from(document.querySelectorAll('img[src]'))
                    .map(img => img.src);

                return {{
                    title: heading ? heading.innerText.trim() : document.title,
                    text: root.innerText,
                    links: links,
                    images: images
                }};
            }})()
            "#
        )
    }

    /// Turn the script result into [`LessonContent`].
    pub fn parse(&self, value: serde_json::Value) -> Result<LessonContent> {
        let raw: RawContent = if value.is_null() {
            RawContent::default()
        } else {
            serde_json::from_value(value)?
        };

        let mut seen: HashSet<String> = raw.links.iter().map(|l| l.url.clone()).collect();
        let mut links = raw.links;
        for m in PLAIN_URL.find_iter(&raw.text) {
            let url = m.as_str().trim_end_matches(['.', ',', ';', ':']).to_string();
            if seen.insert(url.clone()) {
                links.push(Link {
                    text: url.clone(),
                    url,
                });
            }
        }

        let mut seen_images = HashSet::new();
        let images = raw
            .images
            .into_iter()
            .filter(|src| is_lesson_image(src))
            .filter(|src| seen_images.insert(src.clone()))
            .collect();

        let (body, resources, examples) = LessonContent::split_sections(&raw.text);
        Ok(LessonContent {
            title: html_escape::decode_html_entities(raw.title.trim()).into_owned(),
            body,
            resources,
            examples,
            links,
            images,
        })
    }
}

fn is_lesson_image(src: &str) -> bool {
    if src.is_empty() || src.starts_with("data:") {
        return false;
    }
    let lower = src.to_lowercase();
    !IGNORED_IMAGE_MARKERS.iter().any(|m| lower.contains(m))
}

/// Read the lesson currently loaded in `page`.
pub async fn extract_content(page: &dyn PageDriver) -> Result<LessonContent> {
    let extractor = ContentExtractor::default();
    let value = page.evaluate(&extractor.extraction_script()).await?;
    let content = extractor.parse(value)?;
    debug!(
        title = %content.title,
        links = content.links.len(),
        images = content.images.len(),
        "Lesson content extracted"
    );
    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::fake::FakePage;
    use serde_json::json;

    #[test]
    fn test_extraction_script_generation() {
        let script = ContentExtractor::default().extraction_script();
        assert!(script.contains("contentSelectors"));
        assert!(script.contains("RichTextEditor"));
        assert!(script.contains("img[src]"));
    }

    #[test]
    fn test_parse_merges_plain_urls() {
        let content = ContentExtractor::default()
            .parse(json!({
                "title": "Pricing &amp; Offers",
                "text": "Watch this.\nSee https://notion.so/template. and https://a.example/x\nRESOURCES: sheet\nEXAMPLES: deck",
                "links": [{ "text": "Template", "url": "https://a.example/x" }],
                "images": []
            }))
            .unwrap();

        assert_eq!(content.title, "Pricing & Offers");
        assert_eq!(content.links.len(), 2);
        assert_eq!(content.links[0].text, "Template");
        assert_eq!(content.links[1].url, "https://notion.so/template");
        assert_eq!(content.resources.as_deref(), Some("sheet"));
        assert_eq!(content.examples.as_deref(), Some("deck"));
        assert!(content.body.starts_with("Watch this."));
    }

    #[test]
    fn test_parse_filters_images() {
        let content = ContentExtractor::default()
            .parse(json!({
                "text": "",
                "images": [
                    "https://cdn.example.com/diagram.png",
                    "https://cdn.example.com/diagram.png",
                    "data:image/png;base64,AAAA",
                    "https://i.ytimg.com/vi/abc/hqdefault.jpg",
                    "https://cdn.example.com/avatar/42.jpg"
                ]
            }))
            .unwrap();
        assert_eq!(content.images, vec!["https://cdn.example.com/diagram.png"]);
    }

    #[test]
    fn test_parse_null_is_empty() {
        let content = ContentExtractor::default().parse(serde_json::Value::Null).unwrap();
        assert_eq!(content, LessonContent::default());
    }

    #[test]
    fn test_extract_content_from_page() {
        let page = FakePage::new("https://www.skool.com/g/classroom/c");
        page.on_script("contentSelectors", json!({ "title": "Intro", "text": "Hello" }));
        let content = tokio_test::block_on(extract_content(&page)).unwrap();
        assert_eq!(content.title, "Intro");
        assert_eq!(content.body, "Hello");
    }
}
