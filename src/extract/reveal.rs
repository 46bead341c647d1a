use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, trace};

use crate::app::Result;
use crate::browser::{Element, PageDriver};
use crate::domain::{Locality, VideoCandidate};
use crate::extract::dom_scan::{locate, media_url};
use crate::extract::structured::find_lesson_video;
use crate::extract::{ExtractionStrategy, StrategyContext};

pub const THUMBNAIL_SELECTORS: &[&str] = &[
    ".styled__VideoThumbnailWrapper-sc-1k73vxa-2",
    "[class*='VideoThumbnailWrapper']",
    "div[class*='VideoThumbnail']",
];

/// Click-for-sound backdrops that swallow clicks meant for the player.
const OVERLAY_SELECTORS: &[&str] = &[
    "[data-handle='click-for-sound-backdrop']",
    "[data-handle*='click-for-sound']",
    ".w-ui-container",
];

pub const MODAL_SELECTORS: &[&str] = &[
    "[role='dialog']",
    "[aria-modal='true']",
    ".ReactModal__Content",
    "[class*='modal']",
    "[class*='Modal']",
];

pub const MODAL_MEDIA_SELECTOR: &str = "iframe, video, [data-video-url], [data-src], [data-youtube-id]";

pub const REVEALED_PLAYER_SELECTORS: &[&str] = &["iframe[src]", "video[src]", "video source[src]"];

pub const WVIDEO_LINK_SELECTOR: &str = "a[href*='wvideo=']";

static DURATION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d{1,2}:\d{2}").unwrap());

/// Clicks the video thumbnail and polls for the player it reveals.
pub struct InteractiveReveal;

#[async_trait]
impl ExtractionStrategy for InteractiveReveal {
    fn name(&self) -> &'static str {
        "interactive_reveal"
    }

    async fn extract(
        &self,
        page: &dyn PageDriver,
        cx: &StrategyContext<'_>,
    ) -> Result<Option<VideoCandidate>> {
        if let Some(thumbnail) = find_thumbnail(page).await? {
            neutralize_overlays(page).await;

            match thumbnail.click().await {
                Ok(()) => {
                    if let Some(found) = self.poll_after_click(page, cx).await? {
                        return Ok(Some(found));
                    }
                }
                Err(e) => debug!(error = %e, "Thumbnail click failed"),
            }
        } else {
            trace!("No video thumbnail on page");
        }

        self.wistia_references(page, cx).await
    }
}

impl InteractiveReveal {
    async fn poll_after_click(
        &self,
        page: &dyn PageDriver,
        cx: &StrategyContext<'_>,
    ) -> Result<Option<VideoCandidate>> {
        for wait in cx.settings.reveal_waits() {
            tokio::time::sleep(wait).await;

            // A modal opened by the click is searched before the whole page.
            if let Some(url) = search_modals(page, cx).await? {
                close_modals(page).await;
                return Ok(Some(
                    VideoCandidate::new(url, self.name()).with_locality(Locality::Content),
                ));
            }

            for selector in REVEALED_PLAYER_SELECTORS {
                for element in page.find_elements(selector).await? {
                    let Some(url) = media_url(element.as_ref()).await else {
                        continue;
                    };
                    if !cx.admissible(&url) {
                        continue;
                    }
                    let locality = locate(element.as_ref()).await;
                    if locality == Locality::Chrome {
                        continue;
                    }
                    return Ok(Some(VideoCandidate::new(url, self.name()).with_locality(locality)));
                }
            }

            if let Some(data) = page.next_data().await? {
                if let Some(found) = find_lesson_video(&data, |url| cx.admissible(url)) {
                    return Ok(Some(
                        VideoCandidate::new(found.url, self.name())
                            .with_thumbnail(found.thumbnail)
                            .with_duration_ms(found.duration_ms)
                            .with_locality(Locality::Content),
                    ));
                }
            }

            trace!(?wait, "Nothing revealed yet");
        }

        close_modals(page).await;
        Ok(None)
    }

    /// Wistia players referenced by `wvideo=` links or `wistia_async_` classes.
    async fn wistia_references(
        &self,
        page: &dyn PageDriver,
        cx: &StrategyContext<'_>,
    ) -> Result<Option<VideoCandidate>> {
        for link in page.find_elements(WVIDEO_LINK_SELECTOR).await? {
            if let Some(href) = link.attribute("href").await? {
                if cx.admissible(&href) {
                    return Ok(Some(VideoCandidate::new(href, self.name())));
                }
            }
        }

        let id = page.evaluate(WISTIA_ASYNC_SCRIPT).await?;
        if let Some(id) = id.as_str().filter(|id| !id.is_empty()) {
            let url = format!("https://fast.wistia.net/embed/iframe/{id}");
            if cx.admissible(&url) {
                return Ok(Some(VideoCandidate::new(url, self.name())));
            }
        }

        Ok(None)
    }
}

async fn find_thumbnail(page: &dyn PageDriver) -> Result<Option<Box<dyn Element>>> {
    for selector in THUMBNAIL_SELECTORS {
        for element in page.find_elements(selector).await? {
            if !element.is_displayed().await.unwrap_or(false) {
                continue;
            }
            let text = element.text().await.unwrap_or_default();
            let class = element.attribute("class").await?.unwrap_or_default();
            if DURATION.is_match(&text) || class.to_lowercase().contains("video") {
                return Ok(Some(element));
            }
        }
    }
    Ok(None)
}

async fn search_modals(page: &dyn PageDriver, cx: &StrategyContext<'_>) -> Result<Option<String>> {
    for selector in MODAL_SELECTORS {
        for modal in page.find_elements(selector).await? {
            for media in modal.find_elements(MODAL_MEDIA_SELECTOR).await? {
                if let Some(url) = media_url(media.as_ref()).await {
                    if cx.admissible(&url) {
                        return Ok(Some(url));
                    }
                }
            }
        }
    }
    Ok(None)
}

async fn neutralize_overlays(page: &dyn PageDriver) {
    let selectors = serde_json::to_string(OVERLAY_SELECTORS).unwrap_or_else(|_| "[]".into());
    let script = format!(
        r#"
        (() => {{
            let hidden = 0;
            for (const selector of {selectors}) {{
                document.querySelectorAll(selector).forEach(el => {{
                    el.style.pointerEvents = 'none';
                    el.style.opacity = '0';
                    hidden++;
                }});
            }}
            return hidden;
        }})()
        "#
    );
    match page.evaluate(&script).await {
        Ok(hidden) => trace!(%hidden, "Overlays neutralized"),
        Err(e) => debug!(error = %e, "Overlay script failed"),
    }
}

async fn close_modals(page: &dyn PageDriver) {
    if let Err(e) = page.evaluate(CLOSE_MODAL_SCRIPT).await {
        debug!(error = %e, "Closing modal failed");
    }
}

const CLOSE_MODAL_SCRIPT: &str = r#"
(() => {
    const closers = document.querySelectorAll(
        "[role='dialog'] [aria-label*='lose'], [aria-modal='true'] [aria-label*='lose'], .ReactModal__Content [class*='close']"
    );
    closers.forEach(el => el.click());
    document.dispatchEvent(new KeyboardEvent('keydown', { key: 'Escape', bubbles: true }));
    return closers.length;
})()
"#;

const WISTIA_ASYNC_SCRIPT: &str = r#"
(() => {
    const el = document.querySelector("[class*='wistia_async_']");
    if (!el) return null;
    const m = String(el.className).match(/wistia_async_([A-Za-z0-9]+)/);
    return m ? m[1] : null;
})()
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::fake::{FakeElement, FakePage, Reveal};
    use crate::config::ExtractionSettings;
    use crate::video::{LessonContext, ValidityGate};
    use serde_json::json;

    async fn reveal(page: &FakePage) -> Option<VideoCandidate> {
        let lesson = LessonContext::begin("Lesson", "https://x/c?md=1", "1");
        let gate = ValidityGate::default();
        let settings = ExtractionSettings::immediate();
        let cx = StrategyContext {
            lesson: &lesson,
            gate: &gate,
            settings: &settings,
        };
        InteractiveReveal.extract(page, &cx).await.unwrap()
    }

    #[tokio::test]
    async fn test_click_reveals_modal_player() {
        let page = FakePage::new("https://x/c?md=1");
        let modal = FakeElement::new().child(
            MODAL_MEDIA_SELECTOR,
            FakeElement::new().attr("src", "https://player.vimeo.com/video/9001"),
        );
        let thumb = FakeElement::new()
            .text("12:34")
            .on_click(&page, Reveal::Element("[role='dialog']".into(), modal));
        page.add_element("[class*='VideoThumbnailWrapper']", thumb.clone());

        let found = reveal(&page).await.unwrap();
        assert_eq!(found.raw_url, "https://player.vimeo.com/video/9001");
        assert_eq!(found.locality, Locality::Content);
        assert_eq!(found.source_strategy, "interactive_reveal");
        assert_eq!(thumb.clicks(), 1);
        assert!(page.evaluated().iter().any(|s| s.contains("click-for-sound")));
    }

    #[tokio::test]
    async fn test_click_updates_page_state() {
        let page = FakePage::new("https://x/c?md=1");
        let data = json!({"props": {"pageProps": {"lesson": {
            "video": {"video_url": "https://www.loom.com/share/abc123"}
        }}}});
        let thumb = FakeElement::new()
            .attr("class", "VideoThumbnail_x")
            .on_click(&page, Reveal::NextData(data));
        page.add_element("div[class*='VideoThumbnail']", thumb);

        let found = reveal(&page).await.unwrap();
        assert_eq!(found.raw_url, "https://www.loom.com/share/abc123");
    }

    #[tokio::test]
    async fn test_hidden_thumbnail_not_clicked() {
        let page = FakePage::new("https://x/c?md=1");
        let thumb = FakeElement::new().text("3:10").hidden();
        page.add_element("[class*='VideoThumbnailWrapper']", thumb.clone());

        assert!(reveal(&page).await.is_none());
        assert_eq!(thumb.clicks(), 0);
    }

    #[tokio::test]
    async fn test_wvideo_link_fallback() {
        let page = FakePage::new("https://x/c?md=1");
        page.add_element(
            WVIDEO_LINK_SELECTOR,
            FakeElement::new().attr("href", "https://www.skool.com/g/classroom/c?md=1&wvideo=k9j8h7g6f5"),
        );
        let found = reveal(&page).await.unwrap();
        assert!(found.raw_url.contains("wvideo=k9j8h7g6f5"));
    }

    #[tokio::test]
    async fn test_wistia_async_class_fallback() {
        let page = FakePage::new("https://x/c?md=1");
        page.on_script("wistia_async_", json!("m1n2b3v4c5"));
        let found = reveal(&page).await.unwrap();
        assert_eq!(found.raw_url, "https://fast.wistia.net/embed/iframe/m1n2b3v4c5");
    }
}
