use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::app::Result;
use crate::browser::{Element, PageDriver};
use crate::domain::{Locality, VideoCandidate};
use crate::extract::{ExtractionStrategy, StrategyContext};

/// Play controls used by older lesson layouts, most specific first.
pub const PLAY_BUTTON_SELECTORS: &[&str] = &[
    ".styled__PlaybackButton-sc-bpv3k2-5",
    "[class*='PlaybackButton']",
    "[class*='VideoPlayer']",
    "[class*='CoverImage']",
    "button[aria-label*='play']",
];

pub const LEGACY_IFRAME_SELECTOR: &str = "iframe[src*='youtube.com']";

pub const RICH_TEXT_LINK_SELECTORS: &[&str] = &[
    "[class*='RichText'] a[href*='youtu']",
    "[class*='content'] a[href*='youtu']",
];

pub const DATA_ID_SELECTORS: &[&str] = &["[data-youtube-id]", "[data-video-id]"];

static YOUTUBE_IN_SOURCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:youtube\.com/(?:embed/|watch\?v=)|youtu\.be/)([A-Za-z0-9_-]{11})").unwrap()
});

static YOUTUBE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{11}$").unwrap());

/// Play button click for old layouts, then text and source fallbacks.
pub struct LegacyPlayButton;

#[async_trait]
impl ExtractionStrategy for LegacyPlayButton {
    fn name(&self) -> &'static str {
        "legacy"
    }

    async fn extract(
        &self,
        page: &dyn PageDriver,
        cx: &StrategyContext<'_>,
    ) -> Result<Option<VideoCandidate>> {
        if let Some(button) = find_play_button(page).await? {
            match button.click().await {
                Ok(()) => {
                    if let Some(url) = wait_for_iframe(page, cx).await? {
                        return Ok(Some(
                            VideoCandidate::new(url, self.name()).with_locality(Locality::Content),
                        ));
                    }
                }
                Err(e) => debug!(error = %e, "Play button click failed"),
            }
        }

        for selector in RICH_TEXT_LINK_SELECTORS {
            for link in page.find_elements(selector).await? {
                if let Some(href) = link.attribute("href").await? {
                    if cx.admissible(&href) {
                        return Ok(Some(
                            VideoCandidate::new(href, self.name()).with_locality(Locality::Content),
                        ));
                    }
                }
            }
        }

        let source = page.page_source().await?;
        if let Some(url) = youtube_in_source(&source, |url| cx.admissible(url)) {
            return Ok(Some(VideoCandidate::new(url, self.name())));
        }

        for selector in DATA_ID_SELECTORS {
            for element in page.find_elements(selector).await? {
                let id = match element.attribute("data-youtube-id").await? {
                    Some(id) => Some(id),
                    None => element.attribute("data-video-id").await?,
                };
                let Some(id) = id.map(|id| id.trim().to_string()) else {
                    continue;
                };
                if !YOUTUBE_ID.is_match(&id) {
                    continue;
                }
                let url = format!("https://www.youtube.com/watch?v={id}");
                if cx.admissible(&url) {
                    return Ok(Some(VideoCandidate::new(url, self.name())));
                }
            }
        }

        Ok(None)
    }
}

async fn find_play_button(page: &dyn PageDriver) -> Result<Option<Box<dyn Element>>> {
    for selector in PLAY_BUTTON_SELECTORS {
        for element in page.find_elements(selector).await? {
            let usable = element.is_displayed().await.unwrap_or(false)
                && element.is_enabled().await.unwrap_or(false);
            if usable {
                trace!(selector, "Play button found");
                return Ok(Some(element));
            }
        }
    }
    Ok(None)
}

async fn wait_for_iframe(page: &dyn PageDriver, cx: &StrategyContext<'_>) -> Result<Option<String>> {
    let deadline = Instant::now() + cx.settings.legacy_wait();
    loop {
        for iframe in page.find_elements(LEGACY_IFRAME_SELECTOR).await? {
            if let Some(src) = iframe.attribute("src").await? {
                if cx.admissible(&src) {
                    return Ok(Some(src));
                }
            }
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        tokio::time::sleep(cx.settings.poll_interval()).await;
    }
}

/// First YouTube reference in raw page source that `accept` allows.
pub fn youtube_in_source(source: &str, accept: impl Fn(&str) -> bool) -> Option<String> {
    YOUTUBE_IN_SOURCE
        .captures_iter(source)
        .filter_map(|caps| caps.get(1))
        .map(|id| format!("https://www.youtube.com/watch?v={}", id.as_str()))
        .find(|url| accept(url.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::fake::{FakeElement, FakePage, Reveal};
    use crate::config::ExtractionSettings;
    use crate::video::{LessonContext, ValidityGate};

    async fn legacy(page: &FakePage) -> Option<VideoCandidate> {
        let lesson = LessonContext::begin("Lesson", "https://x/c?md=1", "1");
        let gate = ValidityGate::default();
        let settings = ExtractionSettings::immediate();
        let cx = StrategyContext {
            lesson: &lesson,
            gate: &gate,
            settings: &settings,
        };
        LegacyPlayButton.extract(page, &cx).await.unwrap()
    }

    #[tokio::test]
    async fn test_play_button_reveals_iframe() {
        let page = FakePage::new("https://x/c?md=1");
        let iframe = FakeElement::new().attr("src", "https://www.youtube.com/embed/qwertyuiop1");
        let button = FakeElement::new().on_click(
            &page,
            Reveal::Element(LEGACY_IFRAME_SELECTOR.into(), iframe),
        );
        page.add_element(".styled__PlaybackButton-sc-bpv3k2-5", button.clone());

        let found = legacy(&page).await.unwrap();
        assert_eq!(found.raw_url, "https://www.youtube.com/embed/qwertyuiop1");
        assert_eq!(button.clicks(), 1);
    }

    #[tokio::test]
    async fn test_disabled_button_skipped() {
        let page = FakePage::new("https://x/c?md=1");
        let button = FakeElement::new().disabled();
        page.add_element("[class*='PlaybackButton']", button.clone());
        assert!(legacy(&page).await.is_none());
        assert_eq!(button.clicks(), 0);
    }

    #[tokio::test]
    async fn test_source_scan_skips_blacklisted() {
        let page = FakePage::new("https://x/c?md=1");
        page.set_source(
            r#"<iframe src="https://www.youtube.com/embed/YTrIwmIdaJI"></iframe>
               <a href="https://youtu.be/zxcvbnmasdf">lesson</a>"#,
        );
        let found = legacy(&page).await.unwrap();
        assert_eq!(found.raw_url, "https://www.youtube.com/watch?v=zxcvbnmasdf");
    }

    #[tokio::test]
    async fn test_data_attribute_fallback() {
        let page = FakePage::new("https://x/c?md=1");
        page.add_element("[data-video-id]", FakeElement::new().attr("data-video-id", "abc12345678"));
        let found = legacy(&page).await.unwrap();
        assert_eq!(found.raw_url, "https://www.youtube.com/watch?v=abc12345678");
    }

    #[test]
    fn test_youtube_in_source() {
        let src = "x youtube.com/watch?v=abc12345678 y";
        assert_eq!(
            youtube_in_source(src, |_| true).as_deref(),
            Some("https://www.youtube.com/watch?v=abc12345678")
        );
        assert_eq!(youtube_in_source("nothing here", |_| true), None);
    }
}
