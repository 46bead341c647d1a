use async_trait::async_trait;
use tracing::trace;

use crate::app::Result;
use crate::browser::{Element, PageDriver};
use crate::domain::{Locality, VideoCandidate};
use crate::extract::{ExtractionStrategy, StrategyContext};

/// Ancestors that scope an element to the lesson body.
pub const CONTENT_SCOPE: &str = "[class*='lesson'], [class*='content'], [class*='post'], \
     [class*='module'], main, article, [role='main']";

/// Ancestors that mark an element as site chrome.
pub const CHROME_SCOPE: &str = "header, nav, [role='banner'], [role='navigation']";

/// Embedded players for each supported host.
pub const IFRAME_SELECTORS: &[&str] = &[
    "iframe[src*='youtube.com']",
    "iframe[src*='youtube-nocookie.com']",
    "iframe[src*='youtu.be']",
    "iframe[src*='vimeo.com']",
    "iframe[src*='loom.com']",
    "iframe[src*='wistia']",
];

/// Player wrappers whose URL sits in an attribute rather than an iframe.
pub const PLAYER_SELECTORS: &[&str] = &[
    "[class*='ReactPlayer'] iframe",
    "[class*='VideoPlayer'] iframe",
    "[class*='VideoPlayer'] video",
    "video",
    "video source",
    "[data-video-url]",
];

const MEDIA_ATTRIBUTES: &[&str] = &["src", "data-src", "data-video-url", "data-url", "href"];

/// First non-empty media attribute of an element, as a URL.
pub(crate) async fn media_url(element: &dyn Element) -> Option<String> {
    for name in MEDIA_ATTRIBUTES {
        if let Ok(Some(value)) = element.attribute(name).await {
            let value = value.trim();
            if !value.is_empty() && !value.starts_with("blob:") {
                return Some(value.to_string());
            }
        }
    }
    if let Ok(Some(id)) = element.attribute("data-youtube-id").await {
        if !id.trim().is_empty() {
            return Some(format!("https://www.youtube.com/watch?v={}", id.trim()));
        }
    }
    None
}

/// Where an element sits: chrome wins over content when both match.
pub(crate) async fn locate(element: &dyn Element) -> Locality {
    if element.is_within(CHROME_SCOPE).await.unwrap_or(false) {
        Locality::Chrome
    } else if element.is_within(CONTENT_SCOPE).await.unwrap_or(false) {
        Locality::Content
    } else {
        Locality::Unknown
    }
}

/// Scans embedded players already present in the DOM.
pub struct DomScan;

#[async_trait]
impl ExtractionStrategy for DomScan {
    fn name(&self) -> &'static str {
        "dom_scan"
    }

    async fn extract(
        &self,
        page: &dyn PageDriver,
        cx: &StrategyContext<'_>,
    ) -> Result<Option<VideoCandidate>> {
        let mut fallback = None;

        let selectors = IFRAME_SELECTORS.iter().chain(PLAYER_SELECTORS.iter());
        for selector in selectors {
            for element in page.find_elements(selector).await? {
                let Some(url) = media_url(element.as_ref()).await else {
                    continue;
                };
                if !cx.admissible(&url) {
                    trace!(selector, url = %url, "Skipping inadmissible player");
                    continue;
                }

                let offset = element.vertical_offset().await.unwrap_or(f64::MAX);
                if offset < cx.settings.header_cutoff_px {
                    trace!(selector, offset, "Skipping player in header area");
                    continue;
                }

                match locate(element.as_ref()).await {
                    Locality::Chrome => continue,
                    Locality::Content => {
                        return Ok(Some(
                            VideoCandidate::new(url, self.name()).with_locality(Locality::Content),
                        ));
                    }
                    Locality::Unknown => {
                        fallback.get_or_insert(url);
                    }
                }
            }
        }

        Ok(fallback.map(|url| VideoCandidate::new(url, self.name())))
    }
}
