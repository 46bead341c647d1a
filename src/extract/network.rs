use async_trait::async_trait;
use tracing::trace;

use crate::app::Result;
use crate::browser::{NetworkEntry, PageDriver};
use crate::domain::{Platform, VideoCandidate};
use crate::extract::{ExtractionStrategy, StrategyContext};
use crate::video::{canonicalize_url, classify, is_image_asset, is_media_file};

/// Tracking, telemetry and CDN image traffic that is never the lesson video.
const EXCLUDED_MARKERS: &[&str] = &[
    "google-analytics",
    "googletagmanager",
    "doubleclick",
    "facebook.com/tr",
    "segment.io",
    "mixpanel",
    "hotjar",
    "sentry",
    "pipedream",
    "/collect?",
    "/track",
    "pixel",
    "/deliveries/",
];

/// Looks for media requests in the captured network traffic.
pub struct NetworkInspection;

#[async_trait]
impl ExtractionStrategy for NetworkInspection {
    fn name(&self) -> &'static str {
        "network"
    }

    async fn extract(
        &self,
        page: &dyn PageDriver,
        cx: &StrategyContext<'_>,
    ) -> Result<Option<VideoCandidate>> {
        let entries = page.network_log().await?;
        trace!(entries = entries.len(), "Inspecting network log");

        Ok(pick_media_url(&entries, |url| cx.admissible(url))
            .map(|url| VideoCandidate::new(url, self.name())))
    }
}

fn rank(entry: &NetworkEntry) -> Option<u8> {
    let url = entry.url.as_str();
    let lower = url.to_lowercase();
    if entry.resource_type.eq_ignore_ascii_case("image") || is_image_asset(url) {
        return None;
    }
    if EXCLUDED_MARKERS.iter().any(|m| lower.contains(m)) {
        return None;
    }

    if lower.contains("oembed") && lower.contains("url=") {
        Some(2)
    } else if is_media_file(url) {
        Some(0)
    } else if classify(url) != Platform::Unknown && canonicalize_url(url).platform != Platform::Unknown {
        Some(1)
    } else {
        None
    }
}

/// Choose the most likely video request: media files, then player embeds,
/// then oEmbed wrappers, each in capture order.
pub fn pick_media_url(entries: &[NetworkEntry], accept: impl Fn(&str) -> bool) -> Option<String> {
    let mut ranked: Vec<(u8, &NetworkEntry)> = entries
        .iter()
        .filter_map(|entry| rank(entry).map(|r| (r, entry)))
        .collect();
    ranked.sort_by_key(|(r, _)| *r);

    ranked
        .into_iter()
        .map(|(_, entry)| entry.url.as_str())
        .find(|url| accept(*url))
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn any(_: &str) -> bool {
        true
    }

    #[test]
    fn test_prefers_media_over_embeds() {
        let entries = vec![
            NetworkEntry::new("https://www.youtube.com/embed/abc12345678", "Document"),
            NetworkEntry::new("https://cdn.example.com/hls/video.m3u8", "XHR"),
        ];
        assert_eq!(
            pick_media_url(&entries, any).as_deref(),
            Some("https://cdn.example.com/hls/video.m3u8")
        );
    }

    #[test]
    fn test_excludes_images_and_analytics() {
        let entries = vec![
            NetworkEntry::new("https://i.ytimg.com/vi/abc12345678/hqdefault.jpg", "Image"),
            NetworkEntry::new("https://www.google-analytics.com/collect?v=1&dl=x.mp4", "XHR"),
            NetworkEntry::new("https://embed-ssl.wistia.com/deliveries/abc.bin", "Media"),
            NetworkEntry::new("https://cdn.example.com/poster", "Image"),
        ];
        assert_eq!(pick_media_url(&entries, any), None);
    }

    #[test]
    fn test_oembed_ranked_last() {
        let entries = vec![
            NetworkEntry::new(
                "https://www.youtube.com/oembed?format=json&url=https://youtu.be/abc12345678",
                "XHR",
            ),
            NetworkEntry::new("https://player.vimeo.com/video/42", "Document"),
        ];
        assert_eq!(
            pick_media_url(&entries, any).as_deref(),
            Some("https://player.vimeo.com/video/42")
        );
    }

    #[test]
    fn test_player_assets_without_id_ignored() {
        let entries = vec![NetworkEntry::new(
            "https://www.youtube.com/s/player/1234/base.js",
            "Script",
        )];
        assert_eq!(pick_media_url(&entries, any), None);
    }

    #[test]
    fn test_rejected_candidates_skipped() {
        let entries = vec![
            NetworkEntry::new("https://cdn.example.com/header.mp4", "Media"),
            NetworkEntry::new("https://cdn.example.com/lesson.mp4", "Media"),
        ];
        let picked = pick_media_url(&entries, |u| !u.contains("header"));
        assert_eq!(picked.as_deref(), Some("https://cdn.example.com/lesson.mp4"));
    }
}
