use std::sync::LazyLock;

use regex::Regex;

use crate::domain::Platform;

const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".gif", ".webp", ".svg", ".ico", ".bmp"];

const MEDIA_EXTENSIONS: &[&str] = &[".mp4", ".webm", ".mov", ".m3u8", ".avi"];

/// Markers of thumbnail and crop assets served next to videos.
const THUMBNAIL_MARKERS: &[&str] = &[
    "image_crop",
    "crop=",
    "/thumbnail",
    "thumbnail_",
    "ytimg.com",
    "/vi/",
    "/deliveries/",
];

static YOUTUBE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|[/.])(?:youtube\.com|youtube-nocookie\.com|youtu\.be)(?:[/?]|$)").unwrap()
});

static VIMEO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:^|[/.])vimeo\.com(?:[/?]|$)").unwrap());

static LOOM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:^|[/.])loom\.com(?:[/?]|$)").unwrap());

static WISTIA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:(?:^|[/.])wistia\.(?:com|net)(?:[/?]|$)|[?&]wvideo=[A-Za-z0-9]+)").unwrap()
});

/// Lower-cased URL with query string and fragment removed.
pub(crate) fn url_path(url: &str) -> String {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    url[..end].to_lowercase()
}

/// True for image files and thumbnail/crop assets.
///
/// These are never videos, even when they sit inside a player container.
pub fn is_image_asset(url: &str) -> bool {
    let path = url_path(url);
    if IMAGE_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
        return true;
    }
    let lower = url.to_lowercase();
    THUMBNAIL_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// True when the URL path ends in a streamable media extension.
pub fn is_media_file(url: &str) -> bool {
    let path = url_path(url);
    MEDIA_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

/// Tag a URL with the platform hosting it.
///
/// Image assets are `Unknown` regardless of host. Hosts are checked in a
/// fixed order, then direct media extensions.
pub fn classify(url: &str) -> Platform {
    let url = url.trim();
    if url.is_empty() || is_image_asset(url) {
        return Platform::Unknown;
    }

    if YOUTUBE.is_match(url) {
        Platform::Youtube
    } else if VIMEO.is_match(url) {
        Platform::Vimeo
    } else if LOOM.is_match(url) {
        Platform::Loom
    } else if WISTIA.is_match(url) {
        Platform::Wistia
    } else if is_media_file(url) {
        Platform::Direct
    } else {
        Platform::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_hosts() {
        assert_eq!(classify("https://www.youtube.com/watch?v=dQw4w9WgXcQ"), Platform::Youtube);
        assert_eq!(classify("https://youtu.be/dQw4w9WgXcQ"), Platform::Youtube);
        assert_eq!(
            classify("https://www.youtube-nocookie.com/embed/dQw4w9WgXcQ"),
            Platform::Youtube
        );
        assert_eq!(classify("https://player.vimeo.com/video/76979871"), Platform::Vimeo);
        assert_eq!(classify("https://www.loom.com/share/abc123def"), Platform::Loom);
        assert_eq!(
            classify("https://fast.wistia.net/embed/iframe/a1b2c3d4e5"),
            Platform::Wistia
        );
        assert_eq!(classify("https://acme.wistia.com/medias/a1b2c3d4e5"), Platform::Wistia);
    }

    #[test]
    fn test_classify_wvideo_reference() {
        assert_eq!(
            classify("https://www.skool.com/group/classroom/x?md=1&wvideo=a1b2c3d4e5"),
            Platform::Wistia
        );
    }

    #[test]
    fn test_classify_direct_media() {
        assert_eq!(classify("https://cdn.example.com/stream/video.m3u8"), Platform::Direct);
        assert_eq!(classify("https://cdn.example.com/a/b.MP4?token=1"), Platform::Direct);
        assert_eq!(classify("https://cdn.example.com/clip.webm"), Platform::Direct);
    }

    #[test]
    fn test_thumbnails_are_never_video() {
        assert_eq!(classify("https://i.ytimg.com/vi/dQw4w9WgXcQ/hqdefault.jpg"), Platform::Unknown);
        assert_eq!(classify("https://vimeo.com/thumb.png"), Platform::Unknown);
        assert_eq!(
            classify("https://assets.skool.com/f/abc/image_crop_resized?w=300"),
            Platform::Unknown
        );
        assert_eq!(classify("https://cdn.example.com/poster.webp?x=1"), Platform::Unknown);
        assert_eq!(classify("https://cdn.example.com/anim.gif"), Platform::Unknown);
    }

    #[test]
    fn test_unknown_and_lookalikes() {
        assert_eq!(classify(""), Platform::Unknown);
        assert_eq!(classify("https://example.com/page"), Platform::Unknown);
        assert_eq!(classify("https://notyoutube.community/watch"), Platform::Unknown);
    }
}
