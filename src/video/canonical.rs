use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::domain::{CanonicalVideoRef, Platform};
use crate::video::classify::{classify, url_path};

static YOUTUBE_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:[?&]v=|/embed/|youtu\.be/|/v/|/shorts/|/live/)([A-Za-z0-9_-]{11})(?:[^A-Za-z0-9_-]|$)",
    )
    .unwrap()
});

static VIMEO_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"vimeo\.com/(?:video/|channels/[^/]+/|groups/[^/]+/videos/)?(\d+)").unwrap()
});

static LOOM_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"loom\.com/(?:share|embed)/([A-Za-z0-9]+)").unwrap());

static WISTIA_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:wistia\.(?:com|net)/(?:medias|embed/iframe|embed/medias)/|[?&]wvideo=)([A-Za-z0-9]+)")
        .unwrap()
});

/// Rewrite a raw URL into its per-platform normalized form.
///
/// Idempotent: feeding `canonical_url` back in yields the same ref. URLs
/// whose platform ID cannot be extracted pass through unchanged and are
/// keyed on the lower-cased full URL with platform `Unknown`.
pub fn canonicalize(raw_url: &str, platform: Platform) -> CanonicalVideoRef {
    let raw = raw_url.trim();

    if let Some(inner) = resolve_oembed(raw) {
        let inner_platform = classify(&inner);
        if inner_platform != Platform::Unknown {
            return canonicalize_direct(&inner, inner_platform);
        }
    }

    canonicalize_direct(raw, platform)
}

fn canonicalize_direct(raw: &str, platform: Platform) -> CanonicalVideoRef {
    let extracted = match platform {
        Platform::Youtube => capture(&YOUTUBE_ID, raw)
            .map(|id| (format!("https://www.youtube.com/watch?v={id}"), id)),
        Platform::Vimeo => capture(&VIMEO_ID, raw).map(|id| (format!("https://vimeo.com/{id}"), id)),
        Platform::Loom => {
            capture(&LOOM_ID, raw).map(|id| (format!("https://www.loom.com/share/{id}"), id))
        }
        Platform::Wistia => capture(&WISTIA_ID, raw)
            .map(|id| (format!("https://fast.wistia.net/embed/iframe/{id}"), id)),
        Platform::Direct => {
            return CanonicalVideoRef {
                canonical_url: raw.to_string(),
                identity_key: format!("file:{}", direct_path(raw)),
                platform,
            }
        }
        Platform::Unknown => None,
    };

    match (extracted, platform.key_prefix()) {
        (Some((canonical_url, id)), Some(prefix)) => CanonicalVideoRef {
            canonical_url,
            identity_key: format!("{prefix}:{id}"),
            platform,
        },
        _ => passthrough(raw),
    }
}

fn passthrough(raw: &str) -> CanonicalVideoRef {
    CanonicalVideoRef {
        canonical_url: raw.to_string(),
        identity_key: raw.to_lowercase(),
        platform: Platform::Unknown,
    }
}

fn capture(re: &Regex, haystack: &str) -> Option<String> {
    re.captures(haystack)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn direct_path(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(parsed) => parsed.path().to_lowercase(),
        Err(_) => url_path(raw),
    }
}

/// Unwrap an oEmbed-style URL to the video URL carried in its `url`
/// query parameter. Only one level is unwrapped.
pub fn resolve_oembed(raw_url: &str) -> Option<String> {
    if !raw_url.to_lowercase().contains("oembed") {
        return None;
    }
    let parsed = Url::parse(raw_url).ok()?;
    parsed
        .query_pairs()
        .find(|(key, _)| key == "url")
        .map(|(_, value)| value.into_owned())
        .filter(|inner| !inner.is_empty())
}

/// Classify then canonicalize in one step.
pub fn canonicalize_url(raw_url: &str) -> CanonicalVideoRef {
    canonicalize(raw_url, classify(raw_url))
}
