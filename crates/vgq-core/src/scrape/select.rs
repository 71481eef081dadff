//! Source validity filtering and best-quality selection.
//!
//! Resolution is derived with a defined precedence: an explicit label
//! attribute wins; otherwise a `-<digits>p.mp4` suffix in the URL path is
//! used; otherwise the source counts as resolution 0.

/// One `<source>` element found on the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceCandidate {
    pub url: String,
    /// Resolution label attribute, e.g. "720p", when the page provides one.
    pub label: Option<String>,
}

/// A source is playable only if it is served over https and its path names
/// an `.mp4` container. Anything else (plain http, .webm, m3u8 playlists) is
/// skipped. No exceptions: a scraped page must never be able to point the
/// downloader at a cleartext URL.
pub fn is_valid_source(src: &str) -> bool {
    let Ok(parsed) = url::Url::parse(src) else {
        return false;
    };
    parsed.scheme() == "https" && parsed.path().ends_with(".mp4")
}

/// Relaxed filter for local rigs without TLS: additionally accepts plain
/// http when the host is loopback IPv4, and nothing else. Opt-in only; the
/// scrape defaults to [`is_valid_source`].
pub fn is_valid_loopback_source(src: &str) -> bool {
    if is_valid_source(src) {
        return true;
    }
    let Ok(parsed) = url::Url::parse(src) else {
        return false;
    };
    parsed.scheme() == "http"
        && parsed.path().ends_with(".mp4")
        && matches!(parsed.host(), Some(url::Host::Ipv4(ip)) if ip.is_loopback())
}

/// Leading integer of a label such as "1080p" or "720p HD".
fn resolution_from_label(label: &str) -> Option<u32> {
    let label = label.trim();
    let end = label
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(i, _)| i)
        .unwrap_or(label.len());
    if end == 0 {
        return None;
    }
    label[..end].parse().ok()
}

/// Resolution from a `-<digits>p.mp4` URL suffix, e.g. ".../clip-720p.mp4".
fn resolution_from_url(src: &str) -> Option<u32> {
    let path = src.split(['?', '#']).next().unwrap_or(src);
    let stem = path.strip_suffix(".mp4")?;
    let stem = stem.strip_suffix('p')?;
    let digits_start = stem
        .rfind(|c: char| !c.is_ascii_digit())
        .map(|i| i + 1)
        .unwrap_or(0);
    let digits = &stem[digits_start..];
    if digits.is_empty() || !stem[..digits_start].ends_with('-') {
        return None;
    }
    digits.parse().ok()
}

/// Derived resolution for a candidate: label first, URL pattern second, 0 otherwise.
pub fn resolution_of(candidate: &SourceCandidate) -> u32 {
    candidate
        .label
        .as_deref()
        .and_then(resolution_from_label)
        .or_else(|| resolution_from_url(&candidate.url))
        .unwrap_or(0)
}

/// Picks the candidate with the highest derived resolution. Ties break to the
/// first in document order: a later candidate only wins with a strictly
/// higher resolution.
pub fn pick_best(candidates: &[SourceCandidate]) -> Option<&SourceCandidate> {
    let mut best: Option<(&SourceCandidate, u32)> = None;
    for candidate in candidates {
        let res = resolution_of(candidate);
        match best {
            Some((_, best_res)) if res <= best_res => {}
            _ => best = Some((candidate, res)),
        }
    }
    best.map(|(c, _)| c)
}
