//! HTML scraper: fetch a video page through a proxy and extract the direct
//! media URL plus metadata (title, tags, thumbnail).
//!
//! Source selection picks the highest derived resolution; ties break to
//! document order. See `select` for the two-stage resolution derivation.

mod parse;
mod select;

pub use select::{
    is_valid_loopback_source, is_valid_source, pick_best, resolution_of, SourceCandidate,
};

use std::time::Duration;
use thiserror::Error;

use crate::agent;
use crate::http::client_for;

/// Structured result of a successful scrape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageMetadata {
    /// Direct URL of the best-quality playable source.
    pub video_url: String,
    pub title: String,
    pub tags: Vec<String>,
    pub thumbnail_url: Option<String>,
}

/// Scrape failures. All are terminal for the attempt; the coordinator never
/// retries automatically.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("page fetch failed: {0}")]
    Fetch(#[from] reqwest::Error),
    #[error("page returned HTTP {0}")]
    HttpStatus(u16),
    #[error("page has no video sources")]
    NoSources,
    #[error("no playable source on page (https .mp4 required)")]
    NoPlayableSource,
    #[error("page has no usable title")]
    MissingTitle,
}

/// Referer for requests to `page_url`: its origin with a trailing slash.
/// Falls back to the page URL itself if it doesn't parse.
pub fn referer_for(page_url: &str) -> String {
    match url::Url::parse(page_url) {
        Ok(u) => match u.host_str() {
            Some(host) => format!("{}://{}/", u.scheme(), host),
            None => page_url.to_string(),
        },
        Err(_) => page_url.to_string(),
    }
}

/// Fetches `page_url` through `proxy` and extracts video metadata.
///
/// Fails if the page is unreachable within `timeout`, has no `<source>`
/// elements, none of them pass the validity filter, or the title is missing.
/// An empty tag list and a missing thumbnail are tolerated.
///
/// `allow_loopback_sources` switches the validity filter to
/// [`is_valid_loopback_source`] for rigs serving media over cleartext
/// loopback; the default filter is https-only.
pub async fn scrape(
    page_url: &str,
    proxy: Option<&str>,
    timeout: Duration,
    allow_loopback_sources: bool,
) -> Result<PageMetadata, ScrapeError> {
    let client = client_for(proxy, Some(timeout))?;

    let resp = client
        .get(page_url)
        .header(reqwest::header::USER_AGENT, agent::random_user_agent())
        .header(reqwest::header::REFERER, referer_for(page_url))
        .send()
        .await?;

    let status = resp.status();
    if !status.is_success() {
        return Err(ScrapeError::HttpStatus(status.as_u16()));
    }

    let body = resp.text().await?;
    let page = parse::extract(&body);

    if page.sources.is_empty() {
        return Err(ScrapeError::NoSources);
    }

    let valid = if allow_loopback_sources {
        is_valid_loopback_source
    } else {
        is_valid_source
    };
    let playable: Vec<SourceCandidate> = page
        .sources
        .into_iter()
        .filter(|c| valid(&c.url))
        .collect();
    let best = pick_best(&playable).ok_or(ScrapeError::NoPlayableSource)?;

    let title = page.title.ok_or(ScrapeError::MissingTitle)?;

    tracing::debug!(
        video_url = %best.url,
        resolution = resolution_of(best),
        tags = page.tags.len(),
        "scraped page"
    );

    Ok(PageMetadata {
        video_url: best.url.clone(),
        title,
        tags: page.tags,
        thumbnail_url: page.thumbnail_url,
    })
}
