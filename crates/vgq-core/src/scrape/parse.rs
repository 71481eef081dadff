//! HTML extraction: video sources, title, tags, thumbnail.

use scraper::{Html, Selector};

use super::select::SourceCandidate;

/// Raw extraction result before validity filtering and selection.
#[derive(Debug, Default)]
pub struct RawPage {
    pub sources: Vec<SourceCandidate>,
    pub title: Option<String>,
    pub tags: Vec<String>,
    pub thumbnail_url: Option<String>,
}

fn selector(css: &str) -> Selector {
    // All selectors below are static literals; parse cannot fail.
    Selector::parse(css).expect("static selector")
}

/// Extracts the fields the worker needs from a video page body. Missing
/// pieces are represented as None/empty here; the caller decides which of
/// them are fatal.
pub fn extract(body: &str) -> RawPage {
    let doc = Html::parse_document(body);

    let source_sel = selector("video source");
    let title_sel = selector(r#"meta[property="og:title"]"#);
    let tag_sel = selector("a.tag-item");
    let thumb_sel = selector(r#"meta[property="og:image"]"#);

    let mut page = RawPage::default();

    for el in doc.select(&source_sel) {
        let Some(src) = el.value().attr("src") else {
            continue;
        };
        page.sources.push(SourceCandidate {
            url: src.to_string(),
            label: el
                .value()
                .attr("res")
                .or_else(|| el.value().attr("label"))
                .map(str::to_string),
        });
    }

    page.title = doc
        .select(&title_sel)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());

    for el in doc.select(&tag_sel) {
        let text: String = el.text().collect();
        let tag = text.trim().trim_start_matches('#').trim();
        if !tag.is_empty() {
            page.tags.push(tag.to_string());
        }
    }

    page.thumbnail_url = doc
        .select(&thumb_sel)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());

    page
}
