//! HTML helpers
//!
//! This module handles the two things the engine reads out of HTML:
//! - Plain text of rendered fields (titles, content, descriptions)
//! - Post slugs from anchors carrying a known class

use crate::url::slug_from_href;
use scraper::{Html, Selector};

/// Reduces an HTML fragment to its text nodes, trimmed and joined by one space
///
/// # Example
///
/// ```
/// use wp_ingest::ingest::strip_html;
///
/// assert_eq!(strip_html("<p>Hello <b>World</b></p>"), "Hello World");
/// ```
pub fn strip_html(html: &str) -> String {
    let fragment = Html::parse_fragment(html);

    fragment
        .root_element()
        .text()
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Returns the `href` of every anchor carrying `class`, in document order
pub fn extract_anchor_hrefs(html: &str, class: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter(|element| element.value().classes().any(|c| c == class))
        .filter_map(|element| element.value().attr("href"))
        .map(|href| href.trim().to_string())
        .collect()
}

/// Extracts post slugs from anchors carrying `class`
///
/// Duplicates are kept and order follows the document. Anchors whose href
/// yields no slug are skipped.
pub fn extract_slugs(html: &str, class: &str) -> Vec<String> {
    extract_anchor_hrefs(html, class)
        .into_iter()
        .filter_map(|href| {
            let slug = slug_from_href(&href);
            if slug.is_none() {
                tracing::debug!(href = %href, "Skipping anchor without a slug segment");
            }
            slug
        })
        .collect()
}
