//! URL handling module
//!
//! This module renders the two URL shapes the engine talks to: the
//! parametrized `wp-json/wp/v2` API and the keyword-search results page. It
//! also derives post slugs from result hrefs.

mod api;
mod template;

// Re-export main types and functions
pub use api::{ApiQuery, ApiUrls, Filter, FilterAttribute, ScrapeUrlParams};
pub use template::render_template;

/// Derives a post slug from a result href
///
/// The slug is the second-to-last `/`-delimited segment, which matches the
/// platform's `/{yyyy}/{mm}/{dd}/{slug}/` permalink shape.
///
/// # Returns
///
/// * `Some(slug)` - The derived slug
/// * `None` - The href has fewer than two segments or the segment is empty
///
/// # Example
///
/// ```
/// use wp_ingest::url::slug_from_href;
///
/// let slug = slug_from_href("https://x.com/2024/01/01/my-post-title/");
/// assert_eq!(slug.as_deref(), Some("my-post-title"));
/// ```
pub fn slug_from_href(href: &str) -> Option<String> {
    let parts: Vec<&str> = href.split('/').collect();
    if parts.len() < 2 {
        return None;
    }

    let slug = parts[parts.len() - 2].trim();
    if slug.is_empty() {
        None
    } else {
        Some(slug.to_string())
    }
}
