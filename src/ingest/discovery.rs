//! Search-result and latest-post discovery
//!
//! Both passes read HTML, derive slugs and persist them as pending items for
//! a later resolution pass. Keyword items are kept even when a slug repeats;
//! daily items are unique by slug.

use crate::ingest::parser::extract_slugs;
use crate::ingest::Engine;
use crate::storage::{SearchRecord, Storage};
use crate::{FetchErrorKind, Result};

/// Outcome of walking the result pages of one keyword search
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchOutcome {
    /// Items created across every page that was read
    pub created: usize,
    /// Pages that could not be fetched
    pub failed_pages: u32,
    /// The error of the last page that could not be fetched
    pub last_error: Option<String>,
}

impl Engine {
    /// Walks result pages `1..=page_count` of a keyword search
    ///
    /// One item is created per discovered anchor. A page that cannot be
    /// fetched is logged and skipped; cancellation stops the walk.
    ///
    /// # Returns
    ///
    /// The number of items created and the pages that failed
    pub async fn search_by_keyword(
        &self,
        search: &SearchRecord,
        keyword: &str,
    ) -> Result<SearchOutcome> {
        let class = self.config().scrape.search_result_class.clone();
        let mut outcome = SearchOutcome::default();

        for page in 1..=search.page_count {
            let url = self.urls().search_url(keyword, page);
            let html = match self.fetcher().fetch_text(&url).await {
                Ok(html) => html,
                Err(e) if e.kind != FetchErrorKind::Cancelled => {
                    tracing::warn!(url = %url, page, error = %e, "Skipping search page");
                    outcome.failed_pages += 1;
                    outcome.last_error = Some(format!("search page {}: {}", page, e));
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let slugs = extract_slugs(&html, &class);
            tracing::debug!(keyword = %keyword, page, found = slugs.len(), "Parsed search page");

            {
                let mut storage = self.storage()?;
                for slug in &slugs {
                    storage.insert_keyword_item(search.id, slug)?;
                }
            }
            outcome.created += slugs.len();
        }

        tracing::info!(
            keyword = %keyword,
            pages = search.page_count,
            failed_pages = outcome.failed_pages,
            created = outcome.created,
            "Keyword search finished"
        );
        Ok(outcome)
    }

    /// Fetches the site root once and records every latest-post slug
    ///
    /// # Returns
    ///
    /// The number of items newly created; slugs already known are ignored
    pub async fn discover_daily(&self) -> Result<usize> {
        let url = self.urls().root_url().to_string();
        let html = self.fetcher().fetch_text(&url).await?;
        let slugs = extract_slugs(&html, &self.config().scrape.latest_post_class);

        let mut created = 0;
        {
            let mut storage = self.storage()?;
            for slug in &slugs {
                let (_, is_new) = storage.get_or_insert_daily_item(slug)?;
                if is_new {
                    created += 1;
                }
            }
        }

        tracing::info!(found = slugs.len(), created, "Daily discovery finished");
        Ok(created)
    }
}
