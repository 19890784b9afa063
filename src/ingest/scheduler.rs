//! Auto-scrape page-range scheduler
//!
//! A directive names an entity kind, a first page and a page count. The range
//! it covers is clamped to the last page the remote collection is known to
//! have.

use crate::ingest::Engine;
use crate::state::EntityKind;
use crate::storage::{AutoScrapItemRecord, AutoScrapRecord, Storage};
use crate::url::Filter;
use crate::Result;
use std::ops::Range;

/// Exclusive end of a directive's page range
///
/// `min(page_start + page_count + 1, last_page)`. The `+ 1` means an
/// unclamped range covers `page_count + 1` pages.
///
/// # Example
///
/// ```
/// use wp_ingest::ingest::end_page;
///
/// assert_eq!(end_page(1, 5, 499), 7);
/// assert_eq!(end_page(1, 5, 3), 3);
/// ```
pub fn end_page(page_start: u32, page_count: u32, last_page: u32) -> u32 {
    page_start
        .saturating_add(page_count)
        .saturating_add(1)
        .min(last_page)
}

/// Pages a directive visits, in order
pub fn page_range(page_start: u32, page_count: u32, last_page: u32) -> Range<u32> {
    page_start..end_page(page_start, page_count, last_page)
}

impl Engine {
    /// Runs one directive against its execution item
    ///
    /// Pages are scraped strictly in order. Collected entities are attached to
    /// the item and the item is marked scraped only after the whole range
    /// succeeds; any page failure leaves the item pending.
    ///
    /// # Returns
    ///
    /// The number of entities collected
    pub async fn run_directive(
        &self,
        directive: &AutoScrapRecord,
        item: &AutoScrapItemRecord,
    ) -> Result<usize> {
        let kind = directive.field;
        let last_page = self.config().last_page.for_kind(kind);
        let pages = page_range(directive.page_start, directive.page_count, last_page);
        let filter = directive_filter(directive);

        tracing::info!(
            directive = directive.id,
            kind = %kind,
            start = pages.start,
            end = pages.end,
            filter = %filter.describe(),
            "Running auto-scrape directive"
        );

        let mut entity_ids = Vec::new();
        for page in pages {
            let entities = self.scrape_collection(kind, filter.clone(), page).await?;
            entity_ids.extend(entities.iter().map(|normalized| normalized.entity.id()));
        }

        self.storage()?
            .complete_auto_scrap_item(kind, item.id, &entity_ids)?;

        tracing::info!(
            directive = directive.id,
            collected = entity_ids.len(),
            "Auto-scrape directive finished"
        );
        Ok(entity_ids.len())
    }
}

/// Post directives may be restricted to one remote category
fn directive_filter(directive: &AutoScrapRecord) -> Filter {
    match (directive.field, directive.category_filter) {
        (EntityKind::Post, Some(category)) if category > 0 => Filter::Category(category as u64),
        _ => Filter::None,
    }
}
