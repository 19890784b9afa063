//! Entry points for external schedulers
//!
//! Each entry point is an independent unit of work that never returns an
//! error: per-item failures are counted and persisted, and anything that
//! stops the pass as a whole is reported through [`TaskSummary::status`].

use crate::ingest::{Engine, SearchOutcome};
use crate::state::EntityKind;
use crate::storage::{AutoScrapRecord, ItemSource, ItemTable, Storage};
use crate::url::Filter;
use crate::{IngestError, Result};
use serde::Serialize;
use std::fmt;

/// How an entry point ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Every item was processed
    Completed,
    /// The pass ran to the end but some items failed
    CompletedWithFailures,
    /// The cancellation token fired mid-pass
    Cancelled,
    /// The pass could not run (storage failure, bad input)
    Failed,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Completed => "completed",
            Self::CompletedWithFailures => "completed_with_failures",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// Result of one entry-point invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskSummary {
    pub task: String,
    pub processed_count: usize,
    /// Items that failed, or result pages for a keyword search
    pub failed_count: usize,
    /// Items deactivated by this pass
    pub deactivated_count: usize,
    /// Items newly discovered by this pass, for passes that discover
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discovered_count: Option<usize>,
    pub status: TaskStatus,
    pub error: Option<String>,
}

impl TaskSummary {
    fn new(task: &str) -> Self {
        Self {
            task: task.to_string(),
            processed_count: 0,
            failed_count: 0,
            deactivated_count: 0,
            discovered_count: None,
            status: TaskStatus::Completed,
            error: None,
        }
    }

    fn fail(mut self, error: impl fmt::Display) -> Self {
        let message = error.to_string();
        tracing::error!(task = %self.task, error = %message, "Task failed");
        self.status = TaskStatus::Failed;
        self.error = Some(message);
        self
    }

    fn cancel(&mut self) {
        self.status = TaskStatus::Cancelled;
        self.error = Some("cancelled".to_string());
    }

    /// Applies the outcome of the inner pass and logs the summary
    fn finish(mut self, outcome: Result<()>) -> Self {
        if let Err(e) = outcome {
            return self.fail(e);
        }

        if self.status == TaskStatus::Completed && (self.failed_count > 0 || self.error.is_some())
        {
            self.status = TaskStatus::CompletedWithFailures;
        }

        tracing::info!(
            task = %self.task,
            processed = self.processed_count,
            failed = self.failed_count,
            deactivated = self.deactivated_count,
            status = %self.status,
            "Task finished"
        );
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == TaskStatus::Completed
    }
}

/// Canonical form of a search term: trimmed, inner whitespace collapsed to
/// single spaces, lowercased
pub fn normalize_keyword(term: &str) -> String {
    term.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

impl Engine {
    /// Resolves every pending keyword-search item into a post
    pub async fn resolve_pending_keyword_items(&self) -> TaskSummary {
        let mut summary = TaskSummary::new("resolve_pending_keyword_items");
        let outcome = self
            .resolve_items(ItemSource::KeywordSearch, &mut summary)
            .await;
        summary.finish(outcome)
    }

    /// Discovers today's posts on the landing page, then resolves every
    /// pending daily item
    ///
    /// A failed discovery is reported but does not stop the resolution of
    /// items discovered earlier.
    pub async fn resolve_pending_daily_items(&self) -> TaskSummary {
        let mut summary = TaskSummary::new("resolve_pending_daily_items");

        match self.discover_daily().await {
            Ok(created) => summary.discovered_count = Some(created),
            Err(e) if e.is_cancelled() => {
                summary.cancel();
                return summary.finish(Ok(()));
            }
            Err(e) if e.is_storage_error() => return summary.fail(e),
            Err(e) => {
                tracing::error!(error = %e, "Daily discovery failed");
                summary.error = Some(format!("daily discovery failed: {}", e));
            }
        }

        let outcome = self.resolve_items(ItemSource::Daily, &mut summary).await;
        summary.finish(outcome)
    }

    /// Runs every active directive whose execution item is still pending
    pub async fn run_pending_auto_scraps(&self) -> TaskSummary {
        let mut summary = TaskSummary::new("run_pending_auto_scraps");
        let outcome = self.run_auto_scraps(&mut summary).await;
        summary.finish(outcome)
    }

    /// Searches the platform for `term` and records one pending item per
    /// result anchor
    ///
    /// `page_count` defaults to `scrape.default-search-page-count` and is
    /// clamped to `1..=scrape.max-search-page-count`. Each result page that
    /// cannot be fetched counts as one failure; the task fails when no page
    /// could be read.
    pub async fn search_keyword(&self, term: &str, page_count: Option<u32>) -> TaskSummary {
        let mut summary = TaskSummary::new("search_keyword");

        let keyword = normalize_keyword(term);
        if keyword.is_empty() {
            return summary.fail("keyword is empty");
        }

        let scrape = &self.config().scrape;
        let pages = page_count
            .unwrap_or(scrape.default_search_page_count)
            .clamp(1, scrape.max_search_page_count);
        if let Some(requested) = page_count.filter(|requested| *requested != pages) {
            tracing::warn!(requested, pages, "Clamped search page count");
        }

        let outcome = self.record_search(&keyword, pages).await;
        match outcome {
            Ok(outcome) => {
                summary.processed_count = outcome.created;
                summary.discovered_count = Some(outcome.created);
                summary.failed_count = outcome.failed_pages as usize;
                let error = outcome.last_error.unwrap_or_default();
                if outcome.failed_pages >= pages {
                    return summary.fail(format!("every search page failed; {}", error));
                }
                if outcome.failed_pages > 0 {
                    summary.error = Some(error);
                }
                summary.finish(Ok(()))
            }
            Err(e) if e.is_cancelled() => {
                summary.cancel();
                summary.finish(Ok(()))
            }
            Err(e) => summary.fail(e),
        }
    }

    /// Creates an auto-scrape directive
    ///
    /// `page_start` defaults to 1 and `page_count` to 5. A category filter is
    /// only meaningful for post directives.
    pub fn create_auto_scrap(
        &self,
        field: EntityKind,
        page_start: Option<u32>,
        page_count: Option<u32>,
        category_filter: Option<i64>,
    ) -> Result<AutoScrapRecord> {
        if category_filter.is_some() && field != EntityKind::Post {
            return Err(IngestError::InvalidFilter {
                attribute: format!("category (on a {} directive)", field),
            });
        }

        let page_start = page_start.unwrap_or(1).max(1);
        let page_count = page_count.unwrap_or(5);

        let directive =
            self.storage()?
                .create_auto_scrap(field, page_start, page_count, category_filter)?;

        tracing::info!(
            directive = directive.id,
            kind = %field,
            page_start,
            page_count,
            "Created auto-scrape directive"
        );
        Ok(directive)
    }

    async fn record_search(&self, keyword: &str, page_count: u32) -> Result<SearchOutcome> {
        let search = {
            let mut storage = self.storage()?;
            let keyword = storage.get_or_insert_keyword(keyword)?;
            storage.get_or_insert_search(keyword.id, page_count)?
        };
        self.search_by_keyword(&search, keyword).await
    }

    async fn resolve_items(&self, source: ItemSource, summary: &mut TaskSummary) -> Result<()> {
        let items = self.storage()?.pending_items(source)?;
        let table = ItemTable::from(source);
        let max_fail_count = self.config().scrape.max_fail_count;

        tracing::info!(source = ?source, pending = items.len(), "Resolving items");

        for item in items {
            if self.cancel_token().is_cancelled() {
                summary.cancel();
                break;
            }

            let known = self.storage()?.find_post_by_slug(&item.slug)?;
            if let Some(post) = &known {
                tracing::debug!(
                    slug = %item.slug,
                    post = post.id,
                    "Slug already stored, refreshing its relations"
                );
            }

            let result = self
                .scrape_single(EntityKind::Post, Filter::Slug(item.slug.clone()))
                .await;

            match result {
                Ok(normalized) => {
                    self.storage()?
                        .mark_item_scraped(source, item.id, normalized.entity.id())?;
                    summary.processed_count += 1;
                }
                Err(e) if e.is_cancelled() => {
                    summary.cancel();
                    break;
                }
                Err(e) if e.is_storage_error() => return Err(e),
                Err(e) => {
                    let outcome = self
                        .storage()?
                        .record_item_failure(table, item.id, max_fail_count)?;
                    summary.failed_count += 1;

                    if outcome.deactivated() {
                        summary.deactivated_count += 1;
                        tracing::warn!(
                            slug = %item.slug,
                            fail_count = outcome.fail_count,
                            error = %e,
                            "Deactivated item"
                        );
                    } else {
                        tracing::warn!(
                            slug = %item.slug,
                            fail_count = outcome.fail_count,
                            error = %e,
                            "Item failed, will retry"
                        );
                    }
                }
            }
        }

        Ok(())
    }

    async fn run_auto_scraps(&self, summary: &mut TaskSummary) -> Result<()> {
        let directives = self.storage()?.pending_auto_scraps()?;
        let max_fail_count = self.config().scrape.max_fail_count;

        for directive in directives {
            if self.cancel_token().is_cancelled() {
                summary.cancel();
                break;
            }

            let item = self
                .storage()?
                .get_or_insert_auto_scrap_item(directive.id, directive.field)?;

            // A concurrent pass may have finished the directive since it was listed
            if item.state().is_terminal() {
                tracing::debug!(
                    directive = directive.id,
                    state = %item.state(),
                    "Directive already settled"
                );
                continue;
            }

            match self.run_directive(&directive, &item).await {
                Ok(_) => summary.processed_count += 1,
                Err(e) if e.is_cancelled() => {
                    summary.cancel();
                    break;
                }
                Err(e) if e.is_storage_error() => return Err(e),
                Err(e) => {
                    let table = ItemTable::AutoScrap(directive.field);
                    let outcome = self
                        .storage()?
                        .record_item_failure(table, item.id, max_fail_count)?;
                    summary.failed_count += 1;
                    if outcome.deactivated() {
                        summary.deactivated_count += 1;
                    }

                    tracing::warn!(
                        directive = directive.id,
                        fail_count = outcome.fail_count,
                        deactivated = outcome.deactivated(),
                        error = %e,
                        "Auto-scrape directive failed"
                    );
                }
            }
        }

        Ok(())
    }
}
