//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::state::{EntityKind, FailureOutcome};
use crate::storage::{
    AuthorRecord, AutoScrapItemRecord, AutoScrapRecord, CategoryRecord, ItemSource,
    ItemStateCounts, ItemTable, KeywordRecord, NewAuthor, NewCategory, NewPost, PostRecord,
    SearchRecord, SlugItemRecord,
};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Item {id} not found in {table}")]
    ItemNotFound { table: &'static str, id: i64 },

    #[error("Auto-scrape directive not found: {0}")]
    AutoScrapNotFound(i64),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Corrupt row in {table}: {message}")]
    CorruptRow {
        table: &'static str,
        message: String,
    },

    #[error("Storage lock poisoned by a panicked task")]
    LockPoisoned,

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Every `get_or_insert_*` method is atomic with respect to its natural key:
/// two callers racing on the same key observe a single stored row, and
/// exactly one of them sees `created = true`.
pub trait Storage {
    // ===== Entities =====

    fn find_post_by_remote_id(&self, remote_id: i64) -> StorageResult<Option<PostRecord>>;

    fn find_post_by_slug(&self, slug: &str) -> StorageResult<Option<PostRecord>>;

    fn find_category_by_remote_id(&self, remote_id: i64)
        -> StorageResult<Option<CategoryRecord>>;

    fn find_author_by_remote_id(&self, remote_id: i64) -> StorageResult<Option<AuthorRecord>>;

    /// Inserts a category unless one with the same remote id exists
    ///
    /// # Returns
    ///
    /// The stored row and whether this call created it
    fn get_or_insert_category(
        &mut self,
        category: &NewCategory,
    ) -> StorageResult<(CategoryRecord, bool)>;

    /// Inserts an author unless one with the same remote id exists
    fn get_or_insert_author(&mut self, author: &NewAuthor) -> StorageResult<(AuthorRecord, bool)>;

    /// Writes a post and its relation rows in one transaction
    ///
    /// # Arguments
    ///
    /// * `post` - The post row
    /// * `category_ids` - Local ids of already stored categories
    /// * `author_ids` - Local ids of already stored authors
    ///
    /// Either the post and every join row are committed, or nothing is.
    /// An existing post row is left untouched; only its missing join rows
    /// are added.
    fn commit_post(
        &mut self,
        post: &NewPost,
        category_ids: &[i64],
        author_ids: &[i64],
    ) -> StorageResult<(PostRecord, bool)>;

    fn post_categories(&self, post_id: i64) -> StorageResult<Vec<CategoryRecord>>;

    fn post_authors(&self, post_id: i64) -> StorageResult<Vec<AuthorRecord>>;

    // ===== Keyword search =====

    /// Gets or creates a keyword; `term` must already be normalized
    fn get_or_insert_keyword(&mut self, term: &str) -> StorageResult<KeywordRecord>;

    /// Gets or creates the search for a `(keyword, page_count)` pair
    fn get_or_insert_search(
        &mut self,
        keyword_id: i64,
        page_count: u32,
    ) -> StorageResult<SearchRecord>;

    /// Creates a keyword search item unconditionally
    ///
    /// The same slug may appear many times under one search.
    fn insert_keyword_item(&mut self, search_id: i64, slug: &str) -> StorageResult<i64>;

    /// Creates a daily item unless one with the same slug exists
    fn get_or_insert_daily_item(&mut self, slug: &str) -> StorageResult<(i64, bool)>;

    // ===== Item lifecycle =====

    /// Lists items that are neither scraped nor deactivated, oldest first
    fn pending_items(&self, source: ItemSource) -> StorageResult<Vec<SlugItemRecord>>;

    /// Links a resolved item to its post and marks it scraped
    fn mark_item_scraped(
        &mut self,
        source: ItemSource,
        item_id: i64,
        post_id: i64,
    ) -> StorageResult<()>;

    /// Increments `fail_count` and deactivates the item once it exceeds
    /// `max_fail_count`, in a single statement
    fn record_item_failure(
        &mut self,
        table: ItemTable,
        item_id: i64,
        max_fail_count: u32,
    ) -> StorageResult<FailureOutcome>;

    // ===== Auto-scrape =====

    fn create_auto_scrap(
        &mut self,
        field: EntityKind,
        page_start: u32,
        page_count: u32,
        category_filter: Option<i64>,
    ) -> StorageResult<AutoScrapRecord>;

    /// Lists active directives whose item for their own field is still pending
    /// (or was never created)
    fn pending_auto_scraps(&self) -> StorageResult<Vec<AutoScrapRecord>>;

    fn get_or_insert_auto_scrap_item(
        &mut self,
        auto_scrap_id: i64,
        kind: EntityKind,
    ) -> StorageResult<AutoScrapItemRecord>;

    /// Adds the collected entities to the item and marks it scraped, atomically
    fn complete_auto_scrap_item(
        &mut self,
        kind: EntityKind,
        item_id: i64,
        entity_ids: &[i64],
    ) -> StorageResult<()>;

    /// Local ids of the entities collected by an item
    fn auto_scrap_item_entities(&self, kind: EntityKind, item_id: i64)
        -> StorageResult<Vec<i64>>;

    // ===== Statistics =====

    fn count_entities(&self, kind: EntityKind) -> StorageResult<u64>;

    fn count_keywords(&self) -> StorageResult<u64>;

    fn count_items_by_state(&self, table: ItemTable) -> StorageResult<ItemStateCounts>;
}
