//! Storage module for the ingested entity graph
//!
//! This module handles all persistence for the engine:
//! - SQLite database initialization and schema management
//! - Create-if-absent writes for posts, categories and authors
//! - Keyword, daily and auto-scrape item lifecycle
//! - Image bytes on the local filesystem

mod images;
mod schema;
mod sqlite;
mod traits;

pub use images::{FsImageStore, ImageStore};
pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::state::{EntityKind, ItemState};
use crate::IngestError;

use std::path::Path;

/// Initializes or opens a storage database
pub fn open_storage(path: &Path) -> Result<SqliteStorage, IngestError> {
    SqliteStorage::new(path)
}

/// A post ready to be written
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewPost {
    pub remote_id: i64,
    pub slug: String,
    pub title: String,
    pub content: String,
    pub link: String,
    pub image_link: String,
    /// Reference returned by the image store, empty when there is no image
    pub image: String,
}

/// A category ready to be written
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewCategory {
    pub remote_id: i64,
    pub slug: String,
    pub name: String,
    pub description: String,
    pub post_count: i64,
    pub link: String,
}

/// An author ready to be written
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewAuthor {
    pub remote_id: i64,
    pub slug: String,
    pub name: String,
    pub description: String,
    pub position: String,
    pub link: String,
    pub avatar_link: String,
    pub avatar: String,
}

/// Represents a post in the database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostRecord {
    pub id: i64,
    pub remote_id: i64,
    pub slug: String,
    pub title: String,
    pub content: String,
    pub link: String,
    pub image_link: String,
    pub image: String,
    pub is_active: bool,
    pub created_at: String,
}

/// Represents a category in the database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRecord {
    pub id: i64,
    pub remote_id: i64,
    pub slug: String,
    pub name: String,
    pub description: String,
    pub post_count: i64,
    pub link: String,
    pub is_active: bool,
    pub created_at: String,
}

/// Represents an author in the database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorRecord {
    pub id: i64,
    pub remote_id: i64,
    pub slug: String,
    pub name: String,
    pub description: String,
    pub position: String,
    pub link: String,
    pub avatar_link: String,
    pub avatar: String,
    pub is_active: bool,
    pub created_at: String,
}

/// A normalized search term
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordRecord {
    pub id: i64,
    pub title: String,
}

/// One keyword search over a fixed number of result pages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRecord {
    pub id: i64,
    pub keyword_id: i64,
    pub page_count: u32,
}

/// A discovered slug awaiting resolution into a post
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlugItemRecord {
    pub id: i64,
    pub slug: String,
    /// Parent search for keyword items, `None` for daily items
    pub search_id: Option<i64>,
    pub post_id: Option<i64>,
    pub is_scraped: bool,
    pub fail_count: u32,
    pub is_active: bool,
}

impl SlugItemRecord {
    pub fn state(&self) -> ItemState {
        ItemState::from_flags(self.is_scraped, self.is_active)
    }
}

/// A bounded bulk-ingestion directive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoScrapRecord {
    pub id: i64,
    pub field: EntityKind,
    pub page_start: u32,
    pub page_count: u32,
    /// Remote category id restricting a post directive
    pub category_filter: Option<i64>,
    pub is_active: bool,
}

/// The execution record of one directive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoScrapItemRecord {
    pub id: i64,
    pub auto_scrap_id: i64,
    pub kind: EntityKind,
    pub is_scraped: bool,
    pub fail_count: u32,
    pub is_active: bool,
}

impl AutoScrapItemRecord {
    pub fn state(&self) -> ItemState {
        ItemState::from_flags(self.is_scraped, self.is_active)
    }
}

/// Where a slug item was discovered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemSource {
    KeywordSearch,
    Daily,
}

/// Every table whose rows follow the pending/scraped/deactivated lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemTable {
    KeywordSearch,
    Daily,
    AutoScrap(EntityKind),
}

impl ItemTable {
    pub fn table_name(&self) -> &'static str {
        match self {
            Self::KeywordSearch => "post_search_by_keyword_items",
            Self::Daily => "post_search_daily_items",
            Self::AutoScrap(EntityKind::Post) => "auto_scrap_post_items",
            Self::AutoScrap(EntityKind::Category) => "auto_scrap_category_items",
            Self::AutoScrap(EntityKind::Author) => "auto_scrap_author_items",
        }
    }

    pub fn all() -> [Self; 5] {
        [
            Self::KeywordSearch,
            Self::Daily,
            Self::AutoScrap(EntityKind::Post),
            Self::AutoScrap(EntityKind::Category),
            Self::AutoScrap(EntityKind::Author),
        ]
    }
}

impl From<ItemSource> for ItemTable {
    fn from(source: ItemSource) -> Self {
        match source {
            ItemSource::KeywordSearch => Self::KeywordSearch,
            ItemSource::Daily => Self::Daily,
        }
    }
}

/// Item counts per lifecycle state for one table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ItemStateCounts {
    pub pending: u64,
    pub scraped: u64,
    pub deactivated: u64,
}

impl ItemStateCounts {
    pub fn total(&self) -> u64 {
        self.pending + self.scraped + self.deactivated
    }
}
