//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::state::{EntityKind, FailureOutcome};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{
    AuthorRecord, AutoScrapItemRecord, AutoScrapRecord, CategoryRecord, ItemSource,
    ItemStateCounts, ItemTable, KeywordRecord, NewAuthor, NewCategory, NewPost, PostRecord,
    SearchRecord, SlugItemRecord,
};
use crate::IngestError;
use chrono::Utc;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

const POST_COLUMNS: &str =
    "id, remote_id, slug, title, content, link, image_link, image, is_active, created_at";
const CATEGORY_COLUMNS: &str =
    "id, remote_id, slug, name, description, post_count, link, is_active, created_at";
const AUTHOR_COLUMNS: &str = "id, remote_id, slug, name, description, position, link, \
     avatar_link, avatar, is_active, created_at";
const AUTO_SCRAP_COLUMNS: &str =
    "id, field, page_start, page_count, category_filter, is_active";
const AUTO_SCRAP_ITEM_COLUMNS: &str = "id, auto_scrap_id, is_scraped, fail_count, is_active";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens or creates the database at `path` and applies the schema
    pub fn new(path: &Path) -> Result<Self, IngestError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, IngestError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn now() -> String {
    Utc::now().to_rfc3339()
}

fn entity_table(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Post => "posts",
        EntityKind::Category => "categories",
        EntityKind::Author => "authors",
    }
}

fn auto_scrap_link_table(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Post => "auto_scrap_post_item_entities",
        EntityKind::Category => "auto_scrap_category_item_entities",
        EntityKind::Author => "auto_scrap_author_item_entities",
    }
}

fn source_table(source: ItemSource) -> &'static str {
    ItemTable::from(source).table_name()
}

fn post_from_row(row: &Row<'_>) -> rusqlite::Result<PostRecord> {
    Ok(PostRecord {
        id: row.get(0)?,
        remote_id: row.get(1)?,
        slug: row.get(2)?,
        title: row.get(3)?,
        content: row.get(4)?,
        link: row.get(5)?,
        image_link: row.get(6)?,
        image: row.get(7)?,
        is_active: row.get(8)?,
        created_at: row.get(9)?,
    })
}

fn category_from_row(row: &Row<'_>) -> rusqlite::Result<CategoryRecord> {
    Ok(CategoryRecord {
        id: row.get(0)?,
        remote_id: row.get(1)?,
        slug: row.get(2)?,
        name: row.get(3)?,
        description: row.get(4)?,
        post_count: row.get(5)?,
        link: row.get(6)?,
        is_active: row.get(7)?,
        created_at: row.get(8)?,
    })
}

fn author_from_row(row: &Row<'_>) -> rusqlite::Result<AuthorRecord> {
    Ok(AuthorRecord {
        id: row.get(0)?,
        remote_id: row.get(1)?,
        slug: row.get(2)?,
        name: row.get(3)?,
        description: row.get(4)?,
        position: row.get(5)?,
        link: row.get(6)?,
        avatar_link: row.get(7)?,
        avatar: row.get(8)?,
        is_active: row.get(9)?,
        created_at: row.get(10)?,
    })
}

fn slug_item_from_row(row: &Row<'_>) -> rusqlite::Result<SlugItemRecord> {
    Ok(SlugItemRecord {
        id: row.get(0)?,
        slug: row.get(1)?,
        search_id: row.get(2)?,
        post_id: row.get(3)?,
        is_scraped: row.get(4)?,
        fail_count: row.get(5)?,
        is_active: row.get(6)?,
    })
}

fn auto_scrap_from_row(row: &Row<'_>) -> rusqlite::Result<AutoScrapRecord> {
    let field: String = row.get(1)?;
    let field = EntityKind::from_db_string(&field).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            1,
            Type::Text,
            format!("unknown auto-scrape field '{}'", field).into(),
        )
    })?;

    Ok(AutoScrapRecord {
        id: row.get(0)?,
        field,
        page_start: row.get(2)?,
        page_count: row.get(3)?,
        category_filter: row.get(4)?,
        is_active: row.get(5)?,
    })
}

fn auto_scrap_item_from_row(
    kind: EntityKind,
) -> impl Fn(&Row<'_>) -> rusqlite::Result<AutoScrapItemRecord> {
    move |row| {
        Ok(AutoScrapItemRecord {
            id: row.get(0)?,
            auto_scrap_id: row.get(1)?,
            kind,
            is_scraped: row.get(2)?,
            fail_count: row.get(3)?,
            is_active: row.get(4)?,
        })
    }
}

impl Storage for SqliteStorage {
    // ===== Entities =====

    fn find_post_by_remote_id(&self, remote_id: i64) -> StorageResult<Option<PostRecord>> {
        let post = self
            .conn
            .query_row(
                &format!("SELECT {} FROM posts WHERE remote_id = ?1", POST_COLUMNS),
                params![remote_id],
                post_from_row,
            )
            .optional()?;
        Ok(post)
    }

    fn find_post_by_slug(&self, slug: &str) -> StorageResult<Option<PostRecord>> {
        let post = self
            .conn
            .query_row(
                &format!("SELECT {} FROM posts WHERE slug = ?1", POST_COLUMNS),
                params![slug],
                post_from_row,
            )
            .optional()?;
        Ok(post)
    }

    fn find_category_by_remote_id(
        &self,
        remote_id: i64,
    ) -> StorageResult<Option<CategoryRecord>> {
        let category = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM categories WHERE remote_id = ?1",
                    CATEGORY_COLUMNS
                ),
                params![remote_id],
                category_from_row,
            )
            .optional()?;
        Ok(category)
    }

    fn find_author_by_remote_id(&self, remote_id: i64) -> StorageResult<Option<AuthorRecord>> {
        let author = self
            .conn
            .query_row(
                &format!("SELECT {} FROM authors WHERE remote_id = ?1", AUTHOR_COLUMNS),
                params![remote_id],
                author_from_row,
            )
            .optional()?;
        Ok(author)
    }

    fn get_or_insert_category(
        &mut self,
        category: &NewCategory,
    ) -> StorageResult<(CategoryRecord, bool)> {
        let inserted = self.conn.execute(
            "INSERT INTO categories
                 (remote_id, slug, name, description, post_count, link, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
             ON CONFLICT(remote_id) DO NOTHING",
            params![
                category.remote_id,
                category.slug,
                category.name,
                category.description,
                category.post_count,
                category.link,
                now(),
            ],
        )?;

        let record = self
            .find_category_by_remote_id(category.remote_id)?
            .ok_or(StorageError::CorruptRow {
                table: "categories",
                message: format!("remote id {} vanished after insert", category.remote_id),
            })?;

        Ok((record, inserted > 0))
    }

    fn get_or_insert_author(&mut self, author: &NewAuthor) -> StorageResult<(AuthorRecord, bool)> {
        let inserted = self.conn.execute(
            "INSERT INTO authors
                 (remote_id, slug, name, description, position, link, avatar_link, avatar,
                  created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
             ON CONFLICT(remote_id) DO NOTHING",
            params![
                author.remote_id,
                author.slug,
                author.name,
                author.description,
                author.position,
                author.link,
                author.avatar_link,
                author.avatar,
                now(),
            ],
        )?;

        let record = self
            .find_author_by_remote_id(author.remote_id)?
            .ok_or(StorageError::CorruptRow {
                table: "authors",
                message: format!("remote id {} vanished after insert", author.remote_id),
            })?;

        Ok((record, inserted > 0))
    }

    fn commit_post(
        &mut self,
        post: &NewPost,
        category_ids: &[i64],
        author_ids: &[i64],
    ) -> StorageResult<(PostRecord, bool)> {
        let now = now();
        let tx = self.conn.transaction()?;

        let inserted = tx.execute(
            "INSERT INTO posts
                 (remote_id, slug, title, content, link, image_link, image, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
             ON CONFLICT DO NOTHING",
            params![
                post.remote_id,
                post.slug,
                post.title,
                post.content,
                post.link,
                post.image_link,
                post.image,
                now,
            ],
        )?;

        // Dropping `tx` on the early return rolls back
        let record = tx
            .query_row(
                &format!("SELECT {} FROM posts WHERE remote_id = ?1", POST_COLUMNS),
                params![post.remote_id],
                post_from_row,
            )
            .optional()?
            .ok_or_else(|| {
                StorageError::ConstraintViolation(format!(
                    "slug '{}' already belongs to a post other than remote id {}",
                    post.slug, post.remote_id
                ))
            })?;

        for category_id in category_ids {
            tx.execute(
                "INSERT INTO post_categories (post_id, category_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?3)
                 ON CONFLICT(post_id, category_id) DO NOTHING",
                params![record.id, category_id, now],
            )?;
        }

        for author_id in author_ids {
            tx.execute(
                "INSERT INTO post_authors (post_id, author_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?3)
                 ON CONFLICT(post_id, author_id) DO NOTHING",
                params![record.id, author_id, now],
            )?;
        }

        tx.commit()?;
        Ok((record, inserted > 0))
    }

    fn post_categories(&self, post_id: i64) -> StorageResult<Vec<CategoryRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM categories WHERE id IN
                 (SELECT category_id FROM post_categories WHERE post_id = ?1 AND is_active = 1)
             ORDER BY id",
            CATEGORY_COLUMNS
        ))?;

        let categories = stmt
            .query_map(params![post_id], category_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(categories)
    }

    fn post_authors(&self, post_id: i64) -> StorageResult<Vec<AuthorRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM authors WHERE id IN
                 (SELECT author_id FROM post_authors WHERE post_id = ?1 AND is_active = 1)
             ORDER BY id",
            AUTHOR_COLUMNS
        ))?;

        let authors = stmt
            .query_map(params![post_id], author_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(authors)
    }

    // ===== Keyword search =====

    fn get_or_insert_keyword(&mut self, term: &str) -> StorageResult<KeywordRecord> {
        self.conn.execute(
            "INSERT INTO keywords (title, created_at, updated_at) VALUES (?1, ?2, ?2)
             ON CONFLICT(title) DO NOTHING",
            params![term, now()],
        )?;

        let keyword = self.conn.query_row(
            "SELECT id, title FROM keywords WHERE title = ?1",
            params![term],
            |row| {
                Ok(KeywordRecord {
                    id: row.get(0)?,
                    title: row.get(1)?,
                })
            },
        )?;
        Ok(keyword)
    }

    fn get_or_insert_search(
        &mut self,
        keyword_id: i64,
        page_count: u32,
    ) -> StorageResult<SearchRecord> {
        self.conn.execute(
            "INSERT INTO searches_by_keyword (keyword_id, page_count, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?3)
             ON CONFLICT(keyword_id, page_count) DO NOTHING",
            params![keyword_id, page_count, now()],
        )?;

        let search = self.conn.query_row(
            "SELECT id, keyword_id, page_count FROM searches_by_keyword
             WHERE keyword_id = ?1 AND page_count = ?2",
            params![keyword_id, page_count],
            |row| {
                Ok(SearchRecord {
                    id: row.get(0)?,
                    keyword_id: row.get(1)?,
                    page_count: row.get(2)?,
                })
            },
        )?;
        Ok(search)
    }

    fn insert_keyword_item(&mut self, search_id: i64, slug: &str) -> StorageResult<i64> {
        self.conn.execute(
            "INSERT INTO post_search_by_keyword_items (search_id, slug, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?3)",
            params![search_id, slug, now()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_or_insert_daily_item(&mut self, slug: &str) -> StorageResult<(i64, bool)> {
        let inserted = self.conn.execute(
            "INSERT INTO post_search_daily_items (slug, created_at, updated_at)
             VALUES (?1, ?2, ?2)
             ON CONFLICT(slug) DO NOTHING",
            params![slug, now()],
        )?;

        let id = self.conn.query_row(
            "SELECT id FROM post_search_daily_items WHERE slug = ?1",
            params![slug],
            |row| row.get(0),
        )?;
        Ok((id, inserted > 0))
    }

    // ===== Item lifecycle =====

    fn pending_items(&self, source: ItemSource) -> StorageResult<Vec<SlugItemRecord>> {
        let search_column = match source {
            ItemSource::KeywordSearch => "search_id",
            ItemSource::Daily => "NULL",
        };

        let mut stmt = self.conn.prepare(&format!(
            "SELECT id, slug, {}, post_id, is_scraped, fail_count, is_active FROM {}
             WHERE is_scraped = 0 AND is_active = 1
             ORDER BY id",
            search_column,
            source_table(source)
        ))?;

        let items = stmt
            .query_map([], slug_item_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    fn mark_item_scraped(
        &mut self,
        source: ItemSource,
        item_id: i64,
        post_id: i64,
    ) -> StorageResult<()> {
        let table = source_table(source);
        let updated = self.conn.execute(
            &format!(
                "UPDATE {} SET post_id = ?1, is_scraped = 1, updated_at = ?2 WHERE id = ?3",
                table
            ),
            params![post_id, now(), item_id],
        )?;

        if updated == 0 {
            return Err(StorageError::ItemNotFound { table, id: item_id });
        }
        Ok(())
    }

    fn record_item_failure(
        &mut self,
        table: ItemTable,
        item_id: i64,
        max_fail_count: u32,
    ) -> StorageResult<FailureOutcome> {
        let table = table.table_name();

        // Right-hand sides see the pre-update row, RETURNING sees the new one
        let outcome = self
            .conn
            .query_row(
                &format!(
                    "UPDATE {} SET
                         fail_count = fail_count + 1,
                         is_active = CASE WHEN fail_count + 1 > ?1 THEN 0 ELSE is_active END,
                         updated_at = ?2
                     WHERE id = ?3
                     RETURNING fail_count, is_active",
                    table
                ),
                params![max_fail_count, now(), item_id],
                |row| {
                    Ok(FailureOutcome {
                        fail_count: row.get(0)?,
                        is_active: row.get(1)?,
                    })
                },
            )
            .optional()?;

        outcome.ok_or(StorageError::ItemNotFound { table, id: item_id })
    }

    // ===== Auto-scrape =====

    fn create_auto_scrap(
        &mut self,
        field: EntityKind,
        page_start: u32,
        page_count: u32,
        category_filter: Option<i64>,
    ) -> StorageResult<AutoScrapRecord> {
        self.conn.execute(
            "INSERT INTO auto_scraps
                 (field, page_start, page_count, category_filter, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![
                field.to_db_string(),
                page_start,
                page_count,
                category_filter,
                now()
            ],
        )?;

        Ok(AutoScrapRecord {
            id: self.conn.last_insert_rowid(),
            field,
            page_start,
            page_count,
            category_filter,
            is_active: true,
        })
    }

    fn pending_auto_scraps(&self) -> StorageResult<Vec<AutoScrapRecord>> {
        let mut directives = Vec::new();

        for kind in EntityKind::all() {
            let mut stmt = self.conn.prepare(&format!(
                "SELECT {} FROM auto_scraps a
                 WHERE a.field = ?1 AND a.is_active = 1
                   AND NOT EXISTS (
                       SELECT 1 FROM {} i
                       WHERE i.auto_scrap_id = a.id AND (i.is_scraped = 1 OR i.is_active = 0)
                   )",
                AUTO_SCRAP_COLUMNS,
                ItemTable::AutoScrap(kind).table_name()
            ))?;

            let rows = stmt.query_map(params![kind.to_db_string()], auto_scrap_from_row)?;
            for row in rows {
                directives.push(row?);
            }
        }

        directives.sort_by_key(|d| d.id);
        Ok(directives)
    }

    fn get_or_insert_auto_scrap_item(
        &mut self,
        auto_scrap_id: i64,
        kind: EntityKind,
    ) -> StorageResult<AutoScrapItemRecord> {
        let table = ItemTable::AutoScrap(kind).table_name();

        let exists: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM auto_scraps WHERE id = ?1",
                params![auto_scrap_id],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_none() {
            return Err(StorageError::AutoScrapNotFound(auto_scrap_id));
        }

        self.conn.execute(
            &format!(
                "INSERT INTO {} (auto_scrap_id, created_at, updated_at) VALUES (?1, ?2, ?2)
                 ON CONFLICT(auto_scrap_id) DO NOTHING",
                table
            ),
            params![auto_scrap_id, now()],
        )?;

        let item = self.conn.query_row(
            &format!(
                "SELECT {} FROM {} WHERE auto_scrap_id = ?1",
                AUTO_SCRAP_ITEM_COLUMNS, table
            ),
            params![auto_scrap_id],
            auto_scrap_item_from_row(kind),
        )?;
        Ok(item)
    }

    fn complete_auto_scrap_item(
        &mut self,
        kind: EntityKind,
        item_id: i64,
        entity_ids: &[i64],
    ) -> StorageResult<()> {
        let table = ItemTable::AutoScrap(kind).table_name();
        let link_table = auto_scrap_link_table(kind);
        let tx = self.conn.transaction()?;

        for entity_id in entity_ids {
            tx.execute(
                &format!(
                    "INSERT INTO {} (item_id, entity_id) VALUES (?1, ?2)
                     ON CONFLICT(item_id, entity_id) DO NOTHING",
                    link_table
                ),
                params![item_id, entity_id],
            )?;
        }

        let updated = tx.execute(
            &format!(
                "UPDATE {} SET is_scraped = 1, updated_at = ?1 WHERE id = ?2",
                table
            ),
            params![now(), item_id],
        )?;

        if updated == 0 {
            return Err(StorageError::ItemNotFound { table, id: item_id });
        }

        tx.commit()?;
        Ok(())
    }

    fn auto_scrap_item_entities(
        &self,
        kind: EntityKind,
        item_id: i64,
    ) -> StorageResult<Vec<i64>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT entity_id FROM {} WHERE item_id = ?1 ORDER BY rowid",
            auto_scrap_link_table(kind)
        ))?;

        let ids = stmt
            .query_map(params![item_id], |row| row.get(0))?
            .collect::<Result<Vec<i64>, _>>()?;
        Ok(ids)
    }

    // ===== Statistics =====

    fn count_entities(&self, kind: EntityKind) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", entity_table(kind)),
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_keywords(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM keywords", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_items_by_state(&self, table: ItemTable) -> StorageResult<ItemStateCounts> {
        let counts = self.conn.query_row(
            &format!(
                "SELECT
                     COALESCE(SUM(CASE WHEN is_scraped = 0 AND is_active = 1 THEN 1 ELSE 0 END), 0),
                     COALESCE(SUM(CASE WHEN is_scraped = 1 THEN 1 ELSE 0 END), 0),
                     COALESCE(SUM(CASE WHEN is_scraped = 0 AND is_active = 0 THEN 1 ELSE 0 END), 0)
                 FROM {}",
                table.table_name()
            ),
            [],
            |row| {
                Ok(ItemStateCounts {
                    pending: row.get::<_, i64>(0)? as u64,
                    scraped: row.get::<_, i64>(1)? as u64,
                    deactivated: row.get::<_, i64>(2)? as u64,
                })
            },
        )?;
        Ok(counts)
    }
}
