//! Database schema definitions
//!
//! Every table carries `is_active`, `created_at` and `updated_at`. Natural
//! keys are enforced with UNIQUE constraints so create-if-absent writes can
//! use `INSERT ... ON CONFLICT DO NOTHING`.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Entities
CREATE TABLE IF NOT EXISTS posts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    remote_id INTEGER NOT NULL UNIQUE,
    slug TEXT NOT NULL UNIQUE,
    title TEXT NOT NULL DEFAULT '',
    content TEXT NOT NULL DEFAULT '',
    link TEXT NOT NULL DEFAULT '',
    image_link TEXT NOT NULL DEFAULT '',
    image TEXT NOT NULL DEFAULT '',
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS categories (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    remote_id INTEGER NOT NULL UNIQUE,
    slug TEXT NOT NULL,
    name TEXT NOT NULL DEFAULT '',
    description TEXT NOT NULL DEFAULT '',
    post_count INTEGER NOT NULL DEFAULT 0,
    link TEXT NOT NULL DEFAULT '',
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS authors (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    remote_id INTEGER NOT NULL UNIQUE,
    slug TEXT NOT NULL,
    name TEXT NOT NULL DEFAULT '',
    description TEXT NOT NULL DEFAULT '',
    position TEXT NOT NULL DEFAULT '',
    link TEXT NOT NULL DEFAULT '',
    avatar_link TEXT NOT NULL DEFAULT '',
    avatar TEXT NOT NULL DEFAULT '',
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_categories_slug ON categories(slug);
CREATE INDEX IF NOT EXISTS idx_authors_slug ON authors(slug);

-- Post relations
CREATE TABLE IF NOT EXISTS post_categories (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    post_id INTEGER NOT NULL REFERENCES posts(id),
    category_id INTEGER NOT NULL REFERENCES categories(id),
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE(post_id, category_id)
);

CREATE TABLE IF NOT EXISTS post_authors (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    post_id INTEGER NOT NULL REFERENCES posts(id),
    author_id INTEGER NOT NULL REFERENCES authors(id),
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE(post_id, author_id)
);

-- Keyword search
CREATE TABLE IF NOT EXISTS keywords (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL UNIQUE,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS searches_by_keyword (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    keyword_id INTEGER NOT NULL REFERENCES keywords(id),
    page_count INTEGER NOT NULL,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE(keyword_id, page_count)
);

-- Search items (no uniqueness on slug: every discovery is kept)
CREATE TABLE IF NOT EXISTS post_search_by_keyword_items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    search_id INTEGER NOT NULL REFERENCES searches_by_keyword(id),
    slug TEXT NOT NULL,
    post_id INTEGER REFERENCES posts(id),
    is_scraped INTEGER NOT NULL DEFAULT 0,
    fail_count INTEGER NOT NULL DEFAULT 0,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_keyword_items_pending
    ON post_search_by_keyword_items(is_scraped, is_active);

CREATE TABLE IF NOT EXISTS post_search_daily_items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    slug TEXT NOT NULL UNIQUE,
    post_id INTEGER REFERENCES posts(id),
    is_scraped INTEGER NOT NULL DEFAULT 0,
    fail_count INTEGER NOT NULL DEFAULT 0,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_daily_items_pending
    ON post_search_daily_items(is_scraped, is_active);

-- Auto-scrape directives
CREATE TABLE IF NOT EXISTS auto_scraps (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    field TEXT NOT NULL,
    page_start INTEGER NOT NULL DEFAULT 1,
    page_count INTEGER NOT NULL DEFAULT 5,
    category_filter INTEGER,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS auto_scrap_post_items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    auto_scrap_id INTEGER NOT NULL UNIQUE REFERENCES auto_scraps(id),
    is_scraped INTEGER NOT NULL DEFAULT 0,
    fail_count INTEGER NOT NULL DEFAULT 0,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS auto_scrap_post_item_entities (
    item_id INTEGER NOT NULL REFERENCES auto_scrap_post_items(id),
    entity_id INTEGER NOT NULL REFERENCES posts(id),
    UNIQUE(item_id, entity_id)
);

CREATE TABLE IF NOT EXISTS auto_scrap_category_items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    auto_scrap_id INTEGER NOT NULL UNIQUE REFERENCES auto_scraps(id),
    is_scraped INTEGER NOT NULL DEFAULT 0,
    fail_count INTEGER NOT NULL DEFAULT 0,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS auto_scrap_category_item_entities (
    item_id INTEGER NOT NULL REFERENCES auto_scrap_category_items(id),
    entity_id INTEGER NOT NULL REFERENCES categories(id),
    UNIQUE(item_id, entity_id)
);

CREATE TABLE IF NOT EXISTS auto_scrap_author_items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    auto_scrap_id INTEGER NOT NULL UNIQUE REFERENCES auto_scraps(id),
    is_scraped INTEGER NOT NULL DEFAULT 0,
    fail_count INTEGER NOT NULL DEFAULT 0,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS auto_scrap_author_item_entities (
    item_id INTEGER NOT NULL REFERENCES auto_scrap_author_items(id),
    entity_id INTEGER NOT NULL REFERENCES authors(id),
    UNIQUE(item_id, entity_id)
);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
