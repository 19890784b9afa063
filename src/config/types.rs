use crate::state::EntityKind;
use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure
///
/// Only `[user-agent]` is required; every other section falls back to the
/// values the remote platform is known to work with.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub scrape: ScrapeConfig,
    #[serde(default, rename = "last-page")]
    pub last_page: LastPageConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

/// Remote platform endpoints
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RemoteConfig {
    /// Site root; the JSON API lives under `wp-json/wp/v2/` and the root page carries the latest-posts feed
    pub base_url: String,

    /// Root of the keyword search host
    pub search_base_url: String,

    /// Per-request timeout (seconds)
    pub timeout_secs: u64,

    /// Connection establishment timeout (seconds)
    pub connect_timeout_secs: u64,

    /// Page size for collection queries
    pub per_page: u32,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.techcrunch.com/".to_string(),
            search_base_url: "https://search.techcrunch.com/".to_string(),
            timeout_secs: 30,
            connect_timeout_secs: 10,
            per_page: 100,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Format: CrawlerName/Version (+ContactURL; ContactEmail)
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Bounded exponential backoff for fetches
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RetryConfig {
    /// Total attempts per URL, including the first
    pub max_attempts: u32,

    /// Delay before the first retry (milliseconds); doubles on every retry
    pub initial_backoff_ms: u64,

    /// Upper bound for a single backoff delay (milliseconds)
    pub max_backoff_ms: u64,

    /// Deadline for one URL across all attempts (seconds); 0 disables it
    pub max_elapsed_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff_ms: 500,
            max_backoff_ms: 30_000,
            max_elapsed_secs: 600,
        }
    }
}

/// Scrape item bookkeeping and HTML markers
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ScrapeConfig {
    /// Items are deactivated once their fail count exceeds this value
    pub max_fail_count: u32,

    /// Page count used when a keyword search does not name one
    pub default_search_page_count: u32,

    /// Largest page count a keyword search may request
    pub max_search_page_count: u32,

    /// File extension appended to cached images
    pub image_extension: String,

    /// CSS class of result anchors on keyword search pages
    pub search_result_class: String,

    /// CSS class of anchors in the landing page's latest-posts feed
    pub latest_post_class: String,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            max_fail_count: 2,
            default_search_page_count: 5,
            max_search_page_count: 100,
            image_extension: ".png".to_string(),
            search_result_class: "thmb".to_string(),
            latest_post_class: "post-block__title__link".to_string(),
        }
    }
}

/// Last known valid page of each remote collection
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct LastPageConfig {
    pub posts: u32,
    pub categories: u32,
    pub authors: u32,
}

impl LastPageConfig {
    pub fn for_kind(&self, kind: EntityKind) -> u32 {
        match kind {
            EntityKind::Post => self.posts,
            EntityKind::Category => self.categories,
            EntityKind::Author => self.authors,
        }
    }
}

impl Default for LastPageConfig {
    fn default() -> Self {
        Self {
            posts: EntityKind::Post.default_last_page(),
            categories: EntityKind::Category.default_last_page(),
            authors: EntityKind::Author.default_last_page(),
        }
    }
}

/// Output locations
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct StorageConfig {
    /// Path to the SQLite database file
    pub database_path: String,

    /// Directory under which cached images are written
    pub media_root: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: "./wp-ingest.db".to_string(),
            media_root: "./media".to_string(),
        }
    }
}

/// Intervals for the periodic `run` mode
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ScheduleConfig {
    pub keyword_items_interval_secs: u64,
    pub daily_items_interval_secs: u64,
    pub auto_scrap_interval_secs: u64,
}

impl ScheduleConfig {
    pub fn keyword_items_interval(&self) -> Duration {
        Duration::from_secs(self.keyword_items_interval_secs)
    }

    pub fn daily_items_interval(&self) -> Duration {
        Duration::from_secs(self.daily_items_interval_secs)
    }

    pub fn auto_scrap_interval(&self) -> Duration {
        Duration::from_secs(self.auto_scrap_interval_secs)
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            keyword_items_interval_secs: 60,
            daily_items_interval_secs: 86_400,
            auto_scrap_interval_secs: 60,
        }
    }
}
