//! Ingestion engine
//!
//! This module contains the core ingestion logic, including:
//! - HTTP fetching with bounded retry and cancellation
//! - JSON-to-entity normalization with relationship resolution
//! - Collection and single-item scraping
//! - HTML search-result and latest-post discovery
//! - The auto-scrape page-range scheduler
//! - Task entry points for external schedulers

mod discovery;
mod fetcher;
mod normalizer;
mod parser;
mod scheduler;
mod scraper;
mod tasks;

pub use discovery::SearchOutcome;
pub use fetcher::{build_http_client, FetchMode, Fetcher, RetryPolicy};
pub use normalizer::{
    Entity, Normalized, PostGraph, RemoteAuthor, RemoteCategory, RemotePost, Rendered,
};
pub use parser::{extract_anchor_hrefs, extract_slugs, strip_html};
pub use scheduler::{end_page, page_range};
pub use tasks::{normalize_keyword, TaskStatus, TaskSummary};

use crate::config::Config;
use crate::storage::{open_storage, FsImageStore, ImageStore, SqliteStorage, StorageError};
use crate::url::ApiUrls;
use crate::Result;
use reqwest::Client;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;

/// Handle to the ingestion engine
///
/// Cloning is cheap; clones share the HTTP client, storage, image store and
/// cancellation token, so entry points can run concurrently from separate
/// tasks.
#[derive(Clone)]
pub struct Engine {
    config: Arc<Config>,
    fetcher: Fetcher,
    urls: Arc<ApiUrls>,
    storage: Arc<Mutex<SqliteStorage>>,
    images: Arc<dyn ImageStore>,
}

impl Engine {
    /// Creates an engine from its collaborators
    ///
    /// The engine starts with a fresh cancellation token; see
    /// [`Engine::with_cancel_token`] to share one.
    pub fn new(
        config: Config,
        client: Client,
        storage: SqliteStorage,
        images: Arc<dyn ImageStore>,
    ) -> Self {
        let urls = ApiUrls::new(&config.remote.base_url, &config.remote.search_base_url);
        let fetcher = Fetcher::new(
            client,
            RetryPolicy::from_config(&config.retry),
            CancellationToken::new(),
        );

        Self {
            config: Arc::new(config),
            fetcher,
            urls: Arc::new(urls),
            storage: Arc::new(Mutex::new(storage)),
            images,
        }
    }

    /// Builds the engine the binary uses: SQLite at `storage.database-path`,
    /// images under `storage.media-root`
    pub fn from_config(config: Config) -> Result<Self> {
        let client = build_http_client(&config.remote, &config.user_agent)?;
        let storage = open_storage(Path::new(&config.storage.database_path))?;
        let images = Arc::new(FsImageStore::new(&config.storage.media_root));
        Ok(Self::new(config, client, storage, images))
    }

    /// Replaces the cancellation token threaded through every fetch
    pub fn with_cancel_token(mut self, cancel: CancellationToken) -> Self {
        self.fetcher = Fetcher::new(
            self.fetcher.client().clone(),
            self.fetcher.retry_policy().clone(),
            cancel,
        );
        self
    }

    /// Replaces the retry policy
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.fetcher = Fetcher::new(
            self.fetcher.client().clone(),
            retry,
            self.fetcher.cancel_token().clone(),
        );
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn urls(&self) -> &ApiUrls {
        &self.urls
    }

    pub fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        self.fetcher.cancel_token()
    }

    /// Cancels every in-flight and future fetch of this engine and its clones
    pub fn cancel(&self) {
        self.fetcher.cancel_token().cancel();
    }

    /// Locks the storage
    ///
    /// The guard must be dropped before the next `.await`.
    pub fn storage(&self) -> Result<MutexGuard<'_, SqliteStorage>> {
        self.storage
            .lock()
            .map_err(|_| StorageError::LockPoisoned.into())
    }

    pub(crate) fn images(&self) -> &dyn ImageStore {
        self.images.as_ref()
    }
}
