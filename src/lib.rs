//! wp-ingest: a content-platform ingestion engine
//!
//! This crate pulls posts, categories and authors out of a WordPress
//! `wp-json/wp/v2` API and the platform's HTML search pages, normalizes them
//! into a relational entity graph, and keeps that graph consistent across
//! transient network failures.

pub mod config;
pub mod ingest;
pub mod output;
pub mod state;
pub mod storage;
pub mod url;

use std::fmt;
use thiserror::Error;

/// Main error type for ingestion operations
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Single-item lookups accept only an id or slug filter, got {attribute}")]
    InvalidFilter { attribute: String },

    #[error("Failed to resolve {entity}: {source}")]
    PartialResolution {
        entity: String,
        source: Box<IngestError>,
    },

    #[error("No {kind} found for {key}")]
    NotFound {
        kind: state::EntityKind,
        key: String,
    },

    #[error("Unexpected payload from {url}: {message}")]
    UnexpectedPayload { url: String, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Image store error for {key}: {source}")]
    Image {
        key: String,
        source: std::io::Error,
    },

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IngestError {
    /// Wraps a nested lookup failure so the enclosing record is abandoned as a whole
    pub fn partial(entity: impl Into<String>, source: IngestError) -> Self {
        Self::PartialResolution {
            entity: entity.into(),
            source: Box::new(source),
        }
    }

    /// Returns true for errors that are usage mistakes rather than remote failures
    pub fn is_usage_error(&self) -> bool {
        matches!(self, Self::InvalidFilter { .. })
    }

    /// Returns true if local persistence failed, as opposed to the remote side
    ///
    /// A constraint violation is a property of one record, not of the store.
    pub fn is_storage_error(&self) -> bool {
        match self {
            Self::Storage(storage::StorageError::ConstraintViolation(_)) => false,
            Self::Storage(_) | Self::Database(_) => true,
            Self::PartialResolution { source, .. } => source.is_storage_error(),
            _ => false,
        }
    }

    /// Returns true if the underlying cause is a cancelled fetch
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Fetch(e) => e.kind == FetchErrorKind::Cancelled,
            Self::PartialResolution { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }
}

/// Classification of a failed fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    /// The server answered with a non-2xx status
    HttpStatus(u16),
    /// DNS, refused connection, TLS handshake and similar
    Connection,
    /// The request exceeded the client timeout
    Timeout,
    /// Anything else reqwest reports (body decode, builder errors)
    Other,
    /// Every attempt failed or the retry deadline passed
    RetriesExhausted,
    /// The engine's cancellation token fired
    Cancelled,
}

impl FetchErrorKind {
    /// Returns true if waiting and retrying could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::HttpStatus(code) => *code >= 500 || *code == 408 || *code == 429,
            Self::Connection | Self::Timeout | Self::Other => true,
            Self::RetriesExhausted | Self::Cancelled => false,
        }
    }
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HttpStatus(code) => write!(f, "HTTP status {}", code),
            Self::Connection => write!(f, "connection error"),
            Self::Timeout => write!(f, "timeout"),
            Self::Other => write!(f, "request error"),
            Self::RetriesExhausted => write!(f, "retries exhausted"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A classified fetch failure
#[derive(Debug, Clone, Error)]
#[error("{kind} fetching {url} after {attempts} attempt(s): {message}")]
pub struct FetchError {
    pub url: String,
    pub kind: FetchErrorKind,
    pub message: String,
    /// Number of attempts made before giving up
    pub attempts: u32,
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for ingestion operations
pub type Result<T> = std::result::Result<T, IngestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use ingest::{Engine, TaskStatus, TaskSummary};
pub use state::{EntityKind, ItemState};
