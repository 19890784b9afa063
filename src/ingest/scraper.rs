//! Collection and single-item scraping
//!
//! Drives URL construction, fetching and normalization across one page of a
//! collection, or a single lookup by id or slug.

use crate::ingest::normalizer::Normalized;
use crate::ingest::Engine;
use crate::state::EntityKind;
use crate::url::{ApiQuery, Filter, FilterAttribute};
use crate::{IngestError, Result};
use serde::Deserialize;
use serde_json::Value;

/// Response wrapper produced by `_envelope=true`
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    status: Option<u16>,
    #[serde(default)]
    body: Value,
}

impl Engine {
    /// Scrapes one page of a collection
    ///
    /// Records are normalized in delivery order; the first failure aborts the
    /// page.
    pub async fn scrape_collection(
        &self,
        kind: EntityKind,
        filter: Filter,
        page: u32,
    ) -> Result<Vec<Normalized>> {
        if filter.attribute() == FilterAttribute::Id {
            return Err(IngestError::InvalidFilter {
                attribute: FilterAttribute::Id.to_string(),
            });
        }

        let query = ApiQuery::collection(kind, filter, page, self.config().remote.per_page);
        let url = self.urls().query_url(&query);
        let envelope: Envelope = self.fetcher().fetch_json(&url).await?;

        if let Some(status) = envelope.status.filter(|status| *status >= 400) {
            return Err(IngestError::UnexpectedPayload {
                url,
                message: format!("envelope status {}: {}", status, envelope.body),
            });
        }

        let records = match envelope.body {
            Value::Array(records) => records,
            other => {
                return Err(IngestError::UnexpectedPayload {
                    url,
                    message: format!("expected an array body, got {}", json_type(&other)),
                })
            }
        };

        tracing::debug!(kind = %kind, page, records = records.len(), "Normalizing page");

        let mut normalized = Vec::with_capacity(records.len());
        for record in records {
            normalized.push(self.normalize(kind, record).await?);
        }
        Ok(normalized)
    }

    /// Looks up a single entity by id or slug
    ///
    /// Any other filter fails with `InvalidFilter` before a request is made.
    /// Post lookups embed their authors.
    pub async fn scrape_single(&self, kind: EntityKind, filter: Filter) -> Result<Normalized> {
        let query = ApiQuery::single(kind, filter)?;
        let url = self.urls().query_url(&query);
        let json: Value = self.fetcher().fetch_json(&url).await?;

        let record = match (&query.filter, json) {
            (Filter::Slug(_), Value::Array(records)) => {
                records
                    .into_iter()
                    .next()
                    .ok_or_else(|| IngestError::NotFound {
                        kind,
                        key: query.filter.describe(),
                    })?
            }
            (_, Value::Object(record)) => Value::Object(record),
            (_, other) => {
                return Err(IngestError::UnexpectedPayload {
                    url,
                    message: format!("expected an object, got {}", json_type(&other)),
                })
            }
        };

        self.normalize(kind, record).await
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
