//! Integration tests for the ingestion engine
//!
//! These tests point an engine at a wiremock server standing in for the
//! WordPress API, the search host and the image CDN, and check the stored
//! graph afterwards.

mod common;
mod discovery_tests;
mod fetch_tests;
mod normalize_tests;
mod schedule_tests;
