//! Output module for reporting on the ingested graph
//!
//! This module handles:
//! - Collecting entity and item-lifecycle counts from storage
//! - Printing them for the `stats` command

pub mod stats;

pub use stats::{load_statistics, print_statistics, IngestStatistics};
