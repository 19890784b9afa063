//! Statistics generation from the ingestion database
//!
//! This module provides functionality for extracting and displaying
//! ingestion statistics from the storage layer.

use crate::state::EntityKind;
use crate::storage::{ItemStateCounts, ItemTable, Storage};
use crate::IngestError;

/// Ingestion statistics summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestStatistics {
    /// Stored entities per kind
    pub entities: Vec<(EntityKind, u64)>,

    /// Number of distinct search terms
    pub keywords: u64,

    /// Lifecycle counts per item table
    pub items: Vec<(ItemTable, ItemStateCounts)>,
}

impl IngestStatistics {
    pub fn entity_count(&self, kind: EntityKind) -> u64 {
        self.entities
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, count)| *count)
            .unwrap_or(0)
    }

    pub fn item_counts(&self, table: ItemTable) -> ItemStateCounts {
        self.items
            .iter()
            .find(|(t, _)| *t == table)
            .map(|(_, counts)| *counts)
            .unwrap_or_default()
    }
}

/// Loads statistics from storage
pub fn load_statistics(storage: &dyn Storage) -> Result<IngestStatistics, IngestError> {
    let mut entities = Vec::new();
    for kind in EntityKind::all() {
        entities.push((kind, storage.count_entities(kind)?));
    }

    let keywords = storage.count_keywords()?;

    let mut items = Vec::new();
    for table in ItemTable::all() {
        items.push((table, storage.count_items_by_state(table)?));
    }

    Ok(IngestStatistics {
        entities,
        keywords,
        items,
    })
}

fn item_label(table: ItemTable) -> String {
    match table {
        ItemTable::KeywordSearch => "Keyword search items".to_string(),
        ItemTable::Daily => "Daily items".to_string(),
        ItemTable::AutoScrap(kind) => format!("Auto-scrape {} items", kind),
    }
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &IngestStatistics) {
    println!("=== Ingestion Statistics ===\n");

    println!("Entities:");
    for (kind, count) in &stats.entities {
        println!("  {}: {}", kind, count);
    }
    println!("  keywords: {}", stats.keywords);
    println!();

    println!("Items:");
    for (table, counts) in &stats.items {
        if counts.total() == 0 {
            continue;
        }
        let done = if counts.total() > 0 {
            (counts.scraped as f64 / counts.total() as f64) * 100.0
        } else {
            0.0
        };
        println!(
            "  {}: {} pending, {} scraped, {} deactivated ({:.1}% done)",
            item_label(*table),
            counts.pending,
            counts.scraped,
            counts.deactivated,
            done
        );
    }
}
