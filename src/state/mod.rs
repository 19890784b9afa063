//! State module for entity kinds and scrape-item lifecycles
//!
//! # Components
//!
//! - `EntityKind`: the three remote collections (posts, categories, authors)
//! - `ItemState`: lifecycle of a discovery or auto-scrape item (pending, scraped, deactivated)

mod entity_kind;
mod item_state;

// Re-export main types
pub use entity_kind::EntityKind;
pub use item_state::{FailureOutcome, ItemState};
