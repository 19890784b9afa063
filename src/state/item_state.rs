/// Lifecycle of scrape items
///
/// Keyword-search items, daily items and auto-scrape items all share the same
/// `(is_scraped, is_active, fail_count)` triple. This module gives that triple
/// a name and pins the deactivation boundary.
use std::fmt;

/// Derived lifecycle state of a scrape item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemState {
    /// Discovered or scheduled, still eligible for resolution
    Pending,

    /// Resolved into entities
    Scraped,

    /// Failed too often; never retried again
    Deactivated,
}

impl ItemState {
    pub fn from_flags(is_scraped: bool, is_active: bool) -> Self {
        if is_scraped {
            Self::Scraped
        } else if is_active {
            Self::Pending
        } else {
            Self::Deactivated
        }
    }

    /// Returns true if no further resolution pass will touch the item
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Scraped => "scraped",
            Self::Deactivated => "deactivated",
        }
    }

    /// Whether an item with `fail_count` recorded failures must be deactivated.
    ///
    /// Deactivation happens strictly above the threshold: with a threshold of 2
    /// the item survives its second failure and is deactivated on the third.
    pub fn exceeds_threshold(fail_count: u32, max_fail_count: u32) -> bool {
        fail_count > max_fail_count
    }
}

impl fmt::Display for ItemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

/// Result of recording one failure against an item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureOutcome {
    pub fail_count: u32,
    pub is_active: bool,
}

impl FailureOutcome {
    pub fn deactivated(&self) -> bool {
        !self.is_active
    }
}
