/// Entity kinds served by the remote API
///
/// Each kind owns its collection path segment, its default last known page,
/// and whether single-item lookups must embed sub-records.
use std::fmt;
use std::str::FromStr;

/// One of the three remote entity collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Post,
    Category,
    Author,
}

impl EntityKind {
    /// The collection segment used in `wp-json/wp/v2/{field}`
    pub fn api_field(&self) -> &'static str {
        match self {
            Self::Post => "posts",
            Self::Category => "categories",
            Self::Author => "users",
        }
    }

    /// The last page of the remote collection known to hold data
    pub fn default_last_page(&self) -> u32 {
        match self {
            Self::Post => 499,
            Self::Category => 3,
            Self::Author => 7,
        }
    }

    /// Single post lookups need `_embed=true` so author sub-records come back inline
    pub fn embeds_on_single_lookup(&self) -> bool {
        matches!(self, Self::Post)
    }

    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Category => "category",
            Self::Author => "author",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "post" => Some(Self::Post),
            "category" => Some(Self::Category),
            "author" => Some(Self::Author),
            _ => None,
        }
    }

    pub fn all() -> [Self; 3] {
        [Self::Post, Self::Category, Self::Author]
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    /// Accepts both the singular db form and the API collection name
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        Self::from_db_string(&lowered)
            .or_else(|| Self::all().into_iter().find(|k| k.api_field() == lowered))
            .ok_or_else(|| format!("unknown entity kind '{}' (expected post, category or author)", s))
    }
}
