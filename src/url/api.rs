//! Remote API and search URL construction
//!
//! The API template has seven placeholders:
//! `{field}{filter_field}{filter_value}{data_per_page}{page}{envelope}{embed}`.
//! `ApiQuery` turns a typed request into those seven strings and `ApiUrls`
//! renders them.

use crate::state::EntityKind;
use crate::url::template::render_template;
use crate::IngestError;
use std::fmt;

const API_PATH: &str = "wp-json/wp/v2/";

/// The attribute a query filters on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterAttribute {
    None,
    Id,
    Slug,
    Category,
    Author,
}

impl FilterAttribute {
    /// The token placed in `{filter_field}`
    ///
    /// An unfiltered collection query still opens the query string with `?`
    /// because every following token starts with `&`.
    pub fn token(&self) -> &'static str {
        match self {
            Self::None => "?",
            Self::Id => "/",
            Self::Slug => "?slug=",
            Self::Category => "?categories=",
            Self::Author => "?author=",
        }
    }

    /// Whether single-item lookups accept this attribute
    pub fn allowed_for_single(&self) -> bool {
        matches!(self, Self::Id | Self::Slug)
    }
}

impl fmt::Display for FilterAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::Id => "id",
            Self::Slug => "slug",
            Self::Category => "category",
            Self::Author => "author",
        };
        write!(f, "{}", name)
    }
}

/// A filter with its value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    None,
    Id(u64),
    Slug(String),
    Category(u64),
    Author(u64),
}

impl Filter {
    pub fn attribute(&self) -> FilterAttribute {
        match self {
            Self::None => FilterAttribute::None,
            Self::Id(_) => FilterAttribute::Id,
            Self::Slug(_) => FilterAttribute::Slug,
            Self::Category(_) => FilterAttribute::Category,
            Self::Author(_) => FilterAttribute::Author,
        }
    }

    /// The string placed in `{filter_value}`
    ///
    /// Id lookups end the path with `?` so any trailing `&` tokens form a
    /// valid query string. Slugs are form-urlencoded.
    fn value(&self) -> String {
        match self {
            Self::None => String::new(),
            Self::Id(id) => format!("{}?", id),
            Self::Slug(slug) => form_encode(slug),
            Self::Category(id) | Self::Author(id) => id.to_string(),
        }
    }

    /// Human-readable key for logs and not-found errors
    pub fn describe(&self) -> String {
        match self {
            Self::None => "all".to_string(),
            Self::Id(id) => format!("id={}", id),
            Self::Slug(slug) => format!("slug={}", slug),
            Self::Category(id) => format!("category={}", id),
            Self::Author(id) => format!("author={}", id),
        }
    }
}

/// The seven placeholder values of the API template
///
/// Any field left at its default renders as the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrapeUrlParams {
    pub field: String,
    pub filter_field: String,
    pub filter_value: String,
    pub data_per_page: String,
    pub page: String,
    pub envelope: String,
    pub embed: String,
}

impl ScrapeUrlParams {
    fn as_pairs(&self) -> [(&str, &str); 7] {
        [
            ("field", self.field.as_str()),
            ("filter_field", self.filter_field.as_str()),
            ("filter_value", self.filter_value.as_str()),
            ("data_per_page", self.data_per_page.as_str()),
            ("page", self.page.as_str()),
            ("envelope", self.envelope.as_str()),
            ("embed", self.embed.as_str()),
        ]
    }
}

/// A typed API request, either a paginated collection page or a single lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiQuery {
    pub kind: EntityKind,
    pub filter: Filter,
    pub page: u32,
    pub per_page: u32,
    pub single: bool,
}

impl ApiQuery {
    /// A collection page query, wrapped in an envelope
    pub fn collection(kind: EntityKind, filter: Filter, page: u32, per_page: u32) -> Self {
        Self {
            kind,
            filter,
            page,
            per_page,
            single: false,
        }
    }

    /// A single-item lookup
    ///
    /// # Returns
    ///
    /// * `Ok(ApiQuery)` - The filter is an id or slug
    /// * `Err(IngestError::InvalidFilter)` - Any other filter attribute
    pub fn single(kind: EntityKind, filter: Filter) -> Result<Self, IngestError> {
        let attribute = filter.attribute();
        if !attribute.allowed_for_single() {
            return Err(IngestError::InvalidFilter {
                attribute: attribute.to_string(),
            });
        }

        Ok(Self {
            kind,
            filter,
            page: 0,
            per_page: 0,
            single: true,
        })
    }

    /// Expands the query into placeholder values
    pub fn to_params(&self) -> ScrapeUrlParams {
        let data_per_page = if self.single {
            String::new()
        } else {
            format!("&per_page={}", self.per_page)
        };

        let page = if self.single || self.page == 0 {
            String::new()
        } else {
            format!("&page={}", self.page)
        };

        let envelope = if self.single { "" } else { "&_envelope=true" };

        let embed = if self.single && self.kind.embeds_on_single_lookup() {
            "&_embed=true"
        } else {
            ""
        };

        ScrapeUrlParams {
            field: self.kind.api_field().to_string(),
            filter_field: self.filter.attribute().token().to_string(),
            filter_value: self.filter.value(),
            data_per_page,
            page,
            envelope: envelope.to_string(),
            embed: embed.to_string(),
        }
    }
}

/// URL templates bound to a concrete remote host
#[derive(Debug, Clone)]
pub struct ApiUrls {
    root_url: String,
    scrape_template: String,
    search_template: String,
}

impl ApiUrls {
    /// Builds the templates from the site base URL and the search host base URL
    ///
    /// Both bases are normalized to end with `/`.
    pub fn new(base_url: &str, search_base_url: &str) -> Self {
        let root_url = with_trailing_slash(base_url);
        let search_base = with_trailing_slash(search_base_url);

        let scrape_template = format!(
            "{}{}{{field}}{{filter_field}}{{filter_value}}{{data_per_page}}{{page}}{{envelope}}{{embed}}",
            root_url, API_PATH
        );
        let search_template = format!("{}search?p={{keyword}}&b={{page}}1", search_base);

        Self {
            root_url,
            scrape_template,
            search_template,
        }
    }

    /// The site landing page, which carries the latest-posts feed
    pub fn root_url(&self) -> &str {
        &self.root_url
    }

    /// Renders the API template from raw placeholder values
    pub fn scrape_url(&self, params: &ScrapeUrlParams) -> String {
        render_template(&self.scrape_template, &params.as_pairs())
    }

    /// Renders the API template for a typed query
    pub fn query_url(&self, query: &ApiQuery) -> String {
        self.scrape_url(&query.to_params())
    }

    /// Renders the keyword-search results URL for one page
    ///
    /// The keyword is form-urlencoded. The page number is followed by a
    /// literal `1`, so page 2 renders as `b=21`.
    pub fn search_url(&self, keyword: &str, page: u32) -> String {
        let encoded = form_encode(keyword);
        let page = page.to_string();
        render_template(
            &self.search_template,
            &[("keyword", encoded.as_str()), ("page", page.as_str())],
        )
    }
}

fn form_encode(value: &str) -> String {
    ::url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

fn with_trailing_slash(base: &str) -> String {
    let trimmed = base.trim();
    if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{}/", trimmed)
    }
}
