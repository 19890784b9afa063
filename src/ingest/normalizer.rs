//! JSON-to-entity normalization
//!
//! Converts one remote record into a stored Post, Category or Author and
//! resolves a post's categories and authors. Every operation is idempotent
//! on the remote id.

use crate::ingest::parser::strip_html;
use crate::ingest::Engine;
use crate::state::EntityKind;
use crate::storage::{AuthorRecord, CategoryRecord, NewAuthor, NewCategory, NewPost, PostRecord, Storage};
use crate::url::{ApiQuery, Filter};
use crate::{IngestError, Result};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// A `{ "rendered": "..." }` field
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Rendered {
    #[serde(default)]
    pub rendered: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemotePost {
    pub id: i64,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub title: Rendered,
    #[serde(default)]
    pub content: Rendered,
    #[serde(default)]
    pub link: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub jetpack_featured_media_url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub categories: Vec<i64>,
    #[serde(default, rename = "_embedded")]
    pub embedded: Option<Embedded>,
}

/// The `_embedded` block of a post fetched with `_embed=true`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Embedded {
    #[serde(default, alias = "author", deserialize_with = "null_as_default")]
    pub authors: Vec<RemoteAuthor>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteCategory {
    pub id: i64,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub count: i64,
    #[serde(default)]
    pub link: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteAuthor {
    pub id: i64,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub position: String,
    #[serde(default)]
    pub link: String,
    #[serde(default, rename = "cbAvatar", deserialize_with = "lenient_string")]
    pub cb_avatar: String,
}

/// Strings that the platform sometimes sends as `false` or `null`
fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        _ => String::new(),
    })
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A post with its resolved relations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostGraph {
    pub post: PostRecord,
    pub categories: Vec<CategoryRecord>,
    pub authors: Vec<AuthorRecord>,
}

/// A stored entity of any kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entity {
    Post(PostGraph),
    Category(CategoryRecord),
    Author(AuthorRecord),
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Post(_) => EntityKind::Post,
            Self::Category(_) => EntityKind::Category,
            Self::Author(_) => EntityKind::Author,
        }
    }

    /// Local row id
    pub fn id(&self) -> i64 {
        match self {
            Self::Post(graph) => graph.post.id,
            Self::Category(category) => category.id,
            Self::Author(author) => author.id,
        }
    }

    pub fn slug(&self) -> &str {
        match self {
            Self::Post(graph) => &graph.post.slug,
            Self::Category(category) => &category.slug,
            Self::Author(author) => &author.slug,
        }
    }
}

/// Outcome of normalizing one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub entity: Entity,
    /// False when the natural key was already stored
    pub created: bool,
}

impl Engine {
    /// Normalizes one JSON record of the given kind
    pub async fn normalize(&self, kind: EntityKind, json: Value) -> Result<Normalized> {
        match kind {
            EntityKind::Post => {
                let remote: RemotePost = serde_json::from_value(json)?;
                let (graph, created) = self.normalize_post(remote).await?;
                Ok(Normalized {
                    entity: Entity::Post(graph),
                    created,
                })
            }
            EntityKind::Category => {
                let remote: RemoteCategory = serde_json::from_value(json)?;
                let (category, created) = self.normalize_category(&remote)?;
                Ok(Normalized {
                    entity: Entity::Category(category),
                    created,
                })
            }
            EntityKind::Author => {
                let remote: RemoteAuthor = serde_json::from_value(json)?;
                let (author, created) = self.normalize_author(&remote).await?;
                Ok(Normalized {
                    entity: Entity::Author(author),
                    created,
                })
            }
        }
    }

    pub fn normalize_category(&self, remote: &RemoteCategory) -> Result<(CategoryRecord, bool)> {
        let category = NewCategory {
            remote_id: remote.id,
            slug: remote.slug.clone(),
            name: remote.name.clone(),
            description: strip_html(&remote.description),
            post_count: remote.count,
            link: remote.link.clone(),
        };

        let (record, created) = self.storage()?.get_or_insert_category(&category)?;
        if created {
            tracing::debug!(remote_id = remote.id, slug = %record.slug, "Stored category");
        }
        Ok((record, created))
    }

    /// Normalizes an author; the avatar is only downloaded for new authors
    pub async fn normalize_author(&self, remote: &RemoteAuthor) -> Result<(AuthorRecord, bool)> {
        let existing = self.storage()?.find_author_by_remote_id(remote.id)?;
        if let Some(author) = existing {
            return Ok((author, false));
        }

        let avatar = self
            .store_image("avatars", &remote.slug, &remote.cb_avatar)
            .await?;

        let author = NewAuthor {
            remote_id: remote.id,
            slug: remote.slug.clone(),
            name: remote.name.clone(),
            description: strip_html(&remote.description),
            position: remote.position.clone(),
            link: remote.link.clone(),
            avatar_link: remote.cb_avatar.clone(),
            avatar,
        };

        let (record, created) = self.storage()?.get_or_insert_author(&author)?;
        if created {
            tracing::debug!(remote_id = remote.id, slug = %record.slug, "Stored author");
        }
        Ok((record, created))
    }

    /// Normalizes a post and its relations
    ///
    /// Categories, authors and the featured image are resolved first; the
    /// post and its join rows are then committed in one transaction. Any
    /// nested failure abandons the whole post.
    ///
    /// A post stored earlier keeps its row and image, but relations carried
    /// by this record are still linked. Collection pages carry no embedded
    /// authors, so a later embedded lookup is what attaches them.
    pub async fn normalize_post(&self, remote: RemotePost) -> Result<(PostGraph, bool)> {
        let existing = self.storage()?.find_post_by_remote_id(remote.id)?;

        let mut categories = Vec::with_capacity(remote.categories.len());
        for category_id in &remote.categories {
            let category = self
                .resolve_category(*category_id)
                .await
                .map_err(|e| IngestError::partial(format!("category {}", category_id), e))?;
            categories.push(category);
        }

        let remote_authors = remote
            .embedded
            .as_ref()
            .map(|embedded| embedded.authors.as_slice())
            .unwrap_or_default();
        let mut authors = Vec::with_capacity(remote_authors.len());
        for remote_author in remote_authors {
            let (author, _) = self
                .normalize_author(remote_author)
                .await
                .map_err(|e| IngestError::partial(format!("author {}", remote_author.id), e))?;
            authors.push(author);
        }

        let image = match &existing {
            Some(post) => post.image.clone(),
            None => self
                .store_image("images", &remote.slug, &remote.jetpack_featured_media_url)
                .await
                .map_err(|e| IngestError::partial(format!("image of post {}", remote.slug), e))?,
        };

        let post = NewPost {
            remote_id: remote.id,
            slug: remote.slug.clone(),
            title: strip_html(&remote.title.rendered),
            content: strip_html(&remote.content.rendered),
            link: remote.link.clone(),
            image_link: remote.jetpack_featured_media_url.clone(),
            image,
        };

        let category_ids: Vec<i64> = categories.iter().map(|c| c.id).collect();
        let author_ids: Vec<i64> = authors.iter().map(|a| a.id).collect();
        let (record, created) = self
            .storage()?
            .commit_post(&post, &category_ids, &author_ids)?;

        if created {
            tracing::info!(
                remote_id = remote.id,
                slug = %record.slug,
                categories = categories.len(),
                authors = authors.len(),
                "Stored post"
            );
            Ok((
                PostGraph {
                    post: record,
                    categories,
                    authors,
                },
                true,
            ))
        } else {
            // Stored by an earlier pass or a concurrent one; joins were added if missing
            tracing::debug!(remote_id = remote.id, slug = %record.slug, "Post already stored");
            Ok((self.load_post_graph(record)?, false))
        }
    }

    fn load_post_graph(&self, post: PostRecord) -> Result<PostGraph> {
        let storage = self.storage()?;
        let categories = storage.post_categories(post.id)?;
        let authors = storage.post_authors(post.id)?;
        Ok(PostGraph {
            post,
            categories,
            authors,
        })
    }

    /// Finds a category locally, falling back to one single-item lookup
    async fn resolve_category(&self, remote_id: i64) -> Result<CategoryRecord> {
        let local = self.storage()?.find_category_by_remote_id(remote_id)?;
        if let Some(category) = local {
            return Ok(category);
        }

        let id = u64::try_from(remote_id).map_err(|_| IngestError::NotFound {
            kind: EntityKind::Category,
            key: format!("id={}", remote_id),
        })?;
        let query = ApiQuery::single(EntityKind::Category, Filter::Id(id))?;
        let url = self.urls().query_url(&query);
        let remote: RemoteCategory = self.fetcher().fetch_json(&url).await?;
        let (category, _) = self.normalize_category(&remote)?;
        Ok(category)
    }

    /// Downloads an image unless it is already stored; returns its reference
    ///
    /// An empty `url` or `slug` stores nothing and yields an empty reference.
    async fn store_image(&self, folder: &str, slug: &str, url: &str) -> Result<String> {
        if url.is_empty() || slug.is_empty() {
            return Ok(String::new());
        }

        let key = format!("{}/{}{}", folder, slug, self.config().scrape.image_extension);
        if self.images().exists(&key) {
            tracing::debug!(key = %key, "Image already stored");
            return Ok(key);
        }

        let bytes = self.fetcher().fetch_bytes(url).await?;
        self.images()
            .store(&key, &bytes)
            .map_err(|source| IngestError::Image { key, source })
    }
}
