//! Shared fixtures for the integration tests

use serde_json::{json, Value};
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::MockServer;
use wp_ingest::config::parse_config;
use wp_ingest::ingest::RetryPolicy;
use wp_ingest::Engine;

pub struct TestEnv {
    pub server: MockServer,
    pub engine: Engine,
    pub media_root: PathBuf,
    // Keeps the database and media directory alive for the test
    _dir: TempDir,
}

/// Starts a mock server and an engine wired to it
///
/// The engine retries at most three times with millisecond backoff so
/// failure paths stay fast.
pub async fn setup() -> TestEnv {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let media_root = dir.path().join("media");
    let database_path = dir.path().join("ingest.db");

    let config = parse_config(&format!(
        r#"
[remote]
base-url = "{uri}"
search-base-url = "{uri}"
timeout-secs = 10

[user-agent]
crawler-name = "TestIngest"
crawler-version = "1.0.0"
contact-url = "https://example.com/contact"
contact-email = "test@example.com"

[storage]
database-path = '{db}'
media-root = '{media}'
"#,
        uri = server.uri(),
        db = database_path.display(),
        media = media_root.display(),
    ))
    .unwrap();

    let engine = Engine::from_config(config)
        .unwrap()
        .with_retry_policy(fast_retry());

    TestEnv {
        server,
        engine,
        media_root,
        _dir: dir,
    }
}

pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        initial_backoff: Duration::from_millis(5),
        max_backoff: Duration::from_millis(20),
        max_elapsed: None,
    }
}

/// A post record as returned by `posts?slug=...&_embed=true`
pub fn post_json(id: i64, slug: &str, categories: &[i64], image: &str) -> Value {
    json!({
        "id": id,
        "slug": slug,
        "title": { "rendered": format!("<h1>Title of {}</h1>", slug) },
        "content": { "rendered": "<p>Body <em>text</em></p>" },
        "link": format!("https://example.com/2024/01/01/{}/", slug),
        "jetpack_featured_media_url": image,
        "categories": categories,
        "_embedded": {
            "author": [{
                "id": 9,
                "slug": "jane-doe",
                "name": "Jane Doe",
                "description": "<p>Reporter</p>",
                "position": "Senior Writer",
                "link": "https://example.com/author/jane-doe/",
                "cbAvatar": false
            }]
        }
    })
}

/// A post record with no relations and no image
pub fn bare_post_json(id: i64, slug: &str) -> Value {
    json!({
        "id": id,
        "slug": slug,
        "title": { "rendered": slug },
        "content": { "rendered": "" },
        "link": format!("https://example.com/2024/01/01/{}/", slug),
        "jetpack_featured_media_url": "",
        "categories": []
    })
}

pub fn category_json(id: i64, slug: &str) -> Value {
    json!({
        "id": id,
        "slug": slug,
        "name": slug.to_uppercase(),
        "description": "<p>About it</p>",
        "count": 12,
        "link": format!("https://example.com/category/{}/", slug)
    })
}

/// Wraps records the way `_envelope=true` does
pub fn envelope(body: Value) -> Value {
    json!({ "status": 200, "headers": {}, "body": body })
}

/// An HTML page whose anchors carry `class` and link to dated permalinks
pub fn listing_html(class: &str, slugs: &[&str]) -> String {
    let anchors: String = slugs
        .iter()
        .map(|slug| {
            format!(
                r#"<li><a class="{} other" href="https://example.com/2024/05/02/{}/">{}</a></li>"#,
                class, slug, slug
            )
        })
        .collect();
    format!(
        "<html><body><a href=\"/about/\">About</a><ul>{}</ul></body></html>",
        anchors
    )
}
