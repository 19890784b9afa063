//! Single-item lookups and post-graph normalization

use crate::common::{bare_post_json, category_json, post_json, setup};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};
use wp_ingest::ingest::Entity;
use wp_ingest::storage::Storage;
use wp_ingest::url::Filter;
use wp_ingest::{EntityKind, IngestError};

#[tokio::test]
async fn test_post_lookup_builds_graph_once() {
    let env = setup().await;
    let image_url = format!("{}/img/hello.jpg", env.server.uri());

    Mock::given(method("GET"))
        .and(path("/wp-json/wp/v2/posts"))
        .and(query_param("slug", "hello-world"))
        .and(query_param("_embed", "true"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([post_json(
                101,
                "hello-world",
                &[5],
                &image_url
            )])),
        )
        .expect(2)
        .mount(&env.server)
        .await;

    Mock::given(method("GET"))
        .and(path("/wp-json/wp/v2/categories/5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(category_json(5, "ai")))
        .expect(1)
        .mount(&env.server)
        .await;

    Mock::given(method("GET"))
        .and(path("/img/hello.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0x89, 0x50, 0x4e, 0x47]))
        .expect(1)
        .mount(&env.server)
        .await;

    let first = env
        .engine
        .scrape_single(EntityKind::Post, Filter::Slug("hello-world".to_string()))
        .await
        .unwrap();
    assert!(first.created);

    let graph = match &first.entity {
        Entity::Post(graph) => graph.clone(),
        other => panic!("expected a post, got {:?}", other),
    };
    assert_eq!(graph.post.remote_id, 101);
    assert_eq!(graph.post.title, "Title of hello-world");
    assert_eq!(graph.post.content, "Body text");
    assert_eq!(graph.post.image, "images/hello-world.png");
    assert_eq!(graph.categories.len(), 1);
    assert_eq!(graph.categories[0].slug, "ai");
    assert_eq!(graph.categories[0].description, "About it");
    assert_eq!(graph.authors.len(), 1);
    assert_eq!(graph.authors[0].position, "Senior Writer");
    assert_eq!(graph.authors[0].avatar, "");

    let stored = std::fs::read(env.media_root.join("images/hello-world.png")).unwrap();
    assert_eq!(stored, vec![0x89, 0x50, 0x4e, 0x47]);

    // The second lookup fetches the record again but resolves nothing new
    let second = env
        .engine
        .scrape_single(EntityKind::Post, Filter::Slug("hello-world".to_string()))
        .await
        .unwrap();
    assert!(!second.created);
    assert_eq!(second.entity, first.entity);

    let storage = env.engine.storage().unwrap();
    assert_eq!(storage.count_entities(EntityKind::Post).unwrap(), 1);
    assert_eq!(storage.count_entities(EntityKind::Category).unwrap(), 1);
    assert_eq!(storage.count_entities(EntityKind::Author).unwrap(), 1);
}

#[tokio::test]
async fn test_existing_image_is_not_downloaded() {
    let env = setup().await;
    let image_url = format!("{}/img/cached.jpg", env.server.uri());

    std::fs::create_dir_all(env.media_root.join("images")).unwrap();
    std::fs::write(env.media_root.join("images/cached.png"), b"old").unwrap();

    Mock::given(method("GET"))
        .and(path("/wp-json/wp/v2/posts"))
        .and(query_param("slug", "cached"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([post_json(
                7, "cached", &[], &image_url
            )])),
        )
        .mount(&env.server)
        .await;

    Mock::given(method("GET"))
        .and(path("/img/cached.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"new".to_vec()))
        .expect(0)
        .mount(&env.server)
        .await;

    let normalized = env
        .engine
        .scrape_single(EntityKind::Post, Filter::Slug("cached".to_string()))
        .await
        .unwrap();

    match normalized.entity {
        Entity::Post(graph) => assert_eq!(graph.post.image, "images/cached.png"),
        other => panic!("expected a post, got {:?}", other),
    }
    let stored = std::fs::read(env.media_root.join("images/cached.png")).unwrap();
    assert_eq!(stored, b"old");
}

#[tokio::test]
async fn test_failed_category_abandons_post() {
    let env = setup().await;

    Mock::given(method("GET"))
        .and(path("/wp-json/wp/v2/posts"))
        .and(query_param("slug", "orphan"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([post_json(3, "orphan", &[44], "")])),
        )
        .mount(&env.server)
        .await;

    Mock::given(method("GET"))
        .and(path("/wp-json/wp/v2/categories/44"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&env.server)
        .await;

    let err = env
        .engine
        .scrape_single(EntityKind::Post, Filter::Slug("orphan".to_string()))
        .await
        .unwrap_err();

    assert!(matches!(err, IngestError::PartialResolution { .. }));
    assert!(!err.is_storage_error());

    let storage = env.engine.storage().unwrap();
    assert_eq!(storage.count_entities(EntityKind::Post).unwrap(), 0);
    assert!(storage.find_post_by_slug("orphan").unwrap().is_none());
}

#[tokio::test]
async fn test_slug_lookup_with_no_match_is_not_found() {
    let env = setup().await;

    Mock::given(method("GET"))
        .and(path("/wp-json/wp/v2/posts"))
        .and(query_param("slug", "missing"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&env.server)
        .await;

    let err = env
        .engine
        .scrape_single(EntityKind::Post, Filter::Slug("missing".to_string()))
        .await
        .unwrap_err();

    match err {
        IngestError::NotFound { kind, key } => {
            assert_eq!(kind, EntityKind::Post);
            assert_eq!(key, "slug=missing");
        }
        other => panic!("expected NotFound, got {:?}", other),
    }
}

#[tokio::test]
async fn test_invalid_filters_send_no_request() {
    let env = setup().await;

    let err = env
        .engine
        .scrape_single(EntityKind::Post, Filter::Category(1))
        .await
        .unwrap_err();
    assert!(err.is_usage_error());

    let err = env
        .engine
        .scrape_collection(EntityKind::Category, Filter::Id(5), 1)
        .await
        .unwrap_err();
    assert!(err.is_usage_error());

    let requests = env.server.received_requests().await.unwrap();
    assert!(requests.is_empty());
}

#[tokio::test]
async fn test_single_category_by_id() {
    let env = setup().await;

    Mock::given(method("GET"))
        .and(path("/wp-json/wp/v2/categories/12"))
        .respond_with(ResponseTemplate::new(200).set_body_json(category_json(12, "startups")))
        .mount(&env.server)
        .await;

    let normalized = env
        .engine
        .scrape_single(EntityKind::Category, Filter::Id(12))
        .await
        .unwrap();

    assert!(normalized.created);
    assert_eq!(normalized.entity.kind(), EntityKind::Category);
    assert_eq!(normalized.entity.slug(), "startups");
}

#[tokio::test]
async fn test_collection_page_normalizes_in_order() {
    let env = setup().await;

    Mock::given(method("GET"))
        .and(path("/wp-json/wp/v2/posts"))
        .and(query_param("page", "2"))
        .and(query_param("_envelope", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(crate::common::envelope(json!([
            bare_post_json(1, "first"),
            bare_post_json(2, "second")
        ]))))
        .mount(&env.server)
        .await;

    let page = env
        .engine
        .scrape_collection(EntityKind::Post, Filter::None, 2)
        .await
        .unwrap();

    let slugs: Vec<&str> = page.iter().map(|n| n.entity.slug()).collect();
    assert_eq!(slugs, vec!["first", "second"]);
}

#[tokio::test]
async fn test_envelope_error_status_is_rejected() {
    let env = setup().await;

    Mock::given(method("GET"))
        .and(path("/wp-json/wp/v2/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": 400,
            "headers": {},
            "body": { "code": "rest_invalid_param", "message": "Invalid parameter(s): page" }
        })))
        .mount(&env.server)
        .await;

    let err = env
        .engine
        .scrape_collection(EntityKind::Author, Filter::None, 900)
        .await
        .unwrap_err();

    assert!(matches!(err, IngestError::UnexpectedPayload { .. }));
    assert_eq!(
        env.engine
            .storage()
            .unwrap()
            .count_entities(EntityKind::Author)
            .unwrap(),
        0
    );
}

#[tokio::test]
async fn test_embedded_lookup_links_authors_to_known_post() {
    let env = setup().await;

    Mock::given(method("GET"))
        .and(path("/wp-json/wp/v2/posts"))
        .and(query_param("_envelope", "true"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(crate::common::envelope(json!([bare_post_json(50, "shared")]))),
        )
        .mount(&env.server)
        .await;

    Mock::given(method("GET"))
        .and(path("/wp-json/wp/v2/posts"))
        .and(query_param("slug", "shared"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([post_json(50, "shared", &[], "")])),
        )
        .mount(&env.server)
        .await;

    let page = env
        .engine
        .scrape_collection(EntityKind::Post, Filter::None, 1)
        .await
        .unwrap();
    assert!(page[0].created);

    let normalized = env
        .engine
        .scrape_single(EntityKind::Post, Filter::Slug("shared".to_string()))
        .await
        .unwrap();
    assert!(!normalized.created);

    let graph = match normalized.entity {
        Entity::Post(graph) => graph,
        other => panic!("expected a post, got {:?}", other),
    };
    assert_eq!(graph.authors.len(), 1);
    assert_eq!(graph.authors[0].slug, "jane-doe");

    let storage = env.engine.storage().unwrap();
    assert_eq!(storage.count_entities(EntityKind::Post).unwrap(), 1);
    assert_eq!(storage.post_authors(graph.post.id).unwrap().len(), 1);
}

#[tokio::test]
async fn test_concurrent_lookups_store_one_post() {
    let env = setup().await;

    Mock::given(method("GET"))
        .and(path("/wp-json/wp/v2/posts"))
        .and(query_param("slug", "racing"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([post_json(77, "racing", &[], "")]))
                .set_delay(std::time::Duration::from_millis(200)),
        )
        .expect(2)
        .mount(&env.server)
        .await;

    let (first, second) = tokio::join!(
        env.engine
            .scrape_single(EntityKind::Post, Filter::Slug("racing".to_string())),
        env.engine
            .scrape_single(EntityKind::Post, Filter::Slug("racing".to_string())),
    );
    let (first, second) = (first.unwrap(), second.unwrap());

    assert_ne!(first.created, second.created);
    assert_eq!(first.entity.id(), second.entity.id());

    let storage = env.engine.storage().unwrap();
    assert_eq!(storage.count_entities(EntityKind::Post).unwrap(), 1);
    assert_eq!(storage.count_entities(EntityKind::Author).unwrap(), 1);
    assert_eq!(storage.post_authors(first.entity.id()).unwrap().len(), 1);
}
