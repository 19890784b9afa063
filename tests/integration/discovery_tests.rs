//! Keyword search, daily discovery and the item lifecycle

use crate::common::{bare_post_json, listing_html, setup};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};
use wp_ingest::storage::{ItemSource, ItemTable, Storage};
use wp_ingest::TaskStatus;

const LATEST: &str = "post-block__title__link";

#[tokio::test]
async fn test_keyword_search_keeps_repeated_slugs() {
    let env = setup().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("p", "ai"))
        .and(query_param("b", "11"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_html("thmb", &["a", "b"])))
        .expect(1)
        .mount(&env.server)
        .await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("p", "ai"))
        .and(query_param("b", "21"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_html("thmb", &["b", "c"])))
        .expect(1)
        .mount(&env.server)
        .await;

    let summary = env.engine.search_keyword("  AI ", Some(2)).await;

    assert_eq!(summary.status, TaskStatus::Completed);
    assert_eq!(summary.discovered_count, Some(4));

    let storage = env.engine.storage().unwrap();
    let items = storage.pending_items(ItemSource::KeywordSearch).unwrap();
    let slugs: Vec<&str> = items.iter().map(|item| item.slug.as_str()).collect();
    assert_eq!(slugs, vec!["a", "b", "b", "c"]);
    assert_eq!(storage.count_keywords().unwrap(), 1);
}

#[tokio::test]
async fn test_keyword_search_then_resolution_creates_distinct_posts() {
    let env = setup().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("b", "11"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_html("thmb", &["a", "b"])))
        .mount(&env.server)
        .await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("b", "21"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_html("thmb", &["b", "c"])))
        .mount(&env.server)
        .await;

    for (id, slug) in [(1, "a"), (2, "b"), (3, "c")] {
        Mock::given(method("GET"))
            .and(path("/wp-json/wp/v2/posts"))
            .and(query_param("slug", slug))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([bare_post_json(id, slug)])))
            .mount(&env.server)
            .await;
    }

    let search = env.engine.search_keyword("AI", Some(2)).await;
    assert_eq!(search.discovered_count, Some(4));

    let summary = env.engine.resolve_pending_keyword_items().await;
    assert_eq!(summary.status, TaskStatus::Completed);
    assert_eq!(summary.processed_count, 4);

    let storage = env.engine.storage().unwrap();
    assert_eq!(storage.count_entities(wp_ingest::EntityKind::Post).unwrap(), 3);
    let counts = storage.count_items_by_state(ItemTable::KeywordSearch).unwrap();
    assert_eq!(counts.scraped, 4);
}

#[tokio::test]
async fn test_keyword_search_skips_failed_page() {
    let env = setup().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("b", "11"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&env.server)
        .await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("b", "21"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_html("thmb", &["z"])))
        .mount(&env.server)
        .await;

    let summary = env.engine.search_keyword("robots", Some(2)).await;

    assert_eq!(summary.status, TaskStatus::CompletedWithFailures);
    assert_eq!(summary.discovered_count, Some(1));
    assert_eq!(summary.failed_count, 1);
    assert!(summary.error.unwrap().contains("search page 1"));
}

#[tokio::test]
async fn test_keyword_search_fails_when_no_page_is_read() {
    let env = setup().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&env.server)
        .await;

    let summary = env.engine.search_keyword("ai", Some(2)).await;

    assert_eq!(summary.status, TaskStatus::Failed);
    assert_eq!(summary.failed_count, 2);
    assert_eq!(summary.discovered_count, Some(0));
    assert!(summary.error.unwrap().contains("every search page failed"));
}

#[tokio::test]
async fn test_empty_keyword_fails_without_requests() {
    let env = setup().await;

    let summary = env.engine.search_keyword("   ", None).await;

    assert_eq!(summary.status, TaskStatus::Failed);
    assert!(summary.error.is_some());
    assert!(env.server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_keyword_items_resolve_into_posts() {
    let env = setup().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_html("thmb", &["one"])))
        .mount(&env.server)
        .await;

    Mock::given(method("GET"))
        .and(path("/wp-json/wp/v2/posts"))
        .and(query_param("slug", "one"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([bare_post_json(1, "one")])))
        .mount(&env.server)
        .await;

    env.engine.search_keyword("fintech", Some(1)).await;
    let summary = env.engine.resolve_pending_keyword_items().await;

    assert_eq!(summary.status, TaskStatus::Completed);
    assert_eq!(summary.processed_count, 1);

    let storage = env.engine.storage().unwrap();
    assert!(storage.pending_items(ItemSource::KeywordSearch).unwrap().is_empty());
    let counts = storage.count_items_by_state(ItemTable::KeywordSearch).unwrap();
    assert_eq!(counts.scraped, 1);
    assert!(storage.find_post_by_slug("one").unwrap().is_some());
}

#[tokio::test]
async fn test_daily_discovery_deduplicates_slugs() {
    let env = setup().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_html(LATEST, &["x", "y", "x"])))
        .mount(&env.server)
        .await;

    for (id, slug) in [(1, "x"), (2, "y")] {
        Mock::given(method("GET"))
            .and(path("/wp-json/wp/v2/posts"))
            .and(query_param("slug", slug))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([bare_post_json(id, slug)])))
            .expect(1)
            .mount(&env.server)
            .await;
    }

    let first = env.engine.resolve_pending_daily_items().await;
    assert_eq!(first.status, TaskStatus::Completed);
    assert_eq!(first.discovered_count, Some(2));
    assert_eq!(first.processed_count, 2);

    let second = env.engine.resolve_pending_daily_items().await;
    assert_eq!(second.status, TaskStatus::Completed);
    assert_eq!(second.discovered_count, Some(0));
    assert_eq!(second.processed_count, 0);

    let counts = env
        .engine
        .storage()
        .unwrap()
        .count_items_by_state(ItemTable::Daily)
        .unwrap();
    assert_eq!(counts.scraped, 2);
    assert_eq!(counts.total(), 2);
}

#[tokio::test]
async fn test_failing_item_is_deactivated_past_threshold() {
    let env = setup().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_html(LATEST, &["gone"])))
        .mount(&env.server)
        .await;

    Mock::given(method("GET"))
        .and(path("/wp-json/wp/v2/posts"))
        .and(query_param("slug", "gone"))
        .respond_with(ResponseTemplate::new(404))
        .expect(3)
        .mount(&env.server)
        .await;

    // Two failures keep the item pending
    for _ in 0..2 {
        let summary = env.engine.resolve_pending_daily_items().await;
        assert_eq!(summary.status, TaskStatus::CompletedWithFailures);
        assert_eq!(summary.failed_count, 1);
        assert_eq!(summary.deactivated_count, 0);
    }

    let third = env.engine.resolve_pending_daily_items().await;
    assert_eq!(third.failed_count, 1);
    assert_eq!(third.deactivated_count, 1);

    // A deactivated item is never attempted again
    let fourth = env.engine.resolve_pending_daily_items().await;
    assert_eq!(fourth.status, TaskStatus::Completed);
    assert_eq!(fourth.failed_count, 0);

    let counts = env
        .engine
        .storage()
        .unwrap()
        .count_items_by_state(ItemTable::Daily)
        .unwrap();
    assert_eq!(counts.deactivated, 1);
    assert_eq!(counts.pending, 0);
}

#[tokio::test]
async fn test_failed_discovery_still_resolves_known_items() {
    let env = setup().await;

    env.engine
        .storage()
        .unwrap()
        .get_or_insert_daily_item("known")
        .unwrap();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&env.server)
        .await;

    Mock::given(method("GET"))
        .and(path("/wp-json/wp/v2/posts"))
        .and(query_param("slug", "known"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([bare_post_json(5, "known")])))
        .mount(&env.server)
        .await;

    let summary = env.engine.resolve_pending_daily_items().await;

    assert_eq!(summary.status, TaskStatus::CompletedWithFailures);
    assert_eq!(summary.discovered_count, None);
    assert_eq!(summary.processed_count, 1);
    assert!(summary.error.unwrap().contains("daily discovery failed"));
}
