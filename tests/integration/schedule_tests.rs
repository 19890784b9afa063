//! Auto-scrape directives

use crate::common::{bare_post_json, category_json, envelope, setup};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};
use wp_ingest::storage::{ItemTable, Storage};
use wp_ingest::{EntityKind, TaskStatus};

#[tokio::test]
async fn test_directive_range_is_clamped_to_last_page() {
    let env = setup().await;

    for (page, ids) in [("1", [1i64, 2]), ("2", [3, 4])] {
        let body = json!(ids
            .iter()
            .map(|id| category_json(*id, &format!("cat-{}", id)))
            .collect::<Vec<_>>());
        Mock::given(method("GET"))
            .and(path("/wp-json/wp/v2/categories"))
            .and(query_param("page", page))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope(body)))
            .expect(1)
            .mount(&env.server)
            .await;
    }

    Mock::given(method("GET"))
        .and(path("/wp-json/wp/v2/categories"))
        .and(query_param("page", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!([]))))
        .expect(0)
        .mount(&env.server)
        .await;

    let directive = env
        .engine
        .create_auto_scrap(EntityKind::Category, None, None, None)
        .unwrap();
    assert_eq!(directive.page_start, 1);
    assert_eq!(directive.page_count, 5);

    let summary = env.engine.run_pending_auto_scraps().await;
    assert_eq!(summary.status, TaskStatus::Completed);
    assert_eq!(summary.processed_count, 1);

    let mut storage = env.engine.storage().unwrap();
    assert_eq!(storage.count_entities(EntityKind::Category).unwrap(), 4);
    assert!(storage.pending_auto_scraps().unwrap().is_empty());

    let item = storage
        .get_or_insert_auto_scrap_item(directive.id, EntityKind::Category)
        .unwrap();
    assert!(item.is_scraped);
    let linked = storage
        .auto_scrap_item_entities(EntityKind::Category, item.id)
        .unwrap();
    assert_eq!(linked.len(), 4);
}

#[tokio::test]
async fn test_post_directive_filters_by_category() {
    let env = setup().await;

    Mock::given(method("GET"))
        .and(path("/wp-json/wp/v2/posts"))
        .and(query_param("categories", "7"))
        .and(query_param("page", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!([bare_post_json(
            70, "filtered"
        )]))))
        .expect(1)
        .mount(&env.server)
        .await;

    Mock::given(method("GET"))
        .and(path("/wp-json/wp/v2/posts"))
        .and(query_param("categories", "7"))
        .and(query_param("page", "4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!([]))))
        .expect(1)
        .mount(&env.server)
        .await;

    env.engine
        .create_auto_scrap(EntityKind::Post, Some(3), Some(1), Some(7))
        .unwrap();

    let summary = env.engine.run_pending_auto_scraps().await;

    assert_eq!(summary.status, TaskStatus::Completed);
    let storage = env.engine.storage().unwrap();
    assert!(storage.find_post_by_slug("filtered").unwrap().is_some());
}

#[tokio::test]
async fn test_category_filter_on_author_directive_is_rejected() {
    let env = setup().await;

    let err = env
        .engine
        .create_auto_scrap(EntityKind::Author, None, None, Some(3))
        .unwrap_err();

    assert!(err.is_usage_error());
    assert!(env
        .engine
        .storage()
        .unwrap()
        .pending_auto_scraps()
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_failed_page_leaves_directive_pending() {
    let env = setup().await;

    Mock::given(method("GET"))
        .and(path("/wp-json/wp/v2/users"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!([]))))
        .mount(&env.server)
        .await;

    Mock::given(method("GET"))
        .and(path("/wp-json/wp/v2/users"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": 400,
            "body": { "code": "rest_post_invalid_page_number" }
        })))
        .mount(&env.server)
        .await;

    env.engine
        .create_auto_scrap(EntityKind::Author, Some(1), Some(1), None)
        .unwrap();

    let summary = env.engine.run_pending_auto_scraps().await;
    assert_eq!(summary.status, TaskStatus::CompletedWithFailures);
    assert_eq!(summary.failed_count, 1);
    assert_eq!(summary.deactivated_count, 0);

    let storage = env.engine.storage().unwrap();
    assert_eq!(storage.pending_auto_scraps().unwrap().len(), 1);
    let counts = storage
        .count_items_by_state(ItemTable::AutoScrap(EntityKind::Author))
        .unwrap();
    assert_eq!(counts.pending, 1);
}
