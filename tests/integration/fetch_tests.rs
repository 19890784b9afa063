//! Retry, classification and cancellation behavior of the fetcher

use crate::common::setup;
use std::time::{Duration, Instant};
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};
use wp_ingest::ingest::FetchMode;
use wp_ingest::{FetchErrorKind, TaskStatus};

#[tokio::test]
async fn test_persistent_server_error_exhausts_retries() {
    let env = setup().await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&env.server)
        .await;

    let url = format!("{}/flaky", env.server.uri());
    let err = env.engine.fetcher().fetch_text(&url).await.unwrap_err();

    assert_eq!(err.kind, FetchErrorKind::RetriesExhausted);
    assert_eq!(err.attempts, 3);
}

#[tokio::test]
async fn test_transient_error_recovers() {
    let env = setup().await;

    Mock::given(method("GET"))
        .and(path("/recovering"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(2)
        .mount(&env.server)
        .await;

    Mock::given(method("GET"))
        .and(path("/recovering"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&env.server)
        .await;

    let url = format!("{}/recovering", env.server.uri());
    let body = env.engine.fetcher().fetch_text(&url).await.unwrap();

    assert_eq!(body, "ok");
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let env = setup().await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&env.server)
        .await;

    let url = format!("{}/missing", env.server.uri());
    let err = env
        .engine
        .fetcher()
        .fetch(&url, FetchMode::Json)
        .await
        .unwrap_err();

    assert_eq!(err.kind, FetchErrorKind::HttpStatus(404));
    assert_eq!(err.attempts, 1);
}

#[tokio::test]
async fn test_cancellation_interrupts_slow_request() {
    let env = setup().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&env.server)
        .await;

    let canceller = env.engine.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        canceller.cancel();
    });

    let started = Instant::now();
    let url = format!("{}/slow", env.server.uri());
    let err = env.engine.fetcher().fetch_text(&url).await.unwrap_err();

    assert_eq!(err.kind, FetchErrorKind::Cancelled);
    assert!(started.elapsed() < Duration::from_secs(4));
}

#[tokio::test]
async fn test_cancelled_engine_reports_cancelled_tasks() {
    let env = setup().await;
    env.engine.cancel();

    let search = env.engine.search_keyword("anything", Some(1)).await;
    assert_eq!(search.status, TaskStatus::Cancelled);

    let daily = env.engine.resolve_pending_daily_items().await;
    assert_eq!(daily.status, TaskStatus::Cancelled);

    assert!(env.server.received_requests().await.unwrap().is_empty());
}
