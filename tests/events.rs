mod common;

use common::{spawn_app, spawn_app_with, BrokenStore, CountingStore};
use eventlog::config::Application;
use eventlog::models::{Envelope, NewEvent, UNKNOWN_EVENT_TYPE};
use eventlog::storage::{EventStore, MemoryEventStore, UnconfiguredStore};
use pretty_assertions::assert_eq;
use reqwest::{Method, StatusCode};
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;

async fn seeded_store(count: usize) -> Arc<MemoryEventStore> {
    let store = Arc::new(MemoryEventStore::new());
    store.ensure_schema().await.expect("Failed to bootstrap");
    for n in 0..count {
        let event = NewEvent {
            user_name: Some(format!("user{n}")),
            ..NewEvent::default()
        };
        store.insert(event).await.expect("Failed to seed");
    }
    store
}

async fn list(base: &str, query: &str) -> (StatusCode, Envelope) {
    let response = reqwest::get(format!("{base}/events{query}"))
        .await
        .expect("Failed to execute request");
    let status = response.status();
    let body = response.json().await.expect("Body is not an envelope");
    (status, body)
}

fn assert_cors(headers: &reqwest::header::HeaderMap) {
    assert_eq!(headers["access-control-allow-origin"], "*");
    assert_eq!(headers["access-control-allow-methods"], "GET,POST,OPTIONS");
    assert_eq!(headers["access-control-allow-headers"], "Content-Type");
}

#[tokio::test]
async fn preflight_never_touches_storage() {
    let store = Arc::new(CountingStore::default());
    let base = spawn_app(store.clone()).await;

    let response = reqwest::Client::new()
        .request(Method::OPTIONS, format!("{base}/events"))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_cors(response.headers());
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn preflight_works_without_storage() {
    let base = spawn_app(Arc::new(BrokenStore)).await;

    let response = reqwest::Client::new()
        .request(Method::OPTIONS, format!("{base}/events"))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn posted_event_is_listed() {
    let base = spawn_app(Arc::new(MemoryEventStore::new())).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{base}/events"))
        .header("user-agent", "integration-test")
        .header("x-forwarded-for", "203.0.113.5, 10.0.0.1")
        .json(&json!({
            "event_type": "message_sent",
            "user_name": "alice",
            "email": "alice@example.com",
            "payload": {"message": "hi"}
        }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_cors(response.headers());
    let body: Envelope = response.json().await.expect("Body is not an envelope");
    assert_eq!(body, Envelope::ok());

    let (status, body) = list(&base, "").await;
    assert_eq!(status, StatusCode::OK);
    let rows = body.rows.expect("Listing has no rows");
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.id, 1);
    assert_eq!(row.event_type.as_deref(), Some("message_sent"));
    assert_eq!(row.user_name.as_deref(), Some("alice"));
    assert_eq!(row.email.as_deref(), Some("alice@example.com"));
    assert_eq!(
        row.payload.as_ref().map(|payload| &payload.0),
        Some(&json!({"message": "hi"}))
    );
    assert_eq!(row.ip.as_deref(), Some("203.0.113.5"));
    assert_eq!(row.ua.as_deref(), Some("integration-test"));
    assert_eq!(row.path.as_deref(), Some("/events"));
}

#[tokio::test]
async fn deployment_header_fills_missing_path() {
    let store = Arc::new(MemoryEventStore::new());
    let base = spawn_app(store.clone()).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/events?from=header"))
        .header("x-vercel-deployment-url", "app-123.vercel.app")
        .json(&json!({"event_type": "page_view"}))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::CREATED);
    let rows = store.select_recent(10).await.expect("Failed to list");
    assert_eq!(rows[0].path.as_deref(), Some("app-123.vercel.app"));
}

#[tokio::test]
async fn oversized_body_is_rejected_as_json() {
    let settings = Application::new(
        eventlog_cfg::Config {
            max_body_bytes: 1024,
            ..Default::default()
        },
        None,
    );
    let store = Arc::new(CountingStore::default());
    let base = spawn_app_with(&settings, store.clone()).await;
    let message = "x".repeat(4096);

    let response = reqwest::Client::new()
        .post(format!("{base}/events"))
        .json(&json!({"event_type": "upload", "payload": {"message": message}}))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_cors(response.headers());
    let body: Envelope = response.json().await.expect("Body is not an envelope");
    assert!(!body.ok);
    assert!(body.error.is_some());
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn malformed_body_is_stored_with_defaults() {
    let store = Arc::new(MemoryEventStore::new());
    let base = spawn_app(store.clone()).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/events"))
        .header("content-type", "application/json")
        .body("{this is not json")
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Envelope = response.json().await.expect("Body is not an envelope");
    assert!(body.ok);

    let rows = store.select_recent(10).await.expect("Failed to list");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].event_type.as_deref(), Some(UNKNOWN_EVENT_TYPE));
    assert_eq!(rows[0].user_name, None);
    assert_eq!(rows[0].payload.as_ref().map(|payload| &payload.0), Some(&json!({})));
    assert_eq!(rows[0].ip.as_deref(), Some("127.0.0.1"));
}

#[tokio::test]
async fn form_body_is_accepted() {
    let store = Arc::new(MemoryEventStore::new());
    let base = spawn_app(store.clone()).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/events"))
        .header("content-type", "application/x-www-form-urlencoded")
        .body("event_type=page_view&user_name=bob&path=%2Fhome")
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::CREATED);
    let rows = store.select_recent(10).await.expect("Failed to list");
    assert_eq!(rows[0].event_type.as_deref(), Some("page_view"));
    assert_eq!(rows[0].user_name.as_deref(), Some("bob"));
    assert_eq!(rows[0].path.as_deref(), Some("/home"));
}

#[tokio::test]
async fn listing_is_newest_first_and_bounded() {
    let base = spawn_app(seeded_store(5).await).await;

    let (status, body) = list(&base, "?limit=3").await;

    assert_eq!(status, StatusCode::OK);
    let ids: Vec<i64> = body.rows.unwrap().iter().map(|row| row.id).collect();
    assert_eq!(ids, vec![5, 4, 3]);
}

#[tokio::test]
async fn listing_falls_back_to_default_limit() {
    let base = spawn_app(seeded_store(60).await).await;

    for query in ["", "?limit=0", "?limit=-4", "?limit=abc", "?limit="] {
        let (status, body) = list(&base, query).await;
        assert_eq!(status, StatusCode::OK, "query {query}");
        assert_eq!(body.rows.unwrap().len(), 50, "query {query}");
    }
}

#[tokio::test]
async fn listing_never_exceeds_ceiling() {
    let base = spawn_app(seeded_store(205).await).await;

    let (_, body) = list(&base, "?limit=10000").await;
    let rows = body.rows.unwrap();

    assert_eq!(rows.len(), 200);
    assert_eq!(rows[0].id, 205);
    assert!(rows
        .windows(2)
        .all(|pair| (pair[0].created_at, pair[0].id) > (pair[1].created_at, pair[1].id)));
}

#[tokio::test]
async fn unsupported_method_is_rejected_without_storage() {
    let store = Arc::new(CountingStore::default());
    let base = spawn_app(store.clone()).await;

    for method in [Method::PUT, Method::DELETE, Method::PATCH] {
        let response = reqwest::Client::new()
            .request(method.clone(), format!("{base}/events"))
            .send()
            .await
            .expect("Failed to execute request");

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED, "{method}");
        let body: Envelope = response.json().await.expect("Body is not an envelope");
        assert_eq!(body, Envelope::error("Method Not Allowed"));
    }
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn concurrent_posts_get_distinct_ids() {
    let store = Arc::new(MemoryEventStore::new());
    let base = spawn_app(store.clone()).await;
    let client = reqwest::Client::new();

    let requests = (0..100).map(|n| {
        let client = client.clone();
        let url = format!("{base}/events");
        tokio::spawn(async move {
            client
                .post(url)
                .json(&json!({"event_type": "burst", "payload": {"n": n}}))
                .send()
                .await
                .expect("Failed to execute request")
                .status()
        })
    });
    for request in requests.collect::<Vec<_>>() {
        assert_eq!(request.await.expect("Task panicked"), StatusCode::CREATED);
    }

    let rows = store.select_recent(200).await.expect("Failed to list");
    let ids: HashSet<i64> = rows.iter().map(|row| row.id).collect();
    assert_eq!(rows.len(), 100);
    assert_eq!(ids.len(), 100);
    assert_eq!(store.schema_creations().await, 1);
}

#[tokio::test]
async fn missing_connection_string_is_reported_per_request() {
    let base = spawn_app(Arc::new(UnconfiguredStore::default())).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{base}/events"))
        .json(&json!({"event_type": "x"}))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_cors(response.headers());
    let body: Envelope = response.json().await.expect("Body is not an envelope");
    assert!(!body.ok);
    let error = body.error.expect("Error has no message");
    assert!(error.contains("Missing database connection string"));
    assert!(error.contains("POSTGRES_URL"));

    let (status, _) = list(&base, "").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let response = client
        .request(Method::OPTIONS, format!("{base}/events"))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn storage_failure_is_a_json_500() {
    let base = spawn_app(Arc::new(BrokenStore)).await;

    let (status, body) = list(&base, "?limit=5").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!body.ok);
    assert!(body.rows.is_none());
    assert!(body.error.is_some_and(|message| !message.is_empty()));
}
