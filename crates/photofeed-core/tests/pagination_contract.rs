//! Contract Test: Pagination
//!
//! This test verifies how pages land in the cache.
//!
//! Constraints verified:
//! - Pages are requested 1, 2, 3... and the cursor only moves on success
//! - Photos are appended in server order, never replaced or reordered
//! - One change notification per appended page
//! - Failures leave the cache, the cursor and the notifier untouched

mod common;

use common::*;
use photofeed_core::error::TransportError;
use photofeed_core::{Dimensions, HttpMethod, StoreConfig, StoreEvent};
use serde_json::json;
use std::time::Duration;

async fn wait_for_page_failed(harness: &mut Harness) -> u32 {
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            match harness.events.recv().await {
                Some(StoreEvent::PageFailed { page, .. }) => break page,
                Some(_) => continue,
                None => panic!("event channel closed"),
            }
        }
    })
    .await
    .expect("page failure reported")
}

#[tokio::test]
async fn first_page_lands_in_order() {
    let harness = Harness::start();
    let mut changes = harness.changes();

    harness.handle.fetch_next_page().await.unwrap();
    harness.transport.wait_for_requests(1).await;

    let request = harness.transport.request(0);
    assert_eq!(request.method, HttpMethod::Get);
    assert_eq!(request.path, "/photos");
    assert_eq!(request.query_param("page"), Some("1"));
    assert_eq!(request.query_param("per_page"), Some("10"));

    assert!(harness.transport.respond_json(
        0,
        json!([photo_json("a", false), photo_json("b", true)])
    ));
    next_change(&mut changes).await;

    let snapshot = harness.handle.snapshot().await.unwrap();
    let ids: Vec<_> = snapshot.photos.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);
    assert_eq!(snapshot.last_loaded_page, Some(1));
    assert_eq!(snapshot.in_flight, None);
    assert_eq!(harness.observer.count(), 1);

    let first = &snapshot.photos[0];
    assert_eq!(first.size, Dimensions { width: 4000, height: 3000 });
    assert_eq!(first.description.as_deref(), Some("Photo a"));
    assert_eq!(first.thumb_image_url, "https://images.example.com/a/thumb");
    assert_eq!(first.small_image_url, "https://images.example.com/a/small");
    assert_eq!(first.regular_image_url, "https://images.example.com/a/regular");
    assert_eq!(first.large_image_url, "https://images.example.com/a/full");
    assert!(first.created_at.is_some());
    assert!(!first.is_liked);
    assert!(snapshot.photos[1].is_liked);
}

#[tokio::test]
async fn second_page_appends_after_first() {
    let harness = Harness::start();

    harness
        .load_page(vec![photo_json("a", false), photo_json("b", false)])
        .await;
    harness.load_page(vec![photo_json("c", false)]).await;

    assert_eq!(harness.transport.request(1).query_param("page"), Some("2"));

    let snapshot = harness.handle.snapshot().await.unwrap();
    let ids: Vec<_> = snapshot.photos.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
    assert_eq!(snapshot.last_loaded_page, Some(2));
    assert_eq!(harness.observer.count(), 2);
}

#[tokio::test]
async fn empty_page_still_advances_cursor() {
    let harness = Harness::start();

    harness.load_page(vec![photo_json("a", false)]).await;
    harness.load_page(vec![]).await;

    let snapshot = harness.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.photos.len(), 1);
    assert_eq!(snapshot.last_loaded_page, Some(2));
    assert_eq!(harness.observer.count(), 2);
}

#[tokio::test]
async fn transport_failure_leaves_state_unchanged() {
    let mut harness = Harness::start();
    harness.load_page(vec![photo_json("a", false)]).await;
    let mut changes = harness.changes();

    harness.handle.fetch_next_page().await.unwrap();
    harness.transport.wait_for_requests(2).await;
    assert!(harness.transport.fail(
        1,
        TransportError::Status {
            status: 503,
            body: "unavailable".to_string(),
        }
    ));

    assert_eq!(wait_for_page_failed(&mut harness).await, 2);
    assert_no_change(&mut changes).await;

    let snapshot = harness.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.photos.len(), 1);
    assert_eq!(snapshot.last_loaded_page, Some(1));
    assert_eq!(snapshot.in_flight, None);
    assert_eq!(harness.observer.count(), 1);
}

#[tokio::test]
async fn undecodable_body_leaves_state_unchanged() {
    let mut harness = Harness::start();

    harness.handle.fetch_next_page().await.unwrap();
    harness.transport.wait_for_requests(1).await;
    assert!(harness.transport.respond_json(0, json!({ "errors": ["nope"] })));

    assert_eq!(wait_for_page_failed(&mut harness).await, 1);

    let snapshot = harness.handle.snapshot().await.unwrap();
    assert!(snapshot.photos.is_empty());
    assert_eq!(snapshot.last_loaded_page, None);
    assert_eq!(harness.observer.count(), 0);
}

#[tokio::test]
async fn payload_missing_required_field_fails_whole_page() {
    let mut harness = Harness::start();

    let mut broken = photo_json("b", false);
    broken.as_object_mut().unwrap().remove("urls");

    harness.handle.fetch_next_page().await.unwrap();
    harness.transport.wait_for_requests(1).await;
    assert!(harness
        .transport
        .respond_json(0, json!([photo_json("a", false), broken])));

    assert_eq!(wait_for_page_failed(&mut harness).await, 1);
    assert!(harness.handle.photos().await.unwrap().is_empty());
}

#[tokio::test]
async fn unbuildable_request_sends_nothing() {
    let mut harness = Harness::with_config(StoreConfig::new("ftp://api.example.com"));

    harness.handle.fetch_next_page().await.unwrap();

    let snapshot = harness.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.in_flight, None);
    assert_eq!(snapshot.last_loaded_page, None);

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(harness.transport.request_count(), 0);
    assert!(harness.drain_events().await.is_empty());
}

#[tokio::test]
async fn per_page_is_sent_with_each_request() {
    let harness = Harness::with_config(StoreConfig::new(BASE_URL).with_per_page(30));

    harness.handle.fetch_next_page().await.unwrap();
    harness.transport.wait_for_requests(1).await;

    let request = harness.transport.request(0);
    assert_eq!(request.query_param("per_page"), Some("30"));
    assert_eq!(
        request.url,
        "https://api.example.com/photos?page=1&per_page=30"
    );
}

#[tokio::test]
async fn page_loaded_event_reports_page_and_count() {
    let mut harness = Harness::start();

    harness
        .load_page(vec![photo_json("a", false), photo_json("b", false)])
        .await;

    let events = harness.drain_events().await;
    assert!(events.contains(&StoreEvent::PageLoaded { page: 1, count: 2 }));
}
