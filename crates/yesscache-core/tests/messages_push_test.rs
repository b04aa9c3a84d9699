mod common;

use common::{config, get, url, Harness, ORIGIN};
use yesscache_core::{CacheStorage, ClickOutcome, MessageOutcome, ResponseSource, WorkerEvent};

#[tokio::test]
async fn cache_data_message_primes_offline_key() {
    let h = Harness::new(config("v1")).await;
    h.install_and_activate().await;

    let outcome = h
        .manager
        .handle_message(br#"{"type":"CACHE_DATA","payload":{"team":"blue","level":3}}"#)
        .await;
    assert_eq!(outcome, MessageOutcome::Cached);

    let cached = h
        .storage
        .match_in("yessplora-dynamic-v1", &url("/offline-data"))
        .await
        .unwrap()
        .unwrap();
    let body: serde_json::Value = cached.response.parse_json().unwrap();
    assert_eq!(body["team"], "blue");

    // Served from cache once the network is gone
    h.fetcher.set_offline(true);
    let fetched = h.manager.handle_fetch(&get("/offline-data")).await;
    assert_eq!(fetched.source(), Some(ResponseSource::Cache));
}

#[tokio::test]
async fn cache_data_before_activation_is_ignored() {
    let h = Harness::new(config("v1")).await;

    let outcome = h
        .manager
        .handle_message(br#"{"type":"CACHE_DATA","payload":{"team":"red"}}"#)
        .await;

    assert_eq!(outcome, MessageOutcome::Ignored);
    assert!(h.storage.keys().await.unwrap().is_empty());
}

#[tokio::test]
async fn malformed_messages_have_no_effect() {
    let h = Harness::new(config("v1")).await;

    let raws: [&[u8]; 4] = [b"not json", br#"{"type":"FORMAT_DISK"}"#, br#"{"payload":1}"#, &[0xff, 0xfe]];
    for raw in raws {
        assert_eq!(h.manager.handle_message(raw).await, MessageOutcome::Ignored);
    }
    assert!(h.storage.keys().await.unwrap().is_empty());
}

#[tokio::test]
async fn push_shows_notification() {
    let h = Harness::new(config("v1")).await;
    let mut events = h.manager.subscribe();

    let shown = h.manager.handle_push(Some(b"Team Blue found a clue!".as_slice())).await.unwrap();

    assert_eq!(shown.body, "Team Blue found a clue!");
    assert_eq!(shown.icon, h.manager.config().notification_icon);
    assert_eq!(h.notifier.shown.lock().unwrap().as_slice(), &[shown.clone()]);
    assert_eq!(events.try_recv(), Some(WorkerEvent::NotificationShown(shown)));
}

#[tokio::test]
async fn push_without_payload_uses_default_text() {
    let h = Harness::new(config("v1")).await;
    let shown = h.manager.handle_push(None).await.unwrap();
    assert!(!shown.body.is_empty());
}

#[tokio::test]
async fn invalid_push_payload_is_dropped() {
    let h = Harness::new(config("v1")).await;
    assert!(h.manager.handle_push(Some([0xc3u8, 0x28].as_slice())).await.is_none());
    assert!(h.notifier.shown.lock().unwrap().is_empty());
}

#[tokio::test]
async fn notification_clicks() {
    let h = Harness::new(config("v1")).await;
    let root = ClickOutcome::OpenWindow(format!("{}/", ORIGIN).parse().unwrap());

    assert_eq!(h.manager.handle_notification_click(Some("explore")), root);
    assert_eq!(h.manager.handle_notification_click(None), root);
    assert_eq!(h.manager.handle_notification_click(Some("close")), ClickOutcome::Close);
    assert_eq!(h.manager.handle_notification_click(Some("snooze")), ClickOutcome::Close);
}
