//! Unit tests for the Change Feed Listener and its subscription lifecycle.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use syncmarks::managers::bookmark_store::BookmarkStore;
use syncmarks::managers::change_feed_listener::ChangeFeedListener;
use syncmarks::managers::reconciler::Reconciler;
use syncmarks::services::change_feed::{ChangeFeed, FeedHandle, LocalChangeFeed};
use syncmarks::services::storage::BookmarkRepository;
use syncmarks::types::bookmark::{Bookmark, NewBookmark};
use syncmarks::types::errors::{StorageError, SubscriptionError};
use syncmarks::types::feed::{ChangeEvent, ChangeKind, EventMask, SubscriptionId};
use syncmarks::types::session::Session;

use common::{backend, eventually, session};

fn record(title: &str, owner: &str) -> NewBookmark {
    NewBookmark {
        title: title.to_string(),
        url: format!("https://{}.example.com", title.to_lowercase()),
        owner: owner.to_string(),
    }
}

/// Counts how often the listener refetches.
struct CountingRepository {
    inner: Arc<dyn BookmarkRepository>,
    selects: AtomicUsize,
}

#[async_trait]
impl BookmarkRepository for CountingRepository {
    async fn select(&self, session: &Session) -> Result<Vec<Bookmark>, StorageError> {
        self.selects.fetch_add(1, Ordering::SeqCst);
        self.inner.select(session).await
    }

    async fn insert(&self, session: &Session, record: NewBookmark) -> Result<Bookmark, StorageError> {
        self.inner.insert(session, record).await
    }

    async fn delete(&self, session: &Session, id: &str) -> Result<(), StorageError> {
        self.inner.delete(session, id).await
    }
}

/// A feed that refuses every subscription.
struct DeadFeed;

#[async_trait]
impl ChangeFeed for DeadFeed {
    async fn subscribe(&self, _collection: &str, _mask: EventMask) -> Result<FeedHandle, SubscriptionError> {
        Err(SubscriptionError::ConnectFailed("realtime offline".to_string()))
    }

    fn unsubscribe(&self, _id: SubscriptionId) {}
}

#[tokio::test]
async fn test_external_write_triggers_refresh() {
    let shared = backend();
    let store = Arc::new(BookmarkStore::new());
    let reconciler = Arc::new(Reconciler::new(store.clone(), shared.repository.clone()));
    let alice = session("alice");

    let sub = ChangeFeedListener::start(shared.feed.clone(), "bookmarks", reconciler, alice.clone())
        .await
        .unwrap();
    assert_eq!(shared.feed.active_subscriptions(), 1);

    shared.repository.insert(&alice, record("Remote", "alice")).await.unwrap();
    assert!(eventually(|| store.len() == 1).await);
    assert_eq!(store.snapshot()[0].title, "Remote");

    drop(sub);
    assert_eq!(shared.feed.active_subscriptions(), 0);
}

#[tokio::test]
async fn test_foreign_writes_do_not_leak_into_store() {
    let shared = backend();
    let store = Arc::new(BookmarkStore::new());
    let reconciler = Arc::new(Reconciler::new(store.clone(), shared.repository.clone()));

    let _sub = ChangeFeedListener::start(shared.feed.clone(), "bookmarks", reconciler, session("alice"))
        .await
        .unwrap();
    shared.repository.insert(&session("bob"), record("Bob's", "bob")).await.unwrap();
    shared.repository.insert(&session("alice"), record("Mine", "alice")).await.unwrap();

    assert!(eventually(|| store.len() == 1).await);
    assert_eq!(store.snapshot()[0].owner, "alice");
}

#[tokio::test]
async fn test_cancel_releases_subscription_and_stops_refreshing() {
    let shared = backend();
    let store = Arc::new(BookmarkStore::new());
    let reconciler = Arc::new(Reconciler::new(store.clone(), shared.repository.clone()));
    let alice = session("alice");

    let sub = ChangeFeedListener::start(shared.feed.clone(), "bookmarks", reconciler, alice.clone())
        .await
        .unwrap();
    sub.cancel();
    assert_eq!(shared.feed.active_subscriptions(), 0);

    shared.repository.insert(&alice, record("Later", "alice")).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_closed_feed_stops_listener() {
    let shared = backend();
    let store = Arc::new(BookmarkStore::new());
    let reconciler = Arc::new(Reconciler::new(store.clone(), shared.repository.clone()));

    let sub = ChangeFeedListener::start(shared.feed.clone(), "bookmarks", reconciler, session("alice"))
        .await
        .unwrap();
    shared.feed.close();

    assert!(eventually(|| sub.is_finished()).await);
}

#[tokio::test]
async fn test_closed_store_stops_listener() {
    let shared = backend();
    let store = Arc::new(BookmarkStore::new());
    let reconciler = Arc::new(Reconciler::new(store.clone(), shared.repository.clone()));
    let alice = session("alice");

    let sub = ChangeFeedListener::start(shared.feed.clone(), "bookmarks", reconciler, alice.clone())
        .await
        .unwrap();
    store.close();
    shared.repository.insert(&alice, record("Late", "alice")).await.unwrap();

    assert!(eventually(|| sub.is_finished()).await);
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_queued_signals_coalesce_into_one_refetch() {
    let shared = backend();
    let counting = Arc::new(CountingRepository {
        inner: shared.repository.clone(),
        selects: AtomicUsize::new(0),
    });
    let store = Arc::new(BookmarkStore::new());
    let reconciler = Arc::new(Reconciler::new(store.clone(), counting.clone()));

    let _sub = ChangeFeedListener::start(shared.feed.clone(), "bookmarks", reconciler, session("alice"))
        .await
        .unwrap();

    // Published back to back without yielding, so all five are queued
    // before the listener wakes.
    for n in 0..5 {
        shared.feed.publish(ChangeEvent {
            collection: "bookmarks".to_string(),
            kind: ChangeKind::Update,
            record_id: Some(format!("r{}", n)),
        });
    }

    assert!(eventually(|| counting.selects.load(Ordering::SeqCst) >= 1).await);
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert_eq!(counting.selects.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_subscribe_failure_is_reported() {
    let shared = backend();
    let store = Arc::new(BookmarkStore::new());
    let reconciler = Arc::new(Reconciler::new(store, shared.repository.clone()));

    let result = ChangeFeedListener::start(Arc::new(DeadFeed), "bookmarks", reconciler, session("alice")).await;
    assert!(matches!(result, Err(SubscriptionError::ConnectFailed(_))));
}

#[tokio::test]
async fn test_each_start_gets_its_own_subscription() {
    let feed = Arc::new(LocalChangeFeed::new(4));
    let shared = backend();
    let make = || Arc::new(Reconciler::new(Arc::new(BookmarkStore::new()), shared.repository.clone()));

    let a = ChangeFeedListener::start(feed.clone(), "bookmarks", make(), session("alice"))
        .await
        .unwrap();
    let b = ChangeFeedListener::start(feed.clone(), "bookmarks", make(), session("alice"))
        .await
        .unwrap();
    assert_ne!(a.id(), b.id());
    assert_eq!(feed.active_subscriptions(), 2);

    drop(a);
    drop(b);
    assert_eq!(feed.active_subscriptions(), 0);
}
