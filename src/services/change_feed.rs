//! Change feed collaborator.
//!
//! [`ChangeFeed`] is the push channel the dashboard listens on. Delivery is
//! at-least-once and unordered across rows; notifications are dirty-signals
//! only. [`LocalChangeFeed`] is an in-process hub with one `tokio::sync::broadcast`
//! channel per collection, used by the SQLite backend so that every session
//! sharing the database hears about every write.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::types::errors::SubscriptionError;
use crate::types::feed::{ChangeEvent, EventMask, SubscriptionId};

/// A live subscription as handed to the listener.
#[derive(Debug)]
pub struct FeedHandle {
    pub id: SubscriptionId,
    pub collection: String,
    pub mask: EventMask,
    pub events: broadcast::Receiver<ChangeEvent>,
}

/// Push channel of row-level change notifications.
#[async_trait]
pub trait ChangeFeed: Send + Sync {
    async fn subscribe(&self, collection: &str, mask: EventMask) -> Result<FeedHandle, SubscriptionError>;
    /// Releases the subscription. Unknown ids are ignored.
    fn unsubscribe(&self, id: SubscriptionId);
}

#[derive(Default)]
struct HubState {
    channels: HashMap<String, broadcast::Sender<ChangeEvent>>,
    live: HashMap<SubscriptionId, String>,
    next_id: u64,
    closed: bool,
}

/// In-process change feed hub.
pub struct LocalChangeFeed {
    capacity: usize,
    state: Mutex<HubState>,
}

impl LocalChangeFeed {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            state: Mutex::new(HubState::default()),
        }
    }

    /// Broadcasts `event` to every subscriber of its collection.
    ///
    /// Returns the number of receivers that were notified.
    pub fn publish(&self, event: ChangeEvent) -> usize {
        let Ok(state) = self.state.lock() else {
            return 0;
        };
        match state.channels.get(&event.collection) {
            Some(tx) => {
                let collection = event.collection.clone();
                let kind = event.kind;
                let delivered = tx.send(event).unwrap_or(0);
                debug!(%collection, ?kind, delivered, "change published");
                delivered
            }
            None => 0,
        }
    }

    /// Number of subscriptions that have not been released yet.
    pub fn active_subscriptions(&self) -> usize {
        self.state.lock().map(|s| s.live.len()).unwrap_or(0)
    }

    /// Shuts the hub down. Open receivers observe a closed channel and new
    /// subscriptions are refused.
    pub fn close(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.closed = true;
            state.channels.clear();
            info!("change feed closed");
        }
    }
}

#[async_trait]
impl ChangeFeed for LocalChangeFeed {
    async fn subscribe(&self, collection: &str, mask: EventMask) -> Result<FeedHandle, SubscriptionError> {
        let mut state = self
            .state
            .lock()
            .map_err(|e| SubscriptionError::ConnectFailed(e.to_string()))?;
        if state.closed {
            return Err(SubscriptionError::ConnectFailed(format!(
                "feed is closed, cannot subscribe to {}",
                collection
            )));
        }

        let capacity = self.capacity;
        let events = state
            .channels
            .entry(collection.to_string())
            .or_insert_with(|| broadcast::channel(capacity).0)
            .subscribe();

        state.next_id += 1;
        let id = SubscriptionId(state.next_id);
        state.live.insert(id, collection.to_string());
        debug!(%id, collection, "subscribed");

        Ok(FeedHandle {
            id,
            collection: collection.to_string(),
            mask,
            events,
        })
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        if let Ok(mut state) = self.state.lock() {
            if let Some(collection) = state.live.remove(&id) {
                debug!(%id, %collection, "unsubscribed");
            }
        }
    }
}
