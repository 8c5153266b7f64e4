//! Change Feed Listener.
//!
//! Every notification is a dirty-signal: the listener never applies the event
//! payload, it asks the reconciler for a full refetch. The subscription is a
//! scoped resource; [`FeedSubscription`] aborts the listener task and
//! unsubscribes when cancelled or dropped.

use std::sync::Arc;

use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::managers::reconciler::Reconciler;
use crate::services::change_feed::{ChangeFeed, FeedHandle};
use crate::types::errors::SubscriptionError;
use crate::types::feed::{EventMask, SubscriptionId};
use crate::types::session::Session;

pub struct ChangeFeedListener;

impl ChangeFeedListener {
    /// Subscribes to `collection` with the `*` mask and spawns the listener task.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn start(
        feed: Arc<dyn ChangeFeed>,
        collection: &str,
        reconciler: Arc<Reconciler>,
        session: Session,
    ) -> Result<FeedSubscription, SubscriptionError> {
        let handle = feed.subscribe(collection, EventMask::All).await?;
        let id = handle.id;
        info!(%id, collection, "change feed subscribed");

        let task = tokio::spawn(listen(handle, reconciler, session));
        Ok(FeedSubscription {
            id,
            feed,
            task,
            released: false,
        })
    }
}

/// Outcome of waiting for the next dirty-signal.
enum Signal {
    Dirty,
    Closed,
}

async fn next_signal(handle: &mut FeedHandle) -> Signal {
    loop {
        match handle.events.recv().await {
            Ok(event) if handle.mask.matches(event.kind) => {
                debug!(id = %handle.id, kind = ?event.kind, record = ?event.record_id, "change received");
                return Signal::Dirty;
            }
            Ok(_) => continue,
            Err(RecvError::Lagged(skipped)) => {
                debug!(id = %handle.id, skipped, "feed lagged");
                return Signal::Dirty;
            }
            Err(RecvError::Closed) => return Signal::Closed,
        }
    }
}

/// Discards signals already queued behind the one being handled; a single
/// refetch covers all of them.
fn drain_pending(handle: &mut FeedHandle) -> usize {
    let mut drained = 0;
    loop {
        match handle.events.try_recv() {
            Ok(_) | Err(TryRecvError::Lagged(_)) => drained += 1,
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return drained,
        }
    }
}

async fn listen(mut handle: FeedHandle, reconciler: Arc<Reconciler>, session: Session) {
    loop {
        if let Signal::Closed = next_signal(&mut handle).await {
            let err = SubscriptionError::Closed(handle.collection.clone());
            warn!(id = %handle.id, error = %err, "change feed ended, live updates stopped");
            return;
        }

        let coalesced = drain_pending(&mut handle);
        if reconciler.store().is_closed() {
            debug!(id = %handle.id, "store closed, listener exiting");
            return;
        }

        match reconciler.refresh(&session).await {
            Ok(changed) => debug!(id = %handle.id, changed, coalesced, "feed refresh done"),
            Err(e) => warn!(id = %handle.id, error = %e, "feed refresh failed"),
        }
    }
}

/// Live subscription owned by a mounted dashboard.
pub struct FeedSubscription {
    id: SubscriptionId,
    feed: Arc<dyn ChangeFeed>,
    task: JoinHandle<()>,
    released: bool,
}

impl FeedSubscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// True once the listener task has stopped, e.g. after the feed closed.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stops the listener and releases the subscription.
    pub fn cancel(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.task.abort();
        self.feed.unsubscribe(self.id);
        self.released = true;
        info!(id = %self.id, "change feed unsubscribed");
    }
}

impl Drop for FeedSubscription {
    fn drop(&mut self) {
        self.release();
    }
}
