//! RPC method handler for the syncmarks JSON-RPC protocol.
//!
//! Kept apart from `rpc_server.rs` so it can be unit-tested. `handle_method`
//! dispatches one call against the shared [`RpcState`]. Calls that need a
//! session answer `{"redirect":"landing"}` instead of an error when there is
//! none.

use serde_json::{json, Value};
use tokio::sync::{mpsc, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::app::{App, Dashboard, Route};
use crate::managers::bookmark_store::Snapshot;
use crate::types::bookmark::Bookmark;
use crate::types::errors::{AuthError, BookmarkError};
use crate::types::session::{SessionState, User};

/// A mounted dashboard and the task pushing its store changes.
struct MountedView {
    view: Dashboard,
    forwarder: Option<JoinHandle<()>>,
}

impl Drop for MountedView {
    fn drop(&mut self) {
        if let Some(forwarder) = self.forwarder.take() {
            forwarder.abort();
        }
    }
}

type Slot = Option<MountedView>;

/// Everything one RPC connection works against.
pub struct RpcState {
    pub app: App,
    dashboard: Mutex<Slot>,
    events: Option<mpsc::UnboundedSender<Value>>,
}

impl RpcState {
    pub fn new(app: App) -> Self {
        Self {
            app,
            dashboard: Mutex::new(None),
            events: None,
        }
    }

    /// Pushes `{"event":"bookmarks",...}` on `events` whenever a mounted
    /// dashboard's store changes.
    pub fn with_events(mut self, events: mpsc::UnboundedSender<Value>) -> Self {
        self.events = Some(events);
        self
    }

    pub async fn is_mounted(&self) -> bool {
        self.dashboard.lock().await.is_some()
    }

    /// Whether a mounted view is pushing store changes.
    pub async fn is_forwarding(&self) -> bool {
        self.dashboard
            .lock()
            .await
            .as_ref()
            .and_then(|m| m.forwarder.as_ref())
            .is_some_and(|f| !f.is_finished())
    }

    async fn unmount(&self) -> bool {
        let mounted = self.dashboard.lock().await.take();
        mounted.is_some()
    }
}

pub fn bookmark_json(b: &Bookmark) -> Value {
    json!({
        "id": b.id,
        "title": b.title,
        "url": b.url,
        "created_at": b.created_at.to_rfc3339(),
    })
}

fn items_json(items: &Snapshot) -> Value {
    Value::Array(items.iter().map(bookmark_json).collect())
}

fn route_name(route: Route) -> &'static str {
    match route {
        Route::Landing => "landing",
        Route::Dashboard => "dashboard",
    }
}

fn redirect() -> Value {
    json!({"redirect": route_name(Route::Landing)})
}

fn forward_store_changes(view: &Dashboard, events: mpsc::UnboundedSender<Value>) -> JoinHandle<()> {
    let mut rx = view.watch();
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let items = rx.borrow_and_update().clone();
            if events.send(json!({"event": "bookmarks", "items": items_json(&items)})).is_err() {
                break;
            }
        }
        debug!("store change forwarding stopped");
    })
}

/// Locks the dashboard slot with a view mounted for the current session.
///
/// The session is re-read on every call: a view mounted for someone else is
/// replaced, and an ended session unmounts it. `Ok(None)` means there is no
/// session and the caller must redirect.
async fn mounted(state: &RpcState) -> Result<Option<MutexGuard<'_, Slot>>, String> {
    let mut slot = state.dashboard.lock().await;

    let session = match state.app.guard().check_session().await {
        SessionState::Authenticated(session) => session,
        SessionState::Unauthenticated => {
            if slot.take().is_some() {
                info!("session ended, dashboard unmounted");
            }
            return Ok(None);
        }
    };

    if slot.as_ref().is_some_and(|m| !m.view.is_owned_by(&session)) {
        info!(user = %session.user.id, "session changed, remounting dashboard");
        *slot = None;
    }

    if slot.is_none() {
        match Dashboard::mount(&state.app).await {
            Ok(view) => {
                let forwarder = state
                    .events
                    .as_ref()
                    .map(|events| forward_store_changes(&view, events.clone()));
                *slot = Some(MountedView { view, forwarder });
            }
            Err(AuthError::NotAuthenticated) => return Ok(None),
            Err(e) => return Err(e.to_string()),
        }
    }
    Ok(Some(slot))
}

fn view(slot: &Slot) -> Result<&Dashboard, String> {
    slot.as_ref().map(|m| &m.view).ok_or_else(|| "dashboard not mounted".to_string())
}

/// Dispatch a JSON-RPC method call to the appropriate handler.
///
/// Returns `Ok(Value)` on success or `Err(String)` with an error message.
pub async fn handle_method(state: &RpcState, method: &str, params: &Value) -> Result<Value, String> {
    match method {
        "ping" => Ok(json!({"pong": true})),

        // ─── Session / auth ───
        "session.check" => {
            let route = state.app.landing().check().await;
            Ok(json!({"route": route_name(route), "authenticated": route == Route::Dashboard}))
        }
        "auth.login" => {
            let provider = params.get("provider").and_then(|v| v.as_str());
            let redirect = state.app.landing().login(provider).await.map_err(|e| e.to_string())?;
            Ok(json!({"provider": redirect.provider, "url": redirect.url}))
        }
        "auth.callback" => {
            let user = params.get("user").cloned().ok_or("missing user")?;
            let user: User = serde_json::from_value(user).map_err(|e| format!("invalid user: {}", e))?;
            // Whatever was mounted belongs to the previous sign-in.
            state.unmount().await;
            let session = state.app.auth.complete_sign_in(user).await.map_err(|e| e.to_string())?;
            Ok(json!({"ok": true, "expires_at": session.expires_at.to_rfc3339()}))
        }
        "auth.logout" => {
            state.unmount().await;
            state.app.auth.sign_out().await.map_err(|e| e.to_string())?;
            Ok(json!({"route": route_name(Route::Landing)}))
        }

        // ─── Dashboard lifecycle ───
        "dashboard.mount" => {
            let Some(slot) = mounted(state).await? else {
                return Ok(redirect());
            };
            let view = view(&slot)?;
            Ok(json!({
                "items": items_json(&view.bookmarks()),
                "identity": view.identity(),
                "live": view.is_live(),
            }))
        }
        "dashboard.unmount" => {
            let was_mounted = state.unmount().await;
            Ok(json!({"ok": true, "was_mounted": was_mounted}))
        }
        "identity.get" => {
            let Some(slot) = mounted(state).await? else {
                return Ok(redirect());
            };
            let view = view(&slot)?;
            serde_json::to_value(view.identity()).map_err(|e| e.to_string())
        }

        // ─── Bookmarks ───
        "bookmark.list" => {
            let Some(slot) = mounted(state).await? else {
                return Ok(redirect());
            };
            let view = view(&slot)?;
            Ok(json!({"items": items_json(&view.bookmarks())}))
        }
        "bookmark.create" => {
            let title = params.get("title").and_then(|v| v.as_str()).ok_or("missing title")?;
            let url = params.get("url").and_then(|v| v.as_str()).ok_or("missing url")?;
            let Some(mut slot) = mounted(state).await? else {
                return Ok(redirect());
            };
            let result = view(&slot)?.create(title, url).await;
            match result {
                Ok(created) => Ok(bookmark_json(&created)),
                Err(BookmarkError::Auth(_)) => {
                    *slot = None;
                    Ok(redirect())
                }
                Err(e) => Err(e.to_string()),
            }
        }
        "bookmark.delete" => {
            let id = params.get("id").and_then(|v| v.as_str()).ok_or("missing id")?;
            let Some(mut slot) = mounted(state).await? else {
                return Ok(redirect());
            };
            let result = view(&slot)?.delete(id).await;
            match result {
                Ok(()) => Ok(json!({"ok": true})),
                Err(BookmarkError::Auth(_)) => {
                    *slot = None;
                    Ok(redirect())
                }
                Err(e) => Err(e.to_string()),
            }
        }
        "bookmark.refresh" => {
            let Some(slot) = mounted(state).await? else {
                return Ok(redirect());
            };
            let view = view(&slot)?;
            let changed = view.refresh().await.map_err(|e| e.to_string())?;
            Ok(json!({"changed": changed}))
        }

        _ => Err(format!("unknown method: {}", method)),
    }
}
