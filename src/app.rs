//! App core for syncmarks.
//!
//! [`App`] holds the collaborators and settings for the process. The two
//! screens are [`Landing`] (unauthenticated) and [`Dashboard`] (one mounted
//! session view owning its own store and feed subscription).

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::database::{Database, SharedDatabase};
use crate::managers::bookmark_store::{BookmarkStore, Snapshot};
use crate::managers::change_feed_listener::{ChangeFeedListener, FeedSubscription};
use crate::managers::mutation_gateway::MutationGateway;
use crate::managers::reconciler::Reconciler;
use crate::managers::session_guard::SessionGuard;
use crate::platform;
use crate::services::auth::{AuthProvider, LocalAuthProvider};
use crate::services::change_feed::{ChangeFeed, LocalChangeFeed};
use crate::services::data_version;
use crate::services::rest_storage::RestBookmarkRepository;
use crate::services::storage::{BookmarkRepository, SqliteBookmarkRepository};
use crate::types::bookmark::Bookmark;
use crate::types::errors::{AuthError, BookmarkError};
use crate::types::session::{DisplayIdentity, OAuthRedirect, Session, SessionState};
use crate::types::settings::{StorageBackend, SyncSettings};

/// Screen the caller should show next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Landing,
    Dashboard,
}

/// Process-wide collaborators.
///
/// `feed` is `None` when the backend has no change feed; dashboards then
/// mount without live updates.
pub struct App {
    pub settings: SyncSettings,
    pub auth: Arc<dyn AuthProvider>,
    pub repository: Arc<dyn BookmarkRepository>,
    pub feed: Option<Arc<dyn ChangeFeed>>,
    poller: Option<JoinHandle<()>>,
}

impl App {
    /// Opens the database and builds the configured backend.
    pub fn new(settings: SyncSettings) -> Result<Self, Box<dyn std::error::Error>> {
        let db_path = match &settings.storage.database_path {
            Some(path) => PathBuf::from(path),
            None => {
                let dir = platform::get_data_dir();
                std::fs::create_dir_all(&dir)?;
                dir.join("syncmarks.db")
            }
        };
        info!(path = %db_path.display(), "opening database");
        Self::with_database(settings, Database::open(db_path)?, true)
    }

    /// Same wiring over a private in-memory database.
    pub fn in_memory(settings: SyncSettings) -> Result<Self, Box<dyn std::error::Error>> {
        Self::with_database(settings, Database::open_in_memory()?, false)
    }

    fn with_database(
        settings: SyncSettings,
        db: Database,
        shared_file: bool,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let db = db.into_shared();
        let auth = Arc::new(LocalAuthProvider::new(db.clone(), settings.auth.clone()));

        match settings.storage.backend {
            StorageBackend::Sqlite => {
                let hub = Arc::new(LocalChangeFeed::new(settings.feed.channel_capacity));
                let repository = Arc::new(
                    SqliteBookmarkRepository::new(db.clone()).with_feed(hub.clone(), &settings.feed.collection),
                );
                let poller = if shared_file {
                    start_poller(&settings, db, hub.clone())
                } else {
                    None
                };
                let feed: Arc<dyn ChangeFeed> = hub;
                let mut app = Self::from_parts(settings, auth, repository, Some(feed));
                app.poller = poller;
                Ok(app)
            }
            StorageBackend::Rest => {
                let base = settings
                    .storage
                    .rest_url
                    .as_deref()
                    .ok_or("storage.rest_url is required for the rest backend")?;
                let key = settings.storage.api_key.as_deref().unwrap_or_default();
                let repository = Arc::new(RestBookmarkRepository::new(base, key, &settings.feed.collection)?);
                info!("rest backend has no change feed, live updates off");
                Ok(Self::from_parts(settings, auth, repository, None))
            }
        }
    }

    /// Assembles an app from explicit collaborators.
    pub fn from_parts(
        settings: SyncSettings,
        auth: Arc<dyn AuthProvider>,
        repository: Arc<dyn BookmarkRepository>,
        feed: Option<Arc<dyn ChangeFeed>>,
    ) -> Self {
        Self {
            settings,
            auth,
            repository,
            feed,
            poller: None,
        }
    }

    /// Whether another process's writes to the database file are being watched.
    pub fn is_polling(&self) -> bool {
        self.poller.as_ref().is_some_and(|p| !p.is_finished())
    }

    pub fn guard(&self) -> SessionGuard {
        SessionGuard::new(self.auth.clone())
    }

    pub fn landing(&self) -> Landing {
        Landing {
            guard: self.guard(),
            auth: self.auth.clone(),
            default_provider: self.settings.auth.provider.clone(),
        }
    }
}

impl Drop for App {
    fn drop(&mut self) {
        if let Some(poller) = self.poller.take() {
            poller.abort();
        }
    }
}

/// Watches the database file for commits from other processes.
///
/// Needs a running tokio runtime; without one, or with a zero interval, the
/// feed only hears this process's writes.
fn start_poller(settings: &SyncSettings, db: SharedDatabase, hub: Arc<LocalChangeFeed>) -> Option<JoinHandle<()>> {
    let every = settings.feed.poll_interval_ms;
    if every == 0 {
        return None;
    }
    if tokio::runtime::Handle::try_current().is_err() {
        debug!("no tokio runtime, cross-process polling off");
        return None;
    }
    Some(data_version::spawn_poller(
        db,
        hub,
        settings.feed.collection.clone(),
        Duration::from_millis(every),
    ))
}

/// The unauthenticated entry screen.
pub struct Landing {
    guard: SessionGuard,
    auth: Arc<dyn AuthProvider>,
    default_provider: String,
}

impl Landing {
    /// A visitor who already has a session goes straight to the dashboard.
    pub async fn check(&self) -> Route {
        match self.guard.check_session().await {
            SessionState::Authenticated(_) => Route::Dashboard,
            SessionState::Unauthenticated => Route::Landing,
        }
    }

    /// The single "log in" action. `None` uses the configured provider.
    pub async fn login(&self, provider: Option<&str>) -> Result<OAuthRedirect, AuthError> {
        let provider = provider.unwrap_or(&self.default_provider);
        self.auth.sign_in_with_oauth(provider).await
    }
}

/// A mounted dashboard view.
///
/// Owns a fresh store, the reconciler and gateway bound to it, and the feed
/// subscription. Dropping the dashboard closes the store before the
/// subscription is released, so no late callback or slow mutation can touch it.
pub struct Dashboard {
    session: Session,
    guard: SessionGuard,
    store: Arc<BookmarkStore>,
    reconciler: Arc<Reconciler>,
    gateway: MutationGateway,
    subscription: Option<FeedSubscription>,
    auth: Arc<dyn AuthProvider>,
}

impl Dashboard {
    /// Mounts the view for the current session.
    ///
    /// Subscribes before the initial fetch so a write landing in between is
    /// not missed. A failed subscription or initial fetch is logged and the
    /// view mounts anyway; `Err(AuthError::NotAuthenticated)` means redirect.
    pub async fn mount(app: &App) -> Result<Self, AuthError> {
        let session = app.guard().require_session().await?;

        let store = Arc::new(BookmarkStore::new());
        let reconciler = Arc::new(Reconciler::new(store.clone(), app.repository.clone()));
        let gateway = MutationGateway::new(app.repository.clone(), reconciler.clone());

        let subscription = match &app.feed {
            Some(feed) => match ChangeFeedListener::start(
                feed.clone(),
                &app.settings.feed.collection,
                reconciler.clone(),
                session.clone(),
            )
            .await
            {
                Ok(subscription) => Some(subscription),
                Err(e) => {
                    warn!(error = %e, "live updates unavailable");
                    None
                }
            },
            None => None,
        };

        if let Err(e) = reconciler.refresh(&session).await {
            warn!(error = %e, "initial bookmark fetch failed");
        }

        info!(user = %session.user.id, live = subscription.is_some(), "dashboard mounted");
        Ok(Self {
            session,
            guard: app.guard(),
            store,
            reconciler,
            gateway,
            subscription,
            auth: app.auth.clone(),
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn identity(&self) -> DisplayIdentity {
        self.session.display_identity()
    }

    pub fn bookmarks(&self) -> Snapshot {
        self.store.snapshot()
    }

    /// Render feed: yields every fully applied store state.
    pub fn watch(&self) -> watch::Receiver<Snapshot> {
        self.store.subscribe()
    }

    /// Whether the feed subscription is up and its listener still running.
    pub fn is_live(&self) -> bool {
        self.subscription.as_ref().is_some_and(|s| !s.is_finished())
    }

    /// Gateway bound to this view's store. Mutations that finish after the
    /// view unmounted still reach the backend but leave the closed store alone.
    pub fn gateway(&self) -> MutationGateway {
        self.gateway.clone()
    }

    /// Whether `session` belongs to the user this view was mounted for.
    pub fn is_owned_by(&self, session: &Session) -> bool {
        session.owner_id() == self.session.owner_id()
    }

    /// Re-reads the session before a mutation. A signed-out, expired or
    /// different user gets `NotAuthenticated`.
    async fn authorized(&self) -> Result<Session, BookmarkError> {
        let current = self.guard.require_session().await?;
        if !self.is_owned_by(&current) {
            warn!(mounted = %self.session.user.id, current = %current.user.id, "session changed under mounted view");
            return Err(AuthError::NotAuthenticated.into());
        }
        Ok(current)
    }

    pub async fn create(&self, title: &str, url: &str) -> Result<Bookmark, BookmarkError> {
        let session = self.authorized().await?;
        self.gateway.create(&session, title, url).await
    }

    pub async fn delete(&self, id: &str) -> Result<(), BookmarkError> {
        let session = self.authorized().await?;
        self.gateway.delete(&session, id).await
    }

    /// Manual full refresh, same path as a feed signal.
    pub async fn refresh(&self) -> Result<bool, BookmarkError> {
        self.reconciler.refresh(&self.session).await
    }

    /// Signs out and tears the view down.
    pub async fn logout(self) -> Result<Route, AuthError> {
        let auth = self.auth.clone();
        self.unmount();
        auth.sign_out().await?;
        Ok(Route::Landing)
    }

    pub fn unmount(self) {
        drop(self);
    }
}

impl Drop for Dashboard {
    fn drop(&mut self) {
        self.store.close();
        if let Some(subscription) = self.subscription.take() {
            subscription.cancel();
        }
        info!(user = %self.session.user.id, "dashboard unmounted");
    }
}
