//! Unit tests for the Session Guard and the landing screen.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use syncmarks::app::{App, Route};
use syncmarks::database::Database;
use syncmarks::managers::session_guard::SessionGuard;
use syncmarks::services::auth::{AuthProvider, LocalAuthProvider};
use syncmarks::types::errors::AuthError;
use syncmarks::types::session::{Avatar, SessionState, User};
use syncmarks::types::settings::{AuthSettings, SyncSettings};

use common::{session, StaticAuth};

fn local_auth(ttl: u64) -> Arc<LocalAuthProvider> {
    let db = Database::open_in_memory().unwrap().into_shared();
    let settings = AuthSettings {
        session_ttl_secs: ttl,
        ..AuthSettings::default()
    };
    Arc::new(LocalAuthProvider::new(db, settings))
}

fn alice() -> User {
    User {
        id: "alice".to_string(),
        email: Some("alice@example.com".to_string()),
        name: Some("Alice".to_string()),
        avatar_url: None,
    }
}

#[tokio::test]
async fn test_no_session_is_unauthenticated() {
    let guard = SessionGuard::new(local_auth(3600));
    assert_eq!(guard.check_session().await, SessionState::Unauthenticated);
    assert!(matches!(guard.require_session().await, Err(AuthError::NotAuthenticated)));
}

#[tokio::test]
async fn test_signed_in_session_is_authenticated() {
    let auth = local_auth(3600);
    auth.complete_sign_in(alice()).await.unwrap();
    let guard = SessionGuard::new(auth.clone());

    let state = guard.check_session().await;
    assert!(state.is_authenticated());
    let session = guard.require_session().await.unwrap();
    assert_eq!(session.owner_id(), "alice");
    assert_eq!(session.access_token.expose().len(), 43);
}

#[tokio::test]
async fn test_expired_session_is_unauthenticated() {
    let auth = local_auth(0);
    auth.complete_sign_in(alice()).await.unwrap();
    let guard = SessionGuard::new(auth);
    assert_eq!(guard.check_session().await, SessionState::Unauthenticated);
}

#[tokio::test]
async fn test_sign_out_ends_session() {
    let auth = local_auth(3600);
    auth.complete_sign_in(alice()).await.unwrap();
    auth.sign_out().await.unwrap();
    assert_eq!(
        SessionGuard::new(auth).check_session().await,
        SessionState::Unauthenticated
    );
}

#[tokio::test]
async fn test_provider_failure_counts_as_unauthenticated() {
    let auth = StaticAuth::signed_in(session("bob"));
    auth.fail.store(true, Ordering::SeqCst);
    let guard = SessionGuard::new(auth);
    assert_eq!(guard.check_session().await, SessionState::Unauthenticated);
}

#[tokio::test]
async fn test_complete_sign_in_requires_user_id() {
    let auth = local_auth(3600);
    let mut user = alice();
    user.id = "  ".to_string();
    assert!(matches!(
        auth.complete_sign_in(user).await,
        Err(AuthError::ProviderError(_))
    ));
}

#[tokio::test]
async fn test_landing_routes_by_session() {
    let db = Database::open_in_memory().unwrap().into_shared();
    let auth = Arc::new(LocalAuthProvider::new(db, AuthSettings::default()));
    let app = App::from_parts(
        SyncSettings::default(),
        auth.clone(),
        common::backend().repository,
        common::backend().live_feed(),
    );

    assert_eq!(app.landing().check().await, Route::Landing);
    auth.complete_sign_in(alice()).await.unwrap();
    assert_eq!(app.landing().check().await, Route::Dashboard);
}

#[tokio::test]
async fn test_login_uses_configured_provider_by_default() {
    let app = App::in_memory(SyncSettings::default()).unwrap();

    let redirect = app.landing().login(None).await.unwrap();
    assert_eq!(redirect.provider, "google");
    assert!(redirect.url.contains("provider=google"));
    assert!(redirect.url.contains("redirect_to="));

    let redirect = app.landing().login(Some("github")).await.unwrap();
    assert_eq!(redirect.provider, "github");
    assert!(app.landing().login(Some("")).await.is_err());
}

#[tokio::test]
async fn test_identity_falls_back_to_name_initial() {
    let auth = local_auth(3600);
    let session = auth.complete_sign_in(alice()).await.unwrap();
    let identity = session.display_identity();
    assert_eq!(identity.label, "Alice");
    assert_eq!(identity.avatar, Avatar::Initial('A'));
}
