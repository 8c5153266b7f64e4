//! Session Guard.
//!
//! Pure boundary check: reads the current session from the auth collaborator
//! and says whether the caller may touch bookmarks. It never creates or ends
//! a session.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use crate::services::auth::AuthProvider;
use crate::types::errors::AuthError;
use crate::types::session::{Session, SessionState};

#[derive(Clone)]
pub struct SessionGuard {
    auth: Arc<dyn AuthProvider>,
}

impl SessionGuard {
    pub fn new(auth: Arc<dyn AuthProvider>) -> Self {
        Self { auth }
    }

    /// Provider failures and expired sessions both count as unauthenticated.
    pub async fn check_session(&self) -> SessionState {
        match self.auth.get_session().await {
            Ok(Some(session)) if !session.is_expired_at(Utc::now()) => {
                debug!(user = %session.user.id, "session valid");
                SessionState::Authenticated(session)
            }
            Ok(Some(session)) => {
                debug!(user = %session.user.id, "session expired");
                SessionState::Unauthenticated
            }
            Ok(None) => SessionState::Unauthenticated,
            Err(e) => {
                warn!(error = %e, "session check failed");
                SessionState::Unauthenticated
            }
        }
    }

    /// Like [`check_session`](Self::check_session), for callers that must
    /// redirect on `Err(AuthError::NotAuthenticated)`.
    pub async fn require_session(&self) -> Result<Session, AuthError> {
        match self.check_session().await {
            SessionState::Authenticated(session) => Ok(session),
            SessionState::Unauthenticated => Err(AuthError::NotAuthenticated),
        }
    }
}
