//! Auth collaborator.
//!
//! [`AuthProvider`] is the identity-provider surface the session guard and the
//! landing screen need. [`LocalAuthProvider`] persists the signed-in session in
//! SQLite and issues random bearer tokens; the OAuth hop itself happens in the
//! user's browser, so sign-in only produces the authorize redirect and
//! [`AuthProvider::complete_sign_in`] plays the callback.

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use ring::rand::{SecureRandom, SystemRandom};
use rusqlite::params;
use tracing::info;
use url::Url;

use crate::database::connection::{self, SharedDatabase};
use crate::types::errors::AuthError;
use crate::types::session::{AccessToken, OAuthRedirect, Session, User};
use crate::types::settings::AuthSettings;

const TOKEN_BYTES: usize = 32;

#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// The stored session, if any. Expiry is the caller's concern.
    async fn get_session(&self) -> Result<Option<Session>, AuthError>;
    async fn get_user(&self) -> Result<Option<User>, AuthError>;
    /// Starts an OAuth sign-in and returns where to send the user.
    async fn sign_in_with_oauth(&self, provider: &str) -> Result<OAuthRedirect, AuthError>;
    /// OAuth callback: turns the provider's user into a session.
    async fn complete_sign_in(&self, user: User) -> Result<Session, AuthError>;
    async fn sign_out(&self) -> Result<(), AuthError>;
}

/// SQLite-backed auth provider.
pub struct LocalAuthProvider {
    db: SharedDatabase,
    settings: AuthSettings,
    rng: SystemRandom,
}

impl LocalAuthProvider {
    pub fn new(db: SharedDatabase, settings: AuthSettings) -> Self {
        Self {
            db,
            settings,
            rng: SystemRandom::new(),
        }
    }

    fn issue_token(&self) -> Result<AccessToken, AuthError> {
        let mut bytes = [0u8; TOKEN_BYTES];
        self.rng
            .fill(&mut bytes)
            .map_err(|_| AuthError::ProviderError("token generation failed".to_string()))?;
        Ok(AccessToken::new(URL_SAFE_NO_PAD.encode(bytes)))
    }

    fn authorize_url(&self, provider: &str) -> Result<Url, AuthError> {
        let mut url = Url::parse(&self.settings.authorize_url).map_err(|e| {
            AuthError::ProviderError(format!("invalid authorize url {}: {}", self.settings.authorize_url, e))
        })?;
        url.query_pairs_mut()
            .append_pair("provider", provider)
            .append_pair("redirect_to", &self.settings.redirect_url);
        Ok(url)
    }
}

fn db_err(e: impl std::fmt::Display) -> AuthError {
    AuthError::DatabaseError(e.to_string())
}

#[async_trait]
impl AuthProvider for LocalAuthProvider {
    async fn get_session(&self) -> Result<Option<Session>, AuthError> {
        let db = connection::lock(&self.db).map_err(db_err)?;
        let result = db.connection().query_row(
            "SELECT user_id, email, name, avatar_url, access_token, expires_at \
             FROM auth_sessions WHERE id = 'current'",
            [],
            |row| {
                let expires_at: i64 = row.get(5)?;
                Ok((
                    User {
                        id: row.get(0)?,
                        email: row.get(1)?,
                        name: row.get(2)?,
                        avatar_url: row.get(3)?,
                    },
                    row.get::<_, String>(4)?,
                    expires_at,
                ))
            },
        );

        match result {
            Ok((user, token, expires_at)) => {
                let expires_at = DateTime::from_timestamp(expires_at, 0).unwrap_or(DateTime::<Utc>::MIN_UTC);
                Ok(Some(Session {
                    user,
                    access_token: AccessToken::new(token),
                    expires_at,
                }))
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(db_err(e)),
        }
    }

    async fn get_user(&self) -> Result<Option<User>, AuthError> {
        Ok(self.get_session().await?.map(|s| s.user))
    }

    async fn sign_in_with_oauth(&self, provider: &str) -> Result<OAuthRedirect, AuthError> {
        let provider = provider.trim();
        if provider.is_empty() {
            return Err(AuthError::ProviderError("provider is required".to_string()));
        }
        let url = self.authorize_url(provider)?;
        info!(provider, "oauth sign-in started");
        Ok(OAuthRedirect {
            provider: provider.to_string(),
            url: url.to_string(),
        })
    }

    async fn complete_sign_in(&self, user: User) -> Result<Session, AuthError> {
        if user.id.trim().is_empty() {
            return Err(AuthError::ProviderError("user id is required".to_string()));
        }
        let token = self.issue_token()?;
        let ttl = i64::try_from(self.settings.session_ttl_secs).unwrap_or(i64::MAX);
        let expires_at = Utc::now()
            .checked_add_signed(Duration::seconds(ttl.min(i64::MAX / 1000)))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        // stored with second precision
        let expires_at = DateTime::from_timestamp(expires_at.timestamp(), 0).unwrap_or(expires_at);

        {
            let db = connection::lock(&self.db).map_err(db_err)?;
            db.connection()
                .execute(
                    "INSERT OR REPLACE INTO auth_sessions \
                     (id, user_id, email, name, avatar_url, access_token, expires_at) \
                     VALUES ('current', ?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        user.id,
                        user.email,
                        user.name,
                        user.avatar_url,
                        token.expose(),
                        expires_at.timestamp()
                    ],
                )
                .map_err(db_err)?;
        }

        info!(user = %user.id, "signed in");
        Ok(Session {
            user,
            access_token: token,
            expires_at,
        })
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        let db = connection::lock(&self.db).map_err(db_err)?;
        db.connection()
            .execute("DELETE FROM auth_sessions", [])
            .map_err(db_err)?;
        info!("signed out");
        Ok(())
    }
}
