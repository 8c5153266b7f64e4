use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// An authenticated user as reported by the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
}

/// Bearer token for the active session. Wiped from memory on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// Explicit session value handed to every component that needs identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user: User,
    pub access_token: AccessToken,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn owner_id(&self) -> &str {
        &self.user.id
    }

    pub fn display_identity(&self) -> DisplayIdentity {
        DisplayIdentity::for_user(&self.user)
    }
}

/// Outcome of a session check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Authenticated(Session),
    Unauthenticated,
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated(_))
    }
}

/// What the dashboard header shows for a user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DisplayIdentity {
    pub label: String,
    pub avatar: Avatar,
}

/// Avatar rendering choice.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Avatar {
    Image(String),
    Initial(char),
}

impl DisplayIdentity {
    /// Avatar falls back: image, initial of name, initial of email, then `?`.
    pub fn for_user(user: &User) -> Self {
        let name = non_empty(&user.name);
        let email = non_empty(&user.email);

        let avatar = match non_empty(&user.avatar_url) {
            Some(url) => Avatar::Image(url.to_string()),
            None => Avatar::Initial(
                name.and_then(|n| n.chars().next())
                    .or_else(|| email.and_then(|e| e.chars().next()))
                    .unwrap_or('?'),
            ),
        };

        let label = name.or(email).unwrap_or_default().to_string();

        Self { label, avatar }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

/// Where the caller must send the user to start an OAuth sign-in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OAuthRedirect {
    pub provider: String,
    pub url: String,
}
