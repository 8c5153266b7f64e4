use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A bookmark as confirmed by the system of record.
///
/// `id` and `created_at` are assigned by the backend; the client never guesses them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Bookmark {
    pub id: String,
    pub title: String,
    pub url: String,
    #[serde(rename = "user_id")]
    pub owner: String,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a bookmark that does not exist yet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewBookmark {
    pub title: String,
    pub url: String,
    #[serde(rename = "user_id")]
    pub owner: String,
}
