use std::fmt;

// === ValidationError ===

/// Input rejected before anything is sent to the system of record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The title was empty or whitespace.
    EmptyTitle,
    /// The URL was empty or whitespace.
    EmptyUrl,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyTitle => write!(f, "Title is required"),
            ValidationError::EmptyUrl => write!(f, "URL is required"),
        }
    }
}

impl std::error::Error for ValidationError {}

// === AuthError ===

/// Errors related to session checks and sign-in.
#[derive(Debug)]
pub enum AuthError {
    /// No valid session; the caller must redirect to the landing screen.
    NotAuthenticated,
    /// The identity provider failed or rejected the request.
    ProviderError(String),
    /// Session persistence failed.
    DatabaseError(String),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::NotAuthenticated => write!(f, "Not authenticated"),
            AuthError::ProviderError(msg) => write!(f, "Identity provider error: {}", msg),
            AuthError::DatabaseError(msg) => write!(f, "Session database error: {}", msg),
        }
    }
}

impl std::error::Error for AuthError {}

// === StorageError ===

/// Errors reported by the system of record.
#[derive(Debug)]
pub enum StorageError {
    /// No bookmark with the given ID is visible to the caller.
    NotFound(String),
    /// Database operation failed.
    DatabaseError(String),
    /// The remote backend could not be reached.
    NetworkError(String),
    /// The remote backend answered with something unusable.
    InvalidResponse(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::NotFound(id) => write!(f, "Bookmark not found: {}", id),
            StorageError::DatabaseError(msg) => write!(f, "Storage database error: {}", msg),
            StorageError::NetworkError(msg) => write!(f, "Storage network error: {}", msg),
            StorageError::InvalidResponse(msg) => {
                write!(f, "Invalid storage response: {}", msg)
            }
        }
    }
}

impl std::error::Error for StorageError {}

// === BookmarkError ===

/// Errors surfaced by bookmark mutations and refreshes.
#[derive(Debug)]
pub enum BookmarkError {
    /// Input failed validation; nothing was sent.
    Validation(ValidationError),
    /// The bookmark is not in the local store, so it cannot be deleted.
    NotInStore(String),
    /// The system of record rejected the create.
    RemoteWrite(String),
    /// The system of record rejected the delete.
    RemoteDelete(String),
    /// Fetching the canonical collection failed.
    Fetch(String),
    /// The session ended or changed hands; the caller must redirect.
    Auth(AuthError),
}

impl fmt::Display for BookmarkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookmarkError::Validation(err) => write!(f, "Invalid bookmark: {}", err),
            BookmarkError::NotInStore(id) => write!(f, "Bookmark not in store: {}", id),
            BookmarkError::RemoteWrite(msg) => write!(f, "Bookmark write failed: {}", msg),
            BookmarkError::RemoteDelete(msg) => write!(f, "Bookmark delete failed: {}", msg),
            BookmarkError::Fetch(msg) => write!(f, "Bookmark fetch failed: {}", msg),
            BookmarkError::Auth(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for BookmarkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BookmarkError::Validation(err) => Some(err),
            BookmarkError::Auth(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for BookmarkError {
    fn from(err: ValidationError) -> Self {
        BookmarkError::Validation(err)
    }
}

impl From<AuthError> for BookmarkError {
    fn from(err: AuthError) -> Self {
        BookmarkError::Auth(err)
    }
}

// === SubscriptionError ===

/// Errors related to the change feed connection. Not retried automatically.
#[derive(Debug)]
pub enum SubscriptionError {
    /// The subscription could not be established.
    ConnectFailed(String),
    /// The feed closed the channel.
    Closed(String),
}

impl fmt::Display for SubscriptionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubscriptionError::ConnectFailed(msg) => {
                write!(f, "Feed subscription failed: {}", msg)
            }
            SubscriptionError::Closed(collection) => {
                write!(f, "Feed channel closed: {}", collection)
            }
        }
    }
}

impl std::error::Error for SubscriptionError {}

// === SettingsError ===

/// Errors related to settings management.
#[derive(Debug)]
pub enum SettingsError {
    /// An I/O error occurred while reading or writing settings.
    IoError(String),
    /// Failed to serialize or deserialize settings.
    SerializationError(String),
    /// The provided settings key is invalid.
    InvalidKey(String),
    /// The provided settings value is invalid.
    InvalidValue(String),
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::IoError(msg) => write!(f, "Settings I/O error: {}", msg),
            SettingsError::SerializationError(msg) => {
                write!(f, "Settings serialization error: {}", msg)
            }
            SettingsError::InvalidKey(key) => write!(f, "Invalid settings key: {}", key),
            SettingsError::InvalidValue(msg) => {
                write!(f, "Invalid settings value: {}", msg)
            }
        }
    }
}

impl std::error::Error for SettingsError {}
