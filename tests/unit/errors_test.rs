//! Unit tests for the syncmarks error types: Display output and conversions.

use std::error::Error;

use rstest::rstest;
use syncmarks::types::errors::{
    AuthError, BookmarkError, SettingsError, StorageError, SubscriptionError, ValidationError,
};

#[rstest]
#[case(ValidationError::EmptyTitle, "Title is required")]
#[case(ValidationError::EmptyUrl, "URL is required")]
fn test_validation_error_display(#[case] err: ValidationError, #[case] expected: &str) {
    assert_eq!(err.to_string(), expected);
}

#[test]
fn test_auth_error_display() {
    assert_eq!(AuthError::NotAuthenticated.to_string(), "Not authenticated");
    assert_eq!(
        AuthError::ProviderError("timeout".into()).to_string(),
        "Identity provider error: timeout"
    );
    assert_eq!(
        AuthError::DatabaseError("locked".into()).to_string(),
        "Session database error: locked"
    );
}

#[test]
fn test_storage_error_display() {
    assert_eq!(StorageError::NotFound("b1".into()).to_string(), "Bookmark not found: b1");
    assert_eq!(
        StorageError::DatabaseError("disk full".into()).to_string(),
        "Storage database error: disk full"
    );
    assert_eq!(
        StorageError::NetworkError("refused".into()).to_string(),
        "Storage network error: refused"
    );
    assert_eq!(
        StorageError::InvalidResponse("not json".into()).to_string(),
        "Invalid storage response: not json"
    );
}

#[test]
fn test_bookmark_error_display() {
    assert_eq!(
        BookmarkError::Validation(ValidationError::EmptyTitle).to_string(),
        "Invalid bookmark: Title is required"
    );
    assert_eq!(BookmarkError::NotInStore("b9".into()).to_string(), "Bookmark not in store: b9");
    assert_eq!(
        BookmarkError::RemoteWrite("denied".into()).to_string(),
        "Bookmark write failed: denied"
    );
    assert_eq!(
        BookmarkError::RemoteDelete("denied".into()).to_string(),
        "Bookmark delete failed: denied"
    );
    assert_eq!(BookmarkError::Fetch("offline".into()).to_string(), "Bookmark fetch failed: offline");
}

#[test]
fn test_validation_converts_into_bookmark_error_with_source() {
    let err: BookmarkError = ValidationError::EmptyUrl.into();
    assert!(matches!(err, BookmarkError::Validation(ValidationError::EmptyUrl)));
    let source = err.source().expect("validation errors keep their source");
    assert_eq!(source.to_string(), "URL is required");
    assert!(BookmarkError::Fetch("x".into()).source().is_none());
}

#[test]
fn test_auth_converts_into_bookmark_error_with_source() {
    let err: BookmarkError = AuthError::NotAuthenticated.into();
    assert_eq!(err.to_string(), "Not authenticated");
    let source = err.source().expect("auth errors keep their source");
    assert_eq!(source.to_string(), "Not authenticated");
}

#[test]
fn test_subscription_error_display() {
    assert_eq!(
        SubscriptionError::ConnectFailed("refused".into()).to_string(),
        "Feed subscription failed: refused"
    );
    assert_eq!(
        SubscriptionError::Closed("bookmarks".into()).to_string(),
        "Feed channel closed: bookmarks"
    );
}

#[test]
fn test_settings_error_display() {
    assert_eq!(SettingsError::IoError("x".into()).to_string(), "Settings I/O error: x");
    assert_eq!(
        SettingsError::SerializationError("x".into()).to_string(),
        "Settings serialization error: x"
    );
    assert_eq!(SettingsError::InvalidKey("x".into()).to_string(), "Invalid settings key: x");
    assert_eq!(SettingsError::InvalidValue("x".into()).to_string(), "Invalid settings value: x");
}

#[test]
fn test_errors_are_boxable() {
    let errors: Vec<Box<dyn Error>> = vec![
        Box::new(AuthError::NotAuthenticated),
        Box::new(StorageError::NotFound("a".into())),
        Box::new(BookmarkError::Fetch("b".into())),
        Box::new(SubscriptionError::Closed("c".into())),
        Box::new(SettingsError::IoError("d".into())),
    ];
    assert!(errors.iter().all(|e| !e.to_string().is_empty()));
}
