#![allow(clippy::unwrap_used)]
// Session persistence and token lifecycle against the simulated backend.

use std::sync::Arc;
use std::time::Duration;

use kubecloud_api::{MockBackend, MockConfig};
use kubecloud_core::store::{TOKEN_KEY, USER_KEY};
use kubecloud_core::{
    CoreError, Gateway, KeyValueStore, MemoryStorage, NotificationLedger, ProfileUpdate,
    Registration, SessionStore, UserRole,
};
use pretty_assertions::assert_eq;
use secrecy::{ExposeSecret, SecretString};

// ── Helpers ─────────────────────────────────────────────────────────

fn gateway() -> Gateway {
    Gateway::new(
        MockBackend::new(MockConfig::instant()).into(),
        NotificationLedger::new(Duration::from_millis(5000)),
        Duration::from_millis(10_000),
        Duration::from_millis(8000),
    )
}

fn session() -> (SessionStore, Arc<MemoryStorage>) {
    let storage = Arc::new(MemoryStorage::new());
    (SessionStore::new(gateway(), storage.clone()), storage)
}

fn password() -> SecretString {
    SecretString::from("Str0ng!pass".to_owned())
}

fn stored(storage: &MemoryStorage, key: &str) -> Option<String> {
    storage.get(key).unwrap()
}

/// Memory storage that rejects writes to one key, and optionally every
/// removal.
#[derive(Default)]
struct FailingStorage {
    entries: MemoryStorage,
    reject_set: Option<&'static str>,
    reject_remove: bool,
}

impl KeyValueStore for FailingStorage {
    fn get(&self, key: &str) -> Result<Option<String>, CoreError> {
        self.entries.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CoreError> {
        if self.reject_set == Some(key) {
            return Err(CoreError::Storage {
                message: "disk full".into(),
            });
        }
        self.entries.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), CoreError> {
        if self.reject_remove {
            return Err(CoreError::Storage {
                message: "read-only".into(),
            });
        }
        self.entries.remove(key)
    }
}

// ── login / logout ──────────────────────────────────────────────────

#[tokio::test]
async fn login_persists_user_and_token() {
    let (session, storage) = session();

    let user = session.login("admin@kubecloud.com", &password()).await.unwrap();

    assert_eq!(user.role, UserRole::Admin);
    assert!(session.is_logged_in());
    assert!(session.is_admin());

    let token = session.token().unwrap();
    assert!(token.expose_secret().starts_with("mock-token-"));
    assert_eq!(
        stored(&storage, TOKEN_KEY).unwrap(),
        format!("\"{}\"", token.expose_secret())
    );
    let persisted: serde_json::Value =
        serde_json::from_str(&stored(&storage, USER_KEY).unwrap()).unwrap();
    assert_eq!(persisted["email"], "admin@kubecloud.com");
    assert!(!session.state().is_loading);
}

#[tokio::test]
async fn rejected_login_leaves_storage_untouched() {
    let (session, storage) = session();
    storage.set(USER_KEY, "previous").unwrap();

    let err = session.login("nouser@x.com", &password()).await.unwrap_err();

    assert_eq!(err.to_string(), "Invalid credentials");
    assert_eq!(err.upstream_status(), Some(401));
    assert!(!session.is_logged_in());
    assert_eq!(stored(&storage, USER_KEY).as_deref(), Some("previous"));
    assert_eq!(stored(&storage, TOKEN_KEY), None);
    assert_eq!(session.state().error.as_deref(), Some("Invalid credentials"));
}

#[tokio::test]
async fn logout_purges_both_keys() {
    let (session, storage) = session();
    session.login("user@kubecloud.com", &password()).await.unwrap();

    session.logout().unwrap();

    assert!(!session.is_logged_in());
    assert!(session.token().is_none());
    assert_eq!(stored(&storage, USER_KEY), None);
    assert_eq!(stored(&storage, TOKEN_KEY), None);

    // Logging out twice is harmless.
    session.logout().unwrap();
}

#[tokio::test]
async fn failed_token_write_restores_previous_user() {
    let storage = Arc::new(FailingStorage {
        reject_set: Some(TOKEN_KEY),
        ..FailingStorage::default()
    });
    storage.entries.set(USER_KEY, "previous").unwrap();
    let session = SessionStore::new(gateway(), storage.clone());

    let err = session.login("admin@kubecloud.com", &password()).await.unwrap_err();

    assert_eq!(err.to_string(), "Storage error: disk full");
    assert!(!session.is_logged_in());
    assert!(session.token().is_none());
    assert_eq!(stored(&storage.entries, USER_KEY).as_deref(), Some("previous"));
    assert_eq!(stored(&storage.entries, TOKEN_KEY), None);
}

#[tokio::test]
async fn failed_token_write_leaves_no_user_behind() {
    let storage = Arc::new(FailingStorage {
        reject_set: Some(TOKEN_KEY),
        ..FailingStorage::default()
    });
    let session = SessionStore::new(gateway(), storage.clone());

    session.login("admin@kubecloud.com", &password()).await.unwrap_err();

    assert_eq!(stored(&storage.entries, USER_KEY), None);
    assert!(session.restore().unwrap().is_none());
}

// ── restore ─────────────────────────────────────────────────────────

#[tokio::test]
async fn restore_picks_up_previous_session() {
    let storage = Arc::new(MemoryStorage::new());
    let first = SessionStore::new(gateway(), storage.clone());
    let user = first.login("dev@kubecloud.com", &password()).await.unwrap();

    let second = SessionStore::new(gateway(), storage.clone());
    let restored = second.restore().unwrap().unwrap();

    assert_eq!(*restored, *user);
    assert_eq!(
        second.token().unwrap().expose_secret(),
        first.token().unwrap().expose_secret()
    );
}

#[test]
fn restore_with_empty_storage_is_none() {
    let (session, _) = session();
    assert!(session.restore().unwrap().is_none());
    assert!(!session.is_logged_in());
}

#[test]
fn restore_purges_corrupt_user() {
    let (session, storage) = session();
    storage.set(USER_KEY, "{not json").unwrap();
    storage.set(TOKEN_KEY, "\"mock-token-abc\"").unwrap();

    assert!(session.restore().unwrap().is_none());
    assert_eq!(stored(&storage, USER_KEY), None);
    assert_eq!(stored(&storage, TOKEN_KEY), None);
}

#[test]
fn restore_purges_partial_session() {
    let (session, storage) = session();
    storage.set(TOKEN_KEY, "\"mock-token-abc\"").unwrap();

    assert!(session.restore().unwrap().is_none());
    assert_eq!(stored(&storage, TOKEN_KEY), None);
}

// ── refresh ─────────────────────────────────────────────────────────

#[tokio::test]
async fn refresh_rotates_token() {
    let (session, storage) = session();
    session.login("user@kubecloud.com", &password()).await.unwrap();
    let old = session.token().unwrap().expose_secret().to_owned();

    session.refresh_token().await.unwrap();

    let fresh = session.token().unwrap().expose_secret().to_owned();
    assert_ne!(fresh, old);
    assert_eq!(stored(&storage, TOKEN_KEY).unwrap(), format!("\"{fresh}\""));
    assert!(session.is_logged_in());
}

#[tokio::test]
async fn failed_refresh_ends_session() {
    let (session, storage) = session();
    let user = serde_json::json!({
        "id": "2",
        "name": "Regular User",
        "email": "user@kubecloud.com",
        "role": "user",
        "createdAt": "2024-02-01T09:00:00Z",
    });
    storage.set(USER_KEY, &user.to_string()).unwrap();
    storage.set(TOKEN_KEY, "\"bogus\"").unwrap();
    session.restore().unwrap().unwrap();

    let err = session.refresh_token().await.unwrap_err();

    assert_eq!(err.to_string(), "Invalid or expired token");
    assert!(!session.is_logged_in());
    assert_eq!(stored(&storage, USER_KEY), None);
    assert_eq!(stored(&storage, TOKEN_KEY), None);
}

#[tokio::test]
async fn failed_refresh_reports_refresh_error_when_purge_fails() {
    let storage = Arc::new(FailingStorage {
        reject_remove: true,
        ..FailingStorage::default()
    });
    let user = serde_json::json!({
        "id": "1",
        "name": "Admin User",
        "email": "admin@kubecloud.com",
        "role": "admin",
        "createdAt": "2024-01-01T00:00:00Z",
    });
    storage.entries.set(USER_KEY, &user.to_string()).unwrap();
    storage.entries.set(TOKEN_KEY, "\"bogus\"").unwrap();
    let session = SessionStore::new(gateway(), storage.clone());
    session.restore().unwrap().unwrap();

    let err = session.refresh_token().await.unwrap_err();

    assert_eq!(err.to_string(), "Invalid or expired token");
    assert!(!session.is_logged_in());
    assert!(session.token().is_none());
}

#[tokio::test]
async fn refresh_without_session_fails() {
    let (session, _) = session();
    let err = session.refresh_token().await.unwrap_err();
    assert!(matches!(err, CoreError::Session { .. }));
    assert_eq!(err.to_string(), "No active session");
}

// ── register / profile ──────────────────────────────────────────────

#[tokio::test]
async fn register_starts_session() {
    let (session, storage) = session();
    let registration = Registration {
        name: "New Person".into(),
        email: "new@kubecloud.com".into(),
        password: password(),
    };

    let user = session.register(&registration).await.unwrap();

    assert_eq!(user.role, UserRole::User);
    assert_eq!(user.name, "New Person");
    assert!(session.is_logged_in());
    assert!(stored(&storage, TOKEN_KEY).is_some());
}

#[tokio::test]
async fn register_existing_email_fails() {
    let (session, _) = session();
    let registration = Registration {
        name: "Dup".into(),
        email: "admin@kubecloud.com".into(),
        password: password(),
    };

    let err = session.register(&registration).await.unwrap_err();

    assert_eq!(err.to_string(), "Email already registered");
    assert_eq!(err.upstream_status(), Some(409));
    assert!(!session.is_logged_in());
}

#[tokio::test]
async fn update_profile_persists_merged_user() {
    let (session, storage) = session();
    session.login("user@kubecloud.com", &password()).await.unwrap();
    let mut updates = session.subscribe();

    let update = ProfileUpdate {
        name: Some("Renamed".into()),
        ..ProfileUpdate::default()
    };
    let user = session.update_profile(&update).await.unwrap();

    assert_eq!(user.name, "Renamed");
    assert_eq!(user.email, "user@kubecloud.com");
    assert!(updates.has_changed().unwrap());
    assert_eq!(updates.borrow_and_update().as_ref().unwrap().name, "Renamed");

    let persisted: serde_json::Value =
        serde_json::from_str(&stored(&storage, USER_KEY).unwrap()).unwrap();
    assert_eq!(persisted["name"], "Renamed");
}

#[tokio::test]
async fn update_profile_requires_login() {
    let (session, _) = session();
    let err = session
        .update_profile(&ProfileUpdate::default())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Not logged in");
}
