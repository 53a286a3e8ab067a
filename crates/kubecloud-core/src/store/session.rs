// ── Session store ──
//
// Holds the authenticated identity and session token. Login, registration
// and profile updates persist both to durable storage under the `user`
// and `token` keys; logout and any failed token refresh purge both.

use std::sync::{Arc, PoisonError, RwLock};

use kubecloud_api::Envelope;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::state::{StateCell, StoreState};
use crate::error::CoreError;
use crate::gateway::{Gateway, RequestOptions};
use crate::model::{ProfileUpdate, Registration, User};
use crate::storage::KeyValueStore;

/// Storage key holding the JSON-serialized [`User`].
pub const USER_KEY: &str = "user";
/// Storage key holding the JSON-serialized session token string.
pub const TOKEN_KEY: &str = "token";

#[derive(Deserialize)]
struct AuthPayload {
    user: User,
    token: String,
}

#[derive(Deserialize)]
struct TokenPayload {
    token: String,
}

/// Reactive store of the current session.
///
/// Cheaply cloneable; clones share state.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    gateway: Gateway,
    storage: Arc<dyn KeyValueStore>,
    user: watch::Sender<Option<Arc<User>>>,
    token: RwLock<Option<SecretString>>,
    state: StateCell,
}

impl SessionStore {
    pub fn new(gateway: Gateway, storage: Arc<dyn KeyValueStore>) -> Self {
        let (user, _) = watch::channel(None);
        Self {
            inner: Arc::new(SessionInner {
                gateway,
                storage,
                user,
                token: RwLock::new(None),
                state: StateCell::new(),
            }),
        }
    }

    // ── Actions ──────────────────────────────────────────────────────

    /// Authenticate and persist the session. Stored keys are left
    /// untouched on failure.
    pub async fn login(&self, email: &str, password: &SecretString) -> Result<Arc<User>, CoreError> {
        let body = json!({ "email": email, "password": password.expose_secret() });
        self.authenticate("/auth/login", &body).await
    }

    /// Create an account and start a session for it.
    pub async fn register(&self, registration: &Registration) -> Result<Arc<User>, CoreError> {
        let body = json!({
            "name": registration.name,
            "email": registration.email,
            "password": registration.password.expose_secret(),
        });
        self.authenticate("/auth/register", &body).await
    }

    /// Drop the session and purge both storage keys.
    pub fn logout(&self) -> Result<(), CoreError> {
        let inner = &self.inner;
        let had_session = inner.user.send_replace(None).is_some();
        *inner.token.write().unwrap_or_else(PoisonError::into_inner) = None;
        inner.storage.remove(USER_KEY)?;
        inner.storage.remove(TOKEN_KEY)?;
        if had_session {
            info!("logged out");
        }
        Ok(())
    }

    /// Exchange the current token for a fresh one.
    ///
    /// Any failure, including a missing token, ends the session with a
    /// full [`logout`](Self::logout) before the error is returned.
    pub async fn refresh_token(&self) -> Result<(), CoreError> {
        let inner = &self.inner;
        let _loading = inner.state.begin();

        let result = match self.token() {
            Some(token) => inner
                .gateway
                .post::<Envelope<TokenPayload>, _>(
                    "/auth/refresh",
                    &json!({ "token": token.expose_secret() }),
                    RequestOptions::default(),
                )
                .await
                .map(|resp| resp.into_payload().token),
            None => Err(CoreError::Session {
                message: "No active session".into(),
            }),
        };

        let fresh = match result.and_then(|token| {
            inner.storage.set(TOKEN_KEY, &serde_json::to_string(&token)?)?;
            Ok(token)
        }) {
            Ok(token) => token,
            Err(err) => {
                warn!(error = %err, "token refresh failed, ending session");
                inner.state.record_error(err.to_string());
                if let Err(purge_err) = self.logout() {
                    warn!(error = %purge_err, "could not purge session after failed refresh");
                }
                return Err(err);
            }
        };

        *inner.token.write().unwrap_or_else(PoisonError::into_inner) =
            Some(SecretString::from(fresh));
        debug!("session token refreshed");
        Ok(())
    }

    /// Merge `update` into the current profile and persist it.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<Arc<User>, CoreError> {
        let inner = &self.inner;
        let Some(current) = self.current_user() else {
            return Err(CoreError::Session {
                message: "Not logged in".into(),
            });
        };
        let _loading = inner.state.begin();

        let result = inner
            .gateway
            .put::<Envelope<User>, _>(
                &format!("/users/{}", current.id),
                update,
                RequestOptions::default(),
            )
            .await
            .and_then(|resp| {
                let user = resp.into_payload();
                self.persist_user(&user)?;
                Ok(user)
            });

        let user = Arc::new(self.settle(result)?);
        inner.user.send_replace(Some(Arc::clone(&user)));
        info!(id = %user.id, "profile updated");
        Ok(user)
    }

    /// Reload the session persisted by a previous run.
    ///
    /// Missing keys yield `Ok(None)`. Corrupt or partial data purges both
    /// keys and also yields `Ok(None)`; only storage I/O errors propagate.
    pub fn restore(&self) -> Result<Option<Arc<User>>, CoreError> {
        let inner = &self.inner;
        let stored_user = inner.storage.get(USER_KEY)?;
        let stored_token = inner.storage.get(TOKEN_KEY)?;

        let (user_json, token_json) = match (stored_user, stored_token) {
            (None, None) => return Ok(None),
            (Some(user), Some(token)) => (user, token),
            _ => {
                warn!("partial session in storage, purging");
                self.logout()?;
                return Ok(None);
            }
        };

        let decoded = serde_json::from_str::<User>(&user_json)
            .and_then(|user| serde_json::from_str::<String>(&token_json).map(|t| (user, t)));
        let (user, token) = match decoded {
            Ok(parts) => parts,
            Err(e) => {
                warn!(error = %e, "corrupt session in storage, purging");
                self.logout()?;
                return Ok(None);
            }
        };

        let user = Arc::new(user);
        *inner.token.write().unwrap_or_else(PoisonError::into_inner) =
            Some(SecretString::from(token));
        inner.user.send_replace(Some(Arc::clone(&user)));
        debug!(id = %user.id, "session restored");
        Ok(Some(user))
    }

    // ── Views ────────────────────────────────────────────────────────

    pub fn current_user(&self) -> Option<Arc<User>> {
        self.inner.user.borrow().clone()
    }

    pub fn is_logged_in(&self) -> bool {
        self.inner.user.borrow().is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.inner
            .user
            .borrow()
            .as_ref()
            .is_some_and(|user| user.is_admin())
    }

    pub fn token(&self) -> Option<SecretString> {
        self.inner
            .token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn state(&self) -> StoreState {
        self.inner.state.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<User>>> {
        self.inner.user.subscribe()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<StoreState> {
        self.inner.state.subscribe()
    }

    // ── Internals ────────────────────────────────────────────────────

    async fn authenticate(
        &self,
        endpoint: &str,
        body: &serde_json::Value,
    ) -> Result<Arc<User>, CoreError> {
        let inner = &self.inner;
        let _loading = inner.state.begin();

        let result = inner
            .gateway
            .post::<Envelope<AuthPayload>, _>(endpoint, body, RequestOptions::default())
            .await
            .and_then(|resp| {
                let payload = resp.into_payload();
                self.persist_session(&payload.user, &payload.token)?;
                Ok(payload)
            });
        let AuthPayload { user, token } = self.settle(result)?;

        let user = Arc::new(user);
        *inner.token.write().unwrap_or_else(PoisonError::into_inner) =
            Some(SecretString::from(token));
        inner.user.send_replace(Some(Arc::clone(&user)));
        info!(id = %user.id, email = %user.email, role = %user.role, "session started");
        Ok(user)
    }

    /// Write both keys, or neither: a failed token write puts the
    /// previous `user` value back.
    fn persist_session(&self, user: &User, token: &str) -> Result<(), CoreError> {
        let storage = &self.inner.storage;
        let user_json = serde_json::to_string(user)?;
        let token_json = serde_json::to_string(token)?;
        let previous = storage.get(USER_KEY)?;

        storage.set(USER_KEY, &user_json)?;
        if let Err(err) = storage.set(TOKEN_KEY, &token_json) {
            let rollback = match previous {
                Some(ref value) => storage.set(USER_KEY, value),
                None => storage.remove(USER_KEY),
            };
            if let Err(rollback_err) = rollback {
                warn!(error = %rollback_err, "could not roll back user key");
            }
            return Err(err);
        }
        Ok(())
    }

    fn persist_user(&self, user: &User) -> Result<(), CoreError> {
        self.inner
            .storage
            .set(USER_KEY, &serde_json::to_string(user)?)
    }

    fn settle<T>(&self, result: Result<T, CoreError>) -> Result<T, CoreError> {
        result.inspect_err(|err| self.inner.state.record_error(err.to_string()))
    }
}
