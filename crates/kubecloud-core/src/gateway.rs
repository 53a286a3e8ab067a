// ── Async request gateway ──
//
// Wraps every backend call with a deadline, normalizes failures into
// `CoreError`, and pushes loading / success / error notifications into
// the ledger. The deadline timer is disarmed on every path before the
// outcome is returned.

use std::sync::Arc;
use std::time::Duration;

use kubecloud_api::{ApiResponse, Backend, Deadline, Method, Request};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::notifications::{NotificationId, NotificationLedger, NotificationOptions};

const SUCCESS_MESSAGE: &str = "Success";
const DEFAULT_ERROR_TITLE: &str = "Error";

/// Per-request options. `Default` is a GET with notifications enabled and
/// no loading or success message.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
    /// Overrides the gateway's default deadline.
    pub timeout: Option<Duration>,
    /// Master switch for all notifications this request may emit.
    pub show_notifications: bool,
    /// Shown as a persistent info notification while the call is pending.
    pub loading_message: Option<String>,
    /// Shown as a success notification when the call succeeds.
    pub success_message: Option<String>,
    /// Title of the error notification (defaults to "Error").
    pub error_message: Option<String>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: Method::Get,
            headers: Vec::new(),
            body: None,
            timeout: None,
            show_notifications: true,
            loading_message: None,
            success_message: None,
            error_message: None,
        }
    }
}

impl RequestOptions {
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Suppress every notification for this request.
    pub fn quiet(mut self) -> Self {
        self.show_notifications = false;
        self
    }

    pub fn loading(mut self, message: impl Into<String>) -> Self {
        self.loading_message = Some(message.into());
        self
    }

    pub fn success(mut self, message: impl Into<String>) -> Self {
        self.success_message = Some(message.into());
        self
    }

    pub fn error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }
}

/// The network-call abstraction shared by every store.
///
/// Cheaply cloneable via `Arc<GatewayInner>`.
#[derive(Clone)]
pub struct Gateway {
    inner: Arc<GatewayInner>,
}

struct GatewayInner {
    backend: Backend,
    ledger: NotificationLedger,
    default_timeout: Duration,
    error_duration: Duration,
}

impl Gateway {
    pub fn new(
        backend: Backend,
        ledger: NotificationLedger,
        default_timeout: Duration,
        error_duration: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(GatewayInner {
                backend,
                ledger,
                default_timeout,
                error_duration,
            }),
        }
    }

    pub fn ledger(&self) -> &NotificationLedger {
        &self.inner.ledger
    }

    pub fn is_mock(&self) -> bool {
        self.inner.backend.is_mock()
    }

    pub fn default_timeout(&self) -> Duration {
        self.inner.default_timeout
    }

    /// Perform one request and decode its body as `T`.
    ///
    /// On success returns `{ data, status, message: "Success" }`. Every
    /// failure (HTTP status, transport, decode, deadline) is normalized;
    /// deadline expiry surfaces as [`CoreError::Timeout`].
    pub async fn request<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<ApiResponse<T>, CoreError> {
        let inner = &self.inner;
        let notify = options.show_notifications;

        let loading = LoadingGuard {
            ledger: &inner.ledger,
            id: options
                .loading_message
                .as_deref()
                .filter(|_| notify)
                .map(|msg| {
                    inner
                        .ledger
                        .info("Loading", msg, NotificationOptions::persistent())
                }),
        };

        let request = Request {
            method: options.method,
            endpoint: endpoint.to_owned(),
            headers: options.headers,
            body: options.body,
        };
        let timeout = options.timeout.unwrap_or(inner.default_timeout);
        debug!(method = %request.method, endpoint, ?timeout, "dispatching request");

        let deadline = Deadline::start(timeout);
        let outcome = deadline
            .run(inner.backend.dispatch(&request))
            .await
            .and_then(|raw| raw.decode::<T>());
        deadline.clear();
        drop(loading);

        match outcome {
            Ok((status, data)) => {
                debug!(method = %request.method, endpoint, status, "request succeeded");
                if notify {
                    if let Some(message) = options.success_message {
                        inner
                            .ledger
                            .success(SUCCESS_MESSAGE, message, NotificationOptions::default());
                    }
                }
                Ok(ApiResponse {
                    data,
                    status,
                    message: SUCCESS_MESSAGE.to_owned(),
                })
            }
            Err(err) => {
                let err = CoreError::from(err);
                warn!(method = %request.method, endpoint, error = %err, "request failed");
                if notify {
                    inner.ledger.error(
                        options
                            .error_message
                            .unwrap_or_else(|| DEFAULT_ERROR_TITLE.to_owned()),
                        err.to_string(),
                        NotificationOptions::duration(inner.error_duration),
                    );
                }
                Err(err)
            }
        }
    }

    // ── Convenience methods ──────────────────────────────────────────

    pub async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<ApiResponse<T>, CoreError> {
        self.request(endpoint, options.method(Method::Get)).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        endpoint: &str,
        body: &B,
        options: RequestOptions,
    ) -> Result<ApiResponse<T>, CoreError> {
        let body = to_body(body)?;
        self.request(endpoint, options.method(Method::Post).body(body))
            .await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize>(
        &self,
        endpoint: &str,
        body: &B,
        options: RequestOptions,
    ) -> Result<ApiResponse<T>, CoreError> {
        let body = to_body(body)?;
        self.request(endpoint, options.method(Method::Put).body(body))
            .await
    }

    pub async fn patch<T: DeserializeOwned, B: Serialize>(
        &self,
        endpoint: &str,
        body: &B,
        options: RequestOptions,
    ) -> Result<ApiResponse<T>, CoreError> {
        let body = to_body(body)?;
        self.request(endpoint, options.method(Method::Patch).body(body))
            .await
    }

    pub async fn delete<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<ApiResponse<T>, CoreError> {
        self.request(endpoint, options.method(Method::Delete)).await
    }
}

/// Dismisses the loading notification when the request settles or its
/// future is dropped.
struct LoadingGuard<'a> {
    ledger: &'a NotificationLedger,
    id: Option<NotificationId>,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        if let Some(id) = self.id.take() {
            self.ledger.remove(&id);
        }
    }
}

fn to_body<B: Serialize>(body: &B) -> Result<Value, CoreError> {
    serde_json::to_value(body).map_err(|e| CoreError::request(format!("Invalid request body: {e}")))
}
