// ── Simulated REST backend ──
//
// In-memory implementation of the cluster API surface used when mock mode
// is enabled. Every call waits the configured latency, then fails with
// probability `error_rate`, then routes on method + path. Responses use the
// same `{ data, status, message, timestamp }` envelope a real server sends.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use chrono::Utc;
use serde_json::{Map, Value, json};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::Error;
use crate::request::{Method, RawResponse, Request};

/// Latency and failure injection for the simulated backend.
#[derive(Debug, Clone, PartialEq)]
pub struct MockConfig {
    /// Artificial latency applied to every call.
    pub delay: Duration,
    /// Probability in `[0, 1]` that a call fails with [`Error::Injected`].
    pub error_rate: f64,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(1000),
            error_rate: 0.05,
        }
    }
}

impl MockConfig {
    /// Zero latency, no injected failures.
    pub fn instant() -> Self {
        Self {
            delay: Duration::ZERO,
            error_rate: 0.0,
        }
    }
}

struct MockState {
    users: Vec<Value>,
    /// Issued session tokens -> user id.
    tokens: HashMap<String, String>,
    next_user_id: u64,
}

/// Simulated backend for `/clusters`, `/users`, and `/auth/*`.
pub struct MockBackend {
    config: MockConfig,
    state: Mutex<MockState>,
}

impl MockBackend {
    pub fn new(config: MockConfig) -> Self {
        let users = match seed_users() {
            Value::Array(users) => users,
            _ => Vec::new(),
        };
        let next_user_id = u64::try_from(users.len()).unwrap_or(0) + 1;

        Self {
            config,
            state: Mutex::new(MockState {
                users,
                tokens: HashMap::new(),
                next_user_id,
            }),
        }
    }

    pub fn config(&self) -> &MockConfig {
        &self.config
    }

    /// Simulate one round trip.
    pub async fn handle(&self, request: &Request) -> Result<RawResponse, Error> {
        if !self.config.delay.is_zero() {
            tokio::time::sleep(self.config.delay).await;
        }

        if self.should_fail() {
            warn!(method = %request.method, endpoint = %request.endpoint, "injected mock failure");
            return Err(Error::Injected);
        }

        debug!(method = %request.method, endpoint = %request.endpoint, "mock request");
        self.route(request).map(envelope)
    }

    fn should_fail(&self) -> bool {
        self.config.error_rate >= 1.0
            || (self.config.error_rate > 0.0 && rand::random::<f64>() < self.config.error_rate)
    }

    fn route(&self, request: &Request) -> Result<Value, Error> {
        let path = request.endpoint.split('?').next().unwrap_or_default();
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let body = request.body.clone().unwrap_or(Value::Null);

        match (request.method, segments.as_slice()) {
            (Method::Get, ["clusters"]) => Ok(seed_clusters()),
            (Method::Get, ["clusters", id]) => find_seed_cluster(id),
            (Method::Post, ["clusters"]) => {
                let mut created = object_or_empty(body);
                created.insert(
                    "id".into(),
                    Value::String(format!("cluster-{}", short_id())),
                );
                Ok(Value::Object(created))
            }
            (Method::Put | Method::Patch, ["clusters", id]) => {
                let mut updated = object_or_empty(body);
                updated.insert("id".into(), Value::String((*id).to_owned()));
                Ok(Value::Object(updated))
            }
            (Method::Delete, ["clusters", _]) => Ok(json!({ "success": true })),
            (Method::Post, ["clusters", id, action @ ("start" | "stop")]) => {
                Ok(json!({ "id": id, "action": action }))
            }
            (Method::Get, ["users"]) => Ok(Value::Array(self.lock().users.clone())),
            (Method::Put | Method::Patch, ["users", id]) => self.update_user(id, &body),
            (Method::Post, ["auth", "login"]) => self.login(&body),
            (Method::Post, ["auth", "register"]) => self.register(&body),
            (Method::Post, ["auth", "refresh"]) => self.refresh(&body),
            _ => Err(Error::EndpointNotFound {
                method: request.method.to_string(),
                endpoint: request.endpoint.clone(),
            }),
        }
    }

    // ── Auth routes ──────────────────────────────────────────────────

    fn login(&self, body: &Value) -> Result<Value, Error> {
        let email = str_field(body, "email").unwrap_or_default();
        let mut state = self.lock();

        let Some(user) = state
            .users
            .iter_mut()
            .find(|u| str_field(u, "email").is_some_and(|e| e.eq_ignore_ascii_case(email)))
        else {
            return Err(http_error(401, "Invalid credentials"));
        };

        if let Value::Object(fields) = &mut *user {
            fields.insert("lastLogin".into(), Value::String(Utc::now().to_rfc3339()));
        }
        let user = user.clone();
        let token = issue_token(&mut state, &user);
        Ok(json!({ "user": user, "token": token }))
    }

    fn register(&self, body: &Value) -> Result<Value, Error> {
        let (Some(name), Some(email)) = (str_field(body, "name"), str_field(body, "email")) else {
            return Err(http_error(400, "Name and email are required"));
        };

        let mut state = self.lock();
        if state
            .users
            .iter()
            .any(|u| str_field(u, "email").is_some_and(|e| e.eq_ignore_ascii_case(email)))
        {
            return Err(http_error(409, "Email already registered"));
        }

        let now = Utc::now().to_rfc3339();
        let user = json!({
            "id": state.next_user_id.to_string(),
            "name": name,
            "email": email,
            "role": "user",
            "avatar": null,
            "createdAt": now,
            "lastLogin": now,
        });
        state.next_user_id += 1;
        state.users.push(user.clone());

        let token = issue_token(&mut state, &user);
        Ok(json!({ "user": user, "token": token }))
    }

    fn refresh(&self, body: &Value) -> Result<Value, Error> {
        let token = str_field(body, "token").unwrap_or_default();
        let mut state = self.lock();

        let Some(user_id) = state.tokens.remove(token) else {
            return Err(http_error(401, "Invalid or expired token"));
        };
        let fresh = format!("mock-token-{}", Uuid::new_v4().simple());
        state.tokens.insert(fresh.clone(), user_id);
        Ok(json!({ "token": fresh }))
    }

    fn update_user(&self, id: &str, body: &Value) -> Result<Value, Error> {
        let mut state = self.lock();
        let Some(user) = state
            .users
            .iter_mut()
            .find(|u| str_field(u, "id") == Some(id))
        else {
            return Err(http_error(404, "User not found"));
        };

        if let (Value::Object(fields), Value::Object(changes)) = (&mut *user, body) {
            for (key, value) in changes {
                if key != "id" && key != "role" && !value.is_null() {
                    fields.insert(key.clone(), value.clone());
                }
            }
        }
        Ok(user.clone())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ── Seed data ────────────────────────────────────────────────────────

/// The clusters every fresh mock backend reports.
pub fn seed_clusters() -> Value {
    json!([
        {
            "id": "cluster-1",
            "name": "Production Cluster",
            "status": "running",
            "region": "us-west-2",
            "nodes": 5,
            "cpu": "20 cores",
            "memory": "80 GB",
            "storage": "500 GB",
            "createdAt": "2024-01-10T08:00:00Z",
            "lastUpdated": "2024-03-15T12:00:00Z",
            "cost": 245.50,
            "tags": ["production", "critical"]
        },
        {
            "id": "cluster-2",
            "name": "Staging Cluster",
            "status": "running",
            "region": "us-east-1",
            "nodes": 3,
            "cpu": "12 cores",
            "memory": "48 GB",
            "storage": "200 GB",
            "createdAt": "2024-02-01T10:00:00Z",
            "lastUpdated": "2024-03-15T11:30:00Z",
            "cost": 156.75,
            "tags": ["staging", "testing"]
        },
        {
            "id": "cluster-3",
            "name": "Development Cluster",
            "status": "stopped",
            "region": "eu-west-1",
            "nodes": 2,
            "cpu": "8 cores",
            "memory": "32 GB",
            "storage": "100 GB",
            "createdAt": "2024-02-15T14:00:00Z",
            "lastUpdated": "2024-03-14T18:00:00Z",
            "cost": 89.25,
            "tags": ["development", "temporary"]
        }
    ])
}

/// The accounts every fresh mock backend accepts. Any password works.
pub fn seed_users() -> Value {
    json!([
        {
            "id": "1",
            "name": "Admin User",
            "email": "admin@kubecloud.com",
            "role": "admin",
            "avatar": "https://i.pravatar.cc/150?img=1",
            "createdAt": "2024-01-15T10:00:00Z",
            "lastLogin": "2024-03-15T14:30:00Z"
        },
        {
            "id": "2",
            "name": "Regular User",
            "email": "user@kubecloud.com",
            "role": "user",
            "avatar": "https://i.pravatar.cc/150?img=2",
            "createdAt": "2024-02-01T09:00:00Z",
            "lastLogin": "2024-03-14T16:45:00Z"
        },
        {
            "id": "3",
            "name": "Developer User",
            "email": "dev@kubecloud.com",
            "role": "developer",
            "avatar": "https://i.pravatar.cc/150?img=3",
            "createdAt": "2024-02-15T11:00:00Z",
            "lastLogin": "2024-03-15T10:20:00Z"
        }
    ])
}

// ── Helpers ──────────────────────────────────────────────────────────

fn envelope(data: Value) -> RawResponse {
    RawResponse {
        status: 200,
        body: json!({
            "data": data,
            "status": 200,
            "message": "Success",
            "timestamp": Utc::now().to_rfc3339(),
        }),
    }
}

fn find_seed_cluster(id: &str) -> Result<Value, Error> {
    match seed_clusters() {
        Value::Array(clusters) => clusters
            .into_iter()
            .find(|c| str_field(c, "id") == Some(id))
            .ok_or_else(|| http_error(404, "Cluster not found")),
        _ => Err(http_error(404, "Cluster not found")),
    }
}

fn issue_token(state: &mut MockState, user: &Value) -> String {
    let token = format!("mock-token-{}", Uuid::new_v4().simple());
    let user_id = str_field(user, "id").unwrap_or_default().to_owned();
    state.tokens.insert(token.clone(), user_id);
    token
}

fn http_error(status: u16, message: &str) -> Error {
    Error::Http {
        status,
        message: message.into(),
    }
}

fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

fn object_or_empty(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn short_id() -> String {
    Uuid::new_v4().simple().to_string().chars().take(8).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn backend() -> MockBackend {
        MockBackend::new(MockConfig::instant())
    }

    fn post(endpoint: &str, body: Value) -> Request {
        Request::new(Method::Post, endpoint).with_body(body)
    }

    #[tokio::test]
    async fn lists_seed_clusters_in_envelope() {
        let resp = backend()
            .handle(&Request::new(Method::Get, "/clusters"))
            .await
            .unwrap();

        assert_eq!(resp.status, 200);
        assert_eq!(resp.body["message"], "Success");
        assert_eq!(resp.body["data"].as_array().unwrap().len(), 3);
        assert_eq!(resp.body["data"][1]["id"], "cluster-2");
    }

    #[tokio::test]
    async fn create_echoes_body_with_generated_id() {
        let resp = backend()
            .handle(&post("/clusters", json!({ "name": "x", "nodes": 3 })))
            .await
            .unwrap();

        let data = &resp.body["data"];
        assert_eq!(data["name"], "x");
        assert!(data["id"].as_str().unwrap().starts_with("cluster-"));
    }

    #[tokio::test]
    async fn lifecycle_actions_acknowledge() {
        let resp = backend()
            .handle(&post("/clusters/cluster-3/start", json!({ "action": "start" })))
            .await
            .unwrap();
        assert_eq!(resp.body["data"]["action"], "start");
        assert_eq!(resp.body["data"]["id"], "cluster-3");
    }

    #[tokio::test]
    async fn login_known_email_issues_token() {
        let resp = backend()
            .handle(&post(
                "/auth/login",
                json!({ "email": "admin@kubecloud.com", "password": "anything" }),
            ))
            .await
            .unwrap();

        assert_eq!(resp.body["data"]["user"]["role"], "admin");
        assert!(resp.body["data"]["token"].as_str().unwrap().starts_with("mock-token-"));
    }

    #[tokio::test]
    async fn login_unknown_email_is_rejected() {
        let err = backend()
            .handle(&post("/auth/login", json!({ "email": "nouser@x.com", "password": "x" })))
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(401));
        assert_eq!(err.to_string(), "Invalid credentials");
    }

    #[tokio::test]
    async fn register_then_login() {
        let mock = backend();
        let body = json!({ "name": "New", "email": "new@kubecloud.com", "password": "pw" });
        let resp = mock.handle(&post("/auth/register", body.clone())).await.unwrap();
        assert_eq!(resp.body["data"]["user"]["id"], "4");
        assert_eq!(resp.body["data"]["user"]["role"], "user");

        let dup = mock.handle(&post("/auth/register", body)).await.unwrap_err();
        assert_eq!(dup.status(), Some(409));

        mock.handle(&post("/auth/login", json!({ "email": "new@kubecloud.com" })))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn refresh_rotates_issued_tokens_only() {
        let mock = backend();
        let login = mock
            .handle(&post("/auth/login", json!({ "email": "dev@kubecloud.com" })))
            .await
            .unwrap();
        let token = login.body["data"]["token"].as_str().unwrap().to_owned();

        let fresh = mock
            .handle(&post("/auth/refresh", json!({ "token": token })))
            .await
            .unwrap();
        assert_ne!(fresh.body["data"]["token"].as_str().unwrap(), token);

        // The old token was consumed by the rotation.
        let reuse = mock
            .handle(&post("/auth/refresh", json!({ "token": token })))
            .await
            .unwrap_err();
        assert_eq!(reuse.to_string(), "Invalid or expired token");
    }

    #[tokio::test]
    async fn update_user_merges_fields_but_keeps_role() {
        let resp = backend()
            .handle(
                &Request::new(Method::Put, "/users/2")
                    .with_body(json!({ "name": "Renamed", "role": "admin" })),
            )
            .await
            .unwrap();

        assert_eq!(resp.body["data"]["name"], "Renamed");
        assert_eq!(resp.body["data"]["role"], "user");
        assert_eq!(resp.body["data"]["email"], "user@kubecloud.com");
    }

    #[tokio::test]
    async fn unknown_route_is_reported() {
        let err = backend()
            .handle(&Request::new(Method::Get, "/billing"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::EndpointNotFound { .. }));
    }

    #[tokio::test]
    async fn full_error_rate_always_fails() {
        let mock = MockBackend::new(MockConfig {
            delay: Duration::ZERO,
            error_rate: 1.0,
        });
        let err = mock
            .handle(&Request::new(Method::Get, "/clusters"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Injected));
    }

    #[tokio::test(start_paused = true)]
    async fn latency_is_applied() {
        let mock = MockBackend::new(MockConfig {
            delay: Duration::from_millis(750),
            error_rate: 0.0,
        });
        let started = tokio::time::Instant::now();
        mock.handle(&Request::new(Method::Get, "/clusters")).await.unwrap();
        assert_eq!(started.elapsed(), Duration::from_millis(750));
    }

    #[tokio::test]
    async fn partial_error_rate_mixes_outcomes() {
        let mock = MockBackend::new(MockConfig {
            delay: Duration::ZERO,
            error_rate: 0.5,
        });
        let mut failures = 0;
        for _ in 0..200 {
            if mock.handle(&Request::new(Method::Get, "/clusters")).await.is_err() {
                failures += 1;
            }
        }
        assert!(failures > 0 && failures < 200, "{failures} of 200 failed");
    }
}
