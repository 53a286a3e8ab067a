use thiserror::Error;

/// Top-level error type for the `kubecloud-api` crate.
///
/// Display strings are the bare, user-presentable message: the service
/// layer surfaces them verbatim in notifications and store error state.
#[derive(Debug, Error)]
pub enum Error {
    // ── HTTP ────────────────────────────────────────────────────────
    /// Non-success status. `message` comes from the response body's
    /// `message` field, or falls back to `HTTP <status>: <reason>`.
    #[error("{message}")]
    Http { status: u16, message: String },

    /// The request deadline fired before a response arrived.
    #[error("Request timed out")]
    Timeout { timeout_ms: u64 },

    // ── Transport ───────────────────────────────────────────────────
    /// Connection refused, DNS failure, body read failure, etc.
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    /// Base URL or endpoint did not form a valid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Client construction failed.
    #[error("Failed to build HTTP client: {0}")]
    Client(String),

    // ── Data ────────────────────────────────────────────────────────
    /// Response body was not the JSON shape the caller asked for.
    #[error("{message}")]
    Deserialization { message: String, body: String },

    // ── Simulated backend ───────────────────────────────────────────
    /// No simulated route matches the request.
    #[error("Mock endpoint not found: {endpoint}")]
    EndpointNotFound { method: String, endpoint: String },

    /// Failure produced by the simulated backend's error injection.
    #[error("Mock API error")]
    Injected,
}

impl Error {
    /// Returns `true` if the deadline (ours or reqwest's) expired.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Transport(e) => e.is_timeout(),
            _ => false,
        }
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout { .. } | Self::Injected => true,
            Self::Http { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Returns `true` if the resource or route does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Http { status: 404, .. } | Self::EndpointNotFound { .. } => true,
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            _ => false,
        }
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
