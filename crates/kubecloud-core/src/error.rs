// ── Core error types ──
//
// The single tagged error type shared by the gateway, the stores and the
// session layer. Transport failures are normalized on the way in: callers
// see `{ message, status, code }`, never a raw `reqwest` error.

use strum::{Display, EnumString};
use thiserror::Error;

/// Status carried by every gateway-normalized request error.
pub const NORMALIZED_STATUS: u16 = 500;

/// Code carried by every gateway-normalized request error.
pub const UNKNOWN_ERROR: &str = "UNKNOWN_ERROR";

/// Message used when a failure carries no usable text.
pub const FALLBACK_MESSAGE: &str = "An unexpected error occurred";

/// Coarse classification of a [`CoreError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    Request,
    Timeout,
    NotFound,
    Busy,
    Session,
    Storage,
    Config,
}

/// Unified error type for the core crate.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    // ── Request errors ───────────────────────────────────────────────
    /// A normalized request failure. `status` and `code` follow the
    /// uniform shape; `upstream_status` keeps the HTTP status the server
    /// actually returned, when there was one.
    #[error("{message}")]
    Request {
        message: String,
        status: u16,
        code: String,
        upstream_status: Option<u16>,
    },

    /// The request deadline fired before the call settled.
    #[error("Request timed out")]
    Timeout { timeout_ms: u64 },

    // ── Store errors ─────────────────────────────────────────────────
    /// A store action named an identifier the store does not hold.
    #[error("{entity} not found")]
    NotFound {
        entity: &'static str,
        identifier: String,
    },

    /// Another action against the same identifier is still in flight.
    #[error("{entity} {identifier} is busy with another action")]
    Busy {
        entity: &'static str,
        identifier: String,
    },

    // ── Session / persistence ────────────────────────────────────────
    #[error("{message}")]
    Session { message: String },

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Request { .. } => ErrorKind::Request,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Busy { .. } => ErrorKind::Busy,
            Self::Session { .. } => ErrorKind::Session,
            Self::Storage { .. } => ErrorKind::Storage,
            Self::Config { .. } => ErrorKind::Config,
        }
    }

    /// Normalized status. Request errors and timeouts both report 500.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Request { status, .. } => Some(*status),
            Self::Timeout { .. } => Some(NORMALIZED_STATUS),
            _ => None,
        }
    }

    pub fn code(&self) -> &str {
        match self {
            Self::Request { code, .. } => code,
            Self::Timeout { .. } => UNKNOWN_ERROR,
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Busy { .. } => "BUSY",
            Self::Session { .. } => "SESSION_ERROR",
            Self::Storage { .. } => "STORAGE_ERROR",
            Self::Config { .. } => "CONFIG_ERROR",
        }
    }

    /// The HTTP status the server returned, if the failure came from one.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            Self::Request {
                upstream_status, ..
            } => *upstream_status,
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Build a normalized request error with the uniform status and code.
    pub fn request(message: impl Into<String>) -> Self {
        Self::normalized(message.into(), None)
    }

    fn normalized(message: String, upstream_status: Option<u16>) -> Self {
        Self::Request {
            message: if message.is_empty() {
                FALLBACK_MESSAGE.to_owned()
            } else {
                message
            },
            status: NORMALIZED_STATUS,
            code: UNKNOWN_ERROR.to_owned(),
            upstream_status,
        }
    }

    pub(crate) fn cluster_not_found(id: &str) -> Self {
        Self::NotFound {
            entity: "Cluster",
            identifier: id.to_owned(),
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<kubecloud_api::Error> for CoreError {
    fn from(err: kubecloud_api::Error) -> Self {
        if let kubecloud_api::Error::Timeout { timeout_ms } = err {
            return Self::Timeout { timeout_ms };
        }
        if err.is_timeout() {
            return Self::Timeout { timeout_ms: 0 };
        }

        let upstream_status = err.status();
        Self::normalized(err.to_string(), upstream_status)
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Storage {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_failure_is_normalized() {
        let err: CoreError = kubecloud_api::Error::Http {
            status: 401,
            message: "Invalid credentials".into(),
        }
        .into();

        assert_eq!(err.to_string(), "Invalid credentials");
        assert_eq!(err.status(), Some(500));
        assert_eq!(err.code(), "UNKNOWN_ERROR");
        assert_eq!(err.upstream_status(), Some(401));
        assert_eq!(err.kind(), ErrorKind::Request);
    }

    #[test]
    fn deadline_becomes_timeout() {
        let err: CoreError = kubecloud_api::Error::Timeout { timeout_ms: 10_000 }.into();
        assert!(err.is_timeout());
        assert_eq!(err.to_string(), "Request timed out");
        assert_eq!(err.status(), Some(500));
        assert_eq!(err.code(), "UNKNOWN_ERROR");
    }

    #[test]
    fn empty_message_uses_fallback() {
        assert_eq!(CoreError::request("").to_string(), FALLBACK_MESSAGE);
    }

    #[test]
    fn not_found_names_entity() {
        let err = CoreError::cluster_not_found("cluster-9");
        assert_eq!(err.to_string(), "Cluster not found");
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.status(), None);
    }
}
