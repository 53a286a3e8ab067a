//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` variants into user-facing errors with actionable help
//! text and a process exit code.

use miette::Diagnostic;
use thiserror::Error;

use kubecloud_config::ConfigError;
use kubecloud_core::CoreError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Authentication ───────────────────────────────────────────────
    #[error("{message}")]
    #[diagnostic(
        code(kubecloud::auth_failed),
        help("Check the email address, then run: kubecloud auth login")
    )]
    AuthFailed { message: String },

    #[error("{message}")]
    #[diagnostic(
        code(kubecloud::session),
        help("Sign in with: kubecloud auth login")
    )]
    Session { message: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(kubecloud::not_found),
        help("Run: kubecloud {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("{message}")]
    #[diagnostic(code(kubecloud::conflict))]
    Conflict { message: String },

    #[error("{resource_type} '{identifier}' is busy with another action")]
    #[diagnostic(
        code(kubecloud::busy),
        help("Wait for the running action to finish and try again.")
    )]
    Busy {
        resource_type: String,
        identifier: String,
    },

    // ── API ──────────────────────────────────────────────────────────
    #[error("{message}")]
    #[diagnostic(code(kubecloud::api_error))]
    Api {
        message: String,
        code: String,
        upstream_status: Option<u16>,
    },

    #[error("Cluster '{id}' ended in error status")]
    #[diagnostic(
        code(kubecloud::cluster_error),
        help("Inspect it with: kubecloud clusters get {id}")
    )]
    ClusterFailed { id: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid input: {reason}")]
    #[diagnostic(code(kubecloud::validation))]
    Validation { reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(
        code(kubecloud::config),
        help("Inspect the resolved configuration with: kubecloud config show")
    )]
    Config(#[from] ConfigError),

    #[error("Configuration error: {message}")]
    #[diagnostic(
        code(kubecloud::config),
        help("Inspect the resolved configuration with: kubecloud config show")
    )]
    InvalidConfig { message: String },

    #[error("Config file already exists at {path}")]
    #[diagnostic(
        code(kubecloud::config_exists),
        help("Pass --force to overwrite it.")
    )]
    ConfigExists { path: String },

    #[error("{message}")]
    #[diagnostic(code(kubecloud::storage))]
    Storage { message: String },

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(kubecloud::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── Timeout ──────────────────────────────────────────────────────
    #[error("{what} timed out after {millis}ms")]
    #[diagnostic(
        code(kubecloud::timeout),
        help("Raise api.timeout_ms, or --wait-timeout when waiting on a cluster.")
    )]
    Timeout { what: String, millis: u64 },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to render YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to render TOML: {0}")]
    Toml(#[from] toml::ser::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::AuthFailed { .. } | Self::Session { .. } => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Conflict { .. } | Self::Busy { .. } | Self::ConfigExists { .. } => {
                exit_code::CONFLICT
            }
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            Self::Api {
                upstream_status, ..
            } => match upstream_status {
                Some(401 | 403) => exit_code::AUTH,
                Some(404) => exit_code::NOT_FOUND,
                Some(409) => exit_code::CONFLICT,
                _ => exit_code::GENERAL,
            },
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Request {
                message,
                upstream_status: Some(401 | 403),
                ..
            } => Self::AuthFailed { message },

            CoreError::Request {
                message,
                upstream_status: Some(409),
                ..
            } => Self::Conflict { message },

            CoreError::Request {
                message,
                code,
                upstream_status,
                ..
            } => Self::Api {
                message,
                code,
                upstream_status,
            },

            CoreError::Timeout { timeout_ms } => Self::Timeout {
                what: "Request".into(),
                millis: timeout_ms,
            },

            CoreError::NotFound { entity, identifier } => {
                let resource_type = entity.to_lowercase();
                Self::NotFound {
                    list_command: format!("{resource_type}s list"),
                    resource_type,
                    identifier,
                }
            }

            CoreError::Busy { entity, identifier } => Self::Busy {
                resource_type: entity.to_lowercase(),
                identifier,
            },

            CoreError::Session { message } => Self::Session { message },

            CoreError::Storage { message } => Self::Storage { message },

            CoreError::Config { message } => Self::InvalidConfig { message },
        }
    }
}
