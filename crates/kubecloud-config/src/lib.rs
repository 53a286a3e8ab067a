//! Configuration for KubeCloud front-ends.
//!
//! A TOML file in the platform config directory, layered with
//! `KUBECLOUD_`-prefixed environment variables, translated into the
//! service layer's [`kubecloud_core::AppConfig`]. The core crate never
//! reads either source itself.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use kubecloud_core::{
    ApiSettings, AppConfig, LifecycleSettings, MockSettings, NotificationSettings,
};

/// Prefix for environment overrides. Nested keys are separated by `__`,
/// e.g. `KUBECLOUD_MOCK__ERROR_RATE`.
pub const ENV_PREFIX: &str = "KUBECLOUD_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration. Durations are integer milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Log at `debug` unless `RUST_LOG` or verbosity flags say otherwise.
    pub debug_logging: bool,

    /// Session file; defaults to `session.json` in the platform data dir.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_path: Option<PathBuf>,

    pub api: ApiSection,
    pub mock: MockSection,
    pub lifecycle: LifecycleSection,
    pub notifications: NotificationSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiSection {
    /// Base URL of the real cluster API.
    pub base_url: String,
    pub timeout_ms: u64,
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api".into(),
            timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MockSection {
    /// Serve every request from the in-memory backend.
    pub enabled: bool,
    pub delay_ms: u64,
    /// Probability in `[0, 1]` of an injected failure.
    pub error_rate: f64,
}

impl Default for MockSection {
    fn default() -> Self {
        Self {
            enabled: true,
            delay_ms: 1000,
            error_rate: 0.05,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LifecycleSection {
    pub start_delay_ms: u64,
    pub stop_delay_ms: u64,
}

impl Default for LifecycleSection {
    fn default() -> Self {
        Self {
            start_delay_ms: 3000,
            stop_delay_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct NotificationSection {
    pub default_duration_ms: u64,
    pub error_duration_ms: u64,
}

impl Default for NotificationSection {
    fn default() -> Self {
        Self {
            default_duration_ms: 5000,
            error_duration_ms: 8000,
        }
    }
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "kubecloud", "kubecloud")
}

fn home_fallback(parts: &[&str]) -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.extend(parts);
    p
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback(&[".config", "kubecloud", "config.toml"]),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Where the session is persisted when `storage_path` is unset.
pub fn default_storage_path() -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback(&[".local", "share", "kubecloud", "session.json"]),
        |dirs| dirs.data_dir().join("session.json"),
    )
}

// ── Loading ─────────────────────────────────────────────────────────

/// Load from the canonical config path plus environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` plus environment. A missing file contributes nothing.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let config: Config = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()?;
    Ok(config)
}

// ── Saving ──────────────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Translation ─────────────────────────────────────────────────────

impl Config {
    /// Validate and convert into the service layer's runtime config.
    pub fn to_app_config(&self) -> Result<AppConfig, ConfigError> {
        let base_url: url::Url =
            self.api
                .base_url
                .parse()
                .map_err(|e: url::ParseError| ConfigError::Validation {
                    field: "api.base_url".into(),
                    reason: format!("{e}: {}", self.api.base_url),
                })?;

        let error_rate = self.mock.error_rate;
        if !(0.0..=1.0).contains(&error_rate) {
            return Err(ConfigError::Validation {
                field: "mock.error_rate".into(),
                reason: format!("expected a value between 0 and 1, got {error_rate}"),
            });
        }

        Ok(AppConfig {
            api: ApiSettings {
                base_url,
                timeout: Duration::from_millis(self.api.timeout_ms),
            },
            mock: MockSettings {
                enabled: self.mock.enabled,
                delay: Duration::from_millis(self.mock.delay_ms),
                error_rate,
            },
            lifecycle: LifecycleSettings {
                start_delay: Duration::from_millis(self.lifecycle.start_delay_ms),
                stop_delay: Duration::from_millis(self.lifecycle.stop_delay_ms),
            },
            notifications: NotificationSettings {
                default_duration: Duration::from_millis(self.notifications.default_duration_ms),
                error_duration: Duration::from_millis(self.notifications.error_duration_ms),
            },
            debug_logging: self.debug_logging,
            storage_path: Some(
                self.storage_path
                    .clone()
                    .unwrap_or_else(default_storage_path),
            ),
        })
    }
}
