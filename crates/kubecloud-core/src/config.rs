// ── Runtime application configuration ──
//
// These types describe how the service layer behaves: where requests go,
// how the simulated backend misbehaves, and how long timers run. They
// never touch disk or the environment; the front-end resolves them once
// at startup and hands an `AppConfig` in.

use std::path::PathBuf;
use std::time::Duration;

use kubecloud_api::MockConfig;
use url::Url;

/// Real-API settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiSettings {
    /// Base URL endpoints are appended to (e.g. `http://localhost:8080/api`).
    pub base_url: Url,
    /// Default request deadline for the gateway.
    pub timeout: Duration,
}

/// Simulated-backend settings.
#[derive(Debug, Clone, PartialEq)]
pub struct MockSettings {
    /// When `true`, every request is served by the in-memory backend.
    pub enabled: bool,
    pub delay: Duration,
    /// Probability in `[0, 1]` that a simulated call fails.
    pub error_rate: f64,
}

impl MockSettings {
    pub fn to_mock_config(&self) -> MockConfig {
        MockConfig {
            delay: self.delay,
            error_rate: self.error_rate,
        }
    }
}

/// Delays before a cluster settles into its terminal lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleSettings {
    /// `starting` -> `running`.
    pub start_delay: Duration,
    /// `stopping` -> `stopped`.
    pub stop_delay: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationSettings {
    /// Lifetime of a notification that does not specify one.
    pub default_duration: Duration,
    /// Lifetime of the gateway's error notifications.
    pub error_duration: Duration,
}

/// Everything the service layer needs, resolved once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub api: ApiSettings,
    pub mock: MockSettings,
    pub lifecycle: LifecycleSettings,
    pub notifications: NotificationSettings,
    /// Raise the default log level to `debug`.
    pub debug_logging: bool,
    /// Session file for durable storage; `None` keeps the session in memory.
    pub storage_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api: ApiSettings {
                base_url: Url::parse("http://localhost:8080/api")
                    .unwrap_or_else(|_| unreachable!("static URL is valid")),
                timeout: Duration::from_millis(10_000),
            },
            mock: MockSettings {
                enabled: true,
                delay: Duration::from_millis(1000),
                error_rate: 0.05,
            },
            lifecycle: LifecycleSettings {
                start_delay: Duration::from_millis(3000),
                stop_delay: Duration::from_millis(2000),
            },
            notifications: NotificationSettings {
                default_duration: Duration::from_millis(5000),
                error_duration: Duration::from_millis(8000),
            },
            debug_logging: false,
            storage_path: None,
        }
    }
}

impl AppConfig {
    /// Mock mode with zero latency and no injected failures.
    pub fn instant_mock() -> Self {
        let mut config = Self::default();
        config.mock.delay = Duration::ZERO;
        config.mock.error_rate = 0.0;
        config
    }
}
