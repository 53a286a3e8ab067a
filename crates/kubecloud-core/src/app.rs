// ── Service container ──
//
// Builds the backend, ledger, gateway and stores from one `AppConfig`
// and hands them out by reference. Front-ends construct exactly one.

use std::sync::Arc;

use kubecloud_api::{Backend, HttpClient, MockBackend, TransportConfig};
use tracing::debug;

use crate::config::AppConfig;
use crate::error::CoreError;
use crate::gateway::Gateway;
use crate::notifications::NotificationLedger;
use crate::storage::KeyValueStore;
use crate::store::{ClusterStore, SessionStore};

/// Every service the front-end needs, wired together.
///
/// Cheaply cloneable; clones share state.
#[derive(Clone)]
pub struct App {
    config: Arc<AppConfig>,
    ledger: NotificationLedger,
    gateway: Gateway,
    clusters: ClusterStore,
    session: SessionStore,
}

impl App {
    pub fn new(config: AppConfig, storage: Arc<dyn KeyValueStore>) -> Result<Self, CoreError> {
        let backend = build_backend(&config)?;
        let ledger = NotificationLedger::new(config.notifications.default_duration);
        let gateway = Gateway::new(
            backend,
            ledger.clone(),
            config.api.timeout,
            config.notifications.error_duration,
        );
        let clusters = ClusterStore::new(gateway.clone(), config.lifecycle);
        let session = SessionStore::new(gateway.clone(), storage);

        Ok(Self {
            config: Arc::new(config),
            ledger,
            gateway,
            clusters,
            session,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn notifications(&self) -> &NotificationLedger {
        &self.ledger
    }

    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    pub fn clusters(&self) -> &ClusterStore {
        &self.clusters
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }
}

fn build_backend(config: &AppConfig) -> Result<Backend, CoreError> {
    if config.mock.enabled {
        debug!(
            delay = ?config.mock.delay,
            error_rate = config.mock.error_rate,
            "using simulated backend"
        );
        return Ok(MockBackend::new(config.mock.to_mock_config()).into());
    }

    debug!(base_url = %config.api.base_url, "using HTTP backend");
    let client = HttpClient::new(config.api.base_url.as_str(), &TransportConfig::default())
        .map_err(|e| CoreError::Config {
            message: e.to_string(),
        })?;
    Ok(client.into())
}
