// ── Cluster store ──
//
// Owns the cluster collection. Lifecycle actions (start/stop) apply an
// intermediate status before the call resolves and schedule the terminal
// status once it succeeds; the scheduled task is keyed by cluster id and
// superseded by any later lifecycle action or deletion.

use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::Utc;
use indexmap::IndexMap;
use kubecloud_api::{ApiResponse, Envelope};
use kubecloud_api::mock::seed_clusters;
use serde_json::{Value, json};
use tokio::sync::watch;
use rand::Rng;
use tracing::{debug, info, warn};

use super::collection::EntityCollection;
use super::lifecycle::{InFlight, Transitions};
use super::state::{StateCell, StoreState};
use crate::config::LifecycleSettings;
use crate::error::CoreError;
use crate::gateway::{Gateway, RequestOptions};
use crate::model::cluster::CreatedCluster;
use crate::model::{Cluster, ClusterMetrics, ClusterStatus, ClusterUpdate, CreateClusterRequest};
use crate::stream::{EntityStream, Snapshot};

/// Start or stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LifecycleAction {
    Start,
    Stop,
}

impl LifecycleAction {
    fn verb(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
        }
    }

    fn intermediate(self) -> ClusterStatus {
        match self {
            Self::Start => ClusterStatus::Starting,
            Self::Stop => ClusterStatus::Stopping,
        }
    }

    fn terminal(self) -> ClusterStatus {
        match self {
            Self::Start => ClusterStatus::Running,
            Self::Stop => ClusterStatus::Stopped,
        }
    }

    fn delay(self, settings: &LifecycleSettings) -> Duration {
        match self {
            Self::Start => settings.start_delay,
            Self::Stop => settings.stop_delay,
        }
    }
}

/// Reactive store of managed clusters.
///
/// Cheaply cloneable; clones share state.
#[derive(Clone)]
pub struct ClusterStore {
    inner: Arc<ClusterStoreInner>,
}

struct ClusterStoreInner {
    gateway: Gateway,
    clusters: EntityCollection<Cluster>,
    state: StateCell,
    transitions: Transitions,
    in_flight: InFlight,
    lifecycle: LifecycleSettings,
}

impl ClusterStore {
    pub fn new(gateway: Gateway, lifecycle: LifecycleSettings) -> Self {
        Self {
            inner: Arc::new(ClusterStoreInner {
                gateway,
                clusters: EntityCollection::new(),
                state: StateCell::new(),
                transitions: Transitions::new(),
                in_flight: InFlight::new("Cluster"),
                lifecycle,
            }),
        }
    }

    // ── Actions ──────────────────────────────────────────────────────

    /// Replace the collection with the server's list.
    pub async fn fetch_clusters(&self) -> Result<Snapshot<Cluster>, CoreError> {
        let inner = &self.inner;
        let _loading = inner.state.begin();

        let result = inner
            .gateway
            .get::<Envelope<Vec<Cluster>>>("/clusters", RequestOptions::default())
            .await;
        let clusters = self.settle(result)?.into_payload();

        info!(count = clusters.len(), "clusters fetched");
        inner.clusters.replace_all(clusters);
        inner
            .state
            .clear_selection_if(|id| !inner.clusters.contains(id));
        Ok(inner.clusters.snapshot())
    }

    /// Provision a cluster. It enters the collection as `starting` with
    /// zero cost and settles to `running` after the start delay.
    pub async fn create_cluster(
        &self,
        request: &CreateClusterRequest,
    ) -> Result<Arc<Cluster>, CoreError> {
        let inner = &self.inner;
        let _loading = inner.state.begin();

        let result = inner
            .gateway
            .post::<Envelope<CreatedCluster>, _>("/clusters", request, RequestOptions::default())
            .await;
        let created = self.settle(result)?.into_payload();

        let cluster = inner.clusters.push(created.into_cluster(Utc::now()));
        info!(id = %cluster.id, name = %cluster.name, "cluster created");
        self.schedule_transition(&cluster.id, LifecycleAction::Start);
        Ok(cluster)
    }

    /// Delete a cluster and clear the selection if it pointed at it.
    pub async fn delete_cluster(&self, id: &str) -> Result<(), CoreError> {
        let inner = &self.inner;
        let _flight = inner.in_flight.claim(id)?;
        let _loading = inner.state.begin();

        let result = inner
            .gateway
            .delete::<Value>(&format!("/clusters/{id}"), RequestOptions::default())
            .await;
        self.settle(result)?;

        inner.transitions.cancel(id);
        if inner.clusters.remove(id).is_some() {
            info!(id, "cluster deleted");
        }
        inner.state.clear_selection_if(|selected| selected == id);
        Ok(())
    }

    /// Merge `update` into a cluster and refresh its `last_updated`.
    ///
    /// Unknown ids fail with [`CoreError::NotFound`] before any call.
    pub async fn update_cluster(
        &self,
        id: &str,
        update: &ClusterUpdate,
    ) -> Result<Arc<Cluster>, CoreError> {
        let inner = &self.inner;
        Self::ensure_known(inner, id)?;
        let _flight = inner.in_flight.claim(id)?;
        let _loading = inner.state.begin();

        let result = inner
            .gateway
            .put::<Value, _>(&format!("/clusters/{id}"), update, RequestOptions::default())
            .await;
        self.settle(result)?;

        let updated = inner
            .clusters
            .modify(id, |cluster| update.apply(cluster, Utc::now()))
            .ok_or_else(|| CoreError::cluster_not_found(id))?;
        debug!(id, "cluster updated");
        Ok(updated)
    }

    pub async fn start_cluster(&self, id: &str) -> Result<Arc<Cluster>, CoreError> {
        self.run_lifecycle(id, LifecycleAction::Start).await
    }

    pub async fn stop_cluster(&self, id: &str) -> Result<Arc<Cluster>, CoreError> {
        self.run_lifecycle(id, LifecycleAction::Stop).await
    }

    /// Synthetic utilization for one cluster.
    ///
    /// The simulated backend has no metrics endpoint, so mock mode samples
    /// random values in the documented ranges.
    pub async fn cluster_metrics(&self, id: &str) -> Result<ClusterMetrics, CoreError> {
        let inner = &self.inner;
        Self::ensure_known(inner, id)?;

        if inner.gateway.is_mock() {
            return Ok(sample_metrics());
        }

        inner
            .gateway
            .get::<Envelope<ClusterMetrics>>(
                &format!("/clusters/{id}/metrics"),
                RequestOptions::default().quiet(),
            )
            .await
            .map(ApiResponse::into_payload)
            .map_err(|err| {
                warn!(id, error = %err, "metrics request failed");
                CoreError::request("Failed to fetch cluster metrics")
            })
    }

    /// Seed the collection from mock data when mock mode is on and the
    /// collection is empty. Returns whether seeding happened.
    pub fn initialize(&self) -> Result<bool, CoreError> {
        let inner = &self.inner;
        if !inner.gateway.is_mock() || !inner.clusters.is_empty() {
            return Ok(false);
        }
        let clusters: Vec<Cluster> = serde_json::from_value(seed_clusters())
            .map_err(|e| CoreError::request(format!("Invalid seed data: {e}")))?;
        debug!(count = clusters.len(), "clusters seeded from mock data");
        inner.clusters.replace_all(clusters);
        Ok(true)
    }

    /// Select a cluster by id, or clear the selection with `None`.
    pub fn select_cluster(&self, id: Option<&str>) -> Result<(), CoreError> {
        if let Some(id) = id {
            Self::ensure_known(&self.inner, id)?;
        }
        self.inner.state.select(id.map(str::to_owned));
        Ok(())
    }

    // ── Views ────────────────────────────────────────────────────────

    pub fn clusters(&self) -> Snapshot<Cluster> {
        self.inner.clusters.snapshot()
    }

    pub fn get(&self, id: &str) -> Option<Arc<Cluster>> {
        self.inner.clusters.get(id)
    }

    pub fn selected_cluster(&self) -> Option<Arc<Cluster>> {
        let selected = self.inner.state.snapshot().selected?;
        self.inner.clusters.get(&selected)
    }

    pub fn running_clusters(&self) -> Vec<Arc<Cluster>> {
        self.with_status(ClusterStatus::Running)
    }

    pub fn stopped_clusters(&self) -> Vec<Arc<Cluster>> {
        self.with_status(ClusterStatus::Stopped)
    }

    pub fn total_cost(&self) -> f64 {
        self.clusters().iter().map(|c| c.cost).sum()
    }

    /// Clusters grouped by region, in first-seen region order.
    pub fn clusters_by_region(&self) -> IndexMap<String, Vec<Arc<Cluster>>> {
        let mut grouped: IndexMap<String, Vec<Arc<Cluster>>> = IndexMap::new();
        for cluster in &*self.clusters() {
            grouped
                .entry(cluster.region.clone())
                .or_default()
                .push(Arc::clone(cluster));
        }
        grouped
    }

    pub fn state(&self) -> StoreState {
        self.inner.state.snapshot()
    }

    pub fn is_loading(&self) -> bool {
        self.state().is_loading
    }

    pub fn error(&self) -> Option<String> {
        self.state().error
    }

    pub fn subscribe(&self) -> EntityStream<Cluster> {
        self.inner.clusters.subscribe()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<StoreState> {
        self.inner.state.subscribe()
    }

    /// Number of deferred lifecycle transitions still waiting to land.
    pub fn pending_transitions(&self) -> usize {
        self.inner.transitions.len()
    }

    pub fn has_pending_transition(&self, id: &str) -> bool {
        self.inner.transitions.contains(id)
    }

    // ── Internals ────────────────────────────────────────────────────

    async fn run_lifecycle(
        &self,
        id: &str,
        action: LifecycleAction,
    ) -> Result<Arc<Cluster>, CoreError> {
        let inner = &self.inner;
        Self::ensure_known(inner, id)?;
        let _flight = inner.in_flight.claim(id)?;
        let _loading = inner.state.begin();

        inner.transitions.cancel(id);
        inner
            .clusters
            .modify(id, |cluster| cluster.status = action.intermediate());
        debug!(id, status = %action.intermediate(), "optimistic status applied");

        let verb = action.verb();
        let result = inner
            .gateway
            .post::<Value, _>(
                &format!("/clusters/{id}/{verb}"),
                &json!({ "action": verb }),
                RequestOptions::default(),
            )
            .await;

        if let Err(err) = result {
            inner
                .clusters
                .modify(id, |cluster| cluster.status = ClusterStatus::Error);
            warn!(id, action = verb, error = %err, "lifecycle action failed");
            inner.state.record_error(err.to_string());
            return Err(err);
        }

        self.schedule_transition(id, action);
        inner
            .clusters
            .get(id)
            .ok_or_else(|| CoreError::cluster_not_found(id))
    }

    fn schedule_transition(&self, id: &str, action: LifecycleAction) {
        let inner = &self.inner;
        let delay = action.delay(&inner.lifecycle);
        let weak = Arc::downgrade(inner);
        let target = action.terminal();

        inner.transitions.schedule(id, |generation| {
            let id = id.to_owned();
            tokio::spawn(settle_transition(weak, id, generation, target, delay)).abort_handle()
        });
        debug!(id, %target, ?delay, "transition scheduled");
    }

    fn ensure_known(inner: &ClusterStoreInner, id: &str) -> Result<(), CoreError> {
        if inner.clusters.contains(id) {
            Ok(())
        } else {
            Err(CoreError::cluster_not_found(id))
        }
    }

    fn with_status(&self, status: ClusterStatus) -> Vec<Arc<Cluster>> {
        self.clusters()
            .iter()
            .filter(|c| c.status == status)
            .cloned()
            .collect()
    }

    /// Record a failed action's message in the store state.
    fn settle<T>(&self, result: Result<T, CoreError>) -> Result<T, CoreError> {
        result.inspect_err(|err| self.inner.state.record_error(err.to_string()))
    }
}

async fn settle_transition(
    store: Weak<ClusterStoreInner>,
    id: String,
    generation: u64,
    target: ClusterStatus,
    delay: Duration,
) {
    tokio::time::sleep(delay).await;
    let Some(inner) = store.upgrade() else {
        return;
    };
    inner.transitions.complete(&id, generation, || {
        let landed = inner.clusters.modify(&id, |cluster| {
            cluster.status = target;
            cluster.last_updated = Utc::now();
        });
        match landed {
            Some(_) => debug!(id = %id, %target, "transition landed"),
            None => debug!(id = %id, "transition target no longer exists"),
        }
    });
}

fn sample_metrics() -> ClusterMetrics {
    let mut rng = rand::thread_rng();
    ClusterMetrics {
        cpu_usage: rng.gen_range(0.0..100.0),
        memory_usage: rng.gen_range(0.0..100.0),
        storage_usage: rng.gen_range(0.0..100.0),
        network_in: rng.gen_range(0.0..1000.0),
        network_out: rng.gen_range(0.0..1000.0),
        active_connections: rng.gen_range(0..100),
    }
}
