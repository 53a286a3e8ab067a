// ── Cluster domain types ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::Entity;

/// Per-node capacity assumed when a create response omits it.
const CORES_PER_NODE: u32 = 4;
const MEMORY_GB_PER_NODE: u32 = 16;
const STORAGE_GB_PER_NODE: u32 = 100;

/// Cluster lifecycle status.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ClusterStatus {
    Running,
    Stopped,
    Starting,
    Stopping,
    Error,
}

impl ClusterStatus {
    /// `starting` / `stopping`: a forecast that a deferred transition
    /// will settle.
    pub fn is_transitional(self) -> bool {
        matches!(self, Self::Starting | Self::Stopping)
    }
}

/// A managed cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    pub id: String,
    pub name: String,
    pub status: ClusterStatus,
    pub region: String,
    pub nodes: u32,
    pub cpu: String,
    pub memory: String,
    pub storage: String,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub cost: f64,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Entity for Cluster {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Payload for `POST /clusters`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateClusterRequest {
    pub name: String,
    pub region: String,
    pub nodes: u32,
    pub node_type: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// Response body of `POST /clusters`: the request echoed back with an id.
/// Capacity fields are present only when the server computed them.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreatedCluster {
    pub id: String,
    pub name: String,
    pub region: String,
    pub nodes: u32,
    #[serde(default)]
    pub cpu: Option<String>,
    #[serde(default)]
    pub memory: Option<String>,
    #[serde(default)]
    pub storage: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl CreatedCluster {
    /// A freshly provisioned cluster: `starting`, zero cost, both
    /// timestamps set to `now`.
    pub(crate) fn into_cluster(self, now: DateTime<Utc>) -> Cluster {
        let nodes = self.nodes;
        Cluster {
            cpu: self
                .cpu
                .unwrap_or_else(|| format!("{} cores", nodes.saturating_mul(CORES_PER_NODE))),
            memory: self
                .memory
                .unwrap_or_else(|| format!("{} GB", nodes.saturating_mul(MEMORY_GB_PER_NODE))),
            storage: self
                .storage
                .unwrap_or_else(|| format!("{} GB", nodes.saturating_mul(STORAGE_GB_PER_NODE))),
            id: self.id,
            name: self.name,
            status: ClusterStatus::Starting,
            region: self.region,
            nodes,
            created_at: now,
            last_updated: now,
            cost: 0.0,
            tags: self.tags,
        }
    }
}

/// Partial update merged into an existing cluster. Status is driven by
/// lifecycle actions only and cannot be set here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nodes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl ClusterUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merge the present fields into `cluster` and stamp `last_updated`.
    pub fn apply(&self, cluster: &mut Cluster, now: DateTime<Utc>) {
        if let Some(ref name) = self.name {
            cluster.name.clone_from(name);
        }
        if let Some(ref region) = self.region {
            cluster.region.clone_from(region);
        }
        if let Some(nodes) = self.nodes {
            cluster.nodes = nodes;
        }
        if let Some(ref cpu) = self.cpu {
            cluster.cpu.clone_from(cpu);
        }
        if let Some(ref memory) = self.memory {
            cluster.memory.clone_from(memory);
        }
        if let Some(ref storage) = self.storage {
            cluster.storage.clone_from(storage);
        }
        if let Some(cost) = self.cost {
            cluster.cost = cost;
        }
        if let Some(ref tags) = self.tags {
            cluster.tags.clone_from(tags);
        }
        cluster.last_updated = now;
    }
}

/// Point-in-time utilization sample for one cluster.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterMetrics {
    /// Percent, 0-100.
    pub cpu_usage: f64,
    /// Percent, 0-100.
    pub memory_usage: f64,
    /// Percent, 0-100.
    pub storage_usage: f64,
    /// Mbps, 0-1000.
    pub network_in: f64,
    /// Mbps, 0-1000.
    pub network_out: f64,
    /// 0-99.
    pub active_connections: u32,
}
