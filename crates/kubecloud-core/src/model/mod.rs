// ── Domain model ──
//
// Canonical representations of the entities the stores own. Wire names
// are camelCase to match the REST payloads; timestamps are UTC.

pub mod cluster;
pub mod user;

pub use cluster::{Cluster, ClusterMetrics, ClusterStatus, ClusterUpdate, CreateClusterRequest};
pub use user::{ProfileUpdate, Registration, User, UserRole};

/// An entity with a stable string identifier, held by an ordered store
/// collection.
pub trait Entity: Clone + Send + Sync + 'static {
    fn id(&self) -> &str;
}
