// kubecloud-core: reactive service layer between kubecloud-api and front-ends.

pub mod app;
pub mod config;
pub mod error;
pub mod gateway;
pub mod loading;
pub mod model;
pub mod notifications;
pub mod storage;
pub mod store;
pub mod stream;
pub mod validation;

// ── Primary re-exports ──────────────────────────────────────────────
pub use app::App;
pub use config::{AppConfig, ApiSettings, LifecycleSettings, MockSettings, NotificationSettings};
pub use error::{CoreError, ErrorKind};
pub use gateway::{Gateway, RequestOptions};
pub use loading::{LoadingState, LoadingTracker};
pub use notifications::{
    NewNotification, Notification, NotificationAction, NotificationId, NotificationLedger,
    NotificationOptions, Severity,
};
pub use storage::{FileStorage, KeyValueStore, MemoryStorage};
pub use store::{ClusterStore, SessionStore, StoreState};
pub use stream::{EntityStream, Snapshot};

pub use model::{
    Cluster, ClusterMetrics, ClusterStatus, ClusterUpdate, CreateClusterRequest, ProfileUpdate,
    Registration, User, UserRole,
};

// Transport helpers consumers compose with store actions.
pub use kubecloud_api::{RetryPolicy, with_retry};
