//! Transport layer for the KubeCloud cluster API.
//!
//! Everything below the service layer lives here:
//!
//! - **[`HttpClient`]**: thin `reqwest` wrapper that joins endpoints onto a
//!   base URL, sends JSON, and turns non-2xx responses into [`Error::Http`]
//!   using the server's `{ "message": ... }` body when one is present.
//! - **[`MockBackend`]**: in-memory stand-in for the REST surface
//!   (`/clusters`, `/auth/*`, `/users/:id`) with configurable latency and
//!   error injection.
//! - **[`Backend`]**: the dispatch seam between the two, selected once at
//!   startup.
//! - **[`Deadline`]**: a cancellation token that fires after a timeout and
//!   aborts whatever future it guards.
//! - **[`with_retry`]**: exponential-backoff retry for any fallible async
//!   operation.

pub mod backend;
pub mod deadline;
pub mod error;
pub mod http;
pub mod mock;
pub mod request;
pub mod retry;
pub mod transport;

pub use backend::Backend;
pub use deadline::Deadline;
pub use error::Error;
pub use http::HttpClient;
pub use mock::{MockBackend, MockConfig};
pub use request::{ApiResponse, Envelope, Method, RawResponse, Request};
pub use retry::{RetryPolicy, with_retry};
pub use transport::TransportConfig;
