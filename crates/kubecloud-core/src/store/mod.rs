// ── Resource stores ──
//
// Each store owns an ordered entity collection plus `{is_loading, error,
// selected}` state, both broadcast over `watch` channels. Actions go
// through the gateway and mutate the collection on success.

mod cluster;
mod collection;
mod lifecycle;
mod session;
mod state;

pub use cluster::ClusterStore;
pub use session::{SessionStore, TOKEN_KEY, USER_KEY};
pub use state::StoreState;
