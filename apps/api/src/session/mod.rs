// Session lifecycle: storage with timeout eviction, client/server state
// reconciliation, and the read-only status endpoints.

pub mod handlers;
pub mod reconcile;
pub mod store;

pub use store::{spawn_sweeper, InMemorySessionStore, SessionStore};
