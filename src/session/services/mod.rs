//! Application services for guest sessions.

mod store;

pub use store::{SessionStore, SessionStoreError, SessionStoreResult};
