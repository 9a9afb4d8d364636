//! Domain model for guest sessions.

mod error;
mod ids;
mod session;

pub use error::SessionDomainError;
pub use ids::SessionToken;
pub use session::{GuestSession, PersistedSessionData, SessionMetadata, SessionTtl};
