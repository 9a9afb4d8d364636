//! Port contracts for guest session persistence.

pub mod repository;

pub use repository::{GuestSessionRepository, SessionRepositoryError, SessionRepositoryResult};
