//! Port contracts for trigger rule storage.

pub mod repository;

pub use repository::{
    TriggerRuleRepository, TriggerRuleRepositoryError, TriggerRuleRepositoryResult,
};
