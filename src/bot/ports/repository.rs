//! Repository port for trigger rules.

use crate::bot::domain::{TriggerRule, TriggerRuleId};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for trigger rule repository operations.
pub type TriggerRuleRepositoryResult<T> = Result<T, TriggerRuleRepositoryError>;

/// Trigger rule persistence contract.
#[async_trait]
pub trait TriggerRuleRepository: Send + Sync {
    /// Stores a new rule.
    ///
    /// # Errors
    ///
    /// Returns [`TriggerRuleRepositoryError::Duplicate`] when the identifier
    /// is taken.
    async fn store(&self, rule: &TriggerRule) -> TriggerRuleRepositoryResult<()>;

    /// Lists active rules, highest priority first.
    async fn list_active(&self) -> TriggerRuleRepositoryResult<Vec<TriggerRule>>;

    /// Finds a rule by identifier.
    async fn find_by_id(&self, id: TriggerRuleId) -> TriggerRuleRepositoryResult<Option<TriggerRule>>;

    /// Atomically increments the usage counter and returns the new value.
    ///
    /// # Errors
    ///
    /// Returns [`TriggerRuleRepositoryError::NotFound`] when the rule does not
    /// exist.
    async fn record_usage(&self, id: TriggerRuleId) -> TriggerRuleRepositoryResult<u64>;
}

/// Errors returned by trigger rule repository implementations.
#[derive(Debug, Clone, Error)]
pub enum TriggerRuleRepositoryError {
    /// A rule with the same identifier already exists.
    #[error("duplicate trigger rule: {0}")]
    Duplicate(TriggerRuleId),

    /// The rule was not found.
    #[error("trigger rule not found: {0}")]
    NotFound(TriggerRuleId),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl TriggerRuleRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
