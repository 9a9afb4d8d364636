//! In-memory repository for trigger rules.

use async_trait::async_trait;
use std::cmp::Reverse;
use std::sync::{Arc, RwLock};

use crate::bot::{
    domain::{TriggerRule, TriggerRuleId},
    ports::{TriggerRuleRepository, TriggerRuleRepositoryError, TriggerRuleRepositoryResult},
};

/// Thread-safe in-memory rule repository. Equal priorities keep insertion
/// order.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTriggerRuleRepository {
    rules: Arc<RwLock<Vec<TriggerRule>>>,
}

impl InMemoryTriggerRuleRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned(err: impl ToString) -> TriggerRuleRepositoryError {
    TriggerRuleRepositoryError::persistence(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl TriggerRuleRepository for InMemoryTriggerRuleRepository {
    async fn store(&self, rule: &TriggerRule) -> TriggerRuleRepositoryResult<()> {
        let mut rules = self.rules.write().map_err(poisoned)?;
        if rules.iter().any(|existing| existing.id() == rule.id()) {
            return Err(TriggerRuleRepositoryError::Duplicate(rule.id()));
        }
        rules.push(rule.clone());
        Ok(())
    }

    async fn list_active(&self) -> TriggerRuleRepositoryResult<Vec<TriggerRule>> {
        let rules = self.rules.read().map_err(poisoned)?;
        let mut active: Vec<TriggerRule> =
            rules.iter().filter(|rule| rule.is_active()).cloned().collect();
        active.sort_by_key(|rule| Reverse(rule.priority()));
        Ok(active)
    }

    async fn find_by_id(&self, id: TriggerRuleId) -> TriggerRuleRepositoryResult<Option<TriggerRule>> {
        let rules = self.rules.read().map_err(poisoned)?;
        Ok(rules.iter().find(|rule| rule.id() == id).cloned())
    }

    async fn record_usage(&self, id: TriggerRuleId) -> TriggerRuleRepositoryResult<u64> {
        let mut rules = self.rules.write().map_err(poisoned)?;
        let rule = rules
            .iter_mut()
            .find(|rule| rule.id() == id)
            .ok_or(TriggerRuleRepositoryError::NotFound(id))?;
        Ok(rule.record_usage())
    }
}
