//! First-match-wins resolution of guest messages against trigger rules.

use crate::bot::{
    domain::{Confidence, MatchResult, PatternError, TriggerRule},
    ports::{TriggerRuleRepository, TriggerRuleRepositoryError},
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::IteratorRandom;
use regex::{Regex, RegexBuilder};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use thiserror::Error;
use tracing::{debug, warn};

const PATTERN_SIZE_LIMIT: usize = 1 << 20;

/// Service-level errors for bot matching.
#[derive(Debug, Error)]
pub enum BotMatcherError {
    /// Repository operation failed.
    #[error(transparent)]
    Repository(#[from] TriggerRuleRepositoryError),
}

/// Result type for bot matcher operations.
pub type BotMatcherResult<T> = Result<T, BotMatcherError>;

/// Resolves message content to a bot reply.
///
/// Compiled patterns are cached by pattern text, including failures, so a
/// malformed rule is reported once and then skipped quietly.
pub struct BotMatcher<R>
where
    R: TriggerRuleRepository,
{
    repository: Arc<R>,
    patterns: RwLock<HashMap<String, Option<Regex>>>,
    rng: Mutex<StdRng>,
}

impl<R> BotMatcher<R>
where
    R: TriggerRuleRepository,
{
    /// Creates a matcher that picks reply variations at random.
    #[must_use]
    pub fn new(repository: Arc<R>) -> Self {
        Self::with_rng(repository, StdRng::from_entropy())
    }

    /// Creates a matcher whose variation choice is reproducible.
    #[must_use]
    pub fn with_seed(repository: Arc<R>, seed: u64) -> Self {
        Self::with_rng(repository, StdRng::seed_from_u64(seed))
    }

    fn with_rng(repository: Arc<R>, rng: StdRng) -> Self {
        Self {
            repository,
            patterns: RwLock::new(HashMap::new()),
            rng: Mutex::new(rng),
        }
    }

    /// Finds the first active rule, by descending priority, whose pattern
    /// occurs in `content` ignoring case.
    ///
    /// On a match the rule's usage counter is incremented and the reply is
    /// drawn uniformly from the base text and its variations. Returns `None`
    /// when nothing matches.
    ///
    /// # Errors
    ///
    /// Returns [`BotMatcherError::Repository`] when rules cannot be loaded or
    /// the usage counter cannot be updated.
    pub async fn match_message(&self, content: &str) -> BotMatcherResult<Option<MatchResult>> {
        let rules = self.repository.list_active().await?;
        let Some((rule, occurrences)) = self.first_match(&rules, content) else {
            debug!("no trigger rule matched");
            return Ok(None);
        };

        let uses = self.repository.record_usage(rule.id()).await?;
        let confidence = Confidence::from_occurrences(occurrences);
        debug!(
            rule_id = %rule.id(),
            occurrences,
            confidence = confidence.value(),
            uses,
            "trigger rule matched"
        );
        Ok(Some(MatchResult {
            rule_id: rule.id(),
            response_text: self.pick_reply(rule),
            confidence,
            intent: rule.intent().map(ToOwned::to_owned),
        }))
    }

    fn first_match<'a>(
        &self,
        rules: &'a [TriggerRule],
        content: &str,
    ) -> Option<(&'a TriggerRule, usize)> {
        let mut ordered: Vec<&TriggerRule> = rules.iter().filter(|rule| rule.is_active()).collect();
        ordered.sort_by_key(|rule| std::cmp::Reverse(rule.priority()));
        ordered.into_iter().find_map(|rule| {
            let pattern = self.compiled(rule)?;
            let occurrences = pattern.find_iter(content).count();
            (occurrences > 0).then_some((rule, occurrences))
        })
    }

    fn compiled(&self, rule: &TriggerRule) -> Option<Regex> {
        if let Some(cached) = self
            .patterns
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(rule.pattern())
        {
            return cached.clone();
        }

        let compiled = match RegexBuilder::new(rule.pattern())
            .case_insensitive(true)
            .size_limit(PATTERN_SIZE_LIMIT)
            .build()
        {
            Ok(regex) => Some(regex),
            Err(source) => {
                let error = PatternError {
                    rule_id: rule.id(),
                    pattern: rule.pattern().to_owned(),
                    source,
                };
                warn!(rule_id = %rule.id(), %error, "skipping trigger rule with malformed pattern");
                None
            }
        };
        self.patterns
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(rule.pattern().to_owned(), compiled.clone());
        compiled
    }

    fn pick_reply(&self, rule: &TriggerRule) -> String {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        rule.replies()
            .choose(&mut *rng)
            .unwrap_or_else(|| rule.response())
            .to_owned()
    }
}
