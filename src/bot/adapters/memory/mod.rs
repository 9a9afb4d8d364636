//! In-memory trigger rule adapter.

mod rules;

pub use rules::InMemoryTriggerRuleRepository;
