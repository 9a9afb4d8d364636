//! Shared fixtures for conversation tests.

use std::sync::Arc;

use rstest::fixture;

use crate::agent::domain::{Agent, AgentRole};
use crate::conversation::{
    adapters::memory::{InMemoryConversationRepository, RecordingEventSink},
    ports::ConversationEventSink,
    services::{Actor, ConversationRegistry, RegistryConfig},
};
use crate::test_support::ManualClock;

pub(super) type TestRegistry = ConversationRegistry<InMemoryConversationRepository, ManualClock>;

pub(super) struct Harness {
    pub registry: Arc<TestRegistry>,
    pub repository: Arc<InMemoryConversationRepository>,
    pub events: Arc<RecordingEventSink>,
    pub clock: Arc<ManualClock>,
}

#[fixture]
pub(super) fn harness() -> Harness {
    let clock = Arc::new(ManualClock::starting_2026());
    let repository = Arc::new(InMemoryConversationRepository::new());
    let events = Arc::new(RecordingEventSink::new());
    let sink: Arc<dyn ConversationEventSink> = events.clone();
    let registry = ConversationRegistry::new(
        Arc::clone(&repository),
        Arc::clone(&clock),
        sink,
        RegistryConfig::default(),
    );
    Harness {
        registry: Arc::new(registry),
        repository,
        events,
        clock,
    }
}

#[fixture]
pub(super) fn agent() -> Agent {
    Agent::new("Priya Shah", AgentRole::Agent).expect("valid agent")
}

pub(super) fn actor(agent: &Agent) -> Actor {
    Actor::from(agent)
}
