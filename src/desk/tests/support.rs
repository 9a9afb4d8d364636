//! Shared fixtures for desk tests.

use std::sync::Arc;

use rstest::fixture;

use crate::agent::{
    adapters::memory::InMemoryAgentDirectory,
    domain::{Agent, AgentRole},
};
use crate::bot::adapters::memory::InMemoryTriggerRuleRepository;
use crate::config::DeskConfig;
use crate::conversation::{adapters::memory::RoleBasedAccessPolicy, ports::ConversationAccessPolicy};
use crate::desk::{DeskBackends, InMemoryDesk, SupportDesk};
use crate::session::domain::{SessionMetadata, SessionToken};
use crate::test_support::ManualClock;

pub(super) struct Harness {
    pub desk: InMemoryDesk<ManualClock>,
    pub rules: Arc<InMemoryTriggerRuleRepository>,
    pub agents: Arc<InMemoryAgentDirectory>,
    pub clock: Arc<ManualClock>,
}

impl Harness {
    pub fn staff(&self, name: &str, role: AgentRole) -> Agent {
        let agent = Agent::new(name, role).expect("valid agent");
        self.agents.upsert(agent.clone()).expect("directory accepts agent");
        agent
    }

    pub async fn guest(&self) -> eyre::Result<SessionToken> {
        Ok(self
            .desk
            .initialize_session(SessionMetadata::new().with_user_agent("Firefox/128.0"))
            .await?
            .token)
    }
}

pub(super) fn build(access: Arc<dyn ConversationAccessPolicy>) -> Harness {
    let clock = Arc::new(ManualClock::starting_2026());
    let backends = DeskBackends::in_memory();
    let rules = Arc::clone(&backends.rules);
    let agents = Arc::clone(&backends.agents);
    let desk = SupportDesk::new(DeskConfig::default(), backends, access, Arc::clone(&clock))
        .expect("default config is valid");
    desk.start();
    Harness {
        desk,
        rules,
        agents,
        clock,
    }
}

#[fixture]
pub(super) fn harness() -> Harness {
    build(Arc::new(RoleBasedAccessPolicy))
}
