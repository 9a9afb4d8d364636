//! Shared world state for support desk BDD scenarios.

use std::collections::HashMap;
use std::sync::Arc;

use mockable::DefaultClock;
use rstest::fixture;
use switchboard::{
    agent::{
        adapters::memory::InMemoryAgentDirectory,
        domain::{Agent, AgentRole},
    },
    bot::adapters::memory::InMemoryTriggerRuleRepository,
    broadcast::Subscription,
    config::DeskConfig,
    conversation::{
        adapters::memory::RoleBasedAccessPolicy, domain::ConversationId,
        services::ClosedConversation,
    },
    desk::{DeskBackends, DeskError, InMemoryDesk, SupportDesk},
    routing::RoutingOutcome,
    session::domain::SessionToken,
};

/// Scenario world for support desk behaviour tests.
pub struct DeskWorld {
    pub desk: InMemoryDesk<DefaultClock>,
    pub rules: Arc<InMemoryTriggerRuleRepository>,
    pub agents: Arc<InMemoryAgentDirectory>,
    /// Admin used to inspect state without appearing in scenarios.
    pub supervisor: Agent,
    /// Admin channel feed opened with the guest session.
    pub admin_feed: Option<Subscription>,
    pub staff: HashMap<String, Agent>,
    pub token: Option<SessionToken>,
    pub first_conversation: Option<ConversationId>,
    pub conversation: Option<ConversationId>,
    pub last_outcome: Option<RoutingOutcome>,
    pub last_close: Option<ClosedConversation>,
    pub last_error: Option<DeskError>,
}

impl DeskWorld {
    /// Creates a started desk with the role-based policy and no staff.
    #[must_use]
    pub fn new() -> Self {
        let backends = DeskBackends::in_memory();
        let rules = Arc::clone(&backends.rules);
        let agents = Arc::clone(&backends.agents);
        let desk = SupportDesk::new(
            DeskConfig::default(),
            backends,
            Arc::new(RoleBasedAccessPolicy),
            Arc::new(DefaultClock),
        )
        .expect("default config is valid");
        desk.start();
        let supervisor = Agent::new("Desk Supervisor", AgentRole::SuperAdmin).expect("valid agent");
        agents
            .upsert(supervisor.clone())
            .expect("directory accepts supervisor");

        Self {
            desk,
            rules,
            agents,
            supervisor,
            admin_feed: None,
            staff: HashMap::new(),
            token: None,
            first_conversation: None,
            conversation: None,
            last_outcome: None,
            last_close: None,
            last_error: None,
        }
    }

    /// Returns the staff member registered under `name`.
    pub fn member(&self, name: &str) -> Result<&Agent, eyre::Report> {
        self.staff
            .get(name)
            .ok_or_else(|| eyre::eyre!("no staff member named {name} in scenario world"))
    }

    /// Returns the guest session token.
    pub fn guest_token(&self) -> Result<SessionToken, eyre::Report> {
        self.token
            .ok_or_else(|| eyre::eyre!("missing guest session in scenario world"))
    }

    /// Returns the conversation the scenario is about.
    pub fn conversation_id(&self) -> Result<ConversationId, eyre::Report> {
        self.conversation
            .ok_or_else(|| eyre::eyre!("missing conversation in scenario world"))
    }

    /// Records the outcome of a guest message.
    pub fn record_outcome(&mut self, outcome: RoutingOutcome) {
        let id = outcome.conversation.id();
        self.first_conversation.get_or_insert(id);
        self.conversation = Some(id);
        self.last_outcome = Some(outcome);
    }
}

impl Default for DeskWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> DeskWorld {
    DeskWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
