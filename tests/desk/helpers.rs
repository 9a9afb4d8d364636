//! Shared test helpers for support desk integration tests.

use mockable::DefaultClock;
use rstest::fixture;
use std::io;
use std::sync::Arc;
use switchboard::{
    agent::{
        adapters::memory::InMemoryAgentDirectory,
        domain::{Agent, AgentRole},
    },
    bot::{adapters::memory::InMemoryTriggerRuleRepository, domain::TriggerRule, ports::TriggerRuleRepository},
    config::DeskConfig,
    conversation::adapters::memory::RoleBasedAccessPolicy,
    desk::{DeskBackends, InMemoryDesk, SupportDesk},
    session::domain::{SessionMetadata, SessionToken},
};
use tokio::runtime::Runtime;

/// Result type for integration tests.
pub type TestResult<T = ()> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// A running desk plus handles on its seeded backends.
pub struct Desk {
    /// The desk under test.
    pub desk: Arc<InMemoryDesk<DefaultClock>>,
    /// Trigger rule storage.
    pub rules: Arc<InMemoryTriggerRuleRepository>,
    /// Staff directory.
    pub agents: Arc<InMemoryAgentDirectory>,
}

impl Desk {
    /// Registers a staff member.
    ///
    /// # Errors
    ///
    /// Returns an error if the agent is invalid or the directory rejects it.
    pub fn staff(&self, name: &str, role: AgentRole) -> TestResult<Agent> {
        let agent = Agent::new(name, role)?;
        self.agents.upsert(agent.clone())?;
        Ok(agent)
    }

    /// Adds a trigger rule.
    ///
    /// # Errors
    ///
    /// Returns an error if the rule is invalid or cannot be stored.
    pub async fn rule(&self, pattern: &str, response: &str) -> TestResult {
        self.rules.store(&TriggerRule::new(pattern, response)?).await?;
        Ok(())
    }

    /// Opens a guest session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be stored.
    pub async fn guest(&self) -> TestResult<SessionToken> {
        let grant = self
            .desk
            .initialize_session(SessionMetadata::new().with_ip_address("203.0.113.7"))
            .await?;
        Ok(grant.token)
    }
}

/// Provides a multi-threaded tokio runtime for async operations in tests.
///
/// # Errors
///
/// Returns an error if the runtime cannot be created.
#[fixture]
pub fn runtime() -> io::Result<Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .enable_all()
        .build()
}

/// Builds a started desk with the role-based access policy.
///
/// # Errors
///
/// Returns an error if `config` is invalid.
pub fn build_desk(config: DeskConfig) -> TestResult<Desk> {
    let backends = DeskBackends::in_memory();
    let rules = Arc::clone(&backends.rules);
    let agents = Arc::clone(&backends.agents);
    let desk = SupportDesk::new(
        config,
        backends,
        Arc::new(RoleBasedAccessPolicy),
        Arc::new(DefaultClock),
    )?;
    desk.start();
    Ok(Desk {
        desk: Arc::new(desk),
        rules,
        agents,
    })
}

/// Provides a started desk with default configuration.
///
/// # Errors
///
/// Returns an error if the default configuration is invalid.
#[fixture]
pub fn desk() -> TestResult<Desk> {
    build_desk(DeskConfig::default())
}
