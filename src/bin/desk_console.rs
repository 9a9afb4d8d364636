//! Runs a support desk in the terminal, one guest message per input line.
//!
//! Usage:
//!
//! ```text
//! desk_console [config-path]
//! ```
//!
//! The optional TOML file at `config-path` is layered over the defaults and
//! `SWITCHBOARD_*` environment variables. The desk starts with a few trigger
//! rules and one available agent, so unmatched messages show escalation and
//! auto-assignment. `RUST_LOG` controls log output on stderr.

use mockable::DefaultClock;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use switchboard::{
    agent::domain::{Agent, AgentRole},
    bot::{domain::TriggerRule, ports::TriggerRuleRepository},
    config::DeskConfig,
    conversation::adapters::memory::RoleBasedAccessPolicy,
    desk::{DeskBackends, SupportDesk},
    routing::RoutingOutcome,
    session::domain::SessionMetadata,
    telemetry,
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::runtime::Builder;

/// Boxed error type for the main result.
type BoxError = Box<dyn std::error::Error + Send + Sync>;

fn main() -> Result<(), BoxError> {
    telemetry::init_tracing("info")?;
    let config = match env::args_os().nth(1) {
        Some(path) => DeskConfig::load_from_path(&PathBuf::from(path))?,
        None => DeskConfig::load()?,
    };
    let runtime = Builder::new_multi_thread().enable_all().build()?;
    runtime.block_on(run(config))
}

async fn run(config: DeskConfig) -> Result<(), BoxError> {
    let backends = DeskBackends::in_memory();
    seed_rules(backends.rules.as_ref()).await?;
    backends
        .agents
        .upsert(Agent::new("Console Agent", AgentRole::Agent)?)?;

    let desk = SupportDesk::new(
        config,
        backends,
        Arc::new(RoleBasedAccessPolicy),
        Arc::new(DefaultClock),
    )?;
    desk.start();
    let grant = desk
        .initialize_session(SessionMetadata::new().with_user_agent("desk_console"))
        .await?;

    let mut stdout = tokio::io::stdout();
    stdout
        .write_all(format!("session {} until {}\n", grant.token, grant.expires_at).as_bytes())
        .await?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let reply = match desk.send_guest_message(grant.token, &line).await {
            Ok(outcome) => describe(&outcome),
            Err(err) => format!("! {}", err.guest_notice()),
        };
        stdout.write_all(reply.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
    }

    desk.shutdown().await;
    Ok(())
}

fn describe(outcome: &RoutingOutcome) -> String {
    let reference = outcome.conversation.reference_id();
    let status = outcome.conversation.status();
    match (&outcome.bot_message, &outcome.notice) {
        (Some(bot), _) => format!(
            "[{reference} {status}] bot ({:.2}): {}",
            bot.confidence_score().unwrap_or_default(),
            bot.content()
        ),
        (None, Some(notice)) => format!("[{reference} {status}] {notice}"),
        (None, None) => format!("[{reference} {status}]"),
    }
}

async fn seed_rules(rules: &impl TriggerRuleRepository) -> Result<(), BoxError> {
    let seeded = [
        TriggerRule::new(r"\b(hello|hi|hey)\b", "Hi there! How can I help you today?")?
            .with_variations(["Hello! What can I do for you?"])?
            .with_intent("greeting"),
        TriggerRule::new(r"\b(order|shipping|delivery)\b", "You can track orders under My Account > Orders.")?
            .with_intent("order_status")
            .with_priority(10),
        TriggerRule::new(r"\b(thanks|thank you)\b", "You're welcome!")?.with_intent("gratitude"),
    ];
    for rule in &seeded {
        rules.store(rule).await?;
    }
    Ok(())
}
