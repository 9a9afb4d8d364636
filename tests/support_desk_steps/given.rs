//! Given steps for support desk BDD scenarios.

use super::world::{DeskWorld, run_async};
use eyre::WrapErr;
use rstest_bdd_macros::given;
use switchboard::{
    agent::domain::{Agent, AgentRole},
    bot::{domain::TriggerRule, ports::TriggerRuleRepository},
    session::domain::SessionMetadata,
};

fn register(world: &mut DeskWorld, name: String, role: AgentRole) -> Result<(), eyre::Report> {
    let agent = Agent::new(&name, role).wrap_err("build scenario staff member")?;
    world
        .agents
        .upsert(agent.clone())
        .wrap_err("register scenario staff member")?;
    world.staff.insert(name, agent);
    Ok(())
}

#[given(r#"a trigger rule "{pattern}" answering "{response}""#)]
fn trigger_rule(
    world: &mut DeskWorld,
    pattern: String,
    response: String,
) -> Result<(), eyre::Report> {
    let rule = TriggerRule::new(&pattern, &response).wrap_err("build trigger rule")?;
    run_async(world.rules.store(&rule)).wrap_err("store trigger rule")?;
    Ok(())
}

#[given("a guest with a session")]
fn guest_with_session(world: &mut DeskWorld) -> Result<(), eyre::Report> {
    let feed = run_async(world.desk.subscribe_admin(world.supervisor.id()))
        .wrap_err("subscribe supervisor to the admin channel")?;
    let grant = run_async(
        world
            .desk
            .initialize_session(SessionMetadata::new().with_ip_address("203.0.113.7")),
    )
    .wrap_err("initialize guest session")?;
    world.admin_feed = Some(feed);
    world.token = Some(grant.token);
    Ok(())
}

#[given(r#"an admin named "{name}""#)]
fn admin_named(world: &mut DeskWorld, name: String) -> Result<(), eyre::Report> {
    register(world, name, AgentRole::Admin)
}

#[given(r#"an agent named "{name}""#)]
fn agent_named(world: &mut DeskWorld, name: String) -> Result<(), eyre::Report> {
    register(world, name, AgentRole::Agent)
}

#[given(r#"the guest has sent "{content}""#)]
fn guest_has_sent(world: &mut DeskWorld, content: String) -> Result<(), eyre::Report> {
    let token = world.guest_token()?;
    let outcome = run_async(world.desk.send_guest_message(token, &content))
        .wrap_err("send guest message in scenario setup")?;
    world.record_outcome(outcome);
    Ok(())
}

#[given(r#""{name}" has closed the conversation"#)]
fn has_closed(world: &mut DeskWorld, name: String) -> Result<(), eyre::Report> {
    let actor = world.member(&name)?.id();
    let conversation_id = world.conversation_id()?;
    let closed = run_async(world.desk.close(actor, conversation_id))
        .wrap_err("close conversation in scenario setup")?;
    world.last_close = Some(closed);
    Ok(())
}
