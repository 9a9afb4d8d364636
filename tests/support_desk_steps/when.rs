//! When steps for support desk BDD scenarios.

use super::world::{DeskWorld, run_async};
use eyre::WrapErr;
use rstest_bdd_macros::when;
use switchboard::conversation::{domain::ConversationStatus, services::StatusUpdate};

#[when(r#"the guest sends "{content}""#)]
fn guest_sends(world: &mut DeskWorld, content: String) -> Result<(), eyre::Report> {
    let token = world.guest_token()?;
    let outcome = run_async(world.desk.send_guest_message(token, &content))
        .wrap_err("send guest message")?;
    world.record_outcome(outcome);
    Ok(())
}

#[when(r#""{name}" replies "{content}""#)]
fn agent_replies(world: &mut DeskWorld, name: String, content: String) -> Result<(), eyre::Report> {
    let actor = world.member(&name)?.id();
    let conversation_id = world.conversation_id()?;
    run_async(
        world
            .desk
            .send_agent_message(actor, conversation_id, &content, false),
    )
    .wrap_err("send agent reply")?;
    Ok(())
}

#[when(r#""{name}" closes the conversation"#)]
fn agent_closes(world: &mut DeskWorld, name: String) -> Result<(), eyre::Report> {
    let actor = world.member(&name)?.id();
    let conversation_id = world.conversation_id()?;
    let closed = run_async(world.desk.close(actor, conversation_id))
        .wrap_err("close conversation")?;
    world.last_close = Some(closed);
    Ok(())
}

#[when(r#""{name}" sets the status to "{status}""#)]
fn sets_status(world: &mut DeskWorld, name: String, status: String) -> Result<(), eyre::Report> {
    let target = ConversationStatus::try_from(status.as_str())
        .map_err(|err| eyre::eyre!("invalid status in scenario: {err}"))?;
    let actor = world.member(&name)?.id();
    let conversation_id = world.conversation_id()?;
    let update = StatusUpdate {
        status: Some(target),
        ..StatusUpdate::default()
    };
    world.last_error = run_async(world.desk.update_status(actor, conversation_id, update)).err();
    Ok(())
}
