//! Then steps for support desk BDD scenarios.

use super::world::{DeskWorld, run_async};
use eyre::WrapErr;
use rstest_bdd_macros::then;
use switchboard::{
    conversation::domain::{
        ConversationEvent, ConversationMetric, ConversationStatus, MessageKind, Resolution, Sender,
    },
    desk::ConversationDetail,
    routing::RoutingOutcome,
};

fn outcome(world: &DeskWorld) -> Result<&RoutingOutcome, eyre::Report> {
    world
        .last_outcome
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing routing outcome in scenario world"))
}

fn detail(world: &DeskWorld) -> Result<ConversationDetail, eyre::Report> {
    let conversation_id = world.conversation_id()?;
    run_async(
        world
            .desk
            .get_conversation_detail(world.supervisor.id(), conversation_id),
    )
    .wrap_err("load conversation detail")
}

fn close_metric(world: &DeskWorld) -> Result<ConversationMetric, eyre::Report> {
    let conversation_id = world.conversation_id()?;
    run_async(world.desk.metric(world.supervisor.id(), conversation_id))
        .wrap_err("load close metric")?
        .ok_or_else(|| eyre::eyre!("no close metric recorded"))
}

fn expect_metric(
    world: &DeskWorld,
    count: u64,
    resolution: Resolution,
) -> Result<(), eyre::Report> {
    let metric = close_metric(world)?;
    if metric.total_messages() != count || metric.resolution() != resolution {
        return Err(eyre::eyre!(
            "expected {count} messages with {resolution:?}, got {} with {:?}",
            metric.total_messages(),
            metric.resolution()
        ));
    }
    Ok(())
}

#[then(r#"the bot replies "{text}""#)]
fn bot_replies(world: &DeskWorld, text: String) -> Result<(), eyre::Report> {
    let bot = outcome(world)?
        .bot_message
        .as_ref()
        .ok_or_else(|| eyre::eyre!("bot did not reply"))?;
    if bot.content() != text || !bot.is_bot_message() {
        return Err(eyre::eyre!("unexpected bot reply {:?}", bot.content()));
    }
    if !bot.confidence_score().is_some_and(|score| score >= 0.8) {
        return Err(eyre::eyre!("bot reply carries no usable confidence score"));
    }
    Ok(())
}

#[then("the reply does not need a human")]
fn reply_needs_no_human(world: &DeskWorld) -> Result<(), eyre::Report> {
    if outcome(world)?.requires_human {
        return Err(eyre::eyre!("expected the bot to handle the message alone"));
    }
    Ok(())
}

#[then("the bot does not reply")]
fn bot_stays_silent(world: &DeskWorld) -> Result<(), eyre::Report> {
    let outcome = outcome(world)?;
    if outcome.bot_message.is_some() || !outcome.requires_human {
        return Err(eyre::eyre!("expected the message to be escalated"));
    }
    Ok(())
}

#[then(r#"the guest is told "{notice}""#)]
fn guest_is_told(world: &DeskWorld, notice: String) -> Result<(), eyre::Report> {
    let actual = outcome(world)?.notice.as_deref();
    if actual != Some(notice.as_str()) {
        return Err(eyre::eyre!("expected notice {notice:?}, got {actual:?}"));
    }
    Ok(())
}

#[then(r#"the conversation is "{status}""#)]
fn conversation_is(world: &DeskWorld, status: String) -> Result<(), eyre::Report> {
    let expected = ConversationStatus::try_from(status.as_str())
        .map_err(|err| eyre::eyre!("invalid expected status in scenario: {err}"))?;
    let actual = detail(world)?.conversation.status();
    if actual != expected {
        return Err(eyre::eyre!("expected status {expected}, got {actual}"));
    }
    Ok(())
}

#[then("no agent is assigned")]
fn nobody_assigned(world: &DeskWorld) -> Result<(), eyre::Report> {
    if let Some(agent_id) = detail(world)?.conversation.assigned_agent() {
        return Err(eyre::eyre!("expected no assignee, found {agent_id}"));
    }
    Ok(())
}

#[then(r#"the conversation is assigned to "{name}""#)]
fn assigned_to(world: &DeskWorld, name: String) -> Result<(), eyre::Report> {
    let expected = world.member(&name)?.id();
    let actual = detail(world)?.conversation.assigned_agent();
    if actual != Some(expected) {
        return Err(eyre::eyre!("expected {name} to be assigned, got {actual:?}"));
    }
    Ok(())
}

#[then(r#"the conversation passed through "{status}" twice"#)]
fn passed_through_twice(world: &mut DeskWorld, status: String) -> Result<(), eyre::Report> {
    let expected = ConversationStatus::try_from(status.as_str())
        .map_err(|err| eyre::eyre!("invalid expected status in scenario: {err}"))?;
    let conversation_id = world.conversation_id()?;
    let feed = world
        .admin_feed
        .as_mut()
        .ok_or_else(|| eyre::eyre!("missing admin feed in scenario world"))?;
    let mut entered = 0;
    while let Ok(envelope) = feed.try_recv() {
        match &envelope.event {
            ConversationEvent::StatusChanged { conversation, .. }
                if conversation.id == conversation_id && conversation.status == expected =>
            {
                entered += 1;
            }
            _ => {}
        }
    }
    if entered != 2 {
        return Err(eyre::eyre!("expected to enter {expected} twice, entered {entered} times"));
    }
    Ok(())
}

#[then(r#"the close metric counts {count:u64} messages resolved by an agent"#)]
fn metric_resolved_by_agent(world: &DeskWorld, count: u64) -> Result<(), eyre::Report> {
    expect_metric(world, count, Resolution::ResolvedByAgent)
}

#[then(r#"the close metric counts {count:u64} messages resolved by the bot"#)]
fn metric_resolved_by_bot(world: &DeskWorld, count: u64) -> Result<(), eyre::Report> {
    expect_metric(world, count, Resolution::ResolvedByBot)
}

#[then(r#"the last message is the closing notice from "{name}""#)]
fn closing_notice_from(world: &DeskWorld, name: String) -> Result<(), eyre::Report> {
    let agent_id = world.member(&name)?.id();
    let detail = detail(world)?;
    let last = detail
        .messages
        .last()
        .ok_or_else(|| eyre::eyre!("conversation has no messages"))?;
    if last.kind() != MessageKind::System || last.sender() != Sender::User(agent_id) {
        return Err(eyre::eyre!("last message is not a closing notice from {name}"));
    }
    let closed = world
        .last_close
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing close result in scenario world"))?;
    if closed.closing_message.id() != last.id() {
        return Err(eyre::eyre!("close result and stored closing message differ"));
    }
    Ok(())
}

#[then(r#"closing again as "{name}" fails with "{kind}""#)]
fn closing_again_fails(world: &DeskWorld, name: String, kind: String) -> Result<(), eyre::Report> {
    let actor = world.member(&name)?.id();
    let conversation_id = world.conversation_id()?;
    match run_async(world.desk.close(actor, conversation_id)) {
        Ok(_) => Err(eyre::eyre!("second close unexpectedly succeeded")),
        Err(err) if err.kind().as_str() == kind => Ok(()),
        Err(err) => Err(eyre::eyre!("expected {kind}, got {err}")),
    }
}

#[then(r#"the change fails with "{kind}""#)]
fn change_fails(world: &DeskWorld, kind: String) -> Result<(), eyre::Report> {
    let err = world
        .last_error
        .as_ref()
        .ok_or_else(|| eyre::eyre!("expected the change to fail"))?;
    if err.kind().as_str() != kind {
        return Err(eyre::eyre!("expected {kind}, got {err}"));
    }
    Ok(())
}

#[then("the guest is in a new conversation")]
fn guest_in_new_conversation(world: &DeskWorld) -> Result<(), eyre::Report> {
    let first = world
        .first_conversation
        .ok_or_else(|| eyre::eyre!("missing first conversation in scenario world"))?;
    let current = world.conversation_id()?;
    if first == current {
        return Err(eyre::eyre!("guest message landed on the closed conversation"));
    }
    Ok(())
}

#[then(r#"the guest history shows {count:u64} message"#)]
fn history_shows(world: &DeskWorld, count: u64) -> Result<(), eyre::Report> {
    let token = world.guest_token()?;
    let history = run_async(world.desk.get_history(token, None)).wrap_err("load guest history")?;
    let shown = u64::try_from(history.messages.len()).wrap_err("history length")?;
    if shown != count {
        return Err(eyre::eyre!("expected {count} messages in history, got {shown}"));
    }
    Ok(())
}
