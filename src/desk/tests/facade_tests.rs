//! Guest and agent channel flows over the in-memory desk.

use chrono::TimeDelta;
use eyre::Result;
use mockable::Clock;
use rstest::rstest;

use super::support::{Harness, harness};
use crate::agent::{
    domain::{AgentId, AgentRole, AgentStatus},
    ports::AgentDirectory,
};
use crate::bot::{domain::TriggerRule, ports::TriggerRuleRepository};
use crate::conversation::{
    domain::{ConversationEvent, ConversationStatus, EventChannel, MessageKind, Priority, Sender},
    ports::ConversationQuery,
    services::StatusUpdate,
};
use crate::desk::{ErrorKind, GuestHistory};
use crate::session::domain::SessionToken;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn new_sessions_expire_after_a_day(harness: Harness) -> Result<()> {
    let grant = harness
        .desk
        .initialize_session(Default::default())
        .await?;

    assert_eq!(grant.expires_at, harness.clock.utc() + TimeDelta::hours(24));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn bot_reply_is_returned_to_the_guest(harness: Harness) -> Result<()> {
    harness
        .rules
        .store(&TriggerRule::new("hello", "Hi there!")?)
        .await?;
    let token = harness.guest().await?;

    let outcome = harness.desk.send_guest_message(token, "hello").await?;

    assert_eq!(
        outcome.bot_message.map(|message| message.content().to_owned()),
        Some("Hi there!".to_owned())
    );
    assert!(!outcome.requires_human);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn history_hides_internal_notes(harness: Harness) -> Result<()> {
    let admin = harness.staff("Dana Okafor", AgentRole::Admin);
    let token = harness.guest().await?;
    let outcome = harness.desk.send_guest_message(token, "My order is late").await?;
    let conversation_id = outcome.conversation.id();

    harness
        .desk
        .send_agent_message(admin.id(), conversation_id, "Checking courier status", true)
        .await?;
    harness
        .desk
        .send_agent_message(admin.id(), conversation_id, "Let me look into it", false)
        .await?;

    let history = harness.desk.get_history(token, None).await?;
    let contents: Vec<&str> = history.messages.iter().map(|m| m.content()).collect();
    assert_eq!(contents, ["My order is late", "Let me look into it"]);
    assert_eq!(history.status, Some(ConversationStatus::Waiting));
    assert_eq!(
        history.reference_id.map(|reference| reference.to_string()),
        Some("CHAT-2026-000001".to_owned())
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn history_without_a_conversation_is_empty(harness: Harness) -> Result<()> {
    let token = harness.guest().await?;

    let history = harness.desk.get_history(token, Some(10)).await?;

    assert_eq!(history, GuestHistory::default());
    Ok(())
}

#[rstest]
#[case(Some(2), 2)]
#[case(Some(0), 1)]
#[case(None, 3)]
#[tokio::test(flavor = "multi_thread")]
async fn history_limit_is_clamped(
    harness: Harness,
    #[case] limit: Option<usize>,
    #[case] expected: usize,
) -> Result<()> {
    let token = harness.guest().await?;
    for content in ["first", "second", "third"] {
        harness.desk.send_guest_message(token, content).await?;
    }

    let history = harness.desk.get_history(token, limit).await?;

    assert_eq!(history.messages.len(), expected);
    assert_eq!(
        history.messages.last().map(|m| m.content().to_owned()),
        Some("third".to_owned())
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn expired_sessions_get_the_expired_notice(harness: Harness) -> Result<()> {
    let token = harness.guest().await?;
    harness.clock.advance(TimeDelta::hours(25));

    let err = harness
        .desk
        .send_guest_message(token, "still there?")
        .await
        .expect_err("session expired");

    assert_eq!(err.kind(), ErrorKind::SessionExpired);
    assert_eq!(err.guest_notice(), "session expired");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unknown_sessions_are_invalid(harness: Harness) {
    let err = harness
        .desk
        .get_history(SessionToken::new(), None)
        .await
        .expect_err("unknown token");

    assert_eq!(err.kind(), ErrorKind::SessionInvalid);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn guest_read_receipts_apply_once(harness: Harness) -> Result<()> {
    let agent = harness.staff("Priya Shah", AgentRole::Agent);
    let token = harness.guest().await?;
    let outcome = harness.desk.send_guest_message(token, "Where is my refund?").await?;
    assert_eq!(outcome.assigned_agent(), Some(agent.id()));
    let reply = harness
        .desk
        .send_agent_message(agent.id(), outcome.conversation.id(), "Processing now", false)
        .await?;

    let first = harness.desk.mark_read(token, &[reply.id()]).await?;
    let second = harness.desk.mark_read(token, &[reply.id()]).await?;

    assert_eq!(first.len(), 1);
    assert_eq!(first.first().and_then(|m| m.read_at()), Some(harness.clock.utc()));
    assert!(second.is_empty());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn agent_replies_record_activity(harness: Harness) -> Result<()> {
    let agent = harness.staff("Priya Shah", AgentRole::Agent);
    let token = harness.guest().await?;
    let outcome = harness.desk.send_guest_message(token, "Help").await?;
    harness.clock.advance(TimeDelta::minutes(3));

    let reply = harness
        .desk
        .send_agent_message(agent.id(), outcome.conversation.id(), "Hello!", false)
        .await?;

    assert_eq!(reply.sender(), Sender::User(agent.id()));
    assert_eq!(reply.sender_name(), Some("Priya Shah"));
    let stored = harness.agents.find_by_id(agent.id()).await?.expect("agent stored");
    assert_eq!(stored.last_active_at(), Some(harness.clock.utc()));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn agents_see_only_their_own_conversations(harness: Harness) -> Result<()> {
    let assigned = harness.staff("Priya Shah", AgentRole::Agent);
    let other = harness.staff("Tomasz Nowak", AgentRole::Agent);
    let token = harness.guest().await?;
    let outcome = harness.desk.send_guest_message(token, "Help").await?;
    let conversation_id = outcome.conversation.id();
    assert_eq!(outcome.assigned_agent(), Some(assigned.id()));

    let denied = harness
        .desk
        .get_conversation_detail(other.id(), conversation_id)
        .await
        .expect_err("not assigned");
    let detail = harness
        .desk
        .get_conversation_detail(assigned.id(), conversation_id)
        .await?;

    assert_eq!(denied.kind(), ErrorKind::Forbidden);
    assert_eq!(detail.conversation.id(), conversation_id);
    assert_eq!(detail.messages.len(), 1);
    assert_eq!(
        detail.session.map(|session| session.token()),
        Some(token)
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn only_admins_assign(harness: Harness) -> Result<()> {
    let admin = harness.staff("Dana Okafor", AgentRole::Admin);
    let agent = harness
        .staff("Priya Shah", AgentRole::Agent)
        .with_status(AgentStatus::Busy);
    harness.agents.upsert(agent.clone())?;
    let token = harness.guest().await?;
    let outcome = harness.desk.send_guest_message(token, "Help").await?;
    let conversation_id = outcome.conversation.id();
    assert_eq!(outcome.conversation.status(), ConversationStatus::Waiting);

    let denied = harness
        .desk
        .assign(agent.id(), conversation_id, None)
        .await
        .expect_err("agents cannot assign");
    let to_agent = harness
        .desk
        .assign(admin.id(), conversation_id, Some(agent.id()))
        .await?;
    let to_self = harness.desk.assign(admin.id(), conversation_id, None).await?;

    assert_eq!(denied.kind(), ErrorKind::Forbidden);
    assert_eq!(to_agent.assigned_agent(), Some(agent.id()));
    assert_eq!(to_agent.status(), ConversationStatus::Active);
    assert_eq!(to_self.assigned_agent(), Some(admin.id()));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unknown_agents_are_not_found(harness: Harness) -> Result<()> {
    let admin = harness.staff("Dana Okafor", AgentRole::Admin);
    let token = harness.guest().await?;
    let outcome = harness.desk.send_guest_message(token, "Help").await?;

    let unknown_actor = harness
        .desk
        .list_waiting(AgentId::new())
        .await
        .expect_err("unknown actor");
    let unknown_assignee = harness
        .desk
        .assign(admin.id(), outcome.conversation.id(), Some(AgentId::new()))
        .await
        .expect_err("unknown assignee");

    assert_eq!(unknown_actor.kind(), ErrorKind::NotFound);
    assert_eq!(unknown_assignee.kind(), ErrorKind::NotFound);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn assigned_agent_closes_once(harness: Harness) -> Result<()> {
    let agent = harness.staff("Priya Shah", AgentRole::Agent);
    let token = harness.guest().await?;
    let outcome = harness.desk.send_guest_message(token, "Help").await?;
    let conversation_id = outcome.conversation.id();

    let closed = harness.desk.close(agent.id(), conversation_id).await?;
    let again = harness
        .desk
        .close(agent.id(), conversation_id)
        .await
        .expect_err("already closed");

    assert_eq!(closed.conversation.status(), ConversationStatus::Closed);
    assert_eq!(closed.conversation.closed_at(), Some(harness.clock.utc()));
    assert_eq!(closed.closing_message.kind(), MessageKind::System);
    assert_eq!(closed.closing_message.sender(), Sender::User(agent.id()));
    assert_eq!(again.kind(), ErrorKind::StateConflict);
    assert_eq!(
        harness.desk.metric(agent.id(), conversation_id).await?,
        Some(closed.metric)
    );
    let history = harness.desk.get_history(token, None).await?;
    assert_eq!(history.status, None);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn admins_edit_priority_tags_and_subject(harness: Harness) -> Result<()> {
    let admin = harness.staff("Dana Okafor", AgentRole::Admin);
    let token = harness.guest().await?;
    let outcome = harness.desk.send_guest_message(token, "Help").await?;

    let updated = harness
        .desk
        .update_status(
            admin.id(),
            outcome.conversation.id(),
            StatusUpdate {
                status: Some(ConversationStatus::Active),
                priority: Some(Priority::Urgent),
                tags: Some(vec!["billing".to_owned(), " refund ".to_owned()]),
                subject: Some("  Double charge on invoice 4417 ".to_owned()),
            },
        )
        .await?;
    let blank_subject = harness
        .desk
        .update_status(
            admin.id(),
            outcome.conversation.id(),
            StatusUpdate {
                subject: Some("   ".to_owned()),
                ..StatusUpdate::default()
            },
        )
        .await;

    assert_eq!(updated.status(), ConversationStatus::Active);
    assert_eq!(updated.priority(), Priority::Urgent);
    assert_eq!(updated.subject(), Some("Double charge on invoice 4417"));
    assert!(matches!(blank_subject, Err(err) if err.kind() == ErrorKind::Validation));
    assert_eq!(
        updated.tags().iter().map(String::as_str).collect::<Vec<_>>(),
        ["billing", "refund"]
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn only_authors_edit_messages(harness: Harness) -> Result<()> {
    let agent = harness.staff("Priya Shah", AgentRole::Agent);
    let admin = harness.staff("Dana Okafor", AgentRole::Admin);
    let token = harness.guest().await?;
    let outcome = harness.desk.send_guest_message(token, "Help").await?;
    let conversation_id = outcome.conversation.id();
    let reply = harness
        .desk
        .send_agent_message(agent.id(), conversation_id, "Helo", false)
        .await?;

    let edited = harness
        .desk
        .edit_message(agent.id(), conversation_id, reply.id(), "Hello".to_owned())
        .await?;
    let denied = harness
        .desk
        .edit_message(admin.id(), conversation_id, reply.id(), "Hi".to_owned())
        .await
        .expect_err("admin did not write it");

    assert_eq!(edited.content(), "Hello");
    assert!(edited.is_edited());
    assert_eq!(edited.sequence(), reply.sequence());
    assert_eq!(denied.kind(), ErrorKind::Forbidden);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn agents_mark_guest_messages_read(harness: Harness) -> Result<()> {
    let agent = harness.staff("Priya Shah", AgentRole::Agent);
    let token = harness.guest().await?;
    let outcome = harness.desk.send_guest_message(token, "Help").await?;
    let conversation_id = outcome.conversation.id();
    let message_id = outcome.guest_message.id();

    let unread = harness.desk.list_conversations(agent.id(), &ConversationQuery::default()).await?;
    let read = harness
        .desk
        .mark_message_read(agent.id(), conversation_id, message_id)
        .await?;
    let listed = harness.desk.list_conversations(agent.id(), &ConversationQuery::default()).await?;

    assert_eq!(unread.first().map(|row| row.unread_guest_messages), Some(1));
    assert_eq!(read.read_at(), Some(harness.clock.utc()));
    assert_eq!(listed.first().map(|row| row.unread_guest_messages), Some(0));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn dashboards_list_queues_staff_and_stats(harness: Harness) -> Result<()> {
    let admin = harness.staff("Dana Okafor", AgentRole::Admin);
    let offline = harness
        .staff("Tomasz Nowak", AgentRole::Agent)
        .with_status(AgentStatus::Inactive)
        .with_online(false);
    harness.agents.upsert(offline.clone())?;
    for _ in 0..2 {
        let token = harness.guest().await?;
        harness.desk.send_guest_message(token, "Help").await?;
    }

    let waiting = harness.desk.list_waiting(admin.id()).await?;
    let active = harness.desk.list_active(admin.id(), None).await?;
    let stats = harness.desk.stats(admin.id()).await?;
    let staff = harness.desk.list_agents(admin.id()).await?;
    let online = harness.desk.list_online_agents(admin.id()).await?;

    assert_eq!(waiting.len(), 2);
    assert!(active.is_empty());
    assert_eq!(stats.count(ConversationStatus::Waiting), 2);
    assert_eq!(stats.total_messages, 2);
    assert_eq!(stats.unread_guest_messages, 2);
    assert_eq!(staff.len(), 2);
    assert_eq!(
        online.iter().map(|agent| agent.id()).collect::<Vec<_>>(),
        [admin.id()]
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn subscribers_receive_committed_events(harness: Harness) -> Result<()> {
    let agent = harness.staff("Priya Shah", AgentRole::Agent);
    let mut admin_feed = harness.desk.subscribe_admin(agent.id()).await?;
    let token = harness.guest().await?;
    let outcome = harness.desk.send_guest_message(token, "Help").await?;
    let conversation_id = outcome.conversation.id();
    let mut guest_feed = harness.desk.subscribe_guest(token).await?;

    harness
        .desk
        .send_agent_message(agent.id(), conversation_id, "On it", false)
        .await?;

    let envelope = guest_feed.try_recv()?;
    assert_eq!(envelope.channel, EventChannel::Conversation(conversation_id));
    assert_eq!(envelope.name, "message.sent");
    assert!(matches!(
        &envelope.event,
        ConversationEvent::MessageSent { message } if message.content() == "On it"
    ));

    let mut statuses = Vec::new();
    while let Ok(event) = admin_feed.try_recv() {
        statuses.push(event.name.clone());
    }
    assert_eq!(
        statuses,
        ["conversation.status.changed"; 3],
        "opened, escalated and assigned"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn guests_without_a_conversation_cannot_subscribe(harness: Harness) -> Result<()> {
    let token = harness.guest().await?;

    let err = harness
        .desk
        .subscribe_guest(token)
        .await
        .expect_err("no conversation yet");

    assert_eq!(err.kind(), ErrorKind::NotFound);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn shutdown_stops_the_desk(harness: Harness) -> Result<()> {
    let token = harness.guest().await?;
    harness.desk.send_guest_message(token, "Help").await?;

    harness.desk.shutdown().await;
    let err = harness
        .desk
        .send_guest_message(token, "Hello?")
        .await
        .expect_err("desk stopped");

    assert_eq!(err.kind(), ErrorKind::Unavailable);
    assert_eq!(err.guest_notice(), "temporarily unavailable");
    assert!(!harness.desk.hub().is_running());
    Ok(())
}
