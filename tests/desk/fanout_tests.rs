//! Event delivery through the broadcast hub under concurrent load.

use crate::desk::helpers::{Desk, TestResult, desk, runtime};
use rstest::rstest;
use std::collections::HashSet;
use std::io;
use std::sync::Arc;
use switchboard::{
    agent::domain::AgentRole,
    conversation::domain::{ConversationEvent, ConversationStatus, EventChannel},
};
use tokio::runtime::Runtime;

/// A guest sees agent replies in the order they were committed.
#[rstest]
fn guest_sees_replies_in_commit_order(
    runtime: io::Result<Runtime>,
    desk: TestResult<Desk>,
) -> TestResult {
    let rt = runtime?;
    let desk = desk?;
    rt.block_on(async {
        let agent = desk.staff("Priya Shah", AgentRole::Agent)?;
        let token = desk.guest().await?;
        let outcome = desk.desk.send_guest_message(token, "Help").await?;
        let conversation_id = outcome.conversation.id();
        let mut feed = desk.desk.subscribe_guest(token).await?;

        for content in ["one", "two", "three", "four"] {
            desk.desk
                .send_agent_message(agent.id(), conversation_id, content, false)
                .await?;
        }
        desk.desk
            .send_agent_message(agent.id(), conversation_id, "guest must not see this", true)
            .await?;

        let mut seen = Vec::new();
        while let Ok(envelope) = feed.try_recv() {
            assert_eq!(envelope.channel, EventChannel::Conversation(conversation_id));
            if let ConversationEvent::MessageSent { message } = &envelope.event {
                seen.push(message.content().to_owned());
            }
        }
        assert_eq!(seen, ["one", "two", "three", "four"]);
        Ok(())
    })
}

/// Many guests writing at once each get their own conversation and a
/// distinct reference.
#[rstest]
fn concurrent_guests_get_distinct_conversations(
    runtime: io::Result<Runtime>,
    desk: TestResult<Desk>,
) -> TestResult {
    let rt = runtime?;
    let desk = desk?;
    rt.block_on(async {
        desk.rule("order", "You can track orders under My Account.").await?;
        let admin = desk.staff("Dana Okafor", AgentRole::Admin)?;
        let mut admin_feed = desk.desk.subscribe_admin(admin.id()).await?;

        let mut handles = Vec::new();
        for _ in 0..40 {
            let token = desk.guest().await?;
            let shared = Arc::clone(&desk.desk);
            handles.push(tokio::spawn(async move {
                shared.send_guest_message(token, "Where is my order?").await
            }));
        }
        let mut references = HashSet::new();
        for handle in handles {
            let outcome = handle.await??;
            assert!(outcome.bot_message.is_some());
            references.insert(outcome.conversation.reference_id().clone());
        }

        assert_eq!(references.len(), 40);
        let stats = desk.desk.stats(admin.id()).await?;
        assert_eq!(stats.count(ConversationStatus::Active), 40);
        assert_eq!(stats.total_messages, 80);
        let mut opened = 0;
        while let Ok(envelope) = admin_feed.try_recv() {
            if matches!(
                &envelope.event,
                ConversationEvent::StatusChanged { previous_status: None, .. }
            ) {
                opened += 1;
            }
        }
        assert_eq!(opened, 40);
        Ok(())
    })
}

/// Concurrent messages from one guest land in a single conversation with no
/// lost updates.
#[rstest]
fn one_guest_writing_concurrently_keeps_every_message(
    runtime: io::Result<Runtime>,
    desk: TestResult<Desk>,
) -> TestResult {
    let rt = runtime?;
    let desk = desk?;
    rt.block_on(async {
        desk.rule("thanks", "You're welcome!").await?;
        let admin = desk.staff("Dana Okafor", AgentRole::Admin)?;
        let token = desk.guest().await?;

        let mut handles = Vec::new();
        for _ in 0..25 {
            let shared = Arc::clone(&desk.desk);
            handles.push(tokio::spawn(async move {
                shared.send_guest_message(token, "thanks").await
            }));
        }
        let mut conversations = HashSet::new();
        for handle in handles {
            conversations.insert(handle.await??.conversation.id());
        }

        assert_eq!(conversations.len(), 1);
        let conversation_id = conversations.into_iter().next().ok_or("no conversation")?;
        let detail = desk
            .desk
            .get_conversation_detail(admin.id(), conversation_id)
            .await?;
        assert_eq!(detail.conversation.message_count(), 50);
        let sequences: Vec<u64> = detail
            .messages
            .iter()
            .map(|message| message.sequence().value())
            .collect();
        assert_eq!(sequences, (1..=50).collect::<Vec<_>>());
        Ok(())
    })
}
