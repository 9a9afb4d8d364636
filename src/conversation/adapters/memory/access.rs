//! Access policy keyed on agent role and conversation assignment.

use crate::agent::domain::Agent;
use crate::conversation::{
    domain::Conversation,
    ports::{ConversationAccessPolicy, ConversationAction},
};

/// Default policy for the support desk.
///
/// Admins and super admins may do everything. Agents may view, respond to
/// and close conversations assigned to them. Assignment and metadata updates
/// are admin-only.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoleBasedAccessPolicy;

impl ConversationAccessPolicy for RoleBasedAccessPolicy {
    fn permits(
        &self,
        agent: &Agent,
        action: ConversationAction,
        conversation: &Conversation,
    ) -> bool {
        if agent.role().is_admin() {
            return true;
        }
        match action {
            ConversationAction::View | ConversationAction::Respond | ConversationAction::Close => {
                conversation.assigned_agent() == Some(agent.id())
            }
            ConversationAction::Assign | ConversationAction::Update => false,
        }
    }
}
