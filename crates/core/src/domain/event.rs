use serde::{Deserialize, Serialize};

use crate::domain::conversation::{ConversationKey, UserId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationKind {
    Direct,
    Group,
}

/// An already-decoded chat message handed to the core by the transport layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboundEvent {
    pub kind: ConversationKind,
    pub conversation_key: ConversationKey,
    pub user_id: UserId,
    pub text: String,
    /// Transport message id of the inbound message, used to thread the reply.
    pub message_id: Option<i64>,
    pub correlation_id: String,
}
