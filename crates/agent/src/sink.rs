use async_trait::async_trait;
use chatrelay_core::{ConversationKey, DeliveryError};

/// Handle of a message the transport accepted, used to edit it later.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SentMessage {
    pub message_id: i64,
}

/// Outbound side of a chat transport.
#[async_trait]
pub trait ReplySink: Send + Sync {
    async fn send_message(
        &self,
        conversation_key: &ConversationKey,
        text: &str,
        reply_to: Option<i64>,
    ) -> Result<SentMessage, DeliveryError>;

    async fn edit_message(
        &self,
        conversation_key: &ConversationKey,
        message_id: i64,
        text: &str,
    ) -> Result<(), DeliveryError>;
}
