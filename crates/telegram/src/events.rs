use std::sync::Arc;

use chatrelay_agent::{AgentRuntime, ReplyOutcome, ReplySink};
use chatrelay_core::{ConversationKey, ConversationKind, InboundEvent, UserId};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::commands::is_welcome_request;
use crate::types::{ChatType, Update};

#[derive(Debug, Error)]
pub enum UpdateDecodeError {
    #[error("malformed update payload: {0}")]
    Malformed(String),
}

pub fn parse_update(body: &[u8]) -> Result<Update, UpdateDecodeError> {
    serde_json::from_slice(body).map_err(|error| UpdateDecodeError::Malformed(error.to_string()))
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TelegramEvent {
    Message(InboundEvent),
    Welcome { conversation_key: ConversationKey, reply_to: i64, correlation_id: String },
    Unsupported { reason: &'static str },
}

pub fn correlation_id(update: &Update) -> String {
    format!("tg-{}", update.update_id)
}

/// Maps a webhook update onto the relay's event model. Only new text
/// messages from humans in private chats, groups and supergroups count.
pub fn decode_update(update: &Update, bot_username: &str) -> TelegramEvent {
    let Some(message) = &update.message else {
        return TelegramEvent::Unsupported { reason: "no_message" };
    };
    let Some(text) = &message.text else {
        return TelegramEvent::Unsupported { reason: "non_text" };
    };
    let Some(sender) = &message.from else {
        return TelegramEvent::Unsupported { reason: "no_sender" };
    };
    if sender.is_bot {
        return TelegramEvent::Unsupported { reason: "from_bot" };
    }

    let kind = match message.chat.kind {
        ChatType::Private => ConversationKind::Direct,
        ChatType::Group | ChatType::Supergroup => ConversationKind::Group,
        ChatType::Channel | ChatType::Unknown => {
            return TelegramEvent::Unsupported { reason: "unsupported_chat" }
        }
    };

    let conversation_key = ConversationKey::from(message.chat.id);
    if is_welcome_request(text, bot_username) {
        return TelegramEvent::Welcome {
            conversation_key,
            reply_to: message.message_id,
            correlation_id: correlation_id(update),
        };
    }

    TelegramEvent::Message(InboundEvent {
        kind,
        conversation_key,
        user_id: UserId::from(sender.id),
        text: text.clone(),
        message_id: Some(message.message_id),
        correlation_id: correlation_id(update),
    })
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    Welcomed,
    Relayed(ReplyOutcome),
    Skipped { reason: &'static str },
}

/// Routes decoded updates either to the welcome reply or into the runtime.
pub struct UpdateDispatcher {
    runtime: Arc<AgentRuntime>,
    sink: Arc<dyn ReplySink>,
    welcome_text: String,
}

impl UpdateDispatcher {
    pub fn new(
        runtime: Arc<AgentRuntime>,
        sink: Arc<dyn ReplySink>,
        welcome_text: impl Into<String>,
    ) -> Self {
        Self { runtime, sink, welcome_text: welcome_text.into() }
    }

    pub fn runtime(&self) -> &Arc<AgentRuntime> {
        &self.runtime
    }

    pub fn bot_username(&self) -> &str {
        self.runtime.router().mention_handle().trim_start_matches('@')
    }

    pub async fn dispatch(&self, update: &Update) -> DispatchOutcome {
        match decode_update(update, self.bot_username()) {
            TelegramEvent::Unsupported { reason } => {
                debug!(
                    event_name = "telegram.update.skipped",
                    correlation_id = %correlation_id(update),
                    reason,
                    "update carries nothing to relay"
                );
                DispatchOutcome::Skipped { reason }
            }
            TelegramEvent::Welcome { conversation_key, reply_to, correlation_id } => {
                info!(
                    event_name = "telegram.command.welcome",
                    correlation_id = %correlation_id,
                    conversation_key = %conversation_key,
                    "sending welcome"
                );
                if let Err(error) = self
                    .sink
                    .send_message(&conversation_key, &self.welcome_text, Some(reply_to))
                    .await
                {
                    warn!(
                        event_name = "telegram.command.welcome_failed",
                        correlation_id = %correlation_id,
                        error = %error,
                        "welcome delivery failed"
                    );
                }
                DispatchOutcome::Welcomed
            }
            TelegramEvent::Message(event) => {
                DispatchOutcome::Relayed(self.runtime.handle(&event, self.sink.as_ref()).await)
            }
        }
    }
}
