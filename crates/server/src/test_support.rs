use std::sync::Arc;

use async_trait::async_trait;
use chatrelay_agent::{
    AgentRuntime, BackendError, CompletionBackend, CompletionRequest, ReplySink, SentMessage,
};
use chatrelay_core::config::AppConfig;
use chatrelay_core::{ConversationKey, DeliveryError};
use chatrelay_telegram::UpdateDispatcher;
use tokio::sync::Mutex;

pub struct FixedBackend;

#[async_trait]
impl CompletionBackend for FixedBackend {
    async fn complete(&self, _request: CompletionRequest) -> Result<String, BackendError> {
        Ok("Keep pushing.".to_owned())
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub sent: Mutex<Vec<(ConversationKey, String)>>,
}

#[async_trait]
impl ReplySink for RecordingSink {
    async fn send_message(
        &self,
        conversation_key: &ConversationKey,
        text: &str,
        _reply_to: Option<i64>,
    ) -> Result<SentMessage, DeliveryError> {
        let mut sent = self.sent.lock().await;
        sent.push((conversation_key.clone(), text.to_owned()));
        Ok(SentMessage { message_id: sent.len() as i64 })
    }

    async fn edit_message(
        &self,
        _conversation_key: &ConversationKey,
        _message_id: i64,
        _text: &str,
    ) -> Result<(), DeliveryError> {
        Ok(())
    }
}

pub fn runtime() -> AgentRuntime {
    let mut config = AppConfig::default();
    config.replies.thinking = None;
    AgentRuntime::from_config(&config, "relaybot", Arc::new(FixedBackend))
}

pub fn dispatcher(sink: Arc<RecordingSink>) -> UpdateDispatcher {
    UpdateDispatcher::new(Arc::new(runtime()), sink, "Welcome!")
}
