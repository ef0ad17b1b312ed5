use std::sync::Arc;
use std::time::Duration;

use chatrelay_core::config::AppConfig;
use chatrelay_core::{
    Admission, ConversationStore, DeliveryError, InboundEvent, RateLimiter, ReplyRouter, Turn,
};
use tracing::{debug, info, warn};

use crate::guardrails::{GuardrailDecision, GuardrailPolicy};
use crate::llm::{CompletionBackend, CompletionClient, CompletionSettings};
use crate::sink::{ReplySink, SentMessage};

/// Fixed user-visible texts the runtime sends on its own.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplyTexts {
    pub rate_limited: String,
    pub unavailable: String,
    /// Placeholder sent before the completion and edited into the answer.
    pub thinking: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuntimeSettings {
    pub system_prompt: String,
    pub completion_timeout: Duration,
    pub texts: ReplyTexts,
}

/// Terminal state of one inbound event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReplyOutcome {
    Ignored,
    Canned,
    RateLimited,
    Replied { text: String },
    Unavailable,
}

/// Owns all relay state and runs the per-event pipeline. Built once at
/// startup and shared behind an `Arc`; every call to [`AgentRuntime::handle`]
/// is independent and may run concurrently with others.
pub struct AgentRuntime {
    router: ReplyRouter,
    guardrails: GuardrailPolicy,
    limiter: RateLimiter,
    store: ConversationStore,
    completion: CompletionClient,
    settings: RuntimeSettings,
}

impl AgentRuntime {
    pub fn new(
        router: ReplyRouter,
        guardrails: GuardrailPolicy,
        limiter: RateLimiter,
        store: ConversationStore,
        completion: CompletionClient,
        settings: RuntimeSettings,
    ) -> Self {
        Self { router, guardrails, limiter, store, completion, settings }
    }

    /// `mention_handle` is the bot's own handle, resolved once by the caller.
    pub fn from_config(
        config: &AppConfig,
        mention_handle: &str,
        backend: Arc<dyn CompletionBackend>,
    ) -> Self {
        let conversation = &config.conversation;
        Self::new(
            ReplyRouter::new(
                mention_handle,
                conversation.command_prefix.clone(),
                conversation.group_trigger,
            ),
            GuardrailPolicy::from_config(&config.replies),
            RateLimiter::new(config.rate_limit.policy(), config.rate_limit.max_tracked_users),
            ConversationStore::new(conversation.max_history, conversation.max_conversations),
            CompletionClient::new(backend, CompletionSettings::from_config(config)),
            RuntimeSettings {
                system_prompt: conversation.system_prompt.clone(),
                completion_timeout: config.llm.timeout(),
                texts: ReplyTexts {
                    rate_limited: config.replies.rate_limited.clone(),
                    unavailable: config.replies.unavailable.clone(),
                    thinking: config.replies.thinking.clone(),
                },
            },
        )
    }

    pub fn router(&self) -> &ReplyRouter {
        &self.router
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub async fn handle(&self, event: &InboundEvent, sink: &dyn ReplySink) -> ReplyOutcome {
        let key = &event.conversation_key;

        let Some(trigger) = self.router.route(event.kind, &event.text) else {
            debug!(
                event_name = "relay.route.ignored",
                correlation_id = %event.correlation_id,
                conversation_key = %key,
                "message does not address the bot"
            );
            return ReplyOutcome::Ignored;
        };

        if let GuardrailDecision::Canned { reason_code, reply } = self.guardrails.evaluate(&trigger)
        {
            info!(
                event_name = "relay.guardrail.canned",
                correlation_id = %event.correlation_id,
                conversation_key = %key,
                reason_code,
                "answering with canned reply"
            );
            self.send(sink, event, &reply).await;
            return ReplyOutcome::Canned;
        }

        let now = tokio::time::Instant::now().into_std();
        if let Admission::Rejected { retry_after } = self.limiter.try_admit(&event.user_id, now) {
            info!(
                event_name = "relay.admission.rejected",
                correlation_id = %event.correlation_id,
                conversation_key = %key,
                user_id = %event.user_id,
                retry_after_ms = retry_after.as_millis() as u64,
                "rate limit reached"
            );
            self.send(sink, event, &self.settings.texts.rate_limited).await;
            return ReplyOutcome::RateLimited;
        }

        info!(
            event_name = "relay.message.accepted",
            correlation_id = %event.correlation_id,
            conversation_key = %key,
            trigger_chars = trigger.chars().count(),
            "recording user turn"
        );
        self.store.append(key, Turn::user(trigger));

        let placeholder = match &self.settings.texts.thinking {
            Some(thinking) => self.send(sink, event, thinking).await,
            None => None,
        };

        let history = self.store.snapshot(key);
        let completion = self
            .completion
            .complete(&self.settings.system_prompt, &history, self.settings.completion_timeout)
            .await;

        match completion {
            Ok(text) => {
                self.deliver_final(sink, event, placeholder, &text).await;
                self.store.append(key, Turn::assistant(text.clone()));
                info!(
                    event_name = "relay.reply.delivered",
                    correlation_id = %event.correlation_id,
                    conversation_key = %key,
                    reply_chars = text.chars().count(),
                    "reply handed to transport"
                );
                ReplyOutcome::Replied { text }
            }
            Err(error) => {
                warn!(
                    event_name = "relay.completion.unavailable",
                    correlation_id = %event.correlation_id,
                    conversation_key = %key,
                    error = %error,
                    "sending apology"
                );
                self.deliver_final(sink, event, placeholder, &self.settings.texts.unavailable)
                    .await;
                ReplyOutcome::Unavailable
            }
        }
    }

    async fn send(
        &self,
        sink: &dyn ReplySink,
        event: &InboundEvent,
        text: &str,
    ) -> Option<SentMessage> {
        match sink.send_message(&event.conversation_key, text, event.message_id).await {
            Ok(sent) => Some(sent),
            Err(error) => {
                log_delivery_failure(event, "send_message", &error);
                None
            }
        }
    }

    async fn deliver_final(
        &self,
        sink: &dyn ReplySink,
        event: &InboundEvent,
        placeholder: Option<SentMessage>,
        text: &str,
    ) {
        match placeholder {
            Some(sent) => {
                if let Err(error) =
                    sink.edit_message(&event.conversation_key, sent.message_id, text).await
                {
                    log_delivery_failure(event, "edit_message", &error);
                }
            }
            None => {
                self.send(sink, event, text).await;
            }
        }
    }
}

fn log_delivery_failure(event: &InboundEvent, operation: &'static str, error: &DeliveryError) {
    if error.is_transient() {
        warn!(
            event_name = "relay.delivery.failed",
            correlation_id = %event.correlation_id,
            conversation_key = %event.conversation_key,
            operation,
            error = %error,
            "transport delivery failed"
        );
    } else {
        info!(
            event_name = "relay.delivery.rejected",
            correlation_id = %event.correlation_id,
            conversation_key = %event.conversation_key,
            operation,
            error = %error,
            "transport rejected delivery"
        );
    }
}
