use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chatrelay_core::config::{AppConfig, LlmConfig};
use chatrelay_core::{CompletionError, Turn};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Everything the backend needs for one completion. `messages` already
/// starts with the system turn.
#[derive(Clone, Debug, PartialEq)]
pub struct CompletionRequest {
    pub messages: Vec<Turn>,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("could not build completion client: {0}")]
    Setup(String),
    #[error("completion transport failed: {0}")]
    Transport(String),
    #[error("completion backend answered {status}: {body}")]
    Status { status: u16, body: String },
    #[error("completion payload malformed: {0}")]
    Payload(String),
    #[error("completion payload carried no message content")]
    MissingCompletion,
}

#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<String, BackendError>;
}

/// Chat-completions backend speaking the OpenAI wire format.
pub struct OpenAiBackend {
    client: reqwest::Client,
    endpoint: String,
    api_key: SecretString,
    model: String,
}

impl OpenAiBackend {
    pub fn new(config: &LlmConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|error| BackendError::Setup(error.to_string()))?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    messages: &'a [Turn],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[async_trait]
impl CompletionBackend for OpenAiBackend {
    async fn complete(&self, request: CompletionRequest) -> Result<String, BackendError> {
        let body = ChatCompletionBody {
            model: &self.model,
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|error| BackendError::Transport(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status { status: status.as_u16(), body });
        }

        let payload = response
            .json::<ChatCompletionResponse>()
            .await
            .map_err(|error| BackendError::Payload(error.to_string()))?;

        extract_completion(payload)
    }
}

fn extract_completion(payload: ChatCompletionResponse) -> Result<String, BackendError> {
    payload
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or(BackendError::MissingCompletion)
}

#[derive(Clone, Debug, PartialEq)]
pub struct CompletionSettings {
    pub temperature: f32,
    pub max_tokens: u32,
    /// Most recent turns forwarded upstream; may be smaller than the stored history.
    pub upstream_window: usize,
    pub empty_fallback: String,
}

impl CompletionSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            temperature: config.llm.temperature,
            max_tokens: config.llm.max_tokens,
            upstream_window: config.conversation.upstream_window,
            empty_fallback: config.replies.empty_completion.clone(),
        }
    }
}

/// Wraps a [`CompletionBackend`] with the relay's completion contract: a
/// hard wall-clock timeout, one uniform failure and no blank answers.
pub struct CompletionClient {
    backend: Arc<dyn CompletionBackend>,
    settings: CompletionSettings,
}

impl CompletionClient {
    pub fn new(backend: Arc<dyn CompletionBackend>, settings: CompletionSettings) -> Self {
        Self { backend, settings }
    }

    pub fn settings(&self) -> &CompletionSettings {
        &self.settings
    }

    pub fn build_request(&self, system_prompt: &str, history: &[Turn]) -> CompletionRequest {
        let skip = history.len().saturating_sub(self.settings.upstream_window);
        let mut messages = Vec::with_capacity(history.len() - skip + 1);
        messages.push(Turn::system(system_prompt));
        messages.extend(history[skip..].iter().cloned());

        CompletionRequest {
            messages,
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        }
    }

    pub async fn complete(
        &self,
        system_prompt: &str,
        history: &[Turn],
        timeout: Duration,
    ) -> Result<String, CompletionError> {
        let request = self.build_request(system_prompt, history);
        debug!(
            event_name = "relay.completion.request",
            turns = request.messages.len(),
            timeout_ms = timeout.as_millis() as u64,
            "sending completion request"
        );

        let raw = match tokio::time::timeout(timeout, self.backend.complete(request)).await {
            Ok(Ok(raw)) => raw,
            Ok(Err(error)) => {
                warn!(event_name = "relay.completion.backend_error", error = %error, "completion backend failed");
                return Err(CompletionError::unavailable(error.to_string()));
            }
            Err(_) => {
                warn!(
                    event_name = "relay.completion.timeout",
                    timeout_ms = timeout.as_millis() as u64,
                    "completion timed out"
                );
                return Err(CompletionError::unavailable(format!(
                    "timed out after {}ms",
                    timeout.as_millis()
                )));
            }
        };

        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(self.settings.empty_fallback.clone());
        }
        Ok(trimmed.to_owned())
    }
}
