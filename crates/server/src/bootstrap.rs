use std::sync::Arc;

use chatrelay_agent::{AgentRuntime, BackendError, OpenAiBackend};
use chatrelay_core::config::{AppConfig, ConfigError};
use chatrelay_telegram::{ApiError, BotApi, UpdateDispatcher};
use secrecy::ExposeSecret;
use thiserror::Error;
use tracing::info;

use crate::webhook::{InFlight, WebhookState};

pub struct Application {
    pub config: AppConfig,
    pub bot_api: Arc<BotApi>,
    pub dispatcher: Arc<UpdateDispatcher>,
    pub bot_handle: String,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("bot api client could not be created: {0}")]
    BotApi(#[source] ApiError),
    #[error("bot identity lookup failed: {0}")]
    Identity(#[source] ApiError),
    #[error("bot account has no username; set telegram.bot_username")]
    MissingUsername,
    #[error("completion backend could not be created: {0}")]
    Backend(#[source] BackendError),
    #[error("webhook registration failed: {0}")]
    WebhookRegistration(#[source] ApiError),
}

/// The binary loads config itself so logging is up before bootstrap runs.
#[cfg(test)]
pub async fn bootstrap(
    options: chatrelay_core::config::LoadOptions,
) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let bot_api = Arc::new(BotApi::new(&config.telegram).map_err(BootstrapError::BotApi)?);
    let bot_handle = resolve_bot_handle(&config, &bot_api).await?;
    info!(
        event_name = "system.bootstrap.identity_resolved",
        correlation_id = "bootstrap",
        bot_handle = %bot_handle,
        "bot identity resolved"
    );

    let backend = OpenAiBackend::new(&config.llm).map_err(BootstrapError::Backend)?;
    info!(
        event_name = "system.bootstrap.backend_ready",
        correlation_id = "bootstrap",
        endpoint = backend.endpoint(),
        model = %config.llm.model,
        "completion backend configured"
    );

    let runtime = Arc::new(AgentRuntime::from_config(&config, &bot_handle, Arc::new(backend)));
    let dispatcher = Arc::new(UpdateDispatcher::new(
        runtime,
        bot_api.clone(),
        config.replies.welcome.clone(),
    ));

    Ok(Application { config, bot_api, dispatcher, bot_handle })
}

/// Looks the bot's own handle up once. A configured username wins over
/// `getMe`, which keeps startup offline-capable.
async fn resolve_bot_handle(config: &AppConfig, bot_api: &BotApi) -> Result<String, BootstrapError> {
    if let Some(username) = &config.telegram.bot_username {
        return Ok(format!("@{}", username.trim().trim_start_matches('@')));
    }

    let identity = bot_api.get_me().await.map_err(BootstrapError::Identity)?;
    identity
        .username
        .filter(|username| !username.is_empty())
        .map(|username| format!("@{username}"))
        .ok_or(BootstrapError::MissingUsername)
}

impl Application {
    pub fn webhook_state(&self) -> WebhookState {
        WebhookState {
            dispatcher: Arc::clone(&self.dispatcher),
            secret_token: self.config.telegram.webhook_secret.clone(),
            in_flight: InFlight::default(),
        }
    }

    pub async fn register_webhook(&self) -> Result<bool, BootstrapError> {
        let Some(url) = &self.config.telegram.webhook_url else {
            return Ok(false);
        };

        let secret = self.config.telegram.webhook_secret.as_ref().map(|secret| secret.expose_secret());
        self.bot_api.set_webhook(url, secret).await.map_err(BootstrapError::WebhookRegistration)?;
        info!(
            event_name = "system.bootstrap.webhook_registered",
            correlation_id = "bootstrap",
            webhook_url = %url,
            "webhook registered with telegram"
        );
        Ok(true)
    }
}
