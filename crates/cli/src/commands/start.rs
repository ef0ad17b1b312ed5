use chatrelay_agent::OpenAiBackend;
use chatrelay_core::config::{AppConfig, LoadOptions};
use chatrelay_telegram::BotApi;

use crate::commands::CommandResult;

/// Offline startup preflight: everything the server does before its first
/// network call.
pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "start",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    if let Err(error) = BotApi::new(&config.telegram) {
        return CommandResult::failure("start", "client_init", error.to_string(), 3);
    }
    let backend = match OpenAiBackend::new(&config.llm) {
        Ok(backend) => backend,
        Err(error) => return CommandResult::failure("start", "client_init", error.to_string(), 3),
    };

    let identity = match &config.telegram.bot_username {
        Some(username) => format!("bot handle configured as @{}", username.trim_start_matches('@')),
        None => "bot handle resolved via getMe at startup".to_string(),
    };
    let webhook = match &config.telegram.webhook_url {
        Some(url) => format!("setWebhook will register {url}"),
        None => "webhook registration skipped (telegram.webhook_url unset)".to_string(),
    };

    CommandResult::success(
        "start",
        "preflight passed",
        vec![
            identity,
            webhook,
            format!("completions via {} ({})", backend.endpoint(), config.llm.model),
            format!(
                "listening on {}:{}{}",
                config.server.bind_address, config.server.port, config.telegram.webhook_path
            ),
        ],
    )
}
