use std::env;
use std::fs;
use std::path::Path;

use chatrelay_core::config::{resolve_config_path, AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

use crate::commands::redact_bot_token;

struct Field {
    key: &'static str,
    value: String,
    env_keys: &'static [&'static str],
}

fn field(key: &'static str, value: impl Into<String>, env_keys: &'static [&'static str]) -> Field {
    Field { key, value: value.into(), env_keys }
}

fn optional(value: Option<&str>) -> String {
    value.unwrap_or("<unset>").to_string()
}

fn presence(is_set: bool) -> &'static str {
    if is_set {
        "<redacted>"
    } else {
        "<unset>"
    }
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = resolve_config_path(None);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let telegram = &config.telegram;
    let llm = &config.llm;
    let conversation = &config.conversation;
    let rate_limit = &config.rate_limit;
    let replies = &config.replies;
    let server = &config.server;

    let fields = vec![
        field(
            "telegram.bot_token",
            redact_bot_token(telegram.bot_token.expose_secret()),
            &["CHATRELAY_TELEGRAM_BOT_TOKEN"],
        ),
        field(
            "telegram.bot_username",
            optional(telegram.bot_username.as_deref()),
            &["CHATRELAY_TELEGRAM_BOT_USERNAME"],
        ),
        field("telegram.api_base_url", &telegram.api_base_url, &["CHATRELAY_TELEGRAM_API_BASE_URL"]),
        field(
            "telegram.webhook_url",
            optional(telegram.webhook_url.as_deref()),
            &["CHATRELAY_TELEGRAM_WEBHOOK_URL"],
        ),
        field("telegram.webhook_path", &telegram.webhook_path, &["CHATRELAY_TELEGRAM_WEBHOOK_PATH"]),
        field(
            "telegram.webhook_secret",
            presence(telegram.webhook_secret.is_some()),
            &["CHATRELAY_TELEGRAM_WEBHOOK_SECRET"],
        ),
        field(
            "llm.api_key",
            presence(!llm.api_key.expose_secret().is_empty()),
            &["CHATRELAY_LLM_API_KEY"],
        ),
        field("llm.base_url", &llm.base_url, &["CHATRELAY_LLM_BASE_URL"]),
        field("llm.model", &llm.model, &["CHATRELAY_LLM_MODEL"]),
        field("llm.temperature", llm.temperature.to_string(), &["CHATRELAY_LLM_TEMPERATURE"]),
        field("llm.max_tokens", llm.max_tokens.to_string(), &["CHATRELAY_LLM_MAX_TOKENS"]),
        field("llm.timeout_secs", llm.timeout_secs.to_string(), &["CHATRELAY_LLM_TIMEOUT_SECS"]),
        field(
            "conversation.max_history",
            conversation.max_history.to_string(),
            &["CHATRELAY_CONVERSATION_MAX_HISTORY"],
        ),
        field(
            "conversation.upstream_window",
            conversation.upstream_window.to_string(),
            &["CHATRELAY_CONVERSATION_UPSTREAM_WINDOW"],
        ),
        field(
            "conversation.max_conversations",
            conversation.max_conversations.to_string(),
            &["CHATRELAY_CONVERSATION_MAX_CONVERSATIONS"],
        ),
        field(
            "conversation.system_prompt",
            format!("<{} chars>", conversation.system_prompt.chars().count()),
            &["CHATRELAY_CONVERSATION_SYSTEM_PROMPT"],
        ),
        field(
            "conversation.command_prefix",
            &conversation.command_prefix,
            &["CHATRELAY_CONVERSATION_COMMAND_PREFIX"],
        ),
        field(
            "conversation.group_trigger",
            format!("{:?}", conversation.group_trigger),
            &["CHATRELAY_CONVERSATION_GROUP_TRIGGER"],
        ),
        field(
            "rate_limit.max_requests",
            rate_limit.max_requests.to_string(),
            &["CHATRELAY_RATE_LIMIT_MAX_REQUESTS"],
        ),
        field(
            "rate_limit.window_secs",
            rate_limit.window_secs.to_string(),
            &["CHATRELAY_RATE_LIMIT_WINDOW_SECS"],
        ),
        field(
            "rate_limit.max_tracked_users",
            rate_limit.max_tracked_users.to_string(),
            &["CHATRELAY_RATE_LIMIT_MAX_TRACKED_USERS"],
        ),
        field("replies.thinking", optional(replies.thinking.as_deref()), &[]),
        field(
            "replies.creator",
            if replies.creator.is_some() { "<set>" } else { "<unset>" },
            &["CHATRELAY_REPLIES_CREATOR"],
        ),
        field("server.bind_address", &server.bind_address, &["CHATRELAY_SERVER_BIND_ADDRESS"]),
        field("server.port", server.port.to_string(), &["CHATRELAY_SERVER_PORT", "PORT"]),
        field(
            "server.graceful_shutdown_secs",
            server.graceful_shutdown_secs.to_string(),
            &["CHATRELAY_SERVER_GRACEFUL_SHUTDOWN_SECS"],
        ),
        field(
            "logging.level",
            &config.logging.level,
            &["CHATRELAY_LOGGING_LEVEL", "CHATRELAY_LOG_LEVEL"],
        ),
        field(
            "logging.format",
            format!("{:?}", config.logging.format),
            &["CHATRELAY_LOGGING_FORMAT", "CHATRELAY_LOG_FORMAT"],
        ),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    lines.extend(fields.iter().map(|field| {
        let source = field_source(
            field.key,
            field.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        render_line(field.key, &field.value, source)
    }));

    lines.join("\n")
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys
        .iter()
        .find(|env_key| env::var(env_key).is_ok_and(|value| !value.trim().is_empty()))
    {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
