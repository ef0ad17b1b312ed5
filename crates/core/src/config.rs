use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::admission::RateLimitPolicy;
use crate::routing::GroupTrigger;

pub const DEFAULT_CONFIG_FILE: &str = "chatrelay.toml";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub telegram: TelegramConfig,
    pub llm: LlmConfig,
    pub conversation: ConversationConfig,
    pub rate_limit: RateLimitConfig,
    pub replies: RepliesConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct TelegramConfig {
    pub bot_token: SecretString,
    /// Skips the `getMe` lookup at startup when set.
    pub bot_username: Option<String>,
    pub api_base_url: String,
    pub webhook_url: Option<String>,
    pub webhook_path: String,
    pub webhook_secret: Option<SecretString>,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub api_key: SecretString,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ConversationConfig {
    pub max_history: usize,
    pub upstream_window: usize,
    pub max_conversations: usize,
    pub system_prompt: String,
    pub command_prefix: String,
    pub group_trigger: GroupTrigger,
}

#[derive(Clone, Debug)]
pub struct RateLimitConfig {
    pub max_requests: usize,
    pub window_secs: u64,
    pub max_tracked_users: usize,
}

#[derive(Clone, Debug)]
pub struct RepliesConfig {
    pub rate_limited: String,
    pub unavailable: String,
    pub empty_completion: String,
    pub thinking: Option<String>,
    pub welcome: String,
    pub creator: Option<String>,
    pub identity_phrases: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub bot_token: Option<String>,
    pub bot_username: Option<String>,
    pub webhook_url: Option<String>,
    pub llm_api_key: Option<String>,
    pub llm_model: Option<String>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            telegram: TelegramConfig {
                bot_token: String::new().into(),
                bot_username: None,
                api_base_url: "https://api.telegram.org".to_string(),
                webhook_url: None,
                webhook_path: "/webhook".to_string(),
                webhook_secret: None,
            },
            llm: LlmConfig {
                api_key: String::new().into(),
                base_url: "https://api.openai.com/v1".to_string(),
                model: "gpt-4o-mini".to_string(),
                temperature: 0.7,
                max_tokens: 400,
                timeout_secs: 18,
            },
            conversation: ConversationConfig {
                max_history: 5,
                upstream_window: 5,
                max_conversations: 10_000,
                system_prompt: "You are an upbeat motivational coach. Answer with short, \
                                positive bullet points."
                    .to_string(),
                command_prefix: "/ask".to_string(),
                group_trigger: GroupTrigger::MentionOrCommand,
            },
            rate_limit: RateLimitConfig { max_requests: 3, window_secs: 30, max_tracked_users: 10_000 },
            replies: RepliesConfig {
                rate_limited: "Too many requests. Please wait a moment and try again.".to_string(),
                unavailable: "AI busy, try again.".to_string(),
                empty_completion: "No reply.".to_string(),
                thinking: Some("Thinking...".to_string()),
                welcome: "Welcome! Message me directly for a full chat, or mention me or use \
                          /ask in a group."
                    .to_string(),
                creator: None,
                identity_phrases: vec!["who made you".to_string(), "who created you".to_string()],
            },
            server: ServerConfig {
                bind_address: "0.0.0.0".to_string(),
                port: 10_000,
                graceful_shutdown_secs: 15,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl RateLimitConfig {
    pub fn policy(&self) -> RateLimitPolicy {
        RateLimitPolicy {
            max_requests: self.max_requests,
            window: Duration::from_secs(self.window_secs),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(telegram) = patch.telegram {
            if let Some(bot_token_value) = telegram.bot_token {
                self.telegram.bot_token = secret_value(bot_token_value);
            }
            if let Some(bot_username) = telegram.bot_username {
                self.telegram.bot_username = Some(bot_username);
            }
            if let Some(api_base_url) = telegram.api_base_url {
                self.telegram.api_base_url = api_base_url;
            }
            if let Some(webhook_url) = telegram.webhook_url {
                self.telegram.webhook_url = Some(webhook_url);
            }
            if let Some(webhook_path) = telegram.webhook_path {
                self.telegram.webhook_path = webhook_path;
            }
            if let Some(webhook_secret_value) = telegram.webhook_secret {
                self.telegram.webhook_secret = Some(secret_value(webhook_secret_value));
            }
        }

        if let Some(llm) = patch.llm {
            if let Some(api_key_value) = llm.api_key {
                self.llm.api_key = secret_value(api_key_value);
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = base_url;
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(temperature) = llm.temperature {
                self.llm.temperature = temperature;
            }
            if let Some(max_tokens) = llm.max_tokens {
                self.llm.max_tokens = max_tokens;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
        }

        if let Some(conversation) = patch.conversation {
            if let Some(max_history) = conversation.max_history {
                self.conversation.max_history = max_history;
            }
            if let Some(upstream_window) = conversation.upstream_window {
                self.conversation.upstream_window = upstream_window;
            }
            if let Some(max_conversations) = conversation.max_conversations {
                self.conversation.max_conversations = max_conversations;
            }
            if let Some(system_prompt) = conversation.system_prompt {
                self.conversation.system_prompt = system_prompt;
            }
            if let Some(command_prefix) = conversation.command_prefix {
                self.conversation.command_prefix = command_prefix;
            }
            if let Some(group_trigger) = conversation.group_trigger {
                self.conversation.group_trigger = group_trigger;
            }
        }

        if let Some(rate_limit) = patch.rate_limit {
            if let Some(max_requests) = rate_limit.max_requests {
                self.rate_limit.max_requests = max_requests;
            }
            if let Some(window_secs) = rate_limit.window_secs {
                self.rate_limit.window_secs = window_secs;
            }
            if let Some(max_tracked_users) = rate_limit.max_tracked_users {
                self.rate_limit.max_tracked_users = max_tracked_users;
            }
        }

        if let Some(replies) = patch.replies {
            if let Some(rate_limited) = replies.rate_limited {
                self.replies.rate_limited = rate_limited;
            }
            if let Some(unavailable) = replies.unavailable {
                self.replies.unavailable = unavailable;
            }
            if let Some(empty_completion) = replies.empty_completion {
                self.replies.empty_completion = empty_completion;
            }
            if let Some(thinking) = replies.thinking {
                // an empty placeholder in the file disables it
                self.replies.thinking = (!thinking.trim().is_empty()).then_some(thinking);
            }
            if let Some(welcome) = replies.welcome {
                self.replies.welcome = welcome;
            }
            if let Some(creator) = replies.creator {
                self.replies.creator = Some(creator);
            }
            if let Some(identity_phrases) = replies.identity_phrases {
                self.replies.identity_phrases = identity_phrases;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("CHATRELAY_TELEGRAM_BOT_TOKEN") {
            self.telegram.bot_token = secret_value(value);
        }
        if let Some(value) = read_env("CHATRELAY_TELEGRAM_BOT_USERNAME") {
            self.telegram.bot_username = Some(value);
        }
        if let Some(value) = read_env("CHATRELAY_TELEGRAM_API_BASE_URL") {
            self.telegram.api_base_url = value;
        }
        if let Some(value) = read_env("CHATRELAY_TELEGRAM_WEBHOOK_URL") {
            self.telegram.webhook_url = Some(value);
        }
        if let Some(value) = read_env("CHATRELAY_TELEGRAM_WEBHOOK_PATH") {
            self.telegram.webhook_path = value;
        }
        if let Some(value) = read_env("CHATRELAY_TELEGRAM_WEBHOOK_SECRET") {
            self.telegram.webhook_secret = Some(secret_value(value));
        }

        if let Some(value) = read_env("CHATRELAY_LLM_API_KEY") {
            self.llm.api_key = secret_value(value);
        }
        if let Some(value) = read_env("CHATRELAY_LLM_BASE_URL") {
            self.llm.base_url = value;
        }
        if let Some(value) = read_env("CHATRELAY_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("CHATRELAY_LLM_TEMPERATURE") {
            self.llm.temperature = parse_f32("CHATRELAY_LLM_TEMPERATURE", &value)?;
        }
        if let Some(value) = read_env("CHATRELAY_LLM_MAX_TOKENS") {
            self.llm.max_tokens = parse_u32("CHATRELAY_LLM_MAX_TOKENS", &value)?;
        }
        if let Some(value) = read_env("CHATRELAY_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("CHATRELAY_LLM_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("CHATRELAY_CONVERSATION_MAX_HISTORY") {
            self.conversation.max_history =
                parse_usize("CHATRELAY_CONVERSATION_MAX_HISTORY", &value)?;
        }
        if let Some(value) = read_env("CHATRELAY_CONVERSATION_UPSTREAM_WINDOW") {
            self.conversation.upstream_window =
                parse_usize("CHATRELAY_CONVERSATION_UPSTREAM_WINDOW", &value)?;
        }
        if let Some(value) = read_env("CHATRELAY_CONVERSATION_MAX_CONVERSATIONS") {
            self.conversation.max_conversations =
                parse_usize("CHATRELAY_CONVERSATION_MAX_CONVERSATIONS", &value)?;
        }
        if let Some(value) = read_env("CHATRELAY_CONVERSATION_SYSTEM_PROMPT") {
            self.conversation.system_prompt = value;
        }
        if let Some(value) = read_env("CHATRELAY_CONVERSATION_COMMAND_PREFIX") {
            self.conversation.command_prefix = value;
        }
        if let Some(value) = read_env("CHATRELAY_CONVERSATION_GROUP_TRIGGER") {
            self.conversation.group_trigger = value.parse().map_err(ConfigError::Validation)?;
        }

        if let Some(value) = read_env("CHATRELAY_RATE_LIMIT_MAX_REQUESTS") {
            self.rate_limit.max_requests =
                parse_usize("CHATRELAY_RATE_LIMIT_MAX_REQUESTS", &value)?;
        }
        if let Some(value) = read_env("CHATRELAY_RATE_LIMIT_WINDOW_SECS") {
            self.rate_limit.window_secs = parse_u64("CHATRELAY_RATE_LIMIT_WINDOW_SECS", &value)?;
        }
        if let Some(value) = read_env("CHATRELAY_RATE_LIMIT_MAX_TRACKED_USERS") {
            self.rate_limit.max_tracked_users =
                parse_usize("CHATRELAY_RATE_LIMIT_MAX_TRACKED_USERS", &value)?;
        }

        if let Some(value) = read_env("CHATRELAY_REPLIES_CREATOR") {
            self.replies.creator = Some(value);
        }

        if let Some(value) = read_env("CHATRELAY_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        // PORT is what most container platforms inject
        let port = read_env("CHATRELAY_SERVER_PORT").map(|value| ("CHATRELAY_SERVER_PORT", value));
        if let Some((key, value)) = port.or_else(|| read_env("PORT").map(|value| ("PORT", value))) {
            self.server.port = parse_u16(key, &value)?;
        }
        if let Some(value) = read_env("CHATRELAY_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("CHATRELAY_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        let log_level =
            read_env("CHATRELAY_LOGGING_LEVEL").or_else(|| read_env("CHATRELAY_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("CHATRELAY_LOGGING_FORMAT").or_else(|| read_env("CHATRELAY_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(bot_token) = overrides.bot_token {
            self.telegram.bot_token = secret_value(bot_token);
        }
        if let Some(bot_username) = overrides.bot_username {
            self.telegram.bot_username = Some(bot_username);
        }
        if let Some(webhook_url) = overrides.webhook_url {
            self.telegram.webhook_url = Some(webhook_url);
        }
        if let Some(llm_api_key) = overrides.llm_api_key {
            self.llm.api_key = secret_value(llm_api_key);
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_telegram(&self.telegram)?;
        validate_llm(&self.llm)?;
        validate_conversation(&self.conversation)?;
        validate_rate_limit(&self.rate_limit)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from("config").join(DEFAULT_CONFIG_FILE)]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

/// Bot API tokens look like `123456789:AA...`.
pub fn is_bot_token_shaped(token: &str) -> bool {
    let Some((bot_id, secret)) = token.split_once(':') else {
        return false;
    };
    !bot_id.is_empty() && bot_id.bytes().all(|byte| byte.is_ascii_digit()) && !secret.is_empty()
}

fn validate_telegram(telegram: &TelegramConfig) -> Result<(), ConfigError> {
    let bot_token = telegram.bot_token.expose_secret();
    if bot_token.trim().is_empty() {
        return Err(ConfigError::Validation(
            "telegram.bot_token is required. Get it from @BotFather with /newbot or /token"
                .to_string(),
        ));
    }
    if !is_bot_token_shaped(bot_token) {
        return Err(ConfigError::Validation(
            "telegram.bot_token must look like `<bot id>:<secret>` as issued by @BotFather"
                .to_string(),
        ));
    }

    if let Some(username) = &telegram.bot_username {
        if username.trim_start_matches('@').trim().is_empty() {
            return Err(ConfigError::Validation(
                "telegram.bot_username must not be empty when set".to_string(),
            ));
        }
    }

    if !telegram.webhook_path.starts_with('/') {
        return Err(ConfigError::Validation(
            "telegram.webhook_path must start with `/`".to_string(),
        ));
    }

    if let Some(webhook_url) = &telegram.webhook_url {
        if !webhook_url.starts_with("https://") {
            return Err(ConfigError::Validation(
                "telegram.webhook_url must start with https:// (Telegram only delivers to TLS endpoints)"
                    .to_string(),
            ));
        }
    }

    if let Some(secret) = &telegram.webhook_secret {
        let secret = secret.expose_secret();
        let allowed =
            secret.bytes().all(|byte| byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-');
        if secret.is_empty() || secret.len() > 256 || !allowed {
            return Err(ConfigError::Validation(
                "telegram.webhook_secret must be 1-256 characters of A-Z, a-z, 0-9, `_` or `-`"
                    .to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.api_key.expose_secret().trim().is_empty() {
        return Err(ConfigError::Validation("llm.api_key is required".to_string()));
    }

    if !llm.base_url.starts_with("http://") && !llm.base_url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "llm.base_url must start with http:// or https://".to_string(),
        ));
    }

    if llm.model.trim().is_empty() {
        return Err(ConfigError::Validation("llm.model must not be empty".to_string()));
    }

    if !(0.0..=2.0).contains(&llm.temperature) {
        return Err(ConfigError::Validation(
            "llm.temperature must be in range 0.0..=2.0".to_string(),
        ));
    }

    if llm.max_tokens == 0 {
        return Err(ConfigError::Validation(
            "llm.max_tokens must be greater than zero".to_string(),
        ));
    }

    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_conversation(conversation: &ConversationConfig) -> Result<(), ConfigError> {
    if conversation.max_history == 0 {
        return Err(ConfigError::Validation(
            "conversation.max_history must be greater than zero".to_string(),
        ));
    }

    if conversation.upstream_window == 0 {
        return Err(ConfigError::Validation(
            "conversation.upstream_window must be greater than zero".to_string(),
        ));
    }

    if conversation.max_conversations == 0 {
        return Err(ConfigError::Validation(
            "conversation.max_conversations must be greater than zero".to_string(),
        ));
    }

    if conversation.system_prompt.trim().is_empty() {
        return Err(ConfigError::Validation(
            "conversation.system_prompt must not be empty".to_string(),
        ));
    }

    let prefix = conversation.command_prefix.trim();
    if !prefix.starts_with('/') || prefix.len() < 2 || prefix.contains(char::is_whitespace) {
        return Err(ConfigError::Validation(
            "conversation.command_prefix must be a bot command such as `/ask`".to_string(),
        ));
    }

    Ok(())
}

fn validate_rate_limit(rate_limit: &RateLimitConfig) -> Result<(), ConfigError> {
    if rate_limit.max_requests == 0 {
        return Err(ConfigError::Validation(
            "rate_limit.max_requests must be greater than zero".to_string(),
        ));
    }

    if rate_limit.window_secs == 0 {
        return Err(ConfigError::Validation(
            "rate_limit.window_secs must be greater than zero".to_string(),
        ));
    }

    if rate_limit.max_tracked_users == 0 {
        return Err(ConfigError::Validation(
            "rate_limit.max_tracked_users must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn invalid_override(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() }
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| invalid_override(key, value))
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| invalid_override(key, value))
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| invalid_override(key, value))
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| invalid_override(key, value))
}

fn parse_f32(key: &str, value: &str) -> Result<f32, ConfigError> {
    value.parse::<f32>().map_err(|_| invalid_override(key, value))
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    telegram: Option<TelegramPatch>,
    llm: Option<LlmPatch>,
    conversation: Option<ConversationPatch>,
    rate_limit: Option<RateLimitPatch>,
    replies: Option<RepliesPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct TelegramPatch {
    bot_token: Option<String>,
    bot_username: Option<String>,
    api_base_url: Option<String>,
    webhook_url: Option<String>,
    webhook_path: Option<String>,
    webhook_secret: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ConversationPatch {
    max_history: Option<usize>,
    upstream_window: Option<usize>,
    max_conversations: Option<usize>,
    system_prompt: Option<String>,
    command_prefix: Option<String>,
    group_trigger: Option<GroupTrigger>,
}

#[derive(Debug, Default, Deserialize)]
struct RateLimitPatch {
    max_requests: Option<usize>,
    window_secs: Option<u64>,
    max_tracked_users: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct RepliesPatch {
    rate_limited: Option<String>,
    unavailable: Option<String>,
    empty_completion: Option<String>,
    thinking: Option<String>,
    welcome: Option<String>,
    creator: Option<String>,
    identity_phrases: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
