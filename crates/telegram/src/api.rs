use std::time::Duration;

use async_trait::async_trait;
use chatrelay_agent::{ReplySink, SentMessage};
use chatrelay_core::config::TelegramConfig;
use chatrelay_core::{ConversationKey, DeliveryError};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::types::{
    ApiResponse, EditMessageTextRequest, ReplyParameters, SendMessageRequest, SetWebhookRequest,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("bot api client setup failed: {0}")]
    Setup(String),
    #[error("bot api transport failed: {0}")]
    Transport(String),
    #[error("bot api call `{method}` failed ({status}): {description}")]
    Api { method: &'static str, status: u16, description: String },
    #[error("bot api response for `{method}` could not be decoded: {detail}")]
    Decode { method: &'static str, detail: String },
    #[error("conversation key `{0}` is not a Telegram chat id")]
    InvalidChatId(String),
}

impl From<ApiError> for DeliveryError {
    fn from(error: ApiError) -> Self {
        match error {
            ApiError::Api { status, description, .. } => Self::Rejected { status, description },
            ApiError::Setup(detail) | ApiError::Transport(detail) => Self::Transport(detail),
            ApiError::Decode { detail, .. } => Self::Decode(detail),
            ApiError::InvalidChatId(key) => Self::Rejected {
                status: 400,
                description: format!("invalid chat id `{key}`"),
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct BotIdentity {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
struct SentMessagePayload {
    message_id: i64,
}

/// Minimal Telegram Bot API client over HTTPS.
pub struct BotApi {
    client: reqwest::Client,
    api_base_url: String,
    token: SecretString,
}

impl BotApi {
    pub fn new(config: &TelegramConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|error| ApiError::Setup(error.to_string()))?;

        Ok(Self {
            client,
            api_base_url: config.api_base_url.trim_end_matches('/').to_owned(),
            token: config.bot_token.clone(),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_base_url, self.token.expose_secret())
    }

    async fn call<B, T>(&self, method: &'static str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        debug!(event_name = "telegram.api.call", method, "calling bot api");
        let response = self
            .client
            .post(self.method_url(method))
            .json(body)
            .send()
            .await
            // reqwest errors embed the url, which carries the token
            .map_err(|error| ApiError::Transport(error.without_url().to_string()))?;

        let status = response.status().as_u16();
        let bytes = response
            .bytes()
            .await
            .map_err(|error| ApiError::Transport(error.without_url().to_string()))?;
        decode_response(method, status, &bytes)
    }

    pub async fn get_me(&self) -> Result<BotIdentity, ApiError> {
        self.call("getMe", &serde_json::json!({})).await
    }

    pub async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        reply_to: Option<i64>,
    ) -> Result<SentMessage, ApiError> {
        let request = SendMessageRequest {
            chat_id,
            text,
            reply_parameters: reply_to.map(|message_id| ReplyParameters {
                message_id,
                allow_sending_without_reply: true,
            }),
        };
        let sent: SentMessagePayload = self.call("sendMessage", &request).await?;
        Ok(SentMessage { message_id: sent.message_id })
    }

    pub async fn edit_message_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
    ) -> Result<(), ApiError> {
        let request = EditMessageTextRequest { chat_id, message_id, text };
        let _: serde_json::Value = self.call("editMessageText", &request).await?;
        Ok(())
    }

    pub async fn set_webhook(&self, url: &str, secret_token: Option<&str>) -> Result<(), ApiError> {
        let request = SetWebhookRequest { url, secret_token, allowed_updates: &["message"] };
        let _: bool = self.call("setWebhook", &request).await?;
        Ok(())
    }
}

fn decode_response<T>(method: &'static str, status: u16, bytes: &[u8]) -> Result<T, ApiError>
where
    T: DeserializeOwned,
{
    let envelope: ApiResponse<T> = serde_json::from_slice(bytes)
        .map_err(|error| ApiError::Decode { method, detail: error.to_string() })?;

    if !envelope.ok {
        return Err(ApiError::Api {
            method,
            status: envelope.error_code.unwrap_or(status),
            description: envelope.description.unwrap_or_else(|| "no description".to_owned()),
        });
    }

    envelope
        .result
        .ok_or_else(|| ApiError::Decode { method, detail: "missing result".to_owned() })
}

fn chat_id(conversation_key: &ConversationKey) -> Result<i64, ApiError> {
    conversation_key
        .0
        .parse::<i64>()
        .map_err(|_| ApiError::InvalidChatId(conversation_key.0.clone()))
}

#[async_trait]
impl ReplySink for BotApi {
    async fn send_message(
        &self,
        conversation_key: &ConversationKey,
        text: &str,
        reply_to: Option<i64>,
    ) -> Result<SentMessage, DeliveryError> {
        let chat_id = chat_id(conversation_key)?;
        Ok(self.send_text(chat_id, text, reply_to).await?)
    }

    async fn edit_message(
        &self,
        conversation_key: &ConversationKey,
        message_id: i64,
        text: &str,
    ) -> Result<(), DeliveryError> {
        let chat_id = chat_id(conversation_key)?;
        Ok(self.edit_message_text(chat_id, message_id, text).await?)
    }
}

#[cfg(test)]
mod tests {
    use chatrelay_agent::{ReplySink, SentMessage};
    use chatrelay_core::config::AppConfig;
    use chatrelay_core::{ConversationKey, DeliveryError};
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::{chat_id, decode_response, ApiError, BotApi, BotIdentity};

    fn api_against(server: &MockServer) -> BotApi {
        let mut config = AppConfig::default();
        config.telegram.bot_token = "123:abc".to_owned().into();
        config.telegram.api_base_url = server.uri();
        BotApi::new(&config.telegram).expect("client builds")
    }

    #[test]
    fn successful_envelope_yields_result() {
        let identity: BotIdentity = decode_response(
            "getMe",
            200,
            br#"{"ok":true,"result":{"id":99,"is_bot":true,"first_name":"Relay","username":"relaybot"}}"#,
        )
        .expect("identity decodes");
        assert_eq!(identity.username.as_deref(), Some("relaybot"));
    }

    #[test]
    fn failed_envelope_becomes_api_error() {
        let error = decode_response::<bool>(
            "sendMessage",
            403,
            br#"{"ok":false,"error_code":403,"description":"Forbidden: bot was blocked by the user"}"#,
        )
        .expect_err("blocked chat should fail");

        assert_eq!(
            error,
            ApiError::Api {
                method: "sendMessage",
                status: 403,
                description: "Forbidden: bot was blocked by the user".to_owned(),
            }
        );
        assert!(!DeliveryError::from(error).is_transient());
    }

    #[test]
    fn non_json_body_is_decode_error() {
        let error = decode_response::<bool>("setWebhook", 502, b"<html>Bad Gateway</html>")
            .expect_err("html is not an envelope");
        assert!(matches!(error, ApiError::Decode { method: "setWebhook", .. }));
    }

    #[test]
    fn conversation_keys_must_be_numeric_chat_ids() {
        assert_eq!(chat_id(&ConversationKey::from(-1001234)), Ok(-1001234));
        assert!(matches!(
            chat_id(&ConversationKey("general".to_owned())),
            Err(ApiError::InvalidChatId(_))
        ));
    }

    #[test]
    fn method_urls_embed_token_after_bot_prefix() {
        let mut config = AppConfig::default();
        config.telegram.bot_token = "123:abc".to_owned().into();
        config.telegram.api_base_url = "https://api.telegram.org/".to_owned();
        let api = BotApi::new(&config.telegram).expect("client builds");

        assert_eq!(api.method_url("getMe"), "https://api.telegram.org/bot123:abc/getMe");
    }

    #[tokio::test]
    async fn send_text_surfaces_rejected_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot123:abc/sendMessage"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "ok": false,
                "error_code": 400,
                "description": "Bad Request: chat not found"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let error = api_against(&server)
            .send_text(-42, "hello", None)
            .await
            .expect_err("telegram rejected the call");

        assert_eq!(
            error,
            ApiError::Api {
                method: "sendMessage",
                status: 400,
                description: "Bad Request: chat not found".to_owned(),
            }
        );
    }

    #[tokio::test]
    async fn reply_sink_sends_threaded_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot123:abc/sendMessage"))
            .and(body_json(serde_json::json!({
                "chat_id": 42,
                "text": "Keep pushing.",
                "reply_parameters": {"message_id": 7, "allow_sending_without_reply": true}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "result": {"message_id": 555, "date": 0, "chat": {"id": 42, "type": "private"}}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let sent = api_against(&server)
            .send_message(&ConversationKey::from(42), "Keep pushing.", Some(7))
            .await
            .expect("message sent");

        assert_eq!(sent, SentMessage { message_id: 555 });
    }
}
