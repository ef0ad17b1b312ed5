use serde::{Deserialize, Serialize};

/// Incoming webhook payload. Only the fields the relay reads are modelled;
/// unknown fields (including `edited_message`) are ignored by serde.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Message {
    pub message_id: i64,
    #[serde(default)]
    pub from: Option<User>,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: ChatType,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatType {
    Private,
    Group,
    Supergroup,
    Channel,
    #[serde(other)]
    Unknown,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
}

/// `reply_parameters` object of `sendMessage`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ReplyParameters {
    pub message_id: i64,
    pub allow_sending_without_reply: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SendMessageRequest<'a> {
    pub chat_id: i64,
    pub text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_parameters: Option<ReplyParameters>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EditMessageTextRequest<'a> {
    pub chat_id: i64,
    pub message_id: i64,
    pub text: &'a str,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SetWebhookRequest<'a> {
    pub url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_token: Option<&'a str>,
    pub allowed_updates: &'a [&'a str],
}

/// Every Bot API response is wrapped in this envelope.
#[derive(Clone, Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub error_code: Option<u16>,
}

#[cfg(test)]
mod tests {
    use super::{ChatType, SendMessageRequest, Update};

    #[test]
    fn private_text_update_deserializes() {
        let update: Update = serde_json::from_str(
            r#"{
                "update_id": 10,
                "message": {
                    "message_id": 5,
                    "date": 1700000000,
                    "from": {"id": 42, "is_bot": false, "first_name": "Ada", "username": "ada"},
                    "chat": {"id": 42, "type": "private", "first_name": "Ada"},
                    "text": "hello"
                }
            }"#,
        )
        .expect("update should parse");

        let message = update.message.expect("message present");
        assert_eq!(message.chat.kind, ChatType::Private);
        assert_eq!(message.from.map(|user| (user.id, user.is_bot)), Some((42, false)));
        assert_eq!(message.text.as_deref(), Some("hello"));
    }

    #[test]
    fn unknown_chat_types_do_not_fail_decoding() {
        let update: Update = serde_json::from_str(
            r#"{"update_id": 1, "message": {"message_id": 1, "chat": {"id": 1, "type": "forum_topic"}}}"#,
        )
        .expect("update should parse");
        assert_eq!(update.message.map(|message| message.chat.kind), Some(ChatType::Unknown));
    }

    #[test]
    fn send_message_omits_missing_reply_parameters() {
        let body = serde_json::to_value(SendMessageRequest {
            chat_id: -100,
            text: "hi",
            reply_parameters: None,
        })
        .expect("serializes");
        assert_eq!(body, serde_json::json!({"chat_id": -100, "text": "hi"}));
    }
}
