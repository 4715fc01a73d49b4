use serde::{Deserialize, Serialize};

pub const SIGNATURE_HEADER: &str = "x-line-signature";

/// Upper bound on a single text message accepted by the reply API.
pub const MAX_TEXT_CHARS: usize = 5000;

/// Body POSTed to the webhook. An empty `events` list is the platform's
/// endpoint verification request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookRequest {
    #[serde(default)]
    pub events: Vec<WebhookEvent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub reply_token: Option<String>,
    #[serde(default)]
    pub message: Option<MessageContent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageContent {
    #[serde(rename = "type")]
    pub message_type: String,
    #[serde(default)]
    pub text: Option<String>,
}

impl WebhookEvent {
    /// Returns `(text, reply_token)` for text message events, `None` for
    /// everything else.
    pub fn text_message(&self) -> Option<(&str, &str)> {
        if self.event_type != "message" {
            return None;
        }
        let message = self.message.as_ref()?;
        if message.message_type != "text" {
            return None;
        }
        Some((message.text.as_deref()?, self.reply_token.as_deref()?))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReplyMessageRequest {
    pub reply_token: String,
    pub messages: Vec<TextMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TextMessage {
    #[serde(rename = "type")]
    pub message_type: String,
    pub text: String,
}

impl TextMessage {
    pub fn new(text: &str) -> Self {
        let text = match text.char_indices().nth(MAX_TEXT_CHARS) {
            Some((cut, _)) => text[..cut].to_string(),
            None => text.to_string(),
        };
        Self {
            message_type: "text".to_string(),
            text,
        }
    }
}

impl ReplyMessageRequest {
    pub fn text(reply_token: &str, text: &str) -> Self {
        Self {
            reply_token: reply_token.to_string(),
            messages: vec![TextMessage::new(text)],
        }
    }
}
