//! # Crossing Chat Assistant
//!
//! A conversational helper backed by a generative-text service. The
//! dashboard only needs three things from it: send a user message, receive
//! the reply as a stream of text increments, and keep the conversation.
//!
//! ## Transport
//!
//! [`GeminiChat`] calls the `streamGenerateContent` endpoint with
//! `alt=sse` and decodes the server-sent events incrementally with
//! [`SseDecoder`], so each increment reaches the terminal as it arrives.
//!
//! ## Failure Handling
//!
//! Any transport or service error is logged and replaced by
//! [`FALLBACK_REPLY`] inside the conversation. The crossing status and tide
//! state never see chat errors.

use crate::config::ChatConfig;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use thiserror::Error;
use tracing::{debug, warn};

/// Longest message a user may send, in characters.
pub const MAX_MESSAGE_LENGTH: usize = 280;

pub const ASSISTANT_NAME: &str = "Crossing Assistant";

pub const WELCOME_MESSAGE: &str =
    "Hello! I'm the live assistant for the Santos - Vicente de Carvalho crossing. How can I help you today?";

pub const FALLBACK_REPLY: &str =
    "Sorry, I couldn't reach the assistant right now. Please try again in a moment.";

pub const SYSTEM_INSTRUCTION: &str = "You are the assistant for the catraia crossing between \
Santos and Vicente de Carvalho (Guarujá). Help users with schedules, tides, ships and terminals. \
Be helpful, quick and friendly. The catraias run 24 hours a day and stop only for ship maneuvers \
or extreme tides. At high or low tide passengers disembark at the quay stairway because the \
floating dock is out of reach.";

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("message is empty")]
    EmptyMessage,

    #[error("message has {0} characters, limit is {MAX_MESSAGE_LENGTH}")]
    TooLong(usize),

    #[error("API key variable {0} is not set")]
    MissingApiKey(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("assistant service answered {status}: {body}")]
    Service { status: u16, body: String },

    #[error("invalid assistant response: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    User,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    fn new(role: Role, text: impl Into<String>) -> Self {
        let timestamp = Utc::now();
        let prefix = match role {
            Role::User => "msg",
            Role::Assistant => "ai",
        };
        Self {
            id: format!("{prefix}_{}", timestamp.timestamp_millis()),
            role,
            text: text.into(),
            timestamp,
        }
    }
}

/// Messages of one chat session, oldest first, opening with the welcome.
#[derive(Clone, Debug)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
}

impl Default for Conversation {
    fn default() -> Self {
        let mut welcome = ChatMessage::new(Role::Assistant, WELCOME_MESSAGE);
        welcome.id = "welcome".to_string();
        Self {
            messages: vec![welcome],
        }
    }
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Messages the service should see: everything after the welcome.
    fn exchange(&self) -> &[ChatMessage] {
        match self.messages.first() {
            Some(first) if first.id == "welcome" => &self.messages[1..],
            _ => &self.messages,
        }
    }
}

/// Trim and check a user message against the length limit.
pub fn validate_message(text: &str) -> Result<&str, ChatError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ChatError::EmptyMessage);
    }
    let length = text.chars().count();
    if length > MAX_MESSAGE_LENGTH {
        return Err(ChatError::TooLong(length));
    }
    Ok(text)
}

/// Streaming conversational service.
pub trait ChatAssistant {
    /// Stream the reply to the last message of `exchange`, feeding each text
    /// increment to `on_delta`, and return the full reply.
    fn stream_reply(
        &self,
        exchange: &[ChatMessage],
        on_delta: &mut dyn FnMut(&str),
    ) -> impl Future<Output = Result<String, ChatError>>;
}

/// Assistant reply as recorded in the conversation.
#[derive(Clone, Debug, PartialEq)]
pub struct Reply {
    pub message: ChatMessage,
    /// The service failed and `message` holds the fallback text
    pub fallback: bool,
}

impl Reply {
    /// Text still to show the user once `streamed` increments were printed.
    /// A fallback replaces whatever partial text was streamed.
    pub fn unseen_text(&self, streamed: bool) -> Option<&str> {
        (self.fallback || !streamed).then_some(self.message.text.as_str())
    }
}

/// Send `text` and append the reply to `conversation`.
///
/// Input problems are returned as errors; service problems become the
/// fallback reply.
pub async fn send<C: ChatAssistant>(
    assistant: &C,
    conversation: &mut Conversation,
    text: &str,
    on_delta: &mut dyn FnMut(&str),
) -> Result<Reply, ChatError> {
    let text = validate_message(text)?;
    conversation.messages.push(ChatMessage::new(Role::User, text));

    let (text, fallback) = match assistant.stream_reply(conversation.exchange(), on_delta).await {
        Ok(reply) if !reply.trim().is_empty() => (reply, false),
        Ok(_) => {
            warn!("assistant returned an empty reply");
            (FALLBACK_REPLY.to_string(), true)
        }
        Err(e) => {
            warn!(error = %e, "assistant request failed");
            (FALLBACK_REPLY.to_string(), true)
        }
    };

    let message = ChatMessage::new(Role::Assistant, text);
    conversation.messages.push(message.clone());
    Ok(Reply { message, fallback })
}

/// Client for the Gemini `streamGenerateContent` API.
#[derive(Clone, Debug)]
pub struct GeminiChat {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl GeminiChat {
    pub fn new(endpoint: &str, model: &str, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
        }
    }

    /// Build from configuration, reading the key from `api_key_env`.
    pub fn from_config(config: &ChatConfig) -> Result<Self, ChatError> {
        let api_key = std::env::var(&config.api_key_env)
            .map_err(|_| ChatError::MissingApiKey(config.api_key_env.clone()))?;
        Ok(Self::new(&config.endpoint, &config.model, api_key))
    }

    fn url(&self) -> String {
        format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.endpoint, self.model
        )
    }
}

impl ChatAssistant for GeminiChat {
    async fn stream_reply(
        &self,
        exchange: &[ChatMessage],
        on_delta: &mut dyn FnMut(&str),
    ) -> Result<String, ChatError> {
        let body = GenerateRequest::new(exchange);
        let mut response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::Service {
                status: status.as_u16(),
                body,
            });
        }

        let mut decoder = SseDecoder::default();
        let mut reply = String::new();
        while let Some(chunk) = response.chunk().await? {
            for delta in decoder.push(&chunk)? {
                on_delta(&delta);
                reply.push_str(&delta);
            }
        }
        for delta in decoder.finish()? {
            on_delta(&delta);
            reply.push_str(&delta);
        }
        debug!(chars = reply.chars().count(), "assistant reply complete");
        Ok(reply)
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

impl<'a> GenerateRequest<'a> {
    fn new(exchange: &'a [ChatMessage]) -> Self {
        let contents = exchange
            .iter()
            .map(|message| Content {
                role: Some(match message.role {
                    Role::User => "user",
                    Role::Assistant => "model",
                }),
                parts: vec![Part {
                    text: &message.text,
                }],
            })
            .collect();
        Self {
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: SYSTEM_INSTRUCTION,
                }],
            },
            contents,
        }
    }
}

#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

/// Incremental decoder for `data:` lines of a server-sent event stream.
///
/// Bytes are buffered until a full line is available, so multi-byte
/// characters split across network chunks decode correctly.
#[derive(Debug, Default)]
pub struct SseDecoder {
    pending: Vec<u8>,
}

impl SseDecoder {
    /// Feed raw bytes, returning the text increments of every complete event line.
    pub fn push(&mut self, bytes: &[u8]) -> Result<Vec<String>, ChatError> {
        self.pending.extend_from_slice(bytes);
        let mut deltas = Vec::new();
        while let Some(end) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=end).collect();
            if let Some(delta) = decode_line(&line)? {
                deltas.push(delta);
            }
        }
        Ok(deltas)
    }

    /// Decode a trailing line left without a newline.
    pub fn finish(&mut self) -> Result<Vec<String>, ChatError> {
        let line = std::mem::take(&mut self.pending);
        Ok(decode_line(&line)?.into_iter().collect())
    }
}

fn decode_line(line: &[u8]) -> Result<Option<String>, ChatError> {
    let line = String::from_utf8_lossy(line);
    let Some(payload) = line.trim_end().strip_prefix("data:") else {
        return Ok(None);
    };
    let payload = payload.trim_start();
    if payload.is_empty() || payload == "[DONE]" {
        return Ok(None);
    }
    let chunk: StreamChunk = serde_json::from_str(payload)?;
    let text: String = chunk
        .candidates
        .into_iter()
        .take(1)
        .filter_map(|candidate| candidate.content)
        .flat_map(|content| content.parts)
        .filter_map(|part| part.text)
        .collect();
    Ok((!text.is_empty()).then_some(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ScriptedAssistant {
        deltas: Vec<&'static str>,
    }

    impl ChatAssistant for ScriptedAssistant {
        async fn stream_reply(
            &self,
            exchange: &[ChatMessage],
            on_delta: &mut dyn FnMut(&str),
        ) -> Result<String, ChatError> {
            assert_eq!(exchange.last().map(|m| m.role), Some(Role::User));
            let mut reply = String::new();
            for delta in &self.deltas {
                on_delta(delta);
                reply.push_str(delta);
            }
            Ok(reply)
        }
    }

    struct DownAssistant;

    impl ChatAssistant for DownAssistant {
        async fn stream_reply(
            &self,
            _exchange: &[ChatMessage],
            _on_delta: &mut dyn FnMut(&str),
        ) -> Result<String, ChatError> {
            Err(ChatError::Service {
                status: 503,
                body: "overloaded".to_string(),
            })
        }
    }

    struct DropsAfterFirstDelta;

    impl ChatAssistant for DropsAfterFirstDelta {
        async fn stream_reply(
            &self,
            _exchange: &[ChatMessage],
            on_delta: &mut dyn FnMut(&str),
        ) -> Result<String, ChatError> {
            on_delta("The tide is ");
            Err(ChatError::Service {
                status: 500,
                body: "stream reset".to_string(),
            })
        }
    }

    fn event(text: &str) -> String {
        format!(
            "data: {{\"candidates\":[{{\"content\":{{\"role\":\"model\",\"parts\":[{{\"text\":{}}}]}}}}]}}\n\n",
            serde_json::to_string(text).unwrap()
        )
    }

    #[test]
    fn test_validate_message() {
        assert_eq!(validate_message("  hi  ").unwrap(), "hi");
        assert!(matches!(validate_message("   "), Err(ChatError::EmptyMessage)));
        let long = "a".repeat(MAX_MESSAGE_LENGTH + 1);
        assert!(matches!(validate_message(&long), Err(ChatError::TooLong(281))));
        assert!(validate_message(&"é".repeat(MAX_MESSAGE_LENGTH)).is_ok());
    }

    #[test]
    fn test_conversation_opens_with_welcome() {
        let conversation = Conversation::new();
        assert_eq!(conversation.messages().len(), 1);
        assert_eq!(conversation.messages()[0].text, WELCOME_MESSAGE);
        assert!(conversation.exchange().is_empty());
    }

    #[test]
    fn test_decoder_handles_split_chunks() {
        let stream = format!("{}{}", event("Maré "), event("baixa"));
        let bytes = stream.as_bytes();
        let mut decoder = SseDecoder::default();
        let mut deltas = Vec::new();
        // split inside the multi-byte 'é'
        let split = stream.find('é').unwrap() + 1;
        deltas.extend(decoder.push(&bytes[..split]).unwrap());
        deltas.extend(decoder.push(&bytes[split..]).unwrap());
        deltas.extend(decoder.finish().unwrap());
        assert_eq!(deltas, vec!["Maré ".to_string(), "baixa".to_string()]);
    }

    #[test]
    fn test_decoder_ignores_other_fields() {
        let mut decoder = SseDecoder::default();
        let deltas = decoder
            .push(b": keep-alive\nevent: message\ndata: {\"candidates\":[]}\n")
            .unwrap();
        assert!(deltas.is_empty());
    }

    #[test]
    fn test_decoder_finishes_unterminated_line() {
        let mut decoder = SseDecoder::default();
        let line = event("ok");
        assert!(decoder.push(line.trim_end().as_bytes()).unwrap().is_empty());
        assert_eq!(decoder.finish().unwrap(), vec!["ok".to_string()]);
    }

    #[test]
    fn test_decoder_rejects_bad_json() {
        let mut decoder = SseDecoder::default();
        assert!(matches!(decoder.push(b"data: {oops\n"), Err(ChatError::Json(_))));
    }

    #[test]
    fn test_request_body_shape() {
        let exchange = vec![
            ChatMessage::new(Role::User, "Is the basin open?"),
            ChatMessage::new(Role::Assistant, "Yes."),
        ];
        let json = serde_json::to_value(GenerateRequest::new(&exchange)).unwrap();
        assert_eq!(
            json["system_instruction"]["parts"][0]["text"],
            SYSTEM_INSTRUCTION
        );
        assert!(json["system_instruction"].get("role").is_none());
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][1]["role"], "model");
        assert_eq!(json["contents"][1]["parts"][0]["text"], "Yes.");
    }

    #[test]
    fn test_gemini_url() {
        let chat = GeminiChat::new("https://example.test/v1beta/", "demo-model", "k".into());
        assert_eq!(
            chat.url(),
            "https://example.test/v1beta/models/demo-model:streamGenerateContent?alt=sse"
        );
    }

    #[tokio::test]
    async fn test_send_streams_and_records() {
        let assistant = ScriptedAssistant {
            deltas: vec!["The tide ", "is low."],
        };
        let mut conversation = Conversation::new();
        let mut seen = Vec::new();
        let reply = send(&assistant, &mut conversation, "How is the tide?", &mut |d: &str| {
            seen.push(d.to_string())
        })
        .await
        .unwrap();

        assert_eq!(seen, vec!["The tide ", "is low."]);
        assert_eq!(reply.message.text, "The tide is low.");
        assert!(!reply.fallback);
        assert_eq!(reply.unseen_text(true), None);
        assert_eq!(reply.unseen_text(false), Some("The tide is low."));
        assert_eq!(conversation.messages().len(), 3);
        assert_eq!(conversation.messages()[1].role, Role::User);
    }

    #[tokio::test]
    async fn test_send_falls_back_on_service_error() {
        let mut conversation = Conversation::new();
        let reply = send(&DownAssistant, &mut conversation, "hello", &mut |_: &str| {})
            .await
            .unwrap();
        assert_eq!(reply.message.text, FALLBACK_REPLY);
        assert!(reply.fallback);
        assert_eq!(conversation.messages().last().unwrap().text, FALLBACK_REPLY);
    }

    #[tokio::test]
    async fn test_failure_mid_stream_still_shows_fallback() {
        let mut conversation = Conversation::new();
        let mut seen = String::new();
        let reply = send(
            &DropsAfterFirstDelta,
            &mut conversation,
            "Is the quay open?",
            &mut |d: &str| seen.push_str(d),
        )
        .await
        .unwrap();

        assert_eq!(seen, "The tide is ");
        assert!(reply.fallback);
        assert_eq!(reply.unseen_text(!seen.is_empty()), Some(FALLBACK_REPLY));
        assert_eq!(conversation.messages().last().unwrap().text, FALLBACK_REPLY);
    }

    #[tokio::test]
    async fn test_send_rejects_empty_input() {
        let mut conversation = Conversation::new();
        assert!(send(&DownAssistant, &mut conversation, "  ", &mut |_: &str| {})
            .await
            .is_err());
        assert_eq!(conversation.messages().len(), 1);
    }
}
