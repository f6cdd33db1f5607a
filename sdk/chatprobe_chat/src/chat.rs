//! Chat completion payloads and the endpoint facade.

use chatprobe_core::client::{ApiClient, ApiResponse};
use chatprobe_core::error::ClientResult;
use serde::{Deserialize, Serialize};

/// Path of the chat-completions endpoint, relative to the base address.
pub const CHAT_COMPLETIONS_PATH: &str = "/stream/v1/chat/completions";

/// Model identifier used when a scenario does not pick its own.
pub const DEFAULT_MODEL: &str = "gpt-4-0125-preview";

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// A chat completion request.
///
/// Unlike a production client, every field is always serialized — the
/// negative scenarios mutate individual fields of the full payload, so
/// nothing is skipped when unset. Field order matches the wire payload.
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    pub temperature: f32,
    pub top_p: f32,
    pub n: u32,
    pub presence_penalty: f32,
    pub frequency_penalty: f32,
    pub stream: bool,
    pub model: String,
    pub messages: Vec<Message>,
}

impl Default for ChatCompletionRequest {
    fn default() -> Self {
        Self {
            temperature: 0.4,
            top_p: 1.0,
            n: 1,
            presence_penalty: 0.0,
            frequency_penalty: 0.0,
            stream: false,
            model: DEFAULT_MODEL.to_string(),
            messages: Vec::new(),
        }
    }
}

impl ChatCompletionRequest {
    /// Create a new builder.
    pub fn builder() -> ChatCompletionRequestBuilder {
        ChatCompletionRequestBuilder {
            request: Self::default(),
        }
    }
}

/// Builder for [`ChatCompletionRequest`]. Fields not set keep the
/// endpoint's documented defaults.
#[derive(Debug)]
pub struct ChatCompletionRequestBuilder {
    request: ChatCompletionRequest,
}

impl ChatCompletionRequestBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.request.model = model.into();
        self
    }

    pub fn message(mut self, message: Message) -> Self {
        self.request.messages.push(message);
        self
    }

    pub fn messages(mut self, messages: impl IntoIterator<Item = Message>) -> Self {
        self.request.messages.extend(messages);
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.request.temperature = temperature;
        self
    }

    pub fn top_p(mut self, top_p: f32) -> Self {
        self.request.top_p = top_p;
        self
    }

    pub fn n(mut self, n: u32) -> Self {
        self.request.n = n;
        self
    }

    pub fn presence_penalty(mut self, penalty: f32) -> Self {
        self.request.presence_penalty = penalty;
        self
    }

    pub fn frequency_penalty(mut self, penalty: f32) -> Self {
        self.request.frequency_penalty = penalty;
        self
    }

    pub fn stream(mut self, stream: bool) -> Self {
        self.request.stream = stream;
        self
    }

    pub fn build(self) -> ChatCompletionRequest {
        self.request
    }
}

/// A message in a chat conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// The role of a message in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// A non-streaming chat completion response.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    pub id: String,
    pub object: String,
    pub created: u64,
    pub model: String,
    pub choices: Vec<Choice>,
    pub usage: Option<Usage>,
}

/// A single choice in a chat completion response.
#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    pub index: u32,
    pub message: Message,
    pub finish_reason: Option<String>,
}

/// Token usage statistics.
#[derive(Debug, Clone, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: Option<u32>,
    pub total_tokens: u32,
}

/// One chunk of a streaming response.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionChunk {
    pub id: String,
    pub object: String,
    pub created: u64,
    pub model: String,
    pub choices: Vec<ChunkChoice>,
}

/// A single choice inside a streaming chunk.
#[derive(Debug, Clone, Deserialize)]
pub struct ChunkChoice {
    pub index: u32,
    pub delta: Delta,
    pub finish_reason: Option<String>,
}

/// Incremental message content carried by a chunk.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Delta {
    pub role: Option<Role>,
    pub content: Option<String>,
}

// ---------------------------------------------------------------------------
// API functions
// ---------------------------------------------------------------------------

/// Send a chat completion request.
///
/// With `expected_status` set, a diverging status fails the call with a
/// contract violation before the response is handed back; negative
/// scenarios pass the rejection code they expect.
///
/// # Example
///
/// ```rust,no_run
/// # use chatprobe_core::client::ApiClient;
/// # use chatprobe_chat::chat::*;
/// # async fn example(client: &ApiClient) -> chatprobe_core::ClientResult<()> {
/// let request = ChatCompletionRequest::builder()
///     .message(Message::system("You are a helpful assistant."))
///     .message(Message::user("What is Rust?"))
///     .temperature(0.7)
///     .build();
///
/// let response = post_chat_completion(client, &request, Some(200)).await?;
/// let body: ChatCompletionResponse = response.json().await?;
/// println!("{}", body.choices[0].message.content);
/// # Ok(())
/// # }
/// ```
pub async fn post_chat_completion(
    client: &ApiClient,
    request: &ChatCompletionRequest,
    expected_status: Option<u16>,
) -> ClientResult<ApiResponse> {
    let body = serde_json::to_value(request)?;
    tracing::debug!(model = %request.model, stream = request.stream, "posting chat completion");

    let mut spec = client.post(CHAT_COMPLETIONS_PATH).json(body);
    if let Some(expected) = expected_status {
        spec = spec.expect_status(expected);
    }
    spec.send().await
}
