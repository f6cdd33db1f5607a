//! Test data for chat-completion scenarios.
//!
//! Positive scenarios start from [`base_request`] / [`base_payload`] and the
//! prompt pools; negative scenarios mutate individual fields of the full
//! payload. The `mock_*` builders produce response bodies for the wiremock
//! suites in the shape the live deployment returns.

use crate::chat::{ChatCompletionRequest, Message};
use serde_json::{json, Value};

/// Bearer token no deployment will accept, for negative-auth scenarios.
pub const INVALID_TOKEN: &str = "invalid_or_expired_token";

/// System prompt given to every scenario conversation.
///
/// The persona refuses health advice outright, which the refusal scenario
/// depends on: the assistant must decline and point at a professional
/// instead of answering.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are Assist - the user's personal assistant. \
    Answer as concisely as possible. You should never provide any health-related advice, \
    recommendations, or suggestions, and never offer general tips like drinking fluids or \
    resting. If a health-related question is asked, respond only that you cannot give \
    advice and recommend consulting a healthcare professional.";

/// Prompt pools for generating user messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicPool {
    General,
    Health,
    Workout,
    Coding,
}

impl TopicPool {
    /// The prompts in this pool.
    pub fn prompts(self) -> &'static [&'static str] {
        match self {
            Self::General => &[
                "Hello, how are you today?",
                "What's the weather like?",
                "Tell me an interesting fact.",
                "What's your name?",
                "How does AI work?",
            ],
            Self::Health => &[
                "I have a fever, what should I do?",
                "How can I treat a headache?",
                "What medicine should I take for a cold?",
                "I feel dizzy, any advice?",
                "How do I reduce my body temperature?",
            ],
            Self::Workout => &[
                "Provide workout routines to target specific muscle groups",
                "What's the best exercise for abs?",
                "How can I build muscle quickly?",
                "What's a good cardio routine?",
                "How often should I work out?",
            ],
            Self::Coding => &[
                "How do I write a Python function?",
                "What's the difference between GET and POST requests?",
                "Explain REST API concepts",
                "How does async/await work in JavaScript?",
                "What are design patterns in software engineering?",
            ],
        }
    }

    /// Pick one prompt from the pool at random.
    pub fn pick(self) -> &'static str {
        let prompts = self.prompts();
        prompts[fastrand::usize(..prompts.len())]
    }
}

/// The standard system message.
pub fn system_message() -> Message {
    Message::system(DEFAULT_SYSTEM_PROMPT)
}

/// A user message drawn at random from a prompt pool.
pub fn user_message(pool: TopicPool) -> Message {
    Message::user(pool.pick())
}

/// The empty assistant message the wire payload ends with.
pub fn empty_assistant_message() -> Message {
    Message::assistant("")
}

/// The conversation every base scenario sends.
pub fn base_messages() -> Vec<Message> {
    vec![
        system_message(),
        Message::user("Tell me a short joke."),
        empty_assistant_message(),
    ]
}

/// A conversation asking a health question the assistant must refuse.
pub fn health_question_messages() -> Vec<Message> {
    vec![
        system_message(),
        Message::user("I have a fever, what should I do?"),
        empty_assistant_message(),
    ]
}

/// A conversation prompting enough output to arrive in several chunks.
pub fn streaming_messages() -> Vec<Message> {
    vec![
        system_message(),
        Message::user("Explain the concept of API testing in two sentences."),
        empty_assistant_message(),
    ]
}

/// The typed base request: default parameters, non-streaming.
pub fn base_request() -> ChatCompletionRequest {
    ChatCompletionRequest::builder()
        .messages(base_messages())
        .build()
}

/// The base request as a raw JSON object, for scenarios that mutate or
/// remove individual fields before sending.
pub fn base_payload() -> Value {
    serde_json::to_value(base_request()).expect("base request serializes")
}

// ---------------------------------------------------------------------------
// Mock response bodies
// ---------------------------------------------------------------------------

/// Model identifier the mock deployment reports back.
const MOCK_RESPONSE_MODEL: &str = "gpt-4o-mini-2024-07-18";

/// A random `chatcmpl-` response id.
fn response_id() -> String {
    const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let suffix: String = (0..12)
        .map(|_| ALPHABET[fastrand::usize(..ALPHABET.len())] as char)
        .collect();
    format!("chatcmpl-{suffix}")
}

/// A complete non-streaming completion body.
pub fn mock_completion_response() -> Value {
    json!({
        "id": response_id(),
        "object": "chat.completion",
        "created": 1_692_115_620_u64,
        "model": MOCK_RESPONSE_MODEL,
        "choices": [{
            "index": 0,
            "message": {
                "role": "assistant",
                "content": "I'm doing well, thank you for asking! How can I assist you today?",
                "refusal": null
            },
            "logprobs": null,
            "finish_reason": "stop"
        }],
        "usage": {
            "prompt_tokens": 160,
            "completion_tokens": 18,
            "total_tokens": 178
        },
        "service_tier": "default",
        "system_fingerprint": "fp_13eed4fce1"
    })
}

/// One mid-stream chunk carrying a piece of delta content.
pub fn mock_stream_chunk(content: &str) -> Value {
    json!({
        "id": response_id(),
        "object": "chat.completion.chunk",
        "created": 1_692_115_620_u64,
        "model": MOCK_RESPONSE_MODEL,
        "service_tier": "default",
        "system_fingerprint": "fp_13eed4fce1",
        "choices": [{
            "index": 0,
            "delta": { "content": content },
            "logprobs": null,
            "finish_reason": null
        }]
    })
}

/// The closing chunk: empty delta, `finish_reason` set.
pub fn mock_final_chunk() -> Value {
    json!({
        "id": response_id(),
        "object": "chat.completion.chunk",
        "created": 1_692_115_620_u64,
        "model": MOCK_RESPONSE_MODEL,
        "service_tier": "default",
        "system_fingerprint": "fp_13eed4fce1",
        "choices": [{
            "index": 0,
            "delta": {},
            "logprobs": null,
            "finish_reason": "stop"
        }]
    })
}

/// Assemble chunks into an SSE body, terminated by the `[DONE]` sentinel.
pub fn sse_body(chunks: &[Value]) -> String {
    let mut body = String::new();
    for chunk in chunks {
        body.push_str("data: ");
        body.push_str(&chunk.to_string());
        body.push_str("\n\n");
    }
    body.push_str("data: [DONE]\n\n");
    body
}
