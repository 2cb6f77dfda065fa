//! OpenAI chat-completions client implementing [`ModelClient`].
//!
//! Streams responses over SSE. Tool-call arguments arrive as JSON fragments
//! spread across chunks; this client accumulates them per tool-call index and
//! emits one [`ModelEvent::ToolCall`] per fully assembled call, preserving
//! the order the model proposed them. The non-streaming `complete` call backs
//! the title summarizer.

use async_stream::try_stream;
use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::debug;

use parley_core::Role;

use crate::client::{
    ModelClient, ModelContext, ModelError, ModelEvent, ModelEventStream, ModelResult,
    ProposedToolCall, StopReason,
};

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration for [`OpenAiClient`].
#[derive(Clone, Debug)]
pub struct OpenAiConfig {
    /// API base URL (override for proxies and tests).
    pub base_url: String,
    /// API key sent as a Bearer token.
    pub api_key: String,
    /// Model ID to request.
    pub model: String,
}

impl OpenAiConfig {
    /// Config against the public API with the given key and model.
    #[must_use]
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Value>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

#[derive(Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Default, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCallDelta>>,
}

#[derive(Deserialize)]
struct ToolCallDelta {
    index: usize,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    function: Option<FunctionDelta>,
}

#[derive(Deserialize)]
struct FunctionDelta {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ResponseChoice>,
}

#[derive(Deserialize)]
struct ResponseChoice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Message conversion
// ─────────────────────────────────────────────────────────────────────────────

/// Convert the engine's history into chat-completions wire messages.
///
/// An assistant message carrying tool invocations becomes one assistant
/// entry with `tool_calls` followed by one `tool` entry per attached result.
/// Invocations without results are skipped — the engine settles every
/// invocation before handing history to the model.
fn convert_messages(context: &ModelContext) -> Vec<Value> {
    let mut wire = Vec::with_capacity(context.messages.len() + 1);

    if let Some(system) = &context.system_prompt {
        wire.push(json!({"role": "system", "content": system}));
    }

    for msg in &context.messages {
        match msg.role {
            Role::User => wire.push(json!({"role": "user", "content": msg.text()})),
            Role::System => wire.push(json!({"role": "system", "content": msg.text()})),
            Role::Assistant => {
                let text = msg.text();
                let settled: Vec<_> = msg
                    .invocations()
                    .filter(|inv| inv.result.is_some())
                    .collect();

                if settled.is_empty() {
                    wire.push(json!({"role": "assistant", "content": text}));
                    continue;
                }

                let tool_calls: Vec<Value> = settled
                    .iter()
                    .map(|inv| {
                        json!({
                            "id": inv.tool_call_id.as_str(),
                            "type": "function",
                            "function": {
                                "name": inv.tool_name,
                                "arguments": Value::Object(inv.args.clone()).to_string(),
                            },
                        })
                    })
                    .collect();
                wire.push(json!({
                    "role": "assistant",
                    "content": if text.is_empty() { Value::Null } else { Value::String(text) },
                    "tool_calls": tool_calls,
                }));

                for inv in settled {
                    // result presence checked by the filter above
                    if let Some(outcome) = &inv.result {
                        wire.push(json!({
                            "role": "tool",
                            "tool_call_id": inv.tool_call_id.as_str(),
                            "content": outcome.content,
                        }));
                    }
                }
            }
        }
    }

    wire
}

fn convert_tools(context: &ModelContext) -> Vec<Value> {
    context
        .tools
        .iter()
        .map(|t| {
            json!({
                "type": "function",
                "function": {
                    "name": t.name,
                    "description": t.description,
                    "parameters": t.parameters,
                },
            })
        })
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tool-call accumulation
// ─────────────────────────────────────────────────────────────────────────────

/// In-progress tool call assembled from streamed fragments.
#[derive(Default)]
struct PendingCall {
    id: String,
    name: String,
    args_buf: String,
}

impl PendingCall {
    fn finish(self) -> ProposedToolCall {
        let args: Map<String, Value> = serde_json::from_str(&self.args_buf).unwrap_or_default();
        ProposedToolCall {
            id: self.id,
            name: self.name,
            args,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Client
// ─────────────────────────────────────────────────────────────────────────────

/// [`ModelClient`] backed by the OpenAI chat-completions API.
pub struct OpenAiClient {
    http: reqwest::Client,
    config: OpenAiConfig,
}

impl OpenAiClient {
    /// Create a client with the given configuration.
    #[must_use]
    pub fn new(config: OpenAiConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    fn headers(&self) -> ModelResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        let _ = headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let value = HeaderValue::from_str(&format!("Bearer {}", self.config.api_key)).map_err(
            |_| ModelError::Auth {
                message: "API key contains invalid header characters".into(),
            },
        )?;
        let _ = headers.insert(AUTHORIZATION, value);
        Ok(headers)
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url)
    }

    async fn check_status(response: reqwest::Response) -> ModelResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| {
                v.get("error")
                    .and_then(|e| e.get("message"))
                    .and_then(Value::as_str)
                    .map(str::to_owned)
            })
            .unwrap_or(body);
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ModelError::Auth { message });
        }
        Err(ModelError::Api {
            status: status.as_u16(),
            message,
            retryable: status == reqwest::StatusCode::TOO_MANY_REQUESTS
                || status.is_server_error(),
        })
    }
}

#[async_trait]
impl ModelClient for OpenAiClient {
    fn model(&self) -> &str {
        &self.config.model
    }

    async fn stream(&self, context: &ModelContext) -> ModelResult<ModelEventStream> {
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: convert_messages(context),
            tools: convert_tools(context),
            stream: true,
        };

        let response = self
            .http
            .post(self.endpoint())
            .headers(self.headers()?)
            .json(&request)
            .send()
            .await?;
        let response = Self::check_status(response).await?;
        debug!(model = %self.config.model, "model stream opened");

        let mut events = response.bytes_stream().eventsource();

        let stream = try_stream! {
            // Tool calls arrive as fragments keyed by index; flush in order.
            let mut pending: Vec<PendingCall> = Vec::new();
            let mut flushed = 0usize;
            let mut finished = false;

            while let Some(event) = events.next().await {
                let event = event.map_err(|e| ModelError::SseParse {
                    message: e.to_string(),
                })?;
                if event.data == "[DONE]" {
                    break;
                }

                let chunk: ChatChunk = serde_json::from_str(&event.data)?;
                let Some(choice) = chunk.choices.into_iter().next() else {
                    continue;
                };

                if let Some(content) = choice.delta.content {
                    if !content.is_empty() {
                        yield ModelEvent::TextDelta { delta: content };
                    }
                }

                if let Some(deltas) = choice.delta.tool_calls {
                    for d in deltas {
                        while pending.len() <= d.index {
                            pending.push(PendingCall::default());
                        }
                        // Starting a later call means earlier ones are complete.
                        while flushed < d.index {
                            let done = std::mem::take(&mut pending[flushed]);
                            yield ModelEvent::ToolCall(done.finish());
                            flushed += 1;
                        }
                        let slot = &mut pending[d.index];
                        if let Some(id) = d.id {
                            slot.id = id;
                        }
                        if let Some(f) = d.function {
                            if let Some(name) = f.name {
                                slot.name = name;
                            }
                            if let Some(args) = f.arguments {
                                slot.args_buf.push_str(&args);
                            }
                        }
                    }
                }

                if let Some(reason) = choice.finish_reason {
                    while flushed < pending.len() {
                        let done = std::mem::take(&mut pending[flushed]);
                        yield ModelEvent::ToolCall(done.finish());
                        flushed += 1;
                    }
                    yield ModelEvent::Done {
                        stop_reason: StopReason::from_finish_reason(&reason),
                    };
                    finished = true;
                    break;
                }
            }

            if !finished {
                // Stream ended without a finish_reason — treat as a clean stop.
                while flushed < pending.len() {
                    let done = std::mem::take(&mut pending[flushed]);
                    yield ModelEvent::ToolCall(done.finish());
                    flushed += 1;
                }
                yield ModelEvent::Done {
                    stop_reason: StopReason::EndTurn,
                };
            }
        };

        Ok(Box::pin(stream))
    }

    async fn complete(&self, prompt: &str) -> ModelResult<String> {
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![json!({"role": "user", "content": prompt})],
            tools: Vec::new(),
            stream: false,
        };

        let response = self
            .http
            .post(self.endpoint())
            .headers(self.headers()?)
            .json(&request)
            .send()
            .await?;
        let response = Self::check_status(response).await?;

        let body: ChatResponse = response.json().await?;
        Ok(body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }
}
