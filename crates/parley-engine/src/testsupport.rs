//! Scripted model client shared by the engine tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_stream::stream;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value};

use parley_llm::{
    ModelClient, ModelContext, ModelError, ModelEvent, ModelEventStream, ModelResult,
    ProposedToolCall, StopReason,
};

/// Install a test subscriber so `RUST_LOG` surfaces engine traces during
/// a test run. Safe to call from every test; only the first wins.
pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// One scripted model response.
pub(crate) enum Script {
    /// Yield these events, then end.
    Events(Vec<ModelEvent>),
    /// Yield these events, then fail mid-stream.
    FailMidStream(Vec<ModelEvent>),
    /// Fail before any stream is produced.
    FailRequest,
}

impl Script {
    /// A plain text response.
    pub(crate) fn text(text: &str) -> Self {
        Self::Events(vec![
            ModelEvent::TextDelta { delta: text.into() },
            ModelEvent::Done {
                stop_reason: StopReason::EndTurn,
            },
        ])
    }

    /// A response proposing one tool call.
    pub(crate) fn tool_call(id: &str, name: &str, args: Map<String, Value>) -> Self {
        Self::Events(vec![
            ModelEvent::ToolCall(ProposedToolCall {
                id: id.into(),
                name: name.into(),
                args,
            }),
            ModelEvent::Done {
                stop_reason: StopReason::ToolCalls,
            },
        ])
    }
}

/// A `ModelClient` that replays scripted responses in order.
#[derive(Default)]
pub(crate) struct StubModel {
    scripts: Mutex<VecDeque<Script>>,
    contexts: Mutex<Vec<ModelContext>>,
    completion: Option<String>,
    fail_completion: bool,
    completions: AtomicUsize,
    last_prompt: Mutex<Option<String>>,
}

impl StubModel {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Queue one scripted turn response.
    pub(crate) fn with_turn(self, script: Script) -> Self {
        self.scripts.lock().push_back(script);
        self
    }

    /// Set the canned `complete` response.
    pub(crate) fn with_completion(mut self, text: &str) -> Self {
        self.completion = Some(text.into());
        self
    }

    /// Make `complete` fail.
    pub(crate) fn with_failing_completion(mut self) -> Self {
        self.fail_completion = true;
        self
    }

    /// How many times `complete` ran.
    pub(crate) fn completions(&self) -> usize {
        self.completions.load(Ordering::SeqCst)
    }

    /// The prompt passed to the most recent `complete` call.
    pub(crate) fn last_completion_prompt(&self) -> Option<String> {
        self.last_prompt.lock().clone()
    }

    /// Contexts passed to `stream`, in call order.
    pub(crate) fn contexts(&self) -> Vec<ModelContext> {
        self.contexts.lock().clone()
    }
}

#[async_trait]
impl ModelClient for StubModel {
    fn model(&self) -> &str {
        "stub-model"
    }

    async fn stream(&self, context: &ModelContext) -> ModelResult<ModelEventStream> {
        self.contexts.lock().push(context.clone());
        let script = self.scripts.lock().pop_front();
        match script {
            None => Ok(Box::pin(stream! {
                yield Ok(ModelEvent::Done { stop_reason: StopReason::EndTurn });
            })),
            Some(Script::Events(events)) => Ok(Box::pin(stream! {
                for e in events {
                    yield Ok(e);
                }
            })),
            Some(Script::FailMidStream(events)) => Ok(Box::pin(stream! {
                for e in events {
                    yield Ok(e);
                }
                yield Err(ModelError::Api {
                    status: 500,
                    message: "scripted failure".into(),
                    retryable: false,
                });
            })),
            Some(Script::FailRequest) => Err(ModelError::Api {
                status: 500,
                message: "scripted request failure".into(),
                retryable: false,
            }),
        }
    }

    async fn complete(&self, prompt: &str) -> ModelResult<String> {
        let _ = self.completions.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock() = Some(prompt.to_owned());
        if self.fail_completion {
            return Err(ModelError::Api {
                status: 500,
                message: "scripted completion failure".into(),
                retryable: false,
            });
        }
        Ok(self.completion.clone().unwrap_or_default())
    }
}
