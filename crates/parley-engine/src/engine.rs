//! Engine facade.
//!
//! [`SessionEngine`] owns the map of live sessions and exposes the public
//! operations; each call routes to the target session's actor. Sessions are
//! created lazily by `connect` and `submit_turn`; the other operations
//! require the session to already exist.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use parley_core::{Resolution, SessionId, ToolCallId, TurnEvent};
use parley_llm::ModelClient;
use parley_tools::ToolRegistry;

use crate::config::EngineConfig;
use crate::errors::EngineError;
use crate::session::{self, Command};

/// Buffer for one turn's event stream.
const EVENT_BUFFER: usize = 64;

/// A running turn: the event stream plus an abort handle.
#[derive(Debug)]
pub struct TurnHandle {
    events: mpsc::Receiver<TurnEvent>,
    cancel: CancellationToken,
}

impl TurnHandle {
    /// Next event, or `None` once the turn's stream has closed.
    pub async fn next_event(&mut self) -> Option<TurnEvent> {
        self.events.recv().await
    }

    /// Abort the turn. In-flight tool executions are not awaited; the
    /// stream closes without a `Done`.
    pub fn abort(&self) {
        self.cancel.cancel();
    }

    /// Drain every remaining event.
    pub async fn collect(mut self) -> Vec<TurnEvent> {
        let mut out = Vec::new();
        while let Some(e) = self.next_event().await {
            out.push(e);
        }
        out
    }
}

/// The session engine: per-conversation chat sessions with tool support
/// and human-in-the-loop confirmation.
pub struct SessionEngine {
    config: Arc<EngineConfig>,
    model: Arc<dyn ModelClient>,
    registry: Arc<ToolRegistry>,
    sessions: DashMap<SessionId, mpsc::Sender<Command>>,
}

impl SessionEngine {
    /// Create an engine over the given model and tool registry.
    #[must_use]
    pub fn new(config: EngineConfig, model: Arc<dyn ModelClient>, registry: ToolRegistry) -> Self {
        Self {
            config: Arc::new(config),
            model,
            registry: Arc::new(registry),
            sessions: DashMap::new(),
        }
    }

    /// Number of live sessions.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    fn handle_or_spawn(&self, session_id: &SessionId) -> mpsc::Sender<Command> {
        self.sessions
            .entry(session_id.clone())
            .or_insert_with(|| {
                session::spawn(
                    session_id.clone(),
                    Arc::clone(&self.config),
                    Arc::clone(&self.model),
                    Arc::clone(&self.registry),
                )
            })
            .value()
            .clone()
    }

    fn existing(&self, session_id: &SessionId) -> Result<mpsc::Sender<Command>, EngineError> {
        self.sessions
            .get(session_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| EngineError::SessionNotFound(session_id.to_string()))
    }

    /// Authorize a caller against a session, creating (and under the
    /// claim-on-first-use policy, claiming) it when absent.
    ///
    /// A denied caller receives [`EngineError::Forbidden`]; a transport
    /// should close the connection with
    /// [`POLICY_VIOLATION_CLOSE_CODE`](crate::gate::POLICY_VIOLATION_CLOSE_CODE).
    #[instrument(skip(self), fields(session_id = %session_id))]
    pub async fn connect(&self, session_id: &SessionId, caller: &str) -> Result<(), EngineError> {
        let tx = self.handle_or_spawn(session_id);
        let (reply, rx) = oneshot::channel();
        tx.send(Command::Connect {
            caller: caller.to_owned(),
            reply,
        })
        .await
        .map_err(|_| EngineError::Closed)?;
        rx.await.map_err(|_| EngineError::Closed)?
    }

    /// Submit a user message, starting a turn.
    ///
    /// Returns once the turn is admitted; a turn already running for this
    /// session queues this one behind it. Events stream through the
    /// returned handle.
    #[instrument(skip(self, text), fields(session_id = %session_id))]
    pub async fn submit_turn(
        &self,
        session_id: &SessionId,
        caller: &str,
        text: impl Into<String>,
    ) -> Result<TurnHandle, EngineError> {
        let tx = self.handle_or_spawn(session_id);
        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
        let cancel = CancellationToken::new();
        let (reply, rx) = oneshot::channel();
        tx.send(Command::SubmitTurn {
            caller: caller.to_owned(),
            text: text.into(),
            events: events_tx,
            cancel: cancel.clone(),
            reply,
        })
        .await
        .map_err(|_| EngineError::Closed)?;
        rx.await.map_err(|_| EngineError::Closed)??;
        Ok(TurnHandle {
            events: events_rx,
            cancel,
        })
    }

    /// Record the owner's decision on a tool call awaiting confirmation.
    ///
    /// Idempotent: unknown or already-decided calls are accepted and
    /// ignored. Approved calls execute at the start of the next turn;
    /// rejected calls settle immediately with the declined sentinel.
    #[instrument(skip(self), fields(session_id = %session_id, tool_call_id = %tool_call_id))]
    pub async fn resolve_confirmation(
        &self,
        session_id: &SessionId,
        caller: &str,
        tool_call_id: &ToolCallId,
        approved: bool,
    ) -> Result<(), EngineError> {
        let tx = self.existing(session_id)?;
        let resolution = if approved {
            Resolution::Approved
        } else {
            Resolution::Rejected
        };
        let (reply, rx) = oneshot::channel();
        tx.send(Command::Resolve {
            caller: caller.to_owned(),
            tool_call_id: tool_call_id.clone(),
            resolution,
            reply,
        })
        .await
        .map_err(|_| EngineError::Closed)?;
        rx.await.map_err(|_| EngineError::Closed)?
    }

    /// The session title, falling back to the default for sessions that
    /// have not been summarized yet.
    pub async fn get_title(
        &self,
        session_id: &SessionId,
        caller: &str,
    ) -> Result<String, EngineError> {
        let tx = self.existing(session_id)?;
        let (reply, rx) = oneshot::channel();
        tx.send(Command::GetTitle {
            caller: caller.to_owned(),
            reply,
        })
        .await
        .map_err(|_| EngineError::Closed)?;
        rx.await.map_err(|_| EngineError::Closed)?
    }

    /// Inject a scheduled task as a synthetic user message. The model is
    /// not invoked; the next turn sees the task in its history.
    #[instrument(skip(self), fields(session_id = %session_id))]
    pub async fn run_scheduled_task(
        &self,
        session_id: &SessionId,
        description: &str,
    ) -> Result<(), EngineError> {
        let tx = self.existing(session_id)?;
        let (reply, rx) = oneshot::channel();
        tx.send(Command::RunScheduledTask {
            description: description.to_owned(),
            reply,
        })
        .await
        .map_err(|_| EngineError::Closed)?;
        rx.await.map_err(|_| EngineError::Closed)?
    }
}
