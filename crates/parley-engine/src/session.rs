//! Per-session actor.
//!
//! Each session is driven by one task owning all of its state; commands
//! arrive on a mailbox and run to completion in arrival order, so every
//! mutation of a session is serialized without locks. A turn occupies the
//! actor for its full duration, which is what queues a second turn behind
//! a running one.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use parley_core::{Resolution, SessionId, ToolCallId, TurnEvent};
use parley_llm::ModelClient;
use parley_tools::ToolRegistry;

use crate::config::EngineConfig;
use crate::coordinator;
use crate::errors::EngineError;
use crate::gate::{GateDecision, SessionGate};
use crate::schedule;
use crate::store::MessageStore;
use crate::titler;
use crate::turn;

/// Mailbox depth per session.
pub(crate) const COMMAND_BUFFER: usize = 32;

/// Commands a session actor accepts.
pub(crate) enum Command {
    Connect {
        caller: String,
        reply: oneshot::Sender<Result<(), EngineError>>,
    },
    SubmitTurn {
        caller: String,
        text: String,
        events: mpsc::Sender<TurnEvent>,
        cancel: CancellationToken,
        reply: oneshot::Sender<Result<(), EngineError>>,
    },
    Resolve {
        caller: String,
        tool_call_id: ToolCallId,
        resolution: Resolution,
        reply: oneshot::Sender<Result<(), EngineError>>,
    },
    GetTitle {
        caller: String,
        reply: oneshot::Sender<Result<String, EngineError>>,
    },
    RunScheduledTask {
        description: String,
        reply: oneshot::Sender<Result<(), EngineError>>,
    },
    SetTitle {
        title: String,
    },
}

/// Everything one session owns.
struct SessionState {
    owner: Option<String>,
    title: Option<String>,
    store: MessageStore,
}

struct SessionActor {
    session_id: SessionId,
    config: Arc<EngineConfig>,
    model: Arc<dyn ModelClient>,
    registry: Arc<ToolRegistry>,
    gate: SessionGate,
    state: SessionState,
    commands: mpsc::Receiver<Command>,
    // weak so the actor stops once every external handle is gone
    self_tx: mpsc::WeakSender<Command>,
}

/// Spawn a session actor, returning its mailbox.
pub(crate) fn spawn(
    session_id: SessionId,
    config: Arc<EngineConfig>,
    model: Arc<dyn ModelClient>,
    registry: Arc<ToolRegistry>,
) -> mpsc::Sender<Command> {
    let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
    let actor = SessionActor {
        gate: SessionGate::new(config.owner_policy),
        session_id,
        config,
        model,
        registry,
        state: SessionState {
            owner: None,
            title: None,
            store: MessageStore::new(),
        },
        commands: rx,
        self_tx: tx.downgrade(),
    };
    let _ = tokio::spawn(actor.run());
    tx
}

impl SessionActor {
    async fn run(mut self) {
        debug!(session_id = %self.session_id, "session actor started");
        while let Some(command) = self.commands.recv().await {
            self.handle(command).await;
        }
        debug!(session_id = %self.session_id, "session actor stopped");
    }

    /// Gate one caller-facing command, claiming ownership when the policy
    /// allows it. Ownership never changes once recorded.
    fn authorize(&mut self, caller: &str) -> Result<(), EngineError> {
        match self.gate.authorize(self.state.owner.as_deref(), caller) {
            GateDecision::Allow => Ok(()),
            GateDecision::Claim => {
                info!(session_id = %self.session_id, owner = caller, "session owner claimed");
                self.state.owner = Some(caller.to_owned());
                Ok(())
            }
            GateDecision::Deny => {
                warn!(session_id = %self.session_id, caller, "caller denied");
                Err(EngineError::Forbidden)
            }
        }
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::Connect { caller, reply } => {
                let _ = reply.send(self.authorize(&caller));
            }

            Command::SubmitTurn {
                caller,
                text,
                events,
                cancel,
                reply,
            } => {
                if let Err(e) = self.authorize(&caller) {
                    let _ = reply.send(Err(e));
                    return;
                }
                // Ack before running so the caller holds its handle while
                // the turn streams.
                let _ = reply.send(Ok(()));

                let result = turn::run_turn(
                    &mut self.state.store,
                    &self.config,
                    self.model.as_ref(),
                    &self.registry,
                    &self.session_id,
                    text,
                    &events,
                    &cancel,
                )
                .await;
                if let Err(e) = result {
                    error!(session_id = %self.session_id, error = %e, "turn failed internally");
                }
                drop(events);

                self.spawn_title_refresh();
            }

            Command::Resolve {
                caller,
                tool_call_id,
                resolution,
                reply,
            } => match self.authorize(&caller) {
                Err(e) => {
                    let _ = reply.send(Err(e));
                }
                Ok(()) => {
                    let _ = coordinator::resolve(&mut self.state.store, &tool_call_id, resolution);
                    let _ = reply.send(Ok(()));
                }
            },

            Command::GetTitle { caller, reply } => {
                let result = self.authorize(&caller).map(|()| {
                    self.state
                        .title
                        .clone()
                        .unwrap_or_else(|| titler::DEFAULT_TITLE.to_owned())
                });
                let _ = reply.send(result);
            }

            Command::RunScheduledTask { description, reply } => {
                info!(session_id = %self.session_id, description, "scheduled task fired");
                let result = self
                    .state
                    .store
                    .append(schedule::scheduled_task_message(&description));
                let _ = reply.send(result);
            }

            Command::SetTitle { title } => {
                self.state.title = Some(title);
            }
        }
    }

    /// Regenerate the title off the actor task; the result loops back as a
    /// `SetTitle` command. A failure leaves the previous title in place.
    fn spawn_title_refresh(&self) {
        if !titler::in_window(self.state.store.len()) {
            return;
        }
        let messages = self.state.store.read_all();
        let model = Arc::clone(&self.model);
        let mailbox = self.self_tx.clone();
        let _ = tokio::spawn(async move {
            if let Some(title) = titler::generate(model.as_ref(), &messages).await {
                if let Some(tx) = mailbox.upgrade() {
                    let _ = tx.send(Command::SetTitle { title }).await;
                }
            }
        });
    }
}
