//! Turn runner — one user turn: drain, stream, tools, loop, events.
//!
//! A turn settles leftover confirmations, appends the user message, then
//! loops model call / tool execution up to the step ceiling. Auto tools run
//! inside the loop and feed their results back to the model; a confirmation-
//! required call ends the turn with `pending_confirmation` set, to be picked
//! up by the drain at the start of the next turn.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use parley_core::{
    Input, InvocationState, Message, Part, Role, SessionId, ToolInvocation, ToolOutcome, TurnEvent,
};
use parley_llm::{ModelClient, ModelContext};
use parley_tools::{ToolContext, ToolRegistry};

use crate::config::EngineConfig;
use crate::coordinator;
use crate::errors::EngineError;
use crate::merger;
use crate::store::MessageStore;

/// Run one turn for a submitted user message.
///
/// Output flows through `events`; the channel closing is the end-of-turn
/// signal. Exactly one [`TurnEvent::Done`] is sent unless the turn is cut
/// short by cancellation.
#[allow(clippy::too_many_arguments)]
#[instrument(skip_all, fields(session_id = %session_id, model = model.model()))]
pub async fn run_turn(
    store: &mut MessageStore,
    config: &EngineConfig,
    model: &dyn ModelClient,
    registry: &ToolRegistry,
    session_id: &SessionId,
    text: String,
    events: &mpsc::Sender<TurnEvent>,
    cancel: &CancellationToken,
) -> Result<(), EngineError> {
    coordinator::drain_pending(store, registry, session_id, cancel, events).await;

    store.append(Message::user(text))?;

    let mut pending_confirmation = false;

    for step in 1..=config.max_steps {
        if cancel.is_cancelled() {
            debug!(step, "turn cancelled before model call");
            return Ok(());
        }

        let context = ModelContext {
            system_prompt: Some(config.full_system_prompt()),
            messages: store.read_all(),
            tools: registry.schemas(),
        };

        let stream = match model.stream(&context).await {
            Ok(s) => s,
            Err(e) => {
                warn!(step, error = %e, "model request failed");
                let _ = events
                    .send(TurnEvent::TurnFailed {
                        error: e.to_string(),
                        category: e.category().to_owned(),
                    })
                    .await;
                let _ = events
                    .send(TurnEvent::Done {
                        pending_confirmation: false,
                    })
                    .await;
                return Ok(());
            }
        };

        let merged = merger::merge_stream(stream, cancel, events).await;

        if merged.interrupted {
            // Keep partial text; the channel closes without a Done.
            if !merged.text.is_empty() {
                store.append(Message::assistant(merged.text))?;
            }
            debug!(step, "turn interrupted");
            return Ok(());
        }

        if let Some(e) = merged.error {
            if !merged.text.is_empty() {
                store.append(Message::assistant(merged.text))?;
            }
            warn!(step, error = %e, "model stream failed");
            let _ = events
                .send(TurnEvent::TurnFailed {
                    error: e.to_string(),
                    category: e.category().to_owned(),
                })
                .await;
            let _ = events
                .send(TurnEvent::Done {
                    pending_confirmation: false,
                })
                .await;
            return Ok(());
        }

        // Assemble the assistant message: text, then invocations in
        // proposal order, classified against the registry.
        let had_proposals = !merged.proposals.is_empty();
        let mut parts = Vec::with_capacity(merged.proposals.len() + 1);
        if !merged.text.is_empty() {
            parts.push(Part::text(merged.text));
        }
        let mut auto_calls = Vec::new();
        for proposal in merged.proposals {
            let mut invocation =
                ToolInvocation::proposed(proposal.id.as_str(), proposal.name, proposal.args);
            if coordinator::classify(registry, &mut invocation) {
                pending_confirmation = true;
                let _ = events
                    .send(TurnEvent::ToolAwaitingConfirmation {
                        tool_call_id: invocation.tool_call_id.clone(),
                        tool_name: invocation.tool_name.clone(),
                    })
                    .await;
            } else {
                auto_calls.push(invocation.tool_call_id.clone());
            }
            parts.push(Part::ToolInvocation(invocation));
        }

        if parts.is_empty() {
            break;
        }
        let message = Message::new(Role::Assistant, parts);
        let message_id = message.id.clone();
        store.append(message)?;

        // Execute auto tools in proposal order, feeding results back.
        for tool_call_id in auto_calls {
            if cancel.is_cancelled() {
                return Ok(());
            }
            let Some((_, invocation)) = store.find_invocation_mut(&tool_call_id) else {
                continue;
            };
            if invocation.state != InvocationState::Proposed {
                continue;
            }
            let tool_name = invocation.tool_name.clone();
            let args = invocation.args.clone();
            let _ = invocation.apply(Input::BeginExecution);

            let _ = events
                .send(TurnEvent::ToolExecutionStart {
                    tool_call_id: tool_call_id.clone(),
                    tool_name: tool_name.clone(),
                })
                .await;

            let ctx = ToolContext {
                tool_call_id: tool_call_id.to_string(),
                session_id: session_id.to_string(),
                cancellation: cancel.clone(),
            };
            let Some(outcome) =
                coordinator::execute_tool(registry, &tool_name, args, ctx, cancel).await
            else {
                // Detached execution; the stream closes now, without a Done.
                let _ = store.attach_tool_result(
                    &message_id,
                    &tool_call_id,
                    ToolOutcome::error("Tool execution cancelled"),
                );
                debug!(step, "turn cancelled during tool execution");
                return Ok(());
            };

            store.attach_tool_result(&message_id, &tool_call_id, outcome.clone())?;
            let _ = events
                .send(TurnEvent::ToolResult {
                    tool_call_id,
                    outcome,
                })
                .await;
        }

        if !had_proposals || pending_confirmation {
            break;
        }
        // Tool results are in the log; loop for the model's next step.
    }

    info!(
        messages = store.len(),
        pending_confirmation, "turn completed"
    );
    let _ = events
        .send(TurnEvent::Done {
            pending_confirmation,
        })
        .await;
    Ok(())
}
