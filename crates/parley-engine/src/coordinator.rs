//! Tool call coordination — classification, human decisions, and execution.
//!
//! Every invocation the model proposes passes through [`classify`], which
//! routes confirmation-required tools to `AwaitingConfirmation`. Decisions
//! arrive through [`resolve`]; approved calls run on the next turn via
//! [`drain_pending`], rejected calls settle immediately with the declined
//! sentinel and never execute.

use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use parley_core::{
    Input, InvocationState, Resolution, SessionId, ToolCallId, ToolInvocation, ToolOutcome,
    Transition, TurnEvent,
};
use parley_tools::{ToolContext, ToolRegistry};

use crate::store::MessageStore;

/// Result of applying a human decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolved {
    /// The decision advanced the invocation to this state.
    Applied(InvocationState),
    /// Unknown ID or already-decided invocation; nothing changed.
    Noop,
}

/// Classify a freshly proposed invocation against the registry.
///
/// Returns `true` when the tool requires confirmation and the invocation
/// is now awaiting one; `false` leaves it eligible for direct execution.
pub fn classify(registry: &ToolRegistry, invocation: &mut ToolInvocation) -> bool {
    if registry.requires_confirmation(&invocation.tool_name) {
        let _ = invocation.apply(Input::RequireConfirmation);
        true
    } else {
        false
    }
}

/// Apply a human decision to an invocation in the log.
///
/// Unknown IDs and invocations that are not awaiting a decision are
/// idempotent no-ops; the owner may click twice, or a stale client may
/// resolve a call that already settled. Rejection attaches the declined
/// sentinel immediately so the invocation never executes.
pub fn resolve(
    store: &mut MessageStore,
    tool_call_id: &ToolCallId,
    resolution: Resolution,
) -> Resolved {
    let Some((_, invocation)) = store.find_invocation_mut(tool_call_id) else {
        debug!(tool_call_id = %tool_call_id, "resolve for unknown invocation ignored");
        return Resolved::Noop;
    };
    match invocation.apply(Input::Resolve(resolution)) {
        Transition::Advanced(InvocationState::Rejected) => {
            let _ = invocation.attach(ToolOutcome::declined());
            Resolved::Applied(InvocationState::Rejected)
        }
        Transition::Advanced(state) => Resolved::Applied(state),
        Transition::Idempotent | Transition::Invalid => {
            debug!(tool_call_id = %tool_call_id, "resolve for settled invocation ignored");
            Resolved::Noop
        }
    }
}

/// Settle everything left over from previous turns before a new model call.
///
/// Invocations still awaiting confirmation when a new turn starts are
/// declined; the log must hold only settled invocations before it is
/// converted into model context. Approved invocations execute here, in
/// log order.
pub async fn drain_pending(
    store: &mut MessageStore,
    registry: &ToolRegistry,
    session_id: &SessionId,
    cancel: &CancellationToken,
    events: &mpsc::Sender<TurnEvent>,
) {
    for (_, tool_call_id) in store.awaiting_confirmation() {
        let Some((_, invocation)) = store.find_invocation_mut(&tool_call_id) else {
            continue;
        };
        warn!(
            session_id = %session_id,
            tool_call_id = %tool_call_id,
            "unresolved confirmation at turn start, declining"
        );
        let _ = invocation.apply(Input::Resolve(Resolution::Rejected));
        let _ = invocation.attach(ToolOutcome::declined());
        let _ = events
            .send(TurnEvent::ToolResult {
                tool_call_id,
                outcome: ToolOutcome::declined(),
            })
            .await;
    }

    for (message_id, tool_call_id) in store.unsettled_resolved() {
        if cancel.is_cancelled() {
            break;
        }
        let Some((_, invocation)) = store.find_invocation_mut(&tool_call_id) else {
            continue;
        };
        match invocation.state {
            InvocationState::Confirmed => {
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
                let Some(outcome) = execute_tool(registry, &tool_name, args, ctx, cancel).await
                else {
                    let _ = store.attach_tool_result(
                        &message_id,
                        &tool_call_id,
                        ToolOutcome::error("Tool execution cancelled"),
                    );
                    return;
                };

                if store
                    .attach_tool_result(&message_id, &tool_call_id, outcome.clone())
                    .is_ok()
                {
                    let _ = events
                        .send(TurnEvent::ToolResult {
                            tool_call_id,
                            outcome,
                        })
                        .await;
                }
            }
            InvocationState::Rejected => {
                let _ = invocation.attach(ToolOutcome::declined());
                let _ = events
                    .send(TurnEvent::ToolResult {
                        tool_call_id,
                        outcome: ToolOutcome::declined(),
                    })
                    .await;
            }
            _ => {}
        }
    }
}

/// Run one tool, capturing every failure as an error-flagged outcome.
///
/// Tool failures feed back to the model as results; they are never fatal to
/// the session. Execution races against `cancel`: on abort the in-flight
/// call is detached to finish on its own and `None` is returned without
/// awaiting the result.
pub async fn execute_tool(
    registry: &ToolRegistry,
    tool_name: &str,
    args: Map<String, Value>,
    ctx: ToolContext,
    cancel: &CancellationToken,
) -> Option<ToolOutcome> {
    let Some(tool) = registry.get(tool_name) else {
        warn!(tool_name, "unknown tool");
        return Some(ToolOutcome::error(format!("Unknown tool: {tool_name}")));
    };
    debug!(tool_name, tool_call_id = %ctx.tool_call_id, "executing tool");
    let name = tool_name.to_owned();
    let task = tokio::spawn(async move { tool.execute(&args, &ctx).await });
    tokio::select! {
        biased;
        () = cancel.cancelled() => {
            warn!(tool_name = %name, "turn cancelled mid-execution, detaching tool task");
            None
        }
        joined = task => Some(match joined {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                warn!(tool_name = %name, error = %e, "tool execution failed");
                ToolOutcome::error(e.to_string())
            }
            Err(e) => {
                warn!(tool_name = %name, error = %e, "tool task aborted");
                ToolOutcome::error(format!("Tool task failed: {e}"))
            }
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use assert_matches::assert_matches;
    use serde_json::Map;

    use parley_core::{Message, Part, Role};
    use parley_tools::testutil::{registry_of, ScriptedTool};

    use super::*;

    fn registry() -> ToolRegistry {
        registry_of(vec![
            Arc::new(ScriptedTool::ok("get_local_time", "14:32")),
            Arc::new(ScriptedTool::ok("get_weather", "72F and sunny").confirmed()),
        ])
    }

    fn append_invocation(store: &mut MessageStore, registry: &ToolRegistry, id: &str, name: &str) {
        let mut inv = ToolInvocation::proposed(id, name, Map::new());
        let _ = classify(registry, &mut inv);
        store
            .append(Message::new(Role::Assistant, vec![Part::ToolInvocation(inv)]))
            .unwrap();
    }

    fn events() -> (mpsc::Sender<TurnEvent>, mpsc::Receiver<TurnEvent>) {
        mpsc::channel(64)
    }

    // -- classify --

    #[test]
    fn classify_routes_confirmation_required_tools() {
        let registry = registry();
        let mut inv = ToolInvocation::proposed("tc-1", "get_weather", Map::new());
        assert!(classify(&registry, &mut inv));
        assert_eq!(inv.state, InvocationState::AwaitingConfirmation);
    }

    #[test]
    fn classify_leaves_auto_tools_proposed() {
        let registry = registry();
        let mut inv = ToolInvocation::proposed("tc-1", "get_local_time", Map::new());
        assert!(!classify(&registry, &mut inv));
        assert_eq!(inv.state, InvocationState::Proposed);
    }

    #[test]
    fn classify_treats_unknown_tools_as_auto() {
        let registry = registry();
        let mut inv = ToolInvocation::proposed("tc-1", "no_such_tool", Map::new());
        assert!(!classify(&registry, &mut inv));
    }

    // -- resolve --

    #[test]
    fn approval_confirms_without_executing() {
        let registry = registry();
        let mut store = MessageStore::new();
        append_invocation(&mut store, &registry, "tc-1", "get_weather");

        let r = resolve(&mut store, &ToolCallId::from("tc-1"), Resolution::Approved);
        assert_eq!(r, Resolved::Applied(InvocationState::Confirmed));

        let all = store.read_all();
        let inv = all[0].invocations().next().unwrap();
        assert_eq!(inv.state, InvocationState::Confirmed);
        assert!(inv.result.is_none());
    }

    #[test]
    fn rejection_attaches_declined_sentinel_immediately() {
        let registry = registry();
        let mut store = MessageStore::new();
        append_invocation(&mut store, &registry, "tc-1", "get_weather");

        let r = resolve(&mut store, &ToolCallId::from("tc-1"), Resolution::Rejected);
        assert_eq!(r, Resolved::Applied(InvocationState::Rejected));

        let all = store.read_all();
        let inv = all[0].invocations().next().unwrap();
        assert_eq!(inv.state, InvocationState::ResultAttached);
        assert!(inv.result.as_ref().unwrap().is_error);
    }

    #[test]
    fn resolve_unknown_id_is_noop() {
        let mut store = MessageStore::new();
        let r = resolve(&mut store, &ToolCallId::from("tc-404"), Resolution::Approved);
        assert_eq!(r, Resolved::Noop);
    }

    #[test]
    fn second_resolve_is_noop_and_keeps_first_decision() {
        let registry = registry();
        let mut store = MessageStore::new();
        append_invocation(&mut store, &registry, "tc-1", "get_weather");

        let tc = ToolCallId::from("tc-1");
        let _ = resolve(&mut store, &tc, Resolution::Rejected);
        let r = resolve(&mut store, &tc, Resolution::Approved);
        assert_eq!(r, Resolved::Noop);

        let all = store.read_all();
        let inv = all[0].invocations().next().unwrap();
        assert!(inv.result.as_ref().unwrap().is_error);
    }

    // -- drain_pending --

    #[tokio::test]
    async fn drain_executes_approved_invocation() {
        let weather = Arc::new(ScriptedTool::ok("get_weather", "72F and sunny").confirmed());
        let registry = registry_of(vec![weather.clone() as Arc<dyn parley_tools::ParleyTool>]);

        let mut store = MessageStore::new();
        append_invocation(&mut store, &registry, "tc-1", "get_weather");
        let _ = resolve(&mut store, &ToolCallId::from("tc-1"), Resolution::Approved);

        let (tx, mut rx) = events();
        drain_pending(
            &mut store,
            &registry,
            &SessionId::from("s-1"),
            &CancellationToken::new(),
            &tx,
        )
        .await;

        assert_eq!(weather.executions(), 1);
        let all = store.read_all();
        let inv = all[0].invocations().next().unwrap();
        assert_eq!(inv.state, InvocationState::ResultAttached);
        assert_eq!(inv.result.as_ref().unwrap().content, "72F and sunny");

        assert_matches!(rx.try_recv().unwrap(), TurnEvent::ToolExecutionStart { .. });
        assert_matches!(rx.try_recv().unwrap(), TurnEvent::ToolResult { .. });
    }

    #[tokio::test]
    async fn drain_declines_unresolved_confirmations() {
        let weather = Arc::new(ScriptedTool::ok("get_weather", "72F").confirmed());
        let registry = registry_of(vec![weather.clone() as Arc<dyn parley_tools::ParleyTool>]);

        let mut store = MessageStore::new();
        append_invocation(&mut store, &registry, "tc-1", "get_weather");

        let (tx, mut rx) = events();
        drain_pending(
            &mut store,
            &registry,
            &SessionId::from("s-1"),
            &CancellationToken::new(),
            &tx,
        )
        .await;

        assert_eq!(weather.executions(), 0);
        let all = store.read_all();
        let inv = all[0].invocations().next().unwrap();
        assert_eq!(inv.state, InvocationState::ResultAttached);
        assert!(inv.result.as_ref().unwrap().is_error);

        assert_matches!(
            rx.try_recv().unwrap(),
            TurnEvent::ToolResult { outcome, .. } if outcome.is_error
        );
    }

    #[tokio::test]
    async fn drain_captures_tool_failure_as_result() {
        let registry = registry_of(vec![
            Arc::new(ScriptedTool::failing("get_weather", "backend down").confirmed())
                as Arc<dyn parley_tools::ParleyTool>,
        ]);

        let mut store = MessageStore::new();
        append_invocation(&mut store, &registry, "tc-1", "get_weather");
        let _ = resolve(&mut store, &ToolCallId::from("tc-1"), Resolution::Approved);

        let (tx, _rx) = events();
        drain_pending(
            &mut store,
            &registry,
            &SessionId::from("s-1"),
            &CancellationToken::new(),
            &tx,
        )
        .await;

        let all = store.read_all();
        let inv = all[0].invocations().next().unwrap();
        assert_eq!(inv.state, InvocationState::ResultAttached);
        let result = inv.result.as_ref().unwrap();
        assert!(result.is_error);
        assert!(result.content.contains("backend down"));
    }

    #[tokio::test]
    async fn drain_respects_cancellation() {
        let slow = Arc::new(
            ScriptedTool::ok("get_weather", "72F")
                .confirmed()
                .with_delay(Duration::from_millis(1)),
        );
        let registry = registry_of(vec![slow.clone() as Arc<dyn parley_tools::ParleyTool>]);

        let mut store = MessageStore::new();
        append_invocation(&mut store, &registry, "tc-1", "get_weather");
        let _ = resolve(&mut store, &ToolCallId::from("tc-1"), Resolution::Approved);

        let cancel = CancellationToken::new();
        cancel.cancel();

        let (tx, _rx) = events();
        drain_pending(&mut store, &registry, &SessionId::from("s-1"), &cancel, &tx).await;

        assert_eq!(slow.executions(), 0);
    }

    // -- execute_tool --

    #[tokio::test]
    async fn unknown_tool_produces_error_outcome() {
        let registry = registry();
        let ctx = ToolContext {
            tool_call_id: "tc-1".into(),
            session_id: "s-1".into(),
            cancellation: CancellationToken::new(),
        };
        let outcome = execute_tool(
            &registry,
            "no_such_tool",
            Map::new(),
            ctx,
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        assert!(outcome.is_error);
        assert!(outcome.content.contains("Unknown tool"));
    }

    #[tokio::test]
    async fn cancellation_detaches_inflight_execution() {
        let slow = Arc::new(
            ScriptedTool::ok("get_weather", "72F")
                .confirmed()
                .with_delay(Duration::from_secs(5)),
        );
        let registry = registry_of(vec![slow as Arc<dyn parley_tools::ParleyTool>]);

        let cancel = CancellationToken::new();
        let ctx = ToolContext {
            tool_call_id: "tc-1".into(),
            session_id: "s-1".into(),
            cancellation: cancel.clone(),
        };

        let fired = cancel.clone();
        let guard = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            fired.cancel();
        });

        let started = tokio::time::Instant::now();
        let outcome = execute_tool(&registry, "get_weather", Map::new(), ctx, &cancel).await;
        guard.await.unwrap();

        assert!(outcome.is_none());
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
