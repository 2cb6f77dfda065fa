//! Stream merger — fans the model event stream into the turn output channel.
//!
//! One consumer loop drains the model stream, forwarding text deltas and
//! tool proposals onto the caller's bounded channel in model order while
//! accumulating the assistant message parts for the log. Cancellation is
//! checked with a biased select so an abort wins over a ready stream event.

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use parley_core::TurnEvent;
use parley_llm::{ModelError, ModelEvent, ModelEventStream, ProposedToolCall, StopReason};

/// Accumulated result of one model stream.
#[derive(Debug, Default)]
pub struct MergedStream {
    /// Concatenated assistant text.
    pub text: String,
    /// Tool calls the model proposed, in stream order.
    pub proposals: Vec<ProposedToolCall>,
    /// Why the model stopped, when the stream completed.
    pub stop_reason: Option<StopReason>,
    /// The caller cancelled (or went away) mid-stream.
    pub interrupted: bool,
    /// The stream failed; partial text and proposals are still populated.
    pub error: Option<ModelError>,
}

impl MergedStream {
    fn interrupted(self) -> Self {
        Self {
            interrupted: true,
            ..self
        }
    }
}

/// Drain one model stream, forwarding events onto `events`.
///
/// A dropped receiver is treated like cancellation: the model stream is
/// abandoned and the partial accumulation returned.
pub async fn merge_stream(
    mut stream: ModelEventStream,
    cancel: &CancellationToken,
    events: &mpsc::Sender<TurnEvent>,
) -> MergedStream {
    let mut merged = MergedStream::default();

    loop {
        // biased: prefer cancellation when both it and a stream event are ready
        let event = tokio::select! {
            biased;
            () = cancel.cancelled() => return merged.interrupted(),
            event = stream.next() => event,
        };

        // The token can fire while the stream poll is in flight; an event
        // received after the abort is dropped, not forwarded.
        if cancel.is_cancelled() {
            return merged.interrupted();
        }

        match event {
            // Stream ended without Done; treat what we have as a complete turn.
            None => {
                merged.stop_reason = Some(StopReason::EndTurn);
                return merged;
            }
            Some(Err(ModelError::Cancelled)) => return merged.interrupted(),
            Some(Err(e)) => {
                merged.error = Some(e);
                return merged;
            }
            Some(Ok(ModelEvent::TextDelta { delta })) => {
                merged.text.push_str(&delta);
                if events.send(TurnEvent::TextDelta { delta }).await.is_err() {
                    return merged.interrupted();
                }
            }
            Some(Ok(ModelEvent::ToolCall(call))) => {
                let forwarded = events
                    .send(TurnEvent::ToolCallProposed {
                        tool_call_id: call.id.as_str().into(),
                        tool_name: call.name.clone(),
                        args: call.args.clone(),
                    })
                    .await;
                merged.proposals.push(call);
                if forwarded.is_err() {
                    return merged.interrupted();
                }
            }
            Some(Ok(ModelEvent::Done { stop_reason })) => {
                merged.stop_reason = Some(stop_reason);
                return merged;
            }
        }
    }
}
