//! Folds stream events into the pending assistant message.
//!
//! The functions here are pure with respect to I/O: the application layer
//! owns the exchange loop and the loading flag, and calls [`apply_event`]
//! once per delivered event, in delivery order.

use super::event::StreamEvent;
use crate::session::{Message, Step, StepKind, StepStatus};

/// What applying one event did to the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// The message was updated; keep consuming.
    Applied,
    /// Nothing changed (unknown type, unmatched end); keep consuming.
    Ignored,
    /// An in-band error ended the exchange.
    Terminated,
}

/// Applies one event to `message`.
///
/// The transient status ("Thinking...") is dropped by the first event that
/// changes the message. Ignored events leave it in place.
pub fn apply_event(message: &mut Message, event: StreamEvent) -> EventOutcome {
    let outcome = match event {
        StreamEvent::Token(text) => {
            message.content.push_str(&text);
            EventOutcome::Applied
        }
        StreamEvent::ToolCallStart {
            call_id,
            tool_name,
            arguments,
        } => {
            message
                .steps
                .push(Step::tool_call(call_id, tool_name, arguments));
            EventOutcome::Applied
        }
        StreamEvent::ToolCallEnd { call_id, result } => {
            match find_running_step(&mut message.steps, call_id.as_deref()) {
                Some(step) => {
                    step.finish(result);
                    EventOutcome::Applied
                }
                None => {
                    tracing::debug!(
                        "[Stream] tool_call_end without a running step (call_id: {:?})",
                        call_id
                    );
                    EventOutcome::Ignored
                }
            }
        }
        StreamEvent::Thought(content) => {
            message.steps.push(Step::thought(content));
            EventOutcome::Applied
        }
        StreamEvent::RetrievedDocuments(documents) => {
            message.document_results = Some(documents);
            EventOutcome::Applied
        }
        StreamEvent::Sources(sources) => {
            message.sources = Some(sources);
            EventOutcome::Applied
        }
        StreamEvent::Error(detail) => {
            message.status = Some(format!("Error: {}", detail));
            message.content.clear();
            EventOutcome::Terminated
        }
        StreamEvent::Unknown(kind) => {
            tracing::debug!("[Stream] Ignoring event of unknown type '{}'", kind);
            EventOutcome::Ignored
        }
    };

    if outcome == EventOutcome::Applied {
        message.status = None;
    }
    outcome
}

/// Records a connection failure that happened before the stream closed.
///
/// Unlike an in-band error, accumulated content is kept.
pub fn apply_transport_failure(message: &mut Message, reason: &str) {
    message.status = Some(format!("Connection failed: {}", reason));
}

/// The running tool call an end event refers to.
///
/// A matching `call_id` wins; otherwise the most recently opened running call
/// is closed.
fn find_running_step<'a>(steps: &'a mut [Step], call_id: Option<&str>) -> Option<&'a mut Step> {
    let is_running_call =
        |s: &Step| s.kind() == StepKind::ToolCall && s.status == StepStatus::Running;

    let by_id = call_id.and_then(|id| {
        steps
            .iter()
            .rposition(|s| is_running_call(s) && s.call_id() == Some(id))
    });
    let index = by_id.or_else(|| steps.iter().rposition(is_running_call))?;
    steps.get_mut(index)
}
