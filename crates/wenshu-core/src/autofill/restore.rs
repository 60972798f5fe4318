//! Rebuilding autofill state when a stored session is reopened.

use super::model::AutofillSession;
use crate::session::{AutofillMarker, Message, Session, SessionMode};

/// Reconstructs the autofill state of `session`.
///
/// The persisted mode wins when present. Sessions saved without a mode are
/// scanned: the latest preview message makes the session active again under
/// its correlation id, and a lone control message means content was never
/// provided. Returns the idle state when the transcript carries no autofill
/// artifacts. The template itself is never restored.
pub fn restore_autofill(session: &Session) -> AutofillSession {
    match &session.mode {
        Some(SessionMode::Chat) => AutofillSession::default(),
        Some(SessionMode::Autofill {
            correlation_id: Some(id),
        }) => active(id),
        Some(SessionMode::Autofill {
            correlation_id: None,
        }) => match latest_correlation_id(session) {
            Some(id) => active(id),
            None => awaiting(),
        },
        None => scan_transcript(session),
    }
}

/// The mode a transcript implies when none was persisted with it.
pub fn mode_from_transcript(messages: &[Message]) -> SessionMode {
    if let Some(id) = latest_preview_id(messages) {
        return SessionMode::Autofill {
            correlation_id: Some(id.to_string()),
        };
    }
    if messages.iter().any(Message::is_autofill_control) {
        return SessionMode::Autofill {
            correlation_id: None,
        };
    }
    SessionMode::Chat
}

/// Whether the transcript carries any control or preview message.
pub fn has_autofill_artifacts(session: &Session) -> bool {
    session
        .messages
        .iter()
        .any(|m| m.is_autofill_control() || m.is_autofill_preview())
}

fn scan_transcript(session: &Session) -> AutofillSession {
    match mode_from_transcript(&session.messages) {
        SessionMode::Chat => AutofillSession::default(),
        SessionMode::Autofill {
            correlation_id: Some(id),
        } => active(&id),
        SessionMode::Autofill {
            correlation_id: None,
        } => awaiting(),
    }
}

fn latest_correlation_id(session: &Session) -> Option<&str> {
    latest_preview_id(&session.messages)
}

fn latest_preview_id(messages: &[Message]) -> Option<&str> {
    messages.iter().rev().find_map(|m| match &m.autofill {
        Some(AutofillMarker::Preview { correlation_id, .. }) => Some(correlation_id.as_str()),
        _ => None,
    })
}

fn active(correlation_id: &str) -> AutofillSession {
    let mut state = AutofillSession::default();
    state.activate(correlation_id);
    state
}

fn awaiting() -> AutofillSession {
    AutofillSession {
        correlation_id: None,
        template: None,
        active: true,
        awaiting_content: true,
    }
}
