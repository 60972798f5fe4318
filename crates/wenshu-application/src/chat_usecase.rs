//! Streaming chat exchanges.

use crate::orchestrator::{SessionOrchestrator, no_active_session};
use futures::StreamExt;
use wenshu_core::error::{Result, WenshuError};
use wenshu_core::session::Message;
use wenshu_core::stream::{EventOutcome, StreamEvent, StreamFault, apply_event, apply_transport_failure};
use wenshu_core::transport::EventStream;

/// Status shown on the placeholder until the first event arrives.
pub const THINKING_STATUS: &str = "Thinking...";

impl SessionOrchestrator {
    /// Sends `content` as a new chat turn and folds the streamed answer into
    /// a placeholder assistant message.
    ///
    /// Blank input and input arriving while another exchange is loading are
    /// dropped. Stream faults never surface here; they end up as the
    /// placeholder's status.
    pub async fn stream_message(&self, content: &str) -> Result<()> {
        let query = content.trim();
        if query.is_empty() {
            return Ok(());
        }

        let (placeholder_id, history) = {
            let mut state = self.state.write().await;
            if state.is_loading {
                tracing::debug!("[Chat] Exchange already in flight, ignoring input");
                return Ok(());
            }
            let session = state.registry.active_mut().ok_or_else(no_active_session)?;

            let history = session.history();
            session.push(Message::user(query));
            let placeholder = Message::placeholder(THINKING_STATUS);
            let placeholder_id = placeholder.id.clone();
            session.push(placeholder);

            state.is_loading = true;
            (placeholder_id, history)
        };

        tracing::info!("[Chat] Opening exchange for {}", placeholder_id);
        match self.chat.open_exchange(query, history).await {
            Ok(events) => self.consume_exchange(&placeholder_id, events).await,
            Err(e) => {
                tracing::error!("[Chat] Failed to open exchange: {}", e);
                self.fail_exchange(&placeholder_id, &e.to_string()).await;
            }
        }

        self.persist_active().await;
        Ok(())
    }

    /// Applies each event to the placeholder in delivery order until the
    /// stream closes, an in-band error arrives or the connection drops.
    async fn consume_exchange(&self, message_id: &str, mut events: EventStream) {
        while let Some(item) = events.next().await {
            match item {
                Ok(event) => {
                    let kind = event.kind().to_string();
                    let mut state = self.state.write().await;
                    let Some(message) = state
                        .registry
                        .active_mut()
                        .and_then(|s| s.message_mut(message_id))
                    else {
                        tracing::debug!(
                            "[Chat] Message {} is gone, dropping {} event",
                            message_id,
                            kind
                        );
                        continue;
                    };

                    if apply_event(message, event) == EventOutcome::Terminated {
                        state.is_loading = false;
                        tracing::warn!("[Chat] Exchange for {} ended with an error", message_id);
                        return;
                    }
                    tracing::debug!("[Chat] Applied {} to {}", kind, message_id);
                }
                Err(StreamFault::Protocol(reason)) => {
                    tracing::warn!("[Chat] Skipping malformed event: {}", reason);
                }
                Err(StreamFault::Transport(reason)) => {
                    tracing::error!("[Chat] Connection lost: {}", reason);
                    self.fail_exchange(message_id, &reason).await;
                    return;
                }
            }
        }

        self.state.write().await.is_loading = false;
        tracing::info!("[Chat] Exchange for {} closed", message_id);
    }

    async fn fail_exchange(&self, message_id: &str, reason: &str) {
        let mut state = self.state.write().await;
        if let Some(message) = state
            .registry
            .active_mut()
            .and_then(|s| s.message_mut(message_id))
        {
            apply_transport_failure(message, reason);
        }
        state.is_loading = false;
    }

    /// Runs a history-less exchange for `query` and returns the concatenated
    /// tokens. Every other event type is ignored.
    pub(crate) async fn collect_tokens(&self, query: &str) -> Result<String> {
        let mut events = self.chat.open_exchange(query, Vec::new()).await?;
        let mut collected = String::new();

        while let Some(item) = events.next().await {
            match item {
                Ok(StreamEvent::Token(text)) => collected.push_str(&text),
                Ok(other) => {
                    tracing::debug!("[Chat] Ignoring {} while collecting tokens", other.kind());
                }
                Err(StreamFault::Protocol(reason)) => {
                    tracing::warn!("[Chat] Skipping malformed event: {}", reason);
                }
                Err(StreamFault::Transport(reason)) => {
                    return Err(WenshuError::transport(reason));
                }
            }
        }

        Ok(collected)
    }
}
