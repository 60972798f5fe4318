//! Autofill workflow: template selection, content dispatch and refinement.

use crate::orchestrator::{SessionOrchestrator, no_active_session};
use wenshu_core::autofill::{AutofillPhase, AutofillPreview, AutofillSession, ContentSource};
use wenshu_core::error::{Result, WenshuError};
use wenshu_core::session::Message;
use wenshu_core::upload::DocumentFile;

/// Status of the assistant message reporting a failed refinement.
pub const REFINE_FAILED_STATUS: &str = "Autofill refinement failed";

impl SessionOrchestrator {
    /// Enters autofill mode for `template` and offers the content sources.
    ///
    /// Any earlier control message is dropped so the transcript carries
    /// exactly one. A previous correlation id is forgotten.
    pub async fn start_autofill_mode(&self, template: DocumentFile) -> Result<()> {
        {
            let mut state = self.state.write().await;
            let title = format!("{}: {}", self.config.autofill_session_title, template.name);
            let session = state.registry.active_mut().ok_or_else(no_active_session)?;

            session.messages.retain(|m| !m.is_autofill_control());
            session.title = title;
            session.push(Message::autofill_control(&template.name));

            tracing::info!("[Autofill] Started with template {}", template.name);
            state.autofill = AutofillSession::start(template);
        }
        self.persist_active().await;
        Ok(())
    }

    /// Supplies the content for the pending fill attempt and shows the first
    /// preview.
    ///
    /// On failure the control message is put back so another source can be
    /// picked, and the error is returned.
    pub async fn provide_autofill_content(&self, source: ContentSource) -> Result<()> {
        let (template, removed_control) = {
            let mut state = self.state.write().await;
            if state.autofill.phase() != AutofillPhase::AwaitingContent {
                return Err(WenshuError::invalid_state(
                    "Autofill is not waiting for content",
                ));
            }
            let Some(template) = state.autofill.template.clone() else {
                return Err(WenshuError::invalid_state(
                    "No autofill template selected, start autofill mode again",
                ));
            };
            let session = state.registry.active_mut().ok_or_else(no_active_session)?;

            let removed = session.remove_first_control();
            match &source {
                ContentSource::Conversational(text) => session.push(Message::user(text.as_str())),
                ContentSource::FromKnowledgeBase(query) => {
                    session.push(Message::user(query.as_str()))
                }
                ContentSource::FromFile(_) => {}
            }
            (template, removed)
        };

        tracing::info!(
            "[Autofill] Dispatching {} content for {}",
            source.kind(),
            template.name
        );
        match self.dispatch_content(&template, source).await {
            Ok((correlation_id, preview)) => {
                {
                    let mut state = self.state.write().await;
                    if state.autofill.phase() == AutofillPhase::AwaitingContent {
                        state.autofill.activate(correlation_id.as_str());
                        if let Some(session) = state.registry.active_mut() {
                            session.push(Message::autofill_preview(correlation_id.as_str(), preview));
                        }
                        tracing::info!("[Autofill] Active under {}", correlation_id);
                    } else {
                        tracing::debug!(
                            "[Autofill] Mode left while {} was starting, dropping preview",
                            correlation_id
                        );
                    }
                }
                self.persist_active().await;
                Ok(())
            }
            Err(e) => {
                tracing::error!("[Autofill] Content dispatch failed: {}", e);
                {
                    let mut state = self.state.write().await;
                    if state.autofill.phase() == AutofillPhase::AwaitingContent {
                        if let (Some(control), Some(session)) =
                            (removed_control, state.registry.active_mut())
                        {
                            session.push(control);
                        }
                    }
                }
                self.persist_active().await;
                Err(e)
            }
        }
    }

    /// Obtains a correlation id and the first preview for `source`.
    async fn dispatch_content(
        &self,
        template: &DocumentFile,
        source: ContentSource,
    ) -> Result<(String, AutofillPreview)> {
        match source {
            ContentSource::FromFile(content) => {
                let started = self.autofill.start_from_file(template, &content).await?;
                let preview = started.preview.ok_or_else(|| {
                    WenshuError::protocol("Autofill start returned no preview")
                })?;
                Ok((started.session_id, preview))
            }
            ContentSource::Conversational(text) => {
                let started = self.autofill.start(template, &[]).await?;
                let refined = self.autofill.refine(&started.session_id, &text).await?;
                Ok((started.session_id, refined.preview))
            }
            ContentSource::FromKnowledgeBase(query) => {
                let started = self.autofill.start(template, &[]).await?;
                let answer = self.collect_tokens(&query).await?;
                tracing::debug!(
                    "[Autofill] Knowledge base answered with {} chars",
                    answer.len()
                );
                let refined = self.autofill.refine(&started.session_id, &answer).await?;
                Ok((started.session_id, refined.preview))
            }
        }
    }

    /// Sends `feedback` for the active fill attempt and appends the new
    /// preview. Earlier previews stay in the transcript.
    pub async fn refine_autofill(&self, feedback: &str) -> Result<()> {
        let feedback = feedback.trim();
        if feedback.is_empty() {
            return Ok(());
        }

        let correlation_id = {
            let mut state = self.state.write().await;
            let Some(correlation_id) = state.autofill.correlation_id.clone() else {
                return Err(WenshuError::invalid_state("No autofill session to refine"));
            };
            state
                .registry
                .active_mut()
                .ok_or_else(no_active_session)?
                .push(Message::user(feedback));
            correlation_id
        };

        tracing::info!("[Autofill] Refining {}", correlation_id);
        let result = self.autofill.refine(&correlation_id, feedback).await;

        {
            let mut state = self.state.write().await;
            if state.autofill.correlation_id.as_deref() != Some(correlation_id.as_str()) {
                tracing::debug!(
                    "[Autofill] {} ended during refinement, dropping result",
                    correlation_id
                );
                return result.map(|_| ());
            }
            if let Some(session) = state.registry.active_mut() {
                match &result {
                    Ok(response) => session.push(Message::autofill_preview(
                        correlation_id.as_str(),
                        response.preview.clone(),
                    )),
                    Err(e) => {
                        tracing::error!("[Autofill] Refinement of {} failed: {}", correlation_id, e);
                        let mut failure = Message::assistant(e.to_string());
                        failure.status = Some(REFINE_FAILED_STATUS.to_string());
                        session.push(failure);
                    }
                }
            }
        }

        self.persist_active().await;
        result.map(|_| ())
    }

    /// Leaves autofill mode, clearing the correlation id and template.
    pub async fn end_autofill_mode(&self) {
        {
            let mut state = self.state.write().await;
            if state.autofill.active {
                tracing::info!("[Autofill] Ended");
            }
            state.autofill.end();
        }
        self.persist_active().await;
    }

    /// Fetches the filled document for the current correlation id.
    pub async fn download_autofill_document(&self) -> Result<Vec<u8>> {
        let correlation_id = self
            .state
            .read()
            .await
            .autofill
            .correlation_id
            .clone()
            .ok_or_else(|| WenshuError::invalid_state("No autofill session to download"))?;

        let bytes = self.autofill.download(&correlation_id).await?;
        tracing::info!(
            "[Autofill] Downloaded {} bytes for {}",
            bytes.len(),
            correlation_id
        );
        Ok(bytes)
    }
}
