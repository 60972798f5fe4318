//! Session lifecycle: creation, switching, listing and start-up.

use crate::orchestrator::SessionOrchestrator;
use wenshu_core::autofill::{AutofillPhase, restore_autofill};
use wenshu_core::error::Result;
use wenshu_core::session::{Session, SwitchOutcome};
use wenshu_core::upload::ProgressTable;

impl SessionOrchestrator {
    /// Creates a new session and makes it active.
    ///
    /// Autofill mode always ends, even in the middle of a refinement.
    pub async fn create_session(&self) -> Result<Session> {
        let mut state = self.state.write().await;
        state.autofill.end();
        let session = state.registry.create_session().await?.clone();
        Ok(session)
    }

    /// Activates the stored session `session_id` and restores its autofill
    /// state. A session that cannot be loaded is replaced by a new one.
    pub async fn switch_to_session(&self, session_id: &str) -> Result<SwitchOutcome> {
        let mut state = self.state.write().await;
        let outcome = state.registry.switch_to_session(session_id).await?;

        let restored = state
            .registry
            .active()
            .map(restore_autofill)
            .unwrap_or_default();
        match restored.phase() {
            AutofillPhase::Idle => {}
            AutofillPhase::AwaitingContent => {
                tracing::info!("[Autofill] Restored, waiting for content");
            }
            AutofillPhase::Active => {
                tracing::info!(
                    "[Autofill] Restored under {}",
                    restored.correlation_id.as_deref().unwrap_or_default()
                );
            }
        }
        state.autofill = restored;
        Ok(outcome)
    }

    /// Reloads the stored sessions, most recently updated first.
    pub async fn list_sessions(&self) -> Result<Vec<Session>> {
        let mut state = self.state.write().await;
        Ok(state.registry.list_sessions().await?.to_vec())
    }

    /// Loads the session list and the document templates, then activates the
    /// most recent session or creates the first one.
    pub async fn initialize(&self) -> Result<()> {
        if let Err(e) = self.load_document_templates().await {
            tracing::warn!("[Orchestrator] Starting without document templates: {}", e);
        }

        let most_recent = self
            .list_sessions()
            .await?
            .first()
            .map(|s| s.id.clone());
        match most_recent {
            Some(session_id) => {
                self.switch_to_session(&session_id).await?;
            }
            None => {
                self.create_session().await?;
            }
        }
        tracing::info!("[Orchestrator] Initialized");
        Ok(())
    }

    /// Leaves no session active. Autofill ends and upload progress is
    /// forgotten.
    pub async fn clear_active_session(&self) {
        let mut state = self.state.write().await;
        state.registry.clear_active();
        state.autofill.end();
        state.progress = ProgressTable::new();
    }

    /// Refreshes the cached document templates. A failure keeps the
    /// previous cache.
    pub async fn load_document_templates(&self) -> Result<()> {
        let templates = self.documents.document_templates().await?;
        tracing::info!("[Orchestrator] Loaded {} document templates", templates.len());
        self.state.write().await.templates = templates;
        Ok(())
    }
}
