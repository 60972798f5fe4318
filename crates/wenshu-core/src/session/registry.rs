//! Session registry: the session list and the single active session.

use super::model::Session;
use super::repository::SessionRepository;
use crate::error::Result;
use std::sync::Arc;

/// How `switch_to_session` ended up populating the active slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchOutcome {
    /// The requested session was fetched and is now active.
    Loaded,
    /// The requested session could not be fetched; a fresh one was created.
    CreatedFallback,
}

/// Holds the ordered session list and the single active session.
///
/// `SessionRegistry` is responsible for:
/// - Creating new sessions (inserted at the front of the list)
/// - Switching the active session by fetching it from storage
/// - Listing sessions by most recent update
/// - Persisting the active session
///
/// Autofill mode is layered above the registry by the orchestrator; the
/// registry itself knows nothing about modes.
pub struct SessionRegistry {
    /// Persistent storage backend for session data
    repository: Arc<dyn SessionRepository>,
    /// Known sessions, most recently created or listed first
    sessions: Vec<Session>,
    /// The session every operation targets
    active: Option<Session>,
    default_title: String,
}

impl SessionRegistry {
    pub fn new(repository: Arc<dyn SessionRepository>, default_title: impl Into<String>) -> Self {
        Self {
            repository,
            sessions: Vec::new(),
            active: None,
            default_title: default_title.into(),
        }
    }

    pub fn active(&self) -> Option<&Session> {
        self.active.as_ref()
    }

    pub fn active_mut(&mut self) -> Option<&mut Session> {
        self.active.as_mut()
    }

    /// The cached session list as of the last create/list call.
    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    /// Allocates a new session, stores it, puts it at the front of the list
    /// and makes it active.
    ///
    /// # Errors
    ///
    /// Propagates a failure from the repository; in that case the registry is
    /// left untouched.
    pub async fn create_session(&mut self) -> Result<&Session> {
        let session = Session::new(self.default_title.clone());
        self.repository.save(&session).await?;

        tracing::info!("[Registry] Created session {}", session.id);
        self.sessions.retain(|s| s.id != session.id);
        self.sessions.insert(0, session.clone());
        Ok(self.active.insert(session))
    }

    /// Replaces the active session wholesale with the stored copy of `session_id`.
    ///
    /// A session that cannot be fetched (missing or a storage failure) is not
    /// reported; a fresh session is created and activated instead.
    ///
    /// # Errors
    ///
    /// Only fails when creating the fallback session fails.
    pub async fn switch_to_session(&mut self, session_id: &str) -> Result<SwitchOutcome> {
        match self.repository.find_by_id(session_id).await {
            Ok(Some(session)) => {
                tracing::info!("[Registry] Switched to session {}", session_id);
                self.remember(&session);
                self.active = Some(session);
                Ok(SwitchOutcome::Loaded)
            }
            Ok(None) => {
                tracing::warn!(
                    "[Registry] Session {} not found, creating a new one",
                    session_id
                );
                self.create_session().await?;
                Ok(SwitchOutcome::CreatedFallback)
            }
            Err(e) => {
                tracing::warn!(
                    "[Registry] Failed to load session {}: {}; creating a new one",
                    session_id,
                    e
                );
                self.create_session().await?;
                Ok(SwitchOutcome::CreatedFallback)
            }
        }
    }

    /// Reloads the session list from storage, most recently updated first.
    pub async fn list_sessions(&mut self) -> Result<&[Session]> {
        let mut sessions = self.repository.list_all().await?;
        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        self.sessions = sessions;
        Ok(&self.sessions)
    }

    /// Makes an already-loaded session active without a round trip to storage.
    pub fn activate(&mut self, session: Session) {
        self.remember(&session);
        self.active = Some(session);
    }

    pub fn clear_active(&mut self) {
        self.active = None;
    }

    /// Bumps the active session's update time and returns a snapshot of it
    /// together with the repository it belongs in.
    ///
    /// The write itself is left to the caller so it can happen outside any
    /// lock guarding the registry. Report a successful write back through
    /// [`record_saved`](Self::record_saved). Returns `None` when there is no
    /// active session.
    pub fn prepare_save(&mut self) -> Option<(Session, Arc<dyn SessionRepository>)> {
        let session = self.active.as_mut()?;
        session.touch();
        Some((session.clone(), self.repository.clone()))
    }

    /// Updates the session list with a snapshot that reached storage.
    ///
    /// A listed entry that is already newer than `snapshot` is kept.
    pub fn record_saved(&mut self, snapshot: &Session) {
        let newer_listed = self
            .sessions
            .iter()
            .any(|s| s.id == snapshot.id && s.updated_at > snapshot.updated_at);
        if !newer_listed {
            self.remember(snapshot);
        }
    }

    fn remember(&mut self, session: &Session) {
        match self.sessions.iter_mut().find(|s| s.id == session.id) {
            Some(existing) => *existing = session.clone(),
            None => self.sessions.insert(0, session.clone()),
        }
    }
}
