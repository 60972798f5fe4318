//! The session orchestrator context object.
//!
//! One `SessionOrchestrator` is constructed at application start and owns
//! everything the operations mutate: the session registry, the loading flag,
//! the upload progress table and the autofill state. Operations live in the
//! `*_usecase` modules as `impl SessionOrchestrator` blocks.

use std::sync::Arc;
use tokio::sync::RwLock;
use wenshu_core::autofill::{AutofillPhase, AutofillSession};
use wenshu_core::config::OrchestratorConfig;
use wenshu_core::error::{Result, WenshuError};
use wenshu_core::session::{Session, SessionMode, SessionRegistry, SessionRepository};
use wenshu_core::transport::{AutofillTransport, ChatTransport, DocumentTemplate, DocumentTransport};
use wenshu_core::upload::ProgressTable;
use wenshu_infrastructure::{AsyncDirSessionRepository, ConfigService};
use wenshu_interaction::WenshuApiClient;

/// Mutable state shared by every operation.
pub(crate) struct OrchestratorState {
    pub(crate) registry: SessionRegistry,
    /// Advisory flag set while a plain chat exchange is in flight
    pub(crate) is_loading: bool,
    pub(crate) progress: ProgressTable,
    pub(crate) autofill: AutofillSession,
    pub(crate) templates: Vec<DocumentTemplate>,
}

impl OrchestratorState {
    /// Writes the current autofill state onto the active session's mode.
    fn sync_mode(&mut self) {
        let mode = if self.autofill.active {
            SessionMode::Autofill {
                correlation_id: self.autofill.correlation_id.clone(),
            }
        } else {
            SessionMode::Chat
        };
        if let Some(session) = self.registry.active_mut() {
            session.mode = Some(mode);
        }
    }
}

/// Where `submit_input` sent a piece of free text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputRoute {
    /// Started a streaming chat exchange
    Chat,
    /// Sent as refinement feedback to the active autofill session
    AutofillRefine,
}

/// Coordinates streaming chat, uploads and autofill against the active session.
///
/// Cloning is cheap and every clone shares the same state, so an upload can
/// be cancelled from another task while it is in flight.
#[derive(Clone)]
pub struct SessionOrchestrator {
    pub(crate) state: Arc<RwLock<OrchestratorState>>,
    pub(crate) chat: Arc<dyn ChatTransport>,
    pub(crate) documents: Arc<dyn DocumentTransport>,
    pub(crate) autofill: Arc<dyn AutofillTransport>,
    pub(crate) config: Arc<OrchestratorConfig>,
}

impl SessionOrchestrator {
    pub fn new(
        repository: Arc<dyn SessionRepository>,
        chat: Arc<dyn ChatTransport>,
        documents: Arc<dyn DocumentTransport>,
        autofill: Arc<dyn AutofillTransport>,
        config: OrchestratorConfig,
    ) -> Self {
        let registry = SessionRegistry::new(repository, config.default_session_title.clone());
        Self {
            state: Arc::new(RwLock::new(OrchestratorState {
                registry,
                is_loading: false,
                progress: ProgressTable::new(),
                autofill: AutofillSession::default(),
                templates: Vec::new(),
            })),
            chat,
            documents,
            autofill,
            config: Arc::new(config),
        }
    }

    /// Wires every transport to one HTTP client.
    pub fn with_client(
        repository: Arc<dyn SessionRepository>,
        client: WenshuApiClient,
        config: OrchestratorConfig,
    ) -> Self {
        let client = Arc::new(client);
        Self::new(repository, client.clone(), client.clone(), client, config)
    }

    /// Builds an orchestrator from `config.toml` and the default session
    /// directory, talking HTTP to the configured backend.
    pub async fn from_default_location() -> anyhow::Result<Self> {
        let config = ConfigService::new().get_config();
        let repository = AsyncDirSessionRepository::default_location().await?;
        let client = WenshuApiClient::from_config(&config);
        tracing::info!(
            "[Orchestrator] Using backend {} and sessions in {}",
            client.base_url(),
            repository.sessions_dir().display()
        );
        Ok(Self::with_client(Arc::new(repository), client, config))
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    // ============================================================================
    // Read accessors for the presentation layer
    // ============================================================================

    pub async fn active_session(&self) -> Option<Session> {
        self.state.read().await.registry.active().cloned()
    }

    pub async fn sessions(&self) -> Vec<Session> {
        self.state.read().await.registry.sessions().to_vec()
    }

    pub async fn is_loading(&self) -> bool {
        self.state.read().await.is_loading
    }

    /// Upload progress (0-100) of an in-flight upload message.
    pub async fn upload_progress(&self, message_id: &str) -> Option<u8> {
        self.state.read().await.progress.get(message_id)
    }

    pub async fn is_autofill_mode(&self) -> bool {
        self.state.read().await.autofill.active
    }

    pub async fn is_awaiting_autofill_content(&self) -> bool {
        self.state.read().await.autofill.phase() == AutofillPhase::AwaitingContent
    }

    pub async fn autofill_session_id(&self) -> Option<String> {
        self.state.read().await.autofill.correlation_id.clone()
    }

    pub async fn autofill_phase(&self) -> AutofillPhase {
        self.state.read().await.autofill.phase()
    }

    pub async fn document_templates(&self) -> Vec<DocumentTemplate> {
        self.state.read().await.templates.clone()
    }

    // ============================================================================
    // Input dispatch
    // ============================================================================

    /// Routes free-text input.
    ///
    /// While an autofill session holds a correlation id every input is
    /// refinement feedback; otherwise it starts a chat exchange.
    pub async fn submit_input(&self, input: &str) -> Result<InputRoute> {
        let routes_to_autofill = self.state.read().await.autofill.routes_input();
        if routes_to_autofill {
            self.refine_autofill(input).await?;
            Ok(InputRoute::AutofillRefine)
        } else {
            self.stream_message(input).await?;
            Ok(InputRoute::Chat)
        }
    }

    /// Saves the active session. Failures are logged, never surfaced.
    ///
    /// The state lock is released while the repository writes.
    pub(crate) async fn persist_active(&self) {
        let prepared = {
            let mut state = self.state.write().await;
            state.sync_mode();
            state.registry.prepare_save()
        };
        let Some((snapshot, repository)) = prepared else {
            return;
        };

        if let Err(e) = repository.save(&snapshot).await {
            tracing::warn!("[Orchestrator] Failed to save active session: {}", e);
            return;
        }
        self.state.write().await.registry.record_saved(&snapshot);
    }
}

pub(crate) fn no_active_session() -> WenshuError {
    WenshuError::invalid_state("No active session")
}
