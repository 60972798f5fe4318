//! Scripted transport mocks and a harness wiring them to an orchestrator.

use crate::orchestrator::SessionOrchestrator;
use async_trait::async_trait;
use futures::StreamExt;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use wenshu_core::autofill::AutofillPreview;
use wenshu_core::config::OrchestratorConfig;
use wenshu_core::error::{Result, WenshuError};
use wenshu_core::session::{Message, Session, SessionRepository};
use wenshu_core::stream::{StreamEvent, StreamFault};
use wenshu_core::transport::{
    AutofillRefineResponse, AutofillStartResponse, AutofillTransport, ChatTransport,
    DocumentTemplate, DocumentTransport, EventStream, HistoryTurn, ProgressSender,
};
use wenshu_core::upload::{ConfirmRequest, ConfirmResponse, DocumentFile, UploadReceipt};
use wenshu_infrastructure::InMemorySessionRepository;

type Script = Vec<std::result::Result<StreamEvent, StreamFault>>;

// ============================================================================
// Chat
// ============================================================================

#[derive(Default)]
struct ChatScript {
    scripts: VecDeque<Script>,
    open_error: Option<WenshuError>,
    calls: Vec<(String, Vec<HistoryTurn>)>,
}

/// Replays one scripted event list per opened exchange.
#[derive(Clone, Default)]
pub(crate) struct ScriptedChat {
    inner: Arc<Mutex<ChatScript>>,
}

impl ScriptedChat {
    pub(crate) fn with_scripts(scripts: Vec<Script>) -> Self {
        let chat = Self::default();
        chat.inner.lock().unwrap().scripts = scripts.into();
        chat
    }

    pub(crate) fn failing_open(error: WenshuError) -> Self {
        let chat = Self::default();
        chat.inner.lock().unwrap().open_error = Some(error);
        chat
    }

    /// Query and history of every opened exchange, in order.
    pub(crate) fn calls(&self) -> Vec<(String, Vec<HistoryTurn>)> {
        self.inner.lock().unwrap().calls.clone()
    }
}

#[async_trait]
impl ChatTransport for ScriptedChat {
    async fn open_exchange(&self, query: &str, history: Vec<HistoryTurn>) -> Result<EventStream> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push((query.to_string(), history));
        if let Some(error) = inner.open_error.take() {
            return Err(error);
        }
        let script = inner.scripts.pop_front().unwrap_or_default();
        Ok(futures::stream::iter(script).boxed())
    }
}

// ============================================================================
// Documents
// ============================================================================

#[derive(Default)]
struct DocumentScript {
    uploads: VecDeque<Result<UploadReceipt>>,
    confirms: VecDeque<Result<ConfirmResponse>>,
    templates: Option<Vec<DocumentTemplate>>,
    uploaded: Vec<String>,
    confirmed: Vec<ConfirmRequest>,
    ticks: Vec<u8>,
    gate: Option<Arc<Notify>>,
}

/// Upload/confirm transport answering from queues.
///
/// A gated instance sends its progress ticks and then blocks every upload
/// until the gate is notified.
#[derive(Clone, Default)]
pub(crate) struct MockDocuments {
    inner: Arc<Mutex<DocumentScript>>,
}

impl MockDocuments {
    pub(crate) fn gated(gate: Arc<Notify>, ticks: Vec<u8>) -> Self {
        let documents = Self::default();
        {
            let mut inner = documents.inner.lock().unwrap();
            inner.gate = Some(gate);
            inner.ticks = ticks;
        }
        documents
    }

    pub(crate) fn push_upload(&self, result: Result<UploadReceipt>) {
        self.inner.lock().unwrap().uploads.push_back(result);
    }

    pub(crate) fn push_confirm(&self, result: Result<ConfirmResponse>) {
        self.inner.lock().unwrap().confirms.push_back(result);
    }

    /// `None` makes the template listing fail.
    pub(crate) fn set_templates(&self, templates: Option<Vec<DocumentTemplate>>) {
        self.inner.lock().unwrap().templates = templates;
    }

    pub(crate) fn uploaded_names(&self) -> Vec<String> {
        self.inner.lock().unwrap().uploaded.clone()
    }

    pub(crate) fn confirm_calls(&self) -> usize {
        self.inner.lock().unwrap().confirmed.len()
    }

    pub(crate) fn last_confirm(&self) -> Option<ConfirmRequest> {
        self.inner.lock().unwrap().confirmed.last().cloned()
    }
}

#[async_trait]
impl DocumentTransport for MockDocuments {
    async fn upload_document(
        &self,
        file: &DocumentFile,
        progress: ProgressSender,
    ) -> Result<UploadReceipt> {
        let (ticks, gate) = {
            let mut inner = self.inner.lock().unwrap();
            inner.uploaded.push(file.name.clone());
            (inner.ticks.clone(), inner.gate.clone())
        };
        for tick in ticks {
            let _ = progress.send(tick);
        }
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.inner
            .lock()
            .unwrap()
            .uploads
            .pop_front()
            .unwrap_or_else(|| Err(WenshuError::internal("no scripted upload")))
    }

    async fn confirm_document(&self, request: ConfirmRequest) -> Result<ConfirmResponse> {
        let mut inner = self.inner.lock().unwrap();
        inner.confirmed.push(request);
        inner
            .confirms
            .pop_front()
            .unwrap_or_else(|| Err(WenshuError::internal("no scripted confirmation")))
    }

    async fn document_templates(&self) -> Result<Vec<DocumentTemplate>> {
        self.inner
            .lock()
            .unwrap()
            .templates
            .clone()
            .ok_or_else(|| WenshuError::transport("templates unavailable"))
    }
}

// ============================================================================
// Autofill
// ============================================================================

#[derive(Default)]
struct AutofillScript {
    starts: VecDeque<Result<AutofillStartResponse>>,
    file_starts: VecDeque<Result<AutofillStartResponse>>,
    refines: VecDeque<Result<AutofillRefineResponse>>,
    download: Option<Vec<u8>>,
    log: Vec<String>,
}

/// Autofill transport answering from queues and logging every call as
/// `operation:argument[:argument]`.
#[derive(Clone, Default)]
pub(crate) struct MockAutofill {
    inner: Arc<Mutex<AutofillScript>>,
}

impl MockAutofill {
    pub(crate) fn push_start(&self, result: Result<AutofillStartResponse>) {
        self.inner.lock().unwrap().starts.push_back(result);
    }

    pub(crate) fn push_start_from_file(&self, result: Result<AutofillStartResponse>) {
        self.inner.lock().unwrap().file_starts.push_back(result);
    }

    pub(crate) fn push_refine(&self, result: Result<AutofillRefineResponse>) {
        self.inner.lock().unwrap().refines.push_back(result);
    }

    pub(crate) fn set_download(&self, bytes: Vec<u8>) {
        self.inner.lock().unwrap().download = Some(bytes);
    }

    pub(crate) fn log(&self) -> Vec<String> {
        self.inner.lock().unwrap().log.clone()
    }
}

#[async_trait]
impl AutofillTransport for MockAutofill {
    async fn start(
        &self,
        template: &DocumentFile,
        _content_files: &[DocumentFile],
    ) -> Result<AutofillStartResponse> {
        let mut inner = self.inner.lock().unwrap();
        inner.log.push(format!("start:{}", template.name));
        inner
            .starts
            .pop_front()
            .unwrap_or_else(|| Err(WenshuError::internal("no scripted start")))
    }

    async fn start_from_file(
        &self,
        template: &DocumentFile,
        content: &DocumentFile,
    ) -> Result<AutofillStartResponse> {
        let mut inner = self.inner.lock().unwrap();
        inner
            .log
            .push(format!("start_from_file:{}:{}", template.name, content.name));
        inner
            .file_starts
            .pop_front()
            .unwrap_or_else(|| Err(WenshuError::internal("no scripted start")))
    }

    async fn refine(&self, correlation_id: &str, feedback: &str) -> Result<AutofillRefineResponse> {
        let mut inner = self.inner.lock().unwrap();
        inner.log.push(format!("refine:{}:{}", correlation_id, feedback));
        inner
            .refines
            .pop_front()
            .unwrap_or_else(|| Err(WenshuError::internal("no scripted refine")))
    }

    async fn download(&self, correlation_id: &str) -> Result<Vec<u8>> {
        let mut inner = self.inner.lock().unwrap();
        inner.log.push(format!("download:{}", correlation_id));
        inner
            .download
            .clone()
            .ok_or_else(|| WenshuError::not_found("AutofillDocument", correlation_id))
    }
}

// ============================================================================
// Fixtures
// ============================================================================

pub(crate) fn receipt(file_id: &str) -> UploadReceipt {
    UploadReceipt {
        file_id: file_id.to_string(),
        filename: "f.pdf".to_string(),
        document_type: "contract".to_string(),
        metadata: serde_json::json!({"party": "ACME"}),
        schema: serde_json::json!({}),
        content_preview: "This agreement...".to_string(),
    }
}

pub(crate) fn confirm_response(status: &str, message: &str) -> ConfirmResponse {
    ConfirmResponse {
        status: status.to_string(),
        message: message.to_string(),
        validated_metadata: serde_json::json!({}),
        document_type: Some("contract".to_string()),
        nodes_added: Some(3),
    }
}

pub(crate) fn preview(summary: &str) -> AutofillPreview {
    AutofillPreview {
        filling_instructions: Vec::new(),
        summary: summary.to_string(),
    }
}

pub(crate) fn started(correlation_id: &str, preview: Option<AutofillPreview>) -> AutofillStartResponse {
    AutofillStartResponse {
        session_id: correlation_id.to_string(),
        message: "started".to_string(),
        preview,
    }
}

pub(crate) fn refined(correlation_id: &str, summary: &str) -> AutofillRefineResponse {
    AutofillRefineResponse {
        session_id: correlation_id.to_string(),
        message: "refined".to_string(),
        preview: preview(summary),
    }
}

pub(crate) fn template_file() -> DocumentFile {
    DocumentFile::new(
        "form.docx",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        vec![1, 2, 3],
    )
}

// ============================================================================
// Harness
// ============================================================================

pub(crate) struct Harness {
    pub(crate) orchestrator: SessionOrchestrator,
    pub(crate) repository: Arc<InMemorySessionRepository>,
}

impl Harness {
    /// An orchestrator without an active session.
    pub(crate) fn unstarted(
        chat: ScriptedChat,
        documents: MockDocuments,
        autofill: MockAutofill,
    ) -> Self {
        let repository = Arc::new(InMemorySessionRepository::new());
        let config = OrchestratorConfig {
            retry_settle_delay_ms: 5,
            ..Default::default()
        };
        let orchestrator = SessionOrchestrator::new(
            repository.clone(),
            Arc::new(chat),
            Arc::new(documents),
            Arc::new(autofill),
            config,
        );
        Self {
            orchestrator,
            repository,
        }
    }

    /// An orchestrator with a freshly created active session.
    pub(crate) async fn build(
        chat: ScriptedChat,
        documents: MockDocuments,
        autofill: MockAutofill,
    ) -> Self {
        let harness = Self::unstarted(chat, documents, autofill);
        harness.orchestrator.create_session().await.unwrap();
        harness
    }

    pub(crate) async fn with_chat(chat: ScriptedChat) -> Self {
        Self::build(chat, MockDocuments::default(), MockAutofill::default()).await
    }

    pub(crate) async fn with_documents(documents: MockDocuments) -> Self {
        Self::build(ScriptedChat::default(), documents, MockAutofill::default()).await
    }

    pub(crate) async fn with_autofill(autofill: MockAutofill) -> Self {
        Self::build(ScriptedChat::default(), MockDocuments::default(), autofill).await
    }

    pub(crate) async fn last_message(&self) -> Message {
        let session = self.orchestrator.active_session().await.unwrap();
        session.messages.last().cloned().unwrap()
    }

    pub(crate) async fn message(&self, message_id: &str) -> Option<Message> {
        self.orchestrator
            .active_session()
            .await
            .and_then(|s| s.message(message_id).cloned())
    }

    pub(crate) async fn stored_session(&self, session_id: &str) -> Session {
        self.repository.find_by_id(session_id).await.unwrap().unwrap()
    }

    /// Yields until the first upload message shows up in the active session.
    pub(crate) async fn wait_for_upload_message(&self) -> String {
        for _ in 0..1000 {
            if let Some(session) = self.orchestrator.active_session().await {
                if let Some(message) = session.messages.iter().find(|m| m.upload.is_some()) {
                    return message.id.clone();
                }
            }
            tokio::task::yield_now().await;
        }
        panic!("upload message never appeared");
    }

    /// Yields until the progress entry of `message_id` reads `percent`.
    pub(crate) async fn wait_for_progress(&self, message_id: &str, percent: u8) {
        for _ in 0..1000 {
            if self.orchestrator.upload_progress(message_id).await == Some(percent) {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("progress never reached {}", percent);
    }
}
