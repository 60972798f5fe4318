//! Transport collaborator traits.
//!
//! The orchestrator talks to the backend only through these traits. The HTTP
//! implementation lives in `wenshu-interaction`; tests use scripted mocks.

use crate::autofill::AutofillPreview;
use crate::error::Result;
use crate::session::MessageRole;
use crate::stream::{StreamEvent, StreamFault};
use crate::upload::{ConfirmRequest, ConfirmResponse, DocumentFile, UploadReceipt};
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

/// One prior turn sent along with a chat query, stripped of UI-only fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryTurn {
    pub role: MessageRole,
    pub content: String,
}

/// The events of one exchange, in delivery order. The stream ending is the
/// close signal; a `StreamFault::Transport` item means the connection dropped.
pub type EventStream = BoxStream<'static, std::result::Result<StreamEvent, StreamFault>>;

/// Receives upload progress ticks (0-100).
pub type ProgressSender = mpsc::UnboundedSender<u8>;

/// A document type the backend knows how to extract, with its metadata schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentTemplate {
    pub document_type: String,
    #[serde(default)]
    pub schema: Value,
}

/// Response of the autofill start operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutofillStartResponse {
    pub session_id: String,
    #[serde(default)]
    pub message: String,
    /// Present when the start was seeded with content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<AutofillPreview>,
}

/// Response of a refine operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutofillRefineResponse {
    pub session_id: String,
    #[serde(default)]
    pub message: String,
    pub preview: AutofillPreview,
}

/// Opens streaming chat exchanges.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Starts an exchange for `query` with the given prior turns.
    ///
    /// An `Err` means the exchange could not be opened at all.
    async fn open_exchange(&self, query: &str, history: Vec<HistoryTurn>) -> Result<EventStream>;
}

/// Uploads and confirms documents for the knowledge base.
#[async_trait]
pub trait DocumentTransport: Send + Sync {
    /// Uploads `file`, sending progress ticks to `progress` as bytes go out.
    async fn upload_document(
        &self,
        file: &DocumentFile,
        progress: ProgressSender,
    ) -> Result<UploadReceipt>;

    async fn confirm_document(&self, request: ConfirmRequest) -> Result<ConfirmResponse>;

    /// Lists the document types the backend can extract.
    async fn document_templates(&self) -> Result<Vec<DocumentTemplate>>;
}

/// Drives the remote autofill engine.
#[async_trait]
pub trait AutofillTransport: Send + Sync {
    /// Opens a fill attempt for `template`.
    async fn start(
        &self,
        template: &DocumentFile,
        content_files: &[DocumentFile],
    ) -> Result<AutofillStartResponse>;

    /// Opens a fill attempt seeded with a content document. The response
    /// carries the first preview.
    async fn start_from_file(
        &self,
        template: &DocumentFile,
        content: &DocumentFile,
    ) -> Result<AutofillStartResponse>;

    async fn refine(&self, correlation_id: &str, feedback: &str) -> Result<AutofillRefineResponse>;

    /// The filled document as bytes.
    async fn download(&self, correlation_id: &str) -> Result<Vec<u8>>;
}
