//! WenshuApiClient - HTTP implementation of the transport traits.
//!
//! Talks to the Wenshu backend: streaming chat over SSE, document upload and
//! confirmation, and the autofill endpoints.

use crate::sse::decode_event_stream;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use wenshu_core::config::OrchestratorConfig;
use wenshu_core::error::{Result, WenshuError};
use wenshu_core::transport::{
    AutofillRefineResponse, AutofillStartResponse, AutofillTransport, ChatTransport,
    DocumentTemplate, DocumentTransport, EventStream, HistoryTurn, ProgressSender,
};
use wenshu_core::upload::{ConfirmRequest, ConfirmResponse, DocumentFile, UploadReceipt};

/// Upload bodies are streamed in chunks of this size; one progress tick per chunk.
const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

/// Client for the Wenshu backend.
#[derive(Clone)]
pub struct WenshuApiClient {
    client: Client,
    base_url: String,
}

impl WenshuApiClient {
    /// Creates a client for the backend at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    /// Creates a client reusing an existing `reqwest::Client`.
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn from_config(config: &OrchestratorConfig) -> Self {
        Self::new(config.api_base_url.clone())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl ChatTransport for WenshuApiClient {
    async fn open_exchange(&self, query: &str, history: Vec<HistoryTurn>) -> Result<EventStream> {
        let chat_history = serde_json::to_string(&history)?;
        tracing::debug!(
            "[ApiClient] Opening chat exchange ({} prior turns)",
            history.len()
        );

        let response = self
            .client
            .post(self.endpoint("/chat"))
            .form(&[("query", query), ("chat_history", chat_history.as_str())])
            .send()
            .await
            .map_err(transport_error)?;
        let response = check_status(response).await?;

        Ok(decode_event_stream(response.bytes_stream()))
    }
}

#[async_trait]
impl DocumentTransport for WenshuApiClient {
    async fn upload_document(
        &self,
        file: &DocumentFile,
        progress: ProgressSender,
    ) -> Result<UploadReceipt> {
        let length = file.size();
        let body = progress_body(file.bytes.clone(), progress);
        let part = Part::stream_with_length(body, length)
            .file_name(file.name.clone())
            .mime_str(&file.mime_type)
            .map_err(transport_error)?;

        tracing::info!("[ApiClient] Uploading {} ({} bytes)", file.name, length);
        let response = self
            .client
            .post(self.endpoint("/upload_document"))
            .multipart(Form::new().part("file", part))
            .send()
            .await
            .map_err(transport_error)?;

        read_json(response).await
    }

    async fn confirm_document(&self, request: ConfirmRequest) -> Result<ConfirmResponse> {
        let metadata = serde_json::to_string(&request.metadata)?;
        let response = self
            .client
            .post(self.endpoint("/confirm_document"))
            .form(&[
                ("file_id", request.file_id.as_str()),
                ("metadata", metadata.as_str()),
                ("filename", request.filename.as_str()),
            ])
            .send()
            .await
            .map_err(transport_error)?;

        read_json(response).await
    }

    async fn document_templates(&self) -> Result<Vec<DocumentTemplate>> {
        let response = self
            .client
            .get(self.endpoint("/document_templates"))
            .send()
            .await
            .map_err(transport_error)?;

        let listing: TemplateListing = read_json(response).await?;
        Ok(listing.into_templates())
    }
}

#[async_trait]
impl AutofillTransport for WenshuApiClient {
    async fn start(
        &self,
        template: &DocumentFile,
        content_files: &[DocumentFile],
    ) -> Result<AutofillStartResponse> {
        let mut form = Form::new().part("template_file", file_part(template)?);
        for content in content_files {
            form = form.part("content_files", file_part(content)?);
        }

        tracing::info!("[ApiClient] Starting autofill with template {}", template.name);
        let response = self
            .client
            .post(self.endpoint("/autofill/start"))
            .multipart(form)
            .send()
            .await
            .map_err(transport_error)?;

        read_json(response).await
    }

    async fn start_from_file(
        &self,
        template: &DocumentFile,
        content: &DocumentFile,
    ) -> Result<AutofillStartResponse> {
        let started = self.start(template, &[]).await?;

        let form = Form::new()
            .text("session_id", started.session_id.clone())
            .part("content_file", file_part(content)?);
        let response = self
            .client
            .post(self.endpoint("/autofill/refine_from_file"))
            .multipart(form)
            .send()
            .await
            .map_err(transport_error)?;
        let refined: AutofillRefineResponse = read_json(response).await?;

        Ok(AutofillStartResponse {
            session_id: refined.session_id,
            message: refined.message,
            preview: Some(refined.preview),
        })
    }

    async fn refine(&self, correlation_id: &str, feedback: &str) -> Result<AutofillRefineResponse> {
        let response = self
            .client
            .post(self.endpoint("/autofill/refine"))
            .json(&RefineRequest {
                session_id: correlation_id,
                feedback,
            })
            .send()
            .await
            .map_err(transport_error)?;

        read_json(response).await
    }

    async fn download(&self, correlation_id: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(self.endpoint(&format!("/autofill/download/{}", correlation_id)))
            .send()
            .await
            .map_err(transport_error)?;
        let response = check_status(response).await?;

        let bytes = response.bytes().await.map_err(transport_error)?;
        Ok(bytes.to_vec())
    }
}

#[derive(Serialize)]
struct RefineRequest<'a> {
    session_id: &'a str,
    feedback: &'a str,
}

/// `GET /document_templates` response body.
#[derive(Debug, Deserialize)]
struct TemplateListing {
    #[serde(default)]
    templates: serde_json::Map<String, Value>,
    #[serde(default)]
    available_types: Vec<String>,
}

impl TemplateListing {
    /// Templates in `available_types` order, then any the listing omitted.
    fn into_templates(mut self) -> Vec<DocumentTemplate> {
        let mut out = Vec::with_capacity(self.templates.len());
        for document_type in self.available_types {
            let schema = self.templates.remove(&document_type).unwrap_or(Value::Null);
            out.push(DocumentTemplate {
                document_type,
                schema,
            });
        }
        out.extend(
            self.templates
                .into_iter()
                .map(|(document_type, schema)| DocumentTemplate {
                    document_type,
                    schema,
                }),
        );
        out
    }
}

/// Error body FastAPI-style backends send with non-2xx responses.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Value,
}

fn transport_error(err: reqwest::Error) -> WenshuError {
    WenshuError::transport(err.to_string())
}

/// Maps a non-2xx response to `WenshuError::Remote` carrying the server's reason.
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Failed to read error body".to_string());
    let detail = error_detail(&body_text)
        .unwrap_or_else(|| format!("{} {}", status.as_u16(), status.canonical_reason().unwrap_or("")));
    tracing::warn!("[ApiClient] Request failed with {}: {}", status, detail);
    Err(WenshuError::remote(status.as_u16(), detail.trim().to_string()))
}

fn error_detail(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    match parsed.detail {
        Value::String(s) => Some(s),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(response: Response) -> Result<T> {
    let response = check_status(response).await?;
    response
        .json()
        .await
        .map_err(|e| WenshuError::protocol(format!("Failed to parse response: {}", e)))
}

fn file_part(file: &DocumentFile) -> Result<Part> {
    Part::bytes(file.bytes.clone())
        .file_name(file.name.clone())
        .mime_str(&file.mime_type)
        .map_err(transport_error)
}

/// Streams `bytes` as a request body, reporting the share sent so far.
fn progress_body(bytes: Vec<u8>, progress: ProgressSender) -> reqwest::Body {
    let total = bytes.len();
    let data = Bytes::from(bytes);
    let chunks: Vec<Bytes> = (0..total)
        .step_by(UPLOAD_CHUNK_SIZE)
        .map(|start| data.slice(start..(start + UPLOAD_CHUNK_SIZE).min(total)))
        .collect();

    let mut sent = 0;
    let body = stream::iter(chunks).map(move |chunk| {
        sent += chunk.len();
        // The receiver may be gone once the caller stops tracking this upload.
        let _ = progress.send(upload_percent(sent, total));
        Ok::<Bytes, std::io::Error>(chunk)
    });
    reqwest::Body::wrap_stream(body)
}

fn upload_percent(sent: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((sent.min(total) * 100) / total) as u8
}
