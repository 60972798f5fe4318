//! Upload lifecycle types.

use crate::session::Message;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Position of one file in the upload/confirm lifecycle.
///
/// `Uploading -> Uploaded -> Confirming -> Confirmed`, with `Error` reachable
/// from `Uploading` and `Confirming`. `Error` is terminal; a retry starts a
/// new lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    Uploading,
    Uploaded,
    Confirming,
    Confirmed,
    Error,
}

impl UploadStatus {
    pub fn display_text(&self) -> &'static str {
        match self {
            UploadStatus::Uploading => "Uploading...",
            UploadStatus::Uploaded => "Awaiting confirmation",
            UploadStatus::Confirming => "Processing...",
            UploadStatus::Confirmed => "Added to knowledge base",
            UploadStatus::Error => "Upload failed",
        }
    }

    /// Whether the lifecycle allows moving from `self` to `next`.
    pub fn can_transition_to(&self, next: UploadStatus) -> bool {
        use UploadStatus::*;
        matches!(
            (self, next),
            (Uploading, Uploaded)
                | (Uploading, Error)
                | (Uploaded, Confirming)
                | (Confirming, Confirmed)
                | (Confirming, Error)
        )
    }

    /// Strictly between start and a terminal state.
    pub fn is_in_progress(&self) -> bool {
        matches!(self, UploadStatus::Uploading | UploadStatus::Confirming)
    }
}

/// A file picked by the caller, held in memory for the duration of one upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl DocumentFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Builds a file whose MIME type is guessed from its extension.
    pub fn from_name(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        let mime_type = super::validation::mime_type_from_extension(&name);
        Self {
            name,
            mime_type,
            bytes,
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// File metadata kept on the upload message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    /// Server-issued id, present once the upload succeeded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,
    pub filename: String,
    pub mime_type: String,
    pub size: u64,
}

/// What the backend extracted from an uploaded document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedDocument {
    pub document_type: String,
    #[serde(default)]
    pub metadata: Value,
    #[serde(default)]
    pub schema: Value,
    #[serde(default)]
    pub content_preview: String,
}

/// Upload sub-state embedded in a transcript message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadState {
    pub status: UploadStatus,
    pub file: FileInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted: Option<ExtractedDocument>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UploadState {
    pub fn file_id(&self) -> Option<&str> {
        self.file.file_id.as_deref()
    }
}

/// Successful response of the upload operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub file_id: String,
    pub filename: String,
    pub document_type: String,
    #[serde(default)]
    pub metadata: Value,
    #[serde(default)]
    pub schema: Value,
    #[serde(default)]
    pub content_preview: String,
}

/// Input of the confirm operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmRequest {
    pub file_id: String,
    pub metadata: Value,
    pub filename: String,
}

/// Output of the confirm operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmResponse {
    pub status: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub validated_metadata: Value,
    #[serde(default)]
    pub document_type: Option<String>,
    #[serde(default)]
    pub nodes_added: Option<u64>,
}

impl ConfirmResponse {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

impl Message {
    /// A fresh user message announcing an upload in progress.
    pub fn upload_pending(file: &DocumentFile) -> Self {
        let mut message = Message::user(format!("Uploading {}", file.name));
        message.upload = Some(UploadState {
            status: UploadStatus::Uploading,
            file: FileInfo {
                file_id: None,
                filename: file.name.clone(),
                mime_type: file.mime_type.clone(),
                size: file.size(),
            },
            extracted: None,
            error: None,
        });
        message
    }

    /// A new value of this upload message after a lifecycle change.
    ///
    /// Returns a fresh `Message` rather than mutating so observers comparing
    /// by value see the change. `receipt` fills in the file id and extracted
    /// document; `error` records a failure reason.
    pub fn with_upload_status(
        &self,
        status: UploadStatus,
        receipt: Option<&UploadReceipt>,
        error: Option<String>,
    ) -> Self {
        let mut next = self.clone();
        let Some(upload) = next.upload.as_mut() else {
            return next;
        };

        upload.status = status;
        upload.error = error;
        if let Some(receipt) = receipt {
            upload.file.file_id = Some(receipt.file_id.clone());
            upload.extracted = Some(ExtractedDocument {
                document_type: receipt.document_type.clone(),
                metadata: receipt.metadata.clone(),
                schema: receipt.schema.clone(),
                content_preview: receipt.content_preview.clone(),
            });
        }

        next.content = match (status, upload.extracted.as_ref()) {
            (UploadStatus::Uploaded, Some(doc)) => format!(
                "{} ({}): {}",
                upload.file.filename, doc.document_type, doc.content_preview
            ),
            (UploadStatus::Error, _) => format!(
                "{}: {}",
                upload.file.filename,
                upload.error.as_deref().unwrap_or(status.display_text())
            ),
            _ => format!("{}: {}", upload.file.filename, status.display_text()),
        };
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn receipt() -> UploadReceipt {
        UploadReceipt {
            file_id: "123".into(),
            filename: "f.pdf".into(),
            document_type: "contract".into(),
            metadata: json!({"party": "ACME"}),
            schema: json!({}),
            content_preview: "This agreement...".into(),
        }
    }

    #[test]
    fn lifecycle_transitions() {
        use UploadStatus::*;
        assert!(Uploading.can_transition_to(Uploaded));
        assert!(Uploading.can_transition_to(Error));
        assert!(Confirming.can_transition_to(Error));
        assert!(!Uploaded.can_transition_to(Error));
        assert!(!Error.can_transition_to(Uploading));
        assert!(!Confirmed.can_transition_to(Confirming));
    }

    #[test]
    fn success_produces_new_value_with_file_id() {
        let file = DocumentFile::new("f.pdf", "application/pdf", vec![1, 2, 3]);
        let pending = Message::upload_pending(&file);
        let uploaded = pending.with_upload_status(UploadStatus::Uploaded, Some(&receipt()), None);

        assert_eq!(pending.upload.as_ref().unwrap().status, UploadStatus::Uploading);
        let upload = uploaded.upload.as_ref().unwrap();
        assert_eq!(upload.status, UploadStatus::Uploaded);
        assert_eq!(upload.file_id(), Some("123"));
        assert_eq!(upload.extracted.as_ref().unwrap().document_type, "contract");
        assert_eq!(uploaded.id, pending.id);
        assert!(uploaded.content.contains("This agreement..."));
    }

    #[test]
    fn failure_records_reason() {
        let file = DocumentFile::new("f.pdf", "application/pdf", vec![]);
        let failed = Message::upload_pending(&file).with_upload_status(
            UploadStatus::Error,
            None,
            Some("unsupported layout".into()),
        );
        let upload = failed.upload.as_ref().unwrap();
        assert_eq!(upload.error.as_deref(), Some("unsupported layout"));
        assert_eq!(failed.content, "f.pdf: unsupported layout");
    }

    #[test]
    fn confirm_response_success_flag() {
        let response: ConfirmResponse = serde_json::from_value(json!({
            "status": "success",
            "message": "ok",
            "nodes_added": 4,
            "validated_metadata": {},
            "document_type": "contract"
        }))
        .unwrap();
        assert!(response.is_success());
        assert_eq!(response.nodes_added, Some(4));
    }
}
