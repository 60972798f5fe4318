//! Document upload and confirmation.

use crate::orchestrator::{SessionOrchestrator, no_active_session};
use serde_json::Value;
use std::time::Duration;
use tokio::sync::mpsc;
use wenshu_core::error::{Result, WenshuError};
use wenshu_core::session::Message;
use wenshu_core::upload::{ConfirmRequest, DocumentFile, UploadStatus, validate_file};

/// Shown when a retried upload needs the file picked again.
pub const RESELECT_FILE_TEXT: &str = "Please select the file again to upload";

impl SessionOrchestrator {
    /// Uploads one file, tracking it as a message of the active session.
    ///
    /// Returns the id of the upload message. The outcome of the upload itself
    /// is reported on that message, not through the return value.
    pub async fn upload_single_file(&self, file: DocumentFile) -> Result<String> {
        let pending = Message::upload_pending(&file);
        let message_id = pending.id.clone();
        {
            let mut state = self.state.write().await;
            state
                .registry
                .active_mut()
                .ok_or_else(no_active_session)?
                .push(pending);
            state.progress.register(message_id.as_str());
        }

        tracing::info!("[Upload] Uploading {} as {}", file.name, message_id);
        let (progress_tx, mut progress_rx) = mpsc::unbounded_channel();
        let mut upload = self.documents.upload_document(&file, progress_tx);

        let result = loop {
            tokio::select! {
                result = &mut upload => break result,
                Some(percent) = progress_rx.recv() => {
                    self.state.write().await.progress.update(&message_id, percent);
                }
            }
        };

        {
            let mut state = self.state.write().await;
            state.progress.remove(&message_id);
            let Some(session) = state.registry.active_mut() else {
                return Ok(message_id);
            };
            let Some(current) = session.message(&message_id) else {
                tracing::debug!("[Upload] {} was removed before the upload finished", message_id);
                return Ok(message_id);
            };
            let still_uploading = current
                .upload
                .as_ref()
                .is_some_and(|u| u.status == UploadStatus::Uploading);
            if !still_uploading {
                tracing::debug!("[Upload] {} moved on, discarding upload result", message_id);
                return Ok(message_id);
            }

            let next = match &result {
                Ok(receipt) => {
                    tracing::info!(
                        "[Upload] {} uploaded as file {} ({})",
                        file.name,
                        receipt.file_id,
                        receipt.document_type
                    );
                    current.with_upload_status(UploadStatus::Uploaded, Some(receipt), None)
                }
                Err(e) => {
                    tracing::error!("[Upload] Upload of {} failed: {}", file.name, e);
                    current.with_upload_status(UploadStatus::Error, None, Some(e.to_string()))
                }
            };
            session.replace_message(&message_id, next);
        }

        self.persist_active().await;
        Ok(message_id)
    }

    /// Uploads `files` one after another.
    ///
    /// Files failing validation become error messages without reaching the
    /// transport. Returns the message id of every file, in order.
    pub async fn upload_files(&self, files: Vec<DocumentFile>) -> Result<Vec<String>> {
        let mut message_ids = Vec::with_capacity(files.len());

        for file in files {
            if let Err(e) = validate_file(&file, &self.config) {
                tracing::warn!("[Upload] Rejected {}: {}", file.name, e);
                let rejected = Message::upload_pending(&file).with_upload_status(
                    UploadStatus::Error,
                    None,
                    Some(e.to_string()),
                );
                message_ids.push(rejected.id.clone());
                self.state
                    .write()
                    .await
                    .registry
                    .active_mut()
                    .ok_or_else(no_active_session)?
                    .push(rejected);
                continue;
            }

            message_ids.push(self.upload_single_file(file).await?);
        }

        self.persist_active().await;
        Ok(message_ids)
    }

    /// Submits the user-reviewed metadata of an uploaded document.
    ///
    /// Does nothing when the message is missing or has no file id yet. On
    /// success an acknowledgement message is appended; on failure the upload
    /// message shows the reason, which is also returned.
    pub async fn confirm_document(&self, message_id: &str, metadata: Value) -> Result<()> {
        let request = {
            let mut state = self.state.write().await;
            let Some(session) = state.registry.active_mut() else {
                return Ok(());
            };
            let Some(message) = session.message(message_id) else {
                return Ok(());
            };
            let Some(upload) = message.upload.as_ref() else {
                return Ok(());
            };
            let Some(file_id) = upload.file_id() else {
                tracing::debug!("[Upload] {} has no file id yet, not confirming", message_id);
                return Ok(());
            };
            if !upload.status.can_transition_to(UploadStatus::Confirming) {
                return Err(WenshuError::invalid_state(format!(
                    "Cannot confirm an upload in state {:?}",
                    upload.status
                )));
            }

            let request = ConfirmRequest {
                file_id: file_id.to_string(),
                metadata,
                filename: upload.file.filename.clone(),
            };
            let next = message.with_upload_status(UploadStatus::Confirming, None, None);
            session.replace_message(message_id, next);
            request
        };

        let filename = request.filename.clone();
        tracing::info!("[Upload] Confirming {} ({})", filename, request.file_id);
        let outcome = match self.documents.confirm_document(request).await {
            Ok(response) if response.is_success() => Ok(response),
            Ok(response) => Err(WenshuError::remote(200, response.message)),
            Err(e) => Err(e),
        };

        {
            let mut state = self.state.write().await;
            if let Some(session) = state.registry.active_mut() {
                if let Some(current) = session.message(message_id) {
                    let next = match &outcome {
                        Ok(_) => current.with_upload_status(UploadStatus::Confirmed, None, None),
                        Err(e) => current.with_upload_status(
                            UploadStatus::Error,
                            None,
                            Some(e.to_string()),
                        ),
                    };
                    session.replace_message(message_id, next);
                    if outcome.is_ok() {
                        session.push(Message::assistant(format!(
                            "Document \"{}\" was added to the knowledge base. You can now ask questions about it.",
                            filename
                        )));
                    }
                } else {
                    tracing::debug!("[Upload] {} was removed before confirmation finished", message_id);
                }
            }
        }
        self.persist_active().await;

        match outcome {
            Ok(response) => {
                tracing::info!(
                    "[Upload] {} confirmed ({} nodes added)",
                    filename,
                    response.nodes_added.unwrap_or(0)
                );
                Ok(())
            }
            Err(e) => {
                tracing::error!("[Upload] Confirmation of {} failed: {}", filename, e);
                Err(e)
            }
        }
    }

    /// Drops an upload message and its progress entry, whatever its state.
    ///
    /// An in-flight transport call is not cancelled; its late result is
    /// discarded when it arrives.
    pub async fn cancel_file_upload(&self, message_id: &str) {
        {
            let mut state = self.state.write().await;
            state.progress.remove(message_id);
            let removed = state
                .registry
                .active_mut()
                .and_then(|s| s.remove_message(message_id));
            if removed.is_some() {
                tracing::info!("[Upload] Cancelled {}", message_id);
            }
        }
        self.persist_active().await;
    }

    /// Resets a failed upload message and then asks for the file again.
    ///
    /// Only uploads in `error` can be retried. File contents are not retained
    /// between attempts, so after a short settle delay the message returns to
    /// `error` with a re-select prompt.
    pub async fn retry_file_upload(&self, message_id: &str) -> Result<()> {
        {
            let mut state = self.state.write().await;
            let session = state.registry.active_mut().ok_or_else(no_active_session)?;
            let Some(message) = session.message(message_id) else {
                return Ok(());
            };
            let Some(upload) = message.upload.as_ref() else {
                return Ok(());
            };
            if upload.status != UploadStatus::Error {
                return Err(WenshuError::invalid_state(format!(
                    "Cannot retry an upload in state {:?}",
                    upload.status
                )));
            }

            let mut next = message.with_upload_status(UploadStatus::Uploading, None, None);
            next.content = format!("Re-uploading file: {}", upload.file.filename);
            session.replace_message(message_id, next);
            state.progress.register(message_id);
        }

        tokio::time::sleep(Duration::from_millis(self.config.retry_settle_delay_ms)).await;

        {
            let mut state = self.state.write().await;
            state.progress.remove(message_id);
            if let Some(session) = state.registry.active_mut() {
                let retrying = session.message(message_id).filter(|m| {
                    m.upload
                        .as_ref()
                        .is_some_and(|u| u.status == UploadStatus::Uploading)
                });
                if let Some(current) = retrying {
                    let mut next = current.with_upload_status(
                        UploadStatus::Error,
                        None,
                        Some(RESELECT_FILE_TEXT.to_string()),
                    );
                    next.content = RESELECT_FILE_TEXT.to_string();
                    session.replace_message(message_id, next);
                }
            }
        }
        self.persist_active().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Harness, MockDocuments, confirm_response, receipt};
    use serde_json::json;
    use std::sync::Arc;
    use tokio::sync::Notify;
    use wenshu_core::session::MessageRole;

    fn pdf(name: &str) -> DocumentFile {
        DocumentFile::new(name, "application/pdf", vec![7; 32])
    }

    #[tokio::test]
    async fn test_successful_upload_then_cancel() {
        let documents = MockDocuments::default();
        documents.push_upload(Ok(receipt("123")));
        let harness = Harness::with_documents(documents.clone()).await;

        let id = harness.orchestrator.upload_single_file(pdf("f.pdf")).await.unwrap();

        let message = harness.message(&id).await.unwrap();
        let upload = message.upload.unwrap();
        assert_eq!(upload.status, UploadStatus::Uploaded);
        assert_eq!(upload.file_id(), Some("123"));
        assert_eq!(harness.orchestrator.upload_progress(&id).await, None);

        harness.orchestrator.cancel_file_upload(&id).await;
        assert!(harness.message(&id).await.is_none());
        assert_eq!(harness.orchestrator.upload_progress(&id).await, None);
    }

    #[tokio::test]
    async fn test_failed_upload_shows_reason() {
        let documents = MockDocuments::default();
        documents.push_upload(Err(WenshuError::remote(415, "Unsupported document layout")));
        let harness = Harness::with_documents(documents).await;

        let id = harness.orchestrator.upload_single_file(pdf("f.pdf")).await.unwrap();

        let upload = harness.message(&id).await.unwrap().upload.unwrap();
        assert_eq!(upload.status, UploadStatus::Error);
        assert_eq!(upload.error.as_deref(), Some("Unsupported document layout"));
        assert_eq!(harness.orchestrator.upload_progress(&id).await, None);
    }

    #[tokio::test]
    async fn test_progress_entry_exists_only_while_in_flight() {
        let gate = Arc::new(Notify::new());
        let documents = MockDocuments::gated(gate.clone(), vec![30]);
        documents.push_upload(Ok(receipt("9")));
        let harness = Harness::with_documents(documents).await;

        let orchestrator = harness.orchestrator.clone();
        let task = tokio::spawn(async move { orchestrator.upload_single_file(pdf("f.pdf")).await });

        let id = harness.wait_for_upload_message().await;
        harness.wait_for_progress(&id, 30).await;
        assert!(harness.message(&id).await.unwrap().upload.unwrap().status.is_in_progress());

        gate.notify_one();
        task.await.unwrap().unwrap();
        assert_eq!(harness.orchestrator.upload_progress(&id).await, None);
    }

    #[tokio::test]
    async fn test_cancel_mid_flight_discards_late_result() {
        let gate = Arc::new(Notify::new());
        let documents = MockDocuments::gated(gate.clone(), vec![10]);
        documents.push_upload(Ok(receipt("late")));
        let harness = Harness::with_documents(documents).await;

        let orchestrator = harness.orchestrator.clone();
        let task = tokio::spawn(async move { orchestrator.upload_single_file(pdf("f.pdf")).await });

        let id = harness.wait_for_upload_message().await;
        harness.orchestrator.cancel_file_upload(&id).await;
        gate.notify_one();

        let returned = task.await.unwrap().unwrap();
        assert_eq!(returned, id);
        assert!(harness.message(&id).await.is_none());
        assert_eq!(harness.orchestrator.upload_progress(&id).await, None);
    }

    #[tokio::test]
    async fn test_upload_files_is_sequential_and_validates() {
        let documents = MockDocuments::default();
        documents.push_upload(Ok(receipt("1")));
        documents.push_upload(Ok(receipt("2")));
        let harness = Harness::with_documents(documents.clone()).await;

        let files = vec![
            pdf("a.pdf"),
            DocumentFile::new("photo.png", "image/png", vec![1]),
            pdf("b.pdf"),
        ];
        let ids = harness.orchestrator.upload_files(files).await.unwrap();

        assert_eq!(ids.len(), 3);
        assert_eq!(documents.uploaded_names(), vec!["a.pdf", "b.pdf"]);
        let session = harness.orchestrator.active_session().await.unwrap();
        let order: Vec<_> = session.messages.iter().map(|m| m.id.clone()).collect();
        assert_eq!(order, ids);

        let rejected = harness.message(&ids[1]).await.unwrap().upload.unwrap();
        assert_eq!(rejected.status, UploadStatus::Error);
        assert!(rejected.error.unwrap().contains("PNG"));
        assert_eq!(
            harness.message(&ids[2]).await.unwrap().upload.unwrap().file_id(),
            Some("2")
        );
    }

    #[tokio::test]
    async fn test_confirm_without_file_id_is_noop() {
        let documents = MockDocuments::default();
        documents.push_upload(Err(WenshuError::transport("offline")));
        let harness = Harness::with_documents(documents.clone()).await;
        let id = harness.orchestrator.upload_single_file(pdf("f.pdf")).await.unwrap();
        let before = harness.orchestrator.active_session().await.unwrap().messages;

        harness
            .orchestrator
            .confirm_document(&id, json!({"title": "x"}))
            .await
            .unwrap();

        assert_eq!(documents.confirm_calls(), 0);
        assert_eq!(harness.orchestrator.active_session().await.unwrap().messages, before);
    }

    #[tokio::test]
    async fn test_confirm_success_appends_acknowledgement() {
        let documents = MockDocuments::default();
        documents.push_upload(Ok(receipt("123")));
        documents.push_confirm(Ok(confirm_response("success", "ok")));
        let harness = Harness::with_documents(documents.clone()).await;
        let id = harness.orchestrator.upload_single_file(pdf("f.pdf")).await.unwrap();

        harness
            .orchestrator
            .confirm_document(&id, json!({"title": "Lease"}))
            .await
            .unwrap();

        let session = harness.orchestrator.active_session().await.unwrap();
        assert_eq!(session.messages.len(), 2);
        assert_eq!(
            session.messages[0].upload.as_ref().unwrap().status,
            UploadStatus::Confirmed
        );
        assert_eq!(session.messages[1].role, MessageRole::Assistant);
        assert!(session.messages[1].content.contains("f.pdf"));

        let sent = documents.last_confirm().unwrap();
        assert_eq!(sent.file_id, "123");
        assert_eq!(sent.metadata, json!({"title": "Lease"}));
    }

    #[tokio::test]
    async fn test_confirm_rejection_marks_error() {
        let documents = MockDocuments::default();
        documents.push_upload(Ok(receipt("123")));
        documents.push_confirm(Err(WenshuError::remote(400, "Metadata validation failed")));
        let harness = Harness::with_documents(documents).await;
        let id = harness.orchestrator.upload_single_file(pdf("f.pdf")).await.unwrap();

        let err = harness
            .orchestrator
            .confirm_document(&id, json!({}))
            .await
            .unwrap_err();
        assert!(err.is_remote());

        let session = harness.orchestrator.active_session().await.unwrap();
        assert_eq!(session.messages.len(), 1);
        let upload = session.messages[0].upload.as_ref().unwrap();
        assert_eq!(upload.status, UploadStatus::Error);
        assert_eq!(upload.error.as_deref(), Some("Metadata validation failed"));
    }

    #[tokio::test]
    async fn test_non_success_confirm_status_is_an_error() {
        let documents = MockDocuments::default();
        documents.push_upload(Ok(receipt("123")));
        documents.push_confirm(Ok(confirm_response("failed", "Duplicate document")));
        let harness = Harness::with_documents(documents).await;
        let id = harness.orchestrator.upload_single_file(pdf("f.pdf")).await.unwrap();

        assert!(harness.orchestrator.confirm_document(&id, json!({})).await.is_err());
        let upload = harness.message(&id).await.unwrap().upload.unwrap();
        assert_eq!(upload.error.as_deref(), Some("Duplicate document"));
    }

    #[tokio::test]
    async fn test_retry_asks_for_file_again() {
        let documents = MockDocuments::default();
        documents.push_upload(Err(WenshuError::transport("offline")));
        let harness = Harness::with_documents(documents.clone()).await;
        let id = harness.orchestrator.upload_single_file(pdf("f.pdf")).await.unwrap();

        harness.orchestrator.retry_file_upload(&id).await.unwrap();

        let message = harness.message(&id).await.unwrap();
        assert_eq!(message.content, RESELECT_FILE_TEXT);
        assert_eq!(message.upload.unwrap().status, UploadStatus::Error);
        assert_eq!(harness.orchestrator.upload_progress(&id).await, None);
        assert_eq!(documents.uploaded_names().len(), 1);
    }

    #[tokio::test]
    async fn test_retry_is_refused_while_upload_in_flight() {
        let gate = Arc::new(Notify::new());
        let documents = MockDocuments::gated(gate.clone(), vec![10]);
        documents.push_upload(Ok(receipt("late")));
        let harness = Harness::with_documents(documents).await;

        let orchestrator = harness.orchestrator.clone();
        let task = tokio::spawn(async move { orchestrator.upload_single_file(pdf("f.pdf")).await });
        let id = harness.wait_for_upload_message().await;

        let err = harness.orchestrator.retry_file_upload(&id).await.unwrap_err();
        assert!(err.is_invalid_state());

        gate.notify_one();
        task.await.unwrap().unwrap();
        let upload = harness.message(&id).await.unwrap().upload.unwrap();
        assert_eq!(upload.status, UploadStatus::Uploaded);
        assert_eq!(upload.file_id(), Some("late"));
    }

    #[tokio::test]
    async fn test_late_result_does_not_revive_settled_message() {
        let gate = Arc::new(Notify::new());
        let documents = MockDocuments::gated(gate.clone(), vec![10]);
        documents.push_upload(Ok(receipt("late")));
        let harness = Harness::with_documents(documents).await;

        let orchestrator = harness.orchestrator.clone();
        let task = tokio::spawn(async move { orchestrator.upload_single_file(pdf("f.pdf")).await });
        let id = harness.wait_for_upload_message().await;
        {
            let mut state = harness.orchestrator.state.write().await;
            let session = state.registry.active_mut().unwrap();
            let failed = session.message(&id).unwrap().with_upload_status(
                UploadStatus::Error,
                None,
                Some("offline".into()),
            );
            session.replace_message(&id, failed);
        }

        gate.notify_one();
        task.await.unwrap().unwrap();
        let upload = harness.message(&id).await.unwrap().upload.unwrap();
        assert_eq!(upload.status, UploadStatus::Error);
        assert_eq!(upload.file_id(), None);
    }

    #[tokio::test]
    async fn test_retry_keeps_confirmed_document() {
        let documents = MockDocuments::default();
        documents.push_upload(Ok(receipt("123")));
        documents.push_confirm(Ok(confirm_response("success", "ok")));
        let harness = Harness::with_documents(documents).await;
        let id = harness.orchestrator.upload_single_file(pdf("f.pdf")).await.unwrap();
        harness
            .orchestrator
            .confirm_document(&id, json!({"title": "Lease"}))
            .await
            .unwrap();

        let err = harness.orchestrator.retry_file_upload(&id).await.unwrap_err();

        assert!(err.is_invalid_state());
        let upload = harness.message(&id).await.unwrap().upload.unwrap();
        assert_eq!(upload.status, UploadStatus::Confirmed);
        assert_eq!(upload.file_id(), Some("123"));
        assert_eq!(harness.orchestrator.upload_progress(&id).await, None);
    }
}
