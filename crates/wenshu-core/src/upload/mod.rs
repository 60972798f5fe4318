//! Document upload and confirmation.
//!
//! - `model`: lifecycle status, per-message upload state, wire payloads
//! - `progress`: side table of in-flight upload percentages
//! - `validation`: pre-upload checks and display helpers

mod model;
mod progress;
mod validation;

pub use model::{
    ConfirmRequest, ConfirmResponse, DocumentFile, ExtractedDocument, FileInfo, UploadReceipt,
    UploadState, UploadStatus,
};
pub use progress::ProgressTable;
pub use validation::{format_file_size, file_type_name, mime_type_from_extension, validate_file};
