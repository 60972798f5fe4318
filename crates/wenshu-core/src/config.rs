//! Orchestrator configuration.
//!
//! Loaded from `config.toml` by the infrastructure `ConfigService`; every
//! field has a default so a partial (or missing) file is valid.

use serde::{Deserialize, Serialize};

/// Default upper bound for an uploaded document (50 MiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

/// MIME types the backend's document extractor accepts.
pub const DEFAULT_SUPPORTED_MIME_TYPES: &[&str] = &[
    "application/pdf",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/msword",
    "application/vnd.ms-powerpoint",
    "application/vnd.ms-excel",
    "text/plain",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Base URL of the chat/document backend
    pub api_base_url: String,
    /// Title given to freshly created sessions
    pub default_session_title: String,
    /// Title prefix applied when a session enters autofill mode
    pub autofill_session_title: String,
    /// Largest file accepted by `upload_files`, in bytes
    pub max_file_size: u64,
    /// MIME types accepted by `upload_files`
    pub supported_mime_types: Vec<String>,
    /// How long a retried upload shows as re-uploading before asking for the file again
    pub retry_settle_delay_ms: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000".to_string(),
            default_session_title: "New conversation".to_string(),
            autofill_session_title: "Document autofill".to_string(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            supported_mime_types: DEFAULT_SUPPORTED_MIME_TYPES
                .iter()
                .map(|m| m.to_string())
                .collect(),
            retry_settle_delay_ms: 1000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: OrchestratorConfig =
            toml::from_str("api_base_url = \"http://backend:9000\"").unwrap();
        assert_eq!(config.api_base_url, "http://backend:9000");
        assert_eq!(config.max_file_size, DEFAULT_MAX_FILE_SIZE);
        assert_eq!(config.supported_mime_types.len(), 8);
    }
}
