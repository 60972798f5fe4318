//! Client-side checks run before a file is handed to the transport.

use super::model::DocumentFile;
use crate::config::OrchestratorConfig;
use crate::error::{Result, WenshuError};

/// Rejects files the backend would refuse anyway.
///
/// Checks, in order: supported MIME type, size limit, non-blank name.
pub fn validate_file(file: &DocumentFile, config: &OrchestratorConfig) -> Result<()> {
    if !config
        .supported_mime_types
        .iter()
        .any(|m| m == &file.mime_type)
    {
        return Err(WenshuError::validation(format!(
            "Unsupported file type: {}",
            file_type_name(&file.mime_type)
        )));
    }

    if file.size() > config.max_file_size {
        return Err(WenshuError::validation(format!(
            "File too large, the maximum is {}",
            format_file_size(config.max_file_size)
        )));
    }

    if file.name.trim().is_empty() {
        return Err(WenshuError::validation("File name must not be empty"));
    }

    Ok(())
}

/// Formats a byte count with binary units, e.g. `1.5 KB`, `50 MB`.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = (value * 100.0).round() / 100.0;
    format!("{} {}", rounded, UNITS[unit])
}

/// Short display name for a MIME type ("PDF", "Word", ...).
pub fn file_type_name(mime_type: &str) -> String {
    let known = match mime_type {
        "application/pdf" => Some("PDF"),
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        | "application/msword" => Some("Word"),
        "application/vnd.openxmlformats-officedocument.presentationml.presentation"
        | "application/vnd.ms-powerpoint" => Some("PowerPoint"),
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
        | "application/vnd.ms-excel" => Some("Excel"),
        "text/plain" => Some("Text"),
        "text/csv" => Some("CSV"),
        _ => None,
    };

    match known {
        Some(name) => name.to_string(),
        None => match mime_type.rsplit('/').next() {
            Some(subtype) if !subtype.is_empty() => subtype.to_uppercase(),
            _ => "Unknown".to_string(),
        },
    }
}

/// Guesses a MIME type from a file name's extension.
pub fn mime_type_from_extension(filename: &str) -> String {
    mime_guess::from_path(filename)
        .first_raw()
        .unwrap_or("application/octet-stream")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> OrchestratorConfig {
        OrchestratorConfig {
            max_file_size: 10,
            ..Default::default()
        }
    }

    #[test]
    fn accepts_supported_file() {
        let file = DocumentFile::new("a.pdf", "application/pdf", vec![0; 10]);
        assert!(validate_file(&file, &config()).is_ok());
    }

    #[test]
    fn rejects_unsupported_type() {
        let file = DocumentFile::new("a.png", "image/png", vec![0; 1]);
        let err = validate_file(&file, &config()).unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("PNG"));
    }

    #[test]
    fn rejects_oversized_file() {
        let file = DocumentFile::new("a.pdf", "application/pdf", vec![0; 11]);
        let err = validate_file(&file, &config()).unwrap_err();
        assert!(err.to_string().contains("10 Bytes"));
    }

    #[test]
    fn rejects_blank_name() {
        let file = DocumentFile::new("  ", "application/pdf", vec![0; 1]);
        assert!(validate_file(&file, &config()).is_err());
    }

    #[test]
    fn formats_sizes() {
        assert_eq!(format_file_size(0), "0 Bytes");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(50 * 1024 * 1024), "50 MB");
    }

    #[test]
    fn guesses_mime_from_extension() {
        assert_eq!(mime_type_from_extension("report.PDF"), "application/pdf");
        assert_eq!(mime_type_from_extension("notes.txt"), "text/plain");
        assert_eq!(mime_type_from_extension("blob"), "application/octet-stream");
    }
}
