//! Tracing bootstrap for Wenshu.

mod diagnostics_layer;

pub use diagnostics_layer::{DiagnosticEvent, DiagnosticsLayer};

use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// How [`init_tracing`] sets up the global subscriber.
#[derive(Debug, Clone)]
pub struct TelemetryOptions {
    /// Filter used when `RUST_LOG` is unset
    pub default_filter: String,
    /// Emit JSON lines instead of human-readable text
    pub json: bool,
    /// Also forward events over a channel (see [`DiagnosticsLayer`])
    pub diagnostics: bool,
}

impl Default for TelemetryOptions {
    fn default() -> Self {
        Self {
            default_filter: "info".to_string(),
            json: false,
            diagnostics: false,
        }
    }
}

/// Errors that can occur while installing the subscriber.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// A global subscriber was already set.
    #[error("Tracing subscriber already initialized: {0}")]
    AlreadyInitialized(String),
}

/// Installs the global tracing subscriber.
///
/// Returns the diagnostics receiver when `options.diagnostics` is set.
pub fn init_tracing(
    options: &TelemetryOptions,
) -> Result<Option<mpsc::UnboundedReceiver<DiagnosticEvent>>, TelemetryError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&options.default_filter));

    let (diagnostics, receiver) = if options.diagnostics {
        let (layer, receiver) = DiagnosticsLayer::channel();
        (Some(layer), Some(receiver))
    } else {
        (None, None)
    };

    let (text, json) = if options.json {
        (None, Some(tracing_subscriber::fmt::layer().json()))
    } else {
        (Some(tracing_subscriber::fmt::layer()), None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(text)
        .with(json)
        .with(diagnostics)
        .try_init()
        .map_err(|e| TelemetryError::AlreadyInitialized(e.to_string()))?;

    Ok(receiver)
}
