//! Domain layer for Wenshu.
//!
//! Holds the session aggregate, the pure folding rules for streamed chat
//! events, the upload and autofill state models, and the collaborator traits
//! (persistence and transport) the application layer is wired against.

pub mod autofill;
pub mod config;
pub mod error;
pub mod session;
pub mod stream;
pub mod transport;
pub mod upload;

// Re-export common error type
pub use error::WenshuError;

/// Builds a message/step identifier with a readable prefix.
///
/// ```
/// let id = wenshu_core::new_id("user");
/// assert!(id.starts_with("user-"));
/// ```
pub fn new_id(prefix: &str) -> String {
    format!("{}-{}", prefix, uuid::Uuid::new_v4())
}
