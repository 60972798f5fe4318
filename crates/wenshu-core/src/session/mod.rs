//! Session domain module.
//!
//! # Module Structure
//!
//! - `model`: Session aggregate (`Session`, `SessionMode`)
//! - `message`: Transcript entries (`Message`, `Step`, markers)
//! - `repository`: Repository trait for session persistence
//! - `registry`: Session list and active-session management (`SessionRegistry`)

mod message;
mod model;
mod registry;
mod repository;

// Re-export public API
pub use message::{AutofillMarker, Message, MessageRole, Step, StepKind, StepPayload, StepStatus};
pub use model::{Session, SessionMode};
pub use registry::{SessionRegistry, SwitchOutcome};
pub use repository::SessionRepository;
