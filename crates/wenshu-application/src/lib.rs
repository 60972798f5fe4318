//! Application layer for Wenshu.
//!
//! [`SessionOrchestrator`] is the single context object the presentation layer
//! talks to. Each `*_usecase` module adds one group of operations to it.

mod autofill_usecase;
mod chat_usecase;
mod orchestrator;
mod session_usecase;
mod upload_usecase;

#[cfg(test)]
mod test_support;

pub use autofill_usecase::REFINE_FAILED_STATUS;
pub use chat_usecase::THINKING_STATUS;
pub use orchestrator::{InputRoute, SessionOrchestrator};
pub use upload_usecase::RESELECT_FILE_TEXT;
