//! Data Transfer Objects (DTOs) for persistence.
//!
//! These DTOs are the versioned on-disk schema. They stay private to the
//! infrastructure layer; the rest of the workspace only sees domain types.
//!
//! ### Session Version History
//! - **1.0.0**: Initial schema (id, title, transcript, timestamps)
//! - **1.1.0**: Added the interaction `mode`

mod session;

pub use session::create_session_migrator;
