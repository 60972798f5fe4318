//! Streaming chat exchange: wire events and the rules for folding them into
//! an assistant message.

mod event;
mod processor;

pub use event::{StreamEnvelope, StreamEvent, StreamFault};
pub use processor::{EventOutcome, apply_event, apply_transport_failure};
