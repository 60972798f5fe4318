//! HTTP transport for Wenshu.
//!
//! [`WenshuApiClient`] implements the chat, document and autofill transport
//! traits of `wenshu-core` against the Wenshu backend.

pub mod api_client;
pub mod sse;

pub use api_client::WenshuApiClient;
pub use sse::decode_event_stream;
