//! Typed events of one streaming exchange.
//!
//! The backend sends envelopes of the form `{"type": ..., "data": ...}`.
//! Decoding goes through a loose [`StreamEnvelope`] first so that an unknown
//! `type` is distinguishable from a malformed envelope.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Out-of-band problems while consuming an exchange.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StreamFault {
    /// An envelope could not be decoded. The exchange continues.
    #[error("malformed stream envelope: {0}")]
    Protocol(String),
    /// The connection failed before the stream closed. The exchange ends.
    #[error("{0}")]
    Transport(String),
}

/// Raw wire envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ToolCallData {
    #[serde(default, alias = "id")]
    call_id: Option<String>,
    #[serde(default, alias = "tool")]
    tool_name: Option<String>,
    #[serde(default)]
    arguments: Value,
    #[serde(default)]
    result: Value,
}

/// One decoded event.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    ToolCallStart {
        call_id: Option<String>,
        tool_name: String,
        arguments: Value,
    },
    ToolCallEnd {
        call_id: Option<String>,
        result: Value,
    },
    Thought(String),
    RetrievedDocuments(Vec<Value>),
    Sources(Vec<Value>),
    Token(String),
    Error(String),
    /// A well-formed envelope of a type this client does not handle.
    Unknown(String),
}

impl StreamEvent {
    /// Decodes one JSON envelope.
    pub fn parse(raw: &str) -> Result<Self, StreamFault> {
        let envelope: StreamEnvelope =
            serde_json::from_str(raw).map_err(|e| StreamFault::Protocol(e.to_string()))?;
        Self::from_envelope(envelope)
    }

    pub fn from_envelope(envelope: StreamEnvelope) -> Result<Self, StreamFault> {
        let StreamEnvelope { kind, data } = envelope;
        let event = match kind.as_str() {
            "tool_call_start" => {
                let call = tool_call_data(&kind, data)?;
                StreamEvent::ToolCallStart {
                    call_id: call.call_id,
                    tool_name: call.tool_name.unwrap_or_default(),
                    arguments: call.arguments,
                }
            }
            "tool_call_end" => {
                let call = tool_call_data(&kind, data)?;
                StreamEvent::ToolCallEnd {
                    call_id: call.call_id,
                    result: call.result,
                }
            }
            "thought" => StreamEvent::Thought(text_of(data)),
            "retrieved_documents" => StreamEvent::RetrievedDocuments(list_of(&kind, data)?),
            "sources" => StreamEvent::Sources(list_of(&kind, data)?),
            "token" => StreamEvent::Token(text_of(data)),
            "error" => StreamEvent::Error(text_of(data)),
            _ => StreamEvent::Unknown(kind),
        };
        Ok(event)
    }

    pub fn kind(&self) -> &str {
        match self {
            StreamEvent::ToolCallStart { .. } => "tool_call_start",
            StreamEvent::ToolCallEnd { .. } => "tool_call_end",
            StreamEvent::Thought(_) => "thought",
            StreamEvent::RetrievedDocuments(_) => "retrieved_documents",
            StreamEvent::Sources(_) => "sources",
            StreamEvent::Token(_) => "token",
            StreamEvent::Error(_) => "error",
            StreamEvent::Unknown(kind) => kind,
        }
    }
}

fn tool_call_data(kind: &str, data: Value) -> Result<ToolCallData, StreamFault> {
    if data.is_null() {
        return Ok(ToolCallData::default());
    }
    serde_json::from_value(data)
        .map_err(|e| StreamFault::Protocol(format!("invalid {} payload: {}", kind, e)))
}

fn list_of(kind: &str, data: Value) -> Result<Vec<Value>, StreamFault> {
    match data {
        Value::Array(items) => Ok(items),
        Value::Null => Ok(Vec::new()),
        other => Err(StreamFault::Protocol(format!(
            "{} payload must be a list, got {}",
            kind, other
        ))),
    }
}

fn text_of(data: Value) -> String {
    match data {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
