//! Transcript message types.
//!
//! A [`Message`] is one transcript entry. Each optional block on it belongs
//! to exactly one concern: content/steps/sources to the stream processor,
//! `upload` to the upload pipeline, `autofill` to the autofill controller.

use crate::autofill::AutofillPreview;
use crate::new_id;
use crate::upload::UploadState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Represents the role of a message in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Message from the user.
    User,
    /// Message from the AI assistant (or a synthetic acknowledgement).
    Assistant,
}

/// Kind of an intermediate reasoning step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    ToolCall,
    Thought,
}

/// Lifecycle of a step. Tool calls go `Running -> Finished`; thoughts are
/// born `Complete`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Running,
    Finished,
    Error,
    Complete,
}

/// What a step carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepPayload {
    ToolCall {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        call_id: Option<String>,
        tool_name: String,
        #[serde(default)]
        arguments: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<Value>,
    },
    Thought {
        content: String,
    },
}

/// An intermediate step shown alongside an assistant answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub id: String,
    pub status: StepStatus,
    pub payload: StepPayload,
}

impl Step {
    /// A tool invocation that has started but not yet returned.
    pub fn tool_call(call_id: Option<String>, tool_name: impl Into<String>, arguments: Value) -> Self {
        let tool_name = tool_name.into();
        Self {
            id: new_id(&tool_name),
            status: StepStatus::Running,
            payload: StepPayload::ToolCall {
                call_id,
                tool_name,
                arguments,
                result: None,
            },
        }
    }

    /// A free-text thought, complete on arrival.
    pub fn thought(content: impl Into<String>) -> Self {
        Self {
            id: new_id("thought"),
            status: StepStatus::Complete,
            payload: StepPayload::Thought {
                content: content.into(),
            },
        }
    }

    pub fn kind(&self) -> StepKind {
        match self.payload {
            StepPayload::ToolCall { .. } => StepKind::ToolCall,
            StepPayload::Thought { .. } => StepKind::Thought,
        }
    }

    pub fn call_id(&self) -> Option<&str> {
        match &self.payload {
            StepPayload::ToolCall { call_id, .. } => call_id.as_deref(),
            StepPayload::Thought { .. } => None,
        }
    }

    pub fn result(&self) -> Option<&Value> {
        match &self.payload {
            StepPayload::ToolCall { result, .. } => result.as_ref(),
            StepPayload::Thought { .. } => None,
        }
    }

    /// Marks a running tool call as finished with its result.
    pub fn finish(&mut self, value: Value) {
        self.status = StepStatus::Finished;
        if let StepPayload::ToolCall { result, .. } = &mut self.payload {
            *result = Some(value);
        }
    }
}

/// Markers identifying the autofill artifacts of a transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AutofillMarker {
    /// The message offering the three content sources.
    Control {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        template_name: Option<String>,
    },
    /// One preview iteration returned by the autofill engine.
    Preview {
        correlation_id: String,
        preview: AutofillPreview,
    },
}

/// A single transcript entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique within its session
    pub id: String,
    pub role: MessageRole,
    /// Accumulated text
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Transient status line ("Thinking...", an error string)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_results: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload: Option<UploadState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autofill: Option<AutofillMarker>,
}

impl Message {
    fn with_role(prefix: &str, role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: new_id(prefix),
            role,
            content: content.into(),
            timestamp: Utc::now(),
            status: None,
            steps: Vec::new(),
            sources: None,
            document_results: None,
            upload: None,
            autofill: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role("user", MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role("assistant", MessageRole::Assistant, content)
    }

    /// The empty assistant message that receives one exchange's events.
    pub fn placeholder(status: impl Into<String>) -> Self {
        let mut message = Self::with_role("assistant", MessageRole::Assistant, "");
        message.status = Some(status.into());
        message.sources = Some(Vec::new());
        message.document_results = Some(Vec::new());
        message
    }

    pub fn is_autofill_control(&self) -> bool {
        matches!(self.autofill, Some(AutofillMarker::Control { .. }))
    }

    pub fn is_autofill_preview(&self) -> bool {
        matches!(self.autofill, Some(AutofillMarker::Preview { .. }))
    }
}
