//! Autofill domain types.

use crate::error::WenshuError;
use crate::session::{AutofillMarker, Message};
use crate::upload::DocumentFile;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One cell the autofill engine proposes to fill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillingInstruction {
    #[serde(alias = "table")]
    pub table_index: u32,
    pub row: u32,
    pub col: u32,
    pub value: String,
    #[serde(default)]
    pub reason: String,
}

/// A preview iteration: the proposed instructions plus the engine's summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutofillPreview {
    #[serde(default)]
    pub filling_instructions: Vec<FillingInstruction>,
    #[serde(default)]
    pub summary: String,
}

impl AutofillPreview {
    /// Transcript text for this preview.
    pub fn render(&self) -> String {
        let mut out = String::new();
        if !self.summary.is_empty() {
            out.push_str(&self.summary);
            out.push_str("\n\n");
        }
        if self.filling_instructions.is_empty() {
            out.push_str("No fields to fill.");
            return out;
        }
        out.push_str(&format!(
            "Proposed {} field(s):",
            self.filling_instructions.len()
        ));
        for i in &self.filling_instructions {
            out.push_str(&format!(
                "\n- table {}, row {}, col {}: {}",
                i.table_index, i.row, i.col, i.value
            ));
            if !i.reason.is_empty() {
                out.push_str(&format!(" ({})", i.reason));
            }
        }
        out
    }
}

/// Where the autofill workflow stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutofillPhase {
    Idle,
    /// A template was chosen; waiting for the user to pick a content source.
    AwaitingContent,
    /// A correlation id exists; free text is refinement feedback.
    Active,
}

/// Client-side state of one document-fill attempt.
///
/// `Default` is the idle state; ending autofill mode resets to it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AutofillSession {
    pub correlation_id: Option<String>,
    pub template: Option<DocumentFile>,
    pub active: bool,
    pub awaiting_content: bool,
}

impl AutofillSession {
    /// Idle -> AwaitingContent.
    pub fn start(template: DocumentFile) -> Self {
        Self {
            correlation_id: None,
            template: Some(template),
            active: true,
            awaiting_content: true,
        }
    }

    /// AwaitingContent -> Active.
    pub fn activate(&mut self, correlation_id: impl Into<String>) {
        self.correlation_id = Some(correlation_id.into());
        self.active = true;
        self.awaiting_content = false;
    }

    pub fn end(&mut self) {
        *self = Self::default();
    }

    pub fn phase(&self) -> AutofillPhase {
        if self.active && self.correlation_id.is_some() {
            AutofillPhase::Active
        } else if self.active && self.awaiting_content {
            AutofillPhase::AwaitingContent
        } else {
            AutofillPhase::Idle
        }
    }

    /// Whether free-text input must be routed to refinement.
    pub fn routes_input(&self) -> bool {
        self.phase() == AutofillPhase::Active
    }

    pub fn template_name(&self) -> Option<&str> {
        self.template.as_ref().map(|t| t.name.as_str())
    }
}

/// Where the content for a fill attempt comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentSource {
    /// Free text typed by the user
    Conversational(String),
    /// An uploaded content document
    FromFile(DocumentFile),
    /// A question answered from the knowledge base
    FromKnowledgeBase(String),
}

impl ContentSource {
    pub fn kind(&self) -> ContentSourceKind {
        match self {
            ContentSource::Conversational(_) => ContentSourceKind::Conversational,
            ContentSource::FromFile(_) => ContentSourceKind::FromFile,
            ContentSource::FromKnowledgeBase(_) => ContentSourceKind::FromKnowledgeBase,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentSourceKind {
    Conversational,
    FromFile,
    #[serde(rename = "from_kb")]
    FromKnowledgeBase,
}

impl ContentSourceKind {
    pub const ALL: [ContentSourceKind; 3] = [
        ContentSourceKind::Conversational,
        ContentSourceKind::FromFile,
        ContentSourceKind::FromKnowledgeBase,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentSourceKind::Conversational => "conversational",
            ContentSourceKind::FromFile => "from_file",
            ContentSourceKind::FromKnowledgeBase => "from_kb",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ContentSourceKind::Conversational => "Describe the content in the chat",
            ContentSourceKind::FromFile => "Upload a content document",
            ContentSourceKind::FromKnowledgeBase => "Ask the knowledge base",
        }
    }
}

impl fmt::Display for ContentSourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentSourceKind {
    type Err = WenshuError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "conversational" => Ok(ContentSourceKind::Conversational),
            "from_file" => Ok(ContentSourceKind::FromFile),
            "from_kb" => Ok(ContentSourceKind::FromKnowledgeBase),
            other => Err(WenshuError::validation(format!(
                "Unknown autofill content source: {}",
                other
            ))),
        }
    }
}

/// Transcript text of the control message offering the content sources.
pub fn render_control(template_name: &str) -> String {
    let mut out = format!(
        "Template \"{}\" loaded. Where should the content come from?",
        template_name
    );
    for kind in ContentSourceKind::ALL {
        out.push_str(&format!("\n- {} ({})", kind.label(), kind));
    }
    out
}

impl Message {
    /// The assistant message offering the three content sources.
    pub fn autofill_control(template_name: &str) -> Self {
        let mut message = Message::assistant(render_control(template_name));
        message.autofill = Some(AutofillMarker::Control {
            template_name: Some(template_name.to_string()),
        });
        message
    }

    /// The assistant message showing one preview iteration.
    pub fn autofill_preview(correlation_id: impl Into<String>, preview: AutofillPreview) -> Self {
        let mut message = Message::assistant(preview.render());
        message.autofill = Some(AutofillMarker::Preview {
            correlation_id: correlation_id.into(),
            preview,
        });
        message
    }
}
