//! Autofill workflow: template-driven document filling with iterative
//! refinement.

mod model;
mod restore;

pub use model::{
    AutofillPhase, AutofillPreview, AutofillSession, ContentSource, ContentSourceKind,
    FillingInstruction, render_control,
};
pub use restore::{has_autofill_artifacts, mode_from_transcript, restore_autofill};
