//! Pipeline phase trait.

use eyre::Result;
use thiserror::Error;

use crate::document::TemplateDocument;

/// Internal contract violations. These are fatal for the current document:
/// continuing would silently generate incorrect output, so processing stops
/// instead of attempting recovery.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error(
        "document '{path}' has completed {completed} phase(s) but the operation requires checkpoint {required}"
    )]
    CheckpointNotReached {
        path: String,
        completed: usize,
        required: usize,
    },
    #[error("document '{path}' is missing its {what} at phase '{phase}'")]
    MissingState {
        path: String,
        what: &'static str,
        phase: &'static str,
    },
    #[error("phase range {start}..{end} is out of bounds for a {count}-phase pipeline")]
    InvalidPhaseRange {
        start: usize,
        end: usize,
        count: usize,
    },
}

/// A phase in the compilation pipeline.
///
/// Phases are strictly ordered: a later phase never requires re-running an
/// earlier one. Each phase must be idempotent when its inputs are unchanged,
/// so re-running it on a document already at or past it reproduces the same
/// state bit-for-bit.
pub trait Phase: Send + Sync {
    /// The name of this phase (used in diagnostics and tracing).
    fn name(&self) -> &'static str;

    /// Run this phase on a document.
    ///
    /// # Errors
    ///
    /// Returns an error only for internal contract violations. Problems in
    /// the template itself are recorded as diagnostics and the phase
    /// completes best-effort.
    fn run(&self, document: &mut TemplateDocument) -> Result<()>;
}
