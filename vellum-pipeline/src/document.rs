//! The per-template compilation snapshot.

use std::sync::Arc;

use serde::Serialize;
use vellum_core::{FileKind, SourceSpan, SourceText};
use vellum_descriptor::{Descriptor, DescriptorSet};

use crate::{
    diagnostic::Diagnostic,
    ir::IrDocument,
    syntax::{Directive, SyntaxTree},
};

/// The subset of the descriptor universe syntactically reachable from one
/// document's import chain. Recomputed whenever the descriptor set changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescriptorContext {
    pub in_scope: DescriptorSet,
}

/// The finished product for one template file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedOutput {
    /// Stable output identifier derived from the file's relative path.
    pub identifier: String,
    /// Generated source text.
    pub code: String,
    /// Diagnostics in recording order.
    pub diagnostics: Vec<Diagnostic>,
}

/// One template's compilation state, advanced in place by phase execution.
///
/// Large sub-states (syntax tree, descriptor set, IR, output) are held
/// behind `Arc`, so [`clone_snapshot`](TemplateDocument::clone_snapshot) is
/// cheap and a clone compares equal to its original until one of them is
/// advanced further. Callers that need before/after comparison hold a
/// snapshot explicitly.
///
/// Invariant: at every phase boundary the descriptor set and descriptor
/// context are both present or both absent; recording a new descriptor set
/// drops the stale context until scope discovery recomputes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateDocument {
    source: SourceText,
    kind: FileKind,
    imports: Vec<SourceText>,
    syntax: Option<Arc<SyntaxTree>>,
    directives: Option<Arc<Vec<Directive>>>,
    descriptors: Option<Arc<DescriptorSet>>,
    context: Option<Arc<DescriptorContext>>,
    referenced: Option<Arc<DescriptorSet>>,
    bindings: Option<Arc<Vec<(SourceSpan, Descriptor)>>>,
    ir: Option<Arc<IrDocument>>,
    output: Option<Arc<GeneratedOutput>>,
    /// Diagnostics tagged with the phase index that recorded them, so
    /// re-running a phase replaces its own diagnostics instead of
    /// duplicating them.
    diagnostics: Vec<(usize, Diagnostic)>,
    current_phase: usize,
    phases_completed: usize,
}

impl TemplateDocument {
    /// Create a fresh document for a template file and its applicable
    /// import files. No phase has run yet.
    pub fn new(source: SourceText, kind: FileKind, imports: Vec<SourceText>) -> Self {
        Self {
            source,
            kind,
            imports,
            syntax: None,
            directives: None,
            descriptors: None,
            context: None,
            referenced: None,
            bindings: None,
            ir: None,
            output: None,
            diagnostics: Vec::new(),
            current_phase: 0,
            phases_completed: 0,
        }
    }

    pub fn source(&self) -> &SourceText {
        &self.source
    }

    pub fn file_kind(&self) -> FileKind {
        self.kind
    }

    pub fn imports(&self) -> &[SourceText] {
        &self.imports
    }

    pub fn syntax(&self) -> Option<&Arc<SyntaxTree>> {
        self.syntax.as_ref()
    }

    pub fn set_syntax(&mut self, syntax: Arc<SyntaxTree>) {
        self.syntax = Some(syntax);
    }

    /// Merged directives: the document's own plus its import files', import
    /// files first.
    pub fn directives(&self) -> Option<&Arc<Vec<Directive>>> {
        self.directives.as_ref()
    }

    pub fn set_directives(&mut self, directives: Arc<Vec<Directive>>) {
        self.directives = Some(directives);
    }

    /// The full descriptor universe last recorded on this document.
    pub fn descriptors(&self) -> Option<&Arc<DescriptorSet>> {
        self.descriptors.as_ref()
    }

    /// Record a new descriptor universe. The stale in-scope context is
    /// dropped with it; referenced descriptors survive because the
    /// idempotency check compares them against the *new* context.
    pub fn set_descriptors(&mut self, descriptors: Arc<DescriptorSet>) {
        self.descriptors = Some(descriptors);
        self.context = None;
    }

    pub fn descriptor_context(&self) -> Option<&Arc<DescriptorContext>> {
        self.context.as_ref()
    }

    pub fn set_descriptor_context(&mut self, context: Arc<DescriptorContext>) {
        self.context = Some(context);
    }

    /// Descriptors the document actually consumed at its last bind, tracked
    /// separately from the in-scope subset.
    pub fn referenced_descriptors(&self) -> Option<&Arc<DescriptorSet>> {
        self.referenced.as_ref()
    }

    pub fn set_referenced_descriptors(&mut self, referenced: Arc<DescriptorSet>) {
        self.referenced = Some(referenced);
    }

    /// Element-to-descriptor matches from the bind phase, keyed by element
    /// span in document order.
    pub fn bindings(&self) -> Option<&Arc<Vec<(SourceSpan, Descriptor)>>> {
        self.bindings.as_ref()
    }

    pub fn set_bindings(&mut self, bindings: Arc<Vec<(SourceSpan, Descriptor)>>) {
        self.bindings = Some(bindings);
    }

    pub fn ir(&self) -> Option<&Arc<IrDocument>> {
        self.ir.as_ref()
    }

    pub fn set_ir(&mut self, ir: Arc<IrDocument>) {
        self.ir = Some(ir);
    }

    pub fn output(&self) -> Option<&Arc<GeneratedOutput>> {
        self.output.as_ref()
    }

    pub fn set_output(&mut self, output: Arc<GeneratedOutput>) {
        self.output = Some(output);
    }

    /// All diagnostics recorded so far, in phase order.
    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().map(|(_, d)| d)
    }

    pub fn collect_diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics().cloned().collect()
    }

    /// Mark phase `index` as the one currently executing. Any diagnostics it
    /// recorded on a previous run are retracted so the re-run replaces them.
    pub fn begin_phase(&mut self, index: usize) {
        self.diagnostics.retain(|(phase, _)| *phase != index);
        self.current_phase = index;
    }

    pub fn push_diagnostic(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push((self.current_phase, diagnostic));
    }

    pub fn extend_diagnostics(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        let phase = self.current_phase;
        self.diagnostics
            .extend(diagnostics.into_iter().map(|d| (phase, d)));
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|(_, d)| d.severity.is_error())
    }

    /// Number of phases completed so far; a document "at checkpoint k" has
    /// `phases_completed() >= k`.
    pub fn phases_completed(&self) -> usize {
        self.phases_completed
    }

    /// Advance the phase cursor. Re-running an earlier phase (the scope
    /// recheck) never moves the cursor backwards.
    pub fn mark_phases_completed(&mut self, through: usize) {
        self.phases_completed = self.phases_completed.max(through);
    }

    /// An explicit snapshot of the current state. Shares immutable
    /// sub-state; compares equal to the original until either side moves.
    pub fn clone_snapshot(&self) -> Self {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vellum_descriptor::Descriptor;

    fn doc() -> TemplateDocument {
        TemplateDocument::new(
            SourceText::new("a.vlm", "a.vlm", "<p>x</p>"),
            FileKind::Component,
            vec![],
        )
    }

    #[test]
    fn test_snapshot_equality() {
        let mut original = doc();
        original.set_syntax(Arc::new(SyntaxTree::default()));
        let snapshot = original.clone_snapshot();
        assert_eq!(original, snapshot);

        original.push_diagnostic(Diagnostic::error(crate::diagnostic::codes::PARSE_ERROR, "x"));
        assert_ne!(original, snapshot);
    }

    #[test]
    fn test_set_descriptors_drops_context() {
        let mut document = doc();
        let set = Arc::new(DescriptorSet::new(vec![Descriptor::component("a::A", "A")]));
        document.set_descriptors(Arc::clone(&set));
        document.set_descriptor_context(Arc::new(DescriptorContext::default()));
        assert!(document.descriptor_context().is_some());

        document.set_descriptors(set);
        assert!(document.descriptor_context().is_none());
    }

    #[test]
    fn test_phase_rerun_replaces_its_diagnostics() {
        use crate::diagnostic::codes;

        let mut document = doc();
        document.begin_phase(3);
        document.push_diagnostic(Diagnostic::error(codes::UNRESOLVED_COMPONENT, "a"));
        document.begin_phase(4);
        document.push_diagnostic(Diagnostic::warning(codes::CONSTRAINT_UNSUPPORTED, "b"));

        document.begin_phase(3);
        document.push_diagnostic(Diagnostic::error(codes::UNRESOLVED_COMPONENT, "c"));
        let messages: Vec<_> = document.diagnostics().map(|d| d.message.as_str()).collect();
        assert_eq!(messages, ["b", "c"]);
    }

    #[test]
    fn test_phase_cursor_never_regresses() {
        let mut document = doc();
        document.mark_phases_completed(4);
        document.mark_phases_completed(3);
        assert_eq!(document.phases_completed(), 4);
    }
}
