//! The descriptor idempotency check.
//!
//! Descriptor discovery re-runs on every build cycle and usually produces a
//! universe equivalent to the last one. This check decides, for one
//! checkpoint-A-or-later document and a freshly discovered universe, how
//! much of the descriptor-dependent pipeline actually has to re-run.

use std::sync::Arc;

use eyre::Result;
use tracing::trace;
use vellum_descriptor::DescriptorSet;

use crate::{
    document::TemplateDocument,
    engine::{CHECKPOINT_SCOPE, PipelineEngine},
    phase::PipelineError,
};

/// Outcome of the idempotency check, cheapest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortCircuit {
    /// The new universe is element-wise equivalent to the recorded one;
    /// nothing descriptor-dependent needs to run.
    Unchanged,
    /// The universe changed, but not in any way this document can observe:
    /// its in-scope subset is equivalent, or the change is additions-only
    /// and everything the document referenced is still in scope.
    ScopeUnchanged,
    /// The document must re-run binding under the new universe.
    MustRebind,
}

/// Decide whether `document` can skip re-binding under `new_descriptors`.
///
/// The document must have reached checkpoint A; anything earlier is a
/// caller bug and fails with [`PipelineError::CheckpointNotReached`].
///
/// On [`ShortCircuit::MustRebind`] the new universe has been recorded and
/// scope discovery has already re-run (unless the document had no recorded
/// universe at all); on the other outcomes the document keeps its recorded
/// state, with one deliberate exception: the step that compares in-scope
/// subsets leaves the freshly recorded universe and context in place, since
/// they are equivalent to what they replaced.
pub fn try_short_circuit(
    engine: &PipelineEngine,
    document: &mut TemplateDocument,
    new_descriptors: &Arc<DescriptorSet>,
) -> Result<ShortCircuit> {
    if document.phases_completed() < CHECKPOINT_SCOPE {
        return Err(PipelineError::CheckpointNotReached {
            path: document.source().path().to_owned(),
            completed: document.phases_completed(),
            required: CHECKPOINT_SCOPE,
        }
        .into());
    }

    let Some(old_descriptors) = document.descriptors().cloned() else {
        return Ok(ShortCircuit::MustRebind);
    };

    if old_descriptors.same_elements(new_descriptors) {
        trace!(
            path = document.source().path(),
            "descriptor universe unchanged"
        );
        return Ok(ShortCircuit::Unchanged);
    }

    let old_context =
        document
            .descriptor_context()
            .cloned()
            .ok_or_else(|| PipelineError::MissingState {
                path: document.source().path().to_owned(),
                what: "descriptor context",
                phase: "idempotency check",
            })?;

    // Re-run scope discovery alone under the new universe and compare what
    // this document can actually see.
    document.set_descriptors(Arc::clone(new_descriptors));
    engine.run_partial(document, CHECKPOINT_SCOPE, CHECKPOINT_SCOPE + 1)?;
    let new_context =
        document
            .descriptor_context()
            .cloned()
            .ok_or_else(|| PipelineError::MissingState {
                path: document.source().path().to_owned(),
                what: "descriptor context",
                phase: "idempotency check",
            })?;

    if old_context.in_scope.same_elements(&new_context.in_scope) {
        trace!(
            path = document.source().path(),
            "in-scope subset unchanged under new universe"
        );
        return Ok(ShortCircuit::ScopeUnchanged);
    }

    // Additions-only universes still bind identically as long as nothing
    // the document referenced went away. Content containment, not a length
    // comparison: one removal plus one addition preserves length.
    if new_descriptors.contains_all(&old_descriptors) {
        let referenced_intact = document
            .referenced_descriptors()
            .is_some_and(|referenced| {
                referenced.iter().all(|d| new_context.in_scope.contains(d))
            });
        if referenced_intact {
            trace!(
                path = document.source().path(),
                "additions only; referenced components intact"
            );
            return Ok(ShortCircuit::ScopeUnchanged);
        }
    }

    Ok(ShortCircuit::MustRebind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use vellum_core::{LanguageVersion, SourceText};
    use vellum_descriptor::Descriptor;

    fn engine() -> PipelineEngine {
        PipelineEngine::for_config(Arc::new(PipelineConfig::new(
            LanguageVersion::LATEST,
            "app",
        )))
    }

    fn universe(names: &[&str]) -> Arc<DescriptorSet> {
        Arc::new(
            names
                .iter()
                .map(|n| Descriptor::component(format!("widgets::{n}"), *n))
                .collect(),
        )
    }

    /// A checkpoint-B document that imported `widgets` and references `<A />`.
    fn bound_document(engine: &PipelineEngine, names: &[&str]) -> TemplateDocument {
        let source = SourceText::new(
            "pages/index.vlm",
            "pages/index.vlm",
            "@import widgets\n<A />",
        );
        let parsed = engine.process_initial_parse(source, vec![]).unwrap();
        engine
            .process_descriptors(&parsed, &universe(names), false)
            .unwrap()
    }

    #[test]
    fn test_reordered_universe_is_unchanged() {
        let engine = engine();
        let mut document = bound_document(&engine, &["A", "B"]);
        let before = document.clone_snapshot();

        let outcome =
            try_short_circuit(&engine, &mut document, &universe(&["B", "A"])).unwrap();
        assert_eq!(outcome, ShortCircuit::Unchanged);
        assert_eq!(document, before);
    }

    #[test]
    fn test_out_of_scope_change_is_scope_unchanged() {
        let engine = engine();
        let mut document = bound_document(&engine, &["A"]);
        let output_before = document.bindings().cloned();

        // The new component lives in a namespace this document never
        // imports.
        let mut new = universe(&["A"]).as_ref().clone();
        new.extend(DescriptorSet::new(vec![Descriptor::component(
            "elsewhere::Hidden",
            "Hidden",
        )]));
        let outcome =
            try_short_circuit(&engine, &mut document, &Arc::new(new)).unwrap();
        assert_eq!(outcome, ShortCircuit::ScopeUnchanged);
        assert_eq!(document.bindings().cloned(), output_before);
    }

    #[test]
    fn test_additions_only_with_referenced_intact() {
        let engine = engine();
        let mut document = bound_document(&engine, &["A"]);

        let outcome =
            try_short_circuit(&engine, &mut document, &universe(&["A", "B"])).unwrap();
        assert_eq!(outcome, ShortCircuit::ScopeUnchanged);
    }

    #[test]
    fn test_removal_forces_rebind() {
        let engine = engine();
        let mut document = bound_document(&engine, &["A", "B"]);

        let outcome = try_short_circuit(&engine, &mut document, &universe(&["B"])).unwrap();
        assert_eq!(outcome, ShortCircuit::MustRebind);
    }

    #[test]
    fn test_equal_cardinality_swap_forces_rebind() {
        let engine = engine();
        let mut document = bound_document(&engine, &["A", "B"]);

        // One removal plus one addition preserves length but not content;
        // this is not an additions-only change.
        let outcome =
            try_short_circuit(&engine, &mut document, &universe(&["A", "C"])).unwrap();
        assert_eq!(outcome, ShortCircuit::MustRebind);
    }

    #[test]
    fn test_no_recorded_universe_means_rebind() {
        let engine = engine();
        let source = SourceText::new("a.vlm", "a.vlm", "<p>x</p>");
        let mut parsed = engine.process_initial_parse(source, vec![]).unwrap();

        let outcome = try_short_circuit(&engine, &mut parsed, &universe(&["A"])).unwrap();
        assert_eq!(outcome, ShortCircuit::MustRebind);
    }

    #[test]
    fn test_before_checkpoint_is_an_error() {
        let engine = engine();
        let source = SourceText::new("a.vlm", "a.vlm", "<p>x</p>");
        let mut document = TemplateDocument::new(
            source.clone(),
            source.file_kind().unwrap(),
            vec![],
        );
        engine.run_partial(&mut document, 0, 1).unwrap();

        let error =
            try_short_circuit(&engine, &mut document, &universe(&["A"])).unwrap_err();
        assert!(
            error
                .downcast_ref::<PipelineError>()
                .is_some_and(|e| matches!(e, PipelineError::CheckpointNotReached { .. }))
        );
    }
}
