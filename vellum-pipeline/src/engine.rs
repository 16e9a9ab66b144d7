//! Engine construction, partial execution, and the checkpoint operations.

use std::collections::HashMap;
use std::sync::Arc;

use eyre::Result;
use tracing::debug;
use vellum_core::SourceText;

use crate::{
    config::PipelineConfig,
    document::TemplateDocument,
    idempotency::{self, ShortCircuit},
    phase::{Phase, PipelineError},
    phases::{BindPhase, EmitPhase, ImportsPhase, LowerPhase, ParsePhase, ScopePhase},
};
use vellum_descriptor::DescriptorSet;

/// Checkpoint A: the phase index scope discovery runs at. Everything before
/// it depends only on the document's own text and its import files.
pub const CHECKPOINT_SCOPE: usize = 2;

/// Checkpoint B: the first phase index that no longer depends on the
/// descriptor universe. Scope discovery and binding live in
/// `CHECKPOINT_SCOPE..CHECKPOINT_BIND`.
pub const CHECKPOINT_BIND: usize = 4;

/// An immutable pipeline: a configuration plus its ordered phase list.
///
/// Engines are cheap to share and contain no per-document state; one engine
/// serves every document of a build, concurrently.
pub struct PipelineEngine {
    config: Arc<PipelineConfig>,
    phases: Vec<Box<dyn Phase>>,
}

impl PipelineEngine {
    /// Build the engine for a configuration. The phase list is fixed here
    /// and never changes afterwards.
    pub fn for_config(config: Arc<PipelineConfig>) -> Self {
        let phases: Vec<Box<dyn Phase>> = vec![
            Box::new(ParsePhase),
            Box::new(ImportsPhase),
            Box::new(ScopePhase::new(Arc::clone(&config))),
            Box::new(BindPhase::new(Arc::clone(&config))),
            Box::new(LowerPhase::new(Arc::clone(&config))),
            Box::new(EmitPhase::new(Arc::clone(&config))),
        ];
        Self { config, phases }
    }

    pub fn config(&self) -> &Arc<PipelineConfig> {
        &self.config
    }

    pub fn phase_count(&self) -> usize {
        self.phases.len()
    }

    /// Run phases `start..end` on a document, in order.
    ///
    /// Each phase first retracts the diagnostics of its own previous run, so
    /// partial re-execution never duplicates a diagnostic.
    pub fn run_partial(
        &self,
        document: &mut TemplateDocument,
        start: usize,
        end: usize,
    ) -> Result<()> {
        if start > end || end > self.phases.len() {
            return Err(PipelineError::InvalidPhaseRange {
                start,
                end,
                count: self.phases.len(),
            }
            .into());
        }
        for (index, phase) in self.phases.iter().enumerate().take(end).skip(start) {
            debug!(
                phase = phase.name(),
                index,
                path = document.source().path(),
                "running phase"
            );
            document.begin_phase(index);
            phase.run(document)?;
            document.mark_phases_completed(index + 1);
        }
        Ok(())
    }

    /// Run the descriptor-independent front of the pipeline on a fresh
    /// document, stopping at checkpoint A.
    pub fn process_initial_parse(
        &self,
        source: SourceText,
        imports: Vec<SourceText>,
    ) -> Result<TemplateDocument> {
        let kind = source
            .file_kind()
            .ok_or_else(|| eyre::eyre!("'{}' is not a template file", source.path()))?;
        let mut document = TemplateDocument::new(source, kind, imports);
        self.run_partial(&mut document, 0, CHECKPOINT_SCOPE)?;
        Ok(document)
    }

    /// Advance a checkpoint-A document through scope discovery and binding
    /// under the given descriptor universe, stopping at checkpoint B.
    ///
    /// The input document is never mutated; the result is always a separate
    /// document, so a caller caching the pre-rebind state observes nothing.
    /// With `check_idempotency` set and a previously-recorded descriptor
    /// set, the idempotency check may skip the re-run entirely.
    pub fn process_descriptors(
        &self,
        document: &TemplateDocument,
        descriptors: &Arc<DescriptorSet>,
        check_idempotency: bool,
    ) -> Result<TemplateDocument> {
        let mut next = document.clone_snapshot();

        let start = if check_idempotency && next.descriptors().is_some() {
            match idempotency::try_short_circuit(self, &mut next, descriptors)? {
                ShortCircuit::Unchanged | ShortCircuit::ScopeUnchanged => {
                    debug!(path = next.source().path(), "descriptor pass short-circuited");
                    return Ok(next);
                }
                // The check already recorded the new set and re-ran scope
                // discovery; resume from binding.
                ShortCircuit::MustRebind => CHECKPOINT_SCOPE + 1,
            }
        } else {
            next.set_descriptors(Arc::clone(descriptors));
            CHECKPOINT_SCOPE
        };

        self.run_partial(&mut next, start, CHECKPOINT_BIND)?;
        Ok(next)
    }

    /// Run everything after checkpoint B, producing the generated output.
    pub fn process_remaining(&self, document: &TemplateDocument) -> Result<TemplateDocument> {
        if document.phases_completed() < CHECKPOINT_BIND {
            return Err(PipelineError::CheckpointNotReached {
                path: document.source().path().to_owned(),
                completed: document.phases_completed(),
                required: CHECKPOINT_BIND,
            }
            .into());
        }
        let mut next = document.clone_snapshot();
        self.run_partial(&mut next, CHECKPOINT_BIND, self.phases.len())?;
        Ok(next)
    }
}

/// Engines keyed by configuration value.
///
/// Configurations recur across build cycles; reusing the engine keeps phase
/// construction out of the per-cycle cost.
#[derive(Default)]
pub struct EngineCache {
    engines: HashMap<PipelineConfig, Arc<PipelineEngine>>,
}

impl EngineCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create(&mut self, config: &PipelineConfig) -> Arc<PipelineEngine> {
        if let Some(engine) = self.engines.get(config) {
            return Arc::clone(engine);
        }
        let engine = Arc::new(PipelineEngine::for_config(Arc::new(config.clone())));
        self.engines.insert(config.clone(), Arc::clone(&engine));
        engine
    }

    pub fn len(&self) -> usize {
        self.engines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }
}
