//! The incremental build driver.
//!
//! One [`Generator`] lives for the whole host session and owns every cached
//! node. Each build cycle re-derives the full output set from the current
//! [`BuildInputs`], but every node applies comparer cutoff, so an unchanged
//! input produces the previously cached allocation all the way down to the
//! generated output.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use eyre::{Result, eyre};
use rayon::prelude::*;
use tracing::{debug, info_span, warn};
use vellum_core::SourceText;
use vellum_descriptor::{
    DescriptorSet, SymbolGraph, WellKnownSymbols, discover_crate, parse_declarations,
};
use vellum_graph::{
    Cancelled, CancellationToken, Comparer, FnComparer, MemoMap, Revision, Slot, ValueComparer,
};
use vellum_pipeline::{
    Diagnostic, EngineCache, GeneratedOutput, PipelineConfig, TemplateDocument, codes,
};

use crate::inputs::BuildInputs;

/// What one build cycle produced.
#[derive(Debug, Clone, Default)]
pub struct BuildOutput {
    /// Generated files, ordered by template path.
    pub outputs: Vec<Arc<GeneratedOutput>>,
    /// Every diagnostic of the cycle, each exactly once, in output order.
    pub diagnostics: Vec<Diagnostic>,
}

/// One template file's resolved per-cycle inputs.
struct FileWork {
    path: String,
    source: SourceText,
    imports: Vec<SourceText>,
    /// Latest `changed_at` of the file's own inputs (source, imports,
    /// configuration).
    inputs_changed_at: Revision,
}

/// Equality-only comparer for node values that are expensive or pointless to
/// hash.
fn by_value<T: PartialEq + Send + Sync + 'static>() -> Arc<dyn Comparer<T>> {
    Arc::new(FnComparer::new(|a: &T, b: &T| a == b, |_| 0))
}

/// The build driver. Owns all cached state across build cycles.
pub struct Generator {
    revision: Revision,
    engines: EngineCache,
    config: Slot<PipelineConfig>,
    symbols: Slot<SymbolGraph>,
    has_template_files: Slot<bool>,
    sources: MemoMap<String, SourceText>,
    imports: MemoMap<String, Vec<SourceText>>,
    declarations: MemoMap<String, String>,
    project_descriptors: Slot<DescriptorSet>,
    reference_descriptors: Slot<DescriptorSet>,
    descriptors: Slot<DescriptorSet>,
    parsed: MemoMap<String, TemplateDocument>,
    first_pass: MemoMap<String, TemplateDocument>,
    second_pass: MemoMap<String, TemplateDocument>,
    outputs: MemoMap<String, GeneratedOutput>,
}

impl Default for Generator {
    fn default() -> Self {
        Self::new()
    }
}

impl Generator {
    pub fn new() -> Self {
        // A document carrying diagnostics is never cache-equal to anything:
        // diagnostics must re-report on every cycle even when the text of
        // the output is identical.
        let output_comparer: Arc<dyn Comparer<GeneratedOutput>> = Arc::new(FnComparer::new(
            |a: &GeneratedOutput, b: &GeneratedOutput| a == b && a.diagnostics.is_empty(),
            |_| 0,
        ));

        Self {
            revision: Revision::ZERO,
            engines: EngineCache::new(),
            config: Slot::new(Arc::new(ValueComparer::new())),
            symbols: Slot::new(Arc::new(ValueComparer::new())),
            has_template_files: Slot::new(Arc::new(ValueComparer::new())),
            sources: MemoMap::new(Arc::new(ValueComparer::new())),
            imports: MemoMap::new(Arc::new(ValueComparer::new())),
            declarations: MemoMap::new(Arc::new(ValueComparer::new())),
            project_descriptors: Slot::new(by_value()),
            reference_descriptors: Slot::new(by_value()),
            descriptors: Slot::new(by_value()),
            parsed: MemoMap::new(by_value()),
            first_pass: MemoMap::new(by_value()),
            second_pass: MemoMap::new(by_value()),
            outputs: MemoMap::new(output_comparer),
        }
    }

    /// Run one build cycle.
    ///
    /// An invalid configuration produces exactly one diagnostic and no
    /// outputs; a suppressed generator produces nothing at all. A per-file
    /// failure is logged and skips that file for the cycle without aborting
    /// the others. Cancellation abandons the cycle without corrupting any
    /// cached state.
    pub fn run_cycle(
        &mut self,
        inputs: &BuildInputs,
        token: &CancellationToken,
    ) -> Result<BuildOutput, Cancelled> {
        self.revision = self.revision.next();
        let revision = self.revision;
        let _span = info_span!("build_cycle", revision = %revision).entered();
        token.checkpoint()?;

        let config = self
            .config
            .ensure(revision, revision, || Ok(inputs.config.clone()))?;
        let config_changed = self.config.changed_at();

        if let Err(error) = config.validate() {
            return Ok(BuildOutput {
                outputs: Vec::new(),
                diagnostics: vec![Diagnostic::error(
                    codes::INVALID_CONFIGURATION,
                    error.to_string(),
                )],
            });
        }
        if config.suppressed {
            debug!("generation suppressed by configuration");
            return Ok(BuildOutput::default());
        }

        // Partition project items into import files and template files.
        let mut import_files = Vec::new();
        let mut templates = Vec::new();
        for source in &inputs.sources {
            if source.is_import_file() {
                import_files.push(source.clone());
            } else if source.file_kind().is_some() {
                templates.push(source.clone());
            }
        }
        templates.sort_by(|a, b| a.relative_path().cmp(b.relative_path()));

        self.has_template_files
            .ensure(revision, revision, || Ok(!templates.is_empty()))?;
        let has_files_changed = self.has_template_files.changed_at();

        let mut work = Vec::with_capacity(templates.len());
        for template in &templates {
            let path = template.relative_path().to_owned();
            self.sources
                .ensure(&path, revision, revision, || Ok(template.clone()))?;
            let applicable = applicable_imports(template, &import_files);
            self.imports
                .ensure(&path, revision, revision, || Ok(applicable.clone()))?;
            let inputs_changed_at = self
                .sources
                .changed_at(&path)
                .max(self.imports.changed_at(&path))
                .max(config_changed);
            work.push(FileWork {
                path,
                source: template.clone(),
                imports: applicable,
                inputs_changed_at,
            });
        }

        let live: HashSet<&str> = work.iter().map(|f| f.path.as_str()).collect();
        self.sources.prune(|key| live.contains(key.as_str()));
        self.imports.prune(|key| live.contains(key.as_str()));
        self.declarations.prune(|key| live.contains(key.as_str()));
        self.parsed.prune(|key| live.contains(key.as_str()));
        self.first_pass.prune(|key| live.contains(key.as_str()));
        self.second_pass.prune(|key| live.contains(key.as_str()));
        self.outputs.prune(|key| live.contains(key.as_str()));

        // Declaration pass: body and checksum suppressed, empty descriptor
        // universe. Its only consumer is symbol discovery.
        let declaration_config = {
            let mut declaration_config = (*config).clone();
            declaration_config.options.suppress_primary_body = true;
            declaration_config.options.suppress_checksum = true;
            declaration_config
        };
        let declaration_engine = self.engines.get_or_create(&declaration_config);
        let empty_universe = Arc::new(DescriptorSet::default());
        advance_files(
            &mut self.declarations,
            &work,
            revision,
            token,
            |file| file.inputs_changed_at,
            |file| {
                let document = declaration_engine
                    .process_initial_parse(file.source.clone(), file.imports.clone())?;
                let document =
                    declaration_engine.process_descriptors(&document, &empty_universe, false)?;
                let document = declaration_engine.process_remaining(&document)?;
                let output = document
                    .output()
                    .ok_or_else(|| eyre!("declaration pass produced no output"))?;
                Ok(output.code.clone())
            },
        )?;

        self.symbols
            .ensure(revision, revision, || Ok(inputs.symbols.clone()))?;
        let symbols_changed = self.symbols.changed_at();
        let declarations_changed = work
            .iter()
            .map(|f| self.declarations.changed_at(&f.path))
            .max()
            .unwrap_or(Revision::ZERO);

        // Project discovery sees the project's own declared components; this
        // is the two-phase handshake that lets a template reference a
        // component declared by a sibling template.
        let declaration_codes: Vec<String> = work
            .iter()
            .filter_map(|f| self.declarations.get(&f.path).map(|code| (**code).clone()))
            .collect();
        let project_inputs = declarations_changed
            .max(symbols_changed)
            .max(config_changed)
            .max(has_files_changed);
        let project = self.project_descriptors.ensure(project_inputs, revision, || {
            let declared = parse_declarations(&inputs.symbols.project.name, &declaration_codes);
            let mut project_crate = inputs.symbols.project.clone();
            project_crate.types.extend(declared.types);
            let graph = SymbolGraph::new(project_crate, inputs.symbols.references.clone());
            let well_known = WellKnownSymbols::resolve(&graph);
            Ok(discover_crate(&graph.project, &well_known))
        })?;

        let reference_inputs = symbols_changed.max(config_changed).max(has_files_changed);
        let references = self
            .reference_descriptors
            .ensure(reference_inputs, revision, || {
                let well_known = WellKnownSymbols::resolve(&inputs.symbols);
                let mut all = DescriptorSet::default();
                for krate in &inputs.symbols.references {
                    all.extend(discover_crate(krate, &well_known));
                }
                Ok(all)
            })?;

        // Project first, references after, concatenated without dedup.
        let universe_inputs = self
            .project_descriptors
            .changed_at()
            .max(self.reference_descriptors.changed_at());
        let universe = self.descriptors.ensure(universe_inputs, revision, || {
            let mut all = (*project).clone();
            all.extend((*references).clone());
            Ok(all)
        })?;
        let universe_changed = self.descriptors.changed_at();
        debug!(descriptors = universe.len(), "descriptor universe ready");

        let engine = self.engines.get_or_create(config.as_ref());

        advance_files(
            &mut self.parsed,
            &work,
            revision,
            token,
            |file| file.inputs_changed_at,
            |file| engine.process_initial_parse(file.source.clone(), file.imports.clone()),
        )?;

        // First descriptor pass. Its input revision deliberately ignores the
        // descriptor universe: a universe-only change must reach this
        // document through the idempotency-checked second pass, not through
        // a blind rerun here. The configuration revision is folded in
        // directly because parse-stage cutoff can hide a config change whose
        // effects only start at scope.
        let parsed = &self.parsed;
        advance_files(
            &mut self.first_pass,
            &work,
            revision,
            token,
            |file| parsed.changed_at(&file.path).max(config_changed),
            |file| {
                let document = parsed
                    .get(&file.path)
                    .ok_or_else(|| eyre!("no parsed document for '{}'", file.path))?;
                engine.process_descriptors(document, &universe, false)
            },
        )?;

        let first_pass = &self.first_pass;
        advance_files(
            &mut self.second_pass,
            &work,
            revision,
            token,
            |file| {
                first_pass
                    .changed_at(&file.path)
                    .max(universe_changed)
                    .max(config_changed)
            },
            |file| {
                let document = first_pass
                    .get(&file.path)
                    .ok_or_else(|| eyre!("no bound document for '{}'", file.path))?;
                engine.process_descriptors(document, &universe, true)
            },
        )?;

        let second_pass = &self.second_pass;
        advance_files(
            &mut self.outputs,
            &work,
            revision,
            token,
            |file| second_pass.changed_at(&file.path).max(config_changed),
            |file| {
                let document = second_pass
                    .get(&file.path)
                    .ok_or_else(|| eyre!("no checkpoint-B document for '{}'", file.path))?;
                let document = engine.process_remaining(document)?;
                let output = document
                    .output()
                    .ok_or_else(|| eyre!("emit produced no output for '{}'", file.path))?;
                Ok(output.as_ref().clone())
            },
        )?;

        let mut outputs = Vec::with_capacity(work.len());
        let mut diagnostics = Vec::new();
        for file in &work {
            if let Some(output) = self.outputs.get(&file.path) {
                diagnostics.extend(output.diagnostics.iter().cloned());
                outputs.push(Arc::clone(output));
            }
        }
        debug!(
            outputs = outputs.len(),
            diagnostics = diagnostics.len(),
            "build cycle complete"
        );
        Ok(BuildOutput {
            outputs,
            diagnostics,
        })
    }
}

/// Bring one per-file node up to date for every file of the cycle.
///
/// Stale files are recomputed in parallel; results are then applied in
/// order, so comparer cutoff and diagnostics ordering stay deterministic. A
/// failed file is logged and skipped; its slot keeps the previous value.
fn advance_files<T, I, F>(
    memo: &mut MemoMap<String, T>,
    work: &[FileWork],
    revision: Revision,
    token: &CancellationToken,
    inputs_for: I,
    compute: F,
) -> Result<(), Cancelled>
where
    T: Send,
    I: Fn(&FileWork) -> Revision,
    F: Fn(&FileWork) -> Result<T> + Sync,
{
    token.checkpoint()?;
    let stale: Vec<&FileWork> = work
        .iter()
        .filter(|file| !memo.is_fresh(&file.path, inputs_for(file)))
        .collect();

    let mut computed: HashMap<String, Result<T>> = stale
        .par_iter()
        .map(|file| {
            if token.is_cancelled() {
                return (file.path.clone(), Err(Cancelled.into()));
            }
            (file.path.clone(), compute(file))
        })
        .collect();
    // Cancellation discards everything computed this stage; slots are only
    // populated below.
    token.checkpoint()?;

    for file in work {
        match computed.remove(&file.path) {
            Some(Ok(value)) => {
                memo.ensure(&file.path, inputs_for(file), revision, move || Ok(value))?;
            }
            Some(Err(error)) => {
                warn!(path = %file.path, error = %error, "skipping file for this cycle");
            }
            // Fresh: re-verify the cached value at this revision.
            None => {
                memo.ensure(&file.path, inputs_for(file), revision, || {
                    unreachable!("slot was verified fresh")
                })?;
            }
        }
    }
    Ok(())
}

/// The import files that apply to a template: same template kind, declared
/// in the template's own directory or any ancestor, outermost first.
fn applicable_imports(template: &SourceText, import_files: &[SourceText]) -> Vec<SourceText> {
    let Some(kind) = template.file_kind() else {
        return Vec::new();
    };
    let template_dir = directory_of(template.relative_path());

    let mut applicable: Vec<&SourceText> = import_files
        .iter()
        .filter(|import| import.file_kind() == Some(kind))
        .filter(|import| {
            let import_dir = directory_of(import.relative_path());
            import_dir.is_empty()
                || template_dir == import_dir
                || template_dir.starts_with(&format!("{import_dir}/"))
        })
        .collect();
    applicable.sort_by_key(|import| directory_of(import.relative_path()).len());
    applicable.into_iter().cloned().collect()
}

fn directory_of(relative_path: &str) -> String {
    let normalized = relative_path.replace('\\', "/");
    match normalized.rsplit_once('/') {
        Some((directory, _file)) => directory.to_owned(),
        None => String::new(),
    }
}
