//! Per-cycle build inputs.

use vellum_core::SourceText;
use vellum_descriptor::SymbolGraph;
use vellum_pipeline::PipelineConfig;

/// Everything one build cycle reads.
///
/// The host assembles this fresh on every invocation; the generator decides
/// internally what actually changed since the previous cycle.
#[derive(Debug, Clone)]
pub struct BuildInputs {
    /// Every project item. Non-template items are ignored; import files are
    /// recognized by their conventional names.
    pub sources: Vec<SourceText>,
    pub config: PipelineConfig,
    /// Symbol snapshot of the host compilation and its references.
    pub symbols: SymbolGraph,
}

impl BuildInputs {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            sources: Vec::new(),
            config,
            symbols: SymbolGraph::default(),
        }
    }

    pub fn with_sources(mut self, sources: Vec<SourceText>) -> Self {
        self.sources = sources;
        self
    }

    pub fn with_symbols(mut self, symbols: SymbolGraph) -> Self {
        self.symbols = symbols;
        self
    }
}
