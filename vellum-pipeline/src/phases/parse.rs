//! Phase 0: parse the template's own source.

use std::sync::Arc;

use eyre::Result;

use crate::{document::TemplateDocument, phase::Phase, syntax};

/// Parses the document's source text into a syntax tree. Parse problems
/// become diagnostics; the tree is always produced.
pub struct ParsePhase;

impl Phase for ParsePhase {
    fn name(&self) -> &'static str {
        "parse"
    }

    fn run(&self, document: &mut TemplateDocument) -> Result<()> {
        let tree = syntax::parse_template(document.source());
        document.extend_diagnostics(tree.diagnostics.iter().cloned());
        document.set_syntax(Arc::new(tree));
        Ok(())
    }
}
