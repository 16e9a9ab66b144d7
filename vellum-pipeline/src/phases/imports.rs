//! Phase 1: parse import files and merge their directives.

use std::sync::Arc;

use eyre::Result;

use crate::{
    document::TemplateDocument,
    phase::{Phase, PipelineError},
    syntax,
};

/// Parses each applicable import file and records the merged directive list:
/// import-file directives first, the document's own last, so a document's
/// own `@namespace` wins over an inherited one.
pub struct ImportsPhase;

impl Phase for ImportsPhase {
    fn name(&self) -> &'static str {
        "imports"
    }

    fn run(&self, document: &mut TemplateDocument) -> Result<()> {
        let syntax = document
            .syntax()
            .cloned()
            .ok_or_else(|| PipelineError::MissingState {
                path: document.source().path().to_owned(),
                what: "syntax tree",
                phase: self.name(),
            })?;

        let parsed: Vec<_> = document
            .imports()
            .iter()
            .map(syntax::parse_template)
            .collect();

        let mut merged = Vec::new();
        for tree in parsed {
            // Import-file diagnostics surface on every document that
            // inherits the file; their spans point at the import file.
            document.extend_diagnostics(tree.diagnostics);
            merged.extend(tree.directives);
        }
        merged.extend(syntax.directives.iter().cloned());

        document.set_directives(Arc::new(merged));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phases::ParsePhase;
    use crate::syntax::Directive;
    use vellum_core::{FileKind, SourceText};

    #[test]
    fn test_import_directives_precede_own() {
        let mut document = TemplateDocument::new(
            SourceText::new("pages/a.vlm", "pages/a.vlm", "@import own::ns\n<p>x</p>"),
            FileKind::Component,
            vec![SourceText::new(
                "_imports.vlm",
                "_imports.vlm",
                "@import shared::widgets\n",
            )],
        );
        ParsePhase.run(&mut document).unwrap();
        ImportsPhase.run(&mut document).unwrap();

        let paths: Vec<_> = document
            .directives()
            .unwrap()
            .iter()
            .map(|d| match d {
                Directive::Import { path, .. } => path.as_str(),
                _ => panic!("expected imports"),
            })
            .collect();
        assert_eq!(paths, ["shared::widgets", "own::ns"]);
    }
}
