//! Phase 2: scope discovery.
//!
//! Filters the recorded descriptor universe down to the subset reachable
//! from the document: descriptors whose namespace appears in the merged
//! `@import` directives, plus the document's own derived namespace. This
//! phase records no diagnostics and is safe to re-run in isolation, which
//! the idempotency check relies on.

use std::sync::Arc;

use eyre::Result;

use crate::{
    config::PipelineConfig,
    document::{DescriptorContext, TemplateDocument},
    phase::{Phase, PipelineError},
    syntax::Directive,
};

pub struct ScopePhase {
    config: Arc<PipelineConfig>,
}

impl ScopePhase {
    pub fn new(config: Arc<PipelineConfig>) -> Self {
        Self { config }
    }
}

impl Phase for ScopePhase {
    fn name(&self) -> &'static str {
        "scope"
    }

    fn run(&self, document: &mut TemplateDocument) -> Result<()> {
        let descriptors = document
            .descriptors()
            .cloned()
            .ok_or_else(|| PipelineError::MissingState {
                path: document.source().path().to_owned(),
                what: "descriptor set",
                phase: self.name(),
            })?;
        let directives = document
            .directives()
            .cloned()
            .ok_or_else(|| PipelineError::MissingState {
                path: document.source().path().to_owned(),
                what: "merged directives",
                phase: self.name(),
            })?;

        let mut namespaces: Vec<&str> = directives
            .iter()
            .filter_map(|d| match d {
                Directive::Import { path, .. } => Some(path.as_str()),
                _ => None,
            })
            .collect();
        let own = document_namespace(
            &self.config.root_namespace,
            document.source().relative_path(),
        );
        namespaces.push(&own);

        let in_scope = descriptors
            .iter()
            .filter(|d| namespaces.contains(&namespace_of(&d.qualified_name)))
            .cloned()
            .collect();
        document.set_descriptor_context(Arc::new(DescriptorContext { in_scope }));
        Ok(())
    }
}

fn namespace_of(qualified_name: &str) -> &str {
    qualified_name
        .rsplit_once("::")
        .map(|(namespace, _)| namespace)
        .unwrap_or("")
}

/// The namespace a template's generated type lives in: the root namespace
/// plus one segment per directory of the relative path.
pub(crate) fn document_namespace(root_namespace: &str, relative_path: &str) -> String {
    let mut namespace = root_namespace.to_owned();
    let path = relative_path.replace('\\', "/");
    if let Some((directories, _file)) = path.rsplit_once('/') {
        for component in directories.split('/').filter(|c| !c.is_empty()) {
            namespace.push_str("::");
            namespace.extend(
                component
                    .chars()
                    .map(|c| if c.is_alphanumeric() { c } else { '_' }),
            );
        }
    }
    namespace
}
