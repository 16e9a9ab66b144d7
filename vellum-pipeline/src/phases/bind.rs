//! Phase 3: bind component tags to in-scope descriptors.
//!
//! A tag whose name starts with an uppercase letter is a component
//! reference. Binding matches it against the document's descriptor context,
//! records the match for lowering, and tracks the distinct set of referenced
//! descriptors; that set feeds the idempotency checker's additions-only
//! decision on later cycles.

use std::sync::Arc;

use eyre::Result;
use vellum_core::SourceSpan;
use vellum_descriptor::{Descriptor, DescriptorSet};

use crate::{
    config::PipelineConfig,
    diagnostic::{Diagnostic, codes},
    document::TemplateDocument,
    phase::{Phase, PipelineError},
    syntax::{Attribute, Node},
};

pub struct BindPhase {
    config: Arc<PipelineConfig>,
}

impl BindPhase {
    pub fn new(config: Arc<PipelineConfig>) -> Self {
        Self { config }
    }

    fn is_component_name(&self, name: &str) -> bool {
        let Some(first) = name.chars().next() else {
            return false;
        };
        if self.config.options.support_localized_names {
            first.is_uppercase()
        } else {
            first.is_ascii_uppercase()
        }
    }
}

impl Phase for BindPhase {
    fn name(&self) -> &'static str {
        "bind"
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
        let context = document
            .descriptor_context()
            .cloned()
            .ok_or_else(|| PipelineError::MissingState {
                path: document.source().path().to_owned(),
                what: "descriptor context",
                phase: self.name(),
            })?;

        let mut binder = Binder {
            phase: self,
            in_scope: &context.in_scope,
            bindings: Vec::new(),
            referenced: Vec::new(),
            diagnostics: Vec::new(),
        };
        binder.visit(&syntax.roots);

        let Binder {
            bindings,
            referenced,
            diagnostics,
            ..
        } = binder;
        document.extend_diagnostics(diagnostics);
        document.set_bindings(Arc::new(bindings));
        document.set_referenced_descriptors(Arc::new(DescriptorSet::new(referenced)));
        Ok(())
    }
}

struct Binder<'a> {
    phase: &'a BindPhase,
    in_scope: &'a DescriptorSet,
    bindings: Vec<(SourceSpan, Descriptor)>,
    referenced: Vec<Descriptor>,
    diagnostics: Vec<Diagnostic>,
}

impl Binder<'_> {
    fn visit(&mut self, nodes: &[Node]) {
        for node in nodes {
            let Node::Element {
                name,
                attributes,
                children,
                span,
                ..
            } = node
            else {
                continue;
            };

            if self.phase.is_component_name(name) {
                match self.in_scope.iter().find(|d| d.tag_name == *name) {
                    Some(descriptor) => {
                        self.check_required_attributes(descriptor, attributes, span);
                        self.bindings.push((span.clone(), descriptor.clone()));
                        if !self.referenced.contains(descriptor) {
                            self.referenced.push(descriptor.clone());
                        }
                    }
                    None => {
                        self.diagnostics.push(
                            Diagnostic::error(
                                codes::UNRESOLVED_COMPONENT,
                                format!(
                                    "component '{name}' does not resolve to any in-scope \
                                     component; is its namespace imported?"
                                ),
                            )
                            .at(span.clone()),
                        );
                    }
                }
            }

            self.visit(children);
        }
    }

    fn check_required_attributes(
        &mut self,
        descriptor: &Descriptor,
        attributes: &[Attribute],
        span: &SourceSpan,
    ) {
        for bound in descriptor.attributes.iter().filter(|a| a.required) {
            if !attributes.iter().any(|a| a.name == bound.name) {
                self.diagnostics.push(
                    Diagnostic::error(
                        codes::MISSING_REQUIRED_ATTRIBUTE,
                        format!(
                            "component '{}' requires attribute '{}'",
                            descriptor.tag_name, bound.name
                        ),
                    )
                    .at(span.clone()),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DescriptorContext;
    use crate::phases::{ImportsPhase, ParsePhase};
    use vellum_core::{FileKind, LanguageVersion, SourceText};
    use vellum_descriptor::BoundAttribute;

    fn bound_document(content: &str, in_scope: Vec<Descriptor>) -> TemplateDocument {
        let mut document = TemplateDocument::new(
            SourceText::new("a.vlm", "a.vlm", content),
            FileKind::Component,
            vec![],
        );
        ParsePhase.run(&mut document).unwrap();
        ImportsPhase.run(&mut document).unwrap();
        document.set_descriptors(Arc::new(DescriptorSet::new(in_scope.clone())));
        document.set_descriptor_context(Arc::new(DescriptorContext {
            in_scope: DescriptorSet::new(in_scope),
        }));
        let config = Arc::new(PipelineConfig::new(LanguageVersion::LATEST, "app"));
        BindPhase::new(config).run(&mut document).unwrap();
        document
    }

    #[test]
    fn test_binds_component_tags() {
        let document = bound_document(
            "<div><Counter count=\"1\" /><Counter count=\"2\" /></div>",
            vec![Descriptor::component("app::Counter", "Counter")],
        );
        assert_eq!(document.bindings().unwrap().len(), 2);
        // Referenced descriptors are distinct.
        assert_eq!(document.referenced_descriptors().unwrap().len(), 1);
        assert!(!document.has_errors());
    }

    #[test]
    fn test_unresolved_component_diagnostic() {
        let document = bound_document("<Widget />", vec![]);
        assert!(document.bindings().unwrap().is_empty());
        let diagnostics: Vec<_> = document.diagnostics().collect();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, codes::UNRESOLVED_COMPONENT);
    }

    #[test]
    fn test_lowercase_tags_are_markup() {
        let document = bound_document(
            "<counter />",
            vec![Descriptor::component("app::Counter", "Counter")],
        );
        assert!(document.bindings().unwrap().is_empty());
        assert!(!document.has_errors());
    }

    #[test]
    fn test_missing_required_attribute() {
        let mut counter = Descriptor::component("app::Counter", "Counter");
        counter.attributes.push(BoundAttribute {
            name: "count".into(),
            type_name: "i32".into(),
            required: true,
        });
        let document = bound_document("<Counter />", vec![counter]);
        let diagnostics: Vec<_> = document.diagnostics().collect();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, codes::MISSING_REQUIRED_ATTRIBUTE);
    }
}
