//! Phase 4: lower the bound tree into the IR.
//!
//! Lowering resolves the generated type's identity (namespace, name, type
//! parameters), specializes generic component references through the type
//! rewriter, and flattens plain markup back into literal text runs.

use std::path::Path;
use std::sync::Arc;

use eyre::Result;
use indexmap::IndexMap;
use vellum_core::{LanguageVersion, SourceSpan};
use vellum_descriptor::Descriptor;

use crate::{
    config::PipelineConfig,
    diagnostic::{Diagnostic, codes},
    document::TemplateDocument,
    ir::{ComponentNode, IrDocument, IrNode},
    phase::{Phase, PipelineError},
    phases::document_namespace,
    rewrite::rewrite_generic_type,
    syntax::{Attribute, Directive, Node},
};

pub struct LowerPhase {
    config: Arc<PipelineConfig>,
}

impl LowerPhase {
    pub fn new(config: Arc<PipelineConfig>) -> Self {
        Self { config }
    }
}

impl Phase for LowerPhase {
    fn name(&self) -> &'static str {
        "lower"
    }

    fn run(&self, document: &mut TemplateDocument) -> Result<()> {
        let missing = |what: &'static str| PipelineError::MissingState {
            path: document.source().path().to_owned(),
            what,
            phase: "lower",
        };
        let syntax = document.syntax().cloned().ok_or_else(|| missing("syntax tree"))?;
        let directives = document
            .directives()
            .cloned()
            .ok_or_else(|| missing("merged directives"))?;
        let bindings = document
            .bindings()
            .cloned()
            .ok_or_else(|| missing("component bindings"))?;

        let mut diagnostics = Vec::new();

        let mut namespace = None;
        let mut type_parameters = Vec::new();
        let mut preserve_whitespace = self.config.language_version < LanguageVersion::V2_0;
        for directive in directives.iter() {
            match directive {
                Directive::Namespace { value, .. } => namespace = Some(value.clone()),
                Directive::TypeParam {
                    name,
                    constraint,
                    span,
                } => {
                    let constraint = match constraint {
                        Some(c) if self.config.language_version < LanguageVersion::V3_0 => {
                            diagnostics.push(
                                Diagnostic::error(
                                    codes::CONSTRAINT_UNSUPPORTED,
                                    format!(
                                        "constrained type parameter '{name}: {c}' requires \
                                         language version {} (configured: {})",
                                        LanguageVersion::V3_0,
                                        self.config.language_version
                                    ),
                                )
                                .at(span.clone()),
                            );
                            None
                        }
                        other => other.clone(),
                    };
                    type_parameters.push((name.clone(), constraint));
                }
                Directive::PreserveWhitespace { .. } => preserve_whitespace = true,
                Directive::Import { .. } => {}
            }
        }

        let namespace = namespace.unwrap_or_else(|| {
            document_namespace(
                &self.config.root_namespace,
                document.source().relative_path(),
            )
        });
        let type_name = type_name_from_path(document.source().relative_path());

        let mut lowerer = Lowerer {
            bindings: &bindings,
            collapse: !preserve_whitespace,
            diagnostics: &mut diagnostics,
        };
        let nodes = lowerer.lower_nodes(&syntax.roots);

        document.extend_diagnostics(diagnostics);
        document.set_ir(Arc::new(IrDocument {
            namespace,
            type_name,
            type_parameters,
            preserve_whitespace,
            nodes,
        }));
        Ok(())
    }
}

fn type_name_from_path(relative_path: &str) -> String {
    let normalized = relative_path.replace('\\', "/");
    Path::new(&normalized)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(&normalized)
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect()
}

struct Lowerer<'a> {
    bindings: &'a [(SourceSpan, Descriptor)],
    collapse: bool,
    diagnostics: &'a mut Vec<Diagnostic>,
}

impl Lowerer<'_> {
    fn lower_nodes(&mut self, nodes: &[Node]) -> Vec<IrNode> {
        let mut lowered = Vec::new();
        self.lower_into(nodes, &mut lowered);
        lowered
    }

    /// Lower siblings into a shared output list, so markup runs merge
    /// across flattened plain-element boundaries.
    fn lower_into(&mut self, nodes: &[Node], lowered: &mut Vec<IrNode>) {
        for node in nodes {
            match node {
                Node::Text(text) => {
                    if self.collapse && text.trim().is_empty() {
                        continue;
                    }
                    push_markup(lowered, text);
                }
                Node::Expression { code, span } => lowered.push(IrNode::Expression {
                    code: code.clone(),
                    span: span.clone(),
                }),
                Node::Element {
                    name,
                    attributes,
                    children,
                    span,
                    ..
                } => match self.binding_for(span) {
                    Some(descriptor) => {
                        let component =
                            self.lower_component(descriptor, attributes, children, span);
                        lowered.push(IrNode::Component(component));
                    }
                    None => self.lower_plain_element(lowered, name, attributes, children),
                },
            }
        }
    }

    fn binding_for(&self, span: &SourceSpan) -> Option<Descriptor> {
        self.bindings
            .iter()
            .find(|(bound, _)| bound == span)
            .map(|(_, descriptor)| descriptor.clone())
    }

    fn lower_component(
        &mut self,
        descriptor: Descriptor,
        attributes: &[Attribute],
        children: &[Node],
        span: &SourceSpan,
    ) -> ComponentNode {
        let parameter_names: Vec<&str> = descriptor
            .type_parameters
            .iter()
            .map(|p| p.name.as_str())
            .collect();

        let mut plain_attributes = Vec::new();
        let mut argument_values: IndexMap<String, Option<String>> = descriptor
            .type_parameters
            .iter()
            .map(|p| (p.name.clone(), None))
            .collect();
        for attribute in attributes {
            if parameter_names.contains(&attribute.name.as_str()) {
                argument_values.insert(attribute.name.clone(), attribute.value.clone());
            } else {
                plain_attributes.push((
                    attribute.name.clone(),
                    attribute.value.clone().unwrap_or_else(|| "true".to_owned()),
                ));
            }
        }

        let (specialized_type, type_arguments) = if descriptor.is_generic() {
            let open_type = format!(
                "{}<{}>",
                descriptor.qualified_name,
                parameter_names.join(", ")
            );
            let (specialized, used) = rewrite_generic_type(&open_type, &argument_values);
            for binding in &used {
                if binding.content.is_none() {
                    self.diagnostics.push(
                        Diagnostic::error(
                            codes::UNBOUND_TYPE_PARAMETER,
                            format!(
                                "type parameter '{}' of component '{}' is not bound at this \
                                 usage site",
                                binding.parameter, descriptor.tag_name
                            ),
                        )
                        .at(span.clone()),
                    );
                }
            }
            (specialized, used)
        } else {
            (descriptor.qualified_name.clone(), Vec::new())
        };

        let children = self.lower_nodes(children);
        ComponentNode {
            descriptor,
            specialized_type,
            type_arguments,
            attributes: plain_attributes,
            children,
            span: span.clone(),
        }
    }

    /// A plain element flattens back into literal markup runs around its
    /// lowered children.
    fn lower_plain_element(
        &mut self,
        lowered: &mut Vec<IrNode>,
        name: &str,
        attributes: &[Attribute],
        children: &[Node],
    ) {
        let mut open = format!("<{name}");
        for attribute in attributes {
            match &attribute.value {
                Some(value) => {
                    open.push_str(&format!(" {}=\"{}\"", attribute.name, value));
                }
                None => {
                    open.push(' ');
                    open.push_str(&attribute.name);
                }
            }
        }

        if children.is_empty() {
            open.push_str(" />");
            push_markup(lowered, &open);
            return;
        }

        open.push('>');
        push_markup(lowered, &open);
        self.lower_into(children, lowered);
        push_markup(lowered, &format!("</{name}>"));
    }
}

/// Append markup text, merging into a preceding markup run.
fn push_markup(lowered: &mut Vec<IrNode>, text: &str) {
    if let Some(IrNode::Markup(run)) = lowered.last_mut() {
        run.push_str(text);
    } else {
        lowered.push(IrNode::Markup(text.to_owned()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DescriptorContext;
    use crate::phases::{BindPhase, ImportsPhase, ParsePhase};
    use vellum_core::{FileKind, SourceText};
    use vellum_descriptor::{DescriptorSet, TypeParameter};

    fn lowered(
        content: &str,
        in_scope: Vec<Descriptor>,
        version: LanguageVersion,
    ) -> TemplateDocument {
        let mut document = TemplateDocument::new(
            SourceText::new("pages/index.vlm", "pages/index.vlm", content),
            FileKind::Component,
            vec![],
        );
        let config = Arc::new(PipelineConfig::new(version, "app"));
        ParsePhase.run(&mut document).unwrap();
        ImportsPhase.run(&mut document).unwrap();
        document.set_descriptors(Arc::new(DescriptorSet::new(in_scope.clone())));
        document.set_descriptor_context(Arc::new(DescriptorContext {
            in_scope: DescriptorSet::new(in_scope),
        }));
        BindPhase::new(Arc::clone(&config)).run(&mut document).unwrap();
        LowerPhase::new(config).run(&mut document).unwrap();
        document
    }

    fn grid() -> Descriptor {
        let mut grid = Descriptor::component("app::widgets::Grid", "Grid");
        grid.type_parameters.push(TypeParameter {
            name: "TItem".into(),
            constraint: None,
        });
        grid
    }

    #[test]
    fn test_type_identity_from_path_and_directives() {
        let document = lowered("@namespace app::special\n<p>x</p>", vec![], LanguageVersion::LATEST);
        let ir = document.ir().unwrap();
        assert_eq!(ir.namespace, "app::special");
        assert_eq!(ir.type_name, "index");
    }

    #[test]
    fn test_namespace_defaults_to_path() {
        let document = lowered("<p>x</p>", vec![], LanguageVersion::LATEST);
        assert_eq!(document.ir().unwrap().namespace, "app::pages");
    }

    #[test]
    fn test_generic_component_specialization() {
        let document = lowered(
            "<Grid TItem=\"i32\" rows=\"3\"></Grid>",
            vec![grid()],
            LanguageVersion::LATEST,
        );
        let ir = document.ir().unwrap();
        let IrNode::Component(component) = &ir.nodes[0] else {
            panic!("expected component");
        };
        assert_eq!(component.specialized_type, "app::widgets::Grid<i32>");
        // The type-argument attribute is not a regular attribute.
        assert_eq!(component.attributes, vec![("rows".to_owned(), "3".to_owned())]);
        assert!(!document.has_errors());
    }

    #[test]
    fn test_unbound_type_parameter_diagnostic() {
        let document = lowered("<Grid />", vec![grid()], LanguageVersion::LATEST);
        let ir = document.ir().unwrap();
        let IrNode::Component(component) = &ir.nodes[0] else {
            panic!("expected component");
        };
        // The placeholder keeps the specialized type well-formed.
        assert_eq!(component.specialized_type, "app::widgets::Grid<object>");
        assert!(
            document
                .diagnostics()
                .any(|d| d.code == codes::UNBOUND_TYPE_PARAMETER)
        );
    }

    #[test]
    fn test_constraints_require_v3() {
        let content = "@typeparam TItem: Clone\n<p>x</p>";
        let v2 = lowered(content, vec![], LanguageVersion::V2_0);
        assert!(v2.diagnostics().any(|d| d.code == codes::CONSTRAINT_UNSUPPORTED));
        assert_eq!(v2.ir().unwrap().type_parameters, vec![("TItem".to_owned(), None)]);

        let v3 = lowered(content, vec![], LanguageVersion::V3_0);
        assert!(!v3.has_errors());
        assert_eq!(
            v3.ir().unwrap().type_parameters,
            vec![("TItem".to_owned(), Some("Clone".to_owned()))]
        );
    }

    #[test]
    fn test_markup_runs_merge_across_plain_elements() {
        // Flattened elements leave no node boundary behind.
        let document = lowered("a<b>c</b>d", vec![], LanguageVersion::LATEST);
        assert_eq!(
            document.ir().unwrap().nodes,
            vec![IrNode::Markup("a<b>c</b>d".into())]
        );

        // Components do break the run; markup resumes merging after them.
        let document = lowered(
            "<b>x</b><Grid TItem=\"i32\" /><em>y</em>z",
            vec![grid()],
            LanguageVersion::LATEST,
        );
        let ir = document.ir().unwrap();
        assert_eq!(ir.nodes.len(), 3);
        assert_eq!(ir.nodes[0], IrNode::Markup("<b>x</b>".into()));
        assert!(matches!(&ir.nodes[1], IrNode::Component(_)));
        assert_eq!(ir.nodes[2], IrNode::Markup("<em>y</em>z".into()));
    }

    #[test]
    fn test_whitespace_collapse_by_version() {
        let content = "<div>\n  <p>x</p>\n</div>";
        let modern = lowered(content, vec![], LanguageVersion::LATEST);
        let IrNode::Markup(text) = &modern.ir().unwrap().nodes[0] else {
            panic!("expected markup");
        };
        assert_eq!(text, "<div><p>x</p></div>");

        let legacy = lowered(content, vec![], LanguageVersion::V1_0);
        let IrNode::Markup(text) = &legacy.ir().unwrap().nodes[0] else {
            panic!("expected markup");
        };
        assert_eq!(text, content);

        let preserved = lowered(&format!("@preservews\n{content}"), vec![], LanguageVersion::LATEST);
        let IrNode::Markup(text) = &preserved.ir().unwrap().nodes[0] else {
            panic!("expected markup");
        };
        assert_eq!(text, content);
    }
}
