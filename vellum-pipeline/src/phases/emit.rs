//! Phase 5: emit generated source code.
//!
//! Output always opens with the auto-generated banner and, unless
//! suppressed, a checksum line binding the output to the exact source text
//! it was generated from. The component marker impl is load-bearing: the
//! declaration-only pass is parsed back by symbol discovery, so its shape
//! must stay in sync with that parser.

use std::fmt::Write as _;
use std::sync::Arc;

use eyre::Result;
use sha2::{Digest, Sha256};
use vellum_core::generated_file_name;

use crate::{
    config::PipelineConfig,
    document::{GeneratedOutput, TemplateDocument},
    ir::IrNode,
    phase::{Phase, PipelineError},
};

pub struct EmitPhase {
    config: Arc<PipelineConfig>,
}

impl EmitPhase {
    pub fn new(config: Arc<PipelineConfig>) -> Self {
        Self { config }
    }
}

impl Phase for EmitPhase {
    fn name(&self) -> &'static str {
        "emit"
    }

    fn run(&self, document: &mut TemplateDocument) -> Result<()> {
        let ir = document
            .ir()
            .cloned()
            .ok_or_else(|| PipelineError::MissingState {
                path: document.source().path().to_owned(),
                what: "lowered document",
                phase: self.name(),
            })?;

        let mut code = String::from("// <auto-generated/>\n");
        if !self.config.options.suppress_checksum {
            let _ = writeln!(
                code,
                "// checksum \"sha256:{}\" \"{}\"",
                hex_digest(document.source().content()),
                document.source().relative_path()
            );
        }
        code.push('\n');

        let generics = generics_decl(&ir.type_parameters);
        let arguments = generics_args(&ir.type_parameters);
        if ir.type_parameters.is_empty() {
            let _ = writeln!(code, "pub struct {};", ir.type_name);
        } else {
            let phantom = ir
                .type_parameters
                .iter()
                .map(|(name, _)| name.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            let _ = writeln!(
                code,
                "pub struct {}{generics}(std::marker::PhantomData<({phantom})>);",
                ir.type_name
            );
        }
        let _ = writeln!(
            code,
            "\nimpl{generics} vellum::Component for {}::{}{arguments} {{}}",
            ir.namespace, ir.type_name
        );

        if !self.config.options.suppress_primary_body {
            let _ = writeln!(code, "\nimpl{generics} {}{arguments} {{", ir.type_name);
            code.push_str("    pub fn render(&self, __output: &mut String) {\n");
            emit_nodes(&mut code, &ir.nodes, 2);
            code.push_str("    }\n}\n");
        }

        document.set_output(Arc::new(GeneratedOutput {
            identifier: generated_file_name(document.source().relative_path()),
            code,
            diagnostics: document.collect_diagnostics(),
        }));
        Ok(())
    }
}

fn emit_nodes(code: &mut String, nodes: &[IrNode], depth: usize) {
    let indent = "    ".repeat(depth);
    for node in nodes {
        match node {
            IrNode::Markup(text) => {
                let _ = writeln!(code, "{indent}__output.push_str(\"{}\");", escape(text));
            }
            IrNode::Expression { code: expr, .. } => {
                let _ = writeln!(code, "{indent}__output.push_str(&({expr}).to_string());");
            }
            IrNode::Component(component) => {
                let attributes = component
                    .attributes
                    .iter()
                    .map(|(name, value)| format!("(\"{}\", \"{}\")", escape(name), escape(value)))
                    .collect::<Vec<_>>()
                    .join(", ");
                let _ = writeln!(
                    code,
                    "{indent}vellum::render::<{}>(__output, &[{attributes}], |__output| {{",
                    component.specialized_type
                );
                emit_nodes(code, &component.children, depth + 1);
                let _ = writeln!(code, "{indent}}});");
            }
        }
    }
}

fn generics_decl(type_parameters: &[(String, Option<String>)]) -> String {
    if type_parameters.is_empty() {
        return String::new();
    }
    let inner = type_parameters
        .iter()
        .map(|(name, constraint)| match constraint {
            Some(constraint) => format!("{name}: {constraint}"),
            None => name.clone(),
        })
        .collect::<Vec<_>>()
        .join(", ");
    format!("<{inner}>")
}

/// Bare parameter names only; the declaration parser splits this list on
/// commas.
fn generics_args(type_parameters: &[(String, Option<String>)]) -> String {
    if type_parameters.is_empty() {
        return String::new();
    }
    let inner = type_parameters
        .iter()
        .map(|(name, _)| name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    format!("<{inner}>")
}

fn hex_digest(content: &str) -> String {
    Sha256::digest(content.as_bytes())
        .iter()
        .fold(String::with_capacity(64), |mut hex, byte| {
            let _ = write!(hex, "{byte:02x}");
            hex
        })
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GenerationOptions;
    use crate::ir::IrDocument;
    use vellum_core::{FileKind, LanguageVersion, SourceSpan, SourceText};
    use vellum_descriptor::Descriptor;

    fn emit(ir: IrDocument, options: GenerationOptions) -> GeneratedOutput {
        let mut document = TemplateDocument::new(
            SourceText::new("pages/index.vlm", "pages/index.vlm", "<p>hi</p>"),
            FileKind::Component,
            vec![],
        );
        document.set_ir(Arc::new(ir));
        let config = Arc::new(
            PipelineConfig::new(LanguageVersion::LATEST, "app").with_options(options),
        );
        EmitPhase::new(config).run(&mut document).unwrap();
        document.output().unwrap().as_ref().clone()
    }

    fn plain_ir() -> IrDocument {
        IrDocument {
            namespace: "app::pages".into(),
            type_name: "index".into(),
            type_parameters: vec![],
            preserve_whitespace: false,
            nodes: vec![IrNode::Markup("<p>hi</p>".into())],
        }
    }

    #[test]
    fn test_output_identifier_and_banner() {
        let output = emit(plain_ir(), GenerationOptions::default());
        assert_eq!(output.identifier, "pages_index_vlm.g.rs");
        assert!(output.code.starts_with("// <auto-generated/>\n// checksum \"sha256:"));
        assert!(output.code.contains("impl vellum::Component for app::pages::index {}"));
        assert!(output.code.contains("pub fn render"));
    }

    #[test]
    fn test_checksum_suppression() {
        let output = emit(
            plain_ir(),
            GenerationOptions {
                suppress_checksum: true,
                ..Default::default()
            },
        );
        assert!(!output.code.contains("checksum"));
    }

    #[test]
    fn test_declaration_only_output() {
        let output = emit(
            plain_ir(),
            GenerationOptions {
                suppress_primary_body: true,
                ..Default::default()
            },
        );
        assert!(output.code.contains("impl vellum::Component for app::pages::index {}"));
        assert!(!output.code.contains("pub fn render"));
    }

    #[test]
    fn test_generic_marker_roundtrips_through_discovery() {
        let mut ir = plain_ir();
        ir.type_name = "Grid".into();
        ir.type_parameters = vec![("TItem".into(), Some("Clone".into()))];
        let output = emit(ir, GenerationOptions::default());
        assert!(
            output.code.contains(
                "impl<TItem: Clone> vellum::Component for app::pages::Grid<TItem> {}"
            )
        );

        let krate =
            vellum_descriptor::parse_declarations("app", std::slice::from_ref(&output.code));
        assert_eq!(krate.types.len(), 1);
        assert_eq!(krate.types[0].qualified_name, "app::pages::Grid");
        assert_eq!(krate.types[0].type_parameters, vec![("TItem".to_owned(), None)]);
    }

    #[test]
    fn test_component_invocation_with_children() {
        let mut ir = plain_ir();
        ir.nodes = vec![IrNode::Component(crate::ir::ComponentNode {
            descriptor: Descriptor::component("app::Counter", "Counter"),
            specialized_type: "app::Counter".into(),
            type_arguments: vec![],
            attributes: vec![("count".into(), "3".into())],
            children: vec![IrNode::Markup("<b>inner</b>".into())],
            span: SourceSpan::new("pages/index.vlm", 0, 0),
        })];
        let output = emit(ir, GenerationOptions::default());
        assert!(output.code.contains(
            "vellum::render::<app::Counter>(__output, &[(\"count\", \"3\")], |__output| {"
        ));
        assert!(output.code.contains("__output.push_str(\"<b>inner</b>\");"));
    }
}
