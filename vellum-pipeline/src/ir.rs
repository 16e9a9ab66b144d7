//! Intermediate representation of a lowered template.

use vellum_core::SourceSpan;
use vellum_descriptor::Descriptor;

use crate::rewrite::BoundValue;

/// One node of the lowered document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IrNode {
    /// Literal markup, possibly whitespace-collapsed.
    Markup(String),
    /// A host-language expression whose value is written to the output.
    Expression { code: String, span: SourceSpan },
    /// A bound component reference.
    Component(ComponentNode),
}

/// A component usage site, fully bound to its descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentNode {
    pub descriptor: Descriptor,
    /// The component's type reference with type parameters substituted at
    /// this usage site, e.g. `app::Grid<i32>`.
    pub specialized_type: String,
    /// Bindings consumed by specialization, in declared parameter order.
    pub type_arguments: Vec<BoundValue>,
    /// Attribute assignments in source order, minus type-argument attributes.
    pub attributes: Vec<(String, String)>,
    pub children: Vec<IrNode>,
    pub span: SourceSpan,
}

/// The lowered form of one template document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrDocument {
    /// Namespace the generated type lives in.
    pub namespace: String,
    /// Name of the generated type.
    pub type_name: String,
    /// Type parameters declared by `@typeparam`, with constraints.
    pub type_parameters: Vec<(String, Option<String>)>,
    /// Whether insignificant whitespace is preserved in output.
    pub preserve_whitespace: bool,
    pub nodes: Vec<IrNode>,
}
