//! In-memory symbol graph for the enclosing compilation.
//!
//! Symbol/type resolution against a real host compilation is a collaborator
//! the compiler only observes through this model: a read-only snapshot of
//! the types declared by the project and each referenced crate. Nothing in
//! the pipeline mutates a [`SymbolGraph`]; all discovery and rewriting
//! computations share it.

/// A bindable parameter declared on a component type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParameterSymbol {
    pub name: String,
    pub type_name: String,
    pub required: bool,
}

/// A type declared in some crate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeSymbol {
    /// Fully-qualified name, e.g. `my_app::pages::Counter`.
    pub qualified_name: String,
    /// Whether the type implements the component marker trait.
    pub is_component: bool,
    /// Bindable parameters, in declaration order.
    pub parameters: Vec<ParameterSymbol>,
    /// Declared type parameters with optional constraint text.
    pub type_parameters: Vec<(String, Option<String>)>,
    /// Names of child elements the type restricts its content to, if any.
    pub restricted_children: Option<Vec<String>>,
    /// Hidden types are skipped by discovery (editor-hidden components).
    pub hidden: bool,
}

impl TypeSymbol {
    pub fn component(qualified_name: impl Into<String>) -> Self {
        Self {
            qualified_name: qualified_name.into(),
            is_component: true,
            parameters: Vec::new(),
            type_parameters: Vec::new(),
            restricted_children: None,
            hidden: false,
        }
    }
}

/// All types declared by one crate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CrateSymbol {
    pub name: String,
    pub types: Vec<TypeSymbol>,
}

impl CrateSymbol {
    pub fn new(name: impl Into<String>, types: Vec<TypeSymbol>) -> Self {
        Self {
            name: name.into(),
            types,
        }
    }
}

/// The symbol graph for the enclosing compilation and its references.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SymbolGraph {
    /// The project's own crate.
    pub project: CrateSymbol,
    /// Referenced crates, in reference order.
    pub references: Vec<CrateSymbol>,
}

impl SymbolGraph {
    pub fn new(project: CrateSymbol, references: Vec<CrateSymbol>) -> Self {
        Self {
            project,
            references,
        }
    }
}

/// Marker symbols discovery keys off, resolved once per symbol graph and
/// passed by value wherever they are needed. There is no global cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WellKnownSymbols {
    /// The component marker trait, if the graph can see it at all.
    pub component_marker: Option<String>,
    /// The child-content callback type.
    pub child_content: Option<String>,
}

impl WellKnownSymbols {
    /// Qualified name of the component marker trait.
    pub const COMPONENT_MARKER: &'static str = "vellum::Component";
    /// Qualified name of the child-content callback type.
    pub const CHILD_CONTENT: &'static str = "vellum::ChildContent";

    /// Resolve the well-known symbols against a graph. A marker resolves when
    /// any crate in the graph declares a component; graphs with no component
    /// support simply yield no descriptors.
    pub fn resolve(graph: &SymbolGraph) -> Self {
        let any_component = std::iter::once(&graph.project)
            .chain(&graph.references)
            .flat_map(|krate| &krate.types)
            .any(|ty| ty.is_component);

        Self {
            component_marker: any_component.then(|| Self::COMPONENT_MARKER.to_owned()),
            child_content: any_component.then(|| Self::CHILD_CONTENT.to_owned()),
        }
    }

    /// Whether component discovery is possible at all under this bundle.
    pub fn supports_components(&self) -> bool {
        self.component_marker.is_some()
    }
}
