//! Descriptor discovery over a symbol graph.

use tracing::debug;

use crate::{
    BoundAttribute, ChildContentRule, CrateSymbol, Descriptor, DescriptorKind, DescriptorSet,
    TypeParameter, TypeSymbol, WellKnownSymbols,
};

/// Discover the descriptors declared by one crate.
///
/// Results preserve declaration order; callers concatenate per-crate results
/// without deduplication, so the full descriptor universe keeps a stable,
/// discovery-ordered shape across cycles.
pub fn discover_crate(krate: &CrateSymbol, well_known: &WellKnownSymbols) -> DescriptorSet {
    if !well_known.supports_components() {
        return DescriptorSet::default();
    }

    let set: DescriptorSet = krate
        .types
        .iter()
        .filter(|ty| ty.is_component && !ty.hidden)
        .map(|ty| descriptor_from_symbol(krate, ty))
        .collect();

    debug!(
        crate_name = %krate.name,
        descriptors = set.len(),
        "discovered component descriptors"
    );
    set
}

fn descriptor_from_symbol(krate: &CrateSymbol, ty: &TypeSymbol) -> Descriptor {
    let tag_name = ty
        .qualified_name
        .rsplit("::")
        .next()
        .unwrap_or(&ty.qualified_name)
        .to_owned();

    Descriptor {
        qualified_name: ty.qualified_name.clone(),
        tag_name,
        crate_name: krate.name.clone(),
        kind: DescriptorKind::Component,
        attributes: ty
            .parameters
            .iter()
            .map(|p| BoundAttribute {
                name: p.name.clone(),
                type_name: p.type_name.clone(),
                required: p.required,
            })
            .collect(),
        type_parameters: ty
            .type_parameters
            .iter()
            .map(|(name, constraint)| TypeParameter {
                name: name.clone(),
                constraint: constraint.clone(),
            })
            .collect(),
        children: match &ty.restricted_children {
            Some(names) if names.is_empty() => ChildContentRule::None,
            Some(names) => ChildContentRule::Restricted(names.clone()),
            None => ChildContentRule::Any,
        },
    }
}

/// Recover component symbols from this build's own generated declaration
/// code, so templates can reference components declared by sibling templates.
///
/// Declaration output carries one marker impl per component:
///
/// ```text
/// impl vellum::Component for my_app::pages::Counter {}
/// impl<TItem> vellum::Component for my_app::pages::Grid<TItem> {}
/// ```
///
/// This is the declaration-only half of the two-phase handshake; the symbols
/// it yields feed back into project-level discovery without forming a graph
/// cycle.
pub fn parse_declarations(crate_name: &str, declarations: &[String]) -> CrateSymbol {
    const MARKER: &str = "vellum::Component for ";

    let mut types = Vec::new();
    for code in declarations {
        for line in code.lines() {
            let Some(at) = line.find(MARKER) else {
                continue;
            };
            let target = line[at + MARKER.len()..]
                .trim()
                .trim_end_matches(['{', '}'])
                .trim();

            let (qualified_name, type_parameters) = match target.split_once('<') {
                Some((name, args)) => {
                    let params = args
                        .trim_end_matches('>')
                        .split(',')
                        .map(|p| (p.trim().to_owned(), None))
                        .filter(|(p, _)| !p.is_empty())
                        .collect();
                    (name.trim().to_owned(), params)
                }
                None => (target.to_owned(), Vec::new()),
            };

            if qualified_name.is_empty() {
                continue;
            }

            types.push(TypeSymbol {
                qualified_name,
                is_component: true,
                parameters: Vec::new(),
                type_parameters,
                restricted_children: None,
                hidden: false,
            });
        }
    }

    CrateSymbol::new(crate_name, types)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ParameterSymbol, SymbolGraph};

    fn graph_with(types: Vec<TypeSymbol>) -> SymbolGraph {
        SymbolGraph::new(CrateSymbol::new("app", types), vec![])
    }

    #[test]
    fn test_discover_skips_hidden_and_non_components() {
        let mut hidden = TypeSymbol::component("app::Secret");
        hidden.hidden = true;
        let plain = TypeSymbol {
            qualified_name: "app::Helper".into(),
            is_component: false,
            parameters: Vec::new(),
            type_parameters: Vec::new(),
            restricted_children: None,
            hidden: false,
        };
        let graph = graph_with(vec![
            TypeSymbol::component("app::Counter"),
            hidden,
            plain,
        ]);
        let well_known = WellKnownSymbols::resolve(&graph);

        let set = discover_crate(&graph.project, &well_known);
        assert_eq!(set.len(), 1);
        assert_eq!(set.iter().next().unwrap().tag_name, "Counter");
    }

    #[test]
    fn test_discover_carries_parameters_in_order() {
        let mut counter = TypeSymbol::component("app::Counter");
        counter.parameters = vec![
            ParameterSymbol {
                name: "count".into(),
                type_name: "i32".into(),
                required: true,
            },
            ParameterSymbol {
                name: "label".into(),
                type_name: "String".into(),
                required: false,
            },
        ];
        let graph = graph_with(vec![counter]);
        let well_known = WellKnownSymbols::resolve(&graph);

        let set = discover_crate(&graph.project, &well_known);
        let descriptor = set.iter().next().unwrap();
        let names: Vec<_> = descriptor.attributes.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["count", "label"]);
    }

    #[test]
    fn test_discover_is_deterministic() {
        let graph = graph_with(vec![
            TypeSymbol::component("app::A"),
            TypeSymbol::component("app::B"),
        ]);
        let well_known = WellKnownSymbols::resolve(&graph);

        let first = discover_crate(&graph.project, &well_known);
        let second = discover_crate(&graph.project, &well_known);
        // Freshly-allocated but structurally identical.
        assert_eq!(first, second);
    }

    #[test]
    fn test_parse_declarations() {
        let code = vec![
            "pub struct Counter;\n\nimpl vellum::Component for my_app::pages::Counter {}\n"
                .to_owned(),
            "impl<TItem> vellum::Component for my_app::pages::Grid<TItem> {}\n".to_owned(),
        ];
        let krate = parse_declarations("my_app", &code);
        assert_eq!(krate.types.len(), 2);
        assert_eq!(krate.types[0].qualified_name, "my_app::pages::Counter");
        assert!(krate.types[0].type_parameters.is_empty());
        assert_eq!(krate.types[1].qualified_name, "my_app::pages::Grid");
        assert_eq!(krate.types[1].type_parameters[0].0, "TItem");
    }

    #[test]
    fn test_parse_declarations_ignores_unrelated_lines() {
        let code = vec!["fn main() {}\nlet x = 1;\n".to_owned()];
        let krate = parse_declarations("my_app", &code);
        assert!(krate.types.is_empty());
    }
}
