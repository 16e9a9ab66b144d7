//! Descriptor value types.

use serde::Serialize;

/// The kind of thing a descriptor describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DescriptorKind {
    /// A component type usable as a custom element.
    Component,
    /// A plain element augmentation (legacy views).
    Element,
}

/// A bindable attribute on a component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct BoundAttribute {
    /// Attribute name as written in markup.
    pub name: String,
    /// Host-language type of the bound value.
    pub type_name: String,
    /// Whether the attribute must be supplied at every usage site.
    pub required: bool,
}

/// A declared type parameter on a generic component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TypeParameter {
    /// Parameter name, e.g. `TItem`.
    pub name: String,
    /// Optional constraint clause text, e.g. `Clone`.
    pub constraint: Option<String>,
}

/// What a component accepts as child content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum ChildContentRule {
    /// Arbitrary child content.
    Any,
    /// No child content allowed.
    None,
    /// Only the named child elements are allowed.
    Restricted(Vec<String>),
}

/// An immutable description of one discoverable component.
///
/// Equality and hashing are structural. Re-discovery across edits commonly
/// produces freshly-allocated but identical descriptors; every cache and
/// short-circuit decision in the compiler depends on those comparing equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Descriptor {
    /// Fully-qualified type name, e.g. `my_app::pages::Counter`.
    pub qualified_name: String,
    /// Tag name the component is addressed by in markup.
    pub tag_name: String,
    /// Name of the crate the symbol was found in.
    pub crate_name: String,
    pub kind: DescriptorKind,
    /// Bindable attributes, in declaration order.
    pub attributes: Vec<BoundAttribute>,
    /// Type parameters, in declaration order. Order is load-bearing: generic
    /// specialization emits arguments in this order.
    pub type_parameters: Vec<TypeParameter>,
    pub children: ChildContentRule,
}

impl Descriptor {
    /// A minimal component descriptor; primarily a test convenience.
    pub fn component(qualified_name: impl Into<String>, tag_name: impl Into<String>) -> Self {
        Self {
            qualified_name: qualified_name.into(),
            tag_name: tag_name.into(),
            crate_name: String::new(),
            kind: DescriptorKind::Component,
            attributes: Vec::new(),
            type_parameters: Vec::new(),
            children: ChildContentRule::Any,
        }
    }

    /// Whether this component declares any type parameters.
    pub fn is_generic(&self) -> bool {
        !self.type_parameters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_equality_across_allocations() {
        let a = Descriptor::component("app::Counter".to_string(), "Counter");
        let b = Descriptor::component(String::from("app::Counter"), "Counter".to_string());
        assert_eq!(a, b);
    }

    #[test]
    fn test_attribute_difference_breaks_equality() {
        let a = Descriptor::component("app::Counter", "Counter");
        let mut b = a.clone();
        b.attributes.push(BoundAttribute {
            name: "count".into(),
            type_name: "i32".into(),
            required: false,
        });
        assert_ne!(a, b);
    }

    #[test]
    fn test_is_generic() {
        let mut d = Descriptor::component("app::Grid", "Grid");
        assert!(!d.is_generic());
        d.type_parameters.push(TypeParameter {
            name: "TItem".into(),
            constraint: None,
        });
        assert!(d.is_generic());
    }
}
