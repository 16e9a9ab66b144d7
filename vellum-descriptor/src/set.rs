//! Discovery-ordered descriptor collections.

use std::collections::HashMap;

use serde::Serialize;

use crate::Descriptor;

/// An ordered collection of descriptors.
///
/// Order is discovery order and is preserved because diagnostics ordering
/// depends on it. Equality comes in two flavors:
///
/// - the derived [`PartialEq`] is *sequence* equality, used by graph-node
///   comparers that want the cheapest faithful check;
/// - [`same_elements`](DescriptorSet::same_elements) is unordered value-set
///   equality, used by the idempotency checker, where two discoveries that
///   merely enumerate in a different order must not force a rebind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DescriptorSet {
    descriptors: Vec<Descriptor>,
}

impl DescriptorSet {
    pub fn new(descriptors: Vec<Descriptor>) -> Self {
        Self { descriptors }
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Descriptor> {
        self.descriptors.iter()
    }

    pub fn contains(&self, descriptor: &Descriptor) -> bool {
        self.descriptors.contains(descriptor)
    }

    /// Append another set, keeping its order. Duplicates are kept: sources
    /// are concatenated, never merged.
    pub fn extend(&mut self, other: DescriptorSet) {
        self.descriptors.extend(other.descriptors);
    }

    /// Unordered multiset equality.
    pub fn same_elements(&self, other: &DescriptorSet) -> bool {
        if self.descriptors.len() != other.descriptors.len() {
            return false;
        }
        counted(&self.descriptors) == counted(&other.descriptors)
    }

    /// Whether every descriptor in `other` is present in `self`.
    ///
    /// This is the content-based "no removals" check: a length comparison is
    /// not a substitute, because one removal plus one addition preserves
    /// length while changing content.
    pub fn contains_all(&self, other: &DescriptorSet) -> bool {
        let have = counted(&self.descriptors);
        let want = counted(&other.descriptors);
        want.iter()
            .all(|(d, n)| have.get(d).is_some_and(|m| m >= n))
    }
}

fn counted(descriptors: &[Descriptor]) -> HashMap<&Descriptor, usize> {
    let mut counts = HashMap::with_capacity(descriptors.len());
    for d in descriptors {
        *counts.entry(d).or_insert(0) += 1;
    }
    counts
}

impl FromIterator<Descriptor> for DescriptorSet {
    fn from_iter<I: IntoIterator<Item = Descriptor>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a DescriptorSet {
    type Item = &'a Descriptor;
    type IntoIter = std::slice::Iter<'a, Descriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.descriptors.iter()
    }
}
