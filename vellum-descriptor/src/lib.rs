//! Component descriptor model and discovery for the Vellum template compiler.
//!
//! A *descriptor* is an immutable, structurally-compared value describing one
//! component usable inside templates: its qualified name, bindable
//! attributes, type parameters, and child-content rules. Descriptors are
//! re-discovered on every build cycle, so equality is value equality, never
//! allocation identity: two discoveries of an unchanged compilation must
//! produce descriptors that compare equal.
//!
//! # Architecture
//!
//! ```text
//! SymbolGraph (host compilation + references) → discovery → DescriptorSet → pipeline
//! ```

mod descriptor;
mod discovery;
mod set;
mod symbols;

pub use descriptor::{BoundAttribute, ChildContentRule, Descriptor, DescriptorKind, TypeParameter};
pub use discovery::{discover_crate, parse_declarations};
pub use set::DescriptorSet;
pub use symbols::{CrateSymbol, ParameterSymbol, SymbolGraph, TypeSymbol, WellKnownSymbols};
