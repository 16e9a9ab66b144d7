//! The built-in compilation phases, in pipeline order.
//!
//! Phase structs carry no per-document state; everything a phase learns is
//! recorded on the [`TemplateDocument`](crate::TemplateDocument) it runs on.

mod bind;
mod emit;
mod imports;
mod lower;
mod parse;
mod scope;

pub use bind::BindPhase;
pub use emit::EmitPhase;
pub use imports::ImportsPhase;
pub use lower::LowerPhase;
pub use parse::ParsePhase;
pub use scope::ScopePhase;

pub(crate) use scope::document_namespace;
