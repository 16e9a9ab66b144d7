//! Phase-checkpointed compilation pipeline for the Vellum template compiler.
//!
//! One [`TemplateDocument`] carries a single template's compilation state
//! through an ordered list of phases. The [`PipelineEngine`] exposes partial
//! execution between phase indices so a build driver can checkpoint a
//! document, and the idempotency checker decides, given a new descriptor
//! universe, whether the post-checkpoint phases need to run at all.
//!
//! Phase order is fixed at engine construction:
//!
//! | index | phase | checkpoint after |
//! |---|---|---|
//! | 0 | parse | |
//! | 1 | imports | A (`CHECKPOINT_SCOPE`) |
//! | 2 | scope discovery | |
//! | 3 | bind | B (`CHECKPOINT_BIND`) |
//! | 4 | lower | |
//! | 5 | emit | C (terminal) |

mod config;
mod diagnostic;
mod document;
mod engine;
mod idempotency;
mod ir;
mod phase;
pub mod phases;
mod rewrite;
mod syntax;

pub use config::{ConfigError, GenerationOptions, PipelineConfig};
pub use diagnostic::{Diagnostic, Severity, codes};
pub use document::{DescriptorContext, GeneratedOutput, TemplateDocument};
pub use engine::{CHECKPOINT_BIND, CHECKPOINT_SCOPE, EngineCache, PipelineEngine};
pub use idempotency::ShortCircuit;
pub use ir::{ComponentNode, IrDocument, IrNode};
pub use phase::{Phase, PipelineError};
pub use rewrite::{BoundValue, DEFAULT_TYPE_PLACEHOLDER, rewrite_generic_type};
pub use syntax::{Attribute, Directive, Node, SyntaxTree, parse_template};
