//! Incremental build driver for the Vellum template compiler.
//!
//! The host build hands the [`Generator`] a fresh [`BuildInputs`] snapshot
//! on every invocation; the generator re-derives all generated output while
//! reusing every cached computation whose inputs did not change. See
//! `vellum-graph` for the caching model and `vellum-pipeline` for what runs
//! per file.

mod generator;
mod inputs;

pub use generator::{BuildOutput, Generator};
pub use inputs::BuildInputs;
