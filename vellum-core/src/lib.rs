//! Core types and utilities for the Vellum template compiler.
//!
//! This crate provides the fundamental types shared across the Vellum
//! workspace: source text snapshots, spans, template file kinds, language
//! versions, and generated-output identifiers.

mod ident;
mod source;
mod version;

// Generated-output naming
pub use ident::{generated_file_name, identifier_from_path};
// Source model
pub use source::{FileKind, SourceSpan, SourceText};
pub use version::{LanguageVersion, VersionError};
