//! Diagnostic types for the compilation pipeline.

use serde::Serialize;
use vellum_core::SourceSpan;

/// Stable diagnostic codes. Codes never change meaning across releases; the
/// host build matches on them.
pub mod codes {
    /// Malformed template syntax (unclosed tag, bad directive).
    pub const PARSE_ERROR: &str = "VLM0001";
    /// A component tag did not resolve to any in-scope descriptor.
    pub const UNRESOLVED_COMPONENT: &str = "VLM0002";
    /// The pipeline configuration itself is invalid.
    pub const INVALID_CONFIGURATION: &str = "VLM0003";
    /// A required attribute was not supplied at a usage site.
    pub const MISSING_REQUIRED_ATTRIBUTE: &str = "VLM0004";
    /// Constrained type parameters require language version 3.0.
    pub const CONSTRAINT_UNSUPPORTED: &str = "VLM0005";
    /// A generic component usage left a type parameter unbound.
    pub const UNBOUND_TYPE_PARAMETER: &str = "VLM0006";
}

/// Severity level for a diagnostic message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Severity {
    /// A fatal error in the template; generation still proceeds best-effort.
    Error,
    /// A warning that doesn't prevent generation.
    Warning,
}

impl Severity {
    pub fn is_error(&self) -> bool {
        matches!(self, Severity::Error)
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// A diagnostic recorded on a document during compilation.
///
/// Diagnostics keep the order they were recorded in; the host reports each
/// one exactly once per build cycle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Stable message code, e.g. `VLM0002`.
    pub code: &'static str,
    pub message: String,
    /// Source location, when one exists.
    pub span: Option<SourceSpan>,
}

impl Diagnostic {
    pub fn error(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
            span: None,
        }
    }

    pub fn warning(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
            span: None,
        }
    }

    /// Attach a source span.
    pub fn at(mut self, span: SourceSpan) -> Self {
        self.span = Some(span);
        self
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}: {}", self.severity, self.code, self.message)?;
        if let Some(span) = &self.span {
            write!(f, " ({span})")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_error() {
        let diag = Diagnostic::error(codes::UNRESOLVED_COMPONENT, "unknown component 'Widget'");
        assert!(diag.severity.is_error());
        assert_eq!(diag.code, "VLM0002");
    }

    #[test]
    fn test_diagnostic_display_with_span() {
        let diag = Diagnostic::warning(codes::PARSE_ERROR, "unclosed tag")
            .at(SourceSpan::new("a.vlm", 4, 3));
        assert_eq!(diag.to_string(), "warning VLM0001: unclosed tag (a.vlm:4..7)");
    }
}
