//! Source text snapshots and spans.

use std::{path::Path, sync::Arc};

use serde::Serialize;

/// The kind of a template file. A closed set: the compiler treats component
/// templates and legacy view templates differently when building the phase
/// list and resolving imports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FileKind {
    /// A component/page template (`.vlm`).
    Component,
    /// A legacy view template (`.vlmx`).
    LegacyView,
}

impl FileKind {
    /// Classify a path by extension, if it is a template file at all.
    pub fn from_path(path: &str) -> Option<Self> {
        let ext = Path::new(path).extension()?.to_str()?;
        if ext.eq_ignore_ascii_case("vlm") {
            Some(FileKind::Component)
        } else if ext.eq_ignore_ascii_case("vlmx") {
            Some(FileKind::LegacyView)
        } else {
            None
        }
    }

    /// The conventional import file name for this kind, without extension.
    /// One import file per directory provides ambient directives to every
    /// template below it.
    pub fn import_file_stem(&self) -> &'static str {
        match self {
            FileKind::Component => "_imports",
            FileKind::LegacyView => "_view_imports",
        }
    }
}

/// An immutable snapshot of one source file's text.
///
/// Cloning is cheap: the content is shared. Two snapshots compare equal when
/// their paths and contents are equal, regardless of allocation identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceText {
    path: Arc<str>,
    relative_path: Arc<str>,
    content: Arc<str>,
}

impl SourceText {
    pub fn new(
        path: impl Into<Arc<str>>,
        relative_path: impl Into<Arc<str>>,
        content: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            path: path.into(),
            relative_path: relative_path.into(),
            content: content.into(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// The project-relative path, used to derive the generated-output
    /// identifier.
    pub fn relative_path(&self) -> &str {
        &self.relative_path
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// The kind of template this file holds, by extension.
    pub fn file_kind(&self) -> Option<FileKind> {
        FileKind::from_path(&self.path)
    }

    /// Whether this file is a conventional import file for its kind.
    pub fn is_import_file(&self) -> bool {
        let Some(kind) = self.file_kind() else {
            return false;
        };
        Path::new(self.path.as_ref())
            .file_stem()
            .and_then(|stem| stem.to_str())
            .is_some_and(|stem| stem.eq_ignore_ascii_case(kind.import_file_stem()))
    }
}

/// A half-open byte range into one source file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SourceSpan {
    /// Path of the file the span points into.
    pub path: String,
    /// Byte offset of the span start.
    pub start: usize,
    /// Byte length of the span.
    pub len: usize,
}

impl SourceSpan {
    pub fn new(path: impl Into<String>, start: usize, len: usize) -> Self {
        Self {
            path: path.into(),
            start,
            len,
        }
    }
}

impl std::fmt::Display for SourceSpan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}..{}", self.path, self.start, self.start + self.len)
    }
}
