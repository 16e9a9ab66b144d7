//! Stable identifiers for generated output.

/// Suffix appended to generated file names so tooling recognizes the output
/// as machine-generated.
pub const GENERATED_SUFFIX: &str = ".g.rs";

/// Derive a stable identifier from a file's relative path.
///
/// Every character that is not a letter or digit (path separators, dots,
/// spaces) is replaced with an underscore, so the identifier depends only on
/// the file's own path and never on processing order.
pub fn identifier_from_path(relative_path: &str) -> String {
    relative_path
        .chars()
        .map(|ch| if ch.is_alphanumeric() { ch } else { '_' })
        .collect()
}

/// The full generated file name for a template's relative path.
pub fn generated_file_name(relative_path: &str) -> String {
    let mut name = identifier_from_path(relative_path);
    name.push_str(GENERATED_SUFFIX);
    name
}
