//! Helpers for sanitizing data before it enters tracing span attributes
//! or becomes part of a stored blob name.

use std::path::Path;

/// Returns only the filename component of a path (no directory).
///
/// Safe for span fields — reveals the file name without exposing the full path.
pub fn redact_path(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<unknown>")
        .to_string()
}

/// Turns a classified subject name into a filesystem-safe blob component:
/// spaces become underscores, path separators and control characters are dropped.
pub fn blob_component(name: &str) -> String {
    name.chars()
        .filter_map(|c| match c {
            ' ' => Some('_'),
            '/' | '\\' => None,
            c if c.is_control() => None,
            c => Some(c),
        })
        .collect()
}
