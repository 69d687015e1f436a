//! Helpers for the `/`-separated relative path strings passed between
//! [`enumerate`](crate::enumerate) and [`archive`](crate::archive).
//!
//! Paths are composed by plain string concatenation. A directory entry is marked
//! by a trailing separator and nothing else.

pub const SEPARATOR: char = '/';

/// Returns `dir` with a trailing separator, or an empty string for an empty `dir`.
pub fn dir_prefix(dir: &str) -> String {
    if dir.is_empty() || dir.ends_with(SEPARATOR) {
        dir.to_string()
    } else {
        format!("{dir}{SEPARATOR}")
    }
}

pub fn is_dir_entry(path: &str) -> bool {
    path.ends_with(SEPARATOR)
}

/// Joins a relative entry onto a prefix, normalizing the prefix first.
pub fn resolve(prefix: &str, rel: &str) -> String {
    format!("{}{rel}", dir_prefix(prefix))
}
