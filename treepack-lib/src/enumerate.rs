//! Recursive listing of a directory tree as relative path strings.

use tracing::{debug, info};

use crate::error::Result;
use crate::path::{SEPARATOR, dir_prefix};
use crate::storage::Storage;

/// Lists everything under `base_path + target_dir`.
///
/// Each entry is `target_dir` followed by the path relative to that root, so the
/// result can be resolved against `base_path`. Directories carry a trailing `/`,
/// empty ones included. A non-empty `target_dir` is normalized to end in `/` and
/// is emitted once, first; the walk root is never listed again.
///
/// Ordering is depth-first with names sorted inside each directory. Any listing
/// failure, including a missing root, aborts the whole call.
pub fn enumerate<S: Storage + ?Sized>(
    storage: &S,
    base_path: &str,
    target_dir: &str,
) -> Result<Vec<String>> {
    let target = dir_prefix(target_dir);
    let root = format!("{}{target}", dir_prefix(base_path));
    debug!(root = %root, "enumerating tree");

    let walked = storage.walk(&root)?;

    let mut paths = Vec::with_capacity(walked.len() + 1);
    if !target.is_empty() {
        paths.push(target.clone());
    }
    for entry in walked {
        if entry.is_dir {
            paths.push(format!("{target}{}{SEPARATOR}", entry.rel));
        } else {
            paths.push(format!("{target}{}", entry.rel));
        }
    }

    info!(root = %root, entries = paths.len(), "enumerated tree");
    Ok(paths)
}
