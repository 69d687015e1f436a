//! The storage capability both [`enumerate`](crate::enumerate) and
//! [`archive`](crate::archive) are parameterized over.

use std::io::{self, Read};

use tracing::trace;

use crate::error::{Error, Result};
use crate::path::{SEPARATOR, dir_prefix};

mod disk;
mod memory;

pub use disk::DiskStorage;
pub use memory::MemoryStorage;

/// One child of a listed directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub is_dir: bool,
}

/// Metadata used to derive an archive header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryMeta {
    pub is_dir: bool,
    pub len: u64,
    /// Unix permission bits, when the backend has them.
    pub mode: Option<u32>,
}

/// A descendant found by [`Storage::walk`], relative to the walk root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEntry {
    /// `/`-separated, no trailing separator.
    pub rel: String,
    pub is_dir: bool,
}

/// A filesystem addressed by `/`-separated path strings.
pub trait Storage {
    /// Handle returned by [`Storage::open`]. Released when dropped.
    type File: Read;

    fn read_dir(&self, path: &str) -> io::Result<Vec<DirEntry>>;

    fn stat(&self, path: &str) -> io::Result<EntryMeta>;

    fn open(&self, path: &str) -> io::Result<Self::File>;

    /// Lists every descendant of `root` depth-first, parents before children,
    /// names sorted within each directory. The root itself is not included.
    ///
    /// The default implementation recurses over [`Storage::read_dir`].
    fn walk(&self, root: &str) -> Result<Vec<WalkEntry>> {
        let mut out = Vec::new();
        walk_into(self, &dir_prefix(root), "", &mut out)?;
        Ok(out)
    }
}

fn walk_into<S: Storage + ?Sized>(
    storage: &S,
    root: &str,
    rel_dir: &str,
    out: &mut Vec<WalkEntry>,
) -> Result<()> {
    let dir = format!("{root}{rel_dir}");
    let mut entries = storage
        .read_dir(&dir)
        .map_err(|source| Error::List { path: dir.clone(), source })?;
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    trace!(dir = %dir, count = entries.len(), "listed directory");

    for entry in entries {
        let rel = format!("{rel_dir}{}", entry.name);
        if entry.is_dir {
            out.push(WalkEntry { rel: rel.clone(), is_dir: true });
            walk_into(storage, root, &format!("{rel}{SEPARATOR}"), out)?;
        } else {
            out.push(WalkEntry { rel, is_dir: false });
        }
    }
    Ok(())
}
