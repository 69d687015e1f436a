use std::fs::{self, File};
use std::io;
use std::path::{Component, Path};

use walkdir::WalkDir;

use super::{DirEntry, EntryMeta, Storage, WalkEntry};
use crate::error::{Error, Result};
use crate::path::SEPARATOR;

/// The local filesystem. Paths are handed to the operating system as given.
///
/// Symbolic links are listed as files and not descended into; [`Storage::stat`]
/// follows them.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskStorage;

impl Storage for DiskStorage {
    type File = File;

    fn read_dir(&self, path: &str) -> io::Result<Vec<DirEntry>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            let name = entry.file_name().into_string().map_err(|name| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("file name {name:?} is not valid UTF-8"),
                )
            })?;
            entries.push(DirEntry { name, is_dir: entry.file_type()?.is_dir() });
        }
        Ok(entries)
    }

    fn stat(&self, path: &str) -> io::Result<EntryMeta> {
        let meta = fs::metadata(path)?;
        Ok(EntryMeta {
            is_dir: meta.is_dir(),
            len: meta.len(),
            mode: unix_mode(&meta),
        })
    }

    fn open(&self, path: &str) -> io::Result<File> {
        File::open(path)
    }

    fn walk(&self, root: &str) -> Result<Vec<WalkEntry>> {
        let list_err = |path: &Path, source: io::Error| Error::List {
            path: path.display().to_string(),
            source,
        };

        // walkdir yields nothing for a file root once depth 0 is skipped.
        let root_path = Path::new(root);
        let meta = fs::metadata(root_path).map_err(|e| list_err(root_path, e))?;
        if !meta.is_dir() {
            return Err(list_err(
                root_path,
                io::Error::new(io::ErrorKind::NotADirectory, "walk root is not a directory"),
            ));
        }

        let mut out = Vec::new();
        for entry in WalkDir::new(root_path).min_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(root_path).to_path_buf();
                list_err(&path, e.into())
            })?;
            let rel = relative_string(root_path, entry.path())
                .map_err(|e| list_err(entry.path(), e))?;
            out.push(WalkEntry { rel, is_dir: entry.file_type().is_dir() });
        }
        Ok(out)
    }
}

/// Renders `path` relative to `root` with `/` separators on every platform.
fn relative_string(root: &Path, path: &Path) -> io::Result<String> {
    let rel = path
        .strip_prefix(root)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    let mut parts = Vec::new();
    for component in rel.components() {
        if let Component::Normal(part) = component {
            let part = part.to_str().ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("file name {part:?} is not valid UTF-8"),
                )
            })?;
            parts.push(part);
        }
    }
    Ok(parts.join(&SEPARATOR.to_string()))
}

#[cfg(unix)]
fn unix_mode(meta: &fs::Metadata) -> Option<u32> {
    use std::os::unix::fs::PermissionsExt;
    Some(meta.permissions().mode() & 0o777)
}

#[cfg(not(unix))]
fn unix_mode(_meta: &fs::Metadata) -> Option<u32> {
    None
}
