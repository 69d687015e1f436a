use std::collections::BTreeMap;
use std::io::{self, Cursor};

use super::{DirEntry, EntryMeta, Storage};
use crate::path::SEPARATOR;

const DEFAULT_FILE_MODE: u32 = 0o644;
const DEFAULT_DIR_MODE: u32 = 0o755;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    Dir,
    File { contents: Vec<u8>, mode: u32 },
}

/// An in-memory filesystem.
///
/// Paths are `/`-separated; leading and trailing separators are ignored, and the
/// empty path is the root directory. Adding an entry creates its missing parent
/// directories. Directories have no native recursive walker here, so
/// [`Storage::walk`] uses the provided recursion over [`Storage::read_dir`].
///
/// ```
/// use treepack_lib::{MemoryStorage, enumerate};
///
/// # fn main() -> std::io::Result<()> {
/// let mut fs = MemoryStorage::new();
/// fs.add_file("a.txt", "alpha")?.add_file("sub/b.txt", "beta")?;
///
/// let paths = enumerate(&fs, "", "").unwrap();
/// assert_eq!(paths, ["a.txt", "sub/", "sub/b.txt"]);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    nodes: BTreeMap<String, Node>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a directory. Adding one that already exists is a no-op.
    ///
    /// Fails with `AlreadyExists` if a file sits at `path` and with
    /// `NotADirectory` if one sits at any of its parents.
    pub fn add_dir(&mut self, path: &str) -> io::Result<&mut Self> {
        let key = node_key(path);
        if key.is_empty() {
            return Ok(self);
        }
        if let Some(Node::File { .. }) = self.nodes.get(&key) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("'{path}' is a file"),
            ));
        }
        self.add_parents(&key)?;
        self.nodes.insert(key, Node::Dir);
        Ok(self)
    }

    pub fn add_file(&mut self, path: &str, contents: impl Into<Vec<u8>>) -> io::Result<&mut Self> {
        self.add_file_with_mode(path, contents, DEFAULT_FILE_MODE)
    }

    /// Adds a file, replacing an existing file at `path`.
    ///
    /// Fails with `InvalidInput` for the root path, `IsADirectory` if a directory
    /// sits at `path` and `NotADirectory` if a file sits at any of its parents.
    pub fn add_file_with_mode(
        &mut self,
        path: &str,
        contents: impl Into<Vec<u8>>,
        mode: u32,
    ) -> io::Result<&mut Self> {
        let key = node_key(path);
        if key.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "the root is a directory and cannot hold file contents",
            ));
        }
        if let Some(Node::Dir) = self.nodes.get(&key) {
            return Err(io::Error::new(
                io::ErrorKind::IsADirectory,
                format!("'{path}' is a directory"),
            ));
        }
        self.add_parents(&key)?;
        self.nodes.insert(
            key,
            Node::File { contents: contents.into(), mode: mode & 0o777 },
        );
        Ok(self)
    }

    /// Checks every ancestor before creating any, so a failed add changes nothing.
    fn add_parents(&mut self, key: &str) -> io::Result<()> {
        let parents: Vec<&str> = key
            .match_indices(SEPARATOR)
            .map(|(pos, _)| &key[..pos])
            .collect();

        if let Some(file) = parents
            .iter()
            .find(|parent| matches!(self.nodes.get(**parent), Some(Node::File { .. })))
        {
            return Err(io::Error::new(
                io::ErrorKind::NotADirectory,
                format!("parent '{file}' of '{key}' is a file"),
            ));
        }

        for parent in parents {
            self.nodes.entry(parent.to_string()).or_insert(Node::Dir);
        }
        Ok(())
    }

    /// `None` for a missing path; the root always resolves to a directory.
    fn lookup(&self, path: &str) -> Option<(String, Option<&Node>)> {
        let key = node_key(path);
        if key.is_empty() {
            return Some((key, None));
        }
        let node = self.nodes.get(&key)?;
        Some((key, Some(node)))
    }
}

fn node_key(path: &str) -> String {
    path.trim_matches(SEPARATOR).to_string()
}

fn not_found(path: &str) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("'{path}' does not exist"))
}

impl Storage for MemoryStorage {
    type File = Cursor<Vec<u8>>;

    fn read_dir(&self, path: &str) -> io::Result<Vec<DirEntry>> {
        let (key, node) = self.lookup(path).ok_or_else(|| not_found(path))?;
        if let Some(Node::File { .. }) = node {
            return Err(io::Error::new(
                io::ErrorKind::NotADirectory,
                format!("'{path}' is not a directory"),
            ));
        }

        let prefix = if key.is_empty() { key } else { format!("{key}{SEPARATOR}") };
        let entries = self
            .nodes
            .range(prefix.clone()..)
            .take_while(|(child, _)| child.starts_with(&prefix))
            .filter_map(|(child, node)| {
                let name = &child[prefix.len()..];
                (!name.contains(SEPARATOR)).then(|| DirEntry {
                    name: name.to_string(),
                    is_dir: matches!(node, Node::Dir),
                })
            })
            .collect();
        Ok(entries)
    }

    fn stat(&self, path: &str) -> io::Result<EntryMeta> {
        let (_, node) = self.lookup(path).ok_or_else(|| not_found(path))?;
        Ok(match node {
            None | Some(Node::Dir) => EntryMeta {
                is_dir: true,
                len: 0,
                mode: Some(DEFAULT_DIR_MODE),
            },
            Some(Node::File { contents, mode }) => EntryMeta {
                is_dir: false,
                len: contents.len() as u64,
                mode: Some(*mode),
            },
        })
    }

    fn open(&self, path: &str) -> io::Result<Self::File> {
        match self.lookup(path).ok_or_else(|| not_found(path))? {
            (_, Some(Node::File { contents, .. })) => Ok(Cursor::new(contents.clone())),
            _ => Err(io::Error::new(
                io::ErrorKind::IsADirectory,
                format!("'{path}' is a directory"),
            )),
        }
    }
}
