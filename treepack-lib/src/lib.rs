//! Enumerate directory trees and pack selected files into reproducible ZIP archives.
//!
//! The two operations, [`enumerate`] and [`archive`], are written once against the
//! [`Storage`] capability trait, so the same logic runs over the local disk
//! ([`DiskStorage`]) and over an in-memory filesystem ([`MemoryStorage`]).
//!
//! ```no_run
//! use std::io::Cursor;
//! use treepack_lib::{DiskStorage, archive, enumerate};
//!
//! # fn main() -> treepack_lib::Result<()> {
//! let storage = DiskStorage;
//! let paths = enumerate(&storage, "/data", "")?;
//!
//! let mut sink = Cursor::new(Vec::new());
//! let summary = archive(&storage, &mut sink, "/data/", &paths)?;
//! println!("packed {} files", summary.files);
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};

pub mod archive;
pub mod enumerate;
pub mod error;
pub mod path;
pub mod storage;

pub use archive::{PackSummary, archive};
pub use enumerate::enumerate;
pub use error::{Error, Result};
pub use storage::{DirEntry, DiskStorage, EntryMeta, MemoryStorage, Storage, WalkEntry};

/// Settings shared by the tool's environment, config file and command line layers.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub output: Option<String>,
    pub config: Option<String>,
    pub base_path: Option<String>,
    pub target_dir: Option<String>,
    pub include: Option<Vec<String>>,
    pub skip: Option<Vec<String>>,
    pub dry: Option<bool>,
    pub list: Option<bool>,
    pub max_size: Option<String>,
}
