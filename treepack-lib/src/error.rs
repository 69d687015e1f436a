//! Error type for enumeration and archiving.
//!
//! Every failure is returned to the immediate caller; nothing here is fatal to the
//! process. A failed [`archive`](crate::archive) call leaves the sink in an undefined,
//! partially written state and the caller must discard it.

use std::io;

use thiserror::Error;
use zip::result::ZipError;

#[derive(Error, Debug)]
pub enum Error {
    /// A directory (the walk root or one of its descendants) could not be listed.
    #[error("failed to list directory '{path}': {source}")]
    List {
        path: String,
        #[source]
        source: io::Error,
    },

    /// Metadata for an entry could not be read, e.g. it vanished.
    #[error("failed to stat '{path}': {source}")]
    Stat {
        path: String,
        #[source]
        source: io::Error,
    },

    /// Opening or reading file contents failed.
    #[error("failed to read '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },

    /// The archive writer rejected a new entry header.
    #[error("failed to start archive entry '{name}': {source}")]
    StartEntry {
        name: String,
        #[source]
        source: ZipError,
    },

    /// The sink rejected entry bytes.
    #[error("failed to write archive entry '{name}': {source}")]
    Write {
        name: String,
        #[source]
        source: io::Error,
    },

    /// The central directory could not be written.
    #[error("failed to finalize archive: {source}")]
    Finalize {
        #[source]
        source: ZipError,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
