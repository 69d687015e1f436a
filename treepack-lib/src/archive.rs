//! Deterministic ZIP construction from an explicit list of relative paths.
//!
//! Entries are deflated, named exactly as supplied, and stamped with Unix time 0
//! in an extended-timestamp extra field. The DOS date every ZIP header also
//! carries cannot go below 1980, so it is pinned at its minimum,
//! 1980-01-01 00:00:00. The same inputs give byte-identical archives regardless
//! of when they are built.

use std::io::{ErrorKind, Read, Seek, Write};

use tracing::{debug, info};
use zip::write::FullFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use crate::error::{Error, Result};
use crate::path::resolve;
use crate::storage::{EntryMeta, Storage};

const ZIP64_THRESHOLD: u64 = u32::MAX as u64;

/// Info-ZIP extended timestamp ("UT") extra field.
const EXTENDED_TIMESTAMP_ID: u16 = 0x5455;
/// Flags byte (bit 0: modification time present) then a little-endian `i32`
/// modification time of 0.
const EPOCH_ZERO_TIMESTAMP: [u8; 5] = [0x01, 0, 0, 0, 0];

const COPY_BUFFER_SIZE: usize = 8192;

/// What an [`archive`] call wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PackSummary {
    pub files: usize,
    pub directories_skipped: usize,
    /// Uncompressed bytes read from storage.
    pub bytes: u64,
}

/// Writes one archive entry per non-directory path into `sink`.
///
/// Each path is resolved as `target_dir + path`. Directories are skipped without
/// error. Files are streamed in list order, and each handle is released before
/// the next file is opened. The central directory is written once at the end.
///
/// On error the sink holds a partial archive and must be discarded.
pub fn archive<S, W, P>(
    storage: &S,
    sink: &mut W,
    target_dir: &str,
    paths: &[P],
) -> Result<PackSummary>
where
    S: Storage + ?Sized,
    W: Write + Seek,
    P: AsRef<str>,
{
    let mut writer = ZipWriter::new(sink);
    let mut summary = PackSummary::default();

    for path in paths {
        let name = path.as_ref();
        let full = resolve(target_dir, name);
        let meta = storage
            .stat(&full)
            .map_err(|source| Error::Stat { path: full.clone(), source })?;

        if meta.is_dir {
            debug!(path = %full, "skipping directory");
            summary.directories_skipped += 1;
            continue;
        }

        let mut file = storage
            .open(&full)
            .map_err(|source| Error::Read { path: full.clone(), source })?;

        let start_err = |source| Error::StartEntry { name: name.to_string(), source };
        let options = entry_options(&meta).map_err(start_err)?;
        writer.start_file(name, options).map_err(start_err)?;

        let bytes = copy_entry(&mut file, &mut writer, &full, name)?;
        drop(file);

        debug!(entry = name, bytes, "added archive entry");
        summary.files += 1;
        summary.bytes += bytes;
    }

    writer.finish().map_err(|source| Error::Finalize { source })?;

    info!(
        files = summary.files,
        skipped = summary.directories_skipped,
        bytes = summary.bytes,
        "archive written"
    );
    Ok(summary)
}

/// Streams `file` into the open entry through a fixed buffer, keeping read and
/// write failures apart.
fn copy_entry<R: Read, W: Write>(
    file: &mut R,
    entry: &mut W,
    path: &str,
    name: &str,
) -> Result<u64> {
    let mut buf = [0u8; COPY_BUFFER_SIZE];
    let mut total = 0u64;
    loop {
        let n = match file.read(&mut buf) {
            Ok(0) => return Ok(total),
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(source) => return Err(Error::Read { path: path.to_string(), source }),
        };
        entry
            .write_all(&buf[..n])
            .map_err(|source| Error::Write { name: name.to_string(), source })?;
        total += n as u64;
    }
}

/// Header for a file entry. Only the permission bits and zip64 flag vary with
/// input; the timestamps and method are fixed.
fn entry_options(meta: &EntryMeta) -> zip::result::ZipResult<FullFileOptions<'static>> {
    let mut options = FullFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default())
        .large_file(meta.len >= ZIP64_THRESHOLD);
    if let Some(mode) = meta.mode {
        options = options.unix_permissions(mode);
    }

    options.add_extra_data(
        EXTENDED_TIMESTAMP_ID,
        EPOCH_ZERO_TIMESTAMP.to_vec().into_boxed_slice(),
        false,
    )?;
    Ok(options)
}
