use std::fs::{self, File};
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::time::{Duration, SystemTime};

use tempfile::tempdir;
use treepack_lib::{
    DirEntry, DiskStorage, EntryMeta, Error, MemoryStorage, PackSummary, Storage, archive,
    enumerate,
};
use zip::extra_fields::ExtraField;
use zip::{CompressionMethod, DateTime, ZipArchive};

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn write_tree(root: &Path, modified: SystemTime) -> io::Result<()> {
    fs::create_dir(root.join("sub"))?;
    for (name, contents) in [("a.txt", "alpha alpha alpha"), ("sub/b.txt", "beta")] {
        let path = root.join(name);
        fs::write(&path, contents)?;
        File::options().write(true).open(&path)?.set_modified(modified)?;
    }
    Ok(())
}

fn prefix(root: &Path) -> String {
    format!("{}/", root.to_str().expect("temp dir is UTF-8"))
}

fn pack<S: Storage>(
    storage: &S,
    target_dir: &str,
    paths: &[&str],
) -> treepack_lib::Result<Vec<u8>> {
    let mut sink = Cursor::new(Vec::new());
    archive(storage, &mut sink, target_dir, paths)?;
    Ok(sink.into_inner())
}

fn entries(bytes: &[u8]) -> zip::result::ZipResult<Vec<(String, CompressionMethod, String)>> {
    let mut zip = ZipArchive::new(Cursor::new(bytes))?;
    let mut out = Vec::new();
    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        let mut contents = String::new();
        entry.read_to_string(&mut contents)?;
        out.push((entry.name().to_string(), entry.compression(), contents));
    }
    Ok(out)
}

#[test]
fn disk_scenario_produces_two_deflated_entries() -> TestResult {
    let temp_dir = tempdir()?;
    write_tree(temp_dir.path(), SystemTime::now())?;

    let bytes = pack(&DiskStorage, &prefix(temp_dir.path()), &["a.txt", "sub/b.txt"])?;
    assert_eq!(
        entries(&bytes)?,
        [
            ("a.txt".to_string(), CompressionMethod::Deflated, "alpha alpha alpha".to_string()),
            ("sub/b.txt".to_string(), CompressionMethod::Deflated, "beta".to_string()),
        ]
    );
    Ok(())
}

#[test]
fn archives_are_byte_identical_across_mtimes() -> TestResult {
    let old = tempdir()?;
    let new = tempdir()?;
    write_tree(old.path(), SystemTime::UNIX_EPOCH + Duration::from_secs(86_400 * 365))?;
    write_tree(new.path(), SystemTime::now())?;

    let paths = ["a.txt", "sub/b.txt"];
    let first = pack(&DiskStorage, &prefix(old.path()), &paths)?;
    let second = pack(&DiskStorage, &prefix(new.path()), &paths)?;
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn every_entry_carries_epoch_zero_timestamps() -> TestResult {
    let temp_dir = tempdir()?;
    write_tree(temp_dir.path(), SystemTime::now())?;

    let bytes = pack(&DiskStorage, &prefix(temp_dir.path()), &["a.txt", "sub/b.txt"])?;
    let mut zip = ZipArchive::new(Cursor::new(bytes))?;
    assert_eq!(zip.len(), 2);

    for i in 0..zip.len() {
        let entry = zip.by_index(i)?;
        assert_eq!(entry.last_modified(), Some(DateTime::default()), "{}", entry.name());

        let unix_mtimes: Vec<_> = entry
            .extra_data_fields()
            .filter_map(|field| match field {
                ExtraField::ExtendedTimestamp(ts) => Some(ts.mod_time()),
                _ => None,
            })
            .collect();
        assert_eq!(unix_mtimes, [Some(0)], "{}", entry.name());
    }
    Ok(())
}

#[test]
fn large_files_stream_without_changing_content() -> TestResult {
    // Several copy buffers' worth, not a multiple of the buffer size.
    let contents: Vec<u8> = (0..100_003u32).map(|i| (i % 251) as u8).collect();
    let mut fs = MemoryStorage::new();
    fs.add_file("big.bin", contents.clone())?;

    let mut sink = Cursor::new(Vec::new());
    let summary = archive(&fs, &mut sink, "", &["big.bin"])?;
    assert_eq!(summary.bytes, contents.len() as u64);

    let mut zip = ZipArchive::new(Cursor::new(sink.into_inner()))?;
    let mut read_back = Vec::new();
    zip.by_index(0)?.read_to_end(&mut read_back)?;
    assert_eq!(read_back, contents);
    Ok(())
}

#[test]
fn entry_order_follows_input_order() -> TestResult {
    let mut fs = MemoryStorage::new();
    fs.add_file("z.txt", "z")?.add_file("a.txt", "a")?.add_file("m/n.txt", "n")?;

    let bytes = pack(&fs, "", &["z.txt", "m/n.txt", "a.txt"])?;
    let names: Vec<_> = entries(&bytes)?.into_iter().map(|(name, _, _)| name).collect();
    assert_eq!(names, ["z.txt", "m/n.txt", "a.txt"]);
    Ok(())
}

#[test]
fn directories_are_skipped_and_counted() -> TestResult {
    let mut fs = MemoryStorage::new();
    fs.add_file("root/a.txt", "a")?
        .add_file("root/sub/b.txt", "b")?
        .add_dir("root/sub/empty")?;

    let paths = enumerate(&fs, "root", "")?;
    assert_eq!(paths, ["a.txt", "sub/", "sub/b.txt", "sub/empty/"]);

    let mut sink = Cursor::new(Vec::new());
    let summary = archive(&fs, &mut sink, "root", &paths)?;
    assert_eq!(
        summary,
        PackSummary { files: 2, directories_skipped: 2, bytes: 2 }
    );
    assert_eq!(entries(sink.get_ref())?.len(), paths.len() - 2);
    Ok(())
}

#[test]
fn enumerate_then_archive_on_disk() -> TestResult {
    let temp_dir = tempdir()?;
    write_tree(temp_dir.path(), SystemTime::now())?;
    let root = prefix(temp_dir.path());

    let paths = enumerate(&DiskStorage, &root, "sub")?;
    assert_eq!(paths, ["sub/", "sub/b.txt"]);

    let mut sink = Cursor::new(Vec::new());
    let summary = archive(&DiskStorage, &mut sink, &root, &paths)?;
    assert_eq!(summary.files, 1);
    assert_eq!(summary.directories_skipped, 1);

    let names: Vec<_> = entries(sink.get_ref())?.into_iter().map(|(name, _, _)| name).collect();
    assert_eq!(names, ["sub/b.txt"]);
    Ok(())
}

#[test]
fn empty_list_gives_an_empty_archive() -> TestResult {
    let bytes = pack(&MemoryStorage::new(), "", &[])?;
    assert!(entries(&bytes)?.is_empty());
    Ok(())
}

#[test]
fn missing_file_is_a_stat_error() -> TestResult {
    let mut fs = MemoryStorage::new();
    fs.add_file("a.txt", "a")?;

    match pack(&fs, "", &["a.txt", "gone.txt"]) {
        Err(Error::Stat { path, source }) => {
            assert_eq!(path, "gone.txt");
            assert_eq!(source.kind(), io::ErrorKind::NotFound);
        }
        other => panic!("expected stat error, got {other:?}"),
    }
    Ok(())
}

/// Lists and stats like the wrapped tree but refuses to hand out contents.
struct Unreadable(MemoryStorage);

impl Storage for Unreadable {
    type File = Cursor<Vec<u8>>;

    fn read_dir(&self, path: &str) -> io::Result<Vec<DirEntry>> {
        self.0.read_dir(path)
    }

    fn stat(&self, path: &str) -> io::Result<EntryMeta> {
        self.0.stat(path)
    }

    fn open(&self, _path: &str) -> io::Result<Self::File> {
        Err(io::Error::new(io::ErrorKind::PermissionDenied, "locked"))
    }
}

#[test]
fn read_failures_abort_instead_of_writing_empty_entries() -> TestResult {
    let mut fs = MemoryStorage::new();
    fs.add_file("secret.txt", "hidden")?;

    match pack(&Unreadable(fs), "", &["secret.txt"]) {
        Err(Error::Read { path, source }) => {
            assert_eq!(path, "secret.txt");
            assert_eq!(source.kind(), io::ErrorKind::PermissionDenied);
        }
        other => panic!("expected read error, got {other:?}"),
    }
    Ok(())
}

/// A sink that accepts a fixed number of bytes and then fails.
struct FullDisk {
    inner: Cursor<Vec<u8>>,
    capacity: u64,
}

impl Write for FullDisk {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.inner.position() + buf.len() as u64 > self.capacity {
            return Err(io::Error::new(io::ErrorKind::StorageFull, "no space left"));
        }
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for FullDisk {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.seek(pos)
    }
}

#[test]
fn sink_failures_are_reported() -> TestResult {
    let mut fs = MemoryStorage::new();
    fs.add_file("a.txt", "a")?;

    let mut sink = FullDisk { inner: Cursor::new(Vec::new()), capacity: 0 };
    let result = archive(&fs, &mut sink, "", &["a.txt"]);
    assert!(
        matches!(
            result,
            Err(Error::StartEntry { .. } | Error::Write { .. } | Error::Finalize { .. })
        ),
        "unexpected result: {result:?}"
    );
    Ok(())
}
