//! Path-level API: pack a file, unpack an archive, list its entries.
//!
//! ```no_run
//! use sixpack::archive::{pack, unpack_to};
//! use sixpack::codec::CompressionLevel;
//!
//! pack(CompressionLevel::Ratio, "notes.txt", "notes.6pk")?;
//! let summary = unpack_to("notes.6pk", "restored")?;
//! assert!(summary.is_clean());
//! # Ok::<(), sixpack::Error>(())
//! ```
//!
//! Packing never overwrites: the archive path must not exist.  Unpacking
//! never overwrites either, but a colliding output name only skips that
//! entry.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::chunk::detect_magic;
use crate::codec::{get_codec, CodecId, CompressionLevel};
use crate::entry::{display_name, FileEntry, MAX_FILE_SIZE};
use crate::error::{Error, Result};
use crate::io_stream::{EntrySink, SixPackReader, SixPackWriter, UnpackSummary};
use crate::recovery::{scan, ScannedEntry};

// ── Options ───────────────────────────────────────────────────────────────────

/// Configuration for [`pack_with_options`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PackOptions {
    pub level: CompressionLevel,
    pub codec: CodecId,
}

/// Configuration for [`unpack_with_options`].
#[derive(Debug, Clone)]
pub struct UnpackOptions {
    /// Directory that receives extracted files.  Must exist.
    pub output_dir: PathBuf,
}

impl Default for UnpackOptions {
    fn default() -> Self {
        Self { output_dir: PathBuf::from(".") }
    }
}

// ── PackSummary ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct PackSummary {
    pub name:          String,
    pub original_size: u64,
    pub archive_size:  u64,
    pub data_chunks:   u32,
    pub stored_chunks: u32,
}

impl PackSummary {
    /// Share of the original size saved, when the archive came out smaller.
    pub fn saved_percent(&self) -> Option<f64> {
        if self.original_size == 0 || self.archive_size >= self.original_size {
            return None;
        }
        Some(100.0 - self.archive_size as f64 * 100.0 / self.original_size as f64)
    }
}

// ── Pack ──────────────────────────────────────────────────────────────────────

/// Pack `source` into a new archive at `archive` with the default codec.
pub fn pack<P: AsRef<Path>, Q: AsRef<Path>>(
    level:   CompressionLevel,
    source:  P,
    archive: Q,
) -> Result<()> {
    pack_with_options(source, archive, &PackOptions { level, ..PackOptions::default() }).map(|_| ())
}

/// Pack `source` into a new archive at `archive`.
///
/// Nothing is created when the archive path exists, the source cannot be
/// opened, the source is itself a 6pack archive, or it is 4 GiB or larger.
/// If the source changes size while it is read the archive is still
/// completed, then [`Error::ShortRead`] is returned.
pub fn pack_with_options<P: AsRef<Path>, Q: AsRef<Path>>(
    source:  P,
    archive: Q,
    opts:    &PackOptions,
) -> Result<PackSummary> {
    let (source, archive) = (source.as_ref(), archive.as_ref());

    if archive.exists() {
        return Err(Error::DestinationExists(archive.to_owned()));
    }

    let mut input = File::open(source)?;
    let size = input.metadata()?.len();
    if size > MAX_FILE_SIZE {
        return Err(Error::FileTooLarge(size));
    }
    if detect_magic(&mut input)? {
        return Err(Error::AlreadyArchive(source.to_owned()));
    }
    let entry = FileEntry::for_path(source, size)?;

    let output = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(archive)
        .map_err(|e| match e.kind() {
            io::ErrorKind::AlreadyExists => Error::DestinationExists(archive.to_owned()),
            _ => Error::Io(e),
        })?;

    info!(source = %source.display(), archive = %archive.display(), codec = opts.codec.name(), "packing");
    let codec = get_codec(opts.codec);
    let mut writer = SixPackWriter::new(BufWriter::new(output))?;
    let stats = writer.pack_stream(&entry, BufReader::new(input), codec.as_ref(), opts.level)?;
    let archive_size = writer.bytes_written();
    writer.finish()?.into_inner().map_err(|e| e.into_error())?.sync_all()?;

    Ok(PackSummary {
        name:          entry.name,
        original_size: stats.bytes_read,
        archive_size,
        data_chunks:   stats.data_chunks,
        stored_chunks: stats.stored_chunks,
    })
}

// ── Unpack ────────────────────────────────────────────────────────────────────

/// Extracts into a directory with create-new semantics.
pub struct DirSink {
    dir: PathBuf,
}

impl DirSink {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    /// Output path for `entry`, or `None` when its name has no file component.
    pub fn target(&self, entry: &FileEntry) -> Option<PathBuf> {
        let name = display_name(&entry.name);
        if name.is_empty() || name == "." || name == ".." {
            return None;
        }
        Some(self.dir.join(name))
    }
}

impl EntrySink for DirSink {
    type Output = BufWriter<File>;

    fn create(&mut self, entry: &FileEntry) -> io::Result<Option<Self::Output>> {
        let Some(path) = self.target(entry) else {
            warn!(name = %entry.name, "entry has no usable file name. Skipped.");
            return Ok(None);
        };
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => Ok(Some(BufWriter::new(file))),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                warn!(path = %path.display(), "file already exists. Skipped.");
                Ok(None)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "can't create file. Skipped.");
                Ok(None)
            }
        }
    }

    fn finish(&mut self, _: &FileEntry, mut output: Self::Output) -> io::Result<()> {
        output.flush()
    }

    fn discard(&mut self, entry: &FileEntry, output: Self::Output) -> io::Result<()> {
        drop(output);
        match self.target(entry) {
            Some(path) => fs::remove_file(path),
            None => Ok(()),
        }
    }
}

/// Extract `archive` into the current directory.
pub fn unpack<P: AsRef<Path>>(archive: P) -> Result<()> {
    unpack_with_options(archive, &UnpackOptions::default()).map(|_| ())
}

/// Extract `archive` into `output_dir`.
pub fn unpack_to<P: AsRef<Path>, Q: AsRef<Path>>(archive: P, output_dir: Q) -> Result<UnpackSummary> {
    unpack_with_options(archive, &UnpackOptions { output_dir: output_dir.as_ref().to_owned() })
}

/// Extract `archive` as configured by `opts`.
///
/// Fails up front when the archive cannot be opened or lacks the magic.
/// Damaged entries are reported in the summary, not as an error.
pub fn unpack_with_options<P: AsRef<Path>>(archive: P, opts: &UnpackOptions) -> Result<UnpackSummary> {
    let archive = archive.as_ref();
    let mut reader = SixPackReader::new(BufReader::new(File::open(archive)?))?;
    info!(archive = %archive.display(), "unpacking");

    let mut sink = DirSink::new(&opts.output_dir);
    let summary = reader.unpack_into(&mut sink)?;
    if !summary.is_clean() {
        warn!(archive = %archive.display(), "archive extracted with errors");
    }
    Ok(summary)
}

// ── List ──────────────────────────────────────────────────────────────────────

/// Entries of `archive` with their verification state.
pub fn list<P: AsRef<Path>>(archive: P) -> Result<Vec<ScannedEntry>> {
    let mut reader = SixPackReader::new(BufReader::new(File::open(archive.as_ref())?))?;
    Ok(scan(&mut reader)?.entries)
}
