//! Read-only verification pass over an archive.
//!
//! # How it works
//!
//! The scanner walks chunks exactly like extraction does (by declared size,
//! starting right after the magic) but writes nothing.  Every File Entry is
//! checksummed and decoded; every Data chunk is checksummed and, when
//! compressed, test-decompressed into the scratch buffers.  The result is a
//! [`ScanReport`] giving one health verdict per chunk and one line per entry.
//!
//! ## Chunk health
//!
//! | verdict | meaning |
//! |---|---|
//! | `Healthy` | checksum valid and, for compressed data, full-length decompression |
//! | `ChecksumMismatch` | payload does not match the header checksum |
//! | `DecompressionFailed` | checksum valid but the codec could not rebuild `extra` bytes |
//! | `UnknownMethod` | compressed with a method no registered codec handles |
//! | `Truncated` | payload runs past the end of the archive |
//! | `Malformed` | File Entry checksum valid but its fields cannot be decoded |
//! | `Unknown` | chunk id not understood; skipped by size |
//!
//! Corrupt data never produces an `Err`; only I/O failures on the archive do.

use serde::Serialize;
use std::fs::File;
use std::io::{self, Read, Seek};
use std::path::Path;

use crate::block::BlockDecoder;
use crate::checksum::Adler32;
use crate::chunk::{ChunkKind, METHOD_STORED};
use crate::codec::{Codec, CodecError};
use crate::entry::FileEntry;
use crate::error::{Error, Result};
use crate::io_stream::{find_codec, is_plausible_entry, read_entry, Chunk, SixPackReader};

// ── Types ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ChunkHealth {
    Healthy,
    ChecksumMismatch { expected: u32, actual: u32 },
    DecompressionFailed { expected: u32, actual: usize },
    UnknownMethod { method: u16 },
    Truncated { declared: u32, available: u64 },
    Malformed { reason: &'static str },
    Unknown,
}

impl ChunkHealth {
    pub fn is_healthy(&self) -> bool {
        matches!(self, ChunkHealth::Healthy)
    }
}

/// Diagnostic record for one chunk.
#[derive(Debug, Clone, Serialize)]
pub struct ScannedChunk {
    pub offset:   u64,
    pub id:       u16,
    pub options:  u16,
    pub size:     u32,
    pub checksum: u32,
    pub extra:    u32,
    pub health:   ChunkHealth,
}

/// One File Entry and the Data chunks that follow it.
#[derive(Debug, Clone, Serialize)]
pub struct ScannedEntry {
    pub name:              String,
    pub original_size:     u32,
    pub data_chunks:       usize,
    /// Payload bytes of this entry's Data chunks as stored.
    pub compressed_bytes:  u64,
    /// Bytes extraction would write for the healthy Data chunks.
    pub recoverable_bytes: u64,
    /// Every Data chunk healthy and the sizes add up.
    pub intact:            bool,
}

/// Complete report produced by [`scan`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanReport {
    pub archive_size:     u64,
    pub total_chunks:     usize,
    pub healthy_chunks:   usize,
    pub corrupt_chunks:   usize,
    pub truncated_chunks: usize,
    pub unknown_chunks:   usize,
    /// Data chunks seen before any File Entry or after a corrupt one.
    pub orphan_chunks:    usize,
    pub entries:          Vec<ScannedEntry>,
    pub chunks:           Vec<ScannedChunk>,
}

impl ScanReport {
    /// No damage anywhere and every entry complete.
    pub fn is_intact(&self) -> bool {
        self.corrupt_chunks == 0
            && self.truncated_chunks == 0
            && self.entries.iter().all(|e| e.intact)
    }

    /// Summary line for display.
    pub fn summary(&self) -> String {
        format!(
            "{}/{} chunks healthy, {} corrupt, {} truncated, {} unknown; {} file(s), {} intact",
            self.healthy_chunks,
            self.total_chunks,
            self.corrupt_chunks,
            self.truncated_chunks,
            self.unknown_chunks,
            self.entries.len(),
            self.entries.iter().filter(|e| e.intact).count(),
        )
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

// ── Scanner ───────────────────────────────────────────────────────────────────

/// Verify every chunk reachable from the reader's current walk position.
pub fn scan<R: Read + Seek>(reader: &mut SixPackReader<R>) -> Result<ScanReport> {
    let archive_size = reader.archive_len();
    let (chunks, codecs) = reader.parts();
    let mut decoder = BlockDecoder::new();

    let mut report = ScanReport { archive_size, ..Default::default() };
    // Index into `report.entries` of the entry receiving Data chunks.
    let mut current: Option<usize> = None;

    while let Some(mut chunk) = chunks.next_chunk()? {
        let header = chunk.header;
        let health = match chunk.kind() {
            ChunkKind::FileEntry if is_plausible_entry(&header) => {
                let (health, entry) = check_entry(&mut chunk)?;
                current = entry.map(|entry| {
                    report.entries.push(ScannedEntry {
                        name:              entry.name,
                        original_size:     entry.original_size,
                        data_chunks:       0,
                        compressed_bytes:  0,
                        recoverable_bytes: 0,
                        intact:            true,
                    });
                    report.entries.len() - 1
                });
                health
            }
            ChunkKind::FileEntry => checksum_only(&mut chunk)?,
            ChunkKind::Data => {
                let health = check_data(&mut decoder, codecs, &mut chunk)?;
                match current.and_then(|i| report.entries.get_mut(i)) {
                    Some(entry) => {
                        entry.data_chunks += 1;
                        entry.compressed_bytes += u64::from(header.size);
                        if health.is_healthy() {
                            // a stored payload is written as is, whatever `extra` says
                            entry.recoverable_bytes += u64::from(if header.options == METHOD_STORED {
                                header.size
                            } else {
                                header.extra
                            });
                        } else {
                            entry.intact = false;
                        }
                    }
                    None => report.orphan_chunks += 1,
                }
                health
            }
            ChunkKind::Unknown(_) => ChunkHealth::Unknown,
        };

        report.total_chunks += 1;
        match &health {
            ChunkHealth::Healthy   => report.healthy_chunks += 1,
            ChunkHealth::Unknown   => report.unknown_chunks += 1,
            ChunkHealth::Truncated { .. } => report.truncated_chunks += 1,
            _                      => report.corrupt_chunks += 1,
        }
        report.chunks.push(ScannedChunk {
            offset:   chunk.offset,
            id:       header.id,
            options:  header.options,
            size:     header.size,
            checksum: header.checksum,
            extra:    header.extra,
            health,
        });
    }

    for entry in &mut report.entries {
        if entry.recoverable_bytes != u64::from(entry.original_size) {
            entry.intact = false;
        }
    }
    Ok(report)
}

/// Convenience: scan the archive at `path`.
pub fn scan_file(path: &Path) -> Result<ScanReport> {
    let mut reader = SixPackReader::new(File::open(path)?)?;
    scan(&mut reader)
}

// ── Per-chunk checks ──────────────────────────────────────────────────────────

fn check_entry<R: Read>(chunk: &mut Chunk<'_, R>) -> Result<(ChunkHealth, Option<FileEntry>)> {
    match read_entry(chunk) {
        Ok(entry) => Ok((ChunkHealth::Healthy, Some(entry))),
        Err(err) => Ok((health_of(chunk, err)?, None)),
    }
}

fn checksum_only<R: Read>(chunk: &mut Chunk<'_, R>) -> Result<ChunkHealth> {
    if let Err(err) = chunk.ensure_complete() {
        return health_of(chunk, err);
    }
    let mut sum = Adler32::new();
    io::copy(chunk.payload(), &mut sum)?;
    let expected = chunk.header.checksum;
    let actual = sum.finish();
    Ok(if expected == actual {
        ChunkHealth::Healthy
    } else {
        ChunkHealth::ChecksumMismatch { expected, actual }
    })
}

fn check_data<R: Read>(
    decoder: &mut BlockDecoder,
    codecs:  &[Box<dyn Codec>],
    chunk:   &mut Chunk<'_, R>,
) -> Result<ChunkHealth> {
    let header = chunk.header;
    if header.options == METHOD_STORED {
        return checksum_only(chunk);
    }
    if let Err(err) = chunk.ensure_complete() {
        return health_of(chunk, err);
    }
    let codec = match find_codec(codecs, header.options) {
        Ok(codec) => codec,
        Err(err) => return health_of(chunk, err.into()),
    };
    match decoder.decode_compressed(&header, chunk.payload(), codec) {
        Ok(_) => Ok(ChunkHealth::Healthy),
        Err(err) => health_of(chunk, err),
    }
}

/// Turn a local failure into a verdict; anything else propagates.
fn health_of<R>(chunk: &Chunk<'_, R>, err: Error) -> Result<ChunkHealth> {
    let header = chunk.header;
    Ok(match err {
        Error::ChecksumMismatch { expected, actual } => {
            ChunkHealth::ChecksumMismatch { expected, actual }
        }
        Error::DecompressionFailed { expected, actual } => {
            ChunkHealth::DecompressionFailed { expected, actual }
        }
        Error::Codec(CodecError::UnknownMethod(method)) => ChunkHealth::UnknownMethod { method },
        Error::Codec(_) => ChunkHealth::DecompressionFailed { expected: header.extra, actual: 0 },
        Error::Truncated { declared, available, .. } => ChunkHealth::Truncated { declared, available },
        Error::MalformedEntry(reason) => ChunkHealth::Malformed { reason },
        other if other.is_local() => ChunkHealth::Truncated {
            declared:  header.size,
            available: chunk.available,
        },
        other => return Err(other),
    })
}
