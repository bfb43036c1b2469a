use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::codec::CodecError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("{} is already a 6pack archive", .0.display())]
    AlreadyArchive(PathBuf),
    #[error("{} already exists", .0.display())]
    DestinationExists(PathBuf),
    #[error("not a 6pack archive")]
    NotAnArchive,
    #[error("checksum mismatch: got {actual:08X}, expecting {expected:08X}")]
    ChecksumMismatch { expected: u32, actual: u32 },
    #[error("decompression failed: produced {actual} of {expected} bytes")]
    DecompressionFailed { expected: u32, actual: usize },
    /// The source did not yield the number of bytes recorded in its File Entry.
    #[error("source changed while packing: read {actual} of {expected} bytes")]
    ShortRead { expected: u64, actual: u64 },
    #[error("chunk at offset {offset} declares {declared} payload bytes, only {available} remain")]
    Truncated { offset: u64, declared: u32, available: u64 },
    #[error("file of {0} bytes exceeds the 4 GiB format limit")]
    FileTooLarge(u64),
    #[error("malformed file entry: {0}")]
    MalformedEntry(&'static str),
    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl Error {
    /// Failures confined to one chunk.  They discard the file being
    /// reconstructed while the archive scan moves on to the next chunk.
    pub fn is_local(&self) -> bool {
        match self {
            Error::ChecksumMismatch { .. }
            | Error::DecompressionFailed { .. }
            | Error::Truncated { .. }
            | Error::MalformedEntry(_)
            | Error::Codec(_) => true,
            Error::Io(e) => e.kind() == io::ErrorKind::UnexpectedEof,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
