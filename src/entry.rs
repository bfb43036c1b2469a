//! File Entry chunk payload (chunk id 1).
//!
//! ```text
//! original_size:u32  reserved:[0;4]  name_len:u16  name bytes + NUL
//! ```
//!
//! `name_len` counts the terminator.  The size field is 32 bits wide, so a
//! 6pack archive cannot describe a file of 4 GiB or more; writers reject such
//! files instead of truncating the field.

use byteorder::{ByteOrder, LittleEndian};
use std::path::Path;

use crate::checksum::Adler32;
use crate::chunk::{ChunkHeader, CHUNK_FILE_ENTRY};
use crate::error::{Error, Result};

/// Bytes before the name.
pub const ENTRY_FIXED_SIZE: usize = 10;

/// Largest original size the format can carry.
pub const MAX_FILE_SIZE: u64 = u32::MAX as u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub original_size: u32,
    /// Display name, directory prefix already removed.
    pub name:          String,
}

impl FileEntry {
    pub fn new(name: impl Into<String>, original_size: u64) -> Result<Self> {
        let original_size =
            u32::try_from(original_size).map_err(|_| Error::FileTooLarge(original_size))?;
        Ok(Self { original_size, name: name.into() })
    }

    /// Build an entry named after the last component of `path`.
    pub fn for_path(path: &Path, original_size: u64) -> Result<Self> {
        Self::new(display_name(&path.to_string_lossy()), original_size)
    }

    fn fixed_fields(&self) -> Result<[u8; ENTRY_FIXED_SIZE]> {
        let name_len = u16::try_from(self.name.len() + 1)
            .map_err(|_| Error::MalformedEntry("name longer than 65534 bytes"))?;
        let mut fixed = [0u8; ENTRY_FIXED_SIZE];
        LittleEndian::write_u32(&mut fixed[0..4], self.original_size);
        // bytes 4..8 stay zero: the upper half of a size the format never grew
        LittleEndian::write_u16(&mut fixed[8..10], name_len);
        Ok(fixed)
    }

    /// Chunk header and payload for this entry.
    ///
    /// The checksum is accumulated over the fixed fields and then the
    /// terminated name, in the order they are written.
    pub fn encode(&self) -> Result<(ChunkHeader, Vec<u8>)> {
        let fixed = self.fixed_fields()?;
        let mut name = Vec::with_capacity(self.name.len() + 1);
        name.extend_from_slice(self.name.as_bytes());
        name.push(0);

        let mut sum = Adler32::new();
        sum.update(&fixed);
        sum.update(&name);

        let mut payload = Vec::with_capacity(ENTRY_FIXED_SIZE + name.len());
        payload.extend_from_slice(&fixed);
        payload.extend_from_slice(&name);

        let header = ChunkHeader {
            id:       CHUNK_FILE_ENTRY,
            options:  0,
            size:     payload.len() as u32,
            checksum: sum.finish(),
            extra:    0,
        };
        Ok((header, payload))
    }

    /// Decode a File Entry payload.
    ///
    /// The declared name length is clamped to the payload so a bad length
    /// never reads past the chunk; the name ends at the first NUL.
    pub fn decode(payload: &[u8]) -> Result<Self> {
        if payload.len() <= ENTRY_FIXED_SIZE {
            return Err(Error::MalformedEntry("payload shorter than fixed fields"));
        }
        let original_size = LittleEndian::read_u32(&payload[0..4]);
        let declared = LittleEndian::read_u16(&payload[8..10]) as usize;
        let name_len = declared.min(payload.len() - ENTRY_FIXED_SIZE);

        let raw = &payload[ENTRY_FIXED_SIZE..ENTRY_FIXED_SIZE + name_len];
        let raw = raw.split(|&b| b == 0).next().unwrap_or_default();
        let name = String::from_utf8_lossy(raw).into_owned();

        Ok(Self { original_size, name })
    }
}

/// Strip everything up to and including the last path separator.
///
/// `"foo/bar/FILE.txt"` becomes `"FILE.txt"`.
pub fn display_name(path: &str) -> &str {
    path.rsplit(std::path::is_separator).next().unwrap_or(path)
}
