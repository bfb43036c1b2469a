//! Wire layout of a 6pack archive: the 8-byte magic and the 16-byte chunk
//! header that precedes every payload.
//!
//! ```text
//! offset 0   89 36 50 4B 0D 0A 1A 0A          magic
//! offset 8   id:u16 options:u16 size:u32 checksum:u32 extra:u32
//!            <size bytes of payload>
//!            id:u16 options:u16 ...
//! ```
//!
//! All integers are little-endian and fixed width.  Nothing here validates
//! field values; an unrecognised `id` decodes to [`ChunkKind::Unknown`] and is
//! still skippable through `size`.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Seek, SeekFrom, Write};

pub const MAGIC: [u8; 8] = [137, b'6', b'P', b'K', 13, 10, 26, 10];
pub const MAGIC_SIZE: usize = MAGIC.len();

pub const CHUNK_HEADER_SIZE: usize = 16;

/// File Entry (metadata) chunk.
pub const CHUNK_FILE_ENTRY: u16 = 1;
/// Data block chunk.
pub const CHUNK_DATA: u16 = 17;

/// `options` value of a Data chunk whose payload is the raw block.
pub const METHOD_STORED: u16 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkKind {
    FileEntry,
    Data,
    Unknown(u16),
}

impl From<u16> for ChunkKind {
    fn from(id: u16) -> Self {
        match id {
            CHUNK_FILE_ENTRY => ChunkKind::FileEntry,
            CHUNK_DATA       => ChunkKind::Data,
            other            => ChunkKind::Unknown(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    pub id:       u16,
    /// Compression method of a Data chunk; unused by other chunks.
    pub options:  u16,
    /// Payload length in bytes.
    pub size:     u32,
    /// Adler-32 of the payload bytes as stored.
    pub checksum: u32,
    /// Decompressed length of a Data chunk; unused by other chunks.
    pub extra:    u32,
}

impl ChunkHeader {
    pub fn kind(&self) -> ChunkKind {
        ChunkKind::from(self.id)
    }

    pub fn write<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_u16::<LittleEndian>(self.id)?;
        writer.write_u16::<LittleEndian>(self.options)?;
        writer.write_u32::<LittleEndian>(self.size)?;
        writer.write_u32::<LittleEndian>(self.checksum)?;
        writer.write_u32::<LittleEndian>(self.extra)?;
        Ok(())
    }

    pub fn read<R: Read>(mut reader: R) -> io::Result<Self> {
        Ok(Self {
            id:       reader.read_u16::<LittleEndian>()?,
            options:  reader.read_u16::<LittleEndian>()?,
            size:     reader.read_u32::<LittleEndian>()?,
            checksum: reader.read_u32::<LittleEndian>()?,
            extra:    reader.read_u32::<LittleEndian>()?,
        })
    }

    /// Distance from this chunk's first header byte to the next chunk.
    pub fn span(&self) -> u64 {
        CHUNK_HEADER_SIZE as u64 + u64::from(self.size)
    }
}

pub fn write_magic<W: Write>(mut writer: W) -> io::Result<()> {
    writer.write_all(&MAGIC)
}

/// Report whether the stream starts with [`MAGIC`].
///
/// Reads from offset 0 and leaves the cursor where it was on entry.  A stream
/// shorter than the magic is simply not an archive.
pub fn detect_magic<R: Read + Seek>(reader: &mut R) -> io::Result<bool> {
    let origin = reader.stream_position()?;
    reader.seek(SeekFrom::Start(0))?;

    let mut buf = [0u8; MAGIC_SIZE];
    let result = match reader.read_exact(&mut buf) {
        Ok(())                                                => Ok(buf == MAGIC),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e)                                                => Err(e),
    };

    reader.seek(SeekFrom::Start(origin))?;
    result
}
