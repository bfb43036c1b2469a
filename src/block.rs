//! Fixed-size blocks and their Data chunks.
//!
//! A source is cut into [`BLOCK_SIZE`] blocks; each block becomes exactly one
//! Data chunk (id 17).  Blocks shorter than [`MIN_COMPRESS_LEN`] are stored.
//! Everything else goes through the codec and whatever it returns is kept,
//! even when it is larger than the block.

use std::borrow::Cow;
use std::io::{self, Read, Write};

use crate::checksum::{adler32, Adler32};
use crate::chunk::{ChunkHeader, CHUNK_DATA, METHOD_STORED};
use crate::codec::{Codec, CodecError, CompressionLevel};
use crate::error::{Error, Result};

/// 2 × 64 KiB, for packing and unpacking alike.
pub const BLOCK_SIZE: usize = 2 * 64 * 1024;

/// Blocks below this length are never handed to a codec.
pub const MIN_COMPRESS_LEN: usize = 32;

/// A Data chunk ready to be written.
#[derive(Debug, Clone)]
pub struct EncodedBlock<'a> {
    pub header:  ChunkHeader,
    pub payload: Cow<'a, [u8]>,
}

impl EncodedBlock<'_> {
    pub fn is_stored(&self) -> bool {
        self.header.options == METHOD_STORED
    }

    pub fn write<W: Write>(&self, mut writer: W) -> io::Result<()> {
        self.header.write(&mut writer)?;
        writer.write_all(&self.payload)
    }
}

/// Frame one block as a Data chunk.
pub fn encode_block<'a>(
    block: &'a [u8],
    codec: &dyn Codec,
    level: CompressionLevel,
) -> std::result::Result<EncodedBlock<'a>, CodecError> {
    let (options, payload) = if block.len() < MIN_COMPRESS_LEN {
        (METHOD_STORED, Cow::Borrowed(block))
    } else {
        (codec.method(), Cow::Owned(codec.compress(level, block)?))
    };

    let header = ChunkHeader {
        id:       CHUNK_DATA,
        options,
        size:     payload.len() as u32,
        checksum: adler32(&payload),
        extra:    block.len() as u32,
    };
    Ok(EncodedBlock { header, payload })
}

/// Fill `buf` from `reader`, stopping early only at end of input.
///
/// Returns the number of bytes placed in `buf`; a short count means the
/// source is exhausted.
pub fn read_block<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

// ── Scratch buffers ──────────────────────────────────────────────────────────

/// A buffer that grows to the largest length requested and never shrinks.
#[derive(Debug, Default)]
pub struct ScratchBuffer {
    buf: Vec<u8>,
}

impl ScratchBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A writable view of exactly `len` bytes.
    pub fn get(&mut self, len: usize) -> &mut [u8] {
        if len > self.buf.len() {
            self.buf.resize(len, 0);
        }
        &mut self.buf[..len]
    }

    /// High-water mark.
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }
}

// ── Decoding ─────────────────────────────────────────────────────────────────

/// Reverses [`encode_block`], owning the two scratch buffers of an unpack run.
#[derive(Debug, Default)]
pub struct BlockDecoder {
    compressed:   ScratchBuffer,
    decompressed: ScratchBuffer,
}

impl BlockDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy a stored payload to `output`, checksumming as it streams.
    ///
    /// The payload is moved in pieces of at most [`BLOCK_SIZE`] and compared
    /// with the declared checksum once the whole chunk has been seen.  Bytes
    /// are already in `output` when a mismatch is reported; the caller
    /// discards that output.
    pub fn copy_stored<R: Read, W: Write>(
        &mut self,
        header:  &ChunkHeader,
        mut payload: R,
        mut output: W,
    ) -> Result<u64> {
        let mut remaining = header.size as usize;
        let mut sum = Adler32::new();
        let buf = self.decompressed.get(BLOCK_SIZE.min(remaining));

        while remaining > 0 {
            let want = remaining.min(buf.len());
            payload.read_exact(&mut buf[..want])?;
            sum.update(&buf[..want]);
            output.write_all(&buf[..want])?;
            remaining -= want;
        }

        verify(header.checksum, sum.finish())?;
        Ok(u64::from(header.size))
    }

    /// Read, verify and decompress a compressed payload.
    ///
    /// The returned slice is exactly `header.extra` bytes long.
    pub fn decode_compressed<R: Read>(
        &mut self,
        header:  &ChunkHeader,
        mut payload: R,
        codec:   &dyn Codec,
    ) -> Result<&[u8]> {
        let input = self.compressed.get(header.size as usize);
        payload.read_exact(input)?;
        verify(header.checksum, adler32(input))?;

        let expected = header.extra;
        let output = self.decompressed.get(expected as usize);
        let produced = codec.decompress_into(input, output)?;
        if produced != expected as usize {
            return Err(Error::DecompressionFailed { expected, actual: produced });
        }
        Ok(output)
    }

    /// Current sizes of the (compressed, decompressed) scratch buffers.
    pub fn scratch_capacity(&self) -> (usize, usize) {
        (self.compressed.capacity(), self.decompressed.capacity())
    }
}

fn verify(expected: u32, actual: u32) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(Error::ChecksumMismatch { expected, actual })
    }
}
