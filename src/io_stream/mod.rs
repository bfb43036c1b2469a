//! Streaming archive engine: writer and reader.
//!
//! # Writer
//! [`SixPackWriter`] emits the magic, one File Entry chunk and then one Data
//! chunk per source block.  It needs only [`Write`]; nothing is ever patched
//! after the fact, so a partially written archive is still a valid prefix.
//!
//! # Reader
//! [`SixPackReader`] checks the magic and then walks chunks by their declared
//! `size`, never by parsing payloads, which is what lets unknown chunk ids
//! pass through untouched.  [`SixPackReader::unpack_into`] drives extraction:
//!
//! - a File Entry closes the file in progress and opens the next one through
//!   an [`EntrySink`] (which may decline, e.g. when the target exists);
//! - a Data chunk is verified, decompressed or copied, and appended;
//! - a checksum or decompression failure discards the file in progress and
//!   the walk continues with the next chunk.
//!
//! Nothing is buffered beyond one chunk.

use std::io::{self, Read, Seek, SeekFrom, Write};
use tracing::{debug, info, warn};

use crate::block::{encode_block, read_block, BlockDecoder, EncodedBlock, BLOCK_SIZE};
use crate::checksum::adler32;
use crate::chunk::{
    detect_magic, write_magic, ChunkHeader, ChunkKind, CHUNK_HEADER_SIZE, MAGIC_SIZE,
    METHOD_STORED,
};
use crate::codec::{builtin_codecs, Codec, CodecError, CompressionLevel};
use crate::entry::{FileEntry, ENTRY_FIXED_SIZE};
use crate::error::{Error, Result};
use crate::perf::{encode_blocks, PIPELINE_DEPTH};

// ── Writer ───────────────────────────────────────────────────────────────────

/// Counters for one packed stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    pub bytes_read:    u64,
    pub data_chunks:   u32,
    pub stored_chunks: u32,
}

pub struct SixPackWriter<W: Write> {
    writer:        W,
    bytes_written: u64,
}

impl<W: Write> SixPackWriter<W> {
    /// Start an archive by writing the magic.
    pub fn new(mut writer: W) -> io::Result<Self> {
        write_magic(&mut writer)?;
        Ok(Self { writer, bytes_written: MAGIC_SIZE as u64 })
    }

    pub fn write_file_entry(&mut self, entry: &FileEntry) -> Result<()> {
        let (header, payload) = entry.encode()?;
        self.write_chunk(&header, &payload)?;
        Ok(())
    }

    pub fn write_block(&mut self, block: &EncodedBlock<'_>) -> io::Result<()> {
        block.write(&mut self.writer)?;
        self.bytes_written += block.header.span();
        Ok(())
    }

    /// Write a chunk exactly as given.  No field is checked.
    pub fn write_chunk(&mut self, header: &ChunkHeader, payload: &[u8]) -> io::Result<()> {
        header.write(&mut self.writer)?;
        self.writer.write_all(payload)?;
        self.bytes_written += (CHUNK_HEADER_SIZE + payload.len()) as u64;
        Ok(())
    }

    /// Write `entry` followed by the blocks of `source`.
    ///
    /// The source is read to its end.  When the number of bytes read differs
    /// from `entry.original_size` every chunk is still written and flushed,
    /// and [`Error::ShortRead`] is returned.
    pub fn pack_stream<R: Read>(
        &mut self,
        entry:      &FileEntry,
        mut source: R,
        codec:      &dyn Codec,
        level:      CompressionLevel,
    ) -> Result<StreamStats> {
        self.write_file_entry(entry)?;

        let mut stats = StreamStats::default();
        let mut blocks: Vec<Vec<u8>> = vec![Vec::with_capacity(BLOCK_SIZE); PIPELINE_DEPTH];
        let mut exhausted = false;

        while !exhausted {
            let mut batch = 0;
            while batch < blocks.len() {
                let buf = &mut blocks[batch];
                buf.resize(BLOCK_SIZE, 0);
                let n = read_block(&mut source, buf)?;
                buf.truncate(n);
                if n > 0 {
                    batch += 1;
                    stats.bytes_read += n as u64;
                }
                if n < BLOCK_SIZE {
                    exhausted = true;
                    break;
                }
            }

            for block in encode_blocks(&blocks[..batch], codec, level)? {
                debug!(
                    options = block.header.options,
                    size = block.header.size,
                    extra = block.header.extra,
                    "data chunk"
                );
                if block.is_stored() {
                    stats.stored_chunks += 1;
                }
                stats.data_chunks += 1;
                self.write_block(&block)?;
            }
        }

        self.writer.flush()?;

        let expected = u64::from(entry.original_size);
        if stats.bytes_read != expected {
            warn!(name = %entry.name, expected, read = stats.bytes_read, "source size changed while packing");
            return Err(Error::ShortRead { expected, actual: stats.bytes_read });
        }
        Ok(stats)
    }

    /// Encode and write a single block.
    pub fn pack_block(
        &mut self,
        block: &[u8],
        codec: &dyn Codec,
        level: CompressionLevel,
    ) -> Result<ChunkHeader> {
        let encoded = encode_block(block, codec, level)?;
        self.write_block(&encoded)?;
        Ok(encoded.header)
    }

    /// Archive bytes produced so far, magic included.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Flush and hand back the underlying writer.
    pub fn finish(mut self) -> io::Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

// ── Chunk walk ───────────────────────────────────────────────────────────────

/// One chunk positioned at its payload.
pub struct Chunk<'a, R> {
    /// Archive offset of the chunk header.
    pub offset:    u64,
    pub header:    ChunkHeader,
    /// Payload bytes actually present in the archive.
    pub available: u64,
    payload:       io::Take<&'a mut R>,
}

impl<'a, R: Read> Chunk<'a, R> {
    pub fn kind(&self) -> ChunkKind {
        self.header.kind()
    }

    pub fn is_truncated(&self) -> bool {
        self.available < u64::from(self.header.size)
    }

    /// Fail with [`Error::Truncated`] when the payload runs past the archive.
    pub fn ensure_complete(&self) -> Result<()> {
        if self.is_truncated() {
            return Err(Error::Truncated {
                offset:    self.offset,
                declared:  self.header.size,
                available: self.available,
            });
        }
        Ok(())
    }

    /// The payload, limited to the bytes that belong to this chunk.
    pub fn payload(&mut self) -> &mut io::Take<&'a mut R> {
        &mut self.payload
    }

    /// Read the whole payload into memory.
    pub fn read_payload(&mut self) -> Result<Vec<u8>> {
        self.ensure_complete()?;
        let mut buf = vec![0u8; self.header.size as usize];
        self.payload.read_exact(&mut buf)?;
        Ok(buf)
    }
}

/// Sequential walk over the chunks that follow the magic.
pub struct Chunks<R> {
    reader:      R,
    len:         u64,
    next_offset: u64,
}

impl<R: Read + Seek> Chunks<R> {
    fn new(mut reader: R) -> io::Result<Self> {
        let len = reader.seek(SeekFrom::End(0))?;
        Ok(Self { reader, len, next_offset: MAGIC_SIZE as u64 })
    }

    /// Advance to the next chunk.
    ///
    /// Each call seeks to `previous offset + 16 + previous size`, whatever was
    /// or was not read from the previous payload.  Returns `None` at the end
    /// of the archive, including when fewer than 16 bytes remain.
    pub fn next_chunk(&mut self) -> io::Result<Option<Chunk<'_, R>>> {
        let offset = self.next_offset;
        if offset >= self.len {
            return Ok(None);
        }
        let remaining = self.len - offset;
        if remaining < CHUNK_HEADER_SIZE as u64 {
            warn!(offset, remaining, "trailing bytes too short for a chunk header");
            self.next_offset = self.len;
            return Ok(None);
        }

        self.reader.seek(SeekFrom::Start(offset))?;
        let header = ChunkHeader::read(&mut self.reader)?;
        self.next_offset = offset + header.span();

        let available = (remaining - CHUNK_HEADER_SIZE as u64).min(u64::from(header.size));
        Ok(Some(Chunk {
            offset,
            header,
            available,
            payload: (&mut self.reader).take(available),
        }))
    }

    /// Total archive length in bytes.
    pub fn archive_len(&self) -> u64 {
        self.len
    }
}

// ── Extraction targets ───────────────────────────────────────────────────────

/// Where extracted files go.
pub trait EntrySink {
    type Output: Write;

    /// Open the output for `entry`.  `Ok(None)` skips the entry; the walk
    /// goes on and the entry's Data chunks are ignored.
    fn create(&mut self, entry: &FileEntry) -> io::Result<Option<Self::Output>>;

    /// The entry's last chunk has been written.
    fn finish(&mut self, entry: &FileEntry, output: Self::Output) -> io::Result<()>;

    /// The entry failed verification; drop whatever was written.
    fn discard(&mut self, entry: &FileEntry, output: Self::Output) -> io::Result<()>;
}

/// Collects extracted files in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub files: Vec<(String, Vec<u8>)>,
}

impl MemorySink {
    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.files.iter().find(|(n, _)| n == name).map(|(_, data)| data.as_slice())
    }
}

impl EntrySink for MemorySink {
    type Output = Vec<u8>;

    fn create(&mut self, entry: &FileEntry) -> io::Result<Option<Vec<u8>>> {
        if self.get(&entry.name).is_some() {
            return Ok(None);
        }
        Ok(Some(Vec::with_capacity(entry.original_size as usize)))
    }

    fn finish(&mut self, entry: &FileEntry, output: Vec<u8>) -> io::Result<()> {
        self.files.push((entry.name.clone(), output));
        Ok(())
    }

    fn discard(&mut self, _: &FileEntry, _: Vec<u8>) -> io::Result<()> {
        Ok(())
    }
}

// ── Unpack summary ───────────────────────────────────────────────────────────

#[derive(Debug)]
pub enum EntryStatus {
    Extracted,
    /// The sink declined the entry (target exists or cannot be created).
    Skipped,
    /// A chunk failed verification; the partial output was dropped.
    Discarded(Error),
}

#[derive(Debug)]
pub struct EntryReport {
    pub name:          String,
    pub original_size: u32,
    /// Bytes appended to the output before it was finished or discarded.
    pub written:       u64,
    pub status:        EntryStatus,
}

impl EntryReport {
    /// Extracted with exactly the size its File Entry declared.
    pub fn is_complete(&self) -> bool {
        matches!(self.status, EntryStatus::Extracted) && self.written == u64::from(self.original_size)
    }
}

#[derive(Debug, Default)]
pub struct UnpackSummary {
    pub entries:         Vec<EntryReport>,
    /// File Entry chunks that failed their checksum or could not be decoded.
    pub corrupt_entries: usize,
    /// Recognised chunks with nothing to do: Data chunks with no open file,
    /// File Entries with an implausible size.
    pub ignored_chunks:  usize,
    /// Chunks with an id this reader does not know.
    pub unknown_chunks:  usize,
}

impl UnpackSummary {
    pub fn extracted(&self) -> impl Iterator<Item = &EntryReport> {
        self.entries.iter().filter(|e| matches!(e.status, EntryStatus::Extracted))
    }

    /// Every entry was extracted completely and no entry chunk was corrupt.
    pub fn is_clean(&self) -> bool {
        self.corrupt_entries == 0 && self.entries.iter().all(EntryReport::is_complete)
    }
}

// ── Reader ───────────────────────────────────────────────────────────────────

pub struct SixPackReader<R: Read + Seek> {
    chunks: Chunks<R>,
    codecs: Vec<Box<dyn Codec>>,
}

struct OpenFile<O> {
    entry:   FileEntry,
    output:  O,
    written: u64,
}

impl<R: Read + Seek> SixPackReader<R> {
    pub fn new(reader: R) -> Result<Self> {
        Self::with_codecs(reader, builtin_codecs())
    }

    /// Open an archive that resolves compressed chunks through `codecs`.
    ///
    /// Fails with [`Error::NotAnArchive`] when the magic is missing.
    pub fn with_codecs(mut reader: R, codecs: Vec<Box<dyn Codec>>) -> Result<Self> {
        if !detect_magic(&mut reader)? {
            return Err(Error::NotAnArchive);
        }
        Ok(Self { chunks: Chunks::new(reader)?, codecs })
    }

    pub fn archive_len(&self) -> u64 {
        self.chunks.archive_len()
    }

    pub fn next_chunk(&mut self) -> io::Result<Option<Chunk<'_, R>>> {
        self.chunks.next_chunk()
    }

    /// The chunk walk and the codec set, borrowed separately.
    pub fn parts(&mut self) -> (&mut Chunks<R>, &[Box<dyn Codec>]) {
        (&mut self.chunks, &self.codecs)
    }

    /// Extract every entry of the archive into `sink`.
    ///
    /// Only I/O failures outside a single chunk (seeking the archive, writing
    /// an output) abort the walk.  Everything else is recorded in the summary.
    pub fn unpack_into<S: EntrySink>(&mut self, sink: &mut S) -> Result<UnpackSummary> {
        let mut summary = UnpackSummary::default();
        let mut decoder = BlockDecoder::new();
        let mut current: Option<OpenFile<S::Output>> = None;

        while let Some(mut chunk) = self.chunks.next_chunk()? {
            debug!(
                offset = chunk.offset,
                id = chunk.header.id,
                options = chunk.header.options,
                size = chunk.header.size,
                "chunk"
            );

            match chunk.kind() {
                ChunkKind::FileEntry if is_plausible_entry(&chunk.header) => {
                    if let Some(open) = current.take() {
                        finish_file(sink, open, &mut summary)?;
                    }
                    match read_entry(&mut chunk) {
                        Ok(entry) => current = open_file(sink, entry, &mut summary)?,
                        Err(err) if err.is_local() => {
                            warn!(offset = chunk.offset, %err, "corrupt file entry skipped");
                            summary.corrupt_entries += 1;
                        }
                        Err(err) => return Err(err),
                    }
                }
                ChunkKind::FileEntry => {
                    debug!(offset = chunk.offset, size = chunk.header.size, "file entry with implausible size ignored");
                    summary.ignored_chunks += 1;
                }
                ChunkKind::Data => {
                    let Some(open) = current.as_mut().filter(|f| f.entry.original_size != 0) else {
                        summary.ignored_chunks += 1;
                        continue;
                    };
                    match write_data_chunk(&mut decoder, &self.codecs, &mut chunk, &mut open.output) {
                        Ok(n) => open.written += n,
                        Err(err) => {
                            if let Some(open) = current.take() {
                                warn!(name = %open.entry.name, offset = chunk.offset, %err, "discarding file");
                                if !err.is_local() {
                                    sink.discard(&open.entry, open.output)?;
                                    return Err(err);
                                }
                                discard_file(sink, open, err, &mut summary)?;
                            }
                        }
                    }
                }
                ChunkKind::Unknown(id) => {
                    debug!(offset = chunk.offset, id, "unknown chunk skipped");
                    summary.unknown_chunks += 1;
                }
            }
        }

        if let Some(open) = current.take() {
            finish_file(sink, open, &mut summary)?;
        }
        Ok(summary)
    }
}

pub(crate) fn find_codec(
    codecs: &[Box<dyn Codec>],
    method: u16,
) -> std::result::Result<&dyn Codec, CodecError> {
    codecs
        .iter()
        .find(|c| c.method() == method)
        .map(|c| c.as_ref())
        .ok_or(CodecError::UnknownMethod(method))
}

/// File Entries are only honoured when `10 < size < BLOCK_SIZE`.
pub(crate) fn is_plausible_entry(header: &ChunkHeader) -> bool {
    let size = header.size as usize;
    size > ENTRY_FIXED_SIZE && size < BLOCK_SIZE
}

pub(crate) fn read_entry<R: Read>(chunk: &mut Chunk<'_, R>) -> Result<FileEntry> {
    let payload = chunk.read_payload()?;
    let actual = adler32(&payload);
    if actual != chunk.header.checksum {
        return Err(Error::ChecksumMismatch { expected: chunk.header.checksum, actual });
    }
    FileEntry::decode(&payload)
}

/// Append one Data chunk to `output`; returns the bytes appended.
fn write_data_chunk<R: Read, W: Write>(
    decoder:    &mut BlockDecoder,
    codecs:     &[Box<dyn Codec>],
    chunk:      &mut Chunk<'_, R>,
    mut output: W,
) -> Result<u64> {
    chunk.ensure_complete()?;
    let header = chunk.header;
    match header.options {
        METHOD_STORED => decoder.copy_stored(&header, chunk.payload(), output),
        method => {
            let codec = find_codec(codecs, method)?;
            let data = decoder.decode_compressed(&header, chunk.payload(), codec)?;
            output.write_all(data)?;
            Ok(data.len() as u64)
        }
    }
}

fn open_file<S: EntrySink>(
    sink:    &mut S,
    entry:   FileEntry,
    summary: &mut UnpackSummary,
) -> Result<Option<OpenFile<S::Output>>> {
    match sink.create(&entry)? {
        Some(output) => {
            info!(name = %entry.name, size = entry.original_size, "extracting");
            Ok(Some(OpenFile { entry, output, written: 0 }))
        }
        None => {
            summary.entries.push(EntryReport {
                name:          entry.name,
                original_size: entry.original_size,
                written:       0,
                status:        EntryStatus::Skipped,
            });
            Ok(None)
        }
    }
}

fn finish_file<S: EntrySink>(
    sink:    &mut S,
    open:    OpenFile<S::Output>,
    summary: &mut UnpackSummary,
) -> Result<()> {
    sink.finish(&open.entry, open.output)?;
    if open.written != u64::from(open.entry.original_size) {
        warn!(
            name = %open.entry.name,
            expected = open.entry.original_size,
            written = open.written,
            "extracted size differs from file entry"
        );
    } else {
        info!(name = %open.entry.name, bytes = open.written, "extracted");
    }
    summary.entries.push(EntryReport {
        name:          open.entry.name,
        original_size: open.entry.original_size,
        written:       open.written,
        status:        EntryStatus::Extracted,
    });
    Ok(())
}

fn discard_file<S: EntrySink>(
    sink:    &mut S,
    open:    OpenFile<S::Output>,
    reason:  Error,
    summary: &mut UnpackSummary,
) -> Result<()> {
    sink.discard(&open.entry, open.output)?;
    summary.entries.push(EntryReport {
        name:          open.entry.name,
        original_size: open.entry.original_size,
        written:       open.written,
        status:        EntryStatus::Discarded(reason),
    });
    Ok(())
}
