//! Compression primitives behind Data chunks.
//!
//! A codec is identified on disk only by the `options` field of each Data
//! chunk.  `0` means the payload is stored verbatim and never reaches a
//! codec; `1` is the default codec (Zstandard).  Methods above 1 are
//! extensions carried by this implementation.  A reader that does not know a
//! method discards the file being extracted and keeps scanning.
//!
//! # Contract
//! - `compress` may return more bytes than it was given; callers accept the
//!   expansion rather than falling back to storing.
//! - `decompress_into` never writes past the end of `output` and reports how
//!   many bytes it produced.  Producing a different length than the chunk
//!   declares is the caller's concern.

use std::io::{self, Cursor, Write};
use thiserror::Error;

// ── Compression level ────────────────────────────────────────────────────────

/// The two levels every codec accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionLevel {
    /// Level 1: fastest.
    Fast,
    /// Level 2: slower, better ratio.
    #[default]
    Ratio,
}

impl CompressionLevel {
    pub fn as_u8(self) -> u8 {
        match self {
            CompressionLevel::Fast  => 1,
            CompressionLevel::Ratio => 2,
        }
    }
}

impl TryFrom<u8> for CompressionLevel {
    type Error = CodecError;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        match level {
            1 => Ok(CompressionLevel::Fast),
            2 => Ok(CompressionLevel::Ratio),
            other => Err(CodecError::Compression(format!(
                "unsupported compression level {other} (expected 1 or 2)"
            ))),
        }
    }
}

// ── CodecId ──────────────────────────────────────────────────────────────────

pub const METHOD_ZSTD:   u16 = 1;
pub const METHOD_LZ4:    u16 = 2;
pub const METHOD_BROTLI: u16 = 3;
pub const METHOD_LZMA:   u16 = 4;

/// Built-in codecs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CodecId {
    #[default]
    Zstd,
    Lz4,
    Brotli,
    Lzma,
}

impl CodecId {
    /// The `options` value written into Data chunks.
    #[inline]
    pub fn method(self) -> u16 {
        match self {
            CodecId::Zstd   => METHOD_ZSTD,
            CodecId::Lz4    => METHOD_LZ4,
            CodecId::Brotli => METHOD_BROTLI,
            CodecId::Lzma   => METHOD_LZMA,
        }
    }

    /// Human-readable name, for diagnostics only. Never written to disk.
    pub fn name(self) -> &'static str {
        match self {
            CodecId::Lz4    => "lz4",
            CodecId::Zstd   => "zstd",
            CodecId::Brotli => "brotli",
            CodecId::Lzma   => "lzma",
        }
    }

    /// Parse from a CLI string.
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "lz4"    => Some(CodecId::Lz4),
            "zstd"   => Some(CodecId::Zstd),
            "brotli" => Some(CodecId::Brotli),
            "lzma"   => Some(CodecId::Lzma),
            _        => None,
        }
    }

    pub const ALL: [CodecId; 4] = [CodecId::Zstd, CodecId::Lz4, CodecId::Brotli, CodecId::Lzma];
}

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Compression error: {0}")]
    Compression(String),
    #[error("Decompression error: {0}")]
    Decompression(String),
    #[error("Unknown compression method ({0})")]
    UnknownMethod(u16),
}

// ── Codec trait ──────────────────────────────────────────────────────────────

pub trait Codec: Send + Sync {
    /// Value of the Data chunk `options` field for payloads from this codec.
    fn method(&self) -> u16;

    fn name(&self) -> &'static str;

    fn compress(&self, level: CompressionLevel, input: &[u8]) -> Result<Vec<u8>, CodecError>;

    /// Decompress `input` into `output`, returning the number of bytes written.
    fn decompress_into(&self, input: &[u8], output: &mut [u8]) -> Result<usize, CodecError>;

    /// Decompress into a fresh buffer of at most `max_output_len` bytes.
    fn decompress(&self, input: &[u8], max_output_len: usize) -> Result<Vec<u8>, CodecError> {
        let mut out = vec![0u8; max_output_len];
        let n = self.decompress_into(input, &mut out)?;
        out.truncate(n);
        Ok(out)
    }
}

// ── Built-in codec implementations ──────────────────────────────────────────

/// LZ4 block format.  LZ4 has a single encoder, so both levels match.
pub struct Lz4Codec;
impl Codec for Lz4Codec {
    fn method(&self) -> u16 { METHOD_LZ4 }
    fn name(&self) -> &'static str { "lz4" }
    fn compress(&self, _: CompressionLevel, input: &[u8]) -> Result<Vec<u8>, CodecError> {
        Ok(lz4_flex::block::compress(input))
    }
    fn decompress_into(&self, input: &[u8], output: &mut [u8]) -> Result<usize, CodecError> {
        lz4_flex::block::decompress_into(input, output)
            .map_err(|e| CodecError::Decompression(e.to_string()))
    }
}

pub struct ZstdCodec;
impl Codec for ZstdCodec {
    fn method(&self) -> u16 { METHOD_ZSTD }
    fn name(&self) -> &'static str { "zstd" }
    fn compress(&self, level: CompressionLevel, input: &[u8]) -> Result<Vec<u8>, CodecError> {
        let level = match level {
            CompressionLevel::Fast  => 1,
            CompressionLevel::Ratio => 19,
        };
        zstd::bulk::compress(input, level).map_err(|e| CodecError::Compression(e.to_string()))
    }
    fn decompress_into(&self, input: &[u8], output: &mut [u8]) -> Result<usize, CodecError> {
        zstd::bulk::decompress_to_buffer(input, output)
            .map_err(|e| CodecError::Decompression(e.to_string()))
    }
}

pub struct BrotliCodec;
impl Codec for BrotliCodec {
    fn method(&self) -> u16 { METHOD_BROTLI }
    fn name(&self) -> &'static str { "brotli" }
    fn compress(&self, level: CompressionLevel, input: &[u8]) -> Result<Vec<u8>, CodecError> {
        let quality = match level {
            CompressionLevel::Fast  => 1,
            CompressionLevel::Ratio => 9,
        };
        let mut out = Vec::new();
        {
            let mut w = brotli::CompressorWriter::new(&mut out, 4096, quality, 22);
            w.write_all(input).map_err(|e| CodecError::Compression(e.to_string()))?;
        }
        Ok(out)
    }
    fn decompress_into(&self, input: &[u8], output: &mut [u8]) -> Result<usize, CodecError> {
        let mut sink = Cursor::new(output);
        io::copy(&mut brotli::Decompressor::new(input, 4096), &mut sink)
            .map_err(|e| CodecError::Decompression(e.to_string()))?;
        Ok(sink.position() as usize)
    }
}

/// LZMA (lzma-rs has no tunable levels).
pub struct LzmaCodec;
impl Codec for LzmaCodec {
    fn method(&self) -> u16 { METHOD_LZMA }
    fn name(&self) -> &'static str { "lzma" }
    fn compress(&self, _: CompressionLevel, input: &[u8]) -> Result<Vec<u8>, CodecError> {
        let mut out = Vec::new();
        lzma_rs::lzma_compress(&mut Cursor::new(input), &mut out)
            .map_err(|e| CodecError::Compression(e.to_string()))?;
        Ok(out)
    }
    fn decompress_into(&self, input: &[u8], output: &mut [u8]) -> Result<usize, CodecError> {
        // A full Cursor rejects further writes, which bounds the output.
        let mut sink = Cursor::new(output);
        lzma_rs::lzma_decompress(&mut Cursor::new(input), &mut sink)
            .map_err(|e| CodecError::Decompression(e.to_string()))?;
        Ok(sink.position() as usize)
    }
}

// ── Factory ──────────────────────────────────────────────────────────────────

/// Resolve a CodecId to a built-in codec.
pub fn get_codec(id: CodecId) -> Box<dyn Codec> {
    match id {
        CodecId::Zstd   => Box::new(ZstdCodec),
        CodecId::Lz4    => Box::new(Lz4Codec),
        CodecId::Brotli => Box::new(BrotliCodec),
        CodecId::Lzma   => Box::new(LzmaCodec),
    }
}

/// Every built-in codec, in method order.
pub fn builtin_codecs() -> Vec<Box<dyn Codec>> {
    CodecId::ALL.iter().map(|&id| get_codec(id)).collect()
}
