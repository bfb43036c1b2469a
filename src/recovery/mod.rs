//! Damage assessment for archives that may be corrupt or truncated.

pub mod scanner;

pub use scanner::{scan, scan_file, ChunkHealth, ScanReport, ScannedChunk, ScannedEntry};
