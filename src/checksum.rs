//! Adler-32 (RFC 1950 §8.2) as used by every 6pack chunk.
//!
//! The checksum of a region starts at [`ADLER32_INIT`] and is folded over the
//! region's bytes with [`update_adler32`].  Folding is composable, so a region
//! may be fed in any number of pieces:
//!
//! ```
//! use sixpack::checksum::{update_adler32, ADLER32_INIT};
//!
//! let whole = update_adler32(ADLER32_INIT, b"Wikipedia");
//! let split = update_adler32(update_adler32(ADLER32_INIT, b"Wiki"), b"pedia");
//! assert_eq!(whole, 0x11E6_0398);
//! assert_eq!(whole, split);
//! ```

use std::io::{self, Write};

/// Largest prime smaller than 2^16.
pub const ADLER32_BASE: u32 = 65521;

/// Starting value of every independently checksummed region.
pub const ADLER32_INIT: u32 = 1;

/// Largest run of bytes that can be summed before `s2` may overflow a u32.
const NMAX: usize = 5552;

/// Fold `buf` into a running Adler-32 value.
pub fn update_adler32(checksum: u32, buf: &[u8]) -> u32 {
    let mut s1 = checksum & 0xffff;
    let mut s2 = checksum >> 16;

    // Reduce once per run; both sums stay below 2^32 within NMAX bytes.
    for run in buf.chunks(NMAX) {
        for &byte in run {
            s1 += u32::from(byte);
            s2 += s1;
        }
        s1 %= ADLER32_BASE;
        s2 %= ADLER32_BASE;
    }

    (s2 << 16) | s1
}

/// Rolling accumulator over one region.
///
/// Also implements [`Write`] so a region can be checksummed by copying into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Adler32(u32);

impl Adler32 {
    pub fn new() -> Self {
        Self(ADLER32_INIT)
    }

    /// Resume from a previously finished value.
    pub fn from_value(value: u32) -> Self {
        Self(value)
    }

    pub fn update(&mut self, buf: &[u8]) {
        self.0 = update_adler32(self.0, buf);
    }

    pub fn finish(&self) -> u32 {
        self.0
    }
}

impl Default for Adler32 {
    fn default() -> Self {
        Self::new()
    }
}

impl Write for Adler32 {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Checksum of a whole region in one call.
pub fn adler32(buf: &[u8]) -> u32 {
    update_adler32(ADLER32_INIT, buf)
}
