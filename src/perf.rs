//! Batch block encoding.
//!
//! The writer reads up to [`PIPELINE_DEPTH`] blocks ahead and encodes the
//! batch with [`encode_blocks`].  With the `parallel` feature the batch is
//! compressed on the Rayon pool; without it the blocks are encoded one after
//! another.  Either way the results come back in input order and each
//! chunk's checksum covers exactly its own payload, so the archive bytes are
//! identical in both builds.

use crate::block::{encode_block, EncodedBlock};
use crate::codec::{Codec, CodecError, CompressionLevel};

/// Blocks read ahead of the one being written.
#[cfg(feature = "parallel")]
pub const PIPELINE_DEPTH: usize = 8;
#[cfg(not(feature = "parallel"))]
pub const PIPELINE_DEPTH: usize = 1;

/// Encode `blocks` in order.
///
/// If any block fails, the first error is returned and the batch is dropped.
pub fn encode_blocks<'a, B: AsRef<[u8]> + Sync>(
    blocks: &'a [B],
    codec:  &dyn Codec,
    level:  CompressionLevel,
) -> Result<Vec<EncodedBlock<'a>>, CodecError> {
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;

        blocks
            .par_iter()
            .map(|block| encode_block(block.as_ref(), codec, level))
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        blocks
            .iter()
            .map(|block| encode_block(block.as_ref(), codec, level))
            .collect()
    }
}
