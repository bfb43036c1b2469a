pub mod checksum;
pub mod chunk;
pub mod entry;
pub mod error;
pub mod codec;
pub mod block;
pub mod perf;
pub mod io_stream;
pub mod archive;
pub mod recovery;

pub use archive::{pack, pack_with_options, unpack, unpack_to, PackOptions, PackSummary, UnpackOptions};
pub use checksum::{adler32, update_adler32, Adler32};
pub use chunk::{ChunkHeader, ChunkKind, MAGIC};
pub use codec::{get_codec, CodecId, CompressionLevel};
pub use entry::FileEntry;
pub use error::{Error, Result};
pub use io_stream::{SixPackReader, SixPackWriter, UnpackSummary};
pub use recovery::{scan, ScanReport};
