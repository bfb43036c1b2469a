use sixpack::block::{encode_block, BlockDecoder, ScratchBuffer, BLOCK_SIZE, MIN_COMPRESS_LEN};
use sixpack::checksum::adler32;
use sixpack::chunk::{detect_magic, ChunkHeader, ChunkKind, MAGIC, METHOD_STORED};
use sixpack::codec::{get_codec, CodecId, CompressionLevel, METHOD_LZ4};
use sixpack::entry::{display_name, FileEntry};
use sixpack::error::Error;
use sixpack::io_stream::SixPackWriter;
use std::io::{Cursor, Seek, SeekFrom};
use std::path::Path;

#[test]
fn test_exact_byte_layout() {
    let entry = FileEntry::new("a.txt", 3).unwrap();
    let mut writer = SixPackWriter::new(Cursor::new(Vec::new())).unwrap();
    writer
        .pack_stream(&entry, &b"abc"[..], get_codec(CodecId::Lz4).as_ref(), CompressionLevel::Ratio)
        .unwrap();
    let bytes = writer.finish().unwrap().into_inner();

    let entry_payload: &[u8] = &[
        3, 0, 0, 0, // original size
        0, 0, 0, 0, // reserved
        6, 0, // name length, terminator included
        b'a', b'.', b't', b'x', b't', 0,
    ];

    let mut expected = Vec::new();
    expected.extend_from_slice(&[0x89, 0x36, 0x50, 0x4B, 0x0D, 0x0A, 0x1A, 0x0A]);
    expected.extend_from_slice(&[1, 0, 0, 0]);
    expected.extend_from_slice(&16u32.to_le_bytes());
    expected.extend_from_slice(&adler32(entry_payload).to_le_bytes());
    expected.extend_from_slice(&0u32.to_le_bytes());
    expected.extend_from_slice(entry_payload);
    expected.extend_from_slice(&[17, 0, 0, 0]);
    expected.extend_from_slice(&3u32.to_le_bytes());
    expected.extend_from_slice(&adler32(b"abc").to_le_bytes());
    expected.extend_from_slice(&3u32.to_le_bytes());
    expected.extend_from_slice(b"abc");

    assert_eq!(bytes, expected);
}

#[test]
fn test_chunk_header_layout() {
    let header = ChunkHeader { id: 17, options: 1, size: 0x0102_0304, checksum: 0xAABB_CCDD, extra: 5 };
    let mut buf = Vec::new();
    header.write(&mut buf).unwrap();
    assert_eq!(
        buf,
        [17, 0, 1, 0, 4, 3, 2, 1, 0xDD, 0xCC, 0xBB, 0xAA, 5, 0, 0, 0]
    );
    assert_eq!(ChunkHeader::read(&buf[..]).unwrap(), header);
    assert_eq!(header.span(), 16 + 0x0102_0304);
}

#[test]
fn test_chunk_kinds() {
    assert_eq!(ChunkKind::from(1), ChunkKind::FileEntry);
    assert_eq!(ChunkKind::from(17), ChunkKind::Data);
    assert_eq!(ChunkKind::from(2), ChunkKind::Unknown(2));
}

#[test]
fn test_detect_magic_keeps_position() {
    let mut archive = MAGIC.to_vec();
    archive.extend_from_slice(&[0; 32]);
    let mut cursor = Cursor::new(archive);
    cursor.seek(SeekFrom::Start(5)).unwrap();

    assert!(detect_magic(&mut cursor).unwrap());
    assert_eq!(cursor.position(), 5);
    assert!(detect_magic(&mut cursor).unwrap());
    assert_eq!(cursor.position(), 5);

    let mut short = Cursor::new(vec![0x89, b'6', b'P']);
    assert!(!detect_magic(&mut short).unwrap());
    assert_eq!(short.position(), 0);

    let mut other = Cursor::new(b"PK\x03\x04 not ours".to_vec());
    assert!(!detect_magic(&mut other).unwrap());
}

// ── File Entry ───────────────────────────────────────────────────────────────

#[test]
fn test_entry_name_is_last_component() {
    let entry = FileEntry::for_path(Path::new("foo/bar/FILE.txt"), 10).unwrap();
    assert_eq!(entry.name, "FILE.txt");
    assert_eq!(display_name("plain"), "plain");
    assert_eq!(display_name("dir/"), "");
}

#[test]
fn test_entry_rejects_oversized_file() {
    let err = FileEntry::new("huge", 1 << 32).unwrap_err();
    assert!(matches!(err, Error::FileTooLarge(4_294_967_296)));
    assert!(FileEntry::new("limit", u64::from(u32::MAX)).is_ok());
}

#[test]
fn test_entry_decode_clamps_name_length() {
    let mut payload = vec![9, 0, 0, 0, 0, 0, 0, 0];
    payload.extend_from_slice(&500u16.to_le_bytes());
    payload.extend_from_slice(b"short");
    let entry = FileEntry::decode(&payload).unwrap();
    assert_eq!(entry.original_size, 9);
    assert_eq!(entry.name, "short");
}

#[test]
fn test_entry_decode_stops_at_nul() {
    let mut payload = vec![0; 8];
    payload.extend_from_slice(&9u16.to_le_bytes());
    payload.extend_from_slice(b"abc\0junk\0");
    assert_eq!(FileEntry::decode(&payload).unwrap().name, "abc");
}

#[test]
fn test_entry_decode_rejects_short_payload() {
    let err = FileEntry::decode(&[0; 10]).unwrap_err();
    assert!(matches!(err, Error::MalformedEntry(_)));
}

#[test]
fn test_entry_checksum_covers_fields_then_name() {
    let entry = FileEntry::new("x.bin", 77).unwrap();
    let (header, payload) = entry.encode().unwrap();
    assert_eq!(header.id, 1);
    assert_eq!(header.size as usize, payload.len());
    assert_eq!(header.checksum, adler32(&payload));
    assert_eq!(FileEntry::decode(&payload).unwrap(), entry);
}

// ── Blocks ───────────────────────────────────────────────────────────────────

#[test]
fn test_compression_threshold() {
    let codec = get_codec(CodecId::Lz4);

    let below = vec![b'z'; MIN_COMPRESS_LEN - 1];
    let block = encode_block(&below, codec.as_ref(), CompressionLevel::Ratio).unwrap();
    assert!(block.is_stored());
    assert_eq!(block.header.options, METHOD_STORED);
    assert_eq!(&block.payload[..], below.as_slice());

    let at = vec![b'z'; MIN_COMPRESS_LEN];
    let block = encode_block(&at, codec.as_ref(), CompressionLevel::Ratio).unwrap();
    assert_eq!(block.header.options, METHOD_LZ4);
    assert_eq!(block.header.extra as usize, MIN_COMPRESS_LEN);
}

#[test]
fn test_expansion_is_kept() {
    // xorshift output does not compress
    let mut seed = 0xDEAD_BEEFu32;
    let data: Vec<u8> = (0..4096)
        .map(|_| {
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;
            seed as u8
        })
        .collect();
    let codec = get_codec(CodecId::Lz4);
    let block = encode_block(&data, codec.as_ref(), CompressionLevel::Ratio).unwrap();
    assert!(!block.is_stored());
    assert!(block.header.size as usize >= data.len());
    assert_eq!(block.header.checksum, adler32(&block.payload));

    let mut decoder = BlockDecoder::new();
    let out = decoder.decode_compressed(&block.header, &block.payload[..], codec.as_ref()).unwrap();
    assert_eq!(out, data.as_slice());
}

#[test]
fn test_decompressed_length_must_match() {
    let codec = get_codec(CodecId::Zstd);
    let data = vec![b'q'; 1000];
    let mut block = encode_block(&data, codec.as_ref(), CompressionLevel::Fast).unwrap();
    block.header.extra = 2000;

    let mut decoder = BlockDecoder::new();
    let err = decoder.decode_compressed(&block.header, &block.payload[..], codec.as_ref()).unwrap_err();
    assert!(matches!(err, Error::DecompressionFailed { expected: 2000, actual: 1000 }));
}

#[test]
fn test_stored_copy_checks_checksum() {
    let payload = b"stored block contents".to_vec();
    let header = ChunkHeader {
        id:       17,
        options:  METHOD_STORED,
        size:     payload.len() as u32,
        checksum: adler32(&payload) ^ 1,
        extra:    payload.len() as u32,
    };
    let mut decoder = BlockDecoder::new();
    let mut out = Vec::new();
    let err = decoder.copy_stored(&header, &payload[..], &mut out).unwrap_err();
    assert!(matches!(err, Error::ChecksumMismatch { .. }));
}

#[test]
fn test_scratch_buffer_only_grows() {
    let mut scratch = ScratchBuffer::new();
    assert_eq!(scratch.get(100).len(), 100);
    assert_eq!(scratch.capacity(), 100);
    assert_eq!(scratch.get(10).len(), 10);
    assert_eq!(scratch.capacity(), 100);
    scratch.get(BLOCK_SIZE);
    assert_eq!(scratch.capacity(), BLOCK_SIZE);
}

#[test]
fn test_decoder_scratch_tracks_largest_chunk() {
    let codec = get_codec(CodecId::Lz4);
    let mut decoder = BlockDecoder::new();
    for len in [5000usize, 200, 12_000] {
        let data = vec![b'r'; len];
        let block = encode_block(&data, codec.as_ref(), CompressionLevel::Fast).unwrap();
        decoder.decode_compressed(&block.header, &block.payload[..], codec.as_ref()).unwrap();
    }
    assert_eq!(decoder.scratch_capacity().1, 12_000);
}
