use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use sixpack::checksum::adler32;
use sixpack::codec::{get_codec, CodecId, CompressionLevel};
use sixpack::entry::FileEntry;
use sixpack::io_stream::{MemorySink, SixPackReader, SixPackWriter};
use std::io::Cursor;

const MIB: usize = 1024 * 1024;

fn sample() -> Vec<u8> {
    b"6pack bench payload with a little repetition, "
        .iter()
        .copied()
        .cycle()
        .take(MIB)
        .collect()
}

fn pack(data: &[u8], codec: CodecId, level: CompressionLevel) -> Vec<u8> {
    let entry = FileEntry::new("bench.bin", data.len() as u64).unwrap();
    let mut writer = SixPackWriter::new(Cursor::new(Vec::with_capacity(data.len()))).unwrap();
    writer.pack_stream(&entry, data, get_codec(codec).as_ref(), level).unwrap();
    writer.finish().unwrap().into_inner()
}

fn bench_adler32(c: &mut Criterion) {
    let data = vec![0xA5u8; MIB];
    let mut group = c.benchmark_group("adler32");
    group.throughput(Throughput::Bytes(data.len() as u64));
    group.bench_function("1mb", |b| b.iter(|| adler32(black_box(&data))));
    group.finish();
}

fn bench_pack(c: &mut Criterion) {
    let data = sample();
    let mut group = c.benchmark_group("pack");
    group.throughput(Throughput::Bytes(data.len() as u64));
    group.bench_function("1mb_lz4_fast", |b| {
        b.iter(|| pack(black_box(&data), CodecId::Lz4, CompressionLevel::Fast))
    });
    group.bench_function("1mb_zstd_fast", |b| {
        b.iter(|| pack(black_box(&data), CodecId::Zstd, CompressionLevel::Fast))
    });
    group.finish();
}

fn bench_unpack(c: &mut Criterion) {
    let archive = pack(&sample(), CodecId::Lz4, CompressionLevel::Ratio);
    let mut group = c.benchmark_group("unpack");
    group.throughput(Throughput::Bytes(MIB as u64));
    group.bench_function("1mb_lz4", |b| {
        b.iter(|| {
            let mut reader = SixPackReader::new(Cursor::new(black_box(&archive[..]))).unwrap();
            let mut sink = MemorySink::default();
            reader.unpack_into(&mut sink).unwrap();
            sink
        })
    });
    group.finish();
}

criterion_group!(benches, bench_adler32, bench_pack, bench_unpack);
criterion_main!(benches);
