//! Frame extraction and display scaling benchmarks
//!
//! Measures how fast a connection buffer turns a pipelined byte stream into
//! frames for different read sizes, and the cost of the scaling pass.
//!
//! Run with: cargo bench --bench framing

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use plotsink::codec::Bitmap;
use plotsink::{encode_frame, FrameBuffer, ScalingPolicy};

/// Read sizes to feed the buffer with
const CHUNK_SIZES: &[usize] = &[7, 1024, 64 * 1024];

/// A stream of `count` frames of `payload_len` bytes each
fn pipelined_stream(count: usize, payload_len: usize) -> Vec<u8> {
    let payload = vec![0xABu8; payload_len];
    let mut stream = Vec::with_capacity(count * (payload_len + 4));
    for _ in 0..count {
        stream.extend(encode_frame(&payload).unwrap());
    }
    stream
}

fn bench_frame_extraction(c: &mut Criterion) {
    let stream = pipelined_stream(64, 32 * 1024);
    let mut group = c.benchmark_group("frame_extraction");
    group.throughput(Throughput::Bytes(stream.len() as u64));

    for &chunk in CHUNK_SIZES {
        group.bench_with_input(BenchmarkId::from_parameter(chunk), &chunk, |b, &chunk| {
            b.iter(|| {
                let mut buffer = FrameBuffer::new();
                let mut frames = 0;
                for piece in stream.chunks(chunk) {
                    buffer.extend(piece);
                    while let Some(frame) = buffer.next_frame() {
                        black_box(&frame);
                        frames += 1;
                    }
                }
                assert_eq!(frames, 64);
            })
        });
    }

    group.finish();
}

fn bench_scaling(c: &mut Criterion) {
    let policy = ScalingPolicy::default();
    let bitmap = Bitmap::new(1600, 1200);
    let mut group = c.benchmark_group("scaling");

    for &width in &[50u32, 400, 800] {
        group.bench_with_input(BenchmarkId::from_parameter(width), &width, |b, &width| {
            b.iter(|| black_box(policy.scale(black_box(&bitmap), width)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_frame_extraction, bench_scaling);
criterion_main!(benches);
