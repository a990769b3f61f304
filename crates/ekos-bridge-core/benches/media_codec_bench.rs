//! Criterion benchmarks for the media frame codec.
//!
//! Ekos streams preview images continuously while capturing, so decoding a
//! frame (two byte scans, one JSON parse, one base64 encode) sits on the
//! bridge's hottest path.
//!
//! Run with:
//! ```bash
//! cargo bench --package ekos-bridge-core --bench media_codec_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ekos_bridge_core::{decode_media_frame, encode_media_frame};
use serde_json::{json, Map, Value};

// ── Frame fixtures ────────────────────────────────────────────────────────────

fn make_metadata() -> Map<String, Value> {
    let Value::Object(map) = json!({
        "uuid": "0d5b3c2e",
        "resolution": "4656x3520",
        "bin": "2x2",
        "exposure": 30.0,
        "filter": "Ha",
        "ext": "fits"
    }) else {
        unreachable!("literal is an object")
    };
    map
}

fn make_frame(image_len: usize) -> Vec<u8> {
    let mut image = vec![0x42u8; image_len];
    image[0] = 0xFF;
    image[1] = 0xD8;
    encode_media_frame(&make_metadata(), &image).expect("encode must succeed for benchmark setup")
}

// ── Benchmarks ────────────────────────────────────────────────────────────────

/// Benchmarks decoding frames of typical preview sizes.
fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_media_frame");
    for (name, len) in [("16KiB", 16 * 1024), ("256KiB", 256 * 1024), ("2MiB", 2 * 1024 * 1024)] {
        let frame = make_frame(len);
        group.bench_with_input(BenchmarkId::new("frame", name), &frame, |b, frame| {
            b.iter(|| decode_media_frame(black_box(frame)).expect("decode must succeed"))
        });
    }
    group.finish();
}

/// Benchmarks decoding plus conversion into the JSON text that is published.
fn bench_decode_to_json(c: &mut Criterion) {
    let frame = make_frame(256 * 1024);
    c.bench_function("decode_to_json_256KiB", |b| {
        b.iter(|| {
            decode_media_frame(black_box(&frame))
                .unwrap()
                .into_packet()
                .to_json()
        })
    });
}

criterion_group!(benches, bench_decode, bench_decode_to_json);
criterion_main!(benches);
