use criterion::{Criterion, black_box, criterion_group, criterion_main};
use errchain::{Chain, args, decode, encode};

fn deep_chain(depth: usize) -> Chain {
    let mut chain = Chain::with_args("connection to {} refused", args!["db:5432"]);
    for i in 0..depth {
        chain = chain.push(format!("layer {i}")).expect("pushed");
    }
    chain
}

fn bench_push(c: &mut Criterion) {
    // Warmup: the first capture loads debug symbols.
    let _ = Chain::new("warmup");

    c.bench_function("push_capture", |b| {
        b.iter(|| Chain::new(black_box("base")).push(black_box("wrapped")))
    });
}

fn bench_trace(c: &mut Criterion) {
    let chain = deep_chain(16);

    c.bench_function("trace_depth_16", |b| b.iter(|| black_box(&chain).trace()));
}

fn bench_codec(c: &mut Criterion) {
    let chain = deep_chain(16);
    let bytes = encode(&chain).unwrap();

    c.bench_function("encode_depth_16", |b| {
        b.iter(|| encode(black_box(&chain)).unwrap())
    });
    c.bench_function("decode_depth_16", |b| {
        b.iter(|| decode(black_box(&bytes)).unwrap())
    });
}

criterion_group!(benches, bench_push, bench_trace, bench_codec);
criterion_main!(benches);
