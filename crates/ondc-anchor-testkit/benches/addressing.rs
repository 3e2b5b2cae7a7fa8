use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use ondc_anchor_core::{address_of, canonical_content, Content, Value};
use ondc_anchor_testkit::fixtures::{product_content, TestFixture};

fn wide_content(fields: usize) -> Content {
    (0..fields)
        .map(|i| (format!("field{i}"), Value::from(format!("value number {i}"))))
        .collect()
}

fn bench_canonical_content(c: &mut Criterion) {
    let mut group = c.benchmark_group("canonical_content");
    for fields in [4, 16, 64] {
        let content = wide_content(fields);
        group.bench_with_input(BenchmarkId::from_parameter(fields), &content, |b, content| {
            b.iter(|| canonical_content(black_box(content)))
        });
    }
    group.finish();
}

fn bench_address_of(c: &mut Criterion) {
    let bytes = canonical_content(&wide_content(16));
    c.bench_function("address_of/16_fields", |b| {
        b.iter(|| address_of(black_box(&bytes)))
    });
}

fn bench_stream_build(c: &mut Criterion) {
    let fixture = TestFixture::new();
    c.bench_function("stream_build/product", |b| {
        b.iter(|| fixture.stream(&fixture.owner, black_box(product_content("tv")), None))
    });
}

criterion_group!(
    benches,
    bench_canonical_content,
    bench_address_of,
    bench_stream_build
);
criterion_main!(benches);
