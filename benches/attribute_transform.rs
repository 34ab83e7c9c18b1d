// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

#![allow(missing_docs)]

//! Benchmarks attribute accumulation: appending attribute rows under varying
//! row counts and key cardinalities, then building the sparse-union Arrow
//! arrays from them.

use criterion::{BatchSize, BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use otap_trace_producer::attributes::{AttributeAccumulator, ParentWidth};
use otap_trace_producer::config::ProducerConfig;
use otap_trace_producer::model::AttributeValue;
use otap_trace_producer::payload::ArrowPayloadType;
use otap_trace_producer::schema::field::IndexWidth;

fn build_rows(row_count: usize, distinct_keys: usize) -> Vec<(u32, String, AttributeValue)> {
    (0..row_count)
        .map(|i| {
            let key = format!("attr.key.{}", i % distinct_keys);
            let value = AttributeValue::Str(format!("value-{i}"));
            (i as u32, key, value)
        })
        .collect()
}

fn append_and_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("AttributeAccumulator append+build");

    for &row_count in &[100usize, 1_000, 10_000] {
        for &distinct_keys in &[4usize, 64] {
            let rows = build_rows(row_count, distinct_keys);
            let id = BenchmarkId::new(format!("keys={distinct_keys}"), row_count);
            group.bench_with_input(id, &rows, |b, rows| {
                b.iter_batched(
                    || {
                        AttributeAccumulator::new(ParentWidth::U16, IndexWidth::U16, 0.3, 100)
                    },
                    |mut acc| {
                        for (parent_id, key, value) in rows {
                            acc.append(*parent_id, key, value.clone());
                        }
                        let config = ProducerConfig::default();
                        black_box(acc.build(&config, ArrowPayloadType::SpanAttrs).expect("build"))
                    },
                    BatchSize::SmallInput,
                )
            });
        }
    }

    group.finish();
}

fn high_cardinality_dictionary_growth(c: &mut Criterion) {
    let mut group = c.benchmark_group("AttributeAccumulator dictionary promotion");

    // Every value is distinct, forcing the string-value dictionary to widen
    // its physical bookkeeping repeatedly across one `build` call.
    let rows: Vec<(u32, String, AttributeValue)> = (0..5_000u32)
        .map(|i| (i, "unique.key".to_string(), AttributeValue::Str(format!("v{i}"))))
        .collect();

    _ = group.bench_function("5000 distinct string values, one key", |b| {
        b.iter_batched(
            || AttributeAccumulator::new(ParentWidth::U16, IndexWidth::U16, 0.3, 100),
            |mut acc| {
                for (parent_id, key, value) in &rows {
                    acc.append(*parent_id, key, value.clone());
                }
                let config = ProducerConfig::default();
                black_box(acc.build(&config, ArrowPayloadType::SpanAttrs).expect("build"))
            },
            BatchSize::SmallInput,
        )
    });

    group.finish();
}

criterion_group!(
    attribute_transform,
    append_and_build,
    high_cardinality_dictionary_growth
);
criterion_main!(attribute_transform);
