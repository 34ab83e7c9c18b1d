// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

#![allow(missing_docs)]

//! Benchmarks counting spans/events/links in a trace tree, and building one
//! batch of Arrow payloads from it end to end.

use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use otap_trace_producer::config::ProducerConfig;
use otap_trace_producer::model::{
    AttributeMap, AttributeValue, InstrumentationScope, Resource, ResourceSpans, ScopeSpans,
    Span, SpanEvent, SpanKind, SpanLink, Traces,
};
use otap_trace_producer::producer::TracesProducer;

fn create_traces() -> Traces {
    let mut resource_spans = Vec::new();

    for r in 0..10 {
        let mut attrs = AttributeMap::new();
        let _ = attrs.insert("service.name".into(), AttributeValue::Str(format!("svc-{r}")));
        let resource = Resource {
            attributes: attrs,
            dropped_attributes_count: 0,
        };

        let mut scope_spans = Vec::new();
        for _ in 0..10 {
            let scope = InstrumentationScope {
                name: "library".into(),
                version: "1.0".into(),
                attributes: AttributeMap::new(),
                dropped_attributes_count: 0,
            };

            let mut spans = Vec::new();
            for s in 0..10 {
                let mut span_attrs = AttributeMap::new();
                let _ = span_attrs.insert("http.method".into(), AttributeValue::Str("GET".into()));
                let _ = span_attrs.insert("http.status_code".into(), AttributeValue::Int(200));

                let event = SpanEvent {
                    time_unix_nano: 2_000_000_000,
                    name: "exception".into(),
                    attributes: AttributeMap::new(),
                    dropped_attributes_count: 0,
                };
                let link = SpanLink {
                    trace_id: [7; 16],
                    span_id: [8; 8],
                    trace_state: None,
                    attributes: AttributeMap::new(),
                    dropped_attributes_count: 0,
                };

                spans.push(Span {
                    start_time_unix_nano: 1_000_000_000,
                    end_time_unix_nano: 1_000_500_000 + s as u64,
                    trace_id: [1; 16],
                    span_id: [s as u8; 8],
                    trace_state: None,
                    parent_span_id: None,
                    name: "GET /".into(),
                    kind: SpanKind::Server,
                    attributes: span_attrs,
                    dropped_attributes_count: 0,
                    events: vec![event],
                    dropped_events_count: 0,
                    links: vec![link],
                    dropped_links_count: 0,
                    status: None,
                });
            }

            scope_spans.push(ScopeSpans {
                scope,
                schema_url: "http://schema.opentelemetry.io".into(),
                spans,
            });
        }

        resource_spans.push(ResourceSpans {
            resource,
            schema_url: String::new(),
            scope_spans,
        });
    }

    Traces { resource_spans }
}

fn count_spans(c: &mut Criterion) {
    let mut group = c.benchmark_group("Trace span counting");

    let traces = create_traces();

    _ = group.bench_function("Manual", |b| {
        b.iter(|| {
            let mut count = 0;
            for rs in &traces.resource_spans {
                for ss in &rs.scope_spans {
                    count += ss.spans.len();
                }
            }
            black_box(count)
        })
    });

    _ = group.bench_function("FlatMap", |b| {
        b.iter(|| {
            traces
                .resource_spans
                .iter()
                .flat_map(|rs| &rs.scope_spans)
                .flat_map(|ss| &ss.spans)
                .count()
        })
    });

    group.finish();
}

fn build_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("Producer build_batch");

    let traces = create_traces();

    _ = group.bench_function("1000 spans, cold producer", |b| {
        b.iter(|| {
            let mut producer = TracesProducer::new(ProducerConfig::default());
            black_box(producer.build_batch(&traces).expect("batch"))
        })
    });

    let mut warm = TracesProducer::new(ProducerConfig::default());
    let _ = warm.build_batch(&traces).expect("warm-up batch");
    _ = group.bench_function("1000 spans, warm producer", |b| {
        b.iter(|| black_box(warm.build_batch(&traces).expect("batch")))
    });

    group.finish();
}

criterion_group!(item_count, count_spans, build_batch);
criterion_main!(item_count);
