// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! End-to-end scenarios driving [`TracesProducer`] through a public
//! [`Traces`] tree and inspecting the resulting Arrow payloads.

use arrow::array::{Array, StringArray, UInt16Array};
use otap_trace_producer::config::ProducerConfig;
use otap_trace_producer::model::{
    AttributeMap, AttributeValue, InstrumentationScope, Resource, ResourceSpans, ScopeSpans, Span,
    SpanKind, Status, StatusCode, Traces,
};
use otap_trace_producer::payload::ArrowPayloadType;
use otap_trace_producer::producer::TracesProducer;

fn span(name: &str, trace_id: u8, attrs: AttributeMap) -> Span {
    Span {
        start_time_unix_nano: 1_000_000_000,
        end_time_unix_nano: 1_000_250_000,
        trace_id: [trace_id; 16],
        span_id: [trace_id; 8],
        trace_state: None,
        parent_span_id: None,
        name: name.to_string(),
        kind: SpanKind::Server,
        attributes: attrs,
        dropped_attributes_count: 0,
        events: Vec::new(),
        dropped_events_count: 0,
        links: Vec::new(),
        dropped_links_count: 0,
        status: None,
    }
}

fn single_scope_traces(spans: Vec<Span>) -> Traces {
    Traces {
        resource_spans: vec![ResourceSpans {
            resource: Resource::default(),
            schema_url: String::new(),
            scope_spans: vec![ScopeSpans {
                scope: InstrumentationScope::default(),
                schema_url: String::new(),
                spans,
            }],
        }],
    }
}

fn payload_of<'a>(
    batch: &'a otap_trace_producer::payload::BatchArrowRecords,
    payload_type: ArrowPayloadType,
) -> Option<&'a otap_trace_producer::payload::ArrowPayload> {
    batch
        .arrow_payloads
        .iter()
        .find(|p| p.payload_type == payload_type)
}

#[test]
fn build_batch_is_deterministic_across_independent_producers() {
    let traces = single_scope_traces(vec![
        span("a", 1, AttributeMap::new()),
        span("b", 2, AttributeMap::new()),
    ]);

    let mut first = TracesProducer::new(ProducerConfig::default());
    let mut second = TracesProducer::new(ProducerConfig::default());

    let batch_a = first.build_batch(&traces).expect("batch a");
    let batch_b = second.build_batch(&traces).expect("batch b");

    assert_eq!(batch_a.arrow_payloads.len(), batch_b.arrow_payloads.len());
    for (a, b) in batch_a.arrow_payloads.iter().zip(&batch_b.arrow_payloads) {
        assert_eq!(a.payload_type, b.payload_type);
        assert_eq!(a.schema_id, b.schema_id);
        assert_eq!(a.record.num_rows(), b.record.num_rows());
    }
}

#[test]
fn reset_clears_rows_but_preserves_dictionary_state() {
    let traces = single_scope_traces(vec![span("a", 1, AttributeMap::new())]);
    let mut producer = TracesProducer::new(ProducerConfig::default());

    let first = producer.build_batch(&traces).expect("first batch");
    producer.reset();
    let second = producer.build_batch(&traces).expect("second batch after reset");

    assert_eq!(first.arrow_payloads[0].record.num_rows(), 1);
    assert_eq!(second.arrow_payloads[0].record.num_rows(), 1);
    // Dictionary state survives a reset, so both batches fingerprint the
    // `name` column identically rather than re-blooming it.
    assert_eq!(
        first.arrow_payloads[0].schema_id,
        second.arrow_payloads[0].schema_id
    );
}

#[test]
fn dense_span_ids_cover_zero_to_row_count_minus_one() {
    let spans = (0..50u8)
        .map(|i| span(&format!("span-{i}"), i, AttributeMap::new()))
        .collect();
    let traces = single_scope_traces(spans);

    let mut producer = TracesProducer::new(ProducerConfig::default());
    let batch = producer.build_batch(&traces).expect("batch");
    let spans_record = &payload_of(&batch, ArrowPayloadType::Spans).expect("spans payload").record;

    let ids = spans_record
        .column_by_name("id")
        .expect("id column")
        .as_any()
        .downcast_ref::<UInt16Array>()
        .expect("id is UInt16Array");

    let mut values: Vec<u16> = ids.iter().map(|v| v.expect("dense id, no nulls")).collect();
    values.sort_unstable();
    let expected: Vec<u16> = (0..50u16).collect();
    assert_eq!(values, expected);
}

#[test]
fn high_cardinality_names_survive_dictionary_promotion() {
    // 300 distinct span names exceeds an 8-bit dictionary's capacity,
    // forcing at least one `SchemaNotUpToDate` retry inside `build_batch`.
    let spans = (0..300u16)
        .map(|i| span(&format!("operation-{i}"), (i % 255) as u8, AttributeMap::new()))
        .collect();
    let traces = single_scope_traces(spans);

    let mut producer = TracesProducer::new(ProducerConfig::default());
    let batch = producer.build_batch(&traces).expect("batch survives retries");
    let spans_record = &payload_of(&batch, ArrowPayloadType::Spans).expect("spans payload").record;
    assert_eq!(spans_record.num_rows(), 300);
}

#[test]
fn optional_status_field_blooms_once_a_span_sets_it() {
    let mut producer = TracesProducer::new(ProducerConfig::default());

    // First batch has no status at all; the `status` struct column stays suppressed.
    let bare = single_scope_traces(vec![span("a", 1, AttributeMap::new())]);
    let first = producer.build_batch(&bare).expect("first batch");
    let first_spans = &payload_of(&first, ArrowPayloadType::Spans).unwrap().record;
    assert!(first_spans.column_by_name("status").is_none());

    // Second batch sets a status; the field blooms via an internal retry.
    let mut with_status = span("b", 2, AttributeMap::new());
    with_status.status = Some(Status {
        code: StatusCode::Error,
        message: "boom".to_string(),
    });
    let traces = single_scope_traces(vec![with_status]);
    let second = producer.build_batch(&traces).expect("second batch blooms status");
    let second_spans = &payload_of(&second, ArrowPayloadType::Spans).unwrap().record;
    assert!(second_spans.column_by_name("status").is_some());
}

#[test]
fn shared_span_attribute_is_lifted_to_scope_attrs_once() {
    let mut shared = AttributeMap::new();
    let _ = shared.insert("env".to_string(), AttributeValue::Str("prod".to_string()));

    let mut attrs_a = shared.clone();
    let _ = attrs_a.insert("unique".to_string(), AttributeValue::Str("a".to_string()));
    let mut attrs_b = shared.clone();
    let _ = attrs_b.insert("unique".to_string(), AttributeValue::Str("b".to_string()));

    let traces = single_scope_traces(vec![span("a", 1, attrs_a), span("b", 2, attrs_b)]);

    let mut producer = TracesProducer::new(ProducerConfig::default());
    let batch = producer.build_batch(&traces).expect("batch");

    let scope_attrs = &payload_of(&batch, ArrowPayloadType::ScopeAttrs)
        .expect("env is shared, so ScopeAttrs must be emitted")
        .record;
    let scope_keys = scope_attrs
        .column_by_name("key")
        .expect("key column")
        .as_any()
        .downcast_ref::<arrow::array::DictionaryArray<arrow::datatypes::UInt16Type>>()
        .expect("key is dictionary-encoded");
    let scope_key_values = scope_keys
        .values()
        .as_any()
        .downcast_ref::<StringArray>()
        .expect("dictionary values are strings");
    let has_env = (0..scope_keys.len()).any(|i| {
        let idx = scope_keys.keys().value(i) as usize;
        scope_key_values.value(idx) == "env"
    });
    assert!(has_env, "shared attribute `env` should be lifted into ScopeAttrs");

    let span_attrs = &payload_of(&batch, ArrowPayloadType::SpanAttrs).expect("span attrs").record;
    assert_eq!(
        span_attrs.num_rows(),
        2,
        "only the per-span `unique` attribute should remain on SpanAttrs"
    );
}

#[test]
fn release_then_build_batch_is_rejected() {
    let mut producer = TracesProducer::new(ProducerConfig::default());
    producer.release();
    let traces = single_scope_traces(vec![span("a", 1, AttributeMap::new())]);
    let err = producer.build_batch(&traces).unwrap_err();
    assert!(matches!(err, otap_trace_producer::error::Error::Released));
}

#[test]
fn empty_traces_yield_only_an_empty_spans_record() {
    let traces = Traces::default();
    let mut producer = TracesProducer::new(ProducerConfig::default());
    let batch = producer.build_batch(&traces).expect("batch");
    assert_eq!(batch.arrow_payloads.len(), 1);
    assert_eq!(batch.arrow_payloads[0].payload_type, ArrowPayloadType::Spans);
    assert_eq!(batch.arrow_payloads[0].record.num_rows(), 0);
}
