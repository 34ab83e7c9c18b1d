// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Traces Producer: the orchestrator tying the trace optimizer to the
//! related-data manager behind one bounded schema-retry loop.

use crate::config::ProducerConfig;
use crate::error::Error;
use crate::model::Traces;
use crate::observer::StatsObserver;
use crate::optimizer;
use crate::payload::{ArrowPayloadType, BatchArrowRecords};
use crate::related::{Attempt, RelatedDataManager};
use std::sync::Arc;

/// Turns batches of [`Traces`] into [`BatchArrowRecords`] envelopes.
///
/// Not safe for concurrent use: callers must serialize calls to
/// [`TracesProducer::build_batch`] on one instance. Independent instances
/// may run on separate threads freely.
pub struct TracesProducer {
    config: ProducerConfig,
    related: RelatedDataManager,
    batch_id: u64,
    released: bool,
}

impl TracesProducer {
    /// Builds a new producer from `config`.
    #[must_use]
    pub fn new(config: ProducerConfig) -> Self {
        let related = RelatedDataManager::new(&config);
        TracesProducer {
            config,
            related,
            batch_id: 0,
            released: false,
        }
    }

    /// Replaces the statistics observer.
    pub fn set_observer(&mut self, observer: Arc<dyn StatsObserver>) {
        self.config.observer = observer;
    }

    /// Turns one `Traces` payload into an ordered envelope of Arrow
    /// payloads, retrying internally up to `config.max_schema_retries`
    /// times whenever a field's schema transitions mid-pass.
    ///
    /// Retries re-traverse `traces` from scratch deterministically, so
    /// observable row order never depends on how many retries occurred.
    pub fn build_batch(&mut self, traces: &Traces) -> crate::error::Result<BatchArrowRecords> {
        if self.released {
            return Err(Error::Released);
        }

        let optimized = optimizer::optimize(traces, self.config.sort);
        let mut attempts = 0u8;
        loop {
            match self.related.try_build(&optimized, &self.config) {
                Ok(arrow_payloads) => {
                    let batch_id = self.batch_id;
                    self.batch_id += 1;
                    return Ok(BatchArrowRecords {
                        batch_id,
                        arrow_payloads,
                    });
                }
                Err(Attempt::Fatal(e)) => return Err(e),
                Err(Attempt::Retry) => {
                    attempts += 1;
                    if attempts >= self.config.max_schema_retries {
                        return Err(Error::SchemaFlap {
                            attempts,
                            payload_type: ArrowPayloadType::Spans,
                        });
                    }
                }
            }
        }
    }

    /// Drops pending accumulator rows and the per-batch span/event/link id
    /// counters; schema and dictionary state survive.
    pub fn reset(&mut self) {
        self.related.reset();
    }

    /// Tears down the producer permanently. Subsequent
    /// [`TracesProducer::build_batch`] calls return [`Error::Released`].
    pub fn release(&mut self) {
        self.related.release();
        self.released = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AttributeMap, AttributeValue, Resource, ResourceSpans, Span, SpanKind, ScopeSpans};

    fn one_span_traces() -> Traces {
        let mut attrs = AttributeMap::new();
        let _ = attrs.insert("http.method".into(), AttributeValue::Str("GET".into()));
        Traces {
            resource_spans: vec![ResourceSpans {
                resource: Resource::default(),
                schema_url: String::new(),
                scope_spans: vec![ScopeSpans {
                    scope: crate::model::InstrumentationScope::default(),
                    schema_url: String::new(),
                    spans: vec![Span {
                        start_time_unix_nano: 1_000_000_000,
                        end_time_unix_nano: 1_000_500_000,
                        trace_id: [1; 16],
                        span_id: [2; 8],
                        trace_state: None,
                        parent_span_id: None,
                        name: "GET /".to_string(),
                        kind: SpanKind::Server,
                        attributes: attrs,
                        dropped_attributes_count: 0,
                        events: Vec::new(),
                        dropped_events_count: 0,
                        links: Vec::new(),
                        dropped_links_count: 0,
                        status: None,
                    }],
                }],
            }],
        }
    }

    #[test]
    fn build_batch_assigns_increasing_batch_ids() {
        let mut producer = TracesProducer::new(ProducerConfig::default());
        let traces = one_span_traces();
        let first = producer.build_batch(&traces).expect("first batch");
        let second = producer.build_batch(&traces).expect("second batch");
        assert_eq!(first.batch_id, 0);
        assert_eq!(second.batch_id, 1);
    }

    #[test]
    fn first_batch_emits_spans_and_span_attrs_only() {
        let mut producer = TracesProducer::new(ProducerConfig::default());
        let traces = one_span_traces();
        let batch = producer.build_batch(&traces).expect("batch");
        let types: Vec<ArrowPayloadType> =
            batch.arrow_payloads.iter().map(|p| p.payload_type).collect();
        assert_eq!(types, vec![ArrowPayloadType::Spans, ArrowPayloadType::SpanAttrs]);
        assert_eq!(batch.arrow_payloads[0].record.num_rows(), 1);
    }

    #[test]
    fn release_then_build_batch_fails() {
        let mut producer = TracesProducer::new(ProducerConfig::default());
        producer.release();
        let err = producer.build_batch(&one_span_traces()).unwrap_err();
        assert!(matches!(err, Error::Released));
    }

    #[test]
    fn reset_keeps_producer_usable() {
        let mut producer = TracesProducer::new(ProducerConfig::default());
        let traces = one_span_traces();
        let _ = producer.build_batch(&traces).expect("batch");
        producer.reset();
        let second = producer.build_batch(&traces).expect("batch after reset");
        assert_eq!(second.arrow_payloads[0].record.num_rows(), 1);
    }
}
