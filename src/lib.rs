// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! OTLP-trace-to-OTAP columnar producer.
//!
//! Turns hierarchical OTLP [`model::Traces`] (Resource -> Scope -> Span ->
//! {Events, Links, Attributes}) into the eight Arrow `RecordBatch`es of the
//! OTAP wire encoding: a main Spans record plus seven related records
//! linked by dense integer id/parent_id columns. The adaptive schema
//! blooms optional columns and promotes dictionary encodings lazily as
//! data is observed, rather than up front.
//!
//! This crate performs no I/O, no async, and no OTLP protobuf decoding --
//! [`model::Traces`] is the input boundary. [`producer::TracesProducer`] is
//! the entry point.

pub mod attributes;
pub mod builder;
pub mod compression;
pub mod config;
pub mod dictionary;
pub mod emitter;
pub mod error;
pub mod model;
pub mod observer;
pub mod optimizer;
pub mod payload;
pub mod producer;
pub mod related;
pub mod schema;

#[cfg(test)]
mod test_util;

pub use compression::{CompressionKind, Compressor, CompressionError};
pub use config::{BatchAllocator, IndexSizeLimit, ProducerConfig, SystemAllocator};
pub use emitter::{NullEmitter, RecordEmitter};
pub use error::{Error, Result};
pub use model::{
    AttributeMap, AttributeValue, InstrumentationScope, Resource, ResourceSpans, ScopeSpans,
    Span, SpanEvent, SpanKind, SpanLink, Status, StatusCode, Traces,
};
pub use observer::{Event, EventKind, NoopObserver, StatsObserver};
pub use payload::{ArrowPayload, ArrowPayloadType, BatchArrowRecords};
pub use producer::TracesProducer;
