// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! The OTLP-side trace data model consumed by the producer.
//!
//! These types are the input boundary: a hierarchical Resource -> Scope ->
//! Span -> {Events, Links, Attributes} tree. The producer core never
//! receives raw OTLP protobuf bytes; deserializing the wire format into
//! this tree is an external collaborator's job.

use std::collections::BTreeMap;

/// A batch of resource-scoped spans, the top-level input to [`crate::producer::TracesProducer::build_batch`].
#[derive(Debug, Clone, Default)]
pub struct Traces {
    /// Ordered sequence of resource groups.
    pub resource_spans: Vec<ResourceSpans>,
}

/// One `Resource` and the scopes of spans reported against it.
#[derive(Debug, Clone, Default)]
pub struct ResourceSpans {
    /// The resource these spans were produced by.
    pub resource: Resource,
    /// Schema URL describing the resource's attribute semantics.
    pub schema_url: String,
    /// Ordered sequence of instrumentation-scope groups.
    pub scope_spans: Vec<ScopeSpans>,
}

/// A `Resource` is a set of attributes describing the entity producing telemetry.
#[derive(Debug, Clone, Default)]
pub struct Resource {
    /// Resource attributes.
    pub attributes: AttributeMap,
    /// Count of attributes dropped by the instrumentation due to limits.
    pub dropped_attributes_count: u32,
}

/// One `InstrumentationScope` and the spans recorded through it.
#[derive(Debug, Clone, Default)]
pub struct ScopeSpans {
    /// The instrumentation scope (library/tracer) that recorded `spans`.
    pub scope: InstrumentationScope,
    /// Schema URL describing the scope's attribute semantics.
    pub schema_url: String,
    /// Ordered sequence of spans.
    pub spans: Vec<Span>,
}

/// Identifies the instrumentation library that produced a set of spans.
#[derive(Debug, Clone, Default)]
pub struct InstrumentationScope {
    /// Scope name, e.g. the name of a tracing library.
    pub name: String,
    /// Scope version.
    pub version: String,
    /// Scope attributes.
    pub attributes: AttributeMap,
    /// Count of attributes dropped by the instrumentation due to limits.
    pub dropped_attributes_count: u32,
}

/// A single span in a trace.
#[derive(Debug, Clone)]
pub struct Span {
    /// Start time, nanoseconds since epoch.
    pub start_time_unix_nano: u64,
    /// End time, nanoseconds since epoch.
    pub end_time_unix_nano: u64,
    /// 16-byte trace identifier.
    pub trace_id: [u8; 16],
    /// 8-byte span identifier.
    pub span_id: [u8; 8],
    /// Opaque W3C tracestate value, passed through verbatim.
    pub trace_state: Option<String>,
    /// 8-byte parent span identifier; absent for root spans.
    pub parent_span_id: Option<[u8; 8]>,
    /// Span name.
    pub name: String,
    /// Span kind.
    pub kind: SpanKind,
    /// Span attributes.
    pub attributes: AttributeMap,
    /// Count of attributes dropped by the instrumentation due to limits.
    pub dropped_attributes_count: u32,
    /// Span events, in temporal order.
    pub events: Vec<SpanEvent>,
    /// Count of events dropped by the instrumentation due to limits.
    pub dropped_events_count: u32,
    /// Span links.
    pub links: Vec<SpanLink>,
    /// Count of links dropped by the instrumentation due to limits.
    pub dropped_links_count: u32,
    /// Span status.
    pub status: Option<Status>,
}

/// `SpanKind` enumerates the relationship between a span and its caller/callee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(i32)]
pub enum SpanKind {
    /// Unspecified, the default when not set by instrumentation.
    #[default]
    Unspecified = 0,
    /// An internal operation within an application.
    Internal = 1,
    /// A remote incoming request handler.
    Server = 2,
    /// A remote outgoing request.
    Client = 3,
    /// The initiating side of an async message.
    Producer = 4,
    /// The handling side of an async message.
    Consumer = 5,
}

/// Span completion status.
#[derive(Debug, Clone, Default)]
pub struct Status {
    /// Status code.
    pub code: StatusCode,
    /// Free-form status message, typically only set when `code` is `Error`.
    pub message: String,
}

/// `StatusCode` is the three-valued outcome of a span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(i32)]
pub enum StatusCode {
    /// Default value, status not set by instrumentation.
    #[default]
    Unset = 0,
    /// The operation completed successfully.
    Ok = 1,
    /// The operation failed.
    Error = 2,
}

/// A timestamped event attached to a span.
#[derive(Debug, Clone)]
pub struct SpanEvent {
    /// Event time, nanoseconds since epoch.
    pub time_unix_nano: u64,
    /// Event name.
    pub name: String,
    /// Event attributes.
    pub attributes: AttributeMap,
    /// Count of attributes dropped by the instrumentation due to limits.
    pub dropped_attributes_count: u32,
}

/// A reference from one span to another, possibly in a different trace.
#[derive(Debug, Clone)]
pub struct SpanLink {
    /// 16-byte identifier of the linked trace.
    pub trace_id: [u8; 16],
    /// 8-byte identifier of the linked span.
    pub span_id: [u8; 8],
    /// Opaque W3C tracestate value of the linked span.
    pub trace_state: Option<String>,
    /// Link attributes.
    pub attributes: AttributeMap,
    /// Count of attributes dropped by the instrumentation due to limits.
    pub dropped_attributes_count: u32,
}

/// An ordered map of attribute keys to values.
///
/// `BTreeMap` is used rather than a `Vec<(String, AttributeValue)>` so that
/// shared-attribute intersection and canonical group-fingerprint
/// serialization can iterate keys in a stable, sorted order without a
/// separate sort step at every call site.
pub type AttributeMap = BTreeMap<String, AttributeValue>;

/// The sum type of values an OTLP attribute may hold.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// UTF-8 string.
    Str(String),
    /// Signed 64-bit integer.
    Int(i64),
    /// 64-bit float.
    Double(f64),
    /// Boolean.
    Bool(bool),
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// A list of values, encoded via the CBOR escape leg.
    List(Vec<AttributeValue>),
    /// A nested string-keyed map, encoded via the CBOR escape leg.
    Map(BTreeMap<String, AttributeValue>),
}
