// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Payload-type enumeration and the OTAP envelope shape.

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Identifies which of the seven related records (plus the main Spans
/// record) an emitted Arrow record batch represents.
///
/// The numeric values are the constants reproduced bit-exactly from the
/// OTAP wire specification; the transport layer (out of scope here) relies
/// on them to route the record to the right sub-stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(i32)]
pub enum ArrowPayloadType {
    /// The main Spans record.
    Spans = 1,
    /// Resource-level attributes, keyed by `parent_id` into Spans.
    ResourceAttrs = 2,
    /// Scope-level attributes, keyed by `parent_id` into Spans.
    ScopeAttrs = 3,
    /// Span-level attributes, keyed by `parent_id` into Spans.
    SpanAttrs = 4,
    /// Span events.
    SpanEvents = 5,
    /// Span-event attributes, keyed by `parent_id` into `SpanEvents`.
    SpanEventAttrs = 6,
    /// Span links.
    SpanLinks = 7,
    /// Span-link attributes, keyed by `parent_id` into `SpanLinks`.
    SpanLinkAttrs = 8,
}

impl ArrowPayloadType {
    /// Returns all payload types in the fixed emission order required by
    /// ("Ordering guarantees").
    #[must_use]
    pub const fn emission_order() -> [ArrowPayloadType; 8] {
        [
            ArrowPayloadType::Spans,
            ArrowPayloadType::ResourceAttrs,
            ArrowPayloadType::ScopeAttrs,
            ArrowPayloadType::SpanAttrs,
            ArrowPayloadType::SpanEvents,
            ArrowPayloadType::SpanEventAttrs,
            ArrowPayloadType::SpanLinks,
            ArrowPayloadType::SpanLinkAttrs,
        ]
    }
}

/// A single Arrow payload message in a [`BatchArrowRecords`] envelope.
///
/// The `record` field holds a fully built Arrow [`arrow::array::RecordBatch`];
/// serializing it to Arrow IPC bytes is the external writer's job.
#[derive(Debug, Clone)]
pub struct ArrowPayload {
    /// Which record this is.
    pub payload_type: ArrowPayloadType,
    /// The built record batch.
    pub record: arrow::array::RecordBatch,
    /// The schema fingerprint this record's schema was built under; the
    /// transport groups payloads by this id into one logical sub-stream.
    pub schema_id: String,
}

/// The outer envelope produced by one `build_batch` call. The exact wire
/// encoding is owned by the transport; this struct just models the logical
/// fields.
#[derive(Debug, Clone)]
pub struct BatchArrowRecords {
    /// Monotonically increasing id identifying this batch within the producer's lifetime.
    pub batch_id: u64,
    /// The payloads produced by this batch, in [`ArrowPayloadType::emission_order`].
    pub arrow_payloads: Vec<ArrowPayload>,
}
