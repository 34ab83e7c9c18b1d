// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Statistics observer.
//!
//! Observers are pure callbacks; formatting and printing are an external
//! concern. All callbacks must be
//! side-effect-only with respect to the producer and must not block
//! unboundedly -- the producer calls them synchronously, inline, on the
//! hot path of `build_batch`.

use crate::payload::ArrowPayloadType;

/// The kind of observable event reported to a [`StatsObserver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// A previously-suppressed optional field started being emitted.
    NewField,
    /// A dictionary's index width was promoted.
    DictionaryUpgrade,
    /// A dictionary overflowed its maximum index width and fell back to plain encoding.
    DictionaryOverflow,
    /// A dictionary was cleared at a record boundary.
    DictionaryReset,
    /// A record's schema fingerprint changed and downstream metadata must be updated.
    MetadataUpdate,
    /// A record batch's schema changed as observed by the transport.
    SchemaUpdate,
}

/// A single observable event, named and fielded uniformly across all kinds
/// to keep the observer API `struct`-shaped rather than string-formatted.
#[derive(Debug, Clone)]
pub struct Event<'a> {
    /// What kind of event this is.
    pub kind: EventKind,
    /// The record the event pertains to.
    pub record_name: ArrowPayloadType,
    /// Dotted field path within that record, e.g. `"name"` or `"status.code"`.
    pub field_path: &'a str,
    /// Previous Arrow type, if applicable (dictionary transitions).
    pub old_type: Option<&'a arrow::datatypes::DataType>,
    /// New Arrow type, if applicable (dictionary transitions).
    pub new_type: Option<&'a arrow::datatypes::DataType>,
    /// Current distinct-value count, if applicable.
    pub cardinality: Option<u64>,
    /// Current total-append count, if applicable.
    pub total: Option<u64>,
}

/// Receives structured notifications about adaptive-schema transitions.
///
/// The default implementation of every method is a no-op, so observers only
/// need to implement the callbacks they care about.
pub trait StatsObserver: Send + Sync {
    /// Fired the first time a suppressed optional field becomes non-empty.
    fn on_new_field(&self, event: &Event<'_>) {
        let _ = event;
    }

    /// Fired when a dictionary's index width is promoted (e.g. u8 -> u16).
    fn on_dictionary_upgrade(&self, event: &Event<'_>) {
        let _ = event;
    }

    /// Fired when a dictionary overflows its maximum index width.
    fn on_dictionary_overflow(&self, event: &Event<'_>) {
        let _ = event;
    }

    /// Fired when a dictionary is reset at a record boundary.
    fn on_dictionary_reset(&self, event: &Event<'_>) {
        let _ = event;
    }

    /// Fired when a record's schema fingerprint changes.
    fn on_metadata_update(&self, event: &Event<'_>) {
        let _ = event;
    }

    /// Fired when a record's Arrow schema itself changes shape.
    fn on_schema_update(&self, event: &Event<'_>) {
        let _ = event;
    }

    /// Fired once per built record, after it has been assembled.
    fn on_record(&self, record: &arrow::array::RecordBatch, payload_type: ArrowPayloadType) {
        let _ = (record, payload_type);
    }
}

/// The default observer: every callback is a no-op.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl StatsObserver for NoopObserver {}
