// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Related-data manager: owns every record builder and attribute
//! accumulator for one `TracesProducer`, and drives the single-pass attempt
//! that turns an [`crate::optimizer::OptimizedTraces`] view into the eight
//! Arrow payloads of one batch.
//!
//! An attempt can fail mid-pass with [`Attempt::Retry`] the moment any
//! optional field blooms or any dictionary promotes/overflows -- at that
//! point the columns collected so far in this attempt are stale (built
//! against the pre-transition schema) and must be discarded.
//! [`crate::producer::TracesProducer::build_batch`] owns the bounded retry
//! loop that calls [`RelatedDataManager::try_build`] again from scratch.

use crate::attributes::{AttributeAccumulator, BuiltAttrs, ParentWidth};
use crate::builder::record::SchemaNotUpToDate;
use crate::builder::{AdaptiveRecordBuilder, ColumnValues};
use crate::config::ProducerConfig;
use crate::dictionary::{DictionaryEvent, DictionaryManager};
use crate::error::Error;
use crate::model::{AttributeMap, SpanKind, StatusCode};
use crate::observer::{Event, EventKind};
use crate::optimizer::OptimizedTraces;
use crate::payload::{ArrowPayload, ArrowPayloadType};
use crate::schema::consts;
use crate::schema::field::IndexWidth;
use crate::schema::records;
use arrow::array::RecordBatch;
use arrow::datatypes::{Field, Schema};
use std::sync::Arc;

/// The outcome of a failed [`RelatedDataManager::try_build`] attempt.
pub(crate) enum Attempt {
    /// A schema transition happened mid-pass; retry from scratch.
    Retry,
    /// A real error occurred; abort the whole `build_batch` call.
    Fatal(Error),
}

impl From<Error> for Attempt {
    fn from(source: Error) -> Self {
        Attempt::Fatal(source)
    }
}

impl From<SchemaNotUpToDate> for Attempt {
    fn from(_: SchemaNotUpToDate) -> Self {
        Attempt::Retry
    }
}

fn next_dense_id(counter: &mut u32) -> crate::error::Result<u16> {
    if *counter > u32::from(u16::MAX) {
        return Err(Error::BatchSizeExceeded { attempted: *counter });
    }
    let id = *counter as u16;
    *counter += 1;
    Ok(id)
}

fn make_payload(payload_type: ArrowPayloadType, record: RecordBatch) -> ArrowPayload {
    let schema_id = crate::schema::fingerprint::fingerprint_fields(record.schema().fields());
    ArrowPayload {
        payload_type,
        record,
        schema_id,
    }
}

fn attrs_batch(built: BuiltAttrs) -> crate::error::Result<RecordBatch> {
    let fields = vec![
        Field::new(consts::PARENT_ID, built.parent_id.data_type().clone(), false),
        Field::new(consts::attrs::KEY, built.key.data_type().clone(), false),
        Field::new(consts::attrs::VALUE, built.value.data_type().clone(), true),
    ];
    let schema = Arc::new(Schema::new(fields));
    Ok(RecordBatch::try_new(
        schema,
        vec![built.parent_id, built.key, built.value],
    )?)
}

fn notify_new_field(config: &ProducerConfig, payload_type: ArrowPayloadType, field_path: &str) {
    if !config.stats {
        return;
    }
    config.observer.on_new_field(&Event {
        kind: EventKind::NewField,
        record_name: payload_type,
        field_path,
        old_type: None,
        new_type: None,
        cardinality: None,
        total: None,
    });
}

fn notify_dictionary_event(
    config: &ProducerConfig,
    payload_type: ArrowPayloadType,
    field_path: &str,
    event: DictionaryEvent,
    cardinality: Option<u64>,
    total: Option<u64>,
) {
    if !config.stats {
        return;
    }
    match event {
        DictionaryEvent::Appended => {}
        DictionaryEvent::Upgraded { from, to } => {
            let old_type = from.key_type();
            let new_type = to.key_type();
            config.observer.on_dictionary_upgrade(&Event {
                kind: EventKind::DictionaryUpgrade,
                record_name: payload_type,
                field_path,
                old_type: Some(&old_type),
                new_type: Some(&new_type),
                cardinality,
                total,
            });
        }
        DictionaryEvent::Overflowed => {
            config.observer.on_dictionary_overflow(&Event {
                kind: EventKind::DictionaryOverflow,
                record_name: payload_type,
                field_path,
                old_type: None,
                new_type: None,
                cardinality,
                total,
            });
        }
    }
}

fn notify_dictionary_reset(config: &ProducerConfig, payload_type: ArrowPayloadType, field_path: &str) {
    if !config.stats {
        return;
    }
    config.observer.on_dictionary_reset(&Event {
        kind: EventKind::DictionaryReset,
        record_name: payload_type,
        field_path,
        old_type: None,
        new_type: None,
        cardinality: None,
        total: None,
    });
}

/// Observes an optional top-level field, notifying [`ProducerConfig::observer`]
/// the moment it blooms and turning a bloom into [`Attempt::Retry`].
fn observe_optional(
    builder: &mut AdaptiveRecordBuilder,
    config: &ProducerConfig,
    payload_type: ArrowPayloadType,
    field_path: &str,
    has_value: bool,
) -> Result<(), Attempt> {
    if builder.observe_optional(field_path, has_value).is_err() {
        notify_new_field(config, payload_type, field_path);
        return Err(Attempt::Retry);
    }
    Ok(())
}

/// Observes a dictionary transition, notifying [`ProducerConfig::observer`]
/// on upgrade/overflow and turning either into [`Attempt::Retry`].
fn observe_dictionary(
    builder: &mut AdaptiveRecordBuilder,
    config: &ProducerConfig,
    payload_type: ArrowPayloadType,
    field_path: &str,
    event: DictionaryEvent,
    cardinality: Option<u64>,
    total: Option<u64>,
) -> Result<(), Attempt> {
    notify_dictionary_event(config, payload_type, field_path, event, cardinality, total);
    if builder.observe_dictionary(field_path, event).is_err() {
        return Err(Attempt::Retry);
    }
    Ok(())
}

/// Owns every record's transform tree and accumulated attribute state across
/// the lifetime of a [`crate::producer::TracesProducer`].
pub struct RelatedDataManager {
    spans: AdaptiveRecordBuilder,
    span_events: AdaptiveRecordBuilder,
    span_links: AdaptiveRecordBuilder,
    resource_attrs: AttributeAccumulator,
    scope_attrs: AttributeAccumulator,
    span_attrs: AttributeAccumulator,
    span_event_attrs: AttributeAccumulator,
    span_link_attrs: AttributeAccumulator,
    // Cardinality trackers for the scalar dictionary-encoded columns of
    // SPANS/SPAN_EVENTS/SPAN_LINKS. These persist across batches, like the
    // dictionaries inside `AttributeAccumulator`, so promotion/overflow/reset
    // decisions reflect cumulative cardinality rather than one batch's worth.
    trace_state_dict: DictionaryManager<String>,
    name_dict: DictionaryManager<String>,
    duration_dict: DictionaryManager<i64>,
    kind_dict: DictionaryManager<i32>,
    status_code_dict: DictionaryManager<i32>,
    status_message_dict: DictionaryManager<String>,
    event_name_dict: DictionaryManager<String>,
    link_trace_state_dict: DictionaryManager<String>,
    // The schema id each record emitted on the previous successful batch, so
    // `on_schema_update` fires only on an actual shape change, not on every
    // batch's fingerprint recomputation.
    last_schema_ids: ahash::AHashMap<ArrowPayloadType, String>,
}

impl RelatedDataManager {
    /// Builds a fresh manager with every record at its initial schema.
    #[must_use]
    pub fn new(config: &ProducerConfig) -> Self {
        let limit = config.limit_index_size.as_index_width();
        let new_attrs = |width| {
            AttributeAccumulator::new(
                width,
                limit,
                config.dict_reset_threshold,
                config.dict_reset_min_samples,
            )
        };
        let new_dict =
            |width| DictionaryManager::new(width, limit, config.dict_reset_threshold, config.dict_reset_min_samples);
        RelatedDataManager {
            spans: AdaptiveRecordBuilder::new(records::spans_schema()),
            span_events: AdaptiveRecordBuilder::new(records::span_events_schema()),
            span_links: AdaptiveRecordBuilder::new(records::span_links_schema()),
            resource_attrs: new_attrs(ParentWidth::U16),
            scope_attrs: new_attrs(ParentWidth::U16),
            span_attrs: new_attrs(ParentWidth::U16),
            span_event_attrs: new_attrs(ParentWidth::U32),
            span_link_attrs: new_attrs(ParentWidth::U32),
            trace_state_dict: new_dict(IndexWidth::U8),
            name_dict: new_dict(IndexWidth::U8),
            duration_dict: new_dict(IndexWidth::U8),
            kind_dict: new_dict(IndexWidth::U8),
            status_code_dict: new_dict(IndexWidth::U8),
            status_message_dict: new_dict(IndexWidth::U8),
            event_name_dict: new_dict(IndexWidth::U8),
            link_trace_state_dict: new_dict(IndexWidth::U8),
            last_schema_ids: ahash::AHashMap::new(),
        }
    }

    /// Clears pending attribute rows between batches. Schema and dictionary
    /// state (the adaptive part) survives.
    pub fn reset(&mut self) {
        self.resource_attrs.reset_rows();
        self.scope_attrs.reset_rows();
        self.span_attrs.reset_rows();
        self.span_event_attrs.reset_rows();
        self.span_link_attrs.reset_rows();
    }

    /// Evaluates each scalar dictionary's reset policy and clears it if its
    /// distinct/total ratio has crossed the configured threshold. Called
    /// once per successfully built batch.
    fn maybe_reset_dictionaries(&mut self, config: &ProducerConfig) {
        if self.trace_state_dict.should_reset() {
            self.trace_state_dict.reset();
            notify_dictionary_reset(config, ArrowPayloadType::Spans, consts::spans::TRACE_STATE);
        }
        if self.duration_dict.should_reset() {
            self.duration_dict.reset();
            notify_dictionary_reset(config, ArrowPayloadType::Spans, consts::spans::DURATION);
        }
        if self.kind_dict.should_reset() {
            self.kind_dict.reset();
            notify_dictionary_reset(config, ArrowPayloadType::Spans, consts::spans::KIND);
        }
        if self.status_code_dict.should_reset() {
            self.status_code_dict.reset();
            notify_dictionary_reset(config, ArrowPayloadType::Spans, consts::spans::STATUS_CODE);
        }
        if self.status_message_dict.should_reset() {
            self.status_message_dict.reset();
            notify_dictionary_reset(config, ArrowPayloadType::Spans, consts::spans::STATUS_MESSAGE);
        }
        if self.name_dict.should_reset() {
            self.name_dict.reset();
            notify_dictionary_reset(config, ArrowPayloadType::Spans, consts::spans::NAME);
        }
        if self.event_name_dict.should_reset() {
            self.event_name_dict.reset();
            notify_dictionary_reset(config, ArrowPayloadType::SpanEvents, consts::events::NAME);
        }
        if self.link_trace_state_dict.should_reset() {
            self.link_trace_state_dict.reset();
            notify_dictionary_reset(config, ArrowPayloadType::SpanLinks, consts::links::TRACE_STATE);
        }
    }

    /// Drops every record back to its initial schema and every dictionary
    /// back to empty, for [`crate::producer::TracesProducer::release`].
    pub fn release(&mut self) {
        self.resource_attrs.release();
        self.scope_attrs.release();
        self.span_attrs.release();
        self.span_event_attrs.release();
        self.span_link_attrs.release();
        self.spans = AdaptiveRecordBuilder::new(records::spans_schema());
        self.span_events = AdaptiveRecordBuilder::new(records::span_events_schema());
        self.span_links = AdaptiveRecordBuilder::new(records::span_links_schema());
        self.trace_state_dict.reset();
        self.name_dict.reset();
        self.duration_dict.reset();
        self.kind_dict.reset();
        self.status_code_dict.reset();
        self.status_message_dict.reset();
        self.event_name_dict.reset();
        self.link_trace_state_dict.reset();
        self.last_schema_ids.clear();
    }

    /// Attempts to build one batch's worth of payloads from `optimized`.
    /// Returns [`Attempt::Retry`] the moment any field's schema transitions,
    /// leaving the caller to call this again from scratch.
    pub(crate) fn try_build(
        &mut self,
        optimized: &OptimizedTraces<'_>,
        config: &ProducerConfig,
    ) -> Result<Vec<ArrowPayload>, Attempt> {
        self.reset();

        let mut col_id: Vec<Option<u16>> = Vec::new();
        let mut col_resource_id: Vec<Option<u16>> = Vec::new();
        let mut col_scope_id: Vec<Option<u16>> = Vec::new();
        let mut col_start: Vec<Option<i64>> = Vec::new();
        let mut col_duration: Vec<Option<i64>> = Vec::new();
        let mut col_trace_id: Vec<Option<Vec<u8>>> = Vec::new();
        let mut col_span_id: Vec<Option<Vec<u8>>> = Vec::new();
        let mut col_trace_state: Vec<Option<String>> = Vec::new();
        let mut col_parent_span_id: Vec<Option<Vec<u8>>> = Vec::new();
        let mut col_name: Vec<Option<String>> = Vec::new();
        let mut col_kind: Vec<Option<i32>> = Vec::new();
        let mut col_dropped_attrs: Vec<Option<u32>> = Vec::new();
        let mut col_dropped_events: Vec<Option<u32>> = Vec::new();
        let mut col_dropped_links: Vec<Option<u32>> = Vec::new();
        let mut status_presence: Vec<bool> = Vec::new();
        let mut col_status_code: Vec<Option<i32>> = Vec::new();
        let mut col_status_message: Vec<Option<String>> = Vec::new();

        let mut events_id: Vec<Option<u16>> = Vec::new();
        let mut events_parent_id: Vec<Option<u16>> = Vec::new();
        let mut events_time: Vec<Option<i64>> = Vec::new();
        let mut events_name: Vec<Option<String>> = Vec::new();
        let mut events_attrs_id: Vec<Option<u32>> = Vec::new();
        let mut events_dropped_attrs: Vec<Option<u32>> = Vec::new();

        let mut links_id: Vec<Option<u16>> = Vec::new();
        let mut links_parent_id: Vec<Option<u16>> = Vec::new();
        let mut links_trace_id: Vec<Option<Vec<u8>>> = Vec::new();
        let mut links_span_id: Vec<Option<Vec<u8>>> = Vec::new();
        let mut links_trace_state: Vec<Option<String>> = Vec::new();
        let mut links_attrs_id: Vec<Option<u32>> = Vec::new();
        let mut links_dropped_attrs: Vec<Option<u32>> = Vec::new();

        let mut next_span_id: u32 = 0;
        let mut next_event_id: u32 = 0;
        let mut next_link_id: u32 = 0;

        for group in &optimized.resource_groups {
            self.resource_attrs.append_map(
                u32::from(group.id),
                &group.resource.attributes,
                &AttributeMap::new(),
            );
        }
        for group in &optimized.scope_groups {
            self.scope_attrs.append_map(
                u32::from(group.id),
                &group.scope.attributes,
                &AttributeMap::new(),
            );
        }

        for prepared in &optimized.spans {
            let span = prepared.span;
            let span_row_id = next_dense_id(&mut next_span_id)?;

            let has_trace_state = span.trace_state.is_some();
            observe_optional(
                &mut self.spans,
                config,
                ArrowPayloadType::Spans,
                consts::spans::TRACE_STATE,
                has_trace_state,
            )?;
            let has_parent = span.parent_span_id.is_some();
            observe_optional(
                &mut self.spans,
                config,
                ArrowPayloadType::Spans,
                consts::spans::PARENT_SPAN_ID,
                has_parent,
            )?;
            let has_kind = span.kind != SpanKind::Unspecified;
            observe_optional(
                &mut self.spans,
                config,
                ArrowPayloadType::Spans,
                consts::spans::KIND,
                has_kind,
            )?;
            let has_dropped_attrs = span.dropped_attributes_count != 0;
            observe_optional(
                &mut self.spans,
                config,
                ArrowPayloadType::Spans,
                consts::spans::DROPPED_ATTRS,
                has_dropped_attrs,
            )?;
            let has_dropped_events = span.dropped_events_count != 0;
            observe_optional(
                &mut self.spans,
                config,
                ArrowPayloadType::Spans,
                consts::spans::DROPPED_EVENTS,
                has_dropped_events,
            )?;
            let has_dropped_links = span.dropped_links_count != 0;
            observe_optional(
                &mut self.spans,
                config,
                ArrowPayloadType::Spans,
                consts::spans::DROPPED_LINKS,
                has_dropped_links,
            )?;
            let has_status = span.status.is_some();
            observe_optional(
                &mut self.spans,
                config,
                ArrowPayloadType::Spans,
                consts::spans::STATUS,
                has_status,
            )?;
            let has_status_code = span
                .status
                .as_ref()
                .is_some_and(|s| s.code != StatusCode::Unset);
            observe_optional(
                &mut self.spans,
                config,
                ArrowPayloadType::Spans,
                consts::spans::STATUS_CODE,
                has_status_code,
            )?;
            let has_status_message = span.status.as_ref().is_some_and(|s| !s.message.is_empty());
            observe_optional(
                &mut self.spans,
                config,
                ArrowPayloadType::Spans,
                consts::spans::STATUS_MESSAGE,
                has_status_message,
            )?;

            if let Some(ts) = &span.trace_state {
                let (_, event) = self.trace_state_dict.record(ts);
                observe_dictionary(
                    &mut self.spans,
                    config,
                    ArrowPayloadType::Spans,
                    consts::spans::TRACE_STATE,
                    event,
                    Some(self.trace_state_dict.distinct_count() as u64),
                    Some(self.trace_state_dict.total_count()),
                )?;
            }
            let duration_ms =
                (span.end_time_unix_nano.saturating_sub(span.start_time_unix_nano) / 1_000_000)
                    as i64;
            {
                let (_, event) = self.duration_dict.record(&duration_ms);
                observe_dictionary(
                    &mut self.spans,
                    config,
                    ArrowPayloadType::Spans,
                    consts::spans::DURATION,
                    event,
                    Some(self.duration_dict.distinct_count() as u64),
                    Some(self.duration_dict.total_count()),
                )?;
            }
            {
                let (_, event) = self.name_dict.record(&span.name);
                observe_dictionary(
                    &mut self.spans,
                    config,
                    ArrowPayloadType::Spans,
                    consts::spans::NAME,
                    event,
                    Some(self.name_dict.distinct_count() as u64),
                    Some(self.name_dict.total_count()),
                )?;
            }
            if has_kind {
                let kind_val = span.kind as i32;
                let (_, event) = self.kind_dict.record(&kind_val);
                observe_dictionary(
                    &mut self.spans,
                    config,
                    ArrowPayloadType::Spans,
                    consts::spans::KIND,
                    event,
                    Some(self.kind_dict.distinct_count() as u64),
                    Some(self.kind_dict.total_count()),
                )?;
            }
            if has_status_code {
                let code_val = span.status.as_ref().expect("checked above").code as i32;
                let (_, event) = self.status_code_dict.record(&code_val);
                observe_dictionary(
                    &mut self.spans,
                    config,
                    ArrowPayloadType::Spans,
                    consts::spans::STATUS_CODE,
                    event,
                    Some(self.status_code_dict.distinct_count() as u64),
                    Some(self.status_code_dict.total_count()),
                )?;
            }
            if has_status_message {
                let message = span.status.as_ref().expect("checked above").message.clone();
                let (_, event) = self.status_message_dict.record(&message);
                observe_dictionary(
                    &mut self.spans,
                    config,
                    ArrowPayloadType::Spans,
                    consts::spans::STATUS_MESSAGE,
                    event,
                    Some(self.status_message_dict.distinct_count() as u64),
                    Some(self.status_message_dict.total_count()),
                )?;
            }

            col_id.push(Some(span_row_id));
            col_resource_id.push(Some(prepared.resource_id));
            col_scope_id.push(Some(prepared.scope_id));
            col_start.push(Some(span.start_time_unix_nano as i64));
            col_duration.push(Some(duration_ms));
            col_trace_id.push(Some(span.trace_id.to_vec()));
            col_span_id.push(Some(span.span_id.to_vec()));
            col_trace_state.push(span.trace_state.clone());
            col_parent_span_id.push(span.parent_span_id.map(|id| id.to_vec()));
            col_name.push(Some(span.name.clone()));
            col_kind.push(has_kind.then_some(span.kind as i32));
            col_dropped_attrs.push(has_dropped_attrs.then_some(span.dropped_attributes_count));
            col_dropped_events.push(has_dropped_events.then_some(span.dropped_events_count));
            col_dropped_links.push(has_dropped_links.then_some(span.dropped_links_count));
            status_presence.push(has_status);
            col_status_code.push(
                has_status_code.then(|| span.status.as_ref().expect("checked above").code as i32),
            );
            col_status_message.push(
                has_status_message
                    .then(|| span.status.as_ref().expect("checked above").message.clone()),
            );

            let mut span_excluded = prepared.shared_span_attrs.clone();
            for (k, v) in &prepared.shared_event_attrs {
                let _ = span_excluded.entry(k.clone()).or_insert_with(|| v.clone());
            }
            for (k, v) in &prepared.shared_link_attrs {
                let _ = span_excluded.entry(k.clone()).or_insert_with(|| v.clone());
            }
            self.span_attrs
                .append_map(u32::from(span_row_id), &span.attributes, &span_excluded);
            self.span_attrs.append_map(
                u32::from(span_row_id),
                &prepared.shared_event_attrs,
                &AttributeMap::new(),
            );
            self.span_attrs.append_map(
                u32::from(span_row_id),
                &prepared.shared_link_attrs,
                &AttributeMap::new(),
            );
            self.scope_attrs.append_map(
                u32::from(prepared.scope_id),
                &prepared.shared_span_attrs,
                &AttributeMap::new(),
            );

            for event in &span.events {
                let event_row_id = next_dense_id(&mut next_event_id)?;
                let has_time = event.time_unix_nano != 0;
                observe_optional(
                    &mut self.span_events,
                    config,
                    ArrowPayloadType::SpanEvents,
                    consts::events::TIME,
                    has_time,
                )?;
                {
                    let (_, dict_event) = self.event_name_dict.record(&event.name);
                    observe_dictionary(
                        &mut self.span_events,
                        config,
                        ArrowPayloadType::SpanEvents,
                        consts::events::NAME,
                        dict_event,
                        Some(self.event_name_dict.distinct_count() as u64),
                        Some(self.event_name_dict.total_count()),
                    )?;
                }

                let remaining: AttributeMap = event
                    .attributes
                    .iter()
                    .filter(|(k, v)| prepared.shared_event_attrs.get(*k) != Some(*v))
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                let has_attrs_id = !remaining.is_empty();
                observe_optional(
                    &mut self.span_events,
                    config,
                    ArrowPayloadType::SpanEvents,
                    consts::events::ATTRS_ID,
                    has_attrs_id,
                )?;
                let has_dropped = event.dropped_attributes_count != 0;
                observe_optional(
                    &mut self.span_events,
                    config,
                    ArrowPayloadType::SpanEvents,
                    consts::events::DROPPED_ATTRS,
                    has_dropped,
                )?;

                events_id.push(Some(event_row_id));
                events_parent_id.push(Some(span_row_id));
                events_time.push(has_time.then_some(event.time_unix_nano as i64));
                events_name.push(Some(event.name.clone()));
                events_attrs_id.push(has_attrs_id.then_some(u32::from(event_row_id)));
                events_dropped_attrs.push(has_dropped.then_some(event.dropped_attributes_count));

                if has_attrs_id {
                    self.span_event_attrs.append_map(
                        u32::from(event_row_id),
                        &event.attributes,
                        &prepared.shared_event_attrs,
                    );
                }
            }

            for link in &span.links {
                let link_row_id = next_dense_id(&mut next_link_id)?;
                let has_link_trace_state = link.trace_state.is_some();
                observe_optional(
                    &mut self.span_links,
                    config,
                    ArrowPayloadType::SpanLinks,
                    consts::links::TRACE_STATE,
                    has_link_trace_state,
                )?;
                if let Some(ts) = &link.trace_state {
                    let (_, dict_event) = self.link_trace_state_dict.record(ts);
                    observe_dictionary(
                        &mut self.span_links,
                        config,
                        ArrowPayloadType::SpanLinks,
                        consts::links::TRACE_STATE,
                        dict_event,
                        Some(self.link_trace_state_dict.distinct_count() as u64),
                        Some(self.link_trace_state_dict.total_count()),
                    )?;
                }

                let remaining: AttributeMap = link
                    .attributes
                    .iter()
                    .filter(|(k, v)| prepared.shared_link_attrs.get(*k) != Some(*v))
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                let has_attrs_id = !remaining.is_empty();
                observe_optional(
                    &mut self.span_links,
                    config,
                    ArrowPayloadType::SpanLinks,
                    consts::links::ATTRS_ID,
                    has_attrs_id,
                )?;
                let has_dropped = link.dropped_attributes_count != 0;
                observe_optional(
                    &mut self.span_links,
                    config,
                    ArrowPayloadType::SpanLinks,
                    consts::links::DROPPED_ATTRS,
                    has_dropped,
                )?;

                links_id.push(Some(link_row_id));
                links_parent_id.push(Some(span_row_id));
                links_trace_id.push(Some(link.trace_id.to_vec()));
                links_span_id.push(Some(link.span_id.to_vec()));
                links_trace_state.push(link.trace_state.clone());
                links_attrs_id.push(has_attrs_id.then_some(u32::from(link_row_id)));
                links_dropped_attrs.push(has_dropped.then_some(link.dropped_attributes_count));

                if has_attrs_id {
                    self.span_link_attrs.append_map(
                        u32::from(link_row_id),
                        &link.attributes,
                        &prepared.shared_link_attrs,
                    );
                }
            }
        }

        let mut span_columns = Vec::new();
        if let Some(c) = self.spans.finish_leaf(consts::ID, ColumnValues::UInt16(col_id))? {
            span_columns.push(c);
        }
        if let Some(c) = self
            .spans
            .finish_leaf(consts::spans::RESOURCE_ID, ColumnValues::UInt16(col_resource_id))?
        {
            span_columns.push(c);
        }
        if let Some(c) = self
            .spans
            .finish_leaf(consts::spans::SCOPE_ID, ColumnValues::UInt16(col_scope_id))?
        {
            span_columns.push(c);
        }
        if let Some(c) = self
            .spans
            .finish_leaf(consts::spans::START, ColumnValues::TimestampNanos(col_start))?
        {
            span_columns.push(c);
        }
        if let Some(c) = self
            .spans
            .finish_leaf(consts::spans::DURATION, ColumnValues::DurationMillis(col_duration))?
        {
            span_columns.push(c);
        }
        if let Some(c) = self.spans.finish_leaf(
            consts::spans::TRACE_ID,
            ColumnValues::FixedSizeBinary {
                width: 16,
                values: col_trace_id,
            },
        )? {
            span_columns.push(c);
        }
        if let Some(c) = self.spans.finish_leaf(
            consts::spans::SPAN_ID,
            ColumnValues::FixedSizeBinary {
                width: 8,
                values: col_span_id,
            },
        )? {
            span_columns.push(c);
        }
        if let Some(c) = self
            .spans
            .finish_leaf(consts::spans::TRACE_STATE, ColumnValues::Utf8(col_trace_state))?
        {
            span_columns.push(c);
        }
        if let Some(c) = self.spans.finish_leaf(
            consts::spans::PARENT_SPAN_ID,
            ColumnValues::FixedSizeBinary {
                width: 8,
                values: col_parent_span_id,
            },
        )? {
            span_columns.push(c);
        }
        if let Some(c) = self.spans.finish_leaf(consts::spans::NAME, ColumnValues::Utf8(col_name))? {
            span_columns.push(c);
        }
        if let Some(c) = self.spans.finish_leaf(consts::spans::KIND, ColumnValues::Int32(col_kind))? {
            span_columns.push(c);
        }
        if let Some(c) = self
            .spans
            .finish_leaf(consts::spans::DROPPED_ATTRS, ColumnValues::UInt32(col_dropped_attrs))?
        {
            span_columns.push(c);
        }
        if let Some(c) = self
            .spans
            .finish_leaf(consts::spans::DROPPED_EVENTS, ColumnValues::UInt32(col_dropped_events))?
        {
            span_columns.push(c);
        }
        if let Some(c) = self
            .spans
            .finish_leaf(consts::spans::DROPPED_LINKS, ColumnValues::UInt32(col_dropped_links))?
        {
            span_columns.push(c);
        }
        if let Some(c) = self.spans.finish_struct(
            consts::spans::STATUS,
            &status_presence,
            vec![
                (consts::spans::STATUS_CODE, ColumnValues::Int32(col_status_code)),
                (consts::spans::STATUS_MESSAGE, ColumnValues::Utf8(col_status_message)),
            ],
        )? {
            span_columns.push(c);
        }
        let spans_batch = AdaptiveRecordBuilder::assemble(span_columns)?;

        let mut event_columns = Vec::new();
        if let Some(c) = self
            .span_events
            .finish_leaf(consts::ID, ColumnValues::UInt16(events_id))?
        {
            event_columns.push(c);
        }
        if let Some(c) = self
            .span_events
            .finish_leaf(consts::PARENT_ID, ColumnValues::UInt16(events_parent_id))?
        {
            event_columns.push(c);
        }
        if let Some(c) = self
            .span_events
            .finish_leaf(consts::events::TIME, ColumnValues::TimestampNanos(events_time))?
        {
            event_columns.push(c);
        }
        if let Some(c) = self
            .span_events
            .finish_leaf(consts::events::NAME, ColumnValues::Utf8(events_name))?
        {
            event_columns.push(c);
        }
        if let Some(c) = self
            .span_events
            .finish_leaf(consts::events::ATTRS_ID, ColumnValues::UInt32(events_attrs_id))?
        {
            event_columns.push(c);
        }
        if let Some(c) = self.span_events.finish_leaf(
            consts::events::DROPPED_ATTRS,
            ColumnValues::UInt32(events_dropped_attrs),
        )? {
            event_columns.push(c);
        }
        let events_non_empty = !event_columns.is_empty() && !events_id.is_empty();
        let span_events_batch = AdaptiveRecordBuilder::assemble(event_columns)?;

        let mut link_columns = Vec::new();
        if let Some(c) = self.span_links.finish_leaf(consts::ID, ColumnValues::UInt16(links_id))? {
            link_columns.push(c);
        }
        if let Some(c) = self
            .span_links
            .finish_leaf(consts::PARENT_ID, ColumnValues::UInt16(links_parent_id))?
        {
            link_columns.push(c);
        }
        if let Some(c) = self.span_links.finish_leaf(
            consts::links::TRACE_ID,
            ColumnValues::FixedSizeBinary {
                width: 16,
                values: links_trace_id,
            },
        )? {
            link_columns.push(c);
        }
        if let Some(c) = self.span_links.finish_leaf(
            consts::links::SPAN_ID,
            ColumnValues::FixedSizeBinary {
                width: 8,
                values: links_span_id,
            },
        )? {
            link_columns.push(c);
        }
        if let Some(c) = self
            .span_links
            .finish_leaf(consts::links::TRACE_STATE, ColumnValues::Utf8(links_trace_state))?
        {
            link_columns.push(c);
        }
        if let Some(c) = self
            .span_links
            .finish_leaf(consts::links::ATTRS_ID, ColumnValues::UInt32(links_attrs_id))?
        {
            link_columns.push(c);
        }
        if let Some(c) = self.span_links.finish_leaf(
            consts::links::DROPPED_ATTRS,
            ColumnValues::UInt32(links_dropped_attrs),
        )? {
            link_columns.push(c);
        }
        let links_non_empty = !link_columns.is_empty() && !links_id.is_empty();
        let span_links_batch = AdaptiveRecordBuilder::assemble(link_columns)?;

        let resource_attrs_built = self.resource_attrs.build(config, ArrowPayloadType::ResourceAttrs)?;
        let scope_attrs_built = self.scope_attrs.build(config, ArrowPayloadType::ScopeAttrs)?;
        let span_attrs_built = self.span_attrs.build(config, ArrowPayloadType::SpanAttrs)?;
        let span_event_attrs_built = self
            .span_event_attrs
            .build(config, ArrowPayloadType::SpanEventAttrs)?;
        let span_link_attrs_built = self
            .span_link_attrs
            .build(config, ArrowPayloadType::SpanLinkAttrs)?;

        // Mirrors `ArrowPayloadType::emission_order`: Spans always first,
        // every related record immediately after the record it targets.
        let mut payloads = Vec::with_capacity(8);
        payloads.push(make_payload(ArrowPayloadType::Spans, spans_batch));
        if resource_attrs_built.row_count > 0 {
            payloads.push(make_payload(
                ArrowPayloadType::ResourceAttrs,
                attrs_batch(resource_attrs_built)?,
            ));
        }
        if scope_attrs_built.row_count > 0 {
            payloads.push(make_payload(
                ArrowPayloadType::ScopeAttrs,
                attrs_batch(scope_attrs_built)?,
            ));
        }
        if span_attrs_built.row_count > 0 {
            payloads.push(make_payload(
                ArrowPayloadType::SpanAttrs,
                attrs_batch(span_attrs_built)?,
            ));
        }
        if events_non_empty {
            payloads.push(make_payload(ArrowPayloadType::SpanEvents, span_events_batch));
        }
        if span_event_attrs_built.row_count > 0 {
            payloads.push(make_payload(
                ArrowPayloadType::SpanEventAttrs,
                attrs_batch(span_event_attrs_built)?,
            ));
        }
        if links_non_empty {
            payloads.push(make_payload(ArrowPayloadType::SpanLinks, span_links_batch));
        }
        if span_link_attrs_built.row_count > 0 {
            payloads.push(make_payload(
                ArrowPayloadType::SpanLinkAttrs,
                attrs_batch(span_link_attrs_built)?,
            ));
        }

        if config.stats {
            for payload in &payloads {
                config.observer.on_record(&payload.record, payload.payload_type);
                let changed = self
                    .last_schema_ids
                    .get(&payload.payload_type)
                    .is_some_and(|prev| *prev != payload.schema_id);
                if changed {
                    config.observer.on_schema_update(&Event {
                        kind: EventKind::SchemaUpdate,
                        record_name: payload.payload_type,
                        field_path: "",
                        old_type: None,
                        new_type: None,
                        cardinality: None,
                        total: None,
                    });
                }
                let _ = self
                    .last_schema_ids
                    .insert(payload.payload_type, payload.schema_id.clone());
            }
        }

        self.maybe_reset_dictionaries(config);

        Ok(payloads)
    }
}
