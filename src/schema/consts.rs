// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Field name constants shared between schema declarations, builders, and
//! tests, so a renamed column is a one-line change.

/// Dense row id column present on every record that has child records.
pub const ID: &str = "id";
/// Parent-id column on every child record.
pub const PARENT_ID: &str = "parent_id";

pub mod spans {
    //! Column names for the main `SPANS` record.
    pub const START: &str = "start_time_unix_nano";
    pub const DURATION: &str = "duration_ms";
    pub const TRACE_ID: &str = "trace_id";
    pub const SPAN_ID: &str = "span_id";
    pub const TRACE_STATE: &str = "trace_state";
    pub const PARENT_SPAN_ID: &str = "parent_span_id";
    pub const NAME: &str = "name";
    pub const KIND: &str = "kind";
    pub const DROPPED_ATTRS: &str = "dropped_attributes_count";
    pub const DROPPED_EVENTS: &str = "dropped_events_count";
    pub const DROPPED_LINKS: &str = "dropped_links_count";
    pub const STATUS: &str = "status";
    pub const STATUS_CODE: &str = "code";
    pub const STATUS_MESSAGE: &str = "message";
    pub const RESOURCE_ID: &str = "resource_id";
    pub const SCOPE_ID: &str = "scope_id";
}

pub mod attrs {
    //! Column names shared by all `*_ATTRS` records.
    pub const KEY: &str = "key";
    pub const VALUE: &str = "value";
}

pub mod events {
    //! Column names for the `SPAN_EVENTS` record.
    pub const TIME: &str = "time_unix_nano";
    pub const NAME: &str = "name";
    pub const ATTRS_ID: &str = "attrs_id";
    pub const DROPPED_ATTRS: &str = "dropped_attributes_count";
}

pub mod links {
    //! Column names for the `SPAN_LINKS` record.
    pub const TRACE_ID: &str = "trace_id";
    pub const SPAN_ID: &str = "span_id";
    pub const TRACE_STATE: &str = "trace_state";
    pub const ATTRS_ID: &str = "attrs_id";
    pub const DROPPED_ATTRS: &str = "dropped_attributes_count";
}
