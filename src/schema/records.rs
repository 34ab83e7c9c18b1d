// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Initial schema declarations for the eight records the producer emits.
//! Each function returns the starting [`FieldNode`] tree for that record;
//! [`crate::builder::record::AdaptiveRecordBuilder`] owns mutating it in
//! place as data is observed.

use super::consts;
use super::field::{FieldMeta, FieldNode, IndexWidth};
use arrow::datatypes::{DataType, TimeUnit};

// The eight `*_ATTRS` records (`RESOURCE_ATTRS`, `SCOPE_ATTRS`, `SPAN_ATTRS`,
// `SPAN_EVENT_ATTRS`, `SPAN_LINK_ATTRS`) are assembled directly by
// `crate::related::attrs_batch` from `crate::attributes::AttributeAccumulator::build`
// rather than through an `AdaptiveRecordBuilder` declared here. Their shape
// (`parent_id`/`key`/`value`) never blooms or suppresses a column, and their
// `key`/value-union dictionary legs always use a physical 16-bit key (see
// `AttributeAccumulator::build`'s doc comment) -- there is no schema
// transition for a declared tree to track, so they are intentionally
// fixed-schema rather than adaptive.

/// Main `SPANS` record.
#[must_use]
pub fn spans_schema() -> Vec<FieldNode> {
    let status_code =
        FieldNode::leaf(FieldMeta::identity(consts::spans::STATUS_CODE, DataType::Int32)
            .optional()
            .dictionary(IndexWidth::U8));
    let status_message = FieldNode::leaf(
        FieldMeta::identity(consts::spans::STATUS_MESSAGE, DataType::Utf8)
            .optional()
            .dictionary(IndexWidth::U8),
    );
    let status = FieldNode::with_children(
        FieldMeta::identity(consts::spans::STATUS, DataType::Null).optional(),
        vec![status_code, status_message],
    );

    vec![
        FieldNode::leaf(FieldMeta::identity(consts::ID, DataType::UInt16).delta(1)),
        FieldNode::leaf(FieldMeta::identity(
            consts::spans::RESOURCE_ID,
            DataType::UInt16,
        )),
        FieldNode::leaf(FieldMeta::identity(consts::spans::SCOPE_ID, DataType::UInt16)),
        FieldNode::leaf(FieldMeta::identity(
            consts::spans::START,
            DataType::Timestamp(TimeUnit::Nanosecond, None),
        )),
        FieldNode::leaf(
            FieldMeta::identity(
                consts::spans::DURATION,
                DataType::Duration(TimeUnit::Millisecond),
            )
            .dictionary(IndexWidth::U8),
        ),
        FieldNode::leaf(FieldMeta::identity(
            consts::spans::TRACE_ID,
            DataType::FixedSizeBinary(16),
        )),
        FieldNode::leaf(FieldMeta::identity(
            consts::spans::SPAN_ID,
            DataType::FixedSizeBinary(8),
        )),
        FieldNode::leaf(
            FieldMeta::identity(consts::spans::TRACE_STATE, DataType::Utf8)
                .optional()
                .dictionary(IndexWidth::U8),
        ),
        FieldNode::leaf(
            FieldMeta::identity(consts::spans::PARENT_SPAN_ID, DataType::FixedSizeBinary(8))
                .optional(),
        ),
        FieldNode::leaf(
            FieldMeta::identity(consts::spans::NAME, DataType::Utf8).dictionary(IndexWidth::U8),
        ),
        FieldNode::leaf(
            FieldMeta::identity(consts::spans::KIND, DataType::Int32)
                .optional()
                .dictionary(IndexWidth::U8),
        ),
        FieldNode::leaf(
            FieldMeta::identity(consts::spans::DROPPED_ATTRS, DataType::UInt32).optional(),
        ),
        FieldNode::leaf(
            FieldMeta::identity(consts::spans::DROPPED_EVENTS, DataType::UInt32).optional(),
        ),
        FieldNode::leaf(
            FieldMeta::identity(consts::spans::DROPPED_LINKS, DataType::UInt32).optional(),
        ),
        status,
    ]
}

/// `SPAN_EVENTS` record.
#[must_use]
pub fn span_events_schema() -> Vec<FieldNode> {
    vec![
        FieldNode::leaf(FieldMeta::identity(consts::ID, DataType::UInt16)),
        FieldNode::leaf(FieldMeta::identity(consts::PARENT_ID, DataType::UInt16)),
        FieldNode::leaf(
            FieldMeta::identity(consts::events::TIME, DataType::Timestamp(TimeUnit::Nanosecond, None))
                .optional(),
        ),
        FieldNode::leaf(
            FieldMeta::identity(consts::events::NAME, DataType::Utf8).dictionary(IndexWidth::U8),
        ),
        FieldNode::leaf(
            FieldMeta::identity(consts::events::ATTRS_ID, DataType::UInt32)
                .optional()
                .delta(1),
        ),
        FieldNode::leaf(
            FieldMeta::identity(consts::events::DROPPED_ATTRS, DataType::UInt32).optional(),
        ),
    ]
}

/// `SPAN_LINKS` record.
#[must_use]
pub fn span_links_schema() -> Vec<FieldNode> {
    vec![
        FieldNode::leaf(FieldMeta::identity(consts::ID, DataType::UInt16)),
        FieldNode::leaf(FieldMeta::identity(consts::PARENT_ID, DataType::UInt16)),
        FieldNode::leaf(FieldMeta::identity(
            consts::links::TRACE_ID,
            DataType::FixedSizeBinary(16),
        )),
        FieldNode::leaf(FieldMeta::identity(
            consts::links::SPAN_ID,
            DataType::FixedSizeBinary(8),
        )),
        FieldNode::leaf(
            FieldMeta::identity(consts::links::TRACE_STATE, DataType::Utf8)
                .optional()
                .dictionary(IndexWidth::U8),
        ),
        FieldNode::leaf(
            FieldMeta::identity(consts::links::ATTRS_ID, DataType::UInt32)
                .optional()
                .delta(1),
        ),
        FieldNode::leaf(
            FieldMeta::identity(consts::links::DROPPED_ATTRS, DataType::UInt32).optional(),
        ),
    ]
}
