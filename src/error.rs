// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Error taxonomy for the producer core.
//!
//! `SchemaNotUpToDate` is deliberately *not* a variant here: it is an
//! internal, transient, catchable signal consumed entirely inside
//! [`crate::builder::record::AdaptiveRecordBuilder::build_record`] and
//! [`crate::producer::TracesProducer::build_batch`]'s retry loop. It never
//! appears in this enum because it must never accidentally propagate past
//! the retry boundary as if it were fatal.

use crate::payload::ArrowPayloadType;
use arrow::datatypes::DataType;

/// Result type used throughout the producer core.
pub type Result<T> = std::result::Result<T, Error>;

/// All errors the producer core can surface to its caller.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An arrow-rs error occurred while assembling a record batch.
    #[error("an arrow error occurred encoding record batch: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Serializing a list/map attribute value to the CBOR escape leg failed.
    #[error("an error occurred serializing an attribute value as CBOR: {source}")]
    Cbor {
        /// The underlying CBOR serialization error.
        source: ciborium::ser::Error<std::io::Error>,
    },

    /// `next_span_id()` would overflow `u16::MAX`.
    #[error("batch of {attempted} spans exceeds the maximum of {} spans per batch", u16::MAX)]
    BatchSizeExceeded {
        /// The span id that would have been allocated.
        attempted: u32,
    },

    /// An attribute value could not be represented in the value union.
    #[error("attribute value is not representable in the value union: {reason}")]
    AttributeValueUnsupported {
        /// Human-readable explanation.
        reason: String,
    },

    /// A column was expected to be a struct-typed column but was not.
    #[error("expected struct-typed column `{name}`, found {actual}")]
    NotStructType {
        /// The field path that was inspected.
        name: String,
        /// The type that was actually found.
        actual: DataType,
    },

    /// A column was expected to be a list-typed column but was not.
    #[error("expected list-typed column `{name}`, found {actual}")]
    NotListType {
        /// The field path that was inspected.
        name: String,
        /// The type that was actually found.
        actual: DataType,
    },

    /// A list column was expected to contain structs but did not.
    #[error("expected list-of-structs column `{name}`")]
    NotListOfStructs {
        /// The field path that was inspected.
        name: String,
    },

    /// An array had an unexpected Arrow `DataType` for the requested operation.
    #[error("invalid array type for `{name}`: expected {expected}, found {actual}")]
    InvalidArrayType {
        /// The field path that was inspected.
        name: String,
        /// The expected type.
        expected: DataType,
        /// The type that was actually found.
        actual: DataType,
    },

    /// Two fields in a schema declaration collided on name.
    #[error("duplicate field name: {name}")]
    DuplicateFieldName {
        /// The colliding field name.
        name: String,
    },

    /// The producer was used after [`crate::producer::TracesProducer::release`].
    #[error("producer has been released and can no longer be used")]
    Released,

    /// The builder exceeded the bounded schema-flap retry budget.
    #[error("schema did not stabilize after {attempts} retries building {payload_type:?}")]
    SchemaFlap {
        /// Number of consecutive retries attempted.
        attempts: u8,
        /// The record that could not be stabilized.
        payload_type: ArrowPayloadType,
    },
}

impl From<ciborium::ser::Error<std::io::Error>> for Error {
    fn from(source: ciborium::ser::Error<std::io::Error>) -> Self {
        Error::Cbor { source }
    }
}
