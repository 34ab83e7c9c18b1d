// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Typed column accumulation for the non-attribute records (`SPANS`,
//! `SPAN_EVENTS`, `SPAN_LINKS`).
//!
//! A [`ColumnValues`] collects one column's worth of rows in a plain,
//! type-specific `Vec<Option<T>>`, independent of how the column will
//! ultimately be encoded. At `finish` time, the owning [`crate::schema::field::Transform`]
//! decides whether the column is emitted as a plain array or wrapped in a
//! dictionary. Every dictionary-encoded column here uses a 16-bit physical
//! key regardless of the logical [`crate::schema::field::IndexWidth`] the
//! transform reports -- that width only ever grows to 16 bits in this
//! producer, so a single physical key type keeps the builder code simple
//! without losing any of the promotion bookkeeping, which lives in
//! [`crate::dictionary::DictionaryManager`] instead.

use crate::schema::field::Transform;
use arrow::array::{
    ArrayRef, BooleanArray, DurationMillisecondArray, FixedSizeBinaryArray, Int32Array,
    PrimitiveDictionaryBuilder, StringArray, StringDictionaryBuilder, TimestampNanosecondArray,
    UInt16Array, UInt32Array,
};
use arrow::datatypes::{DurationMillisecondType, Int32Type, UInt16Type};
use std::sync::Arc;

/// One column's accumulated, not-yet-encoded values.
#[derive(Debug)]
pub enum ColumnValues {
    /// UTF-8 strings, dictionary-encodable.
    Utf8(Vec<Option<String>>),
    /// 32-bit signed integers, dictionary-encodable (e.g. `status.code`, `kind`).
    Int32(Vec<Option<i32>>),
    /// 16-bit unsigned integers (dense row ids).
    UInt16(Vec<Option<u16>>),
    /// 32-bit unsigned integers (dropped-count columns, wide attrs ids).
    UInt32(Vec<Option<u32>>),
    /// Booleans.
    Bool(Vec<Option<bool>>),
    /// Nanosecond timestamps.
    TimestampNanos(Vec<Option<i64>>),
    /// Millisecond durations, dictionary-encodable.
    DurationMillis(Vec<Option<i64>>),
    /// Fixed-width binary values (trace/span ids).
    FixedSizeBinary {
        /// Declared byte width.
        width: i32,
        /// Accumulated values.
        values: Vec<Option<Vec<u8>>>,
    },
}

impl ColumnValues {
    /// Number of rows accumulated so far.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            ColumnValues::Utf8(v) => v.len(),
            ColumnValues::Int32(v) => v.len(),
            ColumnValues::UInt16(v) => v.len(),
            ColumnValues::UInt32(v) => v.len(),
            ColumnValues::Bool(v) => v.len(),
            ColumnValues::TimestampNanos(v) => v.len(),
            ColumnValues::DurationMillis(v) => v.len(),
            ColumnValues::FixedSizeBinary { values, .. } => values.len(),
        }
    }

    /// Is this column empty?
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Builds the Arrow array for this column under the given transform.
    ///
    /// # Errors
    /// Returns an error if `transform` requests dictionary encoding for a
    /// type this column does not support (only `Utf8`, `Int32` and
    /// `DurationMillis` may be dictionary-encoded).
    pub fn finish(self, transform: &Transform) -> crate::error::Result<ArrayRef> {
        let dictionary = matches!(transform, Transform::Dictionary(_));
        let array: ArrayRef = match self {
            ColumnValues::Utf8(values) if dictionary => {
                let mut builder: StringDictionaryBuilder<UInt16Type> = StringDictionaryBuilder::new();
                for v in values {
                    match v {
                        Some(s) => {
                            let _ = builder.append_value(s)?;
                        }
                        None => builder.append_null(),
                    }
                }
                Arc::new(builder.finish())
            }
            ColumnValues::Utf8(values) => Arc::new(StringArray::from(values)),
            ColumnValues::Int32(values) if dictionary => {
                let mut builder: PrimitiveDictionaryBuilder<Int32Type, UInt16Type> =
                    PrimitiveDictionaryBuilder::new();
                for v in values {
                    match v {
                        Some(i) => {
                            let _ = builder.append_value(i)?;
                        }
                        None => builder.append_null(),
                    }
                }
                Arc::new(builder.finish())
            }
            ColumnValues::Int32(values) => Arc::new(Int32Array::from(values)),
            ColumnValues::UInt16(values) => Arc::new(UInt16Array::from(values)),
            ColumnValues::UInt32(values) => Arc::new(UInt32Array::from(values)),
            ColumnValues::Bool(values) => Arc::new(BooleanArray::from(values)),
            ColumnValues::TimestampNanos(values) => {
                Arc::new(TimestampNanosecondArray::from(values))
            }
            ColumnValues::DurationMillis(values) if dictionary => {
                let mut builder: PrimitiveDictionaryBuilder<DurationMillisecondType, UInt16Type> =
                    PrimitiveDictionaryBuilder::new();
                for v in values {
                    match v {
                        Some(d) => {
                            let _ = builder.append_value(d)?;
                        }
                        None => builder.append_null(),
                    }
                }
                Arc::new(builder.finish())
            }
            ColumnValues::DurationMillis(values) => Arc::new(DurationMillisecondArray::from(values)),
            ColumnValues::FixedSizeBinary { width, values } => {
                let values: Vec<Option<Vec<u8>>> = values;
                Arc::new(FixedSizeBinaryArray::try_from_sparse_iter_with_size(
                    values.into_iter(),
                    width,
                )?)
            }
        };
        Ok(array)
    }
}
