// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Attribute accumulator.
//!
//! Two logical variants exist -- [`ParentWidth::U16`] for `RESOURCE_ATTRS`,
//! `SCOPE_ATTRS` and `SPAN_ATTRS`, and [`ParentWidth::U32`] for
//! `SPAN_EVENT_ATTRS`/`SPAN_LINK_ATTRS` -- differing only in the width of
//! the `parent_id` column they ultimately emit. Both are modeled by
//! the same [`AttributeAccumulator`] struct, selecting the output array
//! type from `parent_width` at build time, rather than as two separate
//! generic instantiations: the row-collection, dedup and sort logic is
//! identical either way and duplicating it would just be two copies of the
//! same bug surface.

use crate::config::ProducerConfig;
use crate::dictionary::{DictionaryEvent, DictionaryManager};
use crate::model::AttributeValue;
use crate::observer::{Event, EventKind};
use crate::payload::ArrowPayloadType;
use crate::schema::field::IndexWidth;
use arrow::array::{
    ArrayRef, BinaryDictionaryBuilder, BooleanArray, Float64Array, Int64Array,
    StringDictionaryBuilder, UInt16Array, UInt32Array,
};
use arrow::array::UnionArray;
use arrow::buffer::ScalarBuffer;
use arrow::datatypes::{DataType, Field, UInt16Type, UnionFields, UnionMode};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

fn notify_metadata_update(
    config: &ProducerConfig,
    payload_type: ArrowPayloadType,
    field_path: &str,
    event: DictionaryEvent,
) {
    if !config.stats || matches!(event, DictionaryEvent::Appended) {
        return;
    }
    config.observer.on_metadata_update(&Event {
        kind: EventKind::MetadataUpdate,
        record_name: payload_type,
        field_path,
        old_type: None,
        new_type: None,
        cardinality: None,
        total: None,
    });
}

/// Union type-id tags for the attribute value sparse union.
pub mod value_tag {
    /// UTF-8 string leg.
    pub const STR: i8 = 0;
    /// Signed 64-bit integer leg.
    pub const INT: i8 = 1;
    /// 64-bit float leg.
    pub const DOUBLE: i8 = 2;
    /// Boolean leg.
    pub const BOOL: i8 = 3;
    /// Raw bytes leg.
    pub const BYTES: i8 = 4;
    /// CBOR escape leg for list/map values.
    pub const CBOR: i8 = 5;
}

/// Builds the Arrow `DataType` of the attribute value sparse union.
///
/// String and bytes legs start dictionary-encoded at an 8-bit index, widened
/// independently by their own [`DictionaryManager`] as cardinality grows;
/// numeric legs are always plain.
#[must_use]
pub fn value_union_type() -> DataType {
    value_union_type_at_widths(IndexWidth::U8, IndexWidth::U8, IndexWidth::U8)
}

// The physical dictionary key for every leg here is always 16-bit (see
// `AttributeAccumulator::build`'s doc comment), so `dict_type` does not
// take the logical `IndexWidth` at all -- only the promotion/overflow
// bookkeeping in `DictionaryManager` varies by width.
fn dict_type(value: DataType) -> DataType {
    DataType::Dictionary(Box::new(DataType::UInt16), Box::new(value))
}

/// Builds the union type. `str_w`/`bytes_w`/`cbor_w` are accepted for
/// symmetry with the per-leg [`DictionaryManager`]s that track their
/// cardinality, but do not affect the physical type: every dictionary leg
/// here always uses a 16-bit key.
#[must_use]
pub fn value_union_type_at_widths(
    _str_w: IndexWidth,
    _bytes_w: IndexWidth,
    _cbor_w: IndexWidth,
) -> DataType {
    let fields: Vec<(i8, Arc<Field>)> = vec![
        (
            value_tag::STR,
            Arc::new(Field::new("str", dict_type(DataType::Utf8), true)),
        ),
        (value_tag::INT, Arc::new(Field::new("int", DataType::Int64, true))),
        (
            value_tag::DOUBLE,
            Arc::new(Field::new("double", DataType::Float64, true)),
        ),
        (value_tag::BOOL, Arc::new(Field::new("bool", DataType::Boolean, true))),
        (
            value_tag::BYTES,
            Arc::new(Field::new("bytes", dict_type(DataType::Binary), true)),
        ),
        (
            value_tag::CBOR,
            Arc::new(Field::new("cbor", dict_type(DataType::Binary), true)),
        ),
    ];
    DataType::Union(UnionFields::from_iter(fields), UnionMode::Sparse)
}

/// Which column width this accumulator's `parent_id` column emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentWidth {
    /// 16-bit parent id (resource/scope/span attrs).
    U16,
    /// 32-bit parent id (event/link attrs).
    U32,
}

/// A single pending attribute row, collected before the build-time sort.
#[derive(Debug, Clone)]
struct PendingAttr {
    parent_id: u32,
    key: String,
    value: AttributeValue,
}

/// Collects `(parent_id, key, value)` tuples and, at build time, dedups,
/// globally sorts, and emits them into Arrow arrays.
pub struct AttributeAccumulator {
    parent_width: ParentWidth,
    rows: Vec<PendingAttr>,
    key_dict: DictionaryManager<String>,
    str_dict: DictionaryManager<String>,
    bytes_dict: DictionaryManager<Vec<u8>>,
    cbor_dict: DictionaryManager<Vec<u8>>,
}

impl AttributeAccumulator {
    /// Builds a new, empty accumulator.
    #[must_use]
    pub fn new(parent_width: ParentWidth, limit: IndexWidth, reset_threshold: f64, reset_min_samples: u64) -> Self {
        AttributeAccumulator {
            parent_width,
            rows: Vec::new(),
            key_dict: DictionaryManager::new(IndexWidth::U8, limit, reset_threshold, reset_min_samples),
            str_dict: DictionaryManager::new(IndexWidth::U8, limit, reset_threshold, reset_min_samples),
            bytes_dict: DictionaryManager::new(IndexWidth::U8, limit, reset_threshold, reset_min_samples),
            cbor_dict: DictionaryManager::new(IndexWidth::U8, limit, reset_threshold, reset_min_samples),
        }
    }

    /// Number of pending (unbuilt) rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Is this accumulator free of pending rows?
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Queues one `(parent_id, key, value)` tuple.
    pub fn append(&mut self, parent_id: u32, key: &str, value: AttributeValue) {
        self.rows.push(PendingAttr {
            parent_id,
            key: key.to_string(),
            value,
        });
    }

    /// Queues an entire attribute map under one `parent_id`, skipping keys
    /// present in `excluded` (the group's shared-attribute set).
    pub fn append_map(
        &mut self,
        parent_id: u32,
        attrs: &crate::model::AttributeMap,
        excluded: &crate::model::AttributeMap,
    ) {
        for (key, value) in attrs {
            if excluded.get(key) == Some(value) {
                continue;
            }
            self.append(parent_id, key, value.clone());
        }
    }

    /// Clears pending rows; dictionary state is preserved across a reset.
    pub fn reset_rows(&mut self) {
        self.rows.clear();
    }

    /// Fully releases dictionary state too (used by
    /// [`crate::producer::TracesProducer::release`]).
    pub fn release(&mut self) {
        self.rows.clear();
        self.key_dict.reset();
        self.str_dict.reset();
        self.bytes_dict.reset();
        self.cbor_dict.reset();
    }

    /// Dedups identical `(parent_id, key, value)` tuples (from shared
    /// attribute expansion) and globally sorts by `(key, value, parent_id)`
    /// and the caller's sort order.
    fn dedup_and_sort(&mut self) {
        let mut seen: HashSet<(u32, String, String)> = HashSet::with_capacity(self.rows.len());
        self.rows.retain(|row| {
            let value_key = canonical_value_key(&row.value);
            seen.insert((row.parent_id, row.key.clone(), value_key))
        });
        self.rows.sort_by(|a, b| {
            a.key
                .cmp(&b.key)
                .then_with(|| compare_values(&a.value, &b.value))
                .then_with(|| a.parent_id.cmp(&b.parent_id))
        });
    }

    /// Builds the Arrow arrays for this accumulator's rows, consuming them.
    ///
    /// The three dictionary-encoded legs (key, str value, bytes/cbor value)
    /// are built with 16-bit dictionary keys regardless of the *logical*
    /// [`IndexWidth`] a [`DictionaryManager`] reports; the managers are used
    /// here to decide promotion/overflow/reset events for the stats
    /// observer and schema fingerprint, not to pick the builder's physical
    /// key type. A 16-bit key comfortably covers every width this producer
    /// supports, so this keeps the union construction straightforward.
    ///
    /// Unlike the main `SPANS`/`SPAN_EVENTS`/`SPAN_LINKS` records, this
    /// record's declared shape never changes, so a dictionary leg crossing
    /// its width threshold here is reported via `on_metadata_update` rather
    /// than `on_dictionary_upgrade`/`on_dictionary_overflow`, which are
    /// reserved for transitions that also mutate a transform tree.
    pub fn build(
        &mut self,
        config: &ProducerConfig,
        payload_type: ArrowPayloadType,
    ) -> crate::error::Result<BuiltAttrs> {
        self.dedup_and_sort();
        let n = self.rows.len();

        let mut key_builder: StringDictionaryBuilder<UInt16Type> = StringDictionaryBuilder::new();
        let mut str_builder: StringDictionaryBuilder<UInt16Type> = StringDictionaryBuilder::new();
        let mut bytes_builder: BinaryDictionaryBuilder<UInt16Type> = BinaryDictionaryBuilder::new();
        let mut cbor_builder: BinaryDictionaryBuilder<UInt16Type> = BinaryDictionaryBuilder::new();
        let mut type_ids: Vec<i8> = Vec::with_capacity(n);
        let mut int_values: Vec<Option<i64>> = Vec::with_capacity(n);
        let mut double_values: Vec<Option<f64>> = Vec::with_capacity(n);
        let mut bool_values: Vec<Option<bool>> = Vec::with_capacity(n);

        for row in &self.rows {
            let (_, event) = self.key_dict.record(&row.key);
            notify_metadata_update(config, payload_type, "key", event);
            let _ = key_builder.append_value(&row.key)?;

            int_values.push(None);
            double_values.push(None);
            bool_values.push(None);

            match &row.value {
                AttributeValue::Str(s) => {
                    type_ids.push(value_tag::STR);
                    let (_, event) = self.str_dict.record(s);
                    notify_metadata_update(config, payload_type, "value.str", event);
                    let _ = str_builder.append_value(s)?;
                    bytes_builder.append_null();
                    cbor_builder.append_null();
                }
                AttributeValue::Int(i) => {
                    type_ids.push(value_tag::INT);
                    *int_values.last_mut().expect("just pushed") = Some(*i);
                    str_builder.append_null();
                    bytes_builder.append_null();
                    cbor_builder.append_null();
                }
                AttributeValue::Double(d) => {
                    type_ids.push(value_tag::DOUBLE);
                    *double_values.last_mut().expect("just pushed") = Some(*d);
                    str_builder.append_null();
                    bytes_builder.append_null();
                    cbor_builder.append_null();
                }
                AttributeValue::Bool(b) => {
                    type_ids.push(value_tag::BOOL);
                    *bool_values.last_mut().expect("just pushed") = Some(*b);
                    str_builder.append_null();
                    bytes_builder.append_null();
                    cbor_builder.append_null();
                }
                AttributeValue::Bytes(b) => {
                    type_ids.push(value_tag::BYTES);
                    let (_, event) = self.bytes_dict.record(b);
                    notify_metadata_update(config, payload_type, "value.bytes", event);
                    str_builder.append_null();
                    let _ = bytes_builder.append_value(b)?;
                    cbor_builder.append_null();
                }
                AttributeValue::List(_) | AttributeValue::Map(_) => {
                    type_ids.push(value_tag::CBOR);
                    let encoded = encode_cbor(&row.value)?;
                    let (_, event) = self.cbor_dict.record(&encoded);
                    notify_metadata_update(config, payload_type, "value.cbor", event);
                    str_builder.append_null();
                    bytes_builder.append_null();
                    let _ = cbor_builder.append_value(&encoded)?;
                }
            }
        }

        let parent_id: ArrayRef = match self.parent_width {
            ParentWidth::U16 => Arc::new(UInt16Array::from_iter_values(
                self.rows.iter().map(|r| r.parent_id as u16),
            )),
            ParentWidth::U32 => Arc::new(UInt32Array::from_iter_values(
                self.rows.iter().map(|r| r.parent_id),
            )),
        };

        let key: ArrayRef = Arc::new(key_builder.finish());
        let value = self.finish_value_union(
            type_ids,
            int_values,
            double_values,
            bool_values,
            str_builder,
            bytes_builder,
            cbor_builder,
        )?;

        self.rows.clear();

        Ok(BuiltAttrs {
            parent_id,
            key,
            value,
            row_count: n,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn finish_value_union(
        &self,
        type_ids: Vec<i8>,
        int_values: Vec<Option<i64>>,
        double_values: Vec<Option<f64>>,
        bool_values: Vec<Option<bool>>,
        mut str_builder: StringDictionaryBuilder<UInt16Type>,
        mut bytes_builder: BinaryDictionaryBuilder<UInt16Type>,
        mut cbor_builder: BinaryDictionaryBuilder<UInt16Type>,
    ) -> crate::error::Result<ArrayRef> {
        let str_array: ArrayRef = Arc::new(str_builder.finish());
        let int_array: ArrayRef = Arc::new(Int64Array::from(int_values));
        let double_array: ArrayRef = Arc::new(Float64Array::from(double_values));
        let bool_array: ArrayRef = Arc::new(BooleanArray::from(bool_values));
        let bytes_array: ArrayRef = Arc::new(bytes_builder.finish());
        let cbor_array: ArrayRef = Arc::new(cbor_builder.finish());

        let data_type = value_union_type_at_widths(
            self.str_dict.width(),
            self.bytes_dict.width(),
            self.cbor_dict.width(),
        );
        let DataType::Union(fields, _mode) = &data_type else {
            unreachable!("value_union_type_at_widths always returns a Union")
        };

        let children: Vec<ArrayRef> = vec![str_array, int_array, double_array, bool_array, bytes_array, cbor_array];
        let type_ids_buf = ScalarBuffer::from(type_ids);
        let array = UnionArray::try_new(fields.clone(), type_ids_buf, None, children)?;
        Ok(Arc::new(array))
    }
}

/// The built arrays for one accumulator, ready to be installed as the
/// `parent_id`/`key`/`value` columns of a `*_ATTRS` record.
pub struct BuiltAttrs {
    /// Parent-id array, `UInt16Array` or `UInt32Array` depending on [`ParentWidth`].
    pub parent_id: ArrayRef,
    /// Dictionary-encoded key array.
    pub key: ArrayRef,
    /// Sparse-union value array.
    pub value: ArrayRef,
    /// Number of rows built.
    pub row_count: usize,
}

fn encode_cbor(value: &AttributeValue) -> crate::error::Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(&to_ciborium_value(value), &mut buf)
        .map_err(|e| crate::error::Error::Cbor { source: e })?;
    Ok(buf)
}

fn to_ciborium_value(value: &AttributeValue) -> ciborium::Value {
    match value {
        AttributeValue::Str(s) => ciborium::Value::Text(s.clone()),
        AttributeValue::Int(i) => ciborium::Value::Integer((*i).into()),
        AttributeValue::Double(d) => ciborium::Value::Float(*d),
        AttributeValue::Bool(b) => ciborium::Value::Bool(*b),
        AttributeValue::Bytes(b) => ciborium::Value::Bytes(b.clone()),
        AttributeValue::List(items) => {
            ciborium::Value::Array(items.iter().map(to_ciborium_value).collect())
        }
        AttributeValue::Map(map) => ciborium::Value::Map(
            map.iter()
                .map(|(k, v)| (ciborium::Value::Text(k.clone()), to_ciborium_value(v)))
                .collect(),
        ),
    }
}

/// A canonical string form of an attribute value, used only as a dedup key
/// collisions across differently-typed values that happen to
/// render identically are acceptable since dedup only ever removes an exact
/// `(parent_id, key, value)` duplicate that the caller produced on purpose
/// via shared-attribute expansion.
fn canonical_value_key(value: &AttributeValue) -> String {
    match value {
        AttributeValue::Str(s) => format!("s:{s}"),
        AttributeValue::Int(i) => format!("i:{i}"),
        AttributeValue::Double(d) => format!("d:{}", d.to_bits()),
        AttributeValue::Bool(b) => format!("b:{b}"),
        AttributeValue::Bytes(b) => format!("y:{b:?}"),
        AttributeValue::List(items) => format!("l:{:?}", items.iter().map(canonical_value_key).collect::<Vec<_>>()),
        AttributeValue::Map(map) => format!(
            "m:{:?}",
            map.iter().map(|(k, v)| (k.clone(), canonical_value_key(v))).collect::<Vec<_>>()
        ),
    }
}

/// Total order over attribute values for the global sort:
/// values are ordered first by type tag, then by natural value order within
/// a type. Ordering across types is otherwise arbitrary but must be total
/// and stable so the producer's output is deterministic.
fn compare_values(a: &AttributeValue, b: &AttributeValue) -> Ordering {
    fn tag(v: &AttributeValue) -> u8 {
        match v {
            AttributeValue::Str(_) => 0,
            AttributeValue::Int(_) => 1,
            AttributeValue::Double(_) => 2,
            AttributeValue::Bool(_) => 3,
            AttributeValue::Bytes(_) => 4,
            AttributeValue::List(_) => 5,
            AttributeValue::Map(_) => 6,
        }
    }
    match (a, b) {
        (AttributeValue::Str(x), AttributeValue::Str(y)) => x.cmp(y),
        (AttributeValue::Int(x), AttributeValue::Int(y)) => x.cmp(y),
        (AttributeValue::Double(x), AttributeValue::Double(y)) => {
            x.partial_cmp(y).unwrap_or(Ordering::Equal)
        }
        (AttributeValue::Bool(x), AttributeValue::Bool(y)) => x.cmp(y),
        (AttributeValue::Bytes(x), AttributeValue::Bytes(y)) => x.cmp(y),
        _ => tag(a).cmp(&tag(b)),
    }
}
