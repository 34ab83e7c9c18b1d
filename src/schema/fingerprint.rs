// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Schema fingerprinting.
//!
//! The transport associates sub-streams with their schema via this id; it
//! must be stable across two schemas with the same effective shape and
//! must change whenever a field is added, removed, or re-typed.

use arrow::datatypes::{DataType, Field, Fields};
use std::fmt::Write as _;
use std::hash::BuildHasher as _;

/// Computes a stable fingerprint for an Arrow schema, suitable for use as
/// the `schema_id` in a [`crate::payload::ArrowPayload`].
///
/// Fields are sorted by name at every level (struct children included) so
/// that two schemas differing only in declaration order still fingerprint
/// identically -- declaration order is an implementation detail, not part
/// of the schema's observable shape.
#[must_use]
pub fn fingerprint(fields: &[Field]) -> String {
    let mut sorted: Vec<&Field> = fields.iter().collect();
    sorted.sort_by(|a, b| a.name().cmp(b.name()));

    let mut out = String::new();
    for field in sorted {
        write_field(&mut out, field);
        out.push(';');
    }
    format!("{:016x}", ahash::RandomState::with_seeds(0, 0, 0, 0).hash_one(&out))
}

fn write_field(out: &mut String, field: &Field) {
    let _ = write!(out, "{}:{}", field.name(), normalized_type(field.data_type()));
    if field.is_nullable() {
        out.push('?');
    }
}

/// Renders a [`DataType`] into a canonical string, recursing into struct
/// fields (sorted) and list/dictionary element types.
fn normalized_type(data_type: &DataType) -> String {
    match data_type {
        DataType::Dictionary(key, value) => {
            format!("dict<{},{}>", normalized_type(key), normalized_type(value))
        }
        DataType::Struct(fields) => {
            let mut inner = String::from("struct<");
            let mut sorted: Vec<&Field> = fields.iter().map(AsRef::as_ref).collect();
            sorted.sort_by(|a, b| a.name().cmp(b.name()));
            for (i, field) in sorted.iter().enumerate() {
                if i > 0 {
                    inner.push(',');
                }
                write_field(&mut inner, field);
            }
            inner.push('>');
            inner
        }
        DataType::List(field) => format!("list<{}>", normalized_type(field.data_type())),
        DataType::Union(fields, mode) => {
            let mut inner = format!("union<{mode:?},");
            for (i, (type_id, field)) in fields.iter().enumerate() {
                if i > 0 {
                    inner.push(',');
                }
                let _ = write!(inner, "{type_id}:{}", normalized_type(field.data_type()));
            }
            inner.push('>');
            inner
        }
        other => format!("{other:?}"),
    }
}

/// Convenience wrapper accepting an Arrow [`Fields`] collection.
#[must_use]
pub fn fingerprint_fields(fields: &Fields) -> String {
    let owned: Vec<Field> = fields.iter().map(|f| f.as_ref().clone()).collect();
    fingerprint(&owned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::datatypes::DataType;

    #[test]
    fn fingerprint_is_order_independent() {
        let a = vec![
            Field::new("a", DataType::Utf8, true),
            Field::new("b", DataType::Int64, false),
        ];
        let b = vec![
            Field::new("b", DataType::Int64, false),
            Field::new("a", DataType::Utf8, true),
        ];
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn fingerprint_changes_with_type() {
        let a = vec![Field::new("a", DataType::Utf8, true)];
        let b = vec![Field::new("a", DataType::Int64, true)];
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }
}
