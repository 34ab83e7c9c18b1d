// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! The schema descriptor and transform tree.

use arrow::datatypes::{DataType, Field};

/// A dictionary index width, the concrete type `DictionaryArray<K>` is keyed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum IndexWidth {
    /// 8-bit dictionary index (up to 255 distinct values).
    U8,
    /// 16-bit dictionary index (up to 65535 distinct values).
    U16,
}

impl IndexWidth {
    /// The Arrow key type for this width.
    #[must_use]
    pub const fn key_type(self) -> DataType {
        match self {
            IndexWidth::U8 => DataType::UInt8,
            IndexWidth::U16 => DataType::UInt16,
        }
    }

    /// The maximum number of distinct dictionary values this width can index.
    #[must_use]
    pub const fn max_distinct(self) -> usize {
        match self {
            IndexWidth::U8 => u8::MAX as usize,
            IndexWidth::U16 => u16::MAX as usize,
        }
    }

    /// The next wider index, if any.
    #[must_use]
    pub const fn promote(self) -> Option<IndexWidth> {
        match self {
            IndexWidth::U8 => Some(IndexWidth::U16),
            IndexWidth::U16 => None,
        }
    }
}

/// Declarative, per-field metadata tags.
#[derive(Debug, Clone)]
pub struct FieldMeta {
    /// The field's name within its parent record or struct.
    pub name: &'static str,
    /// The field's value type before any dictionary wrapping is applied.
    pub value_type: DataType,
    /// May the column be absent entirely until first non-default data arrives?
    pub optional: bool,
    /// Initial dictionary index width, if this field is dictionary-encoded.
    pub dictionary: Option<IndexWidth>,
    /// Maximum allowed consecutive delta for a monotone integer column
    /// (`Some(0)` is nonsensical and never constructed; `None` means the
    /// column is not delta-encoded at all).
    pub max_delta: Option<u64>,
}

impl FieldMeta {
    /// A plain, always-present, non-dictionary field.
    #[must_use]
    pub const fn identity(name: &'static str, value_type: DataType) -> Self {
        FieldMeta {
            name,
            value_type,
            optional: false,
            dictionary: None,
            max_delta: None,
        }
    }

    /// An optional field that blooms in lazily.
    #[must_use]
    pub const fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// A dictionary-encoded field with the given starting index width.
    #[must_use]
    pub const fn dictionary(mut self, width: IndexWidth) -> Self {
        self.dictionary = Some(width);
        self
    }

    /// A delta-encoded monotone integer field with the given max per-row delta.
    #[must_use]
    pub const fn delta(mut self, max_delta: u64) -> Self {
        self.max_delta = Some(max_delta);
        self
    }
}

/// The effective per-field transform, initially derived from [`FieldMeta`]
/// and mutated in place as data is observed.
#[derive(Debug, Clone, PartialEq)]
pub enum Transform {
    /// The column is suppressed: it will not appear in the next built record.
    NoField,
    /// The column passes through as its natural (possibly delta) type.
    Identity,
    /// The column is dictionary-encoded at the given index width.
    Dictionary(IndexWidth),
}

/// One node of the transform tree, mirroring the schema.
///
/// Struct-typed fields (e.g. `status`) carry `children`; every other field
/// has an empty `children` vec.
#[derive(Debug, Clone)]
pub struct FieldNode {
    /// This field's metadata.
    pub meta: FieldMeta,
    /// The field's current transform.
    pub transform: Transform,
    /// Child fields, non-empty only for struct-typed columns.
    pub children: Vec<FieldNode>,
}

impl FieldNode {
    /// Builds a leaf field node from its metadata.
    #[must_use]
    pub fn leaf(meta: FieldMeta) -> Self {
        let transform = if meta.optional {
            Transform::NoField
        } else if let Some(width) = meta.dictionary {
            Transform::Dictionary(width)
        } else {
            Transform::Identity
        };
        FieldNode {
            meta,
            transform,
            children: Vec::new(),
        }
    }

    /// Builds a struct field node with the given children.
    #[must_use]
    pub fn with_children(meta: FieldMeta, children: Vec<FieldNode>) -> Self {
        let mut node = FieldNode::leaf(meta);
        node.children = children;
        node
    }

    /// Is this node currently suppressed?
    #[must_use]
    pub fn is_suppressed(&self) -> bool {
        matches!(self.transform, Transform::NoField)
    }

    /// Called when non-default data arrives for a currently-suppressed
    /// field. This does NOT mutate the in-flight batch; the caller must
    /// retry the whole attempt against the now-updated tree.
    pub fn request_unsuppress(&mut self) {
        if matches!(self.transform, Transform::NoField) {
            self.transform = if let Some(width) = self.meta.dictionary {
                Transform::Dictionary(width)
            } else {
                Transform::Identity
            };
        }
    }

    /// Promotes this node's dictionary index width, if it is dictionary-encoded.
    /// Returns the previous width if a promotion happened.
    pub fn promote_dictionary(&mut self, new_width: IndexWidth) -> Option<IndexWidth> {
        match self.transform {
            Transform::Dictionary(old) if old != new_width => {
                self.transform = Transform::Dictionary(new_width);
                Some(old)
            }
            _ => None,
        }
    }

    /// Falls this node back to plain (non-dictionary) encoding after the
    /// widest allowed index overflows.
    pub fn overflow_to_plain(&mut self) {
        if matches!(self.transform, Transform::Dictionary(_)) {
            self.transform = Transform::Identity;
        }
    }

    /// The effective Arrow field for this node, or `None` if it is currently suppressed.
    #[must_use]
    pub fn effective_field(&self) -> Option<Field> {
        if matches!(self.transform, Transform::NoField) {
            return None;
        }
        let data_type = self.effective_data_type();
        Some(Field::new(self.meta.name, data_type, self.meta.optional))
    }

    fn effective_data_type(&self) -> DataType {
        if !self.children.is_empty() {
            let fields: Vec<Field> = self
                .children
                .iter()
                .filter_map(FieldNode::effective_field)
                .collect();
            return DataType::Struct(fields.into());
        }
        match self.transform {
            // The physical dictionary key is always 16-bit, matching
            // `ColumnValues::finish` and `AttributeAccumulator::build`: the
            // logical `IndexWidth` only ever drives promotion/overflow
            // bookkeeping, never the builder's physical key type.
            Transform::Dictionary(_) => DataType::Dictionary(
                Box::new(DataType::UInt16),
                Box::new(self.meta.value_type.clone()),
            ),
            _ => self.meta.value_type.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_field_starts_suppressed_and_blooms() {
        let mut node = FieldNode::leaf(FieldMeta::identity("status", DataType::Utf8).optional());
        assert!(node.is_suppressed());
        assert!(node.effective_field().is_none());

        node.request_unsuppress();
        assert!(!node.is_suppressed());
        assert!(node.effective_field().is_some());
    }

    #[test]
    fn dictionary_promotion_reports_previous_width_once() {
        let mut node = FieldNode::leaf(
            FieldMeta::identity("name", DataType::Utf8).dictionary(IndexWidth::U8),
        );
        assert_eq!(node.promote_dictionary(IndexWidth::U16), Some(IndexWidth::U8));
        // Promoting to the same width again is a no-op.
        assert_eq!(node.promote_dictionary(IndexWidth::U16), None);
    }

    #[test]
    fn struct_field_recurses_into_children() {
        let code = FieldNode::leaf(FieldMeta::identity("code", DataType::Int32));
        let message =
            FieldNode::leaf(FieldMeta::identity("message", DataType::Utf8).optional());
        let status = FieldNode::with_children(
            FieldMeta::identity("status", DataType::Null).optional(),
            vec![code, message],
        );
        assert!(status.is_suppressed());

        let mut status = status;
        status.request_unsuppress();
        let field = status.effective_field().expect("status should now appear");
        match field.data_type() {
            DataType::Struct(fields) => assert_eq!(fields.len(), 1, "message is still suppressed"),
            other => panic!("expected struct, got {other:?}"),
        }
    }
}
