// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Adaptive record assembly: ties a record's [`FieldNode`] transform tree to
//! the concrete [`crate::builder::column::ColumnValues`] columns being
//! accumulated for one `build_batch` call.
//!
//! A record is built in a single forward pass over its rows. If appending a
//! row causes a field to bloom (an optional field sees its first non-default
//! value) or a dictionary to promote or overflow, the columns already
//! accumulated this attempt were built under the schema's old shape and are
//! no longer valid: the caller must discard them and re-run the pass from
//! the first row. [`SchemaNotUpToDate`] is the internal signal for that --
//! it is not part of [`crate::error::Error`] because it is always caught
//! and retried, never surfaced to [`crate::producer::TracesProducer`]'s
//! caller directly (a [`crate::error::Error::SchemaFlap`] is raised only
//! once the retry budget is exhausted).

use crate::builder::column::ColumnValues;
use crate::dictionary::DictionaryEvent;
use crate::schema::field::FieldNode;
use arrow::array::{ArrayRef, RecordBatch};
use arrow::datatypes::{Field, Schema};
use std::sync::Arc;

/// Internal signal that the schema changed shape mid-build and this
/// attempt must be retried from scratch against the updated tree.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SchemaNotUpToDate;

/// Drives one record's worth of adaptive schema bookkeeping across a single
/// `build_batch` attempt.
pub struct AdaptiveRecordBuilder {
    fields: Vec<FieldNode>,
}

impl AdaptiveRecordBuilder {
    /// Wraps an existing transform tree (owned across batches by the
    /// record's collaborator in [`crate::related`]).
    #[must_use]
    pub fn new(fields: Vec<FieldNode>) -> Self {
        AdaptiveRecordBuilder { fields }
    }

    /// Borrows the transform tree, e.g. to hand a leaf's current
    /// [`crate::schema::field::Transform`] to [`ColumnValues::finish`].
    #[must_use]
    pub fn fields(&self) -> &[FieldNode] {
        &self.fields
    }

    fn field_mut(&mut self, name: &str) -> &mut FieldNode {
        if let Some(idx) = self.fields.iter().position(|f| f.meta.name == name) {
            return &mut self.fields[idx];
        }
        for f in &mut self.fields {
            if let Some(idx) = f.children.iter().position(|c| c.meta.name == name) {
                return &mut f.children[idx];
            }
        }
        panic!("unknown field `{name}` in record schema")
    }

    fn field(&self, name: &str) -> &FieldNode {
        if let Some(f) = self.fields.iter().find(|f| f.meta.name == name) {
            return f;
        }
        for f in &self.fields {
            if let Some(c) = f.children.iter().find(|c| c.meta.name == name) {
                return c;
            }
        }
        panic!("unknown field `{name}` in record schema")
    }

    /// Call once per optional top-level field, per row, with whether that
    /// row carried a non-default value. Returns `Err` the first time a
    /// suppressed field is asked to bloom.
    pub(crate) fn observe_optional(
        &mut self,
        name: &str,
        has_value: bool,
    ) -> Result<(), SchemaNotUpToDate> {
        let node = self.field_mut(name);
        if has_value && node.is_suppressed() {
            node.request_unsuppress();
            return Err(SchemaNotUpToDate);
        }
        Ok(())
    }

    /// Call with the [`DictionaryEvent`] from the column's
    /// [`crate::dictionary::DictionaryManager`] after each append.
    pub(crate) fn observe_dictionary(
        &mut self,
        name: &str,
        event: DictionaryEvent,
    ) -> Result<(), SchemaNotUpToDate> {
        let node = self.field_mut(name);
        match event {
            DictionaryEvent::Appended => Ok(()),
            DictionaryEvent::Upgraded { to, .. } => {
                node.promote_dictionary(to);
                Err(SchemaNotUpToDate)
            }
            DictionaryEvent::Overflowed => {
                node.overflow_to_plain();
                Err(SchemaNotUpToDate)
            }
        }
    }

    /// Finishes one top-level leaf column, returning `None` if it is
    /// currently suppressed (and so must be omitted from the record
    /// entirely).
    pub(crate) fn finish_leaf(
        &self,
        name: &str,
        values: ColumnValues,
    ) -> crate::error::Result<Option<(Field, ArrayRef)>> {
        let node = self.field(name);
        let Some(field) = node.effective_field() else {
            return Ok(None);
        };
        let array = values.finish(&node.transform)?;
        Ok(Some((field, array)))
    }

    /// Finishes a struct-typed top-level field (only `status` in this
    /// crate) from its children's accumulated columns and a per-row
    /// presence bitmap. Returns `None` if the struct itself is suppressed.
    pub(crate) fn finish_struct(
        &self,
        parent_name: &str,
        presence: &[bool],
        children: Vec<(&str, ColumnValues)>,
    ) -> crate::error::Result<Option<(Field, ArrayRef)>> {
        let parent = self.field(parent_name);
        if parent.is_suppressed() {
            return Ok(None);
        }
        let mut child_fields = Vec::with_capacity(children.len());
        let mut child_arrays = Vec::with_capacity(children.len());
        for (name, values) in children {
            if let Some((field, array)) = self.finish_leaf(name, values)? {
                child_fields.push(field);
                child_arrays.push(array);
            }
        }
        let nulls = arrow::buffer::NullBuffer::from(presence.to_vec());
        let array = arrow::array::StructArray::try_new(child_fields.into(), child_arrays, Some(nulls))?;
        let field = Field::new(
            parent_name,
            arrow::datatypes::DataType::Struct(array.fields().clone()),
            true,
        );
        Ok(Some((field, Arc::new(array))))
    }

    /// Assembles the final `RecordBatch` from finished `(Field, ArrayRef)`
    /// columns, in declaration order.
    pub(crate) fn assemble(columns: Vec<(Field, ArrayRef)>) -> crate::error::Result<RecordBatch> {
        let fields: Vec<Field> = columns.iter().map(|(f, _)| f.clone()).collect();
        let arrays: Vec<ArrayRef> = columns.into_iter().map(|(_, a)| a).collect();
        let schema = Arc::new(Schema::new(fields));
        Ok(RecordBatch::try_new(schema, arrays)?)
    }
}
