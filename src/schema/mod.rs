// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Schema descriptor and transform tree.

pub mod consts;
pub mod field;
pub mod fingerprint;
pub mod records;

pub use field::{FieldMeta, FieldNode, IndexWidth, Transform};
