// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Adaptive record assembly: turns accumulated column values plus a
//! record's transform tree into a finished Arrow `RecordBatch`.

pub mod column;
pub mod record;

pub use column::ColumnValues;
pub use record::AdaptiveRecordBuilder;
