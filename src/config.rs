// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Producer configuration surface.

use crate::compression::CompressionKind;
use crate::observer::{NoopObserver, StatsObserver};
use crate::schema::field::IndexWidth;
use std::sync::Arc;

/// Upper bound on the dictionary index width the producer will use before
/// falling back to plain (non-dictionary) encoding, see [`crate::dictionary`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum IndexSizeLimit {
    /// Never promote dictionaries past an 8-bit index.
    U8,
    /// Allow promotion up to a 16-bit index before falling back to plain encoding (default).
    #[default]
    U16,
}

impl IndexSizeLimit {
    /// The maximum number of distinct dictionary values this limit allows.
    #[must_use]
    pub const fn max_distinct(self) -> usize {
        match self {
            IndexSizeLimit::U8 => u8::MAX as usize,
            IndexSizeLimit::U16 => u16::MAX as usize,
        }
    }

    /// The [`IndexWidth`] a [`crate::dictionary::DictionaryManager`] should
    /// treat as its promotion ceiling.
    #[must_use]
    pub const fn as_index_width(self) -> IndexWidth {
        match self {
            IndexSizeLimit::U8 => IndexWidth::U8,
            IndexSizeLimit::U16 => IndexWidth::U16,
        }
    }
}

/// Hints a pluggable allocator can use to pre-size builder buffers.
///
/// This models a pluggable allocator that owns the Arrow buffer arenas, with
/// the core taking it as a construction parameter. Rust's allocator
/// customization point (the unstable `Allocator` trait) is not used here
/// since it is not on stable; instead the allocator is modeled as a
/// capacity-planning collaborator the builders consult before their first
/// append of a batch, with a trivial default that reserves nothing extra.
pub trait BatchAllocator: Send + Sync {
    /// Called once per builder at the start of a batch with the expected
    /// row count, if known; implementations may use this to pre-reserve
    /// column buffer capacity.
    fn reserve_hint(&self, expected_rows: usize) -> usize {
        expected_rows
    }
}

/// The default allocator: reserves exactly the hinted row count, i.e. no
/// additional slack beyond what the caller already told us to expect.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemAllocator;

impl BatchAllocator for SystemAllocator {}

/// Construction-time configuration for a [`crate::producer::TracesProducer`].
#[derive(Clone)]
pub struct ProducerConfig {
    /// Compression algorithm advertised to the transport. The
    /// producer core does not itself compress Arrow IPC bytes -- that is
    /// the external writer's job -- but it threads the chosen codec through
    /// so callers can obtain a matching [`crate::compression::Compressor`].
    pub compression: CompressionKind,
    /// When `true`, callbacks are fired on every observable schema/dictionary
    /// transition. When `false`, an observer may still be set but
    /// [`crate::producer::TracesProducer`] will not pay the cost of
    /// formatting event payloads that are never read.
    pub stats: bool,
    /// When `true` (default), spans within a `ScopeSpans` group are
    /// stable-sorted by `(trace_id, start_timestamp)` before encoding.
    pub sort: bool,
    /// Distinct/total ratio above which a dictionary is reset at the next
    /// record boundary. Must be in `[0, 1]`.
    pub dict_reset_threshold: f64,
    /// Minimum total append count before the reset policy is evaluated.
    pub dict_reset_min_samples: u64,
    /// Maximum dictionary index width before falling back to plain encoding.
    pub limit_index_size: IndexSizeLimit,
    /// Bound on consecutive `SchemaNotUpToDate` retries per `build_batch` call.
    pub max_schema_retries: u8,
    /// Allocator collaborator.
    pub allocator: Arc<dyn BatchAllocator>,
    /// Optional statistics observer.
    pub observer: Arc<dyn StatsObserver>,
}

impl std::fmt::Debug for ProducerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProducerConfig")
            .field("compression", &self.compression)
            .field("stats", &self.stats)
            .field("sort", &self.sort)
            .field("dict_reset_threshold", &self.dict_reset_threshold)
            .field("dict_reset_min_samples", &self.dict_reset_min_samples)
            .field("limit_index_size", &self.limit_index_size)
            .field("max_schema_retries", &self.max_schema_retries)
            .finish_non_exhaustive()
    }
}

impl Default for ProducerConfig {
    fn default() -> Self {
        ProducerConfig {
            compression: CompressionKind::None,
            stats: false,
            sort: true,
            dict_reset_threshold: 0.3,
            dict_reset_min_samples: 100,
            limit_index_size: IndexSizeLimit::U16,
            max_schema_retries: 5,
            allocator: Arc::new(SystemAllocator),
            observer: Arc::new(NoopObserver),
        }
    }
}
