// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Dictionary manager.
//!
//! One [`DictionaryManager`] instance is owned per dictionary-tagged
//! column. It is generic over the dictionary *value* type (`String` for
//! key/string-value columns, `Vec<u8>` for the bytes/cbor legs) so the same
//! promotion/reset policy code serves every dictionary-encoded field.

use crate::schema::field::IndexWidth;
use ahash::AHashMap;
use std::hash::Hash;

/// The outcome of appending one value to a [`DictionaryManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DictionaryEvent {
    /// The value was appended without any structural change.
    Appended,
    /// The dictionary's index width was promoted to fit the new value.
    Upgraded {
        /// Index width before the promotion.
        from: IndexWidth,
        /// Index width after the promotion.
        to: IndexWidth,
    },
    /// The dictionary could not be widened further and fell back to plain encoding.
    Overflowed,
}

/// Per-field dictionary state: index width, distinct values, and counters
/// driving the promotion/reset policy.
#[derive(Debug)]
pub struct DictionaryManager<V>
where
    V: Eq + Hash + Clone,
{
    width: IndexWidth,
    limit: IndexWidth,
    values: AHashMap<V, u64>,
    total_count: u64,
    /// `true` once the widest allowed index has overflowed; the field now
    /// encodes in plain (non-dictionary) form until the next `reset`.
    overflowed: bool,
    reset_threshold: f64,
    reset_min_samples: u64,
}

impl<V> DictionaryManager<V>
where
    V: Eq + Hash + Clone,
{
    /// Creates a manager starting at `initial_width`, never promoting past `limit`.
    #[must_use]
    pub fn new(initial_width: IndexWidth, limit: IndexWidth, reset_threshold: f64, reset_min_samples: u64) -> Self {
        DictionaryManager {
            width: initial_width,
            limit,
            values: AHashMap::new(),
            total_count: 0,
            overflowed: false,
            reset_threshold,
            reset_min_samples,
        }
    }

    /// Current dictionary index width.
    #[must_use]
    pub fn width(&self) -> IndexWidth {
        self.width
    }

    /// Has this dictionary overflowed to plain encoding?
    #[must_use]
    pub fn is_overflowed(&self) -> bool {
        self.overflowed
    }

    /// Number of distinct values seen since the last reset.
    #[must_use]
    pub fn distinct_count(&self) -> usize {
        self.values.len()
    }

    /// Total number of values appended since the last reset.
    #[must_use]
    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    /// Records one append of `value`, returning its dictionary index (stable
    /// only until the next `reset`) and the structural event, if any.
    ///
    /// When already overflowed, no index is produced: the caller must write
    /// the value in plain form.
    pub fn record(&mut self, value: &V) -> (Option<u32>, DictionaryEvent) {
        self.total_count += 1;

        if self.overflowed {
            return (None, DictionaryEvent::Appended);
        }

        let next_index = self.values.len() as u32;
        let is_new = !self.values.contains_key(value);
        let index = *self
            .values
            .entry(value.clone())
            .or_insert(u64::from(next_index)) as u32;

        if !is_new {
            return (Some(index), DictionaryEvent::Appended);
        }

        if self.values.len() <= self.width.max_distinct() {
            return (Some(index), DictionaryEvent::Appended);
        }

        // Just grew past the current width's capacity: promote or overflow.
        match self.width.promote() {
            Some(next_width) if next_width <= self.limit => {
                let from = self.width;
                self.width = next_width;
                (Some(index), DictionaryEvent::Upgraded { from, to: next_width })
            }
            _ => {
                self.overflowed = true;
                (None, DictionaryEvent::Overflowed)
            }
        }
    }

    /// Evaluates the reset policy: when the distinct/total ratio
    /// exceeds `reset_threshold` and `total_count >= reset_min_samples`,
    /// the caller should clear this dictionary at the next record boundary.
    #[must_use]
    pub fn should_reset(&self) -> bool {
        self.total_count >= self.reset_min_samples
            && (self.values.len() as f64) / (self.total_count as f64) > self.reset_threshold
    }

    /// Clears all dictionary entries and counters, keeping the current
    /// index width and overflow state (a reset narrows cardinality, it does
    /// not by itself demote the index width or un-overflow the field).
    pub fn reset(&mut self) {
        self.values.clear();
        self.total_count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn promotes_at_capacity_boundary() {
        let mut mgr: DictionaryManager<u32> =
            DictionaryManager::new(IndexWidth::U8, IndexWidth::U16, 0.3, 100);
        for i in 0..256u32 {
            let (_, event) = mgr.record(&i);
            if i < 255 {
                assert_eq!(event, DictionaryEvent::Appended, "value {i}");
            } else {
                assert_eq!(
                    event,
                    DictionaryEvent::Upgraded {
                        from: IndexWidth::U8,
                        to: IndexWidth::U16
                    }
                );
            }
        }
        assert_eq!(mgr.width(), IndexWidth::U16);
    }

    #[test]
    fn overflows_past_limit() {
        let mut mgr: DictionaryManager<u32> =
            DictionaryManager::new(IndexWidth::U8, IndexWidth::U8, 0.3, 100);
        for i in 0..255u32 {
            let (idx, _) = mgr.record(&i);
            assert!(idx.is_some());
        }
        let (idx, event) = mgr.record(&999);
        assert_eq!(event, DictionaryEvent::Overflowed);
        assert!(idx.is_none());
        assert!(mgr.is_overflowed());
    }

    #[test]
    fn reset_policy_respects_min_samples_and_threshold() {
        let mut mgr: DictionaryManager<u32> =
            DictionaryManager::new(IndexWidth::U16, IndexWidth::U16, 0.3, 10);
        for i in 0..5u32 {
            let _ = mgr.record(&i);
        }
        assert!(!mgr.should_reset(), "below min_samples");
        for i in 5..20u32 {
            let _ = mgr.record(&i);
        }
        assert!(mgr.should_reset(), "20 distinct / 20 total exceeds 0.3");
        mgr.reset();
        assert_eq!(mgr.total_count(), 0);
        assert_eq!(mgr.distinct_count(), 0);
        assert!(!mgr.should_reset());
    }
}
