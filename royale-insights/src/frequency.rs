//! Multiset counting with deterministic ordering.
//!
//! [`FrequencyCounter`] keeps keys in first-insertion order, and
//! [`FrequencyCounter::most_common`] sorts stably by descending count, so
//! ties are always resolved in favour of the value seen first. Every ranking
//! in the reports goes through this type.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::hash::Hash;

/// A counted multiset that remembers first-seen order.
#[derive(Debug, Clone)]
pub struct FrequencyCounter<K> {
    index: HashMap<K, usize>,
    entries: Vec<(K, u64)>,
    total: u64,
}

impl<K> Default for FrequencyCounter<K> {
    fn default() -> Self {
        Self {
            index: HashMap::new(),
            entries: Vec::new(),
            total: 0,
        }
    }
}

impl<K: Eq + Hash + Clone> FrequencyCounter<K> {
    /// Creates an empty counter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one occurrence of `key`.
    pub fn add(&mut self, key: K) {
        self.total += 1;
        match self.index.get(&key) {
            Some(&slot) => self.entries[slot].1 += 1,
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, 1));
            }
        }
    }

    /// Total number of occurrences recorded.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Number of distinct keys.
    pub fn distinct(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Occurrence count of `key` (0 when absent).
    pub fn count(&self, key: &K) -> u64 {
        self.index
            .get(key)
            .map(|&slot| self.entries[slot].1)
            .unwrap_or(0)
    }

    /// Iterates over `(key, count)` in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, u64)> {
        self.entries.iter().map(|(k, c)| (k, *c))
    }

    /// The `n` most frequent keys, ties broken by first-seen order.
    pub fn most_common(&self, n: usize) -> Vec<(K, u64)> {
        let mut ranked: Vec<&(K, u64)> = self.entries.iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked
            .into_iter()
            .take(n)
            .map(|(k, c)| (k.clone(), *c))
            .collect()
    }
}

impl<K: Eq + Hash + Clone> Extend<K> for FrequencyCounter<K> {
    fn extend<I: IntoIterator<Item = K>>(&mut self, iter: I) {
        for key in iter {
            self.add(key);
        }
    }
}

impl<K: Eq + Hash + Clone> FromIterator<K> for FrequencyCounter<K> {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let mut counter = Self::new();
        counter.extend(iter);
        counter
    }
}

/// A value and how often it occurred.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueCount<V> {
    pub value: V,
    pub count: u64,
}

/// Share of `count` in `total` as a percentage rounded to two decimals.
///
/// Returns 0 when `total` is 0.
pub fn percentage(count: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        round2(count as f64 / total as f64 * 100.0)
    }
}

/// Rounds to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
