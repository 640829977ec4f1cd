//! Computed table for BDD operation memoization.
//!
//! A direct-mapped table of `2^bits` slots: a new result evicts whatever was
//! stored in its slot. Each slot keeps the full key, so a lookup never returns
//! the result of a colliding key.

use crate::utils::MyHash;

struct Entry<K, V> {
    key: K,
    value: V,
}

pub struct Cache<K, V> {
    data: Vec<Option<Entry<K, V>>>,
    bitmask: u64,
    len: usize,
    hits: usize,
    misses: usize,
}

impl<K, V> Default for Cache<K, V> {
    fn default() -> Self {
        Self::new(14)
    }
}

impl<K, V> Cache<K, V> {
    /// Create a new table of size `2^bits`.
    pub fn new(bits: usize) -> Self {
        assert!(bits <= 31, "Bits should be in the range 0..=31");

        let size = 1usize << bits;
        let bitmask = (size - 1) as u64;

        Self {
            data: std::iter::repeat_with(|| None).take(size).collect(),
            bitmask,
            len: 0,
            hits: 0,
            misses: 0,
        }
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Get the number of cache hits.
    pub fn hits(&self) -> usize {
        self.hits
    }

    /// Get the number of cache misses.
    pub fn misses(&self) -> usize {
        self.misses
    }

    fn index(&self, hash: u64) -> usize {
        (hash & self.bitmask) as usize
    }
}

impl<K, V> Cache<K, V>
where
    K: MyHash + Eq,
    V: Copy,
{
    /// Get the cached result.
    pub fn get(&mut self, key: &K) -> Option<V> {
        let index = self.index(key.hash());
        match &self.data[index] {
            Some(entry) if entry.key == *key => {
                self.hits += 1;
                Some(entry.value)
            }
            _ => {
                self.misses += 1;
                None
            }
        }
    }

    /// Insert a result into the cache, replacing the previous occupant of its slot.
    pub fn insert(&mut self, key: K, value: V) {
        let index = self.index(key.hash());
        if self.data[index].is_none() {
            self.len += 1;
        }
        self.data[index] = Some(Entry { key, value });
    }
}
