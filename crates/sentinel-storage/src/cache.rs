use indexmap::IndexMap;

/// Snapshot of hit/miss counters for a validation cache.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub size: usize,
}

impl CacheStats {
    pub fn hit_rate_percent(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            100.0 * self.hits as f64 / total as f64
        }
    }
}

/// Bounded, single-writer, insertion-ordered cache mapping a signature
/// fingerprint to a cached validation verdict. Eviction is strictly
/// oldest-insertion-first, not LRU — upgrading to LRU would silently
/// change hit-rate behavior that callers rely on being stable.
pub struct ValidationCache {
    entries: IndexMap<u64, bool>,
    max_size: usize,
    hits: u64,
    misses: u64,
}

impl ValidationCache {
    pub fn new(max_size: usize) -> Self {
        Self {
            entries: IndexMap::with_capacity(max_size),
            max_size,
            hits: 0,
            misses: 0,
        }
    }

    /// Looks up `fingerprint`, recording a hit or miss. Does not mutate the
    /// cache contents on a miss; callers insert the freshly-computed
    /// verdict with `put` afterward.
    pub fn get(&mut self, fingerprint: u64) -> Option<bool> {
        match self.entries.get(&fingerprint).copied() {
            Some(v) => {
                self.hits += 1;
                Some(v)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Inserts `verdict` under `fingerprint`, evicting the oldest entry
    /// first if the cache is already at capacity.
    pub fn put(&mut self, fingerprint: u64, verdict: bool) {
        if !self.entries.contains_key(&fingerprint) && self.entries.len() >= self.max_size {
            self.entries.shift_remove_index(0);
        }
        self.entries.insert(fingerprint, verdict);
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            size: self.entries.len(),
        }
    }

    /// Clears all entries, e.g. when the detector they were validated
    /// against has since been retrained. Hit/miss counters are left intact
    /// since they describe cumulative cache behavior, not current contents.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn miss_then_hit_increments_counters_correctly() {
        let mut cache = ValidationCache::new(100);
        assert_eq!(cache.get(1), None);
        cache.put(1, true);
        assert_eq!(cache.get(1), Some(true));
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn capacity_is_enforced_with_oldest_first_eviction() {
        let mut cache = ValidationCache::new(2);
        cache.put(1, true);
        cache.put(2, false);
        cache.put(3, true);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(1), None); // evicted, counts as a fresh miss
        assert!(cache.get(2).is_some());
        assert!(cache.get(3).is_some());
    }

    #[test]
    fn hit_rate_percent_is_zero_with_no_activity() {
        let cache = ValidationCache::new(10);
        assert_eq!(cache.stats().hit_rate_percent(), 0.0);
    }

    #[test]
    fn clear_empties_entries_but_keeps_counters() {
        let mut cache = ValidationCache::new(10);
        cache.put(1, true);
        let _ = cache.get(1);
        cache.clear();
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn cache_bound_holds_for_101_distinct_fingerprints() {
        let mut cache = ValidationCache::new(100);
        for i in 0..101u64 {
            cache.put(i, i % 2 == 0);
        }
        assert_eq!(cache.len(), 100);
        assert_eq!(cache.get(0), None); // the very first insertion was evicted
    }
}
