use parking_lot::RwLock;
use std::collections::HashMap;
use std::hash::Hash;

use crate::fees::FeeStructure;
use crate::types::AcademicPeriod;

/// generation of a cache key, captured before a store read so the result
/// can be discarded if the key was invalidated while the read was in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheGeneration {
    epoch: u64,
    key: u64,
}

struct Entries<K, V> {
    values: HashMap<K, V>,
    generations: HashMap<K, u64>,
    /// bumped by `clear`
    epoch: u64,
}

impl<K: Eq + Hash, V> Entries<K, V> {
    fn generation(&self, key: &K) -> CacheGeneration {
        CacheGeneration {
            epoch: self.epoch,
            key: self.generations.get(key).copied().unwrap_or(0),
        }
    }
}

/// keyed in-memory cache with no expiry; entries live until invalidated.
///
/// Advisory only: callers that move money must read through to the store.
/// Invalidations and unconditional writes advance a per-key generation;
/// `set_if_current` writes only while the generation a reader captured is
/// still current.
pub struct AdvisoryCache<K, V> {
    name: &'static str,
    enabled: bool,
    entries: RwLock<Entries<K, V>>,
}

impl<K, V> AdvisoryCache<K, V>
where
    K: Eq + Hash + Clone + std::fmt::Debug,
    V: Clone,
{
    pub fn new(name: &'static str, enabled: bool) -> Self {
        Self {
            name,
            enabled,
            entries: RwLock::new(Entries {
                values: HashMap::new(),
                generations: HashMap::new(),
                epoch: 0,
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn get(&self, key: &K) -> Option<V> {
        if !self.enabled {
            return None;
        }
        self.entries.read().values.get(key).cloned()
    }

    /// capture before reading the backing store
    pub fn generation(&self, key: &K) -> CacheGeneration {
        self.entries.read().generation(key)
    }

    /// write a value read fresh from the store; beats any read still in flight
    pub fn set(&self, key: K, value: V) {
        if !self.enabled {
            return;
        }
        let mut entries = self.entries.write();
        *entries.generations.entry(key.clone()).or_insert(0) += 1;
        entries.values.insert(key, value);
    }

    /// write `value` only if nothing touched `key` since `seen` was captured
    pub fn set_if_current(&self, key: K, value: V, seen: CacheGeneration) -> bool {
        if !self.enabled {
            return false;
        }
        let mut entries = self.entries.write();
        if entries.generation(&key) != seen {
            tracing::debug!(cache = self.name, key = ?key, "stale read not cached");
            return false;
        }
        entries.values.insert(key, value);
        true
    }

    /// mutate the entry for `key` in place, creating it first if needed, as
    /// long as `seen` is still current
    pub fn update_if_current<F>(&self, key: K, seen: CacheGeneration, f: F) -> bool
    where
        V: Default,
        F: FnOnce(&mut V),
    {
        if !self.enabled {
            return false;
        }
        let mut entries = self.entries.write();
        if entries.generation(&key) != seen {
            tracing::debug!(cache = self.name, key = ?key, "stale read not cached");
            return false;
        }
        f(entries.values.entry(key).or_default());
        true
    }

    /// returns true if an entry was dropped
    pub fn invalidate(&self, key: &K) -> bool {
        if !self.enabled {
            return false;
        }
        let mut entries = self.entries.write();
        *entries.generations.entry(key.clone()).or_insert(0) += 1;
        let removed = entries.values.remove(key).is_some();
        if removed {
            tracing::debug!(cache = self.name, key = ?key, "cache entry invalidated");
        }
        removed
    }

    pub fn clear(&self) {
        let mut entries = self.entries.write();
        entries.epoch += 1;
        entries.values.clear();
        entries.generations.clear();
        tracing::debug!(cache = self.name, "cache cleared");
    }

    pub fn len(&self) -> usize {
        self.entries.read().values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().values.is_empty()
    }
}

/// raw store results per class, one slot per requested period
pub type ClassFees = HashMap<Option<AcademicPeriod>, FeeStructure>;

/// fee-structure cache keyed by class name
pub struct FeeStructureCache {
    inner: AdvisoryCache<String, ClassFees>,
}

impl FeeStructureCache {
    pub fn new(enabled: bool) -> Self {
        Self {
            inner: AdvisoryCache::new("fee_structures", enabled),
        }
    }

    pub fn name(&self) -> &'static str {
        self.inner.name()
    }

    pub fn get(&self, class_name: &str, period: Option<AcademicPeriod>) -> Option<FeeStructure> {
        self.inner
            .get(&class_name.to_string())
            .and_then(|fees| fees.get(&period).cloned())
    }

    pub fn generation(&self, class_name: &str) -> CacheGeneration {
        self.inner.generation(&class_name.to_string())
    }

    /// cache a store result unless the class was invalidated since `seen`
    pub fn set(
        &self,
        class_name: &str,
        period: Option<AcademicPeriod>,
        structure: FeeStructure,
        seen: CacheGeneration,
    ) -> bool {
        self.inner.update_if_current(class_name.to_string(), seen, |fees| {
            fees.insert(period, structure);
        })
    }

    /// drop every period cached for a class, e.g. after a fee-structure edit
    pub fn invalidate(&self, class_name: &str) -> bool {
        self.inner.invalidate(&class_name.to_string())
    }

    pub fn clear(&self) {
        self.inner.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl Default for FeeStructureCache {
    fn default() -> Self {
        Self::new(true)
    }
}
