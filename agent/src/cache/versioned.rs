//! Versioned cache cells.
//!
//! Every entry carries the version of the value it holds. A write carrying an
//! older version than the stored one is discarded, so a slow writer cannot
//! clobber a fresher value.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::RwLock;

/// A value and the version it was written with
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<V> {
    pub version: i64,
    pub value: V,
}

/// Result of a versioned write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Inserted,
    Replaced,
    /// Discarded, the cell already holds a newer version
    Stale,
}

impl WriteOutcome {
    pub fn applied(&self) -> bool {
        !matches!(self, WriteOutcome::Stale)
    }
}

/// Apply `incoming` to `slot` unless the slot holds a newer version
pub fn write_versioned<V>(slot: &mut Option<Versioned<V>>, incoming: Versioned<V>) -> WriteOutcome {
    match slot {
        Some(current) if current.version > incoming.version => WriteOutcome::Stale,
        Some(current) => {
            *current = incoming;
            WriteOutcome::Replaced
        }
        None => {
            *slot = Some(incoming);
            WriteOutcome::Inserted
        }
    }
}

/// Map of independently versioned cells
pub struct VersionedMap<K, V> {
    entries: RwLock<HashMap<K, Versioned<V>>>,
}

impl<K, V> VersionedMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, key: &K) -> Option<Versioned<V>> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(key).cloned()
    }

    /// Last-write-wins among writers holding the latest known version
    pub fn write(&self, key: K, version: i64, value: V) -> WriteOutcome {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let mut slot = entries.remove(&key);
        let outcome = write_versioned(&mut slot, Versioned { version, value });
        if let Some(cell) = slot {
            entries.insert(key, cell);
        }
        outcome
    }

    pub fn remove(&self, key: &K) -> Option<Versioned<V>> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.remove(key)
    }

    pub fn keys(&self) -> Vec<K> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, V> Default for VersionedMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}
