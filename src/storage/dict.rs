//! Sharded Concurrent Dictionary
//!
//! `Dict` is the key-value primitive every part of a database namespace is
//! built on: the main table, the expiry table and the watch/blocking
//! registries are all independent `Dict` instances.
//!
//! ## Design Decisions
//!
//! 1. **Fixed shard count**: chosen once at construction, clamped to
//!    `[MIN_SHARDS, MAX_SHARDS]`, never resized.
//! 2. **One RwLock per shard**: operations on different shards never contend.
//! 3. **Deterministic placement**: `hash(key) % shard_count`, using the
//!    hasher the map was built with.
//!
//! ## Concurrency Model
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Dict<V>                              │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐           │
//! │  │ Shard 0 │ │ Shard 1 │ │ Shard 2 │ │ Shard N │           │
//! │  │ RwLock  │ │ RwLock  │ │ RwLock  │ │ RwLock  │           │
//! │  │ HashMap │ │ HashMap │ │ HashMap │ │ HashMap │           │
//! │  └─────────┘ └─────────┘ └─────────┘ └─────────┘           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Point operations lock exactly one shard. `len`, `keys` and `entries`
//! visit the shards one after another, holding one read lock at a time, so
//! under concurrent writes they return a weakly consistent view: a shard
//! already visited may change before the call returns. That is accepted
//! behaviour, not a bug.

use parking_lot::RwLock;
use std::collections::hash_map::{DefaultHasher, Entry};
use std::collections::HashMap;
use std::fmt;
use std::hash::{BuildHasher, BuildHasherDefault};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Smallest shard count a `Dict` accepts.
pub const MIN_SHARDS: usize = 16;

/// Largest shard count a `Dict` accepts.
pub const MAX_SHARDS: usize = 2048;

/// Shard count used when the requested one is out of range.
pub const DEFAULT_SHARDS: usize = 128;

/// Hasher used for shard placement unless another one is supplied.
pub type DefaultBuildHasher = BuildHasherDefault<DefaultHasher>;

/// Applies the shard count rule: values outside `[MIN_SHARDS, MAX_SHARDS]`
/// fall back to `DEFAULT_SHARDS`.
#[inline]
pub fn clamp_shard_count(requested: usize) -> usize {
    if (MIN_SHARDS..=MAX_SHARDS).contains(&requested) {
        requested
    } else {
        DEFAULT_SHARDS
    }
}

/// A single independently locked partition of the keyspace.
struct Shard<V> {
    map: RwLock<HashMap<String, V>>,
}

impl<V> Shard<V> {
    fn new() -> Self {
        Self {
            map: RwLock::new(HashMap::new()),
        }
    }
}

/// Operation counters, readable without taking any shard lock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DictStats {
    /// Total lookups (`get`, `view`, `contains_key`)
    pub reads: u64,
    /// Total writes that stored a value
    pub writes: u64,
    /// Total keys removed
    pub deletes: u64,
    /// Number of times the map was cleared
    pub clears: u64,
}

/// A fixed-size array of `RwLock<HashMap>` shards.
///
/// # Example
///
/// ```
/// use shardkv::storage::Dict;
///
/// let dict: Dict<i64> = Dict::new(128);
///
/// assert!(dict.set("a", 1));
/// assert!(!dict.set("a", 2));
/// assert_eq!(dict.get("a"), Some(2));
///
/// assert!(!dict.set_if_not_exist("a", 3));
/// assert_eq!(dict.get("a"), Some(2));
/// ```
pub struct Dict<V, S = DefaultBuildHasher> {
    shards: Box<[Shard<V>]>,
    hasher: S,
    reads: AtomicU64,
    writes: AtomicU64,
    deletes: AtomicU64,
    clears: AtomicU64,
}

impl<V, S> fmt::Debug for Dict<V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dict")
            .field("shards", &self.shards.len())
            .field("reads", &self.reads.load(Ordering::Relaxed))
            .field("writes", &self.writes.load(Ordering::Relaxed))
            .field("deletes", &self.deletes.load(Ordering::Relaxed))
            .finish()
    }
}

impl<V> Default for Dict<V> {
    fn default() -> Self {
        Self::new(DEFAULT_SHARDS)
    }
}

impl<V> Dict<V> {
    /// Creates an empty dictionary with `shard_num` shards (clamped).
    pub fn new(shard_num: usize) -> Self {
        Self::with_hasher(shard_num, DefaultBuildHasher::default())
    }
}

impl<V, S: BuildHasher> Dict<V, S> {
    /// Creates an empty dictionary that places keys with `hasher`.
    ///
    /// Any `BuildHasher` works as long as it hashes a given key the same way
    /// for the lifetime of this map.
    pub fn with_hasher(shard_num: usize, hasher: S) -> Self {
        let size = clamp_shard_count(shard_num);
        if size != shard_num {
            debug!(requested = shard_num, using = size, "Shard count out of range");
        }
        let shards = (0..size).map(|_| Shard::new()).collect();

        Self {
            shards,
            hasher,
            reads: AtomicU64::new(0),
            writes: AtomicU64::new(0),
            deletes: AtomicU64::new(0),
            clears: AtomicU64::new(0),
        }
    }

    /// Number of shards. Fixed for the lifetime of the map.
    #[inline]
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Determines which shard a key belongs to.
    #[inline]
    pub fn shard_index(&self, key: &str) -> usize {
        (self.hasher.hash_one(key) as usize) % self.shards.len()
    }

    #[inline]
    fn shard(&self, key: &str) -> &Shard<V> {
        &self.shards[self.shard_index(key)]
    }

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// Returns `true` if the key was newly added, `false` if it replaced an
    /// existing entry.
    pub fn set(&self, key: impl Into<String>, value: V) -> bool {
        self.writes.fetch_add(1, Ordering::Relaxed);
        let key = key.into();
        let mut map = self.shard(&key).map.write();
        map.insert(key, value).is_none()
    }

    /// Replaces the value only if `key` is already present.
    ///
    /// Returns `true` if replaced, `false` if the key was absent (no-op).
    pub fn set_if_exist(&self, key: &str, value: V) -> bool {
        let mut map = self.shard(key).map.write();
        match map.get_mut(key) {
            Some(slot) => {
                *slot = value;
                self.writes.fetch_add(1, Ordering::Relaxed);
                true
            }
            None => false,
        }
    }

    /// Inserts the value only if `key` is absent.
    ///
    /// Returns `true` if inserted, `false` if the key was present (no-op).
    pub fn set_if_not_exist(&self, key: impl Into<String>, value: V) -> bool {
        let key = key.into();
        let mut map = self.shard(&key).map.write();
        match map.entry(key) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(value);
                self.writes.fetch_add(1, Ordering::Relaxed);
                true
            }
        }
    }

    /// Gets a copy of the value for `key`.
    pub fn get(&self, key: &str) -> Option<V>
    where
        V: Clone,
    {
        self.view(key, V::clone)
    }

    /// Runs `f` on the value for `key` while holding the shard's read lock.
    pub fn view<R>(&self, key: &str, f: impl FnOnce(&V) -> R) -> Option<R> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        let map = self.shard(key).map.read();
        map.get(key).map(f)
    }

    /// Checks if a key is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.shard(key).map.read().contains_key(key)
    }

    /// Runs `f` on the value for `key` while holding the shard's write lock.
    ///
    /// This is the way to mutate a value in place (for example a skip list
    /// stored in the map): the shard lock is the only guard it needs.
    pub fn update<R>(&self, key: &str, f: impl FnOnce(&mut V) -> R) -> Option<R> {
        let mut map = self.shard(key).map.write();
        let value = map.get_mut(key)?;
        self.writes.fetch_add(1, Ordering::Relaxed);
        Some(f(value))
    }

    /// Runs `f` on the value for `key`, inserting `default()` first if the
    /// key is absent. Both steps happen under one write lock.
    pub fn get_or_insert_with<R>(
        &self,
        key: impl Into<String>,
        default: impl FnOnce() -> V,
        f: impl FnOnce(&mut V) -> R,
    ) -> R {
        self.writes.fetch_add(1, Ordering::Relaxed);
        let key = key.into();
        let mut map = self.shard(&key).map.write();
        f(map.entry(key).or_insert_with(default))
    }

    /// Deletes a key.
    ///
    /// Returns `true` if the key was removed, `false` if it was absent.
    pub fn delete(&self, key: &str) -> bool {
        self.remove(key).is_some()
    }

    /// Deletes a key and hands back its value.
    pub fn remove(&self, key: &str) -> Option<V> {
        let removed = self.shard(key).map.write().remove(key);
        if removed.is_some() {
            self.deletes.fetch_add(1, Ordering::Relaxed);
        }
        removed
    }

    /// Deletes a key only if `pred` holds for its current value.
    ///
    /// The check and the removal happen under the same write lock.
    pub fn remove_if(&self, key: &str, pred: impl FnOnce(&V) -> bool) -> bool {
        let mut map = self.shard(key).map.write();
        if !map.get(key).is_some_and(pred) {
            return false;
        }
        map.remove(key);
        self.deletes.fetch_add(1, Ordering::Relaxed);
        true
    }

    /// Deletes several keys, returning how many were present.
    pub fn delete_many<K: AsRef<str>>(&self, keys: &[K]) -> u64 {
        keys.iter().filter(|k| self.delete(k.as_ref())).count() as u64
    }

    /// Total number of entries across all shards.
    ///
    /// Shards are read one at a time, so the total is not an atomic snapshot
    /// when other threads are writing.
    pub fn len(&self) -> usize {
        self.shards.iter().map(|shard| shard.map.read().len()).sum()
    }

    /// Returns true if no shard holds an entry.
    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(|shard| shard.map.read().is_empty())
    }

    /// All keys, collected shard by shard (weakly consistent, like `len`).
    pub fn keys(&self) -> Vec<String> {
        let mut keys = Vec::new();
        for shard in self.shards.iter() {
            let map = shard.map.read();
            keys.extend(map.keys().cloned());
        }
        keys
    }

    /// All key-value pairs, collected shard by shard (weakly consistent).
    pub fn entries(&self) -> Vec<(String, V)>
    where
        V: Clone,
    {
        let mut entries = Vec::new();
        for shard in self.shards.iter() {
            let map = shard.map.read();
            entries.extend(map.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        entries
    }

    /// Empties the dictionary, keeping its shard count and hasher.
    ///
    /// Every shard's write lock is taken in ascending index order before
    /// anything is removed, so readers never observe a half-cleared map and
    /// two concurrent clears cannot deadlock.
    pub fn clear(&self) {
        let mut guards: Vec<_> = self.shards.iter().map(|shard| shard.map.write()).collect();
        let removed: usize = guards
            .iter_mut()
            .map(|map| {
                let n = map.len();
                map.clear();
                n
            })
            .sum();
        drop(guards);

        self.deletes.fetch_add(removed as u64, Ordering::Relaxed);
        self.clears.fetch_add(1, Ordering::Relaxed);
        debug!(removed = removed, shards = self.shards.len(), "Dict cleared");
    }

    /// Returns operation counters.
    pub fn stats(&self) -> DictStats {
        DictStats {
            reads: self.reads.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            clears: self.clears.load(Ordering::Relaxed),
        }
    }
}
