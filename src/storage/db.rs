//! Per-database namespace.
//!
//! A `RedisDb` is five independent [`Dict`]s built with the same shard count:
//!
//! | Field           | Maps key to                          |
//! |-----------------|--------------------------------------|
//! | `table`         | the stored [`RedisObject`]           |
//! | `expires`       | the instant the key expires          |
//! | `watched_keys`  | clients that WATCH the key           |
//! | `blocking_keys` | clients blocked waiting on the key   |
//! | `ready_keys`    | keys whose blocked clients can wake  |
//!
//! Helpers that touch two maps (for example `delete`, which clears both
//! `table` and `expires`) mostly do so one map at a time. The one nesting is
//! `table` then `expires`: `set_expire` writes the deadline while holding the
//! key's `table` shard, so the key cannot vanish in between. Nothing locks
//! `expires` and then `table`.

use crate::config::Config;
use crate::error::{StoreError, StoreResult};
use crate::storage::dict::Dict;
use crate::storage::object::{ObjectType, RedisObject, Value};
use crate::storage::zset::SortedSet;
use bytes::Bytes;
use std::time::{Duration, Instant};
use tracing::debug;

/// Identifies a connected client in the watch and blocking registries.
pub type ClientId = u64;

/// One logical database.
#[derive(Debug)]
pub struct RedisDb {
    /// Database index
    pub id: usize,
    pub table: Dict<RedisObject>,
    pub expires: Dict<Instant>,
    pub watched_keys: Dict<Vec<ClientId>>,
    pub blocking_keys: Dict<Vec<ClientId>>,
    pub ready_keys: Dict<()>,
}

fn wrong_type(expected: ObjectType, found: ObjectType) -> StoreError {
    StoreError::WrongType { expected, found }
}

impl RedisDb {
    /// Creates an empty database; every map uses `config.shard_num`.
    pub fn new(id: usize, config: &Config) -> Self {
        let shards = config.shard_num;
        Self {
            id,
            table: Dict::new(shards),
            expires: Dict::new(shards),
            watched_keys: Dict::new(shards),
            blocking_keys: Dict::new(shards),
            ready_keys: Dict::new(shards),
        }
    }

    /// Number of keys in the main table.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns true if the main table is empty.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// The type of the value stored at `key`, if any.
    pub fn key_type(&self, key: &str) -> Option<ObjectType> {
        if self.expire_if_needed(key) {
            return None;
        }
        self.table.view(key, RedisObject::object_type)
    }

    /// Deletes a key together with its expiry.
    pub fn delete(&self, key: &str) -> bool {
        // Table first: a concurrent `set_expire` either misses the key or
        // finishes before the expiry below is dropped.
        let existed = self.table.delete(key);
        self.expires.delete(key);
        existed
    }

    /// Moves the value and expiry at `from` to `to`, replacing anything there.
    pub fn rename(&self, from: &str, to: &str) -> StoreResult<()> {
        if self.expire_if_needed(from) {
            return Err(StoreError::NoSuchKey);
        }
        let obj = self.table.remove(from).ok_or(StoreError::NoSuchKey)?;
        let deadline = self.expires.remove(from);

        self.table.set(to, obj);
        match deadline {
            Some(at) => {
                self.expires.set(to, at);
            }
            None => {
                self.expires.delete(to);
            }
        }
        self.signal_ready(to);
        Ok(())
    }

    /// Clears all five maps.
    pub fn flush(&self) {
        self.table.clear();
        self.expires.clear();
        self.watched_keys.clear();
        self.blocking_keys.clear();
        self.ready_keys.clear();
        debug!(db = self.id, "Database flushed");
    }

    // ========================================================================
    // EXPIRY
    // ========================================================================

    /// Sets a time-to-live on an existing key.
    ///
    /// Returns `false` if the key does not exist.
    pub fn set_expire(&self, key: &str, ttl: Duration) -> bool {
        let deadline = Instant::now() + ttl;
        self.table
            .view(key, |_| {
                self.expires.set(key, deadline);
            })
            .is_some()
    }

    /// Removes the expiry from a key. Returns `true` if it had one.
    pub fn persist(&self, key: &str) -> bool {
        self.expires.delete(key)
    }

    /// Remaining time-to-live, or `None` if the key has no expiry.
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        self.expires
            .get(key)
            .map(|at| at.saturating_duration_since(Instant::now()))
    }

    /// Checks whether `key` has an expiry in the past.
    pub fn is_expired(&self, key: &str) -> bool {
        let now = Instant::now();
        self.expires.view(key, |at| *at <= now).unwrap_or(false)
    }

    /// Lazy expiry: removes `key` if its deadline has passed.
    fn expire_if_needed(&self, key: &str) -> bool {
        let now = Instant::now();
        if self.expires.remove_if(key, |at| *at <= now) {
            self.table.delete(key);
            true
        } else {
            false
        }
    }

    /// Removes every key whose deadline is at or before `now`.
    ///
    /// Returns the number of keys removed. Called by the expiry sweeper.
    pub fn remove_expired(&self, now: Instant) -> u64 {
        let mut removed = 0;
        let due = self
            .expires
            .entries()
            .into_iter()
            .filter(|(_, at)| *at <= now)
            .map(|(key, _)| key);
        for key in due {
            // Re-checked under the shard lock: the key may have been given a
            // new deadline since `entries()` saw it.
            if self.expires.remove_if(&key, |at| *at <= now) {
                self.table.delete(&key);
                removed += 1;
            }
        }
        removed
    }

    // ========================================================================
    // STRINGS
    // ========================================================================

    /// Stores a string value, dropping any previous expiry.
    ///
    /// Returns `true` if the key was new.
    pub fn set_string(&self, key: &str, value: Bytes) -> bool {
        self.expires.delete(key);
        self.table.set(key, RedisObject::new(value))
    }

    /// Reads a string value.
    pub fn get_string(&self, key: &str) -> StoreResult<Option<Bytes>> {
        if self.expire_if_needed(key) {
            return Ok(None);
        }
        self.table
            .update(key, |obj| {
                obj.touch();
                match &obj.value {
                    Value::String(s) => Ok(s.clone()),
                    other => Err(wrong_type(ObjectType::String, other.object_type())),
                }
            })
            .transpose()
    }

    // ========================================================================
    // SORTED SETS
    // ========================================================================

    /// Adds `member` with `score` to the sorted set at `key`, creating it if
    /// needed. Returns `true` if the member was new.
    pub fn zadd(&self, key: &str, member: &str, score: f64) -> StoreResult<bool> {
        self.expire_if_needed(key);
        let added = self.table.get_or_insert_with(
            key,
            || RedisObject::new(SortedSet::new()),
            |obj| {
                obj.touch();
                match &mut obj.value {
                    Value::SortedSet(zset) => Ok(zset.add(member, score)),
                    other => Err(wrong_type(ObjectType::SortedSet, other.object_type())),
                }
            },
        )?;
        self.signal_ready(key);
        Ok(added)
    }

    /// Removes `member` from the sorted set at `key`. An emptied set is
    /// removed from the table.
    pub fn zrem(&self, key: &str, member: &str) -> StoreResult<bool> {
        if self.expire_if_needed(key) {
            return Ok(false);
        }
        let removed = self
            .table
            .update(key, |obj| match &mut obj.value {
                Value::SortedSet(zset) => Ok(zset.remove(member)),
                other => Err(wrong_type(ObjectType::SortedSet, other.object_type())),
            })
            .transpose()?
            .unwrap_or(false);

        if removed
            && self.table.remove_if(key, |obj| {
                matches!(&obj.value, Value::SortedSet(zset) if zset.is_empty())
            })
        {
            self.expires.delete(key);
        }
        Ok(removed)
    }

    fn with_zset<R>(
        &self,
        key: &str,
        f: impl FnOnce(&SortedSet) -> R,
    ) -> StoreResult<Option<R>> {
        if self.expire_if_needed(key) {
            return Ok(None);
        }
        self.table
            .view(key, |obj| match &obj.value {
                Value::SortedSet(zset) => Ok(f(zset)),
                other => Err(wrong_type(ObjectType::SortedSet, other.object_type())),
            })
            .transpose()
    }

    /// Score of `member` in the sorted set at `key`.
    pub fn zscore(&self, key: &str, member: &str) -> StoreResult<Option<f64>> {
        Ok(self.with_zset(key, |zset| zset.score(member))?.flatten())
    }

    /// 0-based rank of `member` in the sorted set at `key`.
    pub fn zrank(&self, key: &str, member: &str) -> StoreResult<Option<usize>> {
        Ok(self.with_zset(key, |zset| zset.rank(member))?.flatten())
    }

    /// Members between ranks `start` and `stop` (inclusive, negative from the end).
    pub fn zrange(&self, key: &str, start: i64, stop: i64) -> StoreResult<Vec<(String, f64)>> {
        Ok(self
            .with_zset(key, |zset| zset.range_by_rank(start, stop))?
            .unwrap_or_default())
    }

    /// Cardinality of the sorted set at `key` (0 if absent).
    pub fn zcard(&self, key: &str) -> StoreResult<usize> {
        Ok(self.with_zset(key, SortedSet::len)?.unwrap_or(0))
    }

    // ========================================================================
    // WATCH / BLOCKING REGISTRIES
    // ========================================================================

    /// Registers `client` as watching `key`.
    pub fn watch(&self, key: &str, client: ClientId) {
        self.watched_keys.get_or_insert_with(key, Vec::new, |clients| {
            if !clients.contains(&client) {
                clients.push(client);
            }
        });
    }

    /// Drops `client` from the watchers of `key`.
    pub fn unwatch(&self, key: &str, client: ClientId) -> bool {
        let removed = self
            .watched_keys
            .update(key, |clients| {
                let before = clients.len();
                clients.retain(|c| *c != client);
                clients.len() != before
            })
            .unwrap_or(false);
        self.watched_keys.remove_if(key, Vec::is_empty);
        removed
    }

    /// Clients watching `key`.
    pub fn watchers(&self, key: &str) -> Vec<ClientId> {
        self.watched_keys.get(key).unwrap_or_default()
    }

    /// Registers `client` as blocked until `key` receives data.
    pub fn block_on(&self, key: &str, client: ClientId) {
        self.blocking_keys
            .get_or_insert_with(key, Vec::new, |clients| clients.push(client));
    }

    /// Drops `client` from the clients blocked on `key`.
    pub fn unblock(&self, key: &str, client: ClientId) -> bool {
        let removed = self
            .blocking_keys
            .update(key, |clients| {
                let before = clients.len();
                clients.retain(|c| *c != client);
                clients.len() != before
            })
            .unwrap_or(false);
        self.blocking_keys.remove_if(key, Vec::is_empty);
        removed
    }

    /// Marks `key` ready if some client is blocked on it.
    ///
    /// Returns `true` if the key was newly marked.
    pub fn signal_ready(&self, key: &str) -> bool {
        self.blocking_keys.contains_key(key) && self.ready_keys.set_if_not_exist(key, ())
    }

    /// Takes every key currently marked ready.
    pub fn take_ready_keys(&self) -> Vec<String> {
        let mut keys = self.ready_keys.keys();
        keys.retain(|key| self.ready_keys.delete(key));
        keys
    }
}
