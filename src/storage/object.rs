//! Tagged values stored in a database table.
//!
//! Every key in the main table maps to a [`RedisObject`]: one of five value
//! kinds plus the last time the key was touched.

use crate::storage::zset::SortedSet;
use bytes::Bytes;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::time::{Duration, Instant};

/// The kind of value a key holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectType {
    String,
    List,
    Set,
    SortedSet,
    Hash,
}

impl ObjectType {
    /// The name reported by the `TYPE` command.
    pub fn as_str(self) -> &'static str {
        match self {
            ObjectType::String => "string",
            ObjectType::List => "list",
            ObjectType::Set => "set",
            ObjectType::SortedSet => "zset",
            ObjectType::Hash => "hash",
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored value; each variant owns its representation.
#[derive(Debug, Clone)]
pub enum Value {
    String(Bytes),
    List(VecDeque<Bytes>),
    Set(HashSet<Bytes>),
    SortedSet(SortedSet),
    Hash(HashMap<Bytes, Bytes>),
}

impl Value {
    /// The type tag of this value.
    pub fn object_type(&self) -> ObjectType {
        match self {
            Value::String(_) => ObjectType::String,
            Value::List(_) => ObjectType::List,
            Value::Set(_) => ObjectType::Set,
            Value::SortedSet(_) => ObjectType::SortedSet,
            Value::Hash(_) => ObjectType::Hash,
        }
    }
}

impl From<Bytes> for Value {
    fn from(value: Bytes) -> Self {
        Value::String(value)
    }
}

impl From<SortedSet> for Value {
    fn from(value: SortedSet) -> Self {
        Value::SortedSet(value)
    }
}

/// A value plus its access clock.
#[derive(Debug, Clone)]
pub struct RedisObject {
    /// The stored value
    pub value: Value,
    /// Last read or write (for idle-time based eviction)
    pub last_access: Instant,
}

impl RedisObject {
    /// Wraps a value, stamping it with the current time.
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            last_access: Instant::now(),
        }
    }

    #[inline]
    pub fn object_type(&self) -> ObjectType {
        self.value.object_type()
    }

    /// Marks the object as used now.
    #[inline]
    pub fn touch(&mut self) {
        self.last_access = Instant::now();
    }

    /// Time since the object was last touched.
    pub fn idle_time(&self) -> Duration {
        self.last_access.elapsed()
    }
}
