//! Storage Module
//!
//! The in-memory structures behind a Redis-style keyspace.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         RedisDb                             │
//! │  table  expires  watched_keys  blocking_keys  ready_keys    │
//! │    │       │          │              │             │        │
//! │    └───────┴──────────┴──────┬───────┴─────────────┘        │
//! │                              ▼                              │
//! │                    Dict (N × RwLock<HashMap>)               │
//! └─────────────────────────────────────────────────────────────┘
//!                               ▲
//!               ┌───────────────┴───────────────┐
//!               │  ExpirySweeper (Tokio task)   │
//!               └───────────────────────────────┘
//!
//!   Value::SortedSet ──> SortedSet { HashMap, SkipList }
//! ```
//!
//! - [`dict`]: sharded concurrent dictionary, one `RwLock` per shard
//! - [`skiplist`]: span-indexed skip list ordered by `(score, member)`
//! - [`zset`]: sorted-set value built on the skip list
//! - [`object`]: tagged values stored in the main table
//! - [`db`]: a database namespace made of five dictionaries
//! - [`expiry`]: background expiry sweeper
//!
//! ## Example
//!
//! ```
//! use shardkv::storage::{Dict, SkipList};
//!
//! let dict: Dict<u64> = Dict::new(64);
//! assert!(dict.set("hits", 1));
//! assert_eq!(dict.get("hits"), Some(1));
//!
//! let mut index = SkipList::new();
//! index.insert(3.0, "c");
//! index.insert(1.0, "a");
//! assert_eq!(index.first().map(|n| n.member()), Some("a"));
//! ```

pub mod db;
pub mod dict;
pub mod expiry;
pub mod object;
pub mod skiplist;
pub mod zset;

// Re-export commonly used types
pub use db::{ClientId, RedisDb};
pub use dict::{Dict, DictStats, DEFAULT_SHARDS, MAX_SHARDS, MIN_SHARDS};
pub use expiry::{start_expiry_sweeper, ExpiryConfig, ExpirySweeper};
pub use object::{ObjectType, RedisObject, Value};
pub use skiplist::{Node, NodeId, SkipList};
pub use zset::SortedSet;
