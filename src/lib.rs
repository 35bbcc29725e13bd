//! # shardkv - Storage Core for a Redis-Style Key-Value Engine
//!
//! `shardkv` provides the two in-memory structures a Redis-like server is
//! built on, plus the thin layer that puts them together.
//!
//! ## Features
//!
//! - **Sharded Dictionary**: a fixed number of `RwLock<HashMap>` shards with
//!   deterministic key placement, so different keys rarely contend
//! - **Span-Indexed Skip List**: `(score, member)` ordering with O(log n)
//!   expected insert, delete and rank lookups
//! - **Database Namespace**: main table, expiries, watch and blocking
//!   registries, each an independent dictionary
//! - **Active Expiry**: a Tokio task that drops keys whose deadline passed
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                               RedisDb                                   │
//! │                                                                         │
//! │   table ─────────┐   expires   watched_keys   blocking_keys  ready_keys │
//! │                  │      │           │               │            │      │
//! │                  ▼      ▼           ▼               ▼            ▼      │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                          Dict<V>                                 │  │
//! │  │  ┌────────┐ ┌────────┐ ┌────────┐ ┌────────┐                     │  │
//! │  │  │Shard 0 │ │Shard 1 │ │Shard 2 │ │...N    │   N in [16, 2048]   │  │
//! │  │  │RwLock  │ │RwLock  │ │RwLock  │ │shards  │                     │  │
//! │  │  └────────┘ └────────┘ └────────┘ └────────┘                     │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                  │                                                      │
//! │                  ▼                                                      │
//! │        RedisObject { Value::SortedSet(SortedSet { HashMap, SkipList }) }│
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use shardkv::{Config, RedisDb};
//!
//! let db = RedisDb::new(0, &Config::default());
//!
//! db.zadd("leaderboard", "alice", 30.0).unwrap();
//! db.zadd("leaderboard", "bob", 10.0).unwrap();
//!
//! assert_eq!(db.zrank("leaderboard", "alice").unwrap(), Some(1));
//! ```
//!
//! ## Thread Safety
//!
//! `Dict` synchronizes itself, one lock per shard. `SkipList` has no
//! internal locking: when it lives inside a `Dict` value, the shard lock
//! that guards the value is what guards the list.

pub mod config;
pub mod error;
pub mod storage;

// Re-export commonly used types for convenience
pub use config::Config;
pub use error::{StoreError, StoreResult};
pub use storage::{
    start_expiry_sweeper, Dict, ExpiryConfig, ExpirySweeper, ObjectType, RedisDb, RedisObject,
    SkipList, SortedSet, Value,
};

/// Version of shardkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
