//! Sorted set value: unique members, each with a score.
//!
//! A `HashMap` gives O(1) member → score lookups; a [`SkipList`] keeps the
//! `(score, member)` order for rank and range queries. The skip list itself
//! tolerates duplicate pairs, so member uniqueness is enforced here.

use crate::storage::skiplist::SkipList;
use std::collections::HashMap;

/// A set of unique string members ordered by `(score, member)`.
#[derive(Debug, Clone, Default)]
pub struct SortedSet {
    scores: HashMap<String, f64>,
    index: SkipList,
}

impl SortedSet {
    /// Creates an empty sorted set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `member` or moves it to a new score.
    ///
    /// Returns `true` if the member was new.
    pub fn add(&mut self, member: &str, score: f64) -> bool {
        match self.scores.get_mut(member) {
            Some(old) => {
                if *old != score {
                    self.index.delete(*old, member);
                    self.index.insert(score, member);
                    *old = score;
                }
                false
            }
            None => {
                self.index.insert(score, member);
                self.scores.insert(member.to_string(), score);
                true
            }
        }
    }

    /// Removes `member`. Returns `true` if it was present.
    pub fn remove(&mut self, member: &str) -> bool {
        match self.scores.remove(member) {
            Some(score) => self.index.delete(score, member),
            None => false,
        }
    }

    /// The score of `member`.
    pub fn score(&self, member: &str) -> Option<f64> {
        self.scores.get(member).copied()
    }

    /// 0-based rank of `member`, lowest score first.
    pub fn rank(&self, member: &str) -> Option<usize> {
        let score = self.score(member)?;
        self.index.rank(score, member).map(|r| r - 1)
    }

    /// Members with their scores between `start` and `stop` (0-based,
    /// inclusive). Negative indices count from the end.
    pub fn range_by_rank(&self, start: i64, stop: i64) -> Vec<(String, f64)> {
        let len = self.len() as i64;
        let start = if start < 0 { (len + start).max(0) } else { start };
        let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };
        if start > stop || start >= len {
            return Vec::new();
        }

        self.index
            .iter_from_rank(start as usize + 1)
            .take((stop - start + 1) as usize)
            .map(|node| (node.member().to_string(), node.score()))
            .collect()
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    /// Returns true if there are no members.
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}
