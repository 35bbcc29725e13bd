//! Span-Indexed Skip List
//!
//! An ordered index over `(score, member)` pairs with O(log n) expected
//! insert, delete and rank queries. It backs the sorted-set value type.
//!
//! ## Layout
//!
//! ```text
//! level 2   H ─────────────(3)───────────> C ──(2)──> ∅
//! level 1   H ──(1)──> A ──────(2)───────> C ──(2)──> ∅
//! level 0   H ──(1)──> A ──(1)──> B ──(1)──> C ──(1)──> D ──(0)──> ∅
//!                      ∅ <─────── A <─────── B <─────── C <─────── D   (back)
//! ```
//!
//! Every forward link carries a span: the number of level-0 hops it skips.
//! Summing the spans along a search path gives the 1-based rank of the node
//! reached. A link that points at nothing carries the number of nodes left
//! after its owner.
//!
//! ## Ownership
//!
//! Nodes live in an arena (`Vec<Node>`); slot 0 is the header. Links are
//! arena indices, so the back-reference used for reverse traversal is just
//! an index and never keeps a node alive. Freed slots are recycled.
//!
//! ## Ordering
//!
//! Elements are ordered by score, then by member bytes. Scores compare as
//! `OrderedFloat<f64>`: every NaN equals every other NaN and sorts after
//! `+inf`, and `-0.0 == 0.0`. Identical pairs are allowed and sit next to
//! each other; keeping members unique is up to the caller.
//!
//! ## Concurrency
//!
//! None. Guard a `SkipList` with whatever lock guards the value holding it.

use ordered_float::OrderedFloat;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::cmp::Ordering;
use std::iter::FusedIterator;
use tracing::trace;

/// Maximum number of levels a node can have. Enough for 2^64 elements at p = 1/4.
pub const MAX_LEVEL: usize = 32;

/// Probability that a node is promoted one more level.
pub const LEVEL_P: f64 = 0.25;

/// Handle to a node in a [`SkipList`].
///
/// A handle stays valid until the node it names is deleted; after that the
/// slot may be reused by a later insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

const HEADER: NodeId = NodeId(0);

#[derive(Debug, Clone, Copy, Default)]
struct Level {
    forward: Option<NodeId>,
    span: usize,
}

/// One element of the skip list.
#[derive(Debug, Clone)]
pub struct Node {
    member: String,
    score: OrderedFloat<f64>,
    backward: Option<NodeId>,
    levels: Vec<Level>,
}

impl Node {
    fn new(level: usize, score: OrderedFloat<f64>, member: String) -> Self {
        Self {
            member,
            score,
            backward: None,
            levels: vec![Level::default(); level],
        }
    }

    /// The element's score.
    #[inline]
    pub fn score(&self) -> f64 {
        self.score.into_inner()
    }

    /// The element's member string.
    #[inline]
    pub fn member(&self) -> &str {
        &self.member
    }

    /// Number of levels this node participates in, fixed at creation.
    #[inline]
    pub fn level(&self) -> usize {
        self.levels.len()
    }

    #[inline]
    fn cmp_key(&self, score: OrderedFloat<f64>, member: &str) -> Ordering {
        self.score
            .cmp(&score)
            .then_with(|| self.member.as_str().cmp(member))
    }

    /// Freed slots have no levels.
    #[inline]
    fn is_live(&self) -> bool {
        !self.levels.is_empty()
    }
}

/// An ordered multiset of `(score, member)` pairs with rank queries.
///
/// # Example
///
/// ```
/// use shardkv::storage::SkipList;
///
/// let mut list = SkipList::new();
/// list.insert(1.0, "x");
/// list.insert(2.0, "y");
/// list.insert(1.0, "w");
///
/// let members: Vec<&str> = list.iter().map(|n| n.member()).collect();
/// assert_eq!(members, ["w", "x", "y"]);
/// assert_eq!(list.rank(2.0, "y"), Some(3));
///
/// assert!(list.delete(1.0, "x"));
/// assert!(!list.delete(1.0, "x"));
/// assert_eq!(list.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct SkipList {
    nodes: Vec<Node>,
    free: Vec<NodeId>,
    tail: Option<NodeId>,
    length: usize,
    level: usize,
    rng: SmallRng,
}

impl Default for SkipList {
    fn default() -> Self {
        Self::new()
    }
}

impl SkipList {
    /// Creates an empty list whose level draws come from OS entropy.
    pub fn new() -> Self {
        Self::with_rng(SmallRng::from_entropy())
    }

    /// Creates an empty list with reproducible level draws.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(SmallRng::seed_from_u64(seed))
    }

    fn with_rng(rng: SmallRng) -> Self {
        Self {
            nodes: vec![Node::new(MAX_LEVEL, OrderedFloat(0.0), String::new())],
            free: Vec::new(),
            tail: None,
            length: 0,
            level: 1,
            rng,
        }
    }

    /// Number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.length
    }

    /// Returns true if the list holds no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Number of levels currently in use (at least 1).
    #[inline]
    pub fn level(&self) -> usize {
        self.level
    }

    #[inline]
    fn forward(&self, id: NodeId, level: usize) -> Option<NodeId> {
        self.nodes[id.0].levels[level].forward
    }

    #[inline]
    fn span(&self, id: NodeId, level: usize) -> usize {
        self.nodes[id.0].levels[level].span
    }

    /// Geometric level draw: keep promoting with probability `LEVEL_P`,
    /// never past `MAX_LEVEL`.
    fn random_level(&mut self) -> usize {
        let mut level = 1;
        while level < MAX_LEVEL && self.rng.gen::<f64>() < LEVEL_P {
            level += 1;
        }
        level
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        match self.free.pop() {
            Some(id) => {
                self.nodes[id.0] = node;
                id
            }
            None => {
                self.nodes.push(node);
                NodeId(self.nodes.len() - 1)
            }
        }
    }

    fn release(&mut self, id: NodeId) {
        if self.length == 0 {
            // Nothing is live past the header; drop the whole arena tail.
            self.nodes.truncate(1);
            self.free.clear();
            return;
        }
        let node = &mut self.nodes[id.0];
        node.levels = Vec::new();
        node.member = String::new();
        node.backward = None;
        self.free.push(id);
    }

    /// Inserts a new element and returns its handle.
    ///
    /// Identical pairs are not merged: inserting the same `(score, member)`
    /// twice leaves two elements.
    pub fn insert(&mut self, score: f64, member: impl Into<String>) -> NodeId {
        let member = member.into();
        let score = OrderedFloat(score);
        let mut update = [HEADER; MAX_LEVEL];
        let mut rank = [0usize; MAX_LEVEL];

        // Walk down from the top level, remembering the last node before the
        // insertion point and its rank at every level.
        let mut x = HEADER;
        for i in (0..self.level).rev() {
            rank[i] = if i + 1 == self.level { 0 } else { rank[i + 1] };
            while let Some(next) = self.forward(x, i) {
                if self.nodes[next.0].cmp_key(score, &member) != Ordering::Less {
                    break;
                }
                rank[i] += self.span(x, i);
                x = next;
            }
            update[i] = x;
        }

        let level = self.random_level();
        if level > self.level {
            for i in self.level..level {
                rank[i] = 0;
                update[i] = HEADER;
                self.nodes[HEADER.0].levels[i].span = self.length;
            }
            trace!(from = self.level, to = level, "Skip list grew");
            self.level = level;
        }

        let id = self.alloc(Node::new(level, score, member));

        for i in 0..level {
            let prev = update[i];
            let link = self.nodes[prev.0].levels[i];
            let skipped = rank[0] - rank[i];
            self.nodes[id.0].levels[i] = Level {
                forward: link.forward,
                span: link.span - skipped,
            };
            self.nodes[prev.0].levels[i] = Level {
                forward: Some(id),
                span: skipped + 1,
            };
        }

        // Links above the new node now skip over one more element.
        for i in level..self.level {
            self.nodes[update[i].0].levels[i].span += 1;
        }

        self.nodes[id.0].backward = (update[0] != HEADER).then_some(update[0]);
        match self.forward(id, 0) {
            Some(next) => self.nodes[next.0].backward = Some(id),
            None => self.tail = Some(id),
        }

        self.length += 1;
        id
    }

    /// Deletes the first element equal to `(score, member)`.
    ///
    /// Returns `true` if an element was removed, `false` if none matched.
    pub fn delete(&mut self, score: f64, member: &str) -> bool {
        let score = OrderedFloat(score);
        let mut update = [HEADER; MAX_LEVEL];

        let mut x = HEADER;
        for i in (0..self.level).rev() {
            while let Some(next) = self.forward(x, i) {
                if self.nodes[next.0].cmp_key(score, member) != Ordering::Less {
                    break;
                }
                x = next;
            }
            update[i] = x;
        }

        match self.forward(x, 0) {
            Some(target) if self.nodes[target.0].cmp_key(score, member) == Ordering::Equal => {
                self.unlink(target, &update);
                self.release(target);
                true
            }
            _ => false,
        }
    }

    fn unlink(&mut self, id: NodeId, update: &[NodeId; MAX_LEVEL]) {
        for (i, &prev) in update.iter().enumerate().take(self.level) {
            let removed = self.nodes[id.0].levels.get(i).copied().unwrap_or_default();
            let link = &mut self.nodes[prev.0].levels[i];
            if link.forward == Some(id) {
                link.span = link.span + removed.span - 1;
                link.forward = removed.forward;
            } else {
                link.span -= 1;
            }
        }

        let (next, back) = {
            let node = &self.nodes[id.0];
            (node.levels[0].forward, node.backward)
        };
        match next {
            Some(next) => self.nodes[next.0].backward = back,
            None => self.tail = back,
        }

        while self.level > 1 && self.forward(HEADER, self.level - 1).is_none() {
            self.level -= 1;
        }
        self.length -= 1;
    }

    /// Looks up a node by handle. Returns `None` for deleted nodes.
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        if id == HEADER {
            return None;
        }
        self.nodes.get(id.0).filter(|node| node.is_live())
    }

    /// The lowest element.
    pub fn first(&self) -> Option<&Node> {
        self.forward(HEADER, 0).map(|id| &self.nodes[id.0])
    }

    /// The highest element.
    pub fn last(&self) -> Option<&Node> {
        self.tail.map(|id| &self.nodes[id.0])
    }

    /// 1-based rank of `(score, member)`, or `None` if it is not present.
    ///
    /// Computed by summing spans on the search path, without walking level 0.
    /// When the pair is present more than once, the first copy's rank is
    /// returned, matching the copy `delete` removes.
    pub fn rank(&self, score: f64, member: &str) -> Option<usize> {
        let score = OrderedFloat(score);
        let mut rank = 0;
        let mut x = HEADER;

        for i in (0..self.level).rev() {
            while let Some(next) = self.forward(x, i) {
                if self.nodes[next.0].cmp_key(score, member) != Ordering::Less {
                    break;
                }
                rank += self.span(x, i);
                x = next;
            }
        }

        match self.forward(x, 0) {
            Some(next) if self.nodes[next.0].cmp_key(score, member) == Ordering::Equal => {
                Some(rank + self.span(x, 0))
            }
            _ => None,
        }
    }

    /// The element at 1-based `rank`.
    pub fn get_by_rank(&self, rank: usize) -> Option<&Node> {
        self.get(self.node_at_rank(rank)?)
    }

    fn node_at_rank(&self, rank: usize) -> Option<NodeId> {
        if rank == 0 || rank > self.length {
            return None;
        }

        let mut traversed = 0;
        let mut x = HEADER;
        for i in (0..self.level).rev() {
            while let Some(next) = self.forward(x, i) {
                let span = self.span(x, i);
                if traversed + span > rank {
                    break;
                }
                traversed += span;
                x = next;
            }
            if traversed == rank {
                return Some(x);
            }
        }
        None
    }

    /// The lowest element whose score lies in `[min, max]`.
    pub fn first_in_range(&self, min: f64, max: f64) -> Option<&Node> {
        let (min, max) = (OrderedFloat(min), OrderedFloat(max));
        if min > max || self.last()?.score < min {
            return None;
        }

        let mut x = HEADER;
        for i in (0..self.level).rev() {
            while let Some(next) = self.forward(x, i) {
                if self.nodes[next.0].score >= min {
                    break;
                }
                x = next;
            }
        }

        let node = &self.nodes[self.forward(x, 0)?.0];
        (node.score <= max).then_some(node)
    }

    /// Iterates from lowest to highest along the level-0 forward links.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            list: self,
            next: self.forward(HEADER, 0),
            remaining: self.length,
        }
    }

    /// Iterates upward starting at the element with 1-based `rank`.
    ///
    /// The starting point is found through the spans, so skipping ahead
    /// costs O(log n) rather than `rank` steps.
    pub fn iter_from_rank(&self, rank: usize) -> Iter<'_> {
        let next = self.node_at_rank(rank);
        Iter {
            list: self,
            next,
            remaining: next.map_or(0, |_| self.length - rank + 1),
        }
    }

    /// Iterates from highest to lowest along the back-references.
    pub fn iter_rev(&self) -> RevIter<'_> {
        RevIter {
            list: self,
            next: self.tail,
            remaining: self.length,
        }
    }
}

/// Ascending iterator returned by [`SkipList::iter`].
#[derive(Debug, Clone)]
pub struct Iter<'a> {
    list: &'a SkipList,
    next: Option<NodeId>,
    remaining: usize,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let list = self.list;
        let node = &list.nodes[self.next?.0];
        self.next = node.levels[0].forward;
        self.remaining -= 1;
        Some(node)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Iter<'_> {}
impl FusedIterator for Iter<'_> {}

/// Descending iterator returned by [`SkipList::iter_rev`].
#[derive(Debug, Clone)]
pub struct RevIter<'a> {
    list: &'a SkipList,
    next: Option<NodeId>,
    remaining: usize,
}

impl<'a> Iterator for RevIter<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let list = self.list;
        let node = &list.nodes[self.next?.0];
        self.next = node.backward;
        self.remaining -= 1;
        Some(node)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for RevIter<'_> {}
impl FusedIterator for RevIter<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashMap;

    /// Walks every level and checks links, spans, back-references and tail.
    fn assert_well_formed(list: &SkipList) {
        // Level 0 visits every node once, in order.
        let mut order = Vec::new();
        let mut x = list.forward(HEADER, 0);
        while let Some(id) = x {
            order.push(id);
            x = list.forward(id, 0);
        }
        assert_eq!(order.len(), list.len());
        for pair in order.windows(2) {
            let (a, b) = (&list.nodes[pair[0].0], &list.nodes[pair[1].0]);
            assert_ne!(a.cmp_key(b.score, &b.member), Ordering::Greater);
        }

        let ranks: HashMap<NodeId, usize> =
            order.iter().enumerate().map(|(i, id)| (*id, i + 1)).collect();

        // Span sums equal ranks on every level in use.
        for i in 0..list.level() {
            let mut pos = 0;
            let mut x = HEADER;
            while let Some(next) = list.forward(x, i) {
                pos += list.span(x, i);
                assert_eq!(pos, ranks[&next], "span drift at level {}", i);
                x = next;
            }
            assert_eq!(pos + list.span(x, i), list.len(), "tail span at level {}", i);
        }
        for i in list.level()..MAX_LEVEL {
            assert!(list.forward(HEADER, i).is_none());
        }
        if list.level() > 1 {
            assert!(list.forward(HEADER, list.level() - 1).is_some());
        }

        // Back-references mirror level 0.
        let mut prev = None;
        for id in &order {
            let node = &list.nodes[id.0];
            assert_eq!(node.backward, prev);
            assert!((1..=MAX_LEVEL).contains(&node.level()));
            prev = Some(*id);
        }
        assert_eq!(list.tail, prev);
        assert_eq!(list.iter_rev().count(), list.len());
    }

    fn pairs(list: &SkipList) -> Vec<(f64, String)> {
        list.iter()
            .map(|n| (n.score(), n.member().to_string()))
            .collect()
    }

    #[test]
    fn test_new_is_empty() {
        let list = SkipList::new();
        assert_eq!(list.len(), 0);
        assert_eq!(list.level(), 1);
        assert!(list.first().is_none());
        assert!(list.last().is_none());
        assert_well_formed(&list);
    }

    #[test]
    fn test_insert_orders_by_score() {
        let mut list = SkipList::with_seed(1);
        list.insert(3.0, "c");
        list.insert(1.0, "a");
        list.insert(2.0, "b");

        let members: Vec<&str> = list.iter().map(|n| n.member()).collect();
        assert_eq!(members, ["a", "b", "c"]);
        assert_well_formed(&list);
    }

    #[test]
    fn test_member_breaks_ties() {
        let mut list = SkipList::with_seed(2);
        list.insert(5.0, "b");
        list.insert(5.0, "a");

        let members: Vec<&str> = list.iter().map(|n| n.member()).collect();
        assert_eq!(members, ["a", "b"]);
    }

    #[test]
    fn test_insert_then_delete() {
        let mut list = SkipList::with_seed(3);
        list.insert(1.0, "x");
        list.insert(2.0, "y");
        list.insert(1.0, "w");
        assert_eq!(
            pairs(&list),
            vec![(1.0, "w".into()), (1.0, "x".into()), (2.0, "y".into())]
        );
        assert_eq!(list.len(), 3);

        assert!(list.delete(1.0, "x"));
        assert_eq!(pairs(&list), vec![(1.0, "w".into()), (2.0, "y".into())]);
        assert_eq!(list.len(), 2);
        assert_well_formed(&list);

        assert!(!list.delete(1.0, "x"));
        assert_eq!(list.len(), 2);
        assert_well_formed(&list);
    }

    #[test]
    fn test_delete_requires_exact_match() {
        let mut list = SkipList::with_seed(4);
        list.insert(1.0, "a");
        list.insert(2.0, "b");
        let before = pairs(&list);

        assert!(!list.delete(1.0, "b"));
        assert!(!list.delete(2.0, "a"));
        assert!(!list.delete(0.5, "a"));
        assert_eq!(pairs(&list), before);
    }

    #[test]
    fn test_round_trip_restores_order() {
        let mut list = SkipList::with_seed(5);
        for i in 0..50 {
            list.insert(f64::from(i % 7), format!("m{}", i));
        }
        let before = pairs(&list);

        list.insert(3.0, "zz");
        assert!(list.delete(3.0, "zz"));

        assert_eq!(pairs(&list), before);
        assert_well_formed(&list);
    }

    #[test]
    fn test_duplicates_coexist() {
        let mut list = SkipList::with_seed(6);
        let first = list.insert(1.0, "dup");
        let second = list.insert(1.0, "dup");
        assert_ne!(first, second);
        assert_eq!(list.len(), 2);
        assert_well_formed(&list);

        assert!(list.delete(1.0, "dup"));
        assert!(list.delete(1.0, "dup"));
        assert!(!list.delete(1.0, "dup"));
        assert!(list.is_empty());
    }

    #[test]
    fn test_rank_of_duplicate_is_first_copy() {
        for seed in 0..200 {
            let mut list = SkipList::with_seed(seed);
            for i in 0..20 {
                list.insert(f64::from(i / 2), format!("m{:02}", i));
            }
            // Ten entries score below 5.0; "dup" sorts before m10 and m11.
            list.insert(5.0, "dup");
            list.insert(5.0, "dup");

            let first = list
                .iter()
                .position(|n| n.score() == 5.0 && n.member() == "dup")
                .map(|pos| pos + 1);
            assert_eq!(first, Some(11), "seed {}", seed);
            assert_eq!(list.rank(5.0, "dup"), first, "seed {}", seed);

            assert!(list.delete(5.0, "dup"));
            assert_eq!(list.rank(5.0, "dup"), first, "seed {}", seed);
            assert!(list.delete(5.0, "dup"));
            assert_eq!(list.rank(5.0, "dup"), None, "seed {}", seed);
            assert_well_formed(&list);
        }
    }

    #[test]
    fn test_rank_and_get_by_rank() {
        let mut list = SkipList::with_seed(7);
        for i in 0..200 {
            list.insert(f64::from(i), format!("m{:03}", i));
        }

        for i in 0..200 {
            let member = format!("m{:03}", i);
            assert_eq!(list.rank(f64::from(i), &member), Some(i as usize + 1));
            let node = list.get_by_rank(i as usize + 1).unwrap();
            assert_eq!(node.member(), member);
        }
        assert_eq!(list.rank(1.0, "missing"), None);
        assert!(list.get_by_rank(0).is_none());
        assert!(list.get_by_rank(201).is_none());

        let tail: Vec<&str> = list.iter_from_rank(198).map(|n| n.member()).collect();
        assert_eq!(tail, ["m197", "m198", "m199"]);
        assert_eq!(list.iter_from_rank(198).len(), 3);
        assert_eq!(list.iter_from_rank(0).count(), 0);
        assert_eq!(list.iter_from_rank(201).count(), 0);
    }

    #[test]
    fn test_handles() {
        let mut list = SkipList::with_seed(8);
        let a = list.insert(1.0, "a");
        let b = list.insert(2.0, "b");

        assert_eq!(list.get(a).map(Node::member), Some("a"));
        assert_eq!(list.get(b).map(Node::score), Some(2.0));
        assert!(list.get(HEADER).is_none());

        list.delete(1.0, "a");
        assert!(list.get(a).is_none());
    }

    #[test]
    fn test_reverse_iteration() {
        let mut list = SkipList::with_seed(9);
        for (score, member) in [(2.0, "b"), (1.0, "a"), (3.0, "c")] {
            list.insert(score, member);
        }

        let members: Vec<&str> = list.iter_rev().map(|n| n.member()).collect();
        assert_eq!(members, ["c", "b", "a"]);
        assert_eq!(list.first().unwrap().member(), "a");
        assert_eq!(list.last().unwrap().member(), "c");

        list.delete(3.0, "c");
        assert_eq!(list.last().unwrap().member(), "b");
        list.delete(1.0, "a");
        assert_eq!(list.first().unwrap().member(), "b");
        assert_eq!(list.iter_rev().len(), 1);
    }

    #[test]
    fn test_first_in_range() {
        let mut list = SkipList::with_seed(10);
        for i in 0..20 {
            list.insert(f64::from(i) * 10.0, format!("m{}", i));
        }

        assert_eq!(list.first_in_range(15.0, 100.0).unwrap().score(), 20.0);
        assert_eq!(list.first_in_range(20.0, 20.0).unwrap().member(), "m2");
        assert!(list.first_in_range(21.0, 29.0).is_none());
        assert!(list.first_in_range(500.0, 600.0).is_none());
        assert!(list.first_in_range(50.0, 10.0).is_none());
    }

    #[test]
    fn test_special_scores_order() {
        let mut list = SkipList::with_seed(11);
        list.insert(f64::NAN, "nan");
        list.insert(f64::INFINITY, "inf");
        list.insert(0.0, "zero");
        list.insert(f64::NEG_INFINITY, "-inf");

        let members: Vec<&str> = list.iter().map(|n| n.member()).collect();
        assert_eq!(members, ["-inf", "zero", "inf", "nan"]);

        assert!(list.delete(f64::NAN, "nan"));
        assert!(list.delete(-0.0, "zero"));
        assert_eq!(list.len(), 2);
        assert_well_formed(&list);
    }

    #[test]
    fn test_level_shrinks_when_emptied() {
        let mut list = SkipList::with_seed(12);
        for i in 0..1000 {
            list.insert(f64::from(i), i.to_string());
        }
        assert!(list.level() > 1);
        assert_well_formed(&list);

        for i in 0..1000 {
            assert!(list.delete(f64::from(i), &i.to_string()));
        }
        assert_eq!(list.len(), 0);
        assert_eq!(list.level(), 1);
        assert_eq!(list.nodes.len(), 1);
        assert_well_formed(&list);
    }

    #[test]
    fn test_level_distribution() {
        let mut list = SkipList::with_seed(13);
        let draws = 100_000;
        let total: usize = (0..draws).map(|_| list.random_level()).sum();
        let mean = total as f64 / draws as f64;
        // Expected 1 / (1 - p) = 1.333...
        assert!((1.30..1.37).contains(&mean), "mean level {}", mean);
    }

    #[test]
    fn test_slots_are_reused() {
        let mut list = SkipList::with_seed(14);
        list.insert(1.0, "keep");
        list.insert(2.0, "gone");
        let arena = list.nodes.len();

        list.delete(2.0, "gone");
        list.insert(3.0, "new");
        assert_eq!(list.nodes.len(), arena);
        assert_well_formed(&list);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Insert(i8, u8),
        Delete(i8, u8),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (any::<i8>(), 0u8..8).prop_map(|(s, m)| Op::Insert(s, m)),
            (any::<i8>(), 0u8..8).prop_map(|(s, m)| Op::Delete(s, m)),
        ]
    }

    proptest! {
        #[test]
        fn prop_matches_sorted_vec(
            seed in any::<u64>(),
            ops in prop::collection::vec(op(), 1..200),
        ) {
            let mut list = SkipList::with_seed(seed);
            let mut model: Vec<(OrderedFloat<f64>, String)> = Vec::new();

            for op in ops {
                match op {
                    Op::Insert(s, m) => {
                        let key = (OrderedFloat(f64::from(s % 16)), format!("m{}", m));
                        list.insert(key.0.into_inner(), key.1.clone());
                        let pos = model.partition_point(|e| *e < key);
                        model.insert(pos, key);
                    }
                    Op::Delete(s, m) => {
                        let key = (OrderedFloat(f64::from(s % 16)), format!("m{}", m));
                        let found = model.iter().position(|e| *e == key);
                        prop_assert_eq!(list.delete(key.0.into_inner(), &key.1), found.is_some());
                        if let Some(pos) = found {
                            model.remove(pos);
                        }
                    }
                }
            }

            let actual: Vec<(OrderedFloat<f64>, String)> = list
                .iter()
                .map(|n| (OrderedFloat(n.score()), n.member().to_string()))
                .collect();
            prop_assert_eq!(&actual, &model);
            assert_well_formed(&list);

            for (i, (score, member)) in model.iter().enumerate() {
                let node = list.get_by_rank(i + 1).unwrap();
                prop_assert_eq!(node.member(), member.as_str());
                prop_assert_eq!(OrderedFloat(node.score()), *score);
            }
        }
    }
}
