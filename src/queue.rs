//! Priority structures used by a level search.
//!
//! - [`Frontier`]: unbounded, pops the best candidate first.
//! - [`ResultCollector`]: bounded to `k`, keeps the best `k` and exposes the
//!   worst one it holds so the search can tighten its bound.
//!
//! Both are built for a fixed [`ScoreOrder`]. Internally every entry carries
//! a rank (the score mapped so larger is better), so a single `Ord` impl
//! serves both directions. Ties on score go to the lower ordinal.

use crate::distance::ScoreOrder;
use serde::{Deserialize, Serialize};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// A scored node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    /// Node ordinal.
    pub ordinal: u32,
    /// Similarity to the query, in the metric's own direction.
    pub score: f32,
}

impl Neighbor {
    /// Create a new neighbor.
    pub fn new(ordinal: u32, score: f32) -> Self {
        Self { ordinal, score }
    }
}

#[derive(Debug, Clone, Copy)]
struct Ranked {
    rank: f32,
    neighbor: Neighbor,
}

impl Ranked {
    fn new(order: ScoreOrder, ordinal: u32, score: f32) -> Self {
        Self {
            rank: order.rank(score),
            neighbor: Neighbor::new(ordinal, score),
        }
    }
}

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked {}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        // Greater = better: higher rank, then lower ordinal.
        self.rank
            .partial_cmp(&other.rank)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.neighbor.ordinal.cmp(&self.neighbor.ordinal))
    }
}

/// Unbounded best-first queue of candidates awaiting expansion.
#[derive(Debug, Clone)]
pub struct Frontier {
    order: ScoreOrder,
    heap: BinaryHeap<Ranked>,
}

impl Frontier {
    /// Create an empty frontier.
    pub fn new(order: ScoreOrder) -> Self {
        Self::with_capacity(order, 0)
    }

    /// Create an empty frontier with room for `capacity` candidates.
    pub fn with_capacity(order: ScoreOrder, capacity: usize) -> Self {
        Self {
            order,
            heap: BinaryHeap::with_capacity(capacity),
        }
    }

    /// Direction this frontier orders by.
    pub fn order(&self) -> ScoreOrder {
        self.order
    }

    /// Add a candidate.
    #[inline]
    pub fn push(&mut self, ordinal: u32, score: f32) {
        self.heap.push(Ranked::new(self.order, ordinal, score));
    }

    /// Remove and return the best candidate.
    #[inline]
    pub fn pop(&mut self) -> Option<Neighbor> {
        self.heap.pop().map(|r| r.neighbor)
    }

    /// Score of the best candidate.
    #[inline]
    pub fn peek_score(&self) -> Option<f32> {
        self.heap.peek().map(|r| r.neighbor.score)
    }

    /// Number of queued candidates.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Returns true if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Drop all candidates, keeping the allocation.
    pub fn clear(&mut self) {
        self.heap.clear();
    }
}

/// Best-of collector with capacity `k`.
///
/// The heap keeps its worst entry on top, so eviction and bound refresh are
/// both O(log k).
#[derive(Debug, Clone)]
pub struct ResultCollector {
    order: ScoreOrder,
    capacity: usize,
    heap: BinaryHeap<Reverse<Ranked>>,
}

impl ResultCollector {
    /// Create an empty collector that holds at most `capacity` entries
    /// after [`insert_with_overflow`](Self::insert_with_overflow).
    pub fn new(order: ScoreOrder, capacity: usize) -> Self {
        Self {
            order,
            capacity,
            heap: BinaryHeap::with_capacity(capacity + 1),
        }
    }

    /// Direction this collector orders by.
    pub fn order(&self) -> ScoreOrder {
        self.order
    }

    /// Configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Add an entry without enforcing capacity.
    ///
    /// Used while seeding from several entry points; call
    /// [`trim`](Self::trim) afterwards.
    pub fn push(&mut self, ordinal: u32, score: f32) {
        self.heap.push(Reverse(Ranked::new(self.order, ordinal, score)));
    }

    /// Insert an entry, evicting the current worst if the collector is full.
    ///
    /// When full, the new entry is kept only if it is strictly better than
    /// the current worst. Returns whether the entry was kept.
    pub fn insert_with_overflow(&mut self, ordinal: u32, score: f32) -> bool {
        if self.heap.len() < self.capacity {
            self.push(ordinal, score);
            return true;
        }

        let candidate = Ranked::new(self.order, ordinal, score);
        match self.heap.peek() {
            Some(Reverse(worst)) if candidate > *worst => {
                self.heap.pop();
                self.heap.push(Reverse(candidate));
                true
            }
            _ => false,
        }
    }

    /// Score of the worst entry held.
    #[inline]
    pub fn worst_score(&self) -> Option<f32> {
        self.heap.peek().map(|Reverse(r)| r.neighbor.score)
    }

    /// Remove and return the worst entry.
    pub fn pop_worst(&mut self) -> Option<Neighbor> {
        self.heap.pop().map(|Reverse(r)| r.neighbor)
    }

    /// Evict worst entries until at most `capacity` remain.
    pub fn trim(&mut self) {
        while self.heap.len() > self.capacity {
            self.heap.pop();
        }
    }

    /// Number of entries held.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Returns true if nothing is held.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Returns true once `capacity` entries are held.
    pub fn is_full(&self) -> bool {
        self.heap.len() >= self.capacity
    }

    /// Consume the collector, returning entries best-first.
    pub fn into_sorted_vec(self) -> Vec<Neighbor> {
        // ascending on Reverse is descending on rank
        self.heap
            .into_sorted_vec()
            .into_iter()
            .map(|Reverse(r)| r.neighbor)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frontier_pops_best_first_higher() {
        let mut frontier = Frontier::new(ScoreOrder::HigherIsBetter);
        frontier.push(1, 0.2);
        frontier.push(2, 0.9);
        frontier.push(3, 0.5);

        assert_eq!(frontier.peek_score(), Some(0.9));
        let order: Vec<u32> = std::iter::from_fn(|| frontier.pop()).map(|n| n.ordinal).collect();
        assert_eq!(order, vec![2, 3, 1]);
    }

    #[test]
    fn test_frontier_pops_best_first_lower() {
        let mut frontier = Frontier::new(ScoreOrder::LowerIsBetter);
        frontier.push(1, 0.2);
        frontier.push(2, 0.9);
        frontier.push(3, 0.5);

        assert_eq!(frontier.peek_score(), Some(0.2));
        let order: Vec<u32> = std::iter::from_fn(|| frontier.pop()).map(|n| n.ordinal).collect();
        assert_eq!(order, vec![1, 3, 2]);
    }

    #[test]
    fn test_frontier_clear() {
        let mut frontier = Frontier::with_capacity(ScoreOrder::HigherIsBetter, 8);
        frontier.push(0, 1.0);
        frontier.clear();
        assert!(frontier.is_empty());
        assert_eq!(frontier.peek_score(), None);
    }

    #[test]
    fn test_tie_prefers_lower_ordinal() {
        let mut frontier = Frontier::new(ScoreOrder::HigherIsBetter);
        frontier.push(7, 0.5);
        frontier.push(3, 0.5);
        assert_eq!(frontier.pop().map(|n| n.ordinal), Some(3));
    }

    #[test]
    fn test_collector_evicts_worst() {
        let mut results = ResultCollector::new(ScoreOrder::LowerIsBetter, 2);
        assert!(results.insert_with_overflow(1, 3.0));
        assert!(results.insert_with_overflow(2, 1.0));
        assert!(results.is_full());
        assert_eq!(results.worst_score(), Some(3.0));

        // not strictly better than the worst
        assert!(!results.insert_with_overflow(3, 3.0));
        assert!(!results.insert_with_overflow(4, 5.0));

        assert!(results.insert_with_overflow(5, 2.0));
        assert_eq!(results.len(), 2);
        assert_eq!(results.worst_score(), Some(2.0));

        let ordinals: Vec<u32> = results.into_sorted_vec().iter().map(|n| n.ordinal).collect();
        assert_eq!(ordinals, vec![2, 5]);
    }

    #[test]
    fn test_collector_push_then_trim() {
        let mut results = ResultCollector::new(ScoreOrder::HigherIsBetter, 2);
        results.push(1, 0.1);
        results.push(2, 0.8);
        results.push(3, 0.5);
        assert_eq!(results.len(), 3);

        results.trim();
        assert_eq!(results.len(), 2);
        let sorted = results.into_sorted_vec();
        assert_eq!(sorted[0], Neighbor::new(2, 0.8));
        assert_eq!(sorted[1], Neighbor::new(3, 0.5));
    }

    #[test]
    fn test_collector_pop_worst() {
        let mut results = ResultCollector::new(ScoreOrder::HigherIsBetter, 3);
        results.insert_with_overflow(1, 0.1);
        results.insert_with_overflow(2, 0.8);
        assert_eq!(results.pop_worst(), Some(Neighbor::new(1, 0.1)));
        assert_eq!(results.pop_worst(), Some(Neighbor::new(2, 0.8)));
        assert_eq!(results.pop_worst(), None);
    }
}
