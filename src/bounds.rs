//! Early-termination predicate for beam search.

use crate::distance::ScoreOrder;

/// Tracks the worst score still acceptable into a full result collector.
///
/// Until a bound is set nothing is rejected. Once set, a score is rejected
/// when it is strictly worse than the bound: `score < bound` for
/// [`ScoreOrder::HigherIsBetter`], `score > bound` for
/// [`ScoreOrder::LowerIsBetter`]. A score equal to the bound passes, so a
/// search seeded with a single entry point can still move off it.
#[derive(Debug, Clone, Copy)]
pub struct BoundsChecker {
    order: ScoreOrder,
    bound: Option<f32>,
}

impl BoundsChecker {
    /// Create an unset checker for the given direction.
    pub fn new(order: ScoreOrder) -> Self {
        Self { order, bound: None }
    }

    /// Replace the current bound.
    #[inline]
    pub fn set(&mut self, bound: f32) {
        self.bound = Some(bound);
    }

    /// Remove the bound so nothing is rejected.
    pub fn unset(&mut self) {
        self.bound = None;
    }

    /// Current bound, if any.
    pub fn bound(&self) -> Option<f32> {
        self.bound
    }

    /// Direction this checker compares in.
    pub fn order(&self) -> ScoreOrder {
        self.order
    }

    /// Returns true if `score` is worse than the bound and should be discarded.
    #[inline]
    pub fn check(&self, score: f32) -> bool {
        match self.bound {
            None => false,
            Some(bound) => self.order.is_better(bound, score),
        }
    }
}
