//! Similarity metrics and score direction.
//!
//! Every component that orders scores (the frontier, the result collector,
//! the bounds checker) is parameterized by a [`ScoreOrder`] taken from the
//! [`SimilarityFunction`] in use. The built-in [`Distance`] metrics use the
//! `wide` crate for portable 8-lane SIMD.
//!
//! # Metrics
//!
//! - **DotProduct**: higher is better, unbounded.
//! - **Cosine**: higher is better, range [-1, 1].
//! - **Euclidean**: squared L2 distance, lower is better.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use wide::f32x8;

/// Direction in which scores improve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScoreOrder {
    /// Larger scores are more similar (dot product, cosine).
    HigherIsBetter,
    /// Smaller scores are more similar (distances).
    LowerIsBetter,
}

impl ScoreOrder {
    /// Map a score onto a scale where larger always means better.
    #[inline]
    pub fn rank(self, score: f32) -> f32 {
        match self {
            ScoreOrder::HigherIsBetter => score,
            ScoreOrder::LowerIsBetter => -score,
        }
    }

    /// Compare two scores; `Greater` means `a` is the better one.
    #[inline]
    pub fn compare(self, a: f32, b: f32) -> Ordering {
        self.rank(a)
            .partial_cmp(&self.rank(b))
            .unwrap_or(Ordering::Equal)
    }

    /// Returns true if `a` is strictly better than `b`.
    #[inline]
    pub fn is_better(self, a: f32, b: f32) -> bool {
        self.compare(a, b) == Ordering::Greater
    }
}

/// Scores a pair of vectors.
///
/// The [`order`](SimilarityFunction::order) is fixed per metric and decides
/// the ordering of every queue and bound used during a search.
pub trait SimilarityFunction {
    /// Score `a` against `b`. Both slices have the same length.
    fn compare(&self, a: &[f32], b: &[f32]) -> f32;

    /// Direction in which scores returned by `compare` improve.
    fn order(&self) -> ScoreOrder;
}

impl<S: SimilarityFunction + ?Sized> SimilarityFunction for &S {
    fn compare(&self, a: &[f32], b: &[f32]) -> f32 {
        (**self).compare(a, b)
    }

    fn order(&self) -> ScoreOrder {
        (**self).order()
    }
}

/// Built-in similarity metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Distance {
    /// Dot product: sum(a[i] * b[i]). Higher is more similar.
    DotProduct,
    /// Cosine similarity: dot(a, b) / (||a|| * ||b||). Range [-1, 1].
    Cosine,
    /// Squared Euclidean distance: sum((a[i] - b[i])^2). Lower is more similar.
    Euclidean,
}

impl Distance {
    /// Returns true if higher scores indicate greater similarity.
    pub fn higher_is_better(&self) -> bool {
        self.order() == ScoreOrder::HigherIsBetter
    }
}

impl SimilarityFunction for Distance {
    fn compare(&self, a: &[f32], b: &[f32]) -> f32 {
        debug_assert_eq!(a.len(), b.len());
        match self {
            Distance::DotProduct => dot_product(a, b),
            Distance::Cosine => cosine_similarity(a, b),
            Distance::Euclidean => squared_euclidean(a, b),
        }
    }

    fn order(&self) -> ScoreOrder {
        match self {
            Distance::DotProduct | Distance::Cosine => ScoreOrder::HigherIsBetter,
            Distance::Euclidean => ScoreOrder::LowerIsBetter,
        }
    }
}

#[inline]
fn lanes(chunk: &[f32]) -> f32x8 {
    let mut buf = [0.0f32; 8];
    buf.copy_from_slice(chunk);
    f32x8::from(buf)
}

#[inline]
fn horizontal_sum(v: f32x8) -> f32 {
    v.to_array().iter().sum()
}

/// Dot product, 8 lanes at a time with a scalar tail.
pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());

    let a_chunks = a.chunks_exact(8);
    let b_chunks = b.chunks_exact(8);
    let tail: f32 = a_chunks
        .remainder()
        .iter()
        .zip(b_chunks.remainder())
        .map(|(x, y)| x * y)
        .sum();

    let acc = a_chunks
        .zip(b_chunks)
        .fold(f32x8::ZERO, |acc, (ca, cb)| acc + lanes(ca) * lanes(cb));

    horizontal_sum(acc) + tail
}

/// Cosine similarity. Returns 0.0 if either vector has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let norm_a = dot_product(a, a).sqrt();
    let norm_b = dot_product(b, b).sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot_product(a, b) / (norm_a * norm_b)
    }
}

/// Squared L2 distance, 8 lanes at a time with a scalar tail.
pub fn squared_euclidean(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());

    let a_chunks = a.chunks_exact(8);
    let b_chunks = b.chunks_exact(8);
    let tail: f32 = a_chunks
        .remainder()
        .iter()
        .zip(b_chunks.remainder())
        .map(|(x, y)| (x - y) * (x - y))
        .sum();

    let acc = a_chunks.zip(b_chunks).fold(f32x8::ZERO, |acc, (ca, cb)| {
        let diff = lanes(ca) - lanes(cb);
        acc + diff * diff
    });

    horizontal_sum(acc) + tail
}

/// Scalar reference implementations.
pub mod scalar {
    /// Scalar dot product.
    pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    /// Scalar squared Euclidean distance.
    pub fn squared_euclidean(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
    }
}
