//! hnsw-search - query-time search over HNSW graphs
//!
//! Finds the top-K most similar stored vectors to a query by walking a
//! hierarchical navigable small world graph: a greedy descent through the
//! sparse upper levels followed by a bounded best-first beam search over
//! level 0.
//!
//! The crate owns the search only. Graph storage, vector storage and
//! result filtering come in through the [`GraphView`], [`VectorSource`] and
//! [`AcceptFilter`] traits; [`CsrGraph`] and [`InMemoryVectors`] are
//! in-memory implementations of the first two.
//!
//! # Example
//!
//! ```
//! use hnsw_search::{search, CsrGraphBuilder, Distance, InMemoryVectors};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let vectors = InMemoryVectors::from_rows([
//!     [0.0f32, 0.0],
//!     [1.0, 0.0],
//!     [0.0, 1.0],
//!     [1.0, 1.0],
//! ])?;
//!
//! let mut builder = CsrGraphBuilder::new(4);
//! builder
//!     .connect(0, 0, 1)
//!     .connect(0, 0, 2)
//!     .connect(0, 1, 3)
//!     .connect(0, 2, 3)
//!     .connect(1, 0, 3);
//! let graph = builder.build()?;
//!
//! // only odd ordinals may be returned; even ones are still traversed
//! let odd = |ordinal: u32| ordinal % 2 == 1;
//! let results = search(&[0.9, 0.9], 2, &vectors, Distance::Euclidean, &mut graph.view(), Some(&odd))?;
//! assert_eq!(results.ordinals(), vec![3, 1]);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod bounds;
pub mod distance;
pub mod error;
pub mod graph;
pub mod pool;
pub mod queue;
pub mod searcher;
pub mod visited;

pub use bounds::BoundsChecker;
pub use distance::{Distance, ScoreOrder, SimilarityFunction};
pub use error::{Error, Result};
pub use graph::{AcceptFilter, CsrGraph, CsrGraphBuilder, CsrView, GraphView, InMemoryVectors, VectorSource};
pub use pool::SearcherPool;
pub use queue::{Frontier, Neighbor, ResultCollector};
pub use searcher::{GraphSearcher, SearchContext, SearchParams, SearchResults};
pub use visited::VisitedSet;

/// Find the `k` nearest neighbors of `query` with a fresh searcher.
///
/// Convenience for one-off queries. Repeated queries should reuse a
/// [`GraphSearcher`] or a [`SearcherPool`] to keep scratch allocations.
pub fn search<V, S, G>(
    query: &[f32],
    k: usize,
    vectors: &V,
    similarity: S,
    graph: &mut G,
    accept: Option<&dyn AcceptFilter>,
) -> Result<SearchResults>
where
    V: VectorSource + ?Sized,
    S: SimilarityFunction,
    G: GraphView + ?Sized,
{
    let capacity = graph.size();
    GraphSearcher::with_capacity(similarity, capacity).search(query, k, vectors, graph, accept)
}
