//! Query-time search over a hierarchical navigable small world graph.
//!
//! A search runs in two phases:
//! - Greedy descent: from the entry node at the top level down to level 1,
//!   each level is searched with a beam of one and the best node found
//!   becomes the entry point of the level below.
//! - Beam search at level 0 with the full beam width and the caller's
//!   [`AcceptFilter`].
//!
//! The frontier and visited set live in a [`SearchContext`] owned by the
//! searcher and are reset, not reallocated, at the start of every level.
//! A [`GraphSearcher`] is therefore single-threaded; use one per thread or
//! a [`SearcherPool`](crate::SearcherPool).

use crate::bounds::BoundsChecker;
use crate::distance::SimilarityFunction;
use crate::error::{Error, Result};
use crate::graph::{AcceptFilter, GraphView, VectorSource};
use crate::queue::{Frontier, Neighbor, ResultCollector};
use crate::visited::VisitedSet;
use serde::{Deserialize, Serialize};

/// Parameters of a top-level search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchParams {
    /// Number of results to return.
    pub top_k: usize,
    /// Beam width at level 0. Values below `top_k` are raised to `top_k`;
    /// `None` searches with a beam of exactly `top_k`.
    #[serde(default)]
    pub ef: Option<usize>,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self { top_k: 10, ef: None }
    }
}

impl SearchParams {
    /// Parameters returning `top_k` results with a beam of `top_k`.
    pub fn new(top_k: usize) -> Self {
        Self { top_k, ef: None }
    }

    /// Set the level-0 beam width.
    pub fn with_ef(mut self, ef: usize) -> Self {
        self.ef = Some(ef);
        self
    }

    /// Collector capacity used at level 0.
    pub fn beam_width(&self) -> usize {
        self.ef.map_or(self.top_k, |ef| ef.max(self.top_k))
    }

    /// Reject parameters no search can run with.
    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            return Err(Error::invalid_arg("top_k", "must be at least 1"));
        }
        if self.ef == Some(0) {
            return Err(Error::invalid_arg("ef", "must be at least 1"));
        }
        Ok(())
    }
}

/// Results of a search, best first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    neighbors: Vec<Neighbor>,
    visited: usize,
}

impl SearchResults {
    /// Wrap best-first neighbors and the visited count that produced them.
    pub fn new(neighbors: Vec<Neighbor>, visited: usize) -> Self {
        Self { neighbors, visited }
    }

    /// Matches, best first.
    pub fn neighbors(&self) -> &[Neighbor] {
        &self.neighbors
    }

    /// Consume into the matches, best first.
    pub fn into_neighbors(self) -> Vec<Neighbor> {
        self.neighbors
    }

    /// Approximate number of nodes visited by the level search that
    /// produced these results. Diagnostic only.
    pub fn visited(&self) -> usize {
        self.visited
    }

    /// Best match, if any.
    pub fn best(&self) -> Option<Neighbor> {
        self.neighbors.first().copied()
    }

    /// Ordinals of the matches, best first.
    pub fn ordinals(&self) -> Vec<u32> {
        self.neighbors.iter().map(|n| n.ordinal).collect()
    }

    /// Iterate over matches, best first.
    pub fn iter(&self) -> std::slice::Iter<'_, Neighbor> {
        self.neighbors.iter()
    }

    /// Number of matches.
    pub fn len(&self) -> usize {
        self.neighbors.len()
    }

    /// Returns true if nothing matched.
    pub fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }

    fn truncate(&mut self, len: usize) {
        self.neighbors.truncate(len);
    }
}

impl IntoIterator for SearchResults {
    type Item = Neighbor;
    type IntoIter = std::vec::IntoIter<Neighbor>;

    fn into_iter(self) -> Self::IntoIter {
        self.neighbors.into_iter()
    }
}

impl<'a> IntoIterator for &'a SearchResults {
    type Item = &'a Neighbor;
    type IntoIter = std::slice::Iter<'a, Neighbor>;

    fn into_iter(self) -> Self::IntoIter {
        self.neighbors.iter()
    }
}

/// Reusable scratch state for level searches.
#[derive(Debug)]
pub struct SearchContext {
    frontier: Frontier,
    visited: VisitedSet,
}

impl SearchContext {
    /// Create scratch state sized for `capacity` ordinals.
    pub fn new(frontier: Frontier, capacity: usize) -> Self {
        Self {
            frontier,
            visited: VisitedSet::new(capacity),
        }
    }

    /// Clear both structures in place and make room for `capacity` ordinals.
    pub fn reset(&mut self, capacity: usize) {
        self.frontier.clear();
        self.visited.ensure_capacity(capacity);
        self.visited.clear();
    }

    /// Current visited set.
    pub fn visited(&self) -> &VisitedSet {
        &self.visited
    }
}

/// Searches a graph for the nearest neighbors of a query vector.
///
/// # Example
///
/// ```
/// use hnsw_search::{CsrGraphBuilder, Distance, GraphSearcher, InMemoryVectors};
///
/// let vectors = InMemoryVectors::from_rows([[0.0f32, 0.0], [1.0, 0.0], [2.0, 0.0]]).unwrap();
/// let mut builder = CsrGraphBuilder::new(3);
/// builder.connect(0, 0, 1).connect(0, 1, 2);
/// let graph = builder.build().unwrap();
///
/// let mut searcher = GraphSearcher::new(Distance::Euclidean);
/// let results = searcher
///     .search(&[1.9, 0.0], 1, &vectors, &mut graph.view(), None)
///     .unwrap();
/// assert_eq!(results.ordinals(), vec![2]);
/// ```
#[derive(Debug)]
pub struct GraphSearcher<S> {
    similarity: S,
    context: SearchContext,
}

impl<S: SimilarityFunction> GraphSearcher<S> {
    /// Create a searcher for the given metric.
    pub fn new(similarity: S) -> Self {
        Self::with_capacity(similarity, 0)
    }

    /// Create a searcher whose visited set already covers `capacity` ordinals.
    pub fn with_capacity(similarity: S, capacity: usize) -> Self {
        let frontier = Frontier::new(similarity.order());
        Self {
            similarity,
            context: SearchContext::new(frontier, capacity),
        }
    }

    /// Metric this searcher scores with.
    pub fn similarity(&self) -> &S {
        &self.similarity
    }

    /// Find the `k` nearest neighbors of `query`.
    ///
    /// Returns fewer than `k` results when fewer accepted nodes are
    /// reachable, and no results for an empty graph.
    pub fn search<V, G>(
        &mut self,
        query: &[f32],
        k: usize,
        vectors: &V,
        graph: &mut G,
        accept: Option<&dyn AcceptFilter>,
    ) -> Result<SearchResults>
    where
        V: VectorSource + ?Sized,
        G: GraphView + ?Sized,
    {
        self.search_with(query, &SearchParams::new(k), vectors, graph, accept)
    }

    /// Find nearest neighbors of `query` as configured by `params`.
    pub fn search_with<V, G>(
        &mut self,
        query: &[f32],
        params: &SearchParams,
        vectors: &V,
        graph: &mut G,
        accept: Option<&dyn AcceptFilter>,
    ) -> Result<SearchResults>
    where
        V: VectorSource + ?Sized,
        G: GraphView + ?Sized,
    {
        params.validate()?;
        validate_query(query, vectors.dimension())?;

        let num_levels = graph.num_levels();
        if graph.size() == 0 || num_levels == 0 {
            return Ok(SearchResults::default());
        }

        let mut entry = graph.entry_node()?;
        for level in (1..num_levels).rev() {
            let coarse = self.search_level(query, 1, level, &[entry], vectors, graph, None)?;
            if let Some(best) = coarse.best() {
                tracing::trace!(level, entry = best.ordinal, score = best.score, "descended level");
                entry = best.ordinal;
            }
        }

        let beam_width = params.beam_width();
        let mut results = self.search_level(query, beam_width, 0, &[entry], vectors, graph, accept)?;
        results.truncate(params.top_k);

        tracing::debug!(
            top_k = params.top_k,
            beam_width,
            found = results.len(),
            visited = results.visited(),
            "graph search complete"
        );
        Ok(results)
    }

    /// Beam search of a single level.
    ///
    /// Starts from `entry_points` and keeps the best `k` accepted nodes.
    /// Traversal is pruned only by the score bound: nodes rejected by
    /// `accept` are still expanded. The visited set and frontier are reset
    /// on entry, so calls must not overlap on one searcher.
    #[allow(clippy::too_many_arguments)]
    pub fn search_level<V, G>(
        &mut self,
        query: &[f32],
        k: usize,
        level: usize,
        entry_points: &[u32],
        vectors: &V,
        graph: &mut G,
        accept: Option<&dyn AcceptFilter>,
    ) -> Result<SearchResults>
    where
        V: VectorSource + ?Sized,
        G: GraphView + ?Sized,
    {
        if k == 0 {
            return Err(Error::invalid_arg("k", "must be at least 1"));
        }
        validate_query(query, vectors.dimension())?;

        let size = graph.size();
        let order = self.similarity.order();
        let accepts = |ordinal: u32| accept.map_or(true, |filter| filter.accepts(ordinal));

        self.context.reset(size);
        let similarity = &self.similarity;
        let SearchContext { frontier, visited } = &mut self.context;
        let mut results = ResultCollector::new(order, k);

        for &entry in entry_points {
            if entry as usize >= size {
                tracing::error!(entry, size, level, "entry point outside graph");
                return Err(Error::CorruptEntryNode { entry, size });
            }
            if visited.get_and_set(entry) {
                continue;
            }
            let score = similarity.compare(query, vectors.vector_value(entry)?);
            frontier.push(entry, score);
            if accepts(entry) {
                results.push(entry, score);
            }
        }

        // worst score still acceptable once the collector is full
        let mut bounds = BoundsChecker::new(order);
        if results.len() >= k {
            if let Some(worst) = results.worst_score() {
                bounds.set(worst);
            }
        }

        while let Some(best_score) = frontier.peek_score() {
            // frontier is best-first: if its head cannot beat the bound, nothing can
            if bounds.check(best_score) {
                break;
            }
            let Some(candidate) = frontier.pop() else {
                break;
            };

            graph.seek(level, candidate.ordinal)?;
            while let Some(neighbor) = graph.next_neighbor()? {
                if neighbor as usize >= size {
                    tracing::error!(level, node = candidate.ordinal, neighbor, size, "neighbor outside graph");
                    return Err(Error::CorruptGraph {
                        level,
                        node: candidate.ordinal,
                        neighbor,
                        size,
                    });
                }
                if visited.get_and_set(neighbor) {
                    continue;
                }

                let score = similarity.compare(query, vectors.vector_value(neighbor)?);
                if bounds.check(score) {
                    continue;
                }
                frontier.push(neighbor, score);
                if accepts(neighbor) && results.insert_with_overflow(neighbor, score) && results.is_full() {
                    if let Some(worst) = results.worst_score() {
                        bounds.set(worst);
                    }
                }
            }
        }

        results.trim();
        Ok(SearchResults::new(
            results.into_sorted_vec(),
            visited.approximate_cardinality(),
        ))
    }
}

fn validate_query(query: &[f32], dimension: usize) -> Result<()> {
    if query.is_empty() {
        return Err(Error::invalid_arg("query", "must not be empty"));
    }
    if query.len() != dimension {
        return Err(Error::WrongDimension {
            expected: dimension,
            got: query.len(),
        });
    }
    if query.iter().any(|x| !x.is_finite()) {
        return Err(Error::invalid_arg("query", "contains non-finite values"));
    }
    Ok(())
}
