//! Pool of reusable searchers for concurrent queries.
//!
//! A [`GraphSearcher`] owns mutable scratch state and serves one query at a
//! time. The pool hands each query its own searcher and takes it back
//! afterwards, so the scratch allocations survive across queries while a
//! shared `&SearcherPool` can be used from many threads.

use crate::distance::SimilarityFunction;
use crate::error::Result;
use crate::graph::{AcceptFilter, GraphView, VectorSource};
use crate::searcher::{GraphSearcher, SearchParams, SearchResults};
use parking_lot::Mutex;

/// Default number of idle searchers kept.
pub const DEFAULT_MAX_IDLE: usize = 64;

/// Thread-safe pool of [`GraphSearcher`]s sharing one metric.
#[derive(Debug)]
pub struct SearcherPool<S> {
    similarity: S,
    capacity_hint: usize,
    max_idle: usize,
    idle: Mutex<Vec<GraphSearcher<S>>>,
}

impl<S: SimilarityFunction + Clone> SearcherPool<S> {
    /// Create an empty pool.
    pub fn new(similarity: S) -> Self {
        Self {
            similarity,
            capacity_hint: 0,
            max_idle: DEFAULT_MAX_IDLE,
            idle: Mutex::new(Vec::new()),
        }
    }

    /// Size new searchers' visited sets for `capacity` ordinals up front.
    pub fn with_capacity_hint(mut self, capacity: usize) -> Self {
        self.capacity_hint = capacity;
        self
    }

    /// Keep at most `max_idle` searchers between queries.
    pub fn with_max_idle(mut self, max_idle: usize) -> Self {
        self.max_idle = max_idle;
        self
    }

    /// Number of searchers currently idle in the pool.
    pub fn idle(&self) -> usize {
        self.idle.lock().len()
    }

    fn checkout(&self) -> GraphSearcher<S> {
        let pooled = self.idle.lock().pop();
        pooled.unwrap_or_else(|| GraphSearcher::with_capacity(self.similarity.clone(), self.capacity_hint))
    }

    fn checkin(&self, searcher: GraphSearcher<S>) {
        let mut idle = self.idle.lock();
        if idle.len() < self.max_idle {
            idle.push(searcher);
        }
    }

    /// Run [`GraphSearcher::search`] on a pooled searcher.
    pub fn search<V, G>(
        &self,
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

    /// Run [`GraphSearcher::search_with`] on a pooled searcher.
    ///
    /// The searcher goes back to the pool whether or not the search failed;
    /// its scratch state is reset by the next search anyway.
    pub fn search_with<V, G>(
        &self,
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
        let mut searcher = self.checkout();
        let result = searcher.search_with(query, params, vectors, graph, accept);
        self.checkin(searcher);
        result
    }
}
