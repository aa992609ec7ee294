//! Capabilities a search reads from, plus in-memory implementations.
//!
//! The searcher only talks to three small traits:
//! - [`GraphView`]: a seekable adjacency cursor over a multi-level graph,
//! - [`VectorSource`]: random access to stored vectors by ordinal,
//! - [`AcceptFilter`]: which ordinals may appear in results.
//!
//! [`CsrGraph`] stores the levels in CSR (Compressed Sparse Row) form:
//! - `neighbors: Vec<u32>`: every neighbor ID of a level packed contiguously
//! - `offsets: Vec<usize>`: node i's neighbors are at `neighbors[offsets[i]..offsets[i+1]]`
//!
//! Neighbor ordinals are stored as given. A graph that links outside
//! `[0, size)` can be built and is reported as corrupt at search time.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Seekable view over the adjacency lists of a multi-level graph.
///
/// Level 0 holds every node; higher levels hold shrinking subsets. After
/// [`seek`](GraphView::seek), [`next_neighbor`](GraphView::next_neighbor)
/// yields the neighbors of that node at that level until it returns `None`.
/// Order is up to the implementation and duplicates are allowed.
pub trait GraphView {
    /// Number of nodes (ordinals are `[0, size)`).
    fn size(&self) -> usize;

    /// Number of levels. Zero for an empty graph.
    fn num_levels(&self) -> usize;

    /// Node the search starts from at the top level.
    fn entry_node(&self) -> Result<u32>;

    /// Position the cursor on the neighbor list of `ordinal` at `level`.
    fn seek(&mut self, level: usize, ordinal: u32) -> Result<()>;

    /// Next neighbor of the current node, or `None` at the end of the list.
    fn next_neighbor(&mut self) -> Result<Option<u32>>;
}

impl<G: GraphView + ?Sized> GraphView for &mut G {
    fn size(&self) -> usize {
        (**self).size()
    }

    fn num_levels(&self) -> usize {
        (**self).num_levels()
    }

    fn entry_node(&self) -> Result<u32> {
        (**self).entry_node()
    }

    fn seek(&mut self, level: usize, ordinal: u32) -> Result<()> {
        (**self).seek(level, ordinal)
    }

    fn next_neighbor(&mut self) -> Result<Option<u32>> {
        (**self).next_neighbor()
    }
}

/// Random access to stored vectors.
///
/// Every vector has the same [`dimension`](VectorSource::dimension).
pub trait VectorSource {
    /// Dimension of every stored vector.
    fn dimension(&self) -> usize;

    /// Number of stored vectors.
    fn size(&self) -> usize;

    /// Vector stored at `ordinal`.
    fn vector_value(&self, ordinal: u32) -> Result<&[f32]>;
}

/// Restricts which ordinals may be returned.
///
/// A filter never restricts traversal: rejected nodes are still expanded
/// so accepted nodes behind them stay reachable.
pub trait AcceptFilter {
    /// Returns true if `ordinal` may appear in results.
    fn accepts(&self, ordinal: u32) -> bool;
}

impl<F> AcceptFilter for F
where
    F: Fn(u32) -> bool,
{
    fn accepts(&self, ordinal: u32) -> bool {
        self(ordinal)
    }
}

impl AcceptFilter for Vec<bool> {
    fn accepts(&self, ordinal: u32) -> bool {
        self.get(ordinal as usize).copied().unwrap_or(false)
    }
}

impl AcceptFilter for HashSet<u32> {
    fn accepts(&self, ordinal: u32) -> bool {
        self.contains(&ordinal)
    }
}

/// Flat row-major vector storage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemoryVectors {
    dimension: usize,
    data: Vec<f32>,
}

impl InMemoryVectors {
    /// Create an empty store for vectors of `dimension`.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            data: Vec::new(),
        }
    }

    /// Build a store from rows, which must all have the same length.
    pub fn from_rows<I>(rows: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: AsRef<[f32]>,
    {
        let mut rows = rows.into_iter().peekable();
        let dimension = match rows.peek() {
            Some(first) => first.as_ref().len(),
            None => return Err(Error::invalid_arg("rows", "cannot infer dimension from no rows")),
        };

        let mut store = Self::new(dimension);
        for row in rows {
            store.push(row.as_ref())?;
        }
        Ok(store)
    }

    /// Append a vector, returning its ordinal.
    pub fn push(&mut self, vector: &[f32]) -> Result<u32> {
        if vector.len() != self.dimension {
            return Err(Error::WrongDimension {
                expected: self.dimension,
                got: vector.len(),
            });
        }
        let ordinal = self.len() as u32;
        self.data.extend_from_slice(vector);
        Ok(ordinal)
    }

    /// Number of stored vectors.
    pub fn len(&self) -> usize {
        if self.dimension == 0 {
            0
        } else {
            self.data.len() / self.dimension
        }
    }

    /// Returns true if no vectors are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl VectorSource for InMemoryVectors {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn size(&self) -> usize {
        self.len()
    }

    fn vector_value(&self, ordinal: u32) -> Result<&[f32]> {
        let start = ordinal as usize * self.dimension;
        self.data
            .get(start..start + self.dimension)
            .filter(|_| (ordinal as usize) < self.len())
            .ok_or(Error::OrdinalOutOfRange {
                ordinal,
                size: self.len(),
            })
    }
}

/// Immutable multi-level graph in CSR format.
///
/// Use [`CsrGraphBuilder`] to assemble one and [`CsrGraph::view`] to search it.
/// Deserializing checks the same layout the builder produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "CsrParts")]
pub struct CsrGraph {
    /// Number of nodes
    size: usize,
    /// Entry point (a node present at the top level)
    entry_node: u32,
    /// Highest level each node is present at
    node_levels: Vec<u8>,
    /// level_neighbors[l] contains all neighbor IDs for level l
    level_neighbors: Vec<Vec<u32>>,
    /// level_offsets[l][i] is the start index in level_neighbors[l] for node i
    level_offsets: Vec<Vec<usize>>,
}

/// Unchecked serialized form of a [`CsrGraph`].
#[derive(Deserialize)]
struct CsrParts {
    size: usize,
    entry_node: u32,
    node_levels: Vec<u8>,
    level_neighbors: Vec<Vec<u32>>,
    level_offsets: Vec<Vec<usize>>,
}

impl TryFrom<CsrParts> for CsrGraph {
    type Error = Error;

    fn try_from(parts: CsrParts) -> Result<Self> {
        let CsrParts {
            size,
            entry_node,
            node_levels,
            level_neighbors,
            level_offsets,
        } = parts;
        let malformed = |reason: String| Error::invalid_arg("graph", reason);

        if node_levels.len() != size {
            return Err(malformed(format!(
                "{} node levels for {} nodes",
                node_levels.len(),
                size
            )));
        }
        if level_neighbors.len() != level_offsets.len() {
            return Err(malformed(format!(
                "{} neighbor arrays for {} offset arrays",
                level_neighbors.len(),
                level_offsets.len()
            )));
        }

        let num_levels = level_offsets.len();
        if let Some(node) = node_levels.iter().position(|&l| l as usize >= num_levels) {
            return Err(malformed(format!(
                "node {} is at level {} of a {} level graph",
                node, node_levels[node], num_levels
            )));
        }

        for (level, (offsets, neighbors)) in level_offsets.iter().zip(&level_neighbors).enumerate() {
            let bounded = offsets.len() == size + 1
                && offsets.first() == Some(&0)
                && offsets.last() == Some(&neighbors.len());
            if !bounded || offsets.windows(2).any(|w| w[0] > w[1]) {
                return Err(malformed(format!("bad offsets at level {}", level)));
            }
        }

        if size > 0 && node_levels.get(entry_node as usize).map(|&l| l as usize) != Some(num_levels - 1) {
            return Err(malformed(format!(
                "entry node {} is not on top level {}",
                entry_node,
                num_levels - 1
            )));
        }

        Ok(CsrGraph {
            size,
            entry_node,
            node_levels,
            level_neighbors,
            level_offsets,
        })
    }
}

impl CsrGraph {
    /// Number of nodes.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of levels.
    pub fn num_levels(&self) -> usize {
        self.level_offsets.len()
    }

    /// Entry node at the top level.
    pub fn entry_node(&self) -> u32 {
        self.entry_node
    }

    /// Highest level `ordinal` is present at.
    pub fn node_level(&self, ordinal: u32) -> Option<usize> {
        self.node_levels.get(ordinal as usize).map(|&l| l as usize)
    }

    /// Neighbors of `ordinal` at `level`, or `None` if it is absent there.
    pub fn neighbors(&self, level: usize, ordinal: u32) -> Option<&[u32]> {
        if self.node_level(ordinal)? < level {
            return None;
        }
        let offsets = self.level_offsets.get(level)?;
        let node = ordinal as usize;
        Some(&self.level_neighbors[level][offsets[node]..offsets[node + 1]])
    }

    /// A fresh adjacency cursor over this graph.
    pub fn view(&self) -> CsrView<'_> {
        CsrView {
            graph: self,
            cursor: 0,
            end: 0,
            level: 0,
        }
    }
}

/// Adjacency cursor over a [`CsrGraph`].
#[derive(Debug, Clone)]
pub struct CsrView<'a> {
    graph: &'a CsrGraph,
    level: usize,
    cursor: usize,
    end: usize,
}

impl GraphView for CsrView<'_> {
    fn size(&self) -> usize {
        self.graph.size
    }

    fn num_levels(&self) -> usize {
        self.graph.num_levels()
    }

    fn entry_node(&self) -> Result<u32> {
        Ok(self.graph.entry_node)
    }

    fn seek(&mut self, level: usize, ordinal: u32) -> Result<()> {
        let node = ordinal as usize;
        if node >= self.graph.size {
            return Err(Error::OrdinalOutOfRange {
                ordinal,
                size: self.graph.size,
            });
        }
        if level >= self.graph.num_levels() || (self.graph.node_levels[node] as usize) < level {
            return Err(Error::invalid_arg(
                "level",
                format!("node {} is not present at level {}", ordinal, level),
            ));
        }

        let offsets = &self.graph.level_offsets[level];
        self.level = level;
        self.cursor = offsets[node];
        self.end = offsets[node + 1];
        Ok(())
    }

    fn next_neighbor(&mut self) -> Result<Option<u32>> {
        if self.cursor >= self.end {
            return Ok(None);
        }
        let neighbor = self.graph.level_neighbors[self.level][self.cursor];
        self.cursor += 1;
        Ok(Some(neighbor))
    }
}

/// Assembles a [`CsrGraph`] from explicit adjacency lists.
///
/// Every node is present at level 0. Linking a node at level `l` makes it
/// present at every level up to `l`.
///
/// # Example
///
/// ```
/// use hnsw_search::CsrGraphBuilder;
///
/// let mut builder = CsrGraphBuilder::new(3);
/// builder.connect(0, 0, 1).connect(0, 1, 2).connect(1, 0, 2);
/// let graph = builder.build().unwrap();
/// assert_eq!(graph.num_levels(), 2);
/// assert_eq!(graph.entry_node(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct CsrGraphBuilder {
    size: usize,
    node_levels: Vec<u8>,
    /// level -> node -> neighbors
    levels: Vec<Vec<Vec<u32>>>,
    entry_node: Option<u32>,
    /// First `link` that could not be recorded
    rejected: Option<Rejected>,
}

#[derive(Debug, Clone, Copy)]
enum Rejected {
    Ordinal(u32),
    Level(usize),
}

impl CsrGraphBuilder {
    /// Start a graph over ordinals `[0, size)`.
    pub fn new(size: usize) -> Self {
        Self {
            size,
            node_levels: vec![0; size],
            levels: if size == 0 {
                Vec::new()
            } else {
                vec![vec![Vec::new(); size]]
            },
            entry_node: None,
            rejected: None,
        }
    }

    /// Append directed edges `ordinal -> neighbors` at `level`.
    ///
    /// Neighbor ordinals are stored unchecked.
    pub fn link<I>(&mut self, level: usize, ordinal: u32, neighbors: I) -> &mut Self
    where
        I: IntoIterator<Item = u32>,
    {
        if level > u8::MAX as usize {
            self.rejected.get_or_insert(Rejected::Level(level));
            return self;
        }
        if ordinal as usize >= self.size {
            self.rejected.get_or_insert(Rejected::Ordinal(ordinal));
            return self;
        }

        while self.levels.len() <= level {
            self.levels.push(vec![Vec::new(); self.size]);
        }
        let top = &mut self.node_levels[ordinal as usize];
        *top = (*top).max(level as u8);
        self.levels[level][ordinal as usize].extend(neighbors);
        self
    }

    /// Add edges in both directions between `a` and `b` at `level`.
    pub fn connect(&mut self, level: usize, a: u32, b: u32) -> &mut Self {
        self.link(level, a, [b]).link(level, b, [a])
    }

    /// Use `ordinal` as the entry node instead of the default.
    ///
    /// The default is the lowest ordinal present at the top level.
    pub fn entry_node(&mut self, ordinal: u32) -> &mut Self {
        self.entry_node = Some(ordinal);
        self
    }

    /// Build the final graph.
    ///
    /// Converts the per-node lists into the compact CSR format.
    pub fn build(&self) -> Result<CsrGraph> {
        match self.rejected {
            Some(Rejected::Ordinal(ordinal)) => {
                return Err(Error::invalid_arg(
                    "ordinal",
                    format!("linked node {} outside graph of size {}", ordinal, self.size),
                ));
            }
            Some(Rejected::Level(level)) => {
                return Err(Error::invalid_arg(
                    "level",
                    format!("level {} exceeds the maximum of {}", level, u8::MAX),
                ));
            }
            None => {}
        }

        let top_level = self.levels.len().saturating_sub(1);
        let entry_node = match self.entry_node {
            Some(entry) => {
                let present = self
                    .node_levels
                    .get(entry as usize)
                    .is_some_and(|&l| l as usize == top_level);
                if !present {
                    return Err(Error::invalid_arg(
                        "entry_node",
                        format!("node {} is not present at top level {}", entry, top_level),
                    ));
                }
                entry
            }
            None => self
                .node_levels
                .iter()
                .position(|&l| l as usize == top_level)
                .unwrap_or(0) as u32,
        };

        let mut level_neighbors = Vec::with_capacity(self.levels.len());
        let mut level_offsets = Vec::with_capacity(self.levels.len());
        for lists in &self.levels {
            let mut neighbors = Vec::with_capacity(lists.iter().map(Vec::len).sum());
            let mut offsets = Vec::with_capacity(self.size + 1);
            offsets.push(0);
            for list in lists {
                neighbors.extend_from_slice(list);
                offsets.push(neighbors.len());
            }
            level_neighbors.push(neighbors);
            level_offsets.push(offsets);
        }

        Ok(CsrGraph {
            size: self.size,
            entry_node,
            node_levels: self.node_levels.clone(),
            level_neighbors,
            level_offsets,
        })
    }
}
