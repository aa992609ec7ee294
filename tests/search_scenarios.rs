//! Search Scenarios
//!
//! End-to-end searches over hand-built graphs:
//! - Exact match on a single fully connected level
//! - Multi-level descent through coarse shortcuts
//! - Filters with fewer accepted nodes than requested
//! - Recall against brute force on a k-NN graph

use hnsw_search::{
    search, CsrGraph, CsrGraphBuilder, Distance, Error, GraphSearcher, InMemoryVectors,
    SearchParams, SimilarityFunction,
};
use std::collections::HashSet;

/// Points 0..n on a line, chained at level 0.
fn line_graph(n: u32) -> (InMemoryVectors, CsrGraph) {
    let vectors = InMemoryVectors::from_rows((0..n).map(|i| [i as f32])).unwrap();
    let mut builder = CsrGraphBuilder::new(n as usize);
    for i in 1..n {
        builder.connect(0, i - 1, i);
    }
    (vectors, builder.build().unwrap())
}

fn fully_connected(n: u32) -> CsrGraph {
    let mut builder = CsrGraphBuilder::new(n as usize);
    for a in 0..n {
        builder.link(0, a, (0..n).filter(|&b| b != a));
    }
    builder.build().unwrap()
}

fn random_vectors(rng: &mut fastrand::Rng, count: usize, dim: usize) -> Vec<Vec<f32>> {
    (0..count)
        .map(|_| (0..dim).map(|_| rng.f32() * 2.0 - 1.0).collect())
        .collect()
}

fn brute_force(vectors: &[Vec<f32>], query: &[f32], metric: Distance) -> Vec<(u32, f32)> {
    let mut scored: Vec<(u32, f32)> = vectors
        .iter()
        .enumerate()
        .map(|(i, v)| (i as u32, metric.compare(query, v)))
        .collect();
    scored.sort_by(|a, b| metric.order().compare(b.1, a.1));
    scored
}

#[test]
fn test_exact_match_single_level_euclidean() {
    let vectors = InMemoryVectors::from_rows([
        [0.0f32, 0.0, 0.0],
        [1.0, 0.0, 0.0],
        [0.3, 0.8, 0.1],
        [0.0, 0.0, 1.0],
        [0.5, 0.5, 0.5],
    ])
    .unwrap();
    let graph = fully_connected(5);
    assert_eq!(graph.num_levels(), 1);

    let query = [0.3, 0.8, 0.1];
    let results = search(&query, 1, &vectors, Distance::Euclidean, &mut graph.view(), None).unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results.neighbors()[0].ordinal, 2);
    assert_eq!(results.neighbors()[0].score, 0.0);
}

#[test]
fn test_exact_match_single_level_cosine() {
    let angles = [0.0f32, 0.7, 1.3, 2.1, 2.9];
    let vectors = InMemoryVectors::from_rows(angles.iter().map(|a| [a.cos(), a.sin()])).unwrap();
    let graph = fully_connected(5);

    let query = [angles[2].cos(), angles[2].sin()];
    let results = search(&query, 1, &vectors, Distance::Cosine, &mut graph.view(), None).unwrap();

    assert_eq!(results.ordinals(), vec![2]);
    assert!((results.neighbors()[0].score - 1.0).abs() < 1e-5);
}

#[test]
fn test_descent_through_coarse_levels() {
    // level 0: chain over 0..100
    // level 1: chain over multiples of 10
    // level 2: 0 - 50 - 90
    let (vectors, _) = line_graph(100);
    let mut builder = CsrGraphBuilder::new(100);
    for i in 1..100 {
        builder.connect(0, i - 1, i);
    }
    for i in (10..100).step_by(10) {
        builder.connect(1, i - 10, i);
    }
    builder.connect(2, 0, 50).connect(2, 50, 90);
    let graph = builder.build().unwrap();
    assert_eq!(graph.num_levels(), 3);
    assert_eq!(graph.entry_node(), 0);

    let results = search(&[87.3], 1, &vectors, Distance::Euclidean, &mut graph.view(), None).unwrap();
    assert_eq!(results.ordinals(), vec![87]);
    // level 0 only explores the neighborhood of the descended entry point
    assert!(results.visited() <= 10, "visited {}", results.visited());

    // the same query without shortcuts has to walk the whole chain
    let (flat_vectors, flat) = line_graph(100);
    let walked = search(&[87.3], 1, &flat_vectors, Distance::Euclidean, &mut flat.view(), None).unwrap();
    assert_eq!(walked.ordinals(), vec![87]);
    assert!(walked.visited() > results.visited());
}

#[test]
fn test_fewer_accepted_than_requested() {
    let (vectors, graph) = line_graph(50);
    let accepted: HashSet<u32> = [3, 8, 15, 22, 30, 41, 49].into_iter().collect();

    let results = search(&[20.0], 100, &vectors, Distance::Euclidean, &mut graph.view(), Some(&accepted)).unwrap();

    assert_eq!(results.len(), 7);
    let found: HashSet<u32> = results.ordinals().into_iter().collect();
    assert_eq!(found, accepted);
    assert_eq!(results.ordinals()[..3], [22, 15, 30]);
    assert_eq!(results.visited(), 50);
}

#[test]
fn test_filter_rejecting_everything() {
    let (vectors, graph) = line_graph(10);
    let nothing = |_: u32| false;
    let results = search(&[4.0], 3, &vectors, Distance::Euclidean, &mut graph.view(), Some(&nothing)).unwrap();
    assert!(results.is_empty());
    assert_eq!(results.visited(), 10);
}

#[test]
fn test_filter_with_bool_mask() {
    let (vectors, graph) = line_graph(10);
    let mask: Vec<bool> = (0..10).map(|i| i % 3 == 0).collect();
    let results = search(&[4.0], 2, &vectors, Distance::Euclidean, &mut graph.view(), Some(&mask)).unwrap();
    assert_eq!(results.ordinals(), vec![3, 6]);
}

#[test]
fn test_corrupt_graph_is_reported() {
    let vectors = InMemoryVectors::from_rows([[0.0f32], [1.0], [2.0], [3.0]]).unwrap();
    let mut builder = CsrGraphBuilder::new(4);
    builder.connect(0, 0, 1).link(0, 1, [2, 40]).link(0, 2, [1, 3]);
    let graph = builder.build().unwrap();

    let err = search(&[3.0], 2, &vectors, Distance::Euclidean, &mut graph.view(), None).unwrap_err();
    assert!(matches!(err, Error::CorruptGraph { neighbor: 40, node: 1, .. }));
}

#[test]
fn test_empty_graph_is_not_an_error() {
    let vectors = InMemoryVectors::new(4);
    let graph = CsrGraphBuilder::new(0).build().unwrap();
    let results = search(&[0.0; 4], 5, &vectors, Distance::DotProduct, &mut graph.view(), None).unwrap();
    assert!(results.is_empty());
}

#[test]
fn test_knn_graph_recall() {
    let dim = 8;
    let count = 500;
    let neighbors = 10;
    let mut rng = fastrand::Rng::with_seed(42);
    let rows = random_vectors(&mut rng, count, dim);
    let vectors = InMemoryVectors::from_rows(&rows).unwrap();

    // bidirectional k-NN graph at level 0, a sparse sample of it at level 1
    let mut builder = CsrGraphBuilder::new(count);
    for (i, row) in rows.iter().enumerate() {
        for &(j, _) in brute_force(&rows, row, Distance::Euclidean).iter().skip(1).take(neighbors) {
            builder.connect(0, i as u32, j);
        }
    }
    let upper: Vec<u32> = (0..count as u32).step_by(16).collect();
    for (pos, &a) in upper.iter().enumerate() {
        for &b in upper.iter().skip(pos + 1) {
            builder.connect(1, a, b);
        }
    }
    let graph = builder.build().unwrap();

    let mut searcher = GraphSearcher::with_capacity(Distance::Euclidean, count);
    let params = SearchParams::new(10).with_ef(64);
    let queries = random_vectors(&mut rng, 50, dim);

    let mut hits = 0;
    for query in &queries {
        let exact = brute_force(&rows, query, Distance::Euclidean)[0].0;
        let results = searcher
            .search_with(query, &params, &vectors, &mut graph.view(), None)
            .unwrap();
        assert_eq!(results.len(), 10);
        if results.ordinals().contains(&exact) {
            hits += 1;
        }
    }

    let recall = hits as f32 / queries.len() as f32;
    assert!(recall >= 0.9, "recall {} is too low", recall);
}
