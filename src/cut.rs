//! The λ−1 cut objective and its incremental move gains.
//!
//! For an edge of weight `w` whose ends occupy λ distinct parts, the λ−1
//! cut is `w · (λ−1)`. On a graph this is the classic edge cut: an edge
//! counts iff its two ends are in different parts.
//!
//! Gains are the *decrease* in cut caused by a move; a positive gain is an
//! improvement. They are exact because edge weights are integers.

use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::model::{Graph, Hypergraph, Partition, Topology, Weights};

/// Total λ−1 cut of `partition` for one edge-weight criterion.
pub fn cut(
    topology: &Topology,
    edge_weights: &Weights<i64>,
    partition: &Partition,
    criterion: usize,
) -> Result<i64> {
    if criterion >= edge_weights.criterion_count() {
        return Err(Error::InvalidInput(format!(
            "cut criterion {criterion} out of range for {} criteria",
            edge_weights.criterion_count(),
        )));
    }
    let parts = partition.parts();
    let total = match topology {
        Topology::Graph(graph) => (0..graph.edge_count())
            .map(|e| {
                let [u, v] = graph.edge(e);
                if parts[u] != parts[v] {
                    edge_weights.get(e, criterion)
                } else {
                    0
                }
            })
            .sum(),
        Topology::Hypergraph(hypergraph) => (0..hypergraph.edge_count())
            .map(|e| {
                let lambda = distinct_parts(hypergraph.edge(e), parts);
                edge_weights.get(e, criterion) * (lambda as i64 - 1)
            })
            .sum(),
    };
    Ok(total)
}

/// Cut gain of moving graph vertex `i` to `target`.
pub fn graph_move_gain(
    graph: &Graph,
    edge_weights: &Weights<i64>,
    parts: &[usize],
    i: usize,
    target: usize,
    criterion: usize,
) -> i64 {
    let source = parts[i];
    let mut old = 0;
    let mut new = 0;
    for (j, e) in graph.neighbors(i) {
        let w = edge_weights.get(e, criterion);
        if parts[j] != source {
            old += w;
        }
        if parts[j] != target {
            new += w;
        }
    }
    old - new
}

/// Cut gain of moving hypergraph vertex `i` to `target`.
///
/// λ is recomputed for every incident hyperedge before and after the
/// hypothetical move.
pub fn hypergraph_move_gain(
    hypergraph: &Hypergraph,
    edge_weights: &Weights<i64>,
    parts: &[usize],
    i: usize,
    target: usize,
    criterion: usize,
) -> i64 {
    let source = parts[i];
    let incident: HashSet<usize> = hypergraph.neighbors(i).map(|(_, e)| e).collect();
    let mut gain = 0;
    for e in incident {
        let ends = hypergraph.edge(e);
        let before = lambda_with(ends, parts, i, source);
        let after = lambda_with(ends, parts, i, target);
        gain += edge_weights.get(e, criterion) * (before as i64 - after as i64);
    }
    gain
}

/// Cut gain of moving vertex `i` to `target` on either topology kind.
pub fn move_gain(
    topology: &Topology,
    edge_weights: &Weights<i64>,
    parts: &[usize],
    i: usize,
    target: usize,
    criterion: usize,
) -> i64 {
    match topology {
        Topology::Graph(graph) => graph_move_gain(graph, edge_weights, parts, i, target, criterion),
        Topology::Hypergraph(hypergraph) => {
            hypergraph_move_gain(hypergraph, edge_weights, parts, i, target, criterion)
        }
    }
}

fn distinct_parts(ends: &[usize], parts: &[usize]) -> usize {
    let mut seen: Vec<usize> = ends.iter().map(|&u| parts[u]).collect();
    seen.sort_unstable();
    seen.dedup();
    seen.len()
}

fn lambda_with(ends: &[usize], parts: &[usize], moved: usize, part_of_moved: usize) -> usize {
    let mut seen: Vec<usize> = ends
        .iter()
        .map(|&u| if u == moved { part_of_moved } else { parts[u] })
        .collect();
    seen.sort_unstable();
    seen.dedup();
    seen.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(n: usize) -> Topology {
        Topology::Graph(Graph::from_edges(n, (0..n - 1).map(|i| [i, i + 1]).collect()).unwrap())
    }

    #[test]
    fn graph_cut_counts_straddling_edges() {
        let topology = path(4);
        let edge_weights = Weights::unit(3);
        let partition = Partition::from_parts(Some(2), vec![0, 1, 0, 1]).unwrap();
        assert_eq!(cut(&topology, &edge_weights, &partition, 0).unwrap(), 3);
        let balanced = Partition::from_parts(Some(2), vec![0, 0, 1, 1]).unwrap();
        assert_eq!(cut(&topology, &edge_weights, &balanced, 0).unwrap(), 1);
    }

    #[test]
    fn hypergraph_cut_is_lambda_minus_one() {
        let hypergraph = Hypergraph::from_edges(4, vec![vec![0, 1, 2, 3]]).unwrap();
        let topology = Topology::Hypergraph(hypergraph);
        let edge_weights = Weights::unit(1);
        let partition = Partition::from_parts(Some(3), vec![0, 0, 1, 2]).unwrap();
        assert_eq!(cut(&topology, &edge_weights, &partition, 0).unwrap(), 2);
    }

    #[test]
    fn graph_gain_matches_cut_difference() {
        let graph = Graph::from_edges(4, vec![[0, 1], [1, 2], [2, 3]]).unwrap();
        let edge_weights = Weights::unit(3);
        let topology = Topology::Graph(graph.clone());
        let mut partition = Partition::from_parts(Some(2), vec![0, 1, 0, 1]).unwrap();
        let before = cut(&topology, &edge_weights, &partition, 0).unwrap();
        let gain = graph_move_gain(&graph, &edge_weights, partition.parts(), 1, 0, 0);
        partition.assign(1, 0);
        let after = cut(&topology, &edge_weights, &partition, 0).unwrap();
        assert_eq!(gain, before - after);
        assert_eq!(gain, 2);
    }

    #[test]
    fn hypergraph_gain_matches_cut_difference() {
        let hypergraph =
            Hypergraph::from_edges(5, vec![vec![0, 1, 2], vec![2, 3, 4], vec![0, 4]]).unwrap();
        let edge_weights = Weights::from_rows(vec![vec![1i64], vec![2], vec![5]]).unwrap();
        let topology = Topology::Hypergraph(hypergraph.clone());
        let mut partition = Partition::from_parts(Some(3), vec![0, 0, 1, 2, 2]).unwrap();
        let before = cut(&topology, &edge_weights, &partition, 0).unwrap();
        let gain = hypergraph_move_gain(&hypergraph, &edge_weights, partition.parts(), 2, 2, 0);
        partition.assign(2, 2);
        let after = cut(&topology, &edge_weights, &partition, 0).unwrap();
        assert_eq!(gain, before - after);
    }

    #[test]
    fn no_edges_means_no_cut() {
        let topology = Topology::Graph(Graph::from_edges(3, Vec::new()).unwrap());
        let edge_weights = Weights::unit(0);
        let partition = Partition::from_parts(Some(2), vec![0, 1, 0]).unwrap();
        assert_eq!(cut(&topology, &edge_weights, &partition, 0).unwrap(), 0);
    }
}
