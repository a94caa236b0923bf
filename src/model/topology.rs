//! Graph and hypergraph topologies.
//!
//! Both kinds share the same access pattern: for each vertex, a list of
//! `(neighbor, edge id)` pairs, and for each edge, the list of its ends.
//! The adjacency of a hypergraph vertex may repeat a neighbor when both
//! vertices share several hyperedges.
//!
//! Topologies are built once by loaders and never mutated afterwards; the
//! only derived construction is [`Topology::coarsen`], which returns a new
//! topology together with the fine-to-coarse edge mapping.

use std::collections::HashMap;

use crate::error::{Error, Result};

/// An undirected graph whose edges have exactly two ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Graph {
    vertex_count: usize,
    edges: Vec<[usize; 2]>,
    adjacency: Vec<Vec<(usize, usize)>>,
}

impl Graph {
    /// Builds a graph from an edge list.
    ///
    /// Self-loops are rejected. Parallel edges are accepted (they carry
    /// separate weights).
    pub fn from_edges(vertex_count: usize, edges: Vec<[usize; 2]>) -> Result<Graph> {
        let mut adjacency = vec![Vec::new(); vertex_count];
        for (e, &[u, v]) in edges.iter().enumerate() {
            if u >= vertex_count || v >= vertex_count {
                return Err(Error::InvalidInput(format!(
                    "edge {e} ends ({u}, {v}) out of range for {vertex_count} vertices",
                )));
            }
            if u == v {
                return Err(Error::InvalidInput(format!("edge {e} is a self-loop on {u}")));
            }
            adjacency[u].push((v, e));
            adjacency[v].push((u, e));
        }
        Ok(Graph {
            vertex_count,
            edges,
            adjacency,
        })
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Ends of the given edge.
    pub fn edge(&self, e: usize) -> [usize; 2] {
        self.edges[e]
    }

    pub fn degree(&self, i: usize) -> usize {
        self.adjacency[i].len()
    }

    /// `(neighbor, edge id)` pairs of vertex `i`.
    pub fn neighbors(&self, i: usize) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.adjacency[i].iter().copied()
    }

    /// Collapses the graph along `aggregation`.
    ///
    /// Edges whose ends aggregate to the same coarse vertex disappear;
    /// parallel coarse edges are merged. The second return value maps each
    /// fine edge to its coarse edge, or `None` for collapsed edges, so that
    /// edge weights can be summed into the merged edges.
    pub fn coarsen(&self, aggregation: &[usize]) -> Result<(Graph, Vec<Option<usize>>)> {
        let coarse_count = check_aggregation(aggregation, self.vertex_count)?;
        let mut edge_of_pair = HashMap::new();
        let mut edges = Vec::new();
        let mut edge_map = vec![None; self.edges.len()];
        for (e, &[u, v]) in self.edges.iter().enumerate() {
            let (cu, cv) = (aggregation[u], aggregation[v]);
            if cu == cv {
                continue;
            }
            let key = (cu.min(cv), cu.max(cv));
            let ce = *edge_of_pair.entry(key).or_insert_with(|| {
                edges.push([key.0, key.1]);
                edges.len() - 1
            });
            edge_map[e] = Some(ce);
        }
        let coarse = Graph::from_edges(coarse_count, edges)?;
        Ok((coarse, edge_map))
    }

    /// Checks the adjacency/edge cross references.
    pub fn check(&self) -> Result<()> {
        let mut seen = vec![0usize; self.edges.len()];
        for i in 0..self.vertex_count {
            for &(j, e) in &self.adjacency[i] {
                let ends = self.edges.get(e).ok_or_else(|| {
                    Error::InvariantViolation(format!("vertex {i} refers to unknown edge {e}"))
                })?;
                if !ends.contains(&i) || !ends.contains(&j) {
                    return Err(Error::InvariantViolation(format!(
                        "edge {e} = {ends:?} does not link {i} and {j}",
                    )));
                }
                seen[e] += 1;
            }
        }
        if let Some(e) = seen.iter().position(|&count| count != 2) {
            return Err(Error::InvariantViolation(format!(
                "edge {e} appears {} times in adjacency lists instead of 2",
                seen[e],
            )));
        }
        Ok(())
    }
}

/// A hypergraph; each hyperedge is a non-empty set of vertices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hypergraph {
    vertex_count: usize,
    edges: Vec<Vec<usize>>,
    adjacency: Vec<Vec<(usize, usize)>>,
}

impl Hypergraph {
    /// Builds a hypergraph from its hyperedge list.
    ///
    /// The adjacency of a vertex lists every other end of every incident
    /// hyperedge, so a neighbor sharing several hyperedges appears once per
    /// shared hyperedge.
    pub fn from_edges(vertex_count: usize, edges: Vec<Vec<usize>>) -> Result<Hypergraph> {
        let mut adjacency = vec![Vec::new(); vertex_count];
        for (e, ends) in edges.iter().enumerate() {
            if ends.is_empty() {
                return Err(Error::InvalidInput(format!("hyperedge {e} has no end")));
            }
            for &u in ends {
                if u >= vertex_count {
                    return Err(Error::InvalidInput(format!(
                        "hyperedge {e} end {u} out of range for {vertex_count} vertices",
                    )));
                }
            }
            for &u in ends {
                for &v in ends {
                    if u != v {
                        adjacency[u].push((v, e));
                    }
                }
            }
        }
        Ok(Hypergraph {
            vertex_count,
            edges,
            adjacency,
        })
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Ends of the given hyperedge.
    pub fn edge(&self, e: usize) -> &[usize] {
        &self.edges[e]
    }

    /// `(neighbor, hyperedge id)` pairs of vertex `i`.
    pub fn neighbors(&self, i: usize) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.adjacency[i].iter().copied()
    }

    /// Projects every hyperedge through `aggregation`.
    ///
    /// A hyperedge becomes the set of coarse images of its ends; singleton
    /// projections are dropped and identical projections are merged. The
    /// returned mapping serves the same purpose as in [`Graph::coarsen`].
    pub fn coarsen(&self, aggregation: &[usize]) -> Result<(Hypergraph, Vec<Option<usize>>)> {
        let coarse_count = check_aggregation(aggregation, self.vertex_count)?;
        let mut edge_of_ends: HashMap<Vec<usize>, usize> = HashMap::new();
        let mut edges = Vec::new();
        let mut edge_map = vec![None; self.edges.len()];
        for (e, ends) in self.edges.iter().enumerate() {
            let mut projected: Vec<usize> = ends.iter().map(|&u| aggregation[u]).collect();
            projected.sort_unstable();
            projected.dedup();
            if projected.len() < 2 {
                continue;
            }
            let ce = match edge_of_ends.get(&projected) {
                Some(&ce) => ce,
                None => {
                    edge_of_ends.insert(projected.clone(), edges.len());
                    edges.push(projected);
                    edges.len() - 1
                }
            };
            edge_map[e] = Some(ce);
        }
        let coarse = Hypergraph::from_edges(coarse_count, edges)?;
        Ok((coarse, edge_map))
    }
}

/// Either kind of topology; the engine dispatches on the variant once, at
/// refiner construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Topology {
    Graph(Graph),
    Hypergraph(Hypergraph),
}

impl Topology {
    pub fn vertex_count(&self) -> usize {
        match self {
            Topology::Graph(g) => g.vertex_count(),
            Topology::Hypergraph(h) => h.vertex_count(),
        }
    }

    pub fn edge_count(&self) -> usize {
        match self {
            Topology::Graph(g) => g.edge_count(),
            Topology::Hypergraph(h) => h.edge_count(),
        }
    }

    /// `(neighbor, edge id)` pairs of vertex `i`.
    pub fn neighbors<'a>(&'a self, i: usize) -> Box<dyn Iterator<Item = (usize, usize)> + 'a> {
        match self {
            Topology::Graph(g) => Box::new(g.neighbors(i)),
            Topology::Hypergraph(h) => Box::new(h.neighbors(i)),
        }
    }

    pub fn coarsen(&self, aggregation: &[usize]) -> Result<(Topology, Vec<Option<usize>>)> {
        match self {
            Topology::Graph(g) => {
                let (coarse, edge_map) = g.coarsen(aggregation)?;
                Ok((Topology::Graph(coarse), edge_map))
            }
            Topology::Hypergraph(h) => {
                let (coarse, edge_map) = h.coarsen(aggregation)?;
                Ok((Topology::Hypergraph(coarse), edge_map))
            }
        }
    }
}

impl From<Graph> for Topology {
    fn from(g: Graph) -> Topology {
        Topology::Graph(g)
    }
}

impl From<Hypergraph> for Topology {
    fn from(h: Hypergraph) -> Topology {
        Topology::Hypergraph(h)
    }
}

/// Returns the coarse vertex count, after checking that `aggregation` is a
/// surjection onto `0..max+1`.
fn check_aggregation(aggregation: &[usize], fine_count: usize) -> Result<usize> {
    if aggregation.len() != fine_count {
        return Err(Error::InvalidInput(format!(
            "aggregation has {} entries for {fine_count} vertices",
            aggregation.len(),
        )));
    }
    let coarse_count = match aggregation.iter().max() {
        Some(&max) => max + 1,
        None => {
            return Err(Error::InvariantViolation(
                "coarsening produced an empty topology".to_string(),
            ))
        }
    };
    let mut hit = vec![false; coarse_count];
    for &c in aggregation {
        hit[c] = true;
    }
    if let Some(missing) = hit.iter().position(|&h| !h) {
        return Err(Error::InvariantViolation(format!(
            "aggregation is not surjective: coarse vertex {missing} has no pre-image",
        )));
    }
    Ok(coarse_count)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The 4-vertex example graph: a path 0-1-2 plus the triangle edge 1-3, 2-3.
    fn sample_graph() -> Graph {
        Graph::from_edges(4, vec![[0, 1], [1, 2], [1, 3], [2, 3]]).unwrap()
    }

    #[test]
    fn graph_adjacency_cross_references() {
        let g = sample_graph();
        assert_eq!(g.vertex_count(), 4);
        assert_eq!(g.edge_count(), 4);
        assert_eq!(g.neighbors(1).collect::<Vec<_>>(), vec![(0, 0), (2, 1), (3, 2)]);
        g.check().unwrap();
    }

    #[test]
    fn graph_rejects_bad_edges() {
        assert!(Graph::from_edges(2, vec![[0, 2]]).is_err());
        assert!(Graph::from_edges(2, vec![[1, 1]]).is_err());
    }

    #[test]
    fn graph_coarsen_merges_parallel_edges() {
        // 0-1-2-3 path; aggregate {0,1} and {2,3}: edges 0-1 and 2-3 collapse,
        // edge 1-2 becomes the single coarse edge.
        let g = Graph::from_edges(4, vec![[0, 1], [1, 2], [2, 3]]).unwrap();
        let (coarse, edge_map) = g.coarsen(&[0, 0, 1, 1]).unwrap();
        assert_eq!(coarse.vertex_count(), 2);
        assert_eq!(coarse.edge_count(), 1);
        assert_eq!(edge_map, vec![None, Some(0), None]);

        // A square: both cross edges merge into one coarse edge.
        let g = Graph::from_edges(4, vec![[0, 1], [2, 3], [0, 2], [1, 3]]).unwrap();
        let (coarse, edge_map) = g.coarsen(&[0, 0, 1, 1]).unwrap();
        assert_eq!(coarse.edge_count(), 1);
        assert_eq!(edge_map, vec![None, None, Some(0), Some(0)]);
    }

    #[test]
    fn aggregation_must_be_surjective() {
        let g = Graph::from_edges(2, vec![[0, 1]]).unwrap();
        assert!(matches!(
            g.coarsen(&[0, 2]),
            Err(Error::InvariantViolation(_))
        ));
    }

    #[test]
    fn hypergraph_adjacency_repeats_shared_ends() {
        // Hyperedges {0,1,3}, {1,2}, {1,2,3}: 1 and 2 share two hyperedges.
        let h = Hypergraph::from_edges(4, vec![vec![0, 1, 3], vec![1, 2], vec![1, 2, 3]]).unwrap();
        let from_1: Vec<_> = h.neighbors(1).collect();
        assert_eq!(from_1, vec![(0, 0), (3, 0), (2, 1), (2, 2), (3, 2)]);
    }

    #[test]
    fn hypergraph_coarsen_drops_singleton_projections() {
        let h = Hypergraph::from_edges(4, vec![vec![0, 1], vec![0, 1, 2], vec![2, 3]]).unwrap();
        let (coarse, edge_map) = h.coarsen(&[0, 0, 1, 1]).unwrap();
        // {0,1} collapses, {0,1,2} projects to {0,1}, {2,3} collapses.
        assert_eq!(coarse.edge_count(), 1);
        assert_eq!(coarse.edge(0), &[0, 1]);
        assert_eq!(edge_map, vec![None, Some(0), None]);
    }
}
