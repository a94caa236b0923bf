//! The data model: topology, weights, partition and geometry, bundled in a
//! [`ModelSet`].
//!
//! A model set owns every long-lived structure of one multilevel level.
//! Topologies and weight matrices are immutable once built; the only derived
//! construction is [`ModelSet::coarsen`], which produces the model set of
//! the next (coarser) level. Refiners borrow the partition mutably for the
//! duration of a pass and read everything else.

mod partition;
mod topology;
mod weights;

pub use partition::Partition;
pub use topology::{Graph, Hypergraph, Topology};
pub use weights::Weights;

use crate::error::{Error, Result};

/// Geometric attributes carried through the multilevel stack unchanged.
///
/// The engine never computes with coordinates; they ride along so that
/// output tools can plot or export partitioned meshes.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    pub dimension: usize,
    pub coordinates: Vec<Vec<f64>>,
}

/// One level of the multilevel hierarchy: a topology, its weight matrices
/// and optional geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSet {
    topology: Topology,
    vertex_weights: Weights<i64>,
    edge_weights: Weights<i64>,
    geometry: Option<Geometry>,
}

impl ModelSet {
    /// Bundles a topology with its weights.
    ///
    /// Missing weight matrices default to unit weights, as loaders do for
    /// unweighted files.
    pub fn new(
        topology: impl Into<Topology>,
        vertex_weights: Option<Weights<i64>>,
        edge_weights: Option<Weights<i64>>,
        geometry: Option<Geometry>,
    ) -> Result<ModelSet> {
        let topology = topology.into();
        let vertex_weights =
            vertex_weights.unwrap_or_else(|| Weights::unit(topology.vertex_count()));
        let edge_weights = edge_weights.unwrap_or_else(|| Weights::unit(topology.edge_count()));
        if vertex_weights.item_count() != topology.vertex_count() {
            return Err(Error::InvalidInput(format!(
                "{} vertex weight rows for {} vertices",
                vertex_weights.item_count(),
                topology.vertex_count(),
            )));
        }
        if edge_weights.item_count() != topology.edge_count() {
            return Err(Error::InvalidInput(format!(
                "{} edge weight rows for {} edges",
                edge_weights.item_count(),
                topology.edge_count(),
            )));
        }
        if let Some(geometry) = &geometry {
            if geometry.coordinates.len() != topology.vertex_count() {
                return Err(Error::InvalidInput(format!(
                    "{} coordinate rows for {} vertices",
                    geometry.coordinates.len(),
                    topology.vertex_count(),
                )));
            }
        }
        Ok(ModelSet {
            topology,
            vertex_weights,
            edge_weights,
            geometry,
        })
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn vertex_count(&self) -> usize {
        self.topology.vertex_count()
    }

    pub fn vertex_weights(&self) -> &Weights<i64> {
        &self.vertex_weights
    }

    pub fn edge_weights(&self) -> &Weights<i64> {
        &self.edge_weights
    }

    pub fn geometry(&self) -> Option<&Geometry> {
        self.geometry.as_ref()
    }

    /// Collapses every model along `aggregation` and returns the coarser
    /// level.
    ///
    /// Edge weights of merged parallel edges are summed; vertex weights are
    /// summed per coarse vertex; each coarse vertex inherits the coordinates
    /// of one of its fine representatives.
    pub fn coarsen(&self, aggregation: &[usize]) -> Result<ModelSet> {
        let (topology, edge_map) = self.topology.coarsen(aggregation)?;
        let coarse_count = topology.vertex_count();
        let vertex_weights = self.vertex_weights.coarsen(aggregation, coarse_count);
        let edge_weights = self
            .edge_weights
            .coarsen_edges(&edge_map, topology.edge_count());
        let geometry = self.geometry.as_ref().map(|geometry| {
            let mut coordinates = vec![Vec::new(); coarse_count];
            for (i, &ci) in aggregation.iter().enumerate() {
                coordinates[ci] = geometry.coordinates[i].clone();
            }
            Geometry {
                dimension: geometry.dimension,
                coordinates,
            }
        });
        Ok(ModelSet {
            topology,
            vertex_weights,
            edge_weights,
            geometry,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path_graph(n: usize) -> Graph {
        Graph::from_edges(n, (0..n - 1).map(|i| [i, i + 1]).collect()).unwrap()
    }

    #[test]
    fn defaults_to_unit_weights() {
        let models = ModelSet::new(path_graph(3), None, None, None).unwrap();
        assert_eq!(models.vertex_weights().totals(), &[3]);
        assert_eq!(models.edge_weights().totals(), &[2]);
    }

    #[test]
    fn rejects_mismatched_weights() {
        let w = Weights::from_rows(vec![vec![1i64]; 2]).unwrap();
        assert!(ModelSet::new(path_graph(3), Some(w), None, None).is_err());
    }

    #[test]
    fn coarsen_sums_weights_and_keeps_coordinates() {
        let vertex_weights = Weights::from_rows(vec![vec![1i64], vec![2], vec![4], vec![8]]).unwrap();
        let edge_weights = Weights::from_rows(vec![vec![1i64], vec![10], vec![100]]).unwrap();
        let geometry = Geometry {
            dimension: 2,
            coordinates: vec![vec![0., 0.], vec![1., 0.], vec![2., 0.], vec![3., 0.]],
        };
        let models = ModelSet::new(
            path_graph(4),
            Some(vertex_weights),
            Some(edge_weights),
            Some(geometry),
        )
        .unwrap();
        let coarse = models.coarsen(&[0, 0, 1, 1]).unwrap();
        assert_eq!(coarse.vertex_count(), 2);
        assert_eq!(coarse.vertex_weights().row(0), &[3]);
        assert_eq!(coarse.vertex_weights().row(1), &[12]);
        assert_eq!(coarse.vertex_weights().totals(), &[15]);
        // Only the middle edge survives.
        assert_eq!(coarse.edge_weights().row(0), &[10]);
        assert_eq!(coarse.geometry().unwrap().coordinates.len(), 2);
    }
}
