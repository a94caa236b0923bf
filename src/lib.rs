//! A graph and hypergraph partitioning library built around a multilevel
//! framework, cut-minimizing Fiduccia-Mattheyses refinement and
//! balance-minimizing number-partitioning refiners.
//!
//! # Crate Layout
//!
//! Scission exposes each algorithm with a struct that implements a trait.
//! There are currently two traits available:
//!
//! - [`InitialPartition`] represents an algorithm that will generate a
//!   partition of the vertices of a [`ModelSet`] from scratch.
//! - [`RefinePartition`] represents an algorithm that will improve an
//!   existing partition (previously generated with an
//!   [`InitialPartition`]).
//!
//! The [`model`] module holds the data every algorithm operates on:
//! topologies, weight matrices, partitions. The [`multilevel`] module
//! coarsens a model set by matching and prolongs partitions back to the
//! finer levels, and the [`runner`] module sequences all of the above into
//! reproducible runs.
//!
//! # Available algorithms
//!
//! ## Initial partitioning algorithms
//! - [`AllInOne`]: every vertex in one part
//! - [`Random`]: uniformly random parts
//!
//! ## Partition improving algorithms
//! - [`FiducciaMattheyses`]: cut refinement under a balance constraint
//! - [`VnFirst`]: first-improvement balance refinement
//! - [`VnBest`]: best-gain balance refinement

pub mod algorithms;
pub mod analysis;
pub mod cut;
pub mod error;
pub mod imbalance;
pub mod model;
pub mod multilevel;
pub mod runner;

pub use crate::error::{Error, Result};
pub use crate::imbalance::Targets;
pub use crate::model::{Geometry, Graph, Hypergraph, ModelSet, Partition, Topology, Weights};

use rand::Rng;

use crate::algorithms::direct;
use crate::algorithms::fm::{self, FmConfig, StopInner, StopOuter, TieBreak};
use crate::algorithms::iterators::VertexOrder;
use crate::algorithms::vn_best::{self, VnBestConfig};
use crate::algorithms::vn_first::{self, VnFirstConfig};

/// An algorithm that generates a partition from scratch.
pub trait InitialPartition {
    fn partition(&mut self, models: &ModelSet) -> Result<Partition>;
}

/// An algorithm that improves an existing partition in place.
pub trait RefinePartition {
    fn refine(&mut self, models: &ModelSet, partition: &mut Partition) -> Result<()>;
}

/// # All-in-one partitioning
///
/// Puts every vertex in the same part. Trivially valid for any part count
/// and the usual seed of a multilevel run: partition the coarsest level,
/// then let refinement spread the vertices.
///
/// # Example
///
/// ```rust
/// use scission::{AllInOne, InitialPartition};
/// use scission::{Graph, ModelSet};
///
/// let graph = Graph::from_edges(4, vec![[0, 1], [1, 2], [2, 3]]).unwrap();
/// let models = ModelSet::new(graph, None, None, None).unwrap();
///
/// let mut algo = AllInOne { part_count: 2, part: 0 };
/// let partition = algo.partition(&models).unwrap();
///
/// assert_eq!(partition.parts(), &[0, 0, 0, 0]);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct AllInOne {
    pub part_count: usize,
    /// The part receiving every vertex.
    pub part: usize,
}

impl InitialPartition for AllInOne {
    fn partition(&mut self, models: &ModelSet) -> Result<Partition> {
        direct::all_in_one_part(models, self.part_count, self.part)
    }
}

/// # Random partitioning
///
/// Gives a uniformly random part to every vertex.
///
/// # Example
///
/// ```rust
/// use rand::SeedableRng;
/// use scission::{InitialPartition, Random};
/// use scission::{Graph, ModelSet};
///
/// let graph = Graph::from_edges(4, vec![[0, 1], [1, 2], [2, 3]]).unwrap();
/// let models = ModelSet::new(graph, None, None, None).unwrap();
///
/// let mut algo = Random {
///     rng: rand::rngs::StdRng::seed_from_u64(1),
///     part_count: 2,
/// };
/// let partition = algo.partition(&models).unwrap();
///
/// assert!(partition.parts().iter().all(|&p| p < 2));
/// ```
#[derive(Debug, Clone)]
pub struct Random<R> {
    pub rng: R,
    pub part_count: usize,
}

impl<R: Rng> InitialPartition for Random<R> {
    fn partition(&mut self, models: &ModelSet) -> Result<Partition> {
        direct::random_part(models, self.part_count, &mut self.rng)
    }
}

/// # Fiduccia-Mattheyses cut refinement
///
/// Greedy pass-based refinement of the λ−1 cut under an imbalance
/// tolerance. Within a pass, the best admissible move is applied and its
/// vertex locked; negative-gain moves are accepted to climb out of local
/// minima and the best state seen is restored at the end of the pass.
///
/// Edge weights are integers by construction of the [`ModelSet`], so all
/// gain arithmetic is exact.
///
/// # Example
///
/// ```rust
/// use rand::SeedableRng;
/// use scission::{FiducciaMattheyses, RefinePartition};
/// use scission::{Graph, ModelSet, Partition};
///
/// let graph = Graph::from_edges(4, vec![[0, 1], [1, 2], [2, 3]]).unwrap();
/// let models = ModelSet::new(graph, None, None, None).unwrap();
/// // The worst possible bipartition of a path: every edge is cut.
/// let mut partition = Partition::from_parts(Some(2), vec![0, 1, 0, 1]).unwrap();
///
/// let mut fm = FiducciaMattheyses::new(rand::rngs::StdRng::seed_from_u64(1));
/// fm.tolerances = vec![0.5];
/// fm.refine(&models, &mut partition).unwrap();
///
/// assert_eq!(scission::analysis::edge_cut(&models, &partition).unwrap(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct FiducciaMattheyses<R> {
    pub rng: R,
    /// Per-criterion imbalance tolerance; one value is broadcast.
    pub tolerances: Vec<f64>,
    /// Target weights; uniform when absent.
    pub targets: Option<Targets>,
    pub tie_break: TieBreak,
    pub stop_inner: StopInner,
    pub stop_outer: StopOuter,
    /// Edge-weight criterion the cut is computed on.
    pub criterion: usize,
}

impl<R> FiducciaMattheyses<R> {
    pub fn new(rng: R) -> FiducciaMattheyses<R> {
        let defaults = FmConfig::default();
        FiducciaMattheyses {
            rng,
            tolerances: defaults.tolerances,
            targets: defaults.targets,
            tie_break: defaults.tie_break,
            stop_inner: defaults.stop_inner,
            stop_outer: defaults.stop_outer,
            criterion: defaults.criterion,
        }
    }

    fn config(&self) -> FmConfig {
        FmConfig {
            tolerances: self.tolerances.clone(),
            targets: self.targets.clone(),
            tie_break: self.tie_break,
            stop_inner: self.stop_inner,
            stop_outer: self.stop_outer,
            criterion: self.criterion,
        }
    }
}

impl<R: Rng> RefinePartition for FiducciaMattheyses<R> {
    fn refine(&mut self, models: &ModelSet, partition: &mut Partition) -> Result<()> {
        let config = self.config();
        fm::fm_refine(models, partition, &config, &mut self.rng)?;
        Ok(())
    }
}

/// # First-improvement balance refinement
///
/// Sweeps the vertices and applies the first move that strictly decreases
/// the aggregate imbalance, restarting the sweep after each move. Cheap
/// and effective when the partition is already close to balanced.
#[derive(Debug, Clone)]
pub struct VnFirst<R> {
    pub rng: R,
    pub order: VertexOrder,
    /// Moves tested since the last improvement before giving up; defaults
    /// to the vertex count.
    pub stop_after: Option<usize>,
    pub targets: Option<Targets>,
}

impl<R> VnFirst<R> {
    pub fn new(rng: R) -> VnFirst<R> {
        VnFirst {
            rng,
            order: VertexOrder::Cycle,
            stop_after: None,
            targets: None,
        }
    }
}

impl<R: Rng> RefinePartition for VnFirst<R> {
    fn refine(&mut self, models: &ModelSet, partition: &mut Partition) -> Result<()> {
        let config = VnFirstConfig {
            order: self.order,
            stop_after: self.stop_after,
            targets: self.targets.clone(),
        };
        vn_first::vn_first_refine(models, partition, &config, &mut self.rng)?;
        Ok(())
    }
}

/// # Best-gain balance refinement
///
/// Repeatedly applies the move that most decreases the aggregate
/// imbalance, found through per-(part, criterion) gain arrays sorted by
/// vertex weight and probed from their inflection position.
///
/// # Example
///
/// ```rust
/// use scission::{RefinePartition, VnBest};
/// use scission::{Graph, ModelSet, Partition, Weights};
///
/// let graph = Graph::from_edges(4, vec![[0, 1], [1, 2], [2, 3]]).unwrap();
/// let weights = Weights::from_rows(vec![vec![4], vec![3], vec![2], vec![1]]).unwrap();
/// let models = ModelSet::new(graph, Some(weights), None, None).unwrap();
/// let mut partition = Partition::uniform(4, 2, 0).unwrap();
///
/// VnBest::default().refine(&models, &mut partition).unwrap();
///
/// let imbalance = scission::analysis::aggregate_imbalance(&models, &partition).unwrap();
/// assert!(imbalance.abs() < 1e-9);
/// ```
#[derive(Debug, Clone, Default)]
pub struct VnBest {
    pub targets: Option<Targets>,
}

impl RefinePartition for VnBest {
    fn refine(&mut self, models: &ModelSet, partition: &mut Partition) -> Result<()> {
        let config = VnBestConfig {
            targets: self.targets.clone(),
        };
        vn_best::vn_best_refine(models, partition, &config)?;
        Ok(())
    }
}
