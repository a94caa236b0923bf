//! The multilevel framework: matching, coarsening and prolongation.
//!
//! The stack keeps one [`ModelSet`] per level, finest first, together with
//! the aggregation that produced each coarser level. Partitions are
//! computed on the coarsest level and prolonged back down; each
//! prolongation pops the coarsest snapshot.

pub mod matching;
pub mod restrictions;

use rand::Rng;
use tracing::debug;

use crate::error::{Error, Result};
use crate::model::{ModelSet, Partition};

pub use matching::{compute_matching, EdgeWeighting, Matcher, Order};
pub use restrictions::{Forbid, WeightRestriction};

/// Options of one coarsening step.
#[derive(Debug, Clone)]
pub struct CoarsenConfig {
    pub matcher: Matcher,
    pub order: Order,
    pub restrictions: Vec<WeightRestriction>,
}

impl Default for CoarsenConfig {
    fn default() -> CoarsenConfig {
        CoarsenConfig {
            matcher: Matcher::HeavyEdge(EdgeWeighting::Original),
            order: Order::Identity,
            restrictions: Vec::new(),
        }
    }
}

/// Vertex counts around one coarsening step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoarsenReport {
    pub fine_count: usize,
    pub coarse_count: usize,
}

/// The hierarchy of model snapshots and aggregations.
#[derive(Debug, Clone)]
pub struct MultilevelStack {
    levels: Vec<ModelSet>,
    aggregations: Vec<Vec<usize>>,
}

impl MultilevelStack {
    pub fn new(models: ModelSet) -> MultilevelStack {
        MultilevelStack {
            levels: vec![models],
            aggregations: Vec::new(),
        }
    }

    /// The coarsest level, on which partitioning currently operates.
    pub fn current(&self) -> &ModelSet {
        self.levels.last().expect("the stack always holds a level")
    }

    pub fn finest(&self) -> &ModelSet {
        &self.levels[0]
    }

    /// The level just under the coarsest one, if any.
    pub fn finer(&self) -> Option<&ModelSet> {
        self.levels.len().checked_sub(2).map(|i| &self.levels[i])
    }

    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    /// Matches the current level and pushes the coarsened snapshot.
    pub fn coarsen<R: Rng>(&mut self, config: &CoarsenConfig, rng: &mut R) -> Result<CoarsenReport> {
        let models = self.current();
        let aggregation = compute_matching(
            models,
            config.matcher,
            config.order,
            &config.restrictions,
            rng,
        );
        let coarse = models.coarsen(&aggregation)?;
        let report = CoarsenReport {
            fine_count: models.vertex_count(),
            coarse_count: coarse.vertex_count(),
        };
        debug!(
            level = self.levels.len(),
            fine = report.fine_count,
            coarse = report.coarse_count,
            "coarsened one level"
        );
        self.levels.push(coarse);
        self.aggregations.push(aggregation);
        Ok(report)
    }

    /// Coarsens until `stop` holds on the stack or a step stops shrinking
    /// the topology.
    pub fn coarsen_until<R, F>(
        &mut self,
        config: &CoarsenConfig,
        rng: &mut R,
        mut stop: F,
    ) -> Result<()>
    where
        R: Rng,
        F: FnMut(&MultilevelStack) -> bool,
    {
        while !stop(self) {
            let report = self.coarsen(config, rng)?;
            if report.coarse_count == report.fine_count {
                break;
            }
        }
        Ok(())
    }

    /// Pops the coarsest level and maps `partition` down to the next one.
    pub fn prolong(&mut self, partition: &Partition) -> Result<Partition> {
        if self.aggregations.is_empty() {
            return Err(Error::InvariantViolation(
                "nothing to prolong: the stack holds a single level".to_string(),
            ));
        }
        if partition.len() != self.current().vertex_count() {
            return Err(Error::InvalidInput(format!(
                "partition of {} vertices for a coarse level of {}",
                partition.len(),
                self.current().vertex_count(),
            )));
        }
        let aggregation = self.aggregations.pop().expect("checked above");
        self.levels.pop();
        let fine = partition.prolong(&aggregation)?;
        debug!(
            level = self.levels.len(),
            vertices = fine.len(),
            "prolonged one level"
        );
        Ok(fine)
    }
}
