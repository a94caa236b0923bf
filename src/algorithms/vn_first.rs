//! First-improvement balance refiner.
//!
//! Sweeps vertices and accepts the first target part that strictly
//! decreases the aggregate imbalance, applying the two-entry after-move
//! update to the imbalance matrix. After a move, the sweep restarts just
//! after the moved vertex and target parts are tried starting from the last
//! accepted target. The refiner stops once a budget of moves tested since
//! the last improvement is exceeded.

use rand::Rng;
use tracing::{debug, trace};

use crate::algorithms::iterators::{VertexOrder, VertexSweep};
use crate::error::{Error, Result};
use crate::imbalance::{apply_move, imbalance, imbalances, Targets};
use crate::model::{ModelSet, Partition};

/// Options of the first-improvement refiner.
#[derive(Debug, Clone)]
pub struct VnFirstConfig {
    pub order: VertexOrder,
    /// Moves tested since the last improvement before giving up; defaults
    /// to the vertex count.
    pub stop_after: Option<usize>,
    pub targets: Option<Targets>,
}

impl Default for VnFirstConfig {
    fn default() -> VnFirstConfig {
        VnFirstConfig {
            order: VertexOrder::Cycle,
            stop_after: None,
            targets: None,
        }
    }
}

/// What a balance refinement run did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VnReport {
    pub moves: usize,
    pub imbalance_before: f64,
    pub imbalance_after: f64,
}

/// Refines `partition` in place, minimizing the aggregate imbalance.
pub fn vn_first_refine<R: Rng>(
    models: &ModelSet,
    partition: &mut Partition,
    config: &VnFirstConfig,
    rng: &mut R,
) -> Result<VnReport> {
    let vertex_count = models.vertex_count();
    if partition.len() != vertex_count {
        return Err(Error::InvalidInput(format!(
            "partition of {} vertices for a topology of {vertex_count}",
            partition.len(),
        )));
    }
    let part_count = partition.part_count();
    let normalized = models.vertex_weights().normalized()?;
    let targets = match &config.targets {
        Some(targets) => targets.clone(),
        None => Targets::uniform(normalized.criterion_count(), part_count),
    };
    let stop_after = config.stop_after.unwrap_or(vertex_count);

    let mut imbs = imbalances(&normalized, partition, &targets);
    let mut current = imbalance(&imbs);
    let mut report = VnReport {
        moves: 0,
        imbalance_before: current,
        imbalance_after: current,
    };

    let mut sweep = VertexSweep::new(config.order, vertex_count, rng);
    let mut tested_since_move = 0usize;
    // Target parts are cycled starting from the last accepted target.
    let mut first_target = part_count - 1;

    while let Some(i) = sweep.next() {
        tested_since_move += 1;
        let source = partition.part(i);
        for offset in 0..part_count {
            let target = (first_target + offset) % part_count;
            if target == source {
                continue;
            }
            let mut new_imbs = imbs.clone();
            apply_move(&mut new_imbs, normalized.row(i), source, target, part_count);
            let new_imbalance = imbalance(&new_imbs);
            if new_imbalance < current {
                partition.assign(i, target);
                imbs = new_imbs;
                current = new_imbalance;
                report.moves += 1;
                tested_since_move = 0;
                sweep.restart();
                first_target = target;
                trace!(vertex = i, source, target, imbalance = current, "vn move");
                break;
            }
        }
        if tested_since_move > stop_after {
            break;
        }
    }

    report.imbalance_after = current;
    debug!(
        moves = report.moves,
        imbalance = report.imbalance_after,
        "vn first done"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Graph, Weights};
    use approx::assert_ulps_eq;
    use rand::rngs::mock::StepRng;

    fn models_with_weights(rows: Vec<Vec<i64>>) -> ModelSet {
        let n = rows.len();
        let graph = Graph::from_edges(n, (0..n - 1).map(|i| [i, i + 1]).collect()).unwrap();
        ModelSet::new(graph, Some(Weights::from_rows(rows).unwrap()), None, None).unwrap()
    }

    #[test]
    fn balances_a_lopsided_bipartition() {
        let models = models_with_weights(vec![vec![4], vec![3], vec![2], vec![1]]);
        let mut partition = Partition::uniform(4, 2, 0).unwrap();
        let report = vn_first_refine(
            &models,
            &mut partition,
            &VnFirstConfig::default(),
            &mut StepRng::new(0, 1),
        )
        .unwrap();
        assert_ulps_eq!(report.imbalance_before, 1.0);
        assert!(report.imbalance_after < report.imbalance_before);
        assert!(report.moves > 0);
    }

    #[test]
    fn balanced_input_makes_no_moves() {
        let models = models_with_weights(vec![vec![1], vec![1], vec![1], vec![1]]);
        let mut partition = Partition::from_parts(Some(2), vec![0, 1, 0, 1]).unwrap();
        let report = vn_first_refine(
            &models,
            &mut partition,
            &VnFirstConfig::default(),
            &mut StepRng::new(0, 1),
        )
        .unwrap();
        assert_eq!(report.moves, 0);
        assert_ulps_eq!(report.imbalance_after, 0.0);
        assert_eq!(partition.parts(), &[0, 1, 0, 1]);
    }

    #[test]
    fn every_move_strictly_improves() {
        let models = models_with_weights(vec![
            vec![5, 1],
            vec![4, 2],
            vec![3, 3],
            vec![2, 4],
            vec![1, 5],
        ]);
        let mut partition = Partition::from_parts(Some(3), vec![0, 0, 0, 1, 2]).unwrap();
        let report = vn_first_refine(
            &models,
            &mut partition,
            &VnFirstConfig::default(),
            &mut StepRng::new(0, 1),
        )
        .unwrap();
        assert!(report.imbalance_after <= report.imbalance_before);
    }
}
