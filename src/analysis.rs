//! This module contains functions to help evaluate the quality
//! of the partitions produced by the partitioning algorithms.

use itertools::Itertools;

use crate::cut::cut;
use crate::error::Result;
use crate::imbalance::{self, Targets};
use crate::model::{ModelSet, Partition};

/// Computes the weight of each part of a partition.
///
/// Returns one `(part, weights)` pair per non-empty part, where `weights`
/// holds the per-criterion sums of the part.
pub fn part_weights(models: &ModelSet, partition: &Partition) -> Vec<(usize, Vec<i64>)> {
    let weights = models.vertex_weights();
    partition
        .parts()
        .iter()
        .copied()
        .zip((0..weights.item_count()).map(|i| weights.row(i)))
        .into_group_map()
        .into_iter()
        .map(|(part, rows)| {
            let mut sums = vec![0; weights.criterion_count()];
            for row in rows {
                for (sum, w) in sums.iter_mut().zip(row) {
                    *sum += w;
                }
            }
            (part, sums)
        })
        .sorted_by_key(|&(part, _)| part)
        .collect()
}

/// The `[criterion][part]` imbalance matrix of a partition, under uniform
/// targets.
pub fn imbalances(models: &ModelSet, partition: &Partition) -> Result<Vec<Vec<f64>>> {
    let normalized = models.vertex_weights().normalized()?;
    let targets = Targets::uniform(normalized.criterion_count(), partition.part_count());
    Ok(imbalance::imbalances(&normalized, partition, &targets))
}

/// The aggregate imbalance of a partition, under uniform targets.
pub fn aggregate_imbalance(models: &ModelSet, partition: &Partition) -> Result<f64> {
    Ok(imbalance::imbalance(&imbalances(models, partition)?))
}

/// The λ−1 cut of a partition on the first edge-weight criterion.
pub fn edge_cut(models: &ModelSet, partition: &Partition) -> Result<i64> {
    cut(models.topology(), models.edge_weights(), partition, 0)
}
