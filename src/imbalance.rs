//! Imbalance of a partition and the balance constraint used by FM.
//!
//! The imbalance of part `p` for criterion `c` is the signed deviation of
//! the part's normalized weight from its target, scaled by the part count:
//!
//! ```text
//! imb[c][p] = part_count · (weight_cp / total_c − targets[c][p])
//! ```
//!
//! It is negative for underweight parts. The aggregate imbalance of a
//! partition is the maximum entry over all criteria and parts.

use approx::abs_diff_eq;

use crate::error::{Error, Result};
use crate::model::{Partition, Weights};

/// Target normalized weights, indexed `[criterion][part]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Targets {
    matrix: Vec<Vec<f64>>,
}

impl Targets {
    /// Every part targets `1 / part_count` of every criterion.
    pub fn uniform(criterion_count: usize, part_count: usize) -> Targets {
        Targets {
            matrix: vec![vec![1.0 / part_count as f64; part_count]; criterion_count],
        }
    }

    /// Wraps an explicit target matrix.
    ///
    /// Entries must lie in `[0, 1]` and each criterion row must sum to one.
    pub fn new(matrix: Vec<Vec<f64>>) -> Result<Targets> {
        for (c, row) in matrix.iter().enumerate() {
            if row.iter().any(|&t| !(0.0..=1.0).contains(&t)) {
                return Err(Error::InvalidInput(format!(
                    "targets for criterion {c} are not all within [0, 1]",
                )));
            }
            let sum: f64 = row.iter().sum();
            if !abs_diff_eq!(sum, 1.0, epsilon = 1e-9) {
                return Err(Error::InvalidInput(format!(
                    "targets for criterion {c} sum to {sum}, expected 1",
                )));
            }
        }
        Ok(Targets { matrix })
    }

    pub fn criterion_count(&self) -> usize {
        self.matrix.len()
    }

    pub fn part_count(&self) -> usize {
        self.matrix.first().map_or(0, Vec::len)
    }

    pub fn get(&self, c: usize, p: usize) -> f64 {
        self.matrix[c][p]
    }
}

/// Computes the full `[criterion][part]` imbalance matrix from scratch.
///
/// `weights` must be normalized.
pub fn imbalances(
    weights: &Weights<f64>,
    partition: &Partition,
    targets: &Targets,
) -> Vec<Vec<f64>> {
    let part_count = partition.part_count();
    let part_weights = partition.part_weights(weights);
    (0..weights.criterion_count())
        .map(|c| {
            (0..part_count)
                .map(|p| part_count as f64 * (part_weights[p][c] - targets.get(c, p)))
                .collect()
        })
        .collect()
}

/// The aggregate imbalance: the maximum entry of the matrix.
pub fn imbalance(imbalances: &[Vec<f64>]) -> f64 {
    imbalances
        .iter()
        .flat_map(|row| row.iter().copied())
        .fold(f64::NEG_INFINITY, f64::max)
}

/// The maximum entry together with its criterion and part.
pub fn max_entry(imbalances: &[Vec<f64>]) -> (f64, usize, usize) {
    let mut best = (f64::NEG_INFINITY, 0, 0);
    for (c, row) in imbalances.iter().enumerate() {
        for (p, &imb) in row.iter().enumerate() {
            if imb > best.0 {
                best = (imb, c, p);
            }
        }
    }
    best
}

/// Applies the after-move update for a vertex of normalized weights `row`
/// moving from `source` to `target`: two entries change per criterion, the
/// rest of the matrix is untouched.
pub fn apply_move(
    imbalances: &mut [Vec<f64>],
    row: &[f64],
    source: usize,
    target: usize,
    part_count: usize,
) {
    for (c, &w) in row.iter().enumerate() {
        imbalances[c][source] -= part_count as f64 * w;
        imbalances[c][target] += part_count as f64 * w;
    }
}

/// Balance admissibility for FM moves.
///
/// Holds the working imbalance matrix and a per-criterion tolerance; a move
/// is admissible when the target part stays within tolerance on every
/// criterion after receiving the vertex.
#[derive(Debug, Clone)]
pub struct ImbalanceConstraint<'a> {
    weights: &'a Weights<f64>,
    part_count: usize,
    tolerances: Vec<f64>,
    imbalances: Vec<Vec<f64>>,
}

/// Deep copy of the constraint's mutable state, for rollback.
#[derive(Debug, Clone)]
pub struct ImbalanceState {
    imbalances: Vec<Vec<f64>>,
}

impl<'a> ImbalanceConstraint<'a> {
    /// `weights` must be normalized; a single tolerance is broadcast over
    /// all criteria by the caller.
    pub fn new(
        weights: &'a Weights<f64>,
        partition: &Partition,
        tolerances: Vec<f64>,
        targets: &Targets,
    ) -> Result<ImbalanceConstraint<'a>> {
        if tolerances.len() != weights.criterion_count() {
            return Err(Error::InvalidInput(format!(
                "{} tolerances for {} criteria",
                tolerances.len(),
                weights.criterion_count(),
            )));
        }
        Ok(ImbalanceConstraint {
            weights,
            part_count: partition.part_count(),
            imbalances: imbalances(weights, partition, targets),
            tolerances,
        })
    }

    /// Whether moving vertex `i` into `target` keeps every criterion within
    /// tolerance.
    pub fn can_move(&self, i: usize, _source: usize, target: usize) -> bool {
        self.weights
            .row(i)
            .iter()
            .zip(&self.tolerances)
            .enumerate()
            .all(|(c, (&w, &tolerance))| {
                self.imbalances[c][target] + self.part_count as f64 * w <= tolerance
            })
    }

    /// Records that vertex `i` moved from `source` to `target`.
    pub fn moved(&mut self, i: usize, source: usize, target: usize) {
        apply_move(
            &mut self.imbalances,
            self.weights.row(i),
            source,
            target,
            self.part_count,
        );
    }

    /// Current aggregate imbalance.
    pub fn current(&self) -> f64 {
        imbalance(&self.imbalances)
    }

    pub fn imbalances(&self) -> &[Vec<f64>] {
        &self.imbalances
    }

    /// Deep-copies the imbalance matrix (and only that).
    pub fn snapshot(&self) -> ImbalanceState {
        ImbalanceState {
            imbalances: self.imbalances.clone(),
        }
    }

    pub fn restore(&mut self, state: ImbalanceState) {
        self.imbalances = state.imbalances;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_ulps_eq;

    fn normalized(rows: Vec<Vec<i64>>) -> Weights<f64> {
        Weights::from_rows(rows).unwrap().normalized().unwrap()
    }

    #[test]
    fn balanced_partition_has_zero_imbalance() {
        let weights = normalized(vec![vec![1], vec![1], vec![1], vec![1]]);
        let partition = Partition::from_parts(Some(2), vec![0, 1, 0, 1]).unwrap();
        let targets = Targets::uniform(1, 2);
        let imbs = imbalances(&weights, &partition, &targets);
        assert_ulps_eq!(imbalance(&imbs), 0.0);
    }

    #[test]
    fn all_in_one_has_full_imbalance() {
        let weights = normalized(vec![vec![1], vec![1], vec![1], vec![1]]);
        let partition = Partition::uniform(4, 2, 0).unwrap();
        let targets = Targets::uniform(1, 2);
        let imbs = imbalances(&weights, &partition, &targets);
        assert_ulps_eq!(imbs[0][0], 1.0);
        assert_ulps_eq!(imbs[0][1], -1.0);
        assert_ulps_eq!(imbalance(&imbs), 1.0);
    }

    #[test]
    fn after_move_update_matches_recompute() {
        let weights = normalized(vec![vec![4, 1], vec![3, 2], vec![2, 3], vec![1, 4]]);
        let mut partition = Partition::from_parts(Some(2), vec![0, 0, 1, 1]).unwrap();
        let targets = Targets::uniform(2, 2);
        let mut imbs = imbalances(&weights, &partition, &targets);
        apply_move(&mut imbs, weights.row(1), 0, 1, 2);
        partition.assign(1, 1);
        let recomputed = imbalances(&weights, &partition, &targets);
        for (row, expected) in imbs.iter().zip(&recomputed) {
            for (&got, &want) in row.iter().zip(expected) {
                assert_ulps_eq!(got, want, max_ulps = 8);
            }
        }
    }

    #[test]
    fn constraint_blocks_overload() {
        let weights = normalized(vec![vec![1], vec![1], vec![1], vec![1]]);
        let partition = Partition::from_parts(Some(2), vec![0, 1, 0, 1]).unwrap();
        let targets = Targets::uniform(1, 2);
        let constraint =
            ImbalanceConstraint::new(&weights, &partition, vec![0.0], &targets).unwrap();
        // Any move overloads the target part under a zero tolerance.
        assert!(!constraint.can_move(0, 0, 1));

        let loose = ImbalanceConstraint::new(&weights, &partition, vec![1.0], &targets).unwrap();
        assert!(loose.can_move(0, 0, 1));
    }

    #[test]
    fn snapshot_restores_state() {
        let weights = normalized(vec![vec![1], vec![2], vec![3]]);
        let partition = Partition::from_parts(Some(2), vec![0, 1, 0]).unwrap();
        let targets = Targets::uniform(1, 2);
        let mut constraint =
            ImbalanceConstraint::new(&weights, &partition, vec![0.5], &targets).unwrap();
        let state = constraint.snapshot();
        let before = constraint.current();
        constraint.moved(0, 0, 1);
        assert!(constraint.current() != before);
        constraint.restore(state);
        assert_ulps_eq!(constraint.current(), before);
    }

    #[test]
    fn targets_must_sum_to_one() {
        assert!(Targets::new(vec![vec![0.5, 0.4]]).is_err());
        assert!(Targets::new(vec![vec![0.5, 0.5]]).is_ok());
        assert!(Targets::new(vec![vec![1.5, -0.5]]).is_err());
    }
}
