//! Best-gain balance refiner.
//!
//! Works on the vector-of-numbers view of the partition: only vertex
//! weights matter. For every `(part, criterion)` pair the refiner keeps the
//! analytic gain of moving each vertex in or out of the part, stored in
//! weight-sorted order. The gain is piecewise linear and unimodal along
//! that order, so the best candidate sits at a known *inflection* position
//! and probing walks outward from it.
//!
//! With `u` the signed imbalance of the pair, `k` the part count and `w`
//! the vertex's normalized weight:
//!
//! - removal from the part: `−k·w` if `u ≤ 0`, else `k·w` while `k·w < u`,
//!   else `2u − k·w`;
//! - insertion into the part: `−k·w` if `u ≥ 0`, else `k·w` while
//!   `k·w < −u`, else `−2u − k·w`.
//!
//! Vertices whose largest normalized weight reaches the aggregate
//! imbalance can never improve it and carry a sentinel "never move" gain.
//! Candidate moves are always re-evaluated exactly on the imbalance matrix
//! before acceptance; the gain arrays only order the probe.

use std::mem;

use tracing::{debug, trace};

use crate::algorithms::vn_first::VnReport;
use crate::error::{Error, Result};
use crate::imbalance::{apply_move, imbalances, max_entry, Targets};
use crate::model::{ModelSet, Partition, Weights};

/// Options of the best-gain refiner.
#[derive(Debug, Clone, Default)]
pub struct VnBestConfig {
    pub targets: Option<Targets>,
}

/// A fully evaluated move: the state of the imbalance matrix if applied.
struct Candidate {
    vertex: usize,
    target: usize,
    umax: f64,
    cmax: usize,
    pmax: usize,
    imbalances: Vec<Vec<f64>>,
}

struct VnGainTable<'a> {
    weights: &'a Weights<f64>,
    part_count: usize,
    criterion_count: usize,
    /// Largest normalized weight of each vertex, for the sentinel test.
    max_norm: Vec<f64>,
    /// `sorted[c][pos]`: vertex at `pos` in the weight order of criterion `c`.
    sorted: Vec<Vec<usize>>,
    /// `position[c][vertex]`: inverse of `sorted`.
    position: Vec<Vec<usize>>,
    /// `gains[p][c][pos]`; `None` is the sentinel.
    gains: Vec<Vec<Vec<Option<f64>>>>,
    /// Position of the maximal gain per `(part, criterion)`.
    inflection: Vec<Vec<usize>>,
    /// `[criterion][part]` imbalance matrix.
    imbs: Vec<Vec<f64>>,
    umax: f64,
    cmax: usize,
    pmax: usize,
}

impl<'a> VnGainTable<'a> {
    fn new(weights: &'a Weights<f64>, partition: &Partition, targets: &Targets) -> VnGainTable<'a> {
        let vertex_count = weights.item_count();
        let criterion_count = weights.criterion_count();
        let part_count = partition.part_count();
        let imbs = imbalances(weights, partition, targets);
        let (umax, cmax, pmax) = max_entry(&imbs);

        let max_norm: Vec<f64> = (0..vertex_count)
            .map(|i| weights.row(i).iter().copied().fold(0.0, f64::max))
            .collect();
        let mut sorted = Vec::with_capacity(criterion_count);
        let mut position = vec![vec![0; vertex_count]; criterion_count];
        for c in 0..criterion_count {
            let mut order: Vec<usize> = (0..vertex_count).collect();
            order.sort_by(|&a, &b| weights.get(a, c).partial_cmp(&weights.get(b, c)).unwrap());
            for (pos, &vertex) in order.iter().enumerate() {
                position[c][vertex] = pos;
            }
            sorted.push(order);
        }

        let mut table = VnGainTable {
            weights,
            part_count,
            criterion_count,
            max_norm,
            sorted,
            position,
            gains: vec![vec![vec![None; vertex_count]; criterion_count]; part_count],
            inflection: vec![vec![0; criterion_count]; part_count],
            imbs,
            umax,
            cmax,
            pmax,
        };
        let parts = partition.parts();
        for p in 0..part_count {
            for c in 0..criterion_count {
                for pos in 0..vertex_count {
                    let vertex = table.sorted[c][pos];
                    let gain = table.gain(vertex, c, p, parts);
                    table.gains[p][c][pos] = gain;
                }
                table.rescan_inflection(p, c);
            }
        }
        table
    }

    fn gain(&self, vertex: usize, c: usize, p: usize, parts: &[usize]) -> Option<f64> {
        if self.max_norm[vertex] >= self.umax {
            return None;
        }
        let k = self.part_count as f64;
        let w = self.weights.get(vertex, c);
        let u = self.imbs[c][p];
        let gain = if parts[vertex] == p {
            if u <= 0.0 {
                -k * w
            } else if k * w < u {
                k * w
            } else {
                2.0 * u - k * w
            }
        } else if u >= 0.0 {
            -k * w
        } else if k * w < -u {
            k * w
        } else {
            -2.0 * u - k * w
        };
        Some(gain)
    }

    fn rescan_inflection(&mut self, p: usize, c: usize) {
        let row = &self.gains[p][c];
        let mut best_pos = 0;
        let mut best_gain = f64::NEG_INFINITY;
        for (pos, gain) in row.iter().enumerate() {
            if let Some(gain) = gain {
                if *gain > best_gain {
                    best_gain = *gain;
                    best_pos = pos;
                }
            }
        }
        self.inflection[p][c] = best_pos;
    }

    /// Probes removal candidates of the overloaded part, walking outward
    /// from the inflection position, and returns the move minimizing the
    /// post-move aggregate imbalance.
    fn find_move(&self, parts: &[usize]) -> Option<Candidate> {
        if self.umax <= 0.0 {
            return None;
        }
        let (cmax, source) = (self.cmax, self.pmax);
        let row = &self.gains[source][cmax];
        let mut probe = Probe::new(self.inflection[source][cmax]);
        let mut best: Option<Candidate> = None;

        while let Some(pos) = probe.next(row) {
            let vertex = self.sorted[cmax][pos];
            if parts[vertex] != source {
                continue;
            }
            let mut saturated = false;
            for target in 0..self.part_count {
                if target == source {
                    continue;
                }
                let mut imbs = self.imbs.clone();
                apply_move(
                    &mut imbs,
                    self.weights.row(vertex),
                    source,
                    target,
                    self.part_count,
                );
                let (umax, new_cmax, new_pmax) = max_entry(&imbs);
                if best.as_ref().map_or(true, |b| umax < b.umax) {
                    best = Some(Candidate {
                        vertex,
                        target,
                        umax,
                        cmax: new_cmax,
                        pmax: new_pmax,
                        imbalances: imbs,
                    });
                }
                // The overloaded pair did not change: by unimodality no
                // later candidate in the scan can do better.
                if new_cmax == cmax && new_pmax == source {
                    saturated = true;
                }
            }
            if saturated {
                break;
            }
        }
        best
    }

    /// Applies an accepted candidate; `parts` already reflects the move.
    fn apply(&mut self, candidate: &Candidate, parts: &[usize]) {
        let source = self.pmax;
        let umax_old = self.umax;
        let old_imbs = mem::replace(&mut self.imbs, candidate.imbalances.clone());
        self.umax = candidate.umax;
        self.cmax = candidate.cmax;
        self.pmax = candidate.pmax;

        // Vertices whose sentinel status flips with the new aggregate.
        let flipped: Vec<usize> = (0..self.max_norm.len())
            .filter(|&i| (self.max_norm[i] >= umax_old) != (self.max_norm[i] >= self.umax))
            .collect();

        let k = self.part_count as f64;
        for p in 0..self.part_count {
            for c in 0..self.criterion_count {
                // Only the source and target columns of the imbalance
                // matrix moved; their gain windows need re-evaluation.
                if p == source || p == candidate.target {
                    let old_u = old_imbs[c][p];
                    let new_u = self.imbs[c][p];
                    let low = old_u.min(new_u) / (2.0 * k);
                    let high = old_u.abs().max(new_u.abs()) / k;
                    let begin = self.sorted[c]
                        .partition_point(|&v| self.weights.get(v, c) < low);
                    for pos in begin..self.sorted[c].len() {
                        let vertex = self.sorted[c][pos];
                        if self.weights.get(vertex, c) > high {
                            break;
                        }
                        let gain = self.gain(vertex, c, p, parts);
                        self.gains[p][c][pos] = gain;
                    }
                }
                // The moved vertex changed membership everywhere, and
                // flipped vertices changed sentinel status everywhere.
                let pos = self.position[c][candidate.vertex];
                let gain = self.gain(candidate.vertex, c, p, parts);
                self.gains[p][c][pos] = gain;
                for &vertex in &flipped {
                    let pos = self.position[c][vertex];
                    let gain = self.gain(vertex, c, p, parts);
                    self.gains[p][c][pos] = gain;
                }
                self.rescan_inflection(p, c);
            }
        }
    }
}

/// Outward walk from the inflection position, skipping sentinel entries and
/// always extending toward the neighbor of greater gain.
struct Probe {
    start: Option<usize>,
    lower: isize,
    upper: usize,
}

impl Probe {
    fn new(start: usize) -> Probe {
        Probe {
            start: Some(start),
            lower: start as isize - 1,
            upper: start + 1,
        }
    }

    fn next(&mut self, row: &[Option<f64>]) -> Option<usize> {
        if let Some(start) = self.start.take() {
            if row.get(start).copied().flatten().is_some() {
                return Some(start);
            }
        }
        while self.lower >= 0 && row[self.lower as usize].is_none() {
            self.lower -= 1;
        }
        while self.upper < row.len() && row[self.upper].is_none() {
            self.upper += 1;
        }
        let lower_gain = (self.lower >= 0).then(|| row[self.lower as usize].unwrap());
        let upper_gain = (self.upper < row.len()).then(|| row[self.upper].unwrap());
        match (lower_gain, upper_gain) {
            (None, None) => None,
            (Some(_), None) => {
                let pos = self.lower as usize;
                self.lower -= 1;
                Some(pos)
            }
            (None, Some(_)) => {
                let pos = self.upper;
                self.upper += 1;
                Some(pos)
            }
            (Some(lower), Some(upper)) => {
                if upper > lower {
                    let pos = self.upper;
                    self.upper += 1;
                    Some(pos)
                } else {
                    let pos = self.lower as usize;
                    self.lower -= 1;
                    Some(pos)
                }
            }
        }
    }
}

/// Refines `partition` in place, repeatedly applying the move that most
/// decreases the aggregate imbalance, until no move strictly decreases it.
pub fn vn_best_refine(
    models: &ModelSet,
    partition: &mut Partition,
    config: &VnBestConfig,
) -> Result<VnReport> {
    let vertex_count = models.vertex_count();
    if partition.len() != vertex_count {
        return Err(Error::InvalidInput(format!(
            "partition of {} vertices for a topology of {vertex_count}",
            partition.len(),
        )));
    }
    let normalized = models.vertex_weights().normalized()?;
    let targets = match &config.targets {
        Some(targets) => targets.clone(),
        None => Targets::uniform(normalized.criterion_count(), partition.part_count()),
    };

    let mut table = VnGainTable::new(&normalized, partition, &targets);
    let mut report = VnReport {
        moves: 0,
        imbalance_before: table.umax,
        imbalance_after: table.umax,
    };

    while let Some(candidate) = table.find_move(partition.parts()) {
        if candidate.umax >= table.umax {
            break;
        }
        trace!(
            vertex = candidate.vertex,
            target = candidate.target,
            imbalance = candidate.umax,
            "vn best move"
        );
        partition.assign(candidate.vertex, candidate.target);
        table.apply(&candidate, partition.parts());
        report.moves += 1;
    }

    report.imbalance_after = table.umax;
    debug!(
        moves = report.moves,
        imbalance = report.imbalance_after,
        "vn best done"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Graph, Weights};
    use approx::assert_ulps_eq;

    fn models_with_weights(rows: Vec<Vec<i64>>) -> ModelSet {
        let n = rows.len();
        let graph = Graph::from_edges(n, (0..n - 1).map(|i| [i, i + 1]).collect()).unwrap();
        ModelSet::new(graph, Some(Weights::from_rows(rows).unwrap()), None, None).unwrap()
    }

    #[test]
    fn empties_the_overloaded_part_down_to_balance() {
        let models = models_with_weights(vec![vec![4], vec![3], vec![2], vec![1]]);
        let mut partition = Partition::uniform(4, 2, 0).unwrap();
        let report =
            vn_best_refine(&models, &mut partition, &VnBestConfig::default()).unwrap();
        assert_ulps_eq!(report.imbalance_before, 1.0, max_ulps = 8);
        assert!(report.imbalance_after.abs() < 1e-9);
        // Both parts end with half of the total weight.
        let sums = partition.part_weights(models.vertex_weights());
        assert_eq!(sums[0][0], 5);
        assert_eq!(sums[1][0], 5);
    }

    #[test]
    fn stops_when_no_move_improves() {
        let models = models_with_weights(vec![vec![3], vec![1], vec![1], vec![1]]);
        let mut partition = Partition::from_parts(Some(3), vec![0, 0, 1, 2]).unwrap();
        let report =
            vn_best_refine(&models, &mut partition, &VnBestConfig::default()).unwrap();
        // The light vertex leaves the overloaded part; the heavy one can
        // only make things worse, so refinement stops at 0.5.
        assert_eq!(report.moves, 1);
        assert_ulps_eq!(report.imbalance_after, 0.5, max_ulps = 8);
        assert_eq!(partition.part(0), 0);
    }

    #[test]
    fn balanced_input_makes_no_moves() {
        let models = models_with_weights(vec![vec![1], vec![1], vec![1], vec![1]]);
        let mut partition = Partition::from_parts(Some(2), vec![0, 1, 1, 0]).unwrap();
        let report =
            vn_best_refine(&models, &mut partition, &VnBestConfig::default()).unwrap();
        assert_eq!(report.moves, 0);
        assert!(report.imbalance_after.abs() < 1e-9);
    }

    #[test]
    fn multi_criteria_moves_strictly_decrease_the_aggregate() {
        let models = models_with_weights(vec![
            vec![5, 1],
            vec![4, 2],
            vec![3, 3],
            vec![2, 4],
            vec![1, 5],
            vec![3, 3],
        ]);
        let mut partition = Partition::from_parts(Some(2), vec![0, 0, 0, 0, 1, 1]).unwrap();
        let report =
            vn_best_refine(&models, &mut partition, &VnBestConfig::default()).unwrap();
        assert!(report.imbalance_after < report.imbalance_before);
    }
}
