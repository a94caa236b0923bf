//! Fiduccia-Mattheyses refinement of the λ−1 cut.
//!
//! The refiner runs outer passes; each pass moves vertices one at a time,
//! always picking the best admissible move from the gain table, locking each
//! moved vertex for the rest of the pass. Negative-gain moves are accepted
//! (hill climbing); a snapshot of the best state seen protects the pass, and
//! is restored when the pass ends worse than it peaked.

pub mod gain_table;

use rand::Rng;
use tracing::{debug, trace};

use crate::cut::cut;
use crate::error::{Error, Result};
use crate::imbalance::{ImbalanceConstraint, ImbalanceState, Targets};
use crate::model::{ModelSet, Partition};

use gain_table::{GainTable, Move};

/// How to break ties between moves of equal gain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TieBreak {
    First,
    Last,
    Random,
}

impl TieBreak {
    pub(crate) fn pick<R: Rng>(self, candidates: &[Move], rng: &mut R) -> Option<Move> {
        match self {
            TieBreak::First => candidates.first().copied(),
            TieBreak::Last => candidates.last().copied(),
            TieBreak::Random => {
                if candidates.is_empty() {
                    None
                } else {
                    Some(candidates[rng.gen_range(0..candidates.len())])
                }
            }
        }
    }
}

/// When an inner pass stops moving vertices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopInner {
    /// Stop once every vertex has been moved (and therefore locked).
    AllLocked,
    /// Stop after this many negative-gain moves in the pass.
    NegativeMoves(usize),
    /// Stop after this many negative-gain moves in a row; a positive-gain
    /// move resets the streak.
    ConsecutiveNegativeMoves(usize),
}

/// When the outer refinement loop stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOuter {
    /// Stop once a pass fails to strictly improve the cut.
    NoImprovement,
    /// Stop after a fixed number of passes.
    Passes(usize),
}

/// FM options; the defaults mirror the usual refinement setup.
#[derive(Debug, Clone)]
pub struct FmConfig {
    /// Per-criterion imbalance tolerance; a single value is broadcast over
    /// all criteria.
    pub tolerances: Vec<f64>,
    /// Target weights; uniform when absent.
    pub targets: Option<Targets>,
    pub tie_break: TieBreak,
    pub stop_inner: StopInner,
    pub stop_outer: StopOuter,
    /// Edge-weight criterion the cut is computed on.
    pub criterion: usize,
}

impl Default for FmConfig {
    fn default() -> FmConfig {
        FmConfig {
            tolerances: vec![0.05],
            targets: None,
            tie_break: TieBreak::Last,
            stop_inner: StopInner::AllLocked,
            stop_outer: StopOuter::NoImprovement,
            criterion: 0,
        }
    }
}

/// What a refinement run did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FmReport {
    pub passes: usize,
    pub moves: usize,
    pub cut_before: i64,
    pub cut_after: i64,
}

/// Recovery state: the live copies are replaced wholesale at end-of-pass
/// when the pass ends worse than this snapshot.
struct Snapshot<'a> {
    partition: Partition,
    constraint: ImbalanceState,
    table: GainTable<'a>,
    objective: i64,
}

/// Refines `partition` in place.
pub fn fm_refine<R: Rng>(
    models: &ModelSet,
    partition: &mut Partition,
    config: &FmConfig,
    rng: &mut R,
) -> Result<FmReport> {
    let vertex_count = models.vertex_count();
    if partition.len() != vertex_count {
        return Err(Error::InvalidInput(format!(
            "partition of {} vertices for a topology of {vertex_count}",
            partition.len(),
        )));
    }
    let cut_before = cut(
        models.topology(),
        models.edge_weights(),
        partition,
        config.criterion,
    )?;
    let mut report = FmReport {
        passes: 0,
        moves: 0,
        cut_before,
        cut_after: cut_before,
    };
    if partition.part_count() < 2 || vertex_count == 0 {
        return Ok(report);
    }

    let normalized = models.vertex_weights().normalized()?;
    let criterion_count = normalized.criterion_count();
    let tolerances = broadcast_tolerances(&config.tolerances, criterion_count)?;
    let targets = match &config.targets {
        Some(targets) => {
            if targets.criterion_count() != criterion_count
                || targets.part_count() != partition.part_count()
            {
                return Err(Error::InvalidInput(
                    "target matrix does not match the criteria and parts".to_string(),
                ));
            }
            targets.clone()
        }
        None => Targets::uniform(criterion_count, partition.part_count()),
    };

    let mut constraint = ImbalanceConstraint::new(&normalized, partition, tolerances, &targets)?;
    let mut table = GainTable::new(
        models.topology(),
        models.edge_weights(),
        config.criterion,
        partition,
    );

    let mut objective = cut_before;
    let mut best_objective = objective;
    let mut last_objective: Option<i64> = None;

    loop {
        match config.stop_outer {
            StopOuter::NoImprovement => {
                if let Some(last) = last_objective {
                    if last <= objective {
                        break;
                    }
                }
            }
            StopOuter::Passes(max) => {
                if report.passes >= max {
                    break;
                }
            }
        }
        last_objective = Some(objective);

        let mut locks = vec![false; vertex_count];
        let mut snapshot: Option<Snapshot<'_>> = None;
        let mut moves_done = 0usize;
        let mut moves_neg = 0usize;
        let mut moves_neg_row = 0usize;

        loop {
            let stop = match config.stop_inner {
                StopInner::AllLocked => moves_done >= vertex_count,
                StopInner::NegativeMoves(max) => moves_neg >= max,
                StopInner::ConsecutiveNegativeMoves(max) => moves_neg_row >= max,
            };
            if stop {
                break;
            }
            let Some((gain, mv)) = table.select(
                partition,
                &locks,
                &constraint,
                config.tie_break,
                rng,
            ) else {
                // No admissible vertex left; the pass exits cleanly.
                break;
            };

            let new_objective = objective - gain;
            // About to worsen while at least as good as anything recorded:
            // save the pre-move state so the pass can fall back to it.
            if gain <= 0 && objective <= best_objective {
                snapshot = Some(Snapshot {
                    partition: partition.clone(),
                    constraint: constraint.snapshot(),
                    table: table.clone(),
                    objective,
                });
                best_objective = objective;
            }

            partition.assign(mv.vertex, mv.target);
            locks[mv.vertex] = true;
            table.apply_move(partition, mv, gain);
            constraint.moved(mv.vertex, mv.source, mv.target);
            objective = new_objective;
            moves_done += 1;
            report.moves += 1;
            if gain <= 0 {
                moves_neg += 1;
                moves_neg_row += 1;
            } else {
                moves_neg_row = 0;
            }
            trace!(
                vertex = mv.vertex,
                source = mv.source,
                target = mv.target,
                gain,
                objective,
                "fm move"
            );
        }

        // Recover the best state seen during the pass.
        if objective > best_objective {
            if let Some(snapshot) = snapshot {
                *partition = snapshot.partition;
                constraint.restore(snapshot.constraint);
                table = snapshot.table;
                objective = snapshot.objective;
            }
        }
        best_objective = objective;
        report.passes += 1;
        debug!(
            pass = report.passes,
            moves = moves_done,
            objective,
            imbalance = constraint.current(),
            "fm pass done"
        );
    }

    report.cut_after = objective;
    Ok(report)
}

fn broadcast_tolerances(tolerances: &[f64], criterion_count: usize) -> Result<Vec<f64>> {
    match tolerances.len() {
        0 => Err(Error::MissingArgument("tolerance")),
        1 => Ok(vec![tolerances[0]; criterion_count]),
        len if len == criterion_count => Ok(tolerances.to_vec()),
        len => Err(Error::InvalidInput(format!(
            "{len} tolerances for {criterion_count} criteria",
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Graph, Hypergraph, Weights};
    use rand::rngs::mock::StepRng;

    fn rng() -> StepRng {
        StepRng::new(0, 1)
    }

    fn path_models(n: usize) -> ModelSet {
        let graph = Graph::from_edges(n, (0..n - 1).map(|i| [i, i + 1]).collect()).unwrap();
        ModelSet::new(graph, None, None, None).unwrap()
    }

    #[test]
    fn refines_alternating_bipartition() {
        let models = path_models(4);
        let mut partition = Partition::from_parts(Some(2), vec![0, 1, 0, 1]).unwrap();
        // A 0.5 tolerance admits a one-vertex excess but forbids emptying a
        // part, so refinement settles on the two end pairs.
        let config = FmConfig {
            tolerances: vec![0.5],
            ..FmConfig::default()
        };
        let report = fm_refine(&models, &mut partition, &config, &mut rng()).unwrap();
        assert_eq!(report.cut_before, 3);
        assert_eq!(report.cut_after, 1);
        // One end pair per part.
        assert_ne!(partition.part(0), partition.part(3));
        assert_eq!(partition.part(0), partition.part(1));
        assert_eq!(partition.part(2), partition.part(3));
    }

    #[test]
    fn tight_tolerance_blocks_all_moves() {
        // 6-cycle, 3 parts, perfectly balanced: every move both worsens the
        // balance beyond a zero tolerance and would have to be rolled back.
        let graph = Graph::from_edges(
            6,
            vec![[0, 1], [1, 2], [2, 3], [3, 4], [4, 5], [5, 0]],
        )
        .unwrap();
        let models = ModelSet::new(graph, None, None, None).unwrap();
        let mut partition = Partition::from_parts(Some(3), vec![0, 1, 2, 0, 1, 2]).unwrap();
        let before = partition.clone();
        let config = FmConfig {
            tolerances: vec![0.0],
            ..FmConfig::default()
        };
        let report = fm_refine(&models, &mut partition, &config, &mut rng()).unwrap();
        assert_eq!(report.cut_before, 6);
        assert_eq!(report.cut_after, 6);
        assert_eq!(partition, before);
    }

    #[test]
    fn single_part_is_a_no_op() {
        let models = path_models(3);
        let mut partition = Partition::uniform(3, 1, 0).unwrap();
        let report =
            fm_refine(&models, &mut partition, &FmConfig::default(), &mut rng()).unwrap();
        assert_eq!(report.moves, 0);
        assert_eq!(report.cut_after, 0);
    }

    #[test]
    fn no_edges_makes_no_moves() {
        let graph = Graph::from_edges(4, Vec::new()).unwrap();
        let models = ModelSet::new(graph, None, None, None).unwrap();
        let mut partition = Partition::from_parts(Some(2), vec![0, 0, 1, 1]).unwrap();
        let config = FmConfig {
            tolerances: vec![0.1],
            ..FmConfig::default()
        };
        let report = fm_refine(&models, &mut partition, &config, &mut rng()).unwrap();
        assert_eq!(report.cut_before, 0);
        assert_eq!(report.cut_after, 0);
        assert_eq!(partition.parts(), &[0, 0, 1, 1]);
    }

    #[test]
    fn pass_never_ends_worse_than_it_started() {
        // An 8-vertex graph with heavier middle edges; allow hill climbing
        // through consecutive negative moves and check the recovery law.
        let graph = Graph::from_edges(
            8,
            vec![[0, 1], [1, 2], [2, 3], [3, 4], [4, 5], [5, 6], [6, 7], [1, 3], [4, 6]],
        )
        .unwrap();
        let edge_weights =
            Weights::from_rows(vec![vec![1], vec![2], vec![1], vec![3], vec![1], vec![2], vec![1], vec![1], vec![1]])
                .unwrap();
        let models = ModelSet::new(graph, None, Some(edge_weights), None).unwrap();
        let mut partition =
            Partition::from_parts(Some(2), vec![0, 1, 0, 1, 0, 1, 0, 1]).unwrap();
        let config = FmConfig {
            tolerances: vec![0.5],
            stop_inner: StopInner::ConsecutiveNegativeMoves(3),
            ..FmConfig::default()
        };
        let before = cut(models.topology(), models.edge_weights(), &partition, 0).unwrap();
        let report = fm_refine(&models, &mut partition, &config, &mut rng()).unwrap();
        let after = cut(models.topology(), models.edge_weights(), &partition, 0).unwrap();
        assert_eq!(report.cut_after, after);
        assert!(after <= before);
    }

    #[test]
    fn hypergraph_refinement_reduces_lambda_cut() {
        // Two tight clusters sharing one big hyperedge; start from a split
        // that cuts both cluster hyperedges.
        let hypergraph = Hypergraph::from_edges(
            6,
            vec![vec![0, 1, 2], vec![3, 4, 5], vec![2, 3]],
        )
        .unwrap();
        let models = ModelSet::new(hypergraph, None, None, None).unwrap();
        let mut partition = Partition::from_parts(Some(2), vec![0, 1, 0, 1, 0, 1]).unwrap();
        let config = FmConfig {
            tolerances: vec![1.0],
            ..FmConfig::default()
        };
        let report = fm_refine(&models, &mut partition, &config, &mut rng()).unwrap();
        assert!(report.cut_after < report.cut_before);
        let after = cut(models.topology(), models.edge_weights(), &partition, 0).unwrap();
        assert_eq!(after, report.cut_after);
    }
}
