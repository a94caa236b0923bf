//! The phase runner: sequences partitioning phases over a multilevel
//! stack.
//!
//! A run is a list of [`Phase`] values executed in order. The runner owns
//! the multilevel stack, the active partition and the single pseudo-random
//! stream every stochastic phase draws from, so reseeding once makes a
//! whole run reproducible.
//!
//! Conditional control flow is data, not code: `Repeat` re-runs its body
//! until a boolean expression over [`Condition`] outputs holds (keeping the
//! best trial), and `Alt` runs the first arm whose conditions hold.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::algorithms::direct::{all_in_one_part, random_part};
use crate::algorithms::fm::{fm_refine, FmConfig};
use crate::algorithms::vn_best::{vn_best_refine, VnBestConfig};
use crate::algorithms::vn_first::{vn_first_refine, VnFirstConfig};
use crate::cut::cut;
use crate::error::{Error, Result};
use crate::imbalance::{imbalance, imbalances, Targets};
use crate::model::{ModelSet, Partition};
use crate::multilevel::{CoarsenConfig, MultilevelStack};

/// Initial partitioners available to [`Phase::Initial`].
#[derive(Debug, Clone)]
pub enum InitialAlgo {
    AllInOne { part: usize },
    Random,
}

/// Refiners available to [`Phase::Refine`].
#[derive(Debug, Clone)]
pub enum RefineAlgo {
    Fm(FmConfig),
    VnFirst(VnFirstConfig),
    VnBest(VnBestConfig),
}

/// How a seed phase reseeds the process-wide stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedPhase {
    Fixed(u64),
    /// A fresh seed drawn from the entropy source.
    FreshRandom,
    /// Monotonically increasing seeds: 1, 2, 3, ...
    Increasing,
}

/// Which level's vertex count a [`Condition::NodeCount`] compares against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountReference {
    /// The bound is `factor` itself.
    Fixed,
    /// The level right under the coarsest one.
    Finer,
    /// The original topology.
    Original,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
}

/// Boolean observations on the run state.
#[derive(Debug, Clone)]
pub enum Condition {
    /// Compares the current vertex count with `factor` times a reference
    /// count, e.g. "current ≤ 120" or "current ≥ 0.9 × finer".
    NodeCount {
        cmp: Comparison,
        factor: f64,
        reference: CountReference,
    },
    /// Whether the active partition keeps every criterion within
    /// `tolerance`.
    ValidPartition { tolerance: f64 },
}

/// Boolean combiner over the outputs of a condition list.
#[derive(Debug, Clone)]
pub enum Expr {
    Cond(usize),
    Not(Box<Expr>),
    And(Vec<Expr>),
    Or(Vec<Expr>),
}

impl Expr {
    fn eval(&self, outputs: &[bool]) -> Result<bool> {
        match self {
            Expr::Cond(i) => outputs.get(*i).copied().ok_or_else(|| {
                Error::InvalidInput(format!("expression refers to unknown condition {i}"))
            }),
            Expr::Not(inner) => Ok(!inner.eval(outputs)?),
            Expr::And(terms) => {
                for term in terms {
                    if !term.eval(outputs)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Expr::Or(terms) => {
                for term in terms {
                    if term.eval(outputs)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }
}

/// One arm of an [`Phase::Alt`] branch.
#[derive(Debug, Clone)]
pub struct Arm {
    pub conditions: Vec<Condition>,
    /// Combiner over the condition outputs; all of them must hold when
    /// absent.
    pub expr: Option<Expr>,
    pub phases: Vec<Phase>,
}

/// One step of a run.
#[derive(Debug, Clone)]
pub enum Phase {
    /// Computes a partition of the current level from scratch.
    Initial { part_count: usize, algo: InitialAlgo },
    /// Improves the active partition in place.
    Refine(RefineAlgo),
    /// Matches and coarsens the current level.
    Coarsen(CoarsenConfig),
    /// Repeats [`Phase::Coarsen`] until the stop expression over
    /// `conditions` holds or coarsening stalls.
    CoarsenUntil {
        config: CoarsenConfig,
        conditions: Vec<Condition>,
        expr: Option<Expr>,
    },
    /// Maps the active partition one level down and pops the stack.
    Prolong,
    /// Reseeds the random stream.
    SetRandomSeed(SeedPhase),
    /// Runs the body up to `trials` times, keeping the best partition
    /// (validity first, then cut), and stops early once the expression
    /// over `conditions` holds.
    Repeat {
        phases: Vec<Phase>,
        trials: usize,
        conditions: Vec<Condition>,
        expr: Option<Expr>,
    },
    /// Runs the first arm whose conditions hold, or `otherwise`.
    Alt {
        arms: Vec<Arm>,
        otherwise: Vec<Phase>,
    },
    /// Does nothing.
    Pass,
}

/// Executes phases against a multilevel stack.
#[derive(Debug)]
pub struct Runner {
    stack: MultilevelStack,
    partition: Option<Partition>,
    rng: StdRng,
    next_seed: u64,
}

impl Runner {
    pub fn new(models: ModelSet) -> Runner {
        Runner {
            stack: MultilevelStack::new(models),
            partition: None,
            rng: StdRng::seed_from_u64(1),
            next_seed: 1,
        }
    }

    pub fn partition(&self) -> Option<&Partition> {
        self.partition.as_ref()
    }

    pub fn stack(&self) -> &MultilevelStack {
        &self.stack
    }

    /// The final partition of a finished run.
    pub fn into_partition(self) -> Result<Partition> {
        self.partition
            .ok_or(Error::MissingArgument("no phase produced a partition"))
    }

    pub fn run(&mut self, phases: &[Phase]) -> Result<()> {
        for phase in phases {
            self.run_phase(phase)?;
        }
        Ok(())
    }

    fn run_phase(&mut self, phase: &Phase) -> Result<()> {
        match phase {
            Phase::Initial { part_count, algo } => {
                if *part_count == 0 {
                    return Err(Error::MissingArgument("part_count"));
                }
                let models = self.stack.current();
                let partition = match algo {
                    InitialAlgo::AllInOne { part } => all_in_one_part(models, *part_count, *part)?,
                    InitialAlgo::Random => random_part(models, *part_count, &mut self.rng)?,
                };
                info!(parts = *part_count, vertices = partition.len(), "initial partition");
                self.partition = Some(partition);
            }
            Phase::Refine(algo) => {
                let mut partition = self
                    .partition
                    .take()
                    .ok_or(Error::MissingArgument("partition"))?;
                let models = self.stack.current();
                match algo {
                    RefineAlgo::Fm(config) => {
                        let report = fm_refine(models, &mut partition, config, &mut self.rng)?;
                        info!(
                            cut_before = report.cut_before,
                            cut_after = report.cut_after,
                            moves = report.moves,
                            "fm refinement"
                        );
                    }
                    RefineAlgo::VnFirst(config) => {
                        let report = vn_first_refine(models, &mut partition, config, &mut self.rng)?;
                        info!(
                            imbalance = report.imbalance_after,
                            moves = report.moves,
                            "vn first refinement"
                        );
                    }
                    RefineAlgo::VnBest(config) => {
                        let report = vn_best_refine(models, &mut partition, config)?;
                        info!(
                            imbalance = report.imbalance_after,
                            moves = report.moves,
                            "vn best refinement"
                        );
                    }
                }
                self.partition = Some(partition);
            }
            Phase::Coarsen(config) => {
                self.stack.coarsen(config, &mut self.rng)?;
            }
            Phase::CoarsenUntil {
                config,
                conditions,
                expr,
            } => loop {
                if self.eval_stop(conditions, expr)? {
                    break;
                }
                let report = self.stack.coarsen(config, &mut self.rng)?;
                if report.coarse_count == report.fine_count {
                    break;
                }
            },
            Phase::Prolong => {
                let partition = self
                    .partition
                    .take()
                    .ok_or(Error::MissingArgument("partition"))?;
                self.partition = Some(self.stack.prolong(&partition)?);
            }
            Phase::SetRandomSeed(seed) => {
                let value = match seed {
                    SeedPhase::Fixed(value) => *value,
                    SeedPhase::FreshRandom => rand::rngs::OsRng.gen(),
                    SeedPhase::Increasing => {
                        let value = self.next_seed;
                        self.next_seed += 1;
                        value
                    }
                };
                debug!(seed = value, "reseeded the random stream");
                self.rng = StdRng::seed_from_u64(value);
            }
            Phase::Repeat {
                phases,
                trials,
                conditions,
                expr,
            } => {
                let saved_stack = self.stack.clone();
                let saved_partition = self.partition.clone();
                let mut best: Option<(bool, i64, MultilevelStack, Option<Partition>)> = None;
                for trial in 0..*trials {
                    if trial > 0 {
                        self.stack = saved_stack.clone();
                        self.partition = saved_partition.clone();
                    }
                    self.run(phases)?;
                    let score = self.trial_score(conditions)?;
                    debug!(trial, valid = score.0, cut = score.1, "repeat trial");
                    let better = match &best {
                        None => true,
                        Some((best_valid, best_cut, _, _)) => {
                            (score.0 && !best_valid)
                                || (score.0 == *best_valid && score.1 < *best_cut)
                        }
                    };
                    if better {
                        best = Some((score.0, score.1, self.stack.clone(), self.partition.clone()));
                    }
                    if self.eval_stop(conditions, expr)? {
                        break;
                    }
                }
                if let Some((_, _, stack, partition)) = best {
                    self.stack = stack;
                    self.partition = partition;
                }
            }
            Phase::Alt { arms, otherwise } => {
                for arm in arms {
                    if self.eval_stop(&arm.conditions, &arm.expr)? {
                        return self.run(&arm.phases);
                    }
                }
                self.run(otherwise)?;
            }
            Phase::Pass => {}
        }
        Ok(())
    }

    fn eval_stop(&self, conditions: &[Condition], expr: &Option<Expr>) -> Result<bool> {
        let outputs = conditions
            .iter()
            .map(|condition| self.eval_condition(condition))
            .collect::<Result<Vec<bool>>>()?;
        match expr {
            Some(expr) => expr.eval(&outputs),
            None => Ok(outputs.iter().all(|&b| b)),
        }
    }

    fn eval_condition(&self, condition: &Condition) -> Result<bool> {
        match condition {
            Condition::NodeCount {
                cmp,
                factor,
                reference,
            } => {
                let current = self.stack.current().vertex_count() as f64;
                let reference = match reference {
                    CountReference::Fixed => 1,
                    CountReference::Finer => self
                        .stack
                        .finer()
                        .unwrap_or_else(|| self.stack.current())
                        .vertex_count(),
                    CountReference::Original => self.stack.finest().vertex_count(),
                } as f64;
                let bound = factor * reference;
                Ok(match cmp {
                    Comparison::Less => current < bound,
                    Comparison::LessEqual => current <= bound,
                    Comparison::Greater => current > bound,
                    Comparison::GreaterEqual => current >= bound,
                })
            }
            Condition::ValidPartition { tolerance } => match &self.partition {
                None => Ok(false),
                Some(partition) => {
                    let normalized = self.stack.current().vertex_weights().normalized()?;
                    let targets =
                        Targets::uniform(normalized.criterion_count(), partition.part_count());
                    let imbs = imbalances(&normalized, partition, &targets);
                    Ok(imbalance(&imbs) <= *tolerance)
                }
            },
        }
    }

    /// Validity (under any configured tolerance) and cut of the active
    /// state, used to rank repeat trials.
    fn trial_score(&self, conditions: &[Condition]) -> Result<(bool, i64)> {
        let valid = conditions
            .iter()
            .filter(|condition| matches!(condition, Condition::ValidPartition { .. }))
            .map(|condition| self.eval_condition(condition))
            .collect::<Result<Vec<bool>>>()?
            .iter()
            .all(|&b| b);
        let cut = match &self.partition {
            None => 0,
            Some(partition) => {
                let models = self.stack.current();
                cut(models.topology(), models.edge_weights(), partition, 0)?
            }
        };
        Ok((valid, cut))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::fm::{StopInner, StopOuter, TieBreak};
    use crate::model::Graph;
    use crate::multilevel::Matcher;

    fn models(n: usize) -> ModelSet {
        let graph = Graph::from_edges(n, (0..n - 1).map(|i| [i, i + 1]).collect()).unwrap();
        ModelSet::new(graph, None, None, None).unwrap()
    }

    fn coarsen_config() -> CoarsenConfig {
        CoarsenConfig {
            matcher: Matcher::First,
            ..CoarsenConfig::default()
        }
    }

    #[test]
    fn multilevel_round_trip_lands_everyone_in_part_zero() {
        let mut runner = Runner::new(models(8));
        runner
            .run(&[
                Phase::Coarsen(coarsen_config()),
                Phase::Initial {
                    part_count: 2,
                    algo: InitialAlgo::AllInOne { part: 0 },
                },
                Phase::Prolong,
            ])
            .unwrap();
        let partition = runner.into_partition().unwrap();
        assert_eq!(partition.parts(), &[0; 8]);
    }

    #[test]
    fn coarsen_until_respects_the_node_count_condition() {
        let mut runner = Runner::new(models(32));
        runner
            .run(&[Phase::CoarsenUntil {
                config: coarsen_config(),
                conditions: vec![Condition::NodeCount {
                    cmp: Comparison::LessEqual,
                    factor: 6.0,
                    reference: CountReference::Fixed,
                }],
                expr: Some(Expr::Cond(0)),
            }])
            .unwrap();
        // 32 → 16 → 8 → 4 stops at the first level at or under 6 vertices.
        assert_eq!(runner.stack().current().vertex_count(), 4);
        assert_eq!(runner.stack().depth(), 4);
    }

    #[test]
    fn full_pipeline_produces_a_refined_bipartition() {
        let mut runner = Runner::new(models(16));
        let fm = FmConfig {
            tolerances: vec![0.5],
            tie_break: TieBreak::First,
            stop_inner: StopInner::AllLocked,
            stop_outer: StopOuter::NoImprovement,
            ..FmConfig::default()
        };
        runner
            .run(&[
                Phase::SetRandomSeed(SeedPhase::Fixed(7)),
                Phase::CoarsenUntil {
                    config: coarsen_config(),
                    conditions: vec![Condition::NodeCount {
                        cmp: Comparison::LessEqual,
                        factor: 0.25,
                        reference: CountReference::Original,
                    }],
                    expr: Some(Expr::Cond(0)),
                },
                Phase::Initial {
                    part_count: 2,
                    algo: InitialAlgo::Random,
                },
                Phase::Refine(RefineAlgo::VnFirst(VnFirstConfig::default())),
                Phase::Prolong,
                Phase::Refine(RefineAlgo::Fm(fm)),
                Phase::Prolong,
            ])
            .unwrap();
        let partition = runner.into_partition().unwrap();
        assert_eq!(partition.len(), 16);
        assert_eq!(partition.part_count(), 2);
    }

    #[test]
    fn repeat_keeps_the_best_trial() {
        let mut runner = Runner::new(models(6));
        runner
            .run(&[
                Phase::SetRandomSeed(SeedPhase::Fixed(3)),
                Phase::Repeat {
                    phases: vec![Phase::Initial {
                        part_count: 2,
                        algo: InitialAlgo::Random,
                    }],
                    trials: 8,
                    conditions: vec![Condition::ValidPartition { tolerance: 0.4 }],
                    expr: None,
                },
            ])
            .unwrap();
        assert!(runner.partition().is_some());
    }

    #[test]
    fn refine_without_partition_is_a_missing_argument() {
        let mut runner = Runner::new(models(4));
        let err = runner
            .run(&[Phase::Refine(RefineAlgo::VnBest(VnBestConfig::default()))])
            .unwrap_err();
        assert!(matches!(err, Error::MissingArgument(_)));
    }
}
