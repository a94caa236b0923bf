//! Ordered gain tables for the FM cut refiner.
//!
//! A table records the current cut gain of every candidate move and keeps
//! the candidates bucketed by gain value, so that selection scans gains from
//! the largest downward and a move only updates the moved vertex and its
//! adjacency.
//!
//! The table is specialized once at construction: bipartitions keep one gain
//! per vertex (the other part is implied), k-way tables keep one gain per
//! `(vertex, target part)` pair. On graphs, neighbor gains are patched with
//! the `±2·w` increment; on hypergraphs they are recomputed from the λ−1
//! definition since a single hyperedge can straddle any number of parts.

use std::collections::BTreeMap;

use rand::Rng;

use crate::cut::move_gain;
use crate::imbalance::ImbalanceConstraint;
use crate::model::{Partition, Topology, Weights};

use super::TieBreak;

/// A selected move: vertex and its source and target parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Move {
    pub vertex: usize,
    pub source: usize,
    pub target: usize,
}

/// Gain bookkeeping for a bipartition.
#[derive(Debug, Clone)]
pub struct BipartTable<'a> {
    topology: &'a Topology,
    edge_weights: &'a Weights<i64>,
    criterion: usize,
    gain_of: Vec<i64>,
    buckets: BTreeMap<i64, Vec<usize>>,
}

impl<'a> BipartTable<'a> {
    pub fn new(
        topology: &'a Topology,
        edge_weights: &'a Weights<i64>,
        criterion: usize,
        partition: &Partition,
    ) -> BipartTable<'a> {
        let parts = partition.parts();
        let mut gain_of = vec![0; parts.len()];
        let mut buckets: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
        for (i, &p) in parts.iter().enumerate() {
            let g = move_gain(topology, edge_weights, parts, i, 1 - p, criterion);
            gain_of[i] = g;
            buckets.entry(g).or_default().push(i);
        }
        BipartTable {
            topology,
            edge_weights,
            criterion,
            gain_of,
            buckets,
        }
    }

    fn change_gain(&mut self, i: usize, new_gain: i64) {
        let old_gain = self.gain_of[i];
        if old_gain == new_gain {
            return;
        }
        self.gain_of[i] = new_gain;
        remove_candidate(&mut self.buckets, old_gain, |&v| v == i);
        self.buckets.entry(new_gain).or_default().push(i);
    }

    fn select<R: Rng>(
        &self,
        partition: &Partition,
        locks: &[bool],
        constraint: &ImbalanceConstraint<'_>,
        tie_break: TieBreak,
        rng: &mut R,
    ) -> Option<(i64, Move)> {
        let parts = partition.parts();
        for (&gain, bucket) in self.buckets.iter().rev() {
            let candidates: Vec<Move> = bucket
                .iter()
                .filter(|&&i| !locks[i] && constraint.can_move(i, parts[i], 1 - parts[i]))
                .map(|&i| Move {
                    vertex: i,
                    source: parts[i],
                    target: 1 - parts[i],
                })
                .collect();
            if let Some(chosen) = tie_break.pick(&candidates, rng) {
                return Some((gain, chosen));
            }
        }
        None
    }

    /// Updates gains after `mv` was applied to `partition`.
    fn apply_move(&mut self, partition: &Partition, mv: Move, gain: i64) {
        let parts = partition.parts();
        self.change_gain(mv.vertex, -gain);
        match self.topology {
            Topology::Graph(graph) => {
                // Accumulate one delta per neighbor so parallel edges stack.
                let mut deltas: BTreeMap<usize, i64> = BTreeMap::new();
                for (j, e) in graph.neighbors(mv.vertex) {
                    let w = self.edge_weights.get(e, self.criterion);
                    let delta = if parts[j] == mv.target { -2 * w } else { 2 * w };
                    *deltas.entry(j).or_insert(0) += delta;
                }
                for (j, delta) in deltas {
                    self.change_gain(j, self.gain_of[j] + delta);
                }
            }
            Topology::Hypergraph(_) => {
                let mut neighbors: Vec<usize> =
                    self.topology.neighbors(mv.vertex).map(|(j, _)| j).collect();
                neighbors.sort_unstable();
                neighbors.dedup();
                for j in neighbors {
                    let g = move_gain(
                        self.topology,
                        self.edge_weights,
                        parts,
                        j,
                        1 - parts[j],
                        self.criterion,
                    );
                    self.change_gain(j, g);
                }
            }
        }
    }

    pub fn gain_of(&self, i: usize) -> i64 {
        self.gain_of[i]
    }
}

/// Gain bookkeeping for more than two parts.
#[derive(Debug, Clone)]
pub struct KwayTable<'a> {
    topology: &'a Topology,
    edge_weights: &'a Weights<i64>,
    criterion: usize,
    part_count: usize,
    /// `gain_of[p][i]`; `None` when `p` is the current part of `i`.
    gain_of: Vec<Vec<Option<i64>>>,
    buckets: BTreeMap<i64, Vec<(usize, usize)>>,
}

impl<'a> KwayTable<'a> {
    pub fn new(
        topology: &'a Topology,
        edge_weights: &'a Weights<i64>,
        criterion: usize,
        partition: &Partition,
    ) -> KwayTable<'a> {
        let parts = partition.parts();
        let part_count = partition.part_count();
        let mut gain_of = vec![vec![None; parts.len()]; part_count];
        let mut buckets: BTreeMap<i64, Vec<(usize, usize)>> = BTreeMap::new();
        for (i, &part) in parts.iter().enumerate() {
            for (p, row) in gain_of.iter_mut().enumerate() {
                if p == part {
                    continue;
                }
                let g = move_gain(topology, edge_weights, parts, i, p, criterion);
                row[i] = Some(g);
                buckets.entry(g).or_default().push((i, p));
            }
        }
        KwayTable {
            topology,
            edge_weights,
            criterion,
            part_count,
            gain_of,
            buckets,
        }
    }

    fn select<R: Rng>(
        &self,
        partition: &Partition,
        locks: &[bool],
        constraint: &ImbalanceConstraint<'_>,
        tie_break: TieBreak,
        rng: &mut R,
    ) -> Option<(i64, Move)> {
        let parts = partition.parts();
        for (&gain, bucket) in self.buckets.iter().rev() {
            let candidates: Vec<Move> = bucket
                .iter()
                .filter(|&&(i, p)| !locks[i] && constraint.can_move(i, parts[i], p))
                .map(|&(i, p)| Move {
                    vertex: i,
                    source: parts[i],
                    target: p,
                })
                .collect();
            if let Some(chosen) = tie_break.pick(&candidates, rng) {
                return Some((gain, chosen));
            }
        }
        None
    }

    /// Re-derives the gain rows of the moved vertex and of its adjacency.
    fn apply_move(&mut self, partition: &Partition, mv: Move) {
        let parts = partition.parts();
        let mut affected: Vec<usize> = self.topology.neighbors(mv.vertex).map(|(j, _)| j).collect();
        affected.push(mv.vertex);
        affected.sort_unstable();
        affected.dedup();
        for v in affected {
            for p in 0..self.part_count {
                let old = self.gain_of[p][v];
                let new = if p == parts[v] {
                    None
                } else {
                    Some(move_gain(
                        self.topology,
                        self.edge_weights,
                        parts,
                        v,
                        p,
                        self.criterion,
                    ))
                };
                if old == new {
                    continue;
                }
                if let Some(g) = old {
                    remove_candidate(&mut self.buckets, g, |&cand| cand == (v, p));
                }
                if let Some(g) = new {
                    self.buckets.entry(g).or_default().push((v, p));
                }
                self.gain_of[p][v] = new;
            }
        }
    }

    pub fn gain_of(&self, i: usize, target: usize) -> Option<i64> {
        self.gain_of[target][i]
    }
}

/// The table variant chosen once at refiner construction.
#[derive(Debug, Clone)]
pub enum GainTable<'a> {
    Bipart(BipartTable<'a>),
    Kway(KwayTable<'a>),
}

impl<'a> GainTable<'a> {
    pub fn new(
        topology: &'a Topology,
        edge_weights: &'a Weights<i64>,
        criterion: usize,
        partition: &Partition,
    ) -> GainTable<'a> {
        if partition.part_count() == 2 {
            GainTable::Bipart(BipartTable::new(topology, edge_weights, criterion, partition))
        } else {
            GainTable::Kway(KwayTable::new(topology, edge_weights, criterion, partition))
        }
    }

    /// `best_valid` selection: scans gains from the largest downward and
    /// stops at the first bucket holding an unlocked, admissible candidate.
    pub fn select<R: Rng>(
        &self,
        partition: &Partition,
        locks: &[bool],
        constraint: &ImbalanceConstraint<'_>,
        tie_break: TieBreak,
        rng: &mut R,
    ) -> Option<(i64, Move)> {
        match self {
            GainTable::Bipart(table) => table.select(partition, locks, constraint, tie_break, rng),
            GainTable::Kway(table) => table.select(partition, locks, constraint, tie_break, rng),
        }
    }

    /// Updates the table after `mv` (of gain `gain`) was applied to
    /// `partition`.
    pub fn apply_move(&mut self, partition: &Partition, mv: Move, gain: i64) {
        match self {
            GainTable::Bipart(table) => table.apply_move(partition, mv, gain),
            GainTable::Kway(table) => table.apply_move(partition, mv),
        }
    }
}

fn remove_candidate<T, F>(buckets: &mut BTreeMap<i64, Vec<T>>, gain: i64, is_it: F)
where
    F: Fn(&T) -> bool,
{
    if let Some(bucket) = buckets.get_mut(&gain) {
        if let Some(pos) = bucket.iter().position(is_it) {
            // Keep insertion order so first/last tie-breaks stay meaningful.
            bucket.remove(pos);
        }
        if bucket.is_empty() {
            buckets.remove(&gain);
        }
    }
}
