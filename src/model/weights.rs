//! Vertex and edge weight matrices.
//!
//! A weight matrix stores one row per item (vertex, graph edge or hyperedge)
//! and one column per balancing criterion, plus the per-criterion totals.
//! Raw weights are integers; refiners that reason on fractions of the total
//! work on the [`Weights::normalized`] copy.

use num_traits::{Num, ToPrimitive};
use rand::Rng;

use crate::error::{Error, Result};

/// A `[item][criterion]` weight matrix with per-criterion totals.
#[derive(Debug, Clone, PartialEq)]
pub struct Weights<W> {
    criterion_count: usize,
    weights: Vec<Vec<W>>,
    totals: Vec<W>,
}

impl<W> Weights<W>
where
    W: Num + Copy + PartialOrd + ToPrimitive,
{
    /// Builds a matrix from its rows, computing the totals.
    ///
    /// All rows must have the same, non-zero number of criteria, and all
    /// weights must be nonnegative.
    pub fn from_rows(rows: Vec<Vec<W>>) -> Result<Weights<W>> {
        let criterion_count = match rows.first() {
            Some(row) => row.len(),
            None => 1,
        };
        if criterion_count == 0 {
            return Err(Error::InvalidInput("weight rows have no criterion".to_string()));
        }
        let mut totals = vec![W::zero(); criterion_count];
        for (i, row) in rows.iter().enumerate() {
            if row.len() != criterion_count {
                return Err(Error::InvalidInput(format!(
                    "weight row {i} has {} criteria, expected {criterion_count}",
                    row.len(),
                )));
            }
            for (c, &w) in row.iter().enumerate() {
                if w < W::zero() {
                    return Err(Error::InvalidInput(format!(
                        "negative weight at row {i}, criterion {c}",
                    )));
                }
                totals[c] = totals[c] + w;
            }
        }
        Ok(Weights {
            criterion_count,
            weights: rows,
            totals,
        })
    }

    /// A single-criterion matrix giving weight one to every item.
    pub fn unit(item_count: usize) -> Weights<W> {
        let total = (0..item_count).fold(W::zero(), |acc, _| acc + W::one());
        Weights {
            criterion_count: 1,
            weights: vec![vec![W::one()]; item_count],
            totals: vec![total],
        }
    }

    pub fn item_count(&self) -> usize {
        self.weights.len()
    }

    pub fn criterion_count(&self) -> usize {
        self.criterion_count
    }

    pub fn row(&self, i: usize) -> &[W] {
        &self.weights[i]
    }

    pub fn get(&self, i: usize, c: usize) -> W {
        self.weights[i][c]
    }

    pub fn totals(&self) -> &[W] {
        &self.totals
    }

    /// The same distribution scaled so that every criterion sums to one.
    ///
    /// Fails if some criterion has a zero total, since no balance objective
    /// is defined for it.
    pub fn normalized(&self) -> Result<Weights<f64>> {
        let totals: Vec<f64> = self
            .totals
            .iter()
            .map(|t| t.to_f64().unwrap_or(0.0))
            .collect();
        if let Some(c) = totals.iter().position(|&t| t == 0.0) {
            return Err(Error::InvalidInput(format!(
                "criterion {c} has a zero total and cannot be normalized",
            )));
        }
        let weights = self
            .weights
            .iter()
            .map(|row| {
                row.iter()
                    .zip(&totals)
                    .map(|(w, t)| w.to_f64().unwrap_or(0.0) / t)
                    .collect()
            })
            .collect();
        Ok(Weights {
            criterion_count: self.criterion_count,
            weights,
            totals: vec![1.0; self.criterion_count],
        })
    }

    /// Sums rows along `aggregation`; the totals are preserved.
    pub fn coarsen(&self, aggregation: &[usize], coarse_count: usize) -> Weights<W> {
        let mut weights = vec![vec![W::zero(); self.criterion_count]; coarse_count];
        for (i, &ci) in aggregation.iter().enumerate() {
            for c in 0..self.criterion_count {
                weights[ci][c] = weights[ci][c] + self.weights[i][c];
            }
        }
        Weights {
            criterion_count: self.criterion_count,
            weights,
            totals: self.totals.clone(),
        }
    }

    /// Sums edge rows into their merged coarse edges.
    ///
    /// `edge_map` comes from a topology coarsening; collapsed edges
    /// (`None` entries) drop out of the totals.
    pub fn coarsen_edges(&self, edge_map: &[Option<usize>], coarse_count: usize) -> Weights<W> {
        let mut weights = vec![vec![W::zero(); self.criterion_count]; coarse_count];
        let mut totals = vec![W::zero(); self.criterion_count];
        for (e, coarse) in edge_map.iter().enumerate() {
            if let Some(ce) = coarse {
                for c in 0..self.criterion_count {
                    weights[*ce][c] = weights[*ce][c] + self.weights[e][c];
                    totals[c] = totals[c] + self.weights[e][c];
                }
            }
        }
        Weights {
            criterion_count: self.criterion_count,
            weights,
            totals,
        }
    }
}

impl Weights<i64> {
    /// A single-criterion matrix with weights drawn uniformly in
    /// `inf..=sup`.
    pub fn random<R: Rng>(item_count: usize, inf: i64, sup: i64, rng: &mut R) -> Result<Weights<i64>> {
        if inf < 0 || sup < inf {
            return Err(Error::InvalidInput(format!(
                "invalid random weight range {inf}..={sup}",
            )));
        }
        let rows = (0..item_count)
            .map(|_| vec![rng.gen_range(inf..=sup)])
            .collect();
        Weights::from_rows(rows)
    }
}
