//! Vertex-to-part assignments.

use num_traits::Num;

use crate::error::{Error, Result};
use crate::model::Weights;

/// A partition of `len()` vertices into `part_count()` parts.
///
/// Partitions are the only model mutated in place: refiners move vertices
/// one at a time through [`Partition::assign`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    part_count: usize,
    parts: Vec<usize>,
}

impl Partition {
    /// Wraps an assignment vector.
    ///
    /// When `part_count` is `None` it is inferred as the greatest part index
    /// plus one.
    pub fn from_parts(part_count: Option<usize>, parts: Vec<usize>) -> Result<Partition> {
        let part_count = match part_count {
            Some(k) => k,
            None => parts.iter().max().map_or(1, |&p| p + 1),
        };
        if part_count == 0 {
            return Err(Error::InvalidInput("a partition needs at least one part".to_string()));
        }
        if let Some(i) = parts.iter().position(|&p| p >= part_count) {
            return Err(Error::InvalidInput(format!(
                "vertex {i} is in part {} but there are only {part_count} parts",
                parts[i],
            )));
        }
        Ok(Partition { part_count, parts })
    }

    /// The all-in-one partition: every vertex in part `part`.
    pub fn uniform(vertex_count: usize, part_count: usize, part: usize) -> Result<Partition> {
        if part >= part_count {
            return Err(Error::InvalidInput(format!(
                "part {part} out of range for {part_count} parts",
            )));
        }
        Ok(Partition {
            part_count,
            parts: vec![part; vertex_count],
        })
    }

    pub fn part_count(&self) -> usize {
        self.part_count
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn parts(&self) -> &[usize] {
        &self.parts
    }

    pub fn part(&self, i: usize) -> usize {
        self.parts[i]
    }

    /// Moves vertex `i` to part `p`.
    pub fn assign(&mut self, i: usize, p: usize) {
        debug_assert!(p < self.part_count);
        self.parts[i] = p;
    }

    /// Per-part, per-criterion weight sums, indexed `[part][criterion]`.
    pub fn part_weights<W>(&self, weights: &Weights<W>) -> Vec<Vec<W>>
    where
        W: Num + Copy + PartialOrd + num_traits::ToPrimitive,
    {
        let mut sums = vec![vec![W::zero(); weights.criterion_count()]; self.part_count];
        for (i, &p) in self.parts.iter().enumerate() {
            for (c, &w) in weights.row(i).iter().enumerate() {
                sums[p][c] = sums[p][c] + w;
            }
        }
        sums
    }

    /// Maps a coarse partition back through an aggregation: fine vertex `i`
    /// inherits the part of coarse vertex `aggregation[i]`.
    pub fn prolong(&self, aggregation: &[usize]) -> Result<Partition> {
        let parts = aggregation
            .iter()
            .map(|&ci| {
                self.parts.get(ci).copied().ok_or_else(|| {
                    Error::InvalidInput(format!(
                        "aggregation refers to coarse vertex {ci} outside the partition",
                    ))
                })
            })
            .collect::<Result<Vec<usize>>>()?;
        Partition::from_parts(Some(self.part_count), parts)
    }
}
