//! Restrictions on which vertices may aggregate together.
//!
//! A restriction is a predicate on a candidate aggregate; when several
//! restrictions are configured, all of them must allow the aggregate.

use crate::model::Weights;

/// Which weight configurations a [`WeightRestriction`] forbids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Forbid {
    /// Forbid aggregates whose summed weight crosses above the threshold
    /// on at least one criterion.
    AboveAny,
    /// Forbid aggregates whose summed weight crosses above the threshold
    /// on every criterion.
    AboveAll,
    /// Forbid aggregates whose summed weight falls below the threshold on
    /// at least one criterion.
    UnderAny,
    /// Forbid aggregates whose summed weight falls below the threshold on
    /// every criterion.
    UnderAll,
}

/// Forbids aggregates by their summed vertex weight, measured per
/// criterion as a fraction of the criterion total.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightRestriction {
    /// Fraction of each criterion total the aggregate is compared to.
    pub threshold: f64,
    pub forbid: Forbid,
}

impl WeightRestriction {
    /// Whether the aggregate made of `candidates` is allowed.
    pub fn allows(&self, weights: &Weights<i64>, candidates: &[usize]) -> bool {
        let crossed: Vec<bool> = (0..weights.criterion_count())
            .map(|c| {
                let sum: i64 = candidates.iter().map(|&i| weights.get(i, c)).sum();
                let bound = self.threshold * weights.totals()[c] as f64;
                match self.forbid {
                    Forbid::AboveAny | Forbid::AboveAll => sum as f64 >= bound,
                    Forbid::UnderAny | Forbid::UnderAll => sum as f64 <= bound,
                }
            })
            .collect();
        match self.forbid {
            Forbid::AboveAny | Forbid::UnderAny => !crossed.iter().any(|&c| c),
            Forbid::AboveAll | Forbid::UnderAll => !crossed.iter().all(|&c| c),
        }
    }
}

/// Conjunction of every configured restriction.
pub fn allowed(
    restrictions: &[WeightRestriction],
    weights: &Weights<i64>,
    candidates: &[usize],
) -> bool {
    restrictions
        .iter()
        .all(|restriction| restriction.allows(weights, candidates))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weights() -> Weights<i64> {
        // Totals: 10 and 100.
        Weights::from_rows(vec![vec![1, 60], vec![2, 20], vec![3, 10], vec![4, 10]]).unwrap()
    }

    #[test]
    fn above_any_blocks_one_heavy_criterion() {
        let restriction = WeightRestriction {
            threshold: 0.5,
            forbid: Forbid::AboveAny,
        };
        // 0+1: sums (3, 80); 80 >= 50 on the second criterion.
        assert!(!restriction.allows(&weights(), &[0, 1]));
        // 2+3: sums (7, 20); 7 >= 5 on the first criterion.
        assert!(!restriction.allows(&weights(), &[2, 3]));
        // 1+2: sums (5, 30); crosses on the first criterion (5 >= 5).
        assert!(!restriction.allows(&weights(), &[1, 2]));
    }

    #[test]
    fn above_all_needs_every_criterion_to_cross() {
        let restriction = WeightRestriction {
            threshold: 0.5,
            forbid: Forbid::AboveAll,
        };
        // (3, 80) crosses only on the second criterion.
        assert!(restriction.allows(&weights(), &[0, 1]));
        // (10, 100) crosses on both.
        assert!(!restriction.allows(&weights(), &[0, 1, 2, 3]));
    }

    #[test]
    fn under_flavors_mirror_above() {
        let any = WeightRestriction {
            threshold: 0.2,
            forbid: Forbid::UnderAny,
        };
        // 2+3: sums (7, 20); 20 <= 20 on the second criterion.
        assert!(!any.allows(&weights(), &[2, 3]));
        let all = WeightRestriction {
            threshold: 0.2,
            forbid: Forbid::UnderAll,
        };
        // Crosses under only on the second criterion.
        assert!(all.allows(&weights(), &[2, 3]));
    }
}
