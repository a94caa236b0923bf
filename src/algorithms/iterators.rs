//! Cooperative vertex sweeps for the first-improvement refiner.
//!
//! The sweep owns its cursor and exposes [`VertexSweep::restart`]; the
//! refiner calls it after each accepted move so that iteration resumes just
//! after the moved vertex and runs one more full cycle.

use rand::seq::SliceRandom;
use rand::Rng;

/// Order in which a sweep visits vertices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexOrder {
    /// Natural index order.
    Cycle,
    /// A shuffled order drawn once at sweep construction.
    Random,
}

/// A cyclic walk over vertex ids that ends one full cycle after the last
/// restart.
#[derive(Debug, Clone)]
pub struct VertexSweep {
    order: Vec<usize>,
    cursor: usize,
    remaining: usize,
}

impl VertexSweep {
    pub fn new<R: Rng>(order: VertexOrder, vertex_count: usize, rng: &mut R) -> VertexSweep {
        let mut ids: Vec<usize> = (0..vertex_count).collect();
        if order == VertexOrder::Random {
            ids.shuffle(rng);
        }
        VertexSweep {
            order: ids,
            cursor: 0,
            remaining: vertex_count,
        }
    }

    /// Grants one more full cycle starting after the current vertex.
    pub fn restart(&mut self) {
        self.remaining = self.order.len();
    }
}

impl Iterator for VertexSweep {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.remaining == 0 {
            return None;
        }
        let vertex = self.order[self.cursor];
        self.cursor = (self.cursor + 1) % self.order.len();
        self.remaining -= 1;
        Some(vertex)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;

    #[test]
    fn sweep_ends_one_cycle_after_last_restart() {
        let mut rng = StepRng::new(0, 1);
        let mut sweep = VertexSweep::new(VertexOrder::Cycle, 3, &mut rng);
        assert_eq!(sweep.next(), Some(0));
        assert_eq!(sweep.next(), Some(1));
        sweep.restart();
        let rest: Vec<usize> = sweep.collect();
        assert_eq!(rest, vec![2, 0, 1]);
    }

    #[test]
    fn random_sweep_visits_everyone_once() {
        let mut rng = StepRng::new(7, 13);
        let mut seen: Vec<usize> = VertexSweep::new(VertexOrder::Random, 5, &mut rng).collect();
        seen.sort_unstable();
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
    }
}
