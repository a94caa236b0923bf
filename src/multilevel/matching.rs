//! Matchings: aggregations whose fibers hold at most two vertices.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::model::ModelSet;
use crate::multilevel::restrictions::{allowed, WeightRestriction};

/// Order in which the matchers visit vertices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    #[default]
    Identity,
    Random,
}

/// Edge weights used by heavy-edge matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EdgeWeighting {
    Unit,
    #[default]
    Original,
}

/// The supported matchers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Matcher {
    /// Pair each vertex with its first still-unmatched neighbor.
    First,
    /// Pair each vertex with the still-unmatched neighbor behind the
    /// heaviest incident edge.
    HeavyEdge(EdgeWeighting),
    /// Pair each vertex with a randomly drawn unmatched neighbor.
    Random,
}

/// Computes a matching aggregation: each coarse vertex has one or two fine
/// pre-images. A vertex whose every neighbor is matched or restricted
/// stays alone.
pub fn compute_matching<R: Rng>(
    models: &ModelSet,
    matcher: Matcher,
    order: Order,
    restrictions: &[WeightRestriction],
    rng: &mut R,
) -> Vec<usize> {
    let vertex_count = models.vertex_count();
    let topology = models.topology();
    let weights = models.vertex_weights();

    let mut visit: Vec<usize> = (0..vertex_count).collect();
    if order == Order::Random {
        visit.shuffle(rng);
    }

    let mut matching: Vec<Option<usize>> = vec![None; vertex_count];
    let mut coarse = 0;
    for &i in &visit {
        if matching[i].is_some() {
            continue;
        }
        let free = |matching: &[Option<usize>], j: usize| {
            j != i && matching[j].is_none() && allowed(restrictions, weights, &[i, j])
        };
        let partner = match matcher {
            Matcher::First => topology.neighbors(i).map(|(j, _)| j).find(|&j| free(&matching, j)),
            Matcher::HeavyEdge(weighting) => {
                let mut incident: Vec<(usize, i64)> = topology
                    .neighbors(i)
                    .map(|(j, e)| {
                        let w = match weighting {
                            EdgeWeighting::Unit => 1,
                            EdgeWeighting::Original => models.edge_weights().get(e, 0),
                        };
                        (j, w)
                    })
                    .collect();
                incident.sort_by(|a, b| b.1.cmp(&a.1));
                incident
                    .into_iter()
                    .map(|(j, _)| j)
                    .find(|&j| free(&matching, j))
            }
            Matcher::Random => {
                let candidates: Vec<usize> = {
                    let mut around: Vec<usize> = topology
                        .neighbors(i)
                        .map(|(j, _)| j)
                        .filter(|&j| free(&matching, j))
                        .collect();
                    around.sort_unstable();
                    around.dedup();
                    around
                };
                candidates.choose(rng).copied()
            }
        };
        if let Some(j) = partner {
            matching[j] = Some(coarse);
        }
        matching[i] = Some(coarse);
        coarse += 1;
    }
    matching.into_iter().map(|m| m.unwrap_or(0)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Graph, Weights};
    use rand::rngs::mock::StepRng;
    use rand::SeedableRng;

    fn path_models(n: usize) -> ModelSet {
        let graph = Graph::from_edges(n, (0..n - 1).map(|i| [i, i + 1]).collect()).unwrap();
        ModelSet::new(graph, None, None, None).unwrap()
    }

    fn check_matching(aggregation: &[usize]) {
        let coarse_count = aggregation.iter().max().unwrap() + 1;
        let mut fibers = vec![0; coarse_count];
        for &c in aggregation {
            fibers[c] += 1;
        }
        assert!(fibers.iter().all(|&size| (1..=2).contains(&size)));
    }

    #[test]
    fn match_first_pairs_along_the_path() {
        let models = path_models(5);
        let aggregation = compute_matching(
            &models,
            Matcher::First,
            Order::Identity,
            &[],
            &mut StepRng::new(0, 1),
        );
        assert_eq!(aggregation, vec![0, 0, 1, 1, 2]);
    }

    #[test]
    fn heavy_edge_matching_prefers_heavy_edges() {
        // Triangle 0-1-2 with a heavy edge 1-2.
        let graph = Graph::from_edges(3, vec![[0, 1], [1, 2], [0, 2]]).unwrap();
        let edge_weights = Weights::from_rows(vec![vec![1], vec![10], vec![1]]).unwrap();
        let models = ModelSet::new(graph, None, Some(edge_weights), None).unwrap();
        let aggregation = compute_matching(
            &models,
            Matcher::HeavyEdge(EdgeWeighting::Original),
            Order::Identity,
            &[],
            &mut StepRng::new(0, 1),
        );
        // Vertex 0 pairs with 1 through its heaviest free edge... but 1-2
        // is heavier, so visiting 1 first is what HEM is about; with the
        // identity order, 0 grabs a partner first along weight 1 edges.
        check_matching(&aggregation);
        let models2 = {
            let graph = Graph::from_edges(3, vec![[0, 1], [1, 2], [0, 2]]).unwrap();
            let edge_weights = Weights::from_rows(vec![vec![1], vec![1], vec![10]]).unwrap();
            ModelSet::new(graph, None, Some(edge_weights), None).unwrap()
        };
        let aggregation = compute_matching(
            &models2,
            Matcher::HeavyEdge(EdgeWeighting::Original),
            Order::Identity,
            &[],
            &mut StepRng::new(0, 1),
        );
        // 0's heaviest edge goes to 2.
        assert_eq!(aggregation[0], aggregation[2]);
        assert_ne!(aggregation[0], aggregation[1]);
    }

    #[test]
    fn restrictions_keep_heavy_pairs_apart() {
        let graph = Graph::from_edges(3, vec![[0, 1], [1, 2]]).unwrap();
        let weights = Weights::from_rows(vec![vec![5], vec![5], vec![1]]).unwrap();
        let models = ModelSet::new(graph, Some(weights), None, None).unwrap();
        let restriction = WeightRestriction {
            threshold: 0.8,
            forbid: crate::multilevel::Forbid::AboveAny,
        };
        let aggregation = compute_matching(
            &models,
            Matcher::First,
            Order::Identity,
            &[restriction],
            &mut StepRng::new(0, 1),
        );
        // 0+1 would weigh 10/11 of the total; 0 stays alone, 1 pairs with 2.
        assert_ne!(aggregation[0], aggregation[1]);
        assert_eq!(aggregation[1], aggregation[2]);
    }

    #[test]
    fn random_matching_is_a_matching() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        let models = path_models(9);
        let aggregation =
            compute_matching(&models, Matcher::Random, Order::Random, &[], &mut rng);
        check_matching(&aggregation);
    }
}
