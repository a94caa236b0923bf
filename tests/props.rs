//! Property tests for the bookkeeping invariants.

use proptest::collection::vec;
use proptest::prelude::*;

use scission::algorithms::fm::{fm_refine, FmConfig};
use scission::analysis;
use scission::imbalance::{imbalance, imbalances, Targets};
use scission::{Graph, ModelSet, Partition, Weights};

use rand::rngs::StdRng;
use rand::SeedableRng;

/// A connected random graph: a path plus a few chords.
fn arbitrary_models() -> impl Strategy<Value = ModelSet> {
    (3usize..12)
        .prop_flat_map(|n| {
            let chords = vec((0..n, 0..n), 0..n);
            let weights = vec(1i64..20, n);
            (Just(n), chords, weights)
        })
        .prop_map(|(n, chords, weights)| {
            let mut edges: Vec<[usize; 2]> = (0..n - 1).map(|i| [i, i + 1]).collect();
            for (u, v) in chords {
                if u != v {
                    edges.push([u.min(v), u.max(v)]);
                }
            }
            let graph = Graph::from_edges(n, edges).unwrap();
            let weights = Weights::from_rows(weights.into_iter().map(|w| vec![w]).collect()).unwrap();
            ModelSet::new(graph, Some(weights), None, None).unwrap()
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn totals_are_consistent(
        (criterion_count, rows) in (1usize..4)
            .prop_flat_map(|c| (Just(c), vec(vec(0i64..100, c), 1..20))),
    ) {
        let weights = Weights::from_rows(rows.clone()).unwrap();
        for c in 0..criterion_count {
            let sum: i64 = rows.iter().map(|row| row[c]).sum();
            prop_assert_eq!(weights.totals()[c], sum);
        }
    }

    #[test]
    fn coarsening_conserves_vertex_mass(models in arbitrary_models()) {
        // Pair consecutive vertices; the last one may stay alone.
        let n = models.vertex_count();
        let aggregation: Vec<usize> = (0..n).map(|i| i / 2).collect();
        let coarse = models.coarsen(&aggregation).unwrap();
        prop_assert_eq!(
            coarse.vertex_weights().totals(),
            models.vertex_weights().totals(),
        );
        let recomputed: i64 = (0..coarse.vertex_count())
            .map(|i| coarse.vertex_weights().get(i, 0))
            .sum();
        prop_assert_eq!(recomputed, models.vertex_weights().totals()[0]);
    }

    #[test]
    fn prolonged_partitions_inherit_parts(models in arbitrary_models(), parts in vec(0usize..3, 2..7)) {
        let n = models.vertex_count();
        let aggregation: Vec<usize> = (0..n).map(|i| i % parts.len().min(n)).collect();
        let coarse_count = aggregation.iter().max().unwrap() + 1;
        let coarse = Partition::from_parts(Some(3), parts[..coarse_count].to_vec()).unwrap();
        let fine = coarse.prolong(&aggregation).unwrap();
        for (i, &part) in fine.parts().iter().enumerate() {
            prop_assert_eq!(part, coarse.part(aggregation[i]));
        }
    }

    #[test]
    fn fm_never_worsens_the_cut(models in arbitrary_models(), seed in 0u64..32) {
        let n = models.vertex_count();
        let parts: Vec<usize> = (0..n).map(|i| i % 2).collect();
        let mut partition = Partition::from_parts(Some(2), parts).unwrap();
        let before = analysis::edge_cut(&models, &partition).unwrap();
        let config = FmConfig {
            tolerances: vec![1.0],
            ..FmConfig::default()
        };
        let report = fm_refine(
            &models,
            &mut partition,
            &config,
            &mut StdRng::seed_from_u64(seed),
        ).unwrap();
        let after = analysis::edge_cut(&models, &partition).unwrap();
        prop_assert_eq!(report.cut_before, before);
        prop_assert_eq!(report.cut_after, after);
        prop_assert!(after <= before);
    }

    #[test]
    fn after_move_diff_matches_full_recompute(
        rows in vec(vec(1i64..50, 2), 4..10),
        from in 0usize..4,
    ) {
        let weights = Weights::from_rows(rows).unwrap();
        let normalized = weights.normalized().unwrap();
        let n = normalized.item_count();
        let parts: Vec<usize> = (0..n).map(|i| i % 4).collect();
        let mut partition = Partition::from_parts(Some(4), parts).unwrap();
        let targets = Targets::uniform(2, 4);

        let mut diffed = imbalances(&normalized, &partition, &targets);
        let vertex = from.min(n - 1);
        let source = partition.part(vertex);
        let target = (source + 1) % 4;
        scission::imbalance::apply_move(&mut diffed, normalized.row(vertex), source, target, 4);
        partition.assign(vertex, target);
        let recomputed = imbalances(&normalized, &partition, &targets);

        prop_assert!((imbalance(&diffed) - imbalance(&recomputed)).abs() < 1e-9);
        for (row_a, row_b) in diffed.iter().zip(&recomputed) {
            for (a, b) in row_a.iter().zip(row_b) {
                prop_assert!((a - b).abs() < 1e-9);
            }
        }
    }
}
