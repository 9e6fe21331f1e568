//! The Barnes-Hut approximation must stay close to the exact pairwise sum.

use graph_tiles_core::Position;
use graph_tiles_layout::{pairwise_force, QuadTree, Repulsion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_positions(rng: &mut StdRng, n: usize) -> Vec<Position> {
    (0..n)
        .map(|_| Position::new(rng.gen_range(-200.0..200.0), rng.gen_range(-200.0..200.0)))
        .collect()
}

/// Approximated and exact force on every node.
fn forces(positions: &[Position], repulsion: &Repulsion) -> Vec<((f64, f64), (f64, f64))> {
    let tree = QuadTree::build(positions, 16);
    (0..positions.len())
        .map(|i| (tree.force_on(i, repulsion), pairwise_force(positions, i, repulsion)))
        .collect()
}

/// Summed error magnitude over summed exact magnitude.
fn aggregate_error(positions: &[Position], repulsion: &Repulsion) -> f64 {
    let (error, exact) = forces(positions, repulsion).into_iter().fold(
        (0.0, 0.0),
        |(error, exact), ((ax, ay), (ex, ey))| {
            (error + (ax - ex).hypot(ay - ey), exact + ex.hypot(ey))
        },
    );
    if exact < 1e-9 {
        0.0
    } else {
        error / exact
    }
}

/// Largest relative error of any single node.
fn worst_node_error(positions: &[Position], repulsion: &Repulsion) -> f64 {
    forces(positions, repulsion)
        .into_iter()
        .map(|((ax, ay), (ex, ey))| {
            let exact = ex.hypot(ey);
            if exact < 1e-9 {
                0.0
            } else {
                (ax - ex).hypot(ay - ey) / exact
            }
        })
        .fold(0.0, f64::max)
}

#[test]
fn default_theta_stays_within_ten_percent() {
    let mut rng = StdRng::seed_from_u64(7);
    let repulsion = Repulsion::default();
    for n in [2, 5, 20, 50] {
        for _ in 0..10 {
            let positions = random_positions(&mut rng, n);
            let err = aggregate_error(&positions, &repulsion);
            assert!(err < 0.1, "n={n} aggregate error {err}");
            // Single nodes may be off by more, but never grossly.
            let worst = worst_node_error(&positions, &repulsion);
            assert!(worst < 1.0, "n={n} node error {worst}");
        }
    }
}

#[test]
fn smaller_theta_is_more_accurate() {
    let mut rng = StdRng::seed_from_u64(42);
    let repulsion = Repulsion {
        theta: 0.5,
        ..Default::default()
    };
    for _ in 0..10 {
        let positions = random_positions(&mut rng, 50);
        let err = aggregate_error(&positions, &repulsion);
        assert!(err < 0.03, "aggregate error {err}");
        let worst = worst_node_error(&positions, &repulsion);
        assert!(worst < 0.25, "node error {worst}");
    }
}

#[test]
fn zero_theta_is_exact() {
    let mut rng = StdRng::seed_from_u64(3);
    let repulsion = Repulsion {
        theta: 0.0,
        ..Default::default()
    };
    let positions = random_positions(&mut rng, 40);
    assert!(worst_node_error(&positions, &repulsion) < 1e-9);
}

#[test]
fn clustered_points_with_duplicates() {
    let mut rng = StdRng::seed_from_u64(11);
    let mut positions: Vec<Position> = (0..30)
        .map(|_| Position::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0)))
        .collect();
    positions.push(positions[0]);
    positions.push(positions[0]);

    let tree = QuadTree::build(&positions, 16);
    let repulsion = Repulsion::default();
    for i in 0..positions.len() {
        let (fx, fy) = tree.force_on(i, &repulsion);
        assert!(fx.is_finite() && fy.is_finite(), "node {i}");
    }
}
