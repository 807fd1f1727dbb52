//! Property tests for the regularity index

use glam::DVec2;
use proptest::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use retina_mosaic::simulation::regularity_index;

fn point_set() -> impl Strategy<Value = Vec<DVec2>> {
    prop::collection::vec((0.0f64..400.0, 0.0f64..400.0), 3..60)
        .prop_map(|pts| pts.into_iter().map(|(x, y)| DVec2::new(x, y)).collect())
}

fn close(a: f64, b: f64) -> bool {
    if a.is_infinite() || b.is_infinite() {
        return a == b;
    }
    (a - b).abs() <= 1e-6 * a.abs().max(1.0)
}

proptest! {
    #[test]
    fn test_index_is_non_negative(points in point_set()) {
        let ri = regularity_index(&points);
        prop_assert!(!ri.is_nan() && ri >= 0.0, "ri = {}", ri);
    }

    #[test]
    fn test_translation_invariant(points in point_set(), dx in -500.0f64..500.0, dy in -500.0f64..500.0) {
        let shifted: Vec<DVec2> = points.iter().map(|p| *p + DVec2::new(dx, dy)).collect();
        let a = regularity_index(&points);
        let b = regularity_index(&shifted);
        prop_assert!(close(a, b), "{} vs {}", a, b);
    }

    #[test]
    fn test_scale_invariant(points in point_set(), k in 0.1f64..10.0) {
        let scaled: Vec<DVec2> = points.iter().map(|p| *p * k).collect();
        let a = regularity_index(&points);
        let b = regularity_index(&scaled);
        prop_assert!(close(a, b), "{} vs {}", a, b);
    }

    #[test]
    fn test_rotation_invariant(points in point_set(), angle in 0.0f64..std::f64::consts::TAU) {
        let rotation = DVec2::from_angle(angle);
        let rotated: Vec<DVec2> = points.iter().map(|p| rotation.rotate(*p)).collect();
        let a = regularity_index(&points);
        let b = regularity_index(&rotated);
        prop_assert!(close(a, b), "{} vs {}", a, b);
    }

    #[test]
    fn test_permutation_invariant(points in point_set(), rotate in 0usize..60) {
        let mut permuted = points.clone();
        permuted.reverse();
        let n = permuted.len();
        permuted.rotate_left(rotate % n);
        let a = regularity_index(&points);
        let b = regularity_index(&permuted);
        prop_assert!(close(a, b), "{} vs {}", a, b);
    }

    #[test]
    fn test_fewer_than_two_points_is_zero(x in 0.0f64..400.0, y in 0.0f64..400.0) {
        prop_assert_eq!(regularity_index(&[]), 0.0);
        prop_assert_eq!(regularity_index(&[DVec2::new(x, y)]), 0.0);
    }
}

#[test]
fn test_hexagonal_lattice_beats_random_placement() {
    // jittered hexagonal lattice, deterministic jitter
    let mut lattice = Vec::new();
    for row in 0..12 {
        for col in 0..12 {
            let offset = if row % 2 == 0 { 0.0 } else { 10.0 };
            let jitter = ((row * 7 + col * 13) % 5) as f64 * 0.4;
            lattice.push(DVec2::new(col as f64 * 20.0 + offset + jitter, row as f64 * 17.32));
        }
    }
    let ri = regularity_index(&lattice);
    assert!(ri > 3.0, "regular mosaic has RI {}", ri);
}

/// 10×10 grid with 20 µm spacing, each point pushed by up to `amplitude`
fn jittered_grid(amplitude: f64) -> Vec<DVec2> {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let mut points = Vec::new();
    for row in 0..10 {
        for col in 0..10 {
            let jitter = DVec2::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0)) * amplitude;
            points.push(DVec2::new(col as f64 * 20.0, row as f64 * 20.0) + jitter);
        }
    }
    points
}

#[test]
fn test_index_rises_as_jitter_shrinks() {
    let indices: Vec<f64> = [3.0, 1.0, 0.3, 0.1]
        .iter()
        .map(|&amplitude| regularity_index(&jittered_grid(amplitude)))
        .collect();
    for pair in indices.windows(2) {
        assert!(pair[1] > pair[0], "RI should increase as jitter shrinks: {:?}", indices);
    }
}

#[test]
fn test_rotated_grid_keeps_its_index() {
    let grid = jittered_grid(1.0);
    let rotation = DVec2::from_angle(0.7);
    let rotated: Vec<DVec2> = grid.iter().map(|p| rotation.rotate(*p)).collect();
    assert!(close(regularity_index(&grid), regularity_index(&rotated)));
}
