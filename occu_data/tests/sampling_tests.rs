//! End-to-end tests for the query-point sampling engine.

use glam::{Mat3, Vec3};
use occu_core::{Aabb, TriangleMesh};
use occu_data::{generate_samples, DatasetError, SamplingConfig, SamplingStrategy};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Axis-aligned cube with side `size` centered at `center`, outward-facing
/// triangles.
fn cube_mesh(center: Vec3, size: f32) -> TriangleMesh {
    let h = size * 0.5;
    let vertices = vec![
        center + Vec3::new(-h, -h, -h),
        center + Vec3::new(h, -h, -h),
        center + Vec3::new(h, h, -h),
        center + Vec3::new(-h, h, -h),
        center + Vec3::new(-h, -h, h),
        center + Vec3::new(h, -h, h),
        center + Vec3::new(h, h, h),
        center + Vec3::new(-h, h, h),
    ];
    let triangles = vec![
        [0, 2, 1],
        [0, 3, 2],
        [4, 5, 6],
        [4, 6, 7],
        [0, 1, 5],
        [0, 5, 4],
        [3, 7, 6],
        [3, 6, 2],
        [0, 4, 7],
        [0, 7, 3],
        [1, 2, 6],
        [1, 6, 5],
    ];
    TriangleMesh::new(vertices, triangles).unwrap()
}

fn uniform_config(n: usize) -> SamplingConfig {
    SamplingConfig::default()
        .with_strategy(SamplingStrategy::Uniform)
        .with_num_samples(n)
}

fn depth_config(n: usize) -> SamplingConfig {
    SamplingConfig::default()
        .with_strategy(SamplingStrategy::DepthOriented)
        .with_num_samples(n)
}

#[test]
fn uniform_returns_exact_count_with_binary_labels() {
    let mesh = cube_mesh(Vec3::ZERO, 100.0);
    let bounds = Aabb::new(Vec3::splat(-100.0), Vec3::splat(100.0));
    let config = uniform_config(2000);
    let mut rng = StdRng::seed_from_u64(7);

    let set = generate_samples("cube", &mesh, &bounds, None, &config, &mut rng).unwrap();

    assert_eq!(set.len(), 2000);
    assert!(set.labels().iter().all(|&l| l == 0.0 || l == 1.0));

    let inside = set.labels().iter().filter(|&&l| l == 1.0).count();
    assert!(inside <= 1000, "inside count {} exceeds half", inside);
    assert!(inside > 0, "no inside points at all");
}

#[test]
fn uniform_labels_agree_with_containment() {
    let mesh = cube_mesh(Vec3::ZERO, 100.0);
    let bounds = Aabb::new(Vec3::splat(-100.0), Vec3::splat(100.0));
    let config = uniform_config(1000);
    let mut rng = StdRng::seed_from_u64(3);

    let set = generate_samples("cube", &mesh, &bounds, None, &config, &mut rng).unwrap();

    for (p, &label) in set.points().iter().zip(set.labels()) {
        assert_eq!(
            label == 1.0,
            mesh.contains(*p),
            "label disagrees with containment at {:?}",
            p
        );
    }
}

#[test]
fn uniform_points_stay_near_the_sampling_volume() {
    let mesh = cube_mesh(Vec3::ZERO, 100.0);
    let bounds = Aabb::new(Vec3::splat(-100.0), Vec3::splat(100.0));
    let config = uniform_config(1000);
    let mut rng = StdRng::seed_from_u64(11);

    let set = generate_samples("cube", &mesh, &bounds, None, &config, &mut rng).unwrap();

    // Volumetric points lie inside the bounds; perturbed surface points can
    // leak out by a few standard deviations at most.
    let slack = Vec3::splat(30.0);
    let inflated = Aabb::new(bounds.min - slack, bounds.max + slack);
    for p in set.points() {
        assert!(inflated.contains(*p), "point {:?} far outside bounds", p);
    }
}

#[test]
fn uniform_caps_inside_points_when_volume_is_tight() {
    // Bounds hug the cube, so most volumetric points land inside and the
    // balance cap has to do real work.
    let mesh = cube_mesh(Vec3::ZERO, 100.0);
    let bounds = mesh.bounding_box();
    let config = uniform_config(2000);
    let mut rng = StdRng::seed_from_u64(5);

    let set = generate_samples("cube", &mesh, &bounds, None, &config, &mut rng).unwrap();

    assert_eq!(set.len(), 2000);
    let inside = set.labels().iter().filter(|&&l| l == 1.0).count();
    assert!(inside <= 1000);
}

#[test]
fn depth_returns_exact_count_with_label_bands() {
    let mesh = cube_mesh(Vec3::ZERO, 100.0);
    let bounds = mesh.bounding_box();
    let config = depth_config(2000);
    let mut rng = StdRng::seed_from_u64(42);

    let set = generate_samples(
        "cube",
        &mesh,
        &bounds,
        Some(Mat3::IDENTITY),
        &config,
        &mut rng,
    )
    .unwrap();

    assert_eq!(set.len(), 2000);

    let way_inside = set.labels().iter().filter(|&&l| l == 1.0).count();
    let way_outside = set.labels().iter().filter(|&&l| l == 0.0).count();
    assert!(way_inside > 0 && way_inside <= 100);
    assert!(way_outside > 0 && way_outside <= 100);

    // Everything else is a graded label strictly inside (0.1, 0.9).
    for &label in set.labels() {
        if label != 0.0 && label != 1.0 {
            assert!(label > 0.1 && label < 0.9, "graded label {} out of band", label);
        }
    }
}

#[test]
fn depth_way_inside_points_have_interior_clearance() {
    let mesh = cube_mesh(Vec3::ZERO, 100.0);
    let bounds = mesh.bounding_box();
    let config = depth_config(1000);
    let mut rng = StdRng::seed_from_u64(13);

    let set = generate_samples(
        "cube",
        &mesh,
        &bounds,
        Some(Mat3::IDENTITY),
        &config,
        &mut rng,
    )
    .unwrap();

    for (p, &label) in set.points().iter().zip(set.labels()) {
        if label == 1.0 {
            assert!(
                mesh.signed_distance(*p) >= 0.0,
                "way-inside point {:?} has negative signed distance",
                p
            );
        }
    }
}

#[test]
fn depth_way_outside_points_have_outward_clearance() {
    let mesh = cube_mesh(Vec3::ZERO, 100.0);
    let bounds = mesh.bounding_box();
    let config = depth_config(1000);
    let mut rng = StdRng::seed_from_u64(23);

    let set = generate_samples(
        "cube",
        &mesh,
        &bounds,
        Some(Mat3::IDENTITY),
        &config,
        &mut rng,
    )
    .unwrap();

    // Under an identity view rotation the displacement axis is +/-Z; every
    // way-outside point must keep the validated ray clearance along at
    // least one of the two directions (a clean miss counts as infinite).
    let min_clearance = 5.0 * mesh.y_extent() / 188.0;
    for (p, &label) in set.points().iter().zip(set.labels()) {
        if label == 0.0 {
            let clearance = mesh
                .longest_ray(*p, Vec3::Z)
                .max(mesh.longest_ray(*p, -Vec3::Z));
            assert!(
                clearance >= min_clearance,
                "way-outside point {:?} has clearance {}",
                p,
                clearance
            );
        }
    }
}

#[test]
fn label_distribution_is_scale_invariant() {
    // Rescaling the mesh and the sampling volume together must not change
    // the relative label distribution: all displacement magnitudes are
    // expressed in multiples of the per-mesh sigma multiplier.
    let fraction = |set: &occu_data::SampleSet, value: f32| {
        set.labels().iter().filter(|&&l| l == value).count() as f32 / set.len() as f32
    };

    let small_mesh = cube_mesh(Vec3::ZERO, 100.0);
    let small_bounds = Aabb::new(Vec3::splat(-100.0), Vec3::splat(100.0));
    let large_mesh = cube_mesh(Vec3::ZERO, 400.0);
    let large_bounds = Aabb::new(Vec3::splat(-400.0), Vec3::splat(400.0));

    let config = uniform_config(2000);
    let mut rng = StdRng::seed_from_u64(31);
    let small = generate_samples("s", &small_mesh, &small_bounds, None, &config, &mut rng).unwrap();
    let mut rng = StdRng::seed_from_u64(31);
    let large = generate_samples("l", &large_mesh, &large_bounds, None, &config, &mut rng).unwrap();
    assert!(
        (fraction(&small, 1.0) - fraction(&large, 1.0)).abs() < 0.02,
        "uniform inside fractions diverge: {} vs {}",
        fraction(&small, 1.0),
        fraction(&large, 1.0)
    );

    let config = depth_config(2000);
    let rotation = Some(Mat3::IDENTITY);
    let mut rng = StdRng::seed_from_u64(31);
    let small =
        generate_samples("s", &small_mesh, &small_bounds, rotation, &config, &mut rng).unwrap();
    let mut rng = StdRng::seed_from_u64(31);
    let large =
        generate_samples("l", &large_mesh, &large_bounds, rotation, &config, &mut rng).unwrap();
    assert!((fraction(&small, 1.0) - fraction(&large, 1.0)).abs() < 0.02);
    assert!((fraction(&small, 0.0) - fraction(&large, 0.0)).abs() < 0.02);

    let graded_mean = |set: &occu_data::SampleSet| {
        let graded: Vec<f32> = set
            .labels()
            .iter()
            .copied()
            .filter(|&l| l != 0.0 && l != 1.0)
            .collect();
        graded.iter().sum::<f32>() / graded.len() as f32
    };
    assert!((graded_mean(&small) - graded_mean(&large)).abs() < 0.02);
}

#[test]
fn same_seed_reproduces_the_sample_set() {
    let mesh = cube_mesh(Vec3::ZERO, 100.0);
    let bounds = Aabb::new(Vec3::splat(-100.0), Vec3::splat(100.0));

    for config in [uniform_config(500), depth_config(500)] {
        let rotation = Some(Mat3::IDENTITY);
        let mut rng_a = StdRng::seed_from_u64(99);
        let mut rng_b = StdRng::seed_from_u64(99);

        let a = generate_samples("cube", &mesh, &bounds, rotation, &config, &mut rng_a).unwrap();
        let b = generate_samples("cube", &mesh, &bounds, rotation, &config, &mut rng_b).unwrap();
        assert_eq!(a, b);

        let mut rng_c = StdRng::seed_from_u64(100);
        let c = generate_samples("cube", &mesh, &bounds, rotation, &config, &mut rng_c).unwrap();
        assert_ne!(a, c);
    }
}

#[test]
fn depth_requires_a_rotation() {
    let mesh = cube_mesh(Vec3::ZERO, 100.0);
    let bounds = mesh.bounding_box();
    let config = depth_config(100);
    let mut rng = StdRng::seed_from_u64(1);

    let err = generate_samples("cube", &mesh, &bounds, None, &config, &mut rng).unwrap_err();
    assert!(matches!(err, DatasetError::InvalidConfig { .. }));
}

#[test]
fn uniform_requires_a_nonempty_volume() {
    let mesh = cube_mesh(Vec3::ZERO, 100.0);
    let bounds = Aabb::new(Vec3::ZERO, Vec3::ZERO);
    let config = uniform_config(100);
    let mut rng = StdRng::seed_from_u64(1);

    let err = generate_samples("cube", &mesh, &bounds, None, &config, &mut rng).unwrap_err();
    assert!(matches!(err, DatasetError::InvalidConfig { .. }));
}

#[test]
fn degenerate_mesh_fails_with_subject_name() {
    // All faces have zero area, so the surface cannot be sampled.
    let vertices = vec![Vec3::ZERO, Vec3::ZERO, Vec3::ZERO];
    let mesh = TriangleMesh::new(vertices, vec![[0, 1, 2]]).unwrap();
    let bounds = Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0));
    let config = uniform_config(100);
    let mut rng = StdRng::seed_from_u64(1);

    let err = generate_samples("flatline", &mesh, &bounds, None, &config, &mut rng).unwrap_err();
    match err {
        DatasetError::SamplingFailure { subject, .. } => assert_eq!(subject, "flatline"),
        other => panic!("expected SamplingFailure, got {:?}", other),
    }
}

#[test]
fn invalid_config_fails_before_sampling() {
    let mesh = cube_mesh(Vec3::ZERO, 100.0);
    let bounds = mesh.bounding_box();
    let config = uniform_config(0);
    let mut rng = StdRng::seed_from_u64(1);

    let err = generate_samples("cube", &mesh, &bounds, None, &config, &mut rng).unwrap_err();
    assert!(matches!(err, DatasetError::InvalidConfig { .. }));
}
