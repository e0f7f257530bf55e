//! Depth-oriented sampling: graded proximity labels along the viewing
//! axis plus strongly-displaced way-inside/way-outside anchor batches.
//!
//! Every surface point is pushed along the camera-forward axis, flipped
//! per face so the push always goes into the mesh interior. The push
//! magnitude doubles as the label: small magnitudes land near 0.5,
//! saturated pushes are labeled exactly 1 (inside) or 0 (outside).

use glam::{Mat3, Vec3};
use occu_core::TriangleMesh;
use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::config::SamplingConfig;
use crate::error::{DatasetError, Result};
use crate::sampling::{SampleSet, SurfacePool};

/// Attempts per requested way-point before accepting an undersized batch.
const WAY_ATTEMPT_FACTOR: usize = 16;

/// Inward displacement range for way-inside points, in sigma multiples.
const WAY_INSIDE_BASE: f32 = 4.0;
const WAY_INSIDE_JITTER: f32 = 2.0;

/// Outward displacement range for way-outside points, in sigma multiples.
const WAY_OUTSIDE_BASE: f32 = 5.0;
const WAY_OUTSIDE_JITTER: f32 = 50.0;

pub(super) fn sample<R: Rng>(
    mesh: &TriangleMesh,
    pool: &mut SurfacePool<'_>,
    rotation: Mat3,
    sigma_multiplier: f32,
    config: &SamplingConfig,
    rng: &mut R,
) -> Result<SampleSet> {
    let n = config.num_samples;

    // Canonical camera-forward axis re-expressed in mesh-local space.
    let forward = rotation.inverse() * Vec3::Z;

    // Per-face displacement direction: faces looking at the camera are
    // pushed along +forward, back-facing ones along -forward, so that
    // subtracting the displacement always moves into the interior.
    let displacement = |face: usize| -> Vec3 {
        if mesh.face_normal(face).dot(forward) >= 0.0 {
            forward
        } else {
            -forward
        }
    };

    // Anchor batches come first; the graded batch is then sized to the
    // exact remainder so the three concatenated batches always sum to n.
    let way_inside_target = (n as f32 * config.ratio_way_inside).round() as usize;
    let way_outside_target = (n as f32 * config.ratio_way_outside).round() as usize;

    let way_inside = collect_way_points(
        pool,
        rng,
        way_inside_target,
        |pool_point, face, rng: &mut R| {
            let dir = displacement(face);
            let push = (WAY_INSIDE_BASE + rng.gen_range(0.0..WAY_INSIDE_JITTER)) * sigma_multiplier;
            let q = pool_point - dir * push;

            // Reject points near a thin or opposite-facing wall, and
            // points that ended up outside despite the inward push.
            if mesh.longest_ray(q, -dir) < WAY_INSIDE_BASE * sigma_multiplier {
                return None;
            }
            if mesh.signed_distance(q) < 0.0 {
                return None;
            }
            Some(q)
        },
    )?;

    let way_outside = collect_way_points(
        pool,
        rng,
        way_outside_target,
        |pool_point, face, rng: &mut R| {
            let dir = displacement(face);
            let push =
                (WAY_OUTSIDE_BASE + rng.gen_range(0.0..WAY_OUTSIDE_JITTER)) * sigma_multiplier;
            let q = pool_point + dir * push;

            // A finite short clearance means the point landed just in
            // front of another surface patch; a clean miss is fine.
            if mesh.longest_ray(q, dir) < WAY_OUTSIDE_BASE * sigma_multiplier {
                return None;
            }
            Some(q)
        },
    )?;

    if way_inside.len() < way_inside_target || way_outside.len() < way_outside_target {
        log::warn!(
            "way-point batches undersized ({}/{} inside, {}/{} outside), graded batch absorbs the difference",
            way_inside.len(),
            way_inside_target,
            way_outside.len(),
            way_outside_target
        );
    }

    // Graded near-surface points with truncated-normal push magnitudes.
    let graded_count = n - way_inside.len() - way_outside.len();
    let normal01 = Normal::new(0.0f32, 1.0).map_err(|err| DatasetError::InvalidConfig {
        message: format!("invalid normal distribution: {}", err),
    })?;

    let mut points = Vec::with_capacity(n);
    let mut labels = Vec::with_capacity(n);

    for _ in 0..graded_count {
        let (p, face) = pool.next(rng)?;
        let dir = displacement(face);

        // Standard normal truncated to (-1, 1)
        let t = loop {
            let t = normal01.sample(rng);
            if t > -1.0 && t < 1.0 {
                break t;
            }
        };

        points.push(p - dir * (2.0 * sigma_multiplier * t));
        // Affine rescale of the push into (0.1, 0.9): deeper inside reads
        // closer to 1, further outside closer to 0.
        labels.push(t / 2.0 * 0.8 + 0.5);
    }

    points.extend_from_slice(&way_inside);
    labels.resize(points.len(), 1.0);
    points.extend_from_slice(&way_outside);
    labels.resize(points.len(), 0.0);

    SampleSet::new(points, labels)
}

/// Draw validated way-points until `target` are accepted or the attempt
/// budget runs out.
fn collect_way_points<R, F>(
    pool: &mut SurfacePool<'_>,
    rng: &mut R,
    target: usize,
    mut displace: F,
) -> Result<Vec<Vec3>>
where
    R: Rng,
    F: FnMut(Vec3, usize, &mut R) -> Option<Vec3>,
{
    let mut accepted = Vec::with_capacity(target);
    let mut attempts = 0;
    let budget = target * WAY_ATTEMPT_FACTOR;

    while accepted.len() < target && attempts < budget {
        attempts += 1;
        let (p, face) = pool.next(rng)?;
        if let Some(q) = displace(p, face, rng) {
            accepted.push(q);
        }
    }

    Ok(accepted)
}
