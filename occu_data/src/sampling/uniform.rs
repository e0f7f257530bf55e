//! Uniform (spatial) sampling: near-surface Gaussian perturbation mixed
//! with volumetric points, labeled by binary containment.

use glam::Vec3;
use occu_core::{Aabb, SurfaceSamples, TriangleMesh};
use rand::seq::SliceRandom;
use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::config::SamplingConfig;
use crate::error::{DatasetError, Result};
use crate::sampling::SampleSet;

/// Extra classification rounds when the inside/outside split cannot fill
/// the requested count under the half-and-half balance cap.
const MAX_BACKFILL_ROUNDS: usize = 8;

pub(super) fn sample<R: Rng>(
    subject: &str,
    mesh: &TriangleMesh,
    bounds: &Aabb,
    seed: SurfaceSamples,
    sigma_multiplier: f32,
    config: &SamplingConfig,
    rng: &mut R,
) -> Result<SampleSet> {
    let n = config.num_samples;
    let half = n / 2;

    let noise = Normal::new(0.0f32, config.sigma * sigma_multiplier).map_err(|err| {
        DatasetError::InvalidConfig {
            message: format!("invalid perturbation sigma: {}", err),
        }
    })?;
    let volumetric_count = ((config.compensation_factor * n as f32) / 4.0).ceil() as usize;
    let surface_count = seed.points.len();

    let mut inside: Vec<Vec3> = Vec::new();
    let mut outside: Vec<Vec3> = Vec::new();

    let mut classify_batch =
        |candidates: Vec<Vec3>, inside: &mut Vec<Vec3>, outside: &mut Vec<Vec3>| {
            for p in candidates {
                if mesh.contains(p) {
                    inside.push(p);
                } else {
                    outside.push(p);
                }
            }
        };

    // First round straddles the surface with Gaussian jitter and covers
    // the volume with uniform points, shuffled together so truncation
    // below does not prefer either population.
    let mut candidates = Vec::with_capacity(surface_count + volumetric_count);
    for p in &seed.points {
        candidates.push(*p + gaussian_offset(&noise, rng));
    }
    for _ in 0..volumetric_count {
        candidates.push(uniform_in_box(bounds, rng));
    }
    candidates.shuffle(rng);
    classify_batch(candidates, &mut inside, &mut outside);

    // The outside set occasionally cannot fill its share (mesh nearly
    // fills the volume). Draw more batches before relaxing the balance.
    let mut rounds = 0;
    while outside.len() < n - inside.len().min(half) && rounds < MAX_BACKFILL_ROUNDS {
        rounds += 1;
        log::warn!(
            "subject {}: outside set undersized ({} inside / {} outside), backfill round {}",
            subject,
            inside.len(),
            outside.len(),
            rounds
        );

        let extra = mesh
            .sample_surface(surface_count.max(1), rng)
            .map_err(|err| super::sampling_failure(subject, &err))?;
        let mut batch = Vec::with_capacity(extra.len() + volumetric_count);
        for p in &extra.points {
            batch.push(*p + gaussian_offset(&noise, rng));
        }
        for _ in 0..volumetric_count {
            batch.push(uniform_in_box(bounds, rng));
        }
        batch.shuffle(rng);
        classify_batch(batch, &mut inside, &mut outside);
    }

    // Balance: inside points are capped at half so confident-outside
    // supervision is never crowded out; the outside set tops up the rest.
    let mut take_inside = inside.len().min(half);
    let mut take_outside = n - take_inside;
    if outside.len() < take_outside {
        // Relax the cap rather than return an undersized set.
        take_outside = outside.len();
        take_inside = (n - take_outside).min(inside.len());
        log::warn!(
            "subject {}: relaxing inside cap to {} (outside has only {})",
            subject,
            take_inside,
            take_outside
        );
    }

    let mut points = Vec::with_capacity(n);
    let mut labels = Vec::with_capacity(n);
    points.extend_from_slice(&inside[..take_inside]);
    labels.resize(take_inside, 1.0);
    points.extend_from_slice(&outside[..take_outside]);
    labels.resize(points.len(), 0.0);

    // Last resort for degenerate oversampling configurations: cycle
    // existing points, never return fewer than n.
    let (pad_from, pad_label) = if outside.is_empty() {
        (&inside, 1.0)
    } else {
        (&outside, 0.0)
    };
    let mut cursor = 0;
    while points.len() < n {
        points.push(pad_from[cursor % pad_from.len()]);
        labels.push(pad_label);
        cursor += 1;
    }

    SampleSet::new(points, labels)
}

fn gaussian_offset<R: Rng>(noise: &Normal<f32>, rng: &mut R) -> Vec3 {
    Vec3::new(noise.sample(rng), noise.sample(rng), noise.sample(rng))
}

fn uniform_in_box<R: Rng>(bounds: &Aabb, rng: &mut R) -> Vec3 {
    bounds.min + bounds.extent() * Vec3::new(rng.gen(), rng.gen(), rng.gen())
}
