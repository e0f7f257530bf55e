//! Query-point sampling for occupancy supervision.
//!
//! Given a subject's mesh, a bounding volume, and a view rotation, the
//! engine draws a fixed-size cloud of 3D points and assigns each a
//! supervision label. Two policies are available:
//!
//! - [`SamplingStrategy::Uniform`]: Gaussian-perturbed surface points
//!   mixed with uniform volumetric points, labeled {0, 1} by containment.
//! - [`SamplingStrategy::DepthOriented`]: points displaced along the
//!   view-dependent forward axis with graded labels in (0.1, 0.9), plus
//!   strongly-displaced way-inside (label 1) and way-outside (label 0)
//!   anchor batches.
//!
//! Every call consumes randomness only from the caller-provided generator,
//! so results are reproducible from a seed and calls may run concurrently
//! with independent generators.

mod depth;
mod uniform;

use glam::{Mat3, Vec3};
use occu_core::{Aabb, CoreError, SurfaceSamples, TriangleMesh};
use rand::Rng;

use crate::config::{SamplingConfig, SamplingStrategy};
use crate::error::{DatasetError, Result};

/// Average subject height of the reference dataset in scene units. The
/// per-mesh sigma multiplier normalizes jitter magnitudes against it so
/// sampling noise is metric-consistent across subject sizes.
const REFERENCE_HEIGHT: f32 = 188.0;

/// Maximum times the surface pool re-samples the mesh before giving up.
const MAX_POOL_REFILLS: usize = 8;

/// A fixed-size cloud of query points with positionally-paired labels.
///
/// The only constructor rejects mismatched lengths, so
/// `points().len() == labels().len()` always holds.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleSet {
    points: Vec<Vec3>,
    labels: Vec<f32>,
}

impl SampleSet {
    /// Create a sample set, rejecting mismatched lengths.
    pub fn new(points: Vec<Vec3>, labels: Vec<f32>) -> Result<Self> {
        if points.len() != labels.len() {
            return Err(DatasetError::ShapeMismatch {
                expected: vec![points.len()],
                got: vec![labels.len()],
            });
        }
        Ok(Self { points, labels })
    }

    /// An empty sample set (evaluation-mode placeholder).
    pub fn empty() -> Self {
        Self {
            points: Vec::new(),
            labels: Vec::new(),
        }
    }

    /// Number of point/label pairs.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Query point positions.
    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    /// Supervision labels, in [0, 1].
    pub fn labels(&self) -> &[f32] {
        &self.labels
    }
}

/// Cursor over an oversampled surface cloud that re-samples the mesh when
/// the cloud runs out, so rejection losses never starve a strategy.
struct SurfacePool<'a> {
    mesh: &'a TriangleMesh,
    subject: &'a str,
    points: Vec<Vec3>,
    faces: Vec<usize>,
    cursor: usize,
    refills: usize,
}

impl<'a> SurfacePool<'a> {
    fn new(mesh: &'a TriangleMesh, subject: &'a str, seed: SurfaceSamples) -> Self {
        Self {
            mesh,
            subject,
            points: seed.points,
            faces: seed.faces,
            cursor: 0,
            refills: 0,
        }
    }

    /// Next surface point and its source face.
    fn next<R: Rng>(&mut self, rng: &mut R) -> Result<(Vec3, usize)> {
        if self.cursor == self.points.len() {
            if self.refills == MAX_POOL_REFILLS {
                return Err(DatasetError::SamplingFailure {
                    subject: self.subject.to_string(),
                    reason: format!(
                        "surface pool exhausted after {} refills",
                        MAX_POOL_REFILLS
                    ),
                });
            }
            let batch = self
                .mesh
                .sample_surface(self.points.len().max(1), rng)
                .map_err(|err| sampling_failure(self.subject, &err))?;
            log::debug!(
                "subject {}: refilling surface pool ({} points)",
                self.subject,
                batch.len()
            );
            self.points = batch.points;
            self.faces = batch.faces;
            self.cursor = 0;
            self.refills += 1;
        }

        let entry = (self.points[self.cursor], self.faces[self.cursor]);
        self.cursor += 1;
        Ok(entry)
    }
}

fn sampling_failure(subject: &str, err: &CoreError) -> DatasetError {
    DatasetError::SamplingFailure {
        subject: subject.to_string(),
        reason: err.to_string(),
    }
}

/// Draw `config.num_samples` labeled query points for one view of one
/// subject.
///
/// `rotation` re-expresses the canonical camera-forward axis in mesh-local
/// space and is required by the depth-oriented strategy; `bounds` is the
/// volumetric sampling domain used by the uniform strategy.
///
/// The returned set always holds exactly `config.num_samples` points.
/// Configuration inconsistencies fail before any sampling work; a mesh
/// whose surface cannot be sampled fails with
/// [`DatasetError::SamplingFailure`] naming the subject.
pub fn generate_samples<R: Rng>(
    subject: &str,
    mesh: &TriangleMesh,
    bounds: &Aabb,
    rotation: Option<Mat3>,
    config: &SamplingConfig,
    rng: &mut R,
) -> Result<SampleSet> {
    config
        .validate()
        .map_err(|message| DatasetError::InvalidConfig { message })?;

    // Fail fast on input inconsistencies before touching the mesh. The
    // rotation is only materialized for the strategy that needs it.
    let view_rotation = match config.strategy {
        SamplingStrategy::Uniform => {
            if !bounds.is_valid() || bounds.volume() <= 0.0 {
                return Err(DatasetError::InvalidConfig {
                    message: "uniform sampling requires a non-empty bounding volume".to_string(),
                });
            }
            None
        }
        SamplingStrategy::DepthOriented => {
            Some(rotation.ok_or_else(|| DatasetError::InvalidConfig {
                message: "depth-oriented sampling requires a rotation matrix".to_string(),
            })?)
        }
    };

    // Oversampled seed cloud shared by both strategies.
    let seed_count =
        (config.compensation_factor * 4.0 * config.num_samples as f32).ceil() as usize;
    let seed = mesh
        .sample_surface(seed_count, rng)
        .map_err(|err| sampling_failure(subject, &err))?;

    let sigma_multiplier = mesh.y_extent() / REFERENCE_HEIGHT;
    if !(sigma_multiplier > 0.0) {
        return Err(DatasetError::SamplingFailure {
            subject: subject.to_string(),
            reason: format!("mesh has no vertical extent ({})", mesh.y_extent()),
        });
    }

    let set = match view_rotation {
        None => uniform::sample(subject, mesh, bounds, seed, sigma_multiplier, config, rng)?,
        Some(rotation) => {
            let mut pool = SurfacePool::new(mesh, subject, seed);
            depth::sample(mesh, &mut pool, rotation, sigma_multiplier, config, rng)?
        }
    };

    debug_assert_eq!(set.len(), config.num_samples);
    Ok(set)
}
