//! Triangle mesh with the geometric queries used by sample generation.
//!
//! A [`TriangleMesh`] is immutable after construction. Face normals, the
//! area table used for surface sampling, and the BVH are all precomputed
//! in the constructor so that every query is read-only and reentrant.

use glam::Vec3;
use rand::Rng;

use crate::aabb::Aabb;
use crate::bvh::TriangleBvh;
use crate::error::{CoreError, Result};

/// Maximum triangles per BVH leaf.
const BVH_LEAF_SIZE: usize = 4;

/// Fixed direction for containment parity rays. Deliberately not axis
/// aligned so rays rarely graze edges of axis-aligned geometry.
const PARITY_DIR: Vec3 = Vec3::new(0.577_350_3, 0.577_350_3, 0.577_350_3);

/// Points drawn uniformly over a mesh surface, each tagged with the index
/// of the face it was drawn from.
#[derive(Debug, Clone)]
pub struct SurfaceSamples {
    /// Sampled positions.
    pub points: Vec<Vec3>,
    /// Source face index per point.
    pub faces: Vec<usize>,
}

impl SurfaceSamples {
    /// Number of samples.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// An immutable, watertight triangle mesh.
#[derive(Debug)]
pub struct TriangleMesh {
    vertices: Vec<Vec3>,
    triangles: Vec<[usize; 3]>,
    face_normals: Vec<Vec3>,
    vertex_normals: Vec<Vec3>,
    /// Cumulative face areas, used for area-weighted surface sampling.
    cumulative_area: Vec<f32>,
    total_area: f32,
    bounds: Aabb,
    bvh: TriangleBvh,
}

impl TriangleMesh {
    /// Build a mesh from vertex positions and triangle indices.
    ///
    /// Validates triangle indices and precomputes normals, the sampling
    /// area table, and the BVH.
    pub fn new(vertices: Vec<Vec3>, triangles: Vec<[usize; 3]>) -> Result<Self> {
        for (tri, &[i0, i1, i2]) in triangles.iter().enumerate() {
            for index in [i0, i1, i2] {
                if index >= vertices.len() {
                    return Err(CoreError::InvalidTriangleIndex {
                        triangle: tri,
                        index,
                        vertex_count: vertices.len(),
                    });
                }
            }
        }

        let mut face_normals = Vec::with_capacity(triangles.len());
        let mut cumulative_area = Vec::with_capacity(triangles.len());
        let mut total_area = 0.0f32;

        for &[i0, i1, i2] in &triangles {
            let e1 = vertices[i1] - vertices[i0];
            let e2 = vertices[i2] - vertices[i0];
            let cross = e1.cross(e2);

            total_area += 0.5 * cross.length();
            cumulative_area.push(total_area);
            face_normals.push(cross.normalize_or_zero());
        }

        // Vertex normals: average of adjacent face normals, used to pick
        // the sign of the distance at the closest surface point.
        let mut vertex_normals = vec![Vec3::ZERO; vertices.len()];
        for (face, &[i0, i1, i2]) in triangles.iter().enumerate() {
            let n = face_normals[face];
            vertex_normals[i0] += n;
            vertex_normals[i1] += n;
            vertex_normals[i2] += n;
        }
        for n in &mut vertex_normals {
            *n = n.normalize_or_zero();
        }

        let mut bounds = Aabb::empty();
        for v in &vertices {
            bounds.expand_point(*v);
        }

        let bvh = TriangleBvh::build(&vertices, &triangles, BVH_LEAF_SIZE);

        Ok(Self {
            vertices,
            triangles,
            face_normals,
            vertex_normals,
            cumulative_area,
            total_area,
            bounds,
            bvh,
        })
    }

    /// Vertex positions.
    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    /// Triangle index triples.
    pub fn triangles(&self) -> &[[usize; 3]] {
        &self.triangles
    }

    /// Number of faces.
    pub fn num_faces(&self) -> usize {
        self.triangles.len()
    }

    /// Number of vertices.
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Unit normal of a face.
    pub fn face_normal(&self, face: usize) -> Vec3 {
        self.face_normals[face]
    }

    /// All face normals.
    pub fn face_normals(&self) -> &[Vec3] {
        &self.face_normals
    }

    /// Total surface area.
    pub fn surface_area(&self) -> f32 {
        self.total_area
    }

    /// Axis-aligned bounding box of the mesh.
    pub fn bounding_box(&self) -> Aabb {
        self.bounds
    }

    /// Extent of the mesh along the Y axis.
    pub fn y_extent(&self) -> f32 {
        self.bounds.max.y - self.bounds.min.y
    }

    /// Draw `count` points uniformly at random over the surface.
    ///
    /// Faces are chosen with probability proportional to their area
    /// (binary search on the cumulative area table), positions uniformly
    /// by barycentric folding within the face.
    ///
    /// Fails with [`CoreError::DegenerateSurface`] when the mesh has no
    /// faces or no usable area.
    pub fn sample_surface<R: Rng>(&self, count: usize, rng: &mut R) -> Result<SurfaceSamples> {
        if self.triangles.is_empty() || self.total_area <= 0.0 {
            return Err(CoreError::DegenerateSurface {
                faces: self.triangles.len(),
                total_area: self.total_area,
            });
        }

        let mut points = Vec::with_capacity(count);
        let mut faces = Vec::with_capacity(count);

        for _ in 0..count {
            let target = rng.gen::<f32>() * self.total_area;
            let face = self
                .cumulative_area
                .partition_point(|&area| area < target)
                .min(self.triangles.len() - 1);

            let [i0, i1, i2] = self.triangles[face];
            let v0 = self.vertices[i0];
            let e1 = self.vertices[i1] - v0;
            let e2 = self.vertices[i2] - v0;

            let mut u = rng.gen::<f32>();
            let mut v = rng.gen::<f32>();
            if u + v > 1.0 {
                u = 1.0 - u;
                v = 1.0 - v;
            }

            points.push(v0 + e1 * u + e2 * v);
            faces.push(face);
        }

        Ok(SurfaceSamples { points, faces })
    }

    /// Containment test via ray parity.
    ///
    /// Casts a ray along a fixed direction and counts surface crossings;
    /// an odd count means the point is inside. Requires watertightness.
    pub fn contains(&self, point: Vec3) -> bool {
        let hits = self
            .bvh
            .ray_intersections(&self.vertices, &self.triangles, point, PARITY_DIR);
        hits.len() % 2 == 1
    }

    /// Distance along `origin + t * dir` to the farthest surface
    /// intersection, or `f32::INFINITY` when the ray misses entirely.
    ///
    /// `dir` is normalized internally so the result is a metric distance.
    pub fn longest_ray(&self, origin: Vec3, dir: Vec3) -> f32 {
        let dir = dir.normalize_or_zero();
        if dir == Vec3::ZERO {
            return f32::INFINITY;
        }

        self.bvh
            .ray_intersections(&self.vertices, &self.triangles, origin, dir)
            .into_iter()
            .fold(f32::INFINITY, |acc, t| {
                if acc.is_finite() {
                    acc.max(t)
                } else {
                    t
                }
            })
    }

    /// Signed distance from a point to the surface.
    ///
    /// Positive inside, negative outside. The sign comes from the
    /// interpolated vertex normal at the closest surface point.
    pub fn signed_distance(&self, point: Vec3) -> f32 {
        match self
            .bvh
            .nearest_triangle(&self.vertices, &self.triangles, point)
        {
            None => f32::NEG_INFINITY,
            Some((face, closest, bary, dist_sq)) => {
                let [i0, i1, i2] = self.triangles[face];
                let normal = self.vertex_normals[i0] * bary[0]
                    + self.vertex_normals[i1] * bary[1]
                    + self.vertex_normals[i2] * bary[2];

                let dist = dist_sq.sqrt();
                if (point - closest).dot(normal) >= 0.0 {
                    -dist
                } else {
                    dist
                }
            }
        }
    }
}
