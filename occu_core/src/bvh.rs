//! Bounding Volume Hierarchy for triangle mesh queries.
//!
//! A binary BVH built by midpoint splits on the longest axis. Supports
//! nearest-triangle searches (for signed distance) and ray intersection
//! collection (for containment parity tests and longest-ray queries).

use glam::Vec3;

use crate::aabb::Aabb;

/// Minimum ray parameter accepted as a hit. Filters out self-intersections
/// when the ray origin lies on the surface.
const RAY_EPSILON: f32 = 1e-6;

/// BVH node.
#[derive(Debug)]
enum BvhNode {
    /// Leaf node containing triangle indices.
    Leaf {
        bounds: Aabb,
        triangle_indices: Vec<usize>,
    },
    /// Internal node with two children.
    Internal {
        bounds: Aabb,
        left: Box<BvhNode>,
        right: Box<BvhNode>,
    },
}

impl BvhNode {
    fn bounds(&self) -> &Aabb {
        match self {
            BvhNode::Leaf { bounds, .. } => bounds,
            BvhNode::Internal { bounds, .. } => bounds,
        }
    }
}

/// Triangle BVH for nearest-triangle and ray queries.
///
/// The BVH does not store triangle data; the original mesh arrays must be
/// provided for queries.
#[derive(Debug)]
pub struct TriangleBvh {
    /// Root of the BVH tree.
    root: Option<BvhNode>,
    /// Precomputed bounding boxes for each triangle.
    triangle_bounds: Vec<Aabb>,
}

impl TriangleBvh {
    /// Build a BVH from a mesh.
    ///
    /// `max_leaf_size` is the maximum number of triangles per leaf
    /// (typically 4-8). Build time is O(n log n).
    pub fn build(vertices: &[Vec3], triangles: &[[usize; 3]], max_leaf_size: usize) -> Self {
        if triangles.is_empty() {
            return Self {
                root: None,
                triangle_bounds: Vec::new(),
            };
        }

        let triangle_bounds: Vec<Aabb> = triangles
            .iter()
            .map(|&[i0, i1, i2]| Aabb::from_triangle(vertices[i0], vertices[i1], vertices[i2]))
            .collect();

        let indices: Vec<usize> = (0..triangles.len()).collect();
        let root = Self::build_recursive(&triangle_bounds, indices, max_leaf_size);

        Self {
            root: Some(root),
            triangle_bounds,
        }
    }

    /// Recursive BVH construction.
    fn build_recursive(
        triangle_bounds: &[Aabb],
        mut indices: Vec<usize>,
        max_leaf_size: usize,
    ) -> BvhNode {
        let mut bounds = Aabb::empty();
        for &idx in &indices {
            bounds = bounds.union(&triangle_bounds[idx]);
        }

        if indices.len() <= max_leaf_size {
            return BvhNode::Leaf {
                bounds,
                triangle_indices: indices,
            };
        }

        // Split at the median along the longest axis
        let axis = bounds.longest_axis();
        indices.sort_by(|&a, &b| {
            let va = triangle_bounds[a].centroid()[axis];
            let vb = triangle_bounds[b].centroid()[axis];
            va.partial_cmp(&vb).unwrap_or(core::cmp::Ordering::Equal)
        });

        let mid = indices.len() / 2;
        let right_indices = indices.split_off(mid);
        let left_indices = indices;

        let left = Self::build_recursive(triangle_bounds, left_indices, max_leaf_size);
        let right = Self::build_recursive(triangle_bounds, right_indices, max_leaf_size);

        BvhNode::Internal {
            bounds,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Find the nearest triangle to a query point.
    ///
    /// Returns `Some((triangle_index, closest_point, barycentric_coords,
    /// squared_distance))` or `None` if the BVH is empty.
    pub fn nearest_triangle(
        &self,
        mesh_vertices: &[Vec3],
        mesh_triangles: &[[usize; 3]],
        query_point: Vec3,
    ) -> Option<(usize, Vec3, [f32; 3], f32)> {
        let root = self.root.as_ref()?;

        let mut best_dist_sq = f32::MAX;
        let mut best_result: Option<(usize, Vec3, [f32; 3])> = None;

        Self::nearest_recursive(
            root,
            mesh_vertices,
            mesh_triangles,
            query_point,
            &mut best_dist_sq,
            &mut best_result,
        );

        best_result.map(|(idx, pt, bary)| (idx, pt, bary, best_dist_sq))
    }

    fn nearest_recursive(
        node: &BvhNode,
        vertices: &[Vec3],
        triangles: &[[usize; 3]],
        query: Vec3,
        best_dist_sq: &mut f32,
        best_result: &mut Option<(usize, Vec3, [f32; 3])>,
    ) {
        // Early exit if this node can't improve
        if node.bounds().distance_squared(query) >= *best_dist_sq {
            return;
        }

        match node {
            BvhNode::Leaf {
                triangle_indices, ..
            } => {
                for &tri_idx in triangle_indices {
                    let [i0, i1, i2] = triangles[tri_idx];
                    let (closest_pt, bary) =
                        closest_point_on_triangle(query, vertices[i0], vertices[i1], vertices[i2]);
                    let dist_sq = (query - closest_pt).length_squared();

                    if dist_sq < *best_dist_sq {
                        *best_dist_sq = dist_sq;
                        *best_result = Some((tri_idx, closest_pt, bary));
                    }
                }
            }
            BvhNode::Internal { left, right, .. } => {
                // Visit the closer child first
                let left_dist = left.bounds().distance_squared(query);
                let right_dist = right.bounds().distance_squared(query);

                let (first, second) = if left_dist < right_dist {
                    (left, right)
                } else {
                    (right, left)
                };
                Self::nearest_recursive(first, vertices, triangles, query, best_dist_sq, best_result);
                Self::nearest_recursive(second, vertices, triangles, query, best_dist_sq, best_result);
            }
        }
    }

    /// Collect the ray parameters of every triangle intersection along
    /// `origin + t * dir` with `t > RAY_EPSILON`.
    ///
    /// `dir` does not need to be normalized, but the returned parameters
    /// are in units of `dir`'s length.
    pub fn ray_intersections(
        &self,
        vertices: &[Vec3],
        triangles: &[[usize; 3]],
        origin: Vec3,
        dir: Vec3,
    ) -> Vec<f32> {
        let mut hits = Vec::new();
        if let Some(root) = self.root.as_ref() {
            let inv_dir = dir.recip();
            Self::ray_recursive(root, vertices, triangles, origin, dir, inv_dir, &mut hits);
        }
        hits
    }

    fn ray_recursive(
        node: &BvhNode,
        vertices: &[Vec3],
        triangles: &[[usize; 3]],
        origin: Vec3,
        dir: Vec3,
        inv_dir: Vec3,
        hits: &mut Vec<f32>,
    ) {
        if !node.bounds().intersects_ray(origin, inv_dir) {
            return;
        }

        match node {
            BvhNode::Leaf {
                triangle_indices, ..
            } => {
                for &tri_idx in triangle_indices {
                    let [i0, i1, i2] = triangles[tri_idx];
                    if let Some(t) =
                        ray_triangle_intersection(origin, dir, vertices[i0], vertices[i1], vertices[i2])
                    {
                        hits.push(t);
                    }
                }
            }
            BvhNode::Internal { left, right, .. } => {
                Self::ray_recursive(left, vertices, triangles, origin, dir, inv_dir, hits);
                Self::ray_recursive(right, vertices, triangles, origin, dir, inv_dir, hits);
            }
        }
    }

    /// Check if the BVH is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Get the number of triangles in the BVH.
    #[inline]
    pub fn num_triangles(&self) -> usize {
        self.triangle_bounds.len()
    }

    /// Get the bounds of the entire BVH.
    pub fn bounds(&self) -> Option<Aabb> {
        self.root.as_ref().map(|r| *r.bounds())
    }
}

/// Möller-Trumbore ray/triangle intersection.
///
/// Returns the ray parameter `t > RAY_EPSILON`, or `None` when the ray
/// misses or runs parallel to the triangle plane.
fn ray_triangle_intersection(origin: Vec3, dir: Vec3, v0: Vec3, v1: Vec3, v2: Vec3) -> Option<f32> {
    let e1 = v1 - v0;
    let e2 = v2 - v0;

    let pvec = dir.cross(e2);
    let det = e1.dot(pvec);
    if det.abs() < 1e-12 {
        return None;
    }
    let inv_det = 1.0 / det;

    let tvec = origin - v0;
    let u = tvec.dot(pvec) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let qvec = tvec.cross(e1);
    let v = dir.dot(qvec) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = e2.dot(qvec) * inv_det;
    if t > RAY_EPSILON {
        Some(t)
    } else {
        None
    }
}

/// Compute the closest point on a triangle to a given point.
/// Returns (closest_point, barycentric_coordinates).
pub(crate) fn closest_point_on_triangle(p: Vec3, a: Vec3, b: Vec3, c: Vec3) -> (Vec3, [f32; 3]) {
    let ab = b - a;
    let ac = c - a;
    let ap = p - a;

    let d1 = ab.dot(ap);
    let d2 = ac.dot(ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return (a, [1.0, 0.0, 0.0]);
    }

    let bp = p - b;
    let d3 = ab.dot(bp);
    let d4 = ac.dot(bp);
    if d3 >= 0.0 && d4 <= d3 {
        return (b, [0.0, 1.0, 0.0]);
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return (a + ab * v, [1.0 - v, v, 0.0]);
    }

    let cp = p - c;
    let d5 = ab.dot(cp);
    let d6 = ac.dot(cp);
    if d6 >= 0.0 && d5 <= d6 {
        return (c, [0.0, 0.0, 1.0]);
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return (a + ac * w, [1.0 - w, 0.0, w]);
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return (b + (c - b) * w, [0.0, 1.0 - w, w]);
    }

    let denom = 1.0 / (va + vb + vc);
    let v = vb * denom;
    let w = vc * denom;
    (a + ab * v + ac * w, [1.0 - v - w, v, w])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_quad() -> (Vec<Vec3>, Vec<[usize; 3]>) {
        let vertices = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ];
        let triangles = vec![[0, 1, 2], [0, 2, 3]];
        (vertices, triangles)
    }

    #[test]
    fn bvh_single_triangle_nearest() {
        let vertices = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ];
        let triangles = vec![[0, 1, 2]];

        let bvh = TriangleBvh::build(&vertices, &triangles, 4);
        assert_eq!(bvh.num_triangles(), 1);
        assert!(!bvh.is_empty());

        let (tri_idx, closest, _, dist_sq) = bvh
            .nearest_triangle(&vertices, &triangles, Vec3::new(0.25, 0.25, 1.0))
            .unwrap();
        assert_eq!(tri_idx, 0);
        assert!(closest.z.abs() < 1e-5);
        assert!((dist_sq - 1.0).abs() < 1e-5);
    }

    #[test]
    fn bvh_empty() {
        let bvh = TriangleBvh::build(&[], &[], 4);
        assert!(bvh.is_empty());
        assert!(bvh.nearest_triangle(&[], &[], Vec3::ZERO).is_none());
        assert!(bvh
            .ray_intersections(&[], &[], Vec3::ZERO, Vec3::Z)
            .is_empty());
    }

    #[test]
    fn ray_hits_quad_once() {
        let (vertices, triangles) = unit_quad();
        let bvh = TriangleBvh::build(&vertices, &triangles, 4);

        let hits = bvh.ray_intersections(
            &vertices,
            &triangles,
            Vec3::new(0.25, 0.25, -1.0),
            Vec3::Z,
        );
        assert_eq!(hits.len(), 1);
        assert!((hits[0] - 1.0).abs() < 1e-5);

        // Ray pointing away misses
        let misses = bvh.ray_intersections(
            &vertices,
            &triangles,
            Vec3::new(0.25, 0.25, -1.0),
            -Vec3::Z,
        );
        assert!(misses.is_empty());
    }

    #[test]
    fn ray_triangle_parallel_miss() {
        let hit = ray_triangle_intersection(
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::X,
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        );
        assert!(hit.is_none());
    }

    #[test]
    fn nearest_matches_brute_force() {
        let (vertices, triangles) = unit_quad();
        let bvh = TriangleBvh::build(&vertices, &triangles, 1);

        let queries = [
            Vec3::new(0.5, 0.5, 0.5),
            Vec3::new(2.0, 0.5, 0.0),
            Vec3::new(-1.0, -1.0, -1.0),
        ];

        for query in queries {
            let bvh_dist_sq = bvh
                .nearest_triangle(&vertices, &triangles, query)
                .map(|(_, _, _, d)| d)
                .unwrap();

            let mut brute = f32::MAX;
            for &[i0, i1, i2] in &triangles {
                let (closest, _) =
                    closest_point_on_triangle(query, vertices[i0], vertices[i1], vertices[i2]);
                brute = brute.min((query - closest).length_squared());
            }

            assert!(
                (bvh_dist_sq - brute).abs() < 1e-5,
                "BVH/brute mismatch for {:?}: bvh={}, brute={}",
                query,
                bvh_dist_sq,
                brute
            );
        }
    }
}
