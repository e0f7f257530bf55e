//! Axis-aligned bounding boxes.
//!
//! Used both as BVH node bounds and as the volumetric sampling domain
//! for training-point generation.

use glam::Vec3;

/// Axis-aligned bounding box.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Aabb {
    /// Minimum corner.
    pub min: Vec3,
    /// Maximum corner.
    pub max: Vec3,
}

impl Aabb {
    /// Create an empty (inverted) AABB.
    #[inline]
    pub fn empty() -> Self {
        Self {
            min: Vec3::splat(f32::MAX),
            max: Vec3::splat(f32::MIN),
        }
    }

    /// Create an AABB from min/max points.
    #[inline]
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create an AABB from a triangle.
    #[inline]
    pub fn from_triangle(v0: Vec3, v1: Vec3, v2: Vec3) -> Self {
        Self {
            min: v0.min(v1).min(v2),
            max: v0.max(v1).max(v2),
        }
    }

    /// Expand this AABB to include a point.
    #[inline]
    pub fn expand_point(&mut self, p: Vec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    /// Compute the union of two AABBs.
    #[inline]
    pub fn union(&self, other: &Aabb) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Extent along each axis.
    #[inline]
    pub fn extent(&self) -> Vec3 {
        self.max - self.min
    }

    /// Compute the surface area of this AABB.
    #[inline]
    pub fn surface_area(&self) -> f32 {
        let e = self.extent();
        2.0 * (e.x * e.y + e.y * e.z + e.z * e.x)
    }

    /// Compute the volume of this AABB.
    #[inline]
    pub fn volume(&self) -> f32 {
        let e = self.extent();
        e.x * e.y * e.z
    }

    /// Compute the squared distance from a point to this AABB.
    ///
    /// Returns 0.0 if the point is inside the AABB.
    #[inline]
    pub fn distance_squared(&self, p: Vec3) -> f32 {
        let d = (self.min - p).max(Vec3::ZERO).max(p - self.max);
        d.length_squared()
    }

    /// Check whether a point lies inside this AABB (inclusive).
    #[inline]
    pub fn contains(&self, p: Vec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }

    /// Get the longest axis (0=x, 1=y, 2=z).
    #[inline]
    pub fn longest_axis(&self) -> usize {
        let e = self.extent();
        if e.x >= e.y && e.x >= e.z {
            0
        } else if e.y >= e.z {
            1
        } else {
            2
        }
    }

    /// Get the centroid of this AABB.
    #[inline]
    pub fn centroid(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Check if this AABB is valid (min <= max).
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.min.cmple(self.max).all()
    }

    /// Slab test against a ray given the ray's inverse direction.
    ///
    /// Returns true when the ray (origin + t * dir, t >= 0) can intersect
    /// the box. Infinite components of `inv_dir` (axis-parallel rays) are
    /// handled by IEEE semantics.
    #[inline]
    pub fn intersects_ray(&self, origin: Vec3, inv_dir: Vec3) -> bool {
        let t0 = (self.min - origin) * inv_dir;
        let t1 = (self.max - origin) * inv_dir;
        let t_near = t0.min(t1);
        let t_far = t0.max(t1);
        let enter = t_near.max_element().max(0.0);
        let exit = t_far.min_element();
        enter <= exit
    }
}
