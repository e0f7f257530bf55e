//! # occu_core
//!
//! Triangle-mesh geometry kernel for occupancy sample generation.
//!
//! Provides the read-only mesh queries that training-data preparation is
//! built on:
//!
//! - **Surface sampling**: area-weighted uniform points with source face
//!   indices ([`TriangleMesh::sample_surface`])
//! - **Containment**: ray-parity inside/outside tests
//!   ([`TriangleMesh::contains`])
//! - **Ray casting**: farthest-intersection distance along a ray
//!   ([`TriangleMesh::longest_ray`])
//! - **Signed distance**: BVH nearest-triangle search with pseudo-normal
//!   sign, positive inside ([`TriangleMesh::signed_distance`])
//! - **OBJ import**: minimal Wavefront parser ([`load_obj`])
//!
//! All queries are `&self` and reentrant; a mesh is never mutated after
//! construction. Randomness is always supplied by the caller so results
//! are reproducible from a seed.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod aabb;
mod bvh;
mod error;
mod mesh;
mod obj;

pub use aabb::Aabb;
pub use bvh::TriangleBvh;
pub use error::{CoreError, Result};
pub use mesh::{SurfaceSamples, TriangleMesh};
pub use obj::{load_obj, parse_obj};
