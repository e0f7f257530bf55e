//! Camera calibration assembly.
//!
//! Per-view camera parameters are stored as JSON sidecar files by the
//! rendering pipeline. From them we derive the bounding cube the subject
//! fits in and the 4x4 calibration matrix mapping world points into
//! normalized image space.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use glam::{Mat3, Mat4, Vec3, Vec4};
use occu_core::Aabb;
use serde::Deserialize;

use crate::error::Result;

/// Per-view camera parameters as written by the renderer.
#[derive(Debug, Clone, Deserialize)]
pub struct ViewParams {
    /// Camera center in world space.
    pub center: [f32; 3],
    /// Subject rotation for this view, row-major.
    #[serde(rename = "R")]
    pub rotation: [[f32; 3]; 3],
    /// Orthographic scale factor relating world units to pixels.
    pub scale_factor: f32,
}

impl ViewParams {
    /// Load parameters from a JSON sidecar file.
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let params = serde_json::from_reader(BufReader::new(file))?;
        Ok(params)
    }

    /// Camera center as a vector.
    pub fn center_vec(&self) -> Vec3 {
        Vec3::from_array(self.center)
    }

    /// Rotation as a matrix. The JSON stores rows; glam is column-major.
    pub fn rotation_matrix(&self) -> Mat3 {
        Mat3::from_cols_array_2d(&self.rotation).transpose()
    }
}

/// Derived calibration for one view.
#[derive(Debug, Clone)]
pub struct Calibration {
    /// Full calibration matrix: pixel-to-UV intrinsic x scale intrinsic
    /// x extrinsic.
    pub calib: Mat4,
    /// World-to-camera extrinsic.
    pub extrinsic: Mat4,
    /// Cubic bounding volume the subject fits in.
    pub bounds: Aabb,
}

impl Calibration {
    /// Build the calibration for a view.
    ///
    /// `load_size` is the reference raster resolution the scale factor is
    /// expressed against. The bounding volume is a cube of side
    /// `load_size / scale_factor` centered on the camera center.
    pub fn build(params: &ViewParams, load_size: u32) -> Self {
        let center = params.center_vec();
        let rotation = params.rotation_matrix();

        let b_range = load_size as f32 / params.scale_factor;
        let half = Vec3::splat(b_range * 0.5);
        let bounds = Aabb::new(center - half, center + half);

        // extrinsic = [R | -center]
        let extrinsic = Mat4::from_cols(
            rotation.col(0).extend(0.0),
            rotation.col(1).extend(0.0),
            rotation.col(2).extend(0.0),
            (-center).extend(1.0),
        );

        // Orthographic scale; Y is flipped to match image row order.
        let s = params.scale_factor;
        let scale_intrinsic = Mat4::from_diagonal(Vec4::new(s, -s, s, 1.0));

        // Pixel space to UV space.
        let inv_half_size = 1.0 / (load_size / 2) as f32;
        let uv_intrinsic = Mat4::from_diagonal(Vec4::new(
            inv_half_size,
            inv_half_size,
            inv_half_size,
            1.0,
        ));

        let calib = uv_intrinsic * scale_intrinsic * extrinsic;

        Self {
            calib,
            extrinsic,
            bounds,
        }
    }
}
