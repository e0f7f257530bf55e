//! Dataset assembly configuration.

use std::path::PathBuf;

use super::SamplingConfig;

/// Configuration for the example assembler.
///
/// Paths point at the output of the external rendering pipeline; the
/// per-map source flags switch between ground-truth renders and maps
/// produced by upstream predictors (which live in separate directories).
#[derive(Debug, Clone)]
pub struct DatasetConfig {
    /// Directory with rendered images, masks, and camera parameters,
    /// one subdirectory per subject.
    pub render_root: PathBuf,

    /// Directory with one OBJ mesh per subject
    /// (`<mesh_root>/<subject>/<subject>.obj`).
    pub mesh_root: PathBuf,

    /// Directory with ground-truth normal maps.
    pub gt_normal_root: PathBuf,
    /// Directory with predicted normal maps.
    pub predicted_normal_root: PathBuf,

    /// Directory with ground-truth depth maps.
    pub gt_depth_root: PathBuf,
    /// Directory with predicted depth maps.
    pub predicted_depth_root: PathBuf,

    /// Directory with ground-truth body-part parse maps.
    pub gt_parse_root: PathBuf,
    /// Directory with predicted body-part parse maps.
    pub predicted_parse_root: PathBuf,

    /// Side length of the high-resolution rasters. Also the reference
    /// resolution the camera scale factor is expressed against.
    pub load_size: u32,

    /// Side length of the downsampled low-resolution rasters.
    pub load_size_global: u32,

    /// Reconstruction grid resolution, used by the ground-truth depth
    /// normalization.
    pub resolution: u32,

    /// Load normal maps from ground truth instead of a predictor.
    pub use_gt_normal_maps: bool,

    /// Load a depth map at all.
    pub use_depth_map: bool,
    /// Load the depth map from ground truth instead of a predictor.
    pub use_gt_depth_map: bool,
    /// Also produce a low-resolution depth map.
    pub depth_in_front: bool,

    /// Load a human parse map at all.
    pub use_human_parse_maps: bool,
    /// Load the parse map from ground truth instead of a predictor.
    pub use_gt_human_parse_maps: bool,

    /// Reserve a held-out validation split of the subject list.
    pub use_validation_set: bool,
    /// Fraction of subjects assigned to validation.
    pub validation_fraction: f32,
    /// Seed for the reproducible validation shuffle.
    pub validation_seed: u64,

    /// Skip point sampling entirely (test-time assembly).
    pub evaluation_mode: bool,

    /// Sampling engine knobs.
    pub sampling: SamplingConfig,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            render_root: PathBuf::from("buffer_fixed_full_mesh"),
            mesh_root: PathBuf::from("meshes"),
            gt_normal_root: PathBuf::from("buffer_normal_maps_of_full_mesh"),
            predicted_normal_root: PathBuf::from("trained_normal_maps"),
            gt_depth_root: PathBuf::from("buffer_depth_maps_of_full_mesh"),
            predicted_depth_root: PathBuf::from("trained_depth_maps"),
            gt_parse_root: PathBuf::from("render_human_parse_results"),
            predicted_parse_root: PathBuf::from("trained_parse_maps"),
            load_size: 1024,
            load_size_global: 512,
            resolution: 512,
            use_gt_normal_maps: true,
            use_depth_map: false,
            use_gt_depth_map: true,
            depth_in_front: true,
            use_human_parse_maps: false,
            use_gt_human_parse_maps: true,
            use_validation_set: false,
            validation_fraction: 0.1,
            validation_seed: 10,
            evaluation_mode: false,
            sampling: SamplingConfig::default(),
        }
    }
}

impl DatasetConfig {
    /// Directory the normal maps are read from, per the source flag.
    pub fn normal_root(&self) -> &PathBuf {
        if self.use_gt_normal_maps {
            &self.gt_normal_root
        } else {
            &self.predicted_normal_root
        }
    }

    /// Directory the depth maps are read from, per the source flag.
    pub fn depth_root(&self) -> &PathBuf {
        if self.use_gt_depth_map {
            &self.gt_depth_root
        } else {
            &self.predicted_depth_root
        }
    }

    /// Directory the parse maps are read from, per the source flag.
    pub fn parse_root(&self) -> &PathBuf {
        if self.use_gt_human_parse_maps {
            &self.gt_parse_root
        } else {
            &self.predicted_parse_root
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.load_size == 0 || self.load_size_global == 0 {
            return Err("raster sizes must be positive".to_string());
        }
        if self.load_size_global > self.load_size {
            return Err("load_size_global cannot exceed load_size".to_string());
        }
        if self.resolution == 0 {
            return Err("resolution must be positive".to_string());
        }
        if !(0.0..1.0).contains(&self.validation_fraction) {
            return Err("validation_fraction must lie in [0, 1)".to_string());
        }
        self.sampling.validate()
    }
}
