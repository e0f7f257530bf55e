//! Training example assembly.
//!
//! One example pairs a subject's rendered view (image, mask, auxiliary
//! maps, calibration) with a labeled query-point cloud sampled from the
//! subject's mesh. The assembler scans the render tree once to enumerate
//! (subject, view) items and builds examples on demand.

use std::path::{Path, PathBuf};

use glam::{Mat4, Vec3};
use image::DynamicImage;
use rand::Rng;

use crate::calib::{Calibration, ViewParams};
use crate::config::DatasetConfig;
use crate::error::{DatasetError, Result};
use crate::sampling::{generate_samples, SampleSet};
use crate::split::split_subjects;
use crate::store::MeshStore;
use crate::tensor::ImageTensor;

/// Camera distance baked into the ground-truth depth renders.
const GT_DEPTH_CAMERA_DISTANCE: f32 = 10.0;

/// Ground-truth depth values above this mark background pixels.
const GT_DEPTH_INVALID: f32 = 100.0;

/// Gray levels encoding body parts in ground-truth parse maps. Background
/// gets no channel of its own.
const GT_PARSE_LEVELS: [f32; 6] = [0.5, 0.6, 0.7, 0.8, 0.9, 1.0];

/// Class indices encoding body parts in predicted parse maps.
const PREDICTED_PARSE_LEVELS: [f32; 7] = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0];

/// Which side of the validation split an assembler serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    /// Training subjects.
    Train,
    /// Held-out validation subjects.
    Validation,
}

/// A fully-assembled supervised example for one (subject, view) pair.
#[derive(Debug, Clone)]
pub struct TrainExample {
    /// Subject identifier.
    pub name: String,
    /// View yaw angle in degrees.
    pub yaw: u32,
    /// Source path of the rendered image.
    pub render_path: PathBuf,

    /// Masked RGB render at full resolution, values in [-1, 1].
    pub render: ImageTensor,
    /// Masked RGB render downsampled for the coarse branch.
    pub render_low_res: ImageTensor,
    /// Binary foreground mask at full resolution.
    pub mask: ImageTensor,
    /// Binary foreground mask at coarse resolution.
    pub mask_low_res: ImageTensor,

    /// Full calibration matrix (world to normalized image space).
    pub calib: Mat4,
    /// World-to-camera extrinsic.
    pub extrinsic: Mat4,

    /// Labeled query points. Empty in evaluation mode.
    pub samples: SampleSet,
    /// Minimum corner of the sampling volume.
    pub b_min: Vec3,
    /// Maximum corner of the sampling volume.
    pub b_max: Vec3,

    /// Masked front normal map at full resolution.
    pub normal_front: ImageTensor,
    /// Masked back normal map at full resolution.
    pub normal_back: ImageTensor,
    /// Front normal map at coarse resolution.
    pub normal_front_low_res: ImageTensor,
    /// Back normal map at coarse resolution.
    pub normal_back_low_res: ImageTensor,

    /// Normalized masked depth map, when depth maps are enabled.
    pub depth_map: Option<ImageTensor>,
    /// Coarse-resolution depth map, when enabled.
    pub depth_map_low_res: Option<ImageTensor>,

    /// One-hot body-part parse map at coarse resolution, when parse maps
    /// are enabled.
    pub human_parse_map: Option<ImageTensor>,
}

/// Enumerates (subject, view) items under the render tree and assembles
/// [`TrainExample`]s for them.
#[derive(Debug)]
pub struct ExampleAssembler {
    config: DatasetConfig,
    items: Vec<(String, u32)>,
}

impl ExampleAssembler {
    /// Scan the render tree and build the item list for one split.
    ///
    /// Subjects are the subdirectories of the render root; each file
    /// matching `rendered_image_###.png` inside a subject directory
    /// contributes one item. When the validation split is disabled the
    /// train side sees every subject and the validation side is empty.
    pub fn new(config: DatasetConfig, split: Split) -> Result<Self> {
        config
            .validate()
            .map_err(|message| DatasetError::InvalidConfig { message })?;

        let all_subjects = scan_subjects(&config.render_root)?;
        let subjects = if config.use_validation_set {
            let (train, val) = split_subjects(
                &all_subjects,
                config.validation_fraction,
                config.validation_seed,
            );
            match split {
                Split::Train => train,
                Split::Validation => val,
            }
        } else {
            match split {
                Split::Train => all_subjects,
                Split::Validation => Vec::new(),
            }
        };

        let mut items = Vec::new();
        for subject in &subjects {
            let views = scan_views(&config.render_root.join(subject))?;
            if views.is_empty() {
                log::warn!("subject {} has no rendered views, skipping", subject);
            }
            for yaw in views {
                items.push((subject.clone(), yaw));
            }
        }
        log::info!(
            "assembler ready: {} subjects, {} items",
            subjects.len(),
            items.len()
        );

        Ok(Self { config, items })
    }

    /// Number of (subject, view) items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if no items were found.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Subject names of this split, deduplicated and sorted.
    pub fn subjects(&self) -> Vec<String> {
        let mut subjects: Vec<String> = self.items.iter().map(|(s, _)| s.clone()).collect();
        subjects.sort();
        subjects.dedup();
        subjects
    }

    /// The (subject, yaw) pair at an index.
    pub fn item(&self, index: usize) -> Option<(&str, u32)> {
        self.items.get(index).map(|(s, y)| (s.as_str(), *y))
    }

    /// Assemble the example at `index`.
    ///
    /// `store` must hold the mesh for every subject of this split unless
    /// evaluation mode is on. Sampling draws from `rng`, so a seeded
    /// generator reproduces the exact point cloud.
    pub fn assemble<R: Rng>(
        &self,
        index: usize,
        store: &MeshStore,
        rng: &mut R,
    ) -> Result<TrainExample> {
        let (subject, yaw) = self.items.get(index).cloned().ok_or_else(|| {
            DatasetError::InvalidConfig {
                message: format!("example index {} out of range ({})", index, self.items.len()),
            }
        })?;
        let config = &self.config;
        let subject_dir = config.render_root.join(&subject);

        // Camera parameters and derived calibration.
        let params_path = subject_dir.join(format!("rendered_params_{:03}.json", yaw));
        let params = ViewParams::load(&params_path).map_err(|err| {
            DatasetError::input(&subject, yaw, &params_path, err.to_string())
        })?;
        let calibration = Calibration::build(&params, config.load_size);

        // Render and mask.
        let render_path = subject_dir.join(format!("rendered_image_{:03}.png", yaw));
        let mask_path = subject_dir.join(format!("rendered_mask_{:03}.png", yaw));
        let mask = binary_mask(&open_image(&subject, yaw, &mask_path)?);
        let mut render = ImageTensor::from_rgb(&open_image(&subject, yaw, &render_path)?);
        render.normalize_signed();
        render.apply_mask(&mask)?;

        let low = config.load_size_global as usize;
        let render_low_res = render.resized(low, low);
        let mask_low_res = mask.resized(low, low);

        // Front/back normal maps, masked like the render.
        let normal_dir = config.normal_root().join(&subject);
        let front_path = normal_dir.join(format!("rendered_nmlF_{:03}.exr", yaw));
        let back_path = normal_dir.join(format!("rendered_nmlB_{:03}.exr", yaw));
        let mut normal_front = ImageTensor::from_rgb(&open_image(&subject, yaw, &front_path)?);
        let mut normal_back = ImageTensor::from_rgb(&open_image(&subject, yaw, &back_path)?);
        // Ground-truth back renders face away from the camera; mirror them
        // into the front view's pixel frame.
        if config.use_gt_normal_maps {
            normal_back = normal_back.flipped_horizontal();
        }
        normal_front.apply_mask(&mask)?;
        normal_back.apply_mask(&mask)?;
        let normal_front_low_res = normal_front.resized(low, low);
        let normal_back_low_res = normal_back.resized(low, low);

        // Optional depth map.
        let (depth_map, depth_map_low_res) = if config.use_depth_map {
            let depth_path = config
                .depth_root()
                .join(&subject)
                .join(format!("rendered_depthmap_{:03}.exr", yaw));
            let mut depth = ImageTensor::from_luma(&open_image(&subject, yaw, &depth_path)?);
            if config.use_gt_depth_map {
                let b_range = config.load_size as f32 / params.scale_factor;
                depth.normalize_gt_depth(
                    b_range,
                    config.resolution,
                    GT_DEPTH_CAMERA_DISTANCE,
                    GT_DEPTH_INVALID,
                );
            }
            depth.apply_mask(&mask)?;
            let depth_low = if config.depth_in_front {
                Some(depth.resized(low, low))
            } else {
                None
            };
            (Some(depth), depth_low)
        } else {
            (None, None)
        };

        // Optional body-part parse map, expanded to one channel per part.
        // The mask applies before expansion, so masked background matches
        // the zero level of the predicted class list and no GT level.
        let human_parse_map = if config.use_human_parse_maps {
            let parse_path = config
                .parse_root()
                .join(&subject)
                .join(format!("rendered_parse_{:03}.png", yaw));
            let mut parse = ImageTensor::from_luma(&open_image(&subject, yaw, &parse_path)?);
            parse.apply_mask(&mask)?;
            let one_hot = if config.use_gt_human_parse_maps {
                parse.one_hot(&GT_PARSE_LEVELS, 0.01)?
            } else {
                parse.one_hot(&PREDICTED_PARSE_LEVELS, 0.1)?
            };
            Some(one_hot.resized(low, low))
        } else {
            None
        };

        // Query points, unless this is test-time assembly.
        let samples = if config.evaluation_mode {
            SampleSet::empty()
        } else {
            let mesh = store.get(&subject).ok_or_else(|| {
                DatasetError::SamplingFailure {
                    subject: subject.clone(),
                    reason: "mesh not present in store".to_string(),
                }
            })?;
            generate_samples(
                &subject,
                mesh,
                &calibration.bounds,
                Some(params.rotation_matrix()),
                &config.sampling,
                rng,
            )?
        };

        Ok(TrainExample {
            name: subject,
            yaw,
            render_path,
            render,
            render_low_res,
            mask,
            mask_low_res,
            calib: calibration.calib,
            extrinsic: calibration.extrinsic,
            samples,
            b_min: calibration.bounds.min,
            b_max: calibration.bounds.max,
            normal_front,
            normal_back,
            normal_front_low_res,
            normal_back_low_res,
            depth_map,
            depth_map_low_res,
            human_parse_map,
        })
    }
}

fn open_image(subject: &str, view: u32, path: &Path) -> Result<DynamicImage> {
    image::open(path)
        .map_err(|err| DatasetError::input(subject, view, path, err.to_string()))
}

/// Decode a mask image and snap it to {0, 1}.
fn binary_mask(img: &DynamicImage) -> ImageTensor {
    let mut mask = ImageTensor::from_luma(img);
    for y in 0..mask.height() {
        for x in 0..mask.width() {
            let v = if mask.get(0, y, x) > 0.5 { 1.0 } else { 0.0 };
            mask.set(0, y, x, v);
        }
    }
    mask
}

/// Subject names are the subdirectories of the render root, sorted.
fn scan_subjects(render_root: &Path) -> Result<Vec<String>> {
    let entries = std::fs::read_dir(render_root).map_err(|err| DatasetError::InvalidConfig {
        message: format!("cannot read render root {:?}: {}", render_root, err),
    })?;

    let mut subjects = Vec::new();
    for entry in entries {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            if let Some(name) = entry.file_name().to_str() {
                subjects.push(name.to_string());
            }
        }
    }
    subjects.sort();
    Ok(subjects)
}

/// Yaw angles present in a subject directory, from `rendered_image_###.png`
/// filenames, sorted.
fn scan_views(subject_dir: &Path) -> Result<Vec<u32>> {
    let mut views = Vec::new();
    for entry in std::fs::read_dir(subject_dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let name = match name.to_str() {
            Some(n) => n,
            None => continue,
        };
        if let Some(stem) = name
            .strip_prefix("rendered_image_")
            .and_then(|rest| rest.strip_suffix(".png"))
        {
            if let Ok(yaw) = stem.parse::<u32>() {
                views.push(yaw);
            }
        }
    }
    views.sort_unstable();
    Ok(views)
}
