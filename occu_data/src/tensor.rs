//! Fixed-shape CHW image buffers.
//!
//! Raster assets are held as flat `f32` buffers with an explicit
//! `(channels, height, width)` shape, so every shape constraint is checked
//! at construction instead of surfacing as an index panic mid-pipeline.

use image::DynamicImage;

use crate::error::{DatasetError, Result};

/// A channel-major (CHW) float image.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor {
    data: Vec<f32>,
    channels: usize,
    height: usize,
    width: usize,
}

impl ImageTensor {
    /// Create a zero-filled tensor.
    pub fn zeros(channels: usize, height: usize, width: usize) -> Self {
        Self {
            data: vec![0.0; channels * height * width],
            channels,
            height,
            width,
        }
    }

    /// Create a tensor from raw CHW data, rejecting shape mismatches.
    pub fn from_data(data: Vec<f32>, channels: usize, height: usize, width: usize) -> Result<Self> {
        if data.len() != channels * height * width {
            return Err(DatasetError::ShapeMismatch {
                expected: vec![channels, height, width],
                got: vec![data.len()],
            });
        }
        Ok(Self {
            data,
            channels,
            height,
            width,
        })
    }

    /// Decode an RGB image into a 3xHxW tensor with values in [0, 1].
    pub fn from_rgb(img: &DynamicImage) -> Self {
        let rgb = img.to_rgb32f();
        let (width, height) = (rgb.width() as usize, rgb.height() as usize);

        let mut data = vec![0.0f32; 3 * height * width];
        for (x, y, pixel) in rgb.enumerate_pixels() {
            let idx = y as usize * width + x as usize;
            data[idx] = pixel.0[0];
            data[height * width + idx] = pixel.0[1];
            data[2 * height * width + idx] = pixel.0[2];
        }

        Self {
            data,
            channels: 3,
            height,
            width,
        }
    }

    /// Decode a grayscale image into a 1xHxW tensor with values in [0, 1].
    pub fn from_luma(img: &DynamicImage) -> Self {
        let luma = img.to_luma32f();
        let (width, height) = (luma.width() as usize, luma.height() as usize);

        let mut data = vec![0.0f32; height * width];
        for (x, y, pixel) in luma.enumerate_pixels() {
            data[y as usize * width + x as usize] = pixel.0[0];
        }

        Self {
            data,
            channels: 1,
            height,
            width,
        }
    }

    /// Tensor shape as (channels, height, width).
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.channels, self.height, self.width)
    }

    /// Number of channels.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Image height.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Image width.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Flat CHW data.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Value at (channel, y, x).
    #[inline]
    pub fn get(&self, c: usize, y: usize, x: usize) -> f32 {
        self.data[(c * self.height + y) * self.width + x]
    }

    /// Set the value at (channel, y, x).
    #[inline]
    pub fn set(&mut self, c: usize, y: usize, x: usize, value: f32) {
        self.data[(c * self.height + y) * self.width + x] = value;
    }

    /// Map [0, 1] values into [-1, 1].
    pub fn normalize_signed(&mut self) {
        for v in &mut self.data {
            *v = (*v - 0.5) / 0.5;
        }
    }

    /// Multiply every channel by a single-channel mask of the same
    /// spatial size.
    pub fn apply_mask(&mut self, mask: &ImageTensor) -> Result<()> {
        if mask.channels != 1 || mask.height != self.height || mask.width != self.width {
            return Err(DatasetError::ShapeMismatch {
                expected: vec![1, self.height, self.width],
                got: vec![mask.channels, mask.height, mask.width],
            });
        }

        let plane = self.height * self.width;
        for c in 0..self.channels {
            for i in 0..plane {
                self.data[c * plane + i] *= mask.data[i];
            }
        }
        Ok(())
    }

    /// Nearest-neighbor resample to a new spatial size.
    pub fn resized(&self, height: usize, width: usize) -> Self {
        let mut out = Self::zeros(self.channels, height, width);

        for y in 0..height {
            let src_y = (y * self.height) / height;
            for x in 0..width {
                let src_x = (x * self.width) / width;
                for c in 0..self.channels {
                    out.set(c, y, x, self.get(c, src_y, src_x));
                }
            }
        }
        out
    }

    /// Mirror the image horizontally.
    pub fn flipped_horizontal(&self) -> Self {
        let mut out = Self::zeros(self.channels, self.height, self.width);
        for c in 0..self.channels {
            for y in 0..self.height {
                for x in 0..self.width {
                    out.set(c, y, x, self.get(c, y, self.width - 1 - x));
                }
            }
        }
        out
    }

    /// Expand a single-channel label map into one binary channel per
    /// entry of `levels`, matching values within `tolerance`.
    pub fn one_hot(&self, levels: &[f32], tolerance: f32) -> Result<Self> {
        if self.channels != 1 {
            return Err(DatasetError::ShapeMismatch {
                expected: vec![1, self.height, self.width],
                got: vec![self.channels, self.height, self.width],
            });
        }

        let plane = self.height * self.width;
        let mut data = vec![0.0f32; levels.len() * plane];
        for (k, &level) in levels.iter().enumerate() {
            for i in 0..plane {
                if (self.data[i] - level).abs() <= tolerance {
                    data[k * plane + i] = 1.0;
                }
            }
        }

        Self::from_data(data, levels.len(), self.height, self.width)
    }

    /// Normalize a raw ground-truth depth render in place.
    ///
    /// Raw values are camera distances with `camera_distance` at the
    /// subject center and anything above `invalid_threshold` marking
    /// background. The result is in [0, 2] with the center plane at 1.0
    /// and invalid pixels at 0.
    pub fn normalize_gt_depth(
        &mut self,
        b_range: f32,
        resolution: u32,
        camera_distance: f32,
        invalid_threshold: f32,
    ) {
        let cube_size = b_range / resolution as f32;
        let half_res = resolution as f32 / 2.0;

        for v in &mut self.data {
            if *v > invalid_threshold {
                *v = 0.0;
            } else {
                *v = (*v - camera_distance) / cube_size / half_res + 1.0;
            }
        }
    }
}
