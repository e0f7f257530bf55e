//! # occu_data
//!
//! Supervised training-data preparation for implicit human-body
//! reconstruction.
//!
//! This crate turns a tree of calibrated renders plus per-subject meshes
//! into training examples: masked image tensors, camera matrices, auxiliary
//! normal/depth/parse maps, and a fixed-size cloud of 3D query points with
//! occupancy supervision. It builds on the occu_core geometry kernel for
//! mesh queries.
//!
//! ## Features
//!
//! - **Point sampling**: uniform containment-labeled sampling and
//!   depth-oriented graded sampling, both deterministic from a seed
//! - **Calibration**: per-view JSON camera parameters assembled into
//!   world-to-UV matrices and a cubic sampling volume
//! - **Raster pipeline**: CHW float tensors with masking, resizing,
//!   signed normalization, and one-hot parse expansion
//! - **Mesh store**: OBJ loading with a binary geometry cache
//! - **Splits**: reproducible train/validation subject partitioning
//!
//! ## Quick Start
//!
//! ```ignore
//! use occu_data::{DatasetConfig, ExampleAssembler, MeshStore, Split};
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//!
//! let config = DatasetConfig::default();
//! let assembler = ExampleAssembler::new(config.clone(), Split::Train)?;
//! let store = MeshStore::load(&config.mesh_root, &assembler.subjects(), None)?;
//!
//! let mut rng = StdRng::seed_from_u64(7);
//! let example = assembler.assemble(0, &store, &mut rng)?;
//! assert_eq!(example.samples.len(), config.sampling.num_samples);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod assembler;
pub mod calib;
pub mod config;
pub mod error;
pub mod sampling;
pub mod split;
pub mod store;
pub mod tensor;

// Re-export key types for convenience
pub use assembler::{ExampleAssembler, Split, TrainExample};
pub use calib::{Calibration, ViewParams};
pub use config::{DatasetConfig, SamplingConfig, SamplingStrategy};
pub use error::{DatasetError, Result};
pub use sampling::{generate_samples, SampleSet};
pub use split::split_subjects;
pub use store::MeshStore;
pub use tensor::ImageTensor;

// Re-export from occu_core for convenience
pub use occu_core::{Aabb, TriangleMesh};
