//! Configuration types.

mod dataset;
mod sampling;

pub use dataset::DatasetConfig;
pub use sampling::{SamplingConfig, SamplingStrategy};
