pub mod allocator;
pub mod components;
pub mod etl;
pub mod sampler;

pub use crate::domain::model::{BatchReport, Record, TransformResult};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
pub use allocator::{distribute_within_bounds, AllocationError, AllocationResult, Share};
pub use components::{Bounds, Component, ComponentSet};
pub use sampler::{CompositionError, CompositionResult, CompositionSampler, SamplerSettings};
