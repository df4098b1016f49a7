pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::storage::LocalStorage;
pub use app::pipelines::coa_pipeline::CoaPipeline;
pub use config::toml_config::CoaConfig;
pub use crate::core::{
    etl::CoaEngine, CompositionError, CompositionResult, CompositionSampler, ComponentSet,
    SamplerSettings,
};
pub use utils::error::{CoaError, Result};
