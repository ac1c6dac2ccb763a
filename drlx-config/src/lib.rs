//! Configuration management for DRLX diffusion RL training runs.
//!
//! A run is described by a YAML file with one section per concern (`model`,
//! `optimizer`, `scheduler`, `train`, `logging`, `reward_model`, `method`, and
//! the optional `per_prompt_stat_tracker`). [`ConfigLoader`] binds the file to a
//! typed [`DrlxConfig`], resolving the polymorphic `method` section through a
//! [`MethodRegistry`], and applies partial overrides such as
//! `{"train.batch_size": 8}` by producing a new tree.
//!
//! ```
//! use drlx_config::{DrlxConfig, Mapping, codec};
//!
//! let raw = codec::parse_mapping(
//!     "model: {model_path: CompVis/stable-diffusion-v1-4, model_arch_type: LDMUNet}\n\
//!      optimizer: {name: adamw}\n\
//!      scheduler: {name: constant}\n\
//!      train: {batch_size: 4}\n\
//!      logging: {}\n\
//!      reward_model: {name: aesthetic}\n\
//!      method: {name: ddpo}\n",
//! )
//! .unwrap();
//! let config = DrlxConfig::from_mapping(raw).unwrap();
//!
//! let mut overrides = Mapping::new();
//! overrides.insert("train.batch_size".into(), 8.into());
//! let updated = config.update(&overrides).unwrap();
//! assert_eq!(updated.train.batch_size, 8);
//! assert_eq!(config.train.batch_size, 4);
//! ```

#![warn(missing_docs, clippy::pedantic)]

pub mod codec;
mod error;
mod merge;
mod method;
mod node;
mod pipeline;
mod registry;
mod root;
mod sections;

/// Error type and result alias shared by every operation.
pub use error::{ConfigError, ConfigResult};
/// Structural merge and dotted-path expansion of override mappings.
pub use merge::{MergeOutcome, PATH_DELIMITER, merge, unflatten};
/// Polymorphic method section and its variants.
pub use method::{BaseMethodConfig, DdpoConfig, GenericMethodConfig, MethodConfig, MethodVariant};
/// Mapping-based construction capability.
pub use node::{ConfigNode, Mapping};
/// Selective loading of the sampling pipeline sections.
pub use pipeline::PipelineSections;
/// Method name registry.
pub use registry::{MethodDescriptor, MethodFactory, MethodRegistry};
/// Run config root and loader.
pub use root::{ConfigLoader, DrlxConfig, SECTIONS, UpdateBase};
/// Leaf section records.
pub use sections::{
    LogBackend, LoggingConfig, ModelConfig, OptimizerConfig, PerPromptStatTrackerConfig,
    PredictionMode, RewardModelConfig, SamplerConfig, SchedulerConfig, TrainConfig,
};
/// JSON value type held by [`Mapping`] entries.
pub use serde_json::Value;
