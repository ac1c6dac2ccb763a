//! Fixed-schema leaf records of a run configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::node::{ConfigNode, Mapping};
use crate::{ConfigError, ConfigResult};

/// Pretrained diffusion pipeline to fine-tune.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelConfig {
    /// Local path or hub identifier of the pretrained pipeline.
    pub model_path: String,
    /// Architecture family of the model (e.g. `"LDMUNet"`).
    pub model_arch_type: String,
    /// Parameter-efficient fine-tuning settings, for example
    /// `{"peft_type": "LORA", "r": 8, "lora_alpha": 32}`.
    #[serde(default)]
    pub peft_config: Mapping,
}

impl ConfigNode for ModelConfig {
    const SECTION: &'static str = "model";
}

/// Optimizer selection and its constructor arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OptimizerConfig {
    /// Optimizer name (e.g. `"adamw"`).
    pub name: String,
    /// Keyword arguments such as `lr`, `betas`, `eps`, `weight_decay`.
    #[serde(default)]
    pub kwargs: Mapping,
}

impl ConfigNode for OptimizerConfig {
    const SECTION: &'static str = "optimizer";
}

/// Learning-rate scheduler selection and its constructor arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchedulerConfig {
    /// Scheduler name (e.g. `"cosine_annealing"`).
    pub name: String,
    /// Keyword arguments such as `warmup_steps` or `T_max`.
    #[serde(default)]
    pub kwargs: Mapping,
}

impl ConfigNode for SchedulerConfig {
    const SECTION: &'static str = "scheduler";
}

/// Outer training loop settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrainConfig {
    /// Batch size per optimisation step.
    pub batch_size: usize,
    /// Number of epochs to train for.
    pub num_epochs: usize,
    /// Samples generated per epoch.
    pub num_samples_per_epoch: usize,
    /// Maximum gradient norm.
    pub grad_clip: f64,
    /// Epochs between checkpoints.
    pub checkpoint_interval: usize,
    /// Directory checkpoints are written to.
    pub checkpoint_path: PathBuf,
    /// Random seed.
    pub seed: u64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            batch_size: 4,
            num_epochs: 50,
            num_samples_per_epoch: 128,
            grad_clip: 1.0,
            checkpoint_interval: 10,
            checkpoint_path: PathBuf::from("checkpoints"),
            seed: 0,
        }
    }
}

impl ConfigNode for TrainConfig {
    const SECTION: &'static str = "train";
}

impl TrainConfig {
    /// Checks that every counter and the gradient clip are positive.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the first offending field.
    pub fn validate(&self) -> ConfigResult<()> {
        for (field, value) in [
            ("train.batch_size", self.batch_size),
            ("train.num_epochs", self.num_epochs),
            ("train.num_samples_per_epoch", self.num_samples_per_epoch),
            ("train.checkpoint_interval", self.checkpoint_interval),
        ] {
            if value == 0 {
                return Err(ConfigError::invalid_value(field, "must be greater than zero"));
            }
        }
        if self.grad_clip.is_nan() || self.grad_clip <= 0.0 {
            return Err(ConfigError::invalid_value(
                "train.grad_clip",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Experiment tracking backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogBackend {
    /// Weights & Biases.
    #[default]
    Wandb,
    /// TensorBoard event files.
    Tensorboard,
}

/// Experiment tracking settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Backend metrics are reported to.
    pub log_with: LogBackend,
    /// Steps between metric reports.
    pub log_every: usize,
    /// Display name of the run.
    pub run_name: Option<String>,
    /// Weights & Biases entity.
    pub wandb_entity: Option<String>,
    /// Weights & Biases project.
    pub wandb_project: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_with: LogBackend::Wandb,
            log_every: 10,
            run_name: None,
            wandb_entity: None,
            wandb_project: None,
        }
    }
}

impl ConfigNode for LoggingConfig {
    const SECTION: &'static str = "logging";
}

/// Reward model scoring generated samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RewardModelConfig {
    /// Reward model name (e.g. `"aesthetic"`).
    pub name: String,
    /// Keyword arguments for the reward model.
    #[serde(default)]
    pub kwargs: Mapping,
    /// Local path or hub identifier of the reward model weights.
    #[serde(default)]
    pub model_path: Option<String>,
}

impl ConfigNode for RewardModelConfig {
    const SECTION: &'static str = "reward_model";
}

/// Per-prompt reward normalisation buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PerPromptStatTrackerConfig {
    /// Samples kept per prompt.
    pub buffer_size: usize,
    /// Samples required before per-prompt statistics are used.
    pub min_count: usize,
}

impl Default for PerPromptStatTrackerConfig {
    fn default() -> Self {
        Self {
            buffer_size: 32,
            min_count: 16,
        }
    }
}

impl ConfigNode for PerPromptStatTrackerConfig {
    const SECTION: &'static str = "per_prompt_stat_tracker";
}

impl PerPromptStatTrackerConfig {
    /// Checks that the buffer can ever reach `min_count`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] when the buffer is empty or smaller
    /// than `min_count`.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.buffer_size == 0 {
            return Err(ConfigError::invalid_value(
                "per_prompt_stat_tracker.buffer_size",
                "must be greater than zero",
            ));
        }
        if self.min_count > self.buffer_size {
            return Err(ConfigError::invalid_value(
                "per_prompt_stat_tracker.min_count",
                format!("cannot exceed buffer_size ({})", self.buffer_size),
            ));
        }
        Ok(())
    }
}

/// Quantity the denoiser network is trained to predict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictionMode {
    /// Clean sample.
    X,
    /// Velocity.
    #[default]
    V,
    /// Noise.
    Eps,
}

/// Sampling loop settings consumed by the denoiser wrapper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SamplerConfig {
    /// Prediction target of the denoiser.
    pub mode: PredictionMode,
    /// Classifier-free guidance scale.
    pub guidance_scale: f64,
    /// Estimated standard deviation of the data.
    pub sigma_data: f64,
    /// Denoising steps per sample.
    pub num_inference_steps: usize,
    /// DDIM eta.
    pub eta: f64,
    /// Device the sampler runs on.
    pub device: String,
    /// Convert latents to `uint8` images after sampling.
    pub postprocess: bool,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            mode: PredictionMode::V,
            guidance_scale: 5.0,
            sigma_data: 0.5,
            num_inference_steps: 50,
            eta: 1.0,
            device: "cuda".to_owned(),
            postprocess: false,
        }
    }
}

impl ConfigNode for SamplerConfig {
    const SECTION: &'static str = "sampler";
}

impl SamplerConfig {
    /// Checks the step count and eta.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the first offending field.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.num_inference_steps == 0 {
            return Err(ConfigError::invalid_value(
                "sampler.num_inference_steps",
                "must be greater than zero",
            ));
        }
        if self.eta.is_nan() || self.eta < 0.0 {
            return Err(ConfigError::invalid_value(
                "sampler.eta",
                "must be non-negative",
            ));
        }
        Ok(())
    }
}
