//! Method-specific hyperparameter records.
//!
//! Each RL method contributes one variant of [`MethodConfig`]. Variants are
//! bound to names through the [`crate::MethodRegistry`], which is consulted with
//! the `name` field of the `method` section.

use serde::{Deserialize, Serialize};

use crate::node::{ConfigNode, Mapping};
use crate::{ConfigError, ConfigResult};

/// A record that can be registered as a method variant.
pub trait MethodVariant: ConfigNode + Into<MethodConfig> {
    /// Type name used to derive the registry key when none is supplied.
    const TYPE_NAME: &'static str;
}

/// Builds a variant from its mapping and lifts it into [`MethodConfig`].
pub(crate) fn build_variant<V: MethodVariant>(mapping: Mapping) -> ConfigResult<MethodConfig> {
    V::from_mapping(mapping).map(Into::into)
}

/// Bare method record carrying only the method name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BaseMethodConfig {
    /// Name of the method.
    pub name: String,
}

impl ConfigNode for BaseMethodConfig {
    const SECTION: &'static str = "method";
}

impl MethodVariant for BaseMethodConfig {
    const TYPE_NAME: &'static str = "MethodConfig";
}

impl From<BaseMethodConfig> for MethodConfig {
    fn from(value: BaseMethodConfig) -> Self {
        Self::Base(value)
    }
}

/// DDPO hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DdpoConfig {
    /// Name of the method.
    pub name: String,
    /// Maximum absolute value of advantages.
    #[serde(default = "default_clip_advantages")]
    pub clip_advantages: f64,
    /// Maximum deviation of the new/old policy ratio from one.
    #[serde(default = "default_clip_ratio")]
    pub clip_ratio: f64,
    /// Policy epochs per batch of samples.
    #[serde(default = "default_num_inner_epochs")]
    pub num_inner_epochs: usize,
    /// Samples drawn per sampling step.
    #[serde(default = "default_sample_batch_size")]
    pub sample_batch_size: usize,
}

fn default_clip_advantages() -> f64 {
    1.0
}

fn default_clip_ratio() -> f64 {
    0.2
}

fn default_num_inner_epochs() -> usize {
    1
}

fn default_sample_batch_size() -> usize {
    32
}

impl DdpoConfig {
    /// Creates a DDPO record with default hyperparameters.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            clip_advantages: default_clip_advantages(),
            clip_ratio: default_clip_ratio(),
            num_inner_epochs: default_num_inner_epochs(),
            sample_batch_size: default_sample_batch_size(),
        }
    }

    /// Checks hyperparameter ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the first offending field.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.clip_advantages.is_nan() || self.clip_advantages <= 0.0 {
            return Err(ConfigError::invalid_value(
                "method.clip_advantages",
                "must be greater than zero",
            ));
        }
        if self.clip_ratio.is_nan() || self.clip_ratio < 0.0 {
            return Err(ConfigError::invalid_value(
                "method.clip_ratio",
                "must be non-negative",
            ));
        }
        if self.num_inner_epochs == 0 {
            return Err(ConfigError::invalid_value(
                "method.num_inner_epochs",
                "must be greater than zero",
            ));
        }
        if self.sample_batch_size == 0 {
            return Err(ConfigError::invalid_value(
                "method.sample_batch_size",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}

impl ConfigNode for DdpoConfig {
    const SECTION: &'static str = "method";
}

impl MethodVariant for DdpoConfig {
    const TYPE_NAME: &'static str = "DDPOConfig";
}

impl From<DdpoConfig> for MethodConfig {
    fn from(value: DdpoConfig) -> Self {
        Self::Ddpo(value)
    }
}

/// Method without a typed record: the name plus any extra parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenericMethodConfig {
    /// Name of the method.
    pub name: String,
    /// Remaining method parameters, kept verbatim.
    #[serde(flatten)]
    pub params: Mapping,
}

impl ConfigNode for GenericMethodConfig {
    const SECTION: &'static str = "method";
}

impl MethodVariant for GenericMethodConfig {
    const TYPE_NAME: &'static str = "GenericMethodConfig";
}

impl From<GenericMethodConfig> for MethodConfig {
    fn from(value: GenericMethodConfig) -> Self {
        Self::Generic(value)
    }
}

/// Polymorphic `method` section.
#[derive(Debug, Clone, PartialEq)]
pub enum MethodConfig {
    /// Name-only record.
    Base(BaseMethodConfig),
    /// DDPO hyperparameters.
    Ddpo(DdpoConfig),
    /// Untyped method parameters.
    Generic(GenericMethodConfig),
}

impl MethodConfig {
    /// Returns the `name` field shared by every variant.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Base(config) => &config.name,
            Self::Ddpo(config) => &config.name,
            Self::Generic(config) => &config.name,
        }
    }

    /// Returns the DDPO record when this is the DDPO variant.
    #[must_use]
    pub fn as_ddpo(&self) -> Option<&DdpoConfig> {
        match self {
            Self::Ddpo(config) => Some(config),
            _ => None,
        }
    }

    /// Converts the active variant into a plain mapping.
    ///
    /// # Errors
    ///
    /// Propagates [`ConfigError::Serialization`] from the variant.
    pub fn to_mapping(&self) -> ConfigResult<Mapping> {
        match self {
            Self::Base(config) => config.to_mapping(),
            Self::Ddpo(config) => config.to_mapping(),
            Self::Generic(config) => config.to_mapping(),
        }
    }

    /// Checks hyperparameter ranges of typed variants.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the first offending field.
    pub fn validate(&self) -> ConfigResult<()> {
        match self {
            Self::Ddpo(config) => config.validate(),
            Self::Base(_) | Self::Generic(_) => Ok(()),
        }
    }
}
