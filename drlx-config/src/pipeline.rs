//! Selective loading of the sections the sampling pipeline consumes.

use std::path::Path;

use serde_json::Value;

use crate::codec;
use crate::node::{ConfigNode, Mapping, expect_mapping};
use crate::sections::{ModelConfig, SamplerConfig, TrainConfig};
use crate::ConfigResult;

/// Model, train, and sampler sections read from a single file.
///
/// Unlike [`crate::DrlxConfig`], every section is optional and top-level keys
/// other than these three are ignored, so a full run file can be reused to
/// drive standalone sampling.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineSections {
    /// Pretrained pipeline, when present.
    pub model: Option<ModelConfig>,
    /// Training settings, when present.
    pub train: Option<TrainConfig>,
    /// Sampler settings, when present.
    pub sampler: Option<SamplerConfig>,
}

impl PipelineSections {
    /// Extracts the sections from a raw mapping. Absent or `null` sections
    /// yield `None`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ConfigError::Schema`] when a present section does not
    /// fit its record.
    pub fn from_mapping(raw: &Mapping) -> ConfigResult<Self> {
        Ok(Self {
            model: optional_section(raw)?,
            train: optional_section(raw)?,
            sampler: optional_section(raw)?,
        })
    }

    /// Reads the sections from the YAML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ConfigError::Io`] or [`crate::ConfigError::Parse`] when
    /// the file cannot be read, plus the errors of
    /// [`PipelineSections::from_mapping`].
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        Self::from_mapping(&codec::read_mapping(path.as_ref())?)
    }
}

fn optional_section<T: ConfigNode>(raw: &Mapping) -> ConfigResult<Option<T>> {
    match raw.get(T::SECTION) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => {
            let mapping = expect_mapping(T::SECTION, value.clone())?;
            T::from_mapping(mapping).map(Some)
        }
    }
}
