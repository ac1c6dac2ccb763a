//! Top-level run configuration and the loader that builds it.

use std::fmt;
use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::codec;
use crate::merge::{merge, unflatten};
use crate::method::MethodConfig;
use crate::node::{ConfigNode, Mapping, expect_mapping, kind_of};
use crate::registry::MethodRegistry;
use crate::sections::{
    LoggingConfig, ModelConfig, OptimizerConfig, PerPromptStatTrackerConfig, RewardModelConfig,
    SchedulerConfig, TrainConfig,
};
use crate::{ConfigError, ConfigResult};

const MODEL: &str = "model";
const OPTIMIZER: &str = "optimizer";
const SCHEDULER: &str = "scheduler";
const TRAIN: &str = "train";
const LOGGING: &str = "logging";
const REWARD_MODEL: &str = "reward_model";
const METHOD: &str = "method";
const PER_PROMPT_STAT_TRACKER: &str = "per_prompt_stat_tracker";

/// Every top-level section accepted in a run file, in emission order.
pub const SECTIONS: [&str; 8] = [
    METHOD,
    MODEL,
    OPTIMIZER,
    SCHEDULER,
    TRAIN,
    LOGGING,
    REWARD_MODEL,
    PER_PROMPT_STAT_TRACKER,
];

/// Complete configuration of one training run.
#[derive(Debug, Clone, PartialEq)]
pub struct DrlxConfig {
    /// Pretrained pipeline to fine-tune.
    pub model: ModelConfig,
    /// Optimizer selection.
    pub optimizer: OptimizerConfig,
    /// Learning-rate scheduler selection.
    pub scheduler: SchedulerConfig,
    /// Outer training loop settings.
    pub train: TrainConfig,
    /// Experiment tracking settings.
    pub logging: LoggingConfig,
    /// Reward model settings.
    pub reward_model: RewardModelConfig,
    /// RL method hyperparameters.
    pub method: MethodConfig,
    /// Per-prompt reward normalisation, when enabled.
    pub per_prompt_stat_tracker: Option<PerPromptStatTrackerConfig>,
}

impl DrlxConfig {
    /// Builds a config from a raw mapping using the built-in methods.
    ///
    /// # Errors
    ///
    /// See [`ConfigLoader::from_mapping`].
    pub fn from_mapping(raw: Mapping) -> ConfigResult<Self> {
        ConfigLoader::new()?.from_mapping(raw)
    }

    /// Loads a config from a YAML file using the built-in methods.
    ///
    /// # Errors
    ///
    /// See [`ConfigLoader::load`].
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        ConfigLoader::new()?.load(path)
    }

    /// Returns a new config with `overrides` applied, leaving `self` untouched.
    /// Only the built-in methods are resolvable; use [`ConfigLoader::update`]
    /// for configs that rely on registered custom methods.
    ///
    /// # Errors
    ///
    /// See [`ConfigLoader::update`].
    pub fn update(&self, overrides: &Mapping) -> ConfigResult<Self> {
        ConfigLoader::new()?.update(self, overrides)
    }

    /// Converts the config into a mapping with one entry per section.
    /// A disabled stat tracker is emitted as `null`.
    ///
    /// # Errors
    ///
    /// Propagates [`ConfigError::Serialization`] from the sections.
    pub fn to_mapping(&self) -> ConfigResult<Mapping> {
        let mut mapping = Mapping::new();
        mapping.insert(METHOD.into(), Value::Object(self.method.to_mapping()?));
        mapping.insert(MODEL.into(), Value::Object(self.model.to_mapping()?));
        mapping.insert(OPTIMIZER.into(), Value::Object(self.optimizer.to_mapping()?));
        mapping.insert(SCHEDULER.into(), Value::Object(self.scheduler.to_mapping()?));
        mapping.insert(TRAIN.into(), Value::Object(self.train.to_mapping()?));
        mapping.insert(LOGGING.into(), Value::Object(self.logging.to_mapping()?));
        mapping.insert(
            REWARD_MODEL.into(),
            Value::Object(self.reward_model.to_mapping()?),
        );
        let tracker = match &self.per_prompt_stat_tracker {
            Some(tracker) => Value::Object(tracker.to_mapping()?),
            None => Value::Null,
        };
        mapping.insert(PER_PROMPT_STAT_TRACKER.into(), tracker);
        Ok(mapping)
    }

    /// Writes the config to `path` as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the file cannot be written.
    pub fn save(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        codec::write_mapping(path.as_ref(), &self.to_mapping()?)
    }

    /// Checks value ranges across every section.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the first offending field.
    pub fn validate(&self) -> ConfigResult<()> {
        self.train.validate()?;
        if self.logging.log_every == 0 {
            return Err(ConfigError::invalid_value(
                "logging.log_every",
                "must be greater than zero",
            ));
        }
        self.method.validate()?;
        if let Some(tracker) = &self.per_prompt_stat_tracker {
            tracker.validate()?;
        }
        Ok(())
    }
}

impl fmt::Display for DrlxConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mapping = self.to_mapping().map_err(|_| fmt::Error)?;
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        serde::Serialize::serialize(&mapping, &mut serializer).map_err(|_| fmt::Error)?;
        f.write_str(&String::from_utf8_lossy(&buf))
    }
}

/// Base accepted by [`ConfigLoader::update`].
#[derive(Debug, Clone, Copy)]
pub enum UpdateBase<'a> {
    /// An already-built config.
    Config(&'a DrlxConfig),
    /// A raw mapping, such as a freshly parsed file.
    Raw(&'a Mapping),
}

impl<'a> From<&'a DrlxConfig> for UpdateBase<'a> {
    fn from(value: &'a DrlxConfig) -> Self {
        Self::Config(value)
    }
}

impl<'a> From<&'a Mapping> for UpdateBase<'a> {
    fn from(value: &'a Mapping) -> Self {
        Self::Raw(value)
    }
}

/// Builds [`DrlxConfig`] trees against a method registry.
#[derive(Debug)]
pub struct ConfigLoader {
    registry: MethodRegistry,
}

impl ConfigLoader {
    /// Creates a loader holding the built-in methods.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Registration`] if the built-in methods cannot be
    /// registered.
    pub fn new() -> ConfigResult<Self> {
        Ok(Self::with_registry(MethodRegistry::with_builtin_methods()?))
    }

    /// Creates a loader around a caller-supplied registry.
    #[must_use]
    pub fn with_registry(registry: MethodRegistry) -> Self {
        Self { registry }
    }

    /// Returns the registry used to resolve `method.name`.
    #[must_use]
    pub fn registry(&self) -> &MethodRegistry {
        &self.registry
    }

    /// Builds a config from a raw mapping.
    ///
    /// The method name is resolved first, then each section is bound to its
    /// record. `per_prompt_stat_tracker` may be absent or `null`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Schema`] when a mandatory section is missing, a
    /// section does not fit its record, or an unknown top-level key is present,
    /// and [`ConfigError::UnknownMethod`] when `method.name` is not registered.
    pub fn from_mapping(&self, mut raw: Mapping) -> ConfigResult<DrlxConfig> {
        if let Some(unknown) = raw.keys().find(|key| !SECTIONS.contains(&key.as_str())) {
            return Err(ConfigError::schema(
                unknown.as_str(),
                "unknown top-level section",
            ));
        }

        let method = take_section(&mut raw, METHOD)?;
        let name = match method.get("name") {
            Some(Value::String(name)) => name.clone(),
            Some(other) => {
                return Err(ConfigError::schema(
                    METHOD,
                    format!("field `name` must be a string, found {}", kind_of(other)),
                ));
            }
            None => return Err(ConfigError::schema(METHOD, "missing field `name`")),
        };
        let method = self.registry.resolve(&name)?.build(method)?;

        let per_prompt_stat_tracker = match raw.remove(PER_PROMPT_STAT_TRACKER) {
            None | Some(Value::Null) => None,
            Some(value) => Some(PerPromptStatTrackerConfig::from_mapping(expect_mapping(
                PER_PROMPT_STAT_TRACKER,
                value,
            )?)?),
        };

        let config = DrlxConfig {
            model: ModelConfig::from_mapping(take_section(&mut raw, MODEL)?)?,
            optimizer: OptimizerConfig::from_mapping(take_section(&mut raw, OPTIMIZER)?)?,
            scheduler: SchedulerConfig::from_mapping(take_section(&mut raw, SCHEDULER)?)?,
            train: TrainConfig::from_mapping(take_section(&mut raw, TRAIN)?)?,
            logging: LoggingConfig::from_mapping(take_section(&mut raw, LOGGING)?)?,
            reward_model: RewardModelConfig::from_mapping(take_section(&mut raw, REWARD_MODEL)?)?,
            method,
            per_prompt_stat_tracker,
        };
        debug!(method = %name, "built run config");
        Ok(config)
    }

    /// Loads a config from the YAML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the file is unreadable,
    /// [`ConfigError::Parse`] when it is malformed, and any error of
    /// [`ConfigLoader::from_mapping`].
    pub fn load(&self, path: impl AsRef<Path>) -> ConfigResult<DrlxConfig> {
        let path = path.as_ref();
        let raw = codec::read_mapping(path)?;
        let config = self.from_mapping(raw)?;
        debug!(path = %path.display(), method = config.method.name(), "loaded run config");
        Ok(config)
    }

    /// Applies `overrides` to `base` and builds a new config.
    ///
    /// Override keys are either section names holding a nested mapping, or
    /// dotted paths such as `train.batch_size` holding a value. Paths are
    /// expanded before the merge. The base is never modified; on failure the
    /// caller keeps whatever it held before.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownOverride`] naming the first override key
    /// that does not exist in the base, [`ConfigError::InvalidOverride`] for a
    /// malformed path, and any error of [`ConfigLoader::from_mapping`] for the
    /// merged mapping.
    pub fn update<'a>(
        &self,
        base: impl Into<UpdateBase<'a>>,
        overrides: &Mapping,
    ) -> ConfigResult<DrlxConfig> {
        let update = unflatten(overrides)?;
        let base: UpdateBase<'a> = base.into();
        let outcome = match base {
            UpdateBase::Config(config) => merge(&config.to_mapping()?, &update),
            UpdateBase::Raw(raw) => merge(raw, &update),
        };

        if let Some(key) = update.keys().find(|key| !outcome.touched.contains(*key)) {
            return Err(ConfigError::UnknownOverride { key: key.clone() });
        }
        if let Some(path) = outcome.unmatched.into_iter().next() {
            return Err(ConfigError::UnknownOverride { key: path });
        }

        debug!(sections = ?outcome.touched, "applied config overrides");
        self.from_mapping(outcome.merged)
    }
}

fn take_section(raw: &mut Mapping, section: &str) -> ConfigResult<Mapping> {
    let value = raw
        .remove(section)
        .ok_or_else(|| ConfigError::schema(section, "section is missing"))?;
    expect_mapping(section, value)
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    use crate::method::{DdpoConfig, GenericMethodConfig};

    fn mapping(value: Value) -> Mapping {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    fn raw() -> Mapping {
        mapping(json!({
            "model": {"model_path": "CompVis/stable-diffusion-v1-4", "model_arch_type": "LDMUNet"},
            "optimizer": {"name": "adamw", "kwargs": {"lr": 0.0003}},
            "scheduler": {"name": "constant"},
            "train": {"batch_size": 4, "seed": 1},
            "logging": {"run_name": "unit"},
            "reward_model": {"name": "aesthetic"},
            "method": {"name": "ddpo", "clip_ratio": 0.1},
        }))
    }

    #[test]
    fn builds_typed_tree() {
        let config = DrlxConfig::from_mapping(raw()).unwrap();
        assert_eq!(config.model.model_arch_type, "LDMUNet");
        assert_eq!(config.train.seed, 1);
        assert_eq!(config.logging.run_name.as_deref(), Some("unit"));
        assert_eq!(config.method.as_ddpo().map(|ddpo| ddpo.clip_ratio), Some(0.1));
        assert!(config.per_prompt_stat_tracker.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_section_is_a_schema_error() {
        let mut raw = raw();
        raw.remove("train");
        let err = DrlxConfig::from_mapping(raw).expect_err("train is mandatory");
        assert!(matches!(err, ConfigError::Schema { section, .. } if section == "train"));
    }

    #[test]
    fn unknown_section_is_a_schema_error() {
        let mut raw = raw();
        raw.insert("sampler".into(), json!({}));
        let err = DrlxConfig::from_mapping(raw).expect_err("sampler is not a run section");
        assert!(matches!(err, ConfigError::Schema { section, .. } if section == "sampler"));
    }

    #[test]
    fn method_name_must_be_present_and_registered() {
        let mut missing = raw();
        missing.insert("method".into(), json!({"clip_ratio": 0.1}));
        let err = DrlxConfig::from_mapping(missing).expect_err("method name missing");
        assert!(matches!(err, ConfigError::Schema { section, .. } if section == "method"));

        let mut unknown = raw();
        unknown.insert("method".into(), json!({"name": "nonexistent"}));
        let err = DrlxConfig::from_mapping(unknown).expect_err("method not registered");
        assert!(matches!(err, ConfigError::UnknownMethod { name } if name == "nonexistent"));
    }

    #[test]
    fn tracker_may_be_null_or_present() {
        let mut raw = raw();
        raw.insert("per_prompt_stat_tracker".into(), Value::Null);
        assert!(DrlxConfig::from_mapping(raw.clone()).unwrap().per_prompt_stat_tracker.is_none());

        raw.insert("per_prompt_stat_tracker".into(), json!({"buffer_size": 64}));
        let tracker = DrlxConfig::from_mapping(raw)
            .unwrap()
            .per_prompt_stat_tracker
            .expect("tracker configured");
        assert_eq!(tracker.buffer_size, 64);
        assert_eq!(tracker.min_count, 16);
    }

    #[test]
    fn tree_round_trips_through_mapping() {
        let config = DrlxConfig::from_mapping(raw()).unwrap();
        let mapping = config.to_mapping().unwrap();
        assert_eq!(
            mapping.keys().map(String::as_str).collect::<Vec<_>>(),
            SECTIONS
        );
        assert_eq!(DrlxConfig::from_mapping(mapping).unwrap(), config);
    }

    #[test]
    fn dotted_and_nested_overrides_agree() {
        let config = DrlxConfig::from_mapping(raw()).unwrap();
        let dotted = config.update(&mapping(json!({"train.seed": 7}))).unwrap();
        let nested = config.update(&mapping(json!({"train": {"seed": 7}}))).unwrap();
        assert_eq!(dotted, nested);
        assert_eq!(dotted.train.seed, 7);
        assert_eq!(config.train.seed, 1);
    }

    #[test]
    fn unknown_override_is_rejected() {
        let config = DrlxConfig::from_mapping(raw()).unwrap();
        let before = config.clone();

        let err = config
            .update(&mapping(json!({"nonexistent_key": 1})))
            .expect_err("key is not in the config");
        assert!(matches!(&err, ConfigError::UnknownOverride { key } if key == "nonexistent_key"));
        assert!(err.to_string().contains("typo or wrong config"));

        let err = config
            .update(&mapping(json!({"train.bach_size": 8})))
            .expect_err("nested typo");
        assert!(matches!(err, ConfigError::UnknownOverride { key } if key == "train.bach_size"));

        assert_eq!(config, before);
    }

    #[test]
    fn update_accepts_raw_base() {
        let loader = ConfigLoader::new().unwrap();
        let raw = raw();
        let updated = loader
            .update(&raw, &mapping(json!({"method.clip_ratio": 0.3})))
            .unwrap();
        assert_eq!(updated.method.as_ddpo().map(|ddpo| ddpo.clip_ratio), Some(0.3));
        assert_eq!(raw["method"]["clip_ratio"], json!(0.1));
    }

    #[test]
    fn update_can_switch_method_variant() {
        let loader = ConfigLoader::new().unwrap();
        loader
            .registry()
            .register::<GenericMethodConfig>(Some("grpo"))
            .unwrap();

        let mut raw = raw();
        raw.insert("method".into(), json!({"name": "grpo", "group_size": 4}));
        let config = loader.from_mapping(raw).unwrap();
        assert!(matches!(config.method, MethodConfig::Generic(_)));

        let updated = loader
            .update(&config, &mapping(json!({"method.group_size": 16})))
            .unwrap();
        let MethodConfig::Generic(generic) = &updated.method else {
            panic!("expected generic method");
        };
        assert_eq!(generic.params["group_size"], json!(16));
    }

    #[test]
    fn display_renders_indented_mapping() {
        let mut config = DrlxConfig::from_mapping(raw()).unwrap();
        config.method = DdpoConfig::new("ddpo").into();
        let rendered = config.to_string();
        assert!(rendered.starts_with("{\n    \"method\": {"));
        assert!(rendered.contains("\"sample_batch_size\": 32"));
    }
}
