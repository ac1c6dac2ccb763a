//! Error taxonomy shared by every configuration operation.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the configuration layer.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors surfaced while declaring, loading, merging, or saving run configs.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A section did not match its declared schema.
    #[error("invalid `{section}` section: {reason}")]
    Schema {
        /// Section (or record) that failed to bind.
        section: String,
        /// Human-readable reason, naming the offending field.
        reason: String,
    },

    /// The method name does not resolve to a registered variant.
    #[error("method `{name}` has not been registered")]
    UnknownMethod {
        /// Name as supplied by the caller.
        name: String,
    },

    /// The method registry could not be accessed.
    #[error("method registry unavailable: {reason}")]
    Registration {
        /// Human-readable reason for the failure.
        reason: String,
    },

    /// The config document is not well-formed.
    #[error("malformed config document: {source}")]
    Parse {
        /// Source error from the YAML parser.
        #[from]
        source: serde_yaml::Error,
    },

    /// A mapping could not be rendered as a YAML document.
    #[error("failed to render config as YAML: {source}")]
    Emit {
        /// Source error from the YAML emitter.
        source: serde_yaml::Error,
    },

    /// The config file could not be read or written.
    #[error("i/o error on `{}`: {source}", .path.display())]
    Io {
        /// Path that was being accessed.
        path: PathBuf,
        /// Source [`std::io::Error`].
        source: std::io::Error,
    },

    /// An override key does not exist anywhere in the base config.
    #[error("parameter `{key}` is not present in the config (typo or wrong config)")]
    UnknownOverride {
        /// Dotted path of the offending key.
        key: String,
    },

    /// An override key could not be expanded into a nested update.
    #[error("invalid override `{key}`: {reason}")]
    InvalidOverride {
        /// Key as supplied by the caller.
        key: String,
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// A field holds a value outside its accepted range.
    #[error("invalid value for `{field}`: {reason}")]
    InvalidValue {
        /// Dotted path of the field.
        field: String,
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// A typed record could not be converted back into a mapping.
    #[error("serialization error: {source}")]
    Serialization {
        /// Source [`serde_json::Error`].
        #[from]
        source: serde_json::Error,
    },
}

impl ConfigError {
    /// Builds a schema error for the supplied section.
    #[must_use]
    pub fn schema(section: impl Into<String>, reason: impl ToString) -> Self {
        Self::Schema {
            section: section.into(),
            reason: reason.to_string(),
        }
    }

    /// Builds a range validation error for the supplied field path.
    #[must_use]
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` when the error stems from a rejected `update` override.
    #[must_use]
    pub const fn is_override_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownOverride { .. } | Self::InvalidOverride { .. }
        )
    }
}
