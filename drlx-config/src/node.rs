//! Mapping-based construction shared by every config record.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{ConfigError, ConfigResult};

/// Insertion-ordered key/value structure used as the untyped representation
/// of a config subsection.
pub type Mapping = serde_json::Map<String, Value>;

/// Capability implemented by every typed config record.
///
/// Records bind each declared field to the mapping entry of the same name.
/// Unknown keys are rejected uniformly through `#[serde(deny_unknown_fields)]`
/// on the implementing types; missing fields fall back to their defaults or
/// fail when the field is mandatory.
///
/// Numbers are canonicalised on binding: an integer written for a float field
/// (`grad_clip: 1`) is emitted as a float (`1.0`) by [`ConfigNode::to_mapping`].
/// Round-trip identity therefore holds for mappings in canonical form, and
/// `to_mapping` output is always a fixed point of `from_mapping`.
pub trait ConfigNode: Serialize + DeserializeOwned {
    /// Section name used when reporting schema errors.
    const SECTION: &'static str;

    /// Builds the record from a mapping of field name to value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Schema`] when a mandatory field is missing, an
    /// unexpected key is present, or a value has the wrong type. Type errors
    /// name the path of the offending field within the section.
    fn from_mapping(mapping: Mapping) -> ConfigResult<Self> {
        serde_path_to_error::deserialize(Value::Object(mapping))
            .map_err(|err| ConfigError::schema(Self::SECTION, describe(&err)))
    }

    /// Converts the record back into a plain mapping, defaults included.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Serialization`] if a field cannot be represented
    /// as a mapping value, or [`ConfigError::Schema`] if the record does not
    /// serialize to a mapping at all.
    fn to_mapping(&self) -> ConfigResult<Mapping> {
        match serde_json::to_value(self)? {
            Value::Object(mapping) => Ok(mapping),
            other => Err(ConfigError::schema(
                Self::SECTION,
                format!("expected a mapping, found {}", kind_of(&other)),
            )),
        }
    }
}

/// Formats a binding error, prefixing the field path when one is known.
fn describe(err: &serde_path_to_error::Error<serde_json::Error>) -> String {
    let path = err.path().to_string();
    if path == "." {
        err.inner().to_string()
    } else {
        format!("field `{path}`: {}", err.inner())
    }
}

/// Takes a section value out of a parent mapping, requiring it to be a mapping.
pub(crate) fn expect_mapping(section: &str, value: Value) -> ConfigResult<Mapping> {
    match value {
        Value::Object(mapping) => Ok(mapping),
        other => Err(ConfigError::schema(
            section,
            format!("expected a mapping, found {}", kind_of(&other)),
        )),
    }
}

pub(crate) fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}
