//! YAML reading and writing of config mappings.

use std::fs;
use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::merge::PATH_DELIMITER;
use crate::node::Mapping;
use crate::{ConfigError, ConfigResult};

/// Parses a YAML document whose top level is a mapping.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] when the text is not valid YAML, the top
/// level is not a mapping, or a key is not a string, and
/// [`ConfigError::InvalidValue`] naming the key when a number is `.inf` or
/// `.nan`.
pub fn parse_mapping(text: &str) -> ConfigResult<Mapping> {
    let document: serde_yaml::Value = serde_yaml::from_str(text)?;
    reject_non_finite(&document, "")?;
    Ok(serde_yaml::from_value(document)?)
}

/// Parses a single YAML scalar or flow value, such as a command-line override.
///
/// `8` yields an integer, `true` a boolean, `{r: 8}` a mapping, and bare words
/// a string.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] when the text is not valid YAML and
/// [`ConfigError::InvalidValue`] when it holds a non-finite number.
pub fn parse_value(text: &str) -> ConfigResult<Value> {
    let document: serde_yaml::Value = serde_yaml::from_str(text)?;
    reject_non_finite(&document, "")?;
    Ok(serde_yaml::from_value(document)?)
}

/// Renders a mapping as a YAML document.
///
/// # Errors
///
/// Returns [`ConfigError::Emit`] if the emitter rejects a value.
pub fn render_mapping(mapping: &Mapping) -> ConfigResult<String> {
    serde_yaml::to_string(mapping).map_err(|source| ConfigError::Emit { source })
}

// The in-memory representation has no infinities or NaN; they would
// otherwise turn into `null` silently.
fn reject_non_finite(value: &serde_yaml::Value, path: &str) -> ConfigResult<()> {
    match value {
        serde_yaml::Value::Number(number) if number.is_nan() || number.is_infinite() => {
            let field = if path.is_empty() { "value" } else { path };
            Err(ConfigError::invalid_value(
                field,
                format!("non-finite number `{number}` is not supported"),
            ))
        }
        serde_yaml::Value::Mapping(entries) => {
            for (key, nested) in entries {
                let key = match key {
                    serde_yaml::Value::String(key) => key.clone(),
                    other => format!("{other:?}"),
                };
                reject_non_finite(nested, &child(path, &key))?;
            }
            Ok(())
        }
        serde_yaml::Value::Sequence(items) => {
            for (index, item) in items.iter().enumerate() {
                reject_non_finite(item, &child(path, &index.to_string()))?;
            }
            Ok(())
        }
        serde_yaml::Value::Tagged(tagged) => reject_non_finite(&tagged.value, path),
        _ => Ok(()),
    }
}

fn child(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_owned()
    } else {
        format!("{path}{PATH_DELIMITER}{key}")
    }
}

/// Reads and parses the YAML file at `path`.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] when the file cannot be read and
/// [`ConfigError::Parse`] when its content is malformed.
pub fn read_mapping(path: &Path) -> ConfigResult<Mapping> {
    debug!(path = %path.display(), "reading config file");
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_mapping(&text)
}

/// Writes `mapping` as YAML to `path`, creating parent directories.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] when the file cannot be written and
/// [`ConfigError::Emit`] when the mapping cannot be rendered.
pub fn write_mapping(path: &Path, mapping: &Mapping) -> ConfigResult<()> {
    let text = render_mapping(mapping)?;
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, text).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), "wrote config file");
    Ok(())
}
