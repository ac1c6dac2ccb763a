//! Structural merge of config mappings and dotted-path override expansion.

use std::collections::BTreeSet;

use serde_json::Value;

use crate::node::Mapping;
use crate::{ConfigError, ConfigResult};

/// Separator between segments of an override path such as `train.seed`.
pub const PATH_DELIMITER: char = '.';

/// Result of merging an update mapping into a base mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    /// Base mapping with the update applied.
    pub merged: Mapping,
    /// Top-level base keys that were also present in the update.
    pub touched: BTreeSet<String>,
    /// Dotted paths of update keys with no counterpart in the base, in update
    /// order. These keys are not merged.
    pub unmatched: Vec<String>,
}

/// Merges `update` into a copy of `base`.
///
/// For every base key also present in the update, a mapping value is merged
/// recursively when the update value is a mapping too; any other value is
/// replaced by the update value. Keys present only in `base` are kept, keys
/// present only in `update` are dropped and reported in
/// [`MergeOutcome::unmatched`]. Neither argument is modified.
#[must_use]
pub fn merge(base: &Mapping, update: &Mapping) -> MergeOutcome {
    let mut merged = base.clone();
    let mut unmatched = Vec::new();
    let touched = merge_level(&mut merged, update, "", &mut unmatched);
    MergeOutcome {
        merged,
        touched,
        unmatched,
    }
}

fn merge_level(
    target: &mut Mapping,
    update: &Mapping,
    prefix: &str,
    unmatched: &mut Vec<String>,
) -> BTreeSet<String> {
    let mut touched = BTreeSet::new();

    for (key, slot) in target.iter_mut() {
        let Some(incoming) = update.get(key) else {
            continue;
        };
        match (slot, incoming) {
            (Value::Object(nested), Value::Object(nested_update)) => {
                merge_level(nested, nested_update, &join(prefix, key), unmatched);
            }
            (slot, incoming) => *slot = incoming.clone(),
        }
        touched.insert(key.clone());
    }

    unmatched.extend(
        update
            .keys()
            .filter(|key| !target.contains_key(*key))
            .map(|key| join(prefix, key)),
    );

    touched
}

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_owned()
    } else {
        format!("{prefix}{PATH_DELIMITER}{key}")
    }
}

/// Expands dotted override keys into a nested update mapping.
///
/// `{"train.seed": 7}` becomes `{"train": {"seed": 7}}`. Mapping values are
/// combined with other overrides that target the same subsection, so
/// `{"train": {"seed": 7}, "train.batch_size": 8}` yields one `train` entry
/// holding both fields. A key without a delimiter stays a top-level entry.
/// When two overrides set the same leaf, the later one wins.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidOverride`] when a path has an empty segment or
/// descends through a value set by another override that is not a mapping.
pub fn unflatten(overrides: &Mapping) -> ConfigResult<Mapping> {
    let mut update = Mapping::new();

    for (key, value) in overrides {
        let segments: Vec<&str> = key.split(PATH_DELIMITER).collect();
        if segments.iter().any(|segment| segment.is_empty()) {
            return Err(ConfigError::InvalidOverride {
                key: key.clone(),
                reason: "path segments cannot be empty".into(),
            });
        }
        let Some((leaf, layers)) = segments.split_last() else {
            continue;
        };

        let mut level = &mut update;
        for layer in layers {
            let slot = level
                .entry((*layer).to_owned())
                .or_insert_with(|| Value::Object(Mapping::new()));
            level = match slot {
                Value::Object(nested) => nested,
                _ => {
                    return Err(ConfigError::InvalidOverride {
                        key: key.clone(),
                        reason: format!("`{layer}` is already set to a non-mapping value"),
                    });
                }
            };
        }

        match (level.get_mut(*leaf), value) {
            (Some(current @ Value::Object(_)), Value::Object(nested)) => {
                combine(current, nested);
            }
            _ => {
                level.insert((*leaf).to_owned(), value.clone());
            }
        }
    }

    Ok(update)
}

fn combine(slot: &mut Value, incoming: &Mapping) {
    let Value::Object(existing) = slot else {
        *slot = Value::Object(incoming.clone());
        return;
    };

    for (name, value) in incoming {
        match (existing.get_mut(name), value) {
            (Some(current @ Value::Object(_)), Value::Object(nested)) => combine(current, nested),
            _ => {
                existing.insert(name.clone(), value.clone());
            }
        }
    }
}
