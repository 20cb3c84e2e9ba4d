//! Helpers over ordered YAML mappings, the common currency between the
//! override files, the merge layers and the template context.

use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;

/// Remove `key` while keeping the order of the remaining entries.
pub fn remove_key(map: &mut Mapping, key: &str) {
    if map.get(key).is_none() {
        return;
    }
    *map = std::mem::take(map)
        .into_iter()
        .filter(|(k, _)| k.as_str() != Some(key))
        .collect();
}

/// Overlay `top` onto `base`. Existing keys keep their position and take the
/// new value; new keys are appended.
pub fn overlay(base: &mut Mapping, top: &Mapping) {
    for (key, value) in top {
        base.insert(key.clone(), value.clone());
    }
}

pub fn contains(map: &Mapping, key: &str) -> bool {
    map.get(key).is_some()
}

/// Convert a merged mapping into a template context.
///
/// Keys are validated as strings when the layers are loaded; any other key
/// type is skipped here.
pub fn to_context(map: &Mapping) -> BTreeMap<String, minijinja::Value> {
    map.iter()
        .filter_map(|(k, v)| {
            k.as_str()
                .map(|name| (name.to_string(), minijinja::Value::from_serialize(v)))
        })
        .collect()
}

/// Copy of `map` with entries ordered by key.
pub fn sorted(map: &Mapping) -> Mapping {
    let mut entries: Vec<(&Value, &Value)> = map.iter().collect();
    entries.sort_by(|(a, _), (b, _)| a.as_str().cmp(&b.as_str()));
    entries
        .into_iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Name of the first non-string key, for error reporting.
pub fn first_non_string_key(map: &Mapping) -> Option<String> {
    map.keys().find(|k| !k.is_string()).map(|k| {
        serde_yaml::to_string(k)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_else(|_| format!("{:?}", k))
    })
}
