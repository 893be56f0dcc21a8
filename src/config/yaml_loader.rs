//! YAML file loading with `{placeholder}` substitution.
use std::collections::BTreeMap;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde_yaml::{Mapping, Value};

use crate::error::ConfigError;

/// Read a YAML file into an untyped [`Value`].
///
/// A missing file yields `Ok(None)`; an empty file yields `Ok(Some(Null))`.
///
/// # Errors
///
/// Returns [`ConfigError::Read`] or [`ConfigError::Parse`].
pub fn read_value(path: &Path) -> Result<Option<Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_value(&content, path).map(Some)
}

/// Parse YAML text, attributing errors to `path`.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] if the text is not valid YAML.
pub fn parse_value(content: &str, path: &Path) -> Result<Value, ConfigError> {
    serde_yaml::from_str(content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Deserialize a [`Value`] into `T`, treating `null` (empty document) as
/// `T::default()`.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] if the value does not match the schema.
pub fn from_value<T: DeserializeOwned + Default>(value: Value, path: &Path) -> Result<T, ConfigError> {
    if value.is_null() {
        return Ok(T::default());
    }
    serde_yaml::from_value(value).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Serialize `value` and write it to `path`.
///
/// # Errors
///
/// Returns [`ConfigError::Write`] on I/O failure, or [`ConfigError::Invalid`]
/// if serialization fails.
pub fn write_value(path: &Path, value: &Value) -> Result<(), ConfigError> {
    let text = serde_yaml::to_string(value).map_err(|e| ConfigError::Invalid(e.to_string()))?;
    std::fs::write(path, text).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Render a scalar as the text that would be substituted for it.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Build the replacement table: `local_user` plus every scalar under `vars`.
///
/// Entries in `vars` override `local_user`.
#[must_use]
pub fn replacements(root: &Value, local_user: &str) -> BTreeMap<String, String> {
    let mut table = BTreeMap::new();
    table.insert("local_user".to_string(), local_user.to_string());
    if let Some(Value::Mapping(vars)) = root.get("vars") {
        for (k, v) in vars {
            if let (Some(key), Some(text)) = (k.as_str(), scalar_text(v)) {
                table.insert(key.to_string(), text);
            }
        }
    }
    table
}

/// Replace every known `{key}` in `text`. Unknown placeholders stay verbatim.
#[must_use]
pub fn substitute_str(text: &str, table: &BTreeMap<String, String>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(open) = rest.find('{') {
        let (before, after) = rest.split_at(open);
        out.push_str(before);
        let replaced = after.find('}').and_then(|close| {
            let key = after.get(1..close)?;
            table.get(key).map(|v| (v, close))
        });
        match replaced {
            Some((value, close)) => {
                out.push_str(value);
                rest = after.get(close + 1..).unwrap_or_default();
            }
            None => {
                out.push('{');
                rest = after.get(1..).unwrap_or_default();
            }
        }
    }
    out.push_str(rest);
    out
}

/// Substitute placeholders in every string inside `value`, recursively.
///
/// Scalar `vars` entries are normalised to strings so they deserialize into
/// the string-typed table.
pub fn substitute(value: &mut Value, table: &BTreeMap<String, String>) {
    match value {
        Value::String(s) => *s = substitute_str(s, table),
        Value::Sequence(items) => {
            for item in items {
                substitute(item, table);
            }
        }
        Value::Mapping(map) => substitute_mapping(map, table),
        Value::Tagged(tagged) => substitute(&mut tagged.value, table),
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}

fn substitute_mapping(map: &mut Mapping, table: &BTreeMap<String, String>) {
    for (key, v) in map.iter_mut() {
        if key.as_str() == Some("vars")
            && let Value::Mapping(vars) = v
        {
            for var in vars.values_mut() {
                if let Some(text) = scalar_text(var) {
                    *var = Value::String(substitute_str(&text, table));
                }
            }
            continue;
        }
        substitute(v, table);
    }
}
