//! Override loading.

use crate::error::{ConfgenError, Result};
use crate::overrides::{OVERRIDE_FILE, WorkItem};
use crate::values;

use serde_yaml::{Mapping, Value};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::warn;

/// A job's override mapping and where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Overrides {
    pub path: PathBuf,
    pub values: Mapping,
}

/// Load the override mapping for `item`.
///
/// A missing file is not an error: the job then renders from template
/// defaults only.
pub fn load(override_root: &Path, item: &WorkItem) -> Result<Overrides> {
    let path = override_root.join(item.job_path()).join(OVERRIDE_FILE);
    let text = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "no override file, using template defaults");
            return Ok(Overrides {
                path,
                values: Mapping::new(),
            });
        }
        Err(source) => return Err(ConfgenError::Read { path, source }),
    };

    let values = parse(&path, &text)?;
    Ok(Overrides { path, values })
}

/// Parse override text into a string-keyed mapping. Empty documents are
/// empty mappings.
pub fn parse(path: &Path, text: &str) -> Result<Mapping> {
    let malformed = |reason: String| ConfgenError::MalformedOverride {
        path: path.to_path_buf(),
        reason,
    };

    let doc: Value = serde_yaml::from_str(text).map_err(|e| malformed(e.to_string()))?;
    let mapping = match doc {
        Value::Null => Mapping::new(),
        Value::Mapping(m) => m,
        other => {
            return Err(malformed(format!(
                "expected a key/value mapping at the top level, found {}",
                kind_of(&other)
            )));
        }
    };

    if let Some(key) = values::first_non_string_key(&mapping) {
        return Err(malformed(format!("key {} is not a string", key)));
    }
    Ok(mapping)
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}
