//! `audienceJarPath` resolution for identity configs.
//!
//! An identity config may pin the audience jar by branch and version. Both
//! keys are replaced by the jar's full URI; `latest` is looked up through the
//! branch's `_CURRENT` pointer in the object store.

use crate::error::{ConfgenError, Result};
use crate::runtime::ObjectStore;
use crate::values;

use serde_yaml::{Mapping, Value};
use tracing::{debug, info};

pub const BRANCH_KEY: &str = "audienceJarBranch";
pub const VERSION_KEY: &str = "audienceJarVersion";
pub const PATH_KEY: &str = "audienceJarPath";

const MASTER: &str = "master";
const LATEST: &str = "latest";
const CURRENT_FILE: &str = "_CURRENT";
const JAR_FILE: &str = "audience.jar";

/// Replace branch/version with `audienceJarPath`.
///
/// Returns `false` and leaves `identity` untouched when neither key is set.
pub fn inject_jar_path(identity: &mut Mapping, jar_root: &str, store: &dyn ObjectStore) -> Result<bool> {
    let branch = identity.get(BRANCH_KEY).map(|v| scalar(BRANCH_KEY, v)).transpose()?;
    let version = identity.get(VERSION_KEY).map(|v| scalar(VERSION_KEY, v)).transpose()?;

    let (branch, version) = match (branch, version) {
        (None, None) => return Ok(false),
        (Some(branch), Some(version)) => (branch, version),
        (None, Some(_)) => return Err(missing(BRANCH_KEY, VERSION_KEY)),
        (Some(_), None) => return Err(missing(VERSION_KEY, BRANCH_KEY)),
    };

    let version = if version.eq_ignore_ascii_case(LATEST) {
        let uri = current_uri(jar_root, &branch);
        let text = store.read_key(&uri)?;
        let resolved = text.lines().next().map(str::trim).unwrap_or_default();
        if resolved.is_empty() {
            return Err(ConfgenError::RuntimeResolution(format!(
                "no version found in {}",
                uri
            )));
        }
        debug!(%branch, version = resolved, "resolved latest audience jar");
        resolved.to_string()
    } else {
        version
    };

    let path = jar_uri(jar_root, &branch, &version);
    values::remove_key(identity, BRANCH_KEY);
    values::remove_key(identity, VERSION_KEY);
    identity.insert(PATH_KEY.into(), path.clone().into());
    info!(%path, "injected audience jar path");
    Ok(true)
}

/// Pointer file holding the newest version of `branch`.
pub fn current_uri(jar_root: &str, branch: &str) -> String {
    let root = jar_root.trim_end_matches('/');
    if branch == MASTER {
        format!("{}/prod/{}", root, CURRENT_FILE)
    } else {
        format!("{}/mergerequests/{}/{}", root, branch, CURRENT_FILE)
    }
}

pub fn jar_uri(jar_root: &str, branch: &str, version: &str) -> String {
    let root = jar_root.trim_end_matches('/');
    if branch == MASTER {
        format!("{}/snapshots/{}/{}/{}", root, MASTER, version, JAR_FILE)
    } else {
        format!("{}/mergerequests/{}/{}/{}", root, branch, version, JAR_FILE)
    }
}

fn scalar(key: &str, value: &Value) -> Result<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    };
    if text.is_empty() {
        return Err(ConfgenError::RuntimeResolution(format!(
            "{} must be a non-empty scalar",
            key
        )));
    }
    Ok(text)
}

fn missing(key: &str, because: &str) -> ConfgenError {
    ConfgenError::RuntimeResolution(format!("{} is required when {} is set", key, because))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::LocalObjectStore;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    const ROOT: &str = "s3://ml-platform/libs/audience/jars";

    fn identity(text: &str) -> Mapping {
        serde_yaml::from_str(text).unwrap()
    }

    fn keys(map: &Mapping) -> Vec<&str> {
        map.keys().filter_map(Value::as_str).collect()
    }

    #[test]
    fn pinned_version_builds_path_without_store_access() {
        let temp = TempDir::new().unwrap();
        let store = LocalObjectStore::new(temp.path());

        let mut map = identity("audienceJarBranch: master\naudienceJarVersion: 1.2.3\nmodel: m\n");
        assert!(inject_jar_path(&mut map, ROOT, &store).unwrap());
        assert_eq!(keys(&map), vec!["model", PATH_KEY]);
        assert_eq!(
            map.get(PATH_KEY),
            Some(&Value::from(
                "s3://ml-platform/libs/audience/jars/snapshots/master/1.2.3/audience.jar"
            ))
        );
    }

    #[test]
    fn latest_is_read_from_the_branch_pointer() {
        let temp = TempDir::new().unwrap();
        let store = LocalObjectStore::new(temp.path());
        store
            .upload(&current_uri(ROOT, "feature-x"), b"20240301-abc\nolder\n")
            .unwrap();

        let mut map = identity("audienceJarBranch: feature-x\naudienceJarVersion: LATEST\n");
        inject_jar_path(&mut map, ROOT, &store).unwrap();
        assert_eq!(
            map.get(PATH_KEY),
            Some(&Value::from(
                "s3://ml-platform/libs/audience/jars/mergerequests/feature-x/20240301-abc/audience.jar"
            ))
        );
    }

    #[test]
    fn master_latest_uses_prod_pointer() {
        assert_eq!(
            current_uri(&format!("{}/", ROOT), "master"),
            "s3://ml-platform/libs/audience/jars/prod/_CURRENT"
        );
    }

    #[test]
    fn empty_pointer_is_an_error() {
        let temp = TempDir::new().unwrap();
        let store = LocalObjectStore::new(temp.path());
        store.upload(&current_uri(ROOT, "master"), b"\n").unwrap();

        let mut map = identity("audienceJarBranch: master\naudienceJarVersion: latest\n");
        assert!(matches!(
            inject_jar_path(&mut map, ROOT, &store),
            Err(ConfgenError::RuntimeResolution(_))
        ));
    }

    #[test]
    fn one_key_without_the_other_is_rejected() {
        let temp = TempDir::new().unwrap();
        let store = LocalObjectStore::new(temp.path());

        let mut map = identity("audienceJarVersion: 7\n");
        let err = inject_jar_path(&mut map, ROOT, &store).unwrap_err();
        assert!(err.to_string().contains(BRANCH_KEY), "{}", err);

        let mut untouched = identity("model: m\n");
        assert!(!inject_jar_path(&mut untouched, ROOT, &store).unwrap());
        assert_eq!(keys(&untouched), vec!["model"]);
    }
}
