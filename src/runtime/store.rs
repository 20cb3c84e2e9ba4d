//! Object store seam for the runtime step.
//!
//! URIs have the shape `<scheme>://<bucket>/<key>`. The local store mirrors
//! that tree under a directory, `<root>/<bucket>/<key>`, so a sync job or a
//! test can stand in for the real bucket.

use crate::error::{ConfgenError, Result};

use std::fs;
use std::path::{Component, PathBuf};
use tracing::debug;

pub trait ObjectStore {
    /// Full text of the object at `uri`.
    fn read_key(&self, uri: &str) -> Result<String>;

    fn upload(&self, uri: &str, bytes: &[u8]) -> Result<()>;
}

/// Split `<scheme>://<bucket>/<key>` into `(bucket, key)`.
pub fn parse_uri(uri: &str) -> Result<(&str, &str)> {
    let invalid = |reason: &str| {
        ConfgenError::RuntimeResolution(format!("invalid object URI '{}': {}", uri, reason))
    };

    let (scheme, rest) = uri.split_once("://").ok_or_else(|| invalid("missing scheme"))?;
    if scheme.is_empty() {
        return Err(invalid("missing scheme"));
    }
    let (bucket, key) = rest.split_once('/').ok_or_else(|| invalid("missing key"))?;
    if bucket.is_empty() {
        return Err(invalid("missing bucket"));
    }
    if key.is_empty() || key.ends_with('/') {
        return Err(invalid("missing key"));
    }
    if key.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..") {
        return Err(invalid("key has empty or relative segments"));
    }
    Ok((bucket, key))
}

#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn local_path(&self, uri: &str) -> Result<PathBuf> {
        let (bucket, key) = parse_uri(uri)?;
        let path = self.root.join(bucket).join(key);
        let escapes = path
            .strip_prefix(&self.root)
            .map(|rel| rel.components().any(|c| !matches!(c, Component::Normal(_))))
            .unwrap_or(true);
        if escapes {
            return Err(ConfgenError::RuntimeResolution(format!(
                "object URI '{}' escapes the store root",
                uri
            )));
        }
        Ok(path)
    }
}

impl ObjectStore for LocalObjectStore {
    fn read_key(&self, uri: &str) -> Result<String> {
        let path = self.local_path(uri)?;
        debug!(%uri, path = %path.display(), "reading object");
        fs::read_to_string(&path).map_err(|source| ConfgenError::Read { path, source })
    }

    fn upload(&self, uri: &str, bytes: &[u8]) -> Result<()> {
        let path = self.local_path(uri)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfgenError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        debug!(%uri, path = %path.display(), bytes = bytes.len(), "uploading object");
        fs::write(&path, bytes).map_err(|source| ConfgenError::Write { path, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn uri_splits_into_bucket_and_key() {
        assert_eq!(
            parse_uri("s3://ml-platform/libs/audience/jars/prod/_CURRENT").unwrap(),
            ("ml-platform", "libs/audience/jars/prod/_CURRENT")
        );
    }

    #[test]
    fn malformed_uris_are_rejected() {
        for uri in [
            "ml-platform/key",
            "://bucket/key",
            "s3:///key",
            "s3://bucket",
            "s3://bucket/",
            "s3://bucket/a/../../etc",
            "s3://bucket/a//b",
        ] {
            assert!(
                matches!(parse_uri(uri), Err(ConfgenError::RuntimeResolution(_))),
                "{} accepted",
                uri
            );
        }
    }

    #[test]
    fn local_store_round_trips_under_bucket_tree() {
        let temp = TempDir::new().unwrap();
        let store = LocalObjectStore::new(temp.path());

        store.upload("s3://bucket/a/b/file.yml", b"x: 1\n").unwrap();
        assert!(temp.path().join("bucket/a/b/file.yml").is_file());
        assert_eq!(store.read_key("s3://bucket/a/b/file.yml").unwrap(), "x: 1\n");
    }

    #[test]
    fn reading_a_missing_object_fails() {
        let temp = TempDir::new().unwrap();
        let store = LocalObjectStore::new(temp.path());
        assert!(matches!(
            store.read_key("s3://bucket/absent"),
            Err(ConfgenError::Read { .. })
        ));
    }
}
