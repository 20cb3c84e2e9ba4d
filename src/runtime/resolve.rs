//! Runtime config resolution.
//!
//! Takes the generated configs of one environment (and experiment), renders
//! them a second time with the values known only at execution time, writes
//! the result under `<runtime_output>/<env>/[<exp>/]<group>/<job>/<hash>/`
//! and uploads every file below the same relative path.
//!
//! Only jobs the build would still generate are resolved: a config directory
//! whose override file is gone is stale and skipped with a warning.
//!
//! Context layers, lowest priority first: date-format defaults, the job's
//! override mapping, extra command-line parameters, locked reserved keys.
//! `run_date` is a date object on top of that.

use crate::config::Settings;
use crate::error::{ConfgenError, Result};
use crate::overrides::{self, DirLister, OVERRIDE_FILE, WorkItem};
use crate::render::{pipeline, yaml};
use crate::reserved::{self, RUN_DATE, ReservedKeys};
use crate::runtime::{ObjectStore, jar};
use crate::selector::{ExpScope, Selector};
use crate::template::ConfigKind;
use crate::template::engine::{self, RunDate};
use crate::values;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE;
use chrono::NaiveDate;
use serde_yaml::{Mapping, Value};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Remote directory, below the upload prefix, that receives runtime configs.
pub const RUNTIME_DIR: &str = "runtime-configs";

const RUN_DATE_INPUT_FORMAT: &str = "%Y%m%d";

/// A validated runtime invocation.
#[derive(Debug, Clone)]
pub struct RuntimeRequest {
    pub selector: Selector,
    pub run_date: NaiveDate,
    /// Extra `key=value` parameters, values parsed as YAML.
    pub extra: Mapping,
}

impl RuntimeRequest {
    pub fn new(selector: Selector, run_date: Option<&str>, extra: &[(String, String)]) -> Result<Self> {
        if selector.environment().is_none() {
            return Err(ConfgenError::invalid_selector(
                "env",
                "env=all is not supported by the runtime step",
            ));
        }
        if selector.experiment == Some(ExpScope::All) {
            return Err(ConfgenError::invalid_selector(
                "exp",
                "exp=all is not supported by the runtime step",
            ));
        }

        let raw = run_date.ok_or_else(|| {
            ConfgenError::RuntimeResolution("run_date is required (YYYYMMDD)".to_string())
        })?;
        let run_date = parse_run_date(raw)?;

        let mut values = Mapping::new();
        for (key, text) in extra {
            let value: Value = serde_yaml::from_str(text).map_err(|e| {
                ConfgenError::RuntimeResolution(format!("parameter {}={}: {}", key, text, e))
            })?;
            values.insert(key.as_str().into(), value);
        }
        reserved::reject_locked(values.keys(), "runtime parameters")?;

        Ok(RuntimeRequest {
            selector,
            run_date,
            extra: values,
        })
    }
}

fn parse_run_date(raw: &str) -> Result<NaiveDate> {
    let invalid = || {
        ConfgenError::RuntimeResolution(format!("run_date '{}' is not a YYYYMMDD date", raw))
    };
    if raw.len() != 8 || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    NaiveDate::parse_from_str(raw, RUN_DATE_INPUT_FORMAT).map_err(|_| invalid())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeJob {
    pub item: WorkItem,
    /// URL-safe base64 SHA-256 of the rendered files.
    pub hash: String,
    pub dir: PathBuf,
    pub files: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeReport {
    pub jobs: Vec<RuntimeJob>,
}

/// Resolve, write and upload runtime configs for every generated job under
/// the request's selector.
///
/// Rendering errors abort immediately. Upload errors are collected, the
/// remaining jobs still run, and the call then fails with `UploadFailure`.
pub fn resolve(
    settings: &Settings,
    request: &RuntimeRequest,
    lister: &dyn DirLister,
    store: &dyn ObjectStore,
) -> Result<RuntimeReport> {
    let selector = &request.selector;
    let env = selector.environment().ok_or_else(|| {
        ConfgenError::invalid_selector("env", "env=all is not supported by the runtime step")
    })?;

    let items = generated_jobs(lister, settings, selector)?;
    if items.is_empty() {
        return Err(ConfgenError::RuntimeResolution(format!(
            "no generated configs for {} under {}",
            selector,
            settings.paths.output.display()
        )));
    }
    let reserved = reserved::compute(env, selector.experiment_name(), &settings.formats);
    info!(%selector, run_date = %request.run_date, jobs = items.len(), "resolving runtime configs");

    let mut report = RuntimeReport::default();
    let mut failed = Vec::new();
    for item in items {
        let rendered = render_job(settings, request, &reserved, &item, store)?;
        let hash = content_hash(&rendered);
        let dir = write_job(&settings.paths.runtime_output, &item, &hash, &rendered)?;
        failed.extend(upload_job(&settings.remote.upload_prefix, &item, &hash, &rendered, store));
        info!(job = %item, %hash, dir = %dir.display(), "generated runtime configs");

        report.jobs.push(RuntimeJob {
            item,
            hash,
            dir,
            files: rendered.into_keys().collect(),
        });
    }

    if !failed.is_empty() {
        return Err(ConfgenError::UploadFailure { failed });
    }
    Ok(report)
}

/// Jobs with a generated config directory under the selector's environment
/// that still have an override file.
fn generated_jobs(lister: &dyn DirLister, settings: &Settings, selector: &Selector) -> Result<Vec<WorkItem>> {
    let Some(env) = selector.environment() else {
        return Ok(Vec::new());
    };
    let experiment = selector.experiment_name().map(str::to_string);
    let mut base = settings.paths.output.join(env.as_str());
    if let Some(exp) = &experiment {
        base.push(exp);
    }

    let mut items = Vec::new();
    for group in lister.subdirs(&base)? {
        if selector.group.as_deref().is_some_and(|g| g != group) {
            continue;
        }
        for job in lister.subdirs(&base.join(&group))? {
            if selector.job.as_deref().is_some_and(|j| j != job) {
                continue;
            }
            let item = WorkItem {
                env,
                experiment: experiment.clone(),
                group: group.clone(),
                job,
            };
            let override_file = settings.paths.overrides.join(item.job_path()).join(OVERRIDE_FILE);
            if !lister.is_file(&override_file) {
                warn!(
                    job = %item,
                    path = %override_file.display(),
                    "override removed, skipping stale generated config"
                );
                continue;
            }
            items.push(item);
        }
    }
    Ok(items)
}

/// Render every `*.yml` of one generated job, keyed by file name.
fn render_job(
    settings: &Settings,
    request: &RuntimeRequest,
    reserved: &ReservedKeys,
    item: &WorkItem,
    store: &dyn ObjectStore,
) -> Result<BTreeMap<String, String>> {
    let job_dir = settings.paths.output.join(item.job_path());
    let overrides = overrides::load(&settings.paths.overrides, item)?;
    let merged = pipeline::merge_layers(&[
        &reserved.format_defaults(),
        &overrides.values,
        &request.extra,
        &reserved.locked(),
    ]);
    let mut ctx = values::to_context(&merged);
    ctx.insert(RUN_DATE.to_string(), RunDate::value(request.run_date));

    let identity = ConfigKind::Identity.file_name();
    let mut rendered = BTreeMap::new();
    for name in config_files(&job_dir)? {
        let path = job_dir.join(&name);
        let source = fs::read_to_string(&path).map_err(|source| ConfgenError::Read {
            path: path.clone(),
            source,
        })?;
        let display = path.display().to_string();
        let mut text = engine::render(&display, &source, &ctx)?;

        if name == identity {
            let mut map = pipeline::parse_rendered(&display, &text)?;
            if jar::inject_jar_path(&mut map, &settings.remote.jar_root, store)? {
                text = yaml::to_yaml(&values::sorted(&map));
            }
        }
        debug!(job = %item, file = %name, "rendered runtime config");
        rendered.insert(name, text);
    }

    if !rendered.contains_key(identity) {
        return Err(ConfgenError::RuntimeResolution(format!(
            "{} is required in {}",
            identity,
            job_dir.display()
        )));
    }
    Ok(rendered)
}

fn config_files(dir: &Path) -> Result<Vec<String>> {
    let read_err = |source| ConfgenError::Read {
        path: dir.to_path_buf(),
        source,
    };
    let mut names = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_err)? {
        let entry = entry.map_err(read_err)?;
        if !entry.path().is_file() {
            continue;
        }
        if let Ok(name) = entry.file_name().into_string() {
            if name.ends_with(".yml") {
                names.push(name);
            }
        }
    }
    names.sort();
    Ok(names)
}

/// SHA-256 over the files concatenated in name order, URL-safe base64.
pub fn content_hash(rendered: &BTreeMap<String, String>) -> String {
    let mut hasher = Sha256::new();
    for text in rendered.values() {
        hasher.update(text.as_bytes());
    }
    URL_SAFE.encode(hasher.finalize())
}

fn write_job(root: &Path, item: &WorkItem, hash: &str, rendered: &BTreeMap<String, String>) -> Result<PathBuf> {
    let dir = root.join(item.job_path()).join(hash);
    fs::create_dir_all(&dir).map_err(|source| ConfgenError::Write {
        path: dir.clone(),
        source,
    })?;
    for (name, text) in rendered {
        let path = dir.join(name);
        fs::write(&path, text).map_err(|source| ConfgenError::Write { path, source })?;
    }
    Ok(dir)
}

/// Upload every file; returns the URIs that failed.
fn upload_job(
    prefix: &str,
    item: &WorkItem,
    hash: &str,
    rendered: &BTreeMap<String, String>,
    store: &dyn ObjectStore,
) -> Vec<String> {
    let base = remote_dir(prefix, item, hash);
    let mut failed = Vec::new();
    for (name, text) in rendered {
        let uri = format!("{}/{}", base, name);
        match store.upload(&uri, text.as_bytes()) {
            Ok(()) => debug!(%uri, "uploaded"),
            Err(e) => {
                warn!(%uri, error = %e, "upload failed");
                failed.push(uri);
            }
        }
    }
    failed
}

/// `<prefix>/runtime-configs/<env>/[<exp>/]<group>/<job>/<hash>`
pub fn remote_dir(prefix: &str, item: &WorkItem, hash: &str) -> String {
    let mut parts = vec![prefix.trim_end_matches('/'), RUNTIME_DIR, item.env.as_str()];
    if let Some(exp) = &item.experiment {
        parts.push(exp);
    }
    parts.extend([item.group.as_str(), item.job.as_str(), hash]);
    parts.join("/")
}
