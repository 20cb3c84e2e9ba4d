//! Worklist discovery.
//!
//! There is no manifest of groups or jobs: a (group, job) is generated for a
//! given environment exactly when its override file exists there. The walk
//! goes through `DirLister` so it can run against an in-memory tree.

use crate::error::{ConfgenError, Result};
use crate::overrides::OVERRIDE_FILE;
use crate::selector::{EnvScope, Environment, Selector};

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Directory listing seam used by discovery.
pub trait DirLister {
    /// Sorted names of the immediate subdirectories of `dir`. A missing
    /// directory lists as empty.
    fn subdirs(&self, dir: &Path) -> Result<Vec<String>>;

    fn is_file(&self, path: &Path) -> bool;
}

/// `DirLister` over the real filesystem. Hidden directories are ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsLister;

impl DirLister for FsLister {
    fn subdirs(&self, dir: &Path) -> Result<Vec<String>> {
        let read_err = |source| ConfgenError::Read {
            path: dir.to_path_buf(),
            source,
        };
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(read_err(e)),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(read_err)?;
            if !entry.path().is_dir() {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) if name.starts_with('.') => {}
                Ok(name) => names.push(name),
                Err(raw) => warn!(dir = %dir.display(), name = ?raw, "skipping non UTF-8 directory"),
            }
        }
        names.sort();
        Ok(names)
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }
}

/// One (environment, experiment, group, job) to generate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkItem {
    pub env: Environment,
    pub experiment: Option<String>,
    pub group: String,
    pub job: String,
}

impl WorkItem {
    /// `<env>[/<exp>]`, shared by the override, output and runtime trees.
    pub fn env_path(&self) -> PathBuf {
        let mut path = PathBuf::from(self.env.as_str());
        if let Some(exp) = &self.experiment {
            path.push(exp);
        }
        path
    }

    /// `<env>[/<exp>]/<group>/<job>`.
    pub fn job_path(&self) -> PathBuf {
        self.env_path().join(&self.group).join(&self.job)
    }

    /// `env=<env> [exp=<exp>]`, used to name the selector in errors.
    pub fn selector_label(&self) -> String {
        match &self.experiment {
            Some(exp) => format!("env={} exp={}", self.env, exp),
            None => format!("env={}", self.env),
        }
    }

    fn sort_key(&self) -> (&str, Option<&str>, &str, &str) {
        (
            self.env.as_str(),
            self.experiment.as_deref(),
            &self.group,
            &self.job,
        )
    }
}

impl fmt::Display for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.env)?;
        if let Some(exp) = &self.experiment {
            write!(f, "/{}", exp)?;
        }
        write!(f, "/{}/{}", self.group, self.job)
    }
}

/// Build the worklist for `selector`, sorted by env, exp, group, job.
pub fn discover(lister: &dyn DirLister, root: &Path, selector: &Selector) -> Result<Vec<WorkItem>> {
    let envs: Vec<Environment> = match selector.scope {
        EnvScope::Only(env) => vec![env],
        EnvScope::All => {
            let present = lister.subdirs(root)?;
            for name in &present {
                if name.parse::<Environment>().is_err() {
                    warn!(dir = %root.join(name).display(), "skipping unknown environment directory");
                }
            }
            Environment::ALL
                .into_iter()
                .filter(|env| present.iter().any(|name| name == env.as_str()))
                .collect()
        }
    };

    let mut items = Vec::new();
    for env in envs {
        let env_dir = root.join(env.as_str());
        let experiments: Vec<Option<String>> = if env.requires_experiment() {
            matching_subdirs(lister, &env_dir, selector.experiment_name())?
                .into_iter()
                .map(Some)
                .collect()
        } else {
            vec![None]
        };

        for experiment in experiments {
            let base = match &experiment {
                Some(exp) => env_dir.join(exp),
                None => env_dir.clone(),
            };
            for group in matching_subdirs(lister, &base, selector.group.as_deref())? {
                let group_dir = base.join(&group);
                for job in matching_subdirs(lister, &group_dir, selector.job.as_deref())? {
                    let override_file = group_dir.join(&job).join(OVERRIDE_FILE);
                    if !lister.is_file(&override_file) {
                        debug!(path = %override_file.display(), "no override file, job not generated");
                        continue;
                    }
                    items.push(WorkItem {
                        env,
                        experiment: experiment.clone(),
                        group: group.clone(),
                        job,
                    });
                }
            }
        }
    }

    items.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    Ok(items)
}

fn matching_subdirs(lister: &dyn DirLister, dir: &Path, wanted: Option<&str>) -> Result<Vec<String>> {
    let mut names = lister.subdirs(dir)?;
    if let Some(wanted) = wanted {
        names.retain(|name| name == wanted);
    }
    Ok(names)
}
