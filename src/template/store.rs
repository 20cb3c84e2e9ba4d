//! Loading a job's templates from `<template_root>/<group>/<job>/`.

use crate::error::{ConfgenError, Result};
use crate::template::ConfigKind;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct TemplateSource {
    pub kind: ConfigKind,
    pub path: PathBuf,
    pub source: String,
}

impl TemplateSource {
    /// Name used in diagnostics: `<group>/<job>/<kind>_config.yml.<ext>`.
    pub fn display_name(&self) -> String {
        let mut tail: Vec<String> = self
            .path
            .iter()
            .rev()
            .take(3)
            .map(|part| part.to_string_lossy().into_owned())
            .collect();
        tail.reverse();
        tail.join("/")
    }
}

/// The templates present for one job, in `ConfigKind` order.
#[derive(Debug, Clone)]
pub struct JobTemplates {
    pub group: String,
    pub job: String,
    pub templates: Vec<TemplateSource>,
}

impl JobTemplates {
    /// Load whichever of the three kinds exist. A job with none of them is
    /// an error: an override that nothing consumes is a broken project.
    pub fn load(template_root: &Path, extension: &str, group: &str, job: &str) -> Result<JobTemplates> {
        let dir = template_root.join(group).join(job);
        let mut templates = Vec::new();

        for kind in ConfigKind::ALL {
            let path = dir.join(kind.template_name(extension));
            match fs::read_to_string(&path) {
                Ok(source) => templates.push(TemplateSource { kind, path, source }),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    debug!(path = %path.display(), "template kind not provided");
                }
                Err(source) => return Err(ConfgenError::Read { path, source }),
            }
        }

        if templates.is_empty() {
            return Err(ConfgenError::MissingTemplates {
                group: group.to_string(),
                job: job.to_string(),
                dir,
            });
        }

        Ok(JobTemplates {
            group: group.to_string(),
            job: job.to_string(),
            templates,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn loads_present_kinds_in_order() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("audience/job_a");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("output_config.yml.j2"), "out: 1\n").unwrap();
        fs::write(dir.join("identity_config.yml.j2"), "id: 1\n").unwrap();
        fs::write(dir.join("unrelated.txt"), "ignored").unwrap();

        let job = JobTemplates::load(temp.path(), "j2", "audience", "job_a").unwrap();
        let kinds: Vec<ConfigKind> = job.templates.iter().map(|t| t.kind).collect();
        assert_eq!(kinds, vec![ConfigKind::Identity, ConfigKind::Output]);
        assert_eq!(job.templates[0].source, "id: 1\n");
    }

    #[test]
    fn display_name_is_relative_to_the_template_root() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("audience/job_a");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("execution_config.yml.j2"), "x: 1\n").unwrap();

        let job = JobTemplates::load(temp.path(), "j2", "audience", "job_a").unwrap();
        assert_eq!(
            job.templates[0].display_name(),
            "audience/job_a/execution_config.yml.j2"
        );
    }

    #[test]
    fn extension_is_configurable() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("g/j");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("execution_config.yml.jinja"), "x: 1\n").unwrap();

        assert!(JobTemplates::load(temp.path(), "j2", "g", "j").is_err());
        let job = JobTemplates::load(temp.path(), "jinja", "g", "j").unwrap();
        assert_eq!(job.templates[0].kind, ConfigKind::Execution);
    }

    #[test]
    fn job_without_templates_is_an_error() {
        let temp = TempDir::new().unwrap();
        match JobTemplates::load(temp.path(), "j2", "audience", "ghost") {
            Err(ConfgenError::MissingTemplates { group, job, .. }) => {
                assert_eq!((group.as_str(), job.as_str()), ("audience", "ghost"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
