//! Project settings (`confgen.toml`).
//!
//! Every field has a default so the file is optional; a project that follows
//! the conventional layout needs no settings at all. Relative paths are
//! resolved against the project root given on the command line.
//!
//! ```toml
//! [paths]
//! templates = "config-templates"
//! overrides = "config-overrides"
//! output = "configs"
//! runtime_output = "runtime-configs"
//! template_extension = "j2"
//!
//! [formats]
//! run_date = "%Y-%m-%d"
//!
//! [overrides]
//! allowed_keys = ["owner"]
//!
//! [remote]
//! store_root = ".remote"
//! upload_prefix = "s3://ml-platform/configdata/confetti"
//! jar_root = "s3://ml-platform/libs/audience/jars"
//! ```

use crate::error::{ConfgenError, Result};

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const SETTINGS_FILE: &str = "confgen.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub paths: PathsConfig,
    pub formats: DateFormats,
    pub overrides: OverridesConfig,
    pub remote: RemoteConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    pub templates: PathBuf,
    pub overrides: PathBuf,
    pub output: PathBuf,
    pub runtime_output: PathBuf,
    /// Extension appended to `<kind>_config.yml` for template files.
    pub template_extension: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            templates: PathBuf::from("config-templates"),
            overrides: PathBuf::from("config-overrides"),
            output: PathBuf::from("configs"),
            runtime_output: PathBuf::from("runtime-configs"),
            template_extension: "j2".to_string(),
        }
    }
}

/// Default values of the date-format reserved keys.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DateFormats {
    pub run_date: String,
    pub version_date: String,
    pub full_version_date: String,
}

impl Default for DateFormats {
    fn default() -> Self {
        Self {
            run_date: "%Y-%m-%d".to_string(),
            version_date: "%Y%m%d".to_string(),
            full_version_date: "%Y%m%d000000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OverridesConfig {
    /// Override keys accepted even though no template references them.
    pub allowed_keys: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RemoteConfig {
    /// Local directory standing in for the object store buckets.
    pub store_root: PathBuf,
    /// Runtime configs are uploaded below `<upload_prefix>/runtime-configs/`.
    pub upload_prefix: String,
    pub jar_root: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            store_root: PathBuf::from(".remote"),
            upload_prefix: "s3://ml-platform/configdata/confetti".to_string(),
            jar_root: "s3://ml-platform/libs/audience/jars".to_string(),
        }
    }
}

impl Settings {
    /// Load settings for a project.
    ///
    /// An explicit path must exist. Without one, `<root>/confgen.toml` is
    /// used when present and the defaults otherwise. Paths are then made
    /// absolute relative to `root`.
    pub fn load(root: &Path, explicit: Option<&Path>) -> Result<Settings> {
        let mut settings = match explicit {
            Some(path) => Self::from_file(path)?,
            None => {
                let path = root.join(SETTINGS_FILE);
                if path.is_file() {
                    Self::from_file(&path)?
                } else {
                    Settings::default()
                }
            }
        };
        settings.validate()?;
        settings.rebase(root);
        Ok(settings)
    }

    fn from_file(path: &Path) -> Result<Settings> {
        let text = fs::read_to_string(path).map_err(|source| ConfgenError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text)
            .map_err(|e| ConfgenError::Settings(format!("{}: {}", path.display(), e)))
    }

    /// Semantic checks; serde already handled the syntax.
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();

        let paths = [
            ("paths.templates", &self.paths.templates),
            ("paths.overrides", &self.paths.overrides),
            ("paths.output", &self.paths.output),
            ("paths.runtime_output", &self.paths.runtime_output),
            ("remote.store_root", &self.remote.store_root),
        ];
        for (name, path) in paths {
            if path.as_os_str().is_empty() {
                problems.push(format!("{} must not be empty", name));
            }
        }
        if self.paths.output == self.paths.overrides || self.paths.output == self.paths.templates {
            problems.push("paths.output must differ from the input trees".to_string());
        }

        let ext = &self.paths.template_extension;
        if ext.is_empty() || ext.starts_with('.') || ext.contains(['/', '\\']) {
            problems.push(format!(
                "paths.template_extension '{}' must be a bare extension such as 'j2'",
                ext
            ));
        }

        for (name, value) in [
            ("formats.run_date", &self.formats.run_date),
            ("formats.version_date", &self.formats.version_date),
            ("formats.full_version_date", &self.formats.full_version_date),
        ] {
            if value.is_empty() {
                problems.push(format!("{} must not be empty", name));
            }
        }

        for (name, value) in [
            ("remote.upload_prefix", &self.remote.upload_prefix),
            ("remote.jar_root", &self.remote.jar_root),
        ] {
            if !value.contains("://") {
                problems.push(format!("{} '{}' must be a <scheme>://<bucket> URI", name, value));
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfgenError::Settings(problems.join("; ")))
        }
    }

    fn rebase(&mut self, root: &Path) {
        for path in [
            &mut self.paths.templates,
            &mut self.paths.overrides,
            &mut self.paths.output,
            &mut self.paths.runtime_output,
            &mut self.remote.store_root,
        ] {
            if path.is_relative() {
                *path = root.join(&*path);
            }
        }
    }
}
