//! Scratch project trees for tests.

use crate::config::Settings;

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub struct Project {
    _dir: TempDir,
    pub settings: Settings,
}

impl Project {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let settings = Settings::load(dir.path(), None).unwrap();
        Self {
            _dir: dir,
            settings,
        }
    }

    /// `config-templates/<group>/<job>/<file>.j2`
    pub fn template(&self, group: &str, job: &str, file: &str, text: &str) -> &Self {
        let path = self
            .settings
            .paths
            .templates
            .join(group)
            .join(job)
            .join(format!("{}.j2", file));
        write(&path, text);
        self
    }

    /// `config-overrides/<env_path>/<group>/<job>/config.yml`
    pub fn override_file(&self, env_path: &str, group: &str, job: &str, text: &str) -> &Self {
        let path = self
            .settings
            .paths
            .overrides
            .join(env_path)
            .join(group)
            .join(job)
            .join("config.yml");
        write(&path, text);
        self
    }

    pub fn output(&self, rel: &str) -> PathBuf {
        self.settings.paths.output.join(rel)
    }

    pub fn read_output(&self, rel: &str) -> String {
        fs::read_to_string(self.output(rel)).unwrap()
    }
}

pub fn write(path: &Path, text: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, text).unwrap();
}
