//! The three config kinds every job owns.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConfigKind {
    Identity,
    Execution,
    Output,
}

impl ConfigKind {
    pub const ALL: [ConfigKind; 3] = [ConfigKind::Identity, ConfigKind::Execution, ConfigKind::Output];

    /// Generated file name, e.g. `identity_config.yml`.
    pub fn file_name(self) -> &'static str {
        match self {
            ConfigKind::Identity => "identity_config.yml",
            ConfigKind::Execution => "execution_config.yml",
            ConfigKind::Output => "output_config.yml",
        }
    }

    /// Template file name for a given extension, e.g. `identity_config.yml.j2`.
    pub fn template_name(self, extension: &str) -> String {
        format!("{}.{}", self.file_name(), extension)
    }
}

impl fmt::Display for ConfigKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}
