//! Error taxonomy shared by the build and runtime commands.
//!
//! Every variant is fatal to the current invocation. `main` wraps these in
//! `anyhow` so the process exits non-zero with the full message.

use std::path::PathBuf;
use thiserror::Error;

use crate::template::ConfigKind;

pub type Result<T, E = ConfgenError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ConfgenError {
    /// Bad or contradictory selector combination.
    #[error("invalid selector: {field}: {reason}")]
    InvalidSelector { field: &'static str, reason: String },

    /// Override file exists but is not a string-keyed mapping.
    #[error("malformed override {path}: {reason}")]
    MalformedOverride { path: PathBuf, reason: String },

    #[error("reserved key '{key}' may not be set by {origin}")]
    ReservedKeyOverride { key: String, origin: String },

    #[error(
        "override key '{key}' in {path} is not used by any template of {group}/{job} \
         (add it to [overrides].allowed_keys to permit it)"
    )]
    UnknownOverrideKey {
        key: String,
        path: PathBuf,
        group: String,
        job: String,
    },

    #[error("no templates found for {group}/{job} under {dir}")]
    MissingTemplates {
        group: String,
        job: String,
        dir: PathBuf,
    },

    /// Template field with neither a default nor an override value.
    #[error(
        "{selector} {group}/{job}: {kind} requires '{field}' but no default or override provides it"
    )]
    MissingRequiredField {
        selector: String,
        group: String,
        job: String,
        kind: ConfigKind,
        field: String,
    },

    #[error("failed to render {template}: {reason}")]
    TemplateRender { template: String, reason: String },

    #[error("runtime resolution failed: {0}")]
    RuntimeResolution(String),

    #[error("upload failed for {}", failed.join(", "))]
    UploadFailure { failed: Vec<String> },

    #[error("invalid settings: {0}")]
    Settings(String),

    #[error("failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConfgenError {
    pub fn invalid_selector(field: &'static str, reason: impl Into<String>) -> Self {
        ConfgenError::InvalidSelector {
            field,
            reason: reason.into(),
        }
    }

    pub fn render(template: impl Into<String>, reason: impl ToString) -> Self {
        ConfgenError::TemplateRender {
            template: template.into(),
            reason: reason.to_string(),
        }
    }
}
