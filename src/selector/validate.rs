//! Selector validation.
//!
//! Rules are checked in a fixed order so the first offending field is the one
//! reported:
//! 1. environment present and known (prod, test, experiment, all)
//! 2. env=all carries no other field
//! 3. test/experiment need an experiment
//! 4. prod forbids an experiment
//! 5. group/job are single concrete path segments, job needs group; the
//!    experiment is one too, or `all` for every experiment of the tier

use crate::error::{ConfgenError, Result};
use crate::selector::{EnvScope, Environment};

use std::fmt;

/// Selector fields exactly as they arrived from the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawSelector {
    pub env: Option<String>,
    pub exp: Option<String>,
    pub group: Option<String>,
    pub job: Option<String>,
}

/// Experiment level under test or experiment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpScope {
    /// Every experiment directory of the tier.
    All,
    Only(String),
}

impl ExpScope {
    /// The named experiment, `None` for `all`.
    pub fn name(&self) -> Option<&str> {
        match self {
            ExpScope::All => None,
            ExpScope::Only(name) => Some(name),
        }
    }
}

impl fmt::Display for ExpScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name().unwrap_or("all"))
    }
}

/// Validated selector. Only constructed through `validate`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    pub scope: EnvScope,
    pub experiment: Option<ExpScope>,
    pub group: Option<String>,
    pub job: Option<String>,
}

impl Selector {
    /// The single environment this selector names, if it is not `all`.
    pub fn environment(&self) -> Option<Environment> {
        match self.scope {
            EnvScope::All => None,
            EnvScope::Only(env) => Some(env),
        }
    }

    /// The single experiment this selector names, if any.
    pub fn experiment_name(&self) -> Option<&str> {
        self.experiment.as_ref().and_then(ExpScope::name)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "env={}", self.scope)?;
        if let Some(exp) = &self.experiment {
            write!(f, " exp={}", exp)?;
        }
        if let Some(group) = &self.group {
            write!(f, " group={}", group)?;
        }
        if let Some(job) = &self.job {
            write!(f, " job={}", job)?;
        }
        Ok(())
    }
}

pub fn validate(raw: &RawSelector) -> Result<Selector> {
    let env = raw
        .env
        .as_deref()
        .ok_or_else(|| ConfgenError::invalid_selector("env", "environment is required"))?;
    let scope: EnvScope = env
        .parse()
        .map_err(|reason: String| ConfgenError::invalid_selector("env", reason))?;

    let experiment = match scope {
        EnvScope::All => {
            let extra = [
                ("exp", &raw.exp),
                ("group", &raw.group),
                ("job", &raw.job),
            ]
            .into_iter()
            .find(|(_, value)| value.is_some());
            if let Some((field, _)) = extra {
                return Err(ConfgenError::invalid_selector(
                    field,
                    "overly specific field under env=all",
                ));
            }
            None
        }
        EnvScope::Only(env) if env.requires_experiment() => match raw.exp.as_deref() {
            None | Some("") => {
                return Err(ConfgenError::invalid_selector(
                    "exp",
                    format!("missing experiment (required when env={})", env),
                ));
            }
            Some("all") => Some(ExpScope::All),
            Some(exp) => Some(ExpScope::Only(concrete("exp", exp)?)),
        },
        EnvScope::Only(_) => {
            if raw.exp.is_some() {
                return Err(ConfgenError::invalid_selector(
                    "exp",
                    "experiment not allowed under prod",
                ));
            }
            None
        }
    };

    let group = raw
        .group
        .as_deref()
        .map(|g| concrete("group", g))
        .transpose()?;
    let job = raw.job.as_deref().map(|j| concrete("job", j)).transpose()?;
    if job.is_some() && group.is_none() {
        return Err(ConfgenError::invalid_selector(
            "job",
            "a job can only be selected together with its group",
        ));
    }

    Ok(Selector {
        scope,
        experiment,
        group,
        job,
    })
}

/// Lower levels of the hierarchy are discovered from directory names, so a
/// selected value must be exactly one directory name and never a wildcard.
fn concrete(field: &'static str, value: &str) -> Result<String> {
    if value.is_empty() {
        return Err(ConfgenError::invalid_selector(field, "must not be empty"));
    }
    if value == "all" {
        return Err(ConfgenError::invalid_selector(
            field,
            "'all' is not accepted here; groups and jobs are discovered",
        ));
    }
    if value == "." || value == ".." || value.contains(['/', '\\']) {
        return Err(ConfgenError::invalid_selector(
            field,
            format!("'{}' is not a single directory name", value),
        ));
    }
    Ok(value.to_string())
}
