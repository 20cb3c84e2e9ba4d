//! Reserved keys computed by the generator.
//!
//! Two classes:
//! - locked: `environment`, `experimentName`, `data_namespace`, `run_date`.
//!   Always injected last; nobody else may define them.
//! - format defaults: `run_date_format`, `version_date_format`,
//!   `full_version_date_format`. Injected first; overrides may replace them.

use crate::config::DateFormats;
use crate::error::{ConfgenError, Result};
use crate::selector::Environment;
use crate::values;

use serde_yaml::{Mapping, Value};

pub const ENVIRONMENT: &str = "environment";
pub const EXPERIMENT_NAME: &str = "experimentName";
pub const DATA_NAMESPACE: &str = "data_namespace";
pub const RUN_DATE: &str = "run_date";
pub const RUN_DATE_FORMAT: &str = "run_date_format";
pub const VERSION_DATE_FORMAT: &str = "version_date_format";
pub const FULL_VERSION_DATE_FORMAT: &str = "full_version_date_format";

pub const LOCKED_KEYS: [&str; 4] = [ENVIRONMENT, EXPERIMENT_NAME, DATA_NAMESPACE, RUN_DATE];
pub const FORMAT_KEYS: [&str; 3] = [RUN_DATE_FORMAT, VERSION_DATE_FORMAT, FULL_VERSION_DATE_FORMAT];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservedKeys {
    pub environment: Environment,
    /// `None` for prod; the key is then absent from the output.
    pub experiment_name: Option<String>,
    pub data_namespace: String,
    pub formats: DateFormats,
}

pub fn compute(env: Environment, experiment: Option<&str>, formats: &DateFormats) -> ReservedKeys {
    let experiment_name = if env.requires_experiment() {
        experiment.map(str::to_string)
    } else {
        None
    };
    let data_namespace = match &experiment_name {
        Some(exp) => format!("{}/{}", env, exp),
        None => env.to_string(),
    };
    ReservedKeys {
        environment: env,
        experiment_name,
        data_namespace,
        formats: formats.clone(),
    }
}

impl ReservedKeys {
    /// Format defaults, the lowest-priority layer after template defaults.
    pub fn format_defaults(&self) -> Mapping {
        let mut out = Mapping::new();
        out.insert(RUN_DATE_FORMAT.into(), self.formats.run_date.clone().into());
        out.insert(VERSION_DATE_FORMAT.into(), self.formats.version_date.clone().into());
        out.insert(
            FULL_VERSION_DATE_FORMAT.into(),
            self.formats.full_version_date.clone().into(),
        );
        out
    }

    /// Locked keys as a mapping (`run_date` is supplied separately as an object).
    pub fn locked(&self) -> Mapping {
        let mut out = Mapping::new();
        out.insert(ENVIRONMENT.into(), self.environment.as_str().into());
        if let Some(exp) = &self.experiment_name {
            out.insert(EXPERIMENT_NAME.into(), exp.clone().into());
        }
        out.insert(DATA_NAMESPACE.into(), self.data_namespace.clone().into());
        out
    }

    /// Stamp the identity keys onto a rendered config: `environment` always,
    /// `experimentName` only outside prod.
    pub fn stamp(&self, rendered: &mut Mapping) {
        rendered.insert(ENVIRONMENT.into(), self.environment.as_str().into());
        match &self.experiment_name {
            Some(exp) => {
                rendered.insert(EXPERIMENT_NAME.into(), exp.clone().into());
            }
            None => values::remove_key(rendered, EXPERIMENT_NAME),
        }
    }
}

/// Fail if a user-supplied layer tries to define a locked key.
pub fn reject_locked<'a>(keys: impl IntoIterator<Item = &'a Value>, origin: &str) -> Result<()> {
    for key in keys {
        if let Some(name) = key.as_str() {
            if LOCKED_KEYS.contains(&name) {
                return Err(ConfgenError::ReservedKeyOverride {
                    key: name.to_string(),
                    origin: origin.to_string(),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn prod_has_no_experiment_name() {
        let keys = compute(Environment::Prod, Some("ignored"), &DateFormats::default());
        assert_eq!(keys.experiment_name, None);
        assert_eq!(keys.data_namespace, "prod");

        let locked = keys.locked();
        assert_eq!(locked.get(ENVIRONMENT), Some(&Value::from("prod")));
        assert!(locked.get(EXPERIMENT_NAME).is_none());
    }

    #[test]
    fn experiment_scopes_the_namespace() {
        let keys = compute(Environment::Test, Some("demo1"), &DateFormats::default());
        assert_eq!(keys.experiment_name.as_deref(), Some("demo1"));
        assert_eq!(keys.data_namespace, "test/demo1");
        assert_eq!(keys.locked().get(EXPERIMENT_NAME), Some(&Value::from("demo1")));
    }

    #[test]
    fn compute_is_pure() {
        let formats = DateFormats::default();
        assert_eq!(
            compute(Environment::Experiment, Some("x"), &formats),
            compute(Environment::Experiment, Some("x"), &formats)
        );
    }

    #[test]
    fn format_defaults_come_from_settings() {
        let formats = DateFormats {
            run_date: "%d/%m/%Y".to_string(),
            ..DateFormats::default()
        };
        let defaults = compute(Environment::Prod, None, &formats).format_defaults();
        assert_eq!(defaults.get(RUN_DATE_FORMAT), Some(&Value::from("%d/%m/%Y")));
        assert_eq!(defaults.get(VERSION_DATE_FORMAT), Some(&Value::from("%Y%m%d")));
    }

    #[test]
    fn stamp_removes_experiment_name_for_prod() {
        let mut rendered = Mapping::new();
        rendered.insert("experimentName".into(), "stale".into());
        rendered.insert("forceRun".into(), true.into());

        compute(Environment::Prod, None, &DateFormats::default()).stamp(&mut rendered);
        assert!(rendered.get(EXPERIMENT_NAME).is_none());
        assert_eq!(rendered.get(ENVIRONMENT), Some(&Value::from("prod")));
        assert_eq!(rendered.get("forceRun"), Some(&Value::from(true)));
    }

    #[test]
    fn locked_keys_are_rejected_but_formats_are_not() {
        let mut overrides = Mapping::new();
        overrides.insert("run_date_format".into(), "%Y".into());
        assert!(reject_locked(overrides.keys(), "override").is_ok());

        overrides.insert("environment".into(), "prod".into());
        match reject_locked(overrides.keys(), "override") {
            Err(ConfgenError::ReservedKeyOverride { key, .. }) => assert_eq!(key, "environment"),
            other => panic!("unexpected {:?}", other),
        }
    }
}
