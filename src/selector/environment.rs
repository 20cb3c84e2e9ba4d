//! Deployment tiers.

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Environment {
    Prod,
    Test,
    Experiment,
}

impl Environment {
    pub const ALL: [Environment; 3] = [
        Environment::Experiment,
        Environment::Prod,
        Environment::Test,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Prod => "prod",
            Environment::Test => "test",
            Environment::Experiment => "experiment",
        }
    }

    /// Test and experiment tiers are always scoped to a named experiment.
    pub fn requires_experiment(self) -> bool {
        !matches!(self, Environment::Prod)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "prod" => Ok(Environment::Prod),
            "test" => Ok(Environment::Test),
            "experiment" => Ok(Environment::Experiment),
            other => Err(format!(
                "unknown environment '{}' (expected prod, test, experiment or all)",
                other
            )),
        }
    }
}

/// Environment level of a selector: one tier, or every tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvScope {
    All,
    Only(Environment),
}

impl fmt::Display for EnvScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvScope::All => f.write_str("all"),
            EnvScope::Only(env) => env.fmt(f),
        }
    }
}

impl FromStr for EnvScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "all" {
            return Ok(EnvScope::All);
        }
        s.parse().map(EnvScope::Only)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_known_tiers_and_all() {
        assert_eq!("prod".parse::<EnvScope>(), Ok(EnvScope::Only(Environment::Prod)));
        assert_eq!(
            "experiment".parse::<EnvScope>(),
            Ok(EnvScope::Only(Environment::Experiment))
        );
        assert_eq!("all".parse::<EnvScope>(), Ok(EnvScope::All));
        assert!("staging".parse::<EnvScope>().is_err());
        assert!("Prod".parse::<Environment>().is_err());
    }

    #[test]
    fn all_is_listed_lexicographically() {
        let names: Vec<&str> = Environment::ALL.iter().map(|e| e.as_str()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }

    #[test]
    fn only_prod_skips_experiments() {
        assert!(!Environment::Prod.requires_experiment());
        assert!(Environment::Test.requires_experiment());
        assert!(Environment::Experiment.requires_experiment());
    }
}
