//! `KEY=VALUE` command-line parameters.

use crate::error::{ConfgenError, Result};
use crate::selector::RawSelector;

/// clap value parser for one `KEY=VALUE` argument.
pub fn parse_key_val(s: &str) -> std::result::Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", s))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing key in '{}'", s));
    }
    Ok((key.to_string(), value.to_string()))
}

/// Parameters of one invocation, consumed key by key.
#[derive(Debug, Clone, Default)]
pub struct Params {
    pairs: Vec<(String, String)>,
}

impl Params {
    /// Rejects a key given twice.
    pub fn new(pairs: Vec<(String, String)>) -> Result<Params> {
        for (i, (key, _)) in pairs.iter().enumerate() {
            if pairs[..i].iter().any(|(seen, _)| seen == key) {
                return Err(ConfgenError::invalid_selector(
                    "params",
                    format!("parameter '{}' given more than once", key),
                ));
            }
        }
        Ok(Params { pairs })
    }

    pub fn take(&mut self, key: &str) -> Option<String> {
        let pos = self.pairs.iter().position(|(k, _)| k == key)?;
        Some(self.pairs.remove(pos).1)
    }

    /// Take `env`, `exp`, `group` and `job`.
    pub fn selector(&mut self) -> RawSelector {
        RawSelector {
            env: self.take("env"),
            exp: self.take("exp"),
            group: self.take("group"),
            job: self.take("job"),
        }
    }

    /// Fail on anything not consumed yet.
    pub fn finish(self) -> Result<()> {
        match self.pairs.first() {
            Some((key, _)) => Err(ConfgenError::invalid_selector(
                "params",
                format!("unknown parameter '{}'", key),
            )),
            None => Ok(()),
        }
    }

    /// Whatever is left, in command-line order.
    pub fn into_rest(self) -> Vec<(String, String)> {
        self.pairs
    }
}
