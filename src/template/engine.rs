//! Thin wrapper around `minijinja`.
//!
//! Templates are compiled per render from borrowed sources, so no template
//! registry outlives a job. Undefined values are errors (strict mode).

use crate::error::{ConfgenError, Result};

use chrono::{Datelike, NaiveDate};
use minijinja::value::{Object, ObjectRepr, from_args};
use minijinja::{AutoEscape, Environment, Error, ErrorKind, State, UndefinedBehavior, Value};
use std::collections::BTreeMap;
use std::fmt::{self, Write as _};
use std::sync::Arc;

pub type Context = BTreeMap<String, Value>;

pub fn environment<'s>() -> Environment<'s> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env.set_keep_trailing_newline(true);
    // Template names end in `.yml.j2`; YAML output is never escaped.
    env.set_auto_escape_callback(|_| AutoEscape::None);
    env
}

/// Render `source` against `ctx`. `name` only appears in diagnostics.
pub fn render(name: &str, source: &str, ctx: &Context) -> Result<String> {
    let env = environment();
    let template = env
        .template_from_named_str(name, source)
        .map_err(|e| ConfgenError::render(name, e))?;
    template.render(ctx).map_err(|e| ConfgenError::render(name, e))
}

/// Build-time stand-in for `run_date`.
///
/// The logical run date is unknown while generating, so the placeholder
/// renders back into template syntax that the runtime step resolves:
/// `{{ run_date }}` stays `{{ run_date }}` and `{{ run_date.strftime(f) }}`
/// becomes `{{ run_date.strftime('f') }}`.
#[derive(Debug)]
pub struct RunDatePlaceholder;

impl RunDatePlaceholder {
    pub fn value() -> Value {
        Value::from_object(RunDatePlaceholder)
    }
}

impl Object for RunDatePlaceholder {
    fn repr(self: &Arc<Self>) -> ObjectRepr {
        ObjectRepr::Plain
    }

    fn call_method(
        self: &Arc<Self>,
        _state: &State<'_, '_>,
        method: &str,
        args: &[Value],
    ) -> std::result::Result<Value, Error> {
        match method {
            "strftime" => {
                let (format,): (&str,) = from_args(args)?;
                Ok(Value::from(format!(
                    "{{{{ run_date.strftime('{}') }}}}",
                    format
                )))
            }
            _ => Err(Error::new(
                ErrorKind::UnknownMethod,
                format!("run_date has no method '{}'", method),
            )),
        }
    }

    fn render(self: &Arc<Self>, f: &mut fmt::Formatter<'_>) -> fmt::Result
    where
        Self: Sized + 'static,
    {
        f.write_str("{{ run_date }}")
    }
}

/// Runtime `run_date`: renders as `YYYY-MM-DD` and supports `strftime`,
/// `year`, `month` and `day`.
#[derive(Debug)]
pub struct RunDate(pub NaiveDate);

impl RunDate {
    pub fn value(date: NaiveDate) -> Value {
        Value::from_object(RunDate(date))
    }
}

impl Object for RunDate {
    fn repr(self: &Arc<Self>) -> ObjectRepr {
        ObjectRepr::Plain
    }

    fn get_value(self: &Arc<Self>, key: &Value) -> Option<Value> {
        match key.as_str()? {
            "year" => Some(Value::from(self.0.year())),
            "month" => Some(Value::from(self.0.month())),
            "day" => Some(Value::from(self.0.day())),
            _ => None,
        }
    }

    fn call_method(
        self: &Arc<Self>,
        _state: &State<'_, '_>,
        method: &str,
        args: &[Value],
    ) -> std::result::Result<Value, Error> {
        match method {
            "strftime" => {
                let (format,): (&str,) = from_args(args)?;
                strftime(self.0, format)
                    .map(Value::from)
                    .map_err(|reason| Error::new(ErrorKind::InvalidOperation, reason))
            }
            _ => Err(Error::new(
                ErrorKind::UnknownMethod,
                format!("run_date has no method '{}'", method),
            )),
        }
    }

    fn render(self: &Arc<Self>, f: &mut fmt::Formatter<'_>) -> fmt::Result
    where
        Self: Sized + 'static,
    {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

/// Format a date, reporting bad patterns instead of panicking.
pub fn strftime(date: NaiveDate, format: &str) -> std::result::Result<String, String> {
    let mut out = String::new();
    write!(out, "{}", date.format(format))
        .map_err(|_| format!("invalid date format '{}'", format))?;
    Ok(out)
}
