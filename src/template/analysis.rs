//! Static analysis of a template: which fields it reads and which of those
//! carry a declared default.
//!
//! A default is declared inline with the `default` filter, in any
//! expression or statement tag and anywhere in a filter chain:
//!
//! ```text
//! forceRun: {{ forceRun | default(false) }}
//! owner: "{{ owner | default('audience-team') | upper }}"
//! {% set retries = maxRetries | default(3) %}
//! ```
//!
//! Literal defaults are evaluated and become the lowest merge layer. A
//! default that is itself an expression over other fields still makes the
//! field optional but contributes no value.

use crate::error::{ConfgenError, Result};
use crate::template::engine;

use regex::Regex;
use serde_yaml::{Mapping, Value};
use std::collections::BTreeSet;
use tracing::debug;

// `{{ .. }}` expressions and `{% .. %}` statements.
const TAG_RE: &str = r"(?s)\{\{.*?\}\}|\{%.*?%\}";
// 1) field name; the match ends right after the `(` of its `default` call
const DEFAULT_CALL_RE: &str = r"([A-Za-z_][A-Za-z0-9_]*)\s*\|\s*default\s*\(";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateAnalysis {
    /// Every top-level name the template reads from its context.
    pub referenced: BTreeSet<String>,
    /// Names guarded by a `default` filter.
    pub defaulted: BTreeSet<String>,
    /// Evaluated literal defaults, in order of first appearance.
    pub defaults: Mapping,
}

impl TemplateAnalysis {
    pub fn of(name: &str, source: &str) -> Result<TemplateAnalysis> {
        let referenced = {
            let env = engine::environment();
            let template = env
                .template_from_named_str(name, source)
                .map_err(|e| ConfgenError::render(name, e))?;
            template.undeclared_variables(false).into_iter().collect::<BTreeSet<_>>()
        };

        // Wrap the filter arguments in a list so `default(x, true)` evaluates
        // as one expression; the first element is the default value.
        let tags = Regex::new(TAG_RE).map_err(|e| ConfgenError::render(name, e))?;
        let calls = Regex::new(DEFAULT_CALL_RE).map_err(|e| ConfgenError::render(name, e))?;
        let mut declared: Vec<(String, String)> = Vec::new();
        for tag in tags.find_iter(source) {
            let tag = tag.as_str();
            for caps in calls.captures_iter(tag) {
                let (Some(whole), Some(field)) = (caps.get(0), caps.get(1)) else {
                    continue;
                };
                // `obj.attr | default(..)` guards an attribute, not a field.
                if tag[..field.start()].ends_with('.') {
                    continue;
                }
                let Some(args) = call_args(&tag[whole.end()..]) else {
                    debug!(template = name, field = field.as_str(), "unterminated default call");
                    continue;
                };
                let args = args.trim();
                let expr = if args.is_empty() {
                    "['']".to_string()
                } else {
                    format!("[{}]", args)
                };
                declared.push((field.as_str().to_string(), expr));
            }
        }

        let mut defaulted = BTreeSet::new();
        let mut defaults = Mapping::new();
        let env = engine::environment();
        for (field, expr) in &declared {
            defaulted.insert(field.clone());
            if defaults.get(field.as_str()).is_some() {
                continue;
            }
            match literal_default(&env, expr) {
                Some(value) => {
                    defaults.insert(Value::from(field.as_str()), value);
                }
                None => debug!(template = name, field = %field, "default is not a literal"),
            }
        }

        Ok(TemplateAnalysis {
            referenced,
            defaulted,
            defaults,
        })
    }

    /// Referenced fields without a default, i.e. what the merge must supply.
    pub fn required(&self) -> impl Iterator<Item = &String> {
        self.referenced.difference(&self.defaulted)
    }
}

/// Text of an opened call up to its closing parenthesis.
fn call_args(rest: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (i, c) in rest.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => quote = Some(c),
            '(' | '[' | '{' => depth += 1,
            ')' if depth == 0 => return Some(&rest[..i]),
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    None
}

fn literal_default<'s>(env: &minijinja::Environment<'s>, expr: &'s str) -> Option<Value> {
    let compiled = env.compile_expression(expr).ok()?;
    let list = compiled.eval(()).ok()?;
    let first = list.get_item_by_index(0).ok()?;
    serde_yaml::to_value(&first).ok()
}
