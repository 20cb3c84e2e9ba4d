//! Build pipeline: worklist → merge → render → validate → write.
//!
//! Merge layers for one template, lowest priority first:
//! 1. literal defaults declared in the template
//! 2. date-format reserved keys
//! 3. the job's override mapping
//! 4. locked reserved keys (`environment`, `experimentName`, `data_namespace`)
//!
//! `run_date` is never part of the mapping; it is added to the template
//! context as a placeholder object.

use crate::config::Settings;
use crate::error::{ConfgenError, Result};
use crate::overrides::{self, DirLister, Overrides, WorkItem};
use crate::render::yaml;
use crate::reserved::{self, FORMAT_KEYS, RUN_DATE, ReservedKeys};
use crate::selector::Selector;
use crate::template::engine::{self, RunDatePlaceholder};
use crate::template::{ConfigKind, JobTemplates, TemplateAnalysis, TemplateSource};
use crate::values;

use serde_yaml::{Mapping, Value};
use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Key templates may use to label themselves; never written out.
pub const JOB_NAME_KEY: &str = "job_name";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub jobs: usize,
    pub files: Vec<PathBuf>,
}

/// Generate every config under `selector`. Fails fast on the first job that
/// cannot be rendered; files written for earlier jobs stay in place.
pub fn build(settings: &Settings, selector: &Selector, lister: &dyn DirLister) -> Result<BuildReport> {
    let worklist = overrides::discover(lister, &settings.paths.overrides, selector)?;
    if worklist.is_empty() {
        warn!(%selector, root = %settings.paths.overrides.display(), "no override files found, nothing to generate");
    } else {
        info!(%selector, jobs = worklist.len(), "generating configs");
    }

    let mut report = BuildReport::default();
    for item in &worklist {
        let rendered = render_job(settings, item)?;

        let out_dir = settings.paths.output.join(item.job_path());
        fs::create_dir_all(&out_dir).map_err(|source| ConfgenError::Write {
            path: out_dir.clone(),
            source,
        })?;
        for (kind, text) in rendered {
            let path = out_dir.join(kind.file_name());
            fs::write(&path, text).map_err(|source| ConfgenError::Write {
                path: path.clone(),
                source,
            })?;
            info!(path = %path.display(), "wrote config");
            report.files.push(path);
        }
        report.jobs += 1;
    }

    Ok(report)
}

/// Render all config kinds of one job in memory. Nothing is written unless
/// every kind renders.
pub fn render_job(settings: &Settings, item: &WorkItem) -> Result<Vec<(ConfigKind, String)>> {
    let templates = JobTemplates::load(
        &settings.paths.templates,
        &settings.paths.template_extension,
        &item.group,
        &item.job,
    )?;
    debug!(
        group = %templates.group,
        job = %templates.job,
        kinds = templates.templates.len(),
        "loaded templates"
    );
    let overrides = overrides::load(&settings.paths.overrides, item)?;
    let reserved = reserved::compute(item.env, item.experiment.as_deref(), &settings.formats);

    reserved::reject_locked(
        overrides.values.keys(),
        &format!("override file {}", overrides.path.display()),
    )?;

    let analyses = templates
        .templates
        .iter()
        .map(|t| TemplateAnalysis::of(&t.display_name(), &t.source))
        .collect::<Result<Vec<_>>>()?;
    check_known_keys(item, &overrides, &analyses, &settings.overrides.allowed_keys)?;

    let mut out = Vec::with_capacity(templates.templates.len());
    for (template, analysis) in templates.templates.iter().zip(&analyses) {
        let text = render_template(item, template, analysis, &reserved, &overrides.values)?;
        out.push((template.kind, text));
    }
    Ok(out)
}

fn render_template(
    item: &WorkItem,
    template: &TemplateSource,
    analysis: &TemplateAnalysis,
    reserved: &ReservedKeys,
    overrides: &Mapping,
) -> Result<String> {
    let merged = merge_layers(&[
        &analysis.defaults,
        &reserved.format_defaults(),
        overrides,
        &reserved.locked(),
    ]);

    let missing = analysis
        .required()
        .find(|field| field.as_str() != RUN_DATE && !values::contains(&merged, field));
    if let Some(field) = missing {
        return Err(ConfgenError::MissingRequiredField {
            selector: item.selector_label(),
            group: item.group.clone(),
            job: item.job.clone(),
            kind: template.kind,
            field: field.clone(),
        });
    }
    debug!(job = %item, kind = %template.kind, keys = merged.len(), "merged layers");

    let name = template.display_name();
    let mut ctx = values::to_context(&merged);
    ctx.insert(RUN_DATE.to_string(), RunDatePlaceholder::value());
    let text = engine::render(&name, &template.source, &ctx)?;

    let mut rendered = parse_rendered(&name, &text)?;
    values::remove_key(&mut rendered, JOB_NAME_KEY);
    reserved.stamp(&mut rendered);
    Ok(yaml::to_yaml(&rendered))
}

/// Overlay `layers` in order; later layers win.
pub fn merge_layers(layers: &[&Mapping]) -> Mapping {
    let mut merged = Mapping::new();
    for layer in layers {
        values::overlay(&mut merged, layer);
    }
    merged
}

/// Every override key must feed at least one template, unless it is a
/// date-format key or explicitly allowed in the settings.
fn check_known_keys(
    item: &WorkItem,
    overrides: &Overrides,
    analyses: &[TemplateAnalysis],
    allowed: &[String],
) -> Result<()> {
    let referenced: BTreeSet<&str> = analyses
        .iter()
        .flat_map(|a| a.referenced.iter().map(String::as_str))
        .collect();

    for key in overrides.values.keys().filter_map(Value::as_str) {
        let known = referenced.contains(key)
            || FORMAT_KEYS.contains(&key)
            || allowed.iter().any(|a| a == key);
        if !known {
            return Err(ConfgenError::UnknownOverrideKey {
                key: key.to_string(),
                path: overrides.path.clone(),
                group: item.group.clone(),
                job: item.job.clone(),
            });
        }
    }
    Ok(())
}

/// Rendered templates must be key/value documents.
pub fn parse_rendered(name: &str, text: &str) -> Result<Mapping> {
    let doc: Value = serde_yaml::from_str(text).map_err(|e| {
        ConfgenError::render(name, format!("rendered output is not valid YAML: {}", e))
    })?;
    let mapping = match doc {
        Value::Null => Mapping::new(),
        Value::Mapping(m) => m,
        _ => {
            return Err(ConfgenError::render(
                name,
                "rendered output is not a key/value mapping",
            ));
        }
    };
    if let Some(key) = values::first_non_string_key(&mapping) {
        return Err(ConfgenError::render(
            name,
            format!("rendered output has non-string key {}", key),
        ));
    }
    Ok(mapping)
}
