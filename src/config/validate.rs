// src/config/validate.rs

use std::collections::HashSet;
use std::path::PathBuf;

use globset::Glob;
use regex::Regex;

use crate::config::model::{
    ConfigFile, PersistOptions, ProjectSection, RawConfigFile, Settings, SettingsSection,
    ToolSection,
};
use crate::config::project::{ToolCommand, Tools, WatchedProject, normalize_extension};
use crate::errors::{FreshrunError, Result};
use crate::types::{StepKind, parse_duration};
use crate::watch::classifier::is_glob_pattern;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = FreshrunError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        ensure_has_projects(&raw)?;
        ensure_unique_names(&raw)?;
        let settings = resolve_settings(&raw.settings)?;
        let projects = raw
            .projects
            .iter()
            .map(|p| resolve_project(p, &settings))
            .collect::<Result<Vec<_>>>()?;
        Ok(ConfigFile::new_unchecked(settings, projects))
    }
}

fn ensure_has_projects(cfg: &RawConfigFile) -> Result<()> {
    if cfg.projects.is_empty() {
        return Err(FreshrunError::ConfigError(
            "config must contain at least one [[project]] section".to_string(),
        ));
    }
    Ok(())
}

fn ensure_unique_names(cfg: &RawConfigFile) -> Result<()> {
    let mut seen = HashSet::new();
    for project in &cfg.projects {
        if project.name.trim().is_empty() {
            return Err(FreshrunError::ConfigError(
                "every [[project]] needs a non-empty `name`".to_string(),
            ));
        }
        if !seen.insert(project.name.as_str()) {
            return Err(FreshrunError::ConfigError(format!(
                "duplicate project name '{}'",
                project.name
            )));
        }
    }
    Ok(())
}

fn duration_field(field: &str, value: &str) -> Result<std::time::Duration> {
    parse_duration(value).map_err(|e| {
        FreshrunError::ConfigError(format!("[settings].{field} = \"{value}\": {e}"))
    })
}

fn resolve_settings(raw: &SettingsSection) -> Result<Settings> {
    let poll_interval = duration_field("poll_interval", &raw.poll_interval)?;
    if poll_interval.is_zero() {
        return Err(FreshrunError::ConfigError(
            "[settings].poll_interval must be greater than zero".to_string(),
        ));
    }

    Ok(Settings {
        mode: raw.mode,
        poll_interval,
        grace_period: duration_field("grace_period", &raw.grace_period)?,
        ready_timeout: duration_field("ready_timeout", &raw.ready_timeout)?,
        echo: raw.echo,
        persist: PersistOptions {
            outputs: raw.files.outputs,
            logs: raw.files.logs,
            errors: raw.files.errors,
            dir: PathBuf::from(&raw.files.dir),
        },
    })
}

fn resolve_project(raw: &ProjectSection, settings: &Settings) -> Result<WatchedProject> {
    if raw.path.trim().is_empty() {
        return Err(FreshrunError::ConfigError(format!(
            "project '{}' is missing its root `path`",
            raw.name
        )));
    }

    if raw.extensions.iter().all(|e| e.trim().trim_start_matches('.').is_empty()) {
        return Err(FreshrunError::ConfigError(format!(
            "project '{}' must watch at least one extension",
            raw.name
        )));
    }

    for rule in raw.ignore.iter().filter(|r| is_glob_pattern(r)) {
        Glob::new(rule).map_err(|e| {
            FreshrunError::ConfigError(format!(
                "project '{}': invalid ignore glob '{}': {}",
                raw.name, rule, e
            ))
        })?;
    }

    let mut project = WatchedProject::new(raw.name.clone(), raw.path.trim());
    if !raw.watch.is_empty() {
        project.watch_dirs = raw.watch.iter().map(PathBuf::from).collect();
    }
    project.extensions = raw
        .extensions
        .iter()
        .filter(|e| !e.trim().trim_start_matches('.').is_empty())
        .map(|e| normalize_extension(e))
        .collect();
    project.ignore = raw.ignore.clone();
    project.before = raw.before.clone();
    project.after = raw.after.clone();
    project.poll_interval = settings.poll_interval;
    project.tools = resolve_tools(raw)?;

    Ok(project)
}

fn resolve_tools(raw: &ProjectSection) -> Result<Tools> {
    let mut tools = Tools::default();
    let sections = [
        (StepKind::Fmt, &raw.tools.fmt),
        (StepKind::Test, &raw.tools.test),
        (StepKind::Generate, &raw.tools.generate),
        (StepKind::Install, &raw.tools.install),
        (StepKind::Build, &raw.tools.build),
        (StepKind::Run, &raw.tools.run),
    ];

    for (step, section) in sections {
        if let Some(section) = section {
            tools.set(step, resolve_tool(&raw.name, step, section)?);
        }
    }
    Ok(tools)
}

fn resolve_tool(project: &str, step: StepKind, section: &ToolSection) -> Result<ToolCommand> {
    let defaults = ToolCommand::default_for(step);

    let cmd = match section.cmd.as_deref().map(str::trim) {
        Some("") => {
            return Err(FreshrunError::ConfigError(format!(
                "project '{project}': tools.{} has an empty `cmd`",
                step.label().to_lowercase()
            )));
        }
        Some(cmd) => cmd.to_string(),
        None => defaults.cmd,
    };

    let ready_on_stdout = match &section.ready_on_stdout {
        Some(pattern) if step == StepKind::Run => Some(Regex::new(pattern).map_err(|e| {
            FreshrunError::ConfigError(format!(
                "project '{project}': invalid ready_on_stdout regex '{pattern}': {e}"
            ))
        })?),
        Some(_) => {
            return Err(FreshrunError::ConfigError(format!(
                "project '{project}': ready_on_stdout is only valid for tools.run"
            )));
        }
        None => None,
    };

    Ok(ToolCommand {
        enabled: section.enabled.unwrap_or(defaults.enabled),
        cmd,
        ready_on_stdout,
    })
}
