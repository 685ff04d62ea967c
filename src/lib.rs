// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod output;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tokio::sync::watch as watch_channel;
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{ConfigFile, Settings, WatchedProject, load_and_validate};
use crate::engine::Session;
use crate::exec::{RealToolchain, spawn_signal_listener};
use crate::fs::{FileSystem, RealFileSystem};
use crate::output::{FileSinks, OutputSink};
use crate::types::{StepKind, WatchMode};
use crate::watch::{PathClassifier, SystemClock, build_strategy};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - one watch session per project, all running concurrently
/// - the shared Ctrl-C / SIGTERM listener
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = args.config.clone();
    let cfg = load_and_validate(&config_path)
        .with_context(|| format!("loading config {}", config_path.display()))?
        .with_base_dir(&config_root_dir(&config_path));

    let projects = select_projects(&cfg, args.project.as_deref())?;
    let mode = if args.poll {
        WatchMode::Poll
    } else {
        cfg.settings.mode
    };

    if args.dry_run {
        print_dry_run(&cfg.settings, mode, &projects);
        return Ok(());
    }

    let shutdown = spawn_signal_listener();
    let mut sessions = JoinSet::new();

    for project in projects {
        let settings = cfg.settings.clone();
        let shutdown = shutdown.clone();
        sessions.spawn(async move {
            let name = project.name.clone();
            run_project(project, settings, mode, shutdown)
                .await
                .with_context(|| format!("project `{name}`"))
        });
    }

    while let Some(joined) = sessions.join_next().await {
        joined.context("session task panicked")??;
    }
    info!("all sessions finished");
    Ok(())
}

async fn run_project(
    mut project: WatchedProject,
    settings: Settings,
    mode: WatchMode,
    shutdown: watch_channel::Receiver<bool>,
) -> Result<()> {
    if let Ok(root) = std::fs::canonicalize(&project.root) {
        project.root = root;
    }
    let project = Arc::new(project);

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let classifier = PathClassifier::new(&project);
    let strategy = build_strategy(mode, fs.clone(), &project, &classifier)?;

    let files = FileSinks::from_options(&project.root, &settings.persist);
    let (sink, _notify) = OutputSink::new(project.name.clone(), settings.echo, files);
    let toolchain = Arc::new(RealToolchain::new(project.clone(), &settings));

    let session = Session::new(
        project,
        fs,
        strategy,
        Arc::new(SystemClock),
        toolchain,
        sink,
        shutdown,
    );
    session.run().await?;
    Ok(())
}

fn select_projects(cfg: &ConfigFile, only: Option<&str>) -> Result<Vec<WatchedProject>> {
    match only {
        None => Ok(cfg.projects.clone()),
        Some(name) => match cfg.project(name) {
            Some(project) => Ok(vec![project.clone()]),
            None => bail!("no project named `{name}` in config"),
        },
    }
}

/// Figure out the directory relative project roots are resolved against.
///
/// - If the config path has a non-empty parent (e.g. "configs/Freshrun.toml"),
///   we use that directory.
/// - If it's just a bare filename like "Freshrun.toml" (parent = ""),
///   we fall back to the current working directory "."
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// Simple dry-run output: print settings and each project's resolved pipeline.
fn print_dry_run(settings: &Settings, mode: WatchMode, projects: &[WatchedProject]) {
    println!("freshrun dry-run");
    println!("  settings.mode = {mode:?}");
    println!("  settings.grace_period = {:?}", settings.grace_period);
    println!("  settings.ready_timeout = {:?}", settings.ready_timeout);
    println!("  settings.echo = {}", settings.echo);
    println!();

    println!("projects ({}):", projects.len());
    for project in projects {
        println!("  - {}", project.name);
        println!("      root: {}", project.root.display());
        println!("      watch: {:?}", project.watch_dirs);
        println!("      extensions: {:?}", project.extensions);
        if !project.ignore.is_empty() {
            println!("      ignore: {:?}", project.ignore);
        }
        if mode == WatchMode::Poll {
            println!("      poll_interval: {:?}", project.poll_interval);
        }
        if !project.before.is_empty() {
            println!("      before: {:?}", project.before);
        }
        if !project.after.is_empty() {
            println!("      after: {:?}", project.after);
        }
        for step in StepKind::ALL {
            let tool = project.tools.command(step);
            if tool.enabled {
                println!("      {step}: {}", tool.cmd);
            } else {
                println!("      {step}: (disabled)");
            }
        }
    }

    debug!("dry-run complete (no execution)");
}
