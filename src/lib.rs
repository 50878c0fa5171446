// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod paths;
pub mod server;
pub mod tasks;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Result, bail};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{ConfigFile, default_config_path, load_or_default};
use crate::dag::{Scheduler, TaskPlan};
use crate::engine::{CoreRuntime, RunReport, Runtime, RuntimeEvent, RuntimeOptions, TriggerReason};
use crate::exec::TaskExecutorBackend;
use crate::paths::{Category, PathTable};
use crate::tasks::TaskContext;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and the path table
/// - the task plan for the requested task
/// - scheduler / queue / runtime
/// - the task executor
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let explicit = args.config.is_some();
    let config_path = args
        .config
        .as_deref()
        .map(PathBuf::from)
        .unwrap_or_else(default_config_path);
    let mut cfg = load_or_default(&config_path, explicit)?;
    if let Some(port) = args.port {
        cfg.server.port = port;
    }

    let root = project_root(&config_path);
    let paths = PathTable::from_config(&cfg, &root)?;
    let plan = TaskPlan::for_exposed(args.task)?;

    if args.dry_run {
        print_dry_run(&cfg, &paths, &plan);
        return Ok(());
    }

    let ctx = Arc::new(TaskContext::with_real_fs(cfg, paths)?);
    let report = run_plan(&plan, ctx).await?;

    if !report.is_success() {
        bail!("{} failed: {}", plan.name(), report.failed.join(", "));
    }
    Ok(())
}

/// Run `plan` to completion (or until Ctrl-C for plans that keep running).
pub async fn run_plan(plan: &TaskPlan, ctx: Arc<TaskContext>) -> Result<RunReport> {
    let scheduler = Scheduler::from_plan(plan);

    let behaviour = ctx.config.config.triggered_while_running_behaviour;
    let queue_length = ctx.config.config.queue_length;

    // Runtime event channel.
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);

    let executor = TaskExecutorBackend::new(rt_tx.clone(), ctx);

    // Ctrl-C -> graceful shutdown.
    {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Ctrl-C received; requesting shutdown");
            }
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
        });
    }

    let roots = plan.roots().to_vec();
    info!(plan = %plan.name(), ?roots, "starting");
    for task in roots {
        rt_tx
            .send(RuntimeEvent::TaskTriggered {
                task,
                reason: TriggerReason::Manual,
            })
            .await?;
    }

    let options = RuntimeOptions {
        exit_when_idle: !plan.keeps_running(),
    };

    // The pure core holds the semantics; the runtime is its async shell.
    let core = CoreRuntime::new(scheduler, behaviour, queue_length, options);
    let runtime = Runtime::new(core, rt_rx, executor);
    Ok(runtime.run().await?)
}

/// Directory every configured path is relative to.
///
/// - A config path with a non-empty parent (`site/Assetflow.toml`) uses that
///   directory.
/// - A bare file name falls back to the current working directory.
fn project_root(config_path: &Path) -> PathBuf {
    let dir = match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    };
    dir.canonicalize().unwrap_or(dir)
}

/// Print the resolved path table and task plan without running anything.
fn print_dry_run(cfg: &ConfigFile, paths: &PathTable, plan: &TaskPlan) {
    println!("assetflow dry-run: {}", plan.name());
    println!("  root = {}", paths.root().display());
    println!(
        "  config.triggered_while_running_behaviour = {:?}",
        cfg.config.triggered_while_running_behaviour
    );
    println!("  config.queue_length = {}", cfg.config.queue_length);
    println!();

    println!("sources:");
    for category in Category::ALL {
        let glob = paths.source(category);
        println!(
            "  {:<7} {}  (base {})",
            category.name(),
            glob.pattern(),
            glob.base().display()
        );
    }
    println!("destinations:");
    println!("  html            {}", paths.dest_html().display());
    println!("  css             {}", paths.dest_css().display());
    println!("  css_unminified  {}", paths.dest_css_unminified().display());
    println!("  images          {}", paths.dest_images().display());
    println!("  js              {}", paths.dest_js().display());
    println!(
        "server: http://{}:{}  root {}",
        cfg.server.host,
        cfg.server.port,
        paths.server_root().display()
    );
    println!();

    println!("plan (startup order):");
    for name in plan.reachable() {
        let Some(node) = plan.node(&name) else {
            continue;
        };
        let mut line = format!("  - {name}");
        if !node.after.is_empty() {
            line.push_str(&format!("  after {:?}", node.after));
        }
        if node.long_lived {
            line.push_str("  (runs until stopped)");
        }
        println!("{line}");
    }

    debug!("dry-run complete (no execution)");
}
