// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod layout;
pub mod logging;
pub mod poller;
pub mod proxy;

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{Settings, load_and_validate};
use crate::engine::{CancelFlag, LogProgress, Orchestrator, ProgressSink, RunStatus};
use crate::errors::{DumprunError, Result};
use crate::exec::SystemProbe;
use crate::fs::RealFileSystem;
use crate::fs::retry::FileOps;
use crate::layout::GameLayout;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - path resolution and validation
/// - optional settings file
/// - Ctrl-C handling
/// - the run orchestrator
pub async fn run(args: CliArgs) -> Result<RunStatus> {
    let settings = match &args.config {
        Some(path) => load_and_validate(path)?,
        None => Settings::default(),
    };

    let resources_dir = match &args.resources_dir {
        Some(dir) => dir.clone(),
        None => default_resources_dir()?,
    };

    let progress: Arc<dyn ProgressSink> = Arc::new(LogProgress);

    let layout = GameLayout::new(
        &args.game_dir,
        &resources_dir,
        &args.target_exe,
        &args.helper_exe,
    );
    progress.progress(20, "validating paths");
    validate_paths(&args, &layout)?;

    if args.dry_run {
        print_dry_run(&args, &layout, &settings);
        return Ok(RunStatus::Success(0));
    }

    std::fs::create_dir_all(&args.out_dir)?;

    // Ctrl-C → cooperative cancellation; the orchestrator still cleans up.
    let cancel = CancelFlag::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            info!("Ctrl+C received; cancelling run");
            cancel.cancel();
        });
    }

    let ops = FileOps::new(Arc::new(RealFileSystem), settings.retry);
    let orchestrator = Orchestrator::new(
        ops,
        layout,
        args.out_dir.clone(),
        args.system_library.clone(),
        settings,
        Arc::new(SystemProbe),
        progress,
        cancel,
    );

    let status = orchestrator.run().await;
    // Logs go to stderr; the status report owns stdout.
    println!("dumprun: {status}");
    Ok(status)
}

/// Default resources directory: `resources/` next to the running binary.
fn default_resources_dir() -> Result<PathBuf> {
    let exe = std::env::current_exe()?;
    let dir = exe
        .parent()
        .ok_or_else(|| DumprunError::Config("cannot resolve executable directory".to_string()))?;
    Ok(dir.join("resources"))
}

fn validate_paths(args: &CliArgs, layout: &GameLayout) -> Result<()> {
    if !args.game_dir.is_dir() {
        return Err(DumprunError::NotFound(format!(
            "game directory {:?}",
            args.game_dir
        )));
    }
    let target = layout.target_exe_path();
    if !target.is_file() {
        return Err(DumprunError::NotFound(format!(
            "target executable {:?}",
            target
        )));
    }
    debug!(game_dir = ?args.game_dir, resources_dir = ?layout.resources_dir, "paths validated");
    Ok(())
}

/// Dry-run output: print the resolved plan without touching anything.
fn print_dry_run(args: &CliArgs, layout: &GameLayout, settings: &Settings) {
    println!("dumprun dry-run");
    println!("  game dir:        {}", layout.game_dir.display());
    println!("  target exe:      {}", layout.target_exe_path().display());
    println!("  out dir:         {}", args.out_dir.display());
    println!("  resources dir:   {}", layout.resources_dir.display());
    println!("  helper binary:   {}", layout.helper_source_path().display());
    println!("  system library:  {}", args.system_library.display());
    println!();
    println!("  proxy install:   {}", layout.library_path().display());
    println!("  backup path:     {}", layout.backup_path().display());
    println!("  candidate dump dirs (priority order):");
    for dir in layout.candidate_dirs() {
        println!("    - {}", dir.display());
    }
    println!();
    println!(
        "  min known files: {}  poll: {:?}  exit grace: {:?}",
        settings.min_known_files, settings.poll_interval, settings.exit_grace
    );
    println!(
        "  helper timeout: {:?}  retries: {} x {:?}",
        settings.helper.readiness_timeout, settings.retry.attempts, settings.retry.delay
    );

    debug!("dry-run complete (no execution)");
}
