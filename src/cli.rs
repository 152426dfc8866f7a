// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Default location of the original system library on Windows installs.
/// On other platforms the flag must be pointed at the library explicitly.
pub const DEFAULT_SYSTEM_LIBRARY: &str = "C:\\Windows\\System32\\version.dll";

/// Command-line arguments for `dumprun`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "dumprun",
    version,
    about = "Install a version.dll proxy, launch the game, and collect dump artifacts.",
    long_about = None
)]
pub struct CliArgs {
    /// Game installation directory (must contain the target executable).
    #[arg(long, value_name = "DIR")]
    pub game_dir: PathBuf,

    /// Destination directory for collected dump artifacts (created if missing).
    #[arg(long, value_name = "DIR")]
    pub out_dir: PathBuf,

    /// Directory holding the helper binary and an optional prebuilt proxy.
    ///
    /// Default: `resources/` next to the dumprun executable.
    #[arg(long, value_name = "DIR")]
    pub resources_dir: Option<PathBuf>,

    /// Path to the original system library used to derive the proxy.
    #[arg(long, value_name = "PATH", default_value = DEFAULT_SYSTEM_LIBRARY)]
    pub system_library: PathBuf,

    /// File name of the target executable inside the game directory.
    #[arg(long, value_name = "NAME", default_value = "UmamusumePrettyDerby.exe")]
    pub target_exe: String,

    /// File name of the helper executable inside the resources directory.
    #[arg(long, value_name = "NAME", default_value = "tlg_starter.exe")]
    pub helper_exe: String,

    /// Optional TOML settings file (completion profile, timing overrides).
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `DUMPRUN_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Validate paths and print the resolved plan without executing anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
