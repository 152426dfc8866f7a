// src/errors.rs

//! Crate-wide error type and result alias.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DumprunError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("retries exhausted while trying to {op} {path:?}: {source}")]
    LockedOrPermission {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to load original library {0:?}")]
    LoadFailed(PathBuf),

    #[error("failed to launch {name}: {source}")]
    LaunchFailed {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{name} exited immediately with code {code}")]
    ImmediateExit { name: String, code: i32 },

    #[error("timed out waiting for helper to signal readiness")]
    Timeout,

    #[error("helper exited with code {0} before signaling readiness")]
    HelperFailed(i32),

    #[error("no dump artifacts found in any candidate directory")]
    NoArtifactsFound,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, DumprunError>;
