// src/engine/mod.rs

//! Run orchestration: stage sequencing, progress reporting, cancellation.

pub mod orchestrator;

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;
use tracing::info;

use crate::errors::DumprunError;

pub use orchestrator::Orchestrator;

/// The stages a run moves through, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ProxyInstall,
    HelperReadiness,
    TargetLaunch,
    CompletionWait,
    Cleanup,
}

impl Stage {
    /// Position on the run's progress ladder. Path validation reports 20
    /// before the first stage, and the terminal status reports 100.
    pub fn percent(&self) -> u8 {
        match self {
            Stage::ProxyInstall => 30,
            Stage::HelperReadiness => 40,
            Stage::TargetLaunch => 50,
            Stage::CompletionWait => 70,
            Stage::Cleanup => 90,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::ProxyInstall => "installing proxy library",
            Stage::HelperReadiness => "waiting for helper readiness",
            Stage::TargetLaunch => "launching target",
            Stage::CompletionWait => "waiting for dump completion",
            Stage::Cleanup => "cleaning up",
        };
        f.write_str(name)
    }
}

/// Final result of one run. Cleanup has already happened by the time the
/// caller sees this.
#[derive(Debug)]
pub enum RunStatus {
    /// The dump completed; carries the number of collected files.
    Success(usize),
    /// The run was cancelled from outside.
    Cancelled,
    /// A stage failed; the game directory was still restored.
    Failed { stage: Stage, error: DumprunError },
}

impl RunStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, RunStatus::Success(_))
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Success(count) => write!(f, "completed with {count} collected files"),
            RunStatus::Cancelled => f.write_str("cancelled"),
            RunStatus::Failed { stage, error } => {
                write!(f, "failed while {stage}: {error}")
            }
        }
    }
}

/// Receives `(percentage, message)` updates as the run progresses.
pub trait ProgressSink: Send + Sync {
    fn progress(&self, percent: u8, message: &str);
}

/// Default sink: progress updates go to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn progress(&self, percent: u8, message: &str) {
        info!(percent, "{message}");
    }
}

/// Cooperative cancellation handle, cloneable across tasks.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    inner: Arc<CancelInner>,
}

#[derive(Debug, Default)]
struct CancelInner {
    flag: AtomicBool,
    notify: Notify,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.inner.flag.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.flag.load(Ordering::SeqCst)
    }

    /// Resolves once `cancel` has been called; immediately if it already
    /// was.
    pub async fn cancelled(&self) {
        // Register interest before checking the flag so a cancel landing in
        // between is not missed.
        let notified = self.inner.notify.notified();
        if self.is_cancelled() {
            return;
        }
        notified.await;
    }
}
