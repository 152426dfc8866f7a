// src/exec/helper.rs

//! Helper process supervisor.
//!
//! Runs the cooperating helper executable and waits for it to signal
//! readiness on stdout. A session ends in one of [`HelperState`]'s
//! outcomes, or in an error (timeout, failed exit, launch failure).
//!
//! Output capture runs concurrently with the wait loop; the two share the
//! session record (an atomic readiness flag plus the collected lines), so
//! readiness, exit, and timeout are all observed promptly.

use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

use crate::errors::{DumprunError, Result};
use crate::fs::retry::FileOps;
use crate::layout::{GameLayout, HELPER_ENV_VAR, READINESS_PHRASE};

use super::probe::ProcessProbe;

/// Timing knobs for the readiness wait.
#[derive(Debug, Clone, Copy)]
pub struct HelperTiming {
    /// Wall-clock bound on the whole readiness wait.
    pub readiness_timeout: Duration,
    /// Interval between session-state polls.
    pub poll_interval: Duration,
    /// Extra wait for trailing output after readiness is observed.
    pub ready_grace: Duration,
}

impl Default for HelperTiming {
    fn default() -> Self {
        Self {
            readiness_timeout: Duration::from_secs(120),
            poll_interval: Duration::from_millis(100),
            ready_grace: Duration::from_secs(1),
        }
    }
}

/// Successful terminal states of one helper session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelperState {
    /// The readiness phrase was observed (or an instance was already
    /// running system-wide).
    ReadySignaled,
    /// The helper exited cleanly before signaling readiness.
    Exited,
}

/// Shared between the wait loop and the stdout reader task.
#[derive(Debug, Default)]
struct HelperSession {
    ready: AtomicBool,
    lines: Mutex<Vec<String>>,
}

/// Successful result of [`HelperSupervisor::ensure_ready`].
///
/// Carries the spawned child (if one was spawned) so the orchestrator can
/// terminate any leftover helper during final cleanup; the helper stays
/// alive while the target runs.
#[derive(Debug)]
pub struct HelperOutcome {
    pub state: HelperState,
    pub child: Option<Child>,
}

pub struct HelperSupervisor {
    layout: GameLayout,
    ops: FileOps,
    probe: Arc<dyn ProcessProbe>,
    timing: HelperTiming,
}

impl HelperSupervisor {
    pub fn new(
        layout: GameLayout,
        ops: FileOps,
        probe: Arc<dyn ProcessProbe>,
        timing: HelperTiming,
    ) -> Self {
        Self {
            layout,
            ops,
            probe,
            timing,
        }
    }

    /// Whether an output line carries the readiness signal.
    pub fn is_readiness_line(line: &str) -> bool {
        line.contains(READINESS_PHRASE)
    }

    /// Run the helper until it signals readiness, exits cleanly, or times
    /// out.
    ///
    /// If an instance of the helper is already running system-wide, launch
    /// is skipped and the session is reported ready immediately: a running
    /// helper is assumed to have armed the injection already.
    pub async fn ensure_ready(&self) -> Result<HelperOutcome> {
        if self.probe.is_running(&self.layout.helper_exe) {
            info!(
                helper = %self.layout.helper_exe,
                "helper already running; skipping launch"
            );
            return Ok(HelperOutcome {
                state: HelperState::ReadySignaled,
                child: None,
            });
        }

        self.stage_binaries().await?;

        let mut child = self.spawn()?;
        let session = Arc::new(HelperSession::default());
        self.attach_output_readers(&mut child, &session);

        let state = self.wait_for_readiness(&mut child, &session).await?;
        Ok(HelperOutcome {
            state,
            child: Some(child),
        })
    }

    /// Copy the helper binary (and a prebuilt proxy library, if the
    /// resources directory ships one) into the game directory.
    async fn stage_binaries(&self) -> Result<()> {
        let src = self.layout.helper_source_path();
        if !self.ops.fs().is_file(&src) {
            return Err(DumprunError::NotFound(format!(
                "helper executable {:?}",
                src
            )));
        }

        self.ops
            .replace(&src, &self.layout.helper_installed_path())
            .await?;
        info!(helper = %self.layout.helper_exe, "copied helper into game directory");

        let resources_library = self.layout.resources_library_path();
        if self.ops.fs().is_file(&resources_library) {
            // Prebuilt proxy refresh is best-effort, like the rest of the
            // library juggling around a possibly-running game.
            match self
                .ops
                .replace(&resources_library, &self.layout.library_path())
                .await
            {
                Ok(()) => info!("refreshed proxy library from resources"),
                Err(err) => {
                    warn!(error = %err, "could not refresh proxy library from resources");
                }
            }
        }

        Ok(())
    }

    fn spawn(&self) -> Result<Child> {
        let exe = self.layout.helper_installed_path();
        info!(?exe, "starting helper process");

        Command::new(&exe)
            .current_dir(&self.layout.game_dir)
            .env(HELPER_ENV_VAR, &self.layout.game_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| DumprunError::LaunchFailed {
                name: self.layout.helper_exe.clone(),
                source,
            })
    }

    fn attach_output_readers(&self, child: &mut Child, session: &Arc<HelperSession>) {
        if let Some(stdout) = child.stdout.take() {
            let session = Arc::clone(session);
            tokio::spawn(async move {
                let reader = BufReader::new(stdout);
                let mut lines = reader.lines();

                while let Ok(Some(line)) = lines.next_line().await {
                    info!("[helper] {}", line);
                    if Self::is_readiness_line(&line) {
                        session.ready.store(true, Ordering::SeqCst);
                    }
                    session.lines.lock().unwrap().push(line);
                }

                debug!("helper stdout closed");
            });
        }

        // Always consume stderr so buffers don't fill; never parsed for
        // control signals.
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let reader = BufReader::new(stderr);
                let mut lines = reader.lines();

                while let Ok(Some(line)) = lines.next_line().await {
                    warn!("[helper-err] {}", line);
                }
            });
        }
    }

    async fn wait_for_readiness(
        &self,
        child: &mut Child,
        session: &Arc<HelperSession>,
    ) -> Result<HelperState> {
        let started = Instant::now();

        loop {
            if session.ready.load(Ordering::SeqCst) {
                info!("helper signaled readiness");
                // Give trailing output a moment before moving on.
                sleep(self.timing.ready_grace).await;
                return Ok(HelperState::ReadySignaled);
            }

            if let Some(status) = child.try_wait().map_err(anyhow::Error::from)? {
                // The exit can be observed before the reader task has
                // drained the last stdout lines; give them a moment, then
                // let readiness take precedence over the exit code.
                sleep(self.timing.ready_grace).await;
                if session.ready.load(Ordering::SeqCst) {
                    info!("helper signaled readiness");
                    return Ok(HelperState::ReadySignaled);
                }
                let code = status.code().unwrap_or(-1);
                return if status.success() {
                    info!("helper completed successfully");
                    Ok(HelperState::Exited)
                } else {
                    Err(DumprunError::HelperFailed(code))
                };
            }

            if started.elapsed() > self.timing.readiness_timeout {
                warn!("timed out waiting for helper readiness; terminating it");
                if let Err(err) = child.kill().await {
                    warn!(error = %err, "could not terminate timed-out helper");
                }
                return Err(DumprunError::Timeout);
            }

            sleep(self.timing.poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readiness_line_matching_is_substring_based() {
        assert!(HelperSupervisor::is_readiness_line(
            "Now you can start umamusume."
        ));
        assert!(HelperSupervisor::is_readiness_line(
            "[init] Now you can start umamusume. (armed)"
        ));
        assert!(!HelperSupervisor::is_readiness_line("now you can start"));
        assert!(!HelperSupervisor::is_readiness_line(""));
    }
}
