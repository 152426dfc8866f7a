// src/exec/target.rs

//! Target process supervisor.

use std::process::Stdio;
use std::time::Duration;

use tokio::process::{Child, Command};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::errors::{DumprunError, Result};
use crate::layout::GameLayout;

/// Exit observation and termination, as the completion poller needs them.
/// Implemented by [`TargetSupervisor`] in production and by scripted fakes
/// in tests.
pub trait TargetHandle: Send {
    fn has_exited(&mut self) -> bool;
    fn terminate(&mut self) -> impl Future<Output = ()> + Send;
}

/// Owns the target process for one run.
#[derive(Debug)]
pub struct TargetSupervisor {
    layout: GameLayout,
    settle: Duration,
    child: Option<Child>,
    exit_code: Option<i32>,
}

impl TargetSupervisor {
    pub fn new(layout: GameLayout, settle: Duration) -> Self {
        Self {
            layout,
            settle,
            child: None,
            exit_code: None,
        }
    }

    /// Launch the target executable with the game directory as its working
    /// directory, then confirm it did not exit during the settle window.
    pub async fn launch(&mut self) -> Result<()> {
        let exe = self.layout.target_exe_path();
        if !exe.is_file() {
            return Err(DumprunError::NotFound(format!(
                "target executable {:?}",
                exe
            )));
        }

        info!(?exe, "launching target process");

        let child = Command::new(&exe)
            .current_dir(&self.layout.game_dir)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| DumprunError::LaunchFailed {
                name: self.layout.target_exe.clone(),
                source,
            })?;

        let pid = child.id();
        self.child = Some(child);

        sleep(self.settle).await;

        if self.has_exited() {
            let code = self.exit_code.unwrap_or(-1);
            return Err(DumprunError::ImmediateExit {
                name: self.layout.target_exe.clone(),
                code,
            });
        }

        info!(?pid, "target process started");
        Ok(())
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }
}

impl TargetHandle for TargetSupervisor {
    fn has_exited(&mut self) -> bool {
        if self.exit_code.is_some() {
            return true;
        }
        let Some(child) = self.child.as_mut() else {
            return true;
        };
        match child.try_wait() {
            Ok(Some(status)) => {
                let code = status.code().unwrap_or(-1);
                debug!(code, "target process exited");
                self.exit_code = Some(code);
                true
            }
            Ok(None) => false,
            Err(err) => {
                // Can't observe the process anymore; treat it as gone.
                warn!(error = %err, "could not poll target process; assuming exited");
                self.exit_code = Some(-1);
                true
            }
        }
    }

    /// Idempotent; errors from a process that exited between the check and
    /// the kill call are swallowed.
    async fn terminate(&mut self) {
        if self.has_exited() {
            return;
        }
        let Some(child) = self.child.as_mut() else {
            return;
        };
        match child.kill().await {
            Ok(()) => info!("target process terminated"),
            Err(err) => warn!(error = %err, "could not terminate target process"),
        }
        if let Ok(Some(status)) = child.try_wait() {
            self.exit_code = Some(status.code().unwrap_or(-1));
        }
    }
}
