// src/engine/orchestrator.rs

//! Drives one full run through its stages and guarantees cleanup.
//!
//! Stage order: proxy install → helper readiness → target launch →
//! completion wait → cleanup. Whatever way the run ends (success, stage
//! failure, cancellation), cleanup runs: the target is terminated, any
//! helper we spawned is killed, the proxy install is reverted, and
//! transient binaries are removed from the game directory.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::Settings;
use crate::exec::{
    HelperOutcome, HelperSupervisor, ProcessProbe, TargetHandle, TargetSupervisor,
};
use crate::fs::retry::FileOps;
use crate::layout::GameLayout;
use crate::poller::{CompletionPoller, PollSettings};
use crate::proxy::ProxyManager;

use super::{CancelFlag, ProgressSink, RunStatus, Stage};

pub struct Orchestrator {
    ops: FileOps,
    layout: GameLayout,
    out_dir: PathBuf,
    system_library: PathBuf,
    settings: Settings,
    probe: Arc<dyn ProcessProbe>,
    progress: Arc<dyn ProgressSink>,
    cancel: CancelFlag,
}

impl Orchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ops: FileOps,
        layout: GameLayout,
        out_dir: PathBuf,
        system_library: PathBuf,
        settings: Settings,
        probe: Arc<dyn ProcessProbe>,
        progress: Arc<dyn ProgressSink>,
        cancel: CancelFlag,
    ) -> Self {
        Self {
            ops,
            layout,
            out_dir,
            system_library,
            settings,
            probe,
            progress,
            cancel,
        }
    }

    /// Run all stages to completion. Never returns early without cleanup.
    pub async fn run(self) -> RunStatus {
        let mut proxy = ProxyManager::new(
            self.ops.clone(),
            self.layout.clone(),
            self.system_library.clone(),
        );
        let mut helper: Option<HelperOutcome> = None;
        let mut target = TargetSupervisor::new(self.layout.clone(), self.settings.target_settle);

        let status = tokio::select! {
            status = self.drive(&mut proxy, &mut helper, &mut target) => status,
            _ = self.cancel.cancelled() => {
                info!("cancellation requested");
                RunStatus::Cancelled
            }
        };

        self.stage(Stage::Cleanup);
        self.cleanup(&mut proxy, helper, &mut target).await;

        self.progress.progress(100, &status.to_string());
        info!(%status, "run finished");
        status
    }

    fn stage(&self, stage: Stage) {
        self.progress.progress(stage.percent(), &stage.to_string());
    }

    async fn drive(
        &self,
        proxy: &mut ProxyManager,
        helper: &mut Option<HelperOutcome>,
        target: &mut TargetSupervisor,
    ) -> RunStatus {
        self.stage(Stage::ProxyInstall);
        if let Err(error) = proxy.install().await {
            return RunStatus::Failed {
                stage: Stage::ProxyInstall,
                error,
            };
        }

        self.stage(Stage::HelperReadiness);
        match self.helper_supervisor().ensure_ready().await {
            Ok(outcome) => *helper = Some(outcome),
            Err(error) => {
                return RunStatus::Failed {
                    stage: Stage::HelperReadiness,
                    error,
                };
            }
        }

        self.stage(Stage::TargetLaunch);
        if let Err(error) = target.launch().await {
            return RunStatus::Failed {
                stage: Stage::TargetLaunch,
                error,
            };
        }

        self.stage(Stage::CompletionWait);
        match self.poller().wait_and_collect(target).await {
            Ok(count) => RunStatus::Success(count),
            Err(error) => RunStatus::Failed {
                stage: Stage::CompletionWait,
                error,
            },
        }
    }

    fn helper_supervisor(&self) -> HelperSupervisor {
        HelperSupervisor::new(
            self.layout.clone(),
            self.ops.clone(),
            Arc::clone(&self.probe),
            self.settings.helper,
        )
    }

    fn poller(&self) -> CompletionPoller {
        CompletionPoller::new(
            self.ops.clone(),
            self.layout.clone(),
            self.out_dir.clone(),
            PollSettings {
                interval: self.settings.poll_interval,
                exit_grace: self.settings.exit_grace,
                min_known_files: self.settings.min_known_files,
            },
        )
    }

    /// Best-effort teardown; every step runs even when earlier ones fail.
    async fn cleanup(
        &self,
        proxy: &mut ProxyManager,
        helper: Option<HelperOutcome>,
        target: &mut TargetSupervisor,
    ) {
        target.terminate().await;

        if let Some(outcome) = helper {
            if let Some(mut child) = outcome.child {
                match child.kill().await {
                    Ok(()) => info!("helper process terminated"),
                    Err(err) => warn!(error = %err, "could not terminate helper process"),
                }
            }
        }

        proxy.restore();

        // The helper binary and the companion artifact are transient; they
        // do not belong in the game directory after the run.
        for path in [
            self.layout.helper_installed_path(),
            self.layout.companion_path(),
        ] {
            if let Err(err) = self.ops.delete(&path).await {
                warn!(?path, error = %err, "could not remove transient file");
            }
        }
    }
}
