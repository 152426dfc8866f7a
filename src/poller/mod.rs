// src/poller/mod.rs

//! Completion poller.
//!
//! Watches the candidate dump directories while the target process runs,
//! decides when enough evidence has accumulated, and then collects the
//! artifacts into the configured destination.

pub mod evidence;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::errors::{DumprunError, Result};
use crate::exec::target::TargetHandle;
use crate::fs::FileSystem;
use crate::fs::retry::FileOps;
use crate::layout::{COMPANION_ARTIFACT, GameLayout};

pub use evidence::{CompletionEvidence, candidate_files, first_populated_candidate, gather_evidence};

/// Poll loop knobs.
#[derive(Debug, Clone, Copy)]
pub struct PollSettings {
    /// Sleep between evidence scans.
    pub interval: Duration,
    /// Grace period for the target to self-terminate after completion
    /// evidence is seen (the injected library is expected to kill it).
    pub exit_grace: Duration,
    /// Minimum recognized artifact names for heuristic completion.
    pub min_known_files: usize,
}

pub struct CompletionPoller {
    fs: Arc<dyn FileSystem>,
    ops: FileOps,
    layout: GameLayout,
    out_dir: PathBuf,
    settings: PollSettings,
}

impl CompletionPoller {
    pub fn new(ops: FileOps, layout: GameLayout, out_dir: PathBuf, settings: PollSettings) -> Self {
        Self {
            fs: Arc::clone(ops.fs()),
            ops,
            layout,
            out_dir,
            settings,
        }
    }

    /// Poll until completion evidence appears or the target exits, make
    /// sure the target is gone, then copy artifacts out.
    ///
    /// Returns the number of files placed in the destination, or
    /// `NoArtifactsFound` if no candidate directory was populated.
    pub async fn wait_and_collect<T: TargetHandle>(&self, target: &mut T) -> Result<usize> {
        self.wait_for_evidence(target).await;
        self.ensure_target_stopped(target).await;
        self.collect_artifacts().await
    }

    async fn wait_for_evidence<T: TargetHandle>(&self, target: &mut T) {
        info!("waiting for the target to produce dump artifacts");

        while !target.has_exited() {
            sleep(self.settings.interval).await;

            let Some(dir) = first_populated_candidate(self.fs.as_ref(), &self.layout) else {
                continue;
            };

            let evidence = gather_evidence(self.fs.as_ref(), &self.layout, &dir);
            let companion_present = self.fs.is_file(&self.layout.companion_path());
            debug!(
                directory = ?evidence.directory,
                files = evidence.file_count,
                known = evidence.matched_known_names.len(),
                flag = evidence.flag_file_present,
                companion = companion_present,
                "evidence scan"
            );

            if evidence.is_complete(companion_present, self.settings.min_known_files) {
                info!(
                    directory = ?evidence.directory,
                    files = evidence.file_count,
                    "dump completion detected"
                );
                return;
            }
        }

        info!("target exited before completion evidence was found");
    }

    /// If the target is still alive, give it the grace period to
    /// self-terminate, then force-terminate.
    async fn ensure_target_stopped<T: TargetHandle>(&self, target: &mut T) {
        if target.has_exited() {
            return;
        }

        info!("waiting for the injected library to terminate the target");
        sleep(self.settings.exit_grace).await;

        if !target.has_exited() {
            warn!("target still running after grace period; terminating");
            target.terminate().await;
        }
    }

    async fn collect_artifacts(&self) -> Result<usize> {
        let Some(source) = first_populated_candidate(self.fs.as_ref(), &self.layout) else {
            warn!("no dump artifacts found in any candidate directory");
            return Err(DumprunError::NoArtifactsFound);
        };

        let files = candidate_files(self.fs.as_ref(), &self.layout, &source);
        info!(?source, count = files.len(), "copying dump artifacts");

        let mut copied = 0usize;
        for file in &files {
            let relative = file
                .strip_prefix(&source)
                .map_err(anyhow::Error::from)?;
            self.ops.copy(file, &self.out_dir.join(relative)).await?;
            copied += 1;
        }

        // When the root was the candidate, the companion is already among
        // its files; don't copy or count it twice.
        let companion = self.layout.companion_path();
        if self.fs.is_file(&companion) && !files.contains(&companion) {
            self.ops
                .copy(&companion, &self.out_dir.join(COMPANION_ARTIFACT))
                .await?;
            copied += 1;
            info!("copied companion artifact");
        }

        // Best-effort removal of the emptied dump directory. The game root
        // is never deleted, even when it served as the candidate.
        if !self.layout.is_game_root(&source) {
            match self.fs.remove_dir_all(&source) {
                Ok(()) => debug!(?source, "removed source dump directory"),
                Err(err) => warn!(?source, error = %err, "could not remove source dump directory"),
            }
        }

        info!(copied, out_dir = ?self.out_dir, "artifact collection finished");
        Ok(copied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;
    use crate::fs::retry::RetrySettings;
    use crate::layout::GameLayout;
    use std::path::Path;

    /// Scripted stand-in for the target process: exits after a fixed
    /// number of `has_exited` polls.
    struct ScriptedTarget {
        polls_until_exit: usize,
        terminated: bool,
    }

    impl ScriptedTarget {
        fn exits_after(polls: usize) -> Self {
            Self {
                polls_until_exit: polls,
                terminated: false,
            }
        }
    }

    impl TargetHandle for ScriptedTarget {
        fn has_exited(&mut self) -> bool {
            if self.terminated || self.polls_until_exit == 0 {
                return true;
            }
            self.polls_until_exit -= 1;
            false
        }

        async fn terminate(&mut self) {
            self.terminated = true;
        }
    }

    fn poller(fs: &MockFileSystem, min_known_files: usize) -> CompletionPoller {
        let ops = FileOps::new(
            Arc::new(fs.clone()),
            RetrySettings {
                attempts: 3,
                delay: Duration::from_millis(1),
            },
        );
        CompletionPoller::new(
            ops,
            GameLayout::new("/game", "/res", "game.exe", "helper.exe"),
            PathBuf::from("/out"),
            PollSettings {
                interval: Duration::from_millis(1),
                exit_grace: Duration::from_millis(1),
                min_known_files,
            },
        )
    }

    #[tokio::test]
    async fn collects_single_known_file_and_removes_source_dir() {
        let fs = MockFileSystem::new();
        fs.add_file("/game/dump/summary.txt", b"done".to_vec());

        let mut target = ScriptedTarget::exits_after(2);
        let copied = poller(&fs, 1).wait_and_collect(&mut target).await.unwrap();

        assert_eq!(copied, 1);
        assert_eq!(fs.read(Path::new("/out/summary.txt")).unwrap(), b"done");
        assert!(!fs.exists(Path::new("/game/dump")));
    }

    #[tokio::test]
    async fn preserves_relative_paths_and_copies_companion() {
        let fs = MockFileSystem::new();
        fs.add_file("/game/dump_output/classes_dump.txt", b"c".to_vec());
        fs.add_file("/game/dump_output/nested/methods.bin", b"m".to_vec());
        fs.add_file("/game/GameAssembly_dumped.dll", b"ga".to_vec());

        let mut target = ScriptedTarget::exits_after(0);
        let copied = poller(&fs, 1).wait_and_collect(&mut target).await.unwrap();

        assert_eq!(copied, 3);
        assert!(fs.is_file(Path::new("/out/classes_dump.txt")));
        assert!(fs.is_file(Path::new("/out/nested/methods.bin")));
        assert!(fs.is_file(Path::new("/out/GameAssembly_dumped.dll")));
    }

    #[tokio::test]
    async fn no_artifacts_after_target_exit_is_an_error() {
        let fs = MockFileSystem::new();
        fs.add_dir("/game");

        let mut target = ScriptedTarget::exits_after(1);
        let err = poller(&fs, 1)
            .wait_and_collect(&mut target)
            .await
            .unwrap_err();
        assert!(matches!(err, DumprunError::NoArtifactsFound));
    }

    #[tokio::test]
    async fn unrecognized_files_do_not_complete_until_target_exits() {
        let fs = MockFileSystem::new();
        // Populated candidate, but nothing recognizable and no flag.
        fs.add_file("/game/dump/strange.bin", b"?".to_vec());

        let mut target = ScriptedTarget::exits_after(3);
        // Completes only because the target eventually exits; the copy
        // phase still picks the populated directory up.
        let copied = poller(&fs, 1).wait_and_collect(&mut target).await.unwrap();
        assert_eq!(copied, 1);
        assert!(fs.is_file(Path::new("/out/strange.bin")));
    }

    #[tokio::test]
    async fn stubborn_target_is_force_terminated_after_grace() {
        let fs = MockFileSystem::new();
        fs.add_file("/game/dump/dump_complete.flag", b"".to_vec());
        fs.add_file("/game/dump/summary.txt", b"s".to_vec());

        // Never exits on its own.
        let mut target = ScriptedTarget::exits_after(usize::MAX);
        let copied = poller(&fs, 1).wait_and_collect(&mut target).await.unwrap();

        assert!(target.terminated);
        assert_eq!(copied, 2);
    }

    #[tokio::test]
    async fn companion_as_the_only_output_is_still_collected() {
        let fs = MockFileSystem::new();
        // The injected library dropped only the companion binary next to
        // the game; no dump directory, no recognized text artifacts.
        fs.add_file("/game/game.exe", b"x".to_vec());
        fs.add_file("/game/GameAssembly_dumped.dll", b"ga".to_vec());

        let mut target = ScriptedTarget::exits_after(usize::MAX);
        let copied = poller(&fs, 1).wait_and_collect(&mut target).await.unwrap();

        // Copied and counted exactly once.
        assert_eq!(copied, 1);
        assert_eq!(
            fs.read(Path::new("/out/GameAssembly_dumped.dll")).unwrap(),
            b"ga"
        );
        assert!(fs.is_dir(Path::new("/game")));
    }

    #[tokio::test]
    async fn game_root_candidate_is_copied_but_never_deleted() {
        let fs = MockFileSystem::new();
        fs.add_file("/game/summary.txt", b"s".to_vec());

        let mut target = ScriptedTarget::exits_after(1);
        let copied = poller(&fs, 1).wait_and_collect(&mut target).await.unwrap();

        assert_eq!(copied, 1);
        assert!(fs.is_dir(Path::new("/game")));
        assert!(fs.is_file(Path::new("/game/summary.txt")));
    }
}
