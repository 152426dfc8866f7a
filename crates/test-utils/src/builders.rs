#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use dumprun::config::Settings;
use dumprun::exec::HelperTiming;
use dumprun::fs::retry::RetrySettings;

/// Write a file, creating parent directories as needed.
pub fn write_file(path: &Path, contents: &[u8]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dirs");
    }
    fs::write(path, contents).expect("write file");
}

/// Write an executable `/bin/sh` script. Unix-only; process-spawning tests
/// are gated on `cfg(unix)`.
#[cfg(unix)]
pub fn write_script(path: &Path, body: &str) {
    use std::os::unix::fs::PermissionsExt;

    write_file(path, format!("#!/bin/sh\n{body}\n").as_bytes());
    let mut perms = fs::metadata(path).expect("script metadata").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms).expect("set script permissions");
}

/// Lays out a directory tree for tests (a game directory or a resources
/// directory) on the real filesystem, usually under a `tempfile::TempDir`.
pub struct DirBuilder {
    root: PathBuf,
}

impl DirBuilder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        fs::create_dir_all(&root).expect("create root dir");
        Self { root }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn with_file(self, relative: &str, contents: &[u8]) -> Self {
        write_file(&self.root.join(relative), contents);
        self
    }

    #[cfg(unix)]
    pub fn with_script(self, relative: &str, body: &str) -> Self {
        write_script(&self.root.join(relative), body);
        self
    }
}

/// Settings with short durations so integration tests finish quickly.
pub fn fast_settings() -> Settings {
    Settings {
        min_known_files: 1,
        retry: RetrySettings {
            attempts: 3,
            delay: Duration::from_millis(10),
        },
        helper: HelperTiming {
            readiness_timeout: Duration::from_secs(8),
            poll_interval: Duration::from_millis(20),
            ready_grace: Duration::from_millis(20),
        },
        target_settle: Duration::from_millis(50),
        poll_interval: Duration::from_millis(30),
        exit_grace: Duration::from_millis(150),
    }
}
