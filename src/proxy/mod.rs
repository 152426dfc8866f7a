// src/proxy/mod.rs

//! Proxy library manager.
//!
//! Replaces the system library in the game directory with a forwarding
//! proxy while keeping the original state recoverable:
//!
//! - If a library already occupied the target path, it is copied to a
//!   backup and restored on cleanup.
//! - If nothing occupied the target path, a marker file records that the
//!   installed library must simply be removed on cleanup.
//!
//! At most one of {real backup, marker} exists at any time. `restore()` is
//! idempotent and best-effort: each step logs its own failure and the
//! remaining steps still run, so a crash in one step never leaves the game
//! directory permanently broken. A `Drop` fallback runs the same cleanup
//! if the orchestrator never reached its restore call.

pub mod exports;

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::errors::{DumprunError, Result};
use crate::fs::FileSystem;
use crate::fs::retry::FileOps;
use crate::layout::{GameLayout, MARKER_TEXT};
use crate::proxy::exports::{
    TEMP_CONFIG_JSON, VERSION_EXPORTS, assembly_exports, module_definition,
};

/// The original system library, held for the duration of one install
/// session. Owning this is what "loading" means here: the bytes back the
/// proxy artifact and the export table drives descriptor generation.
#[derive(Debug)]
struct LoadedLibrary {
    path: PathBuf,
    bytes: Vec<u8>,
    exports: &'static [&'static str],
}

/// What the backup file records about the pre-install state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallState {
    /// A real library existed and was copied to the backup path.
    RealBackup,
    /// Nothing existed; the backup path holds a removal marker.
    Marker,
}

/// Installs and removes the proxy library, owning the loaded original and
/// the backup state for exactly one session.
#[derive(Debug)]
pub struct ProxyManager {
    fs: Arc<dyn FileSystem>,
    ops: FileOps,
    layout: GameLayout,
    system_library: PathBuf,
    loaded: Option<LoadedLibrary>,
    state: Option<InstallState>,
    restored: bool,
}

impl ProxyManager {
    pub fn new(ops: FileOps, layout: GameLayout, system_library: PathBuf) -> Self {
        Self {
            fs: Arc::clone(ops.fs()),
            ops,
            layout,
            system_library,
            loaded: None,
            state: None,
            restored: false,
        }
    }

    /// Backup state established by the last `install()`, if any.
    pub fn install_state(&self) -> Option<InstallState> {
        self.state
    }

    /// Install the proxy into the game directory.
    ///
    /// Fails with `NotFound` if the original system library is absent and
    /// `LoadFailed` if it cannot be read. Descriptor-file failures are
    /// downgraded to warnings; the backup and the final copy into the
    /// target path are fatal.
    pub async fn install(&mut self) -> Result<()> {
        if self.state.is_some() {
            return Err(DumprunError::Config(
                "proxy is already installed in this session".to_string(),
            ));
        }

        let loaded = self.load_original()?;
        self.write_proxy_artifacts(&loaded)?;
        self.loaded = Some(loaded);
        self.backup_current().await?;

        let proxy = self.layout.proxy_path();
        let library = self.layout.library_path();
        self.ops.copy(&proxy, &library).await?;
        info!(?library, "proxy library installed");

        Ok(())
    }

    fn load_original(&self) -> Result<LoadedLibrary> {
        if !self.fs.is_file(&self.system_library) {
            return Err(DumprunError::NotFound(format!(
                "original system library {:?}",
                self.system_library
            )));
        }

        let bytes = self
            .fs
            .read(&self.system_library)
            .map_err(|_| DumprunError::LoadFailed(self.system_library.clone()))?;
        if bytes.is_empty() {
            return Err(DumprunError::LoadFailed(self.system_library.clone()));
        }

        info!(
            path = ?self.system_library,
            exports = VERSION_EXPORTS.len(),
            "loaded original library and resolved its entry points"
        );

        Ok(LoadedLibrary {
            path: self.system_library.clone(),
            bytes,
            exports: &VERSION_EXPORTS,
        })
    }

    fn write_proxy_artifacts(&self, loaded: &LoadedLibrary) -> Result<()> {
        // The proxy stands in for a compiled forwarding shim; its bytes are
        // the original's so every forwarded call resolves.
        let proxy = self.layout.proxy_path();
        self.fs
            .write(&proxy, &loaded.bytes)
            .map_err(DumprunError::Other)?;
        debug!(?proxy, source = ?loaded.path, "wrote proxy artifact");

        for (path, contents) in [
            (
                self.layout.module_def_path(),
                module_definition(loaded.exports),
            ),
            (
                self.layout.exports_asm_path(),
                assembly_exports(loaded.exports),
            ),
            (
                self.layout.temp_config_path(),
                TEMP_CONFIG_JSON.to_string(),
            ),
        ] {
            if let Err(err) = self.fs.write(&path, contents.as_bytes()) {
                warn!(?path, error = %err, "could not write descriptor file");
            } else {
                debug!(?path, "wrote descriptor file");
            }
        }

        Ok(())
    }

    async fn backup_current(&mut self) -> Result<()> {
        let library = self.layout.library_path();
        let backup = self.layout.backup_path();

        if self.fs.is_file(&library) {
            self.ops.copy(&library, &backup).await?;
            info!(?backup, "backed up existing library");
            self.state = Some(InstallState::RealBackup);
        } else {
            self.fs
                .write(&backup, MARKER_TEXT.as_bytes())
                .map_err(DumprunError::Other)?;
            info!(?backup, "created backup marker (no original library present)");
            self.state = Some(InstallState::Marker);
        }

        Ok(())
    }

    /// Restore the game directory to its pre-install state.
    ///
    /// Idempotent; consumes the install state. Every step is best-effort
    /// and failures are logged as warnings, never escalated.
    pub fn restore(&mut self) {
        if self.restored {
            return;
        }
        self.restored = true;

        let library = self.layout.library_path();
        let backup = self.layout.backup_path();

        if self.fs.is_file(&backup) {
            // Whether the backup is a marker is decided by its content, so
            // restore also recovers from a previous crashed run.
            match self.fs.read(&backup) {
                Ok(content) if content == MARKER_TEXT.as_bytes() => {
                    self.remove_logged(&backup, "backup marker");
                    self.remove_logged(&library, "installed library");
                }
                Ok(_) => {
                    self.remove_logged(&library, "installed library");
                    match self.fs.rename(&backup, &library) {
                        Ok(()) => info!(?library, "restored original library"),
                        Err(err) => {
                            warn!(?backup, error = %err, "could not move backup into place");
                        }
                    }
                }
                Err(err) => {
                    warn!(?backup, error = %err, "could not read backup; leaving it in place");
                }
            }
        }

        for (path, what) in [
            (self.layout.proxy_path(), "proxy artifact"),
            (self.layout.exports_asm_path(), "assembly exports"),
            (self.layout.module_def_path(), "module definition"),
            (self.layout.temp_config_path(), "transient config"),
        ] {
            self.remove_logged(&path, what);
        }

        if self.loaded.take().is_some() {
            debug!("released original library handle");
        }
        self.state = None;

        info!("proxy cleanup completed");
    }

    fn remove_logged(&self, path: &std::path::Path, what: &str) {
        if !self.fs.exists(path) {
            return;
        }
        match self.fs.remove_file(path) {
            Ok(()) => debug!(?path, "removed {what}"),
            Err(err) => warn!(?path, error = %err, "could not remove {what}"),
        }
    }
}

impl Drop for ProxyManager {
    fn drop(&mut self) {
        // Last-resort cleanup for exit paths that never reached restore().
        if !self.restored && self.state.is_some() {
            warn!("proxy manager dropped without restore; running cleanup");
            self.restore();
        }
    }
}
