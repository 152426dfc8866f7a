// src/layout.rs

//! Fixed on-disk names and path helpers for the game directory.
//!
//! These names are part of the external interface and must not change:
//! the proxy loader, the helper process, and the injected library all
//! agree on them.

use std::path::{Path, PathBuf};

/// System library name replaced by the proxy.
pub const LIBRARY_NAME: &str = "version.dll";

/// Backup of whatever occupied the library path before install. Contains
/// either the original library bytes or the [`MARKER_TEXT`] sentinel.
pub const BACKUP_NAME: &str = "version_backup.dll";

/// Sentinel content recording "no original library existed here".
pub const MARKER_TEXT: &str = "REMOVE_ON_CLEANUP";

/// Proxy artifact produced during install.
pub const PROXY_NAME: &str = "version_proxy.dll";

/// Generated descriptor files accompanying the proxy.
pub const EXPORTS_ASM_NAME: &str = "version_exports.asm";
pub const MODULE_DEF_NAME: &str = "version.def";
pub const TEMP_CONFIG_NAME: &str = "config_temp.json";

/// Companion binary artifact the injected library drops next to the game.
pub const COMPANION_ARTIFACT: &str = "GameAssembly_dumped.dll";

/// Flag file the injected library writes into the dump directory when the
/// dump is complete.
pub const COMPLETION_FLAG: &str = "dump_complete.flag";

/// Environment variable communicating the game directory to the helper.
pub const HELPER_ENV_VAR: &str = "TLG_PATH";

/// Literal line the helper prints on stdout once injection is armed.
pub const READINESS_PHRASE: &str = "Now you can start umamusume.";

/// Candidate dump directories inside the game directory, highest priority
/// first. The game root itself is always appended as a last resort.
pub const CANDIDATE_DIR_NAMES: [&str; 3] = ["dump_output", "basic_dump", "dump"];

/// File names recognized as dump artifacts, used purely as completion
/// heuristics.
pub const KNOWN_ARTIFACT_NAMES: [&str; 11] = [
    "classes_dump.txt",
    "methods_dump.txt",
    "dump_summary.txt",
    "il2cpp_detailed_dump.txt",
    "detailed_summary.txt",
    "basic_dump.txt",
    "dump.txt",
    "summary.txt",
    "classes.txt",
    "methods.txt",
    "il2cpp.txt",
];

/// Resolved paths for one run: the game directory under takeover and the
/// resources directory the helper/proxy binaries ship in.
#[derive(Debug, Clone)]
pub struct GameLayout {
    pub game_dir: PathBuf,
    pub resources_dir: PathBuf,
    /// File name of the target executable inside `game_dir`.
    pub target_exe: String,
    /// File name of the helper executable inside `resources_dir`.
    pub helper_exe: String,
}

impl GameLayout {
    pub fn new(
        game_dir: impl Into<PathBuf>,
        resources_dir: impl Into<PathBuf>,
        target_exe: impl Into<String>,
        helper_exe: impl Into<String>,
    ) -> Self {
        Self {
            game_dir: game_dir.into(),
            resources_dir: resources_dir.into(),
            target_exe: target_exe.into(),
            helper_exe: helper_exe.into(),
        }
    }

    pub fn library_path(&self) -> PathBuf {
        self.game_dir.join(LIBRARY_NAME)
    }

    pub fn backup_path(&self) -> PathBuf {
        self.game_dir.join(BACKUP_NAME)
    }

    pub fn proxy_path(&self) -> PathBuf {
        self.game_dir.join(PROXY_NAME)
    }

    pub fn exports_asm_path(&self) -> PathBuf {
        self.game_dir.join(EXPORTS_ASM_NAME)
    }

    pub fn module_def_path(&self) -> PathBuf {
        self.game_dir.join(MODULE_DEF_NAME)
    }

    pub fn temp_config_path(&self) -> PathBuf {
        self.game_dir.join(TEMP_CONFIG_NAME)
    }

    pub fn companion_path(&self) -> PathBuf {
        self.game_dir.join(COMPANION_ARTIFACT)
    }

    pub fn target_exe_path(&self) -> PathBuf {
        self.game_dir.join(&self.target_exe)
    }

    /// Helper binary as shipped in the resources directory.
    pub fn helper_source_path(&self) -> PathBuf {
        self.resources_dir.join(&self.helper_exe)
    }

    /// Helper binary copied into the game directory for launch.
    pub fn helper_installed_path(&self) -> PathBuf {
        self.game_dir.join(&self.helper_exe)
    }

    /// Optional prebuilt proxy shipped in the resources directory.
    pub fn resources_library_path(&self) -> PathBuf {
        self.resources_dir.join(LIBRARY_NAME)
    }

    /// Candidate dump directories in priority order; the first populated
    /// one wins. The game root is always the last candidate.
    pub fn candidate_dirs(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = CANDIDATE_DIR_NAMES
            .iter()
            .map(|name| self.game_dir.join(name))
            .collect();
        dirs.push(self.game_dir.clone());
        dirs
    }

    /// Whether the given candidate is the game root (which must never be
    /// deleted during artifact cleanup).
    pub fn is_game_root(&self, dir: &Path) -> bool {
        dir == self.game_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_order_is_fixed() {
        let layout = GameLayout::new("/game", "/res", "game.exe", "helper.exe");
        let dirs = layout.candidate_dirs();
        assert_eq!(
            dirs,
            vec![
                PathBuf::from("/game/dump_output"),
                PathBuf::from("/game/basic_dump"),
                PathBuf::from("/game/dump"),
                PathBuf::from("/game"),
            ]
        );
        assert!(layout.is_game_root(&dirs[3]));
        assert!(!layout.is_game_root(&dirs[0]));
    }

    #[test]
    fn paths_are_rooted_in_the_right_directories() {
        let layout = GameLayout::new("/game", "/res", "game.exe", "helper.exe");
        assert_eq!(layout.library_path(), PathBuf::from("/game/version.dll"));
        assert_eq!(
            layout.backup_path(),
            PathBuf::from("/game/version_backup.dll")
        );
        assert_eq!(
            layout.helper_source_path(),
            PathBuf::from("/res/helper.exe")
        );
        assert_eq!(
            layout.helper_installed_path(),
            PathBuf::from("/game/helper.exe")
        );
        assert_eq!(layout.target_exe_path(), PathBuf::from("/game/game.exe"));
    }
}
