// src/poller/evidence.rs

//! Completion evidence gathered from the candidate dump directories.
//!
//! The injected library gives no direct completion signal, so completion
//! is inferred from filesystem-observable facts: a flag file, a companion
//! binary artifact next to the game, or enough recognized artifact names.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::fs::FileSystem;
use crate::layout::{COMPANION_ARTIFACT, COMPLETION_FLAG, GameLayout, KNOWN_ARTIFACT_NAMES};

/// Snapshot of one candidate directory, derived fresh on every poll tick.
#[derive(Debug, Clone)]
pub struct CompletionEvidence {
    pub directory: PathBuf,
    /// Files attributed to the dump in this directory.
    pub file_count: usize,
    /// Recognized artifact names present at the directory root.
    pub matched_known_names: BTreeSet<String>,
    pub flag_file_present: bool,
}

impl CompletionEvidence {
    /// Whether this evidence is enough to call the run complete.
    ///
    /// `companion_present` is checked against the game root, not the
    /// candidate; `min_known_files` is the profile threshold.
    pub fn is_complete(&self, companion_present: bool, min_known_files: usize) -> bool {
        self.flag_file_present
            || companion_present
            || self.matched_known_names.len() >= min_known_files
    }
}

/// Files in `dir` attributed to the dump.
///
/// Dedicated dump directories own everything under them, recursively. The
/// game root doubles as a last-resort candidate but always contains the
/// game's own files (and our installed proxy), so only recognized artifact
/// names, the flag file, and the companion artifact count there.
pub fn candidate_files(
    fs: &dyn FileSystem,
    layout: &GameLayout,
    dir: &Path,
) -> Vec<PathBuf> {
    if layout.is_game_root(dir) {
        KNOWN_ARTIFACT_NAMES
            .iter()
            .chain([&COMPLETION_FLAG, &COMPANION_ARTIFACT])
            .map(|name| dir.join(name))
            .filter(|path| fs.is_file(path))
            .collect()
    } else {
        fs.walk_files(dir).unwrap_or_default()
    }
}

/// First candidate directory (priority order) with at least one dump file.
pub fn first_populated_candidate(
    fs: &dyn FileSystem,
    layout: &GameLayout,
) -> Option<PathBuf> {
    layout
        .candidate_dirs()
        .into_iter()
        .find(|dir| fs.is_dir(dir) && !candidate_files(fs, layout, dir).is_empty())
}

/// Gather evidence for one candidate directory.
pub fn gather_evidence(
    fs: &dyn FileSystem,
    layout: &GameLayout,
    directory: &Path,
) -> CompletionEvidence {
    let file_count = candidate_files(fs, layout, directory).len();

    let matched_known_names: BTreeSet<String> = KNOWN_ARTIFACT_NAMES
        .iter()
        .filter(|name| fs.is_file(&directory.join(name)))
        .map(|name| name.to_string())
        .collect();

    let flag_file_present = fs.is_file(&directory.join(COMPLETION_FLAG));

    CompletionEvidence {
        directory: directory.to_path_buf(),
        file_count,
        matched_known_names,
        flag_file_present,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn layout() -> GameLayout {
        GameLayout::new("/game", "/res", "game.exe", "helper.exe")
    }

    #[test]
    fn priority_prefers_dump_output_over_everything() {
        let fs = MockFileSystem::new();
        fs.add_file("/game/dump/a.txt", b"a".to_vec());
        fs.add_file("/game/dump_output/b.txt", b"b".to_vec());
        fs.add_file("/game/summary.txt", b"s".to_vec());

        let found = first_populated_candidate(&fs, &layout()).unwrap();
        assert_eq!(found, PathBuf::from("/game/dump_output"));
    }

    #[test]
    fn dump_dir_beats_the_game_root() {
        let fs = MockFileSystem::new();
        fs.add_file("/game/dump/summary.txt", b"s".to_vec());
        fs.add_file("/game/summary.txt", b"s".to_vec());

        let found = first_populated_candidate(&fs, &layout()).unwrap();
        assert_eq!(found, PathBuf::from("/game/dump"));
    }

    #[test]
    fn empty_candidate_dirs_are_skipped() {
        let fs = MockFileSystem::new();
        fs.add_dir("/game/dump_output");
        fs.add_file("/game/dump/a.txt", b"a".to_vec());

        let found = first_populated_candidate(&fs, &layout()).unwrap();
        assert_eq!(found, PathBuf::from("/game/dump"));
    }

    #[test]
    fn game_files_at_the_root_are_not_dump_artifacts() {
        let fs = MockFileSystem::new();
        // A realistic root: target binary plus our own installed proxy.
        fs.add_file("/game/game.exe", b"x".to_vec());
        fs.add_file("/game/version.dll", b"p".to_vec());
        fs.add_file("/game/version_proxy.dll", b"p".to_vec());

        assert!(first_populated_candidate(&fs, &layout()).is_none());

        // A recognized name at the root does count.
        fs.add_file("/game/summary.txt", b"s".to_vec());
        let found = first_populated_candidate(&fs, &layout()).unwrap();
        assert_eq!(found, PathBuf::from("/game"));
        assert_eq!(
            candidate_files(&fs, &layout(), Path::new("/game")),
            vec![PathBuf::from("/game/summary.txt")]
        );
    }

    #[test]
    fn companion_alone_populates_the_root() {
        let fs = MockFileSystem::new();
        fs.add_file("/game/game.exe", b"x".to_vec());
        fs.add_file("/game/GameAssembly_dumped.dll", b"ga".to_vec());

        let found = first_populated_candidate(&fs, &layout()).unwrap();
        assert_eq!(found, PathBuf::from("/game"));

        let ev = gather_evidence(&fs, &layout(), Path::new("/game"));
        assert_eq!(ev.file_count, 1);
        assert!(ev.is_complete(true, 1));
    }

    #[test]
    fn no_candidates_when_everything_is_empty() {
        let fs = MockFileSystem::new();
        fs.add_dir("/game");
        assert!(first_populated_candidate(&fs, &layout()).is_none());
    }

    #[test]
    fn evidence_counts_and_matches() {
        let fs = MockFileSystem::new();
        fs.add_file("/game/dump/summary.txt", b"s".to_vec());
        fs.add_file("/game/dump/classes_dump.txt", b"c".to_vec());
        fs.add_file("/game/dump/extra/random.bin", b"r".to_vec());

        let ev = gather_evidence(&fs, &layout(), Path::new("/game/dump"));
        assert_eq!(ev.file_count, 3);
        assert_eq!(ev.matched_known_names.len(), 2);
        assert!(ev.matched_known_names.contains("summary.txt"));
        assert!(!ev.flag_file_present);

        assert!(ev.is_complete(false, 1));
        assert!(ev.is_complete(false, 2));
        assert!(!ev.is_complete(false, 3));
        // The companion artifact completes regardless of names.
        assert!(ev.is_complete(true, 3));
    }

    #[test]
    fn flag_file_completes_on_its_own() {
        let fs = MockFileSystem::new();
        fs.add_file("/game/dump/dump_complete.flag", b"".to_vec());
        fs.add_file("/game/dump/whatever.bin", b"w".to_vec());

        let ev = gather_evidence(&fs, &layout(), Path::new("/game/dump"));
        assert!(ev.flag_file_present);
        assert!(ev.is_complete(false, 99));
    }
}
