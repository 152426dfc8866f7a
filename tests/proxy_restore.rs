//! Proxy install/restore against the real filesystem.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use dumprun::fs::RealFileSystem;
use dumprun::fs::retry::{FileOps, RetrySettings};
use dumprun::layout::{GameLayout, MARKER_TEXT};
use dumprun::proxy::ProxyManager;

fn real_ops() -> FileOps {
    FileOps::new(
        Arc::new(RealFileSystem),
        RetrySettings {
            attempts: 3,
            delay: Duration::from_millis(10),
        },
    )
}

fn layout(game_dir: &std::path::Path) -> GameLayout {
    GameLayout::new(game_dir, game_dir, "game.exe", "helper.exe")
}

#[tokio::test]
async fn restore_puts_the_original_library_back() {
    dumprun_test_utils::init_tracing();

    let tmp = tempfile::tempdir().unwrap();
    let game_dir = tmp.path().join("game");
    let system_library = tmp.path().join("system").join("version.dll");
    dumprun_test_utils::builders::write_file(&system_library, b"system bytes");
    dumprun_test_utils::builders::write_file(&game_dir.join("version.dll"), b"game original");

    let layout = layout(&game_dir);
    let mut mgr = ProxyManager::new(real_ops(), layout.clone(), system_library);
    mgr.install().await.unwrap();

    assert_eq!(
        std::fs::read(layout.library_path()).unwrap(),
        b"system bytes"
    );
    assert_eq!(
        std::fs::read(layout.backup_path()).unwrap(),
        b"game original"
    );

    mgr.restore();
    // Idempotent.
    mgr.restore();

    assert_eq!(
        std::fs::read(layout.library_path()).unwrap(),
        b"game original"
    );
    for leftover in [
        layout.backup_path(),
        layout.proxy_path(),
        layout.exports_asm_path(),
        layout.module_def_path(),
        layout.temp_config_path(),
    ] {
        assert!(!leftover.exists(), "{leftover:?} left behind");
    }
}

#[tokio::test]
async fn marker_install_leaves_a_clean_directory_after_restore() {
    dumprun_test_utils::init_tracing();

    let tmp = tempfile::tempdir().unwrap();
    let game_dir = tmp.path().join("game");
    std::fs::create_dir_all(&game_dir).unwrap();
    let system_library = tmp.path().join("version.dll");
    dumprun_test_utils::builders::write_file(&system_library, b"system bytes");

    let layout = layout(&game_dir);
    let mut mgr = ProxyManager::new(real_ops(), layout.clone(), system_library);
    mgr.install().await.unwrap();

    assert_eq!(
        std::fs::read_to_string(layout.backup_path()).unwrap(),
        MARKER_TEXT
    );

    mgr.restore();

    // Nothing of the install survives; only what was there before remains.
    let leftovers: Vec<PathBuf> = std::fs::read_dir(&game_dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert!(leftovers.is_empty(), "unexpected leftovers: {leftovers:?}");
}

#[tokio::test]
async fn restore_recovers_from_a_previous_crashed_run() {
    dumprun_test_utils::init_tracing();

    let tmp = tempfile::tempdir().unwrap();
    let game_dir = tmp.path().join("game");
    // State a crashed run leaves behind: installed library plus a marker
    // backup saying nothing was there originally.
    dumprun_test_utils::builders::write_file(&game_dir.join("version.dll"), b"proxy bytes");
    dumprun_test_utils::builders::write_file(
        &game_dir.join("version_backup.dll"),
        MARKER_TEXT.as_bytes(),
    );

    let layout = layout(&game_dir);
    let system_library = tmp.path().join("version.dll");
    let mut mgr = ProxyManager::new(real_ops(), layout.clone(), system_library);
    mgr.restore();

    assert!(!layout.library_path().exists());
    assert!(!layout.backup_path().exists());
}
