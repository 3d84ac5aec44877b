// tests/recovery.rs

//! Integration tests for the suffix-scan recovery operations.
//!
//! These run against real directories: delete the previous version's
//! `.old` files, or swap a half-finished update back out and dispose of
//! the rolled-back files.

mod common;

use common::{run_file_fixture, FixtureFile};
use renew::{unsafe_delete_previous_version_files, unsafe_rollback_update, CleanupMode};

#[test]
fn test_unsafe_delete_removes_paired_old_files() {
    run_file_fixture(
        &[
            FixtureFile::stays("tool.exe"),
            FixtureFile::goes("tool.exe.old"),
            FixtureFile::stays("helper.dll"),
        ],
        |dir| unsafe_delete_previous_version_files(dir),
    );
}

#[test]
fn test_unsafe_delete_descends_into_subdirectories() {
    run_file_fixture(
        &[
            FixtureFile::stays("tool.exe"),
            FixtureFile::stays("builds/tests/tool.exe"),
            FixtureFile::goes("builds/tests/helper.dll.old"),
            FixtureFile::stays("builds/tests/helper.dll"),
            FixtureFile::goes("tool.exe.old"),
            FixtureFile::stays("helper.dll"),
        ],
        |dir| unsafe_delete_previous_version_files(dir),
    );
}

#[test]
fn test_unsafe_delete_leaves_unpaired_old_files() {
    run_file_fixture(
        &[
            FixtureFile::stays("tool.exe"),
            FixtureFile::stays("builds/tests/helper.dll.old"),
            FixtureFile::stays("builds/helper.dll.old"),
            FixtureFile::stays("helper.dll"),
        ],
        |dir| unsafe_delete_previous_version_files(dir),
    );
}

#[test]
fn test_unsafe_rollback_restores_previous_version() {
    run_file_fixture(
        &[
            FixtureFile::stays("tool.exe").with_after("previous exe"),
            FixtureFile::goes("tool.exe.old").with_before("previous exe"),
            FixtureFile::stays("helper.dll"),
        ],
        |dir| {
            let result = unsafe_rollback_update(dir)?;
            result.delete_loaded_version_files(CleanupMode::PureDelete)
        },
    );
}

#[test]
fn test_unsafe_rollback_ignores_unpaired_old_files() {
    run_file_fixture(
        &[
            FixtureFile::stays("tool.exe").with_after("previous exe"),
            FixtureFile::goes("tool.exe.old").with_before("previous exe"),
            FixtureFile::stays("build/tool.exe.old")
                .with_before("stray old exe")
                .with_after("stray old exe"),
            FixtureFile::stays("helper.dll").with_after("previous dll"),
            FixtureFile::goes("helper.dll.old").with_before("previous dll"),
        ],
        |dir| {
            let result = unsafe_rollback_update(dir)?;
            result.delete_loaded_version_files(CleanupMode::PureDelete)
        },
    );
}

#[test]
fn test_unsafe_rollback_twice_restores_original_layout() {
    run_file_fixture(
        &[
            FixtureFile::stays("tool").with_before("loaded").with_after("loaded"),
            FixtureFile::stays("tool.old")
                .with_before("previous")
                .with_after("previous"),
        ],
        |dir| {
            unsafe_rollback_update(dir)?;
            unsafe_rollback_update(dir)?;
            Ok(())
        },
    );
}

#[test]
fn test_rollback_result_lists_loaded_files() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("tool"), "loaded").unwrap();
    std::fs::write(dir.path().join("tool.old"), "previous").unwrap();

    let result = unsafe_rollback_update(dir.path()).unwrap();
    assert_eq!(result.loaded_files().len(), 1);
    assert!(result.loaded_files()[0].ends_with("tool.old"));

    // the previous version is live again, the loaded one waits as .old
    assert_eq!(
        std::fs::read_to_string(dir.path().join("tool")).unwrap(),
        "previous"
    );
    assert_eq!(
        std::fs::read_to_string(dir.path().join("tool.old")).unwrap(),
        "loaded"
    );
}
