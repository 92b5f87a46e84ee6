//! Shared test helpers

use propquest::progression::ProgressionManager;
use tempfile::TempDir;

/// Engine backed by a throwaway database. Keep the TempDir alive for the
/// duration of the test.
pub fn test_engine() -> (ProgressionManager, TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let engine =
        ProgressionManager::with_path(&dir.path().join("progression.db")).expect("open db");
    (engine, dir)
}
