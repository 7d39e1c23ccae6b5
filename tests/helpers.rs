//! Shared test utilities for ferroinstall tests.

use std::path::PathBuf;

use ferroinstall::config::Paths;
use ferroinstall::state::StateStore;
use tempfile::TempDir;

/// Test environment: a temp directory providing state/log/target paths,
/// pointed at the repo's real manifests and assets.
pub struct TestEnv {
    /// Temporary directory (kept alive for lifetime of TestEnv)
    pub _temp_dir: TempDir,
    pub paths: Paths,
}

impl TestEnv {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let base = temp_dir.path();
        let repo = PathBuf::from(env!("CARGO_MANIFEST_DIR"));

        let paths = Paths {
            state_path: base.join("state.json"),
            log_path: base.join("install.log"),
            target_root: base.join("target"),
            manifest_dir: repo.join("manifests"),
            assets_dir: repo.join("assets"),
        };

        Self {
            _temp_dir: temp_dir,
            paths,
        }
    }

    pub fn store(&self) -> StateStore {
        StateStore::new(self.paths.state_path.clone())
    }
}
