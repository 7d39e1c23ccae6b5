//! Installer path configuration.
//!
//! Reads overrides from the environment (a `.env` file is loaded by main
//! before this runs; environment variables take precedence over it).
//! Relative overrides are anchored at the installer base directory.

use std::path::{Path, PathBuf};

/// Default location of the persisted install state.
pub const DEFAULT_STATE_PATH: &str = "/var/lib/ferroinstall/state.json";

/// Default location of the audit log.
pub const DEFAULT_LOG_PATH: &str = "/var/log/ferroinstall.log";

/// Where the target filesystem tree is assembled.
pub const DEFAULT_TARGET_ROOT: &str = "/target";

/// Resolved installer paths.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Persisted install state (json|yaml by extension).
    pub state_path: PathBuf,
    /// Audit log destination.
    pub log_path: PathBuf,
    /// Mountpoint for the target root filesystem.
    pub target_root: PathBuf,
    /// Directory holding profiles/ and features.yaml.
    pub manifest_dir: PathBuf,
    /// Directory holding systemd/, udev/, sudoers.d/ trees.
    pub assets_dir: PathBuf,
}

impl Paths {
    /// Resolve paths from defaults and `FERRO_*` environment overrides.
    pub fn load(base_dir: &Path) -> Self {
        Self {
            state_path: env_path("FERRO_STATE_PATH", base_dir)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_PATH)),
            log_path: env_path("FERRO_LOG_PATH", base_dir)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_PATH)),
            target_root: env_path("FERRO_TARGET_ROOT", base_dir)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_TARGET_ROOT)),
            manifest_dir: env_path("FERRO_MANIFEST_DIR", base_dir)
                .unwrap_or_else(|| base_dir.join("manifests")),
            assets_dir: env_path("FERRO_ASSETS_DIR", base_dir)
                .unwrap_or_else(|| base_dir.join("assets")),
        }
    }
}

fn env_path(key: &str, base_dir: &Path) -> Option<PathBuf> {
    let value = std::env::var(key).ok()?;
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    let path = PathBuf::from(value);
    if path.is_absolute() {
        Some(path)
    } else {
        Some(base_dir.join(path))
    }
}
