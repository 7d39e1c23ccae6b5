//! Persisted install state.
//!
//! One `InstallState` value is threaded through every pipeline step and
//! written back to disk after each step completes. The file is the resume
//! point after a crash or abort, and its `decisions` section is the audit
//! trail of everything the installer chose on the operator's behalf.
//!
//! The on-disk format is JSON or YAML, selected by file extension. Every
//! section is optional on load; missing fields get stable defaults so a
//! state file from an interrupted run (or an empty file path on first run)
//! always loads.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::InstallError;
use crate::hwdetect::HardwareReport;
use crate::manifest::ProfileManifest;

/// Current state schema version. Older files are migrated forward on load;
/// newer files are rejected.
pub const STATE_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallState {
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub config: InstallConfig,
    #[serde(default)]
    pub hardware: Option<HardwareReport>,
    /// Feature flags of the selected profile, loaded from its manifest.
    #[serde(default)]
    pub profile: Option<ProfileManifest>,
    #[serde(default)]
    pub execution: ExecutionState,
}

impl Default for InstallState {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            config: InstallConfig::default(),
            hardware: None,
            profile: None,
            execution: ExecutionState::default(),
        }
    }
}

impl InstallState {
    pub fn is_step_completed(&self, step_id: &str) -> bool {
        self.execution
            .completed_steps
            .iter()
            .any(|s| s == step_id)
    }

    /// Append to `completed_steps`; the set only ever grows within a session.
    pub fn mark_step_completed(&mut self, step_id: &str) {
        if !self.is_step_completed(step_id) {
            self.execution.completed_steps.push(step_id.to_string());
        }
    }

    pub fn record_error(&mut self, step: Option<String>, error: impl AsRef<str>) {
        self.execution.errors.push(ExecutionError {
            step,
            error: error.as_ref().to_string(),
        });
    }

    pub fn warn(&mut self, warning: Warning) {
        self.execution.warnings.push(warning);
    }
}

/// Operator intent. Everything here comes from the state file, the CLI, or
/// defaults; nothing in it is detected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallConfig {
    /// Disk to partition, e.g. /dev/sda or /dev/nvme0n1. Required before
    /// the partition step runs.
    pub target_disk: Option<String>,
    /// `debian` or `ubuntu`; controls bootstrap suite/mirror and package
    /// naming.
    pub os_base: String,
    pub ubuntu_suite: String,
    /// Ubuntu mirror override; when unset the rootfs step picks archive vs
    /// ports by architecture.
    pub ubuntu_mirror: Option<String>,
    pub debian_suite: String,
    pub debian_mirror: String,
    /// `sway` (terminal-first Wayland stack) or `xfce` (compatibility base).
    pub desktop_base: String,
    /// Extra shell package installed only when the repo provides it.
    pub shell_package: String,
    pub hostname: String,
    /// Single fixed-UID account policy.
    pub username: String,
    pub fixed_uid: u32,
    pub install_source: InstallSource,
    pub firewall_enabled: bool,
    pub ssh_enabled: bool,
    /// Gates enabling the ferrite-agent device service in the target.
    pub device_agent_enabled: bool,
    /// On-media APT repo path; when set, the target prefers it.
    pub offline_repo_path: Option<String>,
    pub offline_repo_suite: String,
    pub offline_repo_component: String,
    pub esp_size_mib: u32,
    pub boot_size_mib: u32,
    /// Log every external command without executing anything.
    pub dry_run: bool,
    /// Unmount and reboot at the end of a successful run.
    pub finalize_reboot: bool,
    /// Skip hardware-based profile selection and use this profile id.
    pub forced_profile: Option<String>,
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            target_disk: None,
            os_base: "ubuntu".to_string(),
            ubuntu_suite: "noble".to_string(),
            ubuntu_mirror: None,
            debian_suite: "stable".to_string(),
            debian_mirror: "http://deb.debian.org/debian".to_string(),
            desktop_base: "sway".to_string(),
            shell_package: "ferrite-shell".to_string(),
            hostname: "ferrite".to_string(),
            username: "ferrite".to_string(),
            fixed_uid: 1000,
            install_source: InstallSource::Offline,
            firewall_enabled: true,
            ssh_enabled: true,
            device_agent_enabled: true,
            offline_repo_path: None,
            offline_repo_suite: "bookworm".to_string(),
            offline_repo_component: "main".to_string(),
            esp_size_mib: 512,
            boot_size_mib: 1024,
            dry_run: false,
            finalize_reboot: false,
            forced_profile: None,
        }
    }
}

/// Network policy for package sources. Offline means locally provided
/// sources only, regardless of actual connectivity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallSource {
    Offline,
    Online,
    Hybrid,
}

impl InstallSource {
    pub fn permits_online(self) -> bool {
        matches!(self, InstallSource::Online | InstallSource::Hybrid)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionState {
    /// Set while a step is executing; None at rest between runs.
    pub current_step: Option<String>,
    pub completed_steps: Vec<String>,
    pub errors: Vec<ExecutionError>,
    pub warnings: Vec<Warning>,
    pub mounts: Mounts,
    pub decisions: Decisions,
    pub plan: Plan,
    pub summary: Summary,
    pub paths: LogPaths,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionError {
    pub step: Option<String>,
    pub error: String,
}

/// Soft-failure record. Warnings never abort the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// A feature the profile asked for was withheld (e.g. camera packages
    /// without a camera).
    FeatureWithheld { feature: String, reason: String },
    /// Requested packages unknown to the configured repositories.
    PackagesUnavailable { packages: Vec<String> },
    /// A best-effort hardware probe could not determine an answer.
    ProbeFailed { probe: String, reason: String },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Mounts {
    pub target_root: Option<String>,
    pub root_part: Option<String>,
    pub esp_part: Option<String>,
    pub boot_part: Option<String>,
}

/// Append-only audit ledger: what the installer decided, inspectable
/// without re-deriving.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Decisions {
    pub kernel_package: Option<String>,
    pub root_uuid: Option<String>,
    pub hostname: Option<String>,
    pub firewall_enabled: Option<bool>,
    pub ssh_enabled: Option<bool>,
    pub single_user: Option<SingleUser>,
    /// Result of the live connectivity probe.
    pub online: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SingleUser {
    pub username: String,
    pub uid: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Plan {
    pub features: FeaturePlan,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FeaturePlan {
    pub selected_groups: Vec<String>,
    pub packages: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Summary {
    pub ran_steps: Vec<String>,
    pub skipped_steps: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LogPaths {
    pub log_path_requested: Option<String>,
    pub log_path_actual: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StateFormat {
    Json,
    Yaml,
}

/// Loads and persists the install state at a fixed path.
pub struct StateStore {
    path: PathBuf,
    format: StateFormat,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let format = match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("yaml") | Some("yml") => StateFormat::Yaml,
            // JSON for .json and unknown extensions alike.
            _ => StateFormat::Json,
        };
        Self { path, format }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the state, or defaults when no file exists yet. Malformed
    /// documents and unknown future versions are validation errors.
    pub fn load(&self) -> Result<InstallState> {
        if !self.path.exists() {
            return Ok(InstallState::default());
        }
        let text = fs::read_to_string(&self.path)
            .with_context(|| format!("reading state file '{}'", self.path.display()))?;
        let state: InstallState = match self.format {
            StateFormat::Json => serde_json::from_str(&text).map_err(|e| {
                InstallError::Validation(format!(
                    "malformed state file '{}': {e}",
                    self.path.display()
                ))
            })?,
            StateFormat::Yaml => serde_yaml::from_str(&text).map_err(|e| {
                InstallError::Validation(format!(
                    "malformed state file '{}': {e}",
                    self.path.display()
                ))
            })?,
        };
        migrate(state)
    }

    /// Persist the state, creating parent directories as needed.
    pub fn save(&self, state: &InstallState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("creating state directory '{}'", parent.display())
                })?;
            }
        }
        let mut text = match self.format {
            StateFormat::Json => serde_json::to_string_pretty(state)?,
            StateFormat::Yaml => serde_yaml::to_string(state)?,
        };
        if !text.ends_with('\n') {
            text.push('\n');
        }
        fs::write(&self.path, text)
            .with_context(|| format!("writing state file '{}'", self.path.display()))?;
        Ok(())
    }
}

/// Bring an older on-disk schema up to the current version.
fn migrate(mut state: InstallState) -> Result<InstallState> {
    if state.version > STATE_VERSION {
        return Err(InstallError::Validation(format!(
            "state file version {} is newer than supported version {STATE_VERSION}",
            state.version
        ))
        .into());
    }
    // Version 0 predates the version field; all of its sections are a strict
    // subset of version 1 and serde defaults fill the gaps.
    if state.version < STATE_VERSION {
        state.version = STATE_VERSION;
    }

    let unique: BTreeSet<&String> = state.execution.completed_steps.iter().collect();
    if unique.len() != state.execution.completed_steps.len() {
        return Err(InstallError::Validation(
            "state file lists a completed step more than once".to_string(),
        )
        .into());
    }
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("state.json"));
        let state = store.load().unwrap();
        assert_eq!(state.version, STATE_VERSION);
        assert_eq!(state.config.os_base, "ubuntu");
        assert!(state.execution.completed_steps.is_empty());
        assert!(state.execution.current_step.is_none());
    }

    #[test]
    fn test_json_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("state.json"));
        let mut state = InstallState::default();
        state.config.target_disk = Some("/dev/sda".to_string());
        state.mark_step_completed("10_detect_hardware");
        state.execution.decisions.hostname = Some("ferrite".to_string());
        store.save(&state).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.config.target_disk.as_deref(), Some("/dev/sda"));
        assert!(loaded.is_step_completed("10_detect_hardware"));
        assert_eq!(loaded.execution.decisions.hostname.as_deref(), Some("ferrite"));
    }

    #[test]
    fn test_yaml_round_trip_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("state.yaml"));
        let mut state = InstallState::default();
        state.config.install_source = InstallSource::Hybrid;
        store.save(&state).unwrap();

        let text = fs::read_to_string(dir.path().join("state.yaml")).unwrap();
        assert!(text.contains("install_source: hybrid"));
        let loaded = store.load().unwrap();
        assert_eq!(loaded.config.install_source, InstallSource::Hybrid);
    }

    #[test]
    fn test_malformed_state_is_validation_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "[1, 2, 3]").unwrap();
        let err = StateStore::new(&path).load().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<InstallError>(),
            Some(InstallError::Validation(_))
        ));
    }

    #[test]
    fn test_future_version_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, format!("{{\"version\": {}}}", STATE_VERSION + 1)).unwrap();
        let err = StateStore::new(&path).load().unwrap_err();
        assert!(err.to_string().contains("newer than supported"));
    }

    #[test]
    fn test_versionless_file_migrates_forward() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{\"config\": {\"hostname\": \"older\"}}").unwrap();
        let state = StateStore::new(&path).load().unwrap();
        assert_eq!(state.version, STATE_VERSION);
        assert_eq!(state.config.hostname, "older");
    }

    #[test]
    fn test_duplicate_completed_steps_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(
            &path,
            "{\"version\": 1, \"execution\": {\"completed_steps\": [\"a\", \"a\"]}}",
        )
        .unwrap();
        assert!(StateStore::new(&path).load().is_err());
    }

    #[test]
    fn test_mark_step_completed_is_idempotent() {
        let mut state = InstallState::default();
        state.mark_step_completed("20_partition_fs");
        state.mark_step_completed("20_partition_fs");
        assert_eq!(state.execution.completed_steps.len(), 1);
    }
}
