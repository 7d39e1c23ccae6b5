//! Step 30: bootstrap the base system and its minimal package set.

use anyhow::Result;

use crate::chroot::ChrootBinds;
use crate::error::InstallError;
use crate::pipeline::{Step, StepCtx, StepId};
use crate::pkg;
use crate::state::InstallState;

use super::{require_arch, require_target_root};

/// Minimal base needed by later steps (kernel hooks, service toggles,
/// network on first boot).
const BASE_PACKAGES: &[&str] = &[
    "systemd",
    "coreutils",
    "ca-certificates",
    "network-manager",
    "openssh-server",
    "sudo",
    "linux-base",
    "initramfs-tools",
];

pub struct InstallRootfsStep;

impl Step for InstallRootfsStep {
    fn id(&self) -> StepId {
        StepId::new("30_install_rootfs")
    }

    fn run(&self, state: &mut InstallState, ctx: &StepCtx) -> Result<()> {
        let target_root = require_target_root(state)?;
        let arch = require_arch(state)?;

        let (suite, mirror) = bootstrap_source(state, &arch)?;
        pkg::debootstrap_rootfs(&ctx.runner, &target_root, &suite, &mirror, &arch)?;

        // Offline-first: when the media carries a repo, the target prefers it.
        if let Some(repo_path) = state.config.offline_repo_path.clone() {
            pkg::write_sources_list_offline(
                &ctx.runner,
                &target_root,
                &repo_path,
                &state.config.offline_repo_suite,
                &state.config.offline_repo_component,
            )?;
        }

        let _binds = ChrootBinds::mount(ctx.runner, &target_root)?;
        pkg::apt_update(&ctx.runner, &target_root)?;
        pkg::apt_install(&ctx.runner, &target_root, BASE_PACKAGES, false)?;

        ctx.log
            .info(format!("rootfs installed at {}", target_root.display()));
        Ok(())
    }
}

/// Suite and mirror for debootstrap. Ubuntu splits its archive by
/// architecture; Debian serves everything from one mirror.
fn bootstrap_source(state: &InstallState, arch: &str) -> Result<(String, String)> {
    let cfg = &state.config;
    match cfg.os_base.trim().to_ascii_lowercase().as_str() {
        "ubuntu" => {
            let mirror = cfg.ubuntu_mirror.clone().unwrap_or_else(|| {
                if arch == "amd64" {
                    "http://archive.ubuntu.com/ubuntu".to_string()
                } else {
                    "http://ports.ubuntu.com/ubuntu-ports".to_string()
                }
            });
            Ok((cfg.ubuntu_suite.clone(), mirror))
        }
        "debian" => Ok((cfg.debian_suite.clone(), cfg.debian_mirror.clone())),
        other => Err(InstallError::Configuration(format!(
            "unsupported config.os_base '{other}' (expected 'ubuntu' or 'debian')"
        ))
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ubuntu_mirror_split_by_arch() {
        let state = InstallState::default();
        let (suite, mirror) = bootstrap_source(&state, "amd64").unwrap();
        assert_eq!(suite, "noble");
        assert_eq!(mirror, "http://archive.ubuntu.com/ubuntu");

        let (_, ports) = bootstrap_source(&state, "arm64").unwrap();
        assert_eq!(ports, "http://ports.ubuntu.com/ubuntu-ports");
    }

    #[test]
    fn test_ubuntu_mirror_override() {
        let mut state = InstallState::default();
        state.config.ubuntu_mirror = Some("http://mirror.local/ubuntu".to_string());
        let (_, mirror) = bootstrap_source(&state, "arm64").unwrap();
        assert_eq!(mirror, "http://mirror.local/ubuntu");
    }

    #[test]
    fn test_debian_source() {
        let mut state = InstallState::default();
        state.config.os_base = "debian".to_string();
        let (suite, mirror) = bootstrap_source(&state, "armhf").unwrap();
        assert_eq!(suite, "stable");
        assert_eq!(mirror, "http://deb.debian.org/debian");
    }

    #[test]
    fn test_unknown_os_base_is_configuration_error() {
        let mut state = InstallState::default();
        state.config.os_base = "arch".to_string();
        let err = bootstrap_source(&state, "amd64").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<InstallError>(),
            Some(InstallError::Configuration(_))
        ));
    }
}
