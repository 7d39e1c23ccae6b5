//! Step 40: install the kernel package into the target.
//!
//! Debian has one kernel meta package per architecture; Ubuntu ships
//! several candidates whose availability varies by release, so we query the
//! target's package index and take the first installable one. The chosen
//! package maintains the /vmlinuz and /initrd.img symlinks the bootloader
//! configuration depends on.

use anyhow::{bail, Result};

use crate::chroot::ChrootBinds;
use crate::error::InstallError;
use crate::pipeline::{Step, StepCtx, StepId};
use crate::pkg;
use crate::state::InstallState;

use super::{require_arch, require_target_root};

pub fn debian_kernel_for_arch(arch: &str) -> Option<&'static str> {
    match arch {
        "amd64" => Some("linux-image-amd64"),
        "arm64" => Some("linux-image-arm64"),
        "armhf" => Some("linux-image-armhf"),
        _ => None,
    }
}

/// Ubuntu meta packages; order matters.
pub fn ubuntu_kernel_candidates(arch: &str) -> Option<&'static [&'static str]> {
    match arch {
        "amd64" | "arm64" => Some(&["linux-generic", "linux-image-generic"]),
        // armhf support varies by Ubuntu release; only the image meta exists.
        "armhf" => Some(&["linux-image-generic"]),
        _ => None,
    }
}

pub struct InstallKernelStep;

impl Step for InstallKernelStep {
    fn id(&self) -> StepId {
        StepId::new("40_install_kernel")
    }

    fn run(&self, state: &mut InstallState, ctx: &StepCtx) -> Result<()> {
        let target_root = require_target_root(state)?;
        let arch = require_arch(state)?;
        let os_base = state.config.os_base.trim().to_ascii_lowercase();

        let _binds = ChrootBinds::mount(ctx.runner, &target_root)?;
        pkg::apt_update(&ctx.runner, &target_root)?;

        let kernel_pkg = match os_base.as_str() {
            "debian" => debian_kernel_for_arch(&arch)
                .ok_or_else(|| {
                    InstallError::Configuration(format!(
                        "no Debian kernel package for architecture '{arch}'"
                    ))
                })?
                .to_string(),
            "ubuntu" => {
                let candidates = ubuntu_kernel_candidates(&arch).ok_or_else(|| {
                    InstallError::Configuration(format!(
                        "no Ubuntu kernel candidates for architecture '{arch}'"
                    ))
                })?;
                match candidates
                    .iter()
                    .find(|p| pkg::apt_has_package(&ctx.runner, &target_root, p))
                {
                    Some(p) => p.to_string(),
                    None => bail!(
                        "no installable Ubuntu kernel meta package for arch={arch}; tried: {}",
                        candidates.join(", ")
                    ),
                }
            }
            other => {
                return Err(InstallError::Configuration(format!(
                    "unsupported config.os_base '{other}' (expected 'ubuntu' or 'debian')"
                ))
                .into())
            }
        };

        state.execution.decisions.kernel_package = Some(kernel_pkg.clone());
        pkg::apt_install(&ctx.runner, &target_root, [kernel_pkg.as_str()], true)?;

        ctx.log.info(format!("kernel installed: {kernel_pkg}"));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debian_kernel_map() {
        assert_eq!(debian_kernel_for_arch("amd64"), Some("linux-image-amd64"));
        assert_eq!(debian_kernel_for_arch("armhf"), Some("linux-image-armhf"));
        assert_eq!(debian_kernel_for_arch("riscv64"), None);
    }

    #[test]
    fn test_ubuntu_candidate_order() {
        assert_eq!(
            ubuntu_kernel_candidates("amd64"),
            Some(&["linux-generic", "linux-image-generic"][..])
        );
        assert_eq!(
            ubuntu_kernel_candidates("armhf"),
            Some(&["linux-image-generic"][..])
        );
        assert_eq!(ubuntu_kernel_candidates("riscv64"), None);
    }
}
