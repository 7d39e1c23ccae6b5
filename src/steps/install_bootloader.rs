//! Step 45: firmware-specific bootloader setup.

use anyhow::{bail, Result};

use crate::block::get_uuid;
use crate::bootloader;
use crate::chroot::ChrootBinds;
use crate::error::InstallError;
use crate::hwdetect::Firmware;
use crate::pipeline::{Step, StepCtx, StepId};
use crate::pkg;
use crate::state::InstallState;

use super::require_target_root;

pub struct InstallBootloaderStep;

impl Step for InstallBootloaderStep {
    fn id(&self) -> StepId {
        StepId::new("45_install_bootloader")
    }

    fn run(&self, state: &mut InstallState, ctx: &StepCtx) -> Result<()> {
        let target_root = require_target_root(state)?;
        let root_part = state.execution.mounts.root_part.clone().ok_or_else(|| {
            InstallError::Precondition(
                "execution.mounts.root_part missing; run the partition step first".to_string(),
            )
        })?;
        let (arch, firmware) = {
            let hw = state.hardware.as_ref().ok_or_else(|| {
                InstallError::Precondition(
                    "hardware report missing; run the detect step first".to_string(),
                )
            })?;
            (hw.arch.clone(), hw.firmware)
        };

        // Binds are held through package installation and grub-install;
        // both talk to /dev and /proc inside the target.
        let _binds = ChrootBinds::mount(ctx.runner, &target_root)?;
        pkg::apt_update(&ctx.runner, &target_root)?;

        match firmware {
            Firmware::Efi => {
                let candidates = bootloader::grub_efi_candidates(&arch).ok_or_else(|| {
                    InstallError::Configuration(format!(
                        "no GRUB EFI packages for architecture '{arch}'"
                    ))
                })?;
                let grub_pkg = match candidates
                    .iter()
                    .find(|p| pkg::apt_has_package(&ctx.runner, &target_root, p))
                {
                    Some(p) => *p,
                    None => bail!(
                        "no installable grub-efi package for arch={arch}; tried: {}",
                        candidates.join(", ")
                    ),
                };
                pkg::apt_install(&ctx.runner, &target_root, [grub_pkg, "efibootmgr"], true)?;
            }
            Firmware::Uboot => {
                // extlinux comes via the syslinux packaging.
                pkg::apt_install(
                    &ctx.runner,
                    &target_root,
                    ["extlinux", "syslinux-common"],
                    true,
                )?;
            }
        }

        let root_uuid = get_uuid(&ctx.runner, &root_part)?;
        state.execution.decisions.root_uuid = Some(root_uuid.clone());

        match firmware {
            Firmware::Efi => bootloader::install_grub_efi(&ctx.runner, &target_root, &arch)?,
            Firmware::Uboot => {
                bootloader::write_extlinux_config(&ctx.runner, &target_root, &root_uuid)?
            }
        }

        ctx.log
            .info(format!("bootloader configured (firmware={firmware})"));
        Ok(())
    }
}
