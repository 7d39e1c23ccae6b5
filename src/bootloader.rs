//! Bootloader setup.
//!
//! EFI targets get GRUB installed into the mounted ESP and a regenerated
//! boot menu. U-Boot targets get a static extlinux configuration naming the
//! kernel and initrd by their fixed symlink names and the root filesystem
//! by UUID, since device paths are worthless once enumeration order changes.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::chroot::chroot_cmd;
use crate::error::InstallError;
use crate::process::Runner;

pub const BOOTLOADER_ID: &str = "FerriteOS";

/// GRUB EFI package candidates per architecture, in preference order.
pub fn grub_efi_candidates(arch: &str) -> Option<&'static [&'static str]> {
    match arch {
        "amd64" => Some(&["grub-efi-amd64"]),
        "arm64" => Some(&["grub-efi-arm64"]),
        // Rare, but keep a best-effort mapping.
        "armhf" => Some(&["grub-efi-arm", "grub-efi-armhf"]),
        _ => None,
    }
}

/// `grub-install --target` value per architecture.
pub fn grub_efi_target(arch: &str) -> Result<&'static str> {
    match arch {
        "amd64" => Ok("x86_64-efi"),
        "arm64" => Ok("arm64-efi"),
        "armhf" => Ok("arm-efi"),
        other => Err(InstallError::Configuration(format!(
            "no GRUB EFI target for architecture '{other}'"
        ))
        .into()),
    }
}

/// Install GRUB into the mounted ESP and regenerate the boot menu.
/// Assumes /boot/efi is mounted inside the target and chroot binds are held.
pub fn install_grub_efi(runner: &Runner, target_root: &Path, arch: &str) -> Result<()> {
    let target = grub_efi_target(arch)?;
    chroot_cmd(
        runner,
        target_root,
        [
            "grub-install",
            &format!("--target={target}"),
            "--efi-directory=/boot/efi",
            &format!("--bootloader-id={BOOTLOADER_ID}"),
            "--recheck",
        ],
    )?;
    chroot_cmd(runner, target_root, ["update-grub"])?;
    runner.log().info("GRUB EFI installed");
    Ok(())
}

/// Render the extlinux configuration for U-Boot targets.
///
/// The kernel step installs packages that maintain /vmlinuz and /initrd.img
/// symlinks; those exact names are load-bearing here.
pub fn render_extlinux_config(root_uuid: &str) -> String {
    let mut config = String::new();
    config.push_str("DEFAULT ferrite\n");
    config.push_str("TIMEOUT 5\n");
    config.push_str("MENU TITLE FerriteOS\n\n");
    config.push_str("LABEL ferrite\n");
    config.push_str("  LINUX /vmlinuz\n");
    config.push_str("  INITRD /initrd.img\n");
    config.push_str(&format!("  APPEND root=UUID={root_uuid} rw quiet\n"));
    config
}

pub fn write_extlinux_config(runner: &Runner, target_root: &Path, root_uuid: &str) -> Result<()> {
    let extlinux_dir = target_root.join("boot/extlinux");
    let config_path = extlinux_dir.join("extlinux.conf");
    if runner.dry_run() {
        runner
            .log()
            .info(format!("dry-run: would write {}", config_path.display()));
        return Ok(());
    }
    fs::create_dir_all(&extlinux_dir)
        .with_context(|| format!("creating '{}'", extlinux_dir.display()))?;
    fs::write(&config_path, render_extlinux_config(root_uuid))
        .with_context(|| format!("writing '{}'", config_path.display()))?;
    runner
        .log()
        .info(format!("wrote extlinux config: {}", config_path.display()));
    Ok(())
}
