//! Step 60: desktop stack installation.
//!
//! Two supported bases: `sway`, the terminal-first Wayland stack FerriteOS
//! ships by default, and `xfce`, a conventional Xorg desktop for hardware
//! or operators that want one. Both sit on the same pipewire audio/media
//! baseline.

use anyhow::Result;

use crate::chroot::ChrootBinds;
use crate::error::InstallError;
use crate::pipeline::{Step, StepCtx, StepId};
use crate::pkg;
use crate::state::InstallState;

use super::require_target_root;

pub struct InstallDesktopStep;

impl Step for InstallDesktopStep {
    fn id(&self) -> StepId {
        StepId::new("60_install_desktop")
    }

    fn run(&self, state: &mut InstallState, ctx: &StepCtx) -> Result<()> {
        let target_root = require_target_root(state)?;
        let desktop_base = state.config.desktop_base.trim().to_ascii_lowercase();
        let (mut packages, with_recommends) = desktop_packages(&desktop_base)?;

        let _binds = ChrootBinds::mount(ctx.runner, &target_root)?;
        pkg::apt_update(&ctx.runner, &target_root)?;

        // The branded shell is optional: only our own repos carry it.
        let shell_pkg = state.config.shell_package.trim().to_string();
        if !shell_pkg.is_empty() && pkg::apt_has_package(&ctx.runner, &target_root, &shell_pkg) {
            packages.push(shell_pkg);
        }

        pkg::apt_install(&ctx.runner, &target_root, &packages, with_recommends)?;

        ctx.log
            .info(format!("desktop stack installed (desktop_base={desktop_base})"));
        Ok(())
    }
}

/// Package list and recommends policy per desktop base.
fn desktop_packages(desktop_base: &str) -> Result<(Vec<String>, bool)> {
    // Baseline audio/media stack, common to both bases.
    let mut packages: Vec<String> = ["pipewire", "wireplumber", "gstreamer1.0-tools"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    match desktop_base {
        "sway" | "wayland" => {
            packages.extend(
                [
                    "sway",
                    "foot",
                    "waybar",
                    "wofi",
                    "xwayland",
                    "network-manager-gnome",
                    "wl-clipboard",
                ]
                .iter()
                .map(|s| s.to_string()),
            );
            Ok((packages, false))
        }
        "xfce" | "xfce4" => {
            // Debian provides XFCE through a task meta package.
            packages.extend(
                ["task-xfce-desktop", "lightdm", "network-manager-gnome"]
                    .iter()
                    .map(|s| s.to_string()),
            );
            Ok((packages, true))
        }
        other => Err(InstallError::Configuration(format!(
            "unsupported config.desktop_base '{other}' (expected 'sway' or 'xfce')"
        ))
        .into()),
    }
}
