//! Step 55: ship systemd units, udev rules and sudoers fragments into the
//! target, then apply the service/firewall toggles that depend on them.

use anyhow::Result;

use crate::assets::copy_tree;
use crate::chroot::{chroot_cmd, ChrootBinds};
use crate::pipeline::{Step, StepCtx, StepId};
use crate::state::InstallState;

use super::require_target_root;

pub struct ApplyAssetsStep;

impl Step for ApplyAssetsStep {
    fn id(&self) -> StepId {
        StepId::new("55_apply_assets")
    }

    fn run(&self, state: &mut InstallState, ctx: &StepCtx) -> Result<()> {
        let target_root = require_target_root(state)?;
        let assets = &ctx.paths.assets_dir;

        copy_tree(
            &ctx.runner,
            &assets.join("systemd"),
            &target_root.join("etc/systemd/system"),
        )?;
        copy_tree(
            &ctx.runner,
            &assets.join("udev"),
            &target_root.join("etc/udev/rules.d"),
        )?;
        copy_tree(
            &ctx.runner,
            &assets.join("sudoers.d"),
            &target_root.join("etc/sudoers.d"),
        )?;

        let _binds = ChrootBinds::mount(ctx.runner, &target_root)?;

        // Enable the device agent only when its binary is actually present;
        // the offline repo may or may not ship it.
        if state.config.device_agent_enabled {
            chroot_cmd(
                &ctx.runner,
                &target_root,
                [
                    "bash",
                    "-lc",
                    "if [ -x /usr/local/bin/ferrite-agent ]; then \
                     systemctl enable ferrite-agent.service; \
                     else echo 'ferrite-agent binary missing; leaving service disabled'; fi",
                ],
            )?;
        }

        let ufw_cmd = if state.config.firewall_enabled {
            "apt-get install -y ufw && ufw --force enable"
        } else {
            "apt-get install -y ufw && ufw --force disable"
        };
        chroot_cmd(&ctx.runner, &target_root, ["bash", "-lc", ufw_cmd])?;

        ctx.log.info("assets applied");
        Ok(())
    }
}
