//! Step 90: summarize decisions; optionally unmount and reboot.
//!
//! Rebooting is operational and must be explicitly enabled via
//! `config.finalize_reboot`; diagnostic and staged runs leave the target
//! mounted for inspection.

use anyhow::Result;

use crate::pipeline::{Step, StepCtx, StepId};
use crate::state::InstallState;

use super::require_target_root;

pub struct FinalizeStep;

impl Step for FinalizeStep {
    fn id(&self) -> StepId {
        StepId::new("90_finalize")
    }

    fn run(&self, state: &mut InstallState, ctx: &StepCtx) -> Result<()> {
        let summary = serde_json::to_string(&state.execution.decisions)?;
        ctx.log.info(format!("finalize summary: {summary}"));

        if !state.config.finalize_reboot {
            return Ok(());
        }

        let target_root = require_target_root(state)?;
        let target = target_root.to_string_lossy();
        // Best-effort teardown in nesting order; a busy mount must not block
        // the reboot.
        for mountpoint in [
            format!("{target}/boot/efi"),
            format!("{target}/boot"),
            target.to_string(),
        ] {
            let _ = ctx.runner.run_unchecked("umount", ["-lf", &mountpoint]);
        }
        ctx.runner.run("sync", [] as [&str; 0])?;
        ctx.runner.run("reboot", [] as [&str; 0])?;
        Ok(())
    }
}
