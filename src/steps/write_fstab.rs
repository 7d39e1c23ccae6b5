//! Step 35: derive UUID-keyed fstab entries from the partition results.

use std::fs;

use anyhow::{Context, Result};

use crate::block::get_uuid;
use crate::error::InstallError;
use crate::fstab::{plan_entries, render_fstab};
use crate::pipeline::{Step, StepCtx, StepId};
use crate::state::InstallState;

use super::require_target_root;

pub struct WriteFstabStep;

impl Step for WriteFstabStep {
    fn id(&self) -> StepId {
        StepId::new("35_write_fstab")
    }

    fn run(&self, state: &mut InstallState, ctx: &StepCtx) -> Result<()> {
        let target_root = require_target_root(state)?;
        let root_part = state.execution.mounts.root_part.clone().ok_or_else(|| {
            InstallError::Precondition(
                "execution.mounts.root_part missing; run the partition step first".to_string(),
            )
        })?;

        let root_uuid = get_uuid(&ctx.runner, &root_part)?;
        let boot_uuid = match &state.execution.mounts.boot_part {
            Some(part) => Some(get_uuid(&ctx.runner, part)?),
            None => None,
        };
        let esp_uuid = match &state.execution.mounts.esp_part {
            Some(part) => Some(get_uuid(&ctx.runner, part)?),
            None => None,
        };

        let entries = plan_entries(&root_uuid, boot_uuid.as_deref(), esp_uuid.as_deref());
        let contents = render_fstab(&entries);
        let fstab_path = target_root.join("etc/fstab");

        if ctx.runner.dry_run() {
            ctx.log
                .info(format!("dry-run: would write {}", fstab_path.display()));
        } else {
            if let Some(parent) = fstab_path.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating '{}'", parent.display()))?;
            }
            fs::write(&fstab_path, contents)
                .with_context(|| format!("writing '{}'", fstab_path.display()))?;
        }

        state.execution.decisions.root_uuid = Some(root_uuid.clone());
        ctx.log.info(format!("wrote fstab (root_uuid={root_uuid})"));
        Ok(())
    }
}
