//! Step 80: sanity-check the assembled target tree.

use anyhow::Result;

use crate::error::InstallError;
use crate::pipeline::{Step, StepCtx, StepId};
use crate::state::InstallState;

use super::require_target_root;

/// Paths (relative to the target root) that any bootable install must have.
const MUST_EXIST: &[&str] = &["etc", "boot", "etc/fstab"];

pub struct PostInstallChecksStep;

impl Step for PostInstallChecksStep {
    fn id(&self) -> StepId {
        StepId::new("80_post_install_checks")
    }

    fn run(&self, state: &mut InstallState, ctx: &StepCtx) -> Result<()> {
        let target_root = require_target_root(state)?;

        if ctx.runner.dry_run() {
            ctx.log.info("dry-run: skipping post-install checks");
            return Ok(());
        }

        for rel in MUST_EXIST {
            let path = target_root.join(rel);
            if !path.exists() {
                return Err(InstallError::Precondition(format!(
                    "post-install check failed: missing {}",
                    path.display()
                ))
                .into());
            }
        }

        ctx.log.info("post-install checks passed");
        Ok(())
    }
}
