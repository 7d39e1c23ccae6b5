//! Step 10: probe hardware, select a profile, load its manifest.

use anyhow::Result;

use crate::manifest;
use crate::pipeline::{Step, StepCtx, StepId};
use crate::state::{InstallState, Warning};
use crate::{hwdetect, profile};

pub struct DetectHardwareStep;

impl Step for DetectHardwareStep {
    fn id(&self) -> StepId {
        StepId::new("10_detect_hardware")
    }

    fn run(&self, state: &mut InstallState, ctx: &StepCtx) -> Result<()> {
        let mut hw = hwdetect::detect(&ctx.runner);

        for (probe, reason) in hw.failed_probes() {
            ctx.log.warn(format!("probe {probe} failed: {reason}"));
            state.warn(Warning::ProbeFailed { probe, reason });
        }

        let (profile_id, basis) =
            profile::select(&hw, state.config.forced_profile.as_deref());
        ctx.log.info(format!(
            "hardware: arch={} firmware={} profile={} (confidence {:.2}, {})",
            hw.arch, hw.firmware, profile_id, basis.confidence, basis.reason
        ));
        hw.profile = profile_id.clone();
        hw.profile_selection = basis;
        state.hardware = Some(hw);

        state.profile = Some(manifest::load_profile(&ctx.paths.manifest_dir, &profile_id)?);
        Ok(())
    }
}
