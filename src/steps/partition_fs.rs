//! Step 20: destroy the old partition table, create the firmware-specific
//! layout, format and mount it.

use std::path::PathBuf;

use anyhow::Result;

use crate::error::InstallError;
use crate::pipeline::{Step, StepCtx, StepId};
use crate::state::InstallState;
use crate::storage::{self, PartitionPlan};

pub struct PartitionFilesystemStep;

impl Step for PartitionFilesystemStep {
    fn id(&self) -> StepId {
        StepId::new("20_partition_fs")
    }

    fn run(&self, state: &mut InstallState, ctx: &StepCtx) -> Result<()> {
        let disk = state.config.target_disk.clone().ok_or_else(|| {
            InstallError::Configuration(
                "config.target_disk is required for partitioning".to_string(),
            )
        })?;
        let firmware = state
            .hardware
            .as_ref()
            .map(|hw| hw.firmware)
            .ok_or_else(|| {
                InstallError::Precondition(
                    "hardware report missing; run the detect step first".to_string(),
                )
            })?;

        let plan = PartitionPlan {
            disk,
            firmware,
            esp_size_mib: state.config.esp_size_mib,
            boot_size_mib: state.config.boot_size_mib,
        };

        // An interrupted run may already have recorded the mountpoint.
        let target_root = state
            .execution
            .mounts
            .target_root
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| ctx.paths.target_root.clone());

        let result = storage::partition_and_format(&ctx.runner, &plan, &target_root)?;

        let mounts = &mut state.execution.mounts;
        mounts.target_root = Some(target_root.display().to_string());
        mounts.root_part = Some(result.root_part);
        mounts.esp_part = result.esp_part;
        mounts.boot_part = result.boot_part;

        ctx.log.info(format!(
            "partitioned and mounted target_root={}",
            target_root.display()
        ));
        Ok(())
    }
}
