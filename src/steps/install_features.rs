//! Step 70: select and install optional feature groups.
//!
//! Selection comes from hardware signals and the profile manifest; the
//! resulting package list is filtered against the target's package index so
//! repo variance never fails the install: unknown packages are dropped
//! with a warning.

use anyhow::Result;

use crate::chroot::ChrootBinds;
use crate::error::InstallError;
use crate::features::{resolve_packages, select_groups};
use crate::manifest;
use crate::net::is_online;
use crate::pipeline::{Step, StepCtx, StepId};
use crate::pkg;
use crate::state::{InstallState, Warning};

use super::require_target_root;

pub struct InstallFeaturesStep;

impl Step for InstallFeaturesStep {
    fn id(&self) -> StepId {
        StepId::new("70_install_features")
    }

    fn run(&self, state: &mut InstallState, ctx: &StepCtx) -> Result<()> {
        let target_root = require_target_root(state)?;
        let hw = state.hardware.clone().ok_or_else(|| {
            InstallError::Precondition(
                "hardware report missing; run the detect step first".to_string(),
            )
        })?;
        let profile = state.profile.clone().unwrap_or_default();

        let online = is_online(&ctx.runner);
        state.execution.decisions.online = Some(online);

        // Offline-first: online extras need both a permitting policy and a
        // live connection.
        let allow_online = state.config.install_source.permits_online() && online;

        let feature_manifest = manifest::load_features(&ctx.paths.manifest_dir)?;
        let mut warnings = Vec::new();
        let selected_groups = select_groups(&hw, &profile, allow_online, &mut warnings);
        for warning in warnings {
            ctx.log.warn(format!("{warning:?}"));
            state.warn(warning);
        }
        let desired = resolve_packages(&selected_groups, &feature_manifest)?;

        let _binds = ChrootBinds::mount(ctx.runner, &target_root)?;
        pkg::apt_update(&ctx.runner, &target_root)?;

        let mut packages = Vec::new();
        let mut missing = Vec::new();
        for package in desired {
            if pkg::apt_has_package(&ctx.runner, &target_root, &package) {
                packages.push(package);
            } else {
                missing.push(package);
            }
        }

        let plan = &mut state.execution.plan.features;
        plan.selected_groups = selected_groups.clone();
        plan.packages = packages.clone();
        if !missing.is_empty() {
            ctx.log
                .warn(format!("feature packages unavailable: {}", missing.join(", ")));
            state.warn(Warning::PackagesUnavailable { packages: missing });
        }

        pkg::apt_install(&ctx.runner, &target_root, &packages, false)?;

        ctx.log.info(format!(
            "features installed (allow_online={allow_online} groups={})",
            selected_groups.join(",")
        ));
        Ok(())
    }
}
