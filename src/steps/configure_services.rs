//! Step 50: hostname, the single fixed-UID account, and service policy
//! decisions.
//!
//! User and group creation must survive re-runs against a target where they
//! already exist: exit code 9 from groupadd/useradd means "name already in
//! use" and is treated as success.

use std::fs;

use anyhow::{Context, Result};

use crate::chroot::ChrootBinds;
use crate::error::InstallError;
use crate::pipeline::{Step, StepCtx, StepId};
use crate::process::Runner;
use crate::state::{InstallState, SingleUser};

use super::require_target_root;

/// groupadd/useradd exit code for an already-existing name.
const EXIT_ALREADY_EXISTS: i32 = 9;

pub struct ConfigureServicesStep;

impl Step for ConfigureServicesStep {
    fn id(&self) -> StepId {
        StepId::new("50_configure_services")
    }

    fn run(&self, state: &mut InstallState, ctx: &StepCtx) -> Result<()> {
        let target_root = require_target_root(state)?;
        let cfg = state.config.clone();

        let hostname_path = target_root.join("etc/hostname");
        if ctx.runner.dry_run() {
            ctx.log
                .info(format!("dry-run: would write {}", hostname_path.display()));
        } else {
            if let Some(parent) = hostname_path.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating '{}'", parent.display()))?;
            }
            fs::write(&hostname_path, format!("{}\n", cfg.hostname))
                .with_context(|| format!("writing '{}'", hostname_path.display()))?;
        }

        let target = target_root.to_string_lossy().into_owned();
        let uid = cfg.fixed_uid.to_string();
        {
            let _binds = ChrootBinds::mount(ctx.runner, &target_root)?;

            run_idempotent(
                &ctx.runner,
                &[
                    "chroot", &target, "groupadd", "-g", &uid, &cfg.username,
                ],
            )?;
            run_idempotent(
                &ctx.runner,
                &[
                    "chroot",
                    &target,
                    "useradd",
                    "-m",
                    "-u",
                    &uid,
                    "-g",
                    &uid,
                    "-s",
                    "/bin/bash",
                    &cfg.username,
                ],
            )?;

            // SSH policy: flip the unit, but a target without the service
            // yet only earns a warning.
            let action = if cfg.ssh_enabled { "enable" } else { "disable" };
            let result = ctx
                .runner
                .run_unchecked("chroot", [target.as_str(), "systemctl", action, "ssh"])?;
            if !result.success() {
                ctx.log.warn(format!(
                    "could not {action} ssh service (exit code {})",
                    result.code
                ));
            }
        }

        let decisions = &mut state.execution.decisions;
        decisions.hostname = Some(cfg.hostname.clone());
        decisions.firewall_enabled = Some(cfg.firewall_enabled);
        decisions.ssh_enabled = Some(cfg.ssh_enabled);
        decisions.single_user = Some(SingleUser {
            username: cfg.username.clone(),
            uid: cfg.fixed_uid,
        });

        ctx.log.info(format!(
            "configured hostname={} user={}(uid={})",
            cfg.hostname, cfg.username, cfg.fixed_uid
        ));
        ctx.log.info(format!(
            "firewall={} ssh={}",
            cfg.firewall_enabled, cfg.ssh_enabled
        ));
        Ok(())
    }
}

/// Run a command treating "already exists" as success.
fn run_idempotent(runner: &Runner, argv: &[&str]) -> Result<()> {
    let result = runner.run_unchecked(argv[0], &argv[1..])?;
    if result.success() || result.code == EXIT_ALREADY_EXISTS {
        return Ok(());
    }
    Err(InstallError::ExternalTool {
        command: argv.join(" "),
        code: result.code,
        stderr: result.stderr,
    }
    .into())
}
