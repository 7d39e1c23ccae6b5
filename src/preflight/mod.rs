//! Preflight checks.
//!
//! Validates host tools and the installer environment before any
//! destructive work touches the target disk. Run explicitly with
//! `ferroinstall preflight`, or implicitly before `install`.

mod environment;
mod host_tools;
mod types;

use anyhow::{bail, Result};

pub use types::{CheckResult, CheckStatus, PreflightReport};

use crate::config::Paths;
use crate::process::Runner;

/// Run all preflight checks.
pub fn run_preflight(runner: &Runner, paths: &Paths) -> PreflightReport {
    let mut checks = Vec::new();

    println!("Running preflight checks...\n");

    println!("Checking host tools...");
    checks.extend(host_tools::check_host_tools());

    println!("Checking environment...");
    checks.extend(environment::check_environment(runner, paths));

    println!();

    PreflightReport { checks }
}

/// Run preflight and bail if any checks fail.
pub fn run_preflight_or_fail(runner: &Runner, paths: &Paths) -> Result<()> {
    let report = run_preflight(runner, paths);
    report.print();

    if !report.all_passed() {
        bail!(
            "Preflight failed: {} check(s) failed. Fix the issues above before installing.",
            report.fail_count()
        );
    }

    println!("All preflight checks passed!\n");
    Ok(())
}
