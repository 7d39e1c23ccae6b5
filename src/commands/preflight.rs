//! Preflight command - runs preflight checks.

use std::path::Path;

use anyhow::Result;

use crate::config::Paths;
use crate::logging::Logger;
use crate::preflight;
use crate::process::Runner;

/// Execute the preflight command.
pub fn cmd_preflight(base_dir: &Path, strict: bool) -> Result<()> {
    let paths = Paths::load(base_dir);
    let log = Logger::disabled();
    let runner = Runner::new(&log, false);

    if strict {
        preflight::run_preflight_or_fail(&runner, &paths)?;
    } else {
        let report = preflight::run_preflight(&runner, &paths);
        report.print();
        if !report.all_passed() {
            println!("Some checks failed. Use --strict to fail the command.");
        }
    }
    Ok(())
}
