//! Install command - drives the pipeline with resume semantics.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::config::Paths;
use crate::logging::Logger;
use crate::pipeline::{run_pipeline, RunOptions, StepCtx};
use crate::preflight;
use crate::state::StateStore;
use crate::steps::build_steps;

#[derive(Debug, Default)]
pub struct InstallArgs {
    pub state_path: Option<PathBuf>,
    pub log_path: Option<PathBuf>,
    pub start_at: Option<String>,
    pub stop_after: Option<String>,
    pub force: bool,
    pub skip_preflight: bool,
}

/// Execute the install command.
///
/// State is loaded (or created), the pipeline runs with the requested
/// windowing, and the state file is persisted as the pipeline progresses,
/// including on failure, so the run is resumable.
pub fn cmd_install(base_dir: &Path, args: InstallArgs) -> Result<()> {
    let mut paths = Paths::load(base_dir);
    if let Some(state_path) = args.state_path {
        paths.state_path = state_path;
    }
    if let Some(log_path) = args.log_path {
        paths.log_path = log_path;
    }

    let logger = Logger::open(&paths.log_path);
    let store = StateStore::new(paths.state_path.clone());
    let mut state = store.load()?;

    state.execution.paths.log_path_requested =
        Some(logger.requested_path().display().to_string());
    state.execution.paths.log_path_actual =
        logger.actual_path().map(|p| p.display().to_string());

    let ctx = StepCtx::new(&logger, &paths, state.config.dry_run);

    // Fail on missing host tools before any destructive step. Dry-run never
    // invokes the tools, so it has nothing to gate on.
    if !args.skip_preflight && !state.config.dry_run {
        preflight::run_preflight_or_fail(&ctx.runner, &paths)?;
    }

    let steps = build_steps();
    let opts = RunOptions {
        start_at: args.start_at,
        stop_after: args.stop_after,
        force: args.force,
    };

    let result = run_pipeline(&mut state, &steps, &ctx, &store, &opts)?;

    logger.info(format!(
        "pipeline complete: {} ran, {} skipped",
        result.ran.len(),
        result.skipped.len()
    ));
    println!("\nInstall state: {}", store.path().display());
    Ok(())
}
