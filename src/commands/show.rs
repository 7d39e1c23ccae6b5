//! Show command - displays state and step information.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::config::Paths;
use crate::state::StateStore;
use crate::steps::build_steps;

pub enum ShowTarget {
    /// Dump the persisted install state.
    State,
    /// List the step sequence with completion markers.
    Steps,
}

/// Execute the show command.
pub fn cmd_show(
    base_dir: &Path,
    target: ShowTarget,
    state_path: Option<PathBuf>,
) -> Result<()> {
    let paths = Paths::load(base_dir);
    let store = StateStore::new(state_path.unwrap_or(paths.state_path));
    let state = store.load()?;

    match target {
        ShowTarget::State => {
            println!("{}", serde_json::to_string_pretty(&state)?);
        }
        ShowTarget::Steps => {
            println!("Install steps ({}):\n", store.path().display());
            for step in build_steps() {
                let marker = if state.is_step_completed(step.id().as_str()) {
                    "✓"
                } else {
                    " "
                };
                println!("  [{marker}] {}", step.id());
            }
            if let Some(current) = &state.execution.current_step {
                println!("\nLast interrupted step: {current}");
            }
        }
    }
    Ok(())
}
