//! The resumable step pipeline.
//!
//! Steps run strictly in declared order against one shared `InstallState`.
//! A step that already appears in `completed_steps` is skipped (unless
//! forced), so re-invoking the installer after a crash resumes where it
//! stopped. The state file is persisted after every completed step; that
//! cadence, not the final save, is what makes crash recovery work.

use std::fmt;

use anyhow::Result;

use crate::config::Paths;
use crate::error::InstallError;
use crate::logging::Logger;
use crate::process::Runner;
use crate::state::{InstallState, StateStore, Summary};

/// Stable step identity of the form `NN_name`. The numeric prefix documents
/// the intended order; the engine runs the declared sequence and checks that
/// prefixes agree with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StepId(&'static str);

impl StepId {
    pub const fn new(id: &'static str) -> Self {
        Self(id)
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }

    /// Numeric ordering prefix, when the id is well-formed.
    pub fn order(&self) -> Option<u32> {
        let (prefix, name) = self.0.split_once('_')?;
        if name.is_empty() || prefix.is_empty() {
            return None;
        }
        prefix.parse().ok()
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Everything a step needs besides the state itself: the audit log, the
/// command runner, and the resolved installer paths.
pub struct StepCtx<'a> {
    pub log: &'a Logger,
    pub runner: Runner<'a>,
    pub paths: &'a Paths,
}

impl<'a> StepCtx<'a> {
    pub fn new(log: &'a Logger, paths: &'a Paths, dry_run: bool) -> Self {
        Self {
            log,
            runner: Runner::new(log, dry_run),
            paths,
        }
    }
}

/// A single idempotent pipeline step.
///
/// `run` must tolerate being re-executed against a partially- or
/// fully-applied target: interrupted runs redo the step, and `--force`
/// redoes all of them.
pub trait Step {
    fn id(&self) -> StepId;
    fn run(&self, state: &mut InstallState, ctx: &StepCtx) -> Result<()>;
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Begin at this step id; earlier steps are neither executed nor marked
    /// completed.
    pub start_at: Option<String>,
    /// Halt after this step runs or is skipped.
    pub stop_after: Option<String>,
    /// Re-execute steps even when already completed.
    pub force: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineResult {
    pub ran: Vec<String>,
    pub skipped: Vec<String>,
}

/// Check step ids before anything runs: well-formed `NN_name`, unique, and
/// declared in ascending prefix order.
pub fn validate_sequence(steps: &[Box<dyn Step>]) -> Result<()> {
    let mut last_order: Option<u32> = None;
    let mut seen: Vec<&str> = Vec::new();
    for step in steps {
        let id = step.id();
        let order = id.order().ok_or_else(|| {
            InstallError::Validation(format!("step id '{id}' is not of the form NN_name"))
        })?;
        if seen.contains(&id.as_str()) {
            return Err(InstallError::Validation(format!("duplicate step id '{id}'")).into());
        }
        seen.push(id.as_str());
        if let Some(last) = last_order {
            if order <= last {
                return Err(InstallError::Validation(format!(
                    "step '{id}' is declared out of order (prefix {order} after {last})"
                ))
                .into());
            }
        }
        last_order = Some(order);
    }
    Ok(())
}

/// Run the pipeline with resume/skip/force semantics.
///
/// On step failure the failing id stays in `execution.current_step`, the
/// error is recorded, state is persisted, and the error propagates. The
/// next invocation skips the completed prefix and redoes the failed step.
pub fn run_pipeline(
    state: &mut InstallState,
    steps: &[Box<dyn Step>],
    ctx: &StepCtx,
    store: &StateStore,
    opts: &RunOptions,
) -> Result<PipelineResult> {
    validate_sequence(steps)?;
    for (flag, value) in [("start-at", &opts.start_at), ("stop-after", &opts.stop_after)] {
        if let Some(id) = value {
            if !steps.iter().any(|s| s.id().as_str() == id) {
                return Err(InstallError::Configuration(format!(
                    "unknown step id '{id}' for --{flag}"
                ))
                .into());
            }
        }
    }

    let mut ran: Vec<String> = Vec::new();
    let mut skipped: Vec<String> = Vec::new();
    let mut started = opts.start_at.is_none();

    for step in steps {
        let id = step.id();
        if !started {
            if opts.start_at.as_deref() == Some(id.as_str()) {
                started = true;
            } else {
                continue;
            }
        }

        state.execution.current_step = Some(id.as_str().to_string());

        if !opts.force && state.is_step_completed(id.as_str()) {
            ctx.log.info(format!("skipping step {id} (already completed)"));
            skipped.push(id.as_str().to_string());
        } else {
            ctx.log.info(format!("running step {id}"));
            match step.run(state, ctx) {
                Ok(()) => {
                    state.mark_step_completed(id.as_str());
                    ran.push(id.as_str().to_string());
                    store.save(state)?;
                }
                Err(e) => {
                    ctx.log.error(format!("step {id} failed: {e:#}"));
                    state.record_error(Some(id.as_str().to_string()), format!("{e:#}"));
                    if let Err(save_err) = store.save(state) {
                        ctx.log
                            .error(format!("could not persist state after failure: {save_err:#}"));
                    }
                    return Err(e.context(format!("step {id} failed")));
                }
            }
        }

        if opts.stop_after.as_deref() == Some(id.as_str()) {
            ctx.log.info(format!("stopping after {id}"));
            break;
        }
    }

    state.execution.current_step = None;
    state.execution.summary = Summary {
        ran_steps: ran.clone(),
        skipped_steps: skipped.clone(),
    };
    store.save(state)?;

    Ok(PipelineResult { ran, skipped })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopStep(StepId);

    impl Step for NoopStep {
        fn id(&self) -> StepId {
            self.0
        }
        fn run(&self, _state: &mut InstallState, _ctx: &StepCtx) -> Result<()> {
            Ok(())
        }
    }

    fn boxed(id: &'static str) -> Box<dyn Step> {
        Box::new(NoopStep(StepId::new(id)))
    }

    #[test]
    fn test_step_id_order() {
        assert_eq!(StepId::new("10_detect_hardware").order(), Some(10));
        assert_eq!(StepId::new("not_numbered").order(), None);
        assert_eq!(StepId::new("10").order(), None);
        assert_eq!(StepId::new("_name").order(), None);
    }

    #[test]
    fn test_validate_sequence_accepts_ascending_unique() {
        let steps = vec![boxed("10_a"), boxed("20_b"), boxed("25_c")];
        assert!(validate_sequence(&steps).is_ok());
    }

    #[test]
    fn test_validate_sequence_rejects_duplicates() {
        let steps = vec![boxed("10_a"), boxed("10_a")];
        let err = validate_sequence(&steps).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_validate_sequence_rejects_out_of_order() {
        let steps = vec![boxed("20_b"), boxed("10_a")];
        let err = validate_sequence(&steps).unwrap_err();
        assert!(err.to_string().contains("out of order"));
    }

    #[test]
    fn test_validate_sequence_rejects_malformed_id() {
        let steps = vec![boxed("detect")];
        assert!(validate_sequence(&steps).is_err());
    }
}
