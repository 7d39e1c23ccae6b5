//! Installer error taxonomy.
//!
//! Steps classify failures into four kinds so the operator (and the state
//! file's error ledger) can tell operator mistakes apart from environment
//! problems. Errors are carried through `anyhow` and stay downcastable.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InstallError {
    /// Missing or contradictory operator input (no target disk, unsupported
    /// OS base / architecture combination).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A required upstream step output is absent (e.g. no mounted target
    /// root). Re-run the pipeline from the step that produces it.
    #[error("precondition not met: {0}")]
    Precondition(String),

    /// An external tool exited nonzero. Carries the captured diagnostics.
    #[error("'{command}' failed (exit code {code}){}", format_stderr(.stderr))]
    ExternalTool {
        command: String,
        code: i32,
        stderr: String,
    },

    /// Malformed persisted state or manifest data.
    #[error("validation error: {0}")]
    Validation(String),
}

fn format_stderr(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(":\n{trimmed}")
    }
}
