//! ferroinstall - FerriteOS installer.
//!
//! Provisions FerriteOS onto a target disk through a resumable pipeline of
//! idempotent steps. Interrupted runs resume from the persisted state file;
//! `--force` redoes completed steps.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use ferroinstall::commands::{self, InstallArgs};

#[derive(Parser)]
#[command(name = "ferroinstall")]
#[command(about = "FerriteOS installer")]
#[command(
    after_help = "QUICK START:\n  ferroinstall preflight        Check host tools\n  ferroinstall install          Run (or resume) the install\n  ferroinstall show steps       See progress\n  ferroinstall install --force  Redo everything"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the install pipeline (resumes from persisted state)
    Install {
        /// Path to installer state (json|yaml)
        #[arg(long)]
        state: Option<PathBuf>,

        /// Path to installer log
        #[arg(long)]
        log: Option<PathBuf>,

        /// Start at this step id (e.g. 40_install_kernel)
        #[arg(long)]
        start_at: Option<String>,

        /// Stop after this step id
        #[arg(long)]
        stop_after: Option<String>,

        /// Re-run steps even if marked completed
        #[arg(long)]
        force: bool,

        /// Skip preflight checks before the pipeline
        #[arg(long)]
        skip_preflight: bool,
    },

    /// Run preflight checks (verify host tools before installing)
    Preflight {
        /// Fail if any checks fail (exit code 1)
        #[arg(long)]
        strict: bool,
    },

    /// Show information
    Show {
        #[command(subcommand)]
        what: ShowTarget,
    },
}

#[derive(Subcommand)]
enum ShowTarget {
    /// Show the persisted install state
    State {
        /// Path to installer state (json|yaml)
        #[arg(long)]
        state: Option<PathBuf>,
    },
    /// Show the step sequence and completion markers
    Steps {
        /// Path to installer state (json|yaml)
        #[arg(long)]
        state: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let base_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));

    // Load .env if present; environment variables take precedence.
    dotenvy::dotenv().ok();

    match cli.command {
        Commands::Install {
            state,
            log,
            start_at,
            stop_after,
            force,
            skip_preflight,
        } => commands::cmd_install(
            &base_dir,
            InstallArgs {
                state_path: state,
                log_path: log,
                start_at,
                stop_after,
                force,
                skip_preflight,
            },
        )?,

        Commands::Preflight { strict } => commands::cmd_preflight(&base_dir, strict)?,

        Commands::Show { what } => match what {
            ShowTarget::State { state } => {
                commands::cmd_show(&base_dir, commands::ShowTarget::State, state)?
            }
            ShowTarget::Steps { state } => {
                commands::cmd_show(&base_dir, commands::ShowTarget::Steps, state)?
            }
        },
    }

    Ok(())
}
