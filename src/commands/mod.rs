//! CLI command handlers.
//!
//! Each submodule handles a specific CLI command:
//! - `install` - Run the install pipeline
//! - `preflight` - Run preflight checks
//! - `show` - Display state and step information

pub mod install;
pub mod preflight;
pub mod show;

pub use install::{cmd_install, InstallArgs};
pub use preflight::cmd_preflight;
pub use show::{cmd_show, ShowTarget};
