//! Pipeline step implementations.
//!
//! One module per step; each wires the library modules to the shared
//! install state. The declared order in `build_steps` is the executed
//! order, and the engine checks it against the numeric id prefixes.

mod apply_assets;
mod configure_services;
mod detect_hardware;
mod finalize;
mod install_bootloader;
mod install_desktop;
mod install_features;
mod install_kernel;
mod install_rootfs;
mod partition_fs;
mod post_install_checks;
mod write_fstab;

use std::path::PathBuf;

use anyhow::Result;

pub use apply_assets::ApplyAssetsStep;
pub use configure_services::ConfigureServicesStep;
pub use detect_hardware::DetectHardwareStep;
pub use finalize::FinalizeStep;
pub use install_bootloader::InstallBootloaderStep;
pub use install_desktop::InstallDesktopStep;
pub use install_features::InstallFeaturesStep;
pub use install_kernel::InstallKernelStep;
pub use install_rootfs::InstallRootfsStep;
pub use partition_fs::PartitionFilesystemStep;
pub use post_install_checks::PostInstallChecksStep;
pub use write_fstab::WriteFstabStep;

use crate::error::InstallError;
use crate::pipeline::Step;
use crate::state::InstallState;

/// The full install sequence.
pub fn build_steps() -> Vec<Box<dyn Step>> {
    vec![
        Box::new(DetectHardwareStep),
        Box::new(PartitionFilesystemStep),
        Box::new(InstallRootfsStep),
        Box::new(WriteFstabStep),
        Box::new(InstallKernelStep),
        Box::new(InstallBootloaderStep),
        Box::new(ConfigureServicesStep),
        Box::new(ApplyAssetsStep),
        Box::new(InstallDesktopStep),
        Box::new(InstallFeaturesStep),
        Box::new(PostInstallChecksStep),
        Box::new(FinalizeStep),
    ]
}

/// The mounted target root, or a precondition error naming the step that
/// produces it.
pub(crate) fn require_target_root(state: &InstallState) -> Result<PathBuf> {
    state
        .execution
        .mounts
        .target_root
        .as_ref()
        .map(PathBuf::from)
        .ok_or_else(|| {
            InstallError::Precondition(
                "execution.mounts.target_root missing; run the partition step first".to_string(),
            )
            .into()
        })
}

pub(crate) fn require_arch(state: &InstallState) -> Result<String> {
    state
        .hardware
        .as_ref()
        .map(|hw| hw.arch.clone())
        .ok_or_else(|| {
            InstallError::Precondition(
                "hardware report missing; run the detect step first".to_string(),
            )
            .into()
        })
}
