//! Host tool availability checks.

use super::types::CheckResult;

/// Tools the pipeline shells out to. Every one of these is destructive-path
/// critical except the optional probes at the end.
pub fn check_host_tools() -> Vec<CheckResult> {
    let mut results = Vec::new();

    let required_tools = [
        ("sgdisk", "gdisk", "Required to partition the target disk"),
        ("partprobe", "parted", "Required to refresh the partition table"),
        ("mkfs.ext4", "e2fsprogs", "Required to format boot/root filesystems"),
        ("mkfs.vfat", "dosfstools", "Required to format the EFI partition"),
        ("mount", "mount", "Required to mount the target tree"),
        ("chroot", "coreutils", "Required for in-target package installation"),
        ("debootstrap", "debootstrap", "Required to bootstrap the base system"),
        ("blkid", "util-linux", "Required to resolve filesystem UUIDs"),
    ];

    for (tool, package, purpose) in required_tools {
        results.push(check_tool_exists(tool, package, purpose, true));
    }

    // Optional: degrade gracefully when missing.
    let optional_tools = [
        ("lspci", "pciutils", "Improves GPU detection on amd64"),
        ("ip", "iproute2", "Used by the connectivity probe"),
        ("ping", "iputils-ping", "Used by the connectivity probe"),
    ];

    for (tool, package, purpose) in optional_tools {
        results.push(check_tool_exists(tool, package, purpose, false));
    }

    results
}

fn check_tool_exists(tool: &str, package: &str, purpose: &str, required: bool) -> CheckResult {
    match which::which(tool) {
        Ok(path) => CheckResult::pass_with(tool, &path.display().to_string()),
        Err(_) => {
            let msg = format!("Not found. Install '{}' package. {}", package, purpose);
            if required {
                CheckResult::fail(tool, &msg)
            } else {
                CheckResult::warn(tool, &msg)
            }
        }
    }
}
