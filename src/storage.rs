//! Disk layout: partitioning, formatting, mounting.
//!
//! The layout is decided by firmware type:
//! - EFI: partition 1 is an ESP (FAT32), root takes the rest.
//! - U-Boot: partition 1 is a dedicated /boot (ext4) for extlinux, root
//!   takes the rest.
//!
//! Partition tables are destroyed and recreated from scratch; there is no
//! rollback of a half-written table. Re-running the step with --force is
//! the recovery path.

use std::fs;
use std::path::Path;

use anyhow::Result;

use crate::hwdetect::Firmware;
use crate::process::Runner;

#[derive(Debug, Clone)]
pub struct PartitionPlan {
    pub disk: String,
    pub firmware: Firmware,
    pub esp_size_mib: u32,
    pub boot_size_mib: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionResult {
    pub root_part: String,
    pub esp_part: Option<String>,
    pub boot_part: Option<String>,
}

/// Device path of partition `n` on `disk`.
///
/// Disks whose path ends in a digit (nvme0n1, mmcblk0) take a `p` infix;
/// traditional names (sda) append the number directly.
pub fn part_suffix(disk: &str, n: u32) -> String {
    if disk.ends_with(|c: char| c.is_ascii_digit()) {
        format!("{disk}p{n}")
    } else {
        format!("{disk}{n}")
    }
}

/// Create the partition table, format the filesystems, and mount the tree
/// under `target_root`.
///
/// Mount order matters: root first, then /boot, then the ESP at
/// /boot/efi. The ESP mountpoint is nested under /boot, so it must never
/// be mounted before /boot when both exist.
pub fn partition_and_format(
    runner: &Runner,
    plan: &PartitionPlan,
    target_root: &Path,
) -> Result<PartitionResult> {
    let disk = plan.disk.as_str();
    runner
        .log()
        .info(format!("partitioning disk={disk} firmware={}", plan.firmware));

    // Wipe and start a fresh GPT.
    runner.run("sgdisk", ["--zap-all", disk])?;
    runner.run("sgdisk", ["--clear", disk])?;

    let mut part_num: u32 = 1;
    let mut esp_part = None;
    let mut boot_part = None;

    if plan.firmware == Firmware::Efi {
        runner.run(
            "sgdisk",
            [
                format!("--new={part_num}:0:+{}MiB", plan.esp_size_mib).as_str(),
                format!("--typecode={part_num}:ef00").as_str(),
                format!("--change-name={part_num}:EFI").as_str(),
                disk,
            ],
        )?;
        esp_part = Some(part_suffix(disk, part_num));
        part_num += 1;
    }

    if plan.firmware == Firmware::Uboot {
        runner.run(
            "sgdisk",
            [
                format!("--new={part_num}:0:+{}MiB", plan.boot_size_mib).as_str(),
                format!("--typecode={part_num}:8300").as_str(),
                format!("--change-name={part_num}:BOOT").as_str(),
                disk,
            ],
        )?;
        boot_part = Some(part_suffix(disk, part_num));
        part_num += 1;
    }

    // Root consumes the remaining space.
    runner.run(
        "sgdisk",
        [
            format!("--new={part_num}:0:0").as_str(),
            format!("--typecode={part_num}:8300").as_str(),
            format!("--change-name={part_num}:ROOT").as_str(),
            disk,
        ],
    )?;
    let root_part = part_suffix(disk, part_num);

    // Refresh the kernel's view before formatting.
    runner.run("partprobe", [disk])?;

    if let Some(esp) = &esp_part {
        runner.run("mkfs.vfat", ["-F", "32", esp])?;
    }
    if let Some(boot) = &boot_part {
        runner.run("mkfs.ext4", ["-F", boot])?;
    }
    runner.run("mkfs.ext4", ["-F", &root_part])?;

    let target = target_root.to_string_lossy();
    ensure_dir(runner, target_root)?;
    runner.run("mount", [root_part.as_str(), target.as_ref()])?;

    if let Some(boot) = &boot_part {
        let boot_dir = target_root.join("boot");
        ensure_dir(runner, &boot_dir)?;
        runner.run("mount", [boot.as_str(), boot_dir.to_string_lossy().as_ref()])?;
    }

    if let Some(esp) = &esp_part {
        let esp_dir = target_root.join("boot/efi");
        ensure_dir(runner, &esp_dir)?;
        runner.run("mount", [esp.as_str(), esp_dir.to_string_lossy().as_ref()])?;
    }

    Ok(PartitionResult {
        root_part,
        esp_part,
        boot_part,
    })
}

fn ensure_dir(runner: &Runner, dir: &Path) -> Result<()> {
    if runner.dry_run() {
        return Ok(());
    }
    fs::create_dir_all(dir)?;
    Ok(())
}
