//! fstab generation.
//!
//! Entries are keyed by filesystem UUID rather than device path, so the
//! generated file stays valid regardless of device enumeration order on the
//! next boot.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FstabEntry {
    /// Device spec, e.g. `UUID=...`.
    pub spec: String,
    pub mountpoint: String,
    pub fstype: String,
    pub options: String,
    pub dump: u8,
    pub passno: u8,
}

impl FstabEntry {
    fn render(&self) -> String {
        format!(
            "{}\t{}\t{}\t{}\t{}\t{}",
            self.spec, self.mountpoint, self.fstype, self.options, self.dump, self.passno
        )
    }
}

/// Entries for the layout the partition step produced: root always, plus
/// /boot and /boot/efi when those partitions exist.
pub fn plan_entries(
    root_uuid: &str,
    boot_uuid: Option<&str>,
    esp_uuid: Option<&str>,
) -> Vec<FstabEntry> {
    let mut entries = vec![FstabEntry {
        spec: format!("UUID={root_uuid}"),
        mountpoint: "/".to_string(),
        fstype: "ext4".to_string(),
        options: "defaults".to_string(),
        dump: 0,
        passno: 1,
    }];

    if let Some(uuid) = boot_uuid {
        entries.push(FstabEntry {
            spec: format!("UUID={uuid}"),
            mountpoint: "/boot".to_string(),
            fstype: "ext4".to_string(),
            options: "defaults".to_string(),
            dump: 0,
            passno: 2,
        });
    }

    if let Some(uuid) = esp_uuid {
        entries.push(FstabEntry {
            spec: format!("UUID={uuid}"),
            mountpoint: "/boot/efi".to_string(),
            fstype: "vfat".to_string(),
            options: "umask=0077".to_string(),
            dump: 0,
            passno: 1,
        });
    }

    entries
}

pub fn render_fstab(entries: &[FstabEntry]) -> String {
    let mut out = String::from("# /etc/fstab: static file system information.\n");
    out.push_str("# <file system>\t<mount point>\t<type>\t<options>\t<dump>\t<pass>\n");
    for entry in entries {
        out.push_str(&entry.render());
        out.push('\n');
    }
    out
}
