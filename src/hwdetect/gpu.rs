//! GPU probing.
//!
//! Primary source is the kernel's DRM class directory; on amd64 we also ask
//! lspci for display controllers, which catches cards whose driver did not
//! bind. Vendor resolution goes through a fixed PCI vendor id table.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::Probe;
use crate::process::Runner;

const DRM_CLASS_DIR: &str = "/sys/class/drm";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GpuVendor {
    Intel,
    Amd,
    Nvidia,
}

impl GpuVendor {
    pub fn as_str(self) -> &'static str {
        match self {
            GpuVendor::Intel => "intel",
            GpuVendor::Amd => "amd",
            GpuVendor::Nvidia => "nvidia",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GpuReport {
    pub present: bool,
    pub vendor: Probe<GpuVendor>,
    /// Raw PCI vendor id (e.g. "0x8086") when one was read.
    pub vendor_id: Option<String>,
    /// Bound kernel driver name when one was resolved.
    pub driver: Option<String>,
}

/// Fixed PCI vendor id table. Ids may appear with or without the 0x prefix.
pub fn vendor_for_pci_id(id: &str) -> Option<GpuVendor> {
    let id = id.trim().trim_start_matches("0x");
    match id.to_ascii_lowercase().as_str() {
        "8086" => Some(GpuVendor::Intel),
        "1002" | "1022" => Some(GpuVendor::Amd),
        "10de" => Some(GpuVendor::Nvidia),
        _ => None,
    }
}

pub fn probe(runner: &Runner, arch: &str) -> GpuReport {
    let mut report = probe_drm(Path::new(DRM_CLASS_DIR));

    // amd64 only: enrich (or substitute) with lspci display controllers.
    if arch == "amd64" {
        if let Ok(result) = runner.run_unchecked("lspci", ["-nn"]) {
            let lines = display_controller_lines(&result.stdout);
            if !lines.is_empty() {
                report.present = true;
                if !report.vendor.is_found() {
                    if let Some(vendor) = lines.iter().find_map(|l| vendor_from_lspci_line(l)) {
                        report.vendor = Probe::Found(vendor);
                    }
                }
            }
        }
    }

    report
}

fn probe_drm(drm_dir: &Path) -> GpuReport {
    let entries = match fs::read_dir(drm_dir) {
        Ok(entries) => entries,
        Err(e) => {
            return GpuReport {
                present: false,
                vendor: Probe::Failed(format!("{}: {e}", drm_dir.display())),
                vendor_id: None,
                driver: None,
            }
        }
    };

    let mut cards: Vec<String> = entries
        .filter_map(|e| e.ok())
        .filter_map(|e| e.file_name().into_string().ok())
        .filter(|name| is_card_entry(name))
        .collect();
    cards.sort();

    let Some(card) = cards.first() else {
        return GpuReport {
            present: false,
            vendor: Probe::Absent,
            vendor_id: None,
            driver: None,
        };
    };

    let device_dir = drm_dir.join(card).join("device");
    let vendor_id = fs::read_to_string(device_dir.join("vendor"))
        .ok()
        .map(|s| s.trim().to_string());
    let vendor = match vendor_id.as_deref() {
        Some(id) => match vendor_for_pci_id(id) {
            Some(v) => Probe::Found(v),
            None => Probe::Absent,
        },
        None => Probe::Failed(format!("no vendor id for {card}")),
    };
    let driver = fs::read_link(device_dir.join("driver"))
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()));

    GpuReport {
        present: true,
        vendor,
        vendor_id,
        driver,
    }
}

/// Top-level DRM card directories are `cardN`; connector entries like
/// `card0-eDP-1` are not cards.
pub fn is_card_entry(name: &str) -> bool {
    name.strip_prefix("card")
        .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
}

pub fn display_controller_lines(lspci_output: &str) -> Vec<String> {
    lspci_output
        .lines()
        .filter(|line| {
            line.contains("VGA compatible controller")
                || line.contains("3D controller")
                || line.contains("Display controller")
        })
        .map(|line| line.to_string())
        .collect()
}

/// `lspci -nn` encodes ids as `[vvvv:dddd]` at the end of the line.
pub fn vendor_from_lspci_line(line: &str) -> Option<GpuVendor> {
    let open = line.rfind('[')?;
    let close = line[open..].find(']')? + open;
    let ids = &line[open + 1..close];
    let (vendor, _device) = ids.split_once(':')?;
    vendor_for_pci_id(vendor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vendor_table() {
        assert_eq!(vendor_for_pci_id("0x8086"), Some(GpuVendor::Intel));
        assert_eq!(vendor_for_pci_id("0x1002"), Some(GpuVendor::Amd));
        assert_eq!(vendor_for_pci_id("0x1022"), Some(GpuVendor::Amd));
        assert_eq!(vendor_for_pci_id("0x10de"), Some(GpuVendor::Nvidia));
        assert_eq!(vendor_for_pci_id("10DE"), Some(GpuVendor::Nvidia));
        assert_eq!(vendor_for_pci_id("0xabcd"), None);
    }

    #[test]
    fn test_card_entry_filter() {
        assert!(is_card_entry("card0"));
        assert!(is_card_entry("card1"));
        assert!(!is_card_entry("card0-eDP-1"));
        assert!(!is_card_entry("renderD128"));
        assert!(!is_card_entry("card"));
    }

    #[test]
    fn test_display_controller_lines() {
        let output = "\
00:02.0 VGA compatible controller [0300]: Intel Corporation Alder Lake-P [8086:46a6]\n\
00:14.0 USB controller [0c03]: Intel Corporation Alder Lake PCH [8086:51ed]\n\
01:00.0 3D controller [0302]: NVIDIA Corporation GA107M [10de:25a2]\n";
        let lines = display_controller_lines(output);
        assert_eq!(lines.len(), 2);
        assert_eq!(vendor_from_lspci_line(&lines[0]), Some(GpuVendor::Intel));
        assert_eq!(vendor_from_lspci_line(&lines[1]), Some(GpuVendor::Nvidia));
    }

    #[test]
    fn test_missing_drm_dir_is_failed_probe() {
        let report = probe_drm(Path::new("/nonexistent/drm/dir"));
        assert!(!report.present);
        assert!(matches!(report.vendor, Probe::Failed(_)));
    }

    #[test]
    fn test_empty_drm_dir_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let report = probe_drm(dir.path());
        assert!(!report.present);
        assert_eq!(report.vendor, Probe::Absent);
    }

    #[test]
    fn test_drm_card_with_vendor_file() {
        let dir = tempfile::tempdir().unwrap();
        let device = dir.path().join("card0/device");
        std::fs::create_dir_all(&device).unwrap();
        std::fs::write(device.join("vendor"), "0x1002\n").unwrap();
        // Connector entries must not be mistaken for cards.
        std::fs::create_dir_all(dir.path().join("card0-HDMI-A-1")).unwrap();

        let report = probe_drm(dir.path());
        assert!(report.present);
        assert_eq!(report.vendor, Probe::Found(GpuVendor::Amd));
        assert_eq!(report.vendor_id.as_deref(), Some("0x1002"));
    }
}
