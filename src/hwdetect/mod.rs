//! Hardware detection.
//!
//! Builds a `HardwareReport` for the running environment. Detection is
//! best-effort and never fails: each probe reports one of found / absent /
//! failed so downstream policy can tell "no camera" apart from "could not
//! determine". The report is recomputed fresh on every run; hardware can
//! change between attempts, so it is never trusted as a cross-run cache.

pub mod camera;
pub mod gpu;
pub mod identity;

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::process::Runner;
use crate::profile::SelectionBasis;

pub use camera::CameraReport;
pub use gpu::{GpuReport, GpuVendor};
pub use identity::{DmiIdentity, IdentityReport};

/// Outcome of a single best-effort probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum Probe<T> {
    /// The probe was not run (e.g. not applicable on this architecture).
    NotAttempted,
    Found(T),
    /// The probe ran and determined the thing is not there.
    Absent,
    /// The probe ran and could not determine an answer.
    Failed(String),
}

// Hand-written so `Probe<T>: Default` doesn't demand `T: Default`.
impl<T> Default for Probe<T> {
    fn default() -> Self {
        Probe::NotAttempted
    }
}

impl<T> Probe<T> {
    pub fn found(&self) -> Option<&T> {
        match self {
            Probe::Found(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Probe::Found(_))
    }
}

/// Firmware flavor of the running machine, which dictates both the partition
/// layout and the bootloader path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Firmware {
    Efi,
    Uboot,
}

impl std::fmt::Display for Firmware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Firmware::Efi => write!(f, "efi"),
            Firmware::Uboot => write!(f, "uboot"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HardwareReport {
    /// Normalized architecture: amd64, arm64 or armhf. Unknown kernel
    /// machine strings pass through unmapped.
    pub arch: String,
    pub firmware: Firmware,
    pub cpu_model: Probe<String>,
    pub ram_mb: Probe<u64>,
    pub gpu: GpuReport,
    pub camera: CameraReport,
    pub identity: IdentityReport,
    /// Selected profile id; filled in by the detect step after rule
    /// evaluation.
    #[serde(default)]
    pub profile: String,
    #[serde(default)]
    pub profile_selection: SelectionBasis,
}

impl HardwareReport {
    /// Probes that ran but could not determine an answer, for the warning
    /// ledger.
    pub fn failed_probes(&self) -> Vec<(String, String)> {
        let mut failed = Vec::new();
        let mut push = |name: &str, probe_err: Option<&String>| {
            if let Some(e) = probe_err {
                failed.push((name.to_string(), e.clone()));
            }
        };
        push("cpu_model", failed_reason(&self.cpu_model));
        push("ram_mb", failed_reason(&self.ram_mb));
        push("gpu_vendor", failed_reason(&self.gpu.vendor));
        push("dmi", failed_reason(&self.identity.dmi));
        push("device_tree", failed_reason(&self.identity.device_tree_model));
        failed
    }
}

fn failed_reason<T>(probe: &Probe<T>) -> Option<&String> {
    match probe {
        Probe::Failed(e) => Some(e),
        _ => None,
    }
}

/// Map kernel machine strings onto the closed arch set the installer
/// understands. Unknown strings pass through for the profile fallback rule.
pub fn normalize_arch(machine: &str) -> String {
    match machine.to_ascii_lowercase().as_str() {
        "x86_64" | "amd64" => "amd64".to_string(),
        "aarch64" | "arm64" => "arm64".to_string(),
        "armv7l" | "armv6l" | "arm" => "armhf".to_string(),
        other => other.to_string(),
    }
}

/// Probe the running environment. Individual probe failures degrade to
/// explicit absent/failed values; this function itself cannot fail.
pub fn detect(runner: &Runner) -> HardwareReport {
    let arch = normalize_arch(std::env::consts::ARCH);
    HardwareReport {
        firmware: detect_firmware(Path::new("/sys/firmware/efi")),
        cpu_model: probe_cpu_model(),
        ram_mb: probe_ram_mb(),
        gpu: gpu::probe(runner, &arch),
        camera: camera::probe(),
        identity: identity::probe(),
        arch,
        profile: String::new(),
        profile_selection: SelectionBasis::default(),
    }
}

/// EFI variables directory present means the running system booted via EFI;
/// everything else in our hardware matrix boots via U-Boot.
pub fn detect_firmware(efi_dir: &Path) -> Firmware {
    if efi_dir.exists() {
        Firmware::Efi
    } else {
        Firmware::Uboot
    }
}

fn probe_ram_mb() -> Probe<u64> {
    match fs::read_to_string("/proc/meminfo") {
        Ok(text) => match parse_mem_total_mb(&text) {
            Some(mb) => Probe::Found(mb),
            None => Probe::Absent,
        },
        Err(e) => Probe::Failed(e.to_string()),
    }
}

pub fn parse_mem_total_mb(meminfo: &str) -> Option<u64> {
    for line in meminfo.lines() {
        if let Some(rest) = line.strip_prefix("MemTotal:") {
            let kb: u64 = rest.split_whitespace().next()?.parse().ok()?;
            return Some(kb / 1024);
        }
    }
    None
}

fn probe_cpu_model() -> Probe<String> {
    match fs::read_to_string("/proc/cpuinfo") {
        Ok(text) => match parse_cpu_model(&text) {
            Some(model) => Probe::Found(model),
            None => Probe::Absent,
        },
        Err(e) => Probe::Failed(e.to_string()),
    }
}

/// x86 exposes "model name"; ARM boards usually expose "Model" or
/// "Hardware" instead.
pub fn parse_cpu_model(cpuinfo: &str) -> Option<String> {
    for key in ["model name", "Model", "Hardware"] {
        for line in cpuinfo.lines() {
            let Some((field, value)) = line.split_once(':') else {
                continue;
            };
            if field.trim() == key {
                let value = value.trim();
                if !value.is_empty() {
                    return Some(value.to_string());
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_arch_known_machines() {
        assert_eq!(normalize_arch("x86_64"), "amd64");
        assert_eq!(normalize_arch("amd64"), "amd64");
        assert_eq!(normalize_arch("aarch64"), "arm64");
        assert_eq!(normalize_arch("armv7l"), "armhf");
        assert_eq!(normalize_arch("armv6l"), "armhf");
    }

    #[test]
    fn test_normalize_arch_unknown_passes_through() {
        assert_eq!(normalize_arch("riscv64"), "riscv64");
    }

    #[test]
    fn test_parse_mem_total() {
        let meminfo = "MemTotal:       16315828 kB\nMemFree:         1234 kB\n";
        assert_eq!(parse_mem_total_mb(meminfo), Some(15933));
        assert_eq!(parse_mem_total_mb("MemFree: 5 kB\n"), None);
    }

    #[test]
    fn test_parse_cpu_model_x86() {
        let cpuinfo = "processor\t: 0\nmodel name\t: AMD Custom APU 0405\nflags\t: fpu\n";
        assert_eq!(
            parse_cpu_model(cpuinfo).as_deref(),
            Some("AMD Custom APU 0405")
        );
    }

    #[test]
    fn test_parse_cpu_model_arm_fallback() {
        let cpuinfo = "processor\t: 0\nBogoMIPS\t: 108.00\nModel\t\t: Raspberry Pi 4 Model B\n";
        assert_eq!(
            parse_cpu_model(cpuinfo).as_deref(),
            Some("Raspberry Pi 4 Model B")
        );
    }

    #[test]
    fn test_detect_firmware_by_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            detect_firmware(&dir.path().join("missing")),
            Firmware::Uboot
        );
        assert_eq!(detect_firmware(dir.path()), Firmware::Efi);
    }

    #[test]
    fn test_probe_serialization_shape() {
        let probe: Probe<u64> = Probe::Found(2048);
        let json = serde_json::to_string(&probe).unwrap();
        assert_eq!(json, r#"{"status":"found","value":2048}"#);
        let absent: Probe<u64> = Probe::Absent;
        assert_eq!(serde_json::to_string(&absent).unwrap(), r#"{"status":"absent"}"#);
    }
}
