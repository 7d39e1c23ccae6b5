//! Machine identity probing: DMI strings on PC firmware, the device-tree
//! model string on ARM boards. Either source may be missing; both missing
//! is still a valid (if anonymous) machine.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::Probe;

const DMI_ID_DIR: &str = "/sys/class/dmi/id";
const DEVICE_TREE_MODEL: &str = "/proc/device-tree/model";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityReport {
    pub dmi: Probe<DmiIdentity>,
    pub device_tree_model: Probe<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DmiIdentity {
    pub vendor: Option<String>,
    pub product: Option<String>,
    pub board: Option<String>,
}

pub fn probe() -> IdentityReport {
    IdentityReport {
        dmi: probe_dmi(Path::new(DMI_ID_DIR)),
        device_tree_model: probe_device_tree(Path::new(DEVICE_TREE_MODEL)),
    }
}

fn probe_dmi(dmi_dir: &Path) -> Probe<DmiIdentity> {
    if !dmi_dir.exists() {
        return Probe::Absent;
    }
    let read = |file: &str| -> Option<String> {
        fs::read_to_string(dmi_dir.join(file))
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    };
    let identity = DmiIdentity {
        vendor: read("sys_vendor"),
        product: read("product_name"),
        board: read("board_name"),
    };
    if identity == DmiIdentity::default() {
        Probe::Absent
    } else {
        Probe::Found(identity)
    }
}

fn probe_device_tree(model_path: &Path) -> Probe<String> {
    match fs::read(model_path) {
        // Device-tree strings are NUL-terminated.
        Ok(bytes) => {
            let model = String::from_utf8_lossy(&bytes)
                .trim_end_matches('\0')
                .trim()
                .to_string();
            if model.is_empty() {
                Probe::Absent
            } else {
                Probe::Found(model)
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Probe::Absent,
        Err(e) => Probe::Failed(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dmi_probe_reads_strings() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("sys_vendor"), "Valve\n").unwrap();
        fs::write(dir.path().join("product_name"), "Jupiter\n").unwrap();

        let probe = probe_dmi(dir.path());
        let identity = probe.found().expect("dmi should be found");
        assert_eq!(identity.vendor.as_deref(), Some("Valve"));
        assert_eq!(identity.product.as_deref(), Some("Jupiter"));
        assert_eq!(identity.board, None);
    }

    #[test]
    fn test_dmi_missing_dir_is_absent() {
        assert_eq!(
            probe_dmi(Path::new("/nonexistent/dmi/id")),
            Probe::Absent
        );
    }

    #[test]
    fn test_dmi_empty_strings_are_absent() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("sys_vendor"), "\n").unwrap();
        assert_eq!(probe_dmi(dir.path()), Probe::Absent);
    }

    #[test]
    fn test_device_tree_model_trims_nul() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model");
        fs::write(&path, b"Raspberry Pi 4 Model B Rev 1.4\0").unwrap();
        assert_eq!(
            probe_device_tree(&path),
            Probe::Found("Raspberry Pi 4 Model B Rev 1.4".to_string())
        );
    }

    #[test]
    fn test_device_tree_missing_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(probe_device_tree(&dir.path().join("model")), Probe::Absent);
    }
}
