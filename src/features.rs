//! Optional feature selection.
//!
//! Decides which declaratively-defined package groups to install, from
//! hardware signals, profile opt-ins, and network policy. Selection is pure
//! and ordered; resolution maps groups to packages via the feature
//! manifest; availability filtering happens later against the target's
//! package index.
//!
//! One rule is deliberately strict: camera packages are installed only when
//! camera hardware was actually detected. A profile opting in cannot
//! override a missing camera; it produces a warning instead.

use anyhow::Result;

use crate::error::InstallError;
use crate::hwdetect::HardwareReport;
use crate::manifest::{FeatureManifest, PolicyValue, ProfileManifest};
use crate::state::Warning;

pub const GROUP_MEDIA_CORE: &str = "media_core";
pub const GROUP_AI_CORE: &str = "ai_core";
pub const GROUP_CAMERA: &str = "camera";
pub const GROUP_MEDIA_FULL: &str = "media_full";

/// Profile-gated opt-in groups: feature flag name doubles as group name.
const OPT_IN_GROUPS: &[&str] = &["lora", "haptics", "sensors"];

/// Ordered group selection. Each group appears at most once.
pub fn select_groups(
    hw: &HardwareReport,
    profile: &ProfileManifest,
    allow_online: bool,
    warnings: &mut Vec<Warning>,
) -> Vec<String> {
    let auto = PolicyValue::auto();
    let opt_out = PolicyValue::Flag(false);
    let mut groups: Vec<String> = Vec::new();
    let add = |groups: &mut Vec<String>, name: &str| {
        if !groups.iter().any(|g| g == name) {
            groups.push(name.to_string());
        }
    };

    // Baselines are unconditional.
    add(&mut groups, GROUP_MEDIA_CORE);
    add(&mut groups, GROUP_AI_CORE);

    // Camera: hardware absence always wins over configuration intent.
    let camera_policy = profile.policy(GROUP_CAMERA, &auto);
    if camera_policy.mode() == "auto" {
        if hw.camera.present {
            add(&mut groups, GROUP_CAMERA);
        }
    } else if camera_policy.is_true() {
        if hw.camera.present {
            add(&mut groups, GROUP_CAMERA);
        } else {
            warnings.push(Warning::FeatureWithheld {
                feature: GROUP_CAMERA.to_string(),
                reason: "profile_enabled_but_no_camera_detected".to_string(),
            });
        }
    }

    for &name in OPT_IN_GROUPS {
        if profile.policy(name, &opt_out).is_true() {
            add(&mut groups, name);
        }
    }

    let ai_policy = profile.policy("ai", &auto).mode();

    if hw.gpu.present {
        if let Some(vendor) = hw.gpu.vendor.found() {
            add(&mut groups, format!("media_hwaccel_{}", vendor.as_str()).as_str());

            // GPU AI runtimes are heavy and repo-dependent; online only.
            if allow_online && matches!(ai_policy.as_str(), "auto" | "gpu" | "on") {
                add(&mut groups, format!("ai_gpu_{}", vendor.as_str()).as_str());
            }
        }
    }

    // CPU AI runtime: selected independently of the GPU path, so the default
    // "auto" policy can install both.
    if matches!(ai_policy.as_str(), "auto" | "cpu" | "on") {
        add(&mut groups, "ai_cpu");
    }

    let media_policy = profile.policy("media", &auto).mode();
    if matches!(media_policy.as_str(), "full" | "on") {
        add(&mut groups, GROUP_MEDIA_FULL);
    }

    groups
}

/// Flatten selected groups into their package lists, in selection order.
/// Unknown group names are a manifest/selection mismatch and fail loudly.
pub fn resolve_packages(groups: &[String], manifest: &FeatureManifest) -> Result<Vec<String>> {
    let mut packages = Vec::new();
    for group in groups {
        let entry = manifest.feature_groups.get(group).ok_or_else(|| {
            InstallError::Validation(format!("feature manifest has no group '{group}'"))
        })?;
        for package in &entry.packages {
            let package = package.trim();
            if !package.is_empty() {
                packages.push(package.to_string());
            }
        }
    }
    Ok(packages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hwdetect::{
        CameraReport, Firmware, GpuReport, GpuVendor, IdentityReport, Probe,
    };
    use crate::manifest::FeatureGroup;
    use crate::profile::SelectionBasis;

    fn hw(camera: bool, gpu: Option<GpuVendor>) -> HardwareReport {
        HardwareReport {
            arch: "amd64".to_string(),
            firmware: Firmware::Efi,
            cpu_model: Probe::NotAttempted,
            ram_mb: Probe::NotAttempted,
            gpu: GpuReport {
                present: gpu.is_some(),
                vendor: match gpu {
                    Some(v) => Probe::Found(v),
                    None => Probe::Absent,
                },
                vendor_id: None,
                driver: None,
            },
            camera: CameraReport {
                present: camera,
                dev_nodes: if camera {
                    vec!["/dev/video0".to_string()]
                } else {
                    Vec::new()
                },
            },
            identity: IdentityReport::default(),
            profile: String::new(),
            profile_selection: SelectionBasis::default(),
        }
    }

    fn profile(features: &[(&str, PolicyValue)]) -> ProfileManifest {
        ProfileManifest {
            features: features
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        }
    }

    #[test]
    fn test_baselines_always_selected() {
        let mut warnings = Vec::new();
        let groups = select_groups(&hw(false, None), &profile(&[]), false, &mut warnings);
        assert_eq!(&groups[..2], &["media_core", "ai_core"]);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_camera_auto_follows_hardware() {
        let mut warnings = Vec::new();
        let with = select_groups(&hw(true, None), &profile(&[]), false, &mut warnings);
        assert!(with.contains(&"camera".to_string()));
        let without = select_groups(&hw(false, None), &profile(&[]), false, &mut warnings);
        assert!(!without.contains(&"camera".to_string()));
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_camera_forced_without_hardware_warns_instead() {
        let mut warnings = Vec::new();
        let p = profile(&[("camera", PolicyValue::Flag(true))]);
        let groups = select_groups(&hw(false, None), &p, false, &mut warnings);
        assert!(!groups.contains(&"camera".to_string()));
        assert_eq!(
            warnings,
            vec![Warning::FeatureWithheld {
                feature: "camera".to_string(),
                reason: "profile_enabled_but_no_camera_detected".to_string(),
            }]
        );
    }

    #[test]
    fn test_camera_disabled_by_profile() {
        let mut warnings = Vec::new();
        let p = profile(&[("camera", PolicyValue::Flag(false))]);
        let groups = select_groups(&hw(true, None), &p, false, &mut warnings);
        assert!(!groups.contains(&"camera".to_string()));
    }

    #[test]
    fn test_opt_in_groups_require_profile() {
        let mut warnings = Vec::new();
        let p = profile(&[("lora", PolicyValue::Flag(true))]);
        let groups = select_groups(&hw(false, None), &p, false, &mut warnings);
        assert!(groups.contains(&"lora".to_string()));
        assert!(!groups.contains(&"haptics".to_string()));
        assert!(!groups.contains(&"sensors".to_string()));
    }

    #[test]
    fn test_gpu_hwaccel_keyed_by_vendor() {
        let mut warnings = Vec::new();
        let groups = select_groups(
            &hw(false, Some(GpuVendor::Intel)),
            &profile(&[]),
            false,
            &mut warnings,
        );
        assert!(groups.contains(&"media_hwaccel_intel".to_string()));
        assert!(!groups.iter().any(|g| g.starts_with("ai_gpu_")));
    }

    #[test]
    fn test_gpu_ai_requires_online() {
        let mut warnings = Vec::new();
        let offline = select_groups(
            &hw(false, Some(GpuVendor::Nvidia)),
            &profile(&[]),
            false,
            &mut warnings,
        );
        assert!(!offline.contains(&"ai_gpu_nvidia".to_string()));

        let online = select_groups(
            &hw(false, Some(GpuVendor::Nvidia)),
            &profile(&[]),
            true,
            &mut warnings,
        );
        assert!(online.contains(&"ai_gpu_nvidia".to_string()));
    }

    #[test]
    fn test_default_policy_selects_both_ai_runtimes() {
        // Selecting the CPU fallback alongside the GPU runtime under "auto"
        // is intended behavior.
        let mut warnings = Vec::new();
        let groups = select_groups(
            &hw(false, Some(GpuVendor::Amd)),
            &profile(&[]),
            true,
            &mut warnings,
        );
        assert!(groups.contains(&"ai_gpu_amd".to_string()));
        assert!(groups.contains(&"ai_cpu".to_string()));
    }

    #[test]
    fn test_ai_policy_gpu_only_skips_cpu_runtime() {
        let mut warnings = Vec::new();
        let p = profile(&[("ai", PolicyValue::Mode("gpu".to_string()))]);
        let groups = select_groups(&hw(false, Some(GpuVendor::Amd)), &p, true, &mut warnings);
        assert!(groups.contains(&"ai_gpu_amd".to_string()));
        assert!(!groups.contains(&"ai_cpu".to_string()));
    }

    #[test]
    fn test_media_full_requires_explicit_policy() {
        let mut warnings = Vec::new();
        let default = select_groups(&hw(false, None), &profile(&[]), false, &mut warnings);
        assert!(!default.contains(&"media_full".to_string()));

        let p = profile(&[("media", PolicyValue::Mode("full".to_string()))]);
        let full = select_groups(&hw(false, None), &p, false, &mut warnings);
        assert!(full.contains(&"media_full".to_string()));
    }

    #[test]
    fn test_no_duplicate_groups() {
        let mut warnings = Vec::new();
        let p = profile(&[("lora", PolicyValue::Flag(true))]);
        let groups = select_groups(&hw(true, Some(GpuVendor::Intel)), &p, true, &mut warnings);
        let mut deduped = groups.clone();
        deduped.dedup();
        assert_eq!(groups, deduped);
    }

    #[test]
    fn test_resolve_packages_in_selection_order() {
        let mut manifest = FeatureManifest::default();
        manifest.feature_groups.insert(
            "media_core".to_string(),
            FeatureGroup {
                packages: vec!["ffmpeg".to_string(), " v4l-utils ".to_string()],
            },
        );
        manifest.feature_groups.insert(
            "ai_core".to_string(),
            FeatureGroup {
                packages: vec!["python3".to_string()],
            },
        );
        let groups = vec!["media_core".to_string(), "ai_core".to_string()];
        let packages = resolve_packages(&groups, &manifest).unwrap();
        assert_eq!(packages, vec!["ffmpeg", "v4l-utils", "python3"]);
    }

    #[test]
    fn test_resolve_unknown_group_fails() {
        let manifest = FeatureManifest::default();
        let groups = vec!["no_such_group".to_string()];
        assert!(resolve_packages(&groups, &manifest).is_err());
    }
}
