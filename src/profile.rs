//! Profile selection.
//!
//! Maps a hardware report onto a named hardware class (profile). The rules
//! live in one priority-ordered table; the first match wins and the whole
//! evaluation is deterministic: identical reports always produce identical
//! selections, and the reasoning trail ends up in the state file.

use serde::{Deserialize, Serialize};

use crate::hwdetect::HardwareReport;

pub const PROFILE_AMD64_PC: &str = "amd64-pc";
pub const PROFILE_AMD64_HANDHELD: &str = "amd64-handheld";
pub const PROFILE_ARM64_HANDHELD: &str = "arm64-handheld";
pub const PROFILE_ARM64_PI: &str = "arm64-pi";
pub const PROFILE_ARM64_SBC: &str = "arm64-sbc";
pub const PROFILE_ARMHF_LEGACY: &str = "armhf-legacy";

/// DMI product names of the amd64 handheld family.
const HANDHELD_DMI_PRODUCTS: &[&str] = &["Jupiter", "Galileo"];
const HANDHELD_DMI_VENDOR: &str = "Valve";

/// Device-tree model substrings of the arm64 handheld boards.
const HANDHELD_DT_MODELS: &[&str] = &["ClockworkPi uConsole", "ClockworkPi DevTerm"];

/// Device-tree model substring of the supported SBC family.
const PI_DT_MODEL: &str = "Raspberry Pi";

/// Why a profile was selected: score, rule name, and the report strings
/// that matched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionBasis {
    pub confidence: f64,
    pub reason: String,
    pub evidence: Vec<String>,
}

struct Rule {
    profile: &'static str,
    confidence: f64,
    reason: &'static str,
    /// Returns matched evidence strings, or None when the rule does not
    /// apply.
    matches: fn(&HardwareReport) -> Option<Vec<String>>,
}

/// Priority-ordered rule table; evaluation stops at the first match. The
/// final rule matches anything, so evaluation always produces a profile.
const RULES: &[Rule] = &[
    Rule {
        profile: PROFILE_AMD64_HANDHELD,
        confidence: 0.95,
        reason: "dmi_handheld_match",
        matches: match_amd64_handheld,
    },
    Rule {
        profile: PROFILE_AMD64_PC,
        confidence: 0.75,
        reason: "amd64_generic",
        matches: match_amd64,
    },
    Rule {
        profile: PROFILE_ARM64_HANDHELD,
        confidence: 0.9,
        reason: "device_tree_handheld_match",
        matches: match_arm64_handheld,
    },
    Rule {
        profile: PROFILE_ARM64_PI,
        confidence: 0.9,
        reason: "device_tree_pi_match",
        matches: match_arm64_pi,
    },
    Rule {
        profile: PROFILE_ARM64_SBC,
        confidence: 0.55,
        reason: "arm64_unrecognized_board",
        matches: match_arm64,
    },
    Rule {
        profile: PROFILE_ARMHF_LEGACY,
        confidence: 0.7,
        reason: "armhf_legacy",
        matches: match_armhf,
    },
    Rule {
        profile: PROFILE_AMD64_PC,
        confidence: 0.3,
        reason: "unknown_arch_fallback",
        matches: match_any,
    },
];

/// Select a profile for the report. A forced profile short-circuits the
/// rule table and is returned verbatim with full confidence.
pub fn select(report: &HardwareReport, forced: Option<&str>) -> (String, SelectionBasis) {
    if let Some(profile) = forced {
        return (
            profile.to_string(),
            SelectionBasis {
                confidence: 1.0,
                reason: "forced_profile".to_string(),
                evidence: vec![format!("config.forced_profile={profile}")],
            },
        );
    }

    for rule in RULES {
        if let Some(evidence) = (rule.matches)(report) {
            return (
                rule.profile.to_string(),
                SelectionBasis {
                    confidence: rule.confidence,
                    reason: rule.reason.to_string(),
                    evidence,
                },
            );
        }
    }
    unreachable!("final rule matches any report");
}

fn match_amd64_handheld(report: &HardwareReport) -> Option<Vec<String>> {
    if report.arch != "amd64" {
        return None;
    }
    let dmi = report.identity.dmi.found()?;
    let vendor = dmi.vendor.as_deref().unwrap_or("");
    let product = dmi.product.as_deref().unwrap_or("");
    let vendor_hit = vendor.eq_ignore_ascii_case(HANDHELD_DMI_VENDOR);
    let product_hit = HANDHELD_DMI_PRODUCTS
        .iter()
        .any(|p| product.eq_ignore_ascii_case(p));
    if vendor_hit || product_hit {
        Some(vec![
            format!("dmi.vendor={vendor}"),
            format!("dmi.product={product}"),
        ])
    } else {
        None
    }
}

fn match_amd64(report: &HardwareReport) -> Option<Vec<String>> {
    (report.arch == "amd64").then(|| vec!["arch=amd64".to_string()])
}

fn match_arm64_handheld(report: &HardwareReport) -> Option<Vec<String>> {
    match_device_tree(report, "arm64", HANDHELD_DT_MODELS)
}

fn match_arm64_pi(report: &HardwareReport) -> Option<Vec<String>> {
    match_device_tree(report, "arm64", &[PI_DT_MODEL])
}

fn match_device_tree(
    report: &HardwareReport,
    arch: &str,
    model_substrings: &[&str],
) -> Option<Vec<String>> {
    if report.arch != arch {
        return None;
    }
    let model = report.identity.device_tree_model.found()?;
    model_substrings
        .iter()
        .any(|m| model.contains(m))
        .then(|| vec![format!("device_tree.model={model}")])
}

fn match_arm64(report: &HardwareReport) -> Option<Vec<String>> {
    (report.arch == "arm64").then(|| vec!["arch=arm64".to_string()])
}

fn match_armhf(report: &HardwareReport) -> Option<Vec<String>> {
    (report.arch == "armhf").then(|| vec!["arch=armhf".to_string()])
}

fn match_any(report: &HardwareReport) -> Option<Vec<String>> {
    Some(vec![format!("arch={}", report.arch)])
}
