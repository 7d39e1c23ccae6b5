//! Profile and feature manifests.
//!
//! Manifests are declarative data shipped next to the installer: one YAML
//! file per profile id (feature name → opt-in flag or named mode), and one
//! features.yaml mapping group names to package lists. They carry no logic;
//! the feature selector interprets them.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::error::InstallError;

/// A profile's feature flags, e.g. `camera: auto`, `lora: true`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileManifest {
    pub features: BTreeMap<String, PolicyValue>,
}

impl ProfileManifest {
    /// Look up a feature flag, falling back to the given default.
    pub fn policy<'a>(&'a self, feature: &str, default: &'a PolicyValue) -> &'a PolicyValue {
        self.features.get(feature).unwrap_or(default)
    }
}

/// A feature flag value: plain opt-in boolean or a named mode such as
/// `auto`, `gpu`, `full`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PolicyValue {
    Flag(bool),
    Mode(String),
}

impl PolicyValue {
    pub fn auto() -> PolicyValue {
        PolicyValue::Mode("auto".to_string())
    }

    pub fn is_true(&self) -> bool {
        matches!(self, PolicyValue::Flag(true))
    }

    /// Normalized mode name; booleans map to "on"/"off".
    pub fn mode(&self) -> String {
        match self {
            PolicyValue::Flag(true) => "on".to_string(),
            PolicyValue::Flag(false) => "off".to_string(),
            PolicyValue::Mode(m) => m.trim().to_ascii_lowercase(),
        }
    }
}

/// The feature-group catalog: group name → packages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureManifest {
    pub feature_groups: BTreeMap<String, FeatureGroup>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureGroup {
    pub packages: Vec<String>,
}

/// Load `manifests/profiles/<id>.yaml`.
pub fn load_profile(manifest_dir: &Path, profile_id: &str) -> Result<ProfileManifest> {
    let path = manifest_dir.join("profiles").join(format!("{profile_id}.yaml"));
    load_yaml(&path)
}

/// Load `manifests/features.yaml`.
pub fn load_features(manifest_dir: &Path) -> Result<FeatureManifest> {
    let path = manifest_dir.join("features.yaml");
    load_yaml(&path)
}

fn load_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path).map_err(|e| {
        InstallError::Validation(format!("manifest '{}' unreadable: {e}", path.display()))
    })?;
    let value: T = serde_yaml::from_str(&text).map_err(|e| {
        InstallError::Validation(format!("manifest '{}' malformed: {e}", path.display()))
    })?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_manifest_parses_flags_and_modes() {
        let yaml = "\
features:
  camera: auto
  lora: true
  haptics: false
  media: full
";
        let manifest: ProfileManifest = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            manifest.features.get("camera"),
            Some(&PolicyValue::Mode("auto".to_string()))
        );
        assert_eq!(manifest.features.get("lora"), Some(&PolicyValue::Flag(true)));
        assert_eq!(manifest.features.get("media").unwrap().mode(), "full");
        assert_eq!(manifest.features.get("haptics").unwrap().mode(), "off");
    }

    #[test]
    fn test_feature_manifest_parses_groups() {
        let yaml = "\
feature_groups:
  media_core:
    packages: [ffmpeg, v4l-utils]
  camera:
    packages:
      - guvcview
";
        let manifest: FeatureManifest = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            manifest.feature_groups["media_core"].packages,
            vec!["ffmpeg", "v4l-utils"]
        );
        assert_eq!(manifest.feature_groups["camera"].packages, vec!["guvcview"]);
    }

    #[test]
    fn test_load_profile_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        let profiles = dir.path().join("profiles");
        fs::create_dir_all(&profiles).unwrap();
        fs::write(profiles.join("arm64-pi.yaml"), "features:\n  camera: auto\n").unwrap();

        let manifest = load_profile(dir.path(), "arm64-pi").unwrap();
        assert!(manifest.features.contains_key("camera"));
    }

    #[test]
    fn test_missing_manifest_is_validation_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_features(dir.path()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<InstallError>(),
            Some(InstallError::Validation(_))
        ));
    }

    #[test]
    fn test_malformed_manifest_is_validation_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("features.yaml"), "feature_groups: [not, a, map]").unwrap();
        assert!(load_features(dir.path()).is_err());
    }
}
