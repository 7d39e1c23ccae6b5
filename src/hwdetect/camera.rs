//! Camera probing.
//!
//! Presence is decided by actual video device nodes, never by profile
//! configuration: the feature selector installs camera listeners only when
//! hardware is really there.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

const DEV_DIR: &str = "/dev";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraReport {
    pub present: bool,
    /// The /dev/videoN nodes that were found, sorted.
    pub dev_nodes: Vec<String>,
}

pub fn probe() -> CameraReport {
    probe_dev_dir(Path::new(DEV_DIR))
}

fn probe_dev_dir(dev_dir: &Path) -> CameraReport {
    let mut dev_nodes: Vec<String> = match fs::read_dir(dev_dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .filter_map(|e| e.file_name().into_string().ok())
            .filter(|name| is_video_node(name))
            .map(|name| format!("{}/{name}", dev_dir.display()))
            .collect(),
        // No /dev to look at means no usable camera either way.
        Err(_) => Vec::new(),
    };
    dev_nodes.sort();

    CameraReport {
        present: !dev_nodes.is_empty(),
        dev_nodes,
    }
}

pub fn is_video_node(name: &str) -> bool {
    name.strip_prefix("video")
        .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
}
