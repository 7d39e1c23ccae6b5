//! Asset tree copying into the target.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use walkdir::WalkDir;

use crate::error::InstallError;
use crate::process::Runner;

/// Copy a directory tree into the target, creating destination directories
/// as needed. Existing files are overwritten so re-running the step
/// converges on the shipped assets.
pub fn copy_tree(runner: &Runner, src: &Path, dst: &Path) -> Result<()> {
    if !src.exists() {
        return Err(
            InstallError::Precondition(format!("asset tree '{}' missing", src.display())).into(),
        );
    }
    if runner.dry_run() {
        runner.log().info(format!(
            "dry-run: would copy tree {} -> {}",
            src.display(),
            dst.display()
        ));
        return Ok(());
    }

    fs::create_dir_all(dst).with_context(|| format!("creating '{}'", dst.display()))?;
    for entry in WalkDir::new(src) {
        let entry = entry.with_context(|| format!("walking '{}'", src.display()))?;
        let Ok(rel) = entry.path().strip_prefix(src) else {
            continue;
        };
        if rel.as_os_str().is_empty() {
            continue;
        }
        let out = dst.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&out).with_context(|| format!("creating '{}'", out.display()))?;
        } else {
            if let Some(parent) = out.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating '{}'", parent.display()))?;
            }
            fs::copy(entry.path(), &out).with_context(|| {
                format!("copying '{}' -> '{}'", entry.path().display(), out.display())
            })?;
        }
    }
    Ok(())
}
