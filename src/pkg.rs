//! Base-OS bootstrap and package management inside the target.
//!
//! Thin wrappers over debootstrap and apt with the exact argument shapes
//! the target distributions expect. Callers are responsible for holding
//! chroot bind mounts while these run.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::chroot::chroot_cmd;
use crate::process::Runner;

/// Bootstrap a base system into the target root.
pub fn debootstrap_rootfs(
    runner: &Runner,
    target_root: &Path,
    suite: &str,
    mirror: &str,
    arch: &str,
) -> Result<()> {
    let target = target_root.to_string_lossy();
    runner.run(
        "debootstrap",
        ["--arch", arch, suite, target.as_ref(), mirror],
    )?;
    Ok(())
}

pub fn apt_update(runner: &Runner, target_root: &Path) -> Result<()> {
    chroot_cmd(runner, target_root, ["apt-get", "update"])?;
    Ok(())
}

pub fn apt_install<I, S>(
    runner: &Runner,
    target_root: &Path,
    packages: I,
    with_recommends: bool,
) -> Result<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let packages: Vec<String> = packages
        .into_iter()
        .map(|p| p.as_ref().to_string())
        .collect();
    if packages.is_empty() {
        return Ok(());
    }
    let mut argv: Vec<&str> = vec!["apt-get", "install", "-y"];
    if !with_recommends {
        argv.push("--no-install-recommends");
    }
    argv.extend(packages.iter().map(|p| p.as_str()));
    chroot_cmd(runner, target_root, argv)?;
    Ok(())
}

/// Whether apt inside the target knows a package name. Used for optional
/// packages that exist only in some repositories. Dry-run is permissive so
/// planning doesn't fail.
pub fn apt_has_package(runner: &Runner, target_root: &Path, package: &str) -> bool {
    if runner.dry_run() {
        return true;
    }
    let target = target_root.to_string_lossy();
    match runner.run_unchecked("chroot", [target.as_ref(), "apt-cache", "show", package]) {
        Ok(result) => result.success(),
        Err(_) => false,
    }
}

/// Point apt in the target at an on-media repository.
///
/// `repo_path` must be reachable from inside the target (mounted or copied
/// in); the repo is trusted by construction since it ships on our media.
pub fn write_sources_list_offline(
    runner: &Runner,
    target_root: &Path,
    repo_path: &str,
    suite: &str,
    component: &str,
) -> Result<()> {
    let path = target_root.join("etc/apt/sources.list.d/ferrite-offline.list");
    let line = format!("deb [trusted=yes] file:{repo_path} {suite} {component}\n");
    if runner.dry_run() {
        runner
            .log()
            .info(format!("dry-run: would write {}", path.display()));
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating '{}'", parent.display()))?;
    }
    fs::write(&path, line).with_context(|| format!("writing '{}'", path.display()))?;
    runner
        .log()
        .info(format!("configured offline apt repo: {repo_path} ({suite} {component})"));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::Logger;

    #[test]
    fn test_offline_sources_list_contents() {
        let dir = tempfile::tempdir().unwrap();
        let log = Logger::disabled();
        let runner = Runner::new(&log, false);
        write_sources_list_offline(&runner, dir.path(), "/media/apt-repo", "bookworm", "main")
            .unwrap();
        let text =
            fs::read_to_string(dir.path().join("etc/apt/sources.list.d/ferrite-offline.list"))
                .unwrap();
        assert_eq!(text, "deb [trusted=yes] file:/media/apt-repo bookworm main\n");
    }

    #[test]
    fn test_apt_install_empty_is_noop() {
        let log = Logger::disabled();
        let runner = Runner::new(&log, false);
        // No packages: must not even attempt to spawn chroot.
        apt_install(&runner, Path::new("/nonexistent"), [] as [&str; 0], false).unwrap();
    }

    #[test]
    fn test_apt_has_package_permissive_in_dry_run() {
        let log = Logger::disabled();
        let runner = Runner::new(&log, true);
        assert!(apt_has_package(&runner, Path::new("/target"), "anything"));
    }
}
