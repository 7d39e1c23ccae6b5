//! Installer environment checks: privileges and shipped data files.

use std::path::Path;

use super::types::CheckResult;
use crate::config::Paths;
use crate::process::{Cmd, Runner};

pub fn check_environment(runner: &Runner, paths: &Paths) -> Vec<CheckResult> {
    let mut results = Vec::new();

    results.push(check_root(runner));
    results.push(check_path(
        "features manifest",
        &paths.manifest_dir.join("features.yaml"),
    ));
    results.push(check_path("profiles directory", &paths.manifest_dir.join("profiles")));
    results.push(check_path("assets directory", &paths.assets_dir));

    results
}

/// Partitioning, mounting and chroot all need root.
fn check_root(runner: &Runner) -> CheckResult {
    match runner.exec(Cmd::new("id").arg("-u").allow_fail()) {
        Ok(result) if result.stdout_trimmed() == "0" => CheckResult::pass("root privileges"),
        Ok(result) if runner.dry_run() && result.stdout.is_empty() => {
            CheckResult::pass_with("root privileges", "dry-run, not checked")
        }
        Ok(result) => CheckResult::fail(
            "root privileges",
            &format!("running as uid {}; run as root", result.stdout_trimmed()),
        ),
        Err(e) => CheckResult::fail("root privileges", &format!("cannot determine uid: {e}")),
    }
}

fn check_path(name: &str, path: &Path) -> CheckResult {
    if path.exists() {
        CheckResult::pass_with(name, &path.display().to_string())
    } else {
        CheckResult::fail(name, &format!("missing: {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::Logger;
    use crate::preflight::CheckStatus;

    #[test]
    fn test_missing_manifest_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let log = Logger::disabled();
        let runner = Runner::new(&log, true);
        let paths = Paths {
            state_path: dir.path().join("state.json"),
            log_path: dir.path().join("install.log"),
            target_root: dir.path().join("target"),
            manifest_dir: dir.path().join("manifests"),
            assets_dir: dir.path().join("assets"),
        };
        let results = check_environment(&runner, &paths);
        let manifest_check = results
            .iter()
            .find(|c| c.name == "features manifest")
            .unwrap();
        assert_eq!(manifest_check.status, CheckStatus::Fail);
    }
}
