//! Chroot execution and bind-mount lifecycle.
//!
//! Steps that run tools inside the target (apt, grub-install, initramfs
//! generation) need /dev, /proc and /sys bind-mounted into it. The mounts
//! are held by an RAII guard so they are released on every exit path
//! (early returns, errors, panics) and never leak into later steps.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::process::{CommandResult, Runner};

const BIND_SOURCES: &[&str] = &["/dev", "/proc", "/sys"];

/// Run a command inside the target root.
pub fn chroot_cmd<I, S>(runner: &Runner, target_root: &Path, argv: I) -> Result<CommandResult>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut args: Vec<String> = vec![target_root.to_string_lossy().into_owned()];
    args.extend(argv.into_iter().map(|a| a.as_ref().to_string()));
    runner.run("chroot", args)
}

/// Live bind mounts into the target root. Unmounts on drop, in reverse
/// order, lazily and without error checking, the same way an operator
/// would clean up a half-torn-down chroot by hand.
pub struct ChrootBinds<'a> {
    runner: Runner<'a>,
    target_root: PathBuf,
}

impl<'a> ChrootBinds<'a> {
    pub fn mount(runner: Runner<'a>, target_root: &Path) -> Result<Self> {
        for &src in BIND_SOURCES {
            let dst = format!("{}{src}", target_root.display());
            runner.run("mount", ["--bind", src, dst.as_str()])?;
        }
        Ok(Self {
            runner,
            target_root: target_root.to_path_buf(),
        })
    }
}

impl Drop for ChrootBinds<'_> {
    fn drop(&mut self) {
        for src in BIND_SOURCES.iter().rev() {
            let path = format!("{}{src}", self.target_root.display());
            let _ = self.runner.run_unchecked("umount", ["-lf", path.as_str()]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::Logger;

    #[test]
    fn test_dry_run_mount_and_drop() {
        let log = Logger::disabled();
        let runner = Runner::new(&log, true);
        let binds = ChrootBinds::mount(runner, Path::new("/target")).unwrap();
        drop(binds);
        // Dry-run: nothing was actually mounted, and drop must not panic.
    }

    #[test]
    fn test_chroot_cmd_argv_shape_dry_run() {
        let log = Logger::disabled();
        let runner = Runner::new(&log, true);
        let result = chroot_cmd(&runner, Path::new("/target"), ["apt-get", "update"]).unwrap();
        assert!(result.success());
    }

    #[test]
    fn test_binds_mount_and_unmount_order() {
        // Dry-run commands still hit the log, so the ordering is observable.
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("cmd.log");
        let log = Logger::open(&log_path);
        let runner = Runner::new(&log, true);

        let binds = ChrootBinds::mount(runner, Path::new("/target")).unwrap();
        drop(binds);

        let text = std::fs::read_to_string(&log_path).unwrap();
        let commands: Vec<&str> = text
            .lines()
            .filter(|l| l.contains("CMD (dry-run)"))
            .collect();
        assert_eq!(commands.len(), 6);
        assert!(commands[0].contains("mount --bind /dev /target/dev"));
        assert!(commands[2].contains("mount --bind /sys /target/sys"));
        // Teardown is the reverse of setup.
        assert!(commands[3].contains("umount -lf /target/sys"));
        assert!(commands[5].contains("umount -lf /target/dev"));
    }
}
