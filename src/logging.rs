//! Installer logging and audit trail.
//!
//! Every decision the installer makes must end up in the log file. The
//! `Logger` is an explicit handle passed into steps rather than a process
//! global, so tests can run components silently and the CLI can pick the
//! destination per invocation.
//!
//! Live environments sometimes mount /var/log read-only; opening the
//! requested path can fail. We then fall back to a file in the working
//! directory and keep reporting both paths so the state file records where
//! the log really went.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

pub struct Logger {
    file: Option<File>,
    console: bool,
    requested_path: PathBuf,
    actual_path: Option<PathBuf>,
}

impl Logger {
    /// Open a logger writing to `requested` (appending), falling back to
    /// `ferroinstall.log` in the working directory when that fails.
    pub fn open(requested: &Path) -> Self {
        let mut actual = None;
        let mut file = match open_append(requested) {
            Ok(f) => {
                actual = Some(requested.to_path_buf());
                Some(f)
            }
            Err(_) => None,
        };

        if file.is_none() {
            let fallback = PathBuf::from("ferroinstall.log");
            if let Ok(f) = open_append(&fallback) {
                actual = Some(fallback);
                file = Some(f);
            }
        }

        let logger = Self {
            file,
            console: true,
            requested_path: requested.to_path_buf(),
            actual_path: actual,
        };
        match logger.actual_path() {
            Some(p) if p == requested => {
                logger.info(format!("logging to {}", p.display()));
            }
            Some(p) => {
                logger.warn(format!(
                    "cannot write {}; logging to {}",
                    requested.display(),
                    p.display()
                ));
            }
            None => logger.warn(format!(
                "cannot write {} or a fallback; console only",
                requested.display()
            )),
        }
        logger
    }

    /// A logger that discards everything. For tests.
    pub fn disabled() -> Self {
        Self {
            file: None,
            console: false,
            requested_path: PathBuf::new(),
            actual_path: None,
        }
    }

    pub fn requested_path(&self) -> &Path {
        &self.requested_path
    }

    pub fn actual_path(&self) -> Option<&Path> {
        self.actual_path.as_deref()
    }

    pub fn info(&self, msg: impl AsRef<str>) {
        self.write_line("INFO", msg.as_ref());
    }

    pub fn warn(&self, msg: impl AsRef<str>) {
        self.write_line("WARN", msg.as_ref());
    }

    pub fn error(&self, msg: impl AsRef<str>) {
        self.write_line("ERROR", msg.as_ref());
    }

    fn write_line(&self, level: &str, msg: &str) {
        let line = format!("{} {} {}", timestamp(), level, msg);
        if self.console {
            if level == "INFO" {
                println!("{line}");
            } else {
                eprintln!("{line}");
            }
        }
        if let Some(file) = &self.file {
            // Log writes are best-effort; a full disk must not kill a step.
            let mut f = file;
            let _ = writeln!(f, "{line}");
        }
    }
}

fn open_append(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    OpenOptions::new().create(true).append(true).open(path)
}

fn timestamp() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_records_both_paths() {
        let dir = tempfile::tempdir().unwrap();
        let requested = dir.path().join("nested/install.log");
        let logger = Logger::open(&requested);
        logger.info("hello");
        assert_eq!(logger.requested_path(), requested.as_path());
        assert_eq!(logger.actual_path(), Some(requested.as_path()));
        let contents = fs::read_to_string(&requested).unwrap();
        assert!(contents.contains("INFO hello"));
    }

    #[test]
    fn test_disabled_logger_is_silent() {
        let logger = Logger::disabled();
        logger.info("nothing");
        assert!(logger.actual_path().is_none());
    }
}
