//! External command execution.
//!
//! All host-tool invocations go through here so that every command line is
//! logged before it runs, stderr is captured into error messages, and
//! dry-run mode can short-circuit execution uniformly.

use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result};

use crate::error::InstallError;
use crate::logging::Logger;

/// Captured result of a command execution.
#[derive(Debug, Clone)]
pub struct CommandResult {
    /// Exit code, or -1 if terminated by signal. Dry-run results report 0.
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.code == 0
    }

    pub fn stdout_trimmed(&self) -> &str {
        self.stdout.trim()
    }
}

/// Builder for a single external command.
pub struct Cmd {
    program: String,
    args: Vec<String>,
    /// Don't fail on non-zero exit.
    allow_fail: bool,
    error_prefix: Option<String>,
}

impl Cmd {
    pub fn new(program: impl AsRef<str>) -> Self {
        Self {
            program: program.as_ref().to_string(),
            args: Vec::new(),
            allow_fail: false,
            error_prefix: None,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<str>) -> Self {
        self.args.push(arg.as_ref().to_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for arg in args {
            self.args.push(arg.as_ref().to_string());
        }
        self
    }

    pub fn arg_path(mut self, path: &Path) -> Self {
        self.args.push(path.to_string_lossy().into_owned());
        self
    }

    /// Allow non-zero exit codes without failing.
    pub fn allow_fail(mut self) -> Self {
        self.allow_fail = true;
        self
    }

    /// Custom error message prefix for failures.
    pub fn error_msg(mut self, msg: impl AsRef<str>) -> Self {
        self.error_prefix = Some(msg.as_ref().to_string());
        self
    }

    fn command_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                line.push('\'');
                line.push_str(arg);
                line.push('\'');
            } else {
                line.push_str(arg);
            }
        }
        line
    }

    fn execute(self) -> Result<CommandResult> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .output()
            .with_context(|| format!("failed to execute '{}'. Is it installed?", self.program))?;

        let result = CommandResult {
            code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        if !self.allow_fail && !result.success() {
            let command = match self.error_prefix {
                Some(ref prefix) => format!("{} ({})", self.command_line(), prefix),
                None => self.command_line(),
            };
            return Err(InstallError::ExternalTool {
                command,
                code: result.code,
                stderr: result.stderr,
            }
            .into());
        }

        Ok(result)
    }
}

/// Executes commands on behalf of pipeline steps.
///
/// Carries the log handle and the dry-run flag so steps don't thread either
/// one by hand. In dry-run mode commands are logged but never spawned.
#[derive(Clone, Copy)]
pub struct Runner<'a> {
    log: &'a Logger,
    dry_run: bool,
}

impl<'a> Runner<'a> {
    pub fn new(log: &'a Logger, dry_run: bool) -> Self {
        Self { log, dry_run }
    }

    pub fn log(&self) -> &'a Logger {
        self.log
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    /// Execute a prepared command. Fails (with captured stderr) on non-zero
    /// exit unless the command allows failure.
    pub fn exec(&self, cmd: Cmd) -> Result<CommandResult> {
        let line = cmd.command_line();
        if self.dry_run {
            self.log.info(format!("CMD (dry-run) {line}"));
            return Ok(CommandResult {
                code: 0,
                stdout: String::new(),
                stderr: String::new(),
            });
        }
        self.log.info(format!("CMD {line}"));
        cmd.execute()
    }

    /// Run `program args...`, failing on non-zero exit.
    pub fn run<I, S>(&self, program: &str, args: I) -> Result<CommandResult>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.exec(Cmd::new(program).args(args))
    }

    /// Run `program args...`, tolerating non-zero exit.
    pub fn run_unchecked<I, S>(&self, program: &str, args: I) -> Result<CommandResult>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.exec(Cmd::new(program).args(args).allow_fail())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InstallError;

    fn runner(log: &Logger) -> Runner<'_> {
        Runner::new(log, false)
    }

    #[test]
    fn test_run_success() {
        let log = Logger::disabled();
        let result = runner(&log).run("echo", ["hello"]).unwrap();
        assert!(result.success());
        assert_eq!(result.stdout_trimmed(), "hello");
    }

    #[test]
    fn test_failure_is_external_tool_error_with_stderr() {
        let log = Logger::disabled();
        let err = runner(&log)
            .run("ls", ["/nonexistent_path_12345"])
            .unwrap_err();
        let tool_err = err
            .downcast_ref::<InstallError>()
            .expect("should be an InstallError");
        match tool_err {
            InstallError::ExternalTool { code, stderr, .. } => {
                assert_ne!(*code, 0);
                assert!(!stderr.is_empty());
            }
            other => panic!("wrong variant: {other}"),
        }
    }

    #[test]
    fn test_allow_fail_returns_result() {
        let log = Logger::disabled();
        let result = runner(&log).run_unchecked("false", [] as [&str; 0]).unwrap();
        assert!(!result.success());
        assert_eq!(result.code, 1);
    }

    #[test]
    fn test_dry_run_never_spawns() {
        let log = Logger::disabled();
        let dry = Runner::new(&log, true);
        // A program that cannot exist; dry-run must still succeed.
        let result = dry
            .run("definitely_not_a_real_tool_12345", ["--flag"])
            .unwrap();
        assert!(result.success());
        assert!(result.stdout.is_empty());
    }

    #[test]
    fn test_error_prefix_carried_into_message() {
        let log = Logger::disabled();
        let err = runner(&log)
            .exec(Cmd::new("false").error_msg("partitioning failed"))
            .unwrap_err();
        assert!(err.to_string().contains("partitioning failed"));
    }

    #[test]
    fn test_command_line_quotes_whitespace() {
        let cmd = Cmd::new("sh").arg("-c").arg("echo hi");
        assert_eq!(cmd.command_line(), "sh -c 'echo hi'");
    }
}
