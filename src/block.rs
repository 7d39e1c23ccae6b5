//! Block device queries.

use anyhow::Result;

use crate::error::InstallError;
use crate::process::Runner;

/// Filesystem UUID for a block device, via blkid.
///
/// Dry-run returns a placeholder so downstream planning can proceed.
pub fn get_uuid(runner: &Runner, dev: &str) -> Result<String> {
    let result = runner.run("blkid", ["-s", "UUID", "-o", "value", dev])?;
    let uuid = result.stdout_trimmed().to_string();
    if uuid.is_empty() {
        if runner.dry_run() {
            return Ok(format!("dry-run-uuid-{}", dev.replace('/', "-")));
        }
        return Err(InstallError::ExternalTool {
            command: format!("blkid -s UUID -o value {dev}"),
            code: result.code,
            stderr: format!("no UUID reported for {dev}"),
        }
        .into());
    }
    Ok(uuid)
}
