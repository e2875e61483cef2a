//! Bounded subprocess execution for tool invocations.
//!
//! The child is spawned with `kill_on_drop`, so a timeout (or task
//! cancellation) tears the process down instead of leaking it.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, warn};

use crate::errors::{AdapterError, AdapterResult};

pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs `program args...` in `cwd` with a hard deadline.
///
/// Non-zero exit is **not** an error here: many analyzers exit non-zero
/// exactly when they find issues. Callers decide based on whether the
/// output parses.
pub async fn run_tool(
    program: &str,
    args: &[String],
    cwd: &Path,
    timeout: Duration,
) -> AdapterResult<ProcessOutput> {
    debug!(program, ?args, cwd = %cwd.display(), "spawning tool");
    let child = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| AdapterError::Spawn(format!("{program}: {e}")))?;

    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(res) => res?,
        Err(_) => {
            warn!(program, timeout_s = timeout.as_secs(), "tool timed out");
            return Err(AdapterError::Timeout);
        }
    };

    Ok(ProcessOutput {
        stdout: String::from_utf8(output.stdout)?,
        stderr: String::from_utf8(output.stderr)?,
        exit_code: output.status.code(),
    })
}

/// Best-effort `--version` probe with a short deadline.
pub async fn probe_version(program: &str, arg: &str, cwd: &Path) -> Option<String> {
    match run_tool(program, &[arg.to_string()], cwd, Duration::from_secs(5)).await {
        Ok(out) if out.success() => {
            let line = out.stdout.lines().next().unwrap_or("").trim().to_string();
            (!line.is_empty()).then_some(line)
        }
        _ => None,
    }
}
