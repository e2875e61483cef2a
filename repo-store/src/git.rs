//! Bounded `git` CLI execution.
//!
//! Git is an opaque command-line dependency here: working-tree mutations go
//! through the binary, never a linked library, so the store inherits git's
//! own safety checks around checkouts and fetches.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, warn};

use crate::errors::{RepoError, RepoResult};

/// Runs `git <args>` (in `cwd` when given) with a hard deadline.
/// The child is spawned with `kill_on_drop`, so a timeout or caller
/// cancellation tears it down instead of leaking a fetch.
pub async fn run_git(
    cwd: Option<&Path>,
    args: &[&str],
    operation: &str,
    timeout: Duration,
) -> RepoResult<String> {
    debug!(?args, operation, "running git");
    let mut cmd = Command::new("git");
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }

    let child = cmd.spawn().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            RepoError::GitNotAvailable
        } else {
            RepoError::GitCommand {
                operation: operation.to_string(),
                detail: e.to_string(),
            }
        }
    })?;

    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(res) => res?,
        Err(_) => {
            warn!(operation, timeout_s = timeout.as_secs(), "git timed out");
            return Err(RepoError::GitTimeout {
                operation: operation.to_string(),
            });
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(RepoError::GitCommand {
            operation: operation.to_string(),
            detail: stderr.trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
