//! External process execution

use crate::error::{ProvisionError, Result};
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Lines of stderr kept in an error
const STDERR_TAIL_LINES: usize = 20;

/// Run `command` to completion; a non-zero exit becomes `ExternalProcess`.
///
/// The caller suspends until the process exits. Dropping the returned future
/// does not kill the process.
pub async fn run(command: &mut Command, program: &str, description: &str) -> Result<()> {
    info!("{}", description);
    let output = command.kill_on_drop(false).output().await.map_err(|source| {
        warn!("{} could not be started: {}", description, source);
        ProvisionError::Spawn {
            program: program.to_string(),
            source,
        }
    })?;

    let stderr = String::from_utf8_lossy(&output.stderr);
    for line in String::from_utf8_lossy(&output.stdout).lines() {
        debug!(program = %program, "{}", line);
    }

    if output.status.success() {
        info!("{} succeeded", description);
        return Ok(());
    }

    warn!("{} failed with {}", description, output.status);
    Err(ProvisionError::ExternalProcess {
        program: program.to_string(),
        status: output.status.to_string(),
        stderr: tail(&stderr, STDERR_TAIL_LINES),
    })
}

fn tail(text: &str, lines: usize) -> String {
    let all: Vec<&str> = text.trim_end().lines().collect();
    all[all.len().saturating_sub(lines)..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_success() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "echo building"]);
        run(&mut cmd, "sh", "test build").await.unwrap();
    }

    #[tokio::test]
    async fn test_non_zero_exit() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "echo 'release image not found' >&2; exit 3"]);
        let err = run(&mut cmd, "sh", "test build").await.unwrap_err();
        match err {
            ProvisionError::ExternalProcess { program, status, stderr } => {
                assert_eq!(program, "sh");
                assert!(status.contains('3'), "{}", status);
                assert_eq!(stderr, "release image not found");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_program() {
        let mut cmd = Command::new("/nonexistent/openshift-install");
        let err = run(&mut cmd, "openshift-install", "test build").await.unwrap_err();
        assert!(matches!(err, ProvisionError::Spawn { .. }));
    }

    #[test]
    fn test_tail() {
        assert_eq!(tail("a\nb\nc\n", 2), "b\nc");
        assert_eq!(tail("a", 5), "a");
        assert_eq!(tail("", 5), "");
    }
}
