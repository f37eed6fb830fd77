//! External process execution with a time budget.

use crate::bundler::{
    error::{Error, Result},
    settings::ToolCommand,
};
use std::{
    ffi::OsString,
    path::{Path, PathBuf},
    process::Stdio,
    time::Duration,
};
use tokio::process::Command;

/// Captured output of a successful run.
#[derive(Debug)]
pub struct ToolOutput {
    /// Standard output, lossily decoded.
    pub stdout: String,
    /// Standard error, lossily decoded.
    pub stderr: String,
}

/// Locates `program` on `PATH`, or checks it when given as a path.
pub fn locate(program: &str) -> Result<PathBuf> {
    which::which(program).map_err(|e| Error::Subprocess {
        command: program.to_string(),
        status: "not started".to_string(),
        stderr: format!("program not found: {e}"),
    })
}

/// Runs `tool` plus `extra_args` in `cwd` and waits up to `timeout`.
///
/// A non-zero exit is [`Error::Subprocess`] carrying stderr; running past the
/// budget kills the child and yields [`Error::Timeout`].
pub async fn run_tool(
    tool: &ToolCommand,
    extra_args: &[String],
    cwd: &Path,
    envs: &[(&str, OsString)],
    timeout: Duration,
) -> Result<ToolOutput> {
    let program = locate(&tool.program)?;
    let command_line = describe(tool, extra_args);
    log::debug!("Running `{}` in {}", command_line, cwd.display());

    let child = Command::new(&program)
        .args(&tool.args)
        .args(extra_args)
        .current_dir(cwd)
        .envs(envs.iter().map(|(k, v)| (*k, v)))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| Error::Subprocess {
            command: command_line.clone(),
            status: "not started".to_string(),
            stderr: e.to_string(),
        })?;

    // dropping the future on timeout drops the child, which kills it
    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            return Err(Error::Subprocess {
                command: command_line,
                status: "wait failed".to_string(),
                stderr: e.to_string(),
            });
        }
        Err(_elapsed) => {
            log::warn!(
                "`{}` timed out after {}s, terminating",
                command_line,
                timeout.as_secs()
            );
            return Err(Error::Timeout {
                operation: command_line,
                timeout,
            });
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    for line in stdout.lines() {
        log::debug!("  {}", line);
    }

    if !output.status.success() {
        return Err(Error::Subprocess {
            command: command_line,
            status: output.status.to_string(),
            stderr: stderr.trim().to_string(),
        });
    }

    Ok(ToolOutput { stdout, stderr })
}

fn describe(tool: &ToolCommand, extra_args: &[String]) -> String {
    let mut line = tool.to_string();
    for arg in extra_args {
        line.push(' ');
        line.push_str(arg);
    }
    line
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> ToolCommand {
        ToolCommand::new("sh").arg("-c").arg(script)
    }

    #[tokio::test]
    async fn failure_carries_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let err = run_tool(
            &sh("echo broken >&2; exit 3"),
            &[],
            dir.path(),
            &[],
            Duration::from_secs(10),
        )
        .await
        .unwrap_err();

        match err {
            Error::Subprocess { stderr, .. } => assert_eq!(stderr, "broken"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn environment_and_cwd_are_applied() {
        let dir = tempfile::tempdir().unwrap();
        let output = run_tool(
            &sh("printf '%s' \"$GREETING\" > out.txt"),
            &[],
            dir.path(),
            &[("GREETING", "hello".into())],
            Duration::from_secs(10),
        )
        .await
        .unwrap();

        assert!(output.stderr.is_empty());
        assert_eq!(std::fs::read_to_string(dir.path().join("out.txt")).unwrap(), "hello");
    }

    #[tokio::test]
    async fn overrunning_the_budget_is_a_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let err = run_tool(
            &sh("sleep 5"),
            &[],
            dir.path(),
            &[],
            Duration::from_millis(200),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Timeout { .. }));
    }

    #[tokio::test]
    async fn missing_program_is_a_subprocess_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = run_tool(
            &ToolCommand::new("definitely-not-a-real-tool-xyz"),
            &[],
            dir.path(),
            &[],
            Duration::from_secs(1),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Subprocess { .. }));
    }
}
