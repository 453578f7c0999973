use std::time::Duration;
use thiserror::Error;

/// Errors from invoking an external tool. A command that ran but exited
/// non-zero is not an error here; callers inspect [`CommandOutput`].
#[derive(Debug, Error)]
pub enum RunError {
    #[error("`{0}` is not available on this host")]
    ToolUnavailable(String),
    #[error("`{program}` did not finish within {limit:?}")]
    Timeout { program: String, limit: Duration },
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Captured result of one external command invocation.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Capability for shelling out to host tools.
///
/// Every invocation carries an explicit hard timeout, enforced on top of
/// whatever internal timeout options the tool itself was given. Diagnostic
/// and resolution chains are written against this trait so they can be
/// driven by a scripted runner in tests.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    async fn run(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<CommandOutput, RunError>;
}

/// Runner backed by real host processes.
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    async fn run(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<CommandOutput, RunError> {
        use tokio::process::Command;

        tracing::debug!(program, ?args, "running command");

        let output = Command::new(program)
            .args(args)
            .kill_on_drop(true)
            .output();

        match tokio::time::timeout(timeout, output).await {
            Err(_) => Err(RunError::Timeout {
                program: program.to_string(),
                limit: timeout,
            }),
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(RunError::ToolUnavailable(program.to_string()))
            }
            Ok(Err(e)) => Err(RunError::Spawn {
                program: program.to_string(),
                source: e,
            }),
            Ok(Ok(out)) => Ok(CommandOutput {
                exit_code: out.status.code().unwrap_or(-1),
                stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
            }),
        }
    }
}

/// Check whether a named executable exists on the host.
///
/// Runner errors are treated as "not available" so the resolution and
/// diagnostic chains can fall through to their next step.
pub async fn tool_exists<R: CommandRunner>(runner: &R, name: &str) -> bool {
    matches!(
        runner.run("which", &[name], Duration::from_secs(5)).await,
        Ok(out) if out.success()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn system_runner_captures_stdout() {
        let out = SystemRunner
            .run("echo", &["hello"], Duration::from_secs(5))
            .await
            .unwrap();
        assert!(out.success());
        assert_eq!(out.stdout.trim(), "hello");
    }

    #[tokio::test]
    async fn system_runner_reports_missing_tool() {
        let err = SystemRunner
            .run("definitely-not-a-real-binary", &[], Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, RunError::ToolUnavailable(_)));
    }

    #[tokio::test]
    async fn system_runner_enforces_hard_timeout() {
        let err = SystemRunner
            .run("sleep", &["5"], Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, RunError::Timeout { .. }));
    }

    #[tokio::test]
    async fn tool_exists_maps_nonzero_exit_to_false() {
        use crate::testkit::{Scripted, ScriptedRunner};

        let runner = ScriptedRunner::new().on("which dig", Scripted::exit(1));
        assert!(!tool_exists(&runner, "dig").await);
    }

    #[tokio::test]
    async fn tool_exists_maps_runner_error_to_false() {
        use crate::testkit::{Scripted, ScriptedRunner};

        let runner = ScriptedRunner::new().on("which", Scripted::Missing);
        assert!(!tool_exists(&runner, "nslookup").await);
    }
}
