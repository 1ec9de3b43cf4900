// autoresolve-rs/src/executor.rs
// Executors that act on remedies the pipeline hands over.
//
// The pipeline never runs shell commands itself: it submits the remedy
// together with the risk gate's verdict, and the executor decides what to
// do with it. Requests without an auto-execute verdict are only recorded.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use tokio::process::Command;

use crate::model::{ExecutionRequest, ExecutionResult};

/// Per-command limit for [`ShellExecutor`].
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    #[error("remedy rejected: {0}")]
    Rejected(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

static DANGEROUS_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"rm -rf /",
        r"rm -rf \*",
        r"dd if=",
        r"mkfs\.",
        r"> /dev/sda",
        r":\(\)\{ :\|:& \};:",
    ]
    .iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
});

/// Reject command lists containing known-destructive patterns.
/// Comments and blank lines are ignored.
pub fn validate_commands(commands: &[String]) -> Result<(), ExecutorError> {
    for cmd in commands.iter().filter(|c| is_runnable(c)) {
        if DANGEROUS_PATTERNS.iter().any(|re| re.is_match(cmd)) {
            return Err(ExecutorError::Rejected(format!(
                "dangerous command detected: {cmd}"
            )));
        }
    }
    Ok(())
}

fn is_runnable(cmd: &str) -> bool {
    let trimmed = cmd.trim();
    !trimmed.is_empty() && !trimmed.starts_with('#')
}

#[async_trait]
pub trait CommandExecutor {
    /// Act on a remedy. Returns `None` when nothing was executed because
    /// the request still needs the user's approval.
    async fn submit(&self, request: &ExecutionRequest)
        -> Result<Option<ExecutionResult>, ExecutorError>;
}

/// Validates and records requests without running anything.
#[derive(Debug, Default)]
pub struct DryRunExecutor {
    requests: Mutex<Vec<ExecutionRequest>>,
}

impl DryRunExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> Vec<ExecutionRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl CommandExecutor for DryRunExecutor {
    async fn submit(
        &self,
        request: &ExecutionRequest,
    ) -> Result<Option<ExecutionResult>, ExecutorError> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request.clone());

        validate_commands(&request.remedy.commands)?;

        if !request.auto_execute {
            return Ok(None);
        }

        tracing::info!(
            remedy = %request.remedy.name,
            commands = request.remedy.commands.len(),
            "dry run; commands not executed"
        );
        Ok(Some(ExecutionResult::succeeded(
            request.remedy.commands.clone(),
            "DRY RUN - Commands not executed".to_string(),
        )))
    }
}

/// Runs remedy commands through `sh -c`, one after another, stopping at
/// the first failure.
#[derive(Debug)]
pub struct ShellExecutor {
    command_timeout: Duration,
}

impl ShellExecutor {
    pub fn new(command_timeout: Duration) -> Self {
        Self { command_timeout }
    }

    async fn run_all(&self, commands: &[String]) -> Result<ExecutionResult, ExecutorError> {
        let mut executed = Vec::new();
        let mut output_lines = Vec::new();

        for cmd in commands.iter().filter(|c| is_runnable(c)) {
            tracing::info!(command = %cmd, "executing remedy command");

            let child = Command::new("sh")
                .arg("-c")
                .arg(cmd)
                .kill_on_drop(true)
                .output();

            let output = match tokio::time::timeout(self.command_timeout, child).await {
                Ok(result) => result?,
                Err(_) => {
                    return Ok(ExecutionResult::failed(
                        executed,
                        output_lines.join("\n"),
                        format!("Command timed out: {cmd}"),
                    ));
                }
            };

            executed.push(cmd.clone());
            output_lines.push(format!("$ {cmd}"));
            output_lines.push(String::from_utf8_lossy(&output.stdout).to_string());

            if !output.status.success() {
                return Ok(ExecutionResult::failed(
                    executed,
                    output_lines.join("\n"),
                    String::from_utf8_lossy(&output.stderr).to_string(),
                ));
            }
        }

        Ok(ExecutionResult::succeeded(executed, output_lines.join("\n")))
    }
}

impl Default for ShellExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_COMMAND_TIMEOUT)
    }
}

#[async_trait]
impl CommandExecutor for ShellExecutor {
    async fn submit(
        &self,
        request: &ExecutionRequest,
    ) -> Result<Option<ExecutionResult>, ExecutorError> {
        validate_commands(&request.remedy.commands)?;

        if !request.auto_execute {
            tracing::info!(remedy = %request.remedy.name, "remedy awaiting user approval");
            return Ok(None);
        }

        self.run_all(&request.remedy.commands).await.map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RiskTier;
    use crate::test_support::remedy;

    fn request(commands: &[&str], auto_execute: bool) -> ExecutionRequest {
        ExecutionRequest {
            command: "npm start".to_string(),
            remedy: remedy("fix", RiskTier::Low, commands),
            auto_execute,
        }
    }

    #[test]
    fn destructive_commands_are_rejected() {
        for cmd in ["rm -rf /", "sudo rm -rf *", "dd if=/dev/zero of=/dev/sda", "mkfs.ext4 /dev/sdb1", "echo x > /dev/sda", ":(){ :|:& };:"] {
            assert!(
                validate_commands(&[cmd.to_string()]).is_err(),
                "should reject {cmd}"
            );
        }
    }

    #[test]
    fn comments_and_safe_commands_pass_validation() {
        let commands = vec![
            "# rm -rf / is never run from a comment".to_string(),
            "".to_string(),
            "npm install".to_string(),
        ];
        assert!(validate_commands(&commands).is_ok());
    }

    #[tokio::test]
    async fn dry_run_records_requests_and_only_reports_auto_ones() {
        let executor = DryRunExecutor::new();

        let pending = executor.submit(&request(&["npm install"], false)).await.expect("submit");
        assert!(pending.is_none());

        let ran = executor
            .submit(&request(&["npm install"], true))
            .await
            .expect("submit")
            .expect("auto request should produce a result");
        assert!(ran.success);
        assert_eq!(ran.output, "DRY RUN - Commands not executed");

        let requests = executor.requests();
        assert_eq!(requests.len(), 2);
        assert!(!requests[0].auto_execute);
        assert!(requests[1].auto_execute);
    }

    #[tokio::test]
    async fn dry_run_rejects_dangerous_remedy() {
        let executor = DryRunExecutor::new();
        let result = executor.submit(&request(&["rm -rf /"], true)).await;
        assert!(matches!(result, Err(ExecutorError::Rejected(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn shell_executor_stops_at_first_failure() {
        let executor = ShellExecutor::default();
        let result = executor
            .submit(&request(&["echo one", "exit 3", "echo never"], true))
            .await
            .expect("submit")
            .expect("result");
        assert!(!result.success);
        assert_eq!(result.commands_executed, vec!["echo one".to_string(), "exit 3".to_string()]);
        assert!(result.output.contains("one"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn shell_executor_times_out_slow_commands() {
        let executor = ShellExecutor::new(Duration::from_millis(100));
        let result = executor
            .submit(&request(&["sleep 5"], true))
            .await
            .expect("submit")
            .expect("result");
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("Command timed out: sleep 5"));
    }
}
