// autoresolve-rs/src/history.rs
// Passive sink for observed commands and solution attempts.
//
// Implementation notes:
// - Append-only NDJSON files on disk, one record per line.
// - The pipeline writes fire-and-forget; nothing read back here feeds
//   into decisions.
// - Unparsable lines are skipped when listing recent commands.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::catalog::ErrorType;
use crate::model::CommandEvent;

/// Longest raw error text kept in an attempt record.
const MAX_RAW_ERROR_CHARS: usize = 500;

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandRecord {
    pub command: String,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub recorded_at: DateTime<Utc>,
}

impl CommandRecord {
    pub fn from_event(event: &CommandEvent) -> Self {
        Self {
            command: event.command.clone(),
            exit_code: event.exit_code,
            stdout: event.stdout.clone(),
            stderr: event.stderr.clone(),
            recorded_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolutionAttempt {
    pub id: Uuid,
    pub error_type: ErrorType,
    pub raw_error: String,
    pub solution: String,
    pub success: bool,
    pub recorded_at: DateTime<Utc>,
}

impl SolutionAttempt {
    pub fn new(error_type: ErrorType, raw_error: &str, solution: &str, success: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            error_type,
            raw_error: raw_error.chars().take(MAX_RAW_ERROR_CHARS).collect(),
            solution: solution.to_string(),
            success,
            recorded_at: Utc::now(),
        }
    }
}

#[async_trait]
pub trait CommandHistory {
    async fn add_command(&self, event: &CommandEvent) -> Result<(), HistoryError>;

    async fn record_attempt(&self, attempt: &SolutionAttempt) -> Result<(), HistoryError>;

    /// Most recent commands, oldest first.
    async fn recent_commands(&self, count: usize) -> Result<Vec<CommandRecord>, HistoryError>;
}

/// File-backed history: `commands.ndjson` and `attempts.ndjson` under one
/// directory.
pub struct FileCommandHistory {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FileCommandHistory {
    /// Create the history directory eagerly so a bad path fails at startup.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, HistoryError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn commands_path(&self) -> PathBuf {
        self.dir.join("commands.ndjson")
    }

    pub fn attempts_path(&self) -> PathBuf {
        self.dir.join("attempts.ndjson")
    }

    async fn append<T: Serialize>(&self, path: &Path, record: &T) -> Result<(), HistoryError> {
        let _guard = self.write_lock.lock().await;
        fs::create_dir_all(&self.dir).await?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;

        let line = serde_json::to_string(record)?;
        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.flush().await?;

        Ok(())
    }
}

#[async_trait]
impl CommandHistory for FileCommandHistory {
    async fn add_command(&self, event: &CommandEvent) -> Result<(), HistoryError> {
        self.append(&self.commands_path(), &CommandRecord::from_event(event))
            .await
    }

    async fn record_attempt(&self, attempt: &SolutionAttempt) -> Result<(), HistoryError> {
        self.append(&self.attempts_path(), attempt).await
    }

    async fn recent_commands(&self, count: usize) -> Result<Vec<CommandRecord>, HistoryError> {
        let path = self.commands_path();
        let buf = match fs::read_to_string(&path).await {
            Ok(buf) => buf,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut out = Vec::new();
        for line in buf.lines() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<CommandRecord>(line) {
                Ok(rec) => out.push(rec),
                Err(err) => {
                    tracing::warn!(error = %err, "failed to parse command record line; skipping");
                }
            }
        }

        let skip = out.len().saturating_sub(count);
        Ok(out.split_off(skip))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn recent_commands_returns_tail_in_order() {
        let tmp_dir = tempfile::tempdir().expect("tempdir");
        let history = FileCommandHistory::new(tmp_dir.path().join("history")).expect("history");

        for i in 0..5 {
            history
                .add_command(&CommandEvent::new(format!("cmd{i}"), i, "", "", 0.0))
                .await
                .expect("add");
        }

        let recent = history.recent_commands(2).await.expect("recent");
        let names: Vec<_> = recent.iter().map(|r| r.command.as_str()).collect();
        assert_eq!(names, vec!["cmd3", "cmd4"]);
        assert_eq!(recent[1].exit_code, 4);
    }

    #[tokio::test]
    async fn empty_history_has_no_recent_commands() {
        let tmp_dir = tempfile::tempdir().expect("tempdir");
        let history = FileCommandHistory::new(tmp_dir.path()).expect("history");
        assert!(history.recent_commands(5).await.expect("recent").is_empty());
    }

    #[tokio::test]
    async fn attempts_are_appended_with_truncated_error() {
        let tmp_dir = tempfile::tempdir().expect("tempdir");
        let history = FileCommandHistory::new(tmp_dir.path()).expect("history");

        let long_error = "x".repeat(2_000);
        let attempt = SolutionAttempt::new(ErrorType::DiskSpace, &long_error, "clean tmp", false);
        history.record_attempt(&attempt).await.expect("record");

        let contents = std::fs::read_to_string(history.attempts_path()).expect("read");
        let parsed: SolutionAttempt =
            serde_json::from_str(contents.lines().next().expect("one line")).expect("parse");
        assert_eq!(parsed.raw_error.len(), 500);
        assert_eq!(parsed.error_type, ErrorType::DiskSpace);
        assert!(!parsed.success);
    }
}
